pub mod config;
pub mod engines;
pub mod loader;
