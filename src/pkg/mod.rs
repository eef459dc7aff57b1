pub mod az;
pub mod conf;
pub mod engines;
pub mod orchestrator;
pub mod plan;
pub mod routes;
pub mod spec;
