//! Builders for the resources one routing rule needs. Each decides between
//! create, skip and reference from an existence check and hands back the
//! command to run; none of them mutate anything.

pub mod association;
pub mod frontend;
pub mod load_balancing;
pub mod pool;
pub mod probe;
pub mod rule;
