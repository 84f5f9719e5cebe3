pub mod analyzers;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod flags;
pub mod output;
pub mod parser;
pub mod periods;
pub mod readings;
pub mod registry;
pub mod schema;
pub mod stats;

pub use config::EngineConfig;
pub use engine::{ComputeOutput, EmptyReason, RunStatus, compute};
pub use error::EngineError;
pub use parser::RecordTable;
