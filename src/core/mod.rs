// Shared infrastructure used by the compiler, the scheduler and the server

pub mod config;
pub mod errors;
pub mod ids;

pub use config::{OperationDurations, OrchestratorConfig, OrchestratorConfigBuilder};
pub use errors::{OrchestratorError, Result};
pub use ids::{Cuid2Generator, IdGenerator, SequentialIdGenerator};
