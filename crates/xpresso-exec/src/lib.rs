//! xpresso execution core
//!
//! Two independent pieces consumed by the tool layer:
//! - [`ProcessRunner`]: spawns one external program, drains stdout and stderr
//!   concurrently, enforces an optional wall-clock timeout and reports every
//!   outcome (spawn failure, non-zero exit, timeout) as an [`ExecutionResult`].
//! - [`LogCache`]: bounded store of the latest report per operation category.

pub mod log_cache;
pub mod runner;
pub mod truncate;

pub use log_cache::LogCache;
pub use runner::{
    CancelFlag, ExecOptions, ExecutionResult, ProcessRunner, Runner, RunnerConfig,
};
pub use truncate::{truncate_output, MAX_OUTPUT_CHARS};
