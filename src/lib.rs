//! xpresso - Xcode tooling for agents
//!
//! Exposes xcodebuild, simctl and devicectl operations as MCP tools over
//! stdio. Commands run through the [`xpresso_exec`] process runner, and the
//! output of build-like operations is kept in a small in-memory log cache
//! for later retrieval.

pub mod config;
pub mod logging;
pub mod server;
pub mod tools;
pub mod xcode;

pub use config::{ConfigError, EffectiveConfig, Settings};
pub use server::Server;
pub use tools::ToolContext;
pub use xpresso_exec::{LogCache, ProcessRunner, Runner};
