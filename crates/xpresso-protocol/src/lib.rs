//! xpresso protocol types
//!
//! JSON-RPC 2.0 envelope and the subset of Model Context Protocol messages
//! served over stdio: initialize, ping, tools/list and tools/call.

pub mod error;
pub mod ops;
pub mod request;
pub mod response;

pub use error::{ErrorCode, RpcError};
pub use request::{RequestId, RpcRequest};
pub use response::RpcResponse;

/// JSON-RPC version string carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revisions this implementation speaks, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Newest supported MCP protocol revision.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

/// Pick the protocol revision to answer an `initialize` with.
///
/// A supported requested revision is echoed back; anything else gets the
/// latest revision and the client decides whether to continue.
pub fn negotiate_protocol_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|v| *v == requested)
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}
