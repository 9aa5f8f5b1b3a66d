//! Method-specific types.

pub mod initialize;
pub mod tools;

pub use initialize::{Implementation, InitializeParams, InitializeResult, ServerCapabilities, ToolsCapability};
pub use tools::{CallToolParams, CallToolResult, Content, ListToolsResult, ToolDescriptor};

/// Known method names.
pub mod names {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const CANCELLED: &str = "notifications/cancelled";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
}
