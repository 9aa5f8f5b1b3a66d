//! stdio MCP server
//!
//! Reads newline-delimited JSON-RPC messages from stdin and writes one
//! response line per request to stdout. Notifications and client responses
//! get no reply. Requests are handled one at a time, in arrival order.
//!
//! stdout carries only protocol messages; diagnostics go through `tracing`
//! to stderr.

use std::io::{self, BufRead, Write};

use serde_json::Value;
use tracing::{debug, info, warn};
use xpresso_protocol::ops::{
    names, CallToolParams, Implementation, InitializeParams, InitializeResult, ListToolsResult,
    ServerCapabilities, ToolsCapability,
};
use xpresso_protocol::{
    negotiate_protocol_version, RequestId, RpcError, RpcRequest, RpcResponse, JSONRPC_VERSION,
};

use crate::tools::{self, ToolContext};

const INSTRUCTIONS: &str = "Tools for building, testing and running Xcode projects. \
Use xpresso_logs to read the full output of the most recent build, test, run or clean.";

/// MCP server over a line-oriented reader/writer pair.
pub struct Server {
    tools: ToolContext,
    info: Implementation,
}

impl Server {
    pub fn new(tools: ToolContext) -> Self {
        Self {
            tools,
            info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("xpresso".to_string()),
            },
        }
    }

    /// Serve stdin/stdout until stdin closes.
    pub fn run(&self) -> io::Result<()> {
        self.run_with_io(&mut io::stdin().lock(), &mut io::stdout().lock())
    }

    /// Serve until `reader` reaches EOF.
    pub fn run_with_io<R: BufRead, W: Write>(&self, reader: &mut R, writer: &mut W) -> io::Result<()> {
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                info!("input closed, shutting down");
                return Ok(());
            }
            if let Some(response) = self.handle_line(&line) {
                self.write_response(writer, &response)?;
            }
        }
    }

    /// Handle one input line, returning the response to send, if any.
    pub fn handle_line(&self, line: &str) -> Option<RpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "unparseable message");
                return Some(RpcResponse::error(
                    None,
                    RpcError::parse_error(format!("invalid JSON: {}", e)),
                ));
            }
        };

        // A response to something we never sent; nothing to do.
        if value.get("method").is_none()
            && (value.get("result").is_some() || value.get("error").is_some())
        {
            debug!("ignoring client response");
            return None;
        }

        let id = value
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());

        let request: RpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(RpcResponse::error(
                    id,
                    RpcError::invalid_request(format!("not a JSON-RPC request: {}", e)),
                ));
            }
        };
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(RpcResponse::error(
                request.id,
                RpcError::invalid_request(format!(
                    "unsupported jsonrpc version: {}",
                    request.jsonrpc
                )),
            ));
        }

        if request.is_notification() {
            self.notify(&request);
            return None;
        }

        Some(self.dispatch(request))
    }

    fn notify(&self, request: &RpcRequest) {
        match request.method.as_str() {
            names::INITIALIZED => info!("client initialized"),
            names::CANCELLED => debug!(params = ?request.params, "cancellation notice ignored"),
            other => debug!(method = other, "ignoring notification"),
        }
    }

    fn dispatch(&self, request: RpcRequest) -> RpcResponse {
        debug!(method = %request.method, id = ?request.id, "dispatching request");

        let result = match request.method.as_str() {
            names::INITIALIZE => self.initialize(request.params),
            names::PING => Ok(Value::Object(serde_json::Map::new())),
            names::TOOLS_LIST => to_value(&ListToolsResult {
                tools: tools::descriptors(),
            }),
            names::TOOLS_CALL => self.call_tool(request.params),
            other => Err(RpcError::method_not_found(other)),
        };

        match result {
            Ok(value) => RpcResponse::success(request.id, value),
            Err(e) => {
                warn!(method = %request.method, code = %e.code, message = %e.message, "request failed");
                RpcResponse::error(request.id, e)
            }
        }
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params: InitializeParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| RpcError::invalid_params(format!("invalid initialize params: {}", e)))?;

        let version = negotiate_protocol_version(&params.protocol_version);
        info!(
            requested = %params.protocol_version,
            negotiated = version,
            client = params.client_info.as_ref().map(|c| c.name.as_str()).unwrap_or("unknown"),
            "initialize"
        );

        to_value(&InitializeResult {
            protocol_version: version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: self.info.clone(),
            instructions: Some(INSTRUCTIONS.to_string()),
        })
    }

    fn call_tool(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| RpcError::invalid_params(format!("invalid tools/call params: {}", e)))?;
        let result = tools::call(&self.tools, &params.name, params.arguments)?;
        to_value(&result)
    }

    fn write_response<W: Write>(&self, writer: &mut W, response: &RpcResponse) -> io::Result<()> {
        let json = serde_json::to_string(response)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{}", json)?;
        writer.flush()
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::internal(e.to_string()))
}
