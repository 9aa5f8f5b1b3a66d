//! Error types for the JSON-RPC protocol.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// JSON-RPC error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ErrorCode {
    /// The message was not valid JSON.
    ParseError,
    /// Valid JSON, but not a valid request object.
    InvalidRequest,
    /// Unknown method.
    MethodNotFound,
    /// Invalid method parameters (including tool arguments).
    InvalidParams,
    /// Internal server failure.
    InternalError,
    /// Any other code received from a peer.
    Other(i32),
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::Other(code) => code,
        }
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            other => Self::Other(other),
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::InvalidRequest => write!(f, "INVALID_REQUEST"),
            Self::MethodNotFound => write!(f, "METHOD_NOT_FOUND"),
            Self::InvalidParams => write!(f, "INVALID_PARAMS"),
            Self::InternalError => write!(f, "INTERNAL_ERROR"),
            Self::Other(code) => write!(f, "ERROR_{}", code),
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct RpcError {
    pub code: ErrorCode,
    /// Single-line human-readable message.
    pub message: String,
    /// Optional machine-readable details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(code: ErrorCode, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::with_data(
            ErrorCode::MethodNotFound,
            format!("method not found: {}", method),
            serde_json::json!({ "method": method }),
        )
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::with_data(
            ErrorCode::InvalidParams,
            format!("unknown tool: {}", name),
            serde_json::json!({ "tool": name }),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}
