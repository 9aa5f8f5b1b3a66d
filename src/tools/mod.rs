//! Tool definitions.
//!
//! Each tool parses typed arguments, assembles one or more command lines,
//! runs them through the [`Runner`] and turns the results into a text
//! report. Operations that produce build output also store their report in
//! the shared [`LogCache`] under a fixed category.
//!
//! Invalid arguments and unknown tool names are protocol errors
//! (`INVALID_PARAMS`); a command that fails is a normal result with
//! `is_error` set.

use std::sync::Arc;
use std::time::Duration;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;
use xpresso_exec::{ExecOptions, ExecutionResult, LogCache, Runner};
use xpresso_protocol::ops::{CallToolResult, ToolDescriptor};
use xpresso_protocol::RpcError;

use crate::config::Settings;

pub mod build;
pub mod clean;
pub mod logs;
pub mod project;
pub mod report;
pub mod run;
pub mod simulator;

#[cfg(test)]
pub(crate) mod testing;

/// Log Cache categories.
pub mod log_keys {
    pub const BUILD: &str = "build";
    pub const TEST: &str = "test";
    pub const RUN: &str = "run";
    pub const CLEAN: &str = "clean";
}

type Handler = fn(&ToolContext, Value) -> Result<CallToolResult, RpcError>;

/// Static description of a tool.
#[derive(Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    schema: fn() -> Value,
    handler: Handler,
}

impl ToolSpec {
    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.to_string(),
            title: Some(self.title.to_string()),
            description: self.description.to_string(),
            input_schema: (self.schema)(),
        }
    }
}

/// All tools, in listing order.
pub const ALL: &[ToolSpec] = &[
    build::TOOL,
    test::TOOL,
    run::TOOL,
    simulator::LIST_TOOL,
    simulator::BOOT_TOOL,
    simulator::SHUTDOWN_TOOL,
    project::SCHEMES_TOOL,
    project::BUILD_SETTINGS_TOOL,
    project::DEVICES_TOOL,
    clean::TOOL,
    logs::TOOL,
];

pub fn find(name: &str) -> Option<&'static ToolSpec> {
    ALL.iter().find(|tool| tool.name == name)
}

pub fn descriptors() -> Vec<ToolDescriptor> {
    ALL.iter().map(ToolSpec::descriptor).collect()
}

/// Invoke a tool by name.
pub fn call(ctx: &ToolContext, name: &str, arguments: Option<Value>) -> Result<CallToolResult, RpcError> {
    let tool = find(name).ok_or_else(|| RpcError::unknown_tool(name))?;
    let arguments = match arguments {
        None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
        Some(value) => value,
    };
    info!(tool = name, "calling tool");
    let result = (tool.handler)(ctx, arguments)?;
    info!(tool = name, is_error = result.is_error, "tool finished");
    Ok(result)
}

/// Shared state handed to every tool.
#[derive(Clone)]
pub struct ToolContext {
    runner: Arc<dyn Runner>,
    logs: Arc<LogCache>,
    settings: Settings,
}

impl ToolContext {
    pub fn new(runner: Arc<dyn Runner>, logs: Arc<LogCache>, settings: Settings) -> Self {
        Self {
            runner,
            logs,
            settings,
        }
    }

    pub fn logs(&self) -> &LogCache {
        &self.logs
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// `xcodebuild` followed by `args`.
    pub(crate) fn xcodebuild<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        std::iter::once(self.settings.tools.xcodebuild.clone())
            .chain(args.into_iter().map(Into::into))
            .collect()
    }

    /// `xcrun` followed by `args`.
    pub(crate) fn xcrun<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        std::iter::once(self.settings.tools.xcrun.clone())
            .chain(args.into_iter().map(Into::into))
            .collect()
    }

    /// Run a command with a timeout.
    pub(crate) fn run(&self, command: &[String], timeout: Duration) -> ExecutionResult {
        info!(command = %command.join(" "), timeout_secs = timeout.as_secs(), "running command");
        self.runner
            .execute(command, &ExecOptions::with_timeout(timeout))
    }
}

/// Deserialize tool arguments.
pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, RpcError> {
    serde_json::from_value(arguments)
        .map_err(|e| RpcError::invalid_params(format!("invalid arguments for {}: {}", tool, e)))
}

/// JSON schema of an argument type, inlined and without metadata noise.
pub(crate) fn input_schema<T: JsonSchema>() -> Value {
    let mut settings = schemars::generate::SchemaSettings::draft07();
    settings.inline_subschemas = true;
    let mut schema = settings.into_generator().into_root_schema_for::<T>();

    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
        object.remove("definitions");
        object
            .entry("type")
            .or_insert_with(|| Value::String("object".to_string()));
    }
    schema.to_value()
}
