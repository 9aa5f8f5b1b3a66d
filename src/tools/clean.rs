//! `xpresso_clean`

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use xpresso_protocol::ops::CallToolResult;
use xpresso_protocol::RpcError;

use super::{input_schema, log_keys, parse_args, report, ToolContext, ToolSpec};
use crate::xcode::XcodebuildArgs;

pub const NAME: &str = "xpresso_clean";

pub const TOOL: ToolSpec = ToolSpec {
    name: NAME,
    title: "Clean Build Folder",
    description: "Clean the build folder for a project/workspace scheme. \
                  Removes derived data and build artifacts.",
    schema: input_schema::<CleanArgs>,
    handler,
};

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CleanArgs {
    /// Path to .xcodeproj file
    pub project: Option<String>,
    /// Path to .xcworkspace file
    pub workspace: Option<String>,
    /// Scheme name to clean
    pub scheme: String,
    /// Build configuration (Debug/Release)
    pub configuration: Option<String>,
}

fn handler(ctx: &ToolContext, arguments: Value) -> Result<CallToolResult, RpcError> {
    let args: CleanArgs = parse_args(NAME, arguments)?;

    let mut command = ctx.xcodebuild(
        XcodebuildArgs {
            project: args.project,
            workspace: args.workspace,
            scheme: Some(args.scheme),
            configuration: args.configuration,
            ..XcodebuildArgs::default()
        }
        .to_args(),
    );
    command.push("clean".to_string());

    let result = ctx.run(&command, ctx.settings().timeouts.clean());
    ctx.logs()
        .store(log_keys::CLEAN, report::combined_output(&result));

    Ok(report::outcome("Clean", "succeeded", "failed", &result))
}
