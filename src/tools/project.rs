//! Project inspection: schemes, build settings, connected devices.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use xpresso_protocol::ops::CallToolResult;
use xpresso_protocol::RpcError;

use super::{input_schema, parse_args, ToolContext, ToolSpec};
use crate::xcode::{container_args, filter_lines, XcodebuildArgs};

pub const SCHEMES_NAME: &str = "xpresso_schemes";
pub const BUILD_SETTINGS_NAME: &str = "xpresso_build_settings";
pub const DEVICES_NAME: &str = "xpresso_devices";

pub const SCHEMES_TOOL: ToolSpec = ToolSpec {
    name: SCHEMES_NAME,
    title: "List Schemes",
    description: "List all available schemes, targets, and build configurations \
                  for an Xcode project or workspace.",
    schema: input_schema::<SchemesArgs>,
    handler: schemes_handler,
};

pub const BUILD_SETTINGS_TOOL: ToolSpec = ToolSpec {
    name: BUILD_SETTINGS_NAME,
    title: "Show Build Settings",
    description: "Show resolved build settings for a scheme. Useful for finding \
                  bundle IDs, SDK paths, derived data paths, etc.",
    schema: input_schema::<BuildSettingsArgs>,
    handler: build_settings_handler,
};

pub const DEVICES_TOOL: ToolSpec = ToolSpec {
    name: DEVICES_NAME,
    title: "List Connected Devices",
    description: "List connected physical Apple devices (iPhones, iPads, etc.) using devicectl.",
    schema: input_schema::<DevicesArgs>,
    handler: devices_handler,
};

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct SchemesArgs {
    /// Path to .xcodeproj file
    pub project: Option<String>,
    /// Path to .xcworkspace file
    pub workspace: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct BuildSettingsArgs {
    /// Path to .xcodeproj file
    pub project: Option<String>,
    /// Path to .xcworkspace file
    pub workspace: Option<String>,
    /// Scheme name
    pub scheme: String,
    /// Build configuration (Debug/Release)
    pub configuration: Option<String>,
    /// Filter settings by keyword (case-insensitive substring match)
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DevicesArgs {}

fn schemes_handler(ctx: &ToolContext, arguments: Value) -> Result<CallToolResult, RpcError> {
    let args: SchemesArgs = parse_args(SCHEMES_NAME, arguments)?;

    let mut command = ctx.xcodebuild(["-list"]);
    command.extend(container_args(&args.project, &args.workspace));

    let result = ctx.run(&command, ctx.settings().timeouts.query());
    if !result.success {
        return Ok(CallToolResult::error(format!(
            "Failed to list schemes.\n\n{}\n{}",
            result.stderr, result.stdout
        )));
    }
    Ok(CallToolResult::success(result.stdout.trim()))
}

fn build_settings_handler(ctx: &ToolContext, arguments: Value) -> Result<CallToolResult, RpcError> {
    let args: BuildSettingsArgs = parse_args(BUILD_SETTINGS_NAME, arguments)?;

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
    command.push("-showBuildSettings".to_string());

    let result = ctx.run(&command, ctx.settings().timeouts.query());
    if !result.success {
        return Ok(CallToolResult::error(format!(
            "Failed to get build settings.\n\n{}",
            result.stderr
        )));
    }

    let output = result.stdout.trim();
    let text = match args.filter.as_deref().filter(|f| !f.is_empty()) {
        Some(filter) => {
            let matched = filter_lines(output, filter);
            if matched.is_empty() {
                format!("No settings matching \"{}\" found.", filter)
            } else {
                matched
            }
        }
        None => output.to_string(),
    };
    Ok(CallToolResult::success(text))
}

fn devices_handler(ctx: &ToolContext, arguments: Value) -> Result<CallToolResult, RpcError> {
    let _: DevicesArgs = parse_args(DEVICES_NAME, arguments)?;
    let timeout = ctx.settings().timeouts.devices();

    let result = ctx.run(&ctx.xcrun(["devicectl", "list", "devices"]), timeout);
    if result.success {
        return Ok(CallToolResult::success(non_empty_or(
            &result.stdout,
            "No connected devices found.",
        )));
    }

    // devicectl ships with Xcode 15; older toolchains only have xctrace.
    debug!(exit_code = result.exit_code, "devicectl failed, trying xctrace");
    let fallback = ctx.run(&ctx.xcrun(["xctrace", "list", "devices"]), timeout);
    if fallback.success {
        return Ok(CallToolResult::success(non_empty_or(
            &fallback.stdout,
            "No devices found.",
        )));
    }

    Ok(CallToolResult::error(format!(
        "Failed to list devices.\n\n{}",
        result.stderr
    )))
}

fn non_empty_or(text: &str, placeholder: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        placeholder.to_string()
    } else {
        trimmed.to_string()
    }
}
