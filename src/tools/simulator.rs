//! Simulator tools: list, boot, shutdown.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use xpresso_protocol::ops::CallToolResult;
use xpresso_protocol::RpcError;

use super::{input_schema, parse_args, ToolContext, ToolSpec};

pub const LIST_NAME: &str = "xpresso_simulators";
pub const BOOT_NAME: &str = "xpresso_boot_simulator";
pub const SHUTDOWN_NAME: &str = "xpresso_shutdown_simulator";

const RUNTIME_PREFIX: &str = "com.apple.CoreSimulator.SimRuntime.";

pub const LIST_TOOL: ToolSpec = ToolSpec {
    name: LIST_NAME,
    title: "List Simulators",
    description: "List all available iOS/watchOS/tvOS simulators with their state and UDID.",
    schema: input_schema::<ListArgs>,
    handler: list_handler,
};

pub const BOOT_TOOL: ToolSpec = ToolSpec {
    name: BOOT_NAME,
    title: "Boot Simulator",
    description: "Boot a simulator by name or UDID.",
    schema: input_schema::<BootArgs>,
    handler: boot_handler,
};

pub const SHUTDOWN_TOOL: ToolSpec = ToolSpec {
    name: SHUTDOWN_NAME,
    title: "Shutdown Simulator",
    description: "Shutdown a running simulator by name or UDID. \
                  Pass \"all\" to shutdown all simulators.",
    schema: input_schema::<ShutdownArgs>,
    handler: shutdown_handler,
};

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListArgs {
    /// Only show available simulators (default: true)
    pub available: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BootArgs {
    /// Simulator name or UDID
    pub simulator: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ShutdownArgs {
    /// Simulator name, UDID, or "all" to shutdown everything
    pub simulator: String,
}

/// `simctl list devices --json` output. Runtime order is preserved.
#[derive(Debug, Deserialize)]
struct DeviceList {
    #[serde(default)]
    devices: IndexMap<String, Vec<SimDevice>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimDevice {
    name: String,
    udid: String,
    state: String,
    #[serde(default)]
    is_available: bool,
}

fn list_handler(ctx: &ToolContext, arguments: Value) -> Result<CallToolResult, RpcError> {
    let args: ListArgs = parse_args(LIST_NAME, arguments)?;
    let only_available = args.available.unwrap_or(true);

    let command = ctx.xcrun(["simctl", "list", "devices", "--json"]);
    let result = ctx.run(&command, ctx.settings().timeouts.simctl());
    if !result.success {
        return Ok(CallToolResult::error(format!(
            "Failed to list simulators.\n\n{}",
            result.stderr
        )));
    }

    match serde_json::from_str::<DeviceList>(&result.stdout) {
        Ok(list) => Ok(CallToolResult::success(format_devices(&list, only_available))),
        Err(e) => {
            warn!(error = %e, "unparseable simctl output, returning raw");
            Ok(CallToolResult::success(format!(
                "Simulators (raw):\n{}",
                result.stdout
            )))
        }
    }
}

fn format_devices(list: &DeviceList, only_available: bool) -> String {
    let mut sections = Vec::new();
    for (runtime, devices) in &list.devices {
        let shown: Vec<_> = devices
            .iter()
            .filter(|d| !only_available || d.is_available)
            .collect();
        if shown.is_empty() {
            continue;
        }

        let mut section = format!("{}:", runtime_name(runtime));
        for device in shown {
            section.push_str(&format!(
                "\n  {} ({}) - {}",
                device.name, device.udid, device.state
            ));
        }
        sections.push(section);
    }

    if sections.is_empty() {
        "No simulators found.".to_string()
    } else {
        sections.join("\n\n")
    }
}

/// `com.apple.CoreSimulator.SimRuntime.iOS-18-2` -> `iOS 18 2`
fn runtime_name(identifier: &str) -> String {
    identifier
        .strip_prefix(RUNTIME_PREFIX)
        .unwrap_or(identifier)
        .replace('-', " ")
}

fn boot_handler(ctx: &ToolContext, arguments: Value) -> Result<CallToolResult, RpcError> {
    let args: BootArgs = parse_args(BOOT_NAME, arguments)?;
    let sim = &args.simulator;

    let command = ctx.xcrun(["simctl", "boot", sim.as_str()]);
    let result = ctx.run(&command, ctx.settings().timeouts.simctl());

    Ok(if result.success {
        CallToolResult::success(format!("Simulator \"{}\" booted successfully.", sim))
    } else if result.stderr.contains("current state: Booted") {
        CallToolResult::success(format!("Simulator \"{}\" is already booted.", sim))
    } else {
        CallToolResult::error(format!(
            "Failed to boot simulator \"{}\".\n\n{}",
            sim, result.stderr
        ))
    })
}

fn shutdown_handler(ctx: &ToolContext, arguments: Value) -> Result<CallToolResult, RpcError> {
    let args: ShutdownArgs = parse_args(SHUTDOWN_NAME, arguments)?;
    let sim = &args.simulator;

    let command = ctx.xcrun(["simctl", "shutdown", sim.as_str()]);
    let result = ctx.run(&command, ctx.settings().timeouts.simctl());

    Ok(if result.success {
        CallToolResult::success(format!("Simulator \"{}\" shut down.", sim))
    } else if result.stderr.contains("current state: Shutdown") {
        CallToolResult::success(format!("Simulator \"{}\" is already shut down.", sim))
    } else {
        CallToolResult::error(format!(
            "Failed to shutdown simulator \"{}\".\n\n{}",
            sim, result.stderr
        ))
    })
}
