//! `xpresso_run`: build, install and launch.
//!
//! iOS apps are built for a simulator destination, installed with
//! `simctl install` and launched with `simctl launch`, terminating a
//! previous instance first. macOS apps are built for `platform=macOS`,
//! a running copy is stopped with `pkill -x`, and the bundle is opened.
//!
//! The app bundle path and bundle identifier come from a single
//! `-showBuildSettings` query made with the same scheme, destination and
//! configuration as the build.

use std::time::Duration;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use xpresso_exec::ExecutionResult;
use xpresso_protocol::ops::CallToolResult;
use xpresso_protocol::RpcError;

use super::{input_schema, log_keys, parse_args, ToolContext, ToolSpec};
use crate::xcode::{app_bundle, extract_setting, XcodebuildArgs};

pub const NAME: &str = "xpresso_run";

/// Pause after stopping a macOS app before reopening it.
const RELAUNCH_DELAY: Duration = Duration::from_millis(500);

pub const TOOL: ToolSpec = ToolSpec {
    name: NAME,
    title: "Build & Run App",
    description: "Build and run an app. For iOS: builds for simulator, installs, and launches \
                  (simulator must be booted). For macOS: builds and opens the .app directly.",
    schema: input_schema::<RunArgs>,
    handler,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Ios,
    Macos,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunArgs {
    /// Path to .xcodeproj file
    pub project: Option<String>,
    /// Path to .xcworkspace file
    pub workspace: Option<String>,
    /// Build scheme name
    pub scheme: String,
    /// Target platform: "ios" (default) or "macos"
    pub platform: Option<Platform>,
    /// Simulator UDID or name to install and launch on (required for iOS)
    pub simulator: Option<String>,
    /// Build configuration (Debug/Release)
    pub configuration: Option<String>,
    /// App bundle identifier. If not provided, extracted from build settings.
    pub bundle_id: Option<String>,
}

impl RunArgs {
    fn xcodebuild_args(&self, destination: String) -> XcodebuildArgs {
        XcodebuildArgs {
            project: self.project.clone(),
            workspace: self.workspace.clone(),
            scheme: Some(self.scheme.clone()),
            destination: Some(destination),
            configuration: self.configuration.clone(),
            ..XcodebuildArgs::default()
        }
    }
}

fn handler(ctx: &ToolContext, arguments: Value) -> Result<CallToolResult, RpcError> {
    let args: RunArgs = parse_args(NAME, arguments)?;
    Ok(run(ctx, &args))
}

pub fn run(ctx: &ToolContext, args: &RunArgs) -> CallToolResult {
    match args.platform.unwrap_or_default() {
        Platform::Ios => match args.simulator.as_deref().filter(|s| !s.is_empty()) {
            Some(simulator) => run_ios(ctx, args, simulator),
            None => CallToolResult::error(
                "The \"simulator\" parameter is required when platform is \"ios\".",
            ),
        },
        Platform::Macos => run_macos(ctx, args),
    }
}

/// Accumulates step output and stores it under the `run` log key.
struct Steps<'a> {
    ctx: &'a ToolContext,
    lines: Vec<String>,
}

impl<'a> Steps<'a> {
    fn new(ctx: &'a ToolContext) -> Self {
        Self {
            ctx,
            lines: Vec::new(),
        }
    }

    fn push(&mut self, label: &str, stdout: &str) {
        self.lines.push(format!("{}:\n{}", label, stdout));
    }

    fn note(&mut self, line: String) {
        self.lines.push(line);
    }

    /// Store the log and return the joined output.
    fn finish(&self) -> String {
        let output = self.lines.join("\n\n");
        self.ctx.logs().store(log_keys::RUN, output.clone());
        output
    }

    fn failed(&self, headline: &str, result: &ExecutionResult) -> CallToolResult {
        let output = self.finish();
        CallToolResult::error(format!(
            "{}\n\n{}\n\nSTDERR:\n{}",
            headline, output, result.stderr
        ))
    }
}

/// Build, then query build settings. Returns the settings text on success.
fn build_and_query(
    ctx: &ToolContext,
    args: &RunArgs,
    destination: String,
    steps: &mut Steps<'_>,
) -> Result<String, CallToolResult> {
    let xcode_args = args.xcodebuild_args(destination);

    let mut build = ctx.xcodebuild(xcode_args.to_args());
    build.push("build".to_string());
    let result = ctx.run(&build, ctx.settings().timeouts.build());
    steps.push("BUILD", &result.stdout);
    if !result.success {
        let headline = format!("Build failed (exit code {}).", result.exit_code);
        return Err(steps.failed(&headline, &result));
    }

    let mut query = ctx.xcodebuild(xcode_args.to_args());
    query.push("-showBuildSettings".to_string());
    let settings = ctx.run(&query, ctx.settings().timeouts.query());
    if !settings.success {
        warn!(exit_code = settings.exit_code, "build settings query failed");
    }
    Ok(settings.stdout)
}

fn run_ios(ctx: &ToolContext, args: &RunArgs, simulator: &str) -> CallToolResult {
    let mut steps = Steps::new(ctx);
    let destination = format!("platform=iOS Simulator,id={}", simulator);

    let settings = match build_and_query(ctx, args, destination, &mut steps) {
        Ok(settings) => settings,
        Err(result) => return result,
    };

    let bundle_id = match args
        .bundle_id
        .clone()
        .filter(|id| !id.is_empty())
        .or_else(|| extract_setting(&settings, "PRODUCT_BUNDLE_IDENTIFIER"))
    {
        Some(id) => id,
        None => {
            steps.finish();
            return CallToolResult::error(
                "Build succeeded but could not determine bundle identifier. Provide bundleId parameter.",
            );
        }
    };

    let simctl_timeout = ctx.settings().timeouts.simctl();

    // Without a bundle path the app is assumed to be installed already.
    if let Some(bundle) = app_bundle(&settings) {
        let install = ctx.run(
            &ctx.xcrun(["simctl", "install", simulator, bundle.path.as_str()]),
            simctl_timeout,
        );
        steps.push("INSTALL", &install.stdout);
        if !install.success {
            return steps.failed("Install failed.", &install);
        }
    }

    let terminate = ctx.run(
        &ctx.xcrun(["simctl", "terminate", simulator, bundle_id.as_str()]),
        simctl_timeout,
    );
    if terminate.success {
        steps.note(format!("TERMINATE: Killed previous instance of {}", bundle_id));
    }

    let launch = ctx.run(
        &ctx.xcrun(["simctl", "launch", simulator, bundle_id.as_str()]),
        simctl_timeout,
    );
    steps.push("LAUNCH", &launch.stdout);
    if !launch.success {
        return steps.failed("Launch failed.", &launch);
    }

    let output = steps.finish();
    CallToolResult::success(format!(
        "App launched successfully ({} on {}).\n\n{}",
        bundle_id, simulator, output
    ))
}

fn run_macos(ctx: &ToolContext, args: &RunArgs) -> CallToolResult {
    let mut steps = Steps::new(ctx);

    let settings = match build_and_query(ctx, args, "platform=macOS".to_string(), &mut steps) {
        Ok(settings) => settings,
        Err(result) => return result,
    };

    let Some(bundle) = app_bundle(&settings) else {
        let output = steps.finish();
        return CallToolResult::error(format!(
            "Build succeeded but could not determine app path from build settings.\n\n{}",
            output
        ));
    };

    let query_timeout = ctx.settings().timeouts.query();

    let pkill: Vec<String> = ["pkill", "-x", bundle.target_name.as_str()]
        .iter()
        .map(|s| s.to_string())
        .collect();
    if ctx.run(&pkill, query_timeout).success {
        steps.note(format!(
            "TERMINATE: Killed previous instance of {}",
            bundle.target_name
        ));
        std::thread::sleep(RELAUNCH_DELAY);
    }

    let open = vec!["open".to_string(), bundle.path.clone()];
    let launch = ctx.run(&open, query_timeout);
    steps.push("LAUNCH", &launch.stdout);
    if !launch.success {
        return steps.failed("Launch failed.", &launch);
    }

    let output = steps.finish();
    CallToolResult::success(format!(
        "App launched successfully ({}).\n\n{}",
        bundle.path, output
    ))
}
