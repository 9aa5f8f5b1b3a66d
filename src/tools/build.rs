//! `xpresso_build`

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use xpresso_protocol::ops::CallToolResult;
use xpresso_protocol::RpcError;

use super::{input_schema, log_keys, parse_args, report, ToolContext, ToolSpec};
use crate::xcode::XcodebuildArgs;

pub const NAME: &str = "xpresso_build";

pub const TOOL: ToolSpec = ToolSpec {
    name: NAME,
    title: "Build Xcode Project",
    description: "Build an Xcode project or workspace with the specified scheme. \
                  Returns build output including warnings and errors.",
    schema: input_schema::<BuildArgs>,
    handler,
};

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildArgs {
    /// Path to .xcodeproj file
    pub project: Option<String>,
    /// Path to .xcworkspace file
    pub workspace: Option<String>,
    /// Build scheme name
    pub scheme: String,
    /// Build configuration (Debug/Release)
    pub configuration: Option<String>,
    /// Build destination (e.g. "platform=iOS Simulator,name=iPhone 16")
    pub destination: Option<String>,
    /// SDK to use (e.g. iphonesimulator, macosx)
    pub sdk: Option<String>,
    /// Custom derived data path
    pub derived_data_path: Option<String>,
    /// Additional xcodebuild arguments
    pub extra_args: Option<Vec<String>>,
}

impl BuildArgs {
    pub fn xcodebuild_args(&self) -> XcodebuildArgs {
        XcodebuildArgs {
            project: self.project.clone(),
            workspace: self.workspace.clone(),
            scheme: Some(self.scheme.clone()),
            destination: self.destination.clone(),
            configuration: self.configuration.clone(),
            sdk: self.sdk.clone(),
            derived_data_path: self.derived_data_path.clone(),
            extra_args: self.extra_args.clone().unwrap_or_default(),
        }
    }
}

fn handler(ctx: &ToolContext, arguments: Value) -> Result<CallToolResult, RpcError> {
    let args: BuildArgs = parse_args(NAME, arguments)?;
    Ok(build(ctx, &args))
}

pub fn build(ctx: &ToolContext, args: &BuildArgs) -> CallToolResult {
    let mut command = ctx.xcodebuild(args.xcodebuild_args().to_args());
    command.push("build".to_string());

    let result = ctx.run(&command, ctx.settings().timeouts.build());
    ctx.logs()
        .store(log_keys::BUILD, report::combined_output(&result));

    report::outcome("Build", "succeeded", "failed", &result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{failed, ok, strings, FakeRunner};
    use serde_json::json;

    #[test]
    fn test_build_command() {
        let (ctx, runner) = FakeRunner::context(vec![ok("** BUILD SUCCEEDED **")]);
        let args: BuildArgs = parse_args(
            NAME,
            json!({
                "project": "App.xcodeproj",
                "scheme": "App",
                "sdk": "iphonesimulator",
                "derivedDataPath": "/tmp/dd",
                "extraArgs": ["-quiet"]
            }),
        )
        .unwrap();

        let result = build(&ctx, &args);

        assert!(!result.is_error);
        assert_eq!(result.text(), "Build succeeded.\n\n** BUILD SUCCEEDED **");
        assert_eq!(
            runner.commands(),
            vec![strings(&[
                "xcodebuild",
                "-project",
                "App.xcodeproj",
                "-scheme",
                "App",
                "-sdk",
                "iphonesimulator",
                "-derivedDataPath",
                "/tmp/dd",
                "-quiet",
                "build",
            ])]
        );
    }

    #[test]
    fn test_failed_build_is_logged() {
        let (ctx, _) = FakeRunner::context(vec![failed(65, "Compiling", "error: missing ;")]);
        let args = BuildArgs {
            scheme: "App".to_string(),
            ..Default::default()
        };

        let result = build(&ctx, &args);

        assert!(result.is_error);
        assert!(result.text().starts_with("Build failed (exit code 65)."));
        assert_eq!(
            ctx.logs().retrieve(Some(log_keys::BUILD)).as_deref(),
            Some("Compiling\n\nSTDERR:\nerror: missing ;")
        );
    }
}
