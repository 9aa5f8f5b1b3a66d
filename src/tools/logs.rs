//! `xpresso_logs`

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use xpresso_protocol::ops::CallToolResult;
use xpresso_protocol::RpcError;

use super::{input_schema, parse_args, ToolContext, ToolSpec};

pub const NAME: &str = "xpresso_logs";

pub const TOOL: ToolSpec = ToolSpec {
    name: NAME,
    title: "Get Operation Logs",
    description: "Retrieve the output from the most recent xpresso operation (build, test, run, clean). \
                  Useful for reviewing full output after a build or test run.",
    schema: input_schema::<LogsArgs>,
    handler,
};

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct LogsArgs {
    /// Operation name (build, test, run, clean). If omitted, returns the most recent log.
    pub operation: Option<String>,
}

fn handler(ctx: &ToolContext, arguments: Value) -> Result<CallToolResult, RpcError> {
    let args: LogsArgs = parse_args(NAME, arguments)?;
    Ok(logs(ctx, args.operation.as_deref()))
}

pub fn logs(ctx: &ToolContext, operation: Option<&str>) -> CallToolResult {
    let keys = ctx.logs().list_keys();
    if keys.is_empty() {
        return CallToolResult::success(
            "No operation logs stored yet. Run a build, test, or other command first.",
        );
    }

    // An empty operation name means "most recent".
    let operation = operation.filter(|op| !op.is_empty());
    match ctx.logs().retrieve(operation) {
        Some(log) => CallToolResult::success(format!(
            "Log for \"{}\":\n\n{}",
            operation.unwrap_or("most recent"),
            log
        )),
        None => CallToolResult::success(format!(
            "No log found for \"{}\". Available logs: {}",
            operation.unwrap_or_default(),
            keys.join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::FakeRunner;

    #[test]
    fn test_empty_cache() {
        let (ctx, _) = FakeRunner::context(vec![]);
        let result = logs(&ctx, Some("build"));
        assert!(!result.is_error);
        assert!(result.text().starts_with("No operation logs stored yet."));
    }

    #[test]
    fn test_hit() {
        let (ctx, _) = FakeRunner::context(vec![]);
        ctx.logs().store("build", "** BUILD SUCCEEDED **");

        let result = logs(&ctx, Some("build"));
        assert_eq!(result.text(), "Log for \"build\":\n\n** BUILD SUCCEEDED **");
    }

    #[test]
    fn test_most_recent() {
        let (ctx, _) = FakeRunner::context(vec![]);
        ctx.logs().store("build", "B");
        ctx.logs().store("test", "T");

        assert_eq!(logs(&ctx, None).text(), "Log for \"most recent\":\n\nT");
        assert_eq!(logs(&ctx, Some("")).text(), "Log for \"most recent\":\n\nT");
    }

    #[test]
    fn test_miss_lists_available_keys() {
        let (ctx, _) = FakeRunner::context(vec![]);
        ctx.logs().store("build", "B");
        ctx.logs().store("clean", "C");

        let result = logs(&ctx, Some("run"));
        assert!(!result.is_error);
        assert_eq!(result.text(), "No log found for \"run\". Available logs: build, clean");
    }

    #[test]
    fn test_stored_empty_log_counts_as_found() {
        let (ctx, _) = FakeRunner::context(vec![]);
        ctx.logs().store("clean", "");
        assert_eq!(logs(&ctx, Some("clean")).text(), "Log for \"clean\":\n\n");
    }
}
