//! Text reports for tool results.

use xpresso_exec::ExecutionResult;
use xpresso_protocol::ops::CallToolResult;

/// stdout followed by a `STDERR:` section when stderr is non-empty.
pub fn combined_output(result: &ExecutionResult) -> String {
    if result.stderr.is_empty() {
        result.stdout.clone()
    } else {
        format!("{}\n\nSTDERR:\n{}", result.stdout, result.stderr)
    }
}

/// Headline describing how a command ended, e.g. `Build succeeded.`.
///
/// `succeeded` and `failed` are the verb phrases for each outcome, so tests
/// can read "Tests passed." and "Tests failed".
pub fn headline(subject: &str, succeeded: &str, failed: &str, result: &ExecutionResult) -> String {
    if result.success {
        format!("{} {}.", subject, succeeded)
    } else if result.timed_out {
        format!(
            "{} {} (timed out after {} ms, exit code {}).",
            subject, failed, result.duration_ms, result.exit_code
        )
    } else if result.cancelled {
        format!("{} {} (cancelled, exit code {}).", subject, failed, result.exit_code)
    } else {
        format!("{} {} (exit code {}).", subject, failed, result.exit_code)
    }
}

/// Headline plus the combined output, flagged as an error on failure.
pub fn outcome(subject: &str, succeeded: &str, failed: &str, result: &ExecutionResult) -> CallToolResult {
    let text = format!(
        "{}\n\n{}",
        headline(subject, succeeded, failed, result),
        combined_output(result)
    );
    if result.success {
        CallToolResult::success(text)
    } else {
        CallToolResult::error(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{failed, ok};

    #[test]
    fn test_combined_output_without_stderr() {
        assert_eq!(combined_output(&ok("done")), "done");
    }

    #[test]
    fn test_combined_output_with_stderr() {
        let result = failed(65, "compiling", "error: boom");
        assert_eq!(combined_output(&result), "compiling\n\nSTDERR:\nerror: boom");
    }

    #[test]
    fn test_headlines() {
        assert_eq!(headline("Build", "succeeded", "failed", &ok("")), "Build succeeded.");
        assert_eq!(
            headline("Build", "succeeded", "failed", &failed(65, "", "")),
            "Build failed (exit code 65)."
        );

        let mut timed_out = failed(143, "", "");
        timed_out.timed_out = true;
        timed_out.duration_ms = 600_000;
        assert_eq!(
            headline("Tests", "passed", "failed", &timed_out),
            "Tests failed (timed out after 600000 ms, exit code 143)."
        );
    }

    #[test]
    fn test_outcome_sets_error_flag() {
        let result = outcome("Clean", "succeeded", "failed", &failed(1, "out", ""));
        assert!(result.is_error);
        assert_eq!(result.text(), "Clean failed (exit code 1).\n\nout");

        let result = outcome("Clean", "succeeded", "failed", &ok("out"));
        assert!(!result.is_error);
        assert_eq!(result.text(), "Clean succeeded.\n\nout");
    }
}
