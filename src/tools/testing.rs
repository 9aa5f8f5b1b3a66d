//! Scripted runner for tool tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use xpresso_exec::{ExecOptions, ExecutionResult, LogCache, Runner};

use super::ToolContext;
use crate::config::Settings;

/// Returns queued results in order and records every command.
///
/// When the queue runs dry, commands succeed with empty output.
#[derive(Default)]
pub struct FakeRunner {
    results: Mutex<VecDeque<ExecutionResult>>,
    commands: Mutex<Vec<Vec<String>>>,
}

impl FakeRunner {
    pub fn new(results: Vec<ExecutionResult>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn context(results: Vec<ExecutionResult>) -> (ToolContext, Arc<FakeRunner>) {
        Self::context_with(results, Settings::default())
    }

    pub fn context_with(
        results: Vec<ExecutionResult>,
        settings: Settings,
    ) -> (ToolContext, Arc<FakeRunner>) {
        let runner = Arc::new(FakeRunner::new(results));
        let ctx = ToolContext::new(runner.clone(), Arc::new(LogCache::new()), settings);
        (ctx, runner)
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().unwrap().clone()
    }
}

impl Runner for FakeRunner {
    fn execute(&self, command: &[String], _options: &ExecOptions) -> ExecutionResult {
        self.commands.lock().unwrap().push(command.to_vec());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ok(""))
    }
}

pub fn ok(stdout: &str) -> ExecutionResult {
    ExecutionResult {
        stdout: stdout.to_string(),
        stderr: String::new(),
        exit_code: 0,
        success: true,
        timed_out: false,
        cancelled: false,
        duration_ms: 1,
    }
}

pub fn failed(exit_code: i32, stdout: &str, stderr: &str) -> ExecutionResult {
    ExecutionResult {
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        exit_code,
        success: false,
        timed_out: false,
        cancelled: false,
        duration_ms: 1,
    }
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
