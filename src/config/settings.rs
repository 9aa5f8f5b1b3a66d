//! Typed view of the merged configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use xpresso_exec::RunnerConfig;

use super::defaults::BuiltinDefaults;

/// Per-operation timeouts in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    pub build_seconds: u64,
    pub test_seconds: u64,
    pub clean_seconds: u64,
    pub query_seconds: u64,
    pub devices_seconds: u64,
    pub simctl_seconds: u64,
}

impl Timeouts {
    pub fn build(&self) -> Duration {
        Duration::from_secs(self.build_seconds)
    }

    pub fn test(&self) -> Duration {
        Duration::from_secs(self.test_seconds)
    }

    pub fn clean(&self) -> Duration {
        Duration::from_secs(self.clean_seconds)
    }

    pub fn query(&self) -> Duration {
        Duration::from_secs(self.query_seconds)
    }

    pub fn devices(&self) -> Duration {
        Duration::from_secs(self.devices_seconds)
    }

    pub fn simctl(&self) -> Duration {
        Duration::from_secs(self.simctl_seconds)
    }

    fn all(&self) -> [(&'static str, u64); 6] {
        [
            ("timeouts.build_seconds", self.build_seconds),
            ("timeouts.test_seconds", self.test_seconds),
            ("timeouts.clean_seconds", self.clean_seconds),
            ("timeouts.query_seconds", self.query_seconds),
            ("timeouts.devices_seconds", self.devices_seconds),
            ("timeouts.simctl_seconds", self.simctl_seconds),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    pub max_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSettings {
    pub termination_grace_ms: u64,
}

/// Executables invoked by the tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    pub xcodebuild: String,
    pub xcrun: String,
}

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub timeouts: Timeouts,
    pub output: OutputSettings,
    pub logs: LogSettings,
    pub process: ProcessSettings,
    pub tools: ToolPaths,
}

impl Default for Settings {
    fn default() -> Self {
        let d = BuiltinDefaults::default();
        Self {
            timeouts: Timeouts {
                build_seconds: d.build_seconds,
                test_seconds: d.test_seconds,
                clean_seconds: d.clean_seconds,
                query_seconds: d.query_seconds,
                devices_seconds: d.devices_seconds,
                simctl_seconds: d.simctl_seconds,
            },
            output: OutputSettings {
                max_chars: d.max_output_chars,
            },
            logs: LogSettings {
                capacity: d.log_capacity,
            },
            process: ProcessSettings {
                termination_grace_ms: d.termination_grace_ms,
            },
            tools: ToolPaths {
                xcodebuild: d.xcodebuild,
                xcrun: d.xcrun,
            },
        }
    }
}

impl Settings {
    /// Check value ranges, returning the offending key path and reason.
    pub fn validate(&self) -> Result<(), (String, String)> {
        for (key, seconds) in self.timeouts.all() {
            if seconds == 0 || seconds > 86_400 {
                return Err((key.to_string(), format!("must be in (0, 86400], got {}", seconds)));
            }
        }
        if self.output.max_chars == 0 {
            return Err(("output.max_chars".to_string(), "must be greater than 0".to_string()));
        }
        if self.logs.capacity == 0 {
            return Err(("logs.capacity".to_string(), "must be greater than 0".to_string()));
        }
        if self.tools.xcodebuild.trim().is_empty() {
            return Err(("tools.xcodebuild".to_string(), "must not be empty".to_string()));
        }
        if self.tools.xcrun.trim().is_empty() {
            return Err(("tools.xcrun".to_string(), "must not be empty".to_string()));
        }
        Ok(())
    }

    /// Process runner configuration derived from these settings.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            max_output_chars: self.output.max_chars,
            termination_grace: Duration::from_millis(self.process.termination_grace_ms),
            ..RunnerConfig::default()
        }
    }
}
