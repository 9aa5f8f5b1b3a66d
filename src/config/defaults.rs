//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// xcodebuild build / run build step (default: 600 = 10 minutes)
    pub build_seconds: u64,

    /// xcodebuild test (default: 900 = 15 minutes)
    pub test_seconds: u64,

    /// xcodebuild clean (default: 120)
    pub clean_seconds: u64,

    /// -list and -showBuildSettings queries (default: 30)
    pub query_seconds: u64,

    /// devicectl / xctrace device listing (default: 15)
    pub devices_seconds: u64,

    /// simctl boot, shutdown, install, launch (default: 120)
    pub simctl_seconds: u64,

    /// Per-stream output cap in characters (default: 100000)
    pub max_output_chars: usize,

    /// Number of operation logs kept (default: 10)
    pub log_capacity: usize,

    /// Time between SIGTERM and SIGKILL on timeout (default: 2000)
    pub termination_grace_ms: u64,

    /// xcodebuild executable
    pub xcodebuild: String,

    /// xcrun executable
    pub xcrun: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            build_seconds: 600,
            test_seconds: 900,
            clean_seconds: 120,
            query_seconds: 30,
            devices_seconds: 15,
            simctl_seconds: 120,
            max_output_chars: 100_000,
            log_capacity: 10,
            termination_grace_ms: 2000,
            xcodebuild: "xcodebuild".to_string(),
            xcrun: "xcrun".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "timeouts": {
                "build_seconds": self.build_seconds,
                "test_seconds": self.test_seconds,
                "clean_seconds": self.clean_seconds,
                "query_seconds": self.query_seconds,
                "devices_seconds": self.devices_seconds,
                "simctl_seconds": self.simctl_seconds
            },
            "output": {
                "max_chars": self.max_output_chars
            },
            "logs": {
                "capacity": self.log_capacity
            },
            "process": {
                "termination_grace_ms": self.termination_grace_ms
            },
            "tools": {
                "xcodebuild": self.xcodebuild,
                "xcrun": self.xcrun
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.build_seconds, 600);
        assert_eq!(defaults.test_seconds, 900);
        assert_eq!(defaults.clean_seconds, 120);
        assert_eq!(defaults.max_output_chars, 100_000);
        assert_eq!(defaults.log_capacity, 10);
    }

    #[test]
    fn test_to_value() {
        let value = BuiltinDefaults::default().to_value();

        assert_eq!(value["timeouts"]["test_seconds"], 900);
        assert_eq!(value["output"]["max_chars"], 100_000);
        assert_eq!(value["tools"]["xcrun"], "xcrun");
    }
}
