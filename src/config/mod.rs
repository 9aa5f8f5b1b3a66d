//! Configuration merge system
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. User config (`$XDG_CONFIG_HOME/xpresso/config.toml` or `~/.config/xpresso/config.toml`)
//! 3. Project config (`.xpresso/config.toml`, or `--config`)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;
mod settings;

pub use defaults::BuiltinDefaults;
pub use effective::{
    default_project_config_path, default_user_config_path, ConfigError, ConfigOrigin,
    ConfigSource, EffectiveConfig,
};
pub use merge::{deep_merge, merge_layers};
pub use settings::{LogSettings, OutputSettings, ProcessSettings, Settings, Timeouts, ToolPaths};
