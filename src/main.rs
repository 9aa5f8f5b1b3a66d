//! xpresso CLI
//!
//! Entry point for the `xpresso` command-line tool.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use xpresso::config::{default_project_config_path, default_user_config_path, ConfigError};
use xpresso::{logging, tools, EffectiveConfig, LogCache, ProcessRunner, Server, Settings, ToolContext};

#[derive(Parser)]
#[command(name = "xpresso")]
#[command(about = "Xcode build, test and simulator tools over MCP stdio", version)]
struct Cli {
    /// Path to project config file (default: .xpresso/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Log filter for stderr output, e.g. "debug" (default: $RUST_LOG or "info")
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Maximum characters kept per output stream
    #[arg(long, global = true)]
    max_output_chars: Option<usize>,

    /// Number of operation logs kept in memory
    #[arg(long, global = true)]
    log_capacity: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdin/stdout (default)
    Serve,

    /// List the available tools
    Tools {
        /// Output full descriptors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration and its sources
    Config,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref());

    match cli.command {
        None | Some(Commands::Serve) => run_serve(&cli),
        Some(Commands::Tools { json }) => run_tools(json),
        Some(Commands::Config) => run_config(&cli),
    }
}

fn run_serve(cli: &Cli) {
    let settings = load_settings(cli);

    let runner = Arc::new(ProcessRunner::new(settings.runner_config()));
    let logs = Arc::new(LogCache::with_capacity(settings.logs.capacity));
    let server = Server::new(ToolContext::new(runner, logs, settings));

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "serving on stdio");
    if let Err(e) = server.run() {
        eprintln!("I/O error on stdio: {}", e);
        process::exit(1);
    }
}

fn run_tools(json: bool) {
    if json {
        match serde_json::to_string_pretty(&tools::descriptors()) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    for tool in tools::ALL {
        println!("{:<28} {}", tool.name, tool.title);
    }
}

fn run_config(cli: &Cli) {
    let effective = load_effective(cli);
    match serde_json::to_string_pretty(&effective) {
        Ok(out) => println!("{}", out),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn load_settings(cli: &Cli) -> Settings {
    match load_effective(cli).settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    }
}

fn load_effective(cli: &Cli) -> EffectiveConfig {
    match build_effective(cli) {
        Ok(effective) => effective,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    }
}

fn build_effective(cli: &Cli) -> Result<EffectiveConfig, ConfigError> {
    // An explicitly named config file must exist; the default one may not.
    let project = match &cli.config {
        Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.clone())),
        Some(path) => path.clone(),
        None => default_project_config_path(),
    };
    let user = default_user_config_path();

    EffectiveConfig::build(user.as_deref(), Some(&project), cli_overrides(cli))
}

fn cli_overrides(cli: &Cli) -> Option<serde_json::Value> {
    let mut overrides = serde_json::Map::new();
    if let Some(max_chars) = cli.max_output_chars {
        overrides.insert("output".to_string(), serde_json::json!({ "max_chars": max_chars }));
    }
    if let Some(capacity) = cli.log_capacity {
        overrides.insert("logs".to_string(), serde_json::json!({ "capacity": capacity }));
    }
    if overrides.is_empty() {
        None
    } else {
        Some(serde_json::Value::Object(overrides))
    }
}
