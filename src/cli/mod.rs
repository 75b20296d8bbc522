//! Command-line interface for texen.
//!
//! # Available Commands
//!
//! - `generate` - run a full generation: control template into the output
//!   file, worker templates into the files they name
//! - `render` - render one template and print the result to stdout
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only
//! - `--config` / `-c`: task file (defaults to `texen.toml` when present)
//!
//! `RUST_LOG` overrides the level chosen by the flags.
//!
//! # Examples
//!
//! ```bash
//! texen generate
//! texen -c tasks/schema.toml generate --output-file schema.sql
//! texen render greeting.tera --template-path templates --set name=World
//! ```

mod generate;
mod render;

pub use generate::GenerateCommand;
pub use render::RenderCommand;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::{DEFAULT_TASK_FILE, TaskConfig};

/// Process-wide settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: Option<String>,
    /// Task file to load.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the tracing subscriber. Logs go to stderr.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(self.log_level.as_deref().unwrap_or("info"))
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// The task file to use: `--config`, else `texen.toml` if it exists.
    ///
    /// An explicit path that does not exist is still returned so loading
    /// reports it.
    pub fn task_file(&self) -> Option<PathBuf> {
        match &self.config_path {
            Some(path) => Some(path.clone()),
            None => {
                let default = Path::new(DEFAULT_TASK_FILE);
                default.is_file().then(|| default.to_path_buf())
            }
        }
    }

    /// Load the task file, if any, then overlay `overrides`.
    pub fn load_task(&self, overrides: TaskConfig) -> Result<TaskConfig> {
        let mut config = match self.task_file() {
            Some(path) => TaskConfig::load_from(&path)?,
            None => TaskConfig::default(),
        };
        config.merge(overrides);
        Ok(config)
    }
}

#[derive(Parser)]
#[command(
    name = "texen",
    about = "Template-driven multi-file generator",
    version,
    long_about = "texen renders a control template and the worker templates it calls into one or more output files."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Task file (TOML)
    #[arg(short, long, global = true, env = "TEXEN_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a generation task
    Generate(GenerateCommand),

    /// Render a single template to stdout
    Render(RenderCommand),
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config)
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };

        CliConfig {
            log_level: Some(log_level.to_string()),
            config_path: self.config.clone(),
        }
    }

    pub fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Generate(cmd) => cmd.execute(&config),
            Commands::Render(cmd) => cmd.execute(&config),
        }
    }
}

/// Parse a `key=value` argument.
pub(crate) fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) =
        raw.split_once('=').ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_config_levels() {
        let cli = Cli::try_parse_from(["texen", "-v", "render", "t.tera"]).unwrap();
        assert_eq!(cli.build_config().log_level.as_deref(), Some("debug"));

        let cli = Cli::try_parse_from(["texen", "render", "t.tera", "--quiet"]).unwrap();
        assert_eq!(cli.build_config().log_level.as_deref(), Some("error"));

        let cli = Cli::try_parse_from(["texen", "-c", "task.toml", "generate"]).unwrap();
        let config = cli.build_config();
        assert_eq!(config.log_level.as_deref(), Some("info"));
        assert_eq!(config.config_path, Some(PathBuf::from("task.toml")));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["texen", "-v", "-q", "generate"]).is_err());
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("a=b=c").unwrap(), ("a".to_string(), "b=c".to_string()));
        assert_eq!(parse_key_value("flag=").unwrap(), ("flag".to_string(), String::new()));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
