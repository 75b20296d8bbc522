//! Test utilities for texen
//!
//! Helpers shared by unit and integration tests: one-time logging setup and
//! [`TestProject`], a temporary directory laid out like a generation project.
//!
//! # Example
//!
//! ```rust,no_run
//! use texen::test_utils::TestProject;
//! use texen::task::GenerationTask;
//!
//! let project = TestProject::new().unwrap();
//! project.template("control.tera", "Hello").unwrap();
//!
//! let report = GenerationTask::new(project.task_config()).execute().unwrap();
//! assert_eq!(project.read_output("result.txt").unwrap(), "Hello");
//! # let _ = report;
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::TaskConfig;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`. With neither, logging stays
/// off.
///
/// ```bash
/// RUST_LOG=texen=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Directory name for templates inside a [`TestProject`].
pub const TEMPLATE_DIR: &str = "templates";
/// Directory name for output inside a [`TestProject`].
pub const OUTPUT_DIR: &str = "out";

/// A throwaway project directory.
///
/// Templates live under `templates/`, output goes to `out/`, and other files
/// (property files, task files) sit at the root.
pub struct TestProject {
    temp_dir: TempDir,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        init_test_logging(None);
        let temp_dir = TempDir::new().context("Failed to create temp directory")?;
        fs::create_dir_all(temp_dir.path().join(TEMPLATE_DIR))?;
        Ok(Self {
            temp_dir,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn template_dir(&self) -> PathBuf {
        self.path().join(TEMPLATE_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path().join(OUTPUT_DIR)
    }

    /// Write a template under `templates/`.
    pub fn template(&self, name: &str, body: &str) -> Result<PathBuf> {
        self.write_file(&Path::new(TEMPLATE_DIR).join(name), body.as_bytes())
    }

    /// Write a `.properties` file at the project root.
    pub fn properties(&self, name: &str, entries: &[(&str, &str)]) -> Result<PathBuf> {
        let body: String = entries.iter().map(|(key, value)| format!("{key}={value}\n")).collect();
        self.write_file(Path::new(name), body.as_bytes())
    }

    /// Write any file relative to the project root, creating parents.
    pub fn write_file(&self, relative: &Path, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// A complete task: `control.tera` from `templates/` into `out/result.txt`.
    pub fn task_config(&self) -> TaskConfig {
        TaskConfig {
            control_template: Some("control.tera".to_string()),
            template_path: Some(TEMPLATE_DIR.to_string()),
            output_directory: Some(PathBuf::from(OUTPUT_DIR)),
            output_file: Some("result.txt".to_string()),
            base_dir: Some(self.path().to_path_buf()),
            ..Default::default()
        }
    }

    /// Write `config` as `texen.toml` at the project root.
    ///
    /// `base_dir` is left out so it defaults to the project root.
    pub fn task_file(&self, config: &TaskConfig) -> Result<PathBuf> {
        let mut config = config.clone();
        config.base_dir = None;
        let body = toml::to_string(&config).context("Failed to serialize task config")?;
        self.write_file(Path::new(crate::config::DEFAULT_TASK_FILE), body.as_bytes())
    }

    pub fn output_exists(&self, name: &str) -> bool {
        self.output_dir().join(name).exists()
    }

    pub fn read_output(&self, name: &str) -> Result<String> {
        let path = self.output_dir().join(name);
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }
}
