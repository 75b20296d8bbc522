//! Task configuration for texen
//!
//! A generation run is described by a [`TaskConfig`], read from a TOML task
//! file and/or assembled from command-line flags (flags win).
//!
//! # Task File (`texen.toml`)
//!
//! ```toml
//! control_template = "control.tera"
//! template_path = "templates, shared/templates"
//! output_directory = "generated"
//! output_file = "report.txt"
//! output_encoding = "UTF-8"
//! input_encoding = "ISO-8859-1"
//! context_properties = "project.properties, local.properties"
//! use_resource_locator = false
//! generator_properties = "texen-custom.properties"
//! ```
//!
//! Relative paths resolve against `base_dir`, which defaults to the directory
//! holding the task file (or the working directory when there is none).
//!
//! # Modules
//!
//! - `parser` - generic TOML parsing with file path context

mod parser;

pub use parser::parse_config;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::TexenError;
use crate::generator::split_template_path;
use crate::utils::absolute_path;

/// Default task file name looked up in the working directory.
pub const DEFAULT_TASK_FILE: &str = "texen.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Template rendered into `output_file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_template: Option<String>,

    /// Comma separated template directories, searched in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<PathBuf>,

    /// Name of the control template's output file under `output_directory`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_encoding: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_encoding: Option<String>,

    /// Comma separated property files coerced into the context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_properties: Option<String>,

    /// Look templates up through the resource locator when the template path
    /// misses, and allow running without a template path.
    #[serde(default)]
    pub use_resource_locator: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,

    /// Generator properties merged over the built-in defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_properties: Option<String>,
}

impl TaskConfig {
    /// Load a task file. `base_dir` defaults to the file's directory.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config: Self = parse_config(path)?;

        let file_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let file_dir = absolute_path(&std::env::current_dir().unwrap_or_default(), &file_dir);
        config.base_dir = Some(match config.base_dir.take() {
            Some(dir) => absolute_path(&file_dir, &dir),
            None => file_dir,
        });

        tracing::debug!("Loaded task configuration from {}", path.display());
        Ok(config)
    }

    /// Overlay every value set in `other`.
    pub fn merge(&mut self, other: TaskConfig) {
        fn overlay<T>(target: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *target = value;
            }
        }

        overlay(&mut self.control_template, other.control_template);
        overlay(&mut self.template_path, other.template_path);
        overlay(&mut self.output_directory, other.output_directory);
        overlay(&mut self.output_file, other.output_file);
        overlay(&mut self.output_encoding, other.output_encoding);
        overlay(&mut self.input_encoding, other.input_encoding);
        overlay(&mut self.context_properties, other.context_properties);
        overlay(&mut self.base_dir, other.base_dir);
        overlay(&mut self.generator_properties, other.generator_properties);
        self.use_resource_locator |= other.use_resource_locator;
    }

    /// Check required settings, in the order a run needs them.
    pub fn validate(&self) -> Result<(), TexenError> {
        if !self.use_resource_locator && is_blank(self.template_path.as_deref()) {
            return Err(TexenError::MissingTemplatePath);
        }
        if is_blank(self.control_template.as_deref()) {
            return Err(TexenError::MissingControlTemplate);
        }
        if self.output_directory.as_ref().is_none_or(|dir| dir.as_os_str().is_empty()) {
            return Err(TexenError::MissingOutputDirectory);
        }
        if is_blank(self.output_file.as_deref()) {
            return Err(TexenError::MissingOutputFile);
        }
        Ok(())
    }

    /// Directory relative paths resolve against.
    pub fn base_dir(&self) -> PathBuf {
        let cwd = std::env::current_dir().unwrap_or_default();
        match &self.base_dir {
            Some(dir) => absolute_path(&cwd, dir),
            None => cwd,
        }
    }

    pub fn template_directories(&self) -> Vec<PathBuf> {
        self.template_path
            .as_deref()
            .map(|path| split_template_path(path, &self.base_dir()))
            .unwrap_or_default()
    }

    pub fn context_property_sources(&self) -> Vec<String> {
        self.context_properties
            .as_deref()
            .map(|sources| {
                sources
                    .split(',')
                    .map(str::trim)
                    .filter(|source| !source.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Absolute output directory, if set.
    pub fn resolved_output_directory(&self) -> Option<PathBuf> {
        self.output_directory.as_ref().map(|dir| absolute_path(&self.base_dir(), dir))
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|text| text.trim().is_empty())
}
