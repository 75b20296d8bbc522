//! Best-effort property file loading.
//!
//! Loading never fails from the caller's point of view: every attempt yields
//! a [`PropertyLoad`], and an unavailable source counts as an empty
//! [`PropertySet`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use serde_json::Value;

use super::PropertySet;
use crate::context::{ContextObject, required_str};
use crate::resources::ResourceLocator;

/// Prefixes that stand for "the template path" inside a property file name.
///
/// Templates commonly build names such as `$generator.templatePath/db.properties`;
/// resource lookups strip the prefix and resolve the remainder directly.
pub const TEMPLATE_PATH_PLACEHOLDERS: [&str; 2] =
    ["$generator.templatePath/", "{{ generator.templatePath }}/"];

/// Outcome of a single load attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyLoad {
    Loaded(PropertySet),
    Unavailable { source: String, reason: String },
}

impl PropertyLoad {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// The loaded set, or an empty set for an unavailable source.
    #[must_use]
    pub fn into_set(self) -> PropertySet {
        match self {
            Self::Loaded(set) => set,
            Self::Unavailable {
                source,
                reason,
            } => {
                tracing::debug!("Properties '{}' unavailable: {}", source, reason);
                PropertySet::new()
            }
        }
    }
}

/// Locates and loads property files for templates and the generator.
#[derive(Debug, Clone)]
pub struct PropertyStore {
    template_path: Option<String>,
    locator: ResourceLocator,
}

impl PropertyStore {
    /// `template_path` is a comma-separated directory list; `None` routes
    /// every lookup through the locator.
    pub fn new(template_path: Option<String>, locator: ResourceLocator) -> Self {
        Self {
            template_path: template_path.filter(|path| !path.trim().is_empty()),
            locator,
        }
    }

    pub fn template_path(&self) -> Option<&str> {
        self.template_path.as_deref()
    }

    pub fn load(&self, properties_file: &str) -> PropertySet {
        if self.template_path.is_some() {
            self.load_from_template_path(properties_file)
        } else {
            self.load_from_classpath(properties_file)
        }
    }

    /// Try each template directory in order; the first readable file wins.
    pub fn load_from_template_path(&self, properties_file: &str) -> PropertySet {
        let Some(template_path) = self.template_path.as_deref() else {
            return PropertySet::new();
        };

        for directory in template_path.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            let candidate = if properties_file.starts_with(directory) {
                PathBuf::from(properties_file)
            } else {
                Path::new(directory).join(properties_file)
            };

            match load_file(&candidate) {
                PropertyLoad::Loaded(set) => {
                    tracing::debug!("Loaded properties from {}", candidate.display());
                    return set;
                }
                PropertyLoad::Unavailable {
                    reason,
                    ..
                } => {
                    tracing::debug!("Skipping {}: {}", candidate.display(), reason);
                }
            }
        }

        PropertySet::new()
    }

    /// Resolve through the resource locator, after stripping a template path
    /// placeholder prefix.
    pub fn load_from_classpath(&self, properties_file: &str) -> PropertySet {
        let name = TEMPLATE_PATH_PLACEHOLDERS
            .iter()
            .find_map(|prefix| properties_file.strip_prefix(prefix))
            .unwrap_or(properties_file);

        self.load_resource(name).into_set()
    }

    /// Load one named resource through the locator.
    pub fn load_resource(&self, name: &str) -> PropertyLoad {
        match self.locator.open_read(name) {
            Ok(bytes) => PropertyLoad::Loaded(PropertySet::from_bytes(&bytes)),
            Err(err) => PropertyLoad::Unavailable {
                source: name.to_string(),
                reason: err.to_string(),
            },
        }
    }
}

fn load_file(path: &Path) -> PropertyLoad {
    match std::fs::read(path) {
        Ok(bytes) => PropertyLoad::Loaded(PropertySet::from_bytes(&bytes)),
        Err(err) => PropertyLoad::Unavailable {
            source: path.display().to_string(),
            reason: err.to_string(),
        },
    }
}

impl ContextObject for PropertyStore {
    fn type_name(&self) -> &str {
        "PropertiesUtil"
    }

    fn invoke(&self, method: &str, args: &HashMap<String, Value>) -> Result<Value> {
        match method {
            "load" => Ok(self.load(&required_str(args, "file")?).to_json()),
            other => Err(anyhow!("PropertiesUtil has no method '{}'", other)),
        }
    }
}
