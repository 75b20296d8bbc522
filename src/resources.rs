//! Logical resource lookup: filesystem first, embedded resources second.
//!
//! The locator is how everything outside the template path finds its inputs:
//! generator default properties, context property files, and (when enabled)
//! templates that are not under any template directory. Relative names are
//! resolved against a base directory; when no file exists there, the
//! embedded resource table is consulted. The crate embeds
//! [`DEFAULTS_RESOURCE`]; hosts add their own with
//! [`ResourceLocator::with_resource`].

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::utils::absolute_path;

/// Name of the embedded generator defaults.
pub const DEFAULTS_RESOURCE: &str = "texen.properties";

const DEFAULT_PROPERTIES: &[u8] = include_bytes!("../resources/texen.properties");

#[derive(Debug, Clone)]
pub struct ResourceLocator {
    base_dir: PathBuf,
    embedded: HashMap<String, Arc<[u8]>>,
}

impl ResourceLocator {
    /// Create a locator rooted at `base_dir` carrying the built-in resources.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let mut embedded = HashMap::new();
        embedded.insert(DEFAULTS_RESOURCE.to_string(), Arc::from(DEFAULT_PROPERTIES));
        Self {
            base_dir: base_dir.into(),
            embedded,
        }
    }

    /// Register an embedded resource under a logical name.
    #[must_use]
    pub fn with_resource(mut self, name: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.add_resource(name, bytes);
        self
    }

    pub fn add_resource(&mut self, name: &str, bytes: impl Into<Vec<u8>>) {
        self.embedded.insert(normalize(name), Arc::from(bytes.into()));
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Filesystem location a name resolves to, whether or not it exists.
    pub fn resolve_path(&self, name: &str) -> PathBuf {
        absolute_path(&self.base_dir, Path::new(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.resolve_path(name).is_file() || self.embedded.contains_key(&normalize(name))
    }

    /// Read a resource, trying the filesystem before the embedded table.
    pub fn open_read(&self, name: &str) -> io::Result<Vec<u8>> {
        let path = self.resolve_path(name);
        match std::fs::read(&path) {
            Ok(bytes) => {
                tracing::debug!("Resolved resource '{}' to {}", name, path.display());
                Ok(bytes)
            }
            Err(fs_err) => match self.embedded.get(&normalize(name)) {
                Some(bytes) => {
                    tracing::debug!("Resolved resource '{}' from embedded resources", name);
                    Ok(bytes.to_vec())
                }
                None => Err(io::Error::new(
                    fs_err.kind(),
                    format!("resource '{}' not found at {} or in embedded resources", name, path.display()),
                )),
            },
        }
    }
}

fn normalize(name: &str) -> String {
    name.replace('\\', "/").trim_start_matches("./").trim_start_matches('/').to_string()
}
