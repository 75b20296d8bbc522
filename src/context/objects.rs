//! Registry of context object factories and the built-in object types.
//!
//! Generator properties of the form `context.objects.<name> = <Type>` ask for
//! an instance of `<Type>` to be bound as `<name>`. Types are looked up in an
//! [`ObjectRegistry`]; hosts register their own factories next to the
//! built-ins:
//!
//! | Type             | Methods                                                          |
//! |------------------|------------------------------------------------------------------|
//! | `StringUtils`    | `capitalize`, `uncapitalize`, `upper`, `lower`, `trim`, `replace`, `concat` |
//! | `FileUtil`       | `mkdir`                                                          |
//! | `PropertiesUtil` | `load`                                                           |

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result, anyhow};
use serde_json::Value;
use thiserror::Error;

use super::{ContextObject, required_str};
use crate::generator::GeneratorSettings;
use crate::properties::PropertyStore;
use crate::utils::absolute_path;

/// Builds a context object for one generation run.
pub type ObjectFactory =
    Arc<dyn Fn(&GeneratorSettings) -> Result<Arc<dyn ContextObject>> + Send + Sync>;

#[derive(Debug, Error)]
pub enum InstantiationError {
    #[error("No context object type registered under '{0}'")]
    UnknownType(String),

    #[error("Failed to instantiate context object type '{type_name}'")]
    FactoryFailed {
        type_name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Clone, Default)]
pub struct ObjectRegistry {
    factories: HashMap<String, ObjectFactory>,
}

impl ObjectRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `StringUtils`, `FileUtil` and `PropertiesUtil`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("StringUtils", |_| Ok(Arc::new(StringUtils) as Arc<dyn ContextObject>));
        registry.register("FileUtil", |settings| {
            Ok(Arc::new(FileUtil::new(settings.output_directory.clone())) as Arc<dyn ContextObject>)
        });
        registry.register("PropertiesUtil", |settings| {
            let store =
                PropertyStore::new(settings.template_path.clone(), settings.locator.clone());
            Ok(Arc::new(store) as Arc<dyn ContextObject>)
        });
        registry
    }

    /// Register (or replace) the factory for `type_name`.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&GeneratorSettings) -> Result<Arc<dyn ContextObject>> + Send + Sync + 'static,
    {
        self.factories.insert(type_name.into(), Arc::new(factory));
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    pub fn instantiate(
        &self,
        type_name: &str,
        settings: &GeneratorSettings,
    ) -> Result<Arc<dyn ContextObject>, InstantiationError> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| InstantiationError::UnknownType(type_name.to_string()))?;

        factory(settings).map_err(|source| InstantiationError::FactoryFailed {
            type_name: type_name.to_string(),
            source: source.into(),
        })
    }
}

impl fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ObjectRegistry").field("types", &names).finish()
    }
}

/// String helpers for templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringUtils;

impl StringUtils {
    fn capitalize(text: &str) -> String {
        let mut chars = text.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    fn uncapitalize(text: &str) -> String {
        let mut chars = text.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl ContextObject for StringUtils {
    fn type_name(&self) -> &str {
        "StringUtils"
    }

    fn invoke(&self, method: &str, args: &HashMap<String, Value>) -> Result<Value> {
        let text = match method {
            "capitalize" => Self::capitalize(&required_str(args, "text")?),
            "uncapitalize" => Self::uncapitalize(&required_str(args, "text")?),
            "upper" => required_str(args, "text")?.to_uppercase(),
            "lower" => required_str(args, "text")?.to_lowercase(),
            "trim" => required_str(args, "text")?.trim().to_string(),
            "replace" => required_str(args, "text")?
                .replace(&required_str(args, "from")?, &required_str(args, "to")?),
            "concat" => {
                let items = args
                    .get("items")
                    .and_then(Value::as_array)
                    .ok_or_else(|| anyhow!("concat requires an 'items' array"))?;
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            }
            other => return Err(anyhow!("StringUtils has no method '{}'", other)),
        };
        Ok(Value::String(text))
    }
}

/// Filesystem helpers scoped to the output directory.
#[derive(Debug, Clone)]
pub struct FileUtil {
    output_directory: PathBuf,
}

impl FileUtil {
    pub fn new(output_directory: PathBuf) -> Self {
        Self {
            output_directory,
        }
    }
}

impl ContextObject for FileUtil {
    fn type_name(&self) -> &str {
        "FileUtil"
    }

    fn invoke(&self, method: &str, args: &HashMap<String, Value>) -> Result<Value> {
        match method {
            "mkdir" => {
                let dir = absolute_path(&self.output_directory, &PathBuf::from(required_str(args, "dir")?));
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create directory {}", dir.display()))?;
                tracing::debug!("Created directory {}", dir.display());
                Ok(Value::String(String::new()))
            }
            other => Err(anyhow!("FileUtil has no method '{}'", other)),
        }
    }
}
