//! Layered construction of a run's rendering context.

use std::path::{Path, PathBuf};

use super::{Context, ContextValue};
use crate::core::TexenError;
use crate::encoding::Encoding;
use crate::generator::Generator;
use crate::properties::PropertySet;
use crate::utils::absolute_path;

/// Keys owned by the generator default layer.
pub const RESERVED_KEYS: [&str; 2] = ["generator", "outputDirectory"];

const FILE_CONTENTS_SUFFIX: &str = "file.contents";

/// Builds a [`Context`] one layer at a time.
///
/// Layers are applied in call order and later layers overwrite earlier ones
/// key by key, with one exception: typed properties never replace a
/// [reserved key](RESERVED_KEYS).
#[derive(Debug, Default)]
pub struct ContextBuilder {
    context: Context,
}

impl ContextBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `generator` and `outputDirectory`.
    #[must_use]
    pub fn with_defaults(mut self, generator: &Generator) -> Self {
        generator.fill_context_defaults(&mut self.context);
        self
    }

    /// Instantiate every object named by a `context.objects.*` property.
    #[must_use]
    pub fn with_registered_objects(mut self, generator: &Generator) -> Self {
        generator.fill_context_properties(&mut self.context);
        self
    }

    /// Copy the caller's bindings over what is already there.
    #[must_use]
    pub fn with_caller(mut self, caller: Context) -> Self {
        self.context.extend(caller);
        self
    }

    /// Coerce each property into a typed value and bind it.
    ///
    /// `*.file.contents` values are read relative to `base_dir`; a file that
    /// cannot be read fails the whole layer.
    pub fn with_typed_properties(
        mut self,
        properties: &PropertySet,
        base_dir: &Path,
    ) -> Result<Self, TexenError> {
        for (key, value) in properties.iter() {
            let (name, typed) = coerce_property(key, value, base_dir)?;
            if RESERVED_KEYS.contains(&name.as_str()) {
                tracing::warn!("Ignoring context property '{}': '{}' is reserved", key, name);
                continue;
            }
            tracing::debug!("Context property {} = {:?}", name, typed);
            self.context.insert(name, typed);
        }
        Ok(self)
    }

    #[must_use]
    pub fn build(self) -> Context {
        self.context
    }
}

/// Turn one `key=value` property into a context binding.
///
/// Tried in order: a 32-bit integer, a boolean word (`true`, `on`, `yes` and
/// their negatives), then a key ending in `file.contents`, which binds the
/// text of the named file under the key with that suffix removed
/// (`license.file.contents` becomes `license`). Anything else is bound as
/// the raw string.
pub fn coerce_property(
    key: &str,
    value: &str,
    base_dir: &Path,
) -> Result<(String, ContextValue), TexenError> {
    if let Ok(number) = value.parse::<i32>() {
        return Ok((key.to_string(), ContextValue::from(number)));
    }

    if let Some(flag) = PropertySet::test_boolean(value) {
        return Ok((key.to_string(), ContextValue::Boolean(flag)));
    }

    if key.ends_with(FILE_CONTENTS_SUFFIX) {
        let name = file_contents_key(key)?;
        let path = absolute_path(base_dir, &PathBuf::from(value));
        let bytes = std::fs::read(&path).map_err(|source| TexenError::Io {
            operation: "read context property file".to_string(),
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!("Bound contents of {} to '{}'", path.display(), name);
        return Ok((name, ContextValue::String(Encoding::PlatformDefault.decode(&bytes))));
    }

    Ok((key.to_string(), ContextValue::String(value.to_string())))
}

/// Strip `file.contents` and the separator before it.
fn file_contents_key(key: &str) -> Result<String, TexenError> {
    let invalid = |reason: &str| TexenError::InvalidContextProperty {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let position = key.find(FILE_CONTENTS_SUFFIX).unwrap_or_default();
    if position == 0 {
        return Err(invalid("a file.contents key needs a name before the suffix"));
    }

    let mut name = key[..position].to_string();
    name.pop();
    if name.is_empty() {
        return Err(invalid("the name before file.contents is empty"));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_integer_then_boolean_then_string() {
        let base = Path::new(".");

        assert_eq!(coerce_property("count", "42", base).unwrap().1, ContextValue::Integer(42));
        assert_eq!(coerce_property("neg", "-7", base).unwrap().1, ContextValue::Integer(-7));
        assert_eq!(coerce_property("flag", "TRUE", base).unwrap().1, ContextValue::Boolean(true));
        assert_eq!(coerce_property("flag", "off", base).unwrap().1, ContextValue::Boolean(false));
        assert_eq!(
            coerce_property("word", "notabool", base).unwrap().1,
            ContextValue::from("notabool")
        );
        // Outside the 32-bit range
        assert_eq!(
            coerce_property("big", "4294967296", base).unwrap().1,
            ContextValue::from("4294967296")
        );
    }

    #[test]
    fn test_file_contents_binds_file_text() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("LICENSE.txt"), "Licensed under MIT").unwrap();

        let (key, value) =
            coerce_property("license.file.contents", "LICENSE.txt", temp.path()).unwrap();
        assert_eq!(key, "license");
        assert_eq!(value, ContextValue::from("Licensed under MIT"));
    }

    #[test]
    fn test_numeric_value_never_reads_a_file() {
        let temp = TempDir::new().unwrap();
        let (key, value) = coerce_property("size.file.contents", "12", temp.path()).unwrap();
        assert_eq!(key, "size.file.contents");
        assert_eq!(value, ContextValue::Integer(12));
    }

    #[test]
    fn test_bare_file_contents_key_rejected() {
        let temp = TempDir::new().unwrap();
        let err = coerce_property("file.contents", "a.txt", temp.path()).unwrap_err();
        assert!(matches!(err, TexenError::InvalidContextProperty { .. }));

        let err = coerce_property(".file.contents", "a.txt", temp.path()).unwrap_err();
        assert!(matches!(err, TexenError::InvalidContextProperty { .. }));
    }

    #[test]
    fn test_unreadable_file_contents_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = coerce_property("notes.file.contents", "missing.txt", temp.path()).unwrap_err();
        assert!(matches!(err, TexenError::Io { .. }));
    }

    #[test]
    fn test_typed_layer_skips_reserved_keys() {
        let temp = TempDir::new().unwrap();
        let properties = PropertySet::parse("generator=x\noutputDirectory=/tmp\nname=users\n");

        let mut caller = Context::new();
        caller.insert("name", "caller");
        caller.insert("kept", true);

        let context = ContextBuilder::new()
            .with_caller(caller)
            .with_typed_properties(&properties, temp.path())
            .unwrap()
            .build();

        assert!(!context.contains_key("generator"));
        assert!(!context.contains_key("outputDirectory"));
        assert_eq!(context.get("name"), Some(&ContextValue::from("users")));
        assert_eq!(context.get("kept"), Some(&ContextValue::Boolean(true)));
    }
}
