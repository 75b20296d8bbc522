//! TOML parsing with file path context.

use anyhow::{Context, Result};
use std::path::Path;

use crate::core::TexenError;

/// Parse a TOML file into `T`.
///
/// A file that cannot be read fails with the path in the error context. A
/// file that does not deserialize fails with [`TexenError::ConfigParse`].
///
/// ```rust,no_run
/// use texen::config::{TaskConfig, parse_config};
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// let config: TaskConfig = parse_config(Path::new("texen.toml"))?;
/// println!("control template: {:?}", config.control_template);
/// # Ok(())
/// # }
/// ```
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: T = toml::from_str(&content).map_err(|err| TexenError::ConfigParse {
        path: path.display().to_string(),
        reason: err.message().to_string(),
    })?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct TestConfig {
        name: String,
        value: i32,
    }

    #[test]
    fn test_parse_config() {
        let temp = tempfile::tempdir().unwrap();
        let config_path = temp.path().join("test.toml");
        std::fs::write(&config_path, "name = \"test\"\nvalue = 42\n").unwrap();

        let config: TestConfig = parse_config(&config_path).unwrap();
        assert_eq!(config.name, "test");
        assert_eq!(config.value, 42);
    }

    #[test]
    fn test_parse_config_invalid_toml() {
        let temp = tempfile::tempdir().unwrap();
        let config_path = temp.path().join("bad.toml");
        std::fs::write(&config_path, "name = \"test\"\nvalue = \"not a number\"\n").unwrap();

        let err = parse_config::<TestConfig>(&config_path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TexenError>(),
            Some(TexenError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_parse_config_missing_file() {
        let err = parse_config::<TestConfig>(Path::new("/nonexistent/texen.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
