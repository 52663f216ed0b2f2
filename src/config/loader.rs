//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ReloaderConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<ReloaderConfig, ConfigError> {
    let config: ReloaderConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ReloaderConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [reload]
            command = "true"

            [[apis]]
            id = "web"
            [[apis.servers]]
            host = "127.0.0.1"
            port = 8080
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.reload.command, "true");
        assert_eq!(config.apis[0].servers[0].port, 8080);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/reloader.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_validation_error_display() {
        let err = parse_config("[reload]\ntimeout_secs = 0\n").unwrap_err();
        assert!(err.to_string().starts_with("Validation failed: "));
        assert!(err.to_string().contains("reload.timeout_secs"));
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[[apis]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
