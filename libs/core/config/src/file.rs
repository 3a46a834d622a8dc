//! YAML configuration files.
//!
//! Deployments that keep credentials in a `config.yml` next to the binary load
//! it through [`load_yaml`]; everything else goes through [`crate::FromEnv`].

use crate::{env_optional, ConfigError};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Read and deserialize a YAML file.
pub fn load_yaml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: display.clone(),
        details: e.to_string(),
    })?;

    serde_yaml_ng::from_str(&raw).map_err(|e| ConfigError::FileParse {
        path: display,
        details: e.to_string(),
    })
}

/// Resolve which config file to use, if any.
///
/// `CONFIG_FILE` wins when set. Otherwise [`DEFAULT_CONFIG_FILE`] is used when it
/// exists in the working directory. Returns `None` when configuration should
/// come from the environment only.
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = env_optional("CONFIG_FILE") {
        return Some(PathBuf::from(path));
    }

    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    default.is_file().then_some(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        #[serde(default)]
        retries: u32,
    }

    #[test]
    fn test_load_yaml_success() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name: billing\nretries: 3").unwrap();

        let sample: Sample = load_yaml(file.path()).unwrap();
        assert_eq!(
            sample,
            Sample {
                name: "billing".to_string(),
                retries: 3
            }
        );
    }

    #[test]
    fn test_load_yaml_missing_file() {
        let err = load_yaml::<Sample>("/definitely/not/here.yml").unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
        assert!(err.to_string().contains("/definitely/not/here.yml"));
    }

    #[test]
    fn test_load_yaml_invalid_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "retries: [not, a, number]").unwrap();

        let err = load_yaml::<Sample>(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::FileParse { .. }));
    }

    #[test]
    fn test_config_file_path_prefers_env() {
        temp_env::with_var("CONFIG_FILE", Some("/etc/cost-assistant/config.yml"), || {
            assert_eq!(
                config_file_path(),
                Some(PathBuf::from("/etc/cost-assistant/config.yml"))
            );
        });
    }
}
