//! Configuration for the LLM endpoint and the AWS billing clients.

use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse_or, env_required};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_LLM_MODEL: &str = "mistral-large-latest";
pub const DEFAULT_LLM_API_URL: &str = "https://api.mistral.ai/v1/chat/completions";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Chat-completions endpoint settings
#[derive(Clone, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout", rename = "timeout_secs", with = "secs")]
    pub timeout: Duration,
}

// The API key never reaches the logs.
impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn default_model() -> String {
    DEFAULT_LLM_MODEL.to_string()
}

fn default_api_url() -> String {
    DEFAULT_LLM_API_URL.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS)
}

mod secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

impl FromEnv for LlmConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_key = env_required("LLM_API_KEY")?;
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingValue("LLM_API_KEY".to_string()));
        }

        Ok(Self {
            api_key,
            model: env_or_default("LLM_MODEL", DEFAULT_LLM_MODEL),
            api_url: env_or_default("LLM_API_URL", DEFAULT_LLM_API_URL),
            timeout: Duration::from_secs(env_parse_or(
                "LLM_TIMEOUT_SECS",
                DEFAULT_LLM_TIMEOUT_SECS,
            )?),
        })
    }
}

/// AWS credentials and region.
///
/// When either key is absent the default AWS credential chain is used.
#[derive(Clone, Deserialize)]
pub struct AwsConfig {
    #[serde(default, alias = "access_key")]
    pub access_key_id: Option<String>,
    #[serde(default, alias = "secret_key")]
    pub secret_access_key: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
}

impl std::fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "<redacted>"))
            .field("region", &self.region)
            .finish()
    }
}

fn default_region() -> String {
    DEFAULT_AWS_REGION.to_string()
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            access_key_id: None,
            secret_access_key: None,
            region: default_region(),
        }
    }
}

impl AwsConfig {
    /// Static key pair, if both halves are configured
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        let access = self.access_key_id.as_deref().filter(|k| !k.trim().is_empty())?;
        let secret = self.secret_access_key.as_deref().filter(|k| !k.trim().is_empty())?;
        Some((access, secret))
    }
}

impl FromEnv for AwsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            access_key_id: env_optional("AWS_ACCESS_KEY_ID"),
            secret_access_key: env_optional("AWS_SECRET_ACCESS_KEY"),
            region: env_or_default("AWS_REGION", DEFAULT_AWS_REGION),
        })
    }
}

/// Sections of the YAML config file consumed by this domain
#[derive(Debug, Clone, Deserialize)]
pub struct FinopsFileConfig {
    #[serde(alias = "mistral")]
    pub llm: LlmConfig,
    #[serde(default)]
    pub aws: AwsConfig,
}

impl FinopsFileConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.api_key.trim().is_empty() {
            return Err(ConfigError::MissingValue("llm.api_key".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_config_defaults() {
        temp_env::with_vars(
            [
                ("LLM_API_KEY", Some("secret")),
                ("LLM_MODEL", None),
                ("LLM_API_URL", None),
                ("LLM_TIMEOUT_SECS", None),
            ],
            || {
                let config = LlmConfig::from_env().unwrap();
                assert_eq!(config.model, DEFAULT_LLM_MODEL);
                assert_eq!(config.api_url, DEFAULT_LLM_API_URL);
                assert_eq!(config.timeout, Duration::from_secs(30));
            },
        );
    }

    #[test]
    fn test_llm_config_requires_api_key() {
        temp_env::with_var_unset("LLM_API_KEY", || {
            assert!(matches!(
                LlmConfig::from_env(),
                Err(ConfigError::MissingEnvVar(key)) if key == "LLM_API_KEY"
            ));
        });
        temp_env::with_var("LLM_API_KEY", Some(" "), || {
            assert!(LlmConfig::from_env().is_err());
        });
    }

    #[test]
    fn test_llm_config_rejects_bad_timeout() {
        temp_env::with_vars(
            [("LLM_API_KEY", Some("secret")), ("LLM_TIMEOUT_SECS", Some("fast"))],
            || {
                assert!(LlmConfig::from_env().is_err());
            },
        );
    }

    #[test]
    fn test_llm_config_debug_redacts_key() {
        let config = LlmConfig {
            api_key: "sk-very-secret".into(),
            model: default_model(),
            api_url: default_api_url(),
            timeout: default_timeout(),
        };
        assert!(!format!("{config:?}").contains("sk-very-secret"));
    }

    #[test]
    fn test_aws_config_from_env() {
        temp_env::with_vars(
            [
                ("AWS_ACCESS_KEY_ID", Some("AKIAEXAMPLE")),
                ("AWS_SECRET_ACCESS_KEY", Some("shh")),
                ("AWS_REGION", None),
            ],
            || {
                let config = AwsConfig::from_env().unwrap();
                assert_eq!(config.region, DEFAULT_AWS_REGION);
                assert_eq!(config.static_credentials(), Some(("AKIAEXAMPLE", "shh")));
            },
        );
    }

    #[test]
    fn test_aws_config_partial_keys_use_default_chain() {
        let config = AwsConfig {
            access_key_id: Some("AKIAEXAMPLE".into()),
            secret_access_key: None,
            region: default_region(),
        };
        assert_eq!(config.static_credentials(), None);
    }

    #[test]
    fn test_file_config_accepts_mistral_section() {
        let yaml = r#"
mistral:
  api_key: key-from-file
  model: mistral-small-latest
  api_url: https://api.mistral.ai/v1/chat/completions
aws:
  access_key: AKIAFILE
  secret_key: file-secret
  region: eu-west-1
"#;
        let config: FinopsFileConfig = serde_yaml_ng::from_str(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.llm.model, "mistral-small-latest");
        assert_eq!(config.llm.timeout, Duration::from_secs(30));
        assert_eq!(config.aws.region, "eu-west-1");
        assert_eq!(config.aws.static_credentials(), Some(("AKIAFILE", "file-secret")));
    }

    #[test]
    fn test_file_config_without_aws_section() {
        let yaml = "llm:\n  api_key: k\n  timeout_secs: 5\n";
        let config: FinopsFileConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.aws.region, DEFAULT_AWS_REGION);
        assert_eq!(config.llm.timeout, Duration::from_secs(5));
    }
}
