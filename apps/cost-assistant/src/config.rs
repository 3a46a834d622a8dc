use core_config::file::{config_file_path, load_yaml};
use core_config::{AppInfo, ConfigError, FromEnv, app_info, env_or_default, server::ServerConfig};
use domain_finops::{AwsConfig, FinopsFileConfig, LlmConfig};
use std::path::PathBuf;

// Re-export Environment for use in other modules
pub use core_config::Environment;

/// Where the landing page and static assets live
#[derive(Clone, Debug)]
pub struct AssetsConfig {
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl FromEnv for AssetsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            templates_dir: PathBuf::from(env_or_default("TEMPLATES_DIR", "templates")),
            static_dir: PathBuf::from(env_or_default("STATIC_DIR", "static")),
        })
    }
}

/// Which source the LLM and AWS settings came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Environment,
}

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub server: ServerConfig,
    pub environment: Environment,
    pub assets: AssetsConfig,
    pub llm: LlmConfig,
    pub aws: AwsConfig,
    pub source: ConfigSource,
}

impl Config {
    /// Load configuration.
    ///
    /// LLM and AWS settings come from the YAML file when one is configured
    /// (`CONFIG_FILE`, or `config.yml` in the working directory), otherwise
    /// from environment variables.
    pub fn load() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?; // Uses defaults: HOST=0.0.0.0, PORT=8080
        let assets = AssetsConfig::from_env()?;

        let (llm, aws, source) = match config_file_path() {
            Some(path) => {
                let file: FinopsFileConfig = load_yaml(&path)?;
                file.validate()?;
                (file.llm, file.aws, ConfigSource::File(path))
            }
            None => (
                LlmConfig::from_env()?, // Required - will fail if LLM_API_KEY is not set
                AwsConfig::from_env()?,
                ConfigSource::Environment,
            ),
        };

        Ok(Self {
            app: app_info!(),
            server,
            environment,
            assets,
            llm,
            aws,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("CONFIG_FILE", None),
                ("LLM_API_KEY", Some("env-key")),
                ("LLM_MODEL", Some("mistral-small-latest")),
                ("AWS_REGION", Some("eu-central-1")),
                ("PORT", Some("9090")),
                ("TEMPLATES_DIR", None),
            ],
            || {
                // Only meaningful when no config.yml sits in the working directory.
                if std::path::Path::new(core_config::file::DEFAULT_CONFIG_FILE).exists() {
                    return;
                }

                let config = Config::load().unwrap();
                assert_eq!(config.source, ConfigSource::Environment);
                assert_eq!(config.llm.model, "mistral-small-latest");
                assert_eq!(config.aws.region, "eu-central-1");
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.assets.templates_dir, PathBuf::from("templates"));
                assert_eq!(config.app.name, "cost_assistant");
            },
        );
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "mistral:\n  api_key: file-key\n  model: mistral-large-latest\naws:\n  access_key: AKIAFILE\n  secret_key: s3cr3t\n  region: us-west-2"
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        temp_env::with_vars(
            [("CONFIG_FILE", Some(path.as_str())), ("LLM_API_KEY", None)],
            || {
                let config = Config::load().unwrap();
                assert_eq!(config.source, ConfigSource::File(PathBuf::from(&path)));
                assert_eq!(config.llm.api_key, "file-key");
                assert_eq!(config.aws.region, "us-west-2");
                assert_eq!(config.aws.static_credentials(), Some(("AKIAFILE", "s3cr3t")));
            },
        );
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        temp_env::with_var("CONFIG_FILE", Some("/nonexistent/config.yml"), || {
            assert!(Config::load().is_err());
        });
    }
}
