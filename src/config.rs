use std::{env, net::SocketAddr, path::PathBuf};

use thiserror::Error;

use crate::{credentials::Credentials, domain::modules::EnabledModules};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_API_BASE_URL: &str = "https://api.dataforseo.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub default_credentials: Option<Credentials>,
    pub enabled_modules: EnabledModules,
    pub api_base_url: String,
    /// JSON file with per-tool response field allowlists.
    pub field_config_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PORT must be a valid u16")]
    InvalidPort,
    #[error("ENABLED_MODULES contains unknown module `{0}`")]
    UnknownModule(String),
    #[error("DATAFORSEO_API_URL must be an http(s) URL")]
    InvalidApiBaseUrl,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let port = non_empty("PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(DEFAULT_PORT);

        let default_credentials = match (
            non_empty("DATAFORSEO_USERNAME"),
            non_empty("DATAFORSEO_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)),
            (None, None) => None,
            _ => {
                tracing::warn!(
                    "only one of DATAFORSEO_USERNAME and DATAFORSEO_PASSWORD is set; default credentials disabled"
                );
                None
            }
        };

        let enabled_modules = match non_empty("ENABLED_MODULES") {
            Some(value) => EnabledModules::parse(&value)
                .map_err(|unknown| ConfigError::UnknownModule(unknown.0))?,
            None => EnabledModules::all(),
        };

        let api_base_url = non_empty("DATAFORSEO_API_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidApiBaseUrl);
        }

        let field_config_path = non_empty("FIELD_CONFIG_PATH").map(PathBuf::from);

        let config = Self {
            bind_addr,
            port,
            default_credentials,
            enabled_modules,
            api_base_url,
            field_config_path,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::domain::modules::ModuleKind;

    fn parse(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn parse_defaults() {
        let config = parse(&[]).expect("config should parse");

        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(config.default_credentials.is_none());
        assert_eq!(config.enabled_modules, EnabledModules::all());
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(config.field_config_path.is_none());
    }

    #[test]
    fn reads_field_config_path() {
        let config = parse(&[("FIELD_CONFIG_PATH", " /etc/seo/fields.json ")])
            .expect("config should parse");

        assert_eq!(
            config.field_config_path,
            Some(PathBuf::from("/etc/seo/fields.json"))
        );
    }

    #[test]
    fn reads_port_and_default_credentials() {
        let config = parse(&[
            ("PORT", "8081"),
            ("DATAFORSEO_USERNAME", "user"),
            ("DATAFORSEO_PASSWORD", "secret"),
        ])
        .expect("config should parse");

        assert_eq!(config.port, 8081);
        assert_eq!(
            config.default_credentials,
            Some(Credentials::new("user", "secret"))
        );
    }

    #[test]
    fn half_configured_defaults_are_ignored() {
        let config = parse(&[("DATAFORSEO_USERNAME", "user")]).expect("config should parse");
        assert!(config.default_credentials.is_none());
    }

    #[test]
    fn invalid_port_fails() {
        let err = parse(&[("PORT", "70000")]).expect_err("expected invalid port");
        assert!(matches!(err, ConfigError::InvalidPort));
    }

    #[test]
    fn enabled_modules_are_parsed() {
        let config = parse(&[("ENABLED_MODULES", "serp,onpage")]).expect("config should parse");

        assert!(config.enabled_modules.contains(ModuleKind::Serp));
        assert!(config.enabled_modules.contains(ModuleKind::OnPage));
        assert!(!config.enabled_modules.contains(ModuleKind::Backlinks));
    }

    #[test]
    fn unknown_module_fails() {
        let err = parse(&[("ENABLED_MODULES", "serp,nope")]).expect_err("unknown module");
        assert!(matches!(err, ConfigError::UnknownModule(name) if name == "nope"));
    }

    #[test]
    fn api_base_url_must_be_http() {
        let err = parse(&[("DATAFORSEO_API_URL", "ftp://example.com")])
            .expect_err("expected invalid url");
        assert!(matches!(err, ConfigError::InvalidApiBaseUrl));
    }

    #[test]
    fn invalid_bind_addr_fails() {
        let err = parse(&[("BIND_ADDR", "not an address")]).expect_err("invalid socket");
        assert!(matches!(err, ConfigError::InvalidSocket));
    }
}
