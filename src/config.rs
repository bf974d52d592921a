use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use url::Url;

use crate::jsonapi::{JsonApiConfig, ValidationMode, document::Meta};

#[derive(Parser, Debug)]
#[command(name = "burger")]
#[command(about = "Runs the burger API service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".burger")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    database: String,
    #[serde(default = "default_host")]
    host: String,
    port: u16,
}

impl App {
    pub fn get_db(&self) -> &str {
        &self.database
    }

    pub fn get_host(&self) -> &str {
        &self.host
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Response document settings.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct JsonApiSection {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub validation: ValidationMode,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub app: App,
    #[serde(default)]
    pub jsonapi: JsonApiSection,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path).with_context(|| format!("failed to read config file {}", path))?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Config> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    /// Formatter settings. Links resolve against `http://localhost:<port>`
    /// unless `jsonapi.base_url` says otherwise.
    pub fn jsonapi_config(&self) -> Result<JsonApiConfig> {
        let base_url = match &self.jsonapi.base_url {
            Some(url) => url.clone(),
            None => format!("http://localhost:{}", self.app.port),
        };
        let base_url = Url::parse(&base_url).with_context(|| format!("invalid jsonapi.base_url {}", base_url))?;

        let mut cfg = JsonApiConfig::new(base_url);
        cfg.meta = self.jsonapi.meta.clone();
        cfg.validation = self.jsonapi.validation;
        Ok(cfg)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!("environment variable '{}' not found", var_name);
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_env_vars_uses_defaults() {
        let yaml = "database: ${BURGER_TEST_UNSET_DB:-burger.db}\nport: ${BURGER_TEST_UNSET_PORT}";
        let out = Config::substitute_env_vars(yaml).unwrap();
        assert_eq!(out, "database: burger.db\nport: ");
    }

    #[test]
    fn test_config_defaults() {
        let cfg = Config::from_yaml("app:\n  database: burger.db\n  port: 8080\n").unwrap();
        assert_eq!(cfg.app.get_db(), "burger.db");
        assert_eq!(cfg.app.address(), "0.0.0.0:8080");

        let jsonapi = cfg.jsonapi_config().unwrap();
        assert_eq!(jsonapi.base_url.as_str(), "http://localhost:8080/");
        assert!(jsonapi.meta.is_empty());
        assert_eq!(jsonapi.validation, ValidationMode::Advisory);
    }

    #[test]
    fn test_jsonapi_section() {
        let yaml = r#"
app:
  database: burger.db
  host: 127.0.0.1
  port: ${BURGER_TEST_UNSET_PORT:-3000}
jsonapi:
  base_url: https://api.example.com/v1/
  validation: strict
  meta:
    version: "1.0"
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.app.get_host(), "127.0.0.1");
        assert_eq!(cfg.app.get_port(), 3000);

        let jsonapi = cfg.jsonapi_config().unwrap();
        assert_eq!(jsonapi.base_url.as_str(), "https://api.example.com/v1/");
        assert_eq!(jsonapi.meta["version"], "1.0");
        assert_eq!(jsonapi.validation, ValidationMode::Strict);
    }

    #[test]
    fn test_invalid_base_url() {
        let cfg = Config::from_yaml("app:\n  database: b.db\n  port: 1\njsonapi:\n  base_url: not a url\n").unwrap();
        assert!(cfg.jsonapi_config().is_err());
    }
}
