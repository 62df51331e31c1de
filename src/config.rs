use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

pub const DEFAULT_CONFIG_FILE: &str = "arcgis-catalog.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub url: Option<String>,
    /// Extra request headers (tokens, API keys). Sent as-is with every request.
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub url: String,
    pub secrets: BTreeMap<String, String>,
}

impl CatalogConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            secrets: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(CatalogError::InvalidConfig("url is required".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CatalogError::InvalidConfig(format!(
                "url must use http or https: {url}"
            )));
        }
        Ok(())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(
        path: Option<&str>,
        url_override: Option<&str>,
    ) -> Result<CatalogConfig, CatalogError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            if url_override.is_none() {
                return Err(CatalogError::MissingConfig);
            }
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| CatalogError::ConfigRead(config_path.display().to_string()))?;
            serde_json::from_str(&content)
                .map_err(|err| CatalogError::ConfigParse(err.to_string()))?
        };

        Self::resolve_config(config, url_override)
    }

    pub fn resolve_config(
        config: Config,
        url_override: Option<&str>,
    ) -> Result<CatalogConfig, CatalogError> {
        let url = url_override
            .map(str::to_string)
            .or(config.url)
            .unwrap_or_default();
        let resolved = CatalogConfig {
            url: url.trim().to_string(),
            secrets: config.secrets,
        };
        resolved.validate()?;
        Ok(resolved)
    }
}
