use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::config::CatalogConfig;
use crate::error::CatalogError;

/// Blocking GET that returns the parsed JSON body.
///
/// `query` is appended to whatever query string `url` already carries.
pub trait JsonFetcher: Send + Sync {
    fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, CatalogError>;
}

impl<T: JsonFetcher + ?Sized> JsonFetcher for std::sync::Arc<T> {
    fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, CatalogError> {
        (**self).get_json(url, query)
    }
}

#[derive(Clone)]
pub struct ArcgisHttpClient {
    client: Client,
}

impl ArcgisHttpClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("arcgis-catalog/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CatalogError::InvalidConfig(err.to_string()))?,
        );
        for (name, value) in &config.secrets {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| CatalogError::InvalidConfig(format!("secret {name}: {err}")))?;
            let mut value = HeaderValue::from_str(value)
                .map_err(|err| CatalogError::InvalidConfig(format!("secret {name}: {err}")))?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| CatalogError::Http(err.to_string()))?;
        Ok(Self { client })
    }

    fn handle_status(
        url: &str,
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, CatalogError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "ArcGIS request failed".to_string());
        Err(CatalogError::Status {
            url: url.to_string(),
            status,
            message,
        })
    }
}

impl JsonFetcher for ArcgisHttpClient {
    fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, CatalogError> {
        debug!(url, ?query, "arcgis.request");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|err| CatalogError::Http(err.to_string()))?;
        let response = Self::handle_status(url, response)?;
        let body = response
            .text()
            .map_err(|err| CatalogError::Http(err.to_string()))?;
        let value: Value = serde_json::from_str(&body).map_err(|err| CatalogError::Malformed {
            url: url.to_string(),
            message: err.to_string(),
        })?;
        match service_error(url, &value) {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }
}

/// ArcGIS answers most failures (bad token, invalid query) with HTTP 200 and
/// an `{"error": {"code", "message", "details"}}` body.
pub fn service_error(url: &str, body: &Value) -> Option<CatalogError> {
    let error = body.get("error")?.as_object()?;
    let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
    let mut message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let details: Vec<&str> = error
        .get("details")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter(|detail| !detail.is_empty())
        .collect();
    if !details.is_empty() {
        message = format!("{message} ({})", details.join("; "));
    }
    Some(CatalogError::Service {
        url: url.to_string(),
        code,
        message,
    })
}
