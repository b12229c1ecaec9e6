//! HTTP plumbing shared by the resolver and the weather fetcher.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("skycast/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the upstream API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key. Required; construction fails without it.
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ProviderConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Authenticated GET-and-decode client for the upstream API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ApiClient {
    /// Build a client from explicit configuration.
    ///
    /// # Errors
    /// `WeatherError::Configuration` if the API key is absent or blank, or the
    /// HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, WeatherError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| WeatherError::Configuration("API key is not set".to_string()))?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WeatherError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET `path` with `params` plus the API key and decode the JSON body.
    ///
    /// # Errors
    /// `Transport` for connection failures and non-success statuses,
    /// `Configuration` when the key is rejected, `MalformedResponse` when the
    /// body does not decode.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, WeatherError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, WeatherError> {
        let status = response.status();

        if status.is_success() {
            let text = response.text().await?;
            Ok(serde_json::from_str(&text)?)
        } else if status == StatusCode::UNAUTHORIZED {
            Err(WeatherError::Configuration(
                "API key was rejected by the weather service".to_string(),
            ))
        } else {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("Weather API returned {}", status);
            Err(WeatherError::status(status, &text))
        }
    }
}
