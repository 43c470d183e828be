use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::types::{ApiError, BackendConfig};
use super::ProfileSource;
use crate::profile::{RenderResponse, TimeWindow};

const RENDER_PATH: &str = "/pyroscope/render";
const LABEL_VALUES_PATH: &str = "/pyroscope/label-values";

/// HTTP client for the profiling backend query API
#[derive(Clone)]
pub struct PyroscopeClient {
    client: reqwest::Client,
    base_url: String,
}

impl PyroscopeClient {
    /// Create a new client; every call carries the configured connect and request timeouts
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let response = self.client.get(&url).query(query).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Http { status, body });
        }

        Ok(response)
    }
}

/// Application names from metric names: `orders.cpu` -> `orders`, sorted and deduplicated
pub fn app_names_from_metrics(metric_names: &[String]) -> Vec<String> {
    metric_names
        .iter()
        .filter_map(|name| match name.rfind('.') {
            Some(dot) if dot > 0 => Some(name[..dot].to_string()),
            _ => None,
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[async_trait]
impl ProfileSource for PyroscopeClient {
    async fn render(&self, query: &str, window: TimeWindow) -> Result<RenderResponse, ApiError> {
        let response = self
            .get(
                RENDER_PATH,
                &[
                    ("query", query.to_string()),
                    ("from", window.from.to_string()),
                    ("until", window.to.to_string()),
                    ("format", "json".to_string()),
                ],
            )
            .await?;

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Parse(format!("Failed to read render body: {}", e)))?;

        serde_json::from_str(&body).map_err(|e| ApiError::Parse(format!("Failed to parse render JSON: {}", e)))
    }

    async fn discover_apps(&self, window: TimeWindow) -> Result<Vec<String>, ApiError> {
        let response = self
            .get(
                LABEL_VALUES_PATH,
                &[
                    ("label", "__name__".to_string()),
                    ("from", window.from.to_string()),
                    ("until", window.to.to_string()),
                ],
            )
            .await?;

        let metric_names: Vec<String> = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("Failed to parse label values: {}", e)))?;

        let apps = app_names_from_metrics(&metric_names);
        info!("Discovered {} applications from {} metric names", apps.len(), metric_names.len());
        Ok(apps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_names_from_metrics() {
        let metrics = vec![
            "orders.cpu".to_string(),
            "orders.alloc_in_new_tlab_bytes".to_string(),
            "billing.cpu".to_string(),
            "nodot".to_string(),
            ".hidden".to_string(),
            "svc.v2.wall".to_string(),
        ];
        assert_eq!(app_names_from_metrics(&metrics), vec!["billing", "orders", "svc.v2"]);
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let config = BackendConfig {
            base_url: "http://pyroscope:4040/".to_string(),
            ..Default::default()
        };
        let client = PyroscopeClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://pyroscope:4040");
    }
}
