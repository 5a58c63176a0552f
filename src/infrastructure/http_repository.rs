// Broker REST API repository implementation
use crate::application::metrics_repository::MetricsRepository;
use crate::domain::series::{SeriesSet, TimeWindow};
use crate::infrastructure::config::{BrokerApiSettings, prepare_endpoint};
use crate::infrastructure::series_payload::decode_series_set;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpMetricsRepository {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    series_path: String,
}

impl HttpMetricsRepository {
    pub fn new(settings: BrokerApiSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token,
            series_path: settings.series_path,
        })
    }

    fn build_series_url(&self, broker_id: &str, names: &[String], window: &TimeWindow) -> String {
        let mut vars = HashMap::new();
        vars.insert("broker".to_string(), broker_id.to_string());
        vars.insert("from".to_string(), window.from.to_string());
        vars.insert("to".to_string(), window.to.to_string());
        vars.insert("step".to_string(), window.step.to_string());
        vars.insert("names".to_string(), names.join(","));

        format!("{}{}", self.base_url, prepare_endpoint(&self.series_path, &vars))
    }
}

#[async_trait]
impl MetricsRepository for HttpMetricsRepository {
    async fn fetch_series(
        &self,
        broker_id: &str,
        names: &[String],
        window: &TimeWindow,
    ) -> Result<SeriesSet> {
        let url = self.build_series_url(broker_id, names, window);
        tracing::debug!("Fetching series: {}", url);

        let mut request = self.client.get(&url).header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("Failed to send request to broker API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Broker API request failed with status {}: {}", status, body);
        }

        let payload = response
            .json::<serde_json::Value>()
            .await
            .context("Failed to parse broker API response")?;

        let set = decode_series_set(&payload);
        tracing::debug!("Decoded {} series for broker {}", set.len(), broker_id);
        Ok(set)
    }
}
