use crate::application::step_planner::PlannerPolicy;
use crate::domain::format::MetricFormat;
use crate::domain::series::{GapPolicy, MatchPolicy};
use serde::Deserialize;
use std::collections::HashMap;

const ENV_PREFIX: &str = "DASHBOARD";

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub server: ServerSettings,
    pub broker_api: BrokerApiSettings,
    #[serde(default)]
    pub planner: PlannerPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrokerApiSettings {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_series_path")]
    pub series_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_series_path() -> String {
    "/api/v1/brokers/${broker}/series?from=${from}&to=${to}&step=${step}&names=${names}".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WidgetsConfig {
    #[serde(default)]
    pub charts: Vec<ChartConfig>,
    #[serde(default)]
    pub tiles: Vec<TileConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartConfig {
    pub id: String,
    pub title: String,
    pub unit: Option<String>,
    #[serde(default)]
    pub fill: GapPolicy,
    #[serde(default)]
    pub matching: MatchPolicy,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// One backend request; a chart merges the tables of all its sources.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub id: String,
    pub series: Vec<String>,
    /// Fetch this source no finer than this step.
    pub min_step_seconds: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TileConfig {
    pub id: String,
    pub title: String,
    pub series: String,
    pub format: MetricFormat,
    pub window_minutes: f64,
    pub points: usize,
    #[serde(default)]
    pub fill: GapPolicy,
}

impl WidgetsConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        for tile in &self.tiles {
            if !tile.window_minutes.is_finite() || tile.window_minutes <= 0.0 {
                anyhow::bail!(
                    "tile {} needs a positive window_minutes, got {}",
                    tile.id,
                    tile.window_minutes
                );
            }
        }
        for chart in &self.charts {
            for source in &chart.sources {
                if source.min_step_seconds.is_some_and(|s| s <= 0) {
                    anyhow::bail!(
                        "chart {} source {} has a non-positive min_step_seconds",
                        chart.id,
                        source.id
                    );
                }
            }
        }
        Ok(())
    }
}

/// `config/service` with `DASHBOARD__SECTION__KEY` environment overrides.
pub fn load_service_config() -> anyhow::Result<ServiceConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/service"))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    let service: ServiceConfig = settings.try_deserialize()?;
    service.planner.validate()?;
    Ok(service)
}

pub fn load_widgets_config() -> anyhow::Result<WidgetsConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/widgets"))
        .build()?;

    let widgets: WidgetsConfig = settings.try_deserialize()?;
    widgets.validate()?;
    Ok(widgets)
}

/// Replace `${name}` placeholders in an endpoint template with URL-encoded values
pub fn prepare_endpoint(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, &urlencoding::encode(value));
    }
    result
}
