// Metrics service - Use cases for charts and sparkline tiles
use crate::application::metrics_repository::MetricsRepository;
use crate::application::series_aligner::{AlignOptions, align};
use crate::application::series_merger::merge;
use crate::application::step_planner::StepPlanner;
use crate::application::tail_sampler::tail;
use crate::domain::error::SeriesError;
use crate::domain::series::{AlignedTable, GapPolicy, Series, SeriesSet, TimeWindow};
use crate::domain::views::{ChartView, TileView};
use crate::infrastructure::config::{TileConfig, WidgetsConfig};
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unknown chart '{0}'")]
    ChartNotFound(String),

    #[error(transparent)]
    Series(#[from] SeriesError),
}

#[derive(Clone)]
pub struct MetricsService {
    repository: Arc<dyn MetricsRepository>,
    planner: StepPlanner,
    widgets: WidgetsConfig,
}

impl MetricsService {
    pub fn new(
        repository: Arc<dyn MetricsRepository>,
        planner: StepPlanner,
        widgets: WidgetsConfig,
    ) -> Self {
        Self {
            repository,
            planner,
            widgets,
        }
    }

    /// Plans the window, fetches every source in parallel, aligns each one
    /// and merges them into a single table.
    pub async fn chart(
        &self,
        broker_id: &str,
        chart_id: &str,
        window_minutes: f64,
        fill: Option<GapPolicy>,
    ) -> Result<ChartView, ServiceError> {
        let chart = self
            .widgets
            .charts
            .iter()
            .find(|c| c.id == chart_id)
            .ok_or_else(|| ServiceError::ChartNotFound(chart_id.to_string()))?;

        let window = self.planner.plan(window_minutes)?;
        let options = AlignOptions {
            gap: fill.unwrap_or(chart.fill),
            matching: chart.matching,
        };

        let fetches = chart.sources.iter().map(|source| {
            let source_window = source
                .min_step_seconds
                .map_or(window, |step| window.with_min_step(step));
            async move {
                let set = self
                    .fetch_or_empty(broker_id, &source.id, &source.series, &source_window)
                    .await;
                align(&set, &source_window, options)
            }
        });
        let tables = join_all(fetches)
            .await
            .into_iter()
            .collect::<Result<Vec<AlignedTable>, SeriesError>>()?;

        let rows = match tables.as_slice() {
            [] => align(&SeriesSet::new(), &window, options)?,
            [only] => only.clone(),
            _ => merge(&tables)?,
        };

        if rows.is_all_gap() {
            tracing::debug!(
                "Chart {} for broker {} has no data between {} and {}",
                chart.id,
                broker_id,
                window.from,
                window.to
            );
        }

        Ok(ChartView {
            id: chart.id.clone(),
            title: chart.title.clone(),
            unit: chart.unit.clone(),
            window,
            rows,
        })
    }

    /// Every configured tile, in configuration order.
    pub async fn tiles(&self, broker_id: &str) -> Result<Vec<TileView>, ServiceError> {
        let views = self
            .widgets
            .tiles
            .iter()
            .map(|tile| self.tile(broker_id, tile));

        join_all(views).await.into_iter().collect()
    }

    async fn tile(&self, broker_id: &str, tile: &TileConfig) -> Result<TileView, ServiceError> {
        let window = self.planner.plan(tile.window_minutes)?;
        let names = std::slice::from_ref(&tile.series);
        let set = self.fetch_or_empty(broker_id, &tile.id, names, &window).await;
        let table = align(&set, &window, AlignOptions::with_gap(tile.fill))?;

        let cells = table.column(&tile.series).unwrap_or_default();
        let latest = table.latest_observed(&tile.series);

        Ok(TileView {
            id: tile.id.clone(),
            title: tile.title.clone(),
            values: tail(&cells, tile.points),
            latest,
            formatted: tile.format.format(latest),
        })
    }

    /// Fetches `names`, keeping only the requested series. A failed fetch
    /// degrades to an empty set so the caller still renders a full grid.
    async fn fetch_or_empty(
        &self,
        broker_id: &str,
        label: &str,
        names: &[String],
        window: &TimeWindow,
    ) -> SeriesSet {
        let mut fetched = match self.repository.fetch_series(broker_id, names, window).await {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!("Error fetching {} for broker {}: {:#}", label, broker_id, e);
                SeriesSet::new()
            }
        };

        names
            .iter()
            .map(|name| fetched.remove(name).unwrap_or_else(|| Series::empty(name.as_str())))
            .collect()
    }
}
