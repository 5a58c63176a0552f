// View models handed to the dashboard
use super::series::{AlignedTable, TimeWindow};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ChartView {
    pub id: String,
    pub title: String,
    pub unit: Option<String>,
    pub window: TimeWindow,
    pub rows: AlignedTable,
}

#[derive(Debug, Clone, Serialize)]
pub struct TileView {
    pub id: String,
    pub title: String,
    /// Sparkline values, oldest first.
    pub values: Vec<Option<f64>>,
    pub latest: Option<f64>,
    pub formatted: String,
}
