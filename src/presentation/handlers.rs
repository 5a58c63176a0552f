// HTTP request handlers
use crate::application::metrics_service::ServiceError;
use crate::domain::error::SeriesError;
use crate::domain::series::GapPolicy;
use crate::domain::views::{ChartView, TileView};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_WINDOW_MINUTES: f64 = 60.0;

#[derive(Deserialize)]
pub struct ChartQuery {
    pub minutes: Option<f64>,
    pub fill: Option<GapPolicy>,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::ChartNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Series(SeriesError::EmptyInput) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Series(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Aligned (and merged) table for one configured chart
pub async fn get_chart(
    Path((broker, chart)): Path<(String, String)>,
    Query(query): Query<ChartQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChartView>, ServiceError> {
    let minutes = query.minutes.unwrap_or(DEFAULT_WINDOW_MINUTES);

    let view = state
        .metrics_service
        .chart(&broker, &chart, minutes, query.fill)
        .await
        .inspect_err(|e| tracing::warn!("Chart {} for broker {} failed: {}", chart, broker, e))?;

    Ok(Json(view))
}

/// Sparkline tiles for a broker
pub async fn get_tiles(
    Path(broker): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TileView>>, ServiceError> {
    let tiles = state
        .metrics_service
        .tiles(&broker)
        .await
        .inspect_err(|e| tracing::warn!("Tiles for broker {} failed: {}", broker, e))?;

    Ok(Json(tiles))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (ServiceError::ChartNotFound("x".to_string()), StatusCode::NOT_FOUND),
            (
                ServiceError::Series(SeriesError::InvalidWindow("step".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Series(SeriesError::ReservedName("timestamp".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Series(SeriesError::EmptyInput),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, "ok");
    }
}
