// Repository trait for broker metrics access
use crate::domain::series::{SeriesSet, TimeWindow};
use async_trait::async_trait;

#[async_trait]
pub trait MetricsRepository: Send + Sync {
    /// Fetch the named series for a broker over `window`, sampled at
    /// `window.step`. Series the backend does not return are simply absent.
    async fn fetch_series(
        &self,
        broker_id: &str,
        names: &[String],
        window: &TimeWindow,
    ) -> anyhow::Result<SeriesSet>;
}
