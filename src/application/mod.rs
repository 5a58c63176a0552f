// Application layer - Series core and use cases
pub mod metrics_repository;
pub mod metrics_service;
pub mod series_aligner;
pub mod series_merger;
pub mod step_planner;
pub mod tail_sampler;
