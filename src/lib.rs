//! Time-series normalization behind an MQTT broker monitoring dashboard.
//!
//! The core turns sparse, irregularly keyed metric series into dense,
//! regularly spaced tables: [`application::step_planner`] picks the query
//! resolution, [`application::series_aligner`] lays series onto the axis,
//! [`application::series_merger`] joins tables fetched at different steps,
//! [`application::tail_sampler`] picks sparkline points and
//! [`domain::format`] renders magnitudes. Everything else wires that core to
//! the broker's REST API and an HTTP surface.
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
