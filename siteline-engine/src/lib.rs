//! Siteline Engine
//!
//! Process-level pieces of the engine: configuration from the environment,
//! tracing setup, site discovery, the deployment events watcher job and the
//! [`Engine`] that wires them to a site context manager.

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod jobs;
pub mod sites;
pub mod telemetry;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use jobs::{
    deployment_events_task, CycleReport, DeploymentEventsConfig, DeploymentEventsMetrics,
    DeploymentEventsSnapshot, DeploymentEventsWatcher, SiteEventOutcome,
};
pub use sites::{discover_sites, mark_now, write_marker, MarkerEvent};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
