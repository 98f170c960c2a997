//! Background Jobs for the Siteline engine
//!
//! - `deployment_events`: polls each site's deployment marker and rebuilds
//!   the site context or clears its cache
//!
//! # Usage
//!
//! ```ignore
//! use siteline_engine::jobs::{deployment_events_task, DeploymentEventsConfig, DeploymentEventsWatcher};
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//! let config = DeploymentEventsConfig::from_env();
//! let watcher = Arc::new(DeploymentEventsWatcher::new(Arc::clone(&manager), &config));
//! tokio::spawn(deployment_events_task(watcher, config, shutdown_rx));
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! ```

pub mod deployment_events;

pub use deployment_events::{
    deployment_events_task, CycleReport, DeploymentEventsConfig, DeploymentEventsMetrics,
    DeploymentEventsSnapshot, DeploymentEventsWatcher, SiteEventOutcome,
};
