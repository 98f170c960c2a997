//! Siteline Entry Point
//!
//! ```text
//! siteline [serve]                 load every site and watch deployment markers
//! siteline check                   run one watcher cycle and print the report
//! siteline sites                   list the sites found under the sites root
//! siteline mark <site> <event>     write a marker; event is rebuild or clear
//! ```

use siteline_core::SiteName;
use siteline_engine::{
    discover_sites, init_tracing, mark_now, Engine, EngineConfig, EngineError, EngineResult,
    MarkerEvent, TelemetryConfig,
};
use tokio::sync::watch;

const USAGE: &str = "siteline [serve | check | sites | mark <site> <rebuild|clear>]";

#[tokio::main]
async fn main() -> EngineResult<()> {
    init_tracing(&TelemetryConfig::default())?;

    let config = EngineConfig::from_env()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        [] | ["serve"] => serve(config).await,
        ["check"] => check(config).await,
        ["sites"] => list_sites(config).await,
        ["mark", site, event] => mark(config, site, event).await,
        _ => Err(EngineError::Usage(USAGE.to_string())),
    }
}

async fn serve(config: EngineConfig) -> EngineResult<()> {
    let engine = Engine::new(config).await;
    let loaded = engine.load_sites().await?;
    tracing::info!(loaded, "Siteline engine started");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let watcher = engine.spawn_watcher(shutdown_rx);

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    match watcher.await {
        Ok(metrics) => {
            let snapshot = metrics.snapshot();
            tracing::info!(
                cycles = snapshot.cycles,
                rebuilds = snapshot.rebuilds,
                cache_clears = snapshot.cache_clears,
                errors = snapshot.errors,
                "Watcher stopped"
            );
        }
        Err(e) => tracing::error!(error = %e, "Watcher task failed"),
    }

    engine.shutdown().await;
    Ok(())
}

async fn check(config: EngineConfig) -> EngineResult<()> {
    let engine = Engine::new(config).await;
    engine.load_sites().await?;
    let report = engine.watcher().check_all().await;
    print_json(&report)?;
    engine.shutdown().await;
    Ok(())
}

async fn list_sites(config: EngineConfig) -> EngineResult<()> {
    let sites = discover_sites(&config.sites_root).await?;
    print_json(&sites)
}

async fn mark(config: EngineConfig, site: &str, event: &str) -> EngineResult<()> {
    let site = SiteName::new(site).map_err(siteline_core::SitelineError::from)?;
    let event: MarkerEvent = event.parse()?;
    let path = mark_now(
        &config.sites_root,
        &site,
        &config.deployment_events.marker_path,
        event,
    )
    .await?;
    println!("{}", path.display());
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> EngineResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| EngineError::Output(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
