//! Sites on disk: discovery and hand-written deployment markers.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use siteline_core::{DeploymentEvents, SiteName, SitelineError, Timestamp};

use crate::error::{EngineError, EngineResult};

/// Names of the site directories directly under `root`, sorted.
///
/// Plain files, hidden entries and directory names that are not valid site
/// names are skipped; the latter with a warning.
pub async fn discover_sites(root: &Path) -> EngineResult<Vec<SiteName>> {
    let mut entries = tokio::fs::read_dir(root)
        .await
        .map_err(|e| EngineError::io(root.display(), e))?;

    let mut sites = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| EngineError::io(root.display(), e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| EngineError::io(entry.path().display(), e))?;
        if !file_type.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        match SiteName::new(name.as_str()) {
            Ok(site) => sites.push(site),
            Err(e) => tracing::warn!(dir = %name, error = %e, "Skipping site directory"),
        }
    }

    sites.sort();
    tracing::debug!(root = %root.display(), count = sites.len(), "Sites discovered");
    Ok(sites)
}

/// Event requested through a hand-written marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerEvent {
    Rebuild,
    ClearCache,
}

impl FromStr for MarkerEvent {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rebuild" => Ok(Self::Rebuild),
            "clear" | "clear-cache" => Ok(Self::ClearCache),
            other => Err(EngineError::Usage(format!(
                "unknown marker event {:?}, expected rebuild or clear",
                other
            ))),
        }
    }
}

/// Stamp `event` at `at` into the marker file of `site` under `sites_root`,
/// keeping whatever the marker already requested for the other event.
/// Returns the marker's path.
pub async fn write_marker(
    sites_root: &Path,
    site: &SiteName,
    marker_path: &str,
    event: MarkerEvent,
    at: Timestamp,
) -> EngineResult<PathBuf> {
    let site_dir = sites_root.join(site.as_str());
    if !tokio::fs::metadata(&site_dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        return Err(EngineError::Usage(format!(
            "no site directory at {}",
            site_dir.display()
        )));
    }

    let path = site_dir.join(marker_path.trim_start_matches('/'));
    let mut events = match tokio::fs::read_to_string(&path).await {
        Ok(text) => DeploymentEvents::parse(&text).map_err(SitelineError::from)?,
        Err(e) if e.kind() == ErrorKind::NotFound => DeploymentEvents::default(),
        Err(e) => return Err(EngineError::io(path.display(), e)),
    };
    match event {
        MarkerEvent::Rebuild => events.rebuild_context = Some(at),
        MarkerEvent::ClearCache => events.clear_cache = Some(at),
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| EngineError::io(parent.display(), e))?;
    }
    tokio::fs::write(&path, events.to_properties())
        .await
        .map_err(|e| EngineError::io(path.display(), e))?;

    tracing::info!(site = %site, event = ?event, path = %path.display(), "Deployment marker written");
    Ok(path)
}

/// [`write_marker`] stamped with the current instant.
pub async fn mark_now(
    sites_root: &Path,
    site: &SiteName,
    marker_path: &str,
    event: MarkerEvent,
) -> EngineResult<PathBuf> {
    write_marker(sites_root, site, marker_path, event, Utc::now()).await
}
