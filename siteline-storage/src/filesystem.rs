//! Filesystem store adapter.
//!
//! A store context's root is a directory on disk; store paths resolve
//! beneath it. `..` segments are rejected by path normalization, so lookups
//! cannot escape the root.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use siteline_core::{
    join_path, normalize_path, CachingOptions, ContentItem, ItemKind, Listing, SiteName,
    SitelineResult, StoreError,
};

use crate::adapter::{ContentStoreAdapter, StoreContext};

/// Store adapter reading a directory tree with `tokio::fs`.
#[derive(Debug, Clone, Default)]
pub struct FileSystemStoreAdapter;

impl FileSystemStoreAdapter {
    pub fn new() -> Self {
        Self
    }

    fn resolve(context: &StoreContext, path: &str) -> SitelineResult<(String, PathBuf)> {
        let normalized = normalize_path(path)?;
        let relative = normalized.trim_start_matches('/');
        let full = if relative.is_empty() {
            PathBuf::from(context.root())
        } else {
            Path::new(context.root()).join(relative)
        };
        Ok((normalized, full))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

fn modified_at(metadata: &std::fs::Metadata) -> Option<DateTime<Utc>> {
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

#[async_trait]
impl ContentStoreAdapter for FileSystemStoreAdapter {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn create_context(&self, site: &SiteName, root: &str) -> SitelineResult<StoreContext> {
        match tokio::fs::metadata(root).await {
            Ok(metadata) if metadata.is_dir() => Ok(StoreContext::new(site.clone(), root)),
            Ok(_) => Err(StoreError::InvalidContext {
                site: site.to_string(),
                reason: format!("{} is not a directory", root),
            }
            .into()),
            Err(e) => Err(StoreError::InvalidContext {
                site: site.to_string(),
                reason: format!("{}: {}", root, e),
            }
            .into()),
        }
    }

    async fn validate(&self, context: &StoreContext) -> SitelineResult<bool> {
        Ok(tokio::fs::metadata(context.root())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn find_file(
        &self,
        context: &StoreContext,
        _options: Option<&CachingOptions>,
        path: &str,
    ) -> SitelineResult<Option<ContentItem>> {
        let (normalized, full) = Self::resolve(context, path)?;

        let metadata = match tokio::fs::metadata(&full).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&full, e).into()),
        };

        if metadata.is_dir() {
            let mut item = ContentItem::folder(normalized);
            item.last_modified = modified_at(&metadata);
            return Ok(Some(item));
        }

        let bytes = match tokio::fs::read(&full).await {
            Ok(bytes) => bytes,
            // Removed between the stat and the read.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&full, e).into()),
        };
        let mut item = ContentItem::file(normalized, bytes);
        item.last_modified = modified_at(&metadata);
        Ok(Some(item))
    }

    async fn get_children(
        &self,
        context: &StoreContext,
        _options: Option<&CachingOptions>,
        path: &str,
    ) -> SitelineResult<Option<Listing>> {
        let (normalized, full) = Self::resolve(context, path)?;

        let mut entries = match tokio::fs::read_dir(&full).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotADirectory => return Ok(None),
            Err(e) => {
                // Some platforms report "not a directory" as a generic error.
                if tokio::fs::metadata(&full)
                    .await
                    .map(|m| m.is_file())
                    .unwrap_or(false)
                {
                    return Ok(None);
                }
                return Err(io_error(&full, e).into());
            }
        };

        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&full, e))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let metadata = entry.metadata().await.map_err(|e| io_error(&entry.path(), e))?;
            // Listings carry metadata only; content is fetched with find_file.
            children.push(ContentItem {
                path: join_path(&normalized, &name)?,
                kind: if metadata.is_dir() {
                    ItemKind::Folder
                } else {
                    ItemKind::File
                },
                content: None,
                last_modified: modified_at(&metadata),
            });
        }
        children.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(Some(Listing::new(children)))
    }
}
