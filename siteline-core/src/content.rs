//! Content items and directory listings served by store adapters.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::identity::Timestamp;

/// Whether an item is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    File,
    Folder,
}

/// A single file or folder in a site's content tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Normalized absolute path within the site's store.
    pub path: String,
    pub kind: ItemKind,
    /// Raw bytes for files; always `None` for folders.
    pub content: Option<Vec<u8>>,
    pub last_modified: Option<Timestamp>,
}

impl ContentItem {
    pub fn file(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            kind: ItemKind::File,
            content: Some(content.into()),
            last_modified: None,
        }
    }

    pub fn folder(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ItemKind::Folder,
            content: None,
            last_modified: None,
        }
    }

    pub fn with_last_modified(mut self, at: Timestamp) -> Self {
        self.last_modified = Some(at);
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind == ItemKind::Folder
    }

    /// Final path segment, or `/` for the root.
    pub fn name(&self) -> &str {
        match self.path.rsplit_once('/') {
            Some((_, name)) if !name.is_empty() => name,
            _ => "/",
        }
    }

    /// File content decoded as UTF-8, if this is a text file.
    pub fn content_str(&self) -> Option<&str> {
        self.content
            .as_deref()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }
}

/// Children of a folder.
///
/// A listing produced under caching is shared between every caller that hits
/// the same cache entry, so it is handed out read-only. Call
/// [`Listing::to_mutable`] to get an owned copy that is safe to modify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    items: Arc<Vec<ContentItem>>,
    computed_under_caching: bool,
}

impl Listing {
    /// A fresh, caller-owned listing.
    pub fn new(items: Vec<ContentItem>) -> Self {
        Self {
            items: Arc::new(items),
            computed_under_caching: false,
        }
    }

    /// Tag this listing as a shared cached view.
    pub fn into_cached(self) -> Self {
        Self {
            items: self.items,
            computed_under_caching: true,
        }
    }

    /// Whether this listing came out of a cache and must not be mutated.
    pub fn is_cached_view(&self) -> bool {
        self.computed_under_caching
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Owned copy of the items, untagged.
    pub fn to_mutable(&self) -> Vec<ContentItem> {
        self.items.as_ref().clone()
    }
}

/// Normalize a store path: leading `/`, no duplicate or trailing slashes,
/// no `.` segments. `..` segments are rejected rather than resolved.
pub fn normalize_path(path: &str) -> Result<String, StoreError> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(StoreError::InvalidPath {
                    path: path.to_string(),
                    reason: "parent directory segments are not allowed".to_string(),
                })
            }
            s => segments.push(s),
        }
    }
    Ok(format!("/{}", segments.join("/")))
}

/// Join a folder path and a child name into a normalized path.
pub fn join_path(parent: &str, child: &str) -> Result<String, StoreError> {
    normalize_path(&format!("{}/{}", parent, child))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("").unwrap(), "/");
        assert_eq!(normalize_path("/").unwrap(), "/");
        assert_eq!(normalize_path("site//content/").unwrap(), "/site/content");
        assert_eq!(normalize_path("/a/./b").unwrap(), "/a/b");
        assert!(normalize_path("/a/../b").is_err());
    }

    #[test]
    fn test_item_name() {
        assert_eq!(ContentItem::folder("/").name(), "/");
        assert_eq!(ContentItem::file("/a/b.xml", "x").name(), "b.xml");
    }

    #[test]
    fn test_listing_cached_tag() {
        let listing = Listing::new(vec![ContentItem::file("/a", "1")]);
        assert!(!listing.is_cached_view());

        let cached = listing.into_cached();
        assert!(cached.is_cached_view());

        let mut owned = cached.to_mutable();
        owned.push(ContentItem::file("/b", "2"));
        assert_eq!(owned.len(), 2);
        assert_eq!(cached.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(segments in proptest::collection::vec("[a-z0-9_.-]{1,8}", 0..6)) {
            let raw = segments
                .iter()
                .filter(|s| s.as_str() != "..")
                .cloned()
                .collect::<Vec<_>>()
                .join("//");
            let once = normalize_path(&raw).unwrap();
            let twice = normalize_path(&once).unwrap();
            prop_assert_eq!(&once, &twice);
            prop_assert!(once.starts_with('/'));
            prop_assert!(once == "/" || !once.ends_with('/'));
        }
    }
}
