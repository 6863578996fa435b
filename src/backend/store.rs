//! In-memory object store.
//!
//! Backs the local edge simulator and the tests. Keys are bucket-relative
//! (`static-pages/index.html`), without a leading slash.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::backend::{ObjectStore, PutObject, StoreError, StoredObject};
use crate::regeneration::md5_hex;

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, StoredObject>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every file under `root`, keyed by its path relative to `root`.
    pub async fn load_dir(&self, root: &Path) -> Result<usize, StoreError> {
        let mut pending = vec![root.to_path_buf()];
        let mut loaded = 0;

        while let Some(dir) = pending.pop() {
            let io_err = |source| StoreError::Io {
                key: dir.display().to_string(),
                source,
            };
            let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_err)?;

            while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
                let path = entry.path();
                if entry.file_type().await.map_err(io_err)?.is_dir() {
                    pending.push(path);
                    continue;
                }

                let Ok(relative) = path.strip_prefix(root) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let body = tokio::fs::read(&path).await.map_err(|source| StoreError::Io {
                    key: key.clone(),
                    source,
                })?;

                let content_type = content_type_for(&key);
                self.insert(&key, PutObject::new(body, content_type));
                loaded += 1;
            }
        }

        tracing::info!(root = %root.display(), objects = loaded, "Object store seeded");
        Ok(loaded)
    }

    fn insert(&self, key: &str, object: PutObject) {
        let etag = format!("\"{}\"", md5_hex(&object.body));
        self.objects.insert(
            key.to_string(),
            StoredObject {
                body: object.body,
                content_type: Some(object.content_type),
                cache_control: object.cache_control,
                expires: object.expires,
                last_modified: Utc::now(),
                etag,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError> {
        Ok(self.objects.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &str, object: PutObject) -> Result<(), StoreError> {
        tracing::debug!(key, bytes = object.body.len(), "Storing object");
        self.insert(key, object);
        Ok(())
    }
}

/// Content type guessed from the key's extension.
pub fn content_type_for(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext) {
        Some("html") => "text/html",
        Some("json") => "application/json",
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
