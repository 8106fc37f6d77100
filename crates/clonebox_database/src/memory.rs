//! In-memory registry for testing.
//!
//! Both uniqueness indexes of a table sit behind one mutex, so an insert's
//! check and write are a single atomic step, the same guarantee a database
//! unique constraint gives.

use crate::{FileRegistry, Insertion, LinkRegistry, UniqueColumn};
use async_trait::async_trait;
use chrono::Utc;
use clonebox_core::{ContentDigest, Identifier, LinkRecord, NewStoredFile, StoredFile};
use clonebox_error::CloneboxResult;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct RegistryState {
    links: Vec<LinkRecord>,
    link_by_identifier: HashMap<Identifier, usize>,
    link_by_content: HashMap<String, usize>,
    files: Vec<StoredFile>,
    file_by_digest: HashMap<ContentDigest, usize>,
    file_by_handle: HashMap<String, usize>,
}

/// In-memory link and file registry.
///
/// Clones share the same state. All data is lost when the last clone is
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered links (for testing).
    pub fn link_count(&self) -> usize {
        self.state.lock().links.len()
    }

    /// Number of registered files (for testing).
    pub fn file_count(&self) -> usize {
        self.state.lock().files.len()
    }

    /// Snapshot of every registered link in insertion order (for testing).
    pub fn links(&self) -> Vec<LinkRecord> {
        self.state.lock().links.clone()
    }
}

#[async_trait]
impl LinkRegistry for InMemoryRegistry {
    async fn find_by_content(&self, content: &str) -> CloneboxResult<Option<LinkRecord>> {
        let state = self.state.lock();
        Ok(state
            .link_by_content
            .get(content)
            .map(|&i| state.links[i].clone()))
    }

    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> CloneboxResult<Option<LinkRecord>> {
        let state = self.state.lock();
        Ok(state
            .link_by_identifier
            .get(identifier)
            .map(|&i| state.links[i].clone()))
    }

    async fn insert_link(
        &self,
        identifier: &Identifier,
        content: &str,
    ) -> CloneboxResult<Insertion<LinkRecord>> {
        let mut state = self.state.lock();
        if state.link_by_content.contains_key(content) {
            return Ok(Insertion::Conflict(UniqueColumn::Content));
        }
        if state.link_by_identifier.contains_key(identifier) {
            return Ok(Insertion::Conflict(UniqueColumn::Identifier));
        }

        let record = LinkRecord {
            identifier: identifier.clone(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        let index = state.links.len();
        state.links.push(record.clone());
        state.link_by_identifier.insert(identifier.clone(), index);
        state.link_by_content.insert(content.to_string(), index);
        Ok(Insertion::Registered(record))
    }

    async fn latest_links(&self, limit: usize) -> CloneboxResult<Vec<LinkRecord>> {
        let state = self.state.lock();
        Ok(state.links.iter().rev().take(limit).cloned().collect())
    }
}

#[async_trait]
impl FileRegistry for InMemoryRegistry {
    async fn find_by_digest(&self, digest: &ContentDigest) -> CloneboxResult<Option<StoredFile>> {
        let state = self.state.lock();
        Ok(state
            .file_by_digest
            .get(digest)
            .map(|&i| state.files[i].clone()))
    }

    async fn find_by_handle(&self, handle: &str) -> CloneboxResult<Option<StoredFile>> {
        let state = self.state.lock();
        Ok(state
            .file_by_handle
            .get(handle)
            .map(|&i| state.files[i].clone()))
    }

    async fn insert_file(&self, file: NewStoredFile) -> CloneboxResult<Insertion<StoredFile>> {
        let mut state = self.state.lock();
        if state.file_by_digest.contains_key(&file.digest) {
            return Ok(Insertion::Conflict(UniqueColumn::Digest));
        }
        if state.file_by_handle.contains_key(&file.storage_handle) {
            return Ok(Insertion::Conflict(UniqueColumn::StorageHandle));
        }

        let stored = file.into_stored(Utc::now());
        let index = state.files.len();
        state.file_by_digest.insert(stored.digest.clone(), index);
        state
            .file_by_handle
            .insert(stored.storage_handle.clone(), index);
        state.files.push(stored.clone());
        Ok(Insertion::Registered(stored))
    }
}
