use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use scanvault_core::{AnalysisStatus, Document};

use crate::traits::{MetadataError, MetadataResult, MetadataStore};

/// In-memory [`MetadataStore`] backed by two [`DashMap`]s.
///
/// Besides the online switch, the store can be told to miss a number of
/// upcoming fingerprint lookups, which reproduces a read path lagging behind
/// writes.
#[derive(Debug)]
pub struct MemoryMetadataStore {
    documents: DashMap<String, Document>,
    /// fingerprint -> document id
    by_fingerprint: DashMap<String, String>,
    online: AtomicBool,
    fingerprint_misses: AtomicUsize,
}

impl Default for MemoryMetadataStore {
    fn default() -> Self {
        Self {
            documents: DashMap::new(),
            by_fingerprint: DashMap::new(),
            online: AtomicBool::new(true),
            fingerprint_misses: AtomicUsize::new(0),
        }
    }
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Make the next `count` fingerprint lookups report `NotFound`.
    pub fn miss_fingerprint_lookups(&self, count: usize) {
        self.fingerprint_misses.store(count, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn ensure_online(&self) -> MetadataResult<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(MetadataError::Unavailable(
                "memory metadata store is offline".to_string(),
            ))
        }
    }

    fn take_fingerprint_miss(&self) -> bool {
        self.fingerprint_misses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn save(&self, doc: &Document) -> MetadataResult<()> {
        self.ensure_online()?;

        // Lock order is always fingerprint index, then documents.
        let fingerprint_entry = match self.by_fingerprint.entry(doc.fingerprint.clone()) {
            Entry::Occupied(existing) => {
                return Err(MetadataError::AlreadyExists(format!(
                    "fingerprint {} is held by {}",
                    doc.fingerprint,
                    existing.get()
                )))
            }
            Entry::Vacant(vacant) => vacant,
        };

        match self.documents.entry(doc.id.clone()) {
            Entry::Occupied(_) => {
                return Err(MetadataError::AlreadyExists(format!("id {}", doc.id)));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(doc.clone());
            }
        }
        fingerprint_entry.insert(doc.id.clone());

        Ok(())
    }

    async fn get(&self, id: &str) -> MetadataResult<Document> {
        self.ensure_online()?;
        self.documents
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| MetadataError::NotFound(format!("id {id}")))
    }

    async fn get_by_fingerprint(&self, fingerprint: &str) -> MetadataResult<Document> {
        self.ensure_online()?;
        let not_found = || MetadataError::NotFound(format!("fingerprint {fingerprint}"));

        if self.take_fingerprint_miss() {
            return Err(not_found());
        }

        let id = self
            .by_fingerprint
            .get(fingerprint)
            .map(|entry| entry.value().clone())
            .ok_or_else(not_found)?;
        self.documents
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(not_found)
    }

    async fn update_status(
        &self,
        id: &str,
        status: AnalysisStatus,
        analyzed_at: DateTime<Utc>,
    ) -> MetadataResult<()> {
        self.ensure_online()?;
        let mut doc = self
            .documents
            .get_mut(id)
            .ok_or_else(|| MetadataError::NotFound(format!("id {id}")))?;
        doc.apply_status(status, analyzed_at)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> MetadataResult<()> {
        self.ensure_online()?;
        let (_, doc) = self
            .documents
            .remove(id)
            .ok_or_else(|| MetadataError::NotFound(format!("id {id}")))?;
        self.by_fingerprint
            .remove_if(&doc.fingerprint, |_, owner| owner == id);
        Ok(())
    }

    async fn ping(&self) -> MetadataResult<()> {
        self.ensure_online()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
