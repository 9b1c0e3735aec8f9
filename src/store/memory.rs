//! In-memory record store.
//!
//! Thread-safe reference implementation of [`RecordStore`], intended
//! for embedded usage and tests.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use crate::identity::{CheckSlug, Identifier};
use crate::record::CheckRecord;
use crate::store::traits::{RecordPatch, RecordStore, StoreError};

fn lock_err(context: &'static str) -> StoreError {
    StoreError::Backend(format!("poisoned lock: {context}"))
}

/// Thread-safe in-memory record store.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<(CheckSlug, Identifier), CheckRecord>>,
}

impl InMemoryRecordStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    ///
    /// # Errors
    ///
    /// Fails only on a poisoned lock.
    pub fn len(&self) -> Result<usize, StoreError> {
        let records = self.records.read().map_err(|_| lock_err("records.len"))?;
        Ok(records.len())
    }

    /// Returns true if the store holds no records.
    ///
    /// # Errors
    ///
    /// Fails only on a poisoned lock.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(
        &self,
        slug: &CheckSlug,
        identifier: &Identifier,
    ) -> Result<Option<CheckRecord>, StoreError> {
        let records = self.records.read().map_err(|_| lock_err("records.get"))?;
        Ok(records.get(&(slug.clone(), identifier.clone())).cloned())
    }

    fn get_or_create(&self, candidate: CheckRecord) -> Result<(CheckRecord, bool), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| lock_err("records.get_or_create"))?;
        match records.entry(candidate.key()) {
            Entry::Occupied(entry) => Ok((entry.get().clone(), false)),
            Entry::Vacant(entry) => {
                let record = entry.insert(candidate).clone();
                Ok((record, true))
            }
        }
    }

    fn update(
        &self,
        slug: &CheckSlug,
        identifier: &Identifier,
        patch: RecordPatch,
    ) -> Result<CheckRecord, StoreError> {
        let mut records = self.records.write().map_err(|_| lock_err("records.update"))?;
        let record = records
            .get_mut(&(slug.clone(), identifier.clone()))
            .ok_or_else(|| StoreError::NotFound {
                slug: slug.clone(),
                identifier: identifier.clone(),
            })?;
        patch.apply_to(record);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    fn for_check(&self, slug: &CheckSlug) -> Result<Vec<CheckRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| lock_err("records.for_check"))?;
        let mut found: Vec<CheckRecord> = records
            .values()
            .filter(|record| &record.slug == slug)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(found)
    }
}
