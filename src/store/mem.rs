use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::store::traits::{LookupQuery, ModelStore, Record, SeedStore};

/// In-memory store used for development and tests.
///
/// Rows keep their insertion order, so "first match" is deterministic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held in a table
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, Vec::len)
    }
}

#[async_trait::async_trait]
impl ModelStore for MemoryStore {
    async fn find(&self, query: &LookupQuery) -> Result<Vec<Record>> {
        let tables = self.tables.read();
        let Some(rows) = tables.get(&query.table) else {
            return Ok(Vec::new());
        };

        Ok(rows
            .iter()
            .filter(|row| query.matches(row))
            .take(query.limit)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl SeedStore for MemoryStore {
    async fn insert(&self, table: &str, record: Record) -> Result<()> {
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .push(record);
        Ok(())
    }
}

/// Wraps a store and records every query issued against it.
#[cfg(test)]
pub(crate) struct RecordingStore<S> {
    inner: S,
    queries: parking_lot::Mutex<Vec<LookupQuery>>,
}

#[cfg(test)]
impl<S> RecordingStore<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            queries: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn queries(&self) -> Vec<LookupQuery> {
        self.queries.lock().clone()
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl<S: ModelStore> ModelStore for RecordingStore<S> {
    async fn find(&self, query: &LookupQuery) -> Result<Vec<Record>> {
        self.queries.lock().push(query.clone());
        self.inner.find(query).await
    }
}

/// A store whose every query fails, standing in for a lost connection.
#[cfg(test)]
pub(crate) struct FailingStore;

#[cfg(test)]
#[async_trait::async_trait]
impl ModelStore for FailingStore {
    async fn find(&self, _query: &LookupQuery) -> Result<Vec<Record>> {
        Err(anyhow::anyhow!("connection refused"))
    }
}
