// In: src/services/data_store.rs

//! The shared state store links use to pass data to one another.
//!
//! Keys form one flat namespace for the whole run and there is no collision
//! protection: the last writer wins. The store lives for one run and is dropped
//! when the registry is reset.

use std::collections::HashMap;

use arrow::record_batch::RecordBatch;

use crate::types::StoreValue;

#[derive(Debug, Default, Clone)]
pub struct DataStore {
    entries: HashMap<String, StoreValue>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, returning whatever was there before.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<StoreValue>) -> Option<StoreValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&StoreValue> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut StoreValue> {
        self.entries.get_mut(key)
    }

    pub fn get_table(&self, key: &str) -> Option<&RecordBatch> {
        self.get(key).and_then(StoreValue::as_table)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(StoreValue::as_int)
    }

    pub fn remove(&mut self, key: &str) -> Option<StoreValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in sorted order, so listings are stable across runs.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
