//! Values held in the shared data store.
//!
//! The store is a flat namespace shared by every link in a run. A closed enum keeps
//! the shapes links exchange explicit: tables travel as Arrow `RecordBatch`es,
//! bookkeeping counters as integers, and anything structured as lists or maps.

use std::collections::BTreeMap;

use arrow::record_batch::RecordBatch;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    Table(RecordBatch),
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    List(Vec<StoreValue>),
    Map(BTreeMap<String, StoreValue>),
}

impl StoreValue {
    pub fn as_table(&self) -> Option<&RecordBatch> {
        match self {
            StoreValue::Table(batch) => Some(batch),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            StoreValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            StoreValue::Float(v) => Some(*v),
            StoreValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StoreValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StoreValue::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Short name of the variant, used in log lines and type-mismatch messages.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreValue::Table(_) => "table",
            StoreValue::Int(_) => "int",
            StoreValue::Float(_) => "float",
            StoreValue::Bool(_) => "bool",
            StoreValue::Text(_) => "text",
            StoreValue::List(_) => "list",
            StoreValue::Map(_) => "map",
        }
    }
}

impl From<RecordBatch> for StoreValue {
    fn from(batch: RecordBatch) -> Self {
        StoreValue::Table(batch)
    }
}

impl From<i64> for StoreValue {
    fn from(v: i64) -> Self {
        StoreValue::Int(v)
    }
}

// Row counts are `usize` everywhere in arrow.
impl From<usize> for StoreValue {
    fn from(v: usize) -> Self {
        StoreValue::Int(v as i64)
    }
}

impl From<f64> for StoreValue {
    fn from(v: f64) -> Self {
        StoreValue::Float(v)
    }
}

impl From<bool> for StoreValue {
    fn from(v: bool) -> Self {
        StoreValue::Bool(v)
    }
}

impl From<String> for StoreValue {
    fn from(v: String) -> Self {
        StoreValue::Text(v)
    }
}

impl From<&str> for StoreValue {
    fn from(v: &str) -> Self {
        StoreValue::Text(v.to_string())
    }
}

impl From<Vec<StoreValue>> for StoreValue {
    fn from(v: Vec<StoreValue>) -> Self {
        StoreValue::List(v)
    }
}

impl From<BTreeMap<String, StoreValue>> for StoreValue {
    fn from(v: BTreeMap<String, StoreValue>) -> Self {
        StoreValue::Map(v)
    }
}
