// In: src/link/read_to_dataset/mod.rs

//! The ingestion link: reads one or more files into the data store.
//!
//! Given a set of path patterns, `ReadToDataset` either reads every matching file at
//! once and stores their concatenation, or, when iteration is active, stores one
//! right-sized dataset per `execute` and asks its chain to run again until the
//! source is exhausted.
//!
//! Iteration is decided once, in `initialize`:
//! 1.  A positive `chunk_size` always iterates, whatever the file count.
//! 2.  Otherwise more than one file with `iterate_over_files` iterates file by file.
//! 3.  Otherwise all files are concatenated into a single dataset.
//!
//! Store keys written: `<key>` (the dataset), `n_<key>` (its row count) and, while
//! iterating, `n_sum_<key>` (rows produced so far).

use std::path::PathBuf;
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Deserializer, Serialize};

use super::Link;
use crate::error::ChainrunError;
use crate::services::ServiceRegistry;
use crate::types::StatusCode;

//==================================================================================
// 1. Module Declarations
//==================================================================================

pub mod readers;
pub mod source;

pub use self::readers::{ReaderKind, ReaderOptions};
pub use self::source::{ChunkedSource, SourceState};

//==================================================================================
// 2. Configuration
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ReadToDatasetConfig {
    #[serde(default = "default_link_name")]
    pub name: String,

    /// Glob patterns of the files to read.
    #[serde(alias = "path", deserialize_with = "one_or_many")]
    pub paths: Vec<String>,

    /// Storage key of the dataset in the data store.
    pub key: String,

    /// Explicit reader; when `None` the file extension decides.
    #[serde(default)]
    pub reader: Option<ReaderKind>,

    /// Iterate over files one by one instead of concatenating them.
    /// Ignored when `chunk_size` is set.
    #[serde(default)]
    pub iterate_over_files: bool,

    /// Rows per dataset. Any value turns iteration on.
    #[serde(default)]
    pub chunk_size: Option<usize>,

    /// Columns to keep. Also types the empty dataset of an exhausted source.
    #[serde(default)]
    pub columns: Vec<String>,

    #[serde(default = "default_true")]
    pub has_header: bool,

    #[serde(default)]
    pub delimiter: Option<char>,

    #[serde(default = "default_infer_schema_rows")]
    pub infer_schema_rows: usize,

    /// Schema for text formats. Skips inference when set.
    #[serde(default)]
    pub schema: Option<arrow_schema::Schema>,

    /// Worksheet to read from spreadsheet files. The first sheet when unset.
    #[serde(default)]
    pub sheet: Option<String>,
}

impl ReadToDatasetConfig {
    pub fn new(key: impl Into<String>, paths: Vec<String>) -> Self {
        Self {
            name: default_link_name(),
            paths,
            key: key.into(),
            reader: None,
            iterate_over_files: false,
            chunk_size: None,
            columns: Vec::new(),
            has_header: true,
            delimiter: None,
            infer_schema_rows: default_infer_schema_rows(),
            schema: None,
            sheet: None,
        }
    }
}

fn default_link_name() -> String {
    "ReadToDataset".to_string()
}

fn default_true() -> bool {
    true
}

fn default_infer_schema_rows() -> usize {
    1000
}

/// Accepts either a single pattern or a list of patterns.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(path) => vec![path],
        OneOrMany::Many(paths) => paths,
    })
}

//==================================================================================
// 3. The Link
//==================================================================================

#[derive(Debug)]
pub struct ReadToDataset {
    config: ReadToDatasetConfig,
    /// Set by `initialize`.
    source: Option<ChunkedSource>,
    iterate: bool,
}

impl ReadToDataset {
    /// Validates the configuration. Nothing touches the file system until `initialize`.
    pub fn new(config: ReadToDatasetConfig) -> Result<Self, ChainrunError> {
        let link = config.name.clone();
        if link.is_empty() {
            return Err(ChainrunError::invalid_config("ReadToDataset", "link name is empty"));
        }
        if config.key.is_empty() {
            return Err(ChainrunError::invalid_config(link, "output key not set"));
        }
        if config.paths.is_empty() || config.paths.iter().any(String::is_empty) {
            return Err(ChainrunError::invalid_config(
                link,
                "no file path specified to read dataset from",
            ));
        }
        if config.chunk_size == Some(0) {
            return Err(ChainrunError::invalid_config(
                link,
                "chunk_size needs to be a positive integer",
            ));
        }
        if config.delimiter.is_some_and(|d| !d.is_ascii()) {
            return Err(ChainrunError::invalid_config(link, "delimiter must be an ASCII character"));
        }
        if config.infer_schema_rows == 0 {
            return Err(ChainrunError::invalid_config(
                link,
                "infer_schema_rows needs to be a positive integer",
            ));
        }

        Ok(Self {
            config,
            source: None,
            iterate: false,
        })
    }

    /// Changes the chunk size. Takes effect at the next `initialize`.
    pub fn set_chunk_size(&mut self, size: usize) -> Result<(), ChainrunError> {
        if size == 0 {
            return Err(ChainrunError::invalid_config(
                self.config.name.as_str(),
                "chunk_size needs to be a positive integer",
            ));
        }
        self.config.chunk_size = Some(size);
        Ok(())
    }

    pub fn config(&self) -> &ReadToDatasetConfig {
        &self.config
    }

    pub fn is_iterating(&self) -> bool {
        self.iterate
    }

    /// True once no further dataset will come up. Always true when not iterating.
    pub fn is_finished(&self) -> bool {
        !self.iterate || self.source.as_ref().map_or(true, ChunkedSource::is_finished)
    }

    pub fn latest_count(&self) -> usize {
        self.source.as_ref().map_or(0, ChunkedSource::latest_count)
    }

    pub fn cumulative_count(&self) -> usize {
        self.source.as_ref().map_or(0, ChunkedSource::cumulative_count)
    }

    pub fn source(&self) -> Option<&ChunkedSource> {
        self.source.as_ref()
    }

    /// A single pull from the underlying source, without the retry loop of `execute`.
    pub fn pull(&mut self) -> Result<Option<RecordBatch>, ChainrunError> {
        self.source_mut()?.pull()
    }

    fn source_mut(&mut self) -> Result<&mut ChunkedSource, ChainrunError> {
        let name = &self.config.name;
        self.source.as_mut().ok_or_else(|| {
            ChainrunError::InternalError(format!("link '{}' used before initialize", name))
        })
    }

    fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            has_header: self.config.has_header,
            // Validated ASCII in `new`.
            delimiter: self.config.delimiter.map(|d| d as u8),
            columns: self.config.columns.clone(),
            infer_schema_rows: self.config.infer_schema_rows,
            schema: self.config.schema.clone().map(Arc::new),
            sheet: self.config.sheet.clone(),
        }
    }

    /// Expands every pattern and checks that each match is a regular file.
    fn resolve_paths(&self) -> Result<Vec<PathBuf>, ChainrunError> {
        let mut resolved = Vec::new();
        for pattern in &self.config.paths {
            let entries = glob::glob(pattern).map_err(|err| ChainrunError::InvalidPattern {
                pattern: pattern.clone(),
                reason: err.to_string(),
            })?;
            for entry in entries {
                resolved.push(entry?);
            }
        }

        if resolved.is_empty() {
            log::error!(
                "specified files not found for ReadToDataset instance \"{}\"",
                self.config.name
            );
            return Err(ChainrunError::NoPathsFound {
                patterns: self.config.paths.clone(),
            });
        }
        if let Some(path) = resolved.iter().find(|p| !p.is_file()) {
            log::error!(
                "not all paths for ReadToDataset instance \"{}\" are files",
                self.config.name
            );
            return Err(ChainrunError::NotAFile(path.clone()));
        }
        Ok(resolved)
    }
}

impl Link for ReadToDataset {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn initialize(&mut self, ctx: &mut ServiceRegistry) -> Result<StatusCode, ChainrunError> {
        let files = self
            .resolve_paths()?
            .into_iter()
            .map(|path| {
                let kind = ReaderKind::resolve(&path, self.config.reader)?;
                Ok((path, kind))
            })
            .collect::<Result<Vec<_>, ChainrunError>>()?;

        self.iterate = match self.config.chunk_size {
            Some(_) => true,
            None => files.len() > 1 && self.config.iterate_over_files,
        };
        log::info!(
            "[{}] File and/or chunk iterator is active: {}.",
            self.config.name,
            self.iterate
        );
        if let Some(chunk_size) = self.config.chunk_size {
            log::info!("[{}] chunk_size = {}.", self.config.name, chunk_size);
            if let Some((path, kind)) = files.iter().find(|(_, kind)| !kind.supports_chunking()) {
                log::warn!(
                    "[{}] reader \"{}\" cannot chunk {}; that file is read as one dataset",
                    self.config.name,
                    kind.tag(),
                    path.display()
                );
            }
        }

        // A flag left over from an earlier run must not repeat this one.
        if ctx.config().map_or(false, |c| c.repeat_requested(&self.config.name)) {
            log::debug!("[{}] Clearing stale repeat flag.", self.config.name);
            ctx.config_mut().set_repeat_request(&self.config.name, false);
        }

        self.source = Some(ChunkedSource::new(
            files,
            self.config.chunk_size,
            self.reader_options(),
        ));
        Ok(StatusCode::Success)
    }

    fn execute(&mut self, ctx: &mut ServiceRegistry) -> Result<StatusCode, ChainrunError> {
        let iterate = self.iterate;
        let key = self.config.key.clone();
        let name = self.config.name.clone();
        let source = self.source_mut()?;

        // 1. No iteration: concatenate everything into one dataset.
        if !iterate {
            log::debug!(
                "[{}] reading datasets from files [{}]",
                name,
                source
                    .files()
                    .iter()
                    .map(|(p, _)| format!("\"{}\"", p.display()))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            let data = source.read_all()?;
            let num_entries = data.num_rows();

            let store = ctx.store_mut();
            store.insert(key.clone(), data);
            store.insert(format!("n_{}", key), num_entries);
            return Ok(StatusCode::Success);
        }

        // 2. Iteration: pick up the next non-empty dataset, or the typed empty one.
        let data = source.next_dataset()?;
        let finished = source.is_finished();
        let num_entries = source.latest_count();
        let sum_entries = source.cumulative_count();

        // Tell the chain whether more datasets are coming up.
        ctx.config_mut().set_repeat_request(&name, !finished);

        log::info!(
            "[{}] Read next <{}> records; summing up to <{}>.",
            name,
            num_entries,
            sum_entries
        );
        let store = ctx.store_mut();
        store.insert(format!("n_sum_{}", key), sum_entries);
        store.insert(key.clone(), data);
        store.insert(format!("n_{}", key), num_entries);

        Ok(StatusCode::Success)
    }

    fn finalize(&mut self, _ctx: &mut ServiceRegistry) -> Result<StatusCode, ChainrunError> {
        if let Some(source) = self.source.as_mut() {
            source.close();
            if self.iterate {
                log::info!(
                    "[{}] Closed source after <{}> records.",
                    self.config.name,
                    source.cumulative_count()
                );
            }
        }
        Ok(StatusCode::Success)
    }
}

#[cfg(test)]
mod tests;
