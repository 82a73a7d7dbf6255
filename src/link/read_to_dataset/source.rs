// In: src/link/read_to_dataset/source.rs

// --- ARCHITECTURAL NOTE ---
//
// `ChunkedSource` is a pull-based generator with external state. Every call to
// `pull` drives the `SourceState` machine forward until it either emits a batch or
// has nothing to emit for this attempt:
//
//   state                 | event                   | next state
//   ----------------------+-------------------------+------------------------------
//   ReaderOpen(r)         | r yields a batch        | ReaderOpen(r)   (emit batch)
//   ReaderOpen(r)         | r hits end-of-data      | Idle            (emit nothing)
//   Idle                  | files remain            | FileOpen(f)     (cursor += 1)
//   FileOpen(Whole(b))    | same pull               | Idle            (emit b)
//   FileOpen(Chunked(r))  | same pull               | ReaderOpen(r)   (pull first chunk)
//   Idle                  | no files remain         | Exhausted       (emit nothing)
//   Exhausted             | any                     | Exhausted       (emit nothing)
//
// A whole-table file counts as fully consumed by the pull that opened it, even
// while iterating with a chunk size. At most one reader is alive at any time: the
// old one is dropped on the `ReaderOpen -> Idle` edge before the next file opens.
//
// --- END ARCHITECTURAL NOTE ---

use std::path::{Path, PathBuf};

use arrow::datatypes::SchemaRef;
use arrow::record_batch::{RecordBatch, RecordBatchReader};

use super::readers::{self, OpenedFile, ReaderKind, ReaderOptions};
use crate::error::ChainrunError;

pub enum SourceState {
    Idle,
    FileOpen(OpenedFile),
    ReaderOpen(Box<dyn RecordBatchReader>),
    Exhausted,
}

impl SourceState {
    pub fn name(&self) -> &'static str {
        match self {
            SourceState::Idle => "Idle",
            SourceState::FileOpen(_) => "FileOpen",
            SourceState::ReaderOpen(_) => "ReaderOpen",
            SourceState::Exhausted => "Exhausted",
        }
    }
}

impl std::fmt::Debug for SourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Iteration state over the resolved files of one source.
#[derive(Debug)]
pub struct ChunkedSource {
    files: Vec<(PathBuf, ReaderKind)>,
    /// Index of the next file to open. Only moves forward.
    cursor: usize,
    chunk_size: Option<usize>,
    options: ReaderOptions,
    state: SourceState,
    current_path: Option<PathBuf>,
    latest_count: usize,
    cumulative_count: usize,
    last_schema: Option<SchemaRef>,
}

impl ChunkedSource {
    pub fn new(
        files: Vec<(PathBuf, ReaderKind)>,
        chunk_size: Option<usize>,
        options: ReaderOptions,
    ) -> Self {
        Self {
            files,
            cursor: 0,
            chunk_size,
            options,
            state: SourceState::Idle,
            current_path: None,
            latest_count: 0,
            cumulative_count: 0,
            last_schema: None,
        }
    }

    //==============================================================================
    // Pull API
    //==============================================================================

    /// Produces the next available batch, if this attempt yields one, and updates
    /// the row bookkeeping.
    pub fn pull(&mut self) -> Result<Option<RecordBatch>, ChainrunError> {
        let data = self.advance()?;
        self.latest_count = data.as_ref().map_or(0, RecordBatch::num_rows);
        self.cumulative_count += self.latest_count;
        Ok(data)
    }

    /// Pulls until a non-empty batch appears or the source is finished.
    ///
    /// Never returns an absent value: once exhausted the result is an empty batch
    /// typed like the last file read (or like the configured projection if no
    /// file was ever opened).
    pub fn next_dataset(&mut self) -> Result<RecordBatch, ChainrunError> {
        let mut data = self.pull()?;
        while self.latest_count == 0 && !self.is_finished() {
            data = self.pull()?;
        }

        match data {
            Some(batch) if batch.num_rows() > 0 => Ok(batch),
            _ => {
                debug_assert!(
                    self.is_finished(),
                    "got an empty dataset but the source is not finished"
                );
                Ok(self.empty_table())
            }
        }
    }

    /// Reads all files completely, concatenated in path order. Leaves iteration
    /// state untouched.
    pub fn read_all(&mut self) -> Result<RecordBatch, ChainrunError> {
        let batch = readers::read_concatenated(&self.files, &self.options)?;
        self.latest_count = batch.num_rows();
        self.last_schema = Some(batch.schema());
        Ok(batch)
    }

    /// True once every file has been opened and the last one has nothing left.
    ///
    /// With a chunk size, a chunk shorter than the chunk size is the end-of-data
    /// signal of the open reader; a cleared reader means the same.
    pub fn is_finished(&self) -> bool {
        if self.cursor < self.files.len() {
            return false;
        }
        match self.chunk_size {
            Some(chunk_size) => {
                self.latest_count < chunk_size
                    || !matches!(self.state, SourceState::ReaderOpen(_))
            }
            None => true,
        }
    }

    //==============================================================================
    // State Machine
    //==============================================================================

    fn advance(&mut self) -> Result<Option<RecordBatch>, ChainrunError> {
        loop {
            match std::mem::replace(&mut self.state, SourceState::Idle) {
                SourceState::ReaderOpen(mut reader) => match reader.next() {
                    Some(batch) => {
                        let batch = batch?;
                        self.state = SourceState::ReaderOpen(reader);
                        return Ok(Some(batch));
                    }
                    None => {
                        log::debug!("Reached end of file [{}]", self.current_path_display());
                        return Ok(None);
                    }
                },
                SourceState::Idle => {
                    let Some((path, kind)) = self.files.get(self.cursor).cloned() else {
                        self.state = SourceState::Exhausted;
                        return Ok(None);
                    };
                    self.cursor += 1;
                    let opened = readers::open_file(&path, kind, &self.options, self.chunk_size)
                        .map_err(|err| {
                            log::error!("Could not read from new path <{}>", path.display());
                            err
                        })?;
                    log::info!("Opened new file [{}]", path.display());
                    self.last_schema = Some(opened.schema());
                    self.current_path = Some(path);
                    self.state = SourceState::FileOpen(opened);
                }
                SourceState::FileOpen(OpenedFile::Whole(batch)) => {
                    return Ok(Some(batch));
                }
                SourceState::FileOpen(OpenedFile::Chunked(reader)) => {
                    self.state = SourceState::ReaderOpen(reader);
                }
                SourceState::Exhausted => {
                    self.state = SourceState::Exhausted;
                    return Ok(None);
                }
            }
        }
    }

    /// Drops any open reader. Safe to call at any point.
    pub fn close(&mut self) {
        self.state = if self.cursor < self.files.len() {
            SourceState::Idle
        } else {
            SourceState::Exhausted
        };
    }

    pub fn empty_table(&self) -> RecordBatch {
        let schema = self
            .last_schema
            .clone()
            .unwrap_or_else(|| self.options.fallback_schema());
        RecordBatch::new_empty(schema)
    }

    //==============================================================================
    // Accessors
    //==============================================================================

    pub fn latest_count(&self) -> usize {
        self.latest_count
    }

    pub fn cumulative_count(&self) -> usize {
        self.cumulative_count
    }

    pub fn files(&self) -> &[(PathBuf, ReaderKind)] {
        &self.files
    }

    pub fn files_remaining(&self) -> usize {
        self.files.len() - self.cursor
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    pub fn state(&self) -> &SourceState {
        &self.state
    }

    fn current_path_display(&self) -> String {
        self.current_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }
}
