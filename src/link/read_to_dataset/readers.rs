// In: src/link/read_to_dataset/readers.rs

//! The closed registry of file readers.
//!
//! Every on-disk format the engine can ingest is one `ReaderKind`. A file's reader is
//! picked by an explicit override first, then by extension lookup; both go through
//! the same table, so a tag that resolves for one also resolves for the other.
//!
//! Readers come in two capabilities:
//! - **chunked** (`csv`, `tsv`, `json`, `parquet`): opened as a streaming
//!   `RecordBatchReader` that yields at most `chunk_size` rows per batch.
//! - **whole-table** (`arrow`, `excel`): the file is read completely on open and
//!   yields one `RecordBatch`.
//!
//! A column projection is applied inside the reader, so the schema a reader reports
//! is always the schema of the batches it yields.

use std::fs::File;
use std::io::{BufReader, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::{RecordBatch, RecordBatchIterator, RecordBatchOptions, RecordBatchReader};
use calamine::{Data, Range, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};

use crate::error::ChainrunError;

/// Batch size used when a chunked format is read in one go.
const WHOLE_FILE_BATCH_ROWS: usize = 65_536;

//==================================================================================
// I. Reader Registry
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReaderKind {
    /// Comma separated values with an optional header row.
    Csv,
    /// Tab separated values.
    Tsv,
    /// Line-delimited JSON, one object per row.
    Json,
    /// Arrow IPC file format.
    Arrow,
    /// Apache Parquet.
    Parquet,
    /// Spreadsheet workbooks (xls, xlsx, xlsb, ods). One sheet per file is read.
    Excel,
}

/// Extension to reader table. Lookups are case-insensitive.
const EXTENSION_TABLE: &[(&str, ReaderKind)] = &[
    ("csv", ReaderKind::Csv),
    ("tsv", ReaderKind::Tsv),
    ("tab", ReaderKind::Tsv),
    ("json", ReaderKind::Json),
    ("jsonl", ReaderKind::Json),
    ("ndjson", ReaderKind::Json),
    ("arrow", ReaderKind::Arrow),
    ("ipc", ReaderKind::Arrow),
    ("feather", ReaderKind::Arrow),
    ("parquet", ReaderKind::Parquet),
    ("pq", ReaderKind::Parquet),
    ("excel", ReaderKind::Excel),
    ("xls", ReaderKind::Excel),
    ("xlsx", ReaderKind::Excel),
    ("xlsm", ReaderKind::Excel),
    ("xlsb", ReaderKind::Excel),
    ("ods", ReaderKind::Excel),
];

impl ReaderKind {
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        EXTENSION_TABLE
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, kind)| *kind)
    }

    /// Picks the reader for `path`: the override if given, else the extension lookup.
    pub fn resolve(path: &Path, override_kind: Option<ReaderKind>) -> Result<Self, ChainrunError> {
        if let Some(kind) = override_kind {
            return Ok(kind);
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| {
                log::error!("no suitable reader found for file {}", path.display());
                ChainrunError::NoReaderFound(path.to_path_buf())
            })
    }

    /// Whether this format can be streamed in fixed-size chunks.
    pub fn supports_chunking(&self) -> bool {
        !matches!(self, ReaderKind::Arrow | ReaderKind::Excel)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ReaderKind::Csv => "csv",
            ReaderKind::Tsv => "tsv",
            ReaderKind::Json => "json",
            ReaderKind::Arrow => "arrow",
            ReaderKind::Parquet => "parquet",
            ReaderKind::Excel => "excel",
        }
    }
}

//==================================================================================
// II. Reader Options & Open Results
//==================================================================================

/// Format options shared by every file of one source.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// First row holds column names (csv, tsv, excel).
    pub has_header: bool,
    /// Overrides the reader's own delimiter (csv: `,`, tsv: `\t`).
    pub delimiter: Option<u8>,
    /// Column projection by name. Empty means all columns.
    pub columns: Vec<String>,
    pub infer_schema_rows: usize,
    /// Explicit schema for text formats; skips inference when set.
    pub schema: Option<SchemaRef>,
    /// Worksheet to read from a workbook. The first sheet when unset.
    pub sheet: Option<String>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: None,
            columns: Vec::new(),
            infer_schema_rows: 1000,
            schema: None,
            sheet: None,
        }
    }
}

impl ReaderOptions {
    /// Schema of the empty result of a source that never opened a file.
    ///
    /// `ReadToDataset` always resolves at least one file, so this only types the
    /// output of a `ChunkedSource` built directly over an empty file list.
    pub fn fallback_schema(&self) -> SchemaRef {
        if let Some(schema) = &self.schema {
            if self.columns.is_empty() {
                return Arc::clone(schema);
            }
            let fields: Vec<Field> = self
                .columns
                .iter()
                .filter_map(|name| schema.field_with_name(name).ok().cloned())
                .collect();
            return Arc::new(Schema::new(fields));
        }
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect();
        Arc::new(Schema::new(fields))
    }
}

/// What opening a file produces.
pub enum OpenedFile {
    /// The file was consumed completely on open.
    Whole(RecordBatch),
    /// A streaming reader positioned at the first row.
    Chunked(Box<dyn RecordBatchReader>),
}

impl OpenedFile {
    /// Schema of the data this file yields, after projection.
    pub fn schema(&self) -> SchemaRef {
        match self {
            OpenedFile::Whole(batch) => batch.schema(),
            OpenedFile::Chunked(reader) => reader.schema(),
        }
    }
}

//==================================================================================
// III. Public Open / Read Functions
//==================================================================================

/// Opens `path` with `kind`.
///
/// With a `chunk_size` and a chunk-capable format the result is `Chunked`; in every
/// other case the file is read completely and the result is `Whole`.
pub fn open_file(
    path: &Path,
    kind: ReaderKind,
    options: &ReaderOptions,
    chunk_size: Option<usize>,
) -> Result<OpenedFile, ChainrunError> {
    log::debug!("using reader \"{}\" for {}", kind.tag(), path.display());
    match (kind, chunk_size) {
        (ReaderKind::Arrow, _) => Ok(OpenedFile::Whole(read_arrow_file(path, options)?)),
        (ReaderKind::Excel, _) => Ok(OpenedFile::Whole(read_excel_file(path, options)?)),
        (_, Some(chunk_size)) => Ok(OpenedFile::Chunked(open_stream_reader(
            path, kind, options, chunk_size,
        )?)),
        (_, None) => {
            let reader = open_stream_reader(path, kind, options, WHOLE_FILE_BATCH_ROWS)?;
            Ok(OpenedFile::Whole(drain_reader(reader)?))
        }
    }
}

/// Reads every file completely and concatenates them in the given order.
pub fn read_concatenated(
    files: &[(PathBuf, ReaderKind)],
    options: &ReaderOptions,
) -> Result<RecordBatch, ChainrunError> {
    let mut batches = Vec::with_capacity(files.len());
    for (path, kind) in files {
        match open_file(path, *kind, options, None)? {
            OpenedFile::Whole(batch) => batches.push(batch),
            OpenedFile::Chunked(reader) => batches.push(drain_reader(reader)?),
        }
    }

    let schema = match batches.first() {
        Some(first) => first.schema(),
        None => options.fallback_schema(),
    };
    for (batch, (path, _)) in batches.iter().zip(files) {
        if batch.schema().fields() != schema.fields() {
            return Err(ArrowError::SchemaError(format!(
                "schema of {} does not match the schema of the first file",
                path.display()
            ))
            .into());
        }
    }
    Ok(concat_batches(&schema, &batches)?)
}

//==================================================================================
// IV. Format-Specific Helpers
//==================================================================================

fn open_stream_reader(
    path: &Path,
    kind: ReaderKind,
    options: &ReaderOptions,
    batch_size: usize,
) -> Result<Box<dyn RecordBatchReader>, ChainrunError> {
    match kind {
        ReaderKind::Csv => open_csv(path, options.delimiter.unwrap_or(b','), options, batch_size),
        ReaderKind::Tsv => open_csv(path, options.delimiter.unwrap_or(b'\t'), options, batch_size),
        ReaderKind::Json => open_json(path, options, batch_size),
        ReaderKind::Parquet => open_parquet(path, options, batch_size),
        ReaderKind::Arrow | ReaderKind::Excel => Err(ChainrunError::InternalError(format!(
            "{} files are never streamed",
            kind.tag()
        ))),
    }
}

fn open_csv(
    path: &Path,
    delimiter: u8,
    options: &ReaderOptions,
    batch_size: usize,
) -> Result<Box<dyn RecordBatchReader>, ChainrunError> {
    let mut file = File::open(path)?;
    let schema = match &options.schema {
        Some(schema) => Arc::clone(schema),
        None => {
            let format = arrow::csv::reader::Format::default()
                .with_header(options.has_header)
                .with_delimiter(delimiter);
            let (schema, _) = format.infer_schema(&mut file, Some(options.infer_schema_rows))?;
            file.rewind()?;
            Arc::new(schema)
        }
    };

    // Resolve the projection before decoding anything, so a missing column fails fast.
    let indices = projection(&schema, &options.columns, path)?;
    let reader = arrow::csv::ReaderBuilder::new(schema)
        .with_header(options.has_header)
        .with_delimiter(delimiter)
        .with_batch_size(batch_size)
        .build(file)?;
    project_reader(reader, indices)
}

fn open_json(
    path: &Path,
    options: &ReaderOptions,
    batch_size: usize,
) -> Result<Box<dyn RecordBatchReader>, ChainrunError> {
    let mut reader = BufReader::new(File::open(path)?);
    let schema = match &options.schema {
        Some(schema) => Arc::clone(schema),
        None => {
            // Rewinds the reader to where it started.
            let (schema, _) = arrow::json::reader::infer_json_schema_from_seekable(
                &mut reader,
                Some(options.infer_schema_rows),
            )?;
            Arc::new(schema)
        }
    };

    // The JSON decoder only materializes the fields of its schema.
    let schema = match projection(&schema, &options.columns, path)? {
        Some(indices) => Arc::new(schema.project(&indices)?),
        None => schema,
    };
    let json_reader = arrow::json::ReaderBuilder::new(schema)
        .with_batch_size(batch_size)
        .build(reader)?;
    Ok(Box::new(json_reader))
}

fn open_parquet(
    path: &Path,
    options: &ReaderOptions,
    batch_size: usize,
) -> Result<Box<dyn RecordBatchReader>, ChainrunError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
    let indices = projection(builder.schema(), &options.columns, path)?;
    let reader = builder.with_batch_size(batch_size).build()?;
    project_reader(reader, indices)
}

fn read_arrow_file(path: &Path, options: &ReaderOptions) -> Result<RecordBatch, ChainrunError> {
    let reader = arrow::ipc::reader::FileReader::try_new(File::open(path)?, None)?;
    let batch = drain_reader(Box::new(reader))?;
    match projection(&batch.schema(), &options.columns, path)? {
        Some(indices) => Ok(batch.project(&indices)?),
        None => Ok(batch),
    }
}

fn read_excel_file(path: &Path, options: &ReaderOptions) -> Result<RecordBatch, ChainrunError> {
    let mut workbook = calamine::open_workbook_auto(path)?;
    let range = match &options.sheet {
        Some(sheet) => {
            if !workbook.sheet_names().iter().any(|name| name == sheet) {
                log::error!("no sheet \"{}\" in {}", sheet, path.display());
                return Err(ChainrunError::NoSheetFound(path.to_path_buf()));
            }
            workbook.worksheet_range(sheet)?
        }
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ChainrunError::NoSheetFound(path.to_path_buf()))??,
    };

    let batch = range_to_batch(&range, options.has_header)?;
    match projection(&batch.schema(), &options.columns, path)? {
        Some(indices) => Ok(batch.project(&indices)?),
        None => Ok(batch),
    }
}

/// Converts a worksheet range into a batch, one typed column per sheet column.
///
/// Unnamed columns are called `column_<n>` (1-based), like the CSV reader does for
/// headerless files. Empty cells become nulls.
pub fn range_to_batch(range: &Range<Data>, has_header: bool) -> Result<RecordBatch, ChainrunError> {
    let rows: Vec<&[Data]> = range.rows().collect();
    let width = range.width();

    let (header, body) = match rows.split_first() {
        Some((first, rest)) if has_header => (Some(*first), rest),
        _ => (None, rows.as_slice()),
    };

    let mut fields = Vec::with_capacity(width);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(width);
    for index in 0..width {
        let name = match header.and_then(|row| row.get(index)) {
            Some(Data::Empty) | None => format!("column_{}", index + 1),
            Some(cell) => cell.to_string(),
        };
        let cells: Vec<Option<&Data>> = body
            .iter()
            .map(|row| row.get(index).filter(|cell| !matches!(cell, Data::Empty)))
            .collect();
        let (data_type, array) = sheet_column(&cells);
        fields.push(Field::new(name, data_type, true));
        columns.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(body.len()));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::new(fields)),
        columns,
        &options,
    )?)
}

/// Picks the narrowest type that holds every non-empty cell.
fn sheet_column(cells: &[Option<&Data>]) -> (DataType, ArrayRef) {
    let present: Vec<&Data> = cells.iter().flatten().copied().collect();

    if !present.is_empty() && present.iter().all(|c| matches!(c, Data::Int(_))) {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|cell| match cell {
                Some(Data::Int(v)) => Some(*v),
                _ => None,
            })
            .collect();
        return (DataType::Int64, Arc::new(Int64Array::from(values)));
    }
    if !present.is_empty()
        && present
            .iter()
            .all(|c| matches!(c, Data::Int(_) | Data::Float(_)))
    {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| match cell {
                Some(Data::Int(v)) => Some(*v as f64),
                Some(Data::Float(v)) => Some(*v),
                _ => None,
            })
            .collect();
        return (DataType::Float64, Arc::new(Float64Array::from(values)));
    }
    if !present.is_empty() && present.iter().all(|c| matches!(c, Data::Bool(_))) {
        let values: Vec<Option<bool>> = cells
            .iter()
            .map(|cell| match cell {
                Some(Data::Bool(v)) => Some(*v),
                _ => None,
            })
            .collect();
        return (DataType::Boolean, Arc::new(BooleanArray::from(values)));
    }

    let values: Vec<Option<String>> = cells
        .iter()
        .map(|cell| match cell {
            Some(Data::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .collect();
    (DataType::Utf8, Arc::new(StringArray::from(values)))
}

/// Wraps `reader` so that its batches and its reported schema carry only `indices`.
fn project_reader<R>(
    reader: R,
    indices: Option<Vec<usize>>,
) -> Result<Box<dyn RecordBatchReader>, ChainrunError>
where
    R: RecordBatchReader + 'static,
{
    let Some(indices) = indices else {
        return Ok(Box::new(reader));
    };
    let schema = Arc::new(reader.schema().project(&indices)?);
    let batches = reader.map(move |batch| batch.and_then(|batch| batch.project(&indices)));
    Ok(Box::new(RecordBatchIterator::new(batches, schema)))
}

/// Reads every remaining batch of `reader` into one `RecordBatch`.
fn drain_reader(reader: Box<dyn RecordBatchReader>) -> Result<RecordBatch, ChainrunError> {
    let schema = reader.schema();
    let batches = reader.collect::<Result<Vec<_>, ArrowError>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

/// Maps projected column names to indices in `schema`.
fn projection(
    schema: &Schema,
    columns: &[String],
    path: &Path,
) -> Result<Option<Vec<usize>>, ChainrunError> {
    if columns.is_empty() {
        return Ok(None);
    }
    columns
        .iter()
        .map(|column| {
            schema
                .index_of(column)
                .map_err(|_| ChainrunError::ColumnNotFound {
                    column: column.clone(),
                    path: path.to_path_buf(),
                })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
