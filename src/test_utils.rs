//! Fixture helpers shared by the unit tests.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Writes `rows` records `id,value,label` starting at `first_id`.
pub(crate) fn write_csv(dir: &Path, name: &str, first_id: i64, rows: usize) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    writeln!(file, "id,value,label").unwrap();
    for id in first_id..first_id + rows as i64 {
        writeln!(file, "{},{:.1},row{}", id, id as f64 * 0.5, id).unwrap();
    }
    path
}

/// Same records as `write_csv`, one JSON object per line.
pub(crate) fn write_ndjson(dir: &Path, name: &str, first_id: i64, rows: usize) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    for id in first_id..first_id + rows as i64 {
        writeln!(
            file,
            r#"{{"id": {}, "value": {:.1}, "label": "row{}"}}"#,
            id,
            id as f64 * 0.5,
            id
        )
        .unwrap();
    }
    path
}

pub(crate) fn sample_batch(first_id: i64, rows: usize) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, true),
        Field::new("value", DataType::Float64, true),
        Field::new("label", DataType::Utf8, true),
    ]));
    let ids: Vec<i64> = (first_id..first_id + rows as i64).collect();
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids.clone())),
            Arc::new(Float64Array::from(
                ids.iter().map(|id| *id as f64 * 0.5).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                ids.iter().map(|id| format!("row{}", id)).collect::<Vec<_>>(),
            )),
        ],
    )
    .unwrap()
}

/// Writes `sample_batch(first_id, rows)` as an Arrow IPC file.
pub(crate) fn write_arrow(dir: &Path, name: &str, first_id: i64, rows: usize) -> PathBuf {
    let path = dir.join(name);
    let batch = sample_batch(first_id, rows);
    let file = File::create(&path).unwrap();
    let mut writer = FileWriter::try_new(file, &batch.schema()).unwrap();
    writer.write(&batch).unwrap();
    writer.finish().unwrap();
    path
}

/// Writes `sample_batch(first_id, rows)` as a Parquet file.
pub(crate) fn write_parquet(dir: &Path, name: &str, first_id: i64, rows: usize) -> PathBuf {
    let path = dir.join(name);
    let batch = sample_batch(first_id, rows);
    let file = File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
    path
}

pub(crate) fn pattern(dir: &Path, glob: &str) -> String {
    dir.join(glob).display().to_string()
}

/// The `id` column of `batch` as plain integers.
pub(crate) fn ids(batch: &RecordBatch) -> Vec<i64> {
    let column = batch.column_by_name("id").unwrap();
    let ids = column.as_any().downcast_ref::<Int64Array>().unwrap();
    (0..ids.len()).map(|i| ids.value(i)).collect()
}
