use super::*;
use crate::config::ConfigObject;
use crate::test_utils::{ids, pattern, write_arrow, write_csv, write_ndjson, write_parquet};
use arrow::datatypes::{DataType, Field, Schema};
use rand::Rng;
use tempfile::TempDir;

//==============================================================================
// Test Helpers
//==============================================================================

fn reader_for(key: &str, patterns: Vec<String>) -> ReadToDatasetConfig {
    let mut config = ReadToDatasetConfig::new(key, patterns);
    config.name = "reader".to_string();
    config
}

fn initialized(config: ReadToDatasetConfig, ctx: &mut ServiceRegistry) -> ReadToDataset {
    let mut link = ReadToDataset::new(config).expect("valid configuration");
    assert_eq!(link.initialize(ctx).unwrap(), StatusCode::Success);
    link
}

/// Executes `link` until it stops asking for a repeat. Returns the row count of
/// each stored dataset and the repeat flag written after each execute.
fn drain_by_execute(link: &mut ReadToDataset, ctx: &mut ServiceRegistry) -> (Vec<usize>, Vec<bool>) {
    let mut sizes = Vec::new();
    let mut flags = Vec::new();
    loop {
        assert_eq!(link.execute(ctx).unwrap(), StatusCode::Success);
        sizes.push(ctx.store().unwrap().get_table("data").unwrap().num_rows());
        let repeat = ctx.config().unwrap().repeat_requested("reader");
        flags.push(repeat);
        if !repeat {
            return (sizes, flags);
        }
        assert!(sizes.len() < 1000, "source never finished");
    }
}

//==============================================================================
// Iteration OFF
//==============================================================================

#[test]
fn test_single_file_without_chunk_size_reads_everything_at_once() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "records.csv", 0, 10);
    let mut ctx = ServiceRegistry::new();

    let mut link = initialized(reader_for("data", vec![pattern(dir.path(), "records.csv")]), &mut ctx);
    assert!(!link.is_iterating());
    assert!(link.is_finished());

    assert_eq!(link.execute(&mut ctx).unwrap(), StatusCode::Success);

    let store = ctx.store().unwrap();
    assert_eq!(store.get_table("data").unwrap().num_rows(), 10);
    assert_eq!(store.get_int("n_data"), Some(10));
    assert!(!store.contains_key("n_sum_data"));
    // Non-iterating links never touch the repeat flag.
    assert!(!ctx
        .config()
        .map_or(false, |c| c.contains(&ConfigObject::repeat_request_key("reader"))));
}

#[test]
fn test_multiple_files_are_concatenated_in_path_order() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "part_b.csv", 100, 3);
    write_csv(dir.path(), "part_a.csv", 0, 4);
    write_csv(dir.path(), "part_c.csv", 200, 2);
    let mut ctx = ServiceRegistry::new();

    let mut link = initialized(reader_for("data", vec![pattern(dir.path(), "part_*.csv")]), &mut ctx);
    assert!(!link.is_iterating());
    link.execute(&mut ctx).unwrap();

    let data = ctx.store().unwrap().get_table("data").unwrap().clone();
    assert_eq!(ids(&data), vec![0, 1, 2, 3, 100, 101, 102, 200, 201]);
    assert_eq!(ctx.store().unwrap().get_int("n_data"), Some(9));
}

#[test]
fn test_explicit_pattern_order_is_kept() {
    let dir = TempDir::new().unwrap();
    let second = write_csv(dir.path(), "a.csv", 10, 2);
    let first = write_csv(dir.path(), "b.csv", 0, 2);
    let mut ctx = ServiceRegistry::new();

    let config = reader_for(
        "data",
        vec![first.display().to_string(), second.display().to_string()],
    );
    let mut link = initialized(config, &mut ctx);
    link.execute(&mut ctx).unwrap();

    let data = ctx.store().unwrap().get_table("data").unwrap().clone();
    assert_eq!(ids(&data), vec![0, 1, 10, 11]);
}

#[test]
fn test_column_projection_keeps_only_requested_columns() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "records.csv", 0, 5);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "records.csv")]);
    config.columns = vec!["label".to_string(), "id".to_string()];
    let mut link = initialized(config, &mut ctx);
    link.execute(&mut ctx).unwrap();

    let data = ctx.store().unwrap().get_table("data").unwrap();
    let names: Vec<&str> = data.schema_ref().fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, vec!["label", "id"]);
}

#[test]
fn test_missing_projected_column_fails_execute() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "records.csv", 0, 5);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "records.csv")]);
    config.columns = vec!["no_such_column".to_string()];
    let mut link = initialized(config, &mut ctx);

    let err = link.execute(&mut ctx).unwrap_err();
    assert!(matches!(err, ChainrunError::ColumnNotFound { .. }));
}

#[test]
fn test_reader_override_reads_unknown_extension() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "records.txt", 0, 6);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "records.txt")]);
    config.reader = Some(ReaderKind::Csv);
    let mut link = initialized(config, &mut ctx);
    link.execute(&mut ctx).unwrap();

    assert_eq!(ctx.store().unwrap().get_int("n_data"), Some(6));
}

//==============================================================================
// Iteration ON
//==============================================================================

#[test]
fn test_chunked_pulls_yield_expected_sizes() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "records.csv", 0, 10);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "records.csv")]);
    config.chunk_size = Some(3);
    let mut link = initialized(config, &mut ctx);
    assert!(link.is_iterating());

    let mut sizes = Vec::new();
    for _ in 0..5 {
        let data = link.pull().unwrap();
        assert_eq!(data.as_ref().map_or(0, RecordBatch::num_rows), link.latest_count());
        sizes.push(link.latest_count());
    }

    assert_eq!(sizes, vec![3, 3, 3, 1, 0]);
    assert_eq!(link.cumulative_count(), 10);
    assert!(link.is_finished());
}

#[test]
fn test_chunked_execute_requests_repeat_until_last_chunk() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "records.csv", 0, 10);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "records.csv")]);
    config.chunk_size = Some(3);
    let mut link = initialized(config, &mut ctx);

    let (sizes, flags) = drain_by_execute(&mut link, &mut ctx);
    assert_eq!(sizes, vec![3, 3, 3, 1]);
    assert_eq!(flags, vec![true, true, true, false]);

    let store = ctx.store().unwrap();
    assert_eq!(store.get_int("n_data"), Some(1));
    assert_eq!(store.get_int("n_sum_data"), Some(10));
}

#[test]
fn test_exact_multiple_ends_with_typed_empty_dataset() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "records.csv", 0, 9);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "records.csv")]);
    config.chunk_size = Some(3);
    let mut link = initialized(config, &mut ctx);

    let (sizes, flags) = drain_by_execute(&mut link, &mut ctx);
    assert_eq!(sizes, vec![3, 3, 3, 0]);
    assert_eq!(flags, vec![true, true, true, false]);

    let last = ctx.store().unwrap().get_table("data").unwrap();
    assert_eq!(last.num_columns(), 3);
    assert_eq!(last.schema_ref().field(0).name(), "id");
    assert_eq!(ctx.store().unwrap().get_int("n_sum_data"), Some(9));
}

#[test]
fn test_header_only_file_produces_empty_table_on_first_execute() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "empty.csv", 0, 0);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "empty.csv")]);
    config.chunk_size = Some(4);
    let mut link = initialized(config, &mut ctx);

    link.execute(&mut ctx).unwrap();
    let data = ctx.store().unwrap().get_table("data").unwrap();
    assert_eq!(data.num_rows(), 0);
    assert_eq!(data.num_columns(), 3);
    assert!(!ctx.config().unwrap().repeat_requested("reader"));
}

#[test]
fn test_file_by_file_iteration() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "part_0.csv", 0, 5);
    write_csv(dir.path(), "part_1.csv", 5, 5);
    write_csv(dir.path(), "part_2.csv", 10, 5);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "part_*.csv")]);
    config.iterate_over_files = true;
    let mut link = initialized(config, &mut ctx);
    assert!(link.is_iterating());

    let (sizes, flags) = drain_by_execute(&mut link, &mut ctx);
    assert_eq!(sizes, vec![5, 5, 5]);
    assert_eq!(flags, vec![true, true, false]);
    assert_eq!(ctx.store().unwrap().get_int("n_sum_data"), Some(15));
}

#[test]
fn test_single_file_ignores_iterate_over_files() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "only.csv", 0, 5);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "only.csv")]);
    config.iterate_over_files = true;
    let link = initialized(config, &mut ctx);
    assert!(!link.is_iterating());
}

#[test]
fn test_chunks_span_multiple_files() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "part_0.csv", 0, 5);
    write_csv(dir.path(), "part_1.csv", 5, 4);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "part_*.csv")]);
    config.chunk_size = Some(2);
    let mut link = initialized(config, &mut ctx);

    let (sizes, flags) = drain_by_execute(&mut link, &mut ctx);
    assert_eq!(sizes, vec![2, 2, 1, 2, 2, 0]);
    assert_eq!(flags.last(), Some(&false));
    assert!(flags[..flags.len() - 1].iter().all(|f| *f));
    assert_eq!(ctx.store().unwrap().get_int("n_sum_data"), Some(9));
}

#[test]
fn test_whole_table_reader_is_consumed_in_one_pull_while_chunking() {
    let dir = TempDir::new().unwrap();
    write_arrow(dir.path(), "a_first.arrow", 0, 4);
    write_csv(dir.path(), "b_second.csv", 4, 5);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for(
        "data",
        vec![pattern(dir.path(), "a_first.arrow"), pattern(dir.path(), "b_second.csv")],
    );
    config.chunk_size = Some(2);
    let mut link = initialized(config, &mut ctx);

    let (sizes, _) = drain_by_execute(&mut link, &mut ctx);
    assert_eq!(sizes, vec![4, 2, 2, 1]);
}

#[test]
fn test_json_lines_are_chunked() {
    let dir = TempDir::new().unwrap();
    write_ndjson(dir.path(), "records.jsonl", 0, 7);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "*.jsonl")]);
    config.chunk_size = Some(2);
    let mut link = initialized(config, &mut ctx);

    let (sizes, flags) = drain_by_execute(&mut link, &mut ctx);
    assert_eq!(sizes, vec![2, 2, 2, 1]);
    assert_eq!(flags, vec![true, true, true, false]);
}

#[test]
fn test_unreadable_file_fails_execute() {
    let dir = TempDir::new().unwrap();
    write_ndjson(dir.path(), "a_good.json", 0, 2);
    std::fs::write(dir.path().join("b_broken.json"), "{ this is not json").unwrap();
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "*.json")]);
    config.iterate_over_files = true;
    let mut link = initialized(config, &mut ctx);

    assert!(link.execute(&mut ctx).is_ok());
    assert!(link.execute(&mut ctx).is_err());
}

#[test]
fn test_is_finished_is_monotonic_and_rows_are_conserved() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "part_0.csv", 0, 17);
    write_csv(dir.path(), "part_1.csv", 17, 1);
    write_csv(dir.path(), "part_2.csv", 18, 12);
    let total_rows = 30;
    let mut rng = rand::rng();

    for _ in 0..8 {
        let chunk_size = rng.random_range(1..=12);
        let mut ctx = ServiceRegistry::new();
        let mut config = reader_for("data", vec![pattern(dir.path(), "part_*.csv")]);
        config.chunk_size = Some(chunk_size);
        let mut link = initialized(config, &mut ctx);

        let mut pulled = 0;
        let mut seen_finished = false;
        for _ in 0..(total_rows + 10) {
            link.pull().unwrap();
            pulled += link.latest_count();
            if seen_finished {
                assert!(link.is_finished(), "is_finished flapped with chunk size {}", chunk_size);
            }
            seen_finished |= link.is_finished();
        }

        assert!(seen_finished);
        assert_eq!(pulled, total_rows, "rows lost with chunk size {}", chunk_size);
        assert_eq!(link.cumulative_count(), total_rows);
    }
}

//==============================================================================
// Formats & Options
//==============================================================================

fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch.schema_ref().fields().iter().map(|f| f.name().clone()).collect()
}

#[test]
fn test_projected_chunks_keep_projected_shape_to_the_end() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "records.csv", 0, 4);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "records.csv")]);
    config.columns = vec!["id".to_string()];
    config.chunk_size = Some(2);
    let mut link = initialized(config, &mut ctx);

    let mut sizes = Vec::new();
    loop {
        link.execute(&mut ctx).unwrap();
        let data = ctx.store().unwrap().get_table("data").unwrap();
        assert_eq!(column_names(data), vec!["id".to_string()]);
        sizes.push(data.num_rows());
        if !ctx.config().unwrap().repeat_requested("reader") {
            break;
        }
    }
    assert_eq!(sizes, vec![2, 2, 0]);
}

#[test]
fn test_explicit_schema_types_csv_columns() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "records.csv", 0, 3);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "records.csv")]);
    config.schema = Some(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("value", DataType::Utf8, true),
        Field::new("label", DataType::Utf8, true),
    ]));
    let mut link = initialized(config, &mut ctx);
    link.execute(&mut ctx).unwrap();

    let data = ctx.store().unwrap().get_table("data").unwrap();
    assert_eq!(data.schema_ref().field(1).data_type(), &DataType::Utf8);
    assert_eq!(ids(data), vec![0, 1, 2]);
}

#[test]
fn test_explicit_schema_selects_json_fields() {
    let dir = TempDir::new().unwrap();
    write_ndjson(dir.path(), "records.json", 0, 4);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "records.json")]);
    config.schema = Some(Schema::new(vec![
        Field::new("label", DataType::Utf8, true),
        Field::new("id", DataType::Int64, true),
    ]));
    let mut link = initialized(config, &mut ctx);
    link.execute(&mut ctx).unwrap();

    let data = ctx.store().unwrap().get_table("data").unwrap();
    assert_eq!(column_names(data), vec!["label".to_string(), "id".to_string()]);
    assert_eq!(ids(data), vec![0, 1, 2, 3]);
}

#[test]
fn test_headerless_csv_gets_numbered_columns() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("raw.csv"), "1,a,true\n2,b,false\n").unwrap();
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "raw.csv")]);
    config.has_header = false;
    let mut link = initialized(config, &mut ctx);
    link.execute(&mut ctx).unwrap();

    let data = ctx.store().unwrap().get_table("data").unwrap();
    assert_eq!(data.num_rows(), 2);
    assert_eq!(
        column_names(data),
        vec!["column_1".to_string(), "column_2".to_string(), "column_3".to_string()]
    );
}

#[test]
fn test_tab_separated_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("records.tsv"), "id\tlabel\n1\tx,y\n2\tz\n").unwrap();
    let mut ctx = ServiceRegistry::new();

    let mut link = initialized(reader_for("data", vec![pattern(dir.path(), "records.tsv")]), &mut ctx);
    link.execute(&mut ctx).unwrap();

    let data = ctx.store().unwrap().get_table("data").unwrap();
    assert_eq!(column_names(data), vec!["id".to_string(), "label".to_string()]);
    assert_eq!(ids(data), vec![1, 2]);
}

#[test]
fn test_delimiter_override() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("records.csv"), "id;label\n7;a\n8;b\n9;c\n").unwrap();
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "records.csv")]);
    config.delimiter = Some(';');
    let mut link = initialized(config, &mut ctx);
    link.execute(&mut ctx).unwrap();

    let data = ctx.store().unwrap().get_table("data").unwrap();
    assert_eq!(data.num_columns(), 2);
    assert_eq!(ids(data), vec![7, 8, 9]);
}

#[test]
fn test_arrow_files_are_concatenated_without_iteration() {
    let dir = TempDir::new().unwrap();
    write_arrow(dir.path(), "part_0.arrow", 0, 3);
    write_arrow(dir.path(), "part_1.arrow", 3, 2);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "part_*.arrow")]);
    config.columns = vec!["id".to_string()];
    let mut link = initialized(config, &mut ctx);
    assert!(!link.is_iterating());
    link.execute(&mut ctx).unwrap();

    let data = ctx.store().unwrap().get_table("data").unwrap();
    assert_eq!(column_names(data), vec!["id".to_string()]);
    assert_eq!(ids(data), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_parquet_is_chunked() {
    let dir = TempDir::new().unwrap();
    write_parquet(dir.path(), "records.parquet", 0, 7);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "records.parquet")]);
    config.chunk_size = Some(3);
    config.columns = vec!["label".to_string(), "id".to_string()];
    let mut link = initialized(config, &mut ctx);

    let (sizes, flags) = drain_by_execute(&mut link, &mut ctx);
    assert_eq!(sizes, vec![3, 3, 1]);
    assert_eq!(flags, vec![true, true, false]);
    let last = ctx.store().unwrap().get_table("data").unwrap();
    assert_eq!(column_names(last), vec!["label".to_string(), "id".to_string()]);
    assert_eq!(ids(last), vec![6]);
}

#[test]
fn test_spreadsheet_extension_resolves_but_broken_workbook_fails_execute() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("book.xlsx"), "not a workbook").unwrap();
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "book.xlsx")]);
    config.sheet = Some("Sheet1".to_string());
    let mut link = initialized(config, &mut ctx);
    assert!(!link.is_iterating());
    assert!(link.execute(&mut ctx).is_err());
}

#[test]
fn test_stale_repeat_flag_is_cleared_at_initialize() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "records.csv", 0, 3);
    let mut ctx = ServiceRegistry::new();
    ctx.config_mut().set_repeat_request("reader", true);

    let mut link = initialized(reader_for("data", vec![pattern(dir.path(), "records.csv")]), &mut ctx);
    assert!(!link.is_iterating());
    assert!(!ctx.config().unwrap().repeat_requested("reader"));

    link.execute(&mut ctx).unwrap();
    assert!(!ctx.config().unwrap().repeat_requested("reader"));
}

//==============================================================================
// Configuration Errors & Lifecycle
//==============================================================================

#[test]
fn test_no_matching_files_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let mut ctx = ServiceRegistry::new();
    let mut link = ReadToDataset::new(reader_for("data", vec![pattern(dir.path(), "*.csv")])).unwrap();

    let err = link.initialize(&mut ctx).unwrap_err();
    assert!(matches!(err, ChainrunError::NoPathsFound { .. }));
    assert!(err.is_configuration_error());
}

#[test]
fn test_directory_match_is_not_a_file() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("nested.csv")).unwrap();
    let mut ctx = ServiceRegistry::new();
    let mut link =
        ReadToDataset::new(reader_for("data", vec![pattern(dir.path(), "*.csv")])).unwrap();

    assert!(matches!(
        link.initialize(&mut ctx),
        Err(ChainrunError::NotAFile(_))
    ));
}

#[test]
fn test_unknown_extension_has_no_reader() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("data.pickle"), "binary").unwrap();
    let mut ctx = ServiceRegistry::new();
    let mut link =
        ReadToDataset::new(reader_for("data", vec![pattern(dir.path(), "data.pickle")])).unwrap();

    assert!(matches!(
        link.initialize(&mut ctx),
        Err(ChainrunError::NoReaderFound(_))
    ));
}

#[test]
fn test_malformed_pattern_is_rejected() {
    let mut ctx = ServiceRegistry::new();
    let mut link = ReadToDataset::new(reader_for("data", vec!["data/[.csv".to_string()])).unwrap();

    assert!(matches!(
        link.initialize(&mut ctx),
        Err(ChainrunError::InvalidPattern { .. })
    ));
}

#[test]
fn test_constructor_validates_configuration() {
    assert!(ReadToDataset::new(reader_for("", vec!["a.csv".into()])).is_err());
    assert!(ReadToDataset::new(reader_for("data", vec![])).is_err());

    let mut zero_chunk = reader_for("data", vec!["a.csv".into()]);
    zero_chunk.chunk_size = Some(0);
    assert!(ReadToDataset::new(zero_chunk).is_err());

    let mut bad_delimiter = reader_for("data", vec!["a.csv".into()]);
    bad_delimiter.delimiter = Some('§');
    assert!(ReadToDataset::new(bad_delimiter).is_err());
}

#[test]
fn test_set_chunk_size_turns_iteration_on_at_initialize() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "records.csv", 0, 10);
    let mut ctx = ServiceRegistry::new();

    let mut link = ReadToDataset::new(reader_for("data", vec![pattern(dir.path(), "records.csv")])).unwrap();
    assert!(link.set_chunk_size(0).is_err());
    link.set_chunk_size(4).unwrap();
    link.initialize(&mut ctx).unwrap();

    assert!(link.is_iterating());
    let (sizes, _) = drain_by_execute(&mut link, &mut ctx);
    assert_eq!(sizes, vec![4, 4, 2]);
}

#[test]
fn test_initialize_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "records.csv", 0, 10);
    let mut ctx = ServiceRegistry::new();

    let mut config = reader_for("data", vec![pattern(dir.path(), "records.csv")]);
    config.chunk_size = Some(5);
    let mut link = initialized(config, &mut ctx);
    link.initialize(&mut ctx).unwrap();

    let (sizes, _) = drain_by_execute(&mut link, &mut ctx);
    assert_eq!(sizes, vec![5, 5, 0]);
}

#[test]
fn test_finalize_is_safe_without_execute() {
    let mut ctx = ServiceRegistry::new();
    let mut never_initialized = ReadToDataset::new(reader_for("data", vec!["a.csv".into()])).unwrap();
    assert_eq!(never_initialized.finalize(&mut ctx).unwrap(), StatusCode::Success);

    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "records.csv", 0, 10);
    let mut config = reader_for("data", vec![pattern(dir.path(), "records.csv")]);
    config.chunk_size = Some(3);
    let mut link = initialized(config, &mut ctx);
    link.execute(&mut ctx).unwrap();

    assert_eq!(link.finalize(&mut ctx).unwrap(), StatusCode::Success);
    assert!(!matches!(
        link.source().unwrap().state(),
        SourceState::ReaderOpen(_)
    ));
}

#[test]
fn test_execute_before_initialize_is_an_error() {
    let mut ctx = ServiceRegistry::new();
    let mut link = ReadToDataset::new(reader_for("data", vec!["a.csv".into()])).unwrap();
    assert!(matches!(
        link.execute(&mut ctx),
        Err(ChainrunError::InternalError(_))
    ));
}

#[test]
fn test_config_deserializes_single_path() {
    let config: ReadToDatasetConfig = serde_json::from_str(
        r#"{ "key": "data", "path": "input/*.csv", "chunk_size": 100, "reader": "tsv" }"#,
    )
    .unwrap();

    assert_eq!(config.paths, vec!["input/*.csv".to_string()]);
    assert_eq!(config.chunk_size, Some(100));
    assert_eq!(config.reader, Some(ReaderKind::Tsv));
    assert_eq!(config.name, "ReadToDataset");
    assert!(config.has_header);
}
