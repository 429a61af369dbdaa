//! Windowed reads: value normalization, nested cells, projection checks,
//! parallel reads and failure modes.

use std::fs;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, Decimal128Array, Decimal256Array, DictionaryArray, FixedSizeBinaryArray, Int32Array,
    Int64Array, ListArray, MapBuilder, StringArray, StringBuilder, StructArray,
};
use arrow::buffer::NullBuffer;
use arrow::datatypes::{DataType, Field, Fields, Int32Type, Schema, i256};
use arrow::record_batch::RecordBatch;
use pqv_engine::{CancellationToken, EngineHandle, EngineOptions, ReadProgress, ReadWindow};
use pqv_result::Error;
use pqv_test_utils::{
    FixtureOptions, init_tracing_for_tests, pandas_datetime_metadata, sequence_batch, wide_batch,
    wide_column_names, write_parquet, write_parquet_with,
};
use pqv_types::{Decimal, LogicalType, RenderOptions, ScalarKind, Value};
use tempfile::TempDir;
use time::macros::datetime;

fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let arrays = columns.into_iter().map(|(_, a)| a).collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
}

/// 2000 rows over four partition directories, 128-row row groups.
fn two_thousand_rows() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let opts = FixtureOptions::default().with_row_group_size(128);
    for (idx, quarter) in ["q=1", "q=2", "q=3", "q=4"].iter().enumerate() {
        let start = idx as i64 * 500;
        write_parquet_with(
            &dir.path().join(quarter).join("data.parquet"),
            &[sequence_batch(start, 500)],
            &opts,
        )
        .unwrap();
    }
    dir
}

#[test]
fn window_returns_exact_row() {
    init_tracing_for_tests();
    let dir = two_thousand_rows();
    let mut handle = EngineHandle::open(dir.path()).unwrap();
    let cancel = CancellationToken::new();
    let fields = ["id", "name", "flag", "q"];

    let full = handle.read(&fields, 0, None, &cancel, None).unwrap();
    assert_eq!(full.num_rows(), 2000);
    assert_eq!(full.total_record_count(), 2000);

    let one = handle.read(&fields, 200, Some(1), &cancel, None).unwrap();
    assert_eq!(one.num_rows(), 1);
    assert_eq!(one.row(0).unwrap(), full.row(200).unwrap());
    assert_eq!(one.value(0, "id"), Some(&Value::Int64(200)));
    assert_eq!(one.value(0, "q"), Some(&Value::Int64(1)));

    // Spans a row group and a file boundary.
    let span = handle.read(&fields, 380, Some(260), &cancel, None).unwrap();
    assert_eq!(span.num_rows(), 260);
    assert_eq!(span.rows(), &full.rows()[380..640]);
    assert_eq!(span.value(259, "q"), Some(&Value::Int64(2)));

    let past_end = handle.read(&fields, 1990, Some(100), &cancel, None).unwrap();
    assert_eq!(past_end.num_rows(), 10);
    let beyond = handle.read(&fields, 5000, Some(1), &cancel, None).unwrap();
    assert_eq!(beyond.num_rows(), 0);
    assert_eq!(beyond.total_record_count(), 2000);
}

#[test]
fn repeated_reads_are_identical() {
    let dir = two_thousand_rows();
    let mut handle = EngineHandle::open(dir.path()).unwrap();
    let cancel = CancellationToken::new();
    let a = handle.read(&["name", "id"], 450, Some(100), &cancel, None).unwrap();
    let b = handle.read(&["name", "id"], 450, Some(100), &cancel, None).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        a.columns().iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["name", "id"]
    );
}

#[test]
fn booleans_keep_nulls() {
    let dir = two_thousand_rows();
    let mut handle = EngineHandle::open(dir.path()).unwrap();
    let table = handle
        .read(&["flag"], 0, Some(3), &CancellationToken::new(), None)
        .unwrap();
    let flags: Vec<Value> = table.column_values(0).cloned().collect();
    assert_eq!(
        flags,
        vec![Value::Null, Value::Boolean(false), Value::Boolean(true)]
    );
}

#[test]
fn partition_only_projection() {
    let dir = two_thousand_rows();
    let mut handle = EngineHandle::open(dir.path()).unwrap();
    let table = handle
        .read(&["q"], 499, Some(2), &CancellationToken::new(), None)
        .unwrap();
    assert_eq!(
        table.column_values(0).cloned().collect::<Vec<_>>(),
        vec![Value::Int64(1), Value::Int64(2)]
    );
}

#[test]
fn progress_counts_cells() {
    let dir = two_thousand_rows();
    let mut handle = EngineHandle::open(dir.path()).unwrap();
    let progress = ReadProgress::new();
    handle
        .read(
            &["id", "name", "q"],
            10,
            Some(10),
            &CancellationToken::new(),
            Some(&progress),
        )
        .unwrap();
    assert_eq!(progress.cells_decoded(), 30);
}

#[test]
fn case_duplicates_fail_in_either_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dupes.parquet");
    write_parquet(
        &path,
        &batch(vec![
            ("Name", Arc::new(StringArray::from(vec!["a"])) as ArrayRef),
            ("NAME", Arc::new(StringArray::from(vec!["b"])) as ArrayRef),
        ]),
    )
    .unwrap();

    let mut handle = EngineHandle::open(&path).unwrap();
    assert_eq!(handle.schema().case_collisions(), vec![vec!["Name", "NAME"]]);
    let cancel = CancellationToken::new();
    for request in [["Name", "NAME"], ["NAME", "Name"]] {
        match handle.read(&request, 0, None, &cancel, None).unwrap_err() {
            Error::DuplicateProjectedColumn(name) => assert_eq!(name, request[1]),
            other => panic!("unexpected error: {other:?}"),
        }
    }
    let alone = handle.read(&["NAME"], 0, None, &cancel, None).unwrap();
    assert_eq!(alone.cell(0, 0), Some(&Value::from("b")));
}

#[test]
fn invalid_selections_fail() {
    let dir = two_thousand_rows();
    let mut handle = EngineHandle::open(dir.path()).unwrap();
    let cancel = CancellationToken::new();
    let none: [&str; 0] = [];
    assert!(matches!(
        handle.read(&none, 0, None, &cancel, None),
        Err(Error::UnsupportedFieldSelection(_))
    ));
    assert!(matches!(
        handle.read(&["nope"], 0, None, &cancel, None),
        Err(Error::UnsupportedFieldSelection(_))
    ));
    // Requested names match case-insensitively.
    let table = handle.read(&["ID"], 0, Some(1), &cancel, None).unwrap();
    assert_eq!(table.columns()[0].name, "id");
}

#[test]
fn malformed_datetime_flag_toggles_decoding() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pandas.parquet");
    let millis = 1_437_330_600_000i64;
    write_parquet_with(
        &path,
        &[batch(vec![
            ("created", Arc::new(Int64Array::from(vec![Some(millis), None])) as ArrayRef),
            ("count", Arc::new(Int64Array::from(vec![millis, 1])) as ArrayRef),
        ])],
        &FixtureOptions::default().with_metadata(pandas_datetime_metadata(&[("created", "ms")])),
    )
    .unwrap();

    let cancel = CancellationToken::new();
    let mut handle = EngineHandle::open(&path).unwrap();
    assert_eq!(
        handle.fields()[0].data_type(),
        &LogicalType::from(ScalarKind::Timestamp)
    );
    let fixed = handle.read(&["created", "count"], 0, None, &cancel, None).unwrap();
    assert_eq!(
        fixed.row(0).unwrap(),
        &[
            Value::Timestamp(datetime!(2015-07-19 18:30)),
            Value::Int64(millis)
        ]
    );
    assert_eq!(fixed.cell(1, 0), Some(&Value::Null));

    handle.set_fix_malformed_datetime(false);
    assert_eq!(
        handle.fields()[0].data_type(),
        &LogicalType::from(ScalarKind::Int64)
    );
    let raw = handle.read(&["created"], 0, None, &cancel, None).unwrap();
    assert_eq!(raw.cell(0, 0), Some(&Value::Int64(millis)));

    let off = EngineHandle::open_with_options(
        &path,
        EngineOptions::default().with_fix_malformed_datetime(false),
    )
    .unwrap();
    assert!(!off.options().fix_malformed_datetime);
    assert_eq!(
        off.fields()[0].data_type(),
        &LogicalType::from(ScalarKind::Int64)
    );
}

#[test]
fn lists_keep_order_and_interior_nulls() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lists.parquet");
    let ids = ListArray::from_iter_primitive::<Int32Type, _, _>(vec![
        Some(vec![Some(1), Some(2), Some(3)]),
        Some(vec![None, Some(1)]),
        None,
    ]);
    write_parquet(&path, &batch(vec![("ids", Arc::new(ids) as ArrayRef)])).unwrap();

    let mut handle = EngineHandle::open(&path).unwrap();
    assert_eq!(
        handle.fields()[0].data_type(),
        &LogicalType::list(ScalarKind::Int32.into())
    );
    let table = handle
        .read(&["ids"], 0, None, &CancellationToken::new(), None)
        .unwrap();
    let render = RenderOptions::default();

    let first = table.cell(0, 0).unwrap().as_list().unwrap();
    assert_eq!(
        first.values(),
        &[Value::Int32(1), Value::Int32(2), Value::Int32(3)]
    );
    assert_eq!(table.cell(0, 0).unwrap().render(&render), "[1,2,3]");

    let second = table.cell(1, 0).unwrap().as_list().unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(second.get(0), Some(&Value::Null));
    assert_eq!(table.cell(1, 0).unwrap().render(&render), "[,1]");

    assert_eq!(table.cell(2, 0), Some(&Value::Null));
}

#[test]
fn structs_expose_supported_children_and_null_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("structs.parquet");

    let inner_fields = Fields::from(vec![Field::new("x", DataType::Int32, true)]);
    let inner = StructArray::new(
        inner_fields.clone(),
        vec![Arc::new(Int32Array::from(vec![1, 2])) as ArrayRef],
        None,
    );
    let fields = Fields::from(vec![
        Field::new("appId", DataType::Utf8, true),
        Field::new("version", DataType::Int64, true),
        Field::new("nested", DataType::Struct(inner_fields), true),
    ]);
    let add = StructArray::new(
        fields,
        vec![
            Arc::new(StringArray::from(vec![None::<&str>, None])) as ArrayRef,
            Arc::new(Int64Array::from(vec![Some(0), None])) as ArrayRef,
            Arc::new(inner) as ArrayRef,
        ],
        Some(NullBuffer::from(vec![true, false])),
    );
    write_parquet(&path, &batch(vec![("add", Arc::new(add) as ArrayRef)])).unwrap();

    let mut handle = EngineHandle::open(&path).unwrap();
    assert_eq!(
        handle.fields()[0].data_type().to_string(),
        "struct<appId:string,version:int64>"
    );
    let table = handle
        .read(&["add"], 0, None, &CancellationToken::new(), None)
        .unwrap();

    let first = table.cell(0, 0).unwrap().as_struct().unwrap();
    assert_eq!(first.names().collect::<Vec<_>>(), vec!["appId", "version"]);
    assert_eq!(first.get("appId"), Some(&Value::Null));
    assert_eq!(
        table.cell(0, 0).unwrap().render(&RenderOptions::default()),
        "{\"appId\":{},\"version\":0}"
    );
    assert_eq!(table.cell(1, 0), Some(&Value::Null));
}

#[test]
fn maps_surface_first_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("maps.parquet");
    let mut builder = MapBuilder::new(None, StringBuilder::new(), StringBuilder::new());
    builder.keys().append_value("id");
    builder.values().append_value("something");
    builder.keys().append_value("other");
    builder.values().append_value("ignored");
    builder.append(true).unwrap();
    builder.append(false).unwrap();
    write_parquet(
        &path,
        &batch(vec![("tags", Arc::new(builder.finish()) as ArrayRef)]),
    )
    .unwrap();

    let mut handle = EngineHandle::open(&path).unwrap();
    assert_eq!(
        handle.fields()[0].data_type(),
        &LogicalType::map(ScalarKind::Utf8.into(), ScalarKind::Utf8.into())
    );
    let table = handle
        .read(&["tags"], 0, None, &CancellationToken::new(), None)
        .unwrap();
    let first = table.cell(0, 0).unwrap();
    assert_eq!(first.render(&RenderOptions::default()), "(id,something)");
    assert_eq!(table.cell(1, 0), Some(&Value::Null));
}

#[test]
fn integral_decimals_and_identifiers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oracle.parquet");
    let guid_bytes: Vec<u8> = vec![
        0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee,
        0xff,
    ];
    write_parquet(
        &path,
        &batch(vec![
            (
                "ORDER_ID",
                Arc::new(
                    Decimal128Array::from(vec![Some(1_234_567_890i128), None])
                        .with_precision_and_scale(10, 0)
                        .unwrap(),
                ) as ArrayRef,
            ),
            (
                "QTY",
                Arc::new(
                    Decimal128Array::from(vec![7i128, 8])
                        .with_precision_and_scale(9, 0)
                        .unwrap(),
                ) as ArrayRef,
            ),
            (
                "PRICE",
                Arc::new(
                    Decimal128Array::from(vec![12_345i128, -5])
                        .with_precision_and_scale(10, 2)
                        .unwrap(),
                ) as ArrayRef,
            ),
            (
                "ROW_GUID",
                Arc::new(
                    FixedSizeBinaryArray::try_from_iter(
                        vec![guid_bytes.clone(), guid_bytes.clone()].into_iter(),
                    )
                    .unwrap(),
                ) as ArrayRef,
            ),
        ]),
    )
    .unwrap();

    let mut handle = EngineHandle::open(&path).unwrap();
    let types: Vec<String> = handle
        .fields()
        .iter()
        .map(|f| f.data_type().to_string())
        .collect();
    assert_eq!(types, vec!["int64", "int32", "decimal(10,2)", "uuid"]);

    let table = handle
        .read(
            &["ORDER_ID", "QTY", "PRICE", "ROW_GUID"],
            0,
            None,
            &CancellationToken::new(),
            None,
        )
        .unwrap();
    let render = RenderOptions::default();
    assert_eq!(table.cell(0, 0), Some(&Value::Int64(1_234_567_890)));
    assert_eq!(table.cell(1, 0), Some(&Value::Null));
    assert_eq!(table.cell(0, 1), Some(&Value::Int32(7)));
    assert_eq!(
        table.cell(0, 2),
        Some(&Value::Decimal(Decimal::new(12_345, 10, 2)))
    );
    assert_eq!(table.cell(1, 2).unwrap().render(&render), "-0.05");
    assert_eq!(
        table.cell(0, 3).unwrap().render(&render),
        "00112233-4455-6677-8899-aabbccddeeff"
    );
}

#[test]
fn wide_decimals_fall_back_to_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.parquet");
    let huge = i256::from_string(&format!("1{}", "0".repeat(40))).unwrap();
    write_parquet(
        &path,
        &batch(vec![(
            "BALANCE",
            Arc::new(
                Decimal256Array::from(vec![Some(huge), Some(i256::from_i128(12_345)), None])
                    .with_precision_and_scale(50, 2)
                    .unwrap(),
            ) as ArrayRef,
        )]),
    )
    .unwrap();

    let mut handle = EngineHandle::open(&path).unwrap();
    assert_eq!(handle.fields()[0].data_type().to_string(), "decimal(50,2)");
    let table = handle
        .read(&["BALANCE"], 0, None, &CancellationToken::new(), None)
        .unwrap();
    assert_eq!(
        table.cell(0, 0),
        Some(&Value::Utf8(
            "100000000000000000000000000000000000000.00".to_string()
        ))
    );
    assert_eq!(
        table.cell(1, 0),
        Some(&Value::Decimal(Decimal::new(12_345, 50, 2)))
    );
    assert_eq!(table.cell(2, 0), Some(&Value::Null));
}

#[test]
fn dictionary_strings_read_as_plain_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cities.parquet");
    let cities: DictionaryArray<Int32Type> =
        vec![Some("Oslo"), None, Some("Lima"), Some("Oslo")].into_iter().collect();
    write_parquet(&path, &batch(vec![("city", Arc::new(cities) as ArrayRef)])).unwrap();

    let mut handle = EngineHandle::open(&path).unwrap();
    assert_eq!(handle.fields()[0].data_type(), &LogicalType::from(ScalarKind::Utf8));
    let table = handle
        .read(&["city"], 0, None, &CancellationToken::new(), None)
        .unwrap();
    assert_eq!(
        table.column_values(0).cloned().collect::<Vec<_>>(),
        vec![
            Value::from("Oslo"),
            Value::Null,
            Value::from("Lima"),
            Value::from("Oslo"),
        ]
    );
}

#[test]
fn zero_batch_size_still_reads_every_row() {
    let dir = two_thousand_rows();
    let options = EngineOptions {
        batch_size: 0,
        ..EngineOptions::default()
    };
    let mut handle = EngineHandle::open_with_options(dir.path(), options).unwrap();
    let table = handle
        .read(&["id", "q"], 0, None, &CancellationToken::new(), None)
        .unwrap();
    assert_eq!(table.num_rows(), 2000);
    assert_eq!(table.value(1999, "id"), Some(&Value::Int64(1999)));
}

#[test]
fn parallel_read_matches_sequential() {
    init_tracing_for_tests();
    let dir = tempfile::tempdir().unwrap();
    let opts = FixtureOptions::default().with_row_group_size(7);
    write_parquet_with(
        &dir.path().join("batch=1/a.parquet"),
        &[wide_batch(2000, 0, 15)],
        &opts,
    )
    .unwrap();
    write_parquet_with(
        &dir.path().join("batch=2/b.parquet"),
        &[wide_batch(2000, 15, 15)],
        &opts,
    )
    .unwrap();

    let mut fields = wide_column_names(2000);
    fields.insert(1000, "batch".to_string());
    let cancel = CancellationToken::new();

    let mut parallel = EngineHandle::open_with_options(
        dir.path(),
        EngineOptions::default().with_max_workers(Some(4)),
    )
    .unwrap();
    let mut sequential = EngineHandle::open_with_options(
        dir.path(),
        EngineOptions::default().with_parallel_column_threshold(usize::MAX),
    )
    .unwrap();

    let plan = parallel.project(&fields[..]).unwrap();
    assert_eq!(plan.len(), 2001);
    for window in [ReadWindow::all(), ReadWindow::new(5, Some(17))] {
        let progress = ReadProgress::new();
        let a = parallel
            .read_plan(&plan, window, &cancel, Some(&progress))
            .unwrap();
        let b = sequential
            .read_plan(&plan, window, &cancel, None)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(progress.cells_decoded(), a.num_rows() as u64 * 2001);
    }

    let windowed = parallel
        .read(&fields[..], 5, Some(17), &cancel, None)
        .unwrap();
    assert_eq!(windowed.num_rows(), 17);
    assert_eq!(windowed.num_columns(), 2001);
    assert_eq!(windowed.value(0, "c0000"), Some(&Value::Int64(5 * 10_000)));
    assert_eq!(windowed.value(16, "c1999"), Some(&Value::Int64(21 * 10_000 + 1999)));
    assert_eq!(windowed.value(16, "batch"), Some(&Value::Int64(2)));
    assert_eq!(windowed.columns()[1000].name, "batch");
}

#[test]
fn cancelled_reads_return_no_table() {
    let dir = two_thousand_rows();
    let mut handle = EngineHandle::open_with_options(
        dir.path(),
        EngineOptions::default().with_parallel_column_threshold(1),
    )
    .unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(matches!(
        handle.read(&["id"], 0, None, &cancel, None),
        Err(Error::Cancelled)
    ));
    // Two columns exceed the threshold of one and take the parallel path.
    assert!(matches!(
        handle.read(&["id", "name"], 0, None, &cancel, None),
        Err(Error::Cancelled)
    ));
}

/// A progress counter that cancels `cancel` once `after` cells were decoded.
fn cancel_after(cancel: &CancellationToken, after: u64) -> ReadProgress {
    let trip = cancel.clone();
    ReadProgress::with_listener(move |cells| {
        if cells >= after {
            trip.cancel();
        }
    })
}

#[test]
fn cancellation_mid_read_stops_sequential_read() {
    let dir = two_thousand_rows();
    let mut handle = EngineHandle::open_with_options(
        dir.path(),
        EngineOptions::default().with_batch_size(16),
    )
    .unwrap();
    let cancel = CancellationToken::new();
    let progress = cancel_after(&cancel, 64);
    assert!(matches!(
        handle.read(&["id", "name"], 0, None, &cancel, Some(&progress)),
        Err(Error::Cancelled)
    ));
    assert!(progress.cells_decoded() >= 64);
    assert!(progress.cells_decoded() < 4000);
}

#[test]
fn cancellation_mid_read_stops_parallel_read() {
    let dir = two_thousand_rows();
    let mut handle = EngineHandle::open_with_options(
        dir.path(),
        EngineOptions::default()
            .with_batch_size(16)
            .with_parallel_column_threshold(1)
            .with_max_workers(Some(2)),
    )
    .unwrap();
    let cancel = CancellationToken::new();
    let progress = cancel_after(&cancel, 64);
    assert!(matches!(
        handle.read(&["id", "name"], 0, None, &cancel, Some(&progress)),
        Err(Error::Cancelled)
    ));
    assert!(progress.cells_decoded() < 4000);

    // A fresh token reads the same handle to completion.
    let table = handle
        .read(&["id", "name"], 0, None, &CancellationToken::new(), None)
        .unwrap();
    assert_eq!(table.num_rows(), 2000);
}

#[test]
fn vanished_source_fails_only_that_read() {
    let dir = two_thousand_rows();
    let mut handle = EngineHandle::open(dir.path()).unwrap();
    let cancel = CancellationToken::new();
    let victim = dir.path().join("q=3/data.parquet");
    let saved = fs::read(&victim).unwrap();
    fs::remove_file(&victim).unwrap();

    // Windows that do not touch the missing file still succeed.
    let early = handle.read(&["id"], 0, Some(10), &cancel, None).unwrap();
    assert_eq!(early.num_rows(), 10);

    match handle.read(&["id"], 990, Some(20), &cancel, None).unwrap_err() {
        Error::SourceVanished(path) => assert_eq!(path, victim),
        other => panic!("unexpected error: {other:?}"),
    }

    fs::write(&victim, saved).unwrap();
    let restored = handle.read(&["id"], 990, Some(20), &cancel, None).unwrap();
    assert_eq!(restored.value(19, "id"), Some(&Value::Int64(1009)));
}

#[test]
fn vanished_root_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("dataset");
    write_parquet(&root.join("a.parquet"), &sequence_batch(0, 4)).unwrap();
    let mut handle = EngineHandle::open(&root).unwrap();
    fs::remove_dir_all(&root).unwrap();
    assert!(matches!(
        handle.read(&["id"], 0, None, &CancellationToken::new(), None),
        Err(Error::SourceVanished(_))
    ));
}
