use std::sync::Arc;

use provlog::core::record::{Field, FileRef};
use provlog::prelude::*;
use provlog::store::{build_storage_from_config, Error as StoreError};
use tempfile::tempdir;

#[test]
fn test_sequential_inputs_keep_call_order_and_duplicates() {
    let ctx = RunContext::new(Arc::new(RunLogStore::in_memory()), ProvConfig::in_memory());
    let id = ctx.start_run(RunMeta::new("train.py")).expect("start");

    let paths = ["/d/a.csv", "/d/b.csv", "/d/a.csv", "/d/c.csv", "/d/a.csv"];
    for p in paths {
        ctx.record_input(p, "pandas");
    }

    let run = ctx.store().get_run(id).expect("run");
    let logged: Vec<&str> = run.inputs.iter().map(FileRef::path).collect();
    assert_eq!(logged, paths);
}

#[test]
fn test_file_store_persists_across_reopen() {
    let dir = tempdir().expect("tempdir");
    let db = dir.path().join("nested").join("runs.json");

    let id = {
        let store = Arc::new(RunLogStore::open_or_create(&db).expect("open"));
        let ctx = RunContext::new(store, ProvConfig::in_memory());
        let id = ctx.start_run(RunMeta::new("script.py")).expect("start");
        ctx.record_output("/out/model.bin", "torch");
        ctx.finish_run(None).expect("finish");
        id
    };

    let reopened = RunLogStore::open_or_create(&db).expect("reopen");
    let run = reopened.get_run(id).expect("run");
    assert_eq!(run.outputs, vec![FileRef::new("/out/model.bin", None)]);
    assert!(run.is_finished());

    reopened.set_notes(id, "baseline").expect("notes");
    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&db).expect("read")).expect("json");
    assert_eq!(raw["runs"][0]["notes"], "baseline");
    assert_eq!(raw["runs"][0]["unique_id"], id.to_string());
    assert!(!dir.path().join("nested").join("runs.json.tmp").exists());
}

#[test]
fn test_duplicate_run_ids_are_rejected() {
    let store = RunLogStore::in_memory();
    let record = RunRecord::new(RunId::new(), "s", "s");
    store.insert_run(&record).expect("insert");
    assert!(matches!(
        store.insert_run(&record),
        Err(StoreError::DuplicateRun(_))
    ));
    assert_eq!(store.list_runs().expect("list").len(), 1);
}

#[test]
fn test_append_to_scalar_field_is_rejected() {
    let store = RunLogStore::in_memory();
    let record = RunRecord::new(RunId::new(), "s", "s");
    store.insert_run(&record).expect("insert");
    let err = store
        .append(record.unique_id, Field::Script, &"x")
        .unwrap_err();
    assert!(matches!(err, StoreError::NotAList { .. }));
}

#[test]
fn test_unknown_run_is_reported() {
    let store = RunLogStore::in_memory();
    let err = store
        .append(RunId::new(), Field::Inputs, &FileRef::new("/a", None))
        .unwrap_err();
    assert!(matches!(err, StoreError::RunNotFound(_)));
}

#[test]
fn test_reinitialization_finishes_previous_run() {
    let ctx = RunContext::new(Arc::new(RunLogStore::in_memory()), ProvConfig::in_memory());
    let first = ctx.start_run(RunMeta::new("notebook")).expect("first");
    let second = ctx.start_run(RunMeta::new("notebook")).expect("second");
    assert_ne!(first, second);
    assert!(ctx.store().get_run(first).expect("first").is_finished());
    assert_eq!(ctx.active_run_id(), Some(second));
    assert_eq!(ctx.store().latest_run().expect("latest").map(|r| r.unique_id), Some(second));
}

#[test]
fn test_unsupported_scheme_errors() {
    let cfg = ProvConfig {
        db_path: "ftp://example.com/runs.json".into(),
        ..ProvConfig::default()
    };
    let err = build_storage_from_config(&cfg).err().expect("should fail");
    assert!(err.to_string().contains("unsupported log scheme"));
}
