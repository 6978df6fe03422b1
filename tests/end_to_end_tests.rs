use std::fs;
use std::sync::Arc;

use provlog::core::hash::fingerprint_file;
use provlog::prelude::*;
use tempfile::tempdir;

/// `pandas`-shaped fake: `read_csv(path)` really reads, and
/// `DataFrame.to_csv(path, data)` really writes.
fn fake_tables() -> ObjectRef {
    let read_csv = Callable::new("read_csv", &["filepath_or_buffer"], |args| {
        let path = match args.positional(0) {
            Some(Value::Str(p)) => p.clone(),
            _ => {
                return Err(CallError::BadArgument {
                    name: "filepath_or_buffer".into(),
                    reason: "expected a path".into(),
                })
            }
        };
        Ok(Value::Str(fs::read_to_string(path)?))
    });
    let to_csv = Callable::new("to_csv", &["path_or_buf", "data"], |args| {
        match (args.positional(0), args.positional(1)) {
            (Some(Value::Str(p)), Some(Value::Str(d))) => {
                fs::write(p, d)?;
                Ok(Value::None)
            }
            _ => Err(CallError::Failed("to_csv(path, data)".into())),
        }
    });
    let frame = ObjectRef::class("DataFrame").with("to_csv", to_csv);
    ObjectRef::module("tables")
        .with("read_csv", read_csv)
        .with("DataFrame", frame)
}

fn tables_registry() -> PatchPlanRegistry {
    PatchPlanRegistry::from_yaml_str(
        r#"
plans:
  - module: tables
    entries:
      - { path: read_csv, role: input, arg: 0 }
      - { path: DataFrame.to_csv, role: output, arg: 0 }
"#,
    )
    .expect("registry yaml")
}

fn system() -> Arc<ImportSystem> {
    let system = Arc::new(ImportSystem::new());
    system.append_resolver(Arc::new(ModuleSource::new().with("tables", || Ok(fake_tables()))));
    system
}

#[test]
fn test_script_reading_and_writing_is_recorded() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("data.csv");
    let out = dir.path().join("out.csv");
    fs::write(&data, "a,b\n1,2\n").expect("seed data");

    let inst = Instrumentation::install(
        ProvConfig::in_memory(),
        &tables_registry(),
        system(),
        RunMeta::new("analysis.rs").with_args(["--fast"]),
    )
    .expect("install");
    let ctx = inst.context().clone();
    let id = inst.run_id();

    // the "script"
    let tables = inst.import("tables").expect("import");
    let contents = tables
        .call_method("read_csv", &CallArgs::new().arg(data.display().to_string()))
        .expect("read");
    let frame = get_attr_path(&tables, "DataFrame").expect("DataFrame");
    let Value::Object(frame) = frame else {
        panic!("DataFrame is not an object");
    };
    frame
        .call_method(
            "to_csv",
            &CallArgs::new().arg(out.display().to_string()).arg(contents),
        )
        .expect("write");

    assert!(inst.finish(None).expect("finish"));
    assert_eq!(fs::read_to_string(&out).expect("out"), "a,b\n1,2\n");

    let run = ctx.store().get_run(id).expect("run");
    assert_eq!(
        run.inputs,
        vec![FileRef::new(
            data.display().to_string(),
            fingerprint_file(&data)
        )]
    );
    assert!(run.inputs[0].fingerprint().is_some());
    assert_eq!(run.outputs, vec![FileRef::new(out.display().to_string(), None)]);
    assert_eq!(run.command_args, vec!["--fast"]);
    assert!(run.exception.is_none());
    let exit = run.exit_date.expect("exit_date");
    assert!(exit >= run.date);
}

#[test]
fn test_dropping_instrumentation_finalizes_run() {
    let inst = Instrumentation::install(
        ProvConfig::in_memory(),
        &tables_registry(),
        system(),
        RunMeta::new("s"),
    )
    .expect("install");
    let ctx = inst.context().clone();
    let id = inst.run_id();
    assert_eq!(inst.hook("tables").map(|h| h.phase()), Some(HookPhase::Registered));
    drop(inst);
    assert!(ctx.store().get_run(id).expect("run").is_finished());
}

#[test]
fn test_ignored_inputs_are_not_patched() {
    let cfg = ProvConfig {
        ignored_inputs: vec!["all".into()],
        ..ProvConfig::in_memory()
    };
    let inst = Instrumentation::install(cfg, &tables_registry(), system(), RunMeta::new("s"))
        .expect("install");
    let tables = inst.import("tables").expect("import");
    assert!(!tables.has("_orig_read_csv"));
    assert!(inst.system().is_patched("tables"));
    let report = inst.hook("tables").and_then(|h| h.report()).expect("report");
    assert_eq!(report.patched, vec!["DataFrame.to_csv"]);
}

#[test]
fn test_version_skew_is_a_warning_on_the_run() {
    let registry = PatchPlanRegistry::from_yaml_str(
        r#"
plans:
  - module: tables
    entries:
      - { path: read_parquet, role: input, arg: 0, source: tables-io }
      - { path: read_csv, role: input, arg: 0, source: tables-io }
"#,
    )
    .expect("yaml");
    let inst = Instrumentation::install(ProvConfig::in_memory(), &registry, system(), RunMeta::new("s"))
        .expect("install");
    inst.import("tables").expect("import");

    let run = inst.context().store().get_run(inst.run_id()).expect("run");
    assert_eq!(run.warnings.len(), 1);
    assert_eq!(run.warnings[0].category, "MissingAttributeError");
    assert_eq!(run.warnings[0].source.as_deref(), Some("tables-io"));
    assert!(run.warnings[0].message.contains("read_parquet"));
}
