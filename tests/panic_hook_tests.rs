use std::panic;
use std::sync::Arc;
use std::thread;

use provlog::core::record::FileRef;
use provlog::prelude::*;
use provlog::run::install_panic_hook;

// One test per binary: the panic hook is process-global.
#[test]
fn test_only_unwinding_panics_finalize_the_run() {
    let ctx = Arc::new(RunContext::new(
        Arc::new(RunLogStore::in_memory()),
        ProvConfig::in_memory(),
    ));
    let id = ctx.start_run(RunMeta::new("crashy")).expect("start");
    install_panic_hook(ctx.clone());

    // a library recovering internally
    let caught = panic::catch_unwind(|| {
        panic!("recovered inside a library");
    });
    assert!(caught.is_err());
    let run = ctx.store().get_run(id).expect("run");
    assert!(run.exception.is_none());
    assert!(!run.is_finished());

    ctx.record_input("/after/caught.csv", "tables");

    // the owning thread dies with the guard on its stack
    let owner = ctx.clone();
    let died = thread::spawn(move || {
        let _guard = RunGuard::new(owner);
        panic!("division by zero in step 3");
    })
    .join();
    assert!(died.is_err());

    let _ = panic::take_hook();
    let run = ctx.store().get_run(id).expect("run");
    assert_eq!(run.inputs, vec![FileRef::new("/after/caught.csv", None)]);
    let exc = run.exception.expect("exception recorded");
    assert_eq!(exc.kind, "panic");
    assert_eq!(exc.message, "division by zero in step 3");
    assert!(exc.traceback.contains("panic_hook_tests.rs"));
    assert!(run.exit_date.is_some());
    assert!(!ctx.finish_run(None).expect("second finish"));
}
