use super::*;

#[test]
fn trace_macros_compile() {
    // No-ops without the tracing feature
    trace!("trace message");
    debug!(steps = 3, "debug message");
    info!("info message");
    warn!("warn message");

    let _span = trace_span!("step", kind = "equal");
    let _entered = debug_span!("solve").entered();
    let _level = Level::DEBUG;
}

#[test]
fn init_subscriber_is_idempotent() {
    init_subscriber();
    init_subscriber();
    init_subscriber_with("debug");
}

#[cfg(not(feature = "tracing"))]
#[test]
fn flamegraph_without_tracing_is_inert() {
    let guard = init_flamegraph("/nonexistent/dir/out.folded");
    assert!(guard.is_ok());
}

#[test]
fn trace_error_names_the_path() {
    let err = TraceError::Flamegraph {
        path: "out.folded".to_string(),
        message: "denied".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "cannot create flamegraph output out.folded: denied"
    );
}
