//! Shared helpers for async assertions.

use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Route bus tracing to test output. Honors `RUST_LOG`; repeated calls are
/// no-ops. Run with `RUST_LOG=relay_bus=debug` to watch dispatch decisions.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Poll `condition` until it holds or `deadline` elapses (then panic).
///
/// The bus is fire-and-forget; tests observe deliveries by polling shared
/// counters rather than by return values.
pub async fn eventually<F>(deadline: Duration, mut condition: F)
where
    F: FnMut() -> bool,
{
    let started = Instant::now();
    while !condition() {
        assert!(
            started.elapsed() < deadline,
            "condition not met within {deadline:?}"
        );
        sleep(Duration::from_millis(5)).await;
    }
}

/// Give in-flight dispatch a moment to finish before a negative assertion
/// ("the hook never fired", "no further delivery happened").
pub async fn settle() {
    sleep(Duration::from_millis(100)).await;
}
