use std::time::Instant;

use tracing::debug;

/// Runs store or file I/O inline on the UI thread, timing it under `label`.
pub fn run_blocking<F, T>(label: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let started = Instant::now();
    let result = f();
    debug!(label, elapsed_ms = started.elapsed().as_millis() as u64, "blocking call finished");
    result
}
