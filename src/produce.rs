//! Background production of native handles.
//!
//! Every in-flight production runs on its own named worker thread, never on
//! the submitting context. A producing job may block waiting for upstream
//! assets, so workers are not pooled; a fixed pool could fill up with
//! dependents waiting on upstreams that cannot get a worker.

use std::{
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
    thread,
};

use log::trace;

static WORKER_SEQ: AtomicU64 = AtomicU64::new(0);
static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);

/// Run `job` on a fresh worker thread.
///
/// The caller is responsible for submitting each production at most once;
/// the asset state machine enforces that with its `Pending` to `Producing`
/// transition.
pub(crate) fn submit(label: &str, job: impl FnOnce() + Send + 'static) {
    let seq = WORKER_SEQ.fetch_add(1, Ordering::Relaxed);
    let name = format!("asset-worker-{seq}");
    trace!("submitting production of {label} to {name}");

    thread::Builder::new()
        .name(name)
        .spawn(move || {
            let live = IN_FLIGHT.fetch_add(1, Ordering::Relaxed) + 1;
            trace!("{live} productions in flight");
            job();
            IN_FLIGHT.fetch_sub(1, Ordering::Relaxed);
        })
        .expect("spawning asset worker thread");
}

/// Number of productions currently running.
pub fn in_flight() -> usize {
    IN_FLIGHT.load(Ordering::Relaxed)
}
