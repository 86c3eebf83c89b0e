//! Process-wide disposal of produced handles.
//!
//! Each lifecycle cell owns its disposal routine and handle directly, so
//! releasing them never depends on a container that shutdown might have
//! reclaimed first. The registry here only remembers which cells are still
//! alive so [`teardown`] can drain them at a deterministic point.

use std::sync::{Arc, Mutex, Weak};

use log::debug;
use once_cell::sync::Lazy;

use crate::{asset::AssetId, produce};

/// Capability of releasing a produced native handle exactly once.
pub(crate) trait Finalize: Send + Sync {
    fn finalize(&self);
}

static ENLISTED: Lazy<Mutex<Vec<(AssetId, Weak<dyn Finalize>)>>> =
    Lazy::new(|| Mutex::new(Vec::new()));

pub(crate) fn enlist(id: AssetId, cell: &Arc<dyn Finalize>) {
    ENLISTED.lock().unwrap().push((id, Arc::downgrade(cell)));
}

/// Remove a dropped cell's entry. Called from the cell's `Drop`, so the
/// registry never accumulates dead weak references in a process that
/// churns assets.
pub(crate) fn delist(id: AssetId) {
    ENLISTED.lock().unwrap().retain(|(other, _)| *other != id);
}

#[cfg(test)]
pub(crate) fn is_enlisted(id: AssetId) -> bool {
    ENLISTED
        .lock()
        .unwrap()
        .iter()
        .any(|(other, _)| *other == id)
}

/// Dispose every asset still alive, dependents before their upstreams.
///
/// Assets enlist in declaration order and a dependent can only reference
/// assets declared before it, so draining in reverse releases each handle
/// after everything that might still touch it. Meant to be called once by
/// the process entry point at shutdown; calling it again later drains
/// whatever was declared in between. Disposal of an asset that is still
/// producing waits for the production to finish first.
pub fn teardown() {
    let drained = std::mem::take(&mut *ENLISTED.lock().unwrap());
    debug!(
        "tearing down {} enlisted assets ({} productions in flight)",
        drained.len(),
        produce::in_flight()
    );
    for (_, cell) in drained.into_iter().rev() {
        if let Some(cell) = cell.upgrade() {
            cell.finalize();
        }
    }
}
