//! Chaining one asset's production on another's completion.
//!
//! A dependent asset's construction routine must never observe an upstream
//! handle before that upstream is `Ready`. The engine awaits the whole
//! chain on the producing worker before invoking `construct`, and keeps a
//! hold on every upstream for the duration of the call so none of them can
//! be disposed out from under it.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use log::trace;
use once_cell::sync::Lazy;

use crate::{asset::AssetId, Error, Result};

/// Capability of being waited on as an upstream dependency.
///
/// Implemented by the engine's lifecycle cell; resource types get it for
/// free through [`Asset::chain_handle`](crate::Asset::chain_handle).
pub trait Chainable: Send + Sync {
    fn id(&self) -> AssetId;

    fn label(&self) -> String;

    /// Block until this asset is terminal.
    ///
    /// Starts production if it has not begun. On `Ready` the asset's
    /// held-by count is incremented atomically with the observation and a
    /// guard is returned; on `Failed` the stored error comes back wrapped
    /// in [`Error::Upstream`]. Runs on a producing worker, never on a
    /// `load()` caller.
    fn wait_and_hold(self: Arc<Self>) -> Result<HoldGuard>;
}

/// The release half of a hold. Kept off [`Chainable`] so nothing outside
/// the crate can decrement a held-by count it never incremented; the only
/// caller is [`HoldGuard`]'s drop.
pub(crate) trait Held: Send + Sync {
    fn release_hold(&self);
}

/// Pins an upstream's handle against disposal while a dependent's
/// construction routine is running.
pub struct HoldGuard {
    upstream: Arc<dyn Held>,
}

impl HoldGuard {
    pub(crate) fn new(upstream: Arc<dyn Held>) -> Self {
        Self { upstream }
    }
}

impl Drop for HoldGuard {
    fn drop(&mut self) {
        self.upstream.release_hold();
    }
}

/// The upstream edges of one dependent asset, fixed at declaration.
pub(crate) struct ChainLink {
    upstreams: Vec<Arc<dyn Chainable>>,
}

impl ChainLink {
    pub(crate) fn new(upstreams: Vec<Arc<dyn Chainable>>) -> Self {
        Self { upstreams }
    }

    /// Wait for every upstream to reach a terminal state.
    ///
    /// Returns the first failure encountered; succeeds only if all
    /// upstreams are `Ready`, in which case the returned guards keep them
    /// pinned until dropped.
    pub(crate) fn await_all(&self) -> Result<Vec<HoldGuard>> {
        self.upstreams
            .iter()
            .map(|up| {
                trace!("waiting on upstream {}", up.label());
                up.clone().wait_and_hold()
            })
            .collect()
    }
}

static EDGES: Lazy<Mutex<HashMap<AssetId, Vec<AssetId>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Record the dependency edges of a newly declared asset, refusing any
/// declaration that would close a loop.
///
/// The public resource API only lets a dependent reference assets that
/// already exist, so the graph is acyclic by construction; this check is
/// the hardening layer behind that guarantee.
pub(crate) fn register(id: AssetId, label: &str, upstreams: &[Arc<dyn Chainable>]) -> Result<()> {
    let ups: Vec<AssetId> = upstreams.iter().map(|up| up.id()).collect();
    let mut edges = EDGES.lock().unwrap();
    if ups.iter().any(|&up| reaches(&edges, up, id)) {
        return Err(Error::CycleDetected(label.to_string()));
    }
    edges.insert(id, ups);
    Ok(())
}

pub(crate) fn forget(id: AssetId) {
    EDGES.lock().unwrap().remove(&id);
}

fn reaches(edges: &HashMap<AssetId, Vec<AssetId>>, from: AssetId, target: AssetId) -> bool {
    if from == target {
        return true;
    }
    edges
        .get(&from)
        .map_or(false, |ups| ups.iter().any(|&up| reaches(edges, up, target)))
}
