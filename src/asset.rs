//! The generic declare / produce / cache / chain / free lifecycle.
//!
//! An [`Asset`] owns exactly one [`State`] at a time and transitions are
//! monotonic: `Pending` to `Producing` to `Ready` or `Failed`, and from
//! there only to `Disposed`. Production runs once on a background worker;
//! every `load()` caller blocks on the same cell and observes the same
//! terminal result.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Condvar, Mutex,
    },
};

use log::{debug, warn};

use crate::{
    chain::{self, ChainLink, Chainable, Held, HoldGuard},
    finalize::{self, Finalize},
    produce, Error, Result,
};

/// Identifier of one lifecycle cell, unique for the process lifetime.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AssetId(u64);

impl AssetId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        AssetId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Lifecycle state of an asset.
///
/// `Ready` is the only state that owns a live native handle. A cached
/// failure is replayed to every later `load()`, never retried.
#[derive(Debug, Clone)]
pub enum State<H> {
    Pending,
    Producing,
    Ready(H),
    Failed(Error),
    Disposed,
}

impl<H> State<H> {
    fn name(&self) -> &'static str {
        match self {
            State::Pending => "pending",
            State::Producing => "producing",
            State::Ready(_) => "ready",
            State::Failed(_) => "failed",
            State::Disposed => "disposed",
        }
    }
}

/// The extension points a resource type plugs into the engine: a stable
/// name, optional upstream chain edges, a construction routine run on a
/// worker, and an infallible disposal routine for the produced handle.
pub trait Produce: Send + Sync + 'static {
    /// Opaque native handle owned by the external backend.
    type Handle: Copy + Send + 'static;

    /// Stable name used in log lines and error messages.
    fn label(&self) -> String;

    /// Assets that must reach a terminal state before [`construct`] runs.
    ///
    /// [`construct`]: Produce::construct
    fn upstream(&self) -> Vec<Arc<dyn Chainable>> {
        Vec::new()
    }

    /// Produce the native handle from raw content.
    ///
    /// Runs on a worker thread, strictly after every upstream asset is
    /// terminal; upstream handles observed here are guaranteed `Ready` and
    /// pinned against disposal for the duration of the call.
    fn construct(&self) -> Result<Self::Handle>;

    /// Release the native handle. Must not fail; called exactly once.
    fn dispose(&self, handle: Self::Handle);
}

struct Inner<H> {
    state: State<H>,
    /// Dependents currently mid-construct against our handle. Disposal
    /// waits for this to reach zero.
    holds: usize,
}

type Job<H> = Box<dyn FnOnce(Arc<Cell<H>>) + Send>;

/// Shared lifecycle cell: the state machine, its condition variable, the
/// one-shot production job, and the disposal routine.
///
/// The cell holds the disposal closure and (once `Ready`) the handle
/// directly, so the release path never reaches through any registry.
pub(crate) struct Cell<H: Copy> {
    id: AssetId,
    label: String,
    inner: Mutex<Inner<H>>,
    cond: Condvar,
    job: Mutex<Option<Job<H>>>,
    free: Box<dyn Fn(H) + Send + Sync>,
}

impl<H: Copy + Send + 'static> Cell<H> {
    /// Start production if it has not begun. Idempotent; concurrent first
    /// callers race on the `Pending` check under the lock and only one
    /// takes the job.
    fn trigger(self: &Arc<Self>) {
        let job = {
            let mut inner = self.inner.lock().unwrap();
            if !matches!(inner.state, State::Pending) {
                return;
            }
            match self.job.lock().unwrap().take() {
                Some(job) => {
                    inner.state = State::Producing;
                    job
                }
                None => return,
            }
        };
        debug!("producing {}", self.label);
        let cell = Arc::clone(self);
        produce::submit(&self.label, move || job(cell));
    }

    /// Record the production result. No-op unless currently `Producing`.
    fn complete(&self, result: Result<H>) {
        let mut inner = self.inner.lock().unwrap();
        if !matches!(inner.state, State::Producing) {
            return;
        }
        inner.state = match result {
            Ok(handle) => {
                debug!("{} ready", self.label);
                State::Ready(handle)
            }
            Err(e) => {
                debug!("{} failed: {e}", self.label);
                State::Failed(e)
            }
        };
        self.cond.notify_all();
    }

    /// Block the caller until a terminal state and report it.
    fn wait_loaded(&self) -> Result<H> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            match &inner.state {
                State::Pending | State::Producing => inner = self.cond.wait(inner).unwrap(),
                State::Ready(handle) => return Ok(*handle),
                State::Failed(e) => return Err(e.clone()),
                State::Disposed => return Err(Error::UseAfterDispose(self.label.clone())),
            }
        }
    }

    /// Release the handle exactly once.
    ///
    /// Waits out an in-flight production and any dependent still
    /// mid-construct against the handle, then transitions to `Disposed`.
    /// A `Pending` asset is retired without ever producing; `Failed` keeps
    /// nothing to release. Safe to call any number of times.
    fn dispose(&self) {
        let mut inner = self.inner.lock().unwrap();
        let handle = loop {
            // None means "not yet"; Some carries the handle to release,
            // if any
            let decision = match &inner.state {
                State::Producing => None,
                State::Ready(_) if inner.holds > 0 => None,
                State::Ready(handle) => Some(Some(*handle)),
                State::Pending | State::Failed(_) => Some(None),
                State::Disposed => break None,
            };
            match decision {
                Some(handle) => {
                    inner.state = State::Disposed;
                    break handle;
                }
                None => inner = self.cond.wait(inner).unwrap(),
            }
        };
        // a production can no longer start; drop the job and whatever it
        // captured
        self.job.lock().unwrap().take();
        self.cond.notify_all();
        drop(inner);
        if let Some(handle) = handle {
            debug!("disposed {}", self.label);
            (self.free)(handle);
        }
    }

    fn snapshot(&self) -> State<H> {
        self.inner.lock().unwrap().state.clone()
    }
}

impl<H: Copy + Send + 'static> Chainable for Cell<H> {
    fn id(&self) -> AssetId {
        self.id
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn wait_and_hold(self: Arc<Self>) -> Result<HoldGuard> {
        self.trigger();
        let mut inner = self.inner.lock().unwrap();
        loop {
            match &inner.state {
                State::Pending | State::Producing => inner = self.cond.wait(inner).unwrap(),
                State::Ready(_) => {
                    inner.holds += 1;
                    drop(inner);
                    return Ok(HoldGuard::new(self));
                }
                State::Failed(e) => {
                    return Err(Error::upstream(self.label.as_str(), e.clone()));
                }
                State::Disposed => {
                    return Err(Error::upstream(
                        self.label.as_str(),
                        Error::UseAfterDispose(self.label.clone()),
                    ));
                }
            }
        }
    }
}

impl<H: Copy + Send + 'static> Held for Cell<H> {
    fn release_hold(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.holds -= 1;
        self.cond.notify_all();
    }
}

impl<H: Copy + Send + 'static> Finalize for Cell<H> {
    fn finalize(&self) {
        if matches!(self.inner.lock().unwrap().state, State::Producing) {
            warn!("{} still producing at teardown; waiting", self.label);
        }
        self.dispose();
    }
}

impl<H: Copy> Drop for Cell<H> {
    fn drop(&mut self) {
        chain::forget(self.id);
        finalize::delist(self.id);
        // last holder gone; a produced handle still owned here is released
        // through the same once-only path
        if let Ok(inner) = self.inner.get_mut() {
            if let State::Ready(handle) = &inner.state {
                let handle = *handle;
                inner.state = State::Disposed;
                (self.free)(handle);
            }
        }
    }
}

/// A lazily, asynchronously produced resource with cache, chaining and
/// disposal lifecycle.
///
/// Cloning shares the same lifecycle cell; all clones observe one state.
pub struct Asset<P: Produce> {
    producer: Arc<P>,
    cell: Arc<Cell<P::Handle>>,
}

impl<P: Produce> Clone for Asset<P> {
    fn clone(&self) -> Self {
        Self {
            producer: self.producer.clone(),
            cell: self.cell.clone(),
        }
    }
}

impl<P: Produce> Asset<P> {
    /// Declare an asset and immediately begin producing it.
    pub fn new(producer: P) -> Self {
        let asset = Self::deferred(producer);
        asset.cell.trigger();
        asset
    }

    /// Declare an asset without starting production.
    ///
    /// The first [`load`](Asset::load) call, or a dependent's chain wait,
    /// starts it.
    pub fn deferred(producer: P) -> Self {
        let producer = Arc::new(producer);
        let id = AssetId::next();
        let label = producer.label();
        let upstream = producer.upstream();

        // a declaration that would close a dependency loop is born failed
        // and never submitted
        let initial = match chain::register(id, &label, &upstream) {
            Ok(()) => State::Pending,
            Err(e) => State::Failed(e),
        };

        let link = ChainLink::new(upstream);
        let job: Job<P::Handle> = {
            let producer = producer.clone();
            Box::new(move |cell| {
                // guards stay alive across construct so no upstream can be
                // disposed mid-call
                let result = link.await_all().and_then(|_held| producer.construct());
                cell.complete(result);
            })
        };

        let free: Box<dyn Fn(P::Handle) + Send + Sync> = {
            let producer = producer.clone();
            Box::new(move |handle| producer.dispose(handle))
        };

        let cell = Arc::new(Cell {
            id,
            label,
            inner: Mutex::new(Inner {
                state: initial,
                holds: 0,
            }),
            cond: Condvar::new(),
            job: Mutex::new(Some(job)),
            free,
        });
        finalize::enlist(id, &(cell.clone() as Arc<dyn Finalize>));

        Asset { producer, cell }
    }

    /// Block until production is terminal and return the native handle.
    ///
    /// Triggers production if it has not started. A cached failure is
    /// replayed verbatim on every call; a disposed asset fails fast with
    /// [`Error::UseAfterDispose`] and never re-enters production.
    pub fn load(&self) -> Result<P::Handle> {
        self.cell.trigger();
        self.cell.wait_loaded()
    }

    /// Release the native handle.
    ///
    /// Blocks while production is in flight or a dependent is mid-construct
    /// against the handle. Idempotent.
    pub fn dispose(&self) {
        self.cell.dispose();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State<P::Handle> {
        self.cell.snapshot()
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state(), State::Ready(_))
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.state(), State::Disposed)
    }

    pub fn label(&self) -> String {
        self.cell.label.clone()
    }

    /// The construction recipe this asset was declared with.
    pub fn producer(&self) -> &P {
        &self.producer
    }

    /// This asset as an upstream edge for a dependent declaration.
    pub fn chain_handle(&self) -> Arc<dyn Chainable> {
        self.cell.clone()
    }
}

impl<P: Produce> fmt::Debug for Asset<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Asset {} {}>",
            self.cell.label,
            self.cell.snapshot().name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::{Duration, Instant};

    struct Stub {
        label: String,
        attempts: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Stub {
        fn new(label: &str, fail: bool) -> (Self, Arc<AtomicUsize>) {
            let attempts = Arc::new(AtomicUsize::new(0));
            (
                Stub {
                    label: label.into(),
                    attempts: attempts.clone(),
                    fail,
                },
                attempts,
            )
        }
    }

    impl Produce for Stub {
        type Handle = u64;

        fn label(&self) -> String {
            self.label.clone()
        }

        fn construct(&self) -> Result<u64> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) as u64;
            if self.fail {
                Err(Error::Decode {
                    name: self.label.clone(),
                    reason: "stub failure".into(),
                })
            } else {
                Ok(40 + n)
            }
        }

        fn dispose(&self, _handle: u64) {}
    }

    #[test]
    fn concurrent_loads_construct_once() {
        let (stub, attempts) = Stub::new("stub/concurrent", false);
        let asset = Asset::deferred(stub);
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let asset = asset.clone();
                thread::spawn(move || asset.load().unwrap())
            })
            .collect();
        let handles: Vec<u64> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(handles.iter().all(|&h| h == handles[0]));
    }

    #[test]
    fn failure_is_cached_not_retried() {
        let (stub, attempts) = Stub::new("stub/failing", true);
        let asset = Asset::new(stub);
        for _ in 0..3 {
            let err = asset.load().unwrap_err();
            assert!(matches!(err, Error::Decode { .. }));
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disposing_pending_asset_retires_it() {
        let (stub, attempts) = Stub::new("stub/retired", false);
        let asset = Asset::deferred(stub);
        asset.dispose();
        let err = asset.load().unwrap_err();
        assert!(matches!(err, Error::UseAfterDispose(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn states_progress_monotonically() {
        let (stub, _) = Stub::new("stub/states", false);
        let asset = Asset::deferred(stub);
        assert!(matches!(asset.state(), State::Pending));
        asset.load().unwrap();
        assert!(asset.is_loaded());
        asset.dispose();
        assert!(asset.is_disposed());
    }

    #[test]
    fn churned_assets_leave_no_finalization_entries() {
        let mut ids = Vec::new();
        for _ in 0..100 {
            let (stub, _) = Stub::new("stub/churn", false);
            let asset = Asset::new(stub);
            asset.load().unwrap();
            let id = asset.chain_handle().id();
            assert!(finalize::is_enlisted(id));
            ids.push(id);
        }
        // each asset was dropped at the end of its iteration; a worker may
        // hold the last reference for an instant
        let deadline = Instant::now() + Duration::from_secs(5);
        while ids.iter().any(|&id| finalize::is_enlisted(id)) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(ids.iter().all(|&id| !finalize::is_enlisted(id)));
    }

    #[test]
    fn workers_drain_after_production() {
        let (stub, _) = Stub::new("stub/drain", false);
        let asset = Asset::new(stub);
        asset.load().unwrap();
        // the worker decrements the gauge after completing the cell; give
        // it (and any worker from a sibling test) a moment to exit
        let deadline = Instant::now() + Duration::from_secs(5);
        while produce::in_flight() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(produce::in_flight(), 0);
    }
}
