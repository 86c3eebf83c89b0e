//! Cache of raw asset content, keyed by name.
//!
//! Every asset that references the same name shares one read-only buffer,
//! no matter how many times the backend reparses it. The cache holds weak
//! references, so content is dropped once the last asset referencing it
//! lets go and re-read on the next request.

use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    hash::{Hash, Hasher},
    sync::{Arc, RwLock, Weak},
};

use log::{info, trace};
use once_cell::sync::Lazy;

use crate::{AssetPath, Error, Result};

static RAW_CACHE: Lazy<RwLock<HashMap<u64, Weak<RawBytes>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Raw content of an asset plus the name it was loaded under.
///
/// Immutable once produced; shared read-only by every consumer of the name.
#[derive(Debug)]
pub struct RawBytes {
    path: AssetPath,
    bytes: Arc<[u8]>,
}

impl RawBytes {
    /// The name this content was loaded under.
    pub fn path(&self) -> &AssetPath {
        &self.path
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Fetch the raw bytes behind `path`, reusing previously loaded content
///
/// Repeated and concurrent fetches for the same name return content-identical
/// bytes. Fails with [`Error::NotFound`] if the name cannot be resolved and
/// [`Error::Io`] on any read error from the underlying source.
pub fn fetch<P, E>(path: P) -> Result<Arc<RawBytes>>
where
    P: TryInto<AssetPath, Error = E>,
    E: Into<Error>,
{
    let path = path.try_into().map_err(Into::into)?;

    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    let key = hasher.finish();

    if let Some(raw) = RAW_CACHE.read().unwrap().get(&key).and_then(Weak::upgrade) {
        trace!("found raw bytes for {path} in cache");
        return Ok(raw);
    }

    // Read outside the lock; two racing fetches for the same name at worst
    // read twice and the cache keeps whichever lands last.
    info!("loading raw bytes: {path}");
    let bytes = path.read()?;
    let raw = Arc::new(RawBytes { path, bytes });
    RAW_CACHE.write().unwrap().insert(key, Arc::downgrade(&raw));
    Ok(raw)
}
