//! True-Type/OpenType font faces as assets.

use std::{fmt, sync::Arc};

use once_cell::sync::OnceCell;

use crate::{
    asset::{Asset, Produce},
    backend::FontBackend,
    raw::{self, RawBytes},
    AssetPath, Error, Result,
};

/// Construction recipe for a font face: which bytes, what size, which face
/// of a multi-font archive.
pub struct FontProducer<B: FontBackend> {
    backend: Arc<B>,
    path: AssetPath,
    size: u16,
    index: Option<u32>,
    // Backends pull font bytes lazily while the face is in use, so the raw
    // content is parked here until the asset is disposed.
    raw: OnceCell<Arc<RawBytes>>,
}

impl<B: FontBackend> Produce for FontProducer<B> {
    type Handle = B::Font;

    fn label(&self) -> String {
        format!("{}@{}pt", self.path, self.size)
    }

    fn construct(&self) -> Result<B::Font> {
        let raw = self.raw.get_or_try_init(|| raw::fetch(self.path.clone()))?;
        self.backend.open_font(raw.as_bytes(), self.size, self.index)
    }

    fn dispose(&self, handle: B::Font) {
        self.backend.close_font(handle);
    }
}

/// A font face produced off-thread from named raw bytes.
///
/// Multiple fonts declared against the same name share one raw buffer
/// through the cache, however many times the backend reparses it. Cloning
/// shares the same asset.
pub struct Font<B: FontBackend>(Asset<FontProducer<B>>);

impl<B: FontBackend> Clone for Font<B> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<B: FontBackend> Font<B> {
    /// Declare a font and immediately begin producing it.
    ///
    /// * `path`: name of the raw bytes, e.g. `file:fonts/sans.ttf`
    /// * `size`: the size in points
    pub fn open<P, E>(backend: Arc<B>, path: P, size: u16) -> Result<Self>
    where
        P: TryInto<AssetPath, Error = E>,
        E: Into<Error>,
    {
        Self::declare(backend, path, size, None, true)
    }

    /// Variant of [`open`](Font::open) selecting a face inside a
    /// multi-font archive (rare).
    pub fn open_indexed<P, E>(backend: Arc<B>, path: P, size: u16, index: u32) -> Result<Self>
    where
        P: TryInto<AssetPath, Error = E>,
        E: Into<Error>,
    {
        Self::declare(backend, path, size, Some(index), true)
    }

    /// Declare without starting production; the first `load()` or a
    /// dependent text asset starts it.
    pub fn deferred<P, E>(backend: Arc<B>, path: P, size: u16) -> Result<Self>
    where
        P: TryInto<AssetPath, Error = E>,
        E: Into<Error>,
    {
        Self::declare(backend, path, size, None, false)
    }

    fn declare<P, E>(
        backend: Arc<B>,
        path: P,
        size: u16,
        index: Option<u32>,
        eager: bool,
    ) -> Result<Self>
    where
        P: TryInto<AssetPath, Error = E>,
        E: Into<Error>,
    {
        let producer = FontProducer {
            backend,
            path: path.try_into().map_err(Into::into)?,
            size,
            index,
            raw: OnceCell::new(),
        };
        Ok(Self(if eager {
            Asset::new(producer)
        } else {
            Asset::deferred(producer)
        }))
    }

    /// Block until the face is produced and return its backend handle.
    pub fn load(&self) -> Result<B::Font> {
        self.0.load()
    }

    /// Release the backend handle. Blocks while a dependent text asset is
    /// mid-render against it.
    pub fn dispose(&self) {
        self.0.dispose();
    }

    pub fn is_loaded(&self) -> bool {
        self.0.is_loaded()
    }

    pub fn is_disposed(&self) -> bool {
        self.0.is_disposed()
    }

    /// The name the raw bytes were loaded under.
    pub fn name(&self) -> String {
        self.0.producer().path.to_string()
    }

    pub fn size(&self) -> u16 {
        self.0.producer().size
    }

    /// A sibling font at a different size.
    ///
    /// Shares the same raw bytes cache entry; the handle, lifecycle state
    /// and disposal are independent because backend handles are
    /// size-specific.
    pub fn resize(&self, size: u16) -> Self {
        let producer = self.0.producer();
        Self(Asset::new(FontProducer {
            backend: producer.backend.clone(),
            path: producer.path.clone(),
            size,
            index: producer.index,
            raw: OnceCell::new(),
        }))
    }

    pub fn family_name(&self) -> Result<String> {
        Ok(self.0.producer().backend.family_name(self.load()?))
    }

    pub fn style_name(&self) -> Result<String> {
        Ok(self.0.producer().backend.style_name(self.load()?))
    }

    pub fn is_fixed_width(&self) -> Result<bool> {
        Ok(self.0.producer().backend.is_fixed_width(self.load()?))
    }

    pub(crate) fn asset(&self) -> &Asset<FontProducer<B>> {
        &self.0
    }

    pub(crate) fn backend(&self) -> &Arc<B> {
        &self.0.producer().backend
    }
}

impl<B: FontBackend> fmt::Debug for Font<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Font name={:?} size={:?}{}>",
            self.name(),
            self.size(),
            if self.is_loaded() { " loaded" } else { "" }
        )
    }
}
