//! Rendered text as an asset chained on its font.

use std::{fmt, sync::Arc};

use crate::{
    asset::{Asset, Produce},
    backend::{Color, FontBackend},
    chain::Chainable,
    types::font::Font,
    Result,
};

/// Construction recipe for a rendered string: the text, the owning font
/// and the color.
pub struct TextProducer<B: FontBackend> {
    font: Font<B>,
    content: String,
    color: Color,
}

impl<B: FontBackend> Produce for TextProducer<B> {
    type Handle = B::Surface;

    fn label(&self) -> String {
        format!("text {:?} in {}", self.content, self.font.name())
    }

    fn upstream(&self) -> Vec<Arc<dyn Chainable>> {
        vec![self.font.asset().chain_handle()]
    }

    fn construct(&self) -> Result<B::Surface> {
        // the chain wait has already completed, so this is a cache hit on
        // a ready handle
        let font = self.font.load()?;
        self.font
            .backend()
            .render(font, &self.content, self.color)
    }

    fn dispose(&self, handle: B::Surface) {
        self.font.backend().free_surface(handle);
    }
}

/// A bit of rendered text.
///
/// Production does not begin until the owning font has reached a terminal
/// state; a failed font fails the text without the renderer ever being
/// called.
pub struct Text<B: FontBackend>(Asset<TextProducer<B>>);

impl<B: FontBackend> Clone for Text<B> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<B: FontBackend> Text<B> {
    /// Declare a rendered string and immediately begin producing it.
    ///
    /// The font may still be mid-production; rendering waits for it.
    pub fn new(content: impl Into<String>, font: &Font<B>, color: Color) -> Self {
        Self(Asset::new(Self::producer(content, font, color)))
    }

    /// Declare without starting production.
    pub fn deferred(content: impl Into<String>, font: &Font<B>, color: Color) -> Self {
        Self(Asset::deferred(Self::producer(content, font, color)))
    }

    fn producer(content: impl Into<String>, font: &Font<B>, color: Color) -> TextProducer<B> {
        TextProducer {
            font: font.clone(),
            content: content.into(),
            color,
        }
    }

    /// Block until the surface is rendered and return its backend handle.
    pub fn load(&self) -> Result<B::Surface> {
        self.0.load()
    }

    /// Release the surface handle. Idempotent.
    pub fn dispose(&self) {
        self.0.dispose();
    }

    pub fn is_loaded(&self) -> bool {
        self.0.is_loaded()
    }

    pub fn is_disposed(&self) -> bool {
        self.0.is_disposed()
    }

    pub fn content(&self) -> &str {
        &self.0.producer().content
    }

    pub fn color(&self) -> Color {
        self.0.producer().color
    }

    pub fn font(&self) -> &Font<B> {
        &self.0.producer().font
    }
}

impl<B: FontBackend> fmt::Debug for Text<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Text {:?}{}>",
            self.content(),
            if self.is_loaded() { " loaded" } else { "" }
        )
    }
}
