//! The foreign surface a font backend must provide.
//!
//! Decoding bytes into a font face and rasterizing a string are opaque
//! foreign calls. The engine never inspects the handles a backend returns;
//! it stores them in an asset's `Ready` state and hands them back for
//! disposal.

use serde::{Deserialize, Serialize};

use crate::Result;

/// An RGBA color handed to the text renderer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Native font and surface primitives, injected into the [`Font`] and
/// [`Text`] resource types.
///
/// Handle types are opaque `Copy` values owned by the backend (indices,
/// pointers). Disposal primitives must not fail; there is no caller who
/// could act on a failed free.
///
/// [`Font`]: crate::types::font::Font
/// [`Text`]: crate::types::text::Text
pub trait FontBackend: Send + Sync + 'static {
    /// Live font face handle.
    type Font: Copy + Send + 'static;
    /// Rendered surface handle.
    type Surface: Copy + Send + 'static;

    /// Open a font face from raw bytes at a point size.
    ///
    /// `index` selects a face inside a multi-font archive. The engine
    /// keeps `bytes` alive for as long as the font asset exists, so a
    /// backend may keep pulling from the buffer lazily after this call
    /// returns. Fails with [`Error::Decode`](crate::Error::Decode) when
    /// the bytes are rejected.
    fn open_font(&self, bytes: &[u8], size: u16, index: Option<u32>) -> Result<Self::Font>;

    /// Rasterize `text` into a surface.
    ///
    /// The font handle is guaranteed live for the duration of the call.
    /// Fails with [`Error::Render`](crate::Error::Render) on rejection.
    fn render(&self, font: Self::Font, text: &str, color: Color) -> Result<Self::Surface>;

    fn family_name(&self, font: Self::Font) -> String;

    fn style_name(&self, font: Self::Font) -> String;

    fn is_fixed_width(&self, font: Self::Font) -> bool;

    /// Release a font handle. Must not fail.
    fn close_font(&self, font: Self::Font);

    /// Release a surface handle. Must not fail.
    fn free_surface(&self, surface: Self::Surface);
}
