//! Loadstone asset lifecycle engine
//!
//! An asset declares how to produce an opaque native handle from raw bytes;
//! the engine produces it on a background worker, caches the raw bytes by
//! name, chains dependent assets on upstream completion, and releases every
//! produced handle exactly once.
//!
//! Raw content is shared read-only between every asset declared against the
//! same name, independent of how many times a backend reparses it. `load()`
//! blocks the caller until production is terminal; a dependent asset (a
//! rendered text on its font) waits on the producing worker instead, so
//! callers never observe a half-built upstream.
//!
//! # Usage
//!
//! ```
//! # use std::sync::Arc;
//! # use loadstone::{Color, Font, FontBackend, Result, Text};
//! # struct Stub;
//! # impl FontBackend for Stub {
//! #     type Font = u32;
//! #     type Surface = u32;
//! #     fn open_font(&self, _: &[u8], _: u16, _: Option<u32>) -> Result<u32> { Ok(1) }
//! #     fn render(&self, _: u32, _: &str, _: Color) -> Result<u32> { Ok(2) }
//! #     fn family_name(&self, _: u32) -> String { "Stub".into() }
//! #     fn style_name(&self, _: u32) -> String { "Regular".into() }
//! #     fn is_fixed_width(&self, _: u32) -> bool { false }
//! #     fn close_font(&self, _: u32) {}
//! #     fn free_surface(&self, _: u32) {}
//! # }
//! loadstone::register_bytes("fonts/sans", b"\x00\x01\x00\x00".to_vec());
//!
//! let backend = Arc::new(Stub);
//! let font = Font::open(backend, "mem:fonts/sans", 12)?;
//! let title = Text::new("hello", &font, Color::rgb(255, 0, 0));
//! let _surface = title.load()?;
//!
//! loadstone::teardown();
//! # Ok::<(), loadstone::Error>(())
//! ```
//!
//! Backends decoding real font formats plug in through [`FontBackend`];
//! resource types beyond fonts and text plug their construction and
//! disposal routines into the same engine through [`Produce`].

mod asset;
mod backend;
mod chain;
mod error;
mod finalize;
mod path;
pub mod produce;
pub mod raw;

pub use asset::{Asset, AssetId, Produce, State};
pub use backend::{Color, FontBackend};
pub use chain::{Chainable, HoldGuard};
pub use error::{Error, Result};
pub use finalize::teardown;
pub use path::{register_bytes, AssetPath};
pub use raw::RawBytes;
pub use types::{font::Font, text::Text};

/// Resource type implementations
pub mod types {
    pub mod font;
    pub mod text;
}
