//! Process-wide teardown drains every live asset, dependents first.
//!
//! Kept in its own test binary: `teardown()` is process-global and would
//! race assets created by unrelated tests in the same process.

mod common;

use common::{init_logging, FakeBackend};
use loadstone::{register_bytes, Color, Error, Font, Text};

#[test]
fn teardown_disposes_dependents_before_upstreams() {
    init_logging();
    let backend = FakeBackend::new();
    register_bytes("teardown/font", b"\x00\x01\x00\x00stub".to_vec());

    let font = Font::open(backend.clone(), "mem:teardown/font", 14).unwrap();
    let text = Text::new("goodbye", &font, Color::WHITE);
    let surface = text.load().unwrap();
    let font_handle = font.load().unwrap();

    loadstone::teardown();

    assert_eq!(*backend.freed.lock().unwrap(), vec![surface]);
    assert_eq!(*backend.closed.lock().unwrap(), vec![font_handle]);
    // the surface went back before the font it was rendered with
    assert_eq!(
        *backend.events.lock().unwrap(),
        vec!["free_surface", "close_font"]
    );

    assert!(font.is_disposed());
    assert!(text.is_disposed());
    assert!(matches!(font.load(), Err(Error::UseAfterDispose(_))));
}
