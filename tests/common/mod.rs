//! Controllable fake backend for lifecycle tests.
//!
//! Handles are small integers; font handles start at 0x100 and surface
//! handles at 0x200. Gates let a test observe "entered construct" and
//! decide when the call is allowed to finish.
#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering},
    mpsc, Arc, Mutex,
};

use loadstone::{Color, Error, FontBackend, Result};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One-shot handshake a backend call can be made to block on.
pub struct Gate(Mutex<Option<GateInner>>);

struct GateInner {
    entered: mpsc::Sender<()>,
    release: mpsc::Receiver<()>,
}

impl Gate {
    fn new() -> Self {
        Self(Mutex::new(None))
    }

    /// Arm the gate. The next call passing through signals the returned
    /// `entered` receiver and then blocks until the `release` sender fires.
    pub fn arm(&self) -> (mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.0.lock().unwrap() = Some(GateInner {
            entered: entered_tx,
            release: release_rx,
        });
        (entered_rx, release_tx)
    }

    fn pass(&self) {
        let armed = self.0.lock().unwrap().take();
        if let Some(gate) = armed {
            let _ = gate.entered.send(());
            let _ = gate.release.recv();
        }
    }
}

pub struct FakeBackend {
    next: AtomicU32,
    pub opens: AtomicUsize,
    pub renders: AtomicUsize,
    pub closed: Mutex<Vec<u32>>,
    pub freed: Mutex<Vec<u32>>,
    /// Disposal calls in the order the backend saw them.
    pub events: Mutex<Vec<&'static str>>,
    /// Font handle passed to each render call.
    pub rendered_with: Mutex<Vec<u32>>,
    pub fail_open: AtomicBool,
    pub open_gate: Gate,
    pub render_gate: Gate,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next: AtomicU32::new(0),
            opens: AtomicUsize::new(0),
            renders: AtomicUsize::new(0),
            closed: Mutex::new(Vec::new()),
            freed: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            rendered_with: Mutex::new(Vec::new()),
            fail_open: AtomicBool::new(false),
            open_gate: Gate::new(),
            render_gate: Gate::new(),
        })
    }
}

impl FontBackend for FakeBackend {
    type Font = u32;
    type Surface = u32;

    fn open_font(&self, bytes: &[u8], size: u16, _index: Option<u32>) -> Result<u32> {
        self.open_gate.pass();
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(Error::Decode {
                name: format!("font@{size}pt"),
                reason: "unsupported table".into(),
            });
        }
        assert!(!bytes.is_empty(), "opened with empty byte buffer");
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(0x100 + self.next.fetch_add(1, Ordering::SeqCst))
    }

    fn render(&self, font: u32, text: &str, _color: Color) -> Result<u32> {
        self.render_gate.pass();
        self.rendered_with.lock().unwrap().push(font);
        if text.is_empty() {
            return Err(Error::Render {
                name: "text".into(),
                reason: "refusing empty string".into(),
            });
        }
        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(0x200 + self.next.fetch_add(1, Ordering::SeqCst))
    }

    fn family_name(&self, _font: u32) -> String {
        "Fake Sans".into()
    }

    fn style_name(&self, _font: u32) -> String {
        "Regular".into()
    }

    fn is_fixed_width(&self, _font: u32) -> bool {
        false
    }

    fn close_font(&self, font: u32) {
        self.events.lock().unwrap().push("close_font");
        self.closed.lock().unwrap().push(font);
    }

    fn free_surface(&self, surface: u32) {
        self.events.lock().unwrap().push("free_surface");
        self.freed.lock().unwrap().push(surface);
    }
}
