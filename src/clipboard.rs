//! Clipboard seam for the markdown export control
//!
//! Clipboard access can be denied (headless session, platform policy); the
//! failure is recoverable and must never take the page context down.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};

pub trait ClipboardSink {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// The real system clipboard.
pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        arboard::Clipboard::new()
            .context("Failed to open system clipboard")?
            .set_text(text.to_string())
            .context("Failed to write to system clipboard")
    }
}

/// In-memory sink for tests and `--no-clipboard` demo runs. The shared log
/// handle stays inspectable after the sink moves into the host.
#[derive(Default)]
pub struct MemoryClipboard {
    log: Rc<RefCell<Vec<String>>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_handle(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.log)
    }
}

impl ClipboardSink for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        self.log.borrow_mut().push(text.to_string());
        Ok(())
    }
}
