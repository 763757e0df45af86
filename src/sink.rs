//! Pixel sinks: where the animators' writes end up.
//!
//! Every output device implements [`PixelSink`]. Writes are buffered: `set`
//! and `fill` only stage colors, and nothing is visible until `flush`.
//! [`Display`] is itself a sink that fans each call out to every attached
//! backend, so the animators never know how many devices are present
//! (zero is fine).
//!
//! ## Rust concepts
//! - Trait objects (`Box<dyn PixelSink>`) for a heterogeneous device list
//! - Default trait methods for optional capabilities
//! - `enum` write log for inspecting what an animation did

use crate::{Color, Error, Result, is_running};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

// ── Trait ────────────────────────────────────────────────────────────

/// An output device addressed by flattened pixel index.
pub trait PixelSink {
    /// Short device name for logs.
    fn name(&self) -> &str;

    /// Number of addressable pixels.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stage one pixel. An index `>= len()` is an error and stages nothing.
    fn set(&mut self, index: usize, color: Color) -> Result<()>;

    /// Stage the same color on every pixel.
    fn fill(&mut self, color: Color) -> Result<()>;

    /// Push staged pixels to the hardware.
    fn flush(&mut self) -> Result<()>;

    /// Fail with [`Error::Interrupted`] if the sink has been told to stop.
    ///
    /// Animation loops call this on every step, including steps that do
    /// not flush.
    fn check_running(&self) -> Result<()> {
        Ok(())
    }

    /// Whether [`PixelSink::show_message`] does anything on this device.
    fn has_text(&self) -> bool {
        false
    }

    /// Scroll a text message across the device, blocking until done.
    ///
    /// Returns `Ok(false)` on devices without a text primitive.
    fn show_message(&mut self, _text: &str, _color: Color) -> Result<bool> {
        Ok(false)
    }
}

/// Fail with [`Error::PixelOutOfRange`] unless `index < len`.
pub fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(Error::PixelOutOfRange { index, len })
    }
}

// ── Fan-out display ──────────────────────────────────────────────────

/// All active output devices behind one sink.
///
/// With a stop flag set (see [`crate::setup_signal_handler`]), `flush` fails
/// with [`Error::Interrupted`] once the flag clears, which ends whatever
/// animation is running at its next frame.
pub struct Display {
    len: usize,
    backends: Vec<Box<dyn PixelSink>>,
    running: Option<Arc<AtomicBool>>,
}

impl Display {
    /// A display of `len` pixels with no backends attached yet.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            backends: Vec::new(),
            running: None,
        }
    }

    pub fn with_stop_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    /// Attach a backend. Writes go to backends in the order they were added.
    ///
    /// A backend shorter than the display only receives the indices it has.
    pub fn attach(&mut self, backend: Box<dyn PixelSink>) {
        if backend.len() < self.len {
            tracing::warn!(
                "{} has {} pixels, display has {}; extra pixels will not be mirrored",
                backend.name(),
                backend.len(),
                self.len
            );
        }
        tracing::info!("Attached output: {}", backend.name());
        self.backends.push(backend);
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// The stop flag, if any. Backends that loop on their own (text
    /// scrolling) watch it too.
    pub fn stop_flag(&self) -> Option<Arc<AtomicBool>> {
        self.running.clone()
    }

    /// Turn every pixel off and show it, even after an interrupt.
    ///
    /// Every backend is blanked even if an earlier one fails; the first
    /// error is returned.
    pub fn blank(&mut self) -> Result<()> {
        let mut result = Ok(());
        for backend in &mut self.backends {
            let blanked = backend.fill(Color::BLACK).and_then(|()| backend.flush());
            if let Err(e) = blanked {
                tracing::warn!("Failed to blank {}: {}", backend.name(), e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}

impl PixelSink for Display {
    fn name(&self) -> &str {
        "display"
    }

    fn len(&self) -> usize {
        self.len
    }

    fn set(&mut self, index: usize, color: Color) -> Result<()> {
        check_index(index, self.len)?;
        for backend in &mut self.backends {
            if index < backend.len() {
                backend.set(index, color)?;
            }
        }
        Ok(())
    }

    fn fill(&mut self, color: Color) -> Result<()> {
        for backend in &mut self.backends {
            backend.fill(color)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.check_running()?;
        for backend in &mut self.backends {
            backend.flush()?;
        }
        Ok(())
    }

    fn check_running(&self) -> Result<()> {
        match &self.running {
            Some(running) if !is_running(running) => Err(Error::Interrupted),
            _ => Ok(()),
        }
    }

    fn has_text(&self) -> bool {
        self.backends.iter().any(|b| b.has_text())
    }

    fn show_message(&mut self, text: &str, color: Color) -> Result<bool> {
        let mut shown = false;
        for backend in &mut self.backends {
            shown |= backend.show_message(text, color)?;
        }
        Ok(shown)
    }
}

// ── In-memory sink ───────────────────────────────────────────────────

/// One call recorded by [`MemorySink`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Write {
    Pixel { index: usize, color: Color },
    Fill(Color),
    Flush,
}

/// A frame buffer in memory that remembers every call made on it.
///
/// Used for headless runs and to check what an animation actually did.
#[derive(Clone, Debug)]
pub struct MemorySink {
    staged: Vec<Color>,
    shown: Vec<Color>,
    log: Vec<Write>,
    messages: Option<Vec<String>>,
}

impl MemorySink {
    pub fn new(len: usize) -> Self {
        Self {
            staged: vec![Color::BLACK; len],
            shown: vec![Color::BLACK; len],
            log: Vec::new(),
            messages: None,
        }
    }

    /// Same as [`MemorySink::new`], but also accepts text messages.
    pub fn with_text(len: usize) -> Self {
        Self {
            messages: Some(Vec::new()),
            ..Self::new(len)
        }
    }

    /// Colors as of the last flush.
    pub fn shown(&self) -> &[Color] {
        &self.shown
    }

    /// Colors staged since the last flush (including already flushed ones).
    pub fn staged(&self) -> &[Color] {
        &self.staged
    }

    pub fn log(&self) -> &[Write] {
        &self.log
    }

    /// Every single-pixel write, in order.
    pub fn pixel_writes(&self) -> Vec<(usize, Color)> {
        self.log
            .iter()
            .filter_map(|w| match *w {
                Write::Pixel { index, color } => Some((index, color)),
                _ => None,
            })
            .collect()
    }

    pub fn flush_count(&self) -> usize {
        self.log.iter().filter(|w| matches!(w, Write::Flush)).count()
    }

    /// Messages received so far (empty for a sink without text).
    pub fn messages(&self) -> &[String] {
        self.messages.as_deref().unwrap_or_default()
    }
}

impl PixelSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn len(&self) -> usize {
        self.staged.len()
    }

    fn set(&mut self, index: usize, color: Color) -> Result<()> {
        check_index(index, self.staged.len())?;
        self.staged[index] = color;
        self.log.push(Write::Pixel { index, color });
        Ok(())
    }

    fn fill(&mut self, color: Color) -> Result<()> {
        self.staged.fill(color);
        self.log.push(Write::Fill(color));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.shown.copy_from_slice(&self.staged);
        self.log.push(Write::Flush);
        Ok(())
    }

    fn has_text(&self) -> bool {
        self.messages.is_some()
    }

    fn show_message(&mut self, text: &str, _color: Color) -> Result<bool> {
        match &mut self.messages {
            Some(messages) => {
                messages.push(text.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
