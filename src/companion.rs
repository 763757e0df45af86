//! Companion panel: an RGB LED matrix (HUB75) mirroring the strip.
//!
//! The panel is optional. We try to open it at startup and carry on without
//! it if that fails. It is also the only device that can scroll text.
//!
//! ## Rust concepts
//! - `Option::take()` to move a value out of a `&mut self` field
//! - `Box<dyn std::error::Error>` to unify error types from the C bindings

use crate::animate::ThreadDelay;
use crate::demo::scroll_across;
use crate::sink::{PixelSink, check_index};
use crate::{Color, GridConfig, Result};
use rpi_led_matrix::{
    LedCanvas, LedColor, LedFont, LedMatrix, LedMatrixOptions, LedRuntimeOptions,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// Settings for the companion panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompanionConfig {
    pub rows: u32,
    pub cols: u32,
    /// BDF font used for messages
    pub font: PathBuf,
    /// Scroll speed in pixels per second
    pub scroll_speed: u32,
    /// Brightness 0-100
    pub brightness: u8,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            rows: 16,
            cols: 32,
            font: PathBuf::from("fonts/bdf/5x7.bdf"),
            scroll_speed: 30,
            brightness: 50,
        }
    }
}

/// Create a matrix configured for our hardware:
/// Pi + Adafruit Bonnet + configurable panel size.
///
/// # Rust concept: Result and the ? operator
/// The C library reports errors as `&'static str`; `?` boxes them into
/// `Box<dyn Error>` for us.
pub fn create_matrix(
    config: &CompanionConfig,
) -> std::result::Result<LedMatrix, Box<dyn std::error::Error>> {
    let mut options = LedMatrixOptions::new();
    options.set_rows(config.rows);
    options.set_cols(config.cols);
    options.set_hardware_mapping("adafruit-hat");
    options.set_pwm_bits(8)?;
    options.set_pwm_lsb_nanoseconds(130);

    let mut rt_options = LedRuntimeOptions::new();
    rt_options.set_gpio_slowdown(2);

    let matrix = LedMatrix::new(Some(options), Some(rt_options))?;
    Ok(matrix)
}

pub struct CompanionPanel {
    grid: GridConfig,
    config: CompanionConfig,
    matrix: LedMatrix,
    canvas: Option<LedCanvas>,
    /// Our copy of the frame. The matrix double-buffers, so the offscreen
    /// canvas never holds the last frame and we redraw in full on flush.
    frame: Vec<Color>,
    font: Option<LedFont>,
    running: Option<Arc<AtomicBool>>,
}

impl CompanionPanel {
    /// Try to open the panel. A missing panel is not an error: log it and
    /// return `None`.
    pub fn detect(grid: GridConfig, config: &CompanionConfig) -> Option<Self> {
        let matrix = match create_matrix(config) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("No companion panel detected: {}", e);
                return None;
            }
        };

        let font = match LedFont::new(&config.font) {
            Ok(f) => Some(f),
            Err(e) => {
                tracing::warn!(
                    "Failed to load font {}: {}; messages disabled",
                    config.font.display(),
                    e
                );
                None
            }
        };

        tracing::info!("Companion panel detected: {}x{}", config.cols, config.rows);
        let canvas = matrix.offscreen_canvas();

        Some(Self {
            grid,
            config: config.clone(),
            matrix,
            canvas: Some(canvas),
            frame: vec![Color::BLACK; grid.pixel_count()],
            font,
            running: None,
        })
    }

    /// Stop scrolling a message as soon as `running` clears.
    pub fn with_stop_flag(mut self, running: Option<Arc<AtomicBool>>) -> Self {
        self.running = running;
        self
    }

    fn swap(&mut self, canvas: LedCanvas) {
        self.canvas = Some(self.matrix.swap(canvas));
    }

    fn draw_frame(&self, canvas: &mut LedCanvas) {
        canvas.clear();
        for (index, color) in self.frame.iter().enumerate() {
            let (x, y) = self.grid.coords(index);
            if x < self.config.cols && y < self.config.rows {
                let c = color.apply_brightness(self.config.brightness);
                canvas.set(x as i32, y as i32, &c.into());
            }
        }
    }
}

impl PixelSink for CompanionPanel {
    fn name(&self) -> &str {
        "companion-panel"
    }

    fn len(&self) -> usize {
        self.frame.len()
    }

    fn set(&mut self, index: usize, color: Color) -> Result<()> {
        check_index(index, self.frame.len())?;
        self.frame[index] = color;
        Ok(())
    }

    fn fill(&mut self, color: Color) -> Result<()> {
        self.frame.fill(color);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(mut canvas) = self.canvas.take() {
            self.draw_frame(&mut canvas);
            self.swap(canvas);
        }
        Ok(())
    }

    fn has_text(&self) -> bool {
        self.font.is_some()
    }

    /// Scroll the text once from the right edge until it leaves on the left,
    /// then put the current frame back.
    fn show_message(&mut self, text: &str, color: Color) -> Result<bool> {
        let Some(canvas) = self.canvas.take() else {
            return Ok(false);
        };
        let Some(font) = &self.font else {
            self.canvas = Some(canvas);
            return Ok(false);
        };

        let text_color: LedColor = color.apply_brightness(self.config.brightness).into();
        let baseline = self.config.rows as i32 - 1;
        let step = Duration::from_millis(1000 / self.config.scroll_speed.max(1) as u64);

        let matrix = &self.matrix;
        let mut slot = Some(canvas);
        let finished = scroll_across(
            self.config.cols as i32,
            step,
            self.running.as_deref(),
            &mut ThreadDelay,
            |x| match slot.take() {
                Some(mut canvas) => {
                    canvas.clear();
                    let width = canvas.draw_text(font, text, x, baseline, &text_color, 0, false);
                    slot = Some(matrix.swap(canvas));
                    width
                }
                None => 0,
            },
        );
        if !finished {
            tracing::info!("Message interrupted");
        }

        let Some(mut canvas) = slot else {
            return Ok(true);
        };
        self.draw_frame(&mut canvas);
        self.swap(canvas);
        Ok(true)
    }
}
