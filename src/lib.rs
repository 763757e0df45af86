//! Animations for a NeoPixel LED matrix driven from a Raspberry Pi.
//!
//! This module holds the pieces every other module leans on:
//! - Grid geometry and the one place pixels get flattened to an index
//! - Our own `Color` type plus the rainbow wheel
//! - Signal handling for clean shutdown
//!
//! The animators live in [`animate`], the output devices behind
//! [`sink::PixelSink`], and the one-shot effects in [`demo`].

pub mod animate;
#[cfg(feature = "hardware")]
pub mod companion;
pub mod demo;
pub mod error;
pub mod palette;
pub mod preview;
pub mod sink;
pub mod strip;

pub use error::{Error, Result};

use animate::Area;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ── Grid configuration ─────────────────────────────────────────────

/// Dimensions of the LED matrix.
///
/// # Rust concept: derive macros
/// `Clone, Copy` make this cheaply copyable (it's just two u32s).
/// `Debug` gives us `{:?}` formatting. `PartialEq, Eq` let us compare.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridConfig {
    pub cols: u32,
    pub rows: u32,
}

impl GridConfig {
    pub fn new(cols: u32, rows: u32) -> Self {
        Self { cols, rows }
    }

    /// Like [`GridConfig::new`], but rejects grids with no pixels or with
    /// more pixels than a `u32` index can address.
    pub fn try_new(cols: u32, rows: u32) -> Result<Self> {
        match cols.checked_mul(rows) {
            Some(count) if count > 0 => Ok(Self { cols, rows }),
            _ => Err(Error::InvalidGrid { cols, rows }),
        }
    }

    /// Total number of pixels on the matrix.
    pub fn pixel_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Flatten a coordinate: `index = x * rows + y`.
    ///
    /// Every module goes through this (and [`GridConfig::coords`]) so the
    /// flattening stays consistent between the strip and the companion panel.
    pub fn index(&self, x: u32, y: u32) -> usize {
        x as usize * self.rows as usize + y as usize
    }

    /// Inverse of [`GridConfig::index`].
    pub fn coords(&self, index: usize) -> (u32, u32) {
        let rows = self.rows as usize;
        ((index / rows) as u32, (index % rows) as u32)
    }

    /// The area covering every pixel of the grid.
    pub fn full_area(&self) -> Area {
        Area::new(0..self.cols, 0..self.rows)
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { cols: 32, rows: 8 }
    }
}

// ── Color ──────────────────────────────────────────────────────────

/// Our own color type, decoupled from the hardware crates.
///
/// This lets us test color logic on any machine. At the hardware boundary
/// we convert via `Into<LedColor>` or `Into<RGB8>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Map a wheel position (0-255) onto the rainbow.
    ///
    /// Three linear segments: red → green on `0..85`, green → blue on
    /// `85..170`, blue → back to red on `170..=255`. Each step moves a
    /// channel by at most 3.
    ///
    /// # Rust concept: match with ranges
    /// The three arms cover all of `u8`, so the compiler needs no fallback.
    pub fn wheel(pos: u8) -> Self {
        match pos {
            0..=84 => Self::new(255 - pos * 3, pos * 3, 0),
            85..=169 => {
                let pos = pos - 85;
                Self::new(0, 255 - pos * 3, pos * 3)
            }
            170..=255 => {
                let pos = pos - 170;
                Self::new(pos * 3, 0, 255 - pos * 3)
            }
        }
    }

    /// Apply brightness scaling (0-100) to this color.
    pub fn apply_brightness(self, brightness: u8) -> Self {
        if brightness >= 100 {
            return self;
        }
        Self {
            r: ((self.r as u16 * brightness as u16) / 100) as u8,
            g: ((self.g as u16 * brightness as u16) / 100) as u8,
            b: ((self.b as u16 * brightness as u16) / 100) as u8,
        }
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

/// Convert our Color to the panel crate's LedColor at the boundary.
#[cfg(feature = "hardware")]
impl From<Color> for rpi_led_matrix::LedColor {
    fn from(c: Color) -> Self {
        rpi_led_matrix::LedColor {
            red: c.r,
            green: c.g,
            blue: c.b,
        }
    }
}

#[cfg(feature = "neopixel")]
impl From<Color> for smart_leds::RGB8 {
    fn from(c: Color) -> Self {
        smart_leds::RGB8::new(c.r, c.g, c.b)
    }
}

// ── Signal handling ────────────────────────────────────────────────

/// Set up a Ctrl+C handler that sets `running` to false.
///
/// # Rust concept: Arc and AtomicBool
/// We need to share the `running` flag between the demo sequence and the
/// signal handler. `Arc` lets multiple owners share data. `AtomicBool` is a
/// thread-safe boolean, no mutex needed for a single bool.
pub fn setup_signal_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone(); // Clone the Arc, not the bool

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");

    running
}

/// Check if the current sequence should keep going.
pub fn is_running(running: &AtomicBool) -> bool {
    running.load(Ordering::SeqCst)
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    // ── GridConfig tests ───────────────────────────────────────────

    #[test]
    fn grid_config_default_is_32x8() {
        let grid = GridConfig::default();
        assert_eq!(grid.cols, 32);
        assert_eq!(grid.rows, 8);
        assert_eq!(grid.pixel_count(), 256);
    }

    #[rstest]
    #[case(0, 0, 0)]
    #[case(0, 7, 7)]
    #[case(1, 0, 8)]
    #[case(3, 5, 29)]
    #[case(31, 7, 255)]
    fn test_index_flattening(#[case] x: u32, #[case] y: u32, #[case] expected: usize) {
        assert_eq!(GridConfig::default().index(x, y), expected);
    }

    #[test]
    fn coords_inverts_index() {
        let grid = GridConfig::new(4, 2);
        for index in 0..grid.pixel_count() {
            let (x, y) = grid.coords(index);
            assert_eq!(grid.index(x, y), index);
        }
    }

    #[test]
    fn try_new_accepts_regular_grids() {
        assert_eq!(GridConfig::try_new(32, 8).unwrap(), GridConfig::default());
        assert_eq!(GridConfig::try_new(65_536, 65_535).unwrap().pixel_count(), 4_294_901_760);
    }

    #[rstest]
    #[case::no_cols(0, 8)]
    #[case::no_rows(32, 0)]
    #[case::overflowing(70_000, 70_000)]
    #[case::just_past_u32(65_536, 65_536)]
    fn try_new_rejects_bad_grids(#[case] cols: u32, #[case] rows: u32) {
        let err = GridConfig::try_new(cols, rows).unwrap_err();
        assert!(matches!(err, Error::InvalidGrid { .. }));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn large_grid_arithmetic_does_not_wrap() {
        let grid = GridConfig::new(70_000, 70_000);
        assert_eq!(grid.pixel_count(), 4_900_000_000);
        assert_eq!(grid.index(69_999, 69_999), 4_899_999_999);
        assert_eq!(grid.coords(4_899_999_999), (69_999, 69_999));
    }

    #[test]
    fn full_area_covers_grid() {
        let grid = GridConfig::new(4, 2);
        assert_eq!(grid.full_area().len(), 8);
    }

    // ── Color tests ────────────────────────────────────────────────

    #[rstest]
    #[case(0, 255, 0, 0)] // Red
    #[case(85, 0, 255, 0)] // Green
    #[case(170, 0, 0, 255)] // Blue
    #[case(42, 129, 126, 0)] // Red → Green
    #[case(255, 255, 0, 0)] // Back to red
    fn test_wheel_landmarks(#[case] pos: u8, #[case] r: u8, #[case] g: u8, #[case] b: u8) {
        assert_eq!(Color::wheel(pos), Color::new(r, g, b));
    }

    #[test]
    fn wheel_is_continuous() {
        for pos in 0..255u8 {
            let a = Color::wheel(pos);
            let b = Color::wheel(pos + 1);
            for (ca, cb) in [(a.r, b.r), (a.g, b.g), (a.b, b.b)] {
                assert!(
                    ca.abs_diff(cb) <= 3,
                    "jump between {pos} ({a:?}) and {} ({b:?})",
                    pos + 1
                );
            }
        }
    }

    #[test]
    fn wheel_wraps_back_near_red() {
        let end = Color::wheel(255);
        let start = Color::wheel(0);
        assert!(end.r.abs_diff(start.r) <= 3);
        assert!(end.g.abs_diff(start.g) <= 3);
        assert!(end.b.abs_diff(start.b) <= 3);
    }

    #[test]
    fn apply_brightness_100_is_identity() {
        let c = Color::new(100, 200, 50);
        assert_eq!(c.apply_brightness(100), c);
    }

    #[test]
    fn apply_brightness_0_is_black() {
        assert_eq!(Color::new(255, 255, 255).apply_brightness(0), Color::BLACK);
    }

    #[test]
    fn apply_brightness_2_dims_white() {
        assert_eq!(
            Color::new(255, 255, 255).apply_brightness(2),
            Color::new(5, 5, 5)
        );
    }

    #[test]
    fn color_from_array() {
        assert_eq!(Color::from([1, 2, 3]), Color::new(1, 2, 3));
    }
}
