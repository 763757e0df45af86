//! Library error type.

use std::path::PathBuf;

/// Errors raised by the color table, the animators and the output devices.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to read color table {path}: {source}")]
    ColorTable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed color table: {0}")]
    ColorTableFormat(#[from] serde_json::Error),

    #[error("Grid {cols}x{rows} must have at least one pixel and at most {} pixels", u32::MAX)]
    InvalidGrid { cols: u32, rows: u32 },

    #[error("Color table has no entries")]
    EmptyColorTable,

    #[error("Unknown color name: '{0}'")]
    UnknownColor(String),

    #[error("Pixel index {index} out of range (display has {len} pixels)")]
    PixelOutOfRange { index: usize, len: usize },

    #[error("Area {xs:?} x {ys:?} contains no pixels")]
    EmptyArea {
        xs: std::ops::Range<u32>,
        ys: std::ops::Range<u32>,
    },

    #[error("Area {xs:?} x {ys:?} exceeds the {cols}x{rows} grid")]
    AreaOutOfBounds {
        xs: std::ops::Range<u32>,
        ys: std::ops::Range<u32>,
        cols: u32,
        rows: u32,
    },

    #[error("Rounds must be at least 1")]
    InvalidRounds,

    #[error("Pace must be in (0, 1], got {0}")]
    InvalidPace(f64),

    #[error("Interrupted")]
    Interrupted,

    #[error("Device error: {0}")]
    Device(String),

    #[error("Failed to write preview image: {0}")]
    Preview(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
