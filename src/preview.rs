//! PNG preview: a sink that renders each flushed frame to an image file.
//!
//! Handy on a development machine with no LEDs attached. Open the file in
//! an image viewer that reloads on change and watch the animation.
//!
//! ## Rust concepts
//! - `image::RgbImage::from_fn` for building a buffer from a closure
//! - `From` conversions letting `?` turn `ImageError` into our `Error`

use crate::sink::{PixelSink, check_index};
use crate::{Color, GridConfig, Result};
use image::{ImageFormat, Rgb, RgbImage};
use std::path::PathBuf;

/// Each LED is drawn as a `scale` × `scale` block.
pub const DEFAULT_SCALE: u32 = 16;

pub struct PngPreview {
    grid: GridConfig,
    path: PathBuf,
    scale: u32,
    staged: Vec<Color>,
}

impl PngPreview {
    pub fn new(grid: GridConfig, path: PathBuf, scale: u32) -> Self {
        Self {
            grid,
            path,
            scale: scale.max(1),
            staged: vec![Color::BLACK; grid.pixel_count()],
        }
    }

    /// Render the staged frame, columns left to right, one block per LED.
    pub fn render(&self) -> RgbImage {
        let scale = self.scale;
        RgbImage::from_fn(self.grid.cols * scale, self.grid.rows * scale, |px, py| {
            let c = self.staged[self.grid.index(px / scale, py / scale)];
            Rgb([c.r, c.g, c.b])
        })
    }
}

impl PixelSink for PngPreview {
    fn name(&self) -> &str {
        "png-preview"
    }

    fn len(&self) -> usize {
        self.staged.len()
    }

    fn set(&mut self, index: usize, color: Color) -> Result<()> {
        check_index(index, self.staged.len())?;
        self.staged[index] = color;
        Ok(())
    }

    fn fill(&mut self, color: Color) -> Result<()> {
        self.staged.fill(color);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.render()
            .save_with_format(&self.path, ImageFormat::Png)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn render_scales_each_led_to_a_block() {
        let grid = GridConfig::new(4, 2);
        let mut preview = PngPreview::new(grid, PathBuf::from("unused.png"), 3);
        preview.set(grid.index(2, 1), Color::RED).unwrap();

        let img = preview.render();
        assert_eq!(img.dimensions(), (12, 6));
        assert_eq!(img.get_pixel(6, 3), &Rgb([255, 0, 0]));
        assert_eq!(img.get_pixel(8, 5), &Rgb([255, 0, 0]));
        assert_eq!(img.get_pixel(5, 3), &Rgb([0, 0, 0]));
    }

    #[test]
    fn flush_writes_png() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("frame.png");
        let grid = GridConfig::new(4, 2);
        let mut preview = PngPreview::new(grid, path.clone(), 2);

        preview.fill(Color::BLUE).unwrap();
        preview.flush().unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (8, 4));
        assert!(img.pixels().all(|p| *p == Rgb([0, 0, 255])));
    }

    #[test]
    fn set_out_of_range_fails() {
        let mut preview = PngPreview::new(GridConfig::new(4, 2), PathBuf::from("x.png"), 1);
        assert!(preview.set(8, Color::RED).is_err());
    }

    #[test]
    fn zero_scale_is_clamped() {
        let preview = PngPreview::new(GridConfig::new(4, 2), PathBuf::from("x.png"), 0);
        assert_eq!(preview.render().dimensions(), (4, 2));
    }
}
