//! Random fill and color convergence animations.
//!
//! Both animations walk the pixels of an [`Area`] in random order and write
//! through a [`PixelSink`], flushing after every step so each change is
//! visible on its own.
//!
//! ## Rust concepts
//! - Generic structs over traits (`S: PixelSink`, `R: Rng`)
//! - Trait objects for swappable timing (`&mut dyn Delay`)
//! - `Vec::pop` on a shuffled list as a draw-without-replacement bag

use crate::demo;
use crate::palette::ColorTable;
use crate::sink::PixelSink;
use crate::{Color, Error, GridConfig, Result};
use rand::Rng;
use rand::seq::SliceRandom;
use std::ops::Range;
use std::thread;
use std::time::Duration;

/// Shortest pause the random fill ever takes between writes.
pub const MIN_DELAY: Duration = Duration::from_micros(100);

// ── Area ─────────────────────────────────────────────────────────────

/// A rectangle of pixels, as half-open column and row ranges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Area {
    xs: Range<u32>,
    ys: Range<u32>,
}

impl Area {
    pub fn new(xs: Range<u32>, ys: Range<u32>) -> Self {
        Self { xs, ys }
    }

    pub fn xs(&self) -> Range<u32> {
        self.xs.clone()
    }

    pub fn ys(&self) -> Range<u32> {
        self.ys.clone()
    }

    fn width(&self) -> usize {
        self.xs.end.saturating_sub(self.xs.start) as usize
    }

    fn height(&self) -> usize {
        self.ys.end.saturating_sub(self.ys.start) as usize
    }

    /// Number of pixels in the area.
    pub fn len(&self) -> usize {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check the area is non-empty and fits inside the grid.
    pub fn validate(&self, grid: &GridConfig) -> Result<()> {
        if self.is_empty() {
            return Err(Error::EmptyArea {
                xs: self.xs(),
                ys: self.ys(),
            });
        }
        if self.xs.end > grid.cols || self.ys.end > grid.rows {
            return Err(Error::AreaOutOfBounds {
                xs: self.xs(),
                ys: self.ys(),
                cols: grid.cols,
                rows: grid.rows,
            });
        }
        Ok(())
    }

    /// Flattened grid indices of every pixel in the area.
    pub fn indices(&self, grid: &GridConfig) -> Vec<usize> {
        self.xs()
            .flat_map(|x| self.ys().map(move |y| grid.index(x, y)))
            .collect()
    }
}

// ── Timing ───────────────────────────────────────────────────────────

/// Something that can pause between frames.
pub trait Delay {
    fn delay(&mut self, duration: Duration);
}

/// Real wall-clock sleeps.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Skips every pause. Animations finish as fast as the sinks allow.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDelay;

impl Delay for NoDelay {
    fn delay(&mut self, _duration: Duration) {}
}

/// Pauses used by [`Animator::converge`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvergeTiming {
    /// Shuffled mode sleeps this long per pixel still unconverged.
    pub step_delay: Duration,
    /// Sampling mode sleeps this long after every sample, hit or miss.
    pub sample_delay: Duration,
}

impl Default for ConvergeTiming {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(5),
            sample_delay: Duration::from_millis(100),
        }
    }
}

/// Pause after a random fill write: proportional to the work left.
///
/// `remaining / rounds * pace / 100` seconds, never below [`MIN_DELAY`].
/// Inputs that give no meaningful duration (zero rounds, NaN or negative
/// pace) fall back to [`MIN_DELAY`]; an overflowing one saturates.
pub fn fill_delay(remaining: u64, rounds: u32, pace: f64) -> Duration {
    let secs = remaining as f64 / rounds as f64 * pace / 100.0;
    match Duration::try_from_secs_f64(secs) {
        Ok(delay) => delay.max(MIN_DELAY),
        Err(_) if secs > 0.0 => Duration::MAX,
        Err(_) => MIN_DELAY,
    }
}

/// How [`Animator::converge`] picks the next pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Visit every pixel once in shuffled order. With `flicker`, pixels not
    /// yet converged get a fresh random color on every step.
    Shuffled { flicker: bool },
    /// Sample coordinates with replacement until every pixel has been hit.
    Sampling,
}

// ── Animator ─────────────────────────────────────────────────────────

/// Runs animations against one sink with one source of randomness.
pub struct Animator<'a, S: PixelSink + ?Sized, R: Rng> {
    sink: &'a mut S,
    table: &'a ColorTable,
    grid: GridConfig,
    rng: R,
    delay: &'a mut dyn Delay,
    timing: ConvergeTiming,
}

impl<'a, S: PixelSink + ?Sized, R: Rng> Animator<'a, S, R> {
    pub fn new(
        sink: &'a mut S,
        table: &'a ColorTable,
        grid: GridConfig,
        rng: R,
        delay: &'a mut dyn Delay,
    ) -> Self {
        Self {
            sink,
            table,
            grid,
            rng,
            delay,
            timing: ConvergeTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: ConvergeTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn table(&self) -> &ColorTable {
        self.table
    }

    /// Scroll a message on this animator's sink. See [`demo::scroll_message`].
    pub fn scroll_message(&mut self, text: &str, color: Color, pause: Duration) -> Result<bool> {
        demo::scroll_message(&mut *self.sink, text, color, pause, &mut *self.delay)
    }

    /// Paint the area with random colors, `rounds` full passes.
    ///
    /// Each pass visits every pixel exactly once in a fresh shuffled order,
    /// so the animation makes `area.len() * rounds` writes. `pace` in
    /// `(0, 1]` scales the pause between writes.
    ///
    /// Returns the name of the last color written.
    pub fn random_fill(&mut self, area: &Area, pace: f64, rounds: u32) -> Result<String> {
        area.validate(&self.grid)?;
        if rounds == 0 {
            return Err(Error::InvalidRounds);
        }
        if !(pace > 0.0 && pace <= 1.0) {
            return Err(Error::InvalidPace(pace));
        }

        let pixels = area.indices(&self.grid);
        let mut budget = vec![rounds; pixels.len()];
        let mut remaining = pixels.len() as u64 * rounds as u64;
        let mut last = String::new();

        tracing::info!(
            "Random fill: {} pixels, {} rounds, pace {}",
            pixels.len(),
            rounds,
            pace
        );

        for round in 1..=rounds {
            let mut bag: Vec<usize> = (0..pixels.len()).collect();
            bag.shuffle(&mut self.rng);

            while let Some(slot) = bag.pop() {
                self.sink.check_running()?;
                let (name, color) = self.table.choose(&mut self.rng);
                self.sink.set(pixels[slot], color)?;
                self.sink.flush()?;

                budget[slot] -= 1;
                remaining -= 1;
                last.clear();
                last.push_str(name);

                self.delay.delay(fill_delay(remaining, rounds, pace));
            }

            tracing::debug!("Random fill round {}/{} done", round, rounds);
        }

        debug_assert!(budget.iter().all(|&b| b == 0));
        tracing::info!("Random fill finished on '{}'", last);
        Ok(last)
    }

    /// Drive every pixel in the area to the named color.
    ///
    /// An unknown name fails before anything is written.
    pub fn converge(&mut self, color_name: &str, area: &Area, strategy: Strategy) -> Result<bool> {
        let target = self.table.lookup(color_name)?;
        area.validate(&self.grid)?;

        tracing::info!(
            "Converging {} pixels to '{}' ({:?})",
            area.len(),
            color_name,
            strategy
        );

        match strategy {
            Strategy::Shuffled { flicker } => self.converge_shuffled(target, area, flicker)?,
            Strategy::Sampling => self.converge_sampling(target, area)?,
        }

        Ok(true)
    }

    fn converge_shuffled(&mut self, target: Color, area: &Area, flicker: bool) -> Result<()> {
        let mut pending = area.indices(&self.grid);
        pending.shuffle(&mut self.rng);

        while let Some(index) = pending.pop() {
            self.sink.check_running()?;
            self.sink.set(index, target)?;
            if flicker {
                for &other in &pending {
                    let (_, color) = self.table.choose(&mut self.rng);
                    self.sink.set(other, color)?;
                }
            }
            self.sink.flush()?;

            let pause = self.timing.step_delay * pending.len() as u32;
            self.delay.delay(pause);
        }

        Ok(())
    }

    fn converge_sampling(&mut self, target: Color, area: &Area) -> Result<()> {
        let height = area.height();
        let mut done = vec![false; area.len()];
        let mut left = done.len();
        let mut samples: u64 = 0;

        while left > 0 {
            // Misses never flush; check the stop flag on every sample.
            self.sink.check_running()?;
            let x = self.rng.gen_range(area.xs());
            let y = self.rng.gen_range(area.ys());
            samples += 1;

            let slot = (x - area.xs.start) as usize * height + (y - area.ys.start) as usize;
            if !done[slot] {
                self.sink.set(self.grid.index(x, y), target)?;
                self.sink.flush()?;
                done[slot] = true;
                left -= 1;
            }

            self.delay.delay(self.timing.sample_delay);
        }

        tracing::debug!("Sampling converge took {} samples for {} pixels", samples, done.len());
        Ok(())
    }
}
