//! One-shot effects and the fixed demo sequences.
//!
//! The scrolling message and the rainbow write straight to a sink; the
//! showcase strings the two animators together. None of these watch for
//! Ctrl+C themselves: a [`crate::sink::Display`] with a stop flag fails the
//! next flush with [`crate::Error::Interrupted`] and `?` unwinds from there.

use crate::animate::{Animator, Area, Delay, Strategy};
use crate::sink::PixelSink;
use crate::{Color, Result, is_running};
use rand::Rng;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// Scroll `text` on whichever backends can render text, then pause.
///
/// Does nothing (no pause either) when no such backend is attached.
pub fn scroll_message<S: PixelSink + ?Sized>(
    sink: &mut S,
    text: &str,
    color: Color,
    pause: Duration,
    delay: &mut dyn Delay,
) -> Result<bool> {
    if !sink.has_text() {
        tracing::debug!("No text-capable display attached, skipping message");
        return Ok(false);
    }

    tracing::info!("Showing message: {}", text);
    let shown = sink.show_message(text, color)?;
    sink.check_running()?;
    delay.delay(pause);
    Ok(shown)
}

/// Move text leftwards one pixel per frame, starting at `start_x`, until it
/// has left the screen.
///
/// `draw` renders one frame with the text at `x` and returns the text width.
/// Returns `false` if `running` cleared before the text was gone.
pub fn scroll_across(
    start_x: i32,
    step: Duration,
    running: Option<&AtomicBool>,
    delay: &mut dyn Delay,
    mut draw: impl FnMut(i32) -> i32,
) -> bool {
    let mut x = start_x;
    loop {
        if running.is_some_and(|r| !is_running(r)) {
            tracing::debug!("Scroll interrupted at x={}", x);
            return false;
        }
        let width = draw(x);
        if x + width < 0 {
            return true;
        }
        x -= 1;
        delay.delay(step);
    }
}

/// Sweep the rainbow wheel along the strip, one pixel at a time.
pub fn rainbow_cycle<S: PixelSink + ?Sized>(
    sink: &mut S,
    wait: Duration,
    delay: &mut dyn Delay,
) -> Result<()> {
    let count = sink.len();
    for i in 0..count {
        let pos = ((i * 256 / count) & 255) as u8;
        sink.set(i, Color::wheel(pos))?;
        sink.flush()?;
        delay.delay(wait);
    }
    Ok(())
}

/// Solid red, green and blue, each held for `hold`, then a rainbow.
pub fn test_pattern<S: PixelSink + ?Sized>(
    sink: &mut S,
    hold: Duration,
    wait: Duration,
    delay: &mut dyn Delay,
) -> Result<()> {
    for (label, color) in [("RED", Color::RED), ("GREEN", Color::GREEN), ("BLUE", Color::BLUE)] {
        tracing::info!("Display all {}", label);
        sink.fill(color)?;
        sink.flush()?;
        delay.delay(hold);
    }

    tracing::info!("Display a RAINBOW");
    rainbow_cycle(sink, wait, delay)
}

// ── Showcase ─────────────────────────────────────────────────────────

/// Knobs for [`showcase`]. Defaults match the classic demo.
#[derive(Clone, Debug)]
pub struct ShowcaseOptions {
    pub area: Area,
    pub rounds: u32,
    /// Pace of the first random fill.
    pub first_pace: f64,
    /// Pace of the second, slower random fill.
    pub second_pace: f64,
    /// Color the sequence ends on.
    pub final_color: String,
    /// Optional text scrolled before the animation starts.
    pub message: Option<String>,
    pub message_color: Color,
    pub message_pause: Duration,
}

impl ShowcaseOptions {
    pub fn new(area: Area) -> Self {
        Self {
            area,
            rounds: 1,
            first_pace: 0.01,
            second_pace: 0.1,
            final_color: "black".to_string(),
            message: None,
            message_color: Color::new(255, 255, 255),
            message_pause: Duration::from_secs(1),
        }
    }
}

/// Random fill, settle on its last color, random fill again slower, then
/// fade to the final color without flicker.
pub fn showcase<S: PixelSink + ?Sized, R: Rng>(
    animator: &mut Animator<'_, S, R>,
    options: &ShowcaseOptions,
) -> Result<()> {
    // Fail on a bad final color before anything lights up.
    animator.table().lookup(&options.final_color)?;

    if let Some(text) = &options.message {
        animator.scroll_message(text, options.message_color, options.message_pause)?;
    }

    let last = animator.random_fill(&options.area, options.first_pace, options.rounds)?;
    animator.converge(&last, &options.area, Strategy::Sampling)?;

    animator.random_fill(&options.area, options.second_pace, options.rounds)?;
    animator.converge(
        &options.final_color,
        &options.area,
        Strategy::Shuffled { flicker: false },
    )?;

    Ok(())
}
