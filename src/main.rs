//! NeoPixel matrix demo runner
//!
//! Opens whatever outputs are available (NeoPixel strip, companion panel,
//! PNG preview), loads the color table, and runs one demo. With no
//! subcommand it runs the showcase: random fill, settle on the last color,
//! random fill again, fade to black.
//!
//! ## Usage
//! ```sh
//! sudo ./target/release/neomatrix
//! ./target/release/neomatrix --preview frame.png converge red --fast
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use neomatrix::animate::{Animator, Area, Delay, NoDelay, Strategy, ThreadDelay};
use neomatrix::demo::{self, ShowcaseOptions};
use neomatrix::palette::{ColorTable, DEFAULT_COLOR_TABLE};
use neomatrix::preview::{DEFAULT_SCALE, PngPreview};
use neomatrix::sink::{Display, PixelSink};
use neomatrix::strip::{ColorOrder, StripConfig};
use neomatrix::{Color, Error, GridConfig, setup_signal_handler};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

/// Random-fill and color-convergence animations for a NeoPixel LED matrix
#[derive(Parser)]
#[command(name = "neomatrix")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// JSON file mapping color names to {"rgb": [r, g, b]}
    #[arg(long, global = true, default_value = DEFAULT_COLOR_TABLE)]
    colors: PathBuf,

    /// Number of columns on the matrix
    #[arg(long, global = true, default_value = "32")]
    cols: u32,

    /// Number of rows on the matrix
    #[arg(long, global = true, default_value = "8")]
    rows: u32,

    /// Seed for the random number generator (random if omitted)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Skip all pacing delays
    #[arg(long, global = true)]
    no_delay: bool,

    /// Also render every frame to this PNG file
    #[arg(long, global = true)]
    preview: Option<PathBuf>,

    /// Size in image pixels of one LED in the preview
    #[arg(long, global = true, default_value_t = DEFAULT_SCALE)]
    preview_scale: u32,

    #[command(flatten)]
    strip: StripArgs,

    #[command(flatten)]
    companion: CompanionArgs,
}

#[derive(Args)]
struct StripArgs {
    /// Do not drive a NeoPixel strip
    #[arg(long, global = true)]
    no_strip: bool,

    /// spidev device the strip's data line is wired to
    #[arg(long, global = true, default_value = "/dev/spidev0.0")]
    spi_device: PathBuf,

    /// LEDs on the strip (defaults to cols * rows)
    #[arg(long, global = true)]
    strip_pixels: Option<usize>,

    /// Strip brightness, 0-100
    #[arg(long, global = true, default_value = "2", value_parser = clap::value_parser!(u8).range(0..=100))]
    brightness: u8,

    /// Channel order the strip expects
    #[arg(long, global = true, value_enum, default_value_t = ColorOrder::Rgb)]
    order: ColorOrder,
}

#[derive(Args)]
struct CompanionArgs {
    /// Do not look for a companion panel
    #[arg(long, global = true)]
    no_companion: bool,

    /// Rows on the companion panel
    #[arg(long, global = true, default_value = "16")]
    companion_rows: u32,

    /// Columns on the companion panel
    #[arg(long, global = true, default_value = "32")]
    companion_cols: u32,

    /// BDF font for scrolling messages on the companion panel
    #[arg(long, global = true, default_value = "fonts/bdf/5x7.bdf")]
    font: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Random fill, converge, random fill, fade to black (the default)
    Showcase(ShowcaseArgs),
    /// Solid red, green, blue, then a rainbow sweep
    TestPattern {
        /// How long each solid color is held, in milliseconds
        #[arg(long, default_value = "1000")]
        hold_ms: u64,
        /// Pause between rainbow pixels, in milliseconds
        #[arg(long, default_value = "1")]
        wait_ms: u64,
    },
    /// Rainbow sweep along the strip
    Rainbow {
        /// Pause between pixels, in milliseconds
        #[arg(long, default_value = "1")]
        wait_ms: u64,
    },
    /// Paint random colors until every pixel changed `rounds` times
    Fill {
        #[command(flatten)]
        area: AreaArgs,
        /// Full passes over the area
        #[arg(long, default_value = "1")]
        rounds: u32,
        /// Pause scale, in (0, 1]
        #[arg(long, default_value = "0.01")]
        pace: f64,
    },
    /// Drive every pixel to one named color
    Converge {
        /// Color name from the color table
        color: String,
        #[command(flatten)]
        area: AreaArgs,
        /// Visit pixels in shuffled order instead of sampling at random
        #[arg(long)]
        fast: bool,
        /// With --fast, keep unconverged pixels still
        #[arg(long)]
        no_flicker: bool,
    },
    /// Scroll a message on the companion panel
    Message {
        text: String,
        /// Pause after the message, in milliseconds
        #[arg(long, default_value = "1000")]
        pause_ms: u64,
    },
    /// Turn every pixel off
    Clear,
}

#[derive(Args)]
struct ShowcaseArgs {
    /// Full passes per random fill
    #[arg(long, default_value = "1")]
    rounds: u32,
    /// Message scrolled before the animation
    #[arg(long)]
    message: Option<String>,
    /// Color the showcase ends on
    #[arg(long, default_value = "black")]
    final_color: String,
    /// Run the showcase again and again until Ctrl+C
    #[arg(long)]
    repeat: bool,
}

impl Default for ShowcaseArgs {
    fn default() -> Self {
        Self {
            rounds: 1,
            message: None,
            final_color: "black".to_string(),
            repeat: false,
        }
    }
}

#[derive(Args)]
struct AreaArgs {
    /// Columns to animate, as START:END (end exclusive)
    #[arg(long, value_parser = parse_range)]
    xs: Option<Range<u32>>,
    /// Rows to animate, as START:END (end exclusive)
    #[arg(long, value_parser = parse_range)]
    ys: Option<Range<u32>>,
}

impl AreaArgs {
    fn area(&self, grid: GridConfig) -> Area {
        Area::new(
            self.xs.clone().unwrap_or(0..grid.cols),
            self.ys.clone().unwrap_or(0..grid.rows),
        )
    }
}

fn parse_range(s: &str) -> Result<Range<u32>, String> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{s}'"))?;
    let start: u32 = start.trim().parse().map_err(|e| format!("bad start: {e}"))?;
    let end: u32 = end.trim().parse().map_err(|e| format!("bad end: {e}"))?;
    Ok(start..end)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let grid = GridConfig::try_new(cli.cols, cli.rows).context("invalid --cols/--rows")?;

    tracing::info!("neomatrix v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Grid: {}x{}", grid.cols, grid.rows);

    // The color table is required; nothing meaningful can be shown without it.
    let table = ColorTable::load(&cli.colors)
        .with_context(|| format!("loading color table {}", cli.colors.display()))?;

    let running = setup_signal_handler();
    let mut display = Display::new(grid.pixel_count()).with_stop_flag(running);
    attach_outputs(&mut display, &cli, grid)?;

    let mut delay: Box<dyn Delay> = if cli.no_delay {
        Box::new(NoDelay)
    } else {
        Box::new(ThreadDelay)
    };
    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let command = cli
        .command
        .unwrap_or_else(|| Command::Showcase(ShowcaseArgs::default()));

    let result = run(command, &mut display, &table, grid, rng, delay.as_mut());
    finish(result, &mut display)
}

/// An interrupt is a normal way to stop: blank the outputs and succeed.
fn finish(result: neomatrix::Result<()>, display: &mut Display) -> anyhow::Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(Error::Interrupted) => {
            tracing::info!("Interrupted, clearing display");
            display.blank().context("clearing display")?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Open every output the flags and build features allow.
fn attach_outputs(display: &mut Display, cli: &Cli, grid: GridConfig) -> anyhow::Result<()> {
    if !cli.strip.no_strip {
        let config = StripConfig {
            device: cli.strip.spi_device.clone(),
            pixel_count: cli.strip.strip_pixels.unwrap_or(grid.pixel_count()),
            brightness: cli.strip.brightness,
            order: cli.strip.order,
            ..StripConfig::default()
        };
        open_strip(display, &config)?;
    }

    if !cli.companion.no_companion {
        open_companion(display, cli, grid);
    }

    if let Some(path) = &cli.preview {
        tracing::info!("Writing preview frames to {}", path.display());
        display.attach(Box::new(PngPreview::new(
            grid,
            path.clone(),
            cli.preview_scale,
        )));
    }

    if display.backend_count() == 0 {
        tracing::warn!("No outputs attached; the animation will run unseen");
    }
    Ok(())
}

#[cfg(feature = "neopixel")]
fn open_strip(display: &mut Display, config: &StripConfig) -> anyhow::Result<()> {
    let strip = neomatrix::strip::NeoPixelStrip::open(config)
        .context("opening NeoPixel strip (use --no-strip to run without it)")?;
    display.attach(Box::new(strip));
    Ok(())
}

#[cfg(not(feature = "neopixel"))]
fn open_strip(_display: &mut Display, config: &StripConfig) -> anyhow::Result<()> {
    tracing::warn!(
        "Built without the 'neopixel' feature; not driving {}",
        config.device.display()
    );
    Ok(())
}

#[cfg(feature = "hardware")]
fn open_companion(display: &mut Display, cli: &Cli, grid: GridConfig) {
    use neomatrix::companion::{CompanionConfig, CompanionPanel};

    let config = CompanionConfig {
        rows: cli.companion.companion_rows,
        cols: cli.companion.companion_cols,
        font: cli.companion.font.clone(),
        ..CompanionConfig::default()
    };
    if let Some(panel) = CompanionPanel::detect(grid, &config) {
        let panel = panel.with_stop_flag(display.stop_flag());
        display.attach(Box::new(panel));
    }
}

#[cfg(not(feature = "hardware"))]
fn open_companion(_display: &mut Display, _cli: &Cli, _grid: GridConfig) {
    tracing::debug!("Built without the 'hardware' feature; no companion panel");
}

fn run(
    command: Command,
    display: &mut Display,
    table: &ColorTable,
    grid: GridConfig,
    rng: StdRng,
    delay: &mut dyn Delay,
) -> neomatrix::Result<()> {
    match command {
        Command::Showcase(args) => {
            let mut options = ShowcaseOptions::new(grid.full_area());
            options.rounds = args.rounds;
            options.message = args.message;
            options.final_color = args.final_color;

            let mut animator = Animator::new(display, table, grid, rng, delay);
            loop {
                demo::showcase(&mut animator, &options)?;
                if !args.repeat {
                    break;
                }
            }
        }
        Command::TestPattern { hold_ms, wait_ms } => {
            demo::test_pattern(
                display,
                Duration::from_millis(hold_ms),
                Duration::from_millis(wait_ms),
                delay,
            )?;
        }
        Command::Rainbow { wait_ms } => {
            demo::rainbow_cycle(display, Duration::from_millis(wait_ms), delay)?;
        }
        Command::Fill { area, rounds, pace } => {
            let mut animator = Animator::new(display, table, grid, rng, delay);
            let last = animator.random_fill(&area.area(grid), pace, rounds)?;
            tracing::info!("Last color: {}", last);
        }
        Command::Converge {
            color,
            area,
            fast,
            no_flicker,
        } => {
            let strategy = if fast {
                Strategy::Shuffled { flicker: !no_flicker }
            } else {
                Strategy::Sampling
            };
            let mut animator = Animator::new(display, table, grid, rng, delay);
            animator.converge(&color, &area.area(grid), strategy)?;
        }
        Command::Message { text, pause_ms } => {
            let shown = demo::scroll_message(
                display,
                &text,
                Color::new(255, 255, 255),
                Duration::from_millis(pause_ms),
                delay,
            )?;
            if !shown {
                tracing::warn!("No companion panel with a font attached; message not shown");
            }
        }
        Command::Clear => {
            display.fill(Color::BLACK)?;
            display.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn parse_range_accepts_start_end() {
        assert_eq!(parse_range("0:32"), Ok(0..32));
        assert_eq!(parse_range(" 3 : 5 "), Ok(3..5));
    }

    #[test]
    fn parse_range_rejects_garbage() {
        assert!(parse_range("5").is_err());
        assert!(parse_range("a:3").is_err());
        assert!(parse_range("1:-2").is_err());
    }

    #[test]
    fn no_subcommand_means_showcase() {
        let cli = Cli::try_parse_from(["neomatrix"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.cols, 32);
        assert_eq!(cli.rows, 8);
        assert_eq!(cli.strip.brightness, 2);
    }

    #[test]
    fn converge_flags_parse() {
        let cli = Cli::try_parse_from([
            "neomatrix", "converge", "red", "--fast", "--no-flicker", "--xs", "0:4",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Converge {
                color,
                area,
                fast,
                no_flicker,
            }) => {
                assert_eq!(color, "red");
                assert!(fast && no_flicker);
                assert_eq!(area.area(GridConfig::default()), Area::new(0..4, 0..8));
            }
            _ => panic!("expected converge"),
        }
    }

    #[test]
    fn oversized_grid_is_rejected_up_front() {
        let cli = Cli::try_parse_from(["neomatrix", "--cols", "70000", "--rows", "70000"]).unwrap();
        assert!(GridConfig::try_new(cli.cols, cli.rows).is_err());
    }

    #[test]
    fn interrupted_run_blanks_outputs_and_succeeds() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("frame.png");
        let grid = GridConfig::new(4, 2);
        let table = ColorTable::from_json_str(r#"{ "red": { "rgb": [255, 0, 0] } }"#).unwrap();
        let running = Arc::new(AtomicBool::new(false));
        let mut display = Display::new(grid.pixel_count()).with_stop_flag(running);
        display.attach(Box::new(PngPreview::new(grid, path.clone(), 1)));

        let fill = Command::Fill {
            area: AreaArgs { xs: None, ys: None },
            rounds: 1,
            pace: 0.01,
        };
        let result = run(fill, &mut display, &table, grid, StdRng::seed_from_u64(1), &mut NoDelay);
        assert!(matches!(result, Err(Error::Interrupted)));

        finish(result, &mut display).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn other_errors_are_reported() {
        let mut display = Display::new(8);
        let err = finish(Err(Error::UnknownColor("mauve".to_string())), &mut display).unwrap_err();
        assert!(err.to_string().contains("mauve"));
    }

    #[test]
    fn brightness_above_100_is_rejected() {
        assert!(Cli::try_parse_from(["neomatrix", "--brightness", "150"]).is_err());
    }
}
