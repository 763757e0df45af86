//! NeoPixel strip: WS2812 (RGB) or SK6812 (RGBW) LEDs driven over SPI.
//!
//! The strip hangs off the Pi's SPI MOSI pin (GPIO10 / D10). Each data bit
//! is encoded as an SPI bit pattern by `ws2812-spi`, so no PWM or DMA setup
//! is needed. Writes are buffered and only go out on `flush`.
//!
//! The device itself is behind the `neopixel` feature; the configuration
//! and channel ordering below are always available so they can be parsed
//! and tested anywhere.

use crate::Color;
use std::path::PathBuf;

/// Order the strip expects color channels in on the wire.
///
/// Some strips have red and green swapped; RGBW strips add a white channel
/// that we always send as 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorOrder {
    #[default]
    Rgb,
    Grb,
    Rgbw,
    Grbw,
}

impl ColorOrder {
    /// Channels per LED: 3, or 4 for strips with a white channel.
    pub fn channels(self) -> usize {
        match self {
            ColorOrder::Rgb | ColorOrder::Grb => 3,
            ColorOrder::Rgbw | ColorOrder::Grbw => 4,
        }
    }

    /// Bytes for one LED in transmission order. Only the first
    /// [`ColorOrder::channels`] bytes are meaningful.
    pub fn wire_bytes(self, c: Color) -> [u8; 4] {
        match self {
            ColorOrder::Rgb | ColorOrder::Rgbw => [c.r, c.g, c.b, 0],
            ColorOrder::Grb | ColorOrder::Grbw => [c.g, c.r, c.b, 0],
        }
    }
}

/// Settings for the SPI-attached strip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StripConfig {
    /// spidev node, e.g. `/dev/spidev0.0`
    pub device: PathBuf,
    pub pixel_count: usize,
    /// Brightness 0-100. These LEDs are blinding; the default is 2.
    pub brightness: u8,
    pub order: ColorOrder,
    /// WS2812 timing needs an SPI clock between 2 and 3.8 MHz.
    pub spi_hz: u32,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/spidev0.0"),
            pixel_count: 256,
            brightness: 2,
            order: ColorOrder::Rgb,
            spi_hz: 3_000_000,
        }
    }
}

#[cfg(feature = "neopixel")]
pub use device::NeoPixelStrip;

#[cfg(feature = "neopixel")]
mod device {
    use super::{ColorOrder, StripConfig};
    use crate::sink::{PixelSink, check_index};
    use crate::{Color, Error, Result};
    use linux_embedded_hal::SpidevBus;
    use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
    use smart_leds::{RGB8, RGBW, SmartLedsWrite, White};
    use ws2812_spi::Ws2812;
    use ws2812_spi::devices::Sk6812w;

    /// `ws2812-spi` always sends green, red, blue (, white). We pre-shuffle
    /// our wire bytes so that comes out in the order the strip wants.
    enum Driver {
        Rgb(Ws2812<SpidevBus>),
        Rgbw(Ws2812<SpidevBus, Sk6812w>),
    }

    pub struct NeoPixelStrip {
        config: StripConfig,
        driver: Driver,
        staged: Vec<Color>,
    }

    impl NeoPixelStrip {
        /// Open and configure the SPI device.
        pub fn open(config: &StripConfig) -> Result<Self> {
            let mut spi = SpidevBus::open(&config.device).map_err(|e| {
                Error::Device(format!("opening {}: {:?}", config.device.display(), e))
            })?;

            let options = SpidevOptions::new()
                .bits_per_word(8)
                .max_speed_hz(config.spi_hz)
                .mode(SpiModeFlags::SPI_MODE_0)
                .build();
            spi.configure(&options)
                .map_err(|e| Error::Device(format!("configuring SPI: {e}")))?;

            let driver = if config.order.channels() == 4 {
                Driver::Rgbw(Ws2812::new_sk6812w(spi))
            } else {
                Driver::Rgb(Ws2812::new(spi))
            };

            tracing::info!(
                "NeoPixel strip on {}: {} pixels, {:?}, brightness {}%",
                config.device.display(),
                config.pixel_count,
                config.order,
                config.brightness
            );

            Ok(Self {
                config: config.clone(),
                driver,
                staged: vec![Color::BLACK; config.pixel_count],
            })
        }
    }

    impl PixelSink for NeoPixelStrip {
        fn name(&self) -> &str {
            "neopixel"
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
            let order: ColorOrder = self.config.order;
            let brightness = self.config.brightness;
            let wire = self
                .staged
                .iter()
                .map(move |c| order.wire_bytes(c.apply_brightness(brightness)));

            let sent = match &mut self.driver {
                Driver::Rgb(ws) => ws.write(wire.map(|[g, r, b, _]| RGB8 { r, g, b })),
                Driver::Rgbw(ws) => ws.write(wire.map(|[g, r, b, w]| RGBW {
                    r,
                    g,
                    b,
                    a: White(w),
                })),
            };
            sent.map_err(|e| Error::Device(format!("SPI write failed: {e:?}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(ColorOrder::Rgb, [10, 20, 30, 0], 3)]
    #[case(ColorOrder::Grb, [20, 10, 30, 0], 3)]
    #[case(ColorOrder::Rgbw, [10, 20, 30, 0], 4)]
    #[case(ColorOrder::Grbw, [20, 10, 30, 0], 4)]
    fn test_wire_bytes(#[case] order: ColorOrder, #[case] wire: [u8; 4], #[case] channels: usize) {
        assert_eq!(order.wire_bytes(Color::new(10, 20, 30)), wire);
        assert_eq!(order.channels(), channels);
    }

    #[test]
    fn strip_config_defaults() {
        let config = StripConfig::default();
        assert_eq!(config.pixel_count, 256);
        assert_eq!(config.brightness, 2);
        assert_eq!(config.order, ColorOrder::Rgb);
        assert!((2_000_000..=3_800_000).contains(&config.spi_hz));
    }
}
