//! Runtime configuration for a strip and its serial links.
//!
//! The [`apa102_strip!`](crate::apa102_strip!) macro fills a [`StripConfig`] from its
//! fields; hand-built pipelines construct one directly.

use embassy_time::Duration;
use fixed::types::U24F8;

use crate::frame_buffer::{EndFrame, MAX_STRIP_LEN};
use crate::{Error, Result};

/// Default output clock: 5 MHz.
pub const OUTPUT_CLOCK_HZ_DEFAULT: u32 = 5_000_000;

/// Default clock expected from the SPI master feeding the ingestion link: 1 MHz.
pub const INGEST_CLOCK_HZ_DEFAULT: u32 = 1_000_000;

/// Default update period: 24 frames per second.
pub const FRAME_PERIOD_DEFAULT: Duration = Duration::from_millis(1000 / 24);

/// Default end-frame policy (`EndFrame::Minimal`).
pub const END_FRAME_DEFAULT: EndFrame = EndFrame::Minimal;

/// PIO cycles per output bit of the APA102 program (clock low, clock high).
pub const OUTPUT_CYCLES_PER_BIT: u32 = 2;

/// PIO cycles per input bit of the SPI receiver (oversampling factor).
pub const INGEST_CYCLES_PER_BIT: u32 = 4;

/// Strip and link settings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StripConfig {
    len: usize,
    output_clock_hz: u32,
    ingest_clock_hz: u32,
    end_frame: EndFrame,
    frame_period: Duration,
}

impl StripConfig {
    /// Settings for a strip of `len` LEDs with every other field at its default.
    #[must_use]
    pub const fn new(len: usize) -> Self {
        Self {
            len,
            output_clock_hz: OUTPUT_CLOCK_HZ_DEFAULT,
            ingest_clock_hz: INGEST_CLOCK_HZ_DEFAULT,
            end_frame: END_FRAME_DEFAULT,
            frame_period: FRAME_PERIOD_DEFAULT,
        }
    }

    /// Output (strip) clock in Hz.
    #[must_use]
    pub const fn with_output_clock_hz(mut self, hz: u32) -> Self {
        self.output_clock_hz = hz;
        self
    }

    /// Clock of the external SPI master in Hz.
    #[must_use]
    pub const fn with_ingest_clock_hz(mut self, hz: u32) -> Self {
        self.ingest_clock_hz = hz;
        self
    }

    /// End-frame policy.
    #[must_use]
    pub const fn with_end_frame(mut self, end_frame: EndFrame) -> Self {
        self.end_frame = end_frame;
        self
    }

    /// Period of timer-driven updates.
    #[must_use]
    pub const fn with_frame_period(mut self, frame_period: Duration) -> Self {
        self.frame_period = frame_period;
        self
    }

    /// Number of LEDs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the strip has no LEDs.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Output (strip) clock in Hz.
    #[must_use]
    pub const fn output_clock_hz(&self) -> u32 {
        self.output_clock_hz
    }

    /// Ingestion (SPI slave) clock in Hz.
    #[must_use]
    pub const fn ingest_clock_hz(&self) -> u32 {
        self.ingest_clock_hz
    }

    /// End-frame policy.
    #[must_use]
    pub const fn end_frame(&self) -> EndFrame {
        self.end_frame
    }

    /// Period of timer-driven updates.
    #[must_use]
    pub const fn frame_period(&self) -> Duration {
        self.frame_period
    }

    /// Checks the length ceiling and that both clocks are non-zero.
    ///
    /// # Errors
    ///
    /// [`Error::StripTooLong`] or [`Error::ClockOutOfRange`].
    pub const fn validate(&self) -> Result<()> {
        if self.len > MAX_STRIP_LEN {
            return Err(Error::StripTooLong {
                len: self.len,
                max: MAX_STRIP_LEN,
            });
        }
        if self.output_clock_hz == 0 {
            return Err(Error::ClockOutOfRange { hz: 0 });
        }
        if self.ingest_clock_hz == 0 {
            return Err(Error::ClockOutOfRange { hz: 0 });
        }
        Ok(())
    }
}

/// PIO clock divider that runs a program at `cycles_per_bit` cycles per serial bit.
///
/// Works in kHz so the 24.8 fixed-point divider does not overflow at
/// 125–150 MHz system clocks.
///
/// # Errors
///
/// [`Error::ClockOutOfRange`] when `serial_hz` is below 1 kHz or so fast that the
/// divider would drop under 1 (the PIO cannot run faster than the system clock),
/// or so slow that it overflows the 16-bit integer part.
pub fn clock_divider(sys_clock_hz: u32, serial_hz: u32, cycles_per_bit: u32) -> Result<U24F8> {
    let out_of_range = Error::ClockOutOfRange { hz: serial_hz };
    let sys_khz = sys_clock_hz / 1000;
    let bit_khz = serial_hz
        .checked_mul(cycles_per_bit)
        .map(|hz| hz / 1000)
        .filter(|&khz| khz > 0)
        .ok_or(out_of_range)?;
    let divider = U24F8::from_num(sys_khz) / U24F8::from_num(bit_khz);
    if divider < U24F8::ONE || divider >= U24F8::from_num(65_536) {
        return Err(Error::ClockOutOfRange { hz: serial_hz });
    }
    Ok(divider)
}
