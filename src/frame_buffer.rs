//! The authoritative strip state: every word that goes on the wire, in order.
//!
//! ```text
//! [START_FRAME, LED_0, LED_1, …, LED_{N-1}, END_FRAME, (END_FRAME…)]
//! ```
//!
//! # Example
//!
//! ```
//! use dotstar_kit::{Result, colors, frame_buffer::FrameBuffer};
//!
//! # fn main() -> Result<()> {
//! let mut frame = FrameBuffer::new(3)?;
//! frame.set_led(0, colors::RED, 31)?;
//! assert_eq!(frame.buffer_size(), 5);
//! assert_eq!(frame.words()[1], 0xFF00_00FF);
//! assert!(frame.set_led(3, colors::RED, 31).is_err());
//! # Ok(())
//! # }
//! ```

use core::fmt;

use heapless::Vec;

use crate::apa102::{END_FRAME, Led, START_FRAME};
use crate::config::StripConfig;
use crate::{Error, Result, Rgb};

/// Longest strip a [`FrameBuffer`] accepts.
pub const MAX_STRIP_LEN: usize = 1000;

/// End-frame words needed by the longest strip with [`EndFrame::Propagated`].
pub const MAX_END_FRAME_WORDS: usize = EndFrame::Propagated.word_count(MAX_STRIP_LEN);

/// Word capacity of every frame: start word, LED words and end words.
pub const FRAME_WORDS_CAPACITY: usize = MAX_STRIP_LEN + 1 + MAX_END_FRAME_WORDS;

/// How many end-frame words follow the LED data.
///
/// Each APA102 delays the clock it forwards by half a cycle, so the data for the
/// last LED only arrives after about `N / 2` extra clock edges.
/// [`Minimal`](Self::Minimal) sends a single end word, which is enough for
/// strips up to 64 LEDs; [`Propagated`](Self::Propagated) sends enough for any length.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndFrame {
    /// One `END_FRAME` word.
    #[default]
    Minimal,
    /// `ceil(ceil(N / 2) / 32)` words, at least one.
    Propagated,
}

impl EndFrame {
    /// Number of end words for a strip of `len` LEDs.
    #[must_use]
    pub const fn word_count(self, len: usize) -> usize {
        match self {
            Self::Minimal => 1,
            Self::Propagated => {
                let extra_bits = len.div_ceil(2);
                let words = extra_bits.div_ceil(32);
                if words == 0 { 1 } else { words }
            }
        }
    }
}

/// Wire-ready frame for one strip.
///
/// Created once per strip; the length never changes afterwards.
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    words: Vec<u32, FRAME_WORDS_CAPACITY>,
    len: usize,
    end_frame: EndFrame,
}

impl FrameBuffer {
    /// A dark frame for `len` LEDs with a single end word.
    ///
    /// # Errors
    ///
    /// [`Error::StripTooLong`] if `len` is above [`MAX_STRIP_LEN`].
    pub fn new(len: usize) -> Result<Self> {
        Self::with_end_frame(len, EndFrame::Minimal)
    }

    /// A dark frame for `len` LEDs with the given end-frame policy.
    ///
    /// # Errors
    ///
    /// [`Error::StripTooLong`] if `len` is above [`MAX_STRIP_LEN`].
    pub fn with_end_frame(len: usize, end_frame: EndFrame) -> Result<Self> {
        if len > MAX_STRIP_LEN {
            return Err(Error::StripTooLong {
                len,
                max: MAX_STRIP_LEN,
            });
        }
        let mut words = Vec::new();
        let end_words = end_frame.word_count(len);
        // Capacity covers MAX_STRIP_LEN with the longest end frame, so these cannot fail.
        let _ = words.push(START_FRAME);
        let _ = words.resize(len + 1, Led::OFF.to_word());
        let _ = words.resize(len + 1 + end_words, END_FRAME);
        Ok(Self {
            words,
            len,
            end_frame,
        })
    }

    /// A dark frame sized and terminated as `config` describes.
    ///
    /// # Errors
    ///
    /// [`Error::StripTooLong`] if the configured length is above [`MAX_STRIP_LEN`].
    pub fn from_config(config: &StripConfig) -> Result<Self> {
        Self::with_end_frame(config.len(), config.end_frame())
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

    /// Total words in the frame, delimiters included.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.words.len()
    }

    /// End-frame policy this frame was built with.
    #[must_use]
    pub const fn end_frame(&self) -> EndFrame {
        self.end_frame
    }

    /// The words to transmit, in order.
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Sets one LED from a colour and a brightness (`0..=31`, truncated).
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfBounds`] if `index >= len`; the frame is left unchanged.
    pub fn set_led(&mut self, index: usize, color: Rgb, brightness: u8) -> Result<()> {
        self.set(index, Led::from_rgb(color, brightness))
    }

    /// Sets one LED from a record.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfBounds`] if `index >= len`; the frame is left unchanged.
    pub fn set(&mut self, index: usize, led: Led) -> Result<()> {
        let slot = self.slot_mut(index)?;
        *slot = led.to_word();
        Ok(())
    }

    /// Reads one LED back.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfBounds`] if `index >= len`.
    pub fn led(&self, index: usize) -> Result<Led> {
        let word = self
            .led_words()
            .get(index)
            .ok_or(Error::IndexOutOfBounds {
                index,
                len: self.len,
            })?;
        Ok(Led::from_word(*word).unwrap_or(Led::OFF))
    }

    /// All LEDs in strip order.
    pub fn leds(&self) -> impl Iterator<Item = Led> + '_ {
        self.led_words()
            .iter()
            .map(|&word| Led::from_word(word).unwrap_or(Led::OFF))
    }

    /// Sets every LED to the same colour and brightness.
    pub fn fill(&mut self, color: Rgb, brightness: u8) {
        let word = Led::from_rgb(color, brightness).to_word();
        self.led_words_mut().fill(word);
    }

    /// Turns every LED off.
    pub fn clear(&mut self) {
        self.led_words_mut().fill(Led::OFF.to_word());
    }

    /// The exact bytes shifted onto the wire: each word MSB first.
    pub fn wire_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.words.iter().flat_map(|word| word.to_be_bytes())
    }

    /// Writes one `"rr gg bb brightness"` line per LED.
    ///
    /// # Errors
    ///
    /// Propagates the writer's error.
    pub fn write_dump<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        for led in self.leds() {
            writeln!(out, "{led}")?;
        }
        Ok(())
    }

    /// Writes the wire bytes as hex, 16 per line.
    ///
    /// # Errors
    ///
    /// Propagates the writer's error.
    pub fn write_hex<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        let mut column = 0;
        for byte in self.wire_bytes() {
            if column == 15 {
                writeln!(out, "{byte:02x}")?;
                column = 0;
            } else {
                write!(out, "{byte:02x} ")?;
                column += 1;
            }
        }
        if column != 0 {
            writeln!(out)?;
        }
        Ok(())
    }

    fn led_words(&self) -> &[u32] {
        self.words.get(1..=self.len).unwrap_or_default()
    }

    fn led_words_mut(&mut self) -> &mut [u32] {
        let len = self.len;
        self.words.get_mut(1..=len).unwrap_or_default()
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut u32> {
        let len = self.len;
        self.led_words_mut()
            .get_mut(index)
            .ok_or(Error::IndexOutOfBounds { index, len })
    }
}
