//! APA102 ("DotStar") wire words.
//!
//! Every LED on an APA102 strip consumes one 32-bit word, shifted out MSB first:
//!
//! ```text
//! bit 31..29  28..24      23..16  15..8   7..0
//!     1 1 1   brightness  blue    green   red
//! ```
//!
//! A frame is bracketed by [`START_FRAME`] (32 zero bits) and [`END_FRAME`]
//! (32 one bits). Packing is done with explicit shifts and masks; nothing here
//! relies on a native bit-field layout.
//!
//! # Example
//!
//! ```
//! use dotstar_kit::apa102::{Led, pack, unpack};
//!
//! let word = pack(31, 255, 0, 0);
//! assert_eq!(word, 0xFF00_00FF);
//! assert_eq!(unpack(word), (31, 255, 0, 0));
//!
//! let led = Led::new(255, 0, 0, 31);
//! assert_eq!(led.to_word(), word);
//! ```

use core::fmt;

use crate::Rgb;

/// Start-of-frame delimiter.
pub const START_FRAME: u32 = 0x0000_0000;

/// End-of-frame delimiter.
pub const END_FRAME: u32 = 0xFFFF_FFFF;

/// The three marker bits every LED word carries.
pub const MAGIC: u32 = 0b111 << 29;

const MAGIC_MASK: u32 = 0b111 << 29;

/// Mask applied to brightness before it is encoded.
pub const BRIGHTNESS_MASK: u8 = 0x1F;

/// Highest per-LED brightness the protocol can express.
pub const MAX_BRIGHTNESS: u8 = BRIGHTNESS_MASK;

/// Packs brightness and colour into one LED word.
///
/// Brightness above 31 is truncated to its low 5 bits. The one input whose
/// encoding would equal [`END_FRAME`] (brightness 31, full white) is sent at
/// brightness 30 so an LED word can never be mistaken for a delimiter.
#[must_use]
pub const fn pack(brightness: u8, red: u8, green: u8, blue: u8) -> u32 {
    let word = MAGIC
        | ((brightness & BRIGHTNESS_MASK) as u32) << 24
        | (blue as u32) << 16
        | (green as u32) << 8
        | red as u32;
    if word == END_FRAME {
        word & !(1 << 24)
    } else {
        word
    }
}

/// Splits a word back into `(brightness, red, green, blue)`.
#[must_use]
pub const fn unpack(word: u32) -> (u8, u8, u8, u8) {
    let brightness = ((word >> 24) as u8) & BRIGHTNESS_MASK;
    let blue = (word >> 16) as u8;
    let green = (word >> 8) as u8;
    let red = word as u8;
    (brightness, red, green, blue)
}

/// Returns whether `word` carries the LED marker bits.
#[must_use]
pub const fn is_led_word(word: u32) -> bool {
    word & MAGIC_MASK == MAGIC && word != END_FRAME
}

/// Target state of one physical LED.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Led {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
    /// Global brightness, `0..=31`.
    pub brightness: u8,
}

impl Led {
    /// An unlit LED.
    pub const OFF: Self = Self::new(0, 0, 0, 0);

    /// Creates an LED record, truncating brightness to 5 bits.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8, brightness: u8) -> Self {
        Self {
            red,
            green,
            blue,
            brightness: brightness & BRIGHTNESS_MASK,
        }
    }

    /// Creates an LED record from an [`Rgb`] colour.
    #[must_use]
    pub const fn from_rgb(color: Rgb, brightness: u8) -> Self {
        Self::new(color.r, color.g, color.b, brightness)
    }

    /// The colour part of this record.
    #[must_use]
    pub const fn rgb(self) -> Rgb {
        Rgb::new(self.red, self.green, self.blue)
    }

    /// Encodes this record with [`pack`].
    #[must_use]
    pub const fn to_word(self) -> u32 {
        pack(self.brightness, self.red, self.green, self.blue)
    }

    /// Decodes an LED word. Returns `None` for delimiters and anything without
    /// the marker bits.
    #[must_use]
    pub const fn from_word(word: u32) -> Option<Self> {
        if !is_led_word(word) {
            return None;
        }
        let (brightness, red, green, blue) = unpack(word);
        Some(Self::new(red, green, blue, brightness))
    }
}

impl From<(Rgb, u8)> for Led {
    fn from((color, brightness): (Rgb, u8)) -> Self {
        Self::from_rgb(color, brightness)
    }
}

/// One diagnostic dump line: `"rr gg bb brightness"`.
impl fmt::Display for Led {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x} {:02x} {:02x} {:2}",
            self.red, self.green, self.blue, self.brightness
        )
    }
}
