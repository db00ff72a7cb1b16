//! Colour updates streamed in from an external SPI master.
//!
//! One update for a strip of `N` LEDs is [`frame_len`]`(N)` bytes:
//!
//! ```text
//! A5 5A seq 00 | brightness red green blue | … (N records) | CRC-32 (big-endian)
//! ```
//!
//! The CRC-32 (IEEE) covers the header and the records. The sync marker lets a
//! receiver that slipped bytes find the next frame boundary ([`alignment`]),
//! and the sequence byte exposes updates lost upstream.

use crate::apa102::Led;
use crate::frame_buffer::FrameBuffer;
use crate::{Error, Result};

/// Marker that opens every update.
pub const SYNC: [u8; 2] = [0xA5, 0x5A];

/// Sync marker, sequence number and one reserved byte.
pub const HEADER_LEN: usize = 4;

/// `[brightness, red, green, blue]`.
pub const RECORD_LEN: usize = 4;

/// Trailing CRC-32.
pub const CRC_LEN: usize = 4;

/// Bytes in one update for `led_count` LEDs.
#[must_use]
pub const fn frame_len(led_count: usize) -> usize {
    HEADER_LEN + led_count * RECORD_LEN + CRC_LEN
}

/// Where the next frame boundary sits relative to a received buffer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alignment {
    /// The buffer starts with the sync marker.
    Aligned,
    /// The sync marker was found this many bytes in: discard that many bytes
    /// before the next receive to realign.
    Shifted(usize),
    /// No sync marker anywhere in the buffer.
    Lost,
}

/// Checks whether `bytes` is a complete, valid update starting at position 0.
///
/// The sync marker can also turn up inside LED records (red `0xA5`, green
/// `0x5A`), so a buffer is only [`Aligned`](Alignment::Aligned) when its
/// header and CRC both check out. Anything else is searched for the next
/// marker past position 0.
#[must_use]
pub fn alignment(bytes: &[u8]) -> Alignment {
    if check_update(bytes).is_ok() {
        return Alignment::Aligned;
    }
    resync_offset(bytes).map_or(Alignment::Lost, Alignment::Shifted)
}

/// Offset of the first sync marker after position 0.
#[must_use]
pub fn resync_offset(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(SYNC.len())
        .skip(1)
        .position(|window| window == SYNC)
        .map(|position| position + 1)
}

/// Writes one update for `leds` into `out` and returns its length.
///
/// # Errors
///
/// [`Error::IngestLength`] if `out` is shorter than [`frame_len`]`(leds.len())`.
pub fn encode(sequence: u8, leds: &[Led], out: &mut [u8]) -> Result<usize> {
    let len = frame_len(leds.len());
    let actual = out.len();
    let frame = out.get_mut(..len).ok_or(Error::IngestLength {
        expected: len,
        actual,
    })?;
    let (body, crc) = frame.split_at_mut(len - CRC_LEN);
    let (header, records) = body.split_at_mut(HEADER_LEN);
    header.copy_from_slice(&[SYNC[0], SYNC[1], sequence, 0]);
    for (record, led) in records.chunks_exact_mut(RECORD_LEN).zip(leds) {
        record.copy_from_slice(&[led.brightness, led.red, led.green, led.blue]);
    }
    crc.copy_from_slice(&crc32fast::hash(body).to_be_bytes());
    Ok(len)
}

/// Validates one update and applies it to `frame`. Returns its sequence number.
///
/// Nothing is written to `frame` unless the whole update is valid.
///
/// # Errors
///
/// - [`Error::IngestLength`] when `bytes` is not [`frame_len`]`(frame.len())` long.
/// - [`Error::Desync`] when the sync marker or reserved byte is wrong.
/// - [`Error::Checksum`] when the CRC does not match.
pub fn decode_into(bytes: &[u8], frame: &mut FrameBuffer) -> Result<u8> {
    let expected = frame_len(frame.len());
    if bytes.len() != expected {
        return Err(Error::IngestLength {
            expected,
            actual: bytes.len(),
        });
    }
    let (sequence, records) = check_update(bytes)?;
    for (index, record) in records.chunks_exact(RECORD_LEN).enumerate() {
        if let [brightness, red, green, blue] = *record {
            frame.set(index, Led::new(red, green, blue, brightness))?;
        }
    }
    Ok(sequence)
}

/// Validates header and CRC, returning the sequence number and the records.
fn check_update(bytes: &[u8]) -> Result<(u8, &[u8])> {
    let desync = || Error::Desync {
        resync_offset: resync_offset(bytes),
    };
    let Some((body, crc)) = bytes.split_last_chunk::<CRC_LEN>() else {
        return Err(desync());
    };
    let Some((header, records)) = body.split_first_chunk::<HEADER_LEN>() else {
        return Err(desync());
    };
    let &[sync0, sync1, sequence, 0] = header else {
        return Err(desync());
    };
    if [sync0, sync1] != SYNC {
        return Err(desync());
    }
    let expected_crc = u32::from_be_bytes(*crc);
    let actual_crc = crc32fast::hash(body);
    if expected_crc != actual_crc {
        return Err(Error::Checksum {
            expected: expected_crc,
            actual: actual_crc,
        });
    }
    Ok((sequence, records))
}

/// Counters kept by an [`IngestDecoder`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IngestStats {
    /// Updates applied to the frame.
    pub applied: u32,
    /// Updates rejected for a missing sync marker.
    pub desyncs: u32,
    /// Updates rejected for a bad CRC or a wrong length.
    pub corrupt: u32,
    /// Updates the sender numbered but that never arrived.
    pub sequence_gaps: u32,
}

/// [`decode_into`] plus bookkeeping across updates.
#[derive(Clone, Debug, Default)]
pub struct IngestDecoder {
    last_sequence: Option<u8>,
    stats: IngestStats,
}

impl IngestDecoder {
    /// A decoder that has seen no updates yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_sequence: None,
            stats: IngestStats {
                applied: 0,
                desyncs: 0,
                corrupt: 0,
                sequence_gaps: 0,
            },
        }
    }

    /// Decodes and applies one update, updating the counters.
    ///
    /// # Errors
    ///
    /// Same as [`decode_into`].
    pub fn apply(&mut self, bytes: &[u8], frame: &mut FrameBuffer) -> Result<u8> {
        match decode_into(bytes, frame) {
            Ok(sequence) => {
                if let Some(last) = self.last_sequence.filter(|&last| last != sequence) {
                    let gap = sequence.wrapping_sub(last).wrapping_sub(1);
                    self.stats.sequence_gaps =
                        self.stats.sequence_gaps.saturating_add(u32::from(gap));
                }
                self.last_sequence = Some(sequence);
                self.stats.applied = self.stats.applied.saturating_add(1);
                Ok(sequence)
            }
            Err(err) => {
                match err {
                    Error::Desync { .. } => {
                        self.stats.desyncs = self.stats.desyncs.saturating_add(1);
                    }
                    _ => self.stats.corrupt = self.stats.corrupt.saturating_add(1),
                }
                Err(err)
            }
        }
    }

    /// Counters since creation.
    #[must_use]
    pub const fn stats(&self) -> IngestStats {
        self.stats
    }
}
