//! Crate-wide error type.

/// Errors returned by strip construction, frame mutation, transfers and ingestion.
///
/// Construction errors ([`StripTooLong`](Self::StripTooLong),
/// [`ClockOutOfRange`](Self::ClockOutOfRange), [`TaskSpawn`](Self::TaskSpawn)) are
/// meant to stop the program before the update loop starts. Everything else is
/// reported during steady-state operation and leaves the strip showing its last
/// valid frame.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum Error {
    /// The embassy executor could not spawn a background task.
    #[cfg(not(feature = "host"))]
    #[display("task spawn failed: {_0:?}")]
    TaskSpawn(#[error(not(source))] embassy_executor::SpawnError),

    /// Requested strip length is above [`MAX_STRIP_LEN`](crate::frame_buffer::MAX_STRIP_LEN).
    #[display("strip length {len} exceeds the maximum of {max} LEDs")]
    StripTooLong {
        /// Requested length.
        len: usize,
        /// Longest supported strip.
        max: usize,
    },

    /// An LED index past the end of the strip.
    #[display("LED index {index} is out of range for a strip of {len} LEDs")]
    IndexOutOfBounds {
        /// Rejected index.
        index: usize,
        /// Strip length.
        len: usize,
    },

    /// `start_transfer` was called while the previous frame was still being sent.
    #[display("a transfer is already in flight")]
    TransferInFlight,

    /// A serial clock rate the PIO divider cannot produce.
    #[display("serial clock of {hz} Hz is out of range")]
    ClockOutOfRange {
        /// Requested serial clock.
        hz: u32,
    },

    /// An ingested update did not have the size expected for this strip.
    #[display("ingest frame is {actual} bytes, expected {expected}")]
    IngestLength {
        /// Bytes in one update for this strip.
        expected: usize,
        /// Bytes received.
        actual: usize,
    },

    /// An ingested update did not start with the sync marker.
    #[display("ingest stream out of sync (next marker at {resync_offset:?})")]
    Desync {
        /// Where the next sync marker starts in the received bytes, if anywhere.
        resync_offset: Option<usize>,
    },

    /// An ingested update failed its CRC check.
    #[display("ingest checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    Checksum {
        /// CRC carried by the update.
        expected: u32,
        /// CRC computed over the received bytes.
        actual: u32,
    },

    /// The switchboard already holds its standby buffer.
    #[display("switchboard already has a standby buffer")]
    SwitchboardFull,

    /// The SPI peripheral reported a bus error.
    #[display("SPI error: {_0:?}")]
    Spi(#[error(not(source))] embedded_hal::spi::ErrorKind),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;
