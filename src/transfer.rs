//! Non-blocking strip updates: the producer hands a copy of its frame to a
//! transfer engine and returns immediately.
//!
//! One [`WireFrame`] circulates between the producer ([`Apa102Strip`]) and the
//! engine ([`transfer_loop`]) over the two single-slot channels of a
//! [`TransferLink`]. Whoever holds the `WireFrame` owns it:
//!
//! - producer: copies the latest [`FrameBuffer`] into it in
//!   [`start_transfer`](Apa102Strip::start_transfer) and sends it to the engine;
//! - engine: streams it to a [`WireSink`] (PIO + DMA, or an SPI peripheral) and
//!   sends it back when the last word has been handed to the hardware.
//!
//! With a single `WireFrame` at most one transfer can be in flight, and the
//! producer can keep editing its `FrameBuffer` while the engine reads the copy.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embedded_hal::spi::Error as _;
use embedded_hal_async::spi::SpiBus;
use heapless::Vec;
use portable_atomic::{AtomicU32, Ordering};

use crate::frame_buffer::{FRAME_WORDS_CAPACITY, FrameBuffer};
use crate::{Error, Result, Rgb};

/// The DMA-side copy of a frame.
pub type WireFrame = Vec<u32, FRAME_WORDS_CAPACITY>;

/// Hardware that drains words onto the strip's clock and data lines.
pub trait WireSink {
    /// Sends `words` in order, each MSB first. Returns once every word has been
    /// handed to the hardware.
    ///
    /// # Errors
    ///
    /// Bus errors reported by the peripheral.
    async fn write_words(&mut self, words: &[u32]) -> Result<()>;
}

/// Channels between one producer and one transfer engine.
pub struct TransferLink<'b> {
    pending: Channel<CriticalSectionRawMutex, &'b mut WireFrame, 1>,
    idle: Channel<CriticalSectionRawMutex, &'b mut WireFrame, 1>,
    frames_sent: AtomicU32,
}

impl<'b> TransferLink<'b> {
    /// An idle link.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Channel::new(),
            idle: Channel::new(),
            frames_sent: AtomicU32::new(0),
        }
    }

    /// Frames fully handed to the hardware.
    #[must_use]
    pub fn frames_sent(&self) -> u32 {
        self.frames_sent.load(Ordering::Relaxed)
    }
}

impl Default for TransferLink<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer side of a strip: the frame being edited plus the transfer handle.
pub struct Apa102Strip<'l, 'b> {
    frame: FrameBuffer,
    link: &'l TransferLink<'b>,
    wire_frame: Option<&'b mut WireFrame>,
    rejected_starts: u32,
}

impl<'l, 'b> Apa102Strip<'l, 'b> {
    /// Binds a frame to a link. `wire_frame` is the single buffer the engine
    /// will read from.
    pub fn new(
        frame: FrameBuffer,
        link: &'l TransferLink<'b>,
        wire_frame: &'b mut WireFrame,
    ) -> Self {
        Self {
            frame,
            link,
            wire_frame: Some(wire_frame),
            rejected_starts: 0,
        }
    }

    /// Number of LEDs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.frame.len()
    }

    /// Whether the strip has no LEDs.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Words per transfer, delimiters included.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.frame.buffer_size()
    }

    /// The frame being edited.
    #[must_use]
    pub const fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// The frame being edited. Changes show up on the next transfer.
    pub const fn frame_mut(&mut self) -> &mut FrameBuffer {
        &mut self.frame
    }

    /// Sets one LED in the frame being edited.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfBounds`] if `index` is past the end of the strip.
    pub fn set_led(&mut self, index: usize, color: Rgb, brightness: u8) -> Result<()> {
        self.frame.set_led(index, color, brightness)
    }

    /// Copies the current frame to the engine and returns without waiting for
    /// the transfer.
    ///
    /// # Errors
    ///
    /// [`Error::TransferInFlight`] if the previous transfer has not completed;
    /// nothing is queued and the frame is kept for a later call.
    pub fn start_transfer(&mut self) -> Result<()> {
        self.reclaim();
        let Some(wire_frame) = self.wire_frame.take() else {
            self.rejected_starts = self.rejected_starts.saturating_add(1);
            return Err(Error::TransferInFlight);
        };
        wire_frame.clear();
        // Same capacity as the frame's own storage.
        let _ = wire_frame.extend_from_slice(self.frame.words());
        match self.link.pending.try_send(wire_frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(wire_frame)) => {
                self.wire_frame = Some(wire_frame);
                self.rejected_starts = self.rejected_starts.saturating_add(1);
                Err(Error::TransferInFlight)
            }
        }
    }

    /// Whether a transfer is still in flight.
    pub fn is_busy(&mut self) -> bool {
        self.reclaim();
        self.wire_frame.is_none()
    }

    /// Waits for the in-flight transfer, if any, to complete.
    pub async fn wait_idle(&mut self) {
        if self.wire_frame.is_none() {
            self.wire_frame = Some(self.link.idle.receive().await);
        }
    }

    /// [`start_transfer`](Self::start_transfer) after [`wait_idle`](Self::wait_idle).
    ///
    /// # Errors
    ///
    /// Same as [`start_transfer`](Self::start_transfer); cannot be
    /// [`Error::TransferInFlight`] unless the link is shared with another producer.
    pub async fn show(&mut self) -> Result<()> {
        self.wait_idle().await;
        self.start_transfer()
    }

    /// Calls to [`start_transfer`](Self::start_transfer) refused because a
    /// transfer was in flight.
    #[must_use]
    pub const fn rejected_starts(&self) -> u32 {
        self.rejected_starts
    }

    /// Frames the engine has finished sending.
    #[must_use]
    pub fn frames_sent(&self) -> u32 {
        self.link.frames_sent()
    }

    fn reclaim(&mut self) {
        if self.wire_frame.is_none() {
            self.wire_frame = self.link.idle.try_receive().ok();
        }
    }
}

/// Waits for one pending frame, sends it and hands the buffer back.
///
/// # Errors
///
/// The sink's error. The buffer is returned to the producer either way.
pub async fn transfer_once<S: WireSink>(link: &TransferLink<'_>, sink: &mut S) -> Result<()> {
    let wire_frame = link.pending.receive().await;
    let result = sink.write_words(wire_frame).await;
    if result.is_ok() {
        link.frames_sent.fetch_add(1, Ordering::Relaxed);
    }
    link.idle.send(wire_frame).await;
    result
}

/// Engine task body: sends every frame the producer starts, forever.
pub async fn transfer_loop<S: WireSink>(link: &TransferLink<'_>, mut sink: S) -> ! {
    #[cfg(feature = "defmt")]
    defmt::info!("transfer_loop: started");
    loop {
        if let Err(err) = transfer_once(link, &mut sink).await {
            #[cfg(feature = "defmt")]
            defmt::warn!("transfer_loop: {}", defmt::Display2Format(&err));
            #[cfg(not(feature = "defmt"))]
            let _ = err;
        }
    }
}

/// [`WireSink`] over any async SPI bus, e.g. the RP SPI block with DMA.
///
/// APA102 has no chip select; only SCK and MOSI are wired.
pub struct SpiSink<SPI> {
    spi: SPI,
}

impl<SPI: SpiBus<u8>> SpiSink<SPI> {
    /// Wraps a bus already configured for the strip's clock rate.
    #[must_use]
    pub const fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Gives the bus back.
    pub fn into_inner(self) -> SPI {
        self.spi
    }
}

impl<SPI: SpiBus<u8>> WireSink for SpiSink<SPI> {
    async fn write_words(&mut self, words: &[u32]) -> Result<()> {
        const CHUNK_WORDS: usize = 16;
        let mut bytes = [0u8; CHUNK_WORDS * 4];
        for chunk in words.chunks(CHUNK_WORDS) {
            for (out, word) in bytes.chunks_exact_mut(4).zip(chunk) {
                out.copy_from_slice(&word.to_be_bytes());
            }
            let used = bytes.get(..chunk.len() * 4).unwrap_or_default();
            self.spi
                .write(used)
                .await
                .map_err(|err| Error::Spi(err.kind()))?;
        }
        self.spi.flush().await.map_err(|err| Error::Spi(err.kind()))
    }
}
