//! Update loop: wait for a trigger, apply new colours, hand the frame to the
//! transfer engine.
//!
//! A [`FrameSource`] decides *when* an update happens and *what* it changes;
//! [`Orchestrator`] makes sure each applied update is followed by exactly one
//! transfer and never starts one while the previous is still on the wire.

use crate::frame_buffer::FrameBuffer;
use crate::ingest::{IngestDecoder, IngestStats};
use crate::switchboard::Switchboard;
use crate::transfer::Apa102Strip;
use crate::Result;

/// Where updates come from.
pub trait FrameSource {
    /// Waits for the next trigger and writes the new colours into `frame`.
    ///
    /// # Errors
    ///
    /// Rejected updates. `frame` is left holding the last valid colours.
    async fn next_update(&mut self, frame: &mut FrameBuffer) -> Result<()>;
}

/// Updates received over the SPI ingestion link.
///
/// Each ready buffer from the switchboard holds one encoded update
/// (see [`ingest`](crate::ingest)).
pub struct IngestSource<'s, B> {
    switchboard: &'s Switchboard<B>,
    decoder: IngestDecoder,
}

impl<'s, B: AsRef<[u8]>> IngestSource<'s, B> {
    /// Reads updates published on `switchboard`.
    #[must_use]
    pub const fn new(switchboard: &'s Switchboard<B>) -> Self {
        Self {
            switchboard,
            decoder: IngestDecoder::new(),
        }
    }

    /// Decoder counters.
    #[must_use]
    pub const fn stats(&self) -> IngestStats {
        self.decoder.stats()
    }
}

impl<B: AsRef<[u8]>> FrameSource for IngestSource<'_, B> {
    async fn next_update(&mut self, frame: &mut FrameBuffer) -> Result<()> {
        let ready = self.switchboard.wait_ready().await;
        let bytes: &[u8] = (*ready).as_ref();
        self.decoder.apply(bytes, frame)?;
        Ok(())
    }
}

/// Updates rendered on a fixed period.
///
/// `render` gets a tick counter that starts at 0.
#[cfg(not(feature = "host"))]
pub struct TickSource<F> {
    ticker: embassy_time::Ticker,
    tick: u32,
    render: F,
}

#[cfg(not(feature = "host"))]
impl<F> TickSource<F>
where
    F: FnMut(u32, &mut FrameBuffer) -> Result<()>,
{
    /// Calls `render` once every `period`.
    #[must_use]
    pub fn new(period: embassy_time::Duration, render: F) -> Self {
        Self {
            ticker: embassy_time::Ticker::every(period),
            tick: 0,
            render,
        }
    }
}

#[cfg(not(feature = "host"))]
impl<F> FrameSource for TickSource<F>
where
    F: FnMut(u32, &mut FrameBuffer) -> Result<()>,
{
    async fn next_update(&mut self, frame: &mut FrameBuffer) -> Result<()> {
        self.ticker.next().await;
        let tick = self.tick;
        self.tick = self.tick.wrapping_add(1);
        (self.render)(tick, frame)
    }
}

/// Counters kept by an [`Orchestrator`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UpdateStats {
    /// Updates applied to the frame.
    pub updates: u32,
    /// Transfers started.
    pub transfers: u32,
    /// Updates rejected by the source; no transfer followed them.
    pub failed_updates: u32,
}

/// Drives a strip from a [`FrameSource`].
pub struct Orchestrator<S> {
    source: S,
    stats: UpdateStats,
}

impl<S: FrameSource> Orchestrator<S> {
    /// Drives updates from `source`.
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self {
            source,
            stats: UpdateStats {
                updates: 0,
                transfers: 0,
                failed_updates: 0,
            },
        }
    }

    /// One update cycle: pull an update, wait for the previous transfer to
    /// finish, start the next one.
    ///
    /// # Errors
    ///
    /// The source's error. It is counted and no transfer is started; the strip
    /// keeps showing the last frame sent.
    pub async fn step(&mut self, strip: &mut Apa102Strip<'_, '_>) -> Result<()> {
        if let Err(err) = self.source.next_update(strip.frame_mut()).await {
            self.stats.failed_updates = self.stats.failed_updates.saturating_add(1);
            return Err(err);
        }
        self.stats.updates = self.stats.updates.saturating_add(1);
        strip.show().await?;
        self.stats.transfers = self.stats.transfers.saturating_add(1);
        Ok(())
    }

    /// Runs [`step`](Self::step) forever, logging rejected updates.
    pub async fn run(&mut self, strip: &mut Apa102Strip<'_, '_>) -> ! {
        loop {
            if let Err(err) = self.step(strip).await {
                #[cfg(feature = "defmt")]
                defmt::warn!("orchestrator: update skipped: {}", defmt::Display2Format(&err));
                #[cfg(not(feature = "defmt"))]
                let _ = err;
            }
        }
    }

    /// Counters since creation.
    #[must_use]
    pub const fn stats(&self) -> UpdateStats {
        self.stats
    }

    /// The update source.
    pub const fn source(&self) -> &S {
        &self.source
    }
}
