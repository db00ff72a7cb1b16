//! Two-buffer handoff between an asynchronous receiver and a polling consumer.
//!
//! The receiver (a DMA completion handler or the task awaiting it) always owns
//! exactly one buffer, the *active* one, and fills it. When it is full the
//! receiver calls [`Switchboard::receive_complete`], which publishes it as
//! *ready* and hands back the *standby* buffer to fill next. The consumer takes
//! the ready buffer with [`Switchboard::take_ready`] or
//! [`Switchboard::wait_ready`]; dropping the returned [`ReadyBuffer`] gives it
//! back to the switchboard as the next standby.
//!
//! Every role change happens inside a critical section and does constant work,
//! so `receive_complete` may run in interrupt context.
//!
//! Buffers move by value, so the consumer can never see a buffer the receiver is
//! writing. The price of having only two buffers: if the consumer is slower than
//! one receive cycle, frames are dropped. There is no backpressure; drops are
//! counted in [`Switchboard::dropped_frames`].
//!
//! # Example
//!
//! ```
//! use dotstar_kit::switchboard::Switchboard;
//!
//! let switchboard = Switchboard::new();
//! switchboard.install_standby([0u8; 4]).unwrap();
//!
//! // Receiver filled its active buffer.
//! let next = switchboard.receive_complete([1u8; 4]);
//! assert_eq!(next, [0u8; 4]);
//!
//! // Consumer picks it up.
//! let ready = switchboard.take_ready().unwrap();
//! assert_eq!(*ready, [1u8; 4]);
//! ```

use core::cell::RefCell;
use core::ops::Deref;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicU32, Ordering};

use crate::{Error, Result};

enum Outcome {
    Rotated,
    Overwrote,
    Refused,
}

struct Rotation<B> {
    standby: Option<B>,
    ready: Option<B>,
}

/// Double-buffer rotation for an asynchronous ingestion link.
pub struct Switchboard<B> {
    rotation: Mutex<CriticalSectionRawMutex, RefCell<Rotation<B>>>,
    ready_signal: Signal<CriticalSectionRawMutex, ()>,
    published_frames: AtomicU32,
    dropped_frames: AtomicU32,
}

impl<B> Switchboard<B> {
    /// An empty switchboard. Seed it with [`install_standby`](Self::install_standby).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rotation: Mutex::new(RefCell::new(Rotation {
                standby: None,
                ready: None,
            })),
            ready_signal: Signal::new(),
            published_frames: AtomicU32::new(0),
            dropped_frames: AtomicU32::new(0),
        }
    }

    /// Hands the second buffer to the switchboard. The first one stays with the
    /// receiver as its active buffer.
    ///
    /// # Errors
    ///
    /// [`Error::SwitchboardFull`] if a standby buffer is already installed.
    pub fn install_standby(&self, buffer: B) -> Result<()> {
        self.rotation.lock(|cell| {
            let mut rotation = cell.borrow_mut();
            if rotation.standby.is_some() || rotation.ready.is_some() {
                return Err(Error::SwitchboardFull);
            }
            rotation.standby = Some(buffer);
            Ok(())
        })
    }

    /// Publishes a filled buffer and returns the one to fill next.
    ///
    /// - Standby free: `filled` becomes ready, the standby buffer is returned.
    /// - Previous ready buffer never taken: it is overwritten (one dropped frame)
    ///   and comes back to be refilled.
    /// - Consumer still holding the other buffer: `filled` is not published
    ///   (one dropped frame) and comes straight back.
    pub fn receive_complete(&self, filled: B) -> B {
        let (next, outcome) = self.rotation.lock(|cell| {
            let mut rotation = cell.borrow_mut();
            if let Some(stale) = rotation.ready.take() {
                rotation.ready = Some(filled);
                (stale, Outcome::Overwrote)
            } else if let Some(standby) = rotation.standby.take() {
                rotation.ready = Some(filled);
                (standby, Outcome::Rotated)
            } else {
                (filled, Outcome::Refused)
            }
        });
        if matches!(outcome, Outcome::Rotated | Outcome::Overwrote) {
            self.published_frames.fetch_add(1, Ordering::Relaxed);
            self.ready_signal.signal(());
        }
        if matches!(outcome, Outcome::Overwrote | Outcome::Refused) {
            self.dropped_frames.fetch_add(1, Ordering::Relaxed);
        }
        next
    }

    /// Takes the ready buffer, if any.
    pub fn take_ready(&self) -> Option<ReadyBuffer<'_, B>> {
        let buffer = self.rotation.lock(|cell| cell.borrow_mut().ready.take())?;
        Some(ReadyBuffer {
            switchboard: self,
            buffer: Some(buffer),
        })
    }

    /// Waits until a buffer is ready and takes it.
    pub async fn wait_ready(&self) -> ReadyBuffer<'_, B> {
        loop {
            if let Some(ready) = self.take_ready() {
                return ready;
            }
            self.ready_signal.wait().await;
        }
    }

    /// Whether a published buffer is waiting for the consumer.
    #[must_use]
    pub fn has_ready(&self) -> bool {
        self.rotation.lock(|cell| cell.borrow().ready.is_some())
    }

    /// Frames that became ready since creation, including ones later
    /// overwritten before the consumer took them.
    #[must_use]
    pub fn published_frames(&self) -> u32 {
        self.published_frames.load(Ordering::Relaxed)
    }

    /// Frames lost because the consumer fell behind: overwritten ready frames
    /// and frames refused while the consumer held the other buffer.
    #[must_use]
    pub fn dropped_frames(&self) -> u32 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    fn give_back(&self, buffer: B) {
        self.rotation.lock(|cell| {
            let mut rotation = cell.borrow_mut();
            debug_assert!(rotation.standby.is_none(), "switchboard holds three buffers");
            rotation.standby = Some(buffer);
        });
    }
}

impl<B> Default for Switchboard<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// A ready buffer lent to the consumer. Returned to the switchboard on drop.
pub struct ReadyBuffer<'a, B> {
    switchboard: &'a Switchboard<B>,
    buffer: Option<B>,
}

impl<B> Deref for ReadyBuffer<'_, B> {
    type Target = B;

    fn deref(&self) -> &Self::Target {
        // `buffer` is only emptied in `drop`.
        match &self.buffer {
            Some(buffer) => buffer,
            None => unreachable!("ready buffer already returned"),
        }
    }
}

impl<B> Drop for ReadyBuffer<'_, B> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.switchboard.give_back(buffer);
        }
    }
}
