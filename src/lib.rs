//! Double-buffered APA102 (DotStar) LED strip updates for Pico 1 and 2.
//!
//! # Pipeline
//!
//! ```text
//! SPI master ──► PioSpiRx ──► Switchboard ──► Orchestrator ──► Apa102Strip ──► transfer task ──► strip
//!                 (DMA)      (active/ready/     (decode,         (FrameBuffer)   (PIO + DMA or SPI)
//!                             standby)           apply)
//! ```
//!
//! - [`apa102`]: the 32-bit wire word.
//! - [`frame_buffer`]: the full frame, start and end delimiters included.
//! - [`transfer`]: non-blocking hand-off of a frame to the hardware.
//! - [`switchboard`]: two-buffer rotation for the receive side.
//! - [`ingest`]: the byte format sent by the SPI master.
//! - [`orchestrator`]: trigger, apply, transfer.
//! - `led_strip` (target only): PIO programs, the receiver and the [`apa102_strip!`] macro.
//!
//! # Glossary
//!
//! Resources available on the Pico 1 and Pico 2:
//!
//! - **PIO ([Programmable I/O](https://medium.com/data-science/nine-pico-pio-wats-with-rust-part-1-9d062067dc25)):** Pico 1 has 2. Pico 2 has 3.
//! - **DMA ([Direct Memory Access](https://en.wikipedia.org/wiki/Direct_memory_access)):** Both Pico 1 and 2 have 12 channels.
#![cfg_attr(not(feature = "host"), no_std)]
#![cfg_attr(not(feature = "host"), no_main)]
#![allow(async_fn_in_trait, reason = "single-threaded embedded")]

// Compile-time checks: exactly one board must be selected (unless testing with host feature)
#[cfg(all(not(any(feature = "pico1", feature = "pico2")), not(feature = "host")))]
compile_error!("Must enable exactly one board feature: 'pico1' or 'pico2'");

#[cfg(all(feature = "pico1", feature = "pico2"))]
compile_error!("Cannot enable both 'pico1' and 'pico2' features simultaneously");

#[cfg(all(not(feature = "arm"), not(feature = "host")))]
compile_error!("Must enable the 'arm' architecture feature");

pub mod apa102;
pub mod config;
mod error;
pub mod frame_buffer;
pub mod ingest;
pub mod orchestrator;
pub mod switchboard;
pub mod transfer;
// These modules require embassy_rp and are excluded when testing on host
#[cfg(not(feature = "host"))]
pub mod led_strip;
// PIO interrupt bindings - shared by strips and receivers
#[cfg(not(feature = "host"))]
#[doc(hidden)]
pub mod pio_irqs;

/// RGB color representation re-exported from the `smart_leds` crate.
pub type Rgb = smart_leds::RGB8;

/// Predefined RGB color constants from the `smart_leds` crate.
#[doc(inline)]
pub use smart_leds::colors;

// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};
