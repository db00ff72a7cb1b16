//! Example of what the [`apa102_strip!`](crate::apa102_strip!) macro generates.
//!
//! This module uses the macro to generate a real struct so you can inspect the
//! generated API in documentation. Every method reachable from this struct
//! (through `Deref` to [`Apa102Strip`](crate::transfer::Apa102Strip)) is
//! available on any strip created with the macro.
//!
//! # Configuration (Sample Values)
//!
//! - **`clk_pin: PIN_2`**: strip clock input (sample; use any available pin)
//! - **`data_pin: PIN_3`**: strip data input (sample; use any available pin)
//! - **`len: 60`**: 60 LEDs
//! - **`pio: PIO0` (default)**, **`sm: 0` (default)**, **`dma: DMA_CH0` (default)**
//! - **`clock_hz: 5_000_000` (default)**, **`end_frame: EndFrame::Minimal` (default)**
//!
//! # Example Usage
//!
//! [`Apa102StripGenerated`] is equivalent to writing this macro invocation:
//!
//! ```ignore
//! apa102_strip! {
//!     pub Apa102StripGenerated {
//!         clk_pin: PIN_2,
//!         data_pin: PIN_3,
//!         len: 60,
//!     }
//! }
//! ```
//!
//! After creation:
//!
//! ```ignore
//! let strip = Apa102StripGenerated::new(p.PIN_2, p.PIN_3, p.PIO0, p.DMA_CH0, spawner)?;
//! strip.set_led(0, colors::RED, 31)?;
//! strip.start_transfer()?;   // returns at once
//! strip.wait_idle().await;   // or `strip.show().await?` for both
//! ```
//!
//! # Generated Members
//!
//! - `const LEN: usize = 60`
//! - `const CONFIG: StripConfig`: length, clock and end-frame policy
//! - `fn new(clk_pin, data_pin, pio, dma, spawner) -> Result<&'static mut Self>`
//! - `fn from_state_machine(state_machine, clk_pin, data_pin, dma, spawner) -> Result<&'static mut Self>`

use crate::apa102_strip;

apa102_strip! {
    pub Apa102StripGenerated {
        clk_pin: PIN_2,
        data_pin: PIN_3,
        len: 60,
    }
}
