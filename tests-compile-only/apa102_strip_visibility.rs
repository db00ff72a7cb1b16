#![allow(missing_docs)]
#![no_std]
#![no_main]
#![allow(dead_code)]
//! Compile-only checks for visibility and optional fields in apa102_strip!.

use dotstar_kit::apa102_strip;
use {defmt_rtt as _, panic_probe as _};

// Public visibility, every optional field set, fields out of order.
apa102_strip! {
    pub DotStarPublic {
        len: 144,
        dma: DMA_CH3,
        data_pin: PIN_5,
        pio: PIO1,
        end_frame: dotstar_kit::frame_buffer::EndFrame::Propagated,
        clock_hz: 8_000_000,
        clk_pin: PIN_4,
    }
}

mod private_case {
    use dotstar_kit::apa102_strip;

    // Private visibility: accessible only inside this module.
    apa102_strip! {
        pub(self) DotStarPrivate {
            clk_pin: PIN_6,
            data_pin: PIN_7,
            len: 8,
        }
    }

    pub fn use_private() {
        type _Test = DotStarPrivate;
        const _: () = assert!(DotStarPrivate::LEN == 8);
    }
}

#[embassy_executor::main]
async fn main(_spawner: embassy_executor::Spawner) {
    // Public type should be accessible here.
    type _Test = DotStarPublic;
    const _: () = assert!(DotStarPublic::CONFIG.output_clock_hz() == 8_000_000);

    // Private type should be accessible only via module helpers.
    private_case::use_private();

    // Uncommenting this should fail (private visibility):
    // type _Private = private_case::DotStarPrivate;
}
