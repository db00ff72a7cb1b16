#![allow(missing_docs)]
#![no_std]
#![no_main]
#![allow(dead_code)]
//! Compile-only check: two strips and a receiver on one PIO.

use core::convert::Infallible;

use dotstar_kit::led_strip::{PioSpiRx, split_pio};
use dotstar_kit::{Result, apa102_strip, colors};
use {defmt_rtt as _, panic_probe as _};

apa102_strip! {
    DotStarLeft {
        pio: PIO1,
        clk_pin: PIN_0,
        data_pin: PIN_1,
        len: 30,
    }
}

apa102_strip! {
    DotStarRight {
        pio: PIO1,
        sm: 2,
        dma: DMA_CH1,
        clk_pin: PIN_4,
        data_pin: PIN_5,
        len: 30,
    }
}

#[embassy_executor::main]
async fn main(spawner: embassy_executor::Spawner) -> ! {
    let err = inner_main(spawner).await.unwrap_err();
    core::panic!("{err}");
}

async fn inner_main(spawner: embassy_executor::Spawner) -> Result<Infallible> {
    let p = embassy_rp::init(Default::default());
    let (sm0, sm1, sm2, _sm3) = split_pio(p.PIO1);

    let left = DotStarLeft::from_state_machine(sm0, p.PIN_0, p.PIN_1, p.DMA_CH0, spawner)?;
    let right = DotStarRight::from_state_machine(sm2, p.PIN_4, p.PIN_5, p.DMA_CH1, spawner)?;
    let _receiver = PioSpiRx::new(
        sm1,
        p.DMA_CH2.into(),
        p.PIN_10,
        p.PIN_11,
        DotStarLeft::CONFIG.ingest_clock_hz(),
    )?;

    left.frame_mut().fill(colors::RED, 8);
    right.frame_mut().fill(colors::BLUE, 8);
    left.show().await?;
    right.show().await?;
    core::future::pending().await
}
