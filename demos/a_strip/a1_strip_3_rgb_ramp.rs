#![allow(missing_docs)]
#![no_std]
#![no_main]
#![cfg(not(feature = "host"))]

use core::{convert::Infallible, panic};

use dotstar_kit::{Result, apa102::MAX_BRIGHTNESS, apa102_strip, colors};
use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

apa102_strip! {
    DotStar3 {
        clk_pin: PIN_2,
        data_pin: PIN_3,
        len: 3,
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let err = inner_main(spawner).await.unwrap_err();
    panic!("{err}");
}

async fn inner_main(spawner: Spawner) -> Result<Infallible> {
    let p = embassy_rp::init(Default::default());

    let strip = DotStar3::new(p.PIN_2, p.PIN_3, p.PIO0, p.DMA_CH0, spawner)?;

    let palette = [colors::RED, colors::GREEN, colors::BLUE];
    loop {
        for brightness in (0..=MAX_BRIGHTNESS).chain((0..MAX_BRIGHTNESS).rev()) {
            for (index, color) in palette.iter().enumerate() {
                strip.set_led(index, *color, brightness)?;
            }
            strip.show().await?;
            Timer::after(Duration::from_millis(40)).await;
        }
    }
}
