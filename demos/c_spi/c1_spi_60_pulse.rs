#![allow(missing_docs)]
#![no_std]
#![no_main]
#![cfg(not(feature = "host"))]

use core::{convert::Infallible, panic};

use dotstar_kit::{
    Error, Result, colors,
    config::StripConfig,
    frame_buffer::FrameBuffer,
    orchestrator::{Orchestrator, TickSource},
    transfer::{Apa102Strip, SpiSink, TransferLink, WireFrame, transfer_loop},
};
use embassy_executor::Spawner;
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{self, Async, Spi};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

const CONFIG: StripConfig = StripConfig::new(60);

type StripSpi = Spi<'static, SPI0, Async>;

static TRANSFER_LINK: TransferLink<'static> = TransferLink::new();
static WIRE_FRAME: StaticCell<WireFrame> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let err = inner_main(spawner).await.unwrap_err();
    panic!("{err}");
}

async fn inner_main(spawner: Spawner) -> Result<Infallible> {
    let p = embassy_rp::init(Default::default());
    CONFIG.validate()?;

    // Default Pico SPI pins: GPIO 18 (SCK) and GPIO 19 (TX).
    let mut spi_config = spi::Config::default();
    spi_config.frequency = CONFIG.output_clock_hz();
    let spi = Spi::new_txonly(p.SPI0, p.PIN_18, p.PIN_19, p.DMA_CH0, spi_config);
    spawner
        .spawn(transfer_task(SpiSink::new(spi)))
        .map_err(Error::TaskSpawn)?;

    let wire_frame = WIRE_FRAME.init_with(WireFrame::new);
    let mut strip = Apa102Strip::new(FrameBuffer::from_config(&CONFIG)?, &TRANSFER_LINK, wire_frame);

    // One bright dot travelling along a dim strip.
    let source = TickSource::new(CONFIG.frame_period(), |tick, frame: &mut FrameBuffer| {
        let head = usize::try_from(tick).unwrap_or_default() % frame.len();
        frame.fill(colors::DARK_BLUE, 1);
        frame.set_led(head, colors::WHITE, 16)
    });
    let mut orchestrator = Orchestrator::new(source);
    orchestrator.run(&mut strip).await
}

#[embassy_executor::task]
async fn transfer_task(sink: SpiSink<StripSpi>) -> ! {
    transfer_loop(&TRANSFER_LINK, sink).await
}
