#![allow(missing_docs)]
#![no_std]
#![no_main]
#![cfg(not(feature = "host"))]

use core::{convert::Infallible, panic};

use dotstar_kit::{
    Error, Result, apa102_strip, ingest,
    led_strip::{PioSpiRx, spi_rx_receive_loop, split_pio},
    orchestrator::{IngestSource, Orchestrator},
    switchboard::Switchboard,
};
use embassy_executor::Spawner;
use embassy_rp::peripherals::PIO0;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

const LEN: usize = 60;
const INGEST_LEN: usize = ingest::frame_len(LEN);

type RxBuffer = &'static mut [u8; INGEST_LEN];

apa102_strip! {
    DotStar60 {
        clk_pin: PIN_2,
        data_pin: PIN_3,
        len: LEN,
    }
}

static SWITCHBOARD: Switchboard<RxBuffer> = Switchboard::new();
static RX_BUFFERS: StaticCell<[[u8; INGEST_LEN]; 2]> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let err = inner_main(spawner).await.unwrap_err();
    panic!("{err}");
}

async fn inner_main(spawner: Spawner) -> Result<Infallible> {
    let p = embassy_rp::init(Default::default());

    // Strip on state machine 0, receiver on state machine 1 of the same PIO.
    let (sm0, sm1, _sm2, _sm3) = split_pio(p.PIO0);
    let strip = DotStar60::from_state_machine(sm0, p.PIN_2, p.PIN_3, p.DMA_CH0, spawner)?;

    // SPI master on GPIO 10 (SCK) and GPIO 11 (MOSI).
    let receiver = PioSpiRx::new(
        sm1,
        p.DMA_CH1.into(),
        p.PIN_10,
        p.PIN_11,
        DotStar60::CONFIG.ingest_clock_hz(),
    )?;

    let [active, standby] = RX_BUFFERS.init([[0; INGEST_LEN]; 2]);
    SWITCHBOARD.install_standby(standby)?;
    spawner
        .spawn(spi_rx_task(receiver, active))
        .map_err(Error::TaskSpawn)?;

    let mut orchestrator = Orchestrator::new(IngestSource::new(&SWITCHBOARD));
    orchestrator.run(strip).await
}

#[embassy_executor::task]
async fn spi_rx_task(receiver: PioSpiRx<'static, PIO0, 1>, active: RxBuffer) -> ! {
    spi_rx_receive_loop(receiver, &SWITCHBOARD, active).await
}
