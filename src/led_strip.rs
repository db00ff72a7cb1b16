//! APA102 (DotStar) strips and the SPI ingestion link on RP2040/RP2350 PIO.
//!
//! See [`Apa102StripGenerated`](led_strip_generated::Apa102StripGenerated) for
//! a concrete generated-struct example and [`apa102_strip!`] for the macro that
//! builds these types.
//!
//! An APA102 strip needs two pins: clock and data. One PIO state machine drives
//! both, shifting each 32-bit word out MSB first on the data pin while toggling
//! the clock on the side-set pin. A DMA channel feeds the state machine from the
//! strip's [`WireFrame`](crate::transfer::WireFrame), so the CPU is free during
//! a transfer.
//!
//! A PIO has four state machines. [`split_pio`] hands them out over one shared
//! bus so several strips, or a strip and a [`PioSpiRx`], can use the same PIO.
//!
//! # Example: Show a Frame
//!
//! ```no_run
//! # #![no_std]
//! # #![no_main]
//! # use panic_probe as _;
//! # use core::convert::Infallible;
//! # use core::default::Default;
//! # use core::result::Result::Ok;
//! use dotstar_kit::{Result, apa102_strip, colors};
//!
//! apa102_strip! {
//!     DotStar {
//!         clk_pin: PIN_2,  // strip CI
//!         data_pin: PIN_3, // strip DI
//!         len: 60,
//!         // other inputs set to their defaults
//!     }
//! }
//!
//! # #[embassy_executor::main]
//! # async fn main(spawner: embassy_executor::Spawner) -> ! {
//! #     let err = example(spawner).await.unwrap_err();
//! #     core::panic!("{err}");
//! # }
//! async fn example(spawner: embassy_executor::Spawner) -> Result<Infallible> {
//!     let p = embassy_rp::init(Default::default());
//!     let strip = DotStar::new(p.PIN_2, p.PIN_3, p.PIO0, p.DMA_CH0, spawner)?;
//!
//!     strip.frame_mut().fill(colors::BLUE, 4);
//!     strip.set_led(0, colors::RED, 31)?;
//!     strip.show().await?;
//!     core::future::pending().await // run forever
//! }
//! ```

use core::cell::RefCell;

use embassy_rp::Peri;
use embassy_rp::clocks::clk_sys_freq;
use embassy_rp::dma::AnyChannel;
use embassy_rp::pio::{
    Common, Config, Direction, FifoJoin, Instance, LoadedProgram, Pio, PioPin, ShiftConfig,
    ShiftDirection, StateMachine,
};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::once_lock::OnceLock;
use pio::{Assembler, InSource, OutDestination, SideSet, WaitSource};
use static_cell::StaticCell;

use crate::config::{INGEST_CYCLES_PER_BIT, OUTPUT_CYCLES_PER_BIT, clock_divider};
use crate::ingest::{Alignment, alignment};
use crate::switchboard::Switchboard;
use crate::transfer::WireSink;
use crate::Result;

pub mod led_strip_generated;

// ============================================================================
// PIO programs
// ============================================================================

/// Shifts 32-bit words out MSB first, one bit per two cycles.
///
/// ```text
/// .side_set 1
/// .wrap_target
///     out pins, 1   side 0   ; data changes while clock is low
///     nop           side 1   ; strip samples on the rising edge
/// .wrap
/// ```
#[doc(hidden)] // Loaded once per PIO by `PioBus`
pub struct Apa102Program<'d, PIO: Instance> {
    program: LoadedProgram<'d, PIO>,
}

impl<'d, PIO: Instance> Apa102Program<'d, PIO> {
    /// Assembles the program and loads it into `common`.
    pub fn new(common: &mut Common<'d, PIO>) -> Self {
        let side_set = SideSet::new(false, 1, false);
        let mut assembler: Assembler<32> = Assembler::new_with_side_set(side_set);
        let mut wrap_target = assembler.label();
        let mut wrap_source = assembler.label();
        assembler.bind(&mut wrap_target);
        assembler.out_with_side_set(OutDestination::PINS, 1, 0);
        assembler.nop_with_side_set(1);
        assembler.bind(&mut wrap_source);
        let program = assembler.assemble_with_wrap(wrap_source, wrap_target);
        Self {
            program: common.load_program(&program),
        }
    }
}

/// Samples the data pin on each rising clock edge from an external SPI master.
///
/// `clk` is the absolute GPIO number of the clock pin.
///
/// ```text
/// .wrap_target
///     wait 0 gpio clk
///     wait 1 gpio clk
///     in pins, 1
/// .wrap
/// ```
fn load_spi_rx_program<'d, PIO: Instance>(
    common: &mut Common<'d, PIO>,
    clk: u8,
) -> LoadedProgram<'d, PIO> {
    let mut assembler: Assembler<32> = Assembler::new();
    let mut wrap_target = assembler.label();
    let mut wrap_source = assembler.label();
    assembler.bind(&mut wrap_target);
    assembler.wait(0, WaitSource::GPIO, clk, false);
    assembler.wait(1, WaitSource::GPIO, clk, false);
    assembler.r#in(InSource::PINS, 1);
    assembler.bind(&mut wrap_source);
    let program = assembler.assemble_with_wrap(wrap_source, wrap_target);
    common.load_program(&program)
}

// ============================================================================
// PIO Bus - Shared PIO resource
// ============================================================================

/// Trait for PIO peripherals that can drive APA102 strips.
#[doc(hidden)] // Required pub for macro expansion in downstream crates
pub trait Apa102Pio: Instance + 'static {
    /// The interrupt binding type for this PIO
    type Irqs: embassy_rp::interrupt::typelevel::Binding<
            <Self as Instance>::Interrupt,
            embassy_rp::pio::InterruptHandler<Self>,
        >;

    /// Get the interrupt configuration
    fn irqs() -> Self::Irqs;

    /// The one bus this PIO can be split into
    fn bus_cell() -> &'static StaticCell<PioBus<'static, Self>>;
}

/// Shared PIO bus that manages the Common resource and the APA102 program
#[doc(hidden)] // Support type for macro-generated strip types; not intended as surface API
pub struct PioBus<'d, PIO: Instance> {
    common: Mutex<CriticalSectionRawMutex, RefCell<Common<'d, PIO>>>,
    apa102_program: OnceLock<Apa102Program<'d, PIO>>,
}

impl<'d, PIO: Instance> PioBus<'d, PIO> {
    /// Create a new PIO bus with the given Common resource
    pub fn new(common: Common<'d, PIO>) -> Self {
        Self {
            common: Mutex::new(RefCell::new(common)),
            apa102_program: OnceLock::new(),
        }
    }

    /// Get or initialize the APA102 program (only loaded once)
    pub fn apa102_program(&'static self) -> &'static Apa102Program<'d, PIO> {
        self.apa102_program
            .get_or_init(|| self.with_common(|common| Apa102Program::new(common)))
    }

    /// Access the common resource for initializing a driver
    pub fn with_common<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Common<'d, PIO>) -> R,
    {
        self.common.lock(|common_cell: &RefCell<Common<'d, PIO>>| {
            let mut common = common_cell.borrow_mut();
            f(&mut *common)
        })
    }
}

/// One state machine of a split PIO, paired with the bus it shares.
///
/// Created by [`split_pio`]. Strips and receivers built from state machines of
/// the same PIO share its instruction memory; the APA102 program is loaded once.
pub struct PioStateMachine<PIO: Instance + 'static, const SM: usize> {
    bus: &'static PioBus<'static, PIO>,
    sm: StateMachine<'static, PIO, SM>,
}

impl<PIO: Instance + 'static, const SM: usize> PioStateMachine<PIO, SM> {
    #[doc(hidden)]
    pub fn new(bus: &'static PioBus<'static, PIO>, sm: StateMachine<'static, PIO, SM>) -> Self {
        Self { bus, sm }
    }

    #[doc(hidden)]
    pub fn into_parts(self) -> (&'static PioBus<'static, PIO>, StateMachine<'static, PIO, SM>) {
        (self.bus, self.sm)
    }
}

/// Splits a PIO into its four state machines over one shared bus.
///
/// # Panics
///
/// If the same PIO is split twice.
pub fn split_pio<PIO: Apa102Pio>(
    pio: Peri<'static, PIO>,
) -> (
    PioStateMachine<PIO, 0>,
    PioStateMachine<PIO, 1>,
    PioStateMachine<PIO, 2>,
    PioStateMachine<PIO, 3>,
) {
    let Pio {
        common,
        sm0,
        sm1,
        sm2,
        sm3,
        ..
    } = Pio::new(pio, PIO::irqs());
    let bus = PIO::bus_cell().init_with(|| PioBus::new(common));
    (
        PioStateMachine::new(bus, sm0),
        PioStateMachine::new(bus, sm1),
        PioStateMachine::new(bus, sm2),
        PioStateMachine::new(bus, sm3),
    )
}

// ============================================================================
// Output: PIO + DMA wire sink
// ============================================================================

/// [`WireSink`] that streams words through a PIO state machine fed by DMA.
pub struct PioApa102<'d, PIO: Instance, const SM: usize> {
    sm: StateMachine<'d, PIO, SM>,
    dma: Peri<'d, AnyChannel>,
}

impl<PIO: Instance + 'static, const SM: usize> PioApa102<'static, PIO, SM> {
    /// Configures the state machine to clock words out on `clk`/`data` at
    /// `clock_hz`.
    ///
    /// # Errors
    ///
    /// [`Error::ClockOutOfRange`](crate::Error::ClockOutOfRange) if `clock_hz`
    /// cannot be reached from the system clock.
    pub fn new(
        state_machine: PioStateMachine<PIO, SM>,
        dma: Peri<'static, AnyChannel>,
        clk: Peri<'static, impl PioPin>,
        data: Peri<'static, impl PioPin>,
        clock_hz: u32,
    ) -> Result<Self> {
        let divider = clock_divider(clk_sys_freq(), clock_hz, OUTPUT_CYCLES_PER_BIT)?;
        let (bus, mut sm) = state_machine.into_parts();
        let program = bus.apa102_program();
        bus.with_common(|common| {
            let clk_pin = common.make_pio_pin(clk);
            let data_pin = common.make_pio_pin(data);
            sm.set_pin_dirs(Direction::Out, &[&clk_pin, &data_pin]);

            let mut cfg = Config::default();
            cfg.use_program(&program.program, &[&clk_pin]);
            cfg.set_out_pins(&[&data_pin]);
            cfg.clock_divider = divider;
            cfg.fifo_join = FifoJoin::TxOnly;
            cfg.shift_out = ShiftConfig {
                auto_fill: true,
                threshold: 32,
                direction: ShiftDirection::Left,
            };
            sm.set_config(&cfg);
        });
        sm.set_enable(true);
        #[cfg(feature = "defmt")]
        defmt::info!("apa102: {} Hz, divider {}", clock_hz, divider.to_bits());
        Ok(Self { sm, dma })
    }
}

impl<PIO: Instance, const SM: usize> WireSink for PioApa102<'_, PIO, SM> {
    async fn write_words(&mut self, words: &[u32]) -> Result<()> {
        self.sm
            .tx()
            .dma_push(self.dma.reborrow(), words, false)
            .await;
        Ok(())
    }
}

// ============================================================================
// Input: PIO SPI-slave receiver
// ============================================================================

/// Receive-only SPI slave (mode 0) on a PIO state machine, read out by DMA.
///
/// There is no chip select: the receiver relies on the sync marker of the
/// [`ingest`](crate::ingest) format to find frame boundaries.
pub struct PioSpiRx<'d, PIO: Instance, const SM: usize> {
    sm: StateMachine<'d, PIO, SM>,
    dma: Peri<'d, AnyChannel>,
}

impl<PIO: Instance + 'static, const SM: usize> PioSpiRx<'static, PIO, SM> {
    /// Configures the state machine to sample `data` on rising edges of `clk`,
    /// oversampling a master clocked at up to `clock_hz`.
    ///
    /// # Errors
    ///
    /// [`Error::ClockOutOfRange`](crate::Error::ClockOutOfRange) if the
    /// oversampling rate cannot be reached from the system clock.
    pub fn new(
        state_machine: PioStateMachine<PIO, SM>,
        dma: Peri<'static, AnyChannel>,
        clk: Peri<'static, impl PioPin>,
        data: Peri<'static, impl PioPin>,
        clock_hz: u32,
    ) -> Result<Self> {
        let divider = clock_divider(clk_sys_freq(), clock_hz, INGEST_CYCLES_PER_BIT)?;
        let (bus, mut sm) = state_machine.into_parts();
        let clk_gpio = clk.pin();
        bus.with_common(|common| {
            let program = load_spi_rx_program(common, clk_gpio);
            let clk_pin = common.make_pio_pin(clk);
            let data_pin = common.make_pio_pin(data);
            sm.set_pin_dirs(Direction::In, &[&clk_pin, &data_pin]);

            let mut cfg = Config::default();
            cfg.use_program(&program, &[]);
            cfg.set_in_pins(&[&data_pin]);
            cfg.clock_divider = divider;
            cfg.fifo_join = FifoJoin::RxOnly;
            cfg.shift_in = ShiftConfig {
                auto_fill: true,
                threshold: 8,
                direction: ShiftDirection::Left,
            };
            sm.set_config(&cfg);
        });
        sm.set_enable(true);
        Ok(Self { sm, dma })
    }
}

impl<PIO: Instance, const SM: usize> PioSpiRx<'_, PIO, SM> {
    /// Fills `buffer` with the next `buffer.len()` bytes from the master.
    pub async fn receive(&mut self, buffer: &mut [u8]) {
        self.sm
            .rx()
            .dma_pull(self.dma.reborrow(), buffer, false)
            .await;
    }

    /// Drops the next `count` bytes to realign on a frame boundary.
    pub async fn discard(&mut self, count: usize) {
        for _ in 0..count {
            let _ = self.sm.rx().wait_pull().await;
        }
    }
}

/// Receiver task body: fill the active buffer, publish it, repeat.
///
/// Only buffers that [`alignment`] accepts as complete, valid updates are
/// published. Otherwise, when a sync marker shows up past the start, the
/// receiver skips ahead to it before the next receive.
pub async fn spi_rx_receive_loop<PIO, const SM: usize, B>(
    mut receiver: PioSpiRx<'static, PIO, SM>,
    switchboard: &'static Switchboard<B>,
    mut active: B,
) -> !
where
    PIO: Instance,
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    loop {
        receiver.receive(active.as_mut()).await;
        match alignment(active.as_ref()) {
            Alignment::Aligned => active = switchboard.receive_complete(active),
            Alignment::Shifted(offset) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("spi_rx: desync, skipping {} bytes", offset);
                receiver.discard(offset).await;
            }
            Alignment::Lost => {
                #[cfg(feature = "defmt")]
                defmt::warn!("spi_rx: no sync marker in {} bytes", active.as_ref().len());
            }
        }
    }
}

// ============================================================================
// apa102_strip! macro
// ============================================================================

/// Macro to generate an APA102 strip struct type.
///
/// See [`Apa102StripGenerated`](led_strip_generated::Apa102StripGenerated) for
/// a sample of what the macro generates.
///
/// # Required Fields
///
/// - `clk_pin`: GPIO pin wired to the strip's clock input (CI)
/// - `data_pin`: GPIO pin wired to the strip's data input (DI)
/// - `len`: Number of LEDs (at most [`MAX_STRIP_LEN`](crate::frame_buffer::MAX_STRIP_LEN))
///
/// # Optional Fields
///
/// - `pio`: PIO resource (default: `PIO0`)
/// - `sm`: State machine index on that PIO, 0 to 3 (default: 0)
/// - `dma`: DMA channel (default: `DMA_CH0`)
/// - `clock_hz`: Output clock (default: [`OUTPUT_CLOCK_HZ_DEFAULT`](crate::config::OUTPUT_CLOCK_HZ_DEFAULT))
/// - `end_frame`: End-frame policy (default: [`END_FRAME_DEFAULT`](crate::config::END_FRAME_DEFAULT))
///
/// The generated `new` takes the whole PIO. `from_state_machine` takes one
/// state machine from [`split_pio`], so several strips, or a strip and a
/// [`PioSpiRx`], can share a PIO. Both spawn the transfer task and return a
/// `&'static mut` handle that derefs to [`Apa102Strip`](crate::transfer::Apa102Strip).
#[macro_export]
macro_rules! apa102_strip {
    ($($tt:tt)*) => { $crate::__apa102_strip_impl! { $($tt)* } };
}

/// Implementation macro. Not part of the public API; use [`apa102_strip!`] instead.
#[doc(hidden)]
#[macro_export]
macro_rules! __apa102_strip_impl {
    // Entry point - visibility, name and fields
    (
        $vis:vis $name:ident {
            $($fields:tt)*
        }
    ) => {
        $crate::__apa102_strip_impl! {
            @__fill_defaults
            vis: $vis,
            name: $name,
            pio: PIO0,
            sm: 0,
            clk_pin: _UNSET_,
            data_pin: _UNSET_,
            dma: DMA_CH0,
            len: _UNSET_,
            clock_hz: $crate::config::OUTPUT_CLOCK_HZ_DEFAULT,
            end_frame: $crate::config::END_FRAME_DEFAULT,
            fields: [ $($fields)* ]
        }
    };

    // Fill defaults: pio
    (@__fill_defaults
        vis: $vis:vis,
        name: $name:ident,
        pio: $pio:ident,
        sm: $sm:tt,
        clk_pin: $clk_pin:tt,
        data_pin: $data_pin:tt,
        dma: $dma:ident,
        len: $len:tt,
        clock_hz: $clock_hz:expr,
        end_frame: $end_frame:expr,
        fields: [ pio: $new_pio:ident $(, $($rest:tt)* )? ]
    ) => {
        $crate::__apa102_strip_impl! {
            @__fill_defaults
            vis: $vis,
            name: $name,
            pio: $new_pio,
            sm: $sm,
            clk_pin: $clk_pin,
            data_pin: $data_pin,
            dma: $dma,
            len: $len,
            clock_hz: $clock_hz,
            end_frame: $end_frame,
            fields: [ $($($rest)*)? ]
        }
    };

    // Fill defaults: sm
    (@__fill_defaults
        vis: $vis:vis,
        name: $name:ident,
        pio: $pio:ident,
        sm: $sm:tt,
        clk_pin: $clk_pin:tt,
        data_pin: $data_pin:tt,
        dma: $dma:ident,
        len: $len:tt,
        clock_hz: $clock_hz:expr,
        end_frame: $end_frame:expr,
        fields: [ sm: $new_sm:tt $(, $($rest:tt)* )? ]
    ) => {
        $crate::__apa102_strip_impl! {
            @__fill_defaults
            vis: $vis,
            name: $name,
            pio: $pio,
            sm: $new_sm,
            clk_pin: $clk_pin,
            data_pin: $data_pin,
            dma: $dma,
            len: $len,
            clock_hz: $clock_hz,
            end_frame: $end_frame,
            fields: [ $($($rest)*)? ]
        }
    };

    // Fill defaults: clk_pin
    (@__fill_defaults
        vis: $vis:vis,
        name: $name:ident,
        pio: $pio:ident,
        sm: $sm:tt,
        clk_pin: $clk_pin:tt,
        data_pin: $data_pin:tt,
        dma: $dma:ident,
        len: $len:tt,
        clock_hz: $clock_hz:expr,
        end_frame: $end_frame:expr,
        fields: [ clk_pin: $new_clk_pin:ident $(, $($rest:tt)* )? ]
    ) => {
        $crate::__apa102_strip_impl! {
            @__fill_defaults
            vis: $vis,
            name: $name,
            pio: $pio,
            sm: $sm,
            clk_pin: $new_clk_pin,
            data_pin: $data_pin,
            dma: $dma,
            len: $len,
            clock_hz: $clock_hz,
            end_frame: $end_frame,
            fields: [ $($($rest)*)? ]
        }
    };

    // Fill defaults: data_pin
    (@__fill_defaults
        vis: $vis:vis,
        name: $name:ident,
        pio: $pio:ident,
        sm: $sm:tt,
        clk_pin: $clk_pin:tt,
        data_pin: $data_pin:tt,
        dma: $dma:ident,
        len: $len:tt,
        clock_hz: $clock_hz:expr,
        end_frame: $end_frame:expr,
        fields: [ data_pin: $new_data_pin:ident $(, $($rest:tt)* )? ]
    ) => {
        $crate::__apa102_strip_impl! {
            @__fill_defaults
            vis: $vis,
            name: $name,
            pio: $pio,
            sm: $sm,
            clk_pin: $clk_pin,
            data_pin: $new_data_pin,
            dma: $dma,
            len: $len,
            clock_hz: $clock_hz,
            end_frame: $end_frame,
            fields: [ $($($rest)*)? ]
        }
    };

    // Fill defaults: dma
    (@__fill_defaults
        vis: $vis:vis,
        name: $name:ident,
        pio: $pio:ident,
        sm: $sm:tt,
        clk_pin: $clk_pin:tt,
        data_pin: $data_pin:tt,
        dma: $dma:ident,
        len: $len:tt,
        clock_hz: $clock_hz:expr,
        end_frame: $end_frame:expr,
        fields: [ dma: $new_dma:ident $(, $($rest:tt)* )? ]
    ) => {
        $crate::__apa102_strip_impl! {
            @__fill_defaults
            vis: $vis,
            name: $name,
            pio: $pio,
            sm: $sm,
            clk_pin: $clk_pin,
            data_pin: $data_pin,
            dma: $new_dma,
            len: $len,
            clock_hz: $clock_hz,
            end_frame: $end_frame,
            fields: [ $($($rest)*)? ]
        }
    };

    // Fill defaults: len
    (@__fill_defaults
        vis: $vis:vis,
        name: $name:ident,
        pio: $pio:ident,
        sm: $sm:tt,
        clk_pin: $clk_pin:tt,
        data_pin: $data_pin:tt,
        dma: $dma:ident,
        len: $len:tt,
        clock_hz: $clock_hz:expr,
        end_frame: $end_frame:expr,
        fields: [ len: $new_len:expr $(, $($rest:tt)* )? ]
    ) => {
        $crate::__apa102_strip_impl! {
            @__fill_defaults
            vis: $vis,
            name: $name,
            pio: $pio,
            sm: $sm,
            clk_pin: $clk_pin,
            data_pin: $data_pin,
            dma: $dma,
            len: { $new_len },
            clock_hz: $clock_hz,
            end_frame: $end_frame,
            fields: [ $($($rest)*)? ]
        }
    };

    // Fill defaults: clock_hz
    (@__fill_defaults
        vis: $vis:vis,
        name: $name:ident,
        pio: $pio:ident,
        sm: $sm:tt,
        clk_pin: $clk_pin:tt,
        data_pin: $data_pin:tt,
        dma: $dma:ident,
        len: $len:tt,
        clock_hz: $clock_hz:expr,
        end_frame: $end_frame:expr,
        fields: [ clock_hz: $new_clock_hz:expr $(, $($rest:tt)* )? ]
    ) => {
        $crate::__apa102_strip_impl! {
            @__fill_defaults
            vis: $vis,
            name: $name,
            pio: $pio,
            sm: $sm,
            clk_pin: $clk_pin,
            data_pin: $data_pin,
            dma: $dma,
            len: $len,
            clock_hz: $new_clock_hz,
            end_frame: $end_frame,
            fields: [ $($($rest)*)? ]
        }
    };

    // Fill defaults: end_frame
    (@__fill_defaults
        vis: $vis:vis,
        name: $name:ident,
        pio: $pio:ident,
        sm: $sm:tt,
        clk_pin: $clk_pin:tt,
        data_pin: $data_pin:tt,
        dma: $dma:ident,
        len: $len:tt,
        clock_hz: $clock_hz:expr,
        end_frame: $end_frame:expr,
        fields: [ end_frame: $new_end_frame:expr $(, $($rest:tt)* )? ]
    ) => {
        $crate::__apa102_strip_impl! {
            @__fill_defaults
            vis: $vis,
            name: $name,
            pio: $pio,
            sm: $sm,
            clk_pin: $clk_pin,
            data_pin: $data_pin,
            dma: $dma,
            len: $len,
            clock_hz: $clock_hz,
            end_frame: $new_end_frame,
            fields: [ $($($rest)*)? ]
        }
    };

    // Required fields still unset
    (@__fill_defaults
        vis: $vis:vis,
        name: $name:ident,
        pio: $pio:ident,
        sm: $sm:tt,
        clk_pin: _UNSET_,
        $($rest:tt)*
    ) => {
        compile_error!("apa102_strip! requires `clk_pin`");
    };
    (@__fill_defaults
        vis: $vis:vis,
        name: $name:ident,
        pio: $pio:ident,
        sm: $sm:tt,
        clk_pin: $clk_pin:ident,
        data_pin: _UNSET_,
        $($rest:tt)*
    ) => {
        compile_error!("apa102_strip! requires `data_pin`");
    };
    (@__fill_defaults
        vis: $vis:vis,
        name: $name:ident,
        pio: $pio:ident,
        sm: $sm:tt,
        clk_pin: $clk_pin:ident,
        data_pin: $data_pin:ident,
        dma: $dma:ident,
        len: _UNSET_,
        $($rest:tt)*
    ) => {
        compile_error!("apa102_strip! requires `len`");
    };

    // All fields processed - expand the type
    (@__fill_defaults
        vis: $vis:vis,
        name: $name:ident,
        pio: $pio:ident,
        sm: $sm:tt,
        clk_pin: $clk_pin:ident,
        data_pin: $data_pin:ident,
        dma: $dma:ident,
        len: $len:expr,
        clock_hz: $clock_hz:expr,
        end_frame: $end_frame:expr,
        fields: []
    ) => {
        ::paste::paste! {
            /// APA102 strip generated by `apa102_strip!`.
            ///
            /// Derefs to `Apa102Strip`: edit the frame, then `show` or `start_transfer`.
            $vis struct $name {
                strip: $crate::transfer::Apa102Strip<'static, 'static>,
            }

            impl $name {
                /// The number of LEDs in this strip (the `len` field of the macro).
                pub const LEN: usize = $len;

                /// Settings this strip is built with.
                pub const CONFIG: $crate::config::StripConfig = $crate::config::StripConfig::new($len)
                    .with_output_clock_hz($clock_hz)
                    .with_end_frame($end_frame);

                /// Splits the whole PIO and builds the strip on state machine
                /// `sm`. Call once.
                ///
                /// To share the PIO with other strips or a receiver, split it
                /// with `split_pio` and use `from_state_machine` instead.
                ///
                /// # Errors
                ///
                /// Strip too long, output clock out of range, or the transfer
                /// task could not be spawned.
                $vis fn new(
                    clk_pin: impl Into<::embassy_rp::Peri<'static, ::embassy_rp::peripherals::$clk_pin>>,
                    data_pin: impl Into<::embassy_rp::Peri<'static, ::embassy_rp::peripherals::$data_pin>>,
                    pio: ::embassy_rp::Peri<'static, ::embassy_rp::peripherals::$pio>,
                    dma: impl Into<::embassy_rp::Peri<'static, ::embassy_rp::peripherals::$dma>>,
                    spawner: ::embassy_executor::Spawner,
                ) -> $crate::Result<&'static mut Self> {
                    #[allow(unused_variables)]
                    let (sm0, sm1, sm2, sm3) = $crate::led_strip::split_pio(pio);
                    let state_machine = $crate::__apa102_strip_impl!(@__select_sm $sm, sm0, sm1, sm2, sm3);
                    Self::from_state_machine(state_machine, clk_pin, data_pin, dma, spawner)
                }

                /// Sets up the state machine and DMA channel and spawns the
                /// transfer task. Call once.
                ///
                /// # Errors
                ///
                /// Strip too long, output clock out of range, or the transfer
                /// task could not be spawned.
                $vis fn from_state_machine(
                    state_machine: $crate::led_strip::PioStateMachine<::embassy_rp::peripherals::$pio, $sm>,
                    clk_pin: impl Into<::embassy_rp::Peri<'static, ::embassy_rp::peripherals::$clk_pin>>,
                    data_pin: impl Into<::embassy_rp::Peri<'static, ::embassy_rp::peripherals::$data_pin>>,
                    dma: impl Into<::embassy_rp::Peri<'static, ::embassy_rp::peripherals::$dma>>,
                    spawner: ::embassy_executor::Spawner,
                ) -> $crate::Result<&'static mut Self> {
                    static TRANSFER_LINK: $crate::transfer::TransferLink<'static> =
                        $crate::transfer::TransferLink::new();
                    static WIRE_FRAME: ::static_cell::StaticCell<$crate::transfer::WireFrame> =
                        ::static_cell::StaticCell::new();
                    static STRIP_CELL: ::static_cell::StaticCell<$name> = ::static_cell::StaticCell::new();

                    Self::CONFIG.validate()?;
                    let frame = $crate::frame_buffer::FrameBuffer::from_config(&Self::CONFIG)?;

                    let dma: ::embassy_rp::Peri<'static, ::embassy_rp::peripherals::$dma> = dma.into();
                    let clk_pin: ::embassy_rp::Peri<'static, ::embassy_rp::peripherals::$clk_pin> =
                        clk_pin.into();
                    let data_pin: ::embassy_rp::Peri<'static, ::embassy_rp::peripherals::$data_pin> =
                        data_pin.into();
                    let sink = $crate::led_strip::PioApa102::new(
                        state_machine,
                        dma.into(),
                        clk_pin,
                        data_pin,
                        Self::CONFIG.output_clock_hz(),
                    )?;

                    let token = [<$name:snake _transfer_task>](sink, &TRANSFER_LINK);
                    spawner.spawn(token).map_err($crate::Error::TaskSpawn)?;

                    let wire_frame = WIRE_FRAME.init_with($crate::transfer::WireFrame::new);
                    let strip = $crate::transfer::Apa102Strip::new(frame, &TRANSFER_LINK, wire_frame);
                    Ok(STRIP_CELL.init($name { strip }))
                }
            }

            impl ::core::ops::Deref for $name {
                type Target = $crate::transfer::Apa102Strip<'static, 'static>;

                fn deref(&self) -> &Self::Target {
                    &self.strip
                }
            }

            impl ::core::ops::DerefMut for $name {
                fn deref_mut(&mut self) -> &mut Self::Target {
                    &mut self.strip
                }
            }

            #[::embassy_executor::task]
            async fn [<$name:snake _transfer_task>](
                sink: $crate::led_strip::PioApa102<'static, ::embassy_rp::peripherals::$pio, $sm>,
                link: &'static $crate::transfer::TransferLink<'static>,
            ) -> ! {
                $crate::transfer::transfer_loop(link, sink).await
            }
        }
    };

    // Helper to select the right SM based on index
    (@__select_sm 0, $sm0:ident, $sm1:ident, $sm2:ident, $sm3:ident) => { $sm0 };
    (@__select_sm 1, $sm0:ident, $sm1:ident, $sm2:ident, $sm3:ident) => { $sm1 };
    (@__select_sm 2, $sm0:ident, $sm1:ident, $sm2:ident, $sm3:ident) => { $sm2 };
    (@__select_sm 3, $sm0:ident, $sm1:ident, $sm2:ident, $sm3:ident) => { $sm3 };
    (@__select_sm $other:tt, $($rest:tt)*) => {
        compile_error!("apa102_strip! `sm` must be 0, 1, 2 or 3")
    };
}

pub use apa102_strip;

// Implement Apa102Pio for all PIO peripherals
impl Apa102Pio for embassy_rp::peripherals::PIO0 {
    type Irqs = crate::pio_irqs::Pio0Irqs;

    fn irqs() -> Self::Irqs {
        crate::pio_irqs::Pio0Irqs
    }

    fn bus_cell() -> &'static StaticCell<PioBus<'static, Self>> {
        static BUS: StaticCell<PioBus<'static, embassy_rp::peripherals::PIO0>> = StaticCell::new();
        &BUS
    }
}

impl Apa102Pio for embassy_rp::peripherals::PIO1 {
    type Irqs = crate::pio_irqs::Pio1Irqs;

    fn irqs() -> Self::Irqs {
        crate::pio_irqs::Pio1Irqs
    }

    fn bus_cell() -> &'static StaticCell<PioBus<'static, Self>> {
        static BUS: StaticCell<PioBus<'static, embassy_rp::peripherals::PIO1>> = StaticCell::new();
        &BUS
    }
}

#[cfg(feature = "pico2")]
impl Apa102Pio for embassy_rp::peripherals::PIO2 {
    type Irqs = crate::pio_irqs::Pio2Irqs;

    fn irqs() -> Self::Irqs {
        crate::pio_irqs::Pio2Irqs
    }

    fn bus_cell() -> &'static StaticCell<PioBus<'static, Self>> {
        static BUS: StaticCell<PioBus<'static, embassy_rp::peripherals::PIO2>> = StaticCell::new();
        &BUS
    }
}
