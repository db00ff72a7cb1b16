#![allow(missing_docs)]
//! Host-level tests for strip configuration and PIO clock dividers.

use dotstar_kit::Error;
use dotstar_kit::config::{
    FRAME_PERIOD_DEFAULT, INGEST_CLOCK_HZ_DEFAULT, INGEST_CYCLES_PER_BIT, OUTPUT_CLOCK_HZ_DEFAULT,
    OUTPUT_CYCLES_PER_BIT, StripConfig, clock_divider,
};
use dotstar_kit::frame_buffer::EndFrame;
use embassy_time::Duration;
use fixed::types::U24F8;

#[test]
fn defaults_match_reference_hardware() {
    let config = StripConfig::new(60);
    assert_eq!(config.len(), 60);
    assert_eq!(config.output_clock_hz(), 5_000_000);
    assert_eq!(config.ingest_clock_hz(), 1_000_000);
    assert_eq!(config.end_frame(), EndFrame::Minimal);
    assert_eq!(config.frame_period(), Duration::from_millis(41));
    assert_eq!(OUTPUT_CLOCK_HZ_DEFAULT, 5_000_000);
    assert_eq!(INGEST_CLOCK_HZ_DEFAULT, 1_000_000);
    assert_eq!(FRAME_PERIOD_DEFAULT, Duration::from_millis(1000 / 24));
    assert!(config.validate().is_ok());
}

#[test]
fn builders_override_fields() {
    const CONFIG: StripConfig = StripConfig::new(8)
        .with_output_clock_hz(1_000_000)
        .with_ingest_clock_hz(500_000)
        .with_end_frame(EndFrame::Propagated)
        .with_frame_period(Duration::from_millis(10));
    assert_eq!(CONFIG.output_clock_hz(), 1_000_000);
    assert_eq!(CONFIG.ingest_clock_hz(), 500_000);
    assert_eq!(CONFIG.end_frame(), EndFrame::Propagated);
    assert_eq!(CONFIG.frame_period(), Duration::from_millis(10));
}

#[test]
fn validate_rejects_long_strips_and_zero_clocks() {
    assert!(matches!(
        StripConfig::new(1001).validate(),
        Err(Error::StripTooLong { len: 1001, max: 1000 })
    ));
    assert!(matches!(
        StripConfig::new(10).with_output_clock_hz(0).validate(),
        Err(Error::ClockOutOfRange { hz: 0 })
    ));
    assert!(matches!(
        StripConfig::new(10).with_ingest_clock_hz(0).validate(),
        Err(Error::ClockOutOfRange { hz: 0 })
    ));
}

#[test]
fn output_divider_at_125_mhz() {
    // 125 MHz / (5 MHz * 2 cycles per bit)
    let divider = clock_divider(125_000_000, 5_000_000, OUTPUT_CYCLES_PER_BIT).unwrap();
    assert_eq!(divider, U24F8::from_num(12.5));
}

#[test]
fn ingest_divider_at_125_mhz() {
    // 125 MHz / (1 MHz * 4 cycles per bit)
    let divider = clock_divider(125_000_000, 1_000_000, INGEST_CYCLES_PER_BIT).unwrap();
    assert_eq!(divider, U24F8::from_num(31.25));
}

#[test]
fn divider_at_150_mhz_does_not_overflow() {
    let divider = clock_divider(150_000_000, 5_000_000, OUTPUT_CYCLES_PER_BIT).unwrap();
    assert_eq!(divider, U24F8::from_num(15));
}

#[test]
fn divider_rejects_unreachable_rates() {
    // Faster than one PIO cycle per system clock.
    assert!(matches!(
        clock_divider(125_000_000, 100_000_000, OUTPUT_CYCLES_PER_BIT),
        Err(Error::ClockOutOfRange { hz: 100_000_000 })
    ));
    assert!(matches!(
        clock_divider(125_000_000, 0, OUTPUT_CYCLES_PER_BIT),
        Err(Error::ClockOutOfRange { hz: 0 })
    ));
    // Too slow for the 16-bit integer divider.
    assert!(matches!(
        clock_divider(125_000_000, 500, OUTPUT_CYCLES_PER_BIT),
        Err(Error::ClockOutOfRange { hz: 500 })
    ));
}

#[test]
fn receiver_divider_follows_configured_ingest_clock() {
    const CONFIG: StripConfig = StripConfig::new(60).with_ingest_clock_hz(500_000);
    // 125 MHz / (500 kHz * 4 cycles per bit)
    let divider =
        clock_divider(125_000_000, CONFIG.ingest_clock_hz(), INGEST_CYCLES_PER_BIT).unwrap();
    assert_eq!(divider, U24F8::from_num(62.5));
    let default_divider = clock_divider(
        125_000_000,
        StripConfig::new(60).ingest_clock_hz(),
        INGEST_CYCLES_PER_BIT,
    )
    .unwrap();
    assert_eq!(default_divider, U24F8::from_num(31.25));
}
