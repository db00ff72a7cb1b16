#![allow(missing_docs)]
//! Host-level tests for the wire-ready frame buffer.

use dotstar_kit::apa102::{END_FRAME, Led, START_FRAME};
use dotstar_kit::config::StripConfig;
use dotstar_kit::frame_buffer::{EndFrame, FrameBuffer, MAX_STRIP_LEN};
use dotstar_kit::{Error, Rgb, colors};

#[test]
fn new_frame_is_dark_and_delimited() {
    let frame = FrameBuffer::new(4).unwrap();
    assert_eq!(frame.len(), 4);
    assert_eq!(frame.buffer_size(), 6);
    assert_eq!(
        frame.words(),
        &[START_FRAME, 0xE000_0000, 0xE000_0000, 0xE000_0000, 0xE000_0000, END_FRAME]
    );
    assert!(frame.leds().all(|led| led == Led::OFF));
}

#[test]
fn three_led_frame_serializes_to_expected_bytes() {
    let mut frame = FrameBuffer::new(3).unwrap();
    frame.set_led(0, Rgb::new(255, 0, 0), 31).unwrap();
    frame.set_led(1, Rgb::new(0, 255, 0), 15).unwrap();
    frame.set_led(2, Rgb::new(0, 0, 255), 0).unwrap();

    let bytes: Vec<u8> = frame.wire_bytes().collect();
    assert_eq!(
        bytes,
        [
            0x00, 0x00, 0x00, 0x00, // start
            0xFF, 0x00, 0x00, 0xFF, // red, brightness 31
            0xEF, 0x00, 0xFF, 0x00, // green, brightness 15
            0xE0, 0xFF, 0x00, 0x00, // blue, brightness 0
            0xFF, 0xFF, 0xFF, 0xFF, // end
        ]
    );
}

#[test]
fn empty_strip_is_just_delimiters() {
    let frame = FrameBuffer::new(0).unwrap();
    assert!(frame.is_empty());
    assert_eq!(frame.words(), &[START_FRAME, END_FRAME]);
    assert_eq!(frame.leds().count(), 0);
}

#[test]
fn max_strip_len_is_accepted() {
    let mut frame = FrameBuffer::new(MAX_STRIP_LEN).unwrap();
    assert_eq!(frame.buffer_size(), MAX_STRIP_LEN + 2);
    frame.set_led(MAX_STRIP_LEN - 1, colors::WHITE, 1).unwrap();
    assert_eq!(
        frame.led(MAX_STRIP_LEN - 1).unwrap(),
        Led::new(255, 255, 255, 1)
    );
    assert_eq!(frame.words().last(), Some(&END_FRAME));
}

#[test]
fn longer_than_max_is_rejected() {
    assert!(matches!(
        FrameBuffer::new(MAX_STRIP_LEN + 1),
        Err(Error::StripTooLong { len: 1001, max: 1000 })
    ));
    assert!(matches!(
        FrameBuffer::with_end_frame(MAX_STRIP_LEN + 1, EndFrame::Propagated),
        Err(Error::StripTooLong { .. })
    ));
}

#[test]
fn out_of_range_index_is_rejected_without_side_effects() {
    let mut frame = FrameBuffer::new(MAX_STRIP_LEN).unwrap();
    let before = frame.words().to_vec();

    assert!(matches!(
        frame.set_led(MAX_STRIP_LEN, colors::RED, 31),
        Err(Error::IndexOutOfBounds { index: 1000, len: 1000 })
    ));
    assert!(matches!(
        frame.set_led(usize::MAX, colors::RED, 31),
        Err(Error::IndexOutOfBounds { .. })
    ));
    assert_eq!(frame.words(), before.as_slice());
    assert!(frame.led(MAX_STRIP_LEN).is_err());
}

#[test]
fn set_touches_only_its_slot() {
    let mut frame = FrameBuffer::new(5).unwrap();
    frame.set(2, Led::new(1, 2, 3, 4)).unwrap();
    let leds: Vec<Led> = frame.leds().collect();
    assert_eq!(leds[2], Led::new(1, 2, 3, 4));
    for index in [0, 1, 3, 4] {
        assert_eq!(leds[index], Led::OFF);
    }
    assert_eq!(frame.words()[0], START_FRAME);
    assert_eq!(frame.words()[6], END_FRAME);
}

#[test]
fn fill_and_clear_keep_delimiters() {
    let mut frame = FrameBuffer::new(3).unwrap();
    frame.fill(colors::BLUE, 8);
    assert!(frame.leds().all(|led| led == Led::new(0, 0, 255, 8)));
    frame.clear();
    assert!(frame.leds().all(|led| led == Led::OFF));
    assert_eq!(frame.words().first(), Some(&START_FRAME));
    assert_eq!(frame.words().last(), Some(&END_FRAME));
}

#[test]
fn end_frame_word_counts() {
    assert_eq!(EndFrame::Minimal.word_count(0), 1);
    assert_eq!(EndFrame::Minimal.word_count(1000), 1);
    assert_eq!(EndFrame::Propagated.word_count(0), 1);
    assert_eq!(EndFrame::Propagated.word_count(64), 1);
    assert_eq!(EndFrame::Propagated.word_count(65), 2);
    assert_eq!(EndFrame::Propagated.word_count(1000), 16);
}

#[test]
fn propagated_end_frame_pads_long_strips() {
    let frame = FrameBuffer::with_end_frame(200, EndFrame::Propagated).unwrap();
    assert_eq!(frame.end_frame(), EndFrame::Propagated);
    assert_eq!(frame.buffer_size(), 1 + 200 + 4);
    assert!(frame.words()[201..].iter().all(|&word| word == END_FRAME));
}

#[test]
fn from_config_uses_length_and_end_frame() {
    let config = StripConfig::new(100).with_end_frame(EndFrame::Propagated);
    let frame = FrameBuffer::from_config(&config).unwrap();
    assert_eq!(frame.len(), 100);
    assert_eq!(frame.buffer_size(), 1 + 100 + 2);
}

#[test]
fn dump_lists_one_led_per_line() {
    let mut frame = FrameBuffer::new(2).unwrap();
    frame.set_led(0, Rgb::new(0x12, 0x34, 0x56), 31).unwrap();
    let mut dump = String::new();
    frame.write_dump(&mut dump).unwrap();
    assert_eq!(dump, "12 34 56 31\n00 00 00  0\n");
}

#[test]
fn hex_dump_wraps_every_16_bytes() {
    let mut frame = FrameBuffer::new(3).unwrap();
    frame.set_led(0, Rgb::new(255, 0, 0), 31).unwrap();
    let mut hex = String::new();
    frame.write_hex(&mut hex).unwrap();
    assert_eq!(
        hex,
        "00 00 00 00 ff 00 00 ff e0 00 00 00 e0 00 00 00\nff ff ff ff \n"
    );
}
