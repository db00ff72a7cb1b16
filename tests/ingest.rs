#![allow(missing_docs)]
//! Host-level tests for the ingestion byte format.

use dotstar_kit::Error;
use dotstar_kit::apa102::Led;
use dotstar_kit::frame_buffer::FrameBuffer;
use dotstar_kit::ingest::{
    Alignment, IngestDecoder, IngestStats, SYNC, alignment, decode_into, encode, frame_len,
    resync_offset,
};

fn update(sequence: u8, leds: &[Led]) -> Vec<u8> {
    let mut bytes = vec![0; frame_len(leds.len())];
    let len = encode(sequence, leds, &mut bytes).unwrap();
    assert_eq!(len, bytes.len());
    bytes
}

fn sample_leds() -> [Led; 3] {
    [
        Led::new(255, 0, 0, 31),
        Led::new(0, 255, 0, 15),
        Led::new(0, 0, 255, 1),
    ]
}

#[test]
fn frame_len_counts_header_records_and_crc() {
    assert_eq!(frame_len(0), 8);
    assert_eq!(frame_len(3), 20);
    assert_eq!(frame_len(60), 248);
}

#[test]
fn encode_writes_header_records_and_big_endian_crc() {
    let bytes = update(7, &sample_leds());
    assert_eq!(&bytes[..4], &[0xA5, 0x5A, 7, 0]);
    assert_eq!(&bytes[4..8], &[31, 255, 0, 0]);
    assert_eq!(&bytes[8..12], &[15, 0, 255, 0]);
    assert_eq!(&bytes[12..16], &[1, 0, 0, 255]);
    let crc = crc32fast::hash(&bytes[..16]);
    assert_eq!(&bytes[16..], &crc.to_be_bytes());
}

#[test]
fn encode_rejects_short_output() {
    let mut bytes = [0u8; 10];
    assert!(matches!(
        encode(0, &sample_leds(), &mut bytes),
        Err(Error::IngestLength { expected: 20, actual: 10 })
    ));
}

#[test]
fn decode_applies_records_in_order() {
    let mut frame = FrameBuffer::new(3).unwrap();
    let sequence = decode_into(&update(9, &sample_leds()), &mut frame).unwrap();
    assert_eq!(sequence, 9);
    assert_eq!(frame.leds().collect::<Vec<_>>(), sample_leds());
}

#[test]
fn decode_rejects_wrong_length() {
    let mut frame = FrameBuffer::new(4).unwrap();
    assert!(matches!(
        decode_into(&update(0, &sample_leds()), &mut frame),
        Err(Error::IngestLength { expected: 24, actual: 20 })
    ));
}

#[test]
fn corrupt_update_leaves_frame_untouched() {
    let mut frame = FrameBuffer::new(3).unwrap();
    let before = frame.words().to_vec();
    let mut bytes = update(1, &sample_leds());
    bytes[6] ^= 0x01;
    assert!(matches!(
        decode_into(&bytes, &mut frame),
        Err(Error::Checksum { .. })
    ));
    assert_eq!(frame.words(), before.as_slice());
}

#[test]
fn missing_sync_reports_resync_offset() {
    let mut frame = FrameBuffer::new(3).unwrap();
    let good = update(1, &sample_leds());
    // Stream slipped by two bytes: the marker now sits at offset 18.
    let mut slipped = good[2..].to_vec();
    slipped.extend_from_slice(&SYNC);
    assert!(matches!(
        decode_into(&slipped, &mut frame),
        Err(Error::Desync { resync_offset: Some(18) })
    ));
}

#[test]
fn nonzero_reserved_byte_is_a_desync() {
    let mut frame = FrameBuffer::new(3).unwrap();
    let mut bytes = update(1, &sample_leds());
    bytes[3] = 1;
    assert!(matches!(
        decode_into(&bytes, &mut frame),
        Err(Error::Desync { .. })
    ));
}

#[test]
fn alignment_classifies_buffers() {
    let good = update(0, &sample_leds());
    assert_eq!(alignment(&good), Alignment::Aligned);

    let mut shifted = vec![0x00, 0x11, 0x22];
    shifted.extend_from_slice(&good[..good.len() - 3]);
    assert_eq!(alignment(&shifted), Alignment::Shifted(3));
    assert_eq!(resync_offset(&shifted), Some(3));

    assert_eq!(alignment(&[0u8; 20]), Alignment::Lost);
    assert_eq!(resync_offset(&good[..1]), None);
}

#[test]
fn marker_inside_records_does_not_count_as_aligned() {
    // LED 0 record is [1, 0xA5, 0x5A, 0]: the sync marker sits at byte 5.
    let leds = [
        Led::new(0xA5, 0x5A, 0, 1),
        Led::new(0, 255, 0, 15),
        Led::new(0, 0, 255, 1),
    ];
    let len = frame_len(leds.len());
    let stream: Vec<u8> = (0..8u8).flat_map(|sequence| update(sequence, &leds)).collect();

    let slipped = &stream[5..5 + len];
    assert!(slipped.starts_with(&SYNC));
    assert_ne!(alignment(slipped), Alignment::Aligned);

    // Receive loop: one frame-sized buffer at a time, discarding on a shift.
    let mut frame = FrameBuffer::new(leds.len()).unwrap();
    let mut cursor = 5;
    let mut applied = 0;
    while cursor + len <= stream.len() {
        let buffer = &stream[cursor..cursor + len];
        cursor += len;
        match alignment(buffer) {
            Alignment::Aligned => {
                decode_into(buffer, &mut frame).unwrap();
                applied += 1;
            }
            Alignment::Shifted(offset) => cursor += offset,
            Alignment::Lost => {}
        }
    }
    assert!(applied >= 4, "only {applied} updates applied after resync");
    assert_eq!(frame.led(0).unwrap(), leds[0]);
}

#[test]
fn decoder_counts_gaps_desyncs_and_corruption() {
    let mut frame = FrameBuffer::new(3).unwrap();
    let mut decoder = IngestDecoder::new();

    decoder.apply(&update(10, &sample_leds()), &mut frame).unwrap();
    decoder.apply(&update(11, &sample_leds()), &mut frame).unwrap();
    // 12 and 13 lost upstream.
    decoder.apply(&update(14, &sample_leds()), &mut frame).unwrap();
    // A repeat is not a gap.
    decoder.apply(&update(14, &sample_leds()), &mut frame).unwrap();

    let mut corrupt = update(15, &sample_leds());
    corrupt[19] ^= 0xFF;
    assert!(decoder.apply(&corrupt, &mut frame).is_err());

    let mut desync = update(15, &sample_leds());
    desync[0] = 0;
    assert!(decoder.apply(&desync, &mut frame).is_err());

    assert!(decoder.apply(&[0; 5], &mut frame).is_err());

    assert_eq!(
        decoder.stats(),
        IngestStats {
            applied: 4,
            desyncs: 1,
            corrupt: 2,
            sequence_gaps: 2,
        }
    );
}

#[test]
fn sequence_wraps_without_a_gap() {
    let mut frame = FrameBuffer::new(1).unwrap();
    let mut decoder = IngestDecoder::new();
    let leds = [Led::new(1, 2, 3, 4)];
    decoder.apply(&update(255, &leds), &mut frame).unwrap();
    decoder.apply(&update(0, &leds), &mut frame).unwrap();
    assert_eq!(decoder.stats().sequence_gaps, 0);
}
