#![allow(missing_docs)]
//! Host-level tests for the receive-side buffer rotation.
//!
//! Buffers are tagged `[u8; 1]` arrays so each test can follow exactly which
//! physical buffer moves where.

use dotstar_kit::Error;
use dotstar_kit::switchboard::Switchboard;
use embassy_futures::block_on;
use embassy_futures::join::join;

const A: [u8; 1] = [b'A'];
const B: [u8; 1] = [b'B'];
const C: [u8; 1] = [b'C'];

#[test]
fn receive_complete_swaps_with_standby() {
    let switchboard = Switchboard::new();
    switchboard.install_standby(B).unwrap();

    let next = switchboard.receive_complete(A);
    assert_eq!(next, B);
    assert!(switchboard.has_ready());
    assert_eq!(switchboard.published_frames(), 1);
    assert_eq!(switchboard.dropped_frames(), 0);

    let ready = switchboard.take_ready().unwrap();
    assert_eq!(*ready, A);
    assert!(!switchboard.has_ready());
}

#[test]
fn dropping_ready_buffer_makes_it_standby() {
    let switchboard = Switchboard::new();
    switchboard.install_standby(B).unwrap();

    let active = switchboard.receive_complete(A);
    drop(switchboard.take_ready().unwrap());

    // A went back to standby, so the next receive swaps it in.
    assert_eq!(switchboard.receive_complete(active), A);
    assert_eq!(*switchboard.take_ready().unwrap(), B);
    assert_eq!(switchboard.published_frames(), 2);
}

#[test]
fn unconsumed_ready_buffer_is_overwritten() {
    let switchboard = Switchboard::new();
    switchboard.install_standby(B).unwrap();

    let active = switchboard.receive_complete(A);
    assert_eq!(active, B);
    // Consumer never took A: B replaces it and A comes back to be refilled.
    let active = switchboard.receive_complete(active);
    assert_eq!(active, A);
    assert_eq!(switchboard.published_frames(), 2);
    assert_eq!(switchboard.dropped_frames(), 1);
    assert_eq!(*switchboard.take_ready().unwrap(), B);
}

#[test]
fn every_overwritten_frame_counts_as_published_and_dropped() {
    let switchboard = Switchboard::new();
    switchboard.install_standby(B).unwrap();

    let active = switchboard.receive_complete(A);
    let active = switchboard.receive_complete(active);
    let active = switchboard.receive_complete(active);

    // A, B and A again each became ready; the first two were overwritten.
    assert_eq!(active, B);
    assert_eq!(switchboard.published_frames(), 3);
    assert_eq!(switchboard.dropped_frames(), 2);
    assert_eq!(*switchboard.take_ready().unwrap(), A);
}

#[test]
fn receiver_keeps_its_buffer_while_consumer_holds_the_other() {
    let switchboard = Switchboard::new();
    switchboard.install_standby(B).unwrap();

    let active = switchboard.receive_complete(A);
    let ready = switchboard.take_ready().unwrap();
    assert_eq!(*ready, A);

    // No standby and nothing ready: B is not published and comes straight back.
    let active = switchboard.receive_complete(active);
    assert_eq!(active, B);
    assert!(!switchboard.has_ready());
    assert_eq!(switchboard.dropped_frames(), 1);

    drop(ready);
    assert_eq!(switchboard.receive_complete(active), A);
    assert_eq!(*switchboard.take_ready().unwrap(), B);
}

#[test]
fn second_standby_is_rejected() {
    let switchboard = Switchboard::new();
    switchboard.install_standby(A).unwrap();
    assert!(matches!(
        switchboard.install_standby(C),
        Err(Error::SwitchboardFull)
    ));
}

#[test]
fn consumer_never_sees_the_active_buffer() {
    let switchboard = Switchboard::new();
    switchboard.install_standby([0u8; 1]).unwrap();
    let mut active = [0u8; 1];
    let mut taken = 0;

    for round in 1..=50u8 {
        active[0] = round;
        active = switchboard.receive_complete(active);
        // Whatever the receiver holds next is never the one just published.
        assert_ne!(active[0], round);
        if round % 3 == 0 {
            let ready = switchboard.take_ready().unwrap();
            assert_eq!(ready[0], round);
            taken += 1;
        }
    }
    assert_eq!(switchboard.published_frames(), 50);
    assert_eq!(
        taken + switchboard.dropped_frames() + u32::from(switchboard.has_ready()),
        50
    );
}

#[test]
fn wait_ready_wakes_on_receive_complete() {
    let switchboard = Switchboard::new();
    switchboard.install_standby(B).unwrap();

    let (ready, next) = block_on(join(
        async {
            let ready = switchboard.wait_ready().await;
            *ready
        },
        async { switchboard.receive_complete(A) },
    ));
    assert_eq!(ready, A);
    assert_eq!(next, B);
}
