//! Subscriber admission, housekeeping and push/pull delivery.

use std::sync::Arc;
use std::thread;

use thermocam::error::AdmissionRejected;
use thermocam::frame::{ThermalFrame, PIXELS, WIDTH};
use thermocam::render::{Palette, Rgb, Viewer};
use thermocam::stream::codec;
use thermocam::stream::{Distributor, EvictionReason, PushOutcome, SubscriberId};

use crate::mock_hw::{uniform_frame, MockChannel};

const A: SubscriberId = SubscriberId(1);
const B: SubscriberId = SubscriberId(2);
const C: SubscriberId = SubscriberId(3);

fn connect(dist: &Distributor, ch: &mut MockChannel, id: SubscriberId, now_ms: u64) -> Result<(), AdmissionRejected> {
    ch.connect(id);
    dist.on_subscriber_connect(id, now_ms)
}

#[test]
fn third_client_is_busy_until_a_seat_frees_up() {
    let dist = Distributor::new(2, 10_000);
    let mut ch = MockChannel::default();

    assert!(connect(&dist, &mut ch, A, 0).is_ok());
    assert!(connect(&dist, &mut ch, B, 0).is_ok());
    assert_eq!(connect(&dist, &mut ch, C, 0), Err(AdmissionRejected::Busy));
    assert_eq!(dist.subscriber_count(), 2);
    assert_eq!(AdmissionRejected::Busy.to_string(), "Server is busy");

    dist.on_subscriber_disconnect(A);
    assert!(dist.on_subscriber_connect(C, 50).is_ok());
    assert_eq!(dist.subscriber_count(), 2);
}

#[test]
fn idle_exactly_at_timeout_is_kept() {
    let dist = Distributor::new(2, 10_000);
    let mut ch = MockChannel::default();
    connect(&dist, &mut ch, A, 0).unwrap();
    connect(&dist, &mut ch, B, 0).unwrap();
    dist.on_subscriber_activity(B, 4_000);

    assert!(dist.evict_stale(10_000, &mut ch).is_empty());

    let evicted = dist.evict_stale(10_001, &mut ch);
    assert_eq!(evicted.as_slice(), &[(A, EvictionReason::Idle)]);
    assert_eq!(ch.closed, vec![A]);
    assert_eq!(dist.subscriber_count(), 1);
}

#[test]
fn vanished_connection_is_reclaimed_on_next_sweep() {
    let dist = Distributor::new(2, 10_000);
    let mut ch = MockChannel::default();
    connect(&dist, &mut ch, A, 0).unwrap();
    connect(&dist, &mut ch, B, 0).unwrap();

    ch.vanish(B);
    assert_eq!(connect(&dist, &mut ch, C, 100), Err(AdmissionRejected::Busy));

    let evicted = dist.evict_stale(2_000, &mut ch);
    assert_eq!(evicted.as_slice(), &[(B, EvictionReason::Dead)]);
    assert!(connect(&dist, &mut ch, C, 2_001).is_ok());
}

#[test]
fn lowered_capacity_trims_newest_in_one_sweep() {
    let dist = Distributor::new(3, 10_000);
    let mut ch = MockChannel::default();
    connect(&dist, &mut ch, A, 0).unwrap();
    connect(&dist, &mut ch, B, 10).unwrap();
    connect(&dist, &mut ch, C, 20).unwrap();

    dist.set_capacity(1);
    assert_eq!(dist.capacity(), 1);
    let evicted = dist.evict_stale(100, &mut ch);
    assert_eq!(evicted.len(), 2);
    assert!(evicted.iter().all(|&(_, r)| r == EvictionReason::OverCapacity));
    assert!(!evicted.iter().any(|&(id, _)| id == A));
    assert_eq!(dist.subscriber_count(), 1);
}

#[test]
fn pushed_and_pulled_payloads_match() {
    let dist = Distributor::new(2, 10_000);
    let mut ch = MockChannel::default();
    connect(&dist, &mut ch, A, 0).unwrap();

    let values: Vec<f32> = (0..PIXELS).map(|i| 20.0 + i as f32 * 0.013).collect();
    dist.publish(ThermalFrame::try_from(values.clone()).unwrap());

    let outcome = dist.push(&mut ch).unwrap();
    assert!(matches!(outcome, PushOutcome::Sent { recipients: 1, .. }));
    let pulled = dist.snapshot_payload().unwrap();
    assert_eq!(ch.sent, vec![pulled.clone()]);

    let decoded = codec::decode(&pulled).unwrap();
    for (got, want) in decoded.temperatures().iter().zip(&values) {
        assert!((got - want).abs() < 1e-3);
    }
}

#[test]
fn pushed_hot_spot_renders_red_on_blue() {
    let dist = Distributor::new(2, 10_000);
    let mut ch = MockChannel::default();
    connect(&dist, &mut ch, A, 0).unwrap();

    let mut values = vec![20.0; PIXELS];
    values[5 * WIDTH + 5] = 40.0;
    dist.publish(ThermalFrame::try_from(values).unwrap());
    dist.push(&mut ch).unwrap();
    let payload = ch.sent.last().cloned().unwrap();

    const RED: Rgb = Rgb { r: 255, g: 0, b: 0 };
    const GREEN: Rgb = Rgb { r: 0, g: 255, b: 0 };
    const BLUE: Rgb = Rgb { r: 0, g: 0, b: 255 };

    let mut viewer = Viewer::new(320, 240, Palette::Rainbow);
    viewer.set_mirror(false);
    let image = viewer.on_payload(&payload).unwrap();
    assert_eq!((image.min, image.max), (20.0, 40.0));
    assert_eq!(image.range_label(), ("20.0".to_owned(), "40.0".to_owned()));
    assert_eq!(image.pixel(50, 50), Some(RED));
    // Halfway to the next sensor column: 30 °C, mid-scale.
    assert_eq!(image.pixel(55, 50), Some(GREEN));
    assert_eq!(image.pixel(0, 0), Some(BLUE));
    assert_eq!(image.pixel(200, 200), Some(BLUE));

    viewer.set_mirror(true);
    let mirrored = viewer.on_payload(&payload).unwrap();
    assert_eq!(mirrored.pixel(319 - 50, 50), Some(RED));
    assert_eq!(mirrored.pixel(50, 50), Some(BLUE));
}

#[test]
fn pull_before_first_frame_returns_blank() {
    let dist = Distributor::new(2, 10_000);
    let frame = codec::decode(&dist.snapshot_payload().unwrap()).unwrap();
    assert!(frame.temperatures().iter().all(|&t| t == 0.0));
    assert_eq!(dist.frames_published(), 0);
}

#[test]
fn concurrent_readers_never_see_torn_frames() {
    let dist = Arc::new(Distributor::new(2, 10_000));
    dist.publish(uniform_frame(0.0));

    let writer = {
        let dist = Arc::clone(&dist);
        thread::spawn(move || {
            for i in 1..=200 {
                dist.publish(uniform_frame(i as f32));
            }
        })
    };
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let dist = Arc::clone(&dist);
            thread::spawn(move || {
                for _ in 0..200 {
                    let frame = dist.snapshot();
                    let first = frame.temperatures()[0];
                    assert!(frame.temperatures().iter().all(|&t| t == first));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(dist.frames_published(), 201);
    assert_eq!(dist.snapshot().temperatures()[PIXELS - 1], 200.0);
}
