//! Full control loop: scheduler → acquisition → push → housekeeping, with
//! the viewer rendering what went over the wire.

use thermocam::app::events::{CameraEvent, HaltReason};
use thermocam::app::pipeline::PipelineTick;
use thermocam::app::service::{CameraService, ServiceState};
use thermocam::config::SystemConfig;
use thermocam::render::{FeedMode, Palette, Viewer};
use thermocam::scheduler::Scheduler;
use thermocam::sensor::sim::SimulatedCamera;
use thermocam::stream::{Distributor, EvictionReason, SubscriberId};

use crate::mock_hw::{sim_source, MockChannel, RecordingSink, SimSource};

const TICK_MS: u32 = 20;

struct Rig {
    cam: SimulatedCamera,
    source: SimSource,
    service: CameraService,
    scheduler: Scheduler,
    dist: Distributor,
    channel: MockChannel,
    sink: RecordingSink,
    now_ms: u64,
}

impl Rig {
    fn new(config: SystemConfig) -> Self {
        let cam = SimulatedCamera::new();
        let mut source = sim_source(&cam, &config);
        let mut service = CameraService::new(config.clone());
        let mut sink = RecordingSink::default();
        service.bootstrap(&mut source, &mut sink).unwrap();
        Self {
            cam,
            source,
            service,
            scheduler: Scheduler::from_config(&config),
            dist: Distributor::new(
                usize::from(config.max_subscribers),
                u64::from(config.idle_timeout_ms),
            ),
            channel: MockChannel::default(),
            sink,
            now_ms: 0,
        }
    }

    fn subscribe(&mut self, id: SubscriberId) {
        self.channel.connect(id);
        self.dist.on_subscriber_connect(id, self.now_ms).unwrap();
    }

    fn run(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.now_ms += u64::from(TICK_MS);
            let mut tick = PipelineTick {
                service: &mut self.service,
                source: &mut self.source,
                distributor: &self.dist,
                channel: &mut self.channel,
                sink: &mut self.sink,
                now_ms: self.now_ms,
            };
            self.scheduler.tick(TICK_MS, &mut tick);
        }
    }

    fn count(&self, pred: impl Fn(&CameraEvent) -> bool) -> usize {
        self.sink.count(pred)
    }
}

#[test]
fn two_seconds_of_streaming() {
    let mut rig = Rig::new(SystemConfig::default());
    rig.subscribe(SubscriberId(1));
    rig.run(100);

    assert_eq!(rig.count(|e| matches!(e, CameraEvent::FrameAcquired { .. })), 20);
    assert_eq!(rig.count(|e| matches!(e, CameraEvent::FramePushed { recipients: 1, .. })), 20);
    assert_eq!(rig.channel.sent.len(), 20);
    assert_eq!(rig.dist.frames_published(), 20);

    match rig.sink.last_status() {
        Some(CameraEvent::Status(report)) => {
            assert_eq!(report.subscribers, 1);
            assert_eq!(report.capacity, 2);
            assert_eq!(report.connections, 1);
            assert_eq!(report.frames_published, 20);
            assert_eq!(report.runtime.uptime_secs, 2);
            assert_eq!(report.runtime.frames_acquired, 20);
            assert_eq!(report.runtime.failed_attempts, 0);
        }
        other => panic!("no status report: {other:?}"),
    }
}

#[test]
fn nothing_is_pushed_without_subscribers() {
    let mut rig = Rig::new(SystemConfig::default());
    rig.run(100);

    assert!(rig.channel.sent.is_empty());
    assert_eq!(rig.count(|e| matches!(e, CameraEvent::FramePushed { .. })), 0);
    // Acquisition keeps the pull path fresh regardless.
    assert_eq!(rig.dist.frames_published(), 20);
}

#[test]
fn crashed_tab_is_evicted_at_housekeeping() {
    let mut rig = Rig::new(SystemConfig::default());
    rig.subscribe(SubscriberId(1));
    rig.subscribe(SubscriberId(2));
    rig.run(10);
    rig.channel.vanish(SubscriberId(2));
    rig.run(90);

    assert_eq!(
        rig.count(|e| *e
            == CameraEvent::SubscriberRemoved {
                id: SubscriberId(2),
                reason: EvictionReason::Dead,
            }),
        1
    );
    assert_eq!(rig.dist.subscriber_count(), 1);
    assert!(rig.dist.on_subscriber_connect(SubscriberId(3), rig.now_ms).is_ok());
}

#[test]
fn silent_subscriber_times_out() {
    let config = SystemConfig {
        idle_timeout_ms: 1_000,
        ..SystemConfig::default()
    };
    let mut rig = Rig::new(config);
    rig.subscribe(SubscriberId(7));
    rig.run(100);

    assert_eq!(
        rig.count(|e| matches!(
            e,
            CameraEvent::SubscriberRemoved {
                reason: EvictionReason::Idle,
                ..
            }
        )),
        1
    );
    assert_eq!(rig.channel.closed, vec![SubscriberId(7)]);
}

#[test]
fn viewer_renders_pushed_frame() {
    let config = SystemConfig::default();
    let mut rig = Rig::new(config.clone());
    rig.subscribe(SubscriberId(1));
    rig.run(5);

    let mut viewer = Viewer::from_config(&config);
    viewer.on_channel_open();
    assert_eq!(viewer.mode(), FeedMode::Streaming);
    assert!(!viewer.pull_due(rig.now_ms));

    let payload = rig.channel.sent.last().cloned().unwrap();
    let image = viewer.on_payload(&payload).unwrap();
    assert_eq!((image.width, image.height), (320, 240));
    assert_eq!(image.pixels.len(), 320 * 240);

    let (lo, hi) = rig.dist.snapshot().min_max();
    assert_eq!(image.range_label(), (format!("{lo:.1}"), format!("{hi:.1}")));
    assert_eq!(viewer.palette(), Palette::Rainbow);
}

#[test]
fn viewer_falls_back_to_polling_when_channel_drops() {
    let mut rig = Rig::new(SystemConfig::default());
    rig.run(5);

    let mut viewer = Viewer::from_config(&SystemConfig::default());
    viewer.on_channel_open();
    viewer.on_channel_closed();
    assert!(viewer.pull_due(rig.now_ms));
    assert!(!viewer.pull_due(rig.now_ms + 999));
    assert!(viewer.pull_due(rig.now_ms + 1_000));

    let payload = rig.dist.snapshot_payload().unwrap();
    assert!(viewer.on_payload(&payload).is_ok());
    // Garbage keeps the previous image on screen.
    assert!(viewer.on_payload("{\"temperatures\":[1,2,3]}").is_err());
    assert!(viewer.image().is_some());
}

#[test]
fn halted_pipeline_keeps_serving_last_frame() {
    let config = SystemConfig {
        max_consecutive_failures: Some(3),
        ..SystemConfig::default()
    };
    let mut rig = Rig::new(config);
    rig.subscribe(SubscriberId(1));
    rig.run(10);
    let published = rig.dist.frames_published();
    let last_frame = rig.dist.snapshot();

    rig.cam.set_present(false);
    rig.run(40);

    assert_eq!(rig.service.state(), ServiceState::Halted(HaltReason::TooManyFailures(3)));
    assert_eq!(rig.count(|e| matches!(e, CameraEvent::Halted(_))), 1);
    assert_eq!(rig.count(|e| matches!(e, CameraEvent::AcquisitionFailed { .. })), 3);
    assert_eq!(rig.dist.frames_published(), published);
    assert_eq!(*rig.dist.snapshot(), *last_frame);
    // Pushes continue at 10 Hz with the frozen frame.
    assert_eq!(rig.channel.sent.len(), 2 + 8);
    assert!(rig.channel.sent[2..].iter().all(|p| *p == rig.channel.sent[1]));

    // Housekeeping still reports, with the failures on record.
    rig.run(50);
    match rig.sink.last_status() {
        Some(CameraEvent::Status(report)) => assert_eq!(report.runtime.failed_attempts, 3),
        other => panic!("no status report: {other:?}"),
    }
}
