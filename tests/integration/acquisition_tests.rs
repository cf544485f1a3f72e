//! Calibration bootstrap and frame acquisition against the simulated sensor.

use thermocam::app::events::{CameraEvent, HaltReason};
use thermocam::app::service::{CameraService, ServiceState};
use thermocam::config::{DriverKind, SystemConfig};
use thermocam::error::{AcquisitionError, BusError, CalibrationError};
use thermocam::frame::PIXELS;
use thermocam::sensor::calibration::CalibrationSource;
use thermocam::sensor::sim::SimulatedCamera;
use thermocam::stream::Distributor;

use crate::mock_hw::{sim_source, RecordingSink};

fn raw_config() -> SystemConfig {
    SystemConfig {
        driver: DriverKind::Raw,
        ..SystemConfig::default()
    }
}

#[test]
fn library_driver_publishes_finite_frame() {
    let cam = SimulatedCamera::new();
    let config = SystemConfig::default();
    let mut source = sim_source(&cam, &config);
    let mut svc = CameraService::new(config);
    let dist = Distributor::new(2, 10_000);
    let mut sink = RecordingSink::default();

    svc.bootstrap(&mut source, &mut sink).unwrap();
    assert_eq!(
        sink.events[0],
        CameraEvent::Calibrated {
            source: CalibrationSource::Eeprom
        }
    );

    assert_eq!(svc.acquire(&mut source, &dist, &mut sink), Ok(1));
    let frame = dist.snapshot();
    assert_eq!(frame.temperatures().len(), PIXELS);
    assert!(frame.first_non_finite().is_none());
    let (min, max) = frame.min_max();
    assert!(min > -40.0 && max < 300.0, "implausible range {min}..{max}");
}

#[test]
fn raw_driver_converts_datasheet_pixel() {
    let cam = SimulatedCamera::new();
    let config = SystemConfig {
        emissivity: 1.0,
        ..raw_config()
    };
    let mut source = sim_source(&cam, &config);
    let mut svc = CameraService::new(config);
    let dist = Distributor::new(2, 10_000);
    let mut sink = RecordingSink::default();

    svc.bootstrap(&mut source, &mut sink).unwrap();
    svc.acquire(&mut source, &dist, &mut sink).unwrap();

    // Datasheet worked example: pixel (12, 16) reads about 80 °C.
    let t = dist.snapshot().temperatures()[367];
    assert!((t - 80.36).abs() < 0.5, "pixel 367 = {t}");
}

#[test]
fn raw_driver_halts_on_corrupt_eeprom() {
    let cam = SimulatedCamera::new();
    cam.corrupt_eeprom();
    let config = raw_config();
    let mut source = sim_source(&cam, &config);
    let mut svc = CameraService::new(config);
    let dist = Distributor::new(2, 10_000);
    let mut sink = RecordingSink::default();

    let err = svc.bootstrap(&mut source, &mut sink).unwrap_err();
    assert!(matches!(
        err,
        HaltReason::Calibration(CalibrationError::ParameterExtractionFailed(_))
    ));
    assert!(matches!(svc.state(), ServiceState::Halted(HaltReason::Calibration(_))));
    assert_eq!(
        svc.acquire(&mut source, &dist, &mut sink),
        Err(AcquisitionError::Halted)
    );
    assert_eq!(dist.frames_published(), 0);
}

#[test]
fn library_driver_degrades_to_preset() {
    let cam = SimulatedCamera::new();
    cam.set_eeprom_readable(false);
    let config = SystemConfig::default();
    let mut source = sim_source(&cam, &config);
    let mut svc = CameraService::new(config);
    let dist = Distributor::new(2, 10_000);
    let mut sink = RecordingSink::default();

    svc.bootstrap(&mut source, &mut sink).unwrap();
    assert_eq!(
        svc.calibration().map(|c| c.source),
        Some(CalibrationSource::Preset)
    );
    assert!(svc.acquire(&mut source, &dist, &mut sink).is_ok());
}

#[test]
fn missing_sensor_is_fatal_for_both_drivers() {
    for config in [SystemConfig::default(), raw_config()] {
        let cam = SimulatedCamera::new();
        cam.set_present(false);
        let mut source = sim_source(&cam, &config);
        let mut svc = CameraService::new(config);
        let mut sink = RecordingSink::default();
        assert_eq!(
            svc.bootstrap(&mut source, &mut sink),
            Err(HaltReason::Calibration(CalibrationError::SensorNotDetected))
        );
    }
}

#[test]
fn transient_bus_fault_keeps_previous_frame() {
    let cam = SimulatedCamera::new();
    let config = raw_config();
    let mut source = sim_source(&cam, &config);
    let mut svc = CameraService::new(config);
    let dist = Distributor::new(2, 10_000);
    let mut sink = RecordingSink::default();
    svc.bootstrap(&mut source, &mut sink).unwrap();

    svc.acquire(&mut source, &dist, &mut sink).unwrap();
    let before = dist.snapshot();

    cam.fail_next_reads(1);
    assert_eq!(
        svc.acquire(&mut source, &dist, &mut sink),
        Err(AcquisitionError::SubpageRead(BusError::Transfer))
    );
    assert_eq!(*dist.snapshot(), *before);
    assert_eq!(dist.frames_published(), 1);

    // Retried on the next tick, no backoff.
    assert_eq!(svc.acquire(&mut source, &dist, &mut sink), Ok(2));
    assert_eq!(svc.consecutive_failures(), 0);
}

#[test]
fn repeated_subpage_discards_attempt() {
    let cam = SimulatedCamera::new();
    let config = raw_config();
    let mut source = sim_source(&cam, &config);
    let mut svc = CameraService::new(config);
    let dist = Distributor::new(2, 10_000);
    let mut sink = RecordingSink::default();
    svc.bootstrap(&mut source, &mut sink).unwrap();

    cam.set_sticky_subpage(true);
    assert!(matches!(
        svc.acquire(&mut source, &dist, &mut sink),
        Err(AcquisitionError::DuplicateSubpage(_))
    ));
    assert_eq!(dist.frames_published(), 0);
    assert_eq!(
        sink.count(|e| matches!(e, CameraEvent::AcquisitionFailed { .. })),
        1
    );
}

#[test]
fn hot_and_cold_pixels_move_against_their_baseline() {
    // Per-pixel offsets vary across the array, so a uniform RAM image does
    // not read as a uniform scene. Compare each pixel with itself instead.
    let cam = SimulatedCamera::new();
    let config = raw_config();
    let mut source = sim_source(&cam, &config);
    let mut svc = CameraService::new(config);
    let dist = Distributor::new(2, 10_000);
    let mut sink = RecordingSink::default();
    svc.bootstrap(&mut source, &mut sink).unwrap();
    svc.acquire(&mut source, &dist, &mut sink).unwrap();
    let baseline = dist.snapshot();

    let (hot, cold) = (0, PIXELS - 1);
    let raw = |index: usize| cam.ram_word(index);
    cam.set_pixel(hot, raw(hot) + 0x0400);
    cam.set_pixel(cold, raw(cold) - 0x0100);
    svc.acquire(&mut source, &dist, &mut sink).unwrap();
    let frame = dist.snapshot();

    let (before, after) = (baseline.temperatures(), frame.temperatures());
    assert!(after.iter().all(|t| t.is_finite()));
    assert!(after[hot] > before[hot] + 5.0, "{} vs {}", after[hot], before[hot]);
    assert!(after[cold] < before[cold] - 5.0, "{} vs {}", after[cold], before[cold]);
    for (i, (a, b)) in after.iter().zip(before.iter()).enumerate() {
        if i != hot && i != cold {
            assert!((a - b).abs() < 1e-4, "pixel {i} drifted: {a} vs {b}");
        }
    }
}

#[test]
fn sensor_unplugged_mid_run_hits_ceiling() {
    let cam = SimulatedCamera::new();
    let config = SystemConfig {
        max_consecutive_failures: Some(5),
        ..SystemConfig::default()
    };
    let mut source = sim_source(&cam, &config);
    let mut svc = CameraService::new(config);
    let dist = Distributor::new(2, 10_000);
    let mut sink = RecordingSink::default();
    svc.bootstrap(&mut source, &mut sink).unwrap();
    svc.acquire(&mut source, &dist, &mut sink).unwrap();

    cam.set_present(false);
    for _ in 0..5 {
        assert!(svc.acquire(&mut source, &dist, &mut sink).is_err());
    }
    assert_eq!(svc.state(), ServiceState::Halted(HaltReason::TooManyFailures(5)));
    // Last good frame stays current for the distribution layer.
    assert_eq!(dist.frames_published(), 1);
    assert!(dist.snapshot().first_non_finite().is_none());
}
