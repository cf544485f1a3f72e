//! Thermocam Firmware — Main Entry Point
//!
//! Hexagonal architecture with one cooperative control loop and an HTTP
//! server task sharing the distribution layer.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  I2cBus (BusPort)   LogEventSink   WsChannel      Esp32Time    │
//! │  SoftAP (wifi)      (EventSink)    (ChannelPort)  EspHttpServer│
//! │                                    CommandInbox ◀─ POST /config│
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  CameraService · SensorSource · Distributor (pure)     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (delegate-driven): acquire → push → housekeeping    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info};

use thermocam::adapters::http::{self, WsChannel};
use thermocam::adapters::log_sink::LogEventSink;
use thermocam::adapters::time::Esp32TimeAdapter;
use thermocam::adapters::wifi::{self, AP_GATEWAY};
use thermocam::app::commands::CommandInbox;
use thermocam::app::pipeline::PipelineTick;
use thermocam::app::service::CameraService;
use thermocam::config::SystemConfig;
use thermocam::diagnostics;
use thermocam::pins;
use thermocam::scheduler::Scheduler;
use thermocam::sensor::bus::I2cBus;
use thermocam::sensor::SensorSource;
use thermocam::stream::Distributor;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    diagnostics::install_panic_handler();

    info!("╔══════════════════════════════════════╗");
    info!("║  Thermocam v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = SystemConfig::default();
    config.validate().map_err(thermocam::Error::from)?;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take().ok();
    let clock = Esp32TimeAdapter::new();

    // ── 2. Sensor bus ─────────────────────────────────────────
    info!(
        "I2C{}: SDA=GPIO{} SCL=GPIO{} @ {} Hz",
        pins::SENSOR_I2C_PORT,
        pins::SENSOR_SDA_GPIO,
        pins::SENSOR_SCL_GPIO,
        config.i2c_clock_hz
    );
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(config.i2c_clock_hz.Hz()),
    )?;
    let bus = I2cBus::new(i2c, config.i2c_address);
    let mut source = SensorSource::from_config(bus, FreeRtos, &config);

    // ── 3. Calibration bootstrap ──────────────────────────────
    let mut log_sink = LogEventSink::new();
    let mut service = CameraService::new(config.clone());
    if let Err(e) = service.bootstrap(&mut source, &mut log_sink) {
        // Keep serving the blank frame so the viewer still loads.
        error!("Bootstrap halted ({}); acquisition disabled", e);
    }

    // ── 4. Network: soft AP + HTTP/WebSocket ──────────────────
    let _wifi = wifi::start_access_point(peripherals.modem, sysloop, nvs, &config)?;
    let distributor = Arc::new(Distributor::new(
        usize::from(config.max_subscribers),
        u64::from(config.idle_timeout_ms),
    ));
    let mut channel = WsChannel::new();
    let inbox = Arc::new(CommandInbox::new());
    let _server = http::serve(
        Arc::clone(&distributor),
        channel.clone(),
        Arc::clone(&inbox),
        clock,
    )?;
    let [a, b, c, d] = AP_GATEWAY;
    info!("Viewer: http://{}.{}.{}.{}/", a, b, c, d);

    // ── 5. Control loop ───────────────────────────────────────
    let mut scheduler = Scheduler::from_config(&config);
    let mut last_ms = clock.uptime_ms();
    info!("System ready. Entering control loop.");

    loop {
        FreeRtos::delay_ms(config.loop_tick_ms);
        let now_ms = clock.uptime_ms();
        let delta_ms = now_ms.saturating_sub(last_ms) as u32;
        last_ms = now_ms;

        service.drain_commands(&inbox, &mut scheduler, &distributor, &mut log_sink);
        let mut tick = PipelineTick {
            service: &mut service,
            source: &mut source,
            distributor: &distributor,
            channel: &mut channel,
            sink: &mut log_sink,
            now_ms,
        };
        scheduler.tick(delta_ms, &mut tick);
    }
}
