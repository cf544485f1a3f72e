//! Thermocam firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.
//!
//! ```text
//!   sensor ──▶ ThermalFrame ──▶ stream::Distributor ──▶ ChannelPort ──▶ render
//!  (MLX90640)                   (slot · subscribers)     (WebSocket)    (viewer)
//! ```

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod render;
pub mod scheduler;
pub mod sensor;
pub mod stream;

pub mod adapters;
pub mod pins;

pub use error::{Error, Result};
pub use frame::ThermalFrame;
