//! Application core — pure domain logic, zero I/O.
//!
//! Calibration lifecycle, the acquisition failure policy, command handling
//! and the per-tick pipeline. All interaction with the sensor, the network
//! and the log goes through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod pipeline;
pub mod ports;
pub mod service;
