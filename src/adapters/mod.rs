//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements   | Connects to                    |
//! |--------------|--------------|--------------------------------|
//! | `log_sink`   | EventSink    | Serial log output              |
//! | `ws_channel` | ChannelPort  | WebSocket sessions             |
//! | `http`       | —            | ESP-IDF HTTP server (espidf)   |
//! | `time`       | —            | ESP32 system timer             |
//! | `wifi`       | —            | ESP-IDF soft access point      |
//!
//! The sensor side lives in [`crate::sensor`]: `I2cBus` implements
//! `BusPort` over any `embedded-hal` I²C peripheral.

#[cfg(target_os = "espidf")]
pub mod http;
pub mod log_sink;
pub mod time;
pub mod wifi;
pub mod ws_channel;
