//! Inbound commands to the camera service.
//!
//! The HTTP task parses request bodies into [`CameraCommand`]s and drops
//! them into the [`CommandInbox`]; the control loop drains the inbox once
//! per iteration and applies each command through
//! [`CameraService::handle_command`](super::service::CameraService::handle_command).

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use serde::Deserialize;

use crate::config::{check_emissivity, SystemConfig};
use crate::error::ConfigError;

/// Commands waiting beyond this are refused.
pub const INBOX_DEPTH: usize = 4;

/// Commands that adapters can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraCommand {
    /// Hot-reload configuration: cadences, capacity, idle timeout and
    /// conversion settings take effect on the next tick. Bus and sensor
    /// setup fields only apply at the next bootstrap.
    UpdateConfig(SystemConfig),

    /// Change the emissivity used by subsequent conversions.
    SetEmissivity(f32),
}

#[derive(Deserialize)]
struct EmissivityBody {
    emissivity: f32,
}

impl CameraCommand {
    /// A full configuration document, validated before it is queued.
    pub fn parse_config(body: &[u8]) -> Result<Self, ConfigError> {
        SystemConfig::from_json(body).map(Self::UpdateConfig)
    }

    /// `{"emissivity": <f32>}`
    pub fn parse_emissivity(body: &[u8]) -> Result<Self, ConfigError> {
        let parsed: EmissivityBody =
            serde_json::from_slice(body).map_err(|_| ConfigError::Malformed)?;
        check_emissivity(parsed.emissivity)?;
        Ok(Self::SetEmissivity(parsed.emissivity))
    }
}

/// Bounded FIFO between the HTTP task and the control loop.
///
/// ```text
/// ┌──────────────┐ CameraCommand ┌──────────────┐
/// │  httpd task  │──────────────▶│ Control loop │
/// └──────────────┘               └──────────────┘
/// ```
pub struct CommandInbox {
    channel: Channel<CriticalSectionRawMutex, CameraCommand, INBOX_DEPTH>,
}

impl Default for CommandInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandInbox {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Queue a command. A full inbox hands the command back.
    pub fn submit(&self, cmd: CameraCommand) -> Result<(), CameraCommand> {
        self.channel.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(cmd) => cmd,
        })
    }

    /// Oldest pending command, if any.
    pub fn take(&self) -> Option<CameraCommand> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}
