//! WiFi soft access point.
//!
//! The camera hosts its own network; viewers join it and browse to the
//! gateway address. There is no station mode and no reconnection logic.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`start_access_point`] drives the ESP-IDF
//!   WiFi driver via `esp_idf_svc::wifi`.
//! - **all targets**: credential validation, so a bad config is caught on
//!   the host before it reaches the radio.

use core::fmt;

use crate::config::SystemConfig;

/// Address the soft-AP netif hands out as gateway.
pub const AP_GATEWAY: [u8; 4] = [192, 168, 4, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    InvalidSsid,
    InvalidPassword,
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
        }
    }
}

impl std::error::Error for CredentialError {}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), CredentialError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(CredentialError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), CredentialError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(CredentialError::InvalidPassword);
    }
    Ok(())
}

/// Whether the access point will be open (no password).
pub fn is_open(config: &SystemConfig) -> bool {
    config.ap_password.is_empty()
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF bring-up
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn start_access_point(
    modem: esp_idf_svc::hal::modem::Modem,
    sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
    nvs: Option<esp_idf_svc::nvs::EspDefaultNvsPartition>,
    config: &SystemConfig,
) -> anyhow::Result<esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>> {
    use anyhow::anyhow;
    use esp_idf_svc::wifi::{AccessPointConfiguration, AuthMethod, BlockingWifi, Configuration, EspWifi};
    use log::info;

    validate_ssid(&config.ap_ssid)?;
    validate_password(&config.ap_password)?;

    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), nvs)?, sysloop)?;
    wifi.set_configuration(&Configuration::AccessPoint(AccessPointConfiguration {
        ssid: config
            .ap_ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow!(CredentialError::InvalidSsid))?,
        password: config
            .ap_password
            .as_str()
            .try_into()
            .map_err(|_| anyhow!(CredentialError::InvalidPassword))?,
        auth_method: if is_open(config) {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        channel: 1,
        max_connections: 4,
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.wait_netif_up()?;

    let ip = wifi.wifi().ap_netif().get_ip_info()?.ip;
    info!("WiFi: access point '{}' up at {}", config.ap_ssid, ip);
    Ok(wifi)
}
