//! HTTP + WebSocket front end (ESP-IDF only).
//!
//! | Route   | Method | Behaviour                                        |
//! |---------|--------|--------------------------------------------------|
//! | `/`     | GET    | Viewer page                                      |
//! | `/data` | GET    | Current frame as JSON (pull path, no admission)  |
//! | `/ws`   | WS     | Live push; admission control on connect          |
//! | `/config` | POST | Full config document, applied on the next tick   |
//! | `/emissivity` | POST | `{"emissivity": 0.9}`                        |
//!
//! Handlers run on the httpd task. They only touch the shared
//! [`Distributor`], [`SessionChannel`] and [`CommandInbox`], never the
//! sensor.

use std::sync::Arc;

use esp_idf_svc::http::server::ws::{EspHttpWsConnection, EspHttpWsDetachedSender};
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::http::{Headers, Method};
use esp_idf_svc::io::{Read, Write};
use esp_idf_svc::sys::EspError;
use esp_idf_svc::ws::FrameType;
use log::{info, warn};

use crate::adapters::time::Esp32TimeAdapter;
use crate::app::commands::{CameraCommand, CommandInbox};
use crate::error::ConfigError;
use crate::adapters::ws_channel::{Admission, SessionChannel, SessionSender};
use crate::stream::{Distributor, SubscriberId};

/// Viewer page served at `/`.
pub const VIEWER_PAGE: &str = include_str!("../../assets/viewer.html");

/// Inbound frames larger than this are refused.
const MAX_INBOUND_FRAME: usize = 512;

/// Command bodies larger than this are refused with 413.
const MAX_COMMAND_BODY: usize = 2048;

pub type WsChannel = SessionChannel<EspHttpWsDetachedSender>;

impl SessionSender for EspHttpWsDetachedSender {
    fn send_text(&mut self, payload: &str) -> bool {
        self.send(FrameType::Text(false), payload.as_bytes()).is_ok()
    }

    fn is_closed(&self) -> bool {
        EspHttpWsDetachedSender::is_closed(self)
    }

    fn close(&mut self) {
        let _ = self.send(FrameType::Close, &[]);
    }
}

/// Start the server. The returned handle must be kept alive.
pub fn serve(
    distributor: Arc<Distributor>,
    channel: WsChannel,
    inbox: Arc<CommandInbox>,
    clock: Esp32TimeAdapter,
) -> anyhow::Result<EspHttpServer<'static>> {
    let mut server = EspHttpServer::new(&Configuration::default())?;

    server.fn_handler("/", Method::Get, |req| -> anyhow::Result<()> {
        req.into_response(200, Some("OK"), &[("Content-Type", "text/html")])?
            .write_all(VIEWER_PAGE.as_bytes())?;
        Ok(())
    })?;

    let pull = Arc::clone(&distributor);
    server.fn_handler("/data", Method::Get, move |req| -> anyhow::Result<()> {
        let payload = pull.snapshot_payload().map_err(crate::Error::from)?;
        req.into_response(200, Some("OK"), &[("Content-Type", "application/json")])?
            .write_all(payload.as_bytes())?;
        Ok(())
    })?;

    command_route(&mut server, "/config", Arc::clone(&inbox), CameraCommand::parse_config)?;
    command_route(&mut server, "/emissivity", inbox, CameraCommand::parse_emissivity)?;

    let live = distributor;
    server.ws_handler("/ws", move |ws: &mut EspHttpWsConnection| -> Result<(), EspError> {
        let id = SubscriberId(ws.session() as u32);
        let now_ms = clock.uptime_ms();

        if ws.is_new() {
            match channel.admit(&live, id, now_ms, || ws.create_detached_sender())? {
                Admission::Admitted => {}
                Admission::Rejected(rejected) => {
                    warn!("HTTP | /ws {} refused: {}", id, rejected);
                    ws.send(FrameType::Text(false), rejected.to_string().as_bytes())?;
                    ws.send(FrameType::Close, &[])?;
                }
            }
            return Ok(());
        }

        if ws.is_closed() {
            channel.unregister(id);
            live.on_subscriber_disconnect(id);
            return Ok(());
        }

        // Any inbound frame counts as activity; its content is ignored.
        let (_, len) = ws.recv(&mut [])?;
        if len > MAX_INBOUND_FRAME {
            warn!("HTTP | /ws {} sent an oversized frame ({} B)", id, len);
            ws.send(FrameType::Close, &[])?;
            return Ok(());
        }
        let mut buf = [0u8; MAX_INBOUND_FRAME];
        ws.recv(&mut buf[..len])?;
        live.on_subscriber_activity(id, now_ms);
        Ok(())
    })?;

    info!("HTTP | server started (/, /data, /ws, /config, /emissivity)");
    Ok(server)
}

/// POST route that parses its body into a command and queues it for the
/// control loop. 202 once queued; the command itself is applied later.
fn command_route(
    server: &mut EspHttpServer<'static>,
    uri: &str,
    inbox: Arc<CommandInbox>,
    parse: fn(&[u8]) -> Result<CameraCommand, ConfigError>,
) -> anyhow::Result<()> {
    server.fn_handler(uri, Method::Post, move |mut req| -> anyhow::Result<()> {
        let len = req.content_len().unwrap_or(0) as usize;
        if len > MAX_COMMAND_BODY {
            req.into_status_response(413)?.write_all(b"body too large")?;
            return Ok(());
        }
        let mut body = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = req.read(&mut body[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        body.truncate(filled);

        let (status, message) = match parse(&body) {
            Ok(cmd) => match inbox.submit(cmd) {
                Ok(()) => (202, "queued".to_string()),
                Err(_) => (503, "command queue full".to_string()),
            },
            Err(e) => (400, e.to_string()),
        };
        if status != 202 {
            warn!("HTTP | {} refused: {}", req.uri(), message);
        }
        req.into_status_response(status)?.write_all(message.as_bytes())?;
        Ok(())
    })?;
    Ok(())
}
