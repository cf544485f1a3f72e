//! Viewer-side rendering state.
//!
//! Turns wire payloads into colour images: decode, per-frame min/max,
//! bilinear upsample to the display size, colourise, mirror. A payload that
//! fails any step is dropped with a log line and the last good image stays
//! on screen.

use log::{debug, warn};

use crate::config::SystemConfig;
use crate::error::{Error, RenderError};
use crate::frame::ThermalFrame;
use crate::stream::codec;

use super::palette::{colorize, Palette, Rgb};
use super::upsample::upsample_frame;

/// Where frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// A standing channel delivers pushed frames.
    Streaming,
    /// No channel; the viewer pulls a snapshot every pull interval.
    Polling,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub width: usize,
    pub height: usize,
    /// Row-major, `width * height` colours.
    pub pixels: Vec<Rgb>,
    pub min: f32,
    pub max: f32,
}

impl RenderedImage {
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        if x < self.width && y < self.height {
            self.pixels.get(y * self.width + x).copied()
        } else {
            None
        }
    }

    /// Min/max caption, one decimal place.
    pub fn range_label(&self) -> (String, String) {
        (format!("{:.1}", self.min), format!("{:.1}", self.max))
    }
}

pub struct Viewer {
    palette: Palette,
    width: usize,
    height: usize,
    mirror: bool,
    pull_interval_ms: u64,
    mode: FeedMode,
    last_pull_ms: Option<u64>,
    image: Option<RenderedImage>,
}

impl Viewer {
    pub fn new(width: usize, height: usize, palette: Palette) -> Self {
        Self {
            palette,
            width,
            height,
            mirror: true,
            pull_interval_ms: 1_000,
            mode: FeedMode::Polling,
            last_pull_ms: None,
            image: None,
        }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        let mut viewer = Self::new(
            usize::from(config.render_width),
            usize::from(config.render_height),
            config.default_palette,
        );
        viewer.mirror = config.mirror_horizontal;
        viewer.pull_interval_ms = u64::from(config.pull_interval_ms);
        viewer
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    /// Select a palette by its display name; unknown names select rainbow.
    pub fn set_palette_by_name(&mut self, name: &str) -> Palette {
        self.palette = Palette::from_name(name);
        self.palette
    }

    pub fn set_mirror(&mut self, mirror: bool) {
        self.mirror = mirror;
    }

    pub fn image(&self) -> Option<&RenderedImage> {
        self.image.as_ref()
    }

    pub fn mode(&self) -> FeedMode {
        self.mode
    }

    // ── Feed ──────────────────────────────────────────────────

    pub fn on_channel_open(&mut self) {
        self.mode = FeedMode::Streaming;
    }

    pub fn on_channel_closed(&mut self) {
        self.mode = FeedMode::Polling;
        self.last_pull_ms = None;
    }

    /// True when a snapshot should be pulled now. Never true while streaming.
    pub fn pull_due(&mut self, now_ms: u64) -> bool {
        if self.mode == FeedMode::Streaming {
            return false;
        }
        match self.last_pull_ms {
            Some(last) if now_ms.saturating_sub(last) < self.pull_interval_ms => false,
            _ => {
                self.last_pull_ms = Some(now_ms);
                true
            }
        }
    }

    // ── Rendering ─────────────────────────────────────────────

    /// Decode and render one payload, pushed or pulled.
    pub fn on_payload(&mut self, payload: &str) -> Result<&RenderedImage, Error> {
        let rendered = codec::decode(payload)
            .map_err(Error::from)
            .and_then(|frame| self.render(&frame).map_err(Error::from));
        match rendered {
            Ok(image) => {
                debug!("VIEW | frame {:.1}..{:.1} °C", image.min, image.max);
                Ok(self.image.insert(image))
            }
            Err(e) => {
                warn!("VIEW | payload dropped: {}", e);
                Err(e)
            }
        }
    }

    /// Render a frame with the current palette without touching the held image.
    pub fn render(&self, frame: &ThermalFrame) -> Result<RenderedImage, RenderError> {
        let (min, max) = frame.min_max();
        let grid = upsample_frame(frame, self.width, self.height)?;

        let mut pixels = Vec::with_capacity(grid.values.len());
        for row in grid.rows() {
            let start = pixels.len();
            pixels.extend(row.iter().map(|&t| colorize(t, min, max, self.palette).to_rgb()));
            if self.mirror {
                pixels[start..].reverse();
            }
        }

        Ok(RenderedImage {
            width: grid.width,
            height: grid.height,
            pixels,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WireError;
    use crate::frame::{PIXELS, WIDTH};

    fn frame_with_hot_corner() -> ThermalFrame {
        let mut values = vec![20.0; PIXELS];
        values[0] = 40.0;
        ThermalFrame::try_from(values).unwrap()
    }

    #[test]
    fn min_max_are_per_frame() {
        let viewer = Viewer::new(32, 24, Palette::Rainbow);
        let image = viewer.render(&frame_with_hot_corner()).unwrap();
        assert_eq!((image.min, image.max), (20.0, 40.0));
        assert_eq!(image.range_label(), ("20.0".to_owned(), "40.0".to_owned()));
    }

    #[test]
    fn mirroring_moves_left_column_to_right_edge() {
        let mut viewer = Viewer::new(WIDTH, 24, Palette::Rainbow);
        let red = Rgb { r: 255, g: 0, b: 0 };
        let blue = Rgb { r: 0, g: 0, b: 255 };

        viewer.set_mirror(false);
        let straight = viewer.render(&frame_with_hot_corner()).unwrap();
        assert_eq!(straight.pixel(0, 0), Some(red));
        assert_eq!(straight.pixel(WIDTH - 1, 0), Some(blue));

        viewer.set_mirror(true);
        let mirrored = viewer.render(&frame_with_hot_corner()).unwrap();
        assert_eq!(mirrored.pixel(WIDTH - 1, 0), Some(red));
        assert_eq!(mirrored.pixel(0, 0), Some(blue));
    }

    #[test]
    fn bad_payload_keeps_last_image() {
        let mut viewer = Viewer::new(64, 48, Palette::Iron);
        let good = codec::encode(&frame_with_hot_corner()).unwrap();
        assert!(viewer.on_payload(&good).is_ok());

        let err = viewer.on_payload("{\"temperatures\":[1,2,3]}").unwrap_err();
        assert_eq!(
            err,
            Error::Wire(WireError::WrongLength {
                expected: PIXELS,
                actual: 3
            })
        );
        assert_eq!(viewer.image().map(|i| i.max), Some(40.0));
    }

    #[test]
    fn unknown_palette_selects_rainbow() {
        let mut viewer = Viewer::new(32, 24, Palette::Iron);
        assert_eq!(viewer.set_palette_by_name("magma"), Palette::Rainbow);
        assert_eq!(viewer.set_palette_by_name("whitehot"), Palette::WhiteHot);
    }

    #[test]
    fn pulls_only_without_channel() {
        let mut viewer = Viewer::from_config(&SystemConfig::default());
        assert!(viewer.pull_due(0));
        assert!(!viewer.pull_due(500));
        assert!(viewer.pull_due(1_000));

        viewer.on_channel_open();
        assert!(!viewer.pull_due(5_000));

        viewer.on_channel_closed();
        assert!(viewer.pull_due(5_001));
    }

    #[test]
    fn default_size_is_ten_times_sensor() {
        let viewer = Viewer::from_config(&SystemConfig::default());
        let image = viewer.render(&ThermalFrame::blank()).unwrap();
        assert_eq!((image.width, image.height), (320, 240));
        assert_eq!(image.pixels.len(), 320 * 240);
    }
}
