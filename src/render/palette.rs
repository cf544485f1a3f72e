//! Temperature → colour palettes.
//!
//! Every palette is a total function of the normalised temperature
//! `v ∈ [0, 1]` into HSL space (hue in degrees, saturation and lightness
//! in percent).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    /// Blue (cold) through red (hot).
    #[default]
    Rainbow,
    /// Grayscale, hotter is brighter. Also known as "arctic".
    WhiteHot,
    /// Violet through green with a bright highlight band.
    NightVision,
    /// Purple, red, yellow, then white. Also known as "fusion".
    Iron,
}

impl Palette {
    pub const ALL: [Self; 4] = [Self::Rainbow, Self::WhiteHot, Self::NightVision, Self::Iron];

    /// Look up a palette by name. Unknown names fall back to rainbow.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "whitehot" | "white-hot" | "white_hot" | "arctic" => Self::WhiteHot,
            "nightvision" | "night-vision" | "night_vision" => Self::NightVision,
            "iron" | "fusion" => Self::Iron,
            _ => Self::Rainbow,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Rainbow => "rainbow",
            Self::WhiteHot => "whitehot",
            Self::NightVision => "nightvision",
            Self::Iron => "iron",
        }
    }

    /// Colour for an already-normalised value; `v` is clamped to [0, 1].
    pub fn map(self, v: f32) -> Hsl {
        let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        match self {
            Self::Rainbow => Hsl::new(240.0 * (1.0 - v), 100.0, 50.0),
            Self::WhiteHot => Hsl::new(0.0, 0.0, 100.0 * v.powf(1.5)),
            Self::NightVision => {
                let lightness = if v > 0.9 {
                    (60.0 + 500.0 * (v - 0.9)).min(100.0)
                } else {
                    (60.0 * v.powf(1.5)).max(5.0)
                };
                Hsl::new(270.0 - 250.0 * v, 100.0, lightness)
            }
            Self::Iron => {
                let hue = if v <= 0.5 {
                    270.0 + 90.0 * (v / 0.5)
                } else if v < 0.9 {
                    60.0 * ((v - 0.5) / 0.4)
                } else {
                    60.0
                };
                let (saturation, lightness) = if v >= 0.9 {
                    let t = 10.0 * (v - 0.9);
                    (100.0 - 100.0 * t, 65.0 + 35.0 * t)
                } else {
                    (100.0, 65.0 * v.powf(1.5))
                };
                Hsl::new(hue % 360.0, saturation.max(0.0), lightness.min(100.0))
            }
        }
    }
}

/// Position of `t` within `[min, max]`, clamped; 0 when the range is empty.
pub fn normalize(t: f32, min: f32, max: f32) -> f32 {
    let span = max - min;
    if span <= 0.0 || !span.is_finite() {
        return 0.0;
    }
    ((t - min) / span).clamp(0.0, 1.0)
}

pub fn colorize(t: f32, min: f32, max: f32, palette: Palette) -> Hsl {
    palette.map(normalize(t, min, max))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Hsl {
    pub const fn new(hue: f32, saturation: f32, lightness: f32) -> Self {
        Self {
            hue,
            saturation,
            lightness,
        }
    }

    pub fn to_rgb(self) -> Rgb {
        let s = (self.saturation / 100.0).clamp(0.0, 1.0);
        let l = (self.lightness / 100.0).clamp(0.0, 1.0);
        let h = self.hue.rem_euclid(360.0) / 60.0;

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c / 2.0;
        let to_byte = |ch: f32| ((ch + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgb {
            r: to_byte(r),
            g: to_byte(g),
            b: to_byte(b),
        }
    }
}

impl core::fmt::Display for Hsl {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "hsl({}, {}%, {}%)",
            self.hue.round(),
            self.saturation.round(),
            self.lightness.round()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_fall_back_to_rainbow() {
        assert_eq!(Palette::from_name("plasma"), Palette::Rainbow);
        assert_eq!(Palette::from_name(""), Palette::Rainbow);
        assert_eq!(Palette::from_name("Arctic"), Palette::WhiteHot);
        assert_eq!(Palette::from_name("fusion"), Palette::Iron);
        assert_eq!(Palette::from_name("night-vision"), Palette::NightVision);
    }

    #[test]
    fn names_round_trip() {
        for p in Palette::ALL {
            assert_eq!(Palette::from_name(p.name()), p);
        }
    }

    #[test]
    fn rainbow_spans_blue_to_red() {
        assert_eq!(colorize(10.0, 10.0, 40.0, Palette::Rainbow).hue, 240.0);
        assert_eq!(colorize(40.0, 10.0, 40.0, Palette::Rainbow).hue, 0.0);
        assert_eq!(colorize(25.0, 10.0, 40.0, Palette::Rainbow).hue, 120.0);
    }

    #[test]
    fn degenerate_range_maps_to_zero() {
        assert_eq!(normalize(5.0, 5.0, 5.0), 0.0);
        assert_eq!(normalize(5.0, 6.0, 5.0), 0.0);
        assert_eq!(colorize(7.0, 7.0, 7.0, Palette::Rainbow).hue, 240.0);
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(normalize(-100.0, 0.0, 10.0), 0.0);
        assert_eq!(normalize(100.0, 0.0, 10.0), 1.0);
    }

    #[test]
    fn white_hot_lightness_curve() {
        let c = Palette::WhiteHot.map(0.25);
        assert_eq!(c.saturation, 0.0);
        assert!((c.lightness - 12.5).abs() < 1e-4);
        assert_eq!(Palette::WhiteHot.map(1.0).lightness, 100.0);
    }

    #[test]
    fn night_vision_floor_and_highlight() {
        assert_eq!(Palette::NightVision.map(0.0).lightness, 5.0);
        assert_eq!(Palette::NightVision.map(0.0).hue, 270.0);
        assert!((Palette::NightVision.map(0.95).lightness - 85.0).abs() < 1e-3);
        assert_eq!(Palette::NightVision.map(1.0).lightness, 100.0);
    }

    #[test]
    fn iron_hue_wraps_and_whitens() {
        assert_eq!(Palette::Iron.map(0.0).hue, 270.0);
        assert_eq!(Palette::Iron.map(0.5).hue, 0.0);
        assert!((Palette::Iron.map(0.7).hue - 30.0).abs() < 1e-3);
        let top = Palette::Iron.map(1.0);
        assert_eq!(top.hue, 60.0);
        assert!(top.saturation.abs() < 1e-3);
        assert!((top.lightness - 100.0).abs() < 1e-3);
    }

    #[test]
    fn hsl_to_rgb_primaries() {
        assert_eq!(Hsl::new(0.0, 100.0, 50.0).to_rgb(), Rgb { r: 255, g: 0, b: 0 });
        assert_eq!(Hsl::new(120.0, 100.0, 50.0).to_rgb(), Rgb { r: 0, g: 255, b: 0 });
        assert_eq!(Hsl::new(240.0, 100.0, 50.0).to_rgb(), Rgb { r: 0, g: 0, b: 255 });
        assert_eq!(Hsl::new(0.0, 0.0, 100.0).to_rgb(), Rgb { r: 255, g: 255, b: 255 });
    }

    #[test]
    fn css_display() {
        assert_eq!(Palette::Rainbow.map(0.0).to_string(), "hsl(240, 100%, 50%)");
    }
}
