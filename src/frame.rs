//! The calibrated temperature grid.
//!
//! A [`ThermalFrame`] is immutable once built: acquisition produces a new
//! one per successful subpage pair and the distribution layer swaps it in
//! whole. The pixel count is fixed by the array type, so a frame of the
//! wrong size cannot exist.

use crate::error::WireError;

/// Sensor columns.
pub const WIDTH: usize = 32;
/// Sensor rows.
pub const HEIGHT: usize = 24;
/// Pixels per frame.
pub const PIXELS: usize = WIDTH * HEIGHT;

/// One complete calibrated capture, row-major, degrees Celsius.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalFrame {
    temperatures: Box<[f32; PIXELS]>,
}

impl ThermalFrame {
    /// All-zero frame published before the first acquisition succeeds.
    pub fn blank() -> Self {
        Self {
            temperatures: Box::new([0.0; PIXELS]),
        }
    }

    pub fn from_array(temperatures: Box<[f32; PIXELS]>) -> Self {
        Self { temperatures }
    }

    pub fn temperatures(&self) -> &[f32; PIXELS] {
        &self.temperatures
    }

    /// Temperature at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x < WIDTH && y < HEIGHT {
            Some(self.temperatures[y * WIDTH + x])
        } else {
            None
        }
    }

    /// Smallest and largest temperature in the frame.
    pub fn min_max(&self) -> (f32, f32) {
        min_max(&self.temperatures[..])
    }

    /// Index of the first non-finite pixel, if any.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.temperatures.iter().position(|t| !t.is_finite())
    }
}

impl TryFrom<Vec<f32>> for ThermalFrame {
    type Error = WireError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        let actual = values.len();
        let temperatures: Box<[f32; PIXELS]> = values
            .into_boxed_slice()
            .try_into()
            .map_err(|_| WireError::WrongLength {
                expected: PIXELS,
                actual,
            })?;
        Ok(Self { temperatures })
    }
}

/// Min/max over a slice; `(0, 0)` when empty.
pub fn min_max(values: &[f32]) -> (f32, f32) {
    let mut iter = values.iter().copied();
    let Some(first) = iter.next() else {
        return (0.0, 0.0);
    };
    iter.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)))
}
