//! Bilinear upsampling of a sparse temperature grid.
//!
//! Target pixel `(x, y)` maps back to source coordinate
//! `(x·src_w / dst_w, y·src_h / dst_h)`; its value is the bilinear blend of
//! the four surrounding samples, clamped at the far edges. Target pixels
//! that land exactly on a source sample reproduce it.

use crate::error::RenderError;
use crate::frame::{ThermalFrame, HEIGHT, WIDTH};

#[derive(Debug, Clone, PartialEq)]
pub struct UpsampledGrid {
    pub width: usize,
    pub height: usize,
    /// Row-major, `width * height` values.
    pub values: Vec<f32>,
}

impl UpsampledGrid {
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x < self.width && y < self.height {
            self.values.get(y * self.width + x).copied()
        } else {
            None
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks_exact(self.width.max(1))
    }
}

pub fn upsample(
    source: &[f32],
    src_w: usize,
    src_h: usize,
    dst_w: usize,
    dst_h: usize,
) -> Result<UpsampledGrid, RenderError> {
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return Err(RenderError::ZeroDimension);
    }
    if source.len() != src_w * src_h {
        return Err(RenderError::MalformedUpsampleInput {
            expected: src_w * src_h,
            actual: source.len(),
        });
    }

    let at = |x: usize, y: usize| source[y * src_w + x];
    let mut values = Vec::with_capacity(dst_w * dst_h);
    for y in 0..dst_h {
        let sy = (y * src_h) as f32 / dst_h as f32;
        let y0 = (sy as usize).min(src_h - 1);
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = sy - y0 as f32;
        for x in 0..dst_w {
            let sx = (x * src_w) as f32 / dst_w as f32;
            let x0 = (sx as usize).min(src_w - 1);
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = sx - x0 as f32;

            let top = (1.0 - fx) * at(x0, y0) + fx * at(x1, y0);
            let bottom = (1.0 - fx) * at(x0, y1) + fx * at(x1, y1);
            values.push((1.0 - fy) * top + fy * bottom);
        }
    }
    Ok(UpsampledGrid {
        width: dst_w,
        height: dst_h,
        values,
    })
}

/// Upsample a sensor frame.
pub fn upsample_frame(frame: &ThermalFrame, dst_w: usize, dst_h: usize) -> Result<UpsampledGrid, RenderError> {
    upsample(&frame.temperatures()[..], WIDTH, HEIGHT, dst_w, dst_h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PIXELS;

    #[test]
    fn length_mismatch_fails_fast() {
        assert_eq!(
            upsample(&[0.0; 10], 4, 3, 8, 6),
            Err(RenderError::MalformedUpsampleInput {
                expected: 12,
                actual: 10
            })
        );
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert_eq!(upsample(&[], 0, 0, 8, 6), Err(RenderError::ZeroDimension));
        assert_eq!(upsample(&[1.0], 1, 1, 0, 6), Err(RenderError::ZeroDimension));
    }

    #[test]
    fn source_cell_reproduced_at_scale_ten() {
        let mut values = vec![20.0; PIXELS];
        values[5 * WIDTH + 5] = 37.5;
        let frame = ThermalFrame::try_from(values).unwrap();
        let grid = upsample_frame(&frame, 320, 240).unwrap();
        assert_eq!(grid.get(50, 50), Some(37.5));
        assert_eq!(grid.get(0, 0), Some(20.0));
    }

    #[test]
    fn midpoint_is_average() {
        let grid = upsample(&[0.0, 10.0, 20.0, 30.0], 2, 2, 4, 4).unwrap();
        assert_eq!(grid.get(1, 0), Some(5.0));
        assert_eq!(grid.get(0, 1), Some(10.0));
        assert_eq!(grid.get(1, 1), Some(15.0));
    }

    #[test]
    fn far_edge_clamps() {
        let grid = upsample(&[0.0, 10.0, 20.0, 30.0], 2, 2, 4, 4).unwrap();
        // (3, 3) maps to (1.5, 1.5): both neighbours clamp to the last sample.
        assert_eq!(grid.get(3, 3), Some(30.0));
        assert_eq!(grid.rows().count(), 4);
    }
}
