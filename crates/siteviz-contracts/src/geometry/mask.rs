use serde::{Deserialize, Serialize};

use super::display::DisplayTransform;
use super::selection::Selection;

pub const MASK_SELECTED: u8 = 255;
pub const MASK_EXCLUDED: u8 = 0;

/// Half-open pixel rectangle in source space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelRect {
    pub fn empty_at(left: u32, top: u32) -> Self {
        Self {
            left,
            top,
            right: left,
            bottom: top,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

/// Maps a display-space selection onto source pixels.
///
/// Values are truncated toward zero before clamping, never rounded. The
/// clamped origin is used to place the far edge, so a selection dragged past
/// the top-left keeps its full extent from zero.
pub fn source_region(selection: &Selection, transform: &DisplayTransform) -> PixelRect {
    let left = truncate(transform.to_source(selection.left));
    let top = truncate(transform.to_source(selection.top));
    let width = truncate(transform.to_source(selection.effective_width()));
    let height = truncate(transform.to_source(selection.effective_height()));

    clamp_region(
        left,
        top,
        width,
        height,
        transform.source_width,
        transform.source_height,
    )
}

/// Region from fractional corner ratios; the bottom-right pixel is included.
pub fn ratio_region(
    width: u32,
    height: u32,
    top_left_x: f64,
    top_left_y: f64,
    bottom_right_x: f64,
    bottom_right_y: f64,
) -> PixelRect {
    let left = truncate(f64::from(width) * top_left_x);
    let top = truncate(f64::from(height) * top_left_y);
    let right = truncate(f64::from(width) * bottom_right_x).saturating_add(1);
    let bottom = truncate(f64::from(height) * bottom_right_y).saturating_add(1);
    clamp_region(
        left,
        top,
        right.saturating_sub(left.max(0)),
        bottom.saturating_sub(top.max(0)),
        width,
        height,
    )
}

fn truncate(value: f64) -> i64 {
    // `as` truncates toward zero and saturates; NaN becomes 0.
    value as i64
}

fn clamp_region(left: i64, top: i64, width: i64, height: i64, max_w: u32, max_h: u32) -> PixelRect {
    let left = left.max(0);
    let top = top.max(0);
    let right = left.saturating_add(width).min(i64::from(max_w));
    let bottom = top.saturating_add(height).min(i64::from(max_h));

    let origin_x = left.min(i64::from(max_w)) as u32;
    let origin_y = top.min(i64::from(max_h)) as u32;
    if right <= left || bottom <= top {
        return PixelRect::empty_at(origin_x, origin_y);
    }
    PixelRect {
        left: origin_x,
        top: origin_y,
        right: right as u32,
        bottom: bottom as u32,
    }
}

/// Single-channel mask, row-major, one byte per source pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Mask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![MASK_EXCLUDED; width as usize * height as usize],
        }
    }

    pub fn from_region(width: u32, height: u32, region: PixelRect) -> Self {
        let mut mask = Self::empty(width, height);
        if region.is_empty() {
            return mask;
        }
        let right = region.right.min(width) as usize;
        let bottom = region.bottom.min(height) as usize;
        let left = (region.left as usize).min(right);
        let top = (region.top as usize).min(bottom);
        let row_len = width as usize;
        for y in top..bottom {
            let start = y * row_len;
            mask.data[start + left..start + right].fill(MASK_SELECTED);
        }
        mask
    }

    /// Mask for the current selection; an absent selection selects nothing.
    pub fn from_selection(selection: Option<&Selection>, transform: &DisplayTransform) -> Self {
        let (width, height) = transform.source_dims();
        match selection {
            Some(selection) => Self::from_region(width, height, source_region(selection, transform)),
            None => Self::empty(width, height),
        }
    }

    /// Builds a mask from raw bytes, snapping every value to 0 or 255.
    pub fn from_raw(width: u32, height: u32, raw: Vec<u8>) -> anyhow::Result<Self> {
        let expected = width as usize * height as usize;
        if raw.len() != expected {
            anyhow::bail!(
                "mask buffer has {} bytes, expected {expected} for {width}x{height}",
                raw.len()
            );
        }
        let data = raw
            .into_iter()
            .map(|value| if value >= 128 { MASK_SELECTED } else { MASK_EXCLUDED })
            .collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dims(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn selected_count(&self) -> usize {
        self.data
            .iter()
            .filter(|value| **value == MASK_SELECTED)
            .count()
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|value| *value == MASK_EXCLUDED)
    }

    /// Tight bounding box of the selected pixels.
    pub fn selected_bounds(&self) -> Option<PixelRect> {
        let mut bounds: Option<PixelRect> = None;
        for (idx, value) in self.data.iter().enumerate() {
            if *value != MASK_SELECTED {
                continue;
            }
            let x = (idx % self.width as usize) as u32;
            let y = (idx / self.width as usize) as u32;
            bounds = Some(match bounds {
                None => PixelRect {
                    left: x,
                    top: y,
                    right: x + 1,
                    bottom: y + 1,
                },
                Some(rect) => PixelRect {
                    left: rect.left.min(x),
                    top: rect.top.min(y),
                    right: rect.right.max(x + 1),
                    bottom: rect.bottom.max(y + 1),
                },
            });
        }
        bounds
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}
