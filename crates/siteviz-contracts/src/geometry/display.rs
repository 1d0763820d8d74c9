use anyhow::bail;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_DISPLAY_WIDTH: u32 = 1000;

/// Maps between the source image and the bounded preview the canvas draws on.
///
/// Only the final pixel dimensions are rounded; `scaling_factor` keeps the
/// exact ratio so display coordinates can be mapped back without drift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayTransform {
    pub scaling_factor: f64,
    pub source_width: u32,
    pub source_height: u32,
    pub display_width: u32,
    pub display_height: u32,
}

impl DisplayTransform {
    pub fn fit(source_width: u32, source_height: u32, max_width: u32) -> anyhow::Result<Self> {
        if source_width == 0 || source_height == 0 {
            bail!("source image has no pixels ({source_width}x{source_height})");
        }
        if max_width == 0 {
            bail!("maximum display width must be positive");
        }

        if source_width <= max_width {
            return Ok(Self::identity(source_width, source_height));
        }

        let scaling_factor = f64::from(max_width) / f64::from(source_width);
        let display_height = (f64::from(source_height) * scaling_factor).round().max(1.0) as u32;
        Ok(Self {
            scaling_factor,
            source_width,
            source_height,
            display_width: max_width,
            display_height,
        })
    }

    pub fn identity(width: u32, height: u32) -> Self {
        Self {
            scaling_factor: 1.0,
            source_width: width,
            source_height: height,
            display_width: width,
            display_height: height,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.scaling_factor == 1.0
    }

    pub fn to_source(&self, display_value: f64) -> f64 {
        display_value / self.scaling_factor
    }

    pub fn to_display(&self, source_value: f64) -> f64 {
        source_value * self.scaling_factor
    }

    pub fn source_dims(&self) -> (u32, u32) {
        (self.source_width, self.source_height)
    }

    pub fn display_dims(&self) -> (u32, u32) {
        (self.display_width, self.display_height)
    }
}

#[cfg(test)]
mod tests {
    use super::{DisplayTransform, DEFAULT_MAX_DISPLAY_WIDTH};

    #[test]
    fn narrow_images_are_not_rescaled() -> anyhow::Result<()> {
        for (w, h) in [(1, 1), (640, 480), (999, 2000), (1000, 1000)] {
            let transform = DisplayTransform::fit(w, h, DEFAULT_MAX_DISPLAY_WIDTH)?;
            assert_eq!(transform.scaling_factor, 1.0);
            assert_eq!(transform.display_dims(), (w, h));
            assert!(transform.is_identity());
        }
        Ok(())
    }

    #[test]
    fn wide_images_pin_display_width() -> anyhow::Result<()> {
        for (w, h) in [(1001, 777), (2000, 1000), (4032, 3024), (3333, 17)] {
            let transform = DisplayTransform::fit(w, h, DEFAULT_MAX_DISPLAY_WIDTH)?;
            assert_eq!(transform.display_width, DEFAULT_MAX_DISPLAY_WIDTH);
            let expected = f64::from(h) * f64::from(DEFAULT_MAX_DISPLAY_WIDTH) / f64::from(w);
            assert!((f64::from(transform.display_height) - expected).abs() <= 0.5);
        }
        Ok(())
    }

    #[test]
    fn half_scale_scenario() -> anyhow::Result<()> {
        let transform = DisplayTransform::fit(2000, 1000, 1000)?;
        assert_eq!(transform.scaling_factor, 0.5);
        assert_eq!(transform.display_dims(), (1000, 500));
        assert_eq!(transform.to_source(100.0), 200.0);
        assert_eq!(transform.to_display(200.0), 100.0);
        Ok(())
    }

    #[test]
    fn very_flat_images_keep_one_display_row() -> anyhow::Result<()> {
        let transform = DisplayTransform::fit(100_000, 10, 1000)?;
        assert_eq!(transform.display_height, 1);
        Ok(())
    }

    #[test]
    fn rejects_empty_inputs() {
        assert!(DisplayTransform::fit(0, 10, 1000).is_err());
        assert!(DisplayTransform::fit(10, 0, 1000).is_err());
        assert!(DisplayTransform::fit(10, 10, 0).is_err());
    }
}
