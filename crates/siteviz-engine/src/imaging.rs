use std::path::Path;

use anyhow::{bail, Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbaImage};
use siteviz_contracts::geometry::{DisplayTransform, Mask};

/// Opens a source image, refusing anything above `max_pixels` before decoding.
pub fn load_source_image(path: &Path, max_pixels: u64) -> Result<DynamicImage> {
    let (width, height) = image::image_dimensions(path)
        .with_context(|| format!("failed reading image header {}", path.display()))?;
    check_source_dims(width, height, max_pixels)?;
    image::open(path).with_context(|| format!("failed decoding image {}", path.display()))
}

pub fn check_source_dims(width: u32, height: u32, max_pixels: u64) -> Result<()> {
    if width == 0 || height == 0 {
        bail!("image has no pixels ({width}x{height})");
    }
    let pixels = u64::from(width) * u64::from(height);
    if pixels > max_pixels {
        bail!("image too large: {width}x{height} is {pixels} pixels, limit is {max_pixels}");
    }
    Ok(())
}

/// Preview at display size; the source buffer is never modified.
pub fn render_preview(image: &DynamicImage, transform: &DisplayTransform) -> DynamicImage {
    if transform.is_identity() {
        return image.clone();
    }
    image.resize_exact(
        transform.display_width,
        transform.display_height,
        FilterType::Triangle,
    )
}

pub fn mask_to_image(mask: &Mask) -> Result<GrayImage> {
    let (width, height) = mask.dims();
    GrayImage::from_raw(width, height, mask.as_bytes().to_vec())
        .with_context(|| format!("mask buffer does not fit {width}x{height}"))
}

/// Reads an externally supplied mask, thresholding at half intensity.
pub fn mask_from_image(image: &DynamicImage) -> Result<Mask> {
    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();
    Mask::from_raw(width, height, gray.into_raw())
}

pub fn load_mask_image(path: &Path) -> Result<Mask> {
    let image =
        image::open(path).with_context(|| format!("failed decoding mask {}", path.display()))?;
    mask_from_image(&image)
}

pub fn save_mask(mask: &Mask, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    mask_to_image(mask)?
        .save(path)
        .with_context(|| format!("failed to save {}", path.display()))
}

/// Darkens the selected region with a half-strength black layer.
pub fn overlay_mask(image: &DynamicImage, mask: &Mask) -> Result<RgbaImage> {
    if image.width() != mask.width() || image.height() != mask.height() {
        bail!(
            "mask is {}x{} but image is {}x{}",
            mask.width(),
            mask.height(),
            image.width(),
            image.height()
        );
    }
    let mut combined = image.to_rgba8();
    for (x, y, pixel) in combined.enumerate_pixels_mut() {
        let alpha = f32::from(mask.get(x, y).unwrap_or(0) / 2) / 255.0;
        if alpha == 0.0 {
            continue;
        }
        let dst_alpha = f32::from(pixel[3]) / 255.0;
        let out_alpha = alpha + dst_alpha * (1.0 - alpha);
        if out_alpha <= 0.0 {
            continue;
        }
        for channel in 0..3 {
            let value = f32::from(pixel[channel]) * dst_alpha * (1.0 - alpha) / out_alpha;
            pixel[channel] = value.round().clamp(0.0, 255.0) as u8;
        }
        pixel[3] = (out_alpha * 255.0).round() as u8;
    }
    Ok(combined)
}

pub fn resize_to_source(generated: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    if generated.width() == width && generated.height() == height {
        return generated.clone();
    }
    generated.resize_exact(width, height, FilterType::Lanczos3)
}

pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed creating {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
    use siteviz_contracts::geometry::{DisplayTransform, Mask, PixelRect};

    use super::*;

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 100, 50])))
    }

    #[test]
    fn preview_matches_display_dims() -> anyhow::Result<()> {
        let image = solid(2000, 1000);
        let transform = DisplayTransform::fit(2000, 1000, 1000)?;
        let preview = render_preview(&image, &transform);
        assert_eq!((preview.width(), preview.height()), (1000, 500));
        assert_eq!((image.width(), image.height()), (2000, 1000));

        let small = solid(40, 30);
        let same = render_preview(&small, &DisplayTransform::fit(40, 30, 1000)?);
        assert_eq!(same, small);
        Ok(())
    }

    #[test]
    fn load_rejects_oversized_and_missing_images() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("site.png");
        solid(20, 10).save(&path)?;

        assert!(load_source_image(&path, 199).is_err());
        let loaded = load_source_image(&path, 200)?;
        assert_eq!((loaded.width(), loaded.height()), (20, 10));

        assert!(load_source_image(&temp.path().join("missing.png"), 200).is_err());
        Ok(())
    }

    #[test]
    fn mask_survives_png_round_trip() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("mask.png");
        let region = PixelRect {
            left: 2,
            top: 3,
            right: 7,
            bottom: 9,
        };
        let mask = Mask::from_region(10, 12, region);
        save_mask(&mask, &path)?;
        let reloaded = load_mask_image(&path)?;
        assert_eq!(reloaded, mask);
        Ok(())
    }

    #[test]
    fn overlay_darkens_only_selected_pixels() -> anyhow::Result<()> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([200, 100, 50, 255])));
        let mask = Mask::from_region(
            4,
            4,
            PixelRect {
                left: 0,
                top: 0,
                right: 2,
                bottom: 4,
            },
        );
        let combined = overlay_mask(&image, &mask)?;
        // 255 / 2 = 127 alpha of black over opaque pixels.
        let darkened = combined.get_pixel(0, 0);
        assert_eq!(darkened[3], 255);
        assert_eq!(darkened[0], (200.0_f32 * (1.0 - 127.0 / 255.0)).round() as u8);
        assert_eq!(*combined.get_pixel(3, 3), Rgba([200, 100, 50, 255]));

        assert!(overlay_mask(&image, &Mask::empty(3, 4)).is_err());
        Ok(())
    }

    #[test]
    fn resize_to_source_restores_dims() {
        let generated = solid(64, 64);
        let resized = resize_to_source(&generated, 30, 20);
        assert_eq!((resized.width(), resized.height()), (30, 20));
    }

    #[test]
    fn dims_check() {
        assert!(check_source_dims(0, 10, 100).is_err());
        assert!(check_source_dims(10, 10, 100).is_ok());
        assert!(check_source_dims(10, 11, 100).is_err());
    }
}
