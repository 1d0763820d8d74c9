use anyhow::{bail, Result};
use image::imageops::FilterType;
use image::{DynamicImage, Rgb};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use siteviz_contracts::geometry::{Mask, MASK_SELECTED};

use crate::map_object;

pub const DRYRUN_WORKING_SIZE: u32 = 512;

/// Everything the inpainting collaborator receives for one prompt pair.
#[derive(Debug, Clone, Copy)]
pub struct InpaintRequest<'a> {
    pub image: &'a DynamicImage,
    pub mask: &'a Mask,
    pub positive: &'a str,
    pub negative: &'a str,
    pub count: u32,
    pub seed: Option<u64>,
}

impl InpaintRequest<'_> {
    pub fn validate(&self) -> Result<()> {
        if self.mask.dims() != (self.image.width(), self.image.height()) {
            bail!(
                "mask is {}x{} but source image is {}x{}",
                self.mask.width(),
                self.mask.height(),
                self.image.width(),
                self.image.height()
            );
        }
        if self.count == 0 {
            bail!("inpaint request asks for zero images");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct InpaintResponse {
    pub images: Vec<DynamicImage>,
    pub provider_response: Map<String, Value>,
    pub warnings: Vec<String>,
}

pub trait InpaintProvider: Send + Sync {
    fn name(&self) -> &str;
    fn inpaint(&self, request: &InpaintRequest<'_>) -> Result<InpaintResponse>;
}

#[derive(Default)]
pub struct InpaintProviderRegistry {
    providers: IndexMap<String, Box<dyn InpaintProvider>>,
}

impl InpaintProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: InpaintProvider + 'static>(&mut self, provider: P) {
        self.providers
            .insert(provider.name().to_string(), Box::new(provider));
    }

    pub fn get(&self, name: &str) -> Option<&dyn InpaintProvider> {
        self.providers.get(name).map(|provider| provider.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn require(&self, name: &str) -> Result<&dyn InpaintProvider> {
        match self.get(name) {
            Some(provider) => Ok(provider),
            None => bail!(
                "unknown inpaint provider '{name}' (available: {})",
                self.names().join(", ")
            ),
        }
    }
}

pub fn default_provider_registry() -> InpaintProviderRegistry {
    let mut providers = InpaintProviderRegistry::new();
    providers.register(DryrunInpaintProvider::default());
    providers
}

/// Deterministic stand-in for a diffusion model.
///
/// Works at a fixed square resolution the way hosted inpainting models do, so
/// callers still have to scale results back to the source size.
#[derive(Debug, Clone)]
pub struct DryrunInpaintProvider {
    working_size: u32,
}

impl Default for DryrunInpaintProvider {
    fn default() -> Self {
        Self {
            working_size: DRYRUN_WORKING_SIZE,
        }
    }
}

impl DryrunInpaintProvider {
    pub fn with_working_size(working_size: u32) -> Self {
        Self {
            working_size: working_size.max(1),
        }
    }
}

impl InpaintProvider for DryrunInpaintProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn inpaint(&self, request: &InpaintRequest<'_>) -> Result<InpaintResponse> {
        request.validate()?;
        let size = self.working_size;
        let base = request
            .image
            .resize_exact(size, size, FilterType::Triangle)
            .to_rgb8();
        let (mask_w, mask_h) = request.mask.dims();

        let mut images = Vec::new();
        for idx in 0..request.count {
            let (r, g, b) = color_from_prompt(request.positive, request.negative, idx, request.seed);
            let mut canvas = base.clone();
            for (x, y, pixel) in canvas.enumerate_pixels_mut() {
                let src_x = (u64::from(x) * u64::from(mask_w) / u64::from(size)) as u32;
                let src_y = (u64::from(y) * u64::from(mask_h) / u64::from(size)) as u32;
                if request.mask.get(src_x, src_y) == Some(MASK_SELECTED) {
                    *pixel = Rgb([r, g, b]);
                }
            }
            images.push(DynamicImage::ImageRgb8(canvas));
        }

        let mut warnings = Vec::new();
        if request.mask.is_blank() {
            warnings.push("mask selects no pixels; outputs equal the source".to_string());
        }

        Ok(InpaintResponse {
            provider_response: map_object(json!({
                "status": "ok",
                "provider": self.name(),
                "count": images.len(),
                "working_size": size,
                "prompt_hash": prompt_hash(request.positive, request.negative),
            })),
            images,
            warnings,
        })
    }
}

fn color_from_prompt(positive: &str, negative: &str, idx: u32, seed: Option<u64>) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(positive.as_bytes());
    hasher.update([0u8]);
    hasher.update(negative.as_bytes());
    hasher.update(idx.to_be_bytes());
    hasher.update(seed.unwrap_or_default().to_be_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}

fn prompt_hash(positive: &str, negative: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(positive.as_bytes());
    hasher.update([0u8]);
    hasher.update(negative.as_bytes());
    hex::encode(&hasher.finalize()[..8])
}
