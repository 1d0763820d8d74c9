use std::env;

use anyhow::{bail, Context, Result};
use siteviz_contracts::geometry::DEFAULT_MAX_DISPLAY_WIDTH;

pub const DEFAULT_MAX_SOURCE_PIXELS: u64 = 100_000_000;
pub const DEFAULT_IMAGES_PER_CONCEPT: u32 = 5;
pub const MAX_IMAGES_PER_CONCEPT: u32 = 15;
pub const DEFAULT_INPAINT_PROVIDER: &str = "dryrun";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_display_width: u32,
    pub max_source_pixels: u64,
    pub images_per_concept: u32,
    pub provider: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_display_width: DEFAULT_MAX_DISPLAY_WIDTH,
            max_source_pixels: DEFAULT_MAX_SOURCE_PIXELS,
            images_per_concept: DEFAULT_IMAGES_PER_CONCEPT,
            provider: DEFAULT_INPAINT_PROVIDER.to_string(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `SITEVIZ_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = non_empty_env("SITEVIZ_MAX_DISPLAY_WIDTH") {
            config.max_display_width = raw
                .parse()
                .with_context(|| format!("invalid SITEVIZ_MAX_DISPLAY_WIDTH '{raw}'"))?;
        }
        if let Some(raw) = non_empty_env("SITEVIZ_MAX_SOURCE_PIXELS") {
            config.max_source_pixels = raw
                .parse()
                .with_context(|| format!("invalid SITEVIZ_MAX_SOURCE_PIXELS '{raw}'"))?;
        }
        if let Some(raw) = non_empty_env("SITEVIZ_IMAGES_PER_CONCEPT") {
            config.images_per_concept = raw
                .parse()
                .with_context(|| format!("invalid SITEVIZ_IMAGES_PER_CONCEPT '{raw}'"))?;
        }
        if let Some(raw) = non_empty_env("SITEVIZ_INPAINT_PROVIDER") {
            config.provider = raw.to_ascii_lowercase();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_display_width == 0 {
            bail!("max display width must be positive");
        }
        if self.max_source_pixels == 0 {
            bail!("max source pixels must be positive");
        }
        if !(1..=MAX_IMAGES_PER_CONCEPT).contains(&self.images_per_concept) {
            bail!(
                "images per concept must be between 1 and {MAX_IMAGES_PER_CONCEPT}, got {}",
                self.images_per_concept
            );
        }
        if self.provider.trim().is_empty() {
            bail!("inpaint provider name is empty");
        }
        Ok(())
    }
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
