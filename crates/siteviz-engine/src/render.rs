use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use image::DynamicImage;
use serde_json::json;
use siteviz_contracts::events::{now_utc_iso, EventWriter};
use siteviz_contracts::extract::ConceptPrompt;
use siteviz_contracts::geometry::Mask;
use siteviz_contracts::runs::concepts::{concept_folder_name, write_prompts_file};
use siteviz_contracts::runs::summary::{write_summary, ConceptOutput, RenderSummary};

use crate::imaging::resize_to_source;
use crate::providers::{InpaintProvider, InpaintRequest};
use crate::map_object;

pub const SUMMARY_FILE_NAME: &str = "summary.json";
pub const PROMPTS_FILE_NAME: &str = "prompts.txt";

/// Renders every concept into `out_dir/<concept>/generated_image_{i}.png`,
/// each scaled back to the source dimensions, plus a `prompts.txt`.
pub fn render_concepts(
    provider: &dyn InpaintProvider,
    source: &DynamicImage,
    mask: &Mask,
    prompts: &[ConceptPrompt],
    images_per_concept: u32,
    out_dir: &Path,
    events: &EventWriter,
) -> Result<RenderSummary> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed creating {}", out_dir.display()))?;
    let started_at = now_utc_iso();
    let (source_width, source_height) = (source.width(), source.height());

    events.emit(
        "render_started",
        map_object(json!({
            "provider": provider.name(),
            "concepts": prompts.len(),
            "images_per_concept": images_per_concept,
            "out_dir": out_dir.to_string_lossy().to_string(),
        })),
    )?;

    let mut used_folders: HashSet<String> = HashSet::new();
    let mut concepts = Vec::new();
    for (idx, prompt) in prompts.iter().enumerate() {
        let folder = unique_folder(concept_folder_name(&prompt.concept, idx), &mut used_folders);
        events.emit(
            "concept_started",
            map_object(json!({
                "concept": prompt.concept,
                "folder": folder,
            })),
        )?;

        let response = provider
            .inpaint(&InpaintRequest {
                image: source,
                mask,
                positive: &prompt.positive,
                negative: &prompt.negative,
                count: images_per_concept,
                seed: None,
            })
            .with_context(|| format!("inpainting failed for concept '{}'", prompt.concept))?;
        let mut warnings = response.warnings.clone();
        if response.images.len() != images_per_concept as usize {
            warnings.push(format!(
                "provider returned {} image(s), {} requested",
                response.images.len(),
                images_per_concept
            ));
        }
        for warning in &warnings {
            events.emit(
                "provider_warning",
                map_object(json!({
                    "concept": prompt.concept,
                    "warning": warning,
                })),
            )?;
        }

        let concept_dir = out_dir.join(&folder);
        std::fs::create_dir_all(&concept_dir)
            .with_context(|| format!("failed creating {}", concept_dir.display()))?;
        let mut images = Vec::new();
        for (image_idx, generated) in response.images.iter().enumerate() {
            let resized = resize_to_source(generated, source_width, source_height);
            let image_path = concept_dir.join(format!("generated_image_{image_idx}.png"));
            resized
                .save(&image_path)
                .with_context(|| format!("failed to save {}", image_path.display()))?;
            events.emit(
                "artifact_created",
                map_object(json!({
                    "concept": prompt.concept,
                    "image_path": image_path.to_string_lossy().to_string(),
                    "index": image_idx,
                    "of": response.images.len(),
                    "width": source_width,
                    "height": source_height,
                })),
            )?;
            images.push(image_path.to_string_lossy().to_string());
        }

        let prompts_path = concept_dir.join(PROMPTS_FILE_NAME);
        write_prompts_file(&prompts_path, prompt)?;
        events.emit(
            "concept_finished",
            map_object(json!({
                "concept": prompt.concept,
                "images": images.len(),
            })),
        )?;
        concepts.push(ConceptOutput {
            concept: prompt.concept.clone(),
            folder,
            images,
            prompts_path: prompts_path.to_string_lossy().to_string(),
        });
    }

    let summary = RenderSummary {
        session_id: events.session_id().to_string(),
        provider: provider.name().to_string(),
        started_at,
        finished_at: now_utc_iso(),
        source_width,
        source_height,
        mask_selected_pixels: mask.selected_count() as u64,
        images_per_concept: u64::from(images_per_concept),
        concepts,
    };
    write_summary(&out_dir.join(SUMMARY_FILE_NAME), &summary, None)?;
    events.emit(
        "render_finished",
        map_object(json!({
            "concepts": summary.concepts.len(),
            "total_images": summary.total_images(),
        })),
    )?;
    Ok(summary)
}

fn unique_folder(base: String, used: &mut HashSet<String>) -> String {
    let mut candidate = base.clone();
    let mut suffix = 2;
    while used.contains(&candidate) {
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
    used.insert(candidate.clone());
    candidate
}
