use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use image::{DynamicImage, GrayImage, RgbaImage};
use serde_json::{json, Value};
use siteviz_contracts::events::{EventPayload, EventWriter};
use siteviz_contracts::extract::ConceptPrompt;
use siteviz_contracts::geometry::{
    source_region, CanvasShape, DisplayTransform, DrawingMode, Mask, PixelRect, Selection,
    SelectionChange, SelectionState,
};
use siteviz_contracts::runs::summary::RenderSummary;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::providers::InpaintProvider;
use crate::{imaging, map_object, render};

/// What the canvas collaborator needs to draw the next frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasRequest {
    pub display_width: u32,
    pub display_height: u32,
    pub drawing_mode: &'static str,
    pub initial_drawing: Option<Value>,
    /// Changes whenever the canvas must discard its remembered drawing.
    pub canvas_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Draw(Selection),
    Canvas(Vec<CanvasShape>),
    Clear,
    Mode(DrawingMode),
    Submit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Selection {
        change: SelectionChange,
        region: Option<PixelRect>,
    },
    ModeChanged(DrawingMode),
    Submitted(Mask),
}

struct LoadedImage {
    image: DynamicImage,
    path: Option<PathBuf>,
    transform: DisplayTransform,
}

/// Session state for one uploaded site image and its single selection.
pub struct SiteSession {
    config: EngineConfig,
    events: EventWriter,
    source: Option<LoadedImage>,
    selection: SelectionState,
    brief: Option<String>,
}

impl SiteSession {
    pub fn new(config: EngineConfig, events: EventWriter) -> Self {
        Self {
            config,
            events,
            source: None,
            selection: SelectionState::new(),
            brief: None,
        }
    }

    /// Session writing `events.jsonl` under `out_dir`, named after the directory.
    pub fn open(out_dir: impl AsRef<Path>, events_path: Option<PathBuf>, config: EngineConfig) -> Result<Self> {
        let out_dir = out_dir.as_ref();
        config.validate()?;
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("failed creating {}", out_dir.display()))?;
        let session_id = out_dir
            .file_name()
            .and_then(|value| value.to_str())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("session-{}", Uuid::new_v4()));
        let events_path = events_path.unwrap_or_else(|| out_dir.join("events.jsonl"));
        let events = EventWriter::new(events_path, session_id);
        events.emit(
            "session_started",
            map_object(json!({
                "out_dir": out_dir.to_string_lossy().to_string(),
                "max_display_width": config.max_display_width,
                "provider": config.provider,
            })),
        )?;
        Ok(Self::new(config, events))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn event_writer(&self) -> EventWriter {
        self.events.clone()
    }

    pub fn emit_event(&self, event_type: &str, payload: EventPayload) -> Result<Value> {
        self.events.emit(event_type, payload)
    }

    pub fn load_image(&mut self, path: impl AsRef<Path>) -> Result<DisplayTransform> {
        let path = path.as_ref();
        let image = imaging::load_source_image(path, self.config.max_source_pixels)?;
        self.install_image(image, Some(path.to_path_buf()))
    }

    pub fn load_image_buffer(&mut self, image: DynamicImage) -> Result<DisplayTransform> {
        self.install_image(image, None)
    }

    fn install_image(&mut self, image: DynamicImage, path: Option<PathBuf>) -> Result<DisplayTransform> {
        imaging::check_source_dims(image.width(), image.height(), self.config.max_source_pixels)?;
        let transform =
            DisplayTransform::fit(image.width(), image.height(), self.config.max_display_width)?;
        self.selection.reset_for_new_image();
        self.events.emit(
            "image_loaded",
            map_object(json!({
                "path": path.as_ref().map(|value| value.to_string_lossy().to_string()),
                "transform": transform,
            })),
        )?;
        self.source = Some(LoadedImage {
            image,
            path,
            transform,
        });
        Ok(transform)
    }

    pub fn has_image(&self) -> bool {
        self.source.is_some()
    }

    pub fn source_image(&self) -> Option<&DynamicImage> {
        self.source.as_ref().map(|source| &source.image)
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_ref().and_then(|source| source.path.as_deref())
    }

    pub fn transform(&self) -> Option<&DisplayTransform> {
        self.source.as_ref().map(|source| &source.transform)
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.current()
    }

    pub fn mode(&self) -> DrawingMode {
        self.selection.mode()
    }

    pub fn brief(&self) -> Option<&str> {
        self.brief.as_deref()
    }

    pub fn set_brief(&mut self, brief: impl Into<String>) {
        let brief = brief.into();
        self.brief = Some(brief.trim().to_string()).filter(|value| !value.is_empty());
    }

    pub fn apply_canvas(&mut self, shapes: &[CanvasShape]) -> Result<SelectionChange> {
        self.require_source()?;
        let change = self.selection.apply_canvas(shapes);
        self.record_change(change, "canvas")?;
        Ok(change)
    }

    pub fn set_selection(&mut self, selection: Selection) -> Result<SelectionChange> {
        self.require_source()?;
        let change = self.selection.set_selection(selection);
        self.record_change(change, "draw")?;
        Ok(change)
    }

    pub fn clear_selection(&mut self) -> Result<SelectionChange> {
        let change = self.selection.clear();
        // The canvas must reset even when nothing was stored.
        self.events.emit(
            "selection_cleared",
            map_object(json!({
                "had_selection": change.is_changed(),
                "canvas_epoch": self.selection.canvas_epoch(),
            })),
        )?;
        Ok(change)
    }

    pub fn set_mode(&mut self, mode: DrawingMode) -> Result<()> {
        if self.selection.mode() == mode {
            return Ok(());
        }
        self.selection.set_mode(mode);
        self.events.emit(
            "mode_changed",
            map_object(json!({ "mode": mode.canvas_value() })),
        )?;
        Ok(())
    }

    pub fn current_region(&self) -> Result<Option<PixelRect>> {
        let transform = self.require_source()?.transform;
        Ok(self
            .selection
            .current()
            .map(|selection| source_region(selection, &transform)))
    }

    /// Full-resolution mask for the stored selection; all zero when absent.
    pub fn current_mask(&self) -> Result<Mask> {
        let source = self.require_source()?;
        Ok(Mask::from_selection(
            self.selection.current(),
            &source.transform,
        ))
    }

    pub fn mask_image(&self) -> Result<GrayImage> {
        imaging::mask_to_image(&self.current_mask()?)
    }

    pub fn preview(&self) -> Result<DynamicImage> {
        let source = self.require_source()?;
        Ok(imaging::render_preview(&source.image, &source.transform))
    }

    pub fn overlay(&self) -> Result<RgbaImage> {
        let source = self.require_source()?;
        imaging::overlay_mask(&source.image, &self.current_mask()?)
    }

    pub fn canvas_request(&self) -> Result<CanvasRequest> {
        let transform = self.require_source()?.transform;
        Ok(CanvasRequest {
            display_width: transform.display_width,
            display_height: transform.display_height,
            drawing_mode: self.selection.mode().canvas_value(),
            initial_drawing: self.selection.initial_drawing(),
            canvas_key: format!("canvas-{}", self.selection.canvas_epoch()),
        })
    }

    pub fn handle(&mut self, event: SessionEvent) -> Result<SessionOutcome> {
        match event {
            SessionEvent::Draw(selection) => {
                let change = self.set_selection(selection)?;
                self.selection_outcome(change)
            }
            SessionEvent::Canvas(shapes) => {
                let change = self.apply_canvas(&shapes)?;
                self.selection_outcome(change)
            }
            SessionEvent::Clear => {
                let change = self.clear_selection()?;
                Ok(SessionOutcome::Selection {
                    change,
                    region: None,
                })
            }
            SessionEvent::Mode(mode) => {
                self.set_mode(mode)?;
                Ok(SessionOutcome::ModeChanged(mode))
            }
            SessionEvent::Submit => {
                let mask = self.current_mask()?;
                self.events.emit(
                    "mask_submitted",
                    map_object(json!({
                        "width": mask.width(),
                        "height": mask.height(),
                        "selected_pixels": mask.selected_count(),
                        "bounds": mask.selected_bounds(),
                    })),
                )?;
                Ok(SessionOutcome::Submitted(mask))
            }
        }
    }

    /// Hands the source, the current mask, and the prompt pairs to `provider`.
    pub fn render(
        &self,
        provider: &dyn InpaintProvider,
        prompts: &[ConceptPrompt],
        out_dir: &Path,
    ) -> Result<RenderSummary> {
        let source = self.require_source()?;
        let mask = self.current_mask()?;
        render::render_concepts(
            provider,
            &source.image,
            &mask,
            prompts,
            self.config.images_per_concept,
            out_dir,
            &self.events,
        )
    }

    fn selection_outcome(&self, change: SelectionChange) -> Result<SessionOutcome> {
        Ok(SessionOutcome::Selection {
            change,
            region: self.current_region()?,
        })
    }

    fn record_change(&self, change: SelectionChange, source: &str) -> Result<()> {
        if !change.is_changed() {
            return Ok(());
        }
        let region = self.current_region()?;
        self.events.emit(
            "selection_changed",
            map_object(json!({
                "change": change.as_str(),
                "source": source,
                "selection": self.selection.current(),
                "region": region,
            })),
        )?;
        Ok(())
    }

    fn require_source(&self) -> Result<&LoadedImage> {
        match self.source.as_ref() {
            Some(source) => Ok(source),
            None => bail!("no source image loaded"),
        }
    }
}
