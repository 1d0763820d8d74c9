use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const RECT_SHAPE_TYPE: &str = "rect";
const CANVAS_DRAWING_VERSION: &str = "4.4.0";

fn default_scale() -> f64 {
    1.0
}

/// One drawable object as reported by the canvas after an interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasShape {
    #[serde(rename = "type")]
    pub shape_type: String,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(rename = "scaleX", default = "default_scale")]
    pub scale_x: f64,
    #[serde(rename = "scaleY", default = "default_scale")]
    pub scale_y: f64,
}

impl CanvasShape {
    pub fn rect(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            shape_type: RECT_SHAPE_TYPE.to_string(),
            left,
            top,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    pub fn is_rect(&self) -> bool {
        self.shape_type == RECT_SHAPE_TYPE
    }
}

/// Parses the canvas report, accepting either a bare object list or the
/// `{"objects": [...]}` envelope the canvas emits.
pub fn parse_canvas_shapes(payload: &Value) -> anyhow::Result<Vec<CanvasShape>> {
    let objects = match payload {
        Value::Array(_) => payload.clone(),
        Value::Object(map) => map.get("objects").cloned().unwrap_or(Value::Array(Vec::new())),
        other => anyhow::bail!("canvas payload must be a list or an object, got {other}"),
    };
    Ok(serde_json::from_value(objects)?)
}

/// A committed rectangle in display space.
///
/// Coordinates may be negative or run past the preview while the user drags;
/// clamping happens only when the mask is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    #[serde(rename = "scaleX", default = "default_scale")]
    pub scale_x: f64,
    #[serde(rename = "scaleY", default = "default_scale")]
    pub scale_y: f64,
}

impl Selection {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    pub fn with_scale(mut self, scale_x: f64, scale_y: f64) -> Self {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
        self
    }

    pub fn effective_width(&self) -> f64 {
        self.width * self.scale_x
    }

    pub fn effective_height(&self) -> f64 {
        self.height * self.scale_y
    }

    pub fn to_canvas_object(&self) -> Value {
        json!({
            "type": RECT_SHAPE_TYPE,
            "left": self.left,
            "top": self.top,
            "width": self.width,
            "height": self.height,
            "scaleX": self.scale_x,
            "scaleY": self.scale_y,
        })
    }
}

impl From<&CanvasShape> for Selection {
    fn from(shape: &CanvasShape) -> Self {
        Self {
            left: shape.left,
            top: shape.top,
            width: shape.width,
            height: shape.height,
            scale_x: shape.scale_x,
            scale_y: shape.scale_y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawingMode {
    #[default]
    Draw,
    Transform,
}

impl DrawingMode {
    /// Value handed to the canvas collaborator.
    pub fn canvas_value(self) -> &'static str {
        match self {
            DrawingMode::Draw => "rect",
            DrawingMode::Transform => "transform",
        }
    }
}

impl fmt::Display for DrawingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canvas_value())
    }
}

impl FromStr for DrawingMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rect" | "rect-draw" | "draw" => Ok(DrawingMode::Draw),
            "transform" | "move" | "resize" | "move/resize" => Ok(DrawingMode::Transform),
            other => Err(format!("Unknown drawing mode '{other}'.")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Unchanged,
    Replaced,
    Cleared,
}

impl SelectionChange {
    pub fn is_changed(self) -> bool {
        self != SelectionChange::Unchanged
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SelectionChange::Unchanged => "unchanged",
            SelectionChange::Replaced => "replaced",
            SelectionChange::Cleared => "cleared",
        }
    }
}

/// Single-selection store with exactly one writer (the interaction handler).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    current: Option<Selection>,
    mode: DrawingMode,
    canvas_epoch: u64,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    pub fn mode(&self) -> DrawingMode {
        self.mode
    }

    /// Bumped whenever the canvas must forget what it was drawing.
    pub fn canvas_epoch(&self) -> u64 {
        self.canvas_epoch
    }

    /// Reduces the full shape set reported by the canvas to one selection.
    pub fn apply_canvas(&mut self, shapes: &[CanvasShape]) -> SelectionChange {
        match shapes.iter().rev().find(|shape| shape.is_rect()) {
            Some(latest) => self.set_selection(Selection::from(latest)),
            None if self.current.is_some() => {
                self.current = None;
                SelectionChange::Cleared
            }
            None => SelectionChange::Unchanged,
        }
    }

    pub fn set_selection(&mut self, selection: Selection) -> SelectionChange {
        if self.current.as_ref() == Some(&selection) {
            return SelectionChange::Unchanged;
        }
        self.current = Some(selection);
        SelectionChange::Replaced
    }

    /// Drops the selection whatever the canvas still shows.
    pub fn clear(&mut self) -> SelectionChange {
        self.canvas_epoch += 1;
        if self.current.take().is_some() {
            SelectionChange::Cleared
        } else {
            SelectionChange::Unchanged
        }
    }

    pub fn set_mode(&mut self, mode: DrawingMode) {
        self.mode = mode;
    }

    pub fn reset_for_new_image(&mut self) {
        self.current = None;
        self.canvas_epoch += 1;
    }

    /// Drawing handed back to the canvas so it re-renders the stored rectangle.
    pub fn initial_drawing(&self) -> Option<Value> {
        self.current.as_ref().map(|selection| {
            json!({
                "version": CANVAS_DRAWING_VERSION,
                "objects": [selection.to_canvas_object()],
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn shape(kind: &str, left: f64) -> CanvasShape {
        CanvasShape {
            shape_type: kind.to_string(),
            ..CanvasShape::rect(left, 10.0, 20.0, 30.0)
        }
    }

    #[test]
    fn last_rect_wins_and_other_shapes_are_ignored() {
        let mut state = SelectionState::new();
        let change = state.apply_canvas(&[
            shape("rect", 1.0),
            shape("path", 2.0),
            shape("rect", 3.0),
            shape("circle", 4.0),
        ]);
        assert_eq!(change, SelectionChange::Replaced);
        assert_eq!(state.current().map(|sel| sel.left), Some(3.0));
    }

    #[test]
    fn identical_redraw_is_not_a_change() {
        let mut state = SelectionState::new();
        state.apply_canvas(&[shape("rect", 5.0)]);
        assert_eq!(
            state.apply_canvas(&[shape("rect", 5.0)]),
            SelectionChange::Unchanged
        );

        let mut scaled = shape("rect", 5.0);
        scaled.scale_x = 1.5;
        assert_eq!(state.apply_canvas(&[scaled]), SelectionChange::Replaced);
    }

    #[test]
    fn no_rects_means_absent() {
        let mut state = SelectionState::new();
        assert_eq!(state.apply_canvas(&[]), SelectionChange::Unchanged);
        state.apply_canvas(&[shape("rect", 5.0)]);
        assert_eq!(
            state.apply_canvas(&[shape("line", 1.0)]),
            SelectionChange::Cleared
        );
        assert!(state.current().is_none());
    }

    #[test]
    fn zero_area_selection_is_not_absent() {
        let mut state = SelectionState::new();
        state.set_selection(Selection::new(4.0, 4.0, 0.0, 0.0));
        assert!(state.current().is_some());
    }

    #[test]
    fn clear_is_unconditional_and_resets_canvas() {
        let mut state = SelectionState::new();
        state.apply_canvas(&[shape("rect", 5.0)]);
        let epoch = state.canvas_epoch();
        assert_eq!(state.clear(), SelectionChange::Cleared);
        assert!(state.current().is_none());
        assert!(state.initial_drawing().is_none());
        assert_eq!(state.canvas_epoch(), epoch + 1);

        assert_eq!(state.clear(), SelectionChange::Unchanged);
        assert_eq!(state.canvas_epoch(), epoch + 2);
    }

    #[test]
    fn mode_switch_keeps_selection() {
        let mut state = SelectionState::new();
        state.set_selection(Selection::new(1.0, 2.0, 3.0, 4.0));
        state.set_mode(DrawingMode::Transform);
        assert_eq!(state.mode().canvas_value(), "transform");
        assert_eq!(state.current(), Some(&Selection::new(1.0, 2.0, 3.0, 4.0)));
    }

    #[test]
    fn drawing_mode_parsing() {
        assert_eq!("rect-draw".parse::<DrawingMode>(), Ok(DrawingMode::Draw));
        assert_eq!("Move".parse::<DrawingMode>(), Ok(DrawingMode::Transform));
        assert!("lasso".parse::<DrawingMode>().is_err());
    }

    #[test]
    fn canvas_payload_parsing_defaults_scale() -> anyhow::Result<()> {
        let shapes = parse_canvas_shapes(&json!({
            "version": "4.4.0",
            "objects": [
                {"type": "rect", "left": 10, "top": 20, "width": 30, "height": 40, "fill": "red"},
                {"type": "rect", "left": 1, "top": 2, "width": 3, "height": 4, "scaleX": 2.0, "scaleY": 0.5}
            ]
        }))?;
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].scale_x, 1.0);
        assert_eq!(shapes[1].scale_y, 0.5);

        let bare = parse_canvas_shapes(&json!([{"type": "path"}]))?;
        assert!(!bare[0].is_rect());
        assert!(parse_canvas_shapes(&json!("nope")).is_err());
        Ok(())
    }

    #[test]
    fn initial_drawing_round_trips_selection() -> anyhow::Result<()> {
        let mut state = SelectionState::new();
        let selection = Selection::new(1.0, 2.0, 3.0, 4.0).with_scale(2.0, 1.0);
        state.set_selection(selection);
        let drawing = state.initial_drawing().unwrap_or_default();
        assert_eq!(drawing["version"], json!("4.4.0"));
        let shapes = parse_canvas_shapes(&drawing)?;
        assert_eq!(Selection::from(&shapes[0]), selection);
        Ok(())
    }
}
