mod display;
mod mask;
mod selection;

pub use display::{DisplayTransform, DEFAULT_MAX_DISPLAY_WIDTH};
pub use mask::{ratio_region, source_region, Mask, PixelRect, MASK_EXCLUDED, MASK_SELECTED};
pub use selection::{
    parse_canvas_shapes, CanvasShape, DrawingMode, Selection, SelectionChange, SelectionState,
    RECT_SHAPE_TYPE,
};
