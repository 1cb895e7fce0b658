//! Dual type overlay and layer styling.

/// Overlay state machine.
pub mod compositor;
/// Typed style descriptors.
pub mod style;

pub use compositor::{
    apply_layer_style, OverlayCompositor, OverlayLayer, OverlayOutcome, OverlayState, OVERLAY_ID,
};
pub use style::{Background, LayerStyle, MaskChoice, MaskStyle, ZLayer, DEFAULT_MASK, DIAGONAL_CLIP};
