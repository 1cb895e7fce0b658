#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::CardError,
    models::{CardType, Stage},
    selection::SelectionState,
    sets::{Resolution, SetResolver},
    surface::{CardSurface, CARD_BACKGROUND, CARD_CONTENT, CARD_ROOT},
};

use super::style::{Background, LayerStyle, MaskChoice, MaskStyle, ZLayer};

/// Element id of the single dual type overlay.
pub const OVERLAY_ID: &str = "dual-type-overlay";

/// Attributes of the overlay currently on the card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayLayer {
    pub card_type: CardType,
    pub stage: Stage,
    pub set_key: String,
    pub style: LayerStyle,
}

/// Whether the overlay exists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverlayState {
    #[default]
    Absent,
    Present(OverlayLayer),
}

/// What a compositor call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayOutcome {
    /// A fresh layer was built.
    Created(OverlayLayer),
    /// The existing layer got new mask styling.
    Restyled(OverlayLayer),
    /// The layer was taken off the card.
    Removed,
    /// Nothing on the card changed.
    Unchanged,
    /// The layer could not be built; the card has no overlay.
    Skipped(CardError),
}

impl OverlayOutcome {
    /// Recoverable problem carried by the outcome.
    pub fn warning(&self) -> Option<&CardError> {
        match self {
            OverlayOutcome::Skipped(err) => Some(err),
            _ => None,
        }
    }
}

/// Sole owner of the dual type overlay element.
#[derive(Debug, Clone, Default)]
pub struct OverlayCompositor {
    state: OverlayState,
    mask: MaskChoice,
}

impl OverlayCompositor {
    /// Compositor with no overlay and the given remembered mask.
    pub fn new(mask: MaskChoice) -> Self {
        Self {
            state: OverlayState::Absent,
            mask,
        }
    }

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    /// The live layer, if any.
    pub fn layer(&self) -> Option<&OverlayLayer> {
        match &self.state {
            OverlayState::Present(layer) => Some(layer),
            OverlayState::Absent => None,
        }
    }

    /// Mask used for the next creation.
    pub fn mask(&self) -> &MaskChoice {
        &self.mask
    }

    /// Rebuild the overlay from the selection.
    ///
    /// Any existing layer is destroyed first, so repeated calls converge on
    /// the same card no matter what happened in between.
    pub fn update(
        &mut self,
        selection: &SelectionState,
        resolver: &SetResolver,
        surface: &mut dyn CardSurface,
    ) -> OverlayOutcome {
        self.mask = selection.current_mask.clone();
        let had_layer = self.destroy(surface);

        let Some(second_type) = selection.overlay_type() else {
            self.reassert_layering(surface);
            return if had_layer {
                OverlayOutcome::Removed
            } else {
                OverlayOutcome::Unchanged
            };
        };

        let stage = selection.current_stage;
        let set_key = &selection.dual_type_set;
        let background = match resolver.resolve_or_classic(set_key, second_type, stage) {
            Ok(Resolution::Image(path)) => Background::Image(path),
            Ok(Resolution::Class(class)) => Background::Class(class),
            Err(err) => {
                warn!("Dual type overlay skipped: {err}");
                self.reassert_layering(surface);
                return OverlayOutcome::Skipped(err);
            }
        };

        let layer = OverlayLayer {
            card_type: second_type,
            stage,
            set_key: set_key.clone(),
            style: LayerStyle {
                background,
                mask: self.mask.style(),
                layer: ZLayer::Overlay,
            },
        };

        if let Err(err) = build_layer(surface, &layer) {
            warn!("Dual type overlay skipped: {err}");
            surface.remove(OVERLAY_ID);
            self.reassert_layering(surface);
            return OverlayOutcome::Skipped(err);
        }

        debug!(
            "Overlay created for {} {} from set {}",
            layer.card_type, layer.stage, layer.set_key
        );
        self.state = OverlayState::Present(layer.clone());
        self.reassert_layering(surface);
        OverlayOutcome::Created(layer)
    }

    /// Switch the mask. A live layer is restyled in place; otherwise the
    /// choice is only remembered.
    pub fn apply_mask(&mut self, mask: MaskChoice, surface: &mut dyn CardSurface) -> OverlayOutcome {
        self.mask = mask;
        let style = self.mask.style();

        let OverlayState::Present(layer) = &mut self.state else {
            return OverlayOutcome::Unchanged;
        };

        layer.style.mask = style.clone();
        if let Err(err) = apply_mask_style(surface, OVERLAY_ID, &style) {
            warn!("Overlay mask not applied: {err}");
            self.state = OverlayState::Absent;
            return OverlayOutcome::Skipped(err);
        }

        let layer = layer.clone();
        self.reassert_layering(surface);
        OverlayOutcome::Restyled(layer)
    }

    /// Take the overlay off the card.
    pub fn clear(&mut self, surface: &mut dyn CardSurface) -> OverlayOutcome {
        if self.destroy(surface) {
            OverlayOutcome::Removed
        } else {
            OverlayOutcome::Unchanged
        }
    }

    /// Put every layer back in its stacking slot.
    ///
    /// Returns the elements that could not be reached.
    pub fn reassert_layering(&self, surface: &mut dyn CardSurface) -> Vec<CardError> {
        let mut missing = Vec::new();

        if let Err(err) = surface.set_style(CARD_ROOT, "isolation", "isolate") {
            missing.push(err);
        }
        if let Err(err) = set_layer(surface, CARD_BACKGROUND, ZLayer::Base) {
            missing.push(err);
        }
        if self.layer().is_some() {
            if let Err(err) = set_layer(surface, OVERLAY_ID, ZLayer::Overlay) {
                missing.push(err);
            }
        }
        for id in CARD_CONTENT {
            if let Err(err) = set_layer(surface, id, ZLayer::Content) {
                missing.push(err);
            }
        }

        for err in &missing {
            warn!("Layering not applied: {err}");
        }
        missing
    }

    fn destroy(&mut self, surface: &mut dyn CardSurface) -> bool {
        let was_present = matches!(self.state, OverlayState::Present(_));
        self.state = OverlayState::Absent;
        surface.remove(OVERLAY_ID) || was_present
    }
}

/// Write a full layer style onto an element.
pub fn apply_layer_style(
    surface: &mut dyn CardSurface,
    id: &str,
    style: &LayerStyle,
) -> Result<(), CardError> {
    for (property, value) in style.declarations() {
        if value.is_empty() {
            surface.remove_style(id, property)?;
        } else {
            surface.set_style(id, property, &value)?;
        }
    }
    Ok(())
}

fn apply_mask_style(
    surface: &mut dyn CardSurface,
    id: &str,
    mask: &MaskStyle,
) -> Result<(), CardError> {
    if !surface.contains(id) {
        return Err(CardError::MissingDomTarget(id.to_string()));
    }
    for (property, value) in mask.declarations() {
        surface.set_style(id, property, &value)?;
    }
    Ok(())
}

fn build_layer(surface: &mut dyn CardSurface, layer: &OverlayLayer) -> Result<(), CardError> {
    if !surface.contains(CARD_BACKGROUND) {
        return Err(CardError::MissingDomTarget(CARD_BACKGROUND.to_string()));
    }
    surface.append_child(CARD_ROOT, OVERLAY_ID)?;

    let mut classes = vec![OVERLAY_ID.to_string()];
    if let Background::Class(class) = &layer.style.background {
        classes.push(class.clone());
    }
    surface.set_classes(OVERLAY_ID, &classes)?;
    apply_layer_style(surface, OVERLAY_ID, &layer.style)
}

fn set_layer(surface: &mut dyn CardSurface, id: &str, layer: ZLayer) -> Result<(), CardError> {
    if layer == ZLayer::Content {
        surface.set_style(id, "position", "relative")?;
    }
    surface.set_style(id, "z-index", &layer.z_index().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{overlay::DIAGONAL_CLIP, surface::MemorySurface};

    fn dual(second: CardType, set: &str) -> SelectionState {
        SelectionState {
            is_dual_type: true,
            second_type: Some(second),
            dual_type_set: set.to_string(),
            ..SelectionState::default()
        }
    }

    #[test]
    fn creates_overlay_when_dual_and_second_type() {
        let resolver = SetResolver::default();
        let mut surface = MemorySurface::card();
        let mut compositor = OverlayCompositor::default();

        let outcome = compositor.update(&dual(CardType::Water, "QuantumContour"), &resolver, &mut surface);
        let OverlayOutcome::Created(layer) = outcome else {
            panic!("expected overlay to be created, got {outcome:?}");
        };
        assert_eq!(
            layer.style.background,
            Background::Image("img/QuantumContour/Water/P- Water - S0.png".to_string())
        );
        assert_eq!(
            surface.style(OVERLAY_ID, "background-image").as_deref(),
            Some("url(\"img/QuantumContour/Water/P- Water - S0.png\")")
        );
        assert_eq!(surface.style(OVERLAY_ID, "z-index").as_deref(), Some("1"));
    }

    #[test]
    fn classic_overlay_uses_class() {
        let resolver = SetResolver::default();
        let mut surface = MemorySurface::card();
        let mut compositor = OverlayCompositor::default();

        compositor.update(&dual(CardType::Grass, "Classic"), &resolver, &mut surface);
        assert!(surface
            .classes(OVERLAY_ID)
            .contains(&"card-grass-basic".to_string()));
        assert_eq!(surface.style(OVERLAY_ID, "background-image"), None);
        assert_eq!(
            surface.style(OVERLAY_ID, "clip-path").as_deref(),
            Some(DIAGONAL_CLIP)
        );
    }

    #[test]
    fn unknown_dual_set_falls_back_to_classic_class() {
        let resolver = SetResolver::default();
        let mut surface = MemorySurface::card();
        let mut compositor = OverlayCompositor::default();

        let outcome = compositor.update(&dual(CardType::Water, "Retired"), &resolver, &mut surface);
        let OverlayOutcome::Created(layer) = outcome else {
            panic!("expected Classic fallback overlay, got {outcome:?}");
        };
        assert_eq!(
            layer.style.background,
            Background::Class("card-water-basic".to_string())
        );
        assert_eq!(layer.set_key, "Retired");
        assert!(surface
            .classes(OVERLAY_ID)
            .contains(&"card-water-basic".to_string()));
        assert_eq!(surface.style(OVERLAY_ID, "background-image"), None);
    }

    #[test]
    fn missing_card_root_is_a_no_op() {
        let resolver = SetResolver::default();
        let mut surface = MemorySurface::empty();
        let mut compositor = OverlayCompositor::default();

        let outcome = compositor.update(&dual(CardType::Fire, "Classic"), &resolver, &mut surface);
        assert_eq!(
            outcome,
            OverlayOutcome::Skipped(CardError::MissingDomTarget(CARD_BACKGROUND.to_string()))
        );
        assert_eq!(compositor.state(), &OverlayState::Absent);
        assert!(!surface.contains(OVERLAY_ID));
    }

    #[test]
    fn mask_is_remembered_while_absent() {
        let resolver = SetResolver::default();
        let mut surface = MemorySurface::card();
        let mut compositor = OverlayCompositor::default();

        let mask = MaskChoice::Image("img/masks/wave.png".to_string());
        assert_eq!(
            compositor.apply_mask(mask.clone(), &mut surface),
            OverlayOutcome::Unchanged
        );
        assert_eq!(compositor.mask(), &mask);
        assert!(!surface.contains(OVERLAY_ID));

        let mut selection = dual(CardType::Fire, "Classic");
        selection.current_mask = mask;
        compositor.update(&selection, &resolver, &mut surface);
        assert_eq!(
            surface.style(OVERLAY_ID, "mask-image").as_deref(),
            Some("url(\"img/masks/wave.png\")")
        );
    }

    #[test]
    fn clear_removes_stale_element() {
        let mut surface = MemorySurface::card();
        let mut compositor = OverlayCompositor::default();
        assert!(surface.append_child(CARD_ROOT, OVERLAY_ID).is_ok());

        assert_eq!(compositor.clear(&mut surface), OverlayOutcome::Removed);
        assert!(!surface.contains(OVERLAY_ID));
        assert_eq!(compositor.clear(&mut surface), OverlayOutcome::Unchanged);
    }

    #[test]
    fn layering_reports_missing_content() {
        let mut surface = MemorySurface::card();
        surface.remove("card-hp");
        let compositor = OverlayCompositor::default();

        let missing = compositor.reassert_layering(&mut surface);
        assert_eq!(missing, vec![CardError::MissingDomTarget("card-hp".to_string())]);
        assert_eq!(surface.style("card-name", "z-index").as_deref(), Some("2"));
        assert_eq!(surface.style(CARD_BACKGROUND, "z-index").as_deref(), Some("0"));
    }
}
