#![allow(missing_docs)]

//! Selection events and the resolve-and-apply step behind each of them.

use tracing::{debug, info, warn};

use crate::{
    custom::DataUrl,
    error::CardError,
    export::CardComposition,
    models::{css_url, CardType, ImageSlot, Stage},
    overlay::{
        apply_layer_style, Background, LayerStyle, MaskChoice, MaskStyle, OverlayCompositor,
        OverlayOutcome, ZLayer,
    },
    selection::SelectionState,
    sets::{Resolution, SetResolver},
    surface::{CardSurface, CARD_ARTWORK, CARD_BACKGROUND, CARD_ROOT},
};

/// Class every card root keeps regardless of the resolved set.
pub const CARD_CLASS: &str = "card";

/// Owns the selection and applies it to a card surface.
pub struct Composer<S: CardSurface> {
    resolver: SetResolver,
    selection: SelectionState,
    compositor: OverlayCompositor,
    base: Option<LayerStyle>,
    surface: S,
}

impl<S: CardSurface> Composer<S> {
    /// Compose onto `surface`, starting from default selections.
    pub fn new(resolver: SetResolver, surface: S) -> Self {
        Self::with_selection(resolver, surface, SelectionState::default())
    }

    /// Compose onto `surface` from an explicit starting selection.
    pub fn with_selection(resolver: SetResolver, surface: S, selection: SelectionState) -> Self {
        Self {
            compositor: OverlayCompositor::new(selection.current_mask.clone()),
            resolver,
            selection,
            base: None,
            surface,
        }
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn resolver(&self) -> &SetResolver {
        &self.resolver
    }

    pub fn compositor(&self) -> &OverlayCompositor {
        &self.compositor
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Style currently applied to the base background, if any.
    pub fn base_layer(&self) -> Option<&LayerStyle> {
        self.base.as_ref()
    }

    /// Re-apply every layer from scratch.
    pub fn refresh(&mut self) -> Vec<CardError> {
        let mut warnings = self.apply_base();
        warnings.extend(self.apply_artwork());
        warnings.extend(self.update_overlay());
        warnings
    }

    /// Replace the whole selection, e.g. from a saved export, and redraw.
    pub fn restore(&mut self, selection: SelectionState) -> Vec<CardError> {
        debug!("Restoring selection for set {}", selection.current_set);
        self.selection = selection;
        self.refresh()
    }

    pub fn select_type(&mut self, card_type: CardType) -> Vec<CardError> {
        self.selection.current_type = card_type;
        self.apply_base()
    }

    /// Changing stage moves both the base art and the overlay art.
    pub fn select_stage(&mut self, stage: Stage) -> Vec<CardError> {
        self.selection.current_stage = stage;
        let mut warnings = self.apply_base();
        warnings.extend(self.update_overlay());
        warnings
    }

    pub fn select_set(&mut self, set_key: impl Into<String>) -> Vec<CardError> {
        self.selection.current_set = set_key.into();
        self.apply_base()
    }

    pub fn set_dual_type(&mut self, enabled: bool) -> Vec<CardError> {
        self.selection.is_dual_type = enabled;
        self.update_overlay()
    }

    pub fn toggle_dual_type(&mut self) -> Vec<CardError> {
        self.set_dual_type(!self.selection.is_dual_type)
    }

    pub fn select_second_type(&mut self, card_type: Option<CardType>) -> Vec<CardError> {
        self.selection.second_type = card_type;
        self.update_overlay()
    }

    pub fn select_dual_set(&mut self, set_key: impl Into<String>) -> Vec<CardError> {
        self.selection.dual_type_set = set_key.into();
        self.update_overlay()
    }

    /// Remember the mask and restyle a live overlay in place.
    pub fn select_mask(&mut self, mask: MaskChoice) -> Vec<CardError> {
        self.selection.current_mask = mask.clone();
        let outcome = self.compositor.apply_mask(mask, &mut self.surface);
        outcome.warning().cloned().into_iter().collect()
    }

    /// Accept an image from the drop collaborator.
    pub fn set_custom_image(&mut self, slot: ImageSlot, image: DataUrl) -> Vec<CardError> {
        info!("Custom {slot:?} image set ({} bytes)", image.byte_len());
        self.selection.custom_images.insert(slot, image);
        self.apply_slot(slot)
    }

    pub fn clear_custom_image(&mut self, slot: ImageSlot) -> Vec<CardError> {
        if self.selection.custom_images.remove(&slot).is_none() {
            return Vec::new();
        }
        self.apply_slot(slot)
    }

    /// Leave the card fully visible and consistent, then snapshot it.
    pub fn prepare_export(&mut self) -> (CardComposition, Vec<CardError>) {
        let warnings = self.compositor.reassert_layering(&mut self.surface);
        let composition = CardComposition::capture(
            &self.selection,
            self.base.clone(),
            self.compositor.layer().cloned(),
        );
        (composition, warnings)
    }

    fn apply_slot(&mut self, slot: ImageSlot) -> Vec<CardError> {
        match slot {
            ImageSlot::Background => self.apply_base(),
            ImageSlot::Artwork => self.apply_artwork(),
        }
    }

    fn update_overlay(&mut self) -> Vec<CardError> {
        let outcome = self
            .compositor
            .update(&self.selection, &self.resolver, &mut self.surface);
        if let OverlayOutcome::Created(layer) = &outcome {
            debug!("Overlay now shows {} over {}", layer.card_type, self.selection.current_type);
        }
        outcome.warning().cloned().into_iter().collect()
    }

    fn apply_base(&mut self) -> Vec<CardError> {
        let mut warnings = Vec::new();
        let card_type = self.selection.current_type;
        let stage = self.selection.current_stage;

        let background = match self.selection.custom_image(ImageSlot::Background) {
            Some(image) => Some(Background::Image(image.to_string())),
            None => match self
                .resolver
                .resolve_or_classic(&self.selection.current_set, card_type, stage)
            {
                Ok(Resolution::Class(class)) => Some(Background::Class(class)),
                Ok(Resolution::Image(path)) => Some(Background::Image(path)),
                Err(err) => {
                    warn!("Card background left unset: {err}");
                    warnings.push(err);
                    None
                }
            },
        };

        let mut classes = vec![CARD_CLASS.to_string()];
        if let Some(Background::Class(class)) = &background {
            classes.push(class.clone());
        }
        if let Err(err) = self.surface.set_classes(CARD_ROOT, &classes) {
            warn!("Card classes not applied: {err}");
            warnings.push(err);
        }

        let applied = match background {
            Some(background) => {
                let style = LayerStyle {
                    background,
                    mask: MaskStyle::None,
                    layer: ZLayer::Base,
                };
                apply_layer_style(&mut self.surface, CARD_BACKGROUND, &style).map(|_| Some(style))
            }
            None => self
                .surface
                .set_style(CARD_BACKGROUND, "background-image", "none")
                .map(|_| None),
        };
        match applied {
            Ok(base) => self.base = base,
            Err(err) => {
                warn!("Card background not applied: {err}");
                self.base = None;
                warnings.push(err);
            }
        }

        warnings.extend(self.compositor.reassert_layering(&mut self.surface));
        warnings
    }

    fn apply_artwork(&mut self) -> Vec<CardError> {
        let value = self
            .selection
            .custom_image(ImageSlot::Artwork)
            .map(|image| css_url(image.as_str()))
            .unwrap_or_else(|| "none".to_string());

        let result = self
            .surface
            .set_style(CARD_ARTWORK, "background-image", &value)
            .and_then(|_| self.surface.set_style(CARD_ARTWORK, "background-size", "cover"));
        match result {
            Ok(()) => Vec::new(),
            Err(err) => {
                warn!("Artwork not applied: {err}");
                vec![err]
            }
        }
    }
}
