#![allow(missing_docs)]

//! User selections that drive the composition.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    custom::DataUrl,
    models::{CardType, ImageSlot, Stage},
    overlay::MaskChoice,
    sets::CLASSIC_SET,
};

/// Everything the user has picked so far. Lives only in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub current_type: CardType,
    pub current_stage: Stage,
    pub current_set: String,
    pub is_dual_type: bool,
    pub second_type: Option<CardType>,
    pub dual_type_set: String,
    pub current_mask: MaskChoice,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_images: BTreeMap<ImageSlot, DataUrl>,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            current_type: CardType::Fire,
            current_stage: Stage::Basic,
            current_set: CLASSIC_SET.to_string(),
            is_dual_type: false,
            second_type: None,
            dual_type_set: CLASSIC_SET.to_string(),
            current_mask: MaskChoice::Default,
            custom_images: BTreeMap::new(),
        }
    }
}

impl SelectionState {
    /// Defaults with a different starting set for both layers.
    pub fn with_set(set_key: impl Into<String>) -> Self {
        let set_key = set_key.into();
        Self {
            current_set: set_key.clone(),
            dual_type_set: set_key,
            ..Self::default()
        }
    }

    /// Second type to overlay, if the dual type feature is active.
    pub fn overlay_type(&self) -> Option<CardType> {
        if self.is_dual_type {
            self.second_type
        } else {
            None
        }
    }

    /// Custom image for a slot.
    pub fn custom_image(&self, slot: ImageSlot) -> Option<&DataUrl> {
        self.custom_images.get(&slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_requires_toggle_and_second_type() {
        let mut selection = SelectionState::default();
        assert_eq!(selection.overlay_type(), None);

        selection.second_type = Some(CardType::Water);
        assert_eq!(selection.overlay_type(), None);

        selection.is_dual_type = true;
        assert_eq!(selection.overlay_type(), Some(CardType::Water));
    }

    #[test]
    fn defaults_to_classic() {
        let selection = SelectionState::default();
        assert_eq!(selection.current_set, CLASSIC_SET);
        assert_eq!(selection.dual_type_set, CLASSIC_SET);
        assert_eq!(selection.current_mask, MaskChoice::Default);
    }
}
