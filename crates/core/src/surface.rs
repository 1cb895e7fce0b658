//! The element tree the composer writes into.
//!
//! In the browser this is the DOM; [`MemorySurface`] keeps the same tree in
//! memory for previews, exports and tests.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::CardError;

/// Root element of the card.
pub const CARD_ROOT: &str = "card";
/// Element carrying the set art.
pub const CARD_BACKGROUND: &str = "card-background";
/// Picture frame for custom artwork.
pub const CARD_ARTWORK: &str = "card-artwork";
/// Content elements that must stay above every art layer.
pub const CARD_CONTENT: [&str; 4] = ["card-name", "card-hp", "card-attacks", "card-footer"];

/// Element lookup and mutation primitives.
pub trait CardSurface {
    /// Whether an element with this id exists.
    fn contains(&self, id: &str) -> bool;

    /// Append a new empty element under `parent`, replacing any element with the same id.
    fn append_child(&mut self, parent: &str, id: &str) -> Result<(), CardError>;

    /// Remove an element and its children. Returns whether anything was removed.
    fn remove(&mut self, id: &str) -> bool;

    /// Set one inline style property.
    fn set_style(&mut self, id: &str, property: &str, value: &str) -> Result<(), CardError>;

    /// Drop one inline style property so class rules apply again.
    fn remove_style(&mut self, id: &str, property: &str) -> Result<(), CardError>;

    /// Read one inline style property.
    fn style(&self, id: &str, property: &str) -> Option<String>;

    /// Replace the class list of an element.
    fn set_classes(&mut self, id: &str, classes: &[String]) -> Result<(), CardError>;

    /// Current class list of an element.
    fn classes(&self, id: &str) -> Vec<String>;
}

/// One element of a [`MemorySurface`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Parent id, `None` for the root.
    pub parent: Option<String>,
    /// Child ids in insertion order.
    pub children: Vec<String>,
    /// Class list.
    pub classes: BTreeSet<String>,
    /// Inline styles.
    pub styles: BTreeMap<String, String>,
}

/// In-memory element tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySurface {
    elements: BTreeMap<String, Element>,
}

impl MemorySurface {
    /// Surface with no elements at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Surface holding the standard card skeleton.
    pub fn card() -> Self {
        let mut surface = Self::empty();
        surface.elements.insert(CARD_ROOT.to_string(), Element::default());
        for id in [CARD_BACKGROUND, CARD_ARTWORK]
            .into_iter()
            .chain(CARD_CONTENT)
        {
            // Root exists, so appending cannot fail.
            let _ = surface.append_child(CARD_ROOT, id);
        }
        surface
    }

    /// Borrow an element.
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Children of an element in order.
    pub fn children(&self, id: &str) -> Vec<String> {
        self.elements
            .get(id)
            .map(|element| element.children.clone())
            .unwrap_or_default()
    }

    fn element_mut(&mut self, id: &str) -> Result<&mut Element, CardError> {
        self.elements
            .get_mut(id)
            .ok_or_else(|| CardError::MissingDomTarget(id.to_string()))
    }
}

impl CardSurface for MemorySurface {
    fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    fn append_child(&mut self, parent: &str, id: &str) -> Result<(), CardError> {
        if !self.elements.contains_key(parent) {
            return Err(CardError::MissingDomTarget(parent.to_string()));
        }
        self.remove(id);
        self.element_mut(parent)?.children.push(id.to_string());
        self.elements.insert(
            id.to_string(),
            Element {
                parent: Some(parent.to_string()),
                ..Element::default()
            },
        );
        Ok(())
    }

    fn remove(&mut self, id: &str) -> bool {
        let Some(element) = self.elements.remove(id) else {
            return false;
        };
        if let Some(parent) = element.parent.as_deref() {
            if let Some(parent) = self.elements.get_mut(parent) {
                parent.children.retain(|child| child != id);
            }
        }
        for child in element.children {
            self.remove(&child);
        }
        true
    }

    fn set_style(&mut self, id: &str, property: &str, value: &str) -> Result<(), CardError> {
        self.element_mut(id)?
            .styles
            .insert(property.to_string(), value.to_string());
        Ok(())
    }

    fn remove_style(&mut self, id: &str, property: &str) -> Result<(), CardError> {
        self.element_mut(id)?.styles.remove(property);
        Ok(())
    }

    fn style(&self, id: &str, property: &str) -> Option<String> {
        self.elements
            .get(id)
            .and_then(|element| element.styles.get(property).cloned())
    }

    fn set_classes(&mut self, id: &str, classes: &[String]) -> Result<(), CardError> {
        self.element_mut(id)?.classes = classes.iter().cloned().collect();
        Ok(())
    }

    fn classes(&self, id: &str) -> Vec<String> {
        self.elements
            .get(id)
            .map(|element| element.classes.iter().cloned().collect())
            .unwrap_or_default()
    }
}
