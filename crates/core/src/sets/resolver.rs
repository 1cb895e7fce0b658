use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::CardError,
    manifest::ImageManifest,
    models::{CardType, Stage},
};

use super::registry::{SetConfig, SetRegistry, CLASSIC_SET};

/// Alternate filename punctuation probed when the manifest lacks the templated name.
pub const FILENAME_VARIANTS: [&str; 4] = [
    "{prefix}- {type} - {stage}",
    "{prefix} - {type} - {stage}",
    "{prefix}-{type}-{stage}",
    "{prefix} {type} {stage}",
];

/// Outcome of resolving a set for a type and stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Resolution {
    /// Style the element with this class name.
    Class(String),
    /// Use this image file as the background.
    Image(String),
}

/// Build the deterministic class name for CSS-based sets (`card-fire-stage-1`).
pub fn resolve_class(card_type: CardType, stage: Stage) -> String {
    format!("card-{}-{}", card_type.key(), stage.key())
}

/// Thread-safe resolver over the set registry and image manifest.
///
/// Cloning shares the underlying tables, so a refresh is seen by every clone.
#[derive(Clone)]
pub struct SetResolver {
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    registry: SetRegistry,
    manifest: ImageManifest,
}

impl Default for SetResolver {
    fn default() -> Self {
        Self::new(SetRegistry::builtin(), ImageManifest::default())
    }
}

impl SetResolver {
    /// Build a resolver from a registry and a (possibly empty) manifest.
    pub fn new(registry: SetRegistry, manifest: ImageManifest) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner { registry, manifest })),
        }
    }

    /// Swap in a reloaded registry and manifest.
    pub fn refresh(&self, registry: SetRegistry, manifest: ImageManifest) {
        let mut inner = self.inner.write();
        inner.registry = registry;
        inner.manifest = manifest;
    }

    /// Snapshot of the current registry.
    pub fn registry(&self) -> SetRegistry {
        self.inner.read().registry.clone()
    }

    /// Set keys in selector order.
    pub fn set_keys(&self) -> Vec<String> {
        self.inner.read().registry.keys()
    }

    /// Configuration for a set key.
    pub fn set_config(&self, set_key: &str) -> Result<SetConfig, CardError> {
        self.inner.read().registry.get(set_key).cloned()
    }

    /// Class name for a type and stage. Independent of the selected set.
    pub fn resolve_class(&self, card_type: CardType, stage: Stage) -> String {
        resolve_class(card_type, stage)
    }

    /// Resolve a set into either a class name or an image path.
    ///
    /// A manifest miss is reported as [`CardError::PathResolutionMiss`].
    pub fn resolve(
        &self,
        set_key: &str,
        card_type: CardType,
        stage: Stage,
    ) -> Result<Resolution, CardError> {
        let inner = self.inner.read();
        let config = inner.registry.get(set_key)?;
        if config.css_class_based {
            return Ok(Resolution::Class(resolve_class(card_type, stage)));
        }

        lookup_image(&inner.manifest, set_key, config, card_type, stage)
            .map(Resolution::Image)
            .ok_or_else(|| CardError::PathResolutionMiss {
                set: set_key.to_string(),
                card_type: card_type.key().to_string(),
                stage: stage.key().to_string(),
            })
    }

    /// Image path for a set, or `None` when the set is class based or no file matched.
    pub fn resolve_path(
        &self,
        set_key: &str,
        card_type: CardType,
        stage: Stage,
    ) -> Result<Option<String>, CardError> {
        match self.resolve(set_key, card_type, stage) {
            Ok(Resolution::Image(path)) => Ok(Some(path)),
            Ok(Resolution::Class(_)) => Ok(None),
            Err(CardError::PathResolutionMiss { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Like [`SetResolver::resolve`], but an unknown set falls back to Classic.
    pub fn resolve_or_classic(
        &self,
        set_key: &str,
        card_type: CardType,
        stage: Stage,
    ) -> Result<Resolution, CardError> {
        match self.resolve(set_key, card_type, stage) {
            Err(CardError::UnknownSet(key)) if key != CLASSIC_SET => {
                warn!("Unknown set {key}; falling back to {CLASSIC_SET}");
                self.resolve(CLASSIC_SET, card_type, stage)
            }
            other => other,
        }
    }
}

fn lookup_image(
    manifest: &ImageManifest,
    set_key: &str,
    config: &SetConfig,
    card_type: CardType,
    stage: Stage,
) -> Option<String> {
    let direct = config.image_path(card_type, stage);
    if !manifest.covers(set_key) || manifest.contains(set_key, &direct) {
        return Some(direct);
    }

    FILENAME_VARIANTS
        .iter()
        .filter(|variant| **variant != config.filename_format)
        .map(|variant| config.image_path_with(variant, card_type, stage))
        .find(|candidate| manifest.contains(set_key, candidate))
        .map(|candidate| {
            debug!("Set {set_key}: {direct} missing, using variant {candidate}");
            candidate
        })
}
