//! Recoverable error taxonomy for card composition.

use thiserror::Error;

/// Errors raised while resolving sets or composing card layers.
///
/// None of these are fatal: callers degrade to "show nothing extra".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    /// The set key is not present in the registry.
    #[error("unknown card set '{0}'")]
    UnknownSet(String),
    /// No filename variant matched a known image for the set.
    #[error("no image available for {card_type} {stage} in set '{set}'")]
    PathResolutionMiss {
        /// Set key that was probed.
        set: String,
        /// Lowercase card type key.
        card_type: String,
        /// Stage key.
        stage: String,
    },
    /// An expected element is absent from the card surface.
    #[error("missing card element '{0}'")]
    MissingDomTarget(String),
    /// A custom image source is not a base64 image data URL.
    #[error("invalid image data URL: {0}")]
    InvalidDataUrl(String),
    /// Unrecognised elemental type key.
    #[error("unknown card type '{0}'")]
    UnknownCardType(String),
    /// Unrecognised stage key.
    #[error("unknown stage '{0}'")]
    UnknownStage(String),
    /// The set registry violates one of its invariants.
    #[error("invalid set registry: {0}")]
    InvalidRegistry(String),
}
