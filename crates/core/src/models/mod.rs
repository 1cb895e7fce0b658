//! Shared domain models and formatting helpers.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::CardError;

/// Elemental type printed on a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum CardType {
    Grass,
    Fire,
    Water,
    Lightning,
    Psychic,
    Fighting,
    Darkness,
    Metal,
    Fairy,
    Dragon,
    Colorless,
}

impl CardType {
    /// Every type in selector order.
    pub const ALL: [CardType; 11] = [
        CardType::Grass,
        CardType::Fire,
        CardType::Water,
        CardType::Lightning,
        CardType::Psychic,
        CardType::Fighting,
        CardType::Darkness,
        CardType::Metal,
        CardType::Fairy,
        CardType::Dragon,
        CardType::Colorless,
    ];

    /// Lowercase key used in class names and selectors.
    pub fn key(self) -> &'static str {
        match self {
            CardType::Grass => "grass",
            CardType::Fire => "fire",
            CardType::Water => "water",
            CardType::Lightning => "lightning",
            CardType::Psychic => "psychic",
            CardType::Fighting => "fighting",
            CardType::Darkness => "darkness",
            CardType::Metal => "metal",
            CardType::Fairy => "fairy",
            CardType::Dragon => "dragon",
            CardType::Colorless => "colorless",
        }
    }

    /// Key with an upper-case first letter, as used in asset folders (`Fire`).
    pub fn capitalized(self) -> String {
        capitalize(self.key())
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CardType {
    type Err = CardError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_lowercase();
        CardType::ALL
            .into_iter()
            .find(|card_type| card_type.key() == needle)
            .ok_or_else(|| CardError::UnknownCardType(value.to_string()))
    }
}

/// Evolutionary stage of the card subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Stage {
    #[serde(rename = "basic")]
    Basic,
    #[serde(rename = "stage-1")]
    Stage1,
    #[serde(rename = "stage-2")]
    Stage2,
}

impl Stage {
    /// Every stage in selector order.
    pub const ALL: [Stage; 3] = [Stage::Basic, Stage::Stage1, Stage::Stage2];

    /// Raw stage key (`basic`, `stage-1`, `stage-2`).
    pub fn key(self) -> &'static str {
        match self {
            Stage::Basic => "basic",
            Stage::Stage1 => "stage-1",
            Stage::Stage2 => "stage-2",
        }
    }

    /// Label shown in selectors.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Basic => "Basic",
            Stage::Stage1 => "Stage 1",
            Stage::Stage2 => "Stage 2",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Stage {
    type Err = CardError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_lowercase().replace([' ', '_'], "-");
        Stage::ALL
            .into_iter()
            .find(|stage| stage.key() == needle)
            .ok_or_else(|| CardError::UnknownStage(value.to_string()))
    }
}

/// Places on the card that accept a dropped custom image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSlot {
    /// Replaces the set art behind the whole card.
    Background,
    /// Picture inside the artwork frame.
    Artwork,
}

/// Upper-case the first character, leaving the rest untouched.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Wrap a path or data URL for use in a CSS `url()` value.
pub fn css_url(value: &str) -> String {
    format!("url(\"{}\")", value.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_types_and_stages_loosely() {
        assert_eq!("Fire".parse::<CardType>(), Ok(CardType::Fire));
        assert_eq!(" colorless ".parse::<CardType>(), Ok(CardType::Colorless));
        assert_eq!("stage 1".parse::<Stage>(), Ok(Stage::Stage1));
        assert_eq!("STAGE_2".parse::<Stage>(), Ok(Stage::Stage2));
        assert_eq!(
            "plasma".parse::<CardType>(),
            Err(CardError::UnknownCardType("plasma".to_string()))
        );
    }

    #[test]
    fn capitalizes_type_keys() {
        assert_eq!(CardType::Lightning.capitalized(), "Lightning");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn stage_serializes_with_hyphen() -> serde_json::Result<()> {
        assert_eq!(serde_json::to_string(&Stage::Stage2)?, "\"stage-2\"");
        Ok(())
    }
}
