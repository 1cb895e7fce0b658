//! Typed style descriptors for the card layers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::css_url;

/// Mask identifier meaning "use the fixed diagonal split".
pub const DEFAULT_MASK: &str = "default";

/// Clip covering the upper-left triangular half of the card.
pub const DIAGONAL_CLIP: &str = "polygon(0 0, 100% 0, 0 100%)";

/// Stacking order of the card layers. Content always stays on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZLayer {
    /// Set art or class-styled background.
    Base,
    /// Dual type overlay.
    Overlay,
    /// Name, HP, attacks and footer.
    Content,
}

impl ZLayer {
    /// CSS `z-index` value.
    pub fn z_index(self) -> i32 {
        match self {
            ZLayer::Base => 0,
            ZLayer::Overlay => 1,
            ZLayer::Content => 2,
        }
    }
}

/// The mask the user picked for the dual type overlay.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MaskChoice {
    /// The sentinel: fixed diagonal clip.
    #[default]
    Default,
    /// An image used as an alpha mask.
    Image(String),
}

impl MaskChoice {
    /// Interpret a selector value; [`DEFAULT_MASK`] and blanks map to the sentinel.
    pub fn from_id(id: &str) -> Self {
        let id = id.trim();
        if id.is_empty() || id == DEFAULT_MASK {
            MaskChoice::Default
        } else {
            MaskChoice::Image(id.to_string())
        }
    }

    /// Selector value for this choice.
    pub fn id(&self) -> &str {
        match self {
            MaskChoice::Default => DEFAULT_MASK,
            MaskChoice::Image(url) => url,
        }
    }

    /// Style descriptor implementing the choice.
    pub fn style(&self) -> MaskStyle {
        match self {
            MaskChoice::Default => MaskStyle::ClipDiagonal,
            MaskChoice::Image(url) => MaskStyle::MaskImage(url.clone()),
        }
    }
}

impl From<String> for MaskChoice {
    fn from(value: String) -> Self {
        MaskChoice::from_id(&value)
    }
}

impl From<MaskChoice> for String {
    fn from(value: MaskChoice) -> Self {
        value.id().to_string()
    }
}

impl fmt::Display for MaskChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// How a layer is cut out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "url", rename_all = "kebab-case")]
pub enum MaskStyle {
    /// Fully visible.
    None,
    /// Fixed diagonal clip-path.
    ClipDiagonal,
    /// Alpha mask image, contained, centered, not repeated.
    MaskImage(String),
}

/// What fills a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Background {
    /// Class-styled (CSS-based sets).
    Class(String),
    /// Image path or data URL.
    Image(String),
}

/// Complete style of a positioned card layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerStyle {
    /// Layer fill.
    pub background: Background,
    /// Layer cut-out.
    pub mask: MaskStyle,
    /// Stacking slot.
    pub layer: ZLayer,
}

impl LayerStyle {
    /// Every CSS declaration this style writes, in application order.
    ///
    /// Properties that the style does not use are reset explicitly so no
    /// earlier value survives a restyle. An empty value removes the inline
    /// property, leaving class rules in charge.
    pub fn declarations(&self) -> Vec<(&'static str, String)> {
        let mut declarations = vec![
            ("position", "absolute".to_string()),
            ("inset", "0".to_string()),
            ("pointer-events", "none".to_string()),
            ("z-index", self.layer.z_index().to_string()),
        ];

        match &self.background {
            Background::Image(source) => {
                declarations.push(("background-image", css_url(source)));
                declarations.push(("background-size", "cover".to_string()));
                declarations.push(("background-position", "center".to_string()));
            }
            Background::Class(_) => {
                for property in ["background-image", "background-size", "background-position"] {
                    declarations.push((property, String::new()));
                }
            }
        }

        declarations.extend(self.mask.declarations());
        declarations
    }
}

impl MaskStyle {
    /// Clip and mask declarations, including the `-webkit-` aliases.
    pub fn declarations(&self) -> Vec<(&'static str, String)> {
        let (clip, mask_image, size, position, repeat) = match self {
            MaskStyle::None => ("none".to_string(), "none".to_string(), "auto", "0 0", "repeat"),
            MaskStyle::ClipDiagonal => (
                DIAGONAL_CLIP.to_string(),
                "none".to_string(),
                "auto",
                "0 0",
                "repeat",
            ),
            MaskStyle::MaskImage(url) => (
                "none".to_string(),
                css_url(url),
                "contain",
                "center",
                "no-repeat",
            ),
        };

        vec![
            ("clip-path", clip.clone()),
            ("-webkit-clip-path", clip),
            ("mask-image", mask_image.clone()),
            ("-webkit-mask-image", mask_image),
            ("mask-size", size.to_string()),
            ("-webkit-mask-size", size.to_string()),
            ("mask-position", position.to_string()),
            ("-webkit-mask-position", position.to_string()),
            ("mask-repeat", repeat.to_string()),
            ("-webkit-mask-repeat", repeat.to_string()),
        ]
    }
}
