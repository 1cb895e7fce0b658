use std::{
    collections::BTreeMap,
    fs,
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    error::CardError,
    models::{CardType, Stage},
};

/// Key of the CSS-based set every lookup falls back to.
pub const CLASSIC_SET: &str = "Classic";

/// Prefix substituted for `{prefix}` when a set does not declare one.
pub const DEFAULT_PREFIX: &str = "P";

/// Declarative description of how one visual set maps type and stage to art.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetConfig {
    /// Display name.
    pub name: String,
    /// When set, the card is styled by class name and the path fields are unused.
    #[serde(default)]
    pub css_class_based: bool,
    /// Asset folder for image-based sets (e.g. `img/QuantumContour`).
    #[serde(default)]
    pub path: String,
    /// Value substituted for `{prefix}`.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Filename template with `{prefix}`, `{type}`, `{stage}` and `{stageClass}`.
    #[serde(default)]
    pub filename_format: String,
    /// Stage key to stage code (`stage-1` -> `S1`).
    #[serde(default)]
    pub stage_format: BTreeMap<String, String>,
    /// Sort position in set selectors.
    #[serde(default)]
    pub order: i32,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

impl SetConfig {
    /// A set styled purely through `card-{type}-{stage}` classes.
    pub fn css(name: impl Into<String>, order: i32) -> Self {
        Self {
            name: name.into(),
            css_class_based: true,
            path: String::new(),
            prefix: default_prefix(),
            filename_format: String::new(),
            stage_format: BTreeMap::new(),
            order,
        }
    }

    /// A set backed by image files laid out as `{path}/{Type}/{filename}.png`.
    pub fn image(
        name: impl Into<String>,
        path: impl Into<String>,
        filename_format: impl Into<String>,
        order: i32,
    ) -> Self {
        Self {
            name: name.into(),
            css_class_based: false,
            path: path.into(),
            prefix: default_prefix(),
            filename_format: filename_format.into(),
            stage_format: BTreeMap::new(),
            order,
        }
    }

    /// Override the `{prefix}` value.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Map a stage key to the code used in filenames.
    pub fn with_stage_code(mut self, stage: Stage, code: impl Into<String>) -> Self {
        self.stage_format.insert(stage.key().to_string(), code.into());
        self
    }

    /// Stage code for filenames, falling back to the raw stage key.
    pub fn stage_code(&self, stage: Stage) -> &str {
        self.stage_format
            .get(stage.key())
            .map(String::as_str)
            .unwrap_or_else(|| stage.key())
    }

    /// Expand `template` with this set's prefix and stage codes.
    pub fn render_filename(&self, template: &str, card_type: CardType, stage: Stage) -> String {
        let stage_code = self.stage_code(stage);
        template
            .replace("{prefix}", &self.prefix)
            .replace("{type}", &card_type.capitalized())
            .replace("{stageClass}", stage_code)
            .replace("{stage}", stage_code)
    }

    /// Full image path for the set's own filename template.
    pub fn image_path(&self, card_type: CardType, stage: Stage) -> String {
        self.image_path_with(&self.filename_format, card_type, stage)
    }

    /// Full image path for an arbitrary filename template.
    pub fn image_path_with(&self, template: &str, card_type: CardType, stage: Stage) -> String {
        let filename = self.render_filename(template, card_type, stage);
        let folder = self.path.trim_end_matches('/');
        format!("{folder}/{}/{filename}.png", card_type.capitalized())
    }
}

/// Keyed table of set configurations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetRegistry {
    sets: BTreeMap<String, SetConfig>,
}

impl Default for SetRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SetRegistry {
    /// Registry with no sets at all. Every lookup fails until sets are inserted.
    pub fn empty() -> Self {
        Self {
            sets: BTreeMap::new(),
        }
    }

    /// The sets shipped with the application.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.insert(CLASSIC_SET, SetConfig::css("Classic", 0));
        registry.insert(
            "QuantumContour",
            SetConfig::image(
                "Quantum Contour",
                "img/QuantumContour",
                "{prefix}- {type} - {stage}",
                1,
            )
            .with_stage_code(Stage::Basic, "S0")
            .with_stage_code(Stage::Stage1, "S1")
            .with_stage_code(Stage::Stage2, "S2"),
        );
        registry.insert(
            "Radiant",
            SetConfig::image("Radiant", "img/Radiant", "{prefix}_{type}_{stageClass}", 2)
                .with_prefix("R")
                .with_stage_code(Stage::Stage1, "stage1")
                .with_stage_code(Stage::Stage2, "stage2"),
        );
        registry.insert(
            "Vintage",
            SetConfig::image("Vintage", "img/Vintage", "{type} {stage}", 3)
                .with_stage_code(Stage::Basic, "Basic")
                .with_stage_code(Stage::Stage1, "Stage 1")
                .with_stage_code(Stage::Stage2, "Stage 2"),
        );
        registry
    }

    /// Load a registry from a JSON file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read set registry {}", path.display()))?;
        let registry: Self = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse set registry {}", path.display()))?;
        registry
            .validate()
            .with_context(|| format!("rejected set registry {}", path.display()))?;
        Ok(registry)
    }

    /// Persist the registry as pretty JSON, creating parent directories if needed.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create registry directory {}", parent.display())
            })?;
        }
        let serialized =
            serde_json::to_string_pretty(self).context("failed to serialize set registry")?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write set registry {}", path.display()))
    }

    /// Insert or replace a set.
    pub fn insert(&mut self, key: impl Into<String>, config: SetConfig) {
        self.sets.insert(key.into(), config);
    }

    /// Look up a set by key.
    pub fn get(&self, key: &str) -> Result<&SetConfig, CardError> {
        self.sets
            .get(key)
            .ok_or_else(|| CardError::UnknownSet(key.to_string()))
    }

    /// Whether the key is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.sets.contains_key(key)
    }

    /// Number of registered sets.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether no sets are registered.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Entries in selector order (`order`, then key).
    pub fn sorted(&self) -> Vec<(&str, &SetConfig)> {
        let mut entries: Vec<_> = self
            .sets
            .iter()
            .map(|(key, config)| (key.as_str(), config))
            .collect();
        entries.sort_by(|a, b| a.1.order.cmp(&b.1.order).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// Set keys in selector order.
    pub fn keys(&self) -> Vec<String> {
        self.sorted()
            .into_iter()
            .map(|(key, _)| key.to_string())
            .collect()
    }

    /// Check the registry invariants.
    pub fn validate(&self) -> Result<(), CardError> {
        let classic = self.sets.get(CLASSIC_SET).ok_or_else(|| {
            CardError::InvalidRegistry(format!("required set '{CLASSIC_SET}' is missing"))
        })?;
        if !classic.css_class_based {
            return Err(CardError::InvalidRegistry(format!(
                "set '{CLASSIC_SET}' must be CSS class based"
            )));
        }

        for (key, config) in &self.sets {
            if config.css_class_based {
                continue;
            }
            if config.path.trim().is_empty() {
                return Err(CardError::InvalidRegistry(format!(
                    "set '{key}' has no asset path"
                )));
            }
            if config.filename_format.trim().is_empty() {
                return Err(CardError::InvalidRegistry(format!(
                    "set '{key}' has no filename format"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builtin_registry_is_valid_and_ordered() {
        let registry = SetRegistry::builtin();
        assert!(registry.validate().is_ok());
        assert_eq!(
            registry.keys(),
            vec!["Classic", "QuantumContour", "Radiant", "Vintage"]
        );
    }

    #[test]
    fn stage_code_defaults_to_raw_key() {
        let registry = SetRegistry::builtin();
        let radiant = registry.get("Radiant").expect("builtin set");
        assert_eq!(radiant.stage_code(Stage::Basic), "basic");
        assert_eq!(radiant.stage_code(Stage::Stage2), "stage2");
        assert_eq!(
            radiant.image_path(CardType::Water, Stage::Basic),
            "img/Radiant/Water/R_Water_basic.png"
        );
    }

    #[test]
    fn unknown_set_is_reported() {
        let registry = SetRegistry::empty();
        assert_eq!(
            registry.get("Classic"),
            Err(CardError::UnknownSet("Classic".to_string()))
        );
    }

    #[test]
    fn rejects_registry_without_classic() {
        let mut registry = SetRegistry::empty();
        registry.insert("Holo", SetConfig::css("Holo", 0));
        assert!(matches!(
            registry.validate(),
            Err(CardError::InvalidRegistry(_))
        ));
    }

    #[test]
    fn loads_camel_case_json() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("sets.json");
        fs::write(
            &path,
            r#"{
  "Classic": { "name": "Classic", "cssClassBased": true },
  "Neon": {
    "name": "Neon",
    "path": "img/Neon/",
    "filenameFormat": "{prefix} - {type} - {stage}",
    "stageFormat": { "stage-1": "S1" },
    "order": 4
  }
}"#,
        )?;

        let registry = SetRegistry::load(&path)?;
        let neon = registry.get("Neon")?;
        assert_eq!(neon.prefix, DEFAULT_PREFIX);
        assert_eq!(
            neon.image_path(CardType::Psychic, Stage::Stage1),
            "img/Neon/Psychic/P - Psychic - S1.png"
        );

        let copy = dir.path().join("nested/copy.json");
        registry.persist(&copy)?;
        assert_eq!(SetRegistry::load(&copy)?, registry);
        Ok(())
    }

    #[test]
    fn load_rejects_image_set_without_format() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("sets.json");
        fs::write(
            &path,
            r#"{
  "Classic": { "name": "Classic", "cssClassBased": true },
  "Broken": { "name": "Broken", "path": "img/Broken" }
}"#,
        )?;
        assert!(SetRegistry::load(&path).is_err());
        Ok(())
    }
}
