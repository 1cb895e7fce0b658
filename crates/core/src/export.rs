//! Snapshots of a composed card handed to the export step.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    overlay::{LayerStyle, OverlayLayer, ZLayer, OVERLAY_ID},
    selection::SelectionState,
    surface::{CARD_BACKGROUND, CARD_CONTENT},
};

/// Directory under the user's data dir used for exports.
pub const DEFAULT_EXPORT_DIR: &str = "cardforge/exports";

/// One positioned element of the exported card, bottom to top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSnapshot {
    /// Element id on the surface.
    pub id: String,
    /// Stacking slot.
    pub layer: ZLayer,
    /// Full style, absent for content elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<LayerStyle>,
}

/// Self-consistent description of the card at export time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardComposition {
    /// Selection that produced the card.
    pub selection: SelectionState,
    /// Layers ordered by z-index.
    pub layers: Vec<LayerSnapshot>,
    /// When the snapshot was taken.
    pub exported_at: DateTime<Utc>,
}

impl CardComposition {
    /// Snapshot the given layer styles.
    pub fn capture(
        selection: &SelectionState,
        base: Option<LayerStyle>,
        overlay: Option<OverlayLayer>,
    ) -> Self {
        let mut layers = vec![LayerSnapshot {
            id: CARD_BACKGROUND.to_string(),
            layer: ZLayer::Base,
            style: base,
        }];
        if let Some(overlay) = overlay {
            layers.push(LayerSnapshot {
                id: OVERLAY_ID.to_string(),
                layer: ZLayer::Overlay,
                style: Some(overlay.style),
            });
        }
        layers.extend(CARD_CONTENT.iter().map(|id| LayerSnapshot {
            id: id.to_string(),
            layer: ZLayer::Content,
            style: None,
        }));

        Self {
            selection: selection.clone(),
            layers,
            exported_at: Utc::now(),
        }
    }

    /// Whether the layers are in non-decreasing z order.
    pub fn is_ordered(&self) -> bool {
        self.layers
            .windows(2)
            .all(|pair| pair[0].layer <= pair[1].layer)
    }

    /// Default file stem: type, optional second type, stage.
    pub fn file_stem(&self) -> String {
        let selection = &self.selection;
        let mut stem = selection.current_type.key().to_string();
        if let Some(second) = selection.overlay_type() {
            stem.push('-');
            stem.push_str(second.key());
        }
        stem.push('-');
        stem.push_str(selection.current_stage.key());
        stem
    }
}

/// Metadata describing a written export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    /// Absolute path of the export file.
    pub path: PathBuf,
    /// When the card was exported.
    pub exported_at: DateTime<Utc>,
}

/// Writes composition snapshots as JSON files.
pub struct ExportWriter {
    root: PathBuf,
}

impl ExportWriter {
    /// Create a writer rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default location under the user's data directory.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_EXPORT_DIR)
    }

    /// Directory exports are written to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the composition and return the new entry.
    pub fn write(&self, composition: &CardComposition) -> Result<ExportEntry> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;

        if !composition.is_ordered() {
            warn!("Exporting card with out-of-order layers");
        }

        let file_name = format!(
            "{}_{}.json",
            sanitize_component(&composition.file_stem()),
            composition.exported_at.format("%Y%m%d%H%M%S%3f")
        );
        let path = self.root.join(file_name);
        let serialised = serde_json::to_vec_pretty(composition)?;
        fs::write(&path, serialised)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Exported card to {}", path.display());

        Ok(ExportEntry {
            path,
            exported_at: composition.exported_at,
        })
    }

    /// Return all exports sorted by timestamp (most recent first).
    pub fn entries(&self) -> Result<Vec<ExportEntry>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root).context("failed to read export directory")? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if entry.path().extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            match self.load(entry.path()) {
                Ok(composition) => entries.push(ExportEntry {
                    path: entry.path(),
                    exported_at: composition.exported_at,
                }),
                Err(err) => {
                    warn!("Failed to read export {:?}: {err}", entry.path());
                }
            }
        }

        entries.sort_by(|a, b| b.exported_at.cmp(&a.exported_at));
        Ok(entries)
    }

    /// Read a composition back from disk.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<CardComposition> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let composition = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(composition)
    }
}

fn sanitize_component(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
            result.push(ch);
        }
    }
    if result.is_empty() {
        "card".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{CardType, Stage},
        overlay::{Background, MaskStyle},
    };
    use tempfile::tempdir;

    fn base() -> LayerStyle {
        LayerStyle {
            background: Background::Class("card-fire-basic".to_string()),
            mask: MaskStyle::None,
            layer: ZLayer::Base,
        }
    }

    #[test]
    fn export_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let writer = ExportWriter::new(dir.path().join("exports"));
        let mut selection = SelectionState::default();
        selection.is_dual_type = true;
        selection.second_type = Some(CardType::Water);
        selection.current_stage = Stage::Stage1;

        let composition = CardComposition::capture(&selection, Some(base()), None);
        assert!(composition.is_ordered());
        assert_eq!(composition.file_stem(), "fire-water-stage-1");

        let entry = writer.write(&composition)?;
        assert!(entry.path.exists());

        let entries = writer.entries()?;
        assert_eq!(entries.len(), 1);
        assert_eq!(writer.load(&entries[0].path)?, composition);
        Ok(())
    }

    #[test]
    fn content_layers_sit_on_top() {
        let composition = CardComposition::capture(&SelectionState::default(), None, None);
        assert_eq!(composition.layers.len(), 1 + CARD_CONTENT.len());
        assert!(composition
            .layers
            .iter()
            .skip(1)
            .all(|layer| layer.layer == ZLayer::Content));
    }

    #[test]
    fn sanitize_creates_safe_filenames() {
        assert_eq!(sanitize_component("fire/../water stage-1"), "firewaterstage-1");
        assert_eq!(sanitize_component("???"), "card");
    }
}
