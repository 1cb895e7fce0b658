//! Per-set table of the image files that actually exist.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::sets::SetRegistry;

/// Known image paths grouped by set key.
///
/// Paths are stored exactly as the resolver produces them
/// (`img/QuantumContour/Fire/P- Fire - S1.png`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageManifest {
    sets: BTreeMap<String, BTreeSet<String>>,
}

impl ImageManifest {
    /// Load a manifest from the given path, returning `None` if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read image manifest {}", path.display()))?;
        let manifest = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse image manifest {}", path.display()))?;
        Ok(Some(manifest))
    }

    /// Persist the manifest to the given file, creating parent directories if needed.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create manifest directory {}", parent.display())
            })?;
        }

        let serialized =
            serde_json::to_string_pretty(self).context("failed to serialize image manifest")?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write image manifest {}", path.display()))
    }

    /// Walk the asset folders of every image-based set beneath `asset_root`.
    ///
    /// Sets whose folder is missing are left out, so the resolver trusts their
    /// templated paths instead of reporting misses.
    pub fn scan(asset_root: impl AsRef<Path>, registry: &SetRegistry) -> Result<Self> {
        let asset_root = asset_root.as_ref();
        let mut manifest = Self::default();

        for (key, config) in registry.sorted() {
            if config.css_class_based {
                continue;
            }
            let folder = config.path.trim_end_matches('/');
            let set_root = asset_root.join(folder);
            if !set_root.is_dir() {
                debug!("no asset folder for set {key} at {}", set_root.display());
                continue;
            }

            for entry in WalkDir::new(&set_root).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!("Skipping unreadable asset in {}: {err}", set_root.display());
                        continue;
                    }
                };
                if !entry.file_type().is_file() || !is_png(entry.path()) {
                    continue;
                }
                let relative = match entry.path().strip_prefix(&set_root) {
                    Ok(relative) => relative,
                    Err(_) => continue,
                };
                manifest.insert(key, format!("{folder}/{}", slash_path(relative)));
            }
        }

        Ok(manifest)
    }

    /// Record an image path for a set.
    pub fn insert(&mut self, set_key: impl Into<String>, path: impl Into<String>) {
        self.sets.entry(set_key.into()).or_default().insert(path.into());
    }

    /// Whether any images are known for the set.
    pub fn covers(&self, set_key: &str) -> bool {
        self.sets
            .get(set_key)
            .map(|paths| !paths.is_empty())
            .unwrap_or(false)
    }

    /// Whether the exact path is known for the set.
    pub fn contains(&self, set_key: &str, path: &str) -> bool {
        self.sets
            .get(set_key)
            .map(|paths| paths.contains(path))
            .unwrap_or(false)
    }

    /// Total number of known image paths.
    pub fn len(&self) -> usize {
        self.sets.values().map(BTreeSet::len).sum()
    }

    /// Whether the manifest holds no paths.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Helper to compute the default manifest path inside an asset directory.
pub fn manifest_path(asset_root: impl AsRef<Path>) -> PathBuf {
    asset_root.as_ref().join(".cardforge-manifest.json")
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false)
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn scans_image_sets_only() -> Result<()> {
        let temp = tempdir()?;
        let root = temp.path();
        let fire = root.join("img/QuantumContour/Fire");
        fs::create_dir_all(&fire)?;
        fs::write(fire.join("P - Fire - S1.png"), b"png")?;
        fs::write(fire.join("notes.txt"), b"skip")?;

        let manifest = ImageManifest::scan(root, &SetRegistry::builtin())?;
        assert_eq!(manifest.len(), 1);
        assert!(manifest.covers("QuantumContour"));
        assert!(!manifest.covers("Radiant"));
        assert!(manifest.contains(
            "QuantumContour",
            "img/QuantumContour/Fire/P - Fire - S1.png"
        ));
        Ok(())
    }

    #[test]
    fn missing_manifest_loads_as_none() -> Result<()> {
        let temp = tempdir()?;
        assert!(ImageManifest::load(manifest_path(temp.path()))?.is_none());

        let mut manifest = ImageManifest::default();
        manifest.insert("Vintage", "img/Vintage/Grass/Grass Basic.png");
        let path = manifest_path(temp.path());
        manifest.persist(&path)?;
        assert_eq!(ImageManifest::load(&path)?, Some(manifest));
        Ok(())
    }
}
