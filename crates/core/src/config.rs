//! Application configuration.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    export::ExportWriter,
    manifest::{self, ImageManifest},
    overlay::DEFAULT_MASK,
    sets::{SetRegistry, SetResolver, CLASSIC_SET},
};

/// Directory under the user's config dir holding `config.json`.
pub const CONFIG_DIR: &str = "cardforge";

/// Prefix for environment overrides (`CARDFORGE__ASSET_ROOT`).
pub const ENV_PREFIX: &str = "CARDFORGE";

/// Settings shared by every front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory the set asset paths are relative to.
    pub asset_root: PathBuf,
    /// JSON set registry replacing the built-in sets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_path: Option<PathBuf>,
    /// JSON image manifest; when absent the assets may be scanned instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<PathBuf>,
    /// Walk `asset_root` to build the image manifest when no manifest file is given.
    pub scan_assets: bool,
    /// Set selected at start-up.
    pub default_set: String,
    /// Where exported compositions are written.
    pub export_dir: PathBuf,
    /// Mask choices offered for the dual type overlay.
    pub masks: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("."),
            registry_path: None,
            manifest_path: None,
            scan_assets: true,
            default_set: CLASSIC_SET.to_string(),
            export_dir: ExportWriter::default_root(),
            masks: vec![
                DEFAULT_MASK.to_string(),
                "img/masks/wave.png".to_string(),
                "img/masks/split-vertical.png".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load defaults, the user config file, then environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Same as [`AppConfig::load`] with an explicit config file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults =
            Config::try_from(&Self::default()).context("failed to serialize default config")?;
        let settings = Config::builder()
            .add_source(defaults)
            .add_source(
                File::from(path)
                    .format(FileFormat::Json)
                    .required(false),
            )
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("failed to load config {}", path.display()))?;
        settings
            .try_deserialize()
            .with_context(|| format!("invalid config {}", path.display()))
    }

    /// Set registry from `registry_path`, or the built-in sets.
    pub fn load_registry(&self) -> Result<SetRegistry> {
        match &self.registry_path {
            Some(path) => SetRegistry::load(self.resolve_path(path)),
            None => Ok(SetRegistry::builtin()),
        }
    }

    /// Image manifest from `manifest_path`, the cached scan, a fresh scan, or nothing.
    pub fn load_manifest(&self, registry: &SetRegistry) -> Result<ImageManifest> {
        if let Some(path) = &self.manifest_path {
            return Ok(ImageManifest::load(self.resolve_path(path))?.unwrap_or_default());
        }
        if let Some(cached) = ImageManifest::load(manifest::manifest_path(&self.asset_root))? {
            return Ok(cached);
        }
        self.rescan_manifest(registry)
    }

    /// Walk `asset_root` again and refresh the cached manifest.
    ///
    /// An explicit `manifest_path` is never replaced by a scan. With
    /// scanning disabled the cached manifest, if any, is returned unchanged.
    pub fn rescan_manifest(&self, registry: &SetRegistry) -> Result<ImageManifest> {
        let cache = manifest::manifest_path(&self.asset_root);
        if let Some(path) = &self.manifest_path {
            return Ok(ImageManifest::load(self.resolve_path(path))?.unwrap_or_default());
        }
        if !self.scan_assets {
            return Ok(ImageManifest::load(&cache)?.unwrap_or_default());
        }

        let manifest = ImageManifest::scan(&self.asset_root, registry)?;
        info!(
            "Scanned {} images under {}",
            manifest.len(),
            self.asset_root.display()
        );
        if let Err(err) = manifest.persist(&cache) {
            warn!("Image manifest not cached: {err:#}");
        }
        Ok(manifest)
    }

    /// Resolver over the configured registry and manifest.
    pub fn resolver(&self) -> Result<SetResolver> {
        let registry = self.load_registry()?;
        let manifest = self.load_manifest(&registry)?;
        Ok(SetResolver::new(registry, manifest))
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.asset_root.join(path)
        }
    }
}

/// Location of the user config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join("config.json")
}

/// Write the default config file if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(config_path())
}

fn write_default_config(path: PathBuf) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let serialized = serde_json::to_string_pretty(&AppConfig::default())
        .context("failed to serialize default config")?;
    fs::write(&path, serialized).with_context(|| format!("failed to write {}", path.display()))
}
