#![warn(clippy::all, missing_docs)]

//! Core composition logic for Card Forge.
//!
//! This crate hosts the set registry and resolver, the dual type overlay
//! compositor, the card surface abstraction and the export snapshots used
//! by the terminal UI and any future frontends.

pub mod composer;
pub mod config;
pub mod custom;
pub mod error;
pub mod export;
pub mod manifest;
pub mod models;
pub mod overlay;
pub mod selection;
pub mod sets;
pub mod surface;

pub use composer::Composer;
pub use config::AppConfig;
pub use custom::DataUrl;
pub use error::CardError;
pub use export::{CardComposition, ExportWriter};
pub use manifest::ImageManifest;
pub use models::{CardType, ImageSlot, Stage};
pub use overlay::{MaskChoice, OverlayCompositor, OverlayOutcome};
pub use selection::SelectionState;
pub use sets::{Resolution, SetConfig, SetRegistry, SetResolver};
pub use surface::{CardSurface, MemorySurface};
