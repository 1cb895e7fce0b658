//! Set configuration and resolution.

/// Declarative per-set configuration table.
pub mod registry;
/// Type/stage to class name or image path resolution.
pub mod resolver;

pub use registry::{SetConfig, SetRegistry, CLASSIC_SET};
pub use resolver::{resolve_class, Resolution, SetResolver};
