//! Artifact naming: key derivation from record ids and extension inference.

mod extension;
mod key;

pub use extension::{extension_for, file_name};
pub use key::ArtifactKey;
