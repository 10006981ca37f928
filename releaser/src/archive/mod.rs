//! Deterministic release archive construction.
//!
//! - [`builder`] repackages a raw `git archive` stream with canonical
//!   metadata and hashes the compressed output.
//! - [`rules`] decides which entries are removed or renamed.
//! - [`artifact`] names the release file and manages its draft lifecycle.
//! - [`digest`] and [`hashing`] carry the SHA-256 side.

pub mod artifact;
pub mod builder;
pub mod digest;
pub mod error;
pub mod hashing;
pub mod rules;

pub use artifact::{ArtifactName, DraftArtifact};
pub use builder::{ArchiveOutput, build_archive};
pub use digest::Sha256Digest;
pub use error::ArchiveBuildError;
pub use rules::ArchiveRules;
