//! Error types for the release workflow.
//!
//! Every failure is terminal to the run. Variants carry the context an
//! operator needs to act without re-running: the command that failed, the
//! document and marker involved, or both hashes that disagreed.

use crate::archive::digest::Sha256Digest;
use crate::archive::error::ArchiveBuildError;
use crate::boilerplate::MarkerError;
use crate::config::ConfigError;
use crate::git::GitCommandError;
use crate::mirror::ProbeError;
use crate::tag::TagFormatError;
use crate::upstream::UpstreamParseError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while cutting a release.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// The requested tag is malformed.
    #[error(transparent)]
    TagFormat(#[from] TagFormatError),

    /// Tracked files have uncommitted changes.
    #[error("working tree has uncommitted changes; commit or stash them first")]
    DirtyTree,

    /// The checked-out branch is not the release branch.
    #[error("releases are cut from {expected}, but {actual} is checked out")]
    BranchMismatch {
        /// The configured release branch.
        expected: String,
        /// The branch actually checked out.
        actual: String,
    },

    /// A version-control command failed or timed out.
    #[error(transparent)]
    RepositoryCommand(#[from] GitCommandError),

    /// The pinned SDK cannot be downloaded from its mirror.
    #[error("upstream SDK is not available from the mirror")]
    MirrorUnavailable(#[source] ProbeError),

    /// A boilerplate document could not be synchronized.
    #[error(transparent)]
    MarkerNotFound(#[from] MarkerError),

    /// The final archive does not match the hash embedded in the boilerplate.
    #[error(
        "archive hash changed between passes: precomputed {precomputed}, final {published}; \
         is a boilerplate document part of the archived paths?"
    )]
    HashMismatch {
        /// Hash of the archive before boilerplate was updated.
        precomputed: Sha256Digest,
        /// Hash of the archive that would have been published.
        published: Sha256Digest,
    },

    /// The upstream SDK pin could not be read.
    #[error("failed to read the upstream SDK pin")]
    UpstreamParse(#[from] UpstreamParseError),

    /// The archive could not be built.
    #[error(transparent)]
    ArchiveBuild(#[from] ArchiveBuildError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No repository root was given and none could be inferred.
    #[error("repository root not set; pass --repo-root or run under `bazel run`")]
    MissingRepoRoot,

    /// A file operation on the artifact failed.
    #[error("I/O error on {path}")]
    Io {
        /// The file involved.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for results with [`ReleaseError`].
pub type Result<T> = std::result::Result<T, ReleaseError>;
