//! Error types for archive construction.

use thiserror::Error;

/// Errors arising while repackaging a source tree stream.
#[derive(Debug, Error)]
pub enum ArchiveBuildError {
    /// The raw source stream could not be read or is not a tar stream.
    #[error("failed to read source archive stream")]
    Read(#[source] std::io::Error),

    /// A single entry could not be copied into the output archive.
    #[error("failed to repackage entry {path}")]
    Entry {
        /// Destination path of the entry being written.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A symlink entry carries no target.
    #[error("symlink entry {path} has no link target")]
    MissingLinkTarget {
        /// Path of the offending entry.
        path: String,
    },

    /// One of the output layers failed to close cleanly.
    #[error("failed to close {layer}")]
    Finish {
        /// Which layer failed: tar stream, gzip stream, or output sink.
        layer: &'static str,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
