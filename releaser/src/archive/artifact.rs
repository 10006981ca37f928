//! Release artifact naming and the draft-file lifecycle.
//!
//! The final archive is written to a hidden draft file next to its
//! destination. The draft is renamed into place only when the caller
//! promotes it; dropping it on any error path deletes it, so a failed run
//! never leaves a partial `.tar.gz` behind.

use crate::tag::ReleaseTag;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::fs::File;
use std::io;
use tempfile::NamedTempFile;

/// The fixed file extension for release archives.
const ARTIFACT_EXTENSION: &str = ".tar.gz";

/// Permissions of a promoted artifact. Drafts are created owner-only.
#[cfg(unix)]
pub const ARTIFACT_MODE: u32 = 0o644;

/// Deterministic artifact filename: `<project>-<tag>.tar.gz`.
///
/// # Examples
///
/// ```
/// use release_cutter::archive::artifact::ArtifactName;
/// use release_cutter::tag::ReleaseTag;
///
/// let tag = ReleaseTag::parse("v2.1.0")?;
/// let name = ArtifactName::new("hermetic_cc_toolchain", &tag);
/// assert_eq!(name.to_string(), "hermetic_cc_toolchain-v2.1.0.tar.gz");
/// # Ok::<(), release_cutter::tag::TagFormatError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName(String);

impl ArtifactName {
    /// Build the name for `project` at `tag`.
    #[must_use]
    pub fn new(project: &str, tag: &ReleaseTag) -> Self {
        Self(format!("{project}-{tag}{ARTIFACT_EXTENSION}"))
    }

    /// Return the filename.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An artifact that is still being written.
#[derive(Debug)]
pub struct DraftArtifact {
    file: NamedTempFile,
    destination: Utf8PathBuf,
}

impl DraftArtifact {
    /// Create a draft for `name` inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the draft file cannot be created.
    pub fn create(dir: &Utf8Path, name: &ArtifactName) -> io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".partial")
            .tempfile_in(dir)?;
        Ok(Self {
            file,
            destination: dir.join(name.as_str()),
        })
    }

    /// Where the artifact lands once promoted.
    #[must_use]
    pub fn destination(&self) -> &Utf8Path {
        &self.destination
    }

    /// Path of the draft file itself.
    #[must_use]
    pub fn draft_path(&self) -> &std::path::Path {
        self.file.path()
    }

    /// Mutable handle for writing archive bytes.
    pub fn writer(&mut self) -> &mut File {
        self.file.as_file_mut()
    }

    /// Sync the draft, make it world-readable and atomically rename it to
    /// its destination.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if syncing, changing permissions or renaming
    /// fails; the draft is removed in that case.
    pub fn promote(self) -> io::Result<Utf8PathBuf> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            self.file
                .as_file()
                .set_permissions(std::fs::Permissions::from_mode(ARTIFACT_MODE))?;
        }
        self.file.as_file().sync_all()?;
        self.file
            .persist(&self.destination)
            .map_err(|err| err.error)?;
        Ok(self.destination)
    }
}
