//! Deterministic repackaging of `git archive` output.
//!
//! The raw stream carries commit-derived pax records, per-file mtimes and
//! whatever ownership the exporting host reports. None of that may influence
//! the published bytes, so every entry is re-emitted with a canonical GNU
//! header: fixed mtime, zero uid/gid, no owner names, and a mode derived only
//! from the entry type and its executable bits. The host's `tar.umask` shows
//! up in the source modes, so they are never copied through. The resulting
//! tar stream is gzip-compressed at the highest level with a fixed gzip
//! header and hashed on the way to the sink.

use super::digest::Sha256Digest;
use super::error::ArchiveBuildError;
use super::hashing::HashingWriter;
use super::rules::{ArchiveRules, EntryDecision};
use flate2::{Compression, GzBuilder};
use log::debug;
use std::io::{Read, Write};
use tar::{EntryType, Header};

/// Modification time stamped on every emitted entry.
pub const CANONICAL_MTIME: u64 = 0;

/// Upper bound of every emitted mode.
pub const PERMISSION_MASK: u32 = 0o777;

/// Mode of regular files without any executable bit.
pub const FILE_MODE: u32 = 0o644;

/// Mode of directories and executable files.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Mode of symbolic links.
const SYMLINK_MODE: u32 = 0o777;

/// Gzip OS byte for "unknown", so the header does not depend on the host.
const GZIP_OS_UNKNOWN: u8 = 255;

/// Result of a successful archive build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutput {
    /// SHA-256 of the compressed bytes handed to the sink.
    pub digest: Sha256Digest,
    /// Number of compressed bytes written.
    pub compressed_len: u64,
    /// Emitted entry names, in archive order.
    pub entries: Vec<String>,
}

/// Repackage the tar stream read from `source` into `sink`.
///
/// Entries are processed in encounter order: metadata records are dropped,
/// `rules` decide removal and renaming, and survivors are re-emitted with
/// canonical metadata and verbatim content. The returned digest is only
/// produced once the tar writer, the gzip encoder and the sink have all
/// closed cleanly.
///
/// # Errors
///
/// Returns [`ArchiveBuildError`] if the source cannot be read, an entry
/// cannot be written, or any output layer fails to finish.
///
/// # Examples
///
/// ```
/// use release_cutter::archive::builder::build_archive;
/// use release_cutter::archive::rules::ArchiveRules;
///
/// let mut raw = tar::Builder::new(Vec::new());
/// let mut header = tar::Header::new_gnu();
/// header.set_size(5);
/// header.set_mode(0o644);
/// header.set_cksum();
/// raw.append_data(&mut header, "LICENSE", &b"MIT\n\n"[..])?;
/// let raw = raw.into_inner()?;
///
/// let first = build_archive(raw.as_slice(), std::io::sink(), &ArchiveRules::default())?;
/// let second = build_archive(raw.as_slice(), std::io::sink(), &ArchiveRules::default())?;
/// assert_eq!(first.digest, second.digest);
/// assert_eq!(first.entries, vec!["LICENSE".to_owned()]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn build_archive<R, W>(
    source: R,
    sink: W,
    rules: &ArchiveRules,
) -> Result<ArchiveOutput, ArchiveBuildError>
where
    R: Read,
    W: Write,
{
    let encoder = GzBuilder::new()
        .mtime(0)
        .operating_system(GZIP_OS_UNKNOWN)
        .write(HashingWriter::new(sink), Compression::best());
    let mut output = tar::Builder::new(encoder);
    let mut input = tar::Archive::new(source);
    let mut emitted = Vec::new();

    for entry in input.entries().map_err(ArchiveBuildError::Read)? {
        let mut entry = entry.map_err(ArchiveBuildError::Read)?;
        let entry_type = entry.header().entry_type();
        let path = entry
            .path()
            .map_err(ArchiveBuildError::Read)?
            .to_string_lossy()
            .into_owned();

        if is_metadata_record(entry_type) {
            debug!("dropping metadata record {path} ({entry_type:?})");
            continue;
        }

        let name = match rules.decide(&path) {
            EntryDecision::Remove => {
                debug!("removing {path}");
                continue;
            }
            EntryDecision::Emit(name) => name,
        };
        if name != path {
            debug!("renaming {path} to {name}");
        }

        let mut header = canonical_header(entry.header(), entry.size())
            .map_err(|source| entry_error(&name, source))?;

        if matches!(entry_type, EntryType::Symlink | EntryType::Link) {
            let target = entry
                .link_name()
                .map_err(|source| entry_error(&name, source))?
                .ok_or_else(|| ArchiveBuildError::MissingLinkTarget { path: name.clone() })?
                .into_owned();
            output
                .append_link(&mut header, &name, &target)
                .map_err(|source| entry_error(&name, source))?;
        } else {
            output
                .append_data(&mut header, &name, &mut entry)
                .map_err(|source| entry_error(&name, source))?;
        }
        emitted.push(name);
    }

    let encoder = output
        .into_inner()
        .map_err(|source| finish_error("tar stream", source))?;
    let hashing = encoder
        .finish()
        .map_err(|source| finish_error("gzip stream", source))?;
    let (mut sink, digest, compressed_len) = hashing.finish();
    sink.flush()
        .map_err(|source| finish_error("output sink", source))?;

    Ok(ArchiveOutput {
        digest,
        compressed_len,
        entries: emitted,
    })
}

/// Records that describe the archive rather than a file in it.
fn is_metadata_record(entry_type: EntryType) -> bool {
    matches!(
        entry_type,
        EntryType::XGlobalHeader
            | EntryType::XHeader
            | EntryType::GNULongName
            | EntryType::GNULongLink
    )
}

/// Build the canonical header for an entry of the given type and size.
fn canonical_header(source: &Header, size: u64) -> std::io::Result<Header> {
    let mut header = Header::new_gnu();
    header.set_entry_type(source.entry_type());
    header.set_mode(canonical_mode(source.entry_type(), source.mode()?));
    header.set_size(size);
    header.set_mtime(CANONICAL_MTIME);
    header.set_uid(0);
    header.set_gid(0);
    Ok(header)
}

/// Map a source mode onto one of the canonical modes.
fn canonical_mode(entry_type: EntryType, source_mode: u32) -> u32 {
    match entry_type {
        EntryType::Directory => EXECUTABLE_MODE,
        EntryType::Symlink => SYMLINK_MODE,
        _ if source_mode & 0o111 != 0 => EXECUTABLE_MODE,
        _ => FILE_MODE,
    }
}

fn entry_error(path: &str, source: std::io::Error) -> ArchiveBuildError {
    ArchiveBuildError::Entry {
        path: path.to_owned(),
        source,
    }
}

fn finish_error(layer: &'static str, source: std::io::Error) -> ArchiveBuildError {
    ArchiveBuildError::Finish { layer, source }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
