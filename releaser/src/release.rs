//! End-to-end release workflow.
//!
//! A run moves forward through preflight, the mirror check, tag resolution,
//! then either the known-hash shortcut or the two archive passes with the
//! boilerplate update between them. Any failure ends the run; the draft
//! artifact is the only file created and it is removed on every error
//! path.

use crate::archive::artifact::{ArtifactName, DraftArtifact};
use crate::archive::builder::build_archive;
use crate::archive::digest::Sha256Digest;
use crate::boilerplate::synchronize;
use crate::boilerplate::template::{Boilerplate, BoilerplateTemplate};
use crate::config::ReleaseConfig;
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use crate::mirror::MirrorProbe;
use crate::output::write_stderr_line;
use crate::tag::ReleaseTag;
use crate::upstream::read_upstream;
use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};
use serde::Serialize;
use std::io::Write;

/// Per-run switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOptions {
    /// The release being cut.
    pub tag: ReleaseTag,
    /// Allow releasing from a branch other than the release branch.
    pub skip_branch_check: bool,
    /// Do not probe the upstream mirror (testing only).
    pub skip_mirror_check: bool,
}

impl ReleaseOptions {
    /// Options with every check enabled.
    #[must_use]
    pub fn new(tag: ReleaseTag) -> Self {
        Self {
            tag,
            skip_branch_check: false,
            skip_mirror_check: false,
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseReport {
    /// The release tag.
    pub tag: ReleaseTag,
    /// SHA-256 of the published archive.
    pub sha256: Sha256Digest,
    /// Path of the written artifact; absent when the known hash was used.
    pub artifact: Option<Utf8PathBuf>,
    /// Whether this run created the tag.
    pub tag_created: bool,
    /// Whether the hash came from the known-hash table.
    pub known_hash: bool,
    /// Documents whose boilerplate changed.
    pub updated_documents: Vec<Utf8PathBuf>,
    /// The `http_archive` snippet for the release notes.
    pub boilerplate: String,
}

/// Drives one release against a repository and a mirror probe.
pub struct Releaser<'a, R: ?Sized, P: ?Sized> {
    root: &'a Utf8Path,
    config: &'a ReleaseConfig,
    repository: &'a R,
    probe: &'a P,
}

impl<'a, R, P> Releaser<'a, R, P>
where
    R: Repository + ?Sized,
    P: MirrorProbe + ?Sized,
{
    /// Prepare a release of the working tree at `root`.
    #[must_use]
    pub fn new(
        root: &'a Utf8Path,
        config: &'a ReleaseConfig,
        repository: &'a R,
        probe: &'a P,
    ) -> Self {
        Self {
            root,
            config,
            repository,
            probe,
        }
    }

    /// Cut the release described by `options`, writing progress to `stderr`.
    ///
    /// # Errors
    ///
    /// Returns the [`ReleaseError`] of the first step that fails. No artifact
    /// is left behind on failure; documents already rewritten are not
    /// restored.
    pub fn run(&self, options: &ReleaseOptions, stderr: &mut dyn Write) -> Result<ReleaseReport> {
        let tag = &options.tag;
        write_stderr_line(stderr, format!("Cutting release {tag}"));

        self.preflight(options)?;
        self.check_mirror(options, stderr)?;

        let tag_exists = self.repository.tag_exists(tag)?;
        let build_ref = if tag_exists { tag.as_str() } else { "HEAD" };
        info!("building from {build_ref}");

        let template = BoilerplateTemplate::new(
            &self.config.project_name,
            &self.config.release_urls,
            &self.config.block_markers,
        );

        if let Some(known) = self.config.known_hashes.get(tag) {
            info!("{tag} is already published with sha256 {known}");
            write_stderr_line(stderr, format!("Using published hash for {tag}"));
            let rendered = template.render(tag, known);
            let updated_documents = self.synchronize(&template, &rendered)?;
            return Ok(ReleaseReport {
                tag: tag.clone(),
                sha256: known.clone(),
                artifact: None,
                tag_created: false,
                known_hash: true,
                updated_documents,
                boilerplate: rendered.snippet,
            });
        }

        write_stderr_line(stderr, "Computing archive hash");
        let precomputed = self.precompute(build_ref)?;
        info!("precomputed sha256 {precomputed}");

        let rendered = template.render(tag, &precomputed);
        let updated_documents = self.synchronize(&template, &rendered)?;

        let tag_created = !tag_exists;
        if tag_created {
            self.commit_and_tag(tag)?;
            write_stderr_line(stderr, format!("Tagged {tag}"));
        }

        let name = ArtifactName::new(&self.config.project_name, tag);
        write_stderr_line(stderr, format!("Creating archive {name}"));
        let artifact = self.write_verified(tag, &name, &precomputed)?;
        write_stderr_line(stderr, format!("Wrote {artifact}"));

        Ok(ReleaseReport {
            tag: tag.clone(),
            sha256: precomputed,
            artifact: Some(artifact),
            tag_created,
            known_hash: false,
            updated_documents,
            boilerplate: rendered.snippet,
        })
    }

    fn preflight(&self, options: &ReleaseOptions) -> Result<()> {
        if !self.repository.is_clean()? {
            return Err(ReleaseError::DirtyTree);
        }
        if options.skip_branch_check {
            warn!("skipping release branch check");
            return Ok(());
        }
        let actual = self.repository.current_branch()?;
        if actual != self.config.release_branch {
            return Err(ReleaseError::BranchMismatch {
                expected: self.config.release_branch.clone(),
                actual,
            });
        }
        Ok(())
    }

    fn check_mirror(&self, options: &ReleaseOptions, stderr: &mut dyn Write) -> Result<()> {
        if options.skip_mirror_check {
            warn!("skipping upstream mirror check");
            write_stderr_line(stderr, "SKIPPING: upstream mirror check");
            return Ok(());
        }
        let upstream = &self.config.upstream;
        let spec = read_upstream(&self.root.join(&upstream.file), &upstream.names)?;
        let url = spec.download_url(&upstream.probe_platform, &upstream.probe_extension);
        info!("probing {url}");
        self.probe
            .probe(&url)
            .map_err(ReleaseError::MirrorUnavailable)
    }

    fn precompute(&self, build_ref: &str) -> Result<Sha256Digest> {
        let raw = self.repository.archive(build_ref, &self.config.paths)?;
        let output = build_archive(raw.as_slice(), std::io::sink(), &self.config.archive_rules())?;
        Ok(output.digest)
    }

    fn synchronize(
        &self,
        template: &BoilerplateTemplate<'_>,
        rendered: &Boilerplate,
    ) -> Result<Vec<Utf8PathBuf>> {
        Ok(synchronize(
            self.root,
            &self.config.documents,
            template,
            rendered,
        )?)
    }

    fn commit_and_tag(&self, tag: &ReleaseTag) -> Result<()> {
        if self.repository.is_clean()? {
            info!("boilerplate already current; nothing to commit");
        } else {
            self.repository.commit(&format!("Release {tag}"))?;
        }
        self.repository.create_tag(tag)?;
        Ok(())
    }

    fn write_verified(
        &self,
        tag: &ReleaseTag,
        name: &ArtifactName,
        precomputed: &Sha256Digest,
    ) -> Result<Utf8PathBuf> {
        let io_error = |source| ReleaseError::Io {
            path: self.root.join(name.as_str()),
            source,
        };
        let mut draft = DraftArtifact::create(self.root, name).map_err(io_error)?;
        let raw = self.repository.archive(tag.as_str(), &self.config.paths)?;
        let output = build_archive(raw.as_slice(), draft.writer(), &self.config.archive_rules())?;

        if output.digest != *precomputed {
            return Err(ReleaseError::HashMismatch {
                precomputed: precomputed.clone(),
                published: output.digest,
            });
        }
        info!("verified sha256 {}", output.digest);
        draft.promote().map_err(io_error)
    }
}

#[cfg(test)]
#[path = "release_tests.rs"]
mod tests;
