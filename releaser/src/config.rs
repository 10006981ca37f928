//! Release configuration.
//!
//! Every knob of a release lives in one immutable [`ReleaseConfig`] built
//! once at startup. Defaults describe the hermetic_cc_toolchain repository
//! layout; a `release.toml` at the repository root (or an explicit
//! `--config` file) overrides individual fields.

use crate::archive::digest::Sha256Digest;
use crate::archive::rules::ArchiveRules;
use crate::boilerplate::markers::MarkerPair;
use crate::boilerplate::{BoilerplateDocument, DocumentKind};
use crate::tag::ReleaseTag;
use crate::upstream::UpstreamNames;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use thiserror::Error;

/// File name looked up in the repository root when no path is given.
pub const CONFIG_FILE_NAME: &str = "release.toml";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration {path}")]
    Read {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unknown or mistyped fields.
    #[error("invalid configuration {path}")]
    Parse {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// The TOML deserialization error.
        #[source]
        source: toml::de::Error,
    },
}

/// Where the pinned SDK is declared and how to probe its mirror.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Starlark file declaring the pin, relative to the repository root.
    pub file: Utf8PathBuf,
    /// Variable names carrying the pin.
    pub names: UpstreamNames,
    /// Platform whose download is probed.
    pub probe_platform: String,
    /// Archive extension of that platform's download.
    pub probe_extension: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            file: Utf8PathBuf::from("toolchain/private/zig_sdk.bzl"),
            names: UpstreamNames::default(),
            probe_platform: "linux-x86_64".to_owned(),
            probe_extension: "tar.xz".to_owned(),
        }
    }
}

/// Timeouts, in seconds, for external interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    /// Limit for each version-control command.
    pub command_secs: u64,
    /// Limit for the mirror probe.
    pub probe_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            command_secs: 300,
            probe_secs: 30,
        }
    }
}

impl Timeouts {
    /// The command timeout as a [`Duration`].
    #[must_use]
    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    /// The probe timeout as a [`Duration`].
    #[must_use]
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }
}

/// Complete description of how a release is cut.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    /// Project name used in artifact names, URLs and the manifest marker.
    pub project_name: String,
    /// Branch releases must be cut from.
    pub release_branch: String,
    /// Pathspecs included in the archive.
    pub paths: Vec<String>,
    /// Source path to archive path renames.
    pub renames: BTreeMap<String, String>,
    /// Files or directories dropped from the archive.
    pub removals: BTreeSet<String>,
    /// Download URL templates; `{project}`, `{tag}` and `{version}` are
    /// substituted.
    pub release_urls: Vec<String>,
    /// Markers bounding boilerplate blocks.
    pub block_markers: MarkerPair,
    /// Documents carrying boilerplate.
    pub documents: Vec<BoilerplateDocument>,
    /// Upstream SDK pin and mirror probe settings.
    pub upstream: UpstreamConfig,
    /// External interaction timeouts.
    pub timeouts: Timeouts,
    /// Hashes of releases that are already published and must not be
    /// recomputed.
    pub known_hashes: BTreeMap<ReleaseTag, Sha256Digest>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            project_name: "hermetic_cc_toolchain".to_owned(),
            release_branch: "main".to_owned(),
            paths: ["LICENSE", "NOTICE", "MODULE.bazel", "toolchain/*"]
                .map(str::to_owned)
                .to_vec(),
            renames: BTreeMap::new(),
            removals: BTreeSet::new(),
            release_urls: vec![
                "https://mirror.bazel.build/github.com/uber/{project}/releases/download/{tag}/{project}-{tag}.tar.gz"
                    .to_owned(),
                "https://github.com/uber/{project}/releases/download/{tag}/{project}-{tag}.tar.gz"
                    .to_owned(),
            ],
            block_markers: MarkerPair::new(
                "# --- begin release boilerplate ---",
                "# --- end release boilerplate ---",
            ),
            documents: vec![
                BoilerplateDocument::new("README.md", DocumentKind::Block),
                BoilerplateDocument::new("examples/rules_cc/WORKSPACE", DocumentKind::Block),
                BoilerplateDocument::new("examples/bzlmod/MODULE.bazel", DocumentKind::Manifest),
            ],
            upstream: UpstreamConfig::default(),
            timeouts: Timeouts::default(),
            known_hashes: BTreeMap::new(),
        }
    }
}

impl ReleaseConfig {
    /// Load configuration for the repository at `repo_root`.
    ///
    /// An `explicit` path must exist. Without one, `release.toml` in the
    /// repository root is used when present and defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the chosen file cannot be read or parsed.
    pub fn load(repo_root: &Utf8Path, explicit: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_owned(),
            None => {
                let candidate = repo_root.join(CONFIG_FILE_NAME);
                if !candidate.is_file() {
                    debug!("no {CONFIG_FILE_NAME} in {repo_root}; using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        debug!("loading configuration from {path}");
        Self::from_toml(&text).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Parse configuration from TOML text, filling absent fields with
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns the TOML error for malformed input or unknown fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use release_cutter::config::ReleaseConfig;
    ///
    /// let config = ReleaseConfig::from_toml("release_branch = \"release\"")?;
    /// assert_eq!(config.release_branch, "release");
    /// assert_eq!(config.project_name, "hermetic_cc_toolchain");
    /// # Ok::<(), toml::de::Error>(())
    /// ```
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// The archive rule set built from `renames` and `removals`.
    #[must_use]
    pub fn archive_rules(&self) -> ArchiveRules {
        ArchiveRules::new(&self.renames, &self.removals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn utf8(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8")
    }

    #[test]
    fn defaults_describe_the_toolchain_repository() {
        let config = ReleaseConfig::default();
        assert_eq!(config.release_branch, "main");
        assert!(config.paths.contains(&"toolchain/*".to_owned()));
        assert_eq!(config.upstream.names.version, "_VERSION");
        assert_eq!(config.upstream.names.url_template, "URL_FORMAT_BAZELMIRROR");
        assert_eq!(config.timeouts.command(), Duration::from_secs(300));
        assert!(config.known_hashes.is_empty());
    }

    #[test]
    fn full_file_overrides_fields() {
        let config = ReleaseConfig::from_toml(&format!(
            r#"
project_name = "demo"
paths = ["LICENSE", "src/*"]
removals = ["src/testing"]

[renames]
"BUILD.release.bazel" = "BUILD.bazel"

[[documents]]
path = "docs/usage.md"
kind = "block"

[[documents]]
path = "MODULE.bazel"
kind = "manifest"

[upstream]
file = "sdk.bzl"
names = {{ version = "SDK_VERSION", url_template = "SDK_URL" }}

[timeouts]
command_secs = 10

[known_hashes]
"v1.0.0" = "{}"
"#,
            "a".repeat(64)
        ))
        .expect("valid config");

        assert_eq!(config.project_name, "demo");
        assert_eq!(config.documents.len(), 2);
        assert_eq!(config.documents[1].kind, DocumentKind::Manifest);
        assert_eq!(config.upstream.names.version, "SDK_VERSION");
        assert_eq!(config.upstream.probe_platform, "linux-x86_64");
        assert_eq!(config.timeouts.probe_secs, 30);
        let tag = ReleaseTag::parse("v1.0.0").expect("tag");
        assert_eq!(config.known_hashes[&tag].as_str(), "a".repeat(64));
        assert_eq!(
            config.archive_rules(),
            ArchiveRules::new([("BUILD.release.bazel", "BUILD.bazel")], ["src/testing"])
        );
    }

    #[rstest]
    #[case::unknown_field("projet_name = \"typo\"")]
    #[case::bad_tag_key("[known_hashes]\n\"1.0.0\" = \"aa\"")]
    #[case::bad_digest(r#"[known_hashes]
"v1.0.0" = "not-a-digest""#)]
    #[case::bad_kind("[[documents]]\npath = \"x\"\nkind = \"page\"")]
    fn invalid_files_are_rejected(#[case] text: &str) {
        assert!(ReleaseConfig::from_toml(text).is_err());
    }

    #[test]
    fn missing_default_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = ReleaseConfig::load(&utf8(&dir), None).expect("defaults");
        assert_eq!(config, ReleaseConfig::default());
    }

    #[test]
    fn repository_file_is_picked_up() {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = utf8(&dir);
        std::fs::write(root.join(CONFIG_FILE_NAME), "release_branch = \"stable\"\n")
            .expect("write");
        let config = ReleaseConfig::load(&root, None).expect("loads");
        assert_eq!(config.release_branch, "stable");
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = utf8(&dir);
        let err = ReleaseConfig::load(&root, Some(&root.join("absent.toml")))
            .expect_err("missing explicit file");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = utf8(&dir);
        let path = root.join("custom.toml");
        std::fs::write(&path, "paths = 3\n").expect("write");
        let err = ReleaseConfig::load(&root, Some(&path)).expect_err("bad type");
        assert!(err.to_string().contains("custom.toml"));
    }
}
