//! CLI argument definitions for the release cutter.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::error::{ReleaseError, Result};
use crate::release::ReleaseOptions;
use crate::tag::ReleaseTag;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::LevelFilter;

/// Environment variable `bazel run` sets to the invoking workspace.
pub const WORKSPACE_ENV: &str = "BUILD_WORKSPACE_DIRECTORY";

/// Cut a reproducible hermetic_cc_toolchain release.
#[derive(Parser, Debug, Clone)]
#[command(name = "release-cutter")]
#[command(version, about)]
#[command(long_about = concat!(
    "Cut a reproducible hermetic_cc_toolchain release.\n\n",
    "The release cutter checks the working tree and branch, confirms the pinned ",
    "Zig SDK is downloadable from its mirror, computes the hash of the release ",
    "archive, writes the http_archive boilerplate into the documentation, ",
    "commits and tags, then writes the archive and verifies that its hash ",
    "matches the one just published.\n\n",
    "Configuration is read from release.toml in the repository root when ",
    "present.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Cut a release from the current checkout:\n",
    "    $ bazel run //tools/releaser -- --tag v2.1.0\n\n",
    "  Cut a release candidate outside Bazel:\n",
    "    $ release-cutter --repo-root . --tag v2.1.0-rc1\n\n",
    "  Emit the report as JSON:\n",
    "    $ release-cutter --repo-root . --tag v2.1.0 --json\n",
))]
pub struct Cli {
    /// Repository to release [default: $BUILD_WORKSPACE_DIRECTORY].
    #[arg(long, value_name = "DIR", env = WORKSPACE_ENV)]
    pub repo_root: Option<Utf8PathBuf>,

    /// Release tag, `vMAJOR.MINOR.PATCH` with an optional `-rcN` suffix.
    #[arg(long, value_name = "TAG", value_parser = ReleaseTag::parse)]
    pub tag: ReleaseTag,

    /// Allow releasing from a branch other than the release branch.
    #[arg(long)]
    pub skip_branch_check: bool,

    /// Do not check the upstream SDK mirror (testing only).
    #[arg(long)]
    pub skip_mirror_check: bool,

    /// Configuration file [default: <repo-root>/release.toml when present].
    #[arg(long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(short, long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// The repository root to release.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::MissingRepoRoot`] when neither `--repo-root`
    /// nor the workspace environment variable is set.
    pub fn repo_root(&self) -> Result<&Utf8Path> {
        self.repo_root
            .as_deref()
            .ok_or(ReleaseError::MissingRepoRoot)
    }

    /// Per-run switches derived from the flags.
    #[must_use]
    pub fn release_options(&self) -> ReleaseOptions {
        ReleaseOptions {
            tag: self.tag.clone(),
            skip_branch_check: self.skip_branch_check,
            skip_mirror_check: self.skip_mirror_check,
        }
    }

    /// Log level selected by the `-v` count.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use log::LevelFilter;
    /// use release_cutter::cli::Cli;
    ///
    /// let cli = Cli::parse_from(["release-cutter", "--repo-root", ".", "--tag", "v1.0.0", "-vv"]);
    /// assert_eq!(cli.log_level(), LevelFilter::Debug);
    /// ```
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
