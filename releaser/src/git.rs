//! Version-control operations needed to cut a release.
//!
//! [`Repository`] is the seam the release workflow talks to. The production
//! implementation, [`GitRepository`], shells out to `git -C <root>` through
//! a [`CommandExecutor`], so every call is synchronous and bounded by the
//! executor's timeout.

use crate::command::CommandExecutor;
use crate::tag::ReleaseTag;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::process::{ExitStatus, Output};
use thiserror::Error;

/// Pins the export umask so modes in the stream do not follow host config.
const ARCHIVE_UMASK: &str = "tar.umask=0022";

/// A failed version-control command.
#[derive(Debug, Error)]
pub enum GitCommandError {
    /// The command could not be started or did not finish in time.
    #[error("git {} could not run", args.join(" "))]
    Spawn {
        /// Arguments passed to `git`, excluding the `-C <root>` prefix.
        args: Vec<String>,
        /// The underlying I/O error; `TimedOut` when the timeout expired.
        #[source]
        source: std::io::Error,
    },

    /// The command ran but exited unsuccessfully.
    #[error("git {} failed ({status}): {}", args.join(" "), stderr.trim())]
    Failed {
        /// Arguments passed to `git`, excluding the `-C <root>` prefix.
        args: Vec<String>,
        /// Exit status reported by the process.
        status: ExitStatus,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },
}

/// Result alias for repository operations.
pub type GitResult<T> = std::result::Result<T, GitCommandError>;

/// The version-control operations a release needs.
pub trait Repository {
    /// Return true when tracked files have no uncommitted changes.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the status query fails.
    fn is_clean(&self) -> GitResult<bool>;

    /// Return the name of the checked-out branch.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the branch cannot be determined.
    fn current_branch(&self) -> GitResult<String>;

    /// Return true when `tag` already exists.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the tag list cannot be read.
    fn tag_exists(&self, tag: &ReleaseTag) -> GitResult<bool>;

    /// Return the raw uncompressed tar stream of `reference`, limited to
    /// `paths` (git pathspecs).
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the archive cannot be produced.
    fn archive(&self, reference: &str, paths: &[String]) -> GitResult<Vec<u8>>;

    /// Commit every modified tracked file with `message`.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the commit fails.
    fn commit(&self, message: &str) -> GitResult<()>;

    /// Create a lightweight tag at `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the tag cannot be created.
    fn create_tag(&self, tag: &ReleaseTag) -> GitResult<()>;
}

/// [`Repository`] backed by the `git` executable.
#[derive(Debug)]
pub struct GitRepository<E> {
    root: Utf8PathBuf,
    executor: E,
}

impl<E: CommandExecutor> GitRepository<E> {
    /// Operate on the working tree at `root`.
    pub fn new(root: impl Into<Utf8PathBuf>, executor: E) -> Self {
        Self {
            root: root.into(),
            executor,
        }
    }

    /// The working tree root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn git(&self, args: &[&str]) -> GitResult<Output> {
        debug!("git {}", args.join(" "));
        let mut full = vec!["-C", self.root.as_str()];
        full.extend_from_slice(args);

        let output = self
            .executor
            .run("git", &full)
            .map_err(|source| GitCommandError::Spawn {
                args: owned(args),
                source,
            })?;

        if output.status.success() {
            Ok(output)
        } else {
            Err(GitCommandError::Failed {
                args: owned(args),
                status: output.status,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }

    fn git_stdout(&self, args: &[&str]) -> GitResult<String> {
        let output = self.git(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }
}

impl<E: CommandExecutor> Repository for GitRepository<E> {
    fn is_clean(&self) -> GitResult<bool> {
        let status = self.git_stdout(&["status", "--porcelain", "--untracked-files=no"])?;
        Ok(status.is_empty())
    }

    fn current_branch(&self) -> GitResult<String> {
        self.git_stdout(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    fn tag_exists(&self, tag: &ReleaseTag) -> GitResult<bool> {
        let listed = self.git_stdout(&["tag", "--list", tag.as_str()])?;
        Ok(listed.lines().any(|line| line.trim() == tag.as_str()))
    }

    fn archive(&self, reference: &str, paths: &[String]) -> GitResult<Vec<u8>> {
        let mut args = vec![
            "-c",
            ARCHIVE_UMASK,
            "archive",
            "--format=tar",
            reference,
            "--",
        ];
        args.extend(paths.iter().map(String::as_str));
        Ok(self.git(&args)?.stdout)
    }

    fn commit(&self, message: &str) -> GitResult<()> {
        self.git(&["commit", "--all", "--message", message])
            .map(drop)
    }

    fn create_tag(&self, tag: &ReleaseTag) -> GitResult<()> {
        self.git(&["tag", tag.as_str()]).map(drop)
    }
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| (*arg).to_owned()).collect()
}
