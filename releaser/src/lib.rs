//! Release cutter library.
//!
//! This crate provides the core functionality for cutting reproducible
//! hermetic_cc_toolchain releases: deterministic archive construction,
//! boilerplate synchronization, upstream SDK pin parsing and the release
//! workflow that ties them together. It is used by the `release-cutter`
//! binary and can be driven programmatically for testing.
//!
//! # Modules
//!
//! - [`archive`] - Deterministic `.tar.gz` construction and hashing
//! - [`boilerplate`] - Marker-bounded boilerplate rendering and document updates
//! - [`cli`] - Command-line argument definitions
//! - [`command`] - External command execution with timeouts
//! - [`config`] - Release configuration loaded from `release.toml`
//! - [`error`] - Release error taxonomy
//! - [`git`] - Version-control operations behind the `Repository` trait
//! - [`mirror`] - Upstream SDK mirror availability probe
//! - [`output`] - Progress and report formatting
//! - [`release`] - The end-to-end release workflow
//! - [`tag`] - Release tag validation
//! - [`upstream`] - Starlark parsing of the pinned SDK version

pub mod archive;
pub mod boilerplate;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod git;
pub mod mirror;
pub mod output;
pub mod release;
pub mod tag;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod upstream;
