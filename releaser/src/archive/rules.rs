//! Rename and removal rules applied to archive entries.
//!
//! Removal wins over inclusion, and a rename only ever sees paths that
//! survived removal. Paths are compared in their normalized form: no leading
//! `./`, no trailing `/`.

use std::collections::{BTreeMap, BTreeSet};

/// What to do with one source entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryDecision {
    /// Drop the entry; it never reaches the output.
    Remove,
    /// Emit the entry under the given name.
    Emit(String),
}

/// The rename/removal rule set for one release.
///
/// # Examples
///
/// ```
/// use release_cutter::archive::rules::{ArchiveRules, EntryDecision};
///
/// let rules = ArchiveRules::new(
///     [("BUILD.release.bazel", "BUILD.bazel")],
///     ["toolchain/testing"],
/// );
/// assert_eq!(
///     rules.decide("BUILD.release.bazel"),
///     EntryDecision::Emit("BUILD.bazel".to_owned())
/// );
/// assert_eq!(rules.decide("toolchain/testing/a.sh"), EntryDecision::Remove);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveRules {
    renames: BTreeMap<String, String>,
    removals: BTreeSet<String>,
}

impl ArchiveRules {
    /// Build a rule set from `(source, destination)` renames and removals.
    pub fn new<R, S, D, X>(renames: R, removals: X) -> Self
    where
        R: IntoIterator<Item = (S, D)>,
        S: AsRef<str>,
        D: Into<String>,
        X: IntoIterator,
        X::Item: AsRef<str>,
    {
        Self {
            renames: renames
                .into_iter()
                .map(|(from, to)| (normalize(from.as_ref()).to_owned(), to.into()))
                .collect(),
            removals: removals
                .into_iter()
                .map(|path| normalize(path.as_ref()).to_owned())
                .collect(),
        }
    }

    /// Decide the fate of the entry at `path`.
    #[must_use]
    pub fn decide(&self, path: &str) -> EntryDecision {
        let normalized = normalize(path);
        if self.is_removed(normalized) {
            return EntryDecision::Remove;
        }
        match self.renames.get(normalized) {
            Some(destination) => EntryDecision::Emit(destination.clone()),
            None => EntryDecision::Emit(path.to_owned()),
        }
    }

    /// Return true when `path` is removed directly or through a removed
    /// ancestor directory.
    fn is_removed(&self, path: &str) -> bool {
        self.removals.iter().any(|removed| {
            path == removed
                || path
                    .strip_prefix(removed.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

fn normalize(path: &str) -> &str {
    let trimmed = path.strip_prefix("./").unwrap_or(path);
    trimmed.trim_end_matches('/')
}
