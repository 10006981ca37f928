//! Synchronization of release boilerplate embedded in repository files.
//!
//! Each configured document holds one marked span. All documents are
//! rewritten in memory first; files are only written once every document
//! has located its markers, so a missing marker never leaves the set half
//! updated.

pub mod markers;
pub mod template;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use markers::{MarkerPair, MarkerRole, SpanFault, replace_declaration, replace_span};
use serde::Deserialize;
use template::{Boilerplate, BoilerplateTemplate};
use thiserror::Error;

/// How a document's span is delimited and what replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    /// A multi-line block between the block markers.
    Block,
    /// A single `bazel_dep` declaration for the project.
    Manifest,
}

/// One file that carries release boilerplate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoilerplateDocument {
    /// Path relative to the repository root.
    pub path: Utf8PathBuf,
    /// Which marker pair and rendered text apply.
    pub kind: DocumentKind,
}

impl BoilerplateDocument {
    /// Describe a document at `path`.
    pub fn new(path: impl Into<Utf8PathBuf>, kind: DocumentKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Errors raised while synchronizing documents.
#[derive(Debug, Error)]
pub enum MarkerError {
    /// A required marker is absent from a document.
    #[error("{role} marker {marker:?} not found in {document}")]
    NotFound {
        /// Document path.
        document: Utf8PathBuf,
        /// Which marker is missing.
        role: MarkerRole,
        /// The literal marker text.
        marker: String,
    },

    /// A marker occurs more than once.
    #[error("{role} marker {marker:?} occurs more than once in {document}")]
    Ambiguous {
        /// Document path.
        document: Utf8PathBuf,
        /// Which marker repeats.
        role: MarkerRole,
        /// The literal marker text.
        marker: String,
    },

    /// A document could not be read or written.
    #[error("failed to access {document}")]
    Io {
        /// Document path.
        document: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Rewrite every document under `root` with `rendered`.
///
/// Returns the paths whose content changed.
///
/// # Errors
///
/// Returns [`MarkerError`] if any document cannot be read or lacks its
/// markers, in which case no file is modified, or if writing fails.
pub fn synchronize(
    root: &Utf8Path,
    documents: &[BoilerplateDocument],
    template: &BoilerplateTemplate<'_>,
    rendered: &Boilerplate,
) -> Result<Vec<Utf8PathBuf>, MarkerError> {
    let manifest_markers = template.manifest_markers();
    let mut staged = Vec::with_capacity(documents.len());

    for document in documents {
        let (markers, replacement) = match document.kind {
            DocumentKind::Block => (template.block_markers(), rendered.block.as_str()),
            DocumentKind::Manifest => (&manifest_markers, rendered.manifest.as_str()),
        };
        let path = root.join(&document.path);
        let current = std::fs::read_to_string(&path).map_err(|source| MarkerError::Io {
            document: document.path.clone(),
            source,
        })?;
        let replaced = match document.kind {
            DocumentKind::Block => replace_span(&current, markers, replacement),
            DocumentKind::Manifest => replace_declaration(&current, markers, replacement),
        };
        let updated = replaced.map_err(|fault| marker_error(&document.path, markers, fault))?;

        if updated == current {
            debug!("{} already up to date", document.path);
        } else {
            staged.push((document.path.clone(), path, updated));
        }
    }

    let mut changed = Vec::with_capacity(staged.len());
    for (relative, path, contents) in staged {
        std::fs::write(&path, contents).map_err(|source| MarkerError::Io {
            document: relative.clone(),
            source,
        })?;
        info!("updated boilerplate in {relative}");
        changed.push(relative);
    }
    Ok(changed)
}

fn marker_error(document: &Utf8Path, markers: &MarkerPair, fault: SpanFault) -> MarkerError {
    let marker = |role| match role {
        MarkerRole::Start => markers.start.clone(),
        MarkerRole::End => markers.end.clone(),
    };
    match fault {
        SpanFault::Missing(role) => MarkerError::NotFound {
            document: document.to_owned(),
            role,
            marker: marker(role),
        },
        SpanFault::Repeated(role) => MarkerError::Ambiguous {
            document: document.to_owned(),
            role,
            marker: marker(role),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::digest::Sha256Digest;
    use crate::tag::ReleaseTag;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    const README: &str = "\
# Usage

```starlark
# --- begin release boilerplate ---
old boilerplate
# --- end release boilerplate ---
```
";

    const MODULE: &str = "\
bazel_dep(name = \"hermetic_cc_toolchain\", version = \"1.0.0\")
";

    struct Workspace {
        _dir: TempDir,
        root: Utf8PathBuf,
        urls: Vec<String>,
        markers: MarkerPair,
    }

    impl Workspace {
        fn write(&self, path: &str, contents: &str) {
            let full = self.root.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).expect("mkdir");
            }
            std::fs::write(full, contents).expect("write");
        }

        fn read(&self, path: &str) -> String {
            std::fs::read_to_string(self.root.join(path)).expect("read")
        }

        fn template(&self) -> BoilerplateTemplate<'_> {
            BoilerplateTemplate::new("hermetic_cc_toolchain", &self.urls, &self.markers)
        }
    }

    #[fixture]
    fn workspace() -> Workspace {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8");
        let workspace = Workspace {
            _dir: dir,
            root,
            urls: vec!["https://example.org/{project}-{tag}.tar.gz".to_owned()],
            markers: MarkerPair::new(
                "# --- begin release boilerplate ---",
                "# --- end release boilerplate ---",
            ),
        };
        workspace.write("README.md", README);
        workspace.write("examples/bzlmod/MODULE.bazel", MODULE);
        workspace
    }

    fn documents() -> Vec<BoilerplateDocument> {
        vec![
            BoilerplateDocument::new("README.md", DocumentKind::Block),
            BoilerplateDocument::new("examples/bzlmod/MODULE.bazel", DocumentKind::Manifest),
        ]
    }

    fn rendered(template: &BoilerplateTemplate<'_>) -> Boilerplate {
        template.render(
            &ReleaseTag::parse("v2.0.0").expect("tag"),
            &Sha256Digest::of(b"archive"),
        )
    }

    #[rstest]
    fn rewrites_block_and_manifest(workspace: Workspace) {
        let template = workspace.template();
        let boilerplate = rendered(&template);
        let changed =
            synchronize(&workspace.root, &documents(), &template, &boilerplate).expect("sync");

        assert_eq!(changed.len(), 2);
        let readme = workspace.read("README.md");
        assert!(readme.starts_with("# Usage\n\n```starlark\n# --- begin release boilerplate ---\n"));
        assert!(readme.ends_with("# --- end release boilerplate ---\n```\n"));
        assert!(readme.contains(&boilerplate.snippet));
        assert!(!readme.contains("old boilerplate"));
        assert_eq!(
            workspace.read("examples/bzlmod/MODULE.bazel"),
            "bazel_dep(name = \"hermetic_cc_toolchain\", version = \"2.0.0\")\n"
        );
    }

    #[rstest]
    fn second_run_changes_nothing(workspace: Workspace) {
        let template = workspace.template();
        let boilerplate = rendered(&template);
        synchronize(&workspace.root, &documents(), &template, &boilerplate).expect("first");
        let readme = workspace.read("README.md");

        let changed =
            synchronize(&workspace.root, &documents(), &template, &boilerplate).expect("second");
        assert!(changed.is_empty());
        assert_eq!(workspace.read("README.md"), readme);
    }

    #[rstest]
    fn missing_marker_leaves_every_document_untouched(workspace: Workspace) {
        workspace.write("examples/bzlmod/MODULE.bazel", "module(name = \"demo\")\n");
        let template = workspace.template();
        let err = synchronize(&workspace.root, &documents(), &template, &rendered(&template))
            .expect_err("manifest lacks marker");

        assert!(matches!(
            err,
            MarkerError::NotFound { ref document, role: MarkerRole::Start, .. }
                if document == "examples/bzlmod/MODULE.bazel"
        ));
        assert_eq!(workspace.read("README.md"), README);
    }

    #[rstest]
    fn missing_end_marker_is_named(workspace: Workspace) {
        workspace.write("README.md", "# --- begin release boilerplate ---\nno end\n");
        let template = workspace.template();
        let err = synchronize(&workspace.root, &documents(), &template, &rendered(&template))
            .expect_err("readme lacks end marker");
        assert_eq!(
            err.to_string(),
            "end marker \"# --- end release boilerplate ---\" not found in README.md"
        );
    }

    #[rstest]
    fn repeated_start_marker_is_rejected(workspace: Workspace) {
        workspace.write(
            "README.md",
            "# --- begin release boilerplate ---\n# --- begin release boilerplate ---\n# --- end release boilerplate ---\n",
        );
        let template = workspace.template();
        let err = synchronize(&workspace.root, &documents(), &template, &rendered(&template))
            .expect_err("ambiguous");
        assert!(matches!(
            err,
            MarkerError::Ambiguous { role: MarkerRole::Start, .. }
        ));
    }

    #[rstest]
    fn repeated_end_marker_is_rejected(workspace: Workspace) {
        let duplicated = README.replace(
            "# --- end release boilerplate ---\n",
            "# --- end release boilerplate ---\nkept\n# --- end release boilerplate ---\n",
        );
        workspace.write("README.md", &duplicated);
        let template = workspace.template();
        let err = synchronize(&workspace.root, &documents(), &template, &rendered(&template))
            .expect_err("ambiguous");
        assert_eq!(
            err.to_string(),
            "end marker \"# --- end release boilerplate ---\" occurs more than once in README.md"
        );
        assert_eq!(workspace.read("README.md"), duplicated);
    }

    #[rstest]
    fn manifest_keeps_other_dependency_attributes(workspace: Workspace) {
        workspace.write(
            "examples/bzlmod/MODULE.bazel",
            "bazel_dep(name = \"hermetic_cc_toolchain\", version = \"1.0.0\", dev_dependency = True)\n\
             bazel_dep(name = \"platforms\", version = \"0.0.10\")\n",
        );
        let template = workspace.template();
        synchronize(&workspace.root, &documents(), &template, &rendered(&template)).expect("sync");
        assert_eq!(
            workspace.read("examples/bzlmod/MODULE.bazel"),
            "bazel_dep(name = \"hermetic_cc_toolchain\", version = \"2.0.0\", dev_dependency = True)\n\
             bazel_dep(name = \"platforms\", version = \"0.0.10\")\n"
        );
    }

    #[rstest]
    fn absent_document_is_an_io_error(workspace: Workspace) {
        let template = workspace.template();
        let documents = vec![BoilerplateDocument::new("NOPE.md", DocumentKind::Block)];
        let err = synchronize(&workspace.root, &documents, &template, &rendered(&template))
            .expect_err("missing file");
        assert!(matches!(err, MarkerError::Io { .. }));
    }
}
