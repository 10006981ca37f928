//! Rendering of the release boilerplate.
//!
//! Two pieces are produced for every release: the `http_archive` block that
//! WORKSPACE users paste into their repository, and the `bazel_dep`
//! declaration used by bzlmod manifests.

use super::markers::MarkerPair;
use crate::archive::digest::Sha256Digest;
use crate::tag::ReleaseTag;
use std::fmt::Write as _;

/// Rendered boilerplate for one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boilerplate {
    /// The `http_archive` snippet, without markers.
    pub snippet: String,
    /// Replacement text for block documents; starts with the block start
    /// marker and ends with a newline.
    pub block: String,
    /// Replacement text for the manifest declaration; starts with the
    /// manifest start marker and stops before the closing parenthesis.
    pub manifest: String,
}

/// Inputs that stay fixed across releases of one project.
#[derive(Debug, Clone, Copy)]
pub struct BoilerplateTemplate<'a> {
    project: &'a str,
    url_templates: &'a [String],
    block_markers: &'a MarkerPair,
}

impl<'a> BoilerplateTemplate<'a> {
    /// Create a template for `project`.
    ///
    /// `url_templates` may contain `{project}`, `{tag}` and `{version}`
    /// placeholders.
    #[must_use]
    pub fn new(project: &'a str, url_templates: &'a [String], block_markers: &'a MarkerPair) -> Self {
        Self {
            project,
            url_templates,
            block_markers,
        }
    }

    /// The marker pair scoping the version value of the manifest's
    /// `bazel_dep` declaration. Attributes after the version are untouched.
    #[must_use]
    pub fn manifest_markers(&self) -> MarkerPair {
        MarkerPair::new(
            format!("bazel_dep(name = \"{}\", version = \"", self.project),
            "\"",
        )
    }

    /// The marker pair bounding block documents.
    #[must_use]
    pub fn block_markers(&self) -> &MarkerPair {
        self.block_markers
    }

    /// Expand a download URL template for `tag`.
    #[must_use]
    pub fn url(&self, template: &str, tag: &ReleaseTag) -> String {
        template
            .replace("{project}", self.project)
            .replace("{tag}", tag.as_str())
            .replace("{version}", tag.version())
    }

    /// Render the boilerplate for `tag` whose archive hashes to `sha256`.
    ///
    /// # Examples
    ///
    /// ```
    /// use release_cutter::archive::digest::Sha256Digest;
    /// use release_cutter::boilerplate::markers::MarkerPair;
    /// use release_cutter::boilerplate::template::BoilerplateTemplate;
    /// use release_cutter::tag::ReleaseTag;
    ///
    /// let urls = vec!["https://example.org/{project}/{tag}.tar.gz".to_owned()];
    /// let markers = MarkerPair::new("# begin", "# end");
    /// let template = BoilerplateTemplate::new("demo", &urls, &markers);
    /// let rendered = template.render(&ReleaseTag::parse("v1.2.0")?, &Sha256Digest::of(b""));
    ///
    /// assert!(rendered.block.starts_with("# begin\n"));
    /// assert!(rendered.snippet.contains("https://example.org/demo/v1.2.0.tar.gz"));
    /// assert_eq!(rendered.manifest, r#"bazel_dep(name = "demo", version = "1.2.0"#);
    /// # Ok::<(), release_cutter::tag::TagFormatError>(())
    /// ```
    #[must_use]
    pub fn render(&self, tag: &ReleaseTag, sha256: &Sha256Digest) -> Boilerplate {
        let snippet = self.snippet(tag, sha256);
        let block = format!("{}\n{snippet}\n", self.block_markers.start);
        let manifest = format!("{}{}", self.manifest_markers().start, tag.version());
        Boilerplate {
            snippet,
            block,
            manifest,
        }
    }

    fn snippet(&self, tag: &ReleaseTag, sha256: &Sha256Digest) -> String {
        let project = self.project;
        let mut urls = String::new();
        for template in self.url_templates {
            let _ = writeln!(urls, "        \"{}\",", self.url(template, tag));
        }

        format!(
            r#"load("@bazel_tools//tools/build_defs/repo:http.bzl", "http_archive")

http_archive(
    name = "{project}",
    sha256 = "{sha256}",
    urls = [
{urls}    ],
)

load("@{project}//toolchain:defs.bzl", zig_toolchains = "toolchains")

# Argument-free will pick reasonable defaults.
zig_toolchains()

# version, url_formats and host_platform_sha256 can be set for those who
# wish to control their Zig SDK version and where it is downloaded from
zig_toolchains(
    version = "<...>",
    url_formats = [
        "https://example.org/zig/zig-{{host_platform}}-{{version}}.{{_ext}}",
    ],
    host_platform_sha256 = {{ ... }},
)"#
        )
    }
}
