//! Extraction of the pinned upstream SDK version from a Starlark file.
//!
//! The toolchain pins its Zig SDK through two top-level string assignments:
//! the version and a download URL template. Both must be plain string
//! literals so the release tool can read them without evaluating Starlark.

pub mod lexer;
pub mod parser;

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use parser::{Expr, Statement};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while reading the upstream pin.
#[derive(Debug, Error)]
pub enum UpstreamParseError {
    /// A recognized assignment never occurs.
    #[error("assign statement {name} = <...> not found")]
    Missing {
        /// The variable name that was expected.
        name: String,
    },

    /// A recognized name is bound to something other than a string literal.
    #[error("{name} on line {line}: got a non-string expression ({found})")]
    NotAString {
        /// The variable name.
        name: String,
        /// 1-based source line.
        line: usize,
        /// Shape of what was found instead.
        found: &'static str,
    },

    /// A recognized name is assigned twice.
    #[error("{name} is assigned again on line {line}")]
    Reassigned {
        /// The variable name.
        name: String,
        /// 1-based line of the second assignment.
        line: usize,
    },

    /// The file is not well-formed.
    #[error("syntax error on line {line}: {message}")]
    Syntax {
        /// 1-based source line.
        line: usize,
        /// Parser diagnostic.
        message: String,
    },

    /// The file could not be read.
    #[error("failed to read {path}")]
    Io {
        /// Path of the file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Variable names that carry the upstream pin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamNames {
    /// Variable holding the pinned version.
    pub version: String,
    /// Variable holding the download URL template.
    pub url_template: String,
}

impl Default for UpstreamNames {
    fn default() -> Self {
        Self {
            version: "_VERSION".to_owned(),
            url_template: "URL_FORMAT_BAZELMIRROR".to_owned(),
        }
    }
}

/// The pinned upstream SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamSpec {
    /// Pinned version string.
    pub version: String,
    /// URL template with `{host_platform}`, `{version}` and `{_ext}`
    /// placeholders.
    pub url_template: String,
}

impl UpstreamSpec {
    /// Expand the URL template for one platform and archive extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use release_cutter::upstream::UpstreamSpec;
    ///
    /// let spec = UpstreamSpec {
    ///     version: "0.11.0".to_owned(),
    ///     url_template: "https://example.org/zig-{host_platform}-{version}.{_ext}".to_owned(),
    /// };
    /// assert_eq!(
    ///     spec.download_url("linux-x86_64", "tar.xz"),
    ///     "https://example.org/zig-linux-x86_64-0.11.0.tar.xz"
    /// );
    /// ```
    #[must_use]
    pub fn download_url(&self, host_platform: &str, extension: &str) -> String {
        self.url_template
            .replace("{host_platform}", host_platform)
            .replace("{version}", &self.version)
            .replace("{_ext}", extension)
    }
}

/// Read the upstream pin from the file at `path`.
///
/// # Errors
///
/// Returns [`UpstreamParseError::Io`] if the file cannot be read, or any
/// error [`parse_upstream`] reports.
pub fn read_upstream(path: &Utf8Path, names: &UpstreamNames) -> Result<UpstreamSpec, UpstreamParseError> {
    let source = std::fs::read_to_string(path).map_err(|source| UpstreamParseError::Io {
        path: path.to_owned(),
        source,
    })?;
    parse_upstream(&source, names)
}

/// Extract the upstream pin from Starlark `source`.
///
/// # Errors
///
/// Returns [`UpstreamParseError`] if the source is malformed, a recognized
/// name is bound to a non-string or assigned twice, or either name is
/// missing.
///
/// # Examples
///
/// ```
/// use release_cutter::upstream::{UpstreamNames, parse_upstream};
///
/// let names = UpstreamNames {
///     version: "_VERSION".to_owned(),
///     url_template: "URL_FORMAT".to_owned(),
/// };
/// let spec = parse_upstream(r#"_VERSION = "0.11.0"; URL_FORMAT = "https://x""#, &names)?;
/// assert_eq!(spec.version, "0.11.0");
/// assert_eq!(spec.url_template, "https://x");
/// # Ok::<(), release_cutter::upstream::UpstreamParseError>(())
/// ```
pub fn parse_upstream(source: &str, names: &UpstreamNames) -> Result<UpstreamSpec, UpstreamParseError> {
    let statements = parser::parse(source).map_err(|err| UpstreamParseError::Syntax {
        line: err.line,
        message: err.message,
    })?;

    let mut version = None;
    let mut url_template = None;
    for statement in statements {
        let (name, line, value) = match statement {
            Statement::Assign {
                target,
                value,
                line,
            } => (target, line, value),
            Statement::Def { name, line } => (name, line, Expr::Other("function definition")),
            Statement::Load | Statement::Expr | Statement::Compound => continue,
        };

        let slot = if name == names.version {
            &mut version
        } else if name == names.url_template {
            &mut url_template
        } else {
            continue;
        };

        let text = match value {
            Expr::Str(text) => text,
            Expr::Other(found) => {
                return Err(UpstreamParseError::NotAString { name, line, found });
            }
        };
        if slot.is_some() {
            return Err(UpstreamParseError::Reassigned { name, line });
        }
        debug!("{name} = {text:?} (line {line})");
        *slot = Some(text);
    }

    Ok(UpstreamSpec {
        version: version.ok_or_else(|| missing(&names.version))?,
        url_template: url_template.ok_or_else(|| missing(&names.url_template))?,
    })
}

fn missing(name: &str) -> UpstreamParseError {
    UpstreamParseError::Missing {
        name: name.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn names() -> UpstreamNames {
        UpstreamNames {
            version: "_VERSION".to_owned(),
            url_template: "URL_FORMAT".to_owned(),
        }
    }

    #[rstest]
    fn reads_both_fields(names: UpstreamNames) {
        let spec = parse_upstream(
            r#"_VERSION = "0.11.0"; URL_FORMAT = "https://ziglang.org/builds/zig-{host_platform}-{version}.{_ext}""#,
            &names,
        )
        .expect("parses");
        assert_eq!(spec.version, "0.11.0");
        assert_eq!(
            spec.download_url("macos-aarch64", "tar.xz"),
            "https://ziglang.org/builds/zig-macos-aarch64-0.11.0.tar.xz"
        );
    }

    #[rstest]
    #[case::no_version(r#"URL_FORMAT = "https://x""#, "_VERSION")]
    #[case::no_url(r#"_VERSION = "0.11.0""#, "URL_FORMAT")]
    #[case::unrelated("x1 = 1", "_VERSION")]
    #[case::empty("", "_VERSION")]
    fn missing_fields_are_named(names: UpstreamNames, #[case] source: &str, #[case] field: &str) {
        let err = parse_upstream(source, &names).expect_err("missing field");
        assert!(matches!(err, UpstreamParseError::Missing { ref name } if name == field));
        assert_eq!(err.to_string(), format!("assign statement {field} = <...> not found"));
    }

    #[rstest]
    #[case::function("def _VERSION(x): return x", "function definition")]
    #[case::number("_VERSION = 11", "number")]
    #[case::call("_VERSION = version()", "call")]
    #[case::concatenation(r#"_VERSION = "0." + "11""#, "expression")]
    fn non_strings_are_type_errors(
        names: UpstreamNames,
        #[case] source: &str,
        #[case] expected: &str,
    ) {
        let err = parse_upstream(source, &names).expect_err("type error");
        assert!(matches!(
            err,
            UpstreamParseError::NotAString { ref name, found, line: 1 }
                if name == "_VERSION" && found == expected
        ));
        assert!(err.to_string().contains("got a non-string expression"));
    }

    #[rstest]
    fn reassignment_is_rejected(names: UpstreamNames) {
        let err = parse_upstream("_VERSION = \"1\"\n_VERSION = \"2\"\n", &names)
            .expect_err("reassigned");
        assert!(matches!(err, UpstreamParseError::Reassigned { line: 2, .. }));
    }

    #[rstest]
    fn syntax_errors_carry_the_line(names: UpstreamNames) {
        let err = parse_upstream("_VERSION = \"1\"\nURL_FORMAT = (\n", &names)
            .expect_err("unclosed");
        assert!(matches!(err, UpstreamParseError::Syntax { line: 2, .. }));
    }

    #[test]
    fn default_names_match_the_toolchain_file() {
        let spec = parse_upstream(
            "_VERSION = \"0.12.0\"\n\nURL_FORMAT_BAZELMIRROR = \"https://mirror.bazel.build/ziglang.org/builds/zig-{host_platform}-{version}.{_ext}\"\n",
            &UpstreamNames::default(),
        )
        .expect("parses");
        assert_eq!(spec.version, "0.12.0");
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("zig_sdk.bzl")).expect("utf-8");
        std::fs::write(&path, "_VERSION = \"0.11.0\"\nURL_FORMAT = \"u\"\n").expect("write");
        let spec = read_upstream(&path, &names()).expect("parses");
        assert_eq!(spec.url_template, "u");

        let err = read_upstream(&path.with_file_name("absent.bzl"), &names()).expect_err("io");
        assert!(matches!(err, UpstreamParseError::Io { .. }));
    }
}
