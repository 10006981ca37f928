//! Output formatting for the release CLI.
//!
//! Progress goes to stderr line by line as the run advances. The final
//! report goes to stdout, either as text ending in the boilerplate to paste
//! into the release notes or as JSON for scripting.

use crate::release::ReleaseReport;
use std::fmt::Write as _;
use std::io::Write;

/// Write one line to `out`, ignoring failures.
pub fn write_line(out: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(out, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Write one progress or diagnostic line to `stderr`.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    write_line(stderr, message);
}

/// Format a report for people.
///
/// # Example
///
/// ```
/// use release_cutter::archive::digest::Sha256Digest;
/// use release_cutter::output::format_human;
/// use release_cutter::release::ReleaseReport;
/// use release_cutter::tag::ReleaseTag;
///
/// let report = ReleaseReport {
///     tag: ReleaseTag::parse("v1.0.0")?,
///     sha256: Sha256Digest::of(b"archive"),
///     artifact: None,
///     tag_created: false,
///     known_hash: true,
///     updated_documents: Vec::new(),
///     boilerplate: "http_archive(...)\n".to_owned(),
/// };
///
/// let text = format_human(&report);
/// assert!(text.contains("Release boilerplate:\n-----\nhttp_archive(...)"));
/// # Ok::<(), release_cutter::tag::TagFormatError>(())
/// ```
#[must_use]
pub fn format_human(report: &ReleaseReport) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Release {}", report.tag);
    let _ = writeln!(text, "  sha256: {}", report.sha256);
    match &report.artifact {
        Some(path) => {
            let _ = writeln!(text, "  artifact: {path}");
        }
        None => {
            let _ = writeln!(text, "  artifact: none (published hash reused)");
        }
    }
    if report.tag_created {
        let _ = writeln!(text, "  tag: created");
    }
    if report.updated_documents.is_empty() {
        let _ = writeln!(text, "  boilerplate: already current");
    } else {
        let _ = writeln!(text, "  boilerplate updated in:");
        for document in &report.updated_documents {
            let _ = writeln!(text, "    - {document}");
        }
    }
    let _ = write!(text, "\nRelease boilerplate:\n-----\n{}", report.boilerplate);
    text
}

/// Format a report as pretty-printed JSON.
#[must_use]
pub fn format_json(report: &ReleaseReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_owned())
}
