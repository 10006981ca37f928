//! Marker-delimited span replacement.
//!
//! A span starts at the start marker and ends just before the first end
//! marker after it. The rendered replacement begins with the start marker
//! itself, so applying the same text twice is a no-op.
//!
//! Blocks require each marker exactly once. Declarations use a short end
//! delimiter, such as a closing quote, that legitimately recurs later in the
//! document, so only their start marker must be unique.

use serde::Deserialize;
use thiserror::Error;

/// The literal start and end markers bounding a rewritable span.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkerPair {
    /// Text opening the span. Replacement text must start with it.
    pub start: String,
    /// Text closing the span. It and everything after it are preserved.
    pub end: String,
}

impl MarkerPair {
    /// Build a marker pair.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// Which marker could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerRole {
    /// The start marker.
    Start,
    /// The end marker.
    End,
}

impl std::fmt::Display for MarkerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::End => "end",
        })
    }
}

/// Why a span could not be located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpanFault {
    /// The marker does not occur where required.
    #[error("{0} marker not found")]
    Missing(MarkerRole),
    /// The marker occurs more than once.
    #[error("{0} marker occurs more than once")]
    Repeated(MarkerRole),
}

/// Replace the marked block in `text` with `rendered`.
///
/// # Errors
///
/// Returns [`SpanFault::Missing`] if the start marker is absent or no end
/// marker follows it, and [`SpanFault::Repeated`] if either marker occurs
/// twice.
///
/// # Examples
///
/// ```
/// use release_cutter::boilerplate::markers::{MarkerPair, replace_span};
///
/// let markers = MarkerPair::new("<!-- begin -->", "<!-- end -->");
/// let text = "intro\n<!-- begin -->\nold\n<!-- end -->\noutro\n";
/// let updated = replace_span(text, &markers, "<!-- begin -->\nnew\n")?;
/// assert_eq!(updated, "intro\n<!-- begin -->\nnew\n<!-- end -->\noutro\n");
/// # Ok::<(), release_cutter::boilerplate::markers::SpanFault>(())
/// ```
pub fn replace_span(text: &str, markers: &MarkerPair, rendered: &str) -> Result<String, SpanFault> {
    let (start, end) = locate(text, markers)?;
    if text[end + markers.end.len()..].contains(&markers.end) {
        return Err(SpanFault::Repeated(MarkerRole::End));
    }
    Ok(splice(text, start, end, rendered))
}

/// Replace the marked span of a single declaration in `text`.
///
/// The end delimiter is the first occurrence after the start marker; later
/// occurrences belong to other declarations and are left alone.
///
/// # Errors
///
/// Returns [`SpanFault::Missing`] if either marker is absent and
/// [`SpanFault::Repeated`] if the start marker occurs twice.
///
/// # Examples
///
/// ```
/// use release_cutter::boilerplate::markers::{MarkerPair, replace_declaration};
///
/// let markers = MarkerPair::new(r#"bazel_dep(name = "demo", version = ""#, r#"""#);
/// let text = r#"bazel_dep(name = "demo", version = "1.0.0", dev_dependency = True)"#;
/// let updated = replace_declaration(text, &markers, r#"bazel_dep(name = "demo", version = "2.0.0"#)?;
/// assert_eq!(updated, r#"bazel_dep(name = "demo", version = "2.0.0", dev_dependency = True)"#);
/// # Ok::<(), release_cutter::boilerplate::markers::SpanFault>(())
/// ```
pub fn replace_declaration(
    text: &str,
    markers: &MarkerPair,
    rendered: &str,
) -> Result<String, SpanFault> {
    let (start, end) = locate(text, markers)?;
    Ok(splice(text, start, end, rendered))
}

/// Byte offsets of the start marker and of the end marker following it.
fn locate(text: &str, markers: &MarkerPair) -> Result<(usize, usize), SpanFault> {
    let start = text
        .find(&markers.start)
        .ok_or(SpanFault::Missing(MarkerRole::Start))?;
    let after_start = start + markers.start.len();
    if text[after_start..].contains(&markers.start) {
        return Err(SpanFault::Repeated(MarkerRole::Start));
    }
    let end = text[after_start..]
        .find(&markers.end)
        .map(|offset| after_start + offset)
        .ok_or(SpanFault::Missing(MarkerRole::End))?;
    Ok((start, end))
}

fn splice(text: &str, start: usize, end: usize, rendered: &str) -> String {
    let mut updated = String::with_capacity(text.len() - (end - start) + rendered.len());
    updated.push_str(&text[..start]);
    updated.push_str(rendered);
    updated.push_str(&text[end..]);
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn block() -> MarkerPair {
        MarkerPair::new("# --- begin ---", "# --- end ---")
    }

    const DOCUMENT: &str = "\
preamble stays
# --- begin ---
stale line
# --- end ---
epilogue stays
";

    #[rstest]
    fn replaces_only_the_span(block: MarkerPair) {
        let updated = replace_span(DOCUMENT, &block, "# --- begin ---\nfresh line\n")
            .expect("markers present");
        assert_eq!(
            updated,
            "preamble stays\n# --- begin ---\nfresh line\n# --- end ---\nepilogue stays\n"
        );
    }

    #[rstest]
    fn applying_twice_is_idempotent(block: MarkerPair) {
        let rendered = "# --- begin ---\nfresh line\n";
        let once = replace_span(DOCUMENT, &block, rendered).expect("first");
        let twice = replace_span(&once, &block, rendered).expect("second");
        assert_eq!(once, twice);
    }

    #[rstest]
    #[case::no_start("text\n# --- end ---\n", SpanFault::Missing(MarkerRole::Start))]
    #[case::no_end("# --- begin ---\ntext\n", SpanFault::Missing(MarkerRole::End))]
    #[case::end_before_start(
        "# --- end ---\n# --- begin ---\n",
        SpanFault::Missing(MarkerRole::End)
    )]
    #[case::repeated_start(
        "# --- begin ---\n# --- begin ---\n# --- end ---\n",
        SpanFault::Repeated(MarkerRole::Start)
    )]
    #[case::repeated_end(
        "# --- begin ---\nx\n# --- end ---\n# --- end ---\n",
        SpanFault::Repeated(MarkerRole::End)
    )]
    fn faults(block: MarkerPair, #[case] text: &str, #[case] expected: SpanFault) {
        assert_eq!(replace_span(text, &block, "# --- begin ---\n"), Err(expected));
    }

    #[fixture]
    fn declaration() -> MarkerPair {
        MarkerPair::new("bazel_dep(name = \"hermetic_cc_toolchain\", version = \"", "\"")
    }

    #[rstest]
    fn declaration_keeps_other_attributes(declaration: MarkerPair) {
        let text = "module(name = \"demo\")\n\
                    bazel_dep(name = \"hermetic_cc_toolchain\", version = \"2.0.0\", dev_dependency = True)\n\
                    bazel_dep(name = \"rules_go\", version = \"0.39.0\")\n";
        let updated = replace_declaration(
            text,
            &declaration,
            "bazel_dep(name = \"hermetic_cc_toolchain\", version = \"3.0.0",
        )
        .expect("markers present");
        assert_eq!(
            updated,
            "module(name = \"demo\")\n\
             bazel_dep(name = \"hermetic_cc_toolchain\", version = \"3.0.0\", dev_dependency = True)\n\
             bazel_dep(name = \"rules_go\", version = \"0.39.0\")\n"
        );
    }

    #[rstest]
    fn declaration_rejects_a_second_declaration(declaration: MarkerPair) {
        let text = "bazel_dep(name = \"hermetic_cc_toolchain\", version = \"1.0.0\")\n\
                    bazel_dep(name = \"hermetic_cc_toolchain\", version = \"2.0.0\")\n";
        assert_eq!(
            replace_declaration(text, &declaration, "x"),
            Err(SpanFault::Repeated(MarkerRole::Start))
        );
    }
}
