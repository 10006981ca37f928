//! Release tag newtype.
//!
//! A release tag has the exact form `v<major>.<minor>.<patch>`, optionally
//! followed by `-rc<n>`. The same string names the git tag and the version
//! embedded in the published boilerplate.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Prefix separating the release-candidate number from the patch component.
const RC_SEPARATOR: &str = "-rc";

/// Error returned when a string is not a valid release tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tag \"{value}\": {reason}; tag accepts the following formats: v1.0.0 v1.0.1-rc1")]
pub struct TagFormatError {
    /// The rejected input.
    pub value: String,
    /// Which part of the format was violated.
    pub reason: &'static str,
}

/// A validated release tag such as `v1.4.0` or `v2.0.0-rc3`.
///
/// # Examples
///
/// ```
/// use release_cutter::tag::ReleaseTag;
///
/// let tag = ReleaseTag::parse("v1.4.0-rc2")?;
/// assert_eq!(tag.as_str(), "v1.4.0-rc2");
/// assert_eq!(tag.version(), "1.4.0-rc2");
/// assert!(tag.is_release_candidate());
/// # Ok::<(), release_cutter::tag::TagFormatError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReleaseTag(String);

impl ReleaseTag {
    /// Validate `input` as a release tag.
    ///
    /// # Errors
    ///
    /// Returns [`TagFormatError`] when `input` has any leading or trailing
    /// characters, lacks the `v` prefix, is missing a version component, or
    /// carries a suffix other than `-rc<digits>`.
    pub fn parse(input: &str) -> Result<Self, TagFormatError> {
        validate(input)?;
        Ok(Self(input.to_owned()))
    }

    /// Return the tag exactly as given, including the `v` prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the version without the leading `v`.
    #[must_use]
    pub fn version(&self) -> &str {
        // `validate` guarantees the prefix.
        self.0.strip_prefix('v').unwrap_or(&self.0)
    }

    /// Return true for `-rc<n>` tags.
    #[must_use]
    pub fn is_release_candidate(&self) -> bool {
        self.0.contains(RC_SEPARATOR)
    }
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ReleaseTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ReleaseTag {
    type Error = TagFormatError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl std::str::FromStr for ReleaseTag {
    type Err = TagFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for ReleaseTag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl Serialize for ReleaseTag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

fn validate(input: &str) -> Result<(), TagFormatError> {
    let reject = |reason| TagFormatError {
        value: input.to_owned(),
        reason,
    };

    if input.is_empty() {
        return Err(reject("tag is empty"));
    }
    let Some(rest) = input.strip_prefix('v') else {
        return Err(reject("tag must start with 'v'"));
    };

    let (core, candidate) = match rest.split_once(RC_SEPARATOR) {
        Some((core, number)) => (core, Some(number)),
        None => (rest, None),
    };

    let components: Vec<&str> = core.split('.').collect();
    if components.len() != 3 {
        return Err(reject("expected exactly three version components"));
    }
    if !components.iter().all(|part| is_number(part)) {
        return Err(reject("version components must be decimal numbers"));
    }
    if candidate.is_some_and(|number| !is_number(number)) {
        return Err(reject("release candidate suffix must be -rc<digits>"));
    }

    Ok(())
}

fn is_number(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("v1.0.0")]
    #[case("v99.99.99")]
    #[case("v1.0.1-rc1")]
    #[case("v1.0.99-rc99")]
    fn accepts_release_tags(#[case] input: &str) {
        let tag = ReleaseTag::parse(input).expect("tag should be accepted");
        assert_eq!(tag.as_str(), input);
    }

    #[rstest]
    #[case::empty("")]
    #[case::missing_patch("v1.0")]
    #[case::missing_prefix("1.0.0")]
    #[case::missing_prefix_rc("1.0.99-rc99")]
    #[case::trailing_text("v1.0.0 ")]
    #[case::leading_text(" v1.0.0")]
    #[case::empty_rc("v1.0.0-rc")]
    #[case::other_suffix("v1.0.0-beta1")]
    #[case::extra_component("v1.0.0.0")]
    #[case::empty_component("v1..0")]
    #[case::signed("v1.-1.0")]
    fn rejects_malformed_tags(#[case] input: &str) {
        let err = ReleaseTag::parse(input).expect_err("tag should be rejected");
        assert_eq!(err.value, input);
    }

    #[test]
    fn error_lists_accepted_formats() {
        let err = ReleaseTag::parse("1.0.0").expect_err("missing prefix");
        let msg = err.to_string();
        assert!(msg.contains("v1.0.0 v1.0.1-rc1"));
        assert!(msg.contains("must start with 'v'"));
    }

    #[rstest]
    #[case("v1.2.3", "1.2.3", false)]
    #[case("v1.2.3-rc4", "1.2.3-rc4", true)]
    fn exposes_version_and_candidate_flag(
        #[case] input: &str,
        #[case] version: &str,
        #[case] candidate: bool,
    ) {
        let tag = ReleaseTag::parse(input).expect("valid tag");
        assert_eq!(tag.version(), version);
        assert_eq!(tag.is_release_candidate(), candidate);
    }

    #[test]
    fn deserializes_only_valid_tags() {
        #[derive(Debug, serde::Deserialize)]
        struct Wrapper {
            tag: ReleaseTag,
        }

        let ok: Wrapper = toml::from_str("tag = \"v2.0.0\"").expect("valid tag");
        assert_eq!(ok.tag.as_str(), "v2.0.0");

        let err = toml::from_str::<Wrapper>("tag = \"2.0.0\"").expect_err("invalid tag");
        assert!(err.to_string().contains("must start with 'v'"));
    }
}
