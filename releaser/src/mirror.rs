//! Availability probe for upstream SDK mirrors.
//!
//! Before a release is cut the pinned SDK must already be downloadable from
//! the mirror named in the toolchain, otherwise consumers of the release
//! would fail on first fetch.

use log::debug;
use std::time::Duration;

/// Default timeout for a mirror probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors arising from a mirror probe.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The mirror answered that the file does not exist (HTTP 404).
    #[error("not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The request failed for any other reason.
    #[error("request to {url} failed: {reason}")]
    Http {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },
}

/// Checks whether a URL can be fetched.
///
/// # Examples
///
/// ```no_run
/// use release_cutter::mirror::{HttpProbe, MirrorProbe};
///
/// let probe = HttpProbe::default();
/// probe.probe("https://mirror.bazel.build/ziglang.org/builds/zig-linux-x86_64-0.11.0.tar.xz")?;
/// # Ok::<(), release_cutter::mirror::ProbeError>(())
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait MirrorProbe {
    /// Succeed when `url` exists.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::NotFound`] for a 404 and [`ProbeError::Http`]
    /// for any other failure, including timeouts.
    fn probe(&self, url: &str) -> Result<(), ProbeError>;
}

/// [`MirrorProbe`] issuing an HTTP `HEAD` request through `ureq`.
pub struct HttpProbe {
    agent: ureq::Agent,
}

impl HttpProbe {
    /// Create a probe whose requests give up after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_PROBE_TIMEOUT)
    }
}

impl MirrorProbe for HttpProbe {
    fn probe(&self, url: &str) -> Result<(), ProbeError> {
        debug!("HEAD {url}");
        self.agent
            .head(url)
            .call()
            .map(drop)
            .map_err(|err| map_ureq_error(url, &err))
    }
}

/// Map a ureq error to a [`ProbeError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> ProbeError {
    match err {
        ureq::Error::StatusCode(404) => ProbeError::NotFound {
            url: url.to_owned(),
        },
        other => ProbeError::Http {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
