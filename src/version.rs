//! Cloud SDK version: a pinned release or the floating `LATEST` marker.

use crate::{ManagedSdkError, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

pub const LATEST: &str = "LATEST";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    Latest,
    Pinned(Release),
}

/// A validated `x.y.z` release number. Only [`Version::pinned`] builds one,
/// so it is always safe to use as a path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Release(String);

impl Release {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("static version pattern"))
}

impl Version {
    /// A fixed release such as `"169.0.0"`.
    pub fn pinned(version: impl Into<String>) -> Result<Self> {
        let version = version.into();
        if !version_pattern().is_match(&version) {
            return Err(ManagedSdkError::bad_version(version));
        }
        Ok(Version::Pinned(Release(version)))
    }

    pub fn is_latest(&self) -> bool {
        matches!(self, Version::Latest)
    }

    /// The string used as the install directory segment.
    pub fn as_str(&self) -> &str {
        match self {
            Version::Latest => LATEST,
            Version::Pinned(release) => release.as_str(),
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::Latest
    }
}

impl FromStr for Version {
    type Err = ManagedSdkError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(LATEST) {
            Ok(Version::Latest)
        } else {
            Version::pinned(s)
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
