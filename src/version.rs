use std::fmt;

use chrono::{Datelike, NaiveDate};
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Version used as the starting point when a repository has no semver tags yet.
pub const BASELINE: Version = Version::new(0, 0, 0);

/// Longest tag name accepted as a version candidate.
const MAX_TAG_LENGTH: usize = 256;

/// Largest numeric component accepted in a tag (2^53 - 1).
const MAX_COMPONENT: u64 = 9_007_199_254_740_991;

/// Which component a run bumps.
///
/// Only the exact string `major` selects a breaking bump; every other value
/// (`minor`, `patch`, empty, anything) behaves the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Level {
    Major,
    Other(String),
}

impl Level {
    pub fn is_major(&self) -> bool {
        matches!(self, Self::Major)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Major => "major",
            Self::Other(raw) => raw,
        }
    }
}

impl From<&str> for Level {
    fn from(raw: &str) -> Self {
        if raw == "major" {
            Self::Major
        } else {
            Self::Other(raw.to_string())
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The version computed for this run.
///
/// `minor` is a UTC date stamp (`YYYYMMDD`), not a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl DerivedVersion {
    /// Dot form, e.g. `v1.20240307.0`. Used as the tag name.
    pub fn tag_name(&self) -> String {
        format!("v{}.{}.{}", self.major, self.minor, self.patch)
    }

    /// Hyphenated form, e.g. `v1-20240307-0`, for contexts that reject dots.
    pub fn dns_name(&self) -> String {
        format!("v{}-{}-{}", self.major, self.minor, self.patch)
    }

    pub fn to_semver(&self) -> Version {
        Version::new(self.major, self.minor, self.patch)
    }
}

impl fmt::Display for DerivedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag_name())
    }
}

/// Parse a tag name as a strict semantic version.
///
/// Surrounding whitespace and a single leading `v` are tolerated. Pre-release
/// and build suffixes are accepted so such tags still take part in ordering.
pub fn parse_tag(tag: &str) -> Option<Version> {
    let trimmed = tag.trim();
    if trimmed.len() > MAX_TAG_LENGTH {
        return None;
    }

    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let version = Version::parse(bare).ok()?;

    if [version.major, version.minor, version.patch]
        .iter()
        .any(|&n| n > MAX_COMPONENT)
    {
        return None;
    }

    Some(version)
}

/// Keep only the tags that parse as semantic versions.
pub fn valid_semver_tags<S: AsRef<str>>(tags: &[S]) -> Vec<Version> {
    tags.iter()
        .filter_map(|tag| {
            let tag = tag.as_ref();
            let parsed = parse_tag(tag);
            if parsed.is_none() {
                debug!(tag = %tag, "ignoring non-semver tag");
            }
            parsed
        })
        .collect()
}

/// Render an existing version the way tags are written, e.g. `v2.20240307.3`.
pub fn tag_label(version: &Version) -> String {
    format!("v{version}")
}

/// Highest version among `candidates`, or [`BASELINE`] when there are none.
pub fn current_version(mut candidates: Vec<Version>) -> Version {
    candidates.sort();
    candidates.pop().unwrap_or(BASELINE)
}

/// Encode a date as the integer `YYYYMMDD`.
pub fn date_minor(date: NaiveDate) -> Result<u64> {
    let year = u64::try_from(date.year()).map_err(|_| {
        Error::Config(format!("date {date} is before year 0 and cannot be a version"))
    })?;

    Ok(year * 10_000 + u64::from(date.month()) * 100 + u64::from(date.day()))
}

/// Compute the next version from the current one.
///
/// The minor component is always today's date stamp. Patch continues from the
/// current version only for a non-major run on a day that already has a release;
/// otherwise it starts at zero.
pub fn derive_next(current: &Version, level: &Level, today: NaiveDate) -> Result<DerivedVersion> {
    let minor = date_minor(today)?;

    let major = if level.is_major() {
        current
            .major
            .checked_add(1)
            .ok_or_else(|| Error::Parse(format!("major component of {current} overflows")))?
    } else {
        current.major
    };

    let patch = if !level.is_major() && current.minor == minor {
        current
            .patch
            .checked_add(1)
            .ok_or_else(|| Error::Parse(format!("patch component of {current} overflows")))?
    } else {
        0
    };

    Ok(DerivedVersion {
        major,
        minor,
        patch,
    })
}
