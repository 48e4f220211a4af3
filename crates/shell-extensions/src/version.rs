//! Dotted numeric version parsing and comparison.
//!
//! Extension versions are sequences of unsigned integers separated by dots,
//! with any number of segments. Missing trailing segments count as zero, so
//! `1.2` and `1.2.0.0` compare equal. Segments have no size limit. Anything
//! else (empty segments, signs, pre-release tags) is rejected as
//! [`Error::MalformedVersion`].
//!
//! # Examples
//!
//! ```
//! use std::cmp::Ordering;
//! use shell_extensions::version::{compare, Version};
//!
//! assert_eq!(compare("2.0", "1.5").unwrap(), Ordering::Greater);
//! assert_eq!(compare("1.0", "1").unwrap(), Ordering::Equal);
//! assert!(Version::parse("1.x").is_err());
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{Error, Result};

/// One numeric segment, kept as its digits without leading zeros.
///
/// Ordered by digit count first, then digit by digit, which is numeric
/// order for arbitrarily long numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Segment(String);

impl Segment {
    fn is_zero(&self) -> bool {
        self.0 == "0"
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

/// A parsed dotted numeric version.
///
/// Equality, hashing and ordering ignore trailing zero segments.
#[derive(Debug, Clone)]
pub struct Version {
    segments: Vec<Segment>,
    /// The original version string for display.
    raw: String,
}

impl Version {
    /// Parse a version string such as `1`, `1.5` or `2.0.13.4`.
    pub fn parse(version: &str) -> Result<Self> {
        let trimmed = version.trim();
        if trimmed.is_empty() {
            return Err(malformed(version, "empty version"));
        }

        let segments = trimmed
            .split('.')
            .enumerate()
            .map(|(index, segment)| parse_segment(version, index, segment))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            segments,
            raw: trimmed.to_string(),
        })
    }

    /// All parsed segments, including trailing zeros, without leading
    /// zeros.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.0.as_str())
    }

    /// Return the original version string (trimmed).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Segments with trailing zeros removed.
    fn significant(&self) -> &[Segment] {
        let end = self
            .segments
            .iter()
            .rposition(|s| !s.is_zero())
            .map_or(0, |i| i + 1);
        &self.segments[..end]
    }
}

fn parse_segment(version: &str, index: usize, segment: &str) -> Result<Segment> {
    if segment.is_empty() {
        return Err(malformed(version, format!("segment {} is empty", index + 1)));
    }
    if !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(
            version,
            format!("segment '{segment}' is not numeric"),
        ));
    }
    let digits = segment.trim_start_matches('0');
    Ok(Segment(if digits.is_empty() {
        "0".to_string()
    } else {
        digits.to_string()
    }))
}

fn malformed(version: &str, reason: impl Into<String>) -> Error {
    Error::MalformedVersion {
        version: version.to_string(),
        reason: reason.into(),
    }
}

/// Compare two version strings.
///
/// Fails with [`Error::MalformedVersion`] if either side does not parse.
pub fn compare(a: &str, b: &str) -> Result<Ordering> {
    Ok(Version::parse(a)?.cmp(&Version::parse(b)?))
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Once trailing zeros are gone, a strict prefix is always the smaller
        // version, which is exactly slice ordering.
        self.significant().cmp(other.significant())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
