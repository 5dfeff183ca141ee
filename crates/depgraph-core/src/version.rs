//! Version parsing, comparison and range logic
//!
//! Versions follow a four segment scheme with an optional pre-release suffix:
//! `major.minor[.patch[.revision]][-suffix]`. Ranges accept exact versions,
//! caret (`^1.2.3`) and tilde (`~1.2.3`) shorthands, compound comparator
//! expressions (`>=1.0 && <2.0`) and interval notation (`[1.0,2.0)`).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};
use thiserror::Error;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\.(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:[-+](.+))?$")
        .expect("version pattern is valid")
});

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("number pattern is valid"));

/// Pre-release keywords, checked in this order.
const PRERELEASE_KEYWORDS: [&str; 6] = ["preview", "pre", "rc", "beta", "alpha", "dev"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("version string is empty")]
    Empty,

    #[error("invalid version: `{0}`")]
    InvalidVersion(String),

    #[error("unsupported version range syntax: `{0}`")]
    UnsupportedRange(String),

    #[error("cannot pick the latest version of an empty list")]
    EmptyVersionList,
}

/// An immutable version number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub revision: u64,
    pub suffix: Option<String>,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64, revision: u64) -> Self {
        Version {
            major,
            minor,
            patch,
            revision,
            suffix: None,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(VersionError::Empty);
        }

        let caps = VERSION_PATTERN
            .captures(input)
            .ok_or_else(|| VersionError::InvalidVersion(input.to_string()))?;

        let segment = |i: usize| -> Result<u64, VersionError> {
            match caps.get(i) {
                Some(m) => m
                    .as_str()
                    .parse()
                    .map_err(|_| VersionError::InvalidVersion(input.to_string())),
                None => Ok(0),
            }
        };

        Ok(Version {
            major: segment(1)?,
            minor: segment(2)?,
            patch: segment(3)?,
            revision: segment(4)?,
            suffix: caps.get(5).map(|m| m.as_str().to_string()),
        })
    }

    pub fn is_prerelease(&self) -> bool {
        self.suffix.is_some()
    }

    fn numeric(&self) -> [u64; 4] {
        [self.major, self.minor, self.patch, self.revision]
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.revision != 0 {
            write!(f, ".{}", self.revision)?;
        }
        if let Some(suffix) = &self.suffix {
            write!(f, "-{}", suffix)?;
        }
        Ok(())
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numeric()
            .cmp(&other.numeric())
            .then_with(|| match (&self.suffix, &other.suffix) {
                (None, None) => Ordering::Equal,
                // A release outranks any pre-release of the same numbers.
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => compare_suffixes(a, b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_suffixes(a: &str, b: &str) -> Ordering {
    let a_lower = a.to_ascii_lowercase();
    let b_lower = b.to_ascii_lowercase();

    for keyword in PRERELEASE_KEYWORDS {
        match (a_lower.contains(keyword), b_lower.contains(keyword)) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (true, true) => {
                return match (first_number(&a_lower), first_number(&b_lower)) {
                    (Some(x), Some(y)) if x != y => x.cmp(&y),
                    _ => a.cmp(b),
                };
            }
            (false, false) => {}
        }
    }

    a.cmp(b)
}

fn first_number(s: &str) -> Option<u64> {
    FIRST_NUMBER.find(s).and_then(|m| m.as_str().parse().ok())
}

/// An interval of acceptable versions. A missing bound is unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRange {
    pub lower: Option<Version>,
    pub upper: Option<Version>,
    pub lower_inclusive: bool,
    pub upper_inclusive: bool,
}

impl VersionRange {
    pub fn exact(version: Version) -> Self {
        VersionRange {
            lower: Some(version.clone()),
            upper: Some(version),
            lower_inclusive: true,
            upper_inclusive: true,
        }
    }

    /// `[lower, upper)`
    pub fn half_open(lower: Version, upper: Version) -> Self {
        VersionRange {
            lower: Some(lower),
            upper: Some(upper),
            lower_inclusive: true,
            upper_inclusive: false,
        }
    }

    pub fn any() -> Self {
        VersionRange {
            lower: None,
            upper: None,
            lower_inclusive: false,
            upper_inclusive: false,
        }
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(VersionError::Empty);
        }

        if let Some(rest) = input.strip_prefix('^') {
            let base = Version::parse(rest)?;
            let major = base
                .major
                .checked_add(1)
                .ok_or_else(|| VersionError::UnsupportedRange(input.to_string()))?;
            let upper = Version::new(major, 0, 0, 0);
            return Ok(VersionRange::half_open(base, upper));
        }

        if let Some(rest) = input.strip_prefix('~') {
            let base = Version::parse(rest)?;
            let minor = base
                .minor
                .checked_add(1)
                .ok_or_else(|| VersionError::UnsupportedRange(input.to_string()))?;
            let upper = Version::new(base.major, minor, 0, 0);
            return Ok(VersionRange::half_open(base, upper));
        }

        if input.starts_with('[') || input.starts_with('(') {
            return parse_interval(input);
        }

        if input.starts_with(['<', '>', '=']) {
            return parse_comparators(input);
        }

        if is_unsupported_syntax(input) {
            return Err(VersionError::UnsupportedRange(input.to_string()));
        }

        Version::parse(input).map(VersionRange::exact)
    }

    pub fn contains(&self, version: &Version) -> bool {
        let above_lower = match &self.lower {
            Some(lower) if self.lower_inclusive => version >= lower,
            Some(lower) => version > lower,
            None => true,
        };
        let below_upper = match &self.upper {
            Some(upper) if self.upper_inclusive => version <= upper,
            Some(upper) => version < upper,
            None => true,
        };
        above_lower && below_upper
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.lower_inclusive { '[' } else { '(' };
        let close = if self.upper_inclusive { ']' } else { ')' };
        let lower = self.lower.as_ref().map(ToString::to_string).unwrap_or_default();
        let upper = self.upper.as_ref().map(ToString::to_string).unwrap_or_default();
        write!(f, "{}{}, {}{}", open, lower, upper, close)
    }
}

/// Range forms this grammar does not cover: unions, negation, wildcards and
/// space-separated comparator lists.
fn is_unsupported_syntax(input: &str) -> bool {
    if input.contains("||")
        || input.contains(['!', '*'])
        || input.contains(char::is_whitespace)
    {
        return true;
    }
    let numeric = input.split(['-', '+']).next().unwrap_or(input);
    numeric.split('.').any(|segment| segment.eq_ignore_ascii_case("x"))
}

/// `>=1.0 && <2.0`, `>1.0 && <=2.0`, `==1.0`, single-sided comparators.
fn parse_comparators(input: &str) -> Result<VersionRange, VersionError> {
    let mut range = VersionRange::any();

    for clause in input.split("&&").map(str::trim) {
        let (op, rest) = split_operator(clause)
            .ok_or_else(|| VersionError::UnsupportedRange(input.to_string()))?;
        let version = Version::parse(rest)?;

        match op {
            ">=" => {
                range.lower = Some(version);
                range.lower_inclusive = true;
            }
            ">" => {
                range.lower = Some(version);
                range.lower_inclusive = false;
            }
            "<=" => {
                range.upper = Some(version);
                range.upper_inclusive = true;
            }
            "<" => {
                range.upper = Some(version);
                range.upper_inclusive = false;
            }
            "==" | "=" => {
                range.lower = Some(version.clone());
                range.upper = Some(version);
                range.lower_inclusive = true;
                range.upper_inclusive = true;
            }
            _ => return Err(VersionError::UnsupportedRange(input.to_string())),
        }
    }

    Ok(range)
}

fn split_operator(clause: &str) -> Option<(&str, &str)> {
    [">=", "<=", "==", ">", "<", "="]
        .into_iter()
        .find_map(|op| clause.strip_prefix(op).map(|rest| (op, rest.trim())))
}

/// `[1.0,2.0)`, `(,2.0]`, `[1.0,)`, `[1.0]`
fn parse_interval(input: &str) -> Result<VersionRange, VersionError> {
    let unsupported = || VersionError::UnsupportedRange(input.to_string());

    let lower_inclusive = input.starts_with('[');
    let upper_inclusive = match input.chars().last() {
        Some(']') => true,
        Some(')') => false,
        _ => return Err(unsupported()),
    };
    let body = &input[1..input.len() - 1];

    let Some((low, high)) = body.split_once(',') else {
        // `[1.0]` pins a single version.
        if !(lower_inclusive && upper_inclusive) {
            return Err(unsupported());
        }
        return Version::parse(body).map(VersionRange::exact);
    };

    let bound = |s: &str| -> Result<Option<Version>, VersionError> {
        let s = s.trim();
        if s.is_empty() {
            Ok(None)
        } else {
            Version::parse(s).map(Some)
        }
    };

    let lower = bound(low)?;
    let upper = bound(high)?;
    if lower.is_none() && upper.is_none() {
        return Err(unsupported());
    }

    Ok(VersionRange {
        lower_inclusive: lower_inclusive && lower.is_some(),
        upper_inclusive: upper_inclusive && upper.is_some(),
        lower,
        upper,
    })
}

/// Parse a version string.
pub fn parse_version(input: &str) -> Result<Version, VersionError> {
    Version::parse(input)
}

/// Parse a version range expression.
pub fn parse_range(input: &str) -> Result<VersionRange, VersionError> {
    VersionRange::parse(input)
}

/// Grammar check only; never fails.
pub fn is_valid_version(input: &str) -> bool {
    VERSION_PATTERN.is_match(input.trim())
}

pub fn compare_versions(a: &str, b: &str) -> Result<Ordering, VersionError> {
    Ok(Version::parse(a)?.cmp(&Version::parse(b)?))
}

pub fn is_version_in_range(version: &str, range: &str) -> Result<bool, VersionError> {
    let version = Version::parse(version)?;
    let range = VersionRange::parse(range)?;
    Ok(range.contains(&version))
}

/// Greatest version of the list, returned in its original spelling.
pub fn latest_version<S: AsRef<str>>(versions: &[S]) -> Result<String, VersionError> {
    let mut best: Option<(Version, &str)> = None;

    for raw in versions {
        let raw = raw.as_ref();
        let parsed = Version::parse(raw)?;
        match &best {
            Some((current, _)) if parsed <= *current => {}
            _ => best = Some((parsed, raw)),
        }
    }

    best.map(|(_, raw)| raw.to_string())
        .ok_or(VersionError::EmptyVersionList)
}
