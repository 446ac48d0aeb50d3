//! Typed versions and version requirements

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version '{0}'")]
pub struct ParseVersionError(pub String);

/// A `major.minor.patch` version
///
/// Missing components compare as zero, but the number of components that
/// were actually written is kept so a partial version like `20` can be
/// treated as a prefix when picking a concrete release.
#[derive(Debug, Clone, Copy)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    components: u8,
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("version pattern is valid")
    })
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            components: 3,
        }
    }

    /// A bare major version such as `20`, matching any `20.x.y` by prefix
    pub fn from_major(major: u64) -> Self {
        Self {
            major,
            minor: 0,
            patch: 0,
            components: 1,
        }
    }

    /// Parse a version string such as `20`, `17.0`, `v20.11.1`
    pub fn parse(s: &str) -> Result<Self, ParseVersionError> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let parts: Vec<&str> = digits.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(ParseVersionError(s.to_string()));
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| ParseVersionError(s.to_string()))?;
        }

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            components: parts.len() as u8,
        })
    }

    /// Find the first version-looking token in free-form tool output
    ///
    /// `openjdk version "17.0.9" 2023-10-17` yields `17.0.9`.
    pub fn extract(text: &str) -> Option<Self> {
        let caps = version_pattern().captures(text)?;
        let component = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());

        let major = component(1)?;
        let minor = component(2);
        let patch = component(3);
        let components = 1 + minor.is_some() as u8 + patch.is_some() as u8;

        Some(Self {
            major,
            minor: minor.unwrap_or(0),
            patch: patch.unwrap_or(0),
            components,
        })
    }

    /// Map legacy `1.x` numbering (Java 8 and older) onto `x`
    pub fn without_legacy_prefix(self) -> Self {
        if self.major == 1 && self.components >= 2 {
            Self {
                major: self.minor,
                minor: self.patch,
                patch: 0,
                components: self.components - 1,
            }
        } else {
            self
        }
    }

    /// Whether all three components were given
    pub fn is_complete(&self) -> bool {
        self.components == 3
    }

    /// Whether `other` matches every component written in `self`
    pub fn matches_prefix(&self, other: &Version) -> bool {
        match self.components {
            1 => self.major == other.major,
            2 => self.major == other.major && self.minor == other.minor,
            _ => self == other,
        }
    }

    fn key(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.components {
            1 => write!(f, "{}", self.major),
            2 => write!(f, "{}.{}", self.major, self.minor),
            _ => write!(f, "{}.{}.{}", self.major, self.minor, self.patch),
        }
    }
}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Declared version constraint for a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VersionRequirement {
    /// Any available version; downloads pick the newest release
    Latest,
    /// At least this version
    AtLeast(Version),
}

impl VersionRequirement {
    pub fn is_satisfied_by(&self, version: &Version) -> bool {
        match self {
            VersionRequirement::Latest => true,
            VersionRequirement::AtLeast(minimum) => version >= minimum,
        }
    }
}

impl FromStr for VersionRequirement {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("latest") {
            Ok(VersionRequirement::Latest)
        } else {
            Version::parse(s).map(VersionRequirement::AtLeast)
        }
    }
}

impl TryFrom<String> for VersionRequirement {
    type Error = ParseVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionRequirement> for String {
    fn from(req: VersionRequirement) -> Self {
        req.to_string()
    }
}

impl fmt::Display for VersionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRequirement::Latest => write!(f, "latest"),
            VersionRequirement::AtLeast(v) => write!(f, "{}", v),
        }
    }
}
