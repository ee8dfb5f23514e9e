//! Detector firmware release versions.
//!
//! Filewriter firmware reports its release as a dotted, date-like string
//! such as `release-2022.1.2`. Comparison is numeric per component, and
//! trailing zero components are insignificant (`2022.1` == `2022.1.0`).
//!
//! A release may carry pre-, post- and development-release suffixes
//! (`2022.1.2rc1`, `2020.2.5.post1`, `2021.1.0-dev`). They order the way
//! Python package versions do:
//! `1.0.dev0 < 1.0a1 < 1.0b1 < 1.0rc1 < 1.0 < 1.0.post1`.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Pre-release phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreRelease {
    Alpha,
    Beta,
    Candidate,
}

impl PreRelease {
    fn label(self) -> &'static str {
        match self {
            Self::Alpha => "a",
            Self::Beta => "b",
            Self::Candidate => "rc",
        }
    }
}

// Longer spellings first so that `alpha` is not read as `a` + `lpha`.
const PRE_LABELS: [(&str, PreRelease); 8] = [
    ("alpha", PreRelease::Alpha),
    ("a", PreRelease::Alpha),
    ("beta", PreRelease::Beta),
    ("b", PreRelease::Beta),
    ("preview", PreRelease::Candidate),
    ("pre", PreRelease::Candidate),
    ("rc", PreRelease::Candidate),
    ("c", PreRelease::Candidate),
];

const POST_LABELS: [&str; 3] = ["post", "rev", "r"];

/// Ordering rank of the pre-release part. A bare `.devN` sorts below every
/// pre-release of the same release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PreRank {
    DevOnly,
    Pre(PreRelease, u64),
    Final,
}

/// A parsed firmware release version.
#[derive(Clone, Debug)]
pub struct FirmwareVersion {
    components: Vec<u64>,
    pre: Option<(PreRelease, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
}

impl FirmwareVersion {
    /// Builds a final release from its numeric components.
    #[must_use]
    pub fn new(components: &[u64]) -> Self {
        Self {
            components: components.to_vec(),
            pre: None,
            post: None,
            dev: None,
        }
    }

    /// Parses a version string after removing `prefix` if present.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFirmwareVersion`] if the remainder is not a
    /// dotted sequence of decimal integers with optional pre/post/dev
    /// suffixes.
    pub fn parse_with_prefix(raw: &str, prefix: &str) -> Result<Self> {
        let trimmed = raw.trim();
        trimmed
            .strip_prefix(prefix)
            .unwrap_or(trimmed)
            .parse()
            .map_err(|_| Error::InvalidFirmwareVersion {
                value: raw.to_string(),
            })
    }

    /// Release components, most significant first.
    #[must_use]
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// Pre-release phase and number, if any.
    #[must_use]
    pub fn pre(&self) -> Option<(PreRelease, u64)> {
        self.pre
    }

    /// Post-release number, if any.
    #[must_use]
    pub fn post(&self) -> Option<u64> {
        self.post
    }

    /// Development-release number, if any.
    #[must_use]
    pub fn dev(&self) -> Option<u64> {
        self.dev
    }

    fn significant(&self) -> &[u64] {
        let len = self
            .components
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |pos| pos + 1);
        &self.components[..len]
    }

    fn pre_rank(&self) -> PreRank {
        match (self.pre, self.post, self.dev) {
            (Some((phase, n)), _, _) => PreRank::Pre(phase, n),
            (None, None, Some(_)) => PreRank::DevOnly,
            _ => PreRank::Final,
        }
    }

    // No dev suffix sorts above any dev suffix.
    fn dev_rank(&self) -> (bool, u64) {
        (self.dev.is_none(), self.dev.unwrap_or(0))
    }
}

fn take_number(s: &str) -> Option<(u64, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    s[..end].parse().ok().map(|n| (n, &s[end..]))
}

fn strip_separator(s: &str) -> &str {
    s.strip_prefix(&['.', '-', '_'][..]).unwrap_or(s)
}

/// Matches `[sep]label[sep][N]` at the start of `s`. The number defaults
/// to 0 when omitted.
fn take_labelled<'a>(s: &'a str, label: &str) -> Option<(u64, &'a str)> {
    let after = strip_separator(s).strip_prefix(label)?;
    Some(take_number(strip_separator(after)).unwrap_or((0, after)))
}

impl FromStr for FirmwareVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidFirmwareVersion {
            value: s.to_string(),
        };
        let lower = s.trim().to_ascii_lowercase();
        let mut rest = lower.strip_prefix('v').unwrap_or(&lower);

        let mut components = Vec::new();
        loop {
            let (n, tail) = take_number(rest).ok_or_else(invalid)?;
            components.push(n);
            rest = tail;
            match rest.strip_prefix('.') {
                Some(next) if next.starts_with(|c: char| c.is_ascii_digit()) => rest = next,
                _ => break,
            }
        }

        let mut pre = None;
        for (label, phase) in PRE_LABELS {
            if let Some((n, tail)) = take_labelled(rest, label) {
                pre = Some((phase, n));
                rest = tail;
                break;
            }
        }

        let mut post = None;
        // Implicit form: `1.0-1`.
        if let Some((n, tail)) = rest.strip_prefix('-').and_then(take_number) {
            post = Some(n);
            rest = tail;
        } else {
            for label in POST_LABELS {
                if let Some((n, tail)) = take_labelled(rest, label) {
                    post = Some(n);
                    rest = tail;
                    break;
                }
            }
        }

        let mut dev = None;
        if let Some((n, tail)) = take_labelled(rest, "dev") {
            dev = Some(n);
            rest = tail;
        }

        if !rest.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            components,
            pre,
            post,
            dev,
        })
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{component}")?;
        }
        if let Some((phase, n)) = self.pre {
            write!(f, "{}{n}", phase.label())?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{n}")?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{n}")?;
        }
        Ok(())
    }
}

impl PartialEq for FirmwareVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FirmwareVersion {}

impl PartialOrd for FirmwareVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FirmwareVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Slice ordering is lexicographic, which matches zero padding once
        // trailing zeros are dropped.
        self.significant()
            .cmp(other.significant())
            .then_with(|| self.pre_rank().cmp(&other.pre_rank()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_rank().cmp(&other.dev_rank()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(raw: &str) -> FirmwareVersion {
        raw.parse().unwrap()
    }

    #[test]
    fn test_parse_plain() {
        let version = v("2022.1.2");
        assert_eq!(version.components(), &[2022, 1, 2]);
        assert_eq!(version.pre(), None);
        assert_eq!(version.to_string(), "2022.1.2");
    }

    #[test]
    fn test_parse_strips_release_prefix() {
        let version = FirmwareVersion::parse_with_prefix("release-2020.2.5", "release-").unwrap();
        assert_eq!(version, FirmwareVersion::new(&[2020, 2, 5]));
    }

    #[test]
    fn test_parse_without_prefix_present() {
        let version = FirmwareVersion::parse_with_prefix("2023.1.0", "release-").unwrap();
        assert_eq!(version, FirmwareVersion::new(&[2023, 1]));
    }

    #[test]
    fn test_parse_suffixes() {
        let rc = FirmwareVersion::parse_with_prefix("release-2022.1.2rc1", "release-").unwrap();
        assert_eq!(rc.components(), &[2022, 1, 2]);
        assert_eq!(rc.pre(), Some((PreRelease::Candidate, 1)));

        let post =
            FirmwareVersion::parse_with_prefix("release-2020.2.5.post1", "release-").unwrap();
        assert_eq!(post.components(), &[2020, 2, 5]);
        assert_eq!(post.post(), Some(1));

        let dev = FirmwareVersion::parse_with_prefix("release-2021.1.0-dev", "release-").unwrap();
        assert_eq!(dev.components(), &[2021, 1, 0]);
        assert_eq!(dev.dev(), Some(0));

        assert_eq!(v("2022.1.2-rc.1"), rc);
        assert_eq!(v("2022.1.2-1").post(), Some(1));
        assert_eq!(v("1.0a").pre(), Some((PreRelease::Alpha, 0)));
        assert_eq!(v("1.0beta2").pre(), Some((PreRelease::Beta, 2)));
        assert_eq!(v("1.0RC1").to_string(), "1.0rc1");
        assert_eq!(v("1.0b1.post2.dev3").to_string(), "1.0b1.post2.dev3");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in [
            "",
            "release-",
            "release-abc",
            "2022..1",
            "2022.1.x",
            "2022.1.2.",
            "2022.1.2rc1rc2",
            "2022.1.2+local",
        ] {
            let err = FirmwareVersion::parse_with_prefix(raw, "release-").unwrap_err();
            assert!(matches!(err, Error::InvalidFirmwareVersion { .. }), "{raw}");
        }
    }

    #[test]
    fn test_ordering() {
        let threshold = FirmwareVersion::new(&[2022, 1, 2]);

        assert!(v("2022.1.1") < threshold);
        assert!(v("2020.2.5") < threshold);
        assert!(v("2022.1.10") > threshold);
        assert_eq!(v("2022.1.2.0"), threshold);
        assert_eq!(v("2022.1.2.0").cmp(&threshold), Ordering::Equal);
        assert!(FirmwareVersion::new(&[2022, 1]) < threshold);
    }

    #[test]
    fn test_suffix_ordering() {
        let ordered = [
            "1.0.dev0",
            "1.0a1.dev1",
            "1.0a1",
            "1.0b1",
            "1.0rc1",
            "1.0rc2",
            "1.0",
            "1.0.post1.dev0",
            "1.0.post1",
            "1.0.1",
        ];
        for pair in ordered.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }

        let threshold = FirmwareVersion::new(&[2022, 1, 2]);
        assert!(v("2022.1.2rc1") < threshold);
        assert!(v("2022.1.2.post1") > threshold);
        assert!(v("2022.1.2.dev0") < threshold);
    }
}
