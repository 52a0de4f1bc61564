//! Version specifier parsing and range arithmetic
//!
//! Supports the specifiers accepted when resolving a piece version:
//! - `1.2.3` - exact version
//! - `^1.2.3` - caret range (>=1.2.3 <2.0.0)
//! - `~1.2.3` - tilde range (>=1.2.3 <1.3.0)
//! - absent - no constraint, the newest visible version wins

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

use crate::piece::error::RegistryError;

/// Pattern of a fully pinned `major.minor.patch` version
pub static EXACT_VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").expect("exact version pattern is valid")
});

/// Returns true if the specifier pins a single `major.minor.patch` version
pub fn is_exact_version(spec: &str) -> bool {
    EXACT_VERSION_PATTERN.is_match(spec)
}

/// Version component to increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Increment {
    Major,
    Minor,
    Patch,
}

/// Parse a version string, tolerating a leading `v` or `=`
pub fn parse_version(version: &str) -> Option<Version> {
    let trimmed = version.trim();
    let stripped = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('='))
        .unwrap_or(trimmed);
    Version::parse(stripped).ok()
}

/// Increment one component of a version, resetting the lower ones.
///
/// A prerelease of the target version increments to that version itself,
/// e.g. `2.0.0-beta.1` bumps to `2.0.0` for a major increment.
pub fn increment(version: &str, part: Increment) -> Result<Version, RegistryError> {
    let failed = || {
        RegistryError::Internal(format!(
            "Failed to increase {} version {}",
            part.as_str(),
            version
        ))
    };
    let current = parse_version(version).ok_or_else(failed)?;
    let bump = |component: u64| component.checked_add(1).ok_or_else(failed);

    let is_pre = !current.pre.is_empty();
    let next = match part {
        Increment::Major if is_pre && current.minor == 0 && current.patch == 0 => {
            Version::new(current.major, 0, 0)
        }
        Increment::Major => Version::new(bump(current.major)?, 0, 0),
        Increment::Minor if is_pre && current.patch == 0 => {
            Version::new(current.major, current.minor, 0)
        }
        Increment::Minor => Version::new(current.major, bump(current.minor)?, 0),
        Increment::Patch if is_pre => Version::new(current.major, current.minor, current.patch),
        Increment::Patch => Version::new(current.major, current.minor, bump(current.patch)?),
    };

    Ok(next)
}

impl Increment {
    fn as_str(&self) -> &'static str {
        match self {
            Increment::Major => "major",
            Increment::Minor => "minor",
            Increment::Patch => "patch",
        }
    }
}

/// A parsed version specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRange {
    /// Bare version: matches that version only
    Exact(Version),
    /// `^x.y.z`: >= base, < next major
    Caret {
        base: Version,
        next_excluded: Version,
    },
    /// `~x.y.z`: >= base, < next minor
    Tilde {
        base: Version,
        next_excluded: Version,
    },
}

impl VersionRange {
    /// Parse an optional specifier. `None` means no constraint.
    ///
    /// Fails with an internal error when the base version cannot be parsed,
    /// since specifiers are expected to be well-formed by the time they get here.
    pub fn parse(spec: Option<&str>) -> Result<Option<Self>, RegistryError> {
        let Some(spec) = spec else {
            return Ok(None);
        };

        let range = if let Some(base) = spec.strip_prefix('^') {
            VersionRange::Caret {
                next_excluded: increment(base, Increment::Major)?,
                base: Self::parse_base(base)?,
            }
        } else if let Some(base) = spec.strip_prefix('~') {
            VersionRange::Tilde {
                next_excluded: increment(base, Increment::Minor)?,
                base: Self::parse_base(base)?,
            }
        } else {
            // Validate the same way the range forms do
            increment(spec, Increment::Patch)?;
            VersionRange::Exact(Self::parse_base(spec)?)
        };

        Ok(Some(range))
    }

    fn parse_base(base: &str) -> Result<Version, RegistryError> {
        parse_version(base)
            .ok_or_else(|| RegistryError::Internal(format!("Invalid version specifier {}", base)))
    }

    /// Lower bound of the range (inclusive)
    pub fn base_version(&self) -> &Version {
        match self {
            VersionRange::Exact(base)
            | VersionRange::Caret { base, .. }
            | VersionRange::Tilde { base, .. } => base,
        }
    }

    /// Upper bound of the half-open interval `[base, next_excluded)`.
    ///
    /// For an exact specifier this is one patch above the version, although
    /// [`VersionRange::contains`] only accepts the version itself.
    pub fn next_excluded_version(&self) -> Result<Version, RegistryError> {
        match self {
            VersionRange::Exact(base) => increment(&base.to_string(), Increment::Patch),
            VersionRange::Caret { next_excluded, .. }
            | VersionRange::Tilde { next_excluded, .. } => Ok(next_excluded.clone()),
        }
    }

    /// Check if a version satisfies this range.
    ///
    /// Comparisons use semver precedence, so build metadata is ignored.
    pub fn contains(&self, version: &Version) -> bool {
        match self {
            VersionRange::Exact(base) => version.cmp_precedence(base) == Ordering::Equal,
            VersionRange::Caret {
                base,
                next_excluded,
            }
            | VersionRange::Tilde {
                base,
                next_excluded,
            } => {
                version.cmp_precedence(base) != Ordering::Less
                    && version.cmp_precedence(next_excluded) == Ordering::Less
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn v(version: &str) -> Version {
        Version::parse(version).unwrap()
    }

    #[rstest]
    #[case("1.2.3", true)]
    #[case("0.0.0", true)]
    #[case("10.20.30", true)]
    #[case("^1.2.3", false)]
    #[case("~1.2.3", false)]
    #[case("1.2", false)]
    #[case("1.2.3-beta.1", false)]
    #[case("v1.2.3", false)]
    fn is_exact_version_returns_expected(#[case] spec: &str, #[case] expected: bool) {
        assert_eq!(is_exact_version(spec), expected);
    }

    #[rstest]
    #[case("1.2.3", Increment::Major, "2.0.0")]
    #[case("1.2.3", Increment::Minor, "1.3.0")]
    #[case("1.2.3", Increment::Patch, "1.2.4")]
    #[case("0.0.9", Increment::Major, "1.0.0")]
    #[case("2.0.0-beta.1", Increment::Major, "2.0.0")]
    #[case("1.2.0-rc.1", Increment::Minor, "1.2.0")]
    #[case("1.2.3-rc.1", Increment::Patch, "1.2.3")]
    #[case("1.2.3-rc.1", Increment::Major, "2.0.0")]
    #[case("v1.2.3", Increment::Patch, "1.2.4")]
    fn increment_returns_expected(
        #[case] version: &str,
        #[case] part: Increment,
        #[case] expected: &str,
    ) {
        assert_eq!(increment(version, part).unwrap(), v(expected));
    }

    #[rstest]
    #[case("not-a-version")]
    #[case("1.2")]
    #[case("")]
    fn increment_rejects_unparsable_version(#[case] version: &str) {
        let result = increment(version, Increment::Patch);
        assert!(matches!(result, Err(RegistryError::Internal(_))));
    }

    #[test]
    fn parse_returns_none_for_absent_specifier() {
        assert_eq!(VersionRange::parse(None).unwrap(), None);
    }

    #[rstest]
    #[case("^1.2.3", "1.2.3", "2.0.0")]
    #[case("~1.2.3", "1.2.3", "1.3.0")]
    #[case("1.2.3", "1.2.3", "1.2.4")]
    #[case("^0.1.0", "0.1.0", "1.0.0")]
    fn parse_computes_half_open_bounds(
        #[case] spec: &str,
        #[case] base: &str,
        #[case] next_excluded: &str,
    ) {
        let range = VersionRange::parse(Some(spec)).unwrap().unwrap();
        assert_eq!(range.base_version(), &v(base));
        assert_eq!(range.next_excluded_version().unwrap(), v(next_excluded));
    }

    #[rstest]
    #[case("18446744073709551615.0.0", Increment::Major)]
    #[case("1.18446744073709551615.0", Increment::Minor)]
    #[case("1.2.18446744073709551615", Increment::Patch)]
    fn increment_rejects_component_overflow(#[case] version: &str, #[case] part: Increment) {
        let result = increment(version, part);
        assert!(matches!(result, Err(RegistryError::Internal(_))));
    }

    #[rstest]
    #[case("^18446744073709551615.0.0")]
    #[case("~1.18446744073709551615.0")]
    #[case("1.2.18446744073709551615")]
    fn parse_rejects_unbounded_specifier_as_internal(#[case] spec: &str) {
        let result = VersionRange::parse(Some(spec));
        assert!(matches!(result, Err(RegistryError::Internal(_))));
    }

    #[test]
    fn next_excluded_version_of_unbounded_exact_fails() {
        let range = VersionRange::Exact(Version::new(1, 2, u64::MAX));
        assert!(matches!(
            range.next_excluded_version(),
            Err(RegistryError::Internal(_))
        ));
    }

    #[rstest]
    #[case("^bogus")]
    #[case("~1.x")]
    #[case("latest")]
    fn parse_rejects_malformed_specifier_as_internal(#[case] spec: &str) {
        let result = VersionRange::parse(Some(spec));
        assert!(matches!(result, Err(RegistryError::Internal(_))));
    }

    #[rstest]
    #[case("^1.2.3", "1.2.3", true)]
    #[case("^1.2.3", "1.9.9", true)]
    #[case("^1.2.3", "2.0.0", false)]
    #[case("^1.2.3", "1.2.2", false)]
    #[case("~1.2.3", "1.2.3", true)]
    #[case("~1.2.3", "1.2.9", true)]
    #[case("~1.2.3", "1.3.0", false)]
    #[case("~1.2.3", "1.2.2", false)]
    #[case("1.2.3", "1.2.3", true)]
    #[case("1.2.3", "1.2.4", false)]
    #[case("1.2.3", "1.2.3-rc.1", false)]
    #[case("1.2.3", "1.2.3+build.5", true)]
    #[case("1.2.3+build.1", "1.2.3", true)]
    #[case("^1.2.3", "1.2.3+build.5", true)]
    #[case("~1.2.3", "1.3.0+build.5", false)]
    fn contains_returns_expected(#[case] spec: &str, #[case] version: &str, #[case] expected: bool) {
        let range = VersionRange::parse(Some(spec)).unwrap().unwrap();
        assert_eq!(range.contains(&v(version)), expected);
    }
}
