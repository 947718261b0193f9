//! Supported document format versions.

use crate::error::VersionError;

/// Oldest format version this crate supports.
pub const MIN_SUPPORTED_VERSION: &str = "0.1.0";
/// Newest format version this crate is tested against.
pub const MAX_TESTED_VERSION: &str = "0.1.0";

/// Returns the minimum and maximum supported format versions.
pub fn supported_range() -> (&'static str, &'static str) {
    (MIN_SUPPORTED_VERSION, MAX_TESTED_VERSION)
}

/// Reports whether `version` falls within the supported range.
pub fn is_supported_version(version: &str) -> Result<bool, VersionError> {
    let parsed = parse_semver(version)?;
    let min = parse_semver(MIN_SUPPORTED_VERSION)?;
    let max = parse_semver(MAX_TESTED_VERSION)?;
    Ok(parsed >= min && parsed <= max)
}

// Three numeric fields, compared field by field. The format's version
// strings carry no prerelease or build tags, so a full semver grammar is
// not needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Semver {
    major: u64,
    minor: u64,
    patch: u64,
}

fn parse_semver(version: &str) -> Result<Semver, VersionError> {
    let invalid = || VersionError {
        version: version.to_string(),
    };

    let mut parts = version.trim().split('.');
    let (Some(major), Some(minor), Some(patch), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    Ok(Semver {
        major: major.parse().map_err(|_| invalid())?,
        minor: minor.parse().map_err(|_| invalid())?,
        patch: patch.parse().map_err(|_| invalid())?,
    })
}
