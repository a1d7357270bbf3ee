use std::cmp::Ordering;

use semver::{BuildMetadata, Version};

/// Total order over version strings.
pub trait VersionComparator: Send + Sync {
    fn compare(&self, left: &str, right: &str) -> Ordering;
}

/// Semantic-version ordering that tolerates a leading `v`/`=` and partial
/// versions such as `1` or `1.2`. Build metadata is ignored.
///
/// Strings that are not versions sort below every version and are ordered
/// lexically among themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemverComparator;

impl VersionComparator for SemverComparator {
    fn compare(&self, left: &str, right: &str) -> Ordering {
        match (parse_semver(left), parse_semver(right)) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => left.cmp(right),
        }
    }
}

fn parse_semver(version: &str) -> Option<Version> {
    let version = version.trim();
    let version = version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('='))
        .unwrap_or(version);

    let mut parsed = if let Ok(parsed) = Version::parse(version) {
        parsed
    } else {
        let (core, suffix) = split_semver_core_and_suffix(version);
        let mut parts = core.split('.');
        let major = parts.next()?.parse::<u64>().ok()?;
        let minor = parts.next().and_then(|part| part.parse::<u64>().ok());
        let patch = parts.next().and_then(|part| part.parse::<u64>().ok());

        if parts.next().is_some() {
            return None;
        }

        let normalized = match (minor, patch) {
            (None, None) => format!("{major}.0.0{suffix}"),
            (Some(minor), None) => format!("{major}.{minor}.0{suffix}"),
            (Some(minor), Some(patch)) => format!("{major}.{minor}.{patch}{suffix}"),
            (None, Some(_)) => return None,
        };

        Version::parse(&normalized).ok()?
    };

    parsed.build = BuildMetadata::EMPTY;
    Some(parsed)
}

fn split_semver_core_and_suffix(version: &str) -> (&str, &str) {
    let suffix_idx = version.find(['-', '+']).unwrap_or(version.len());
    (&version[..suffix_idx], &version[suffix_idx..])
}
