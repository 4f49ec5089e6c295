//! Next-version resolution from a bump kind.

use crate::error::{ReleaseError, Result};
use semver::{BuildMetadata, Prerelease, Version};
use std::fmt;
use std::str::FromStr;

/// Token used for prerelease bumps (`1.2.3` -> `1.2.3-beta.1`).
pub const PRERELEASE_TOKEN: &str = "beta";

/// Version bump kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpKind {
    Patch,
    Minor,
    Major,
    Prerelease,
}

impl FromStr for BumpKind {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "patch" => Ok(BumpKind::Patch),
            "minor" => Ok(BumpKind::Minor),
            "major" => Ok(BumpKind::Major),
            "prerelease" => Ok(BumpKind::Prerelease),
            other => Err(ReleaseError::InvalidVersionKind {
                kind: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BumpKind::Patch => "patch",
            BumpKind::Minor => "minor",
            BumpKind::Major => "major",
            BumpKind::Prerelease => "prerelease",
        };
        f.write_str(name)
    }
}

/// Parse a version literal, mapping parser failures to [`ReleaseError::InvalidVersion`].
pub fn parse_version(literal: &str) -> Result<Version> {
    Version::parse(literal).map_err(|source| ReleaseError::InvalidVersion {
        version: literal.to_string(),
        source,
    })
}

/// Compute the version following `current` for the given bump kind.
pub fn bump(current: &Version, kind: BumpKind) -> Result<Version> {
    let mut next = current.clone();
    next.build = BuildMetadata::EMPTY;

    match kind {
        BumpKind::Major => {
            next.major += 1;
            next.minor = 0;
            next.patch = 0;
            next.pre = Prerelease::EMPTY;
        }
        BumpKind::Minor => {
            next.minor += 1;
            next.patch = 0;
            next.pre = Prerelease::EMPTY;
        }
        BumpKind::Patch => {
            next.patch += 1;
            next.pre = Prerelease::EMPTY;
        }
        BumpKind::Prerelease => {
            let pre = next_prerelease(current.pre.as_str());
            next.pre = Prerelease::new(&pre).map_err(|source| ReleaseError::InvalidVersion {
                version: format!("{}-{}", current, pre),
                source,
            })?;
        }
    }

    Ok(next)
}

/// Increments the trailing numeric identifier, or starts a `beta.1` series.
fn next_prerelease(pre: &str) -> String {
    if pre.is_empty() {
        return format!("{PRERELEASE_TOKEN}.1");
    }

    match pre.rsplit_once('.') {
        Some((head, last)) => match last.parse::<u64>() {
            Ok(n) => format!("{head}.{}", n + 1),
            Err(_) => format!("{pre}.1"),
        },
        None => match pre.parse::<u64>() {
            Ok(n) => (n + 1).to_string(),
            Err(_) => format!("{pre}.1"),
        },
    }
}
