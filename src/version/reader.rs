//! Declared-version extraction from podspec manifests.

use crate::error::{ReleaseError, Result};
use regex::Regex;
use semver::Version;
use std::path::Path;
use std::sync::LazyLock;

use super::resolver::parse_version;

/// `s.version = '1.2.0'` with any receiver identifier and either quote style.
static VERSION_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*\w+\.version\s*=\s*['"]([^'"]+)['"]"#)
        .expect("Invalid version declaration regex")
});

/// Extract the declared version from manifest text.
///
/// `path` is only used for error reporting.
pub fn parse_declared_version(content: &str, path: &Path) -> Result<Version> {
    let literals: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| VERSION_DECLARATION.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();

    match literals.as_slice() {
        [] => Err(ReleaseError::VersionNotFound {
            path: path.to_path_buf(),
        }),
        [literal] => parse_version(literal),
        many => Err(ReleaseError::AmbiguousVersionDeclaration {
            path: path.to_path_buf(),
            count: many.len(),
        }),
    }
}

/// Read the declared version of the manifest at `path`.
pub async fn read_version(path: &Path) -> Result<Version> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ReleaseError::MissingManifest {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    parse_declared_version(&content, path)
}
