//! Line-oriented version rewriting for podspec manifests.
//!
//! Each line is classified by the first matching [`LineRule`] in [`LineRule::ORDER`]
//! and transformed according to that rule alone:
//!
//! 1. [`LineRule::Excluded`] - names a frozen third-party dependency, left alone
//! 2. [`LineRule::OptimisticDependency`] - dependency on an optimistic target, becomes `~> new`
//! 3. [`LineRule::PinnedVersion`] - contains the current version, becomes exactly `new`
//! 4. [`LineRule::SourceUrl`] - source declaration, every `current` becomes `new`
//! 5. [`LineRule::Unchanged`]

use crate::error::{ReleaseError, Result};
use regex::Regex;
use semver::Version;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Dependencies pinned to their own release line regardless of the SDK version.
pub const DEFAULT_EXCLUDED_DEPENDENCIES: &[&str] = &["OpenCV"];

/// Marker identifying a dependency declaration line.
const DEPENDENCY_MARKER: &str = "dependency";

/// Marker identifying the artifact source declaration line.
const SOURCE_MARKER: &str = "source";

/// Optimistic (minimum-version) operator.
const OPTIMISTIC_OPERATOR: &str = "~>";

/// Classification of a manifest line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRule {
    Excluded,
    OptimisticDependency,
    PinnedVersion,
    SourceUrl,
    Unchanged,
}

impl LineRule {
    /// Evaluation order. The first rule that matches a line wins.
    pub const ORDER: [LineRule; 5] = [
        LineRule::Excluded,
        LineRule::OptimisticDependency,
        LineRule::PinnedVersion,
        LineRule::SourceUrl,
        LineRule::Unchanged,
    ];

    fn matches(self, line: &str, plan: &RewritePlan<'_>) -> bool {
        match self {
            LineRule::Excluded => plan.excluded.iter().any(|name| line.contains(name.as_str())),
            LineRule::OptimisticDependency => {
                line.contains(DEPENDENCY_MARKER)
                    && plan
                        .optimistic_targets
                        .iter()
                        .any(|name| line.contains(name.as_str()))
            }
            LineRule::PinnedVersion => {
                if plan.pinned_only {
                    line.contains(&format!("'{}'", plan.current))
                        || line.contains(&format!("\"{}\"", plan.current))
                } else {
                    line.contains(&plan.current)
                }
            }
            LineRule::SourceUrl => line.contains(SOURCE_MARKER),
            LineRule::Unchanged => true,
        }
    }

    fn apply(self, line: &str, plan: &RewritePlan<'_>) -> String {
        match self {
            LineRule::Excluded | LineRule::Unchanged => line.to_string(),
            LineRule::OptimisticDependency => {
                let constraint = format!("{OPTIMISTIC_OPERATOR} {}", plan.new);
                plan.replace_versions(line, &constraint)
            }
            LineRule::PinnedVersion | LineRule::SourceUrl => plan.replace_versions(line, &plan.new),
        }
    }
}

/// Parameters of a single manifest rewrite.
#[derive(Debug, Clone)]
pub struct RewriteRequest<'a> {
    /// Version currently declared in the manifest
    pub current: &'a Version,
    /// Version to write
    pub new: &'a Version,
    /// Dependency names that get an optimistic constraint
    pub optimistic_targets: &'a [String],
    /// Only rewrite quoted exact versions, leaving `~>` constraints alone
    pub pinned_only: bool,
}

/// Outcome of rewriting one manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteReport {
    /// Manifest path
    pub path: PathBuf,
    /// Number of lines whose text changed
    pub lines_changed: usize,
}

struct RewritePlan<'a> {
    current: String,
    new: String,
    optimistic_targets: &'a [String],
    excluded: &'a [String],
    pinned_only: bool,
    versioned: Regex,
}

impl RewritePlan<'_> {
    /// Replace every standalone `(~> )?current` with `replacement`.
    ///
    /// Matches inside a longer version (`1.2.0-beta.1`, `11.2.0`, `1.2.0.1`)
    /// are left alone, so rewriting to a prerelease of `current` is idempotent.
    fn replace_versions(&self, line: &str, replacement: &str) -> String {
        let mut output = String::with_capacity(line.len());
        let mut last = 0;

        for m in self.versioned.find_iter(line) {
            if !is_standalone(line, m.start(), m.end()) {
                continue;
            }
            output.push_str(&line[last..m.start()]);
            output.push_str(replacement);
            last = m.end();
        }

        output.push_str(&line[last..]);
        output
    }
}

fn is_standalone(line: &str, start: usize, end: usize) -> bool {
    let before = line[..start].chars().next_back();
    let mut after = line[end..].chars();

    let extends_left = before.is_some_and(|c| c.is_ascii_alphanumeric() || c == '.');
    let extends_right = match after.next() {
        Some('.') => after.next().is_some_and(|c| c.is_ascii_digit()),
        Some(c) => c.is_ascii_alphanumeric() || c == '-' || c == '+',
        None => false,
    };
    !extends_left && !extends_right
}

/// Rewrites version strings in manifests.
#[derive(Debug, Clone)]
pub struct ManifestRewriter {
    excluded: Vec<String>,
}

impl Default for ManifestRewriter {
    fn default() -> Self {
        Self::new(
            DEFAULT_EXCLUDED_DEPENDENCIES
                .iter()
                .map(|name| name.to_string())
                .collect(),
        )
    }
}

impl ManifestRewriter {
    /// Creates a rewriter that never touches lines naming any of `excluded`.
    pub fn new(excluded: Vec<String>) -> Self {
        Self { excluded }
    }

    /// Classify a single line.
    pub fn classify(&self, line: &str, request: &RewriteRequest<'_>) -> Result<LineRule> {
        let plan = self.plan(request)?;
        Ok(classify_with(line, &plan))
    }

    /// Rewrite manifest text, returning the new text and the number of changed lines.
    pub fn rewrite_text(
        &self,
        content: &str,
        request: &RewriteRequest<'_>,
    ) -> Result<(String, usize)> {
        let plan = self.plan(request)?;
        let mut output = String::with_capacity(content.len());
        let mut changed = 0;

        for line in content.split_inclusive('\n') {
            let rule = classify_with(line, &plan);
            let rewritten = rule.apply(line, &plan);
            if rewritten != line {
                log::debug!("{rule:?}: {} -> {}", line.trim_end(), rewritten.trim_end());
                changed += 1;
            }
            output.push_str(&rewritten);
        }

        Ok((output, changed))
    }

    /// Rewrite the manifest at `path` in place.
    ///
    /// The whole file is read, transformed and written back through a temporary file
    /// in the same directory. Files without changes are not written.
    pub async fn rewrite(
        &self,
        path: &Path,
        request: &RewriteRequest<'_>,
    ) -> Result<RewriteReport> {
        log::info!(
            "Updating {} from {} -> {}",
            path.display(),
            request.current,
            request.new
        );

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReleaseError::MissingManifest {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let (rewritten, lines_changed) = self.rewrite_text(&content, request)?;

        if lines_changed > 0 {
            let target = path.to_path_buf();
            tokio::task::spawn_blocking(move || write_atomically(&target, &rewritten)).await??;
        } else {
            log::debug!("{} already at {}", path.display(), request.new);
        }

        Ok(RewriteReport {
            path: path.to_path_buf(),
            lines_changed,
        })
    }

    fn plan<'a>(&'a self, request: &RewriteRequest<'a>) -> Result<RewritePlan<'a>> {
        let current = request.current.to_string();
        let pattern = format!(
            r"({}\s*)?{}",
            regex::escape(OPTIMISTIC_OPERATOR),
            regex::escape(&current)
        );
        let versioned = Regex::new(&pattern)?;

        Ok(RewritePlan {
            current,
            new: request.new.to_string(),
            optimistic_targets: request.optimistic_targets,
            excluded: &self.excluded,
            pinned_only: request.pinned_only,
            versioned,
        })
    }
}

fn classify_with(line: &str, plan: &RewritePlan<'_>) -> LineRule {
    LineRule::ORDER
        .into_iter()
        .find(|rule| rule.matches(line, plan))
        .unwrap_or(LineRule::Unchanged)
}

/// Write `content` to `path` via a sibling temp file and rename.
pub(crate) fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn rewrite(content: &str, optimistic: &[&str], pinned_only: bool) -> String {
        let current = v("1.2.0");
        let new = v("1.3.0");
        let targets: Vec<String> = optimistic.iter().map(|s| s.to_string()).collect();
        let request = RewriteRequest {
            current: &current,
            new: &new,
            optimistic_targets: &targets,
            pinned_only,
        };
        ManifestRewriter::default()
            .rewrite_text(content, &request)
            .unwrap()
            .0
    }

    #[test]
    fn version_declaration_is_rewritten() {
        assert_eq!(
            rewrite("  s.version      = '1.2.0'\n", &[], false),
            "  s.version      = '1.3.0'\n"
        );
    }

    #[test]
    fn excluded_dependency_wins_over_everything() {
        let line = "  s.dependency 'OpenCV', '1.2.0'\n";
        assert_eq!(rewrite(line, &["OpenCV"], false), line);
    }

    #[test]
    fn optimistic_dependency_gets_minimum_constraint() {
        let line = "  s.dependency 'FritzBase/Vision', '1.2.0'\n";
        assert_eq!(
            rewrite(line, &["FritzBase/Vision"], false),
            "  s.dependency 'FritzBase/Vision', '~> 1.3.0'\n"
        );

        let already_optimistic = "  s.dependency 'FritzBase/Vision', '~> 1.2.0'\n";
        assert_eq!(
            rewrite(already_optimistic, &["FritzBase/Vision"], false),
            "  s.dependency 'FritzBase/Vision', '~> 1.3.0'\n"
        );
    }

    #[test]
    fn non_optimistic_dependency_is_pinned() {
        let line = "  s.dependency 'FritzBase/Vision', '~> 1.2.0'\n";
        assert_eq!(
            rewrite(line, &[], false),
            "  s.dependency 'FritzBase/Vision', '1.3.0'\n"
        );
    }

    #[test]
    fn pinned_only_leaves_optimistic_constraints() {
        let content = "  s.version = '1.2.0'\n  s.dependency 'FritzVisionLabelModelFast', '~> 1.2.0'\n";
        assert_eq!(
            rewrite(content, &[], true),
            "  s.version = '1.3.0'\n  s.dependency 'FritzVisionLabelModelFast', '~> 1.2.0'\n"
        );
    }

    #[test]
    fn source_url_follows_version_when_pinned_only() {
        let line = "  s.source = { :http => \"https://cdn.example.com/Fritz/1.2.0/Fritz.zip\" }\n";
        assert_eq!(
            rewrite(line, &[], true),
            "  s.source = { :http => \"https://cdn.example.com/Fritz/1.3.0/Fritz.zip\" }\n"
        );
    }

    #[test]
    fn rule_order_is_first_match_wins() {
        let current = v("1.2.0");
        let new = v("1.3.0");
        let targets = vec!["FritzBase/Vision".to_string()];
        let request = RewriteRequest {
            current: &current,
            new: &new,
            optimistic_targets: &targets,
            pinned_only: false,
        };
        let rewriter = ManifestRewriter::default();

        assert_eq!(
            rewriter
                .classify("s.dependency 'OpenCV', '1.2.0' # FritzBase/Vision", &request)
                .unwrap(),
            LineRule::Excluded
        );
        assert_eq!(
            rewriter.classify("s.dependency 'FritzBase/Vision', '1.2.0'", &request).unwrap(),
            LineRule::OptimisticDependency
        );
        assert_eq!(
            rewriter.classify("s.source = 'https://x/1.2.0/a.zip'", &request).unwrap(),
            LineRule::PinnedVersion
        );
        assert_eq!(
            rewriter.classify("s.source = { :git => 'https://x' }", &request).unwrap(),
            LineRule::SourceUrl
        );
        assert_eq!(rewriter.classify("s.name = 'Fritz'", &request).unwrap(), LineRule::Unchanged);
    }

    #[test]
    fn prerelease_rewrite_applied_twice_is_stable() {
        let current = v("1.2.0");
        let new = v("1.2.0-beta.1");
        let request = RewriteRequest {
            current: &current,
            new: &new,
            optimistic_targets: &[],
            pinned_only: false,
        };
        let rewriter = ManifestRewriter::default();
        let content = "  s.version      = '1.2.0'\n  s.source = { :http => 'https://x/Fritz/1.2.0/Fritz-1.2.0.zip' }\n";

        let (once, changed) = rewriter.rewrite_text(content, &request).unwrap();
        assert_eq!(changed, 2);
        assert_eq!(
            once,
            "  s.version      = '1.2.0-beta.1'\n  s.source = { :http => 'https://x/Fritz/1.2.0-beta.1/Fritz-1.2.0-beta.1.zip' }\n"
        );

        let (twice, changed) = rewriter.rewrite_text(&once, &request).unwrap();
        assert_eq!(changed, 0);
        assert_eq!(twice, once);
    }

    #[test]
    fn longer_versions_are_not_partial_matches() {
        assert_eq!(
            rewrite(
                "  s.dependency 'Other', '11.2.0'\n  s.dependency 'X', '1.2.0.1'\n",
                &[],
                false
            ),
            "  s.dependency 'Other', '11.2.0'\n  s.dependency 'X', '1.2.0.1'\n"
        );
    }

    #[test]
    fn preserves_missing_trailing_newline_and_crlf() {
        assert_eq!(rewrite("s.version = '1.2.0'", &[], false), "s.version = '1.3.0'");
        assert_eq!(
            rewrite("s.version = '1.2.0'\r\ns.name = 'X'\r\n", &[], false),
            "s.version = '1.3.0'\r\ns.name = 'X'\r\n"
        );
    }
}
