//! Changelog section extraction and insertion.
//!
//! Changelogs are markdown files with a fixed preamble terminated by a `---`
//! line, followed by version sections newest-first:
//!
//! ```text
//! # Changelog
//!
//! ---
//!
//! ## [1.1.0](https://github.com/org/repo/releases/tag/1.1.0)
//!
//! 1. Added things
//! ```

mod entries;

pub use entries::{ConsoleEntrySource, EntrySource, StaticEntries};

use crate::error::{ReleaseError, Result};
use std::path::{Path, PathBuf};

/// Line separating the preamble from the version sections.
pub const PREAMBLE_DELIMITER: &str = "---";

/// Prefix shared by every version heading.
const SECTION_PREFIX: &str = "## [";

/// In-memory changelog document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogDocument {
    path: PathBuf,
    lines: Vec<String>,
    trailing_newline: bool,
}

impl ChangelogDocument {
    /// Build a document from text. `path` is where [`save`](Self::save) writes.
    pub fn new(path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            path: path.into(),
            lines: text.lines().map(str::to_string).collect(),
            trailing_newline: text.is_empty() || text.ends_with('\n'),
        }
    }

    /// Read the changelog at `path`.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Ok(Self::new(path, &text))
    }

    /// Write the document back to its path.
    pub async fn save(&self) -> Result<()> {
        tokio::fs::write(&self.path, self.render()).await?;
        Ok(())
    }

    /// Path the document was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render the document as text.
    pub fn render(&self) -> String {
        let mut text = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            text.push('\n');
        }
        text
    }

    /// Versions with a section, in document order (newest first).
    pub fn versions(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter_map(|line| line.strip_prefix(SECTION_PREFIX))
            .filter_map(|rest| rest.split_once(']').map(|(version, _)| version.to_string()))
            .collect()
    }

    /// Lines belonging to `version`, excluding its heading and the next heading.
    ///
    /// Returns an empty list when the version has no section.
    pub fn extract_section(&self, version: &str) -> Vec<String> {
        let heading = format!("{SECTION_PREFIX}{version}]");

        self.lines
            .iter()
            .skip_while(|line| !line.starts_with(&heading))
            .skip(1)
            .take_while(|line| !line.starts_with(SECTION_PREFIX))
            .cloned()
            .collect()
    }

    /// Insert a section for `version` directly after the preamble delimiter.
    ///
    /// The block is a blank line, `## [version](link_base/releases/tag/version)`,
    /// a blank line, and `entries` as a numbered list. Existing sections are
    /// left untouched.
    pub fn insert_section(
        &mut self,
        version: &str,
        entries: &[String],
        link_base: &str,
    ) -> Result<()> {
        let delimiter = self
            .lines
            .iter()
            .position(|line| line == PREAMBLE_DELIMITER)
            .ok_or_else(|| ReleaseError::MissingChangelogDelimiter {
                path: self.path.clone(),
            })?;

        let link_base = link_base.trim_end_matches('/');
        let mut block = vec![
            String::new(),
            format!("{SECTION_PREFIX}{version}]({link_base}/releases/tag/{version})"),
            String::new(),
        ];
        block.extend(
            entries
                .iter()
                .enumerate()
                .map(|(i, entry)| format!("{}. {}", i + 1, entry)),
        );

        let insert_at = delimiter + 1;
        if self
            .lines
            .get(insert_at)
            .is_some_and(|next| !next.trim().is_empty())
        {
            block.push(String::new());
        }

        self.lines.splice(insert_at..insert_at, block);
        Ok(())
    }
}

/// Extract the notes for `version` from the changelog at `path` as text.
pub async fn changelog_section(path: &Path, version: &str) -> Result<String> {
    let document = ChangelogDocument::load(path).await?;
    let section = document.extract_section(version);
    if section.is_empty() {
        log::warn!("No section for {} in {}", version, path.display());
    }
    Ok(section.join("\n"))
}

/// Prepend a section for `version` using entries from `source`.
///
/// Returns `false` without touching the file when the source yields no entries.
pub async fn update_changelog<S: EntrySource + ?Sized>(
    path: &Path,
    repo_name: &str,
    version: &str,
    link_base: &str,
    source: &mut S,
) -> Result<bool> {
    let entries = source.provide_entries(repo_name)?;
    if entries.is_empty() {
        log::info!("Not updating {} changelog.", repo_name);
        return Ok(false);
    }

    let mut document = ChangelogDocument::load(path).await?;
    document.insert_section(version, &entries, link_base)?;
    document.save().await?;

    log::info!(
        "Added {} note(s) for {} to {}",
        entries.len(),
        version,
        path.display()
    );
    Ok(true)
}
