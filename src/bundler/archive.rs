//! Reproducible zip archives of built frameworks.

use crate::error::{ReleaseError, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Archive produced for one release target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledArchive {
    /// Location of the zip file
    pub path: PathBuf,
    /// Archive-relative names, in the order they were written
    pub entries: Vec<String>,
}

impl BundledArchive {
    /// File name of the archive (`FritzBase.zip`).
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Builds target archives from directories below a bundle root.
///
/// All bundled paths and extra files are relative to the root, and archive
/// entries keep those relative paths.
#[derive(Debug, Clone)]
pub struct ArtifactBundler {
    root: PathBuf,
}

impl ArtifactBundler {
    /// Creates a bundler rooted at the framework checkout.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Bundle root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `<root>/<target_name>.zip` containing every file below each of
    /// `bundled_paths`, followed by `extra_files`.
    ///
    /// Directory entries are sorted and timestamps fixed so identical inputs
    /// produce identical archives.
    pub fn bundle(
        &self,
        target_name: &str,
        bundled_paths: &[PathBuf],
        extra_files: &[PathBuf],
    ) -> Result<BundledArchive> {
        for dir in bundled_paths {
            if !self.root.join(dir).is_dir() {
                return Err(ReleaseError::MissingBundlePath {
                    path: self.root.join(dir),
                });
            }
        }

        let archive_path = self.root.join(format!("{target_name}.zip"));
        log::info!("Bundling {} -> {}", target_name, archive_path.display());

        let mut writer = ZipWriter::new(File::create(&archive_path)?);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());
        let mut entries = Vec::new();

        for dir in bundled_paths {
            let walker = WalkDir::new(self.root.join(dir))
                .follow_links(false)
                .sort_by_file_name();

            for entry in walker {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = self.add_file(&mut writer, entry.path(), options)?;
                entries.push(name);
            }
        }

        for file in extra_files {
            let name = self.add_file(&mut writer, &self.root.join(file), options)?;
            entries.push(name);
        }

        writer.finish()?;
        log::debug!("{} contains {} file(s)", archive_path.display(), entries.len());

        Ok(BundledArchive {
            path: archive_path,
            entries,
        })
    }

    fn add_file(
        &self,
        writer: &mut ZipWriter<File>,
        path: &Path,
        options: SimpleFileOptions,
    ) -> Result<String> {
        let name = self.entry_name(path);
        writer.start_file(name.as_str(), options)?;
        let mut source = File::open(path)?;
        io::copy(&mut source, writer)?;
        Ok(name)
    }

    fn entry_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}
