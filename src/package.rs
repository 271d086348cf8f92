// src/package.rs

//! Task package archives
//!
//! A package is a zip archive holding a single top-level directory whose
//! name is the task ID. Loading extracts the archive into a private
//! temporary workspace; files inside are addressed by *local paths*
//! (relative to the package root, forward slashes, no leading slash).
//! The workspace is removed when the `Package` is dropped.

use crate::error::{Error, Result};
use regex::Regex;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Compile a pattern that must match a whole local path
pub(crate) fn full_match(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("^(?:{})$", pattern))?)
}

/// An extracted or freshly created task package
#[derive(Debug)]
pub struct Package {
    id: String,
    workspace: TempDir,
}

impl Package {
    /// Load a package from a zip archive
    ///
    /// The archive must contain exactly one top-level directory; its name
    /// becomes the package ID. If `expected_id` is given, the loaded ID
    /// must match it.
    pub fn load(archive: &Path, expected_id: Option<&str>) -> Result<Self> {
        let workspace = TempDir::new()?;
        let mut zip = ZipArchive::new(File::open(archive)?)?;
        zip.extract(workspace.path())?;

        let entries = fs::read_dir(workspace.path())?.collect::<io::Result<Vec<_>>>()?;
        let dirs = entries
            .iter()
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .count();
        let id = match entries.as_slice() {
            [entry] if dirs == 1 => entry.file_name().to_string_lossy().into_owned(),
            [] => {
                return Err(Error::InvalidPackage(format!(
                    "{} is empty, one package directory expected",
                    archive.display()
                )));
            }
            _ => {
                return Err(Error::InvalidPackage(format!(
                    "{} must contain exactly one top-level directory, found {} entries",
                    archive.display(),
                    entries.len()
                )));
            }
        };

        if let Some(expected) = expected_id
            && expected != id
        {
            return Err(Error::WrongPackageId {
                expected: expected.to_string(),
                found: id,
            });
        }

        debug!("Loaded package '{}' from {}", id, archive.display());
        Ok(Self { id, workspace })
    }

    /// Create a new, empty package with the given ID
    pub fn create(id: &str) -> Result<Self> {
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(Error::InvalidPackage(format!("invalid task ID '{}'", id)));
        }
        let workspace = TempDir::new()?;
        fs::create_dir(workspace.path().join(id))?;
        Ok(Self {
            id: id.to_string(),
            workspace,
        })
    }

    /// Task ID of the package
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Absolute path of the package root directory
    pub fn root(&self) -> PathBuf {
        self.workspace.path().join(&self.id)
    }

    /// Convert a local path to an absolute path
    pub fn abspath(&self, local_path: &str) -> PathBuf {
        self.root().join(local_path)
    }

    /// Local paths of all files whose whole path matches `pattern`
    ///
    /// The sequence is lazy and reflects the package contents at the time
    /// it is iterated. Order follows directory enumeration and is not
    /// sorted. Every entry that is not a directory counts as a file,
    /// symlinks included. Names that are not valid UTF-8 are reported
    /// lossily; a failure to read the tree is yielded as `Error::Walk`.
    pub fn find(&self, pattern: &str) -> Result<impl Iterator<Item = Result<String>> + '_> {
        let regex = full_match(pattern)?;
        let root = self.root();
        Ok(WalkDir::new(&root)
            .min_depth(1)
            .into_iter()
            .filter(|entry| !matches!(entry, Ok(e) if e.file_type().is_dir()))
            .map(move |entry| local_path(&root, entry?.path()))
            .filter(move |path| !matches!(path, Ok(p) if !regex.is_match(p))))
    }

    /// `find` collected, stopping at the first error
    pub fn list(&self, pattern: &str) -> Result<Vec<String>> {
        self.find(pattern)?.collect()
    }

    /// Copy an external file into the package at `local_path`
    pub fn add(&self, path: &Path, local_path: &str) -> Result<()> {
        let target = self.prepare_target(local_path)?;
        fs::copy(path, &target)?;
        Ok(())
    }

    /// Write generated content into the package at `local_path`
    pub fn write(&self, local_path: &str, contents: impl AsRef<[u8]>) -> Result<()> {
        let target = self.prepare_target(local_path)?;
        fs::write(&target, contents)?;
        Ok(())
    }

    fn prepare_target(&self, local_path: &str) -> Result<PathBuf> {
        if local_path.is_empty()
            || local_path.starts_with('/')
            || local_path.split('/').any(|part| part == "..")
        {
            return Err(Error::InvalidPackage(format!(
                "'{}' is not a valid local path",
                local_path
            )));
        }
        let target = self.abspath(local_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(target)
    }

    /// Export the package to a zip archive
    ///
    /// Entries are stored under `<id>/` in sorted order. Fails with
    /// `OutputExists` if `path` exists and `overwrite` is false.
    pub fn save(&self, path: &Path, overwrite: bool) -> Result<()> {
        let file = if overwrite {
            File::create(path)?
        } else {
            File::create_new(path).map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => Error::OutputExists(path.to_path_buf()),
                _ => Error::Io(e),
            })?
        };

        let mut paths = self.list(".*")?;
        paths.sort();

        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for local in &paths {
            zip.start_file(format!("{}/{}", self.id, local), options)?;
            let mut source = File::open(self.abspath(local))?;
            io::copy(&mut source, &mut zip)?;
        }
        zip.finish()?;

        debug!("Saved {} file(s) of '{}' to {}", paths.len(), self.id, path.display());
        Ok(())
    }
}

/// Forward-slash local path of `path` under `root`
fn local_path(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        Error::internal(format!("{} is outside {}", path.display(), root.display()))
    })?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let local = parts.join("/");
    if relative.to_str().is_none() {
        warn!("File name is not valid UTF-8: {}", local);
    }
    Ok(local)
}
