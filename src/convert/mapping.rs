// src/convert/mapping.rs

//! Content-addressed checker mapping
//!
//! Checkers are matched by the hash of their contents, never by name.
//! A mapping directory has two halves:
//!
//! - `find/` holds every checker seen so far, named `<hash><ext>`; a name
//!   ending in `.ignore` records that the checker should be dropped
//! - `replace/` holds the approved replacement for each key under the same
//!   name; `<key>.todo` marks a replacement still waiting for review
//!
//! The index from content hash to key is built once when the mapping is
//! opened and updated by `enroll()`.

use crate::error::{Error, Result};
use crate::hash::{self, HashAlgorithm};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Suffix of `find/` entries whose files are dropped
pub const IGNORE_SUFFIX: &str = ".ignore";

/// Suffix of enrolled replacements awaiting review
pub const TODO_SUFFIX: &str = ".todo";

/// Outcome of looking up a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingMatch {
    /// Content was never seen
    Unmatched { hash: String },
    /// Content is known and should be dropped
    Ignore { key: String },
    /// Content is known and has an approved replacement
    Replace { key: String, path: PathBuf },
}

/// Hash-keyed `find/` + `replace/` directory pair
#[derive(Debug)]
pub struct ConversionMapping {
    find_dir: PathBuf,
    replace_dir: PathBuf,
    algorithm: HashAlgorithm,
    /// Content hash to `find/` file name
    index: HashMap<String, String>,
}

impl ConversionMapping {
    /// Open a mapping directory containing `find/` and `replace/`
    pub fn open(dir: &Path) -> Result<Self> {
        Self::new(dir.join("find"), dir.join("replace"))
    }

    /// Build a mapping from explicit directories, hashing with MD5
    pub fn new(find_dir: impl Into<PathBuf>, replace_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_algorithm(find_dir, replace_dir, HashAlgorithm::Md5)
    }

    /// Build a mapping with a specific hash algorithm
    ///
    /// Keys stored by earlier runs are only found again with the algorithm
    /// that produced them.
    pub fn with_algorithm(
        find_dir: impl Into<PathBuf>,
        replace_dir: impl Into<PathBuf>,
        algorithm: HashAlgorithm,
    ) -> Result<Self> {
        let find_dir = find_dir.into();
        let replace_dir = replace_dir.into();
        for dir in [&find_dir, &replace_dir] {
            if !dir.is_dir() {
                return Err(Error::MappingLayout(format!(
                    "{} is not a directory",
                    dir.display()
                )));
            }
        }

        let mut index = HashMap::new();
        for entry in fs::read_dir(&find_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type()?.is_file() {
                return Err(Error::MappingLayout(format!(
                    "unexpected entry {} (only files are allowed)",
                    path.display()
                )));
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let digest = hash::hash_file(algorithm, &path)?.value;
            if let Some(previous) = index.insert(digest.clone(), name.clone()) {
                return Err(Error::MappingLayout(format!(
                    "{} and {} have identical contents ({})",
                    previous, name, digest
                )));
            }
        }

        debug!(
            "Loaded {} checker mapping entries from {} ({})",
            index.len(),
            find_dir.display(),
            algorithm
        );
        Ok(Self {
            find_dir,
            replace_dir,
            algorithm,
            index,
        })
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Where the replacement for `key` lives (or will live)
    pub fn replacement_path(&self, key: &str) -> PathBuf {
        self.replace_dir.join(key)
    }

    /// Look up a file by content
    pub fn resolve(&self, file: &Path) -> Result<MappingMatch> {
        let digest = hash::hash_file(self.algorithm, file)?.value;
        let Some(key) = self.index.get(&digest) else {
            return Ok(MappingMatch::Unmatched { hash: digest });
        };

        if key.ends_with(IGNORE_SUFFIX) {
            return Ok(MappingMatch::Ignore { key: key.clone() });
        }

        let path = self.replacement_path(key);
        if !path.is_file() {
            return Err(Error::ReplacementMissing {
                key: key.clone(),
                path,
            });
        }
        Ok(MappingMatch::Replace {
            key: key.clone(),
            path,
        })
    }

    /// Record a new file for manual review
    ///
    /// Copies it to `find/<hash><ext>` and `replace/<hash><ext>.todo` and
    /// returns the key `<hash><ext>`. The file's content must not be known
    /// yet.
    pub fn enroll(&mut self, file: &Path) -> Result<String> {
        let digest = hash::hash_file(self.algorithm, file)?.value;
        if let Some(existing) = self.index.get(&digest) {
            return Err(Error::internal(format!(
                "{} is already mapped as {}",
                file.display(),
                existing
            )));
        }

        let key = match file.extension() {
            Some(ext) => format!("{}.{}", digest, ext.to_string_lossy()),
            None => digest.clone(),
        };
        fs::copy(file, self.find_dir.join(&key))?;
        fs::copy(
            file,
            self.replace_dir.join(format!("{}{}", key, TODO_SUFFIX)),
        )?;
        self.index.insert(digest, key.clone());

        info!("Enrolled {} as {}", file.display(), key);
        Ok(key)
    }
}
