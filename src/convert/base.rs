// src/convert/base.rs

//! Rule-driven copying from a source package into a target package
//!
//! A `Converter` keeps track of which source paths have been *claimed*
//! (copied or explicitly ignored) during one run. Whatever is left at the
//! end is reported by `not_processed()`, so unexpected files in a source
//! package never disappear silently.

use crate::error::{Error, Result};
use crate::package::{Package, full_match};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// How a matched source path becomes a target path
pub enum Rewrite<'r> {
    /// Keep the source path
    Identity,
    /// Capture-group substitution (`$1`, `${name}`) against the rule pattern
    Replace(String),
    /// Arbitrary mapping
    With(Box<dyn Fn(&str) -> String + 'r>),
}

/// A single copy instruction
pub struct ConversionRule<'r> {
    pattern: String,
    rewrite: Rewrite<'r>,
    condition: Option<Box<dyn Fn(&str) -> bool + 'r>>,
    skip_claimed: bool,
}

impl<'r> ConversionRule<'r> {
    /// Copy every path fully matching `pattern` to the same local path
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            rewrite: Rewrite::Identity,
            condition: None,
            skip_claimed: false,
        }
    }

    /// Rename matches with a capture-group replacement
    pub fn rename(mut self, replacement: impl Into<String>) -> Self {
        self.rewrite = Rewrite::Replace(replacement.into());
        self
    }

    /// Compute the target path with a function
    pub fn transform(mut self, f: impl Fn(&str) -> String + 'r) -> Self {
        self.rewrite = Rewrite::With(Box::new(f));
        self
    }

    /// Extra condition a matched path must satisfy
    pub fn when(mut self, condition: impl Fn(&str) -> bool + 'r) -> Self {
        self.condition = Some(Box::new(condition));
        self
    }

    /// Leave paths that are already claimed alone
    pub fn skip_claimed(mut self) -> Self {
        self.skip_claimed = true;
        self
    }
}

/// Copies files between packages and tracks claimed source paths
pub struct Converter<'a> {
    source: &'a Package,
    target: &'a Package,
    processed: HashSet<String>,
}

impl<'a> Converter<'a> {
    pub fn new(source: &'a Package, target: &'a Package) -> Self {
        Self {
            source,
            target,
            processed: HashSet::new(),
        }
    }

    pub fn source(&self) -> &'a Package {
        self.source
    }

    pub fn target(&self) -> &'a Package {
        self.target
    }

    /// Source paths fully matching `pattern`
    pub fn find(&self, pattern: &str) -> Result<impl Iterator<Item = Result<String>> + 'a> {
        self.source.find(pattern)
    }

    /// Source paths fully matching `pattern`, collected
    pub fn list(&self, pattern: &str) -> Result<Vec<String>> {
        self.source.list(pattern)
    }

    /// Whether any source path matches `pattern`
    pub fn exists(&self, pattern: &str) -> Result<bool> {
        Ok(self.find(pattern)?.next().transpose()?.is_some())
    }

    /// The only source path matching `pattern`
    ///
    /// `Ok(None)` if nothing matches, `Error::Ambiguous` if several do.
    pub fn one(&self, pattern: &str) -> Result<Option<String>> {
        let mut paths = self.list(pattern)?;
        match paths.len() {
            0 => Ok(None),
            1 => Ok(paths.pop()),
            _ => {
                paths.sort();
                Err(Error::Ambiguous {
                    pattern: pattern.to_string(),
                    paths,
                })
            }
        }
    }

    /// Claim every matching path without copying it
    ///
    /// Returns the number of matching paths.
    pub fn ignore(&mut self, pattern: &str) -> Result<usize> {
        let source = self.source;
        let mut matched = 0;
        for path in source.find(pattern)? {
            self.processed.insert(path?);
            matched += 1;
        }
        Ok(matched)
    }

    /// Apply a rule, returning the number of copied files
    pub fn apply(&mut self, rule: ConversionRule<'_>) -> Result<usize> {
        let regex = match rule.rewrite {
            Rewrite::Replace(_) => Some(full_match(&rule.pattern)?),
            _ => None,
        };

        let source = self.source;
        let mut copied = 0;
        for path in source.find(&rule.pattern)? {
            let path = path?;
            if rule.condition.as_ref().is_some_and(|cond| !cond(&path)) {
                continue;
            }
            if rule.skip_claimed && self.processed.contains(&path) {
                continue;
            }

            let dest = match (&rule.rewrite, &regex) {
                (Rewrite::Replace(replacement), Some(regex)) => {
                    regex.replace(&path, replacement.as_str()).into_owned()
                }
                (Rewrite::With(f), _) => f(&path),
                _ => path.clone(),
            };

            debug!("{} -> {}", path, dest);
            self.target.add(&source.abspath(&path), &dest)?;
            self.processed.insert(path);
            copied += 1;
        }
        Ok(copied)
    }

    /// Copy matching files under their own names
    pub fn copy(&mut self, pattern: &str) -> Result<usize> {
        self.apply(ConversionRule::new(pattern))
    }

    /// Copy matching files, renaming them with a capture-group replacement
    pub fn copy_rename(&mut self, pattern: &str, replacement: &str) -> Result<usize> {
        self.apply(ConversionRule::new(pattern).rename(replacement))
    }

    pub fn is_processed(&self, path: &str) -> bool {
        self.processed.contains(path)
    }

    /// Source paths not claimed by any rule so far
    ///
    /// Fails if the source tree cannot be listed, so nothing is left out
    /// of the report silently.
    pub fn not_processed(&self) -> Result<BTreeSet<String>> {
        let mut residue = BTreeSet::new();
        for path in self.source.find(".*")? {
            let path = path?;
            if !self.processed.contains(&path) {
                residue.insert(path);
            }
        }
        Ok(residue)
    }
}
