// src/convert/sowa.rs

//! Sowa to Sinol package conversion
//!
//! Steps run in a fixed order: tests, solutions, statements, checker,
//! config, then known noise is ignored and whatever is left unclaimed is
//! reported. Required parts abort the conversion; optional ones only warn.
//!
//! | Sowa | Sinol |
//! |------|-------|
//! | `in/<id>N.in`, `out/<id>N.out` | same paths |
//! | `sol/<id>.<ext>` | `prog/<id>1.<ext>` |
//! | other `sol/<id>*.<ext>` | `prog/<id>2.<ext>`, `prog/<id>3.<ext>`, ... |
//! | `utils/*.<ext>` | `prog/utils/*` |
//! | `doc/<id>.pdf`, `desc/<id>.tex` | `doc/<id>zad.pdf`, `doc/<id>zad.tex` |
//! | `check/*.<ext>` | `prog/<id>chk.<ext>` via the checker mapping |

use super::base::{ConversionRule, Converter};
use super::config::{SinolConfig, extract_title, test_name};
use super::mapping::{ConversionMapping, MappingMatch, TODO_SUFFIX};
use crate::error::{Error, Result};
use crate::heuristics::limits::{TimeLimit, TimeLimitEstimator};
use crate::package::Package;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Source extensions of programs, as a regex alternation
pub const PROGRAM_EXTENSIONS: &str = "cpp|c|cc|pas";

/// Name of the generated configuration in the target
pub const CONFIG_FILE: &str = "config.yml";

/// How the checker step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckerOutcome {
    /// The source package has no checker
    Absent,
    /// The checker is known and dropped on purpose
    Ignored { key: String },
    /// The approved replacement was copied to `target`
    Replaced { key: String, target: String },
}

/// Summary of a successful conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    /// Source paths no rule accounted for
    pub unprocessed: BTreeSet<String>,
    /// Number of files copied into the target
    pub copied: usize,
    pub checker: CheckerOutcome,
    /// Derived limit, when estimation was enabled
    pub time_limit: Option<TimeLimit>,
}

impl ConversionReport {
    /// True if every source file was accounted for
    pub fn is_clean(&self) -> bool {
        self.unprocessed.is_empty()
    }
}

/// Converts one Sowa package into a Sinol package
pub struct SowaToSinolConverter<'a> {
    converter: Converter<'a>,
    id: String,
    /// Task ID escaped for use inside patterns
    pid: String,
    checkers: Option<ConversionMapping>,
    estimator: Option<TimeLimitEstimator>,
    copied: usize,
}

impl<'a> SowaToSinolConverter<'a> {
    pub fn new(source: &'a Package, target: &'a Package) -> Self {
        let id = source.id().to_string();
        Self {
            converter: Converter::new(source, target),
            pid: regex::escape(&id),
            id,
            checkers: None,
            estimator: None,
            copied: 0,
        }
    }

    /// Resolve checkers through this mapping
    pub fn with_checkers(mut self, mapping: ConversionMapping) -> Self {
        self.checkers = Some(mapping);
        self
    }

    /// Derive per-test time limits with this estimator
    pub fn with_time_limits(mut self, estimator: TimeLimitEstimator) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn inputs_pattern(&self) -> String {
        format!(r"in/{}\d+[a-z]*\.in", self.pid)
    }

    fn main_solution_pattern(&self) -> String {
        format!(r"sol/{}\.(?:{})", self.pid, PROGRAM_EXTENSIONS)
    }

    fn statement_pattern(&self) -> String {
        format!(r"doc/{}\.pdf", self.pid)
    }

    fn statement_source_pattern(&self) -> String {
        format!(r"desc/{}\.tex", self.pid)
    }

    fn checker_pattern() -> String {
        format!(r"check/.*\.(?:{})", PROGRAM_EXTENSIONS)
    }

    /// Copy every match of `pattern` to the fixed path `dest`
    fn copy_as(&mut self, pattern: &str, dest: String) -> Result<usize> {
        let copied = self
            .converter
            .apply(ConversionRule::new(pattern).transform(move |_| dest.clone()))?;
        self.copied += copied;
        Ok(copied)
    }

    fn copy_rule(&mut self, rule: ConversionRule<'_>) -> Result<usize> {
        let copied = self.converter.apply(rule)?;
        self.copied += copied;
        Ok(copied)
    }

    /// The main model solution
    fn main_solution(&self) -> Result<String> {
        self.converter
            .one(&self.main_solution_pattern())?
            .ok_or_else(|| Error::missing("No main model solution"))
    }

    /// Check every required part before anything is copied
    pub fn preflight(&self) -> Result<()> {
        if !self.converter.exists(&self.inputs_pattern())? {
            return Err(Error::missing("No input files"));
        }
        self.main_solution()?;
        if !self.converter.exists(&self.statement_pattern())? {
            return Err(Error::missing("No problem statement"));
        }
        if self.converter.one(&Self::checker_pattern())?.is_some() && self.checkers.is_none() {
            return Err(Error::CheckerUnmapped);
        }
        Ok(())
    }

    /// Copy test inputs (required) and outputs
    pub fn make_tests(&mut self) -> Result<()> {
        info!("Making tests");
        let inputs = self.inputs_pattern();
        if self.copy_rule(ConversionRule::new(inputs))? == 0 {
            return Err(Error::missing("No input files"));
        }
        let outputs = format!(r"out/{}\d+[a-z]*\.out", self.pid);
        if self.copy_rule(ConversionRule::new(outputs))? == 0 {
            warn!("No output files");
        }
        Ok(())
    }

    /// Copy solutions
    ///
    /// The main solution becomes `prog/<id>1`; the remaining solutions of
    /// the task are numbered from 2 in enumeration order.
    pub fn make_solutions(&mut self) -> Result<()> {
        info!("Making solutions");
        let main = self.main_solution()?;
        let dest = format!("prog/{}1.{}", self.id, extension(&main));
        self.copy_as(&regex::escape(&main), dest)?;

        let others = self
            .converter
            .list(&format!(r"sol/{}.+\.(?:{})", self.pid, PROGRAM_EXTENSIONS))?;
        for (i, path) in others.iter().enumerate() {
            let dest = format!("prog/{}{}.{}", self.id, i + 2, extension(path));
            self.copy_as(&regex::escape(path), dest)?;
        }

        self.copy_rule(
            ConversionRule::new(format!(r"utils/.*\.(?:{}|sh)", PROGRAM_EXTENSIONS))
                .transform(|p| format!("prog/{}", p)),
        )?;
        self.copy_rule(
            ConversionRule::new(format!(r"sol/(.*\.(?:{}))", PROGRAM_EXTENSIONS))
                .rename("prog/other/$1")
                .skip_claimed(),
        )?;
        Ok(())
    }

    /// Copy the statement (required), its source and related documents
    pub fn make_doc(&mut self) -> Result<()> {
        info!("Making documents");
        let statement = self.statement_pattern();
        if self.copy_as(&statement, format!("doc/{}zad.pdf", self.id))? == 0 {
            return Err(Error::missing("No problem statement"));
        }
        let source = self.statement_source_pattern();
        if self.copy_as(&source, format!("doc/{}zad.tex", self.id))? == 0 {
            warn!("No statement source");
        }
        self.converter.ignore(&format!(r"desc/{}_opr\.tex", self.pid))?;
        self.copy_rule(
            ConversionRule::new(r"desc/(.*\.(?:pdf|tex|cls|png|jpg|JPG|sty|odg))")
                .rename("doc/$1")
                .skip_claimed(),
        )?;
        Ok(())
    }

    /// Replace the checker through the checker mapping
    ///
    /// An unknown checker is enrolled in the mapping for review and the
    /// conversion fails, naming the key to fill in.
    pub fn make_checker(&mut self) -> Result<CheckerOutcome> {
        info!("Making checker");
        let Some(checker) = self.converter.one(&Self::checker_pattern())? else {
            warn!("No checker found");
            return Ok(CheckerOutcome::Absent);
        };
        self.converter.ignore(&regex::escape(&checker))?;

        let Some(mapping) = self.checkers.as_mut() else {
            return Err(Error::CheckerUnmapped);
        };
        let original = self.converter.source().abspath(&checker);

        let outcome = match mapping.resolve(&original)? {
            MappingMatch::Ignore { key } => {
                info!("Ignoring the checker ({})", key);
                CheckerOutcome::Ignored { key }
            }
            MappingMatch::Replace { key, path } => {
                let dest = match path.extension() {
                    Some(ext) => format!("prog/{}chk.{}", self.id, ext.to_string_lossy()),
                    None => format!("prog/{}chk", self.id),
                };
                info!("Copying the checker from mapping: {}", path.display());
                self.converter.target().add(&path, &dest)?;
                self.copied += 1;
                CheckerOutcome::Replaced { key, target: dest }
            }
            MappingMatch::Unmatched { .. } => {
                let key = mapping.enroll(&original)?;
                let todo = mapping.replacement_path(&format!("{}{}", key, TODO_SUFFIX));
                return Err(Error::CheckerEnrolled { key, todo });
            }
        };

        self.converter.ignore("check/[^.]*")?;
        Ok(outcome)
    }

    /// Write `config.yml` with the title and, if enabled, time limits
    pub fn make_config(&mut self) -> Result<Option<TimeLimit>> {
        info!("Making config");
        let title = match self.converter.one(&self.statement_source_pattern())? {
            Some(statement) => {
                let latex = fs::read(self.converter.source().abspath(&statement))?;
                extract_title(&String::from_utf8_lossy(&latex))
            }
            None => None,
        };
        if title.is_none() {
            warn!("Title requires manual setting");
        }
        let mut config = SinolConfig::new().with_title(title);

        let mut time_limit = None;
        if let Some(estimator) = &self.estimator {
            let source = self.converter.source();
            let main = source.abspath(&self.main_solution()?);
            let mut inputs = self.converter.list(&self.inputs_pattern())?;
            inputs.sort();
            let paths: Vec<PathBuf> = inputs.iter().map(|p| source.abspath(p)).collect();

            let limit = estimator.estimate(&main, &paths)?;
            let tests = inputs.iter().filter_map(|p| test_name(&self.id, p));
            config = config.with_uniform_time_limit(tests, limit.as_millis());
            time_limit = Some(limit);
        }

        self.converter.target().write(CONFIG_FILE, config.render())?;
        Ok(time_limit)
    }

    /// Claim files that are known to have no Sinol counterpart
    pub fn ignore_noise(&mut self) -> Result<()> {
        let patterns = [
            // Editor backups
            r".*(~|\.swp|\.backup|\.bak)".to_string(),
            // Packaging system files
            r"\.sowa-sign".to_string(),
            r"(.*/)?Makefile(\.in)?".to_string(),
            r"utils/.*".to_string(),
            // LaTeX leftovers
            r"desc/.*\.(aux|log|synctex)".to_string(),
            format!(r"info/{}_opr\.pdf", self.pid),
            // Build products and scratch files
            r"tmpdesc/.*".to_string(),
            r"(sol|check)/.*(\.o|_PAS|_CPP|_C|\.out)".to_string(),
            format!(r"[^/]*\.(?:{})", PROGRAM_EXTENSIONS),
        ];
        for pattern in &patterns {
            self.converter.ignore(pattern)?;
        }
        Ok(())
    }

    /// Run the whole conversion
    pub fn convert(&mut self) -> Result<ConversionReport> {
        info!("Converting task '{}'", self.id);
        self.preflight()?;

        self.make_tests()?;
        self.make_solutions()?;
        self.make_doc()?;
        let checker = self.make_checker()?;
        let time_limit = self.make_config()?;
        self.ignore_noise()?;

        let unprocessed = self.converter.not_processed()?;
        if !unprocessed.is_empty() {
            let listed: Vec<&str> = unprocessed.iter().map(String::as_str).collect();
            warn!(
                "{} file(s) not processed: {}",
                unprocessed.len(),
                listed.join(", ")
            );
        }

        Ok(ConversionReport {
            unprocessed,
            copied: self.copied,
            checker,
            time_limit,
        })
    }
}

/// Extension of a local path, without the dot
fn extension(path: &str) -> &str {
    path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default()
}
