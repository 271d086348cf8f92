// src/convert/config.rs

//! Generated `config.yml` for the target package

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Placeholder written when no title could be extracted
pub const TITLE_PLACEHOLDER: &str = "TODO";

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\title\{(?:\\mbox\{)?([^}]*)\}").expect("static regex is valid")
});

/// Extract the task title from a LaTeX statement
///
/// Understands `\title{...}` and `\title{\mbox{...}}`; non-breaking `~`
/// spaces become plain spaces.
pub fn extract_title(latex: &str) -> Option<String> {
    TITLE_RE
        .captures(latex)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace('~', " ").trim().to_string())
}

/// Test name of an input file: its basename without the task ID prefix
/// and the `.in` suffix (`in/abc1a.in` is test `1a` of task `abc`)
pub fn test_name(id: &str, input: &str) -> Option<String> {
    let basename = input.rsplit('/').next()?;
    let name = basename.strip_prefix(id)?.strip_suffix(".in")?;
    (!name.is_empty()).then(|| name.to_string())
}

/// Contents of the generated configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinolConfig {
    pub title: Option<String>,
    /// Per-test limits in milliseconds
    pub time_limits: BTreeMap<String, u64>,
}

impl SinolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    /// Apply the same limit to every listed test
    pub fn with_uniform_time_limit<I, S>(mut self, tests: I, millis: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for test in tests {
            self.time_limits.insert(test.into(), millis);
        }
        self
    }

    /// Render as YAML; tests are listed in name order
    pub fn render(&self) -> String {
        let mut out = String::new();
        let title = self.title.as_deref().unwrap_or(TITLE_PLACEHOLDER);
        out.push_str(&format!("title: {}\n", title));
        if !self.time_limits.is_empty() {
            out.push_str("time_limits:\n");
            for (test, millis) in &self.time_limits {
                out.push_str(&format!("    {}: {}\n", test, millis));
            }
        }
        out
    }
}
