//! Allow-list and deny-list patterns.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Patterns as written in configuration: one string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PatternSpec {
    One(String),
    Many(Vec<String>),
}

impl PatternSpec {
    /// The patterns as a list; a single string is a one-element list.
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            PatternSpec::One(p) => vec![p.as_str()],
            PatternSpec::Many(ps) => ps.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for PatternSpec {
    fn from(pattern: &str) -> Self {
        PatternSpec::One(pattern.to_string())
    }
}

impl From<Vec<&str>> for PatternSpec {
    fn from(patterns: Vec<&str>) -> Self {
        PatternSpec::Many(patterns.into_iter().map(String::from).collect())
    }
}

/// Compiled regular expressions, matched by search rather than full match.
#[derive(Debug, Clone)]
pub struct PatternList {
    patterns: Vec<Regex>,
}

impl PatternList {
    pub fn compile(spec: &PatternSpec) -> Result<Self, regex::Error> {
        let patterns = spec
            .patterns()
            .into_iter()
            .map(Regex::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// True if any pattern is found in `haystack`.
    pub fn any_match(&self, haystack: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(haystack))
    }
}
