//! # Record filtering
//!
//! Both commands narrow the merged records with the same engine; each
//! command enables a different subset of the criteria.

use crate::base::BaseInfo;

use clap::ValueEnum;
use regex::{Regex, RegexBuilder};

/// How a name pattern is matched against an infobase name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CompareType {
    /// Pattern found anywhere in the name.
    #[default]
    Any,
    /// Name starts with the pattern.
    Start,
    /// Name equals the pattern.
    Full,
}

#[derive(Debug)]
enum Pattern {
    Text(String),
    Regex(Regex),
}

/// A compiled name filter.
#[derive(Debug)]
pub struct CompareParameter {
    pattern: Pattern,
    compare_type: CompareType,
    ignore_case: bool,
}

impl CompareParameter {
    /// Compile a name filter.
    ///
    /// For regular expressions the anchoring required by `compare_type` is
    /// added here and case folding is left to the regex engine.
    ///
    /// # Errors
    /// Returns the regex error if `is_regex` is set and `pattern` is invalid.
    pub fn new(
        pattern: &str,
        is_regex: bool,
        compare_type: CompareType,
        ignore_case: bool,
    ) -> Result<Self, regex::Error> {
        if is_regex {
            let anchored = match compare_type {
                CompareType::Any => pattern.to_string(),
                CompareType::Start => format!(r"\A(?:{pattern})"),
                CompareType::Full => format!(r"\A(?:{pattern})\z"),
            };
            let regex = RegexBuilder::new(&anchored).case_insensitive(ignore_case).build()?;
            return Ok(Self {
                pattern: Pattern::Regex(regex),
                compare_type,
                ignore_case: false,
            });
        }

        let text = if ignore_case {
            pattern.to_lowercase()
        } else {
            pattern.to_string()
        };
        Ok(Self {
            pattern: Pattern::Text(text),
            compare_type,
            ignore_case,
        })
    }

    pub fn compare(&self, text: &str) -> bool {
        match &self.pattern {
            Pattern::Regex(regex) => regex.is_match(text),
            Pattern::Text(pattern) => {
                let lowered;
                let text = if self.ignore_case {
                    lowered = text.to_lowercase();
                    lowered.as_str()
                } else {
                    text
                };
                match self.compare_type {
                    CompareType::Any => text.contains(pattern.as_str()),
                    CompareType::Start => text.starts_with(pattern.as_str()),
                    CompareType::Full => text == pattern,
                }
            }
        }
    }
}

/// Criteria a record has to satisfy.
#[derive(Debug, Default)]
pub struct BaseFilter {
    /// Allowed IDs; empty means no restriction.
    pub ids: Vec<String>,
    pub name: Option<CompareParameter>,
    /// `Some(true)` keeps records with a cache folder, `Some(false)` those without.
    pub cache: Option<bool>,
    /// `Some(true)` keeps registered records, `Some(false)` unregistered ones.
    pub base: Option<bool>,
    pub unregistered_only: bool,
}

impl BaseFilter {
    /// Check one record.
    ///
    /// A name filter decides the outcome on its own: once it is set, the
    /// cache and registration criteria are not consulted.
    pub fn matches(&self, base: &BaseInfo) -> bool {
        if !self.ids.is_empty() && !self.ids.iter().any(|id| id == base.id()) {
            return false;
        }
        if let Some(name) = &self.name {
            return name.compare(base.name());
        }
        if let Some(cache) = self.cache {
            if base.has_cache() != cache {
                return false;
            }
        }
        if let Some(registered) = self.base {
            if base.is_registered() != registered {
                return false;
            }
        }
        if self.unregistered_only && base.is_registered() {
            return false;
        }
        true
    }
}
