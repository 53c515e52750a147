//! `PatternSpec`: Config-level `match` rule, compiled to a [`Pattern`]
//!
//! - [`PatternSpec`] = what the user wrote (`"^[a-z]+$"`, or a pattern plus flags)
//! - [`Pattern`] = the compiled regex evaluated at check time
//!
//! Patterns search the value (they are not implicitly anchored); write `^...$` to
//! constrain the whole value.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::{RuleError, RuleKey, MAX_PATTERN_LENGTH};

/// A pattern as written in a rule: source text plus single-letter flags.
///
/// Supported flags: `i` (case-insensitive), `m` (multi-line `^`/`$`), `s` (`.` matches
/// newline), `u` (accepted for compatibility; matching is always Unicode-aware).
///
/// # Example
///
/// ```
/// use auditor::PatternSpec;
///
/// let pattern = PatternSpec::with_flags("^abc$", "i").compile().unwrap();
/// assert!(pattern.is_match("ABC"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSpec {
    source: String,
    flags: String,
}

impl PatternSpec {
    /// A pattern without flags.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            flags: String::new(),
        }
    }

    /// A pattern with flags.
    pub fn with_flags(source: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            flags: flags.into(),
        }
    }

    /// The pattern source.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The flags as written.
    #[must_use]
    pub fn flags(&self) -> &str {
        &self.flags
    }

    /// Compile into a runtime [`Pattern`].
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidRuleValue`] for `match` if the pattern is longer than
    /// [`MAX_PATTERN_LENGTH`], carries an unsupported flag, or does not compile.
    pub fn compile(&self) -> Result<Pattern, RuleError> {
        let invalid = |reason: String| RuleError::InvalidRuleValue {
            key: RuleKey::Match,
            reason,
        };

        if self.source.len() > MAX_PATTERN_LENGTH {
            return Err(invalid(format!(
                "pattern length is {}, but maximum allowed is {MAX_PATTERN_LENGTH}",
                self.source.len()
            )));
        }

        let mut builder = RegexBuilder::new(&self.source);
        for flag in self.flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'u' => builder.unicode(true),
                other => return Err(invalid(format!("unsupported pattern flag '{other}'"))),
            };
        }

        let regex = builder
            .build()
            .map_err(|e| invalid(format!("invalid pattern \"{}\": {e}", self.source)))?;
        Ok(Pattern {
            spec: self.clone(),
            regex,
        })
    }
}

impl From<&str> for PatternSpec {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for PatternSpec {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

/// Renders as a regex literal: `/source/flags`.
impl fmt::Display for PatternSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

/// A compiled `match` rule.
///
/// Uses Rust's `regex` crate, so matching is linear in the input length.
#[derive(Debug, Clone)]
pub struct Pattern {
    spec: PatternSpec,
    regex: Regex,
}

impl Pattern {
    /// Returns `true` if the pattern matches anywhere in `text`.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// The specification this pattern was compiled from.
    #[must_use]
    pub fn spec(&self) -> &PatternSpec {
        &self.spec
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.spec.fmt(f)
    }
}
