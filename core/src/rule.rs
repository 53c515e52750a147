//! Rule types, rule specifications and compiled rules.
//!
//! A [`RuleSpec`] is what the caller wrote; [`RuleSpec::compile`] validates it against the
//! closed key set of its [`RuleType`] and produces an immutable [`CompiledRule`].
//!
//! | Type | Accepted keys (besides `type`) |
//! |------|--------------------------------|
//! | `text` | required, multiline, fix, min, max, match, func |
//! | `signed` | required, fix, min, max, match, func |
//! | `unsigned` | required, fix, min, max, bit, match, func |
//! | `email`, `email_loose`, `url`, `date` | required, func |

use std::fmt;
use std::str::FromStr;

use crate::{FieldValue, Pattern, PatternSpec, RuleError, Transform, MAX_BIT_FLAGS};

// ═══════════════════════════════════════════════════════════════════════════════
// RuleType
// ═══════════════════════════════════════════════════════════════════════════════

/// The kind of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RuleType {
    /// Free text, optionally multi-line.
    Text,
    /// Email address, strict grammar.
    Email,
    /// Email address, local part may contain repeated or trailing dots.
    EmailLoose,
    /// `http`/`https` URL.
    Url,
    /// Calendar date or date-time.
    Date,
    /// Any finite number.
    Signed,
    /// Any finite number `>= 0`.
    Unsigned,
}

impl RuleType {
    /// Every rule type.
    pub const ALL: [RuleType; 7] = [
        Self::Text,
        Self::Email,
        Self::EmailLoose,
        Self::Url,
        Self::Date,
        Self::Signed,
        Self::Unsigned,
    ];

    /// Every rule type name, as written in rule definitions.
    pub const NAMES: [&'static str; 7] = [
        "text",
        "email",
        "email_loose",
        "url",
        "date",
        "signed",
        "unsigned",
    ];

    /// The name as written in rule definitions.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::EmailLoose => "email_loose",
            Self::Url => "url",
            Self::Date => "date",
            Self::Signed => "signed",
            Self::Unsigned => "unsigned",
        }
    }

    /// Returns `true` if rules of this type accept `key`.
    #[must_use]
    pub const fn accepts(self, key: RuleKey) -> bool {
        match key {
            RuleKey::Type | RuleKey::Required | RuleKey::Func => true,
            RuleKey::Multiline => matches!(self, Self::Text),
            RuleKey::Fix | RuleKey::Min | RuleKey::Max | RuleKey::Match => {
                matches!(self, Self::Text | Self::Signed | Self::Unsigned)
            }
            RuleKey::Bit => matches!(self, Self::Unsigned),
        }
    }

    /// Returns `true` for `signed` and `unsigned`.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Signed | Self::Unsigned)
    }
}

impl FromStr for RuleType {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RuleError::InvalidRuleType {
                found: format!("{s:?}"),
            })
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RuleKey
// ═══════════════════════════════════════════════════════════════════════════════

/// The closed set of keys a rule definition may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleKey {
    /// `type`
    Type,
    /// `required`
    Required,
    /// `multiline`
    Multiline,
    /// `func`
    Func,
    /// `match`
    Match,
    /// `bit`
    Bit,
    /// `fix`
    Fix,
    /// `min`
    Min,
    /// `max`
    Max,
}

impl RuleKey {
    /// Every rule key.
    pub const ALL: [RuleKey; 9] = [
        Self::Type,
        Self::Required,
        Self::Multiline,
        Self::Func,
        Self::Match,
        Self::Bit,
        Self::Fix,
        Self::Min,
        Self::Max,
    ];

    /// The key as written in rule definitions.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Required => "required",
            Self::Multiline => "multiline",
            Self::Func => "func",
            Self::Match => "match",
            Self::Bit => "bit",
            Self::Fix => "fix",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl FromStr for RuleKey {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| RuleError::UnknownRule { key: s.to_string() })
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RuleSpec
// ═══════════════════════════════════════════════════════════════════════════════

/// A rule definition, before validation.
///
/// Built with chained setters, or decoded from JSON with `RuleSpec::from_json` (feature
/// `config`). Setting a key the type does not accept is not an error until
/// [`compile`](Self::compile).
///
/// ```
/// use auditor::{RuleSpec, RuleError};
///
/// let rule = RuleSpec::unsigned().min(1.0).max(100.0).compile().unwrap();
/// assert!(!rule.is_required());
///
/// let err = RuleSpec::email().max(10.0).compile().unwrap_err();
/// assert!(matches!(err, RuleError::RuleNotApplicable { .. }));
/// ```
#[derive(Debug, Clone)]
pub struct RuleSpec {
    rule_type: RuleType,
    required: bool,
    multiline: Option<bool>,
    fix: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    bit: Option<Vec<bool>>,
    pattern: Option<PatternSpec>,
    transform: Option<Transform>,
}

impl RuleSpec {
    /// An empty rule of the given type.
    #[must_use]
    pub fn new(rule_type: RuleType) -> Self {
        Self {
            rule_type,
            required: false,
            multiline: None,
            fix: None,
            min: None,
            max: None,
            bit: None,
            pattern: None,
            transform: None,
        }
    }

    /// A `text` rule.
    #[must_use]
    pub fn text() -> Self {
        Self::new(RuleType::Text)
    }

    /// An `email` rule.
    #[must_use]
    pub fn email() -> Self {
        Self::new(RuleType::Email)
    }

    /// An `email_loose` rule.
    #[must_use]
    pub fn email_loose() -> Self {
        Self::new(RuleType::EmailLoose)
    }

    /// A `url` rule.
    #[must_use]
    pub fn url() -> Self {
        Self::new(RuleType::Url)
    }

    /// A `date` rule.
    #[must_use]
    pub fn date() -> Self {
        Self::new(RuleType::Date)
    }

    /// A `signed` rule.
    #[must_use]
    pub fn signed() -> Self {
        Self::new(RuleType::Signed)
    }

    /// An `unsigned` rule.
    #[must_use]
    pub fn unsigned() -> Self {
        Self::new(RuleType::Unsigned)
    }

    /// The rule type.
    #[must_use]
    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    /// Mark the field as required.
    #[must_use]
    pub fn required(self) -> Self {
        self.set_required(true)
    }

    /// Set whether the field is required.
    #[must_use]
    pub fn set_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Keep line breaks (normalized to `\n`) instead of stripping them.
    #[must_use]
    pub fn multiline(self) -> Self {
        self.set_multiline(true)
    }

    /// Set the `multiline` key explicitly.
    #[must_use]
    pub fn set_multiline(mut self, multiline: bool) -> Self {
        self.multiline = Some(multiline);
        self
    }

    /// Exact length (text) or exact value (numbers).
    #[must_use]
    pub fn fix(mut self, n: f64) -> Self {
        self.fix = Some(n);
        self
    }

    /// Minimum length (text) or minimum value (numbers).
    #[must_use]
    pub fn min(mut self, n: f64) -> Self {
        self.min = Some(n);
        self
    }

    /// Maximum length (text) or maximum value (numbers).
    #[must_use]
    pub fn max(mut self, n: f64) -> Self {
        self.max = Some(n);
        self
    }

    /// Allowed `unsigned` values as flags: value `i` passes if flag `i` is set.
    #[must_use]
    pub fn bit(mut self, flags: impl IntoIterator<Item = bool>) -> Self {
        self.bit = Some(flags.into_iter().collect());
        self
    }

    /// Require the (normalized or stringified) value to match a pattern.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<PatternSpec>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Post-process accepted values. A `None` or falsy return rejects the value.
    ///
    /// ```
    /// use auditor::{FieldValue, RuleSpec};
    ///
    /// let rule = RuleSpec::text()
    ///     .transform(|v| v.as_str().map(|s| FieldValue::from(s.to_uppercase())))
    ///     .compile()
    ///     .unwrap();
    /// assert_eq!(rule.check("abc").unwrap().val(), &FieldValue::from("ABC"));
    /// ```
    #[must_use]
    pub fn transform<F>(self, func: F) -> Self
    where
        F: Fn(&FieldValue) -> Option<FieldValue> + Send + Sync + 'static,
    {
        self.transform_with(Transform::new("closure", func))
    }

    /// Post-process accepted values with a named [`Transform`], usually one resolved from a
    /// [`TransformRegistry`](crate::TransformRegistry).
    #[must_use]
    pub fn transform_with(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// The keys this definition sets, `type` included.
    #[must_use]
    pub fn keys(&self) -> Vec<RuleKey> {
        let present = [
            (RuleKey::Type, true),
            (RuleKey::Required, self.required),
            (RuleKey::Multiline, self.multiline.is_some()),
            (RuleKey::Func, self.transform.is_some()),
            (RuleKey::Match, self.pattern.is_some()),
            (RuleKey::Bit, self.bit.is_some()),
            (RuleKey::Fix, self.fix.is_some()),
            (RuleKey::Min, self.min.is_some()),
            (RuleKey::Max, self.max.is_some()),
        ];
        present
            .into_iter()
            .filter_map(|(key, set)| set.then_some(key))
            .collect()
    }

    /// Validate and compile into an immutable [`CompiledRule`].
    ///
    /// # Errors
    ///
    /// - [`RuleError::RuleNotApplicable`] if a key is set that the rule type does not accept
    /// - [`RuleError::InvalidRuleValue`] for a non-finite bound, a `bit` list longer than
    ///   [`MAX_BIT_FLAGS`], or a `match` pattern that does not compile
    pub fn compile(&self) -> Result<CompiledRule, RuleError> {
        if let Some(key) = self
            .keys()
            .into_iter()
            .find(|key| !self.rule_type.accepts(*key))
        {
            return Err(RuleError::RuleNotApplicable {
                key,
                rule_type: self.rule_type,
            });
        }

        for (key, bound) in [
            (RuleKey::Fix, self.fix),
            (RuleKey::Min, self.min),
            (RuleKey::Max, self.max),
        ] {
            if let Some(n) = bound.filter(|n| !n.is_finite()) {
                return Err(RuleError::InvalidRuleValue {
                    key,
                    reason: format!("expected a finite number, got {n}"),
                });
            }
        }

        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                tracing::warn!(
                    rule_type = %self.rule_type,
                    min,
                    max,
                    "rule bounds exclude every value"
                );
            }
        }

        let bit = self.bit.as_deref().map(fold_bits).transpose()?;
        let pattern = self.pattern.as_ref().map(PatternSpec::compile).transpose()?;

        Ok(CompiledRule {
            rule_type: self.rule_type,
            required: self.required,
            multiline: self.multiline.unwrap_or(false),
            fix: self.fix,
            min: self.min,
            max: self.max,
            bit,
            pattern,
            transform: self.transform.clone(),
        })
    }
}

/// Fold flags into a mask: bit `i` set iff `flags[i]`.
fn fold_bits(flags: &[bool]) -> Result<u64, RuleError> {
    if flags.len() > MAX_BIT_FLAGS {
        return Err(RuleError::InvalidRuleValue {
            key: RuleKey::Bit,
            reason: format!(
                "{} flags given, but maximum allowed is {MAX_BIT_FLAGS}",
                flags.len()
            ),
        });
    }
    Ok(flags
        .iter()
        .enumerate()
        .filter(|(_, set)| **set)
        .fold(0u64, |mask, (i, _)| mask | (1u64 << i)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// CompiledRule
// ═══════════════════════════════════════════════════════════════════════════════

/// A validated rule, ready for repeated checking.
///
/// Immutable: registries replace compiled rules wholesale, never patch them. The check
/// algorithm itself lives in [`CompiledRule::check`].
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub(crate) rule_type: RuleType,
    pub(crate) required: bool,
    pub(crate) multiline: bool,
    pub(crate) fix: Option<f64>,
    pub(crate) min: Option<f64>,
    pub(crate) max: Option<f64>,
    pub(crate) bit: Option<u64>,
    pub(crate) pattern: Option<Pattern>,
    pub(crate) transform: Option<Transform>,
}

impl CompiledRule {
    /// The rule type.
    #[must_use]
    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    /// Whether an absent value is reported as a failure.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether line breaks are kept (text only).
    #[must_use]
    pub fn is_multiline(&self) -> bool {
        self.multiline
    }

    /// Exact length or value.
    #[must_use]
    pub fn fix(&self) -> Option<f64> {
        self.fix
    }

    /// Minimum length or value.
    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    /// Maximum length or value.
    #[must_use]
    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// The folded `bit` mask.
    #[must_use]
    pub fn bit_mask(&self) -> Option<u64> {
        self.bit
    }

    /// The compiled `match` pattern.
    #[must_use]
    pub fn pattern(&self) -> Option<&Pattern> {
        self.pattern.as_ref()
    }

    /// The post-processing transform.
    #[must_use]
    pub fn transform(&self) -> Option<&Transform> {
        self.transform.as_ref()
    }
}
