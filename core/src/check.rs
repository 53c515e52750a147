//! The check algorithm and its result type.

use std::borrow::Cow;

use crate::format::{is_email, is_email_loose, parse_date, parse_url};
use crate::{CompiledRule, FieldValue, RuleType, Status};

// ═══════════════════════════════════════════════════════════════════════════════
// CheckResult
// ═══════════════════════════════════════════════════════════════════════════════

/// The outcome of checking one value against one rule.
///
/// On success `val` is the accepted value: normalized, coerced and transformed. On
/// rejection `val` is the value exactly as submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    rule_type: RuleType,
    required: bool,
    val: FieldValue,
    status: Status,
}

impl CheckResult {
    /// The type of the rule that produced this result.
    #[must_use]
    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    /// Whether the rule marks the field as required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The accepted value, or the submitted value on rejection.
    #[must_use]
    pub fn val(&self) -> &FieldValue {
        &self.val
    }

    /// Consume the result, keeping only the value.
    #[must_use]
    pub fn into_val(self) -> FieldValue {
        self.val
    }

    /// The verdict.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// The numeric status code; `0` on success.
    #[must_use]
    pub fn errno(&self) -> u16 {
        self.status.code()
    }

    /// The symbolic status name, absent on success.
    #[must_use]
    pub fn ename(&self) -> Option<&'static str> {
        (!self.is_ok()).then(|| self.status.name())
    }

    /// The human-readable failure message, absent on success.
    #[must_use]
    pub fn errstr(&self) -> Option<&'static str> {
        self.status.message()
    }

    /// Returns `true` if the value was accepted.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CheckResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let len = if self.is_ok() { 4 } else { 6 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("type", self.rule_type.as_str())?;
        map.serialize_entry("required", &self.required)?;
        map.serialize_entry("val", &self.val)?;
        map.serialize_entry("errno", &self.errno())?;
        if let Some(ename) = self.ename() {
            map.serialize_entry("ename", ename)?;
        }
        if let Some(errstr) = self.errstr() {
            map.serialize_entry("errstr", errstr)?;
        }
        map.end()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Normalization
// ═══════════════════════════════════════════════════════════════════════════════

/// Normalize line breaks in text input.
///
/// With `multiline`, `\r\n` and lone `\r` become `\n`. Without it, every `\r` and `\n` is
/// removed. Borrows when nothing changes, and is idempotent.
///
/// ```
/// use auditor::normalize_line_endings;
///
/// assert_eq!(normalize_line_endings("a\r\nb\rc", true), "a\nb\nc");
/// assert_eq!(normalize_line_endings("a\r\nb\nc", false), "abc");
/// ```
#[must_use]
pub fn normalize_line_endings(text: &str, multiline: bool) -> Cow<'_, str> {
    if multiline {
        if text.contains('\r') {
            Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
        } else {
            Cow::Borrowed(text)
        }
    } else if text.contains(['\r', '\n']) {
        Cow::Owned(text.chars().filter(|c| !matches!(c, '\r' | '\n')).collect())
    } else {
        Cow::Borrowed(text)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Check
// ═══════════════════════════════════════════════════════════════════════════════

impl CompiledRule {
    /// Check one submitted value.
    ///
    /// Returns `None` when the field is optional and nothing usable was submitted (an
    /// absent value, or text that is empty once line breaks are stripped). Otherwise the
    /// result carries the verdict.
    ///
    /// ```
    /// use auditor::{FieldValue, RuleSpec, Status};
    ///
    /// let rule = RuleSpec::unsigned().max(100.0).compile().unwrap();
    /// assert_eq!(rule.check("100").unwrap().val(), &FieldValue::Number(100.0));
    /// assert_eq!(rule.check(101).unwrap().status(), Status::NotAcceptable);
    /// assert_eq!(rule.check("ten").unwrap().status(), Status::BadRequest);
    /// assert!(rule.check(None::<&str>).is_none());
    /// ```
    #[must_use]
    pub fn check(&self, value: impl Into<FieldValue>) -> Option<CheckResult> {
        let value = value.into();
        let outcome = if value.is_absent() {
            Err(Status::NoContent)
        } else {
            self.evaluate(&value)
        };

        let (status, val) = match outcome {
            Err(Status::NoContent) if !self.required => {
                tracing::trace!(rule_type = %self.rule_type, "optional value absent");
                return None;
            }
            Err(status) => (status, value),
            Ok(accepted) => match &self.transform {
                None => (Status::Ok, accepted),
                Some(transform) => match transform.apply(&accepted) {
                    Some(transformed) => (Status::Ok, transformed),
                    None => (Status::NotAcceptable, value),
                },
            },
        };

        tracing::trace!(rule_type = %self.rule_type, %status, "checked value");
        Some(CheckResult {
            rule_type: self.rule_type,
            required: self.required,
            val,
            status,
        })
    }

    /// Type-specific validation of a present value.
    fn evaluate(&self, value: &FieldValue) -> Result<FieldValue, Status> {
        match self.rule_type {
            RuleType::Text => self.check_text(value),
            RuleType::Email => check_string(value, is_email),
            RuleType::EmailLoose => check_string(value, is_email_loose),
            RuleType::Url => value
                .as_str()
                .and_then(parse_url)
                .map(FieldValue::Url)
                .ok_or(Status::NotAcceptable),
            RuleType::Date => check_date(value),
            RuleType::Signed | RuleType::Unsigned => self.check_number(value),
        }
    }

    fn check_text(&self, value: &FieldValue) -> Result<FieldValue, Status> {
        let raw: Cow<'_, str> = match value {
            FieldValue::String(s) => Cow::Borrowed(s.as_str()),
            FieldValue::Number(_) => Cow::Owned(value.to_string()),
            _ => return Err(Status::BadRequest),
        };

        let text = normalize_line_endings(&raw, self.multiline);
        if text.is_empty() {
            return Err(Status::NoContent);
        }

        #[allow(clippy::cast_precision_loss)] // Lengths never approach 2^53
        let len = text.chars().count() as f64;
        if !self.within_bounds(len) {
            return Err(Status::NotAcceptable);
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(&text) {
                return Err(Status::NotAcceptable);
            }
        }
        Ok(FieldValue::String(text.into_owned()))
    }

    fn check_number(&self, value: &FieldValue) -> Result<FieldValue, Status> {
        let n = match value {
            FieldValue::Number(n) => *n,
            FieldValue::String(s) => coerce_number(s).ok_or(Status::BadRequest)?,
            _ => return Err(Status::BadRequest),
        };
        if !n.is_finite() {
            return Err(Status::BadRequest);
        }

        if self.rule_type == RuleType::Unsigned && n < 0.0 {
            return Err(Status::NotAcceptable);
        }
        if !self.within_bounds(n) {
            return Err(Status::NotAcceptable);
        }
        if let Some(mask) = self.bit {
            if !bit_allows(mask, n) {
                return Err(Status::NotAcceptable);
            }
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(&FieldValue::Number(n).to_string()) {
                return Err(Status::NotAcceptable);
            }
        }
        Ok(FieldValue::Number(n))
    }

    /// `fix`, `min` and `max` against a length or a value.
    #[allow(clippy::float_cmp)] // `fix` is an exact-match rule
    fn within_bounds(&self, n: f64) -> bool {
        self.fix.map_or(true, |fix| n == fix)
            && self.min.map_or(true, |min| n >= min)
            && self.max.map_or(true, |max| n <= max)
    }
}

fn check_string(value: &FieldValue, valid: fn(&str) -> bool) -> Result<FieldValue, Status> {
    match value.as_str() {
        Some(s) if valid(s) => Ok(value.clone()),
        _ => Err(Status::NotAcceptable),
    }
}

fn check_date(value: &FieldValue) -> Result<FieldValue, Status> {
    match value {
        FieldValue::Timestamp(_) => Ok(value.clone()),
        FieldValue::String(s) => parse_date(s)
            .map(FieldValue::Timestamp)
            .ok_or(Status::BadRequest),
        _ => Err(Status::BadRequest),
    }
}

/// Numeric coercion of submitted text, as the `+text` of a browser form script.
///
/// Surrounding whitespace is ignored and blank text is zero. Unsigned `0x`, `0o` and
/// `0b` integer literals are read in their radix. Anything else is decimal.
fn coerce_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    let prefixed = trimmed.get(..2).map(str::to_ascii_lowercase);
    let radix = match prefixed.as_deref() {
        Some("0x") => 16,
        Some("0o") => 8,
        Some("0b") => 2,
        _ => return trimmed.parse().ok(),
    };
    radix_integer(&trimmed[2..], radix)
}

fn radix_integer(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0.0_f64, |acc, c| {
        c.to_digit(radix)
            .map(|d| acc.mul_add(f64::from(radix), f64::from(d)))
    })
}

/// Value `n` passes if it is an integer in `[0, 63]` whose bit is set in `mask`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Range checked first
fn bit_allows(mask: u64, n: f64) -> bool {
    n.fract() == 0.0 && (0.0..64.0).contains(&n) && mask & (1u64 << (n as u32)) != 0
}
