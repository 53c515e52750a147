//! `FieldValue`: The dynamically-typed value that flows into and out of a check
//!
//! Submitted values arrive in whatever shape the caller has (form strings, decoded JSON
//! numbers, nothing at all). Checks coerce them into the shape the rule promises, so the
//! accepted value may be a different variant than the submitted one: `"42"` comes back as
//! `Number(42.0)`, a date string as `Timestamp`, a URL string as `Url`.

use std::fmt;

use crate::UrlParts;

/// A submitted or accepted field value.
///
/// # Variants
///
/// - `None`: Nothing submitted (null / undefined)
/// - `String`: Text, the usual shape of form input
/// - `Number`: Any number; integers are represented exactly up to 2^53
/// - `Bool`: Boolean (only ever submitted, never produced by a check)
/// - `Timestamp`: Milliseconds since the Unix epoch, UTC (produced by `date` rules)
/// - `Url`: Decomposed URL (produced by `url` rules)
///
/// # Example
///
/// ```
/// use auditor::FieldValue;
///
/// let v: FieldValue = "hello".into();
/// assert_eq!(v.as_str(), Some("hello"));
/// assert!(!v.is_absent());
/// assert!(FieldValue::from("").is_absent());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    /// No value submitted.
    #[default]
    None,

    /// Text.
    String(String),

    /// A number.
    Number(f64),

    /// A boolean.
    Bool(bool),

    /// Milliseconds since the Unix epoch (UTC).
    Timestamp(i64),

    /// A URL broken into its components.
    Url(UrlParts),
}

impl FieldValue {
    /// Returns `true` if no value was submitted: `None` or the empty string.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        match self {
            Self::None => true,
            Self::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Scripting-style truthiness, used to interpret transform results.
    ///
    /// `None`, `false`, `""`, `0` and `NaN` are falsy; every other value is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::String(s) => !s.is_empty(),
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Bool(b) => *b,
            Self::Timestamp(_) | Self::Url(_) => true,
        }
    }

    /// Returns the string content if this is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number if this is a `Number`.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean if this is a `Bool`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the milliseconds if this is a `Timestamp`.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Self::Timestamp(ms) => Some(*ms),
            _ => None,
        }
    }

    /// Returns the URL components if this is a `Url`.
    #[must_use]
    pub fn as_url(&self) -> Option<&UrlParts> {
        match self {
            Self::Url(parts) => Some(parts),
            _ => None,
        }
    }

    /// Returns the variant name, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Timestamp(_) => "timestamp",
            Self::Url(_) => "url",
        }
    }

    /// Convert a decoded JSON scalar.
    ///
    /// Arrays and objects have no field-value counterpart and yield `None`.
    #[cfg(feature = "config")]
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        match value {
            Value::Null => Some(Self::None),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Renders the value the way it would be stringified for pattern matching.
///
/// Numbers print as a browser would: `42` rather than `42.0`, `0` for negative zero,
/// and exponent notation (`1e+21`, `1e-7`) outside `[1e-6, 1e21)`.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write_number(f, *n),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Timestamp(ms) => write!(f, "{ms}"),
            Self::Url(parts) => f.write_str(parts.href()),
        }
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n == 0.0 {
        return f.write_str("0");
    }
    if n.is_nan() {
        return f.write_str("NaN");
    }
    if n.is_infinite() {
        return f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
    }
    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return write!(f, "{n}");
    }
    let exp = format!("{n:e}");
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => write!(f, "{mantissa}e+{power}"),
        _ => f.write_str(&exp),
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&String> for FieldValue {
    fn from(s: &String) -> Self {
        Self::String(s.clone())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for FieldValue {
    #[allow(clippy::cast_precision_loss)] // Form numbers never approach 2^53
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<UrlParts> for FieldValue {
    fn from(parts: UrlParts) -> Self {
        Self::Url(parts)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::None, Into::into)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Serialize (feature = "serde")
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "serde")]
impl serde::Serialize for FieldValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Largest magnitude at which every integer is representable in an f64.
        const EXACT_INT: f64 = 9_007_199_254_740_992.0;

        match self {
            Self::None => serializer.serialize_none(),
            Self::String(s) => serializer.serialize_str(s),
            #[allow(clippy::cast_possible_truncation)] // Guarded by the range check
            Self::Number(n) if n.fract() == 0.0 && n.abs() <= EXACT_INT => {
                serializer.serialize_i64(*n as i64)
            }
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Timestamp(ms) => serializer.serialize_i64(*ms),
            Self::Url(parts) => serde::Serialize::serialize(parts, serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_values() {
        assert!(FieldValue::None.is_absent());
        assert!(FieldValue::from("").is_absent());
        assert!(!FieldValue::from(" ").is_absent());
        assert!(!FieldValue::from(0).is_absent());
        assert!(!FieldValue::from(false).is_absent());
    }

    #[test]
    fn truthiness() {
        assert!(!FieldValue::None.is_truthy());
        assert!(!FieldValue::from("").is_truthy());
        assert!(!FieldValue::from(0).is_truthy());
        assert!(!FieldValue::Number(f64::NAN).is_truthy());
        assert!(!FieldValue::from(false).is_truthy());

        assert!(FieldValue::from("0").is_truthy());
        assert!(FieldValue::from(-1).is_truthy());
        assert!(FieldValue::from(true).is_truthy());
        assert!(FieldValue::Timestamp(0).is_truthy());
    }

    #[test]
    fn display_drops_integral_fraction() {
        assert_eq!(FieldValue::Number(42.0).to_string(), "42");
        assert_eq!(FieldValue::Number(-3.5).to_string(), "-3.5");
        assert_eq!(FieldValue::None.to_string(), "");
    }

    #[test]
    fn display_numbers_like_a_browser() {
        let shown = |n: f64| FieldValue::Number(n).to_string();
        assert_eq!(shown(-0.0), "0");
        assert_eq!(shown(0.000_001), "0.000001");
        assert_eq!(shown(0.000_000_1), "1e-7");
        assert_eq!(shown(-1.5e-7), "-1.5e-7");
        assert_eq!(shown(1e20), "100000000000000000000");
        assert_eq!(shown(1e21), "1e+21");
        assert_eq!(shown(-1.25e22), "-1.25e+22");
        assert_eq!(shown(0.1), "0.1");
        assert_eq!(shown(f64::INFINITY), "Infinity");
        assert_eq!(shown(f64::NAN), "NaN");
    }

    #[test]
    fn option_conversion() {
        assert_eq!(FieldValue::from(None::<&str>), FieldValue::None);
        assert_eq!(
            FieldValue::from(Some("x")),
            FieldValue::String("x".to_string())
        );
    }

    #[test]
    fn accessors_reject_other_variants() {
        let v = FieldValue::from("text");
        assert_eq!(v.as_number(), None);
        assert_eq!(v.as_bool(), None);
        assert_eq!(v.as_timestamp(), None);
        assert!(v.as_url().is_none());
        assert_eq!(v.type_name(), "string");
    }

    #[cfg(feature = "config")]
    #[test]
    fn from_json_scalars() {
        use serde_json::json;
        assert_eq!(FieldValue::from_json(&json!(null)), Some(FieldValue::None));
        assert_eq!(FieldValue::from_json(&json!(7)), Some(FieldValue::Number(7.0)));
        assert_eq!(
            FieldValue::from_json(&json!("a")),
            Some(FieldValue::String("a".into()))
        );
        assert_eq!(FieldValue::from_json(&json!([1, 2])), None);
    }

    #[cfg(feature = "config")]
    #[test]
    fn serializes_integral_numbers_as_integers() {
        assert_eq!(
            serde_json::to_value(FieldValue::Number(42.0)).unwrap(),
            serde_json::json!(42)
        );
        assert_eq!(
            serde_json::to_value(FieldValue::Number(1.5)).unwrap(),
            serde_json::json!(1.5)
        );
        assert_eq!(
            serde_json::to_value(FieldValue::None).unwrap(),
            serde_json::Value::Null
        );
    }
}
