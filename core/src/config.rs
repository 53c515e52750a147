//! Rule definitions from JSON (or anything that deserializes into `serde_json::Value`).
//!
//! A rule file is a document of labels, each mapping field names to rule definitions:
//!
//! ```json
//! {
//!   "signup": {
//!     "name":  { "type": "text", "required": true, "max": 40 },
//!     "age":   { "type": "unsigned", "min": 1, "max": 120 },
//!     "email": { "type": "email", "required": true, "func": "lowercase" }
//!   }
//! }
//! ```
//!
//! # Key values
//!
//! | Key | Accepted values |
//! |-----|-----------------|
//! | `type` | one of [`RuleType::NAMES`] |
//! | `required`, `multiline` | any value, read by truthiness |
//! | `fix`, `min`, `max` | number, or a string holding one |
//! | `bit` | array, each entry read by truthiness |
//! | `match` | pattern string, or `{ "pattern": ..., "flags": ... }` |
//! | `func` | name of a transform in the [`TransformRegistry`] |

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::registry::CompiledBatch;
use crate::{Auditor, PatternSpec, RuleError, RuleKey, RuleSpec, RuleType, TransformRegistry};

/// Object form of a `match` key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MatchConfig {
    Source(String),
    Spec {
        pattern: String,
        #[serde(default, alias = "flag")]
        flags: String,
    },
}

impl From<MatchConfig> for PatternSpec {
    fn from(config: MatchConfig) -> Self {
        match config {
            MatchConfig::Source(source) => PatternSpec::new(source),
            MatchConfig::Spec { pattern, flags } => PatternSpec::with_flags(pattern, flags),
        }
    }
}

/// A numeric bound, written as a number or as numeric text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BoundConfig {
    Number(f64),
    Text(String),
}

impl RuleSpec {
    /// Decode a rule definition.
    ///
    /// Keys are validated against the closed key set first, then against the rule type,
    /// then decoded. Compile-time checks (finite bounds, pattern syntax) still happen in
    /// [`RuleSpec::compile`].
    ///
    /// # Errors
    ///
    /// - [`RuleError::InvalidRuleSpec`] if `value` is not an object
    /// - [`RuleError::InvalidRuleType`] if `type` is missing or unknown
    /// - [`RuleError::UnknownRule`] for a key outside the closed key set
    /// - [`RuleError::RuleNotApplicable`] for a key the type does not accept
    /// - [`RuleError::InvalidRuleValue`] for a key whose value has the wrong shape, or a
    ///   `func` naming no registered transform
    ///
    /// # Example
    ///
    /// ```
    /// use auditor::{register_core_transforms, RuleSpec, RuleType, TransformRegistryBuilder};
    ///
    /// let transforms = register_core_transforms(TransformRegistryBuilder::new()).build();
    /// let spec = RuleSpec::from_json(
    ///     &serde_json::json!({"type": "text", "max": "12", "func": "trim"}),
    ///     &transforms,
    /// )
    /// .unwrap();
    /// assert_eq!(spec.rule_type(), RuleType::Text);
    /// ```
    pub fn from_json(value: &Value, transforms: &TransformRegistry) -> Result<Self, RuleError> {
        let object = value.as_object().ok_or_else(|| RuleError::InvalidRuleSpec {
            found: json_kind(value).to_string(),
        })?;

        let rule_type = match object.get(RuleKey::Type.as_str()) {
            Some(Value::String(name)) => name.parse::<RuleType>()?,
            Some(other) => {
                return Err(RuleError::InvalidRuleType {
                    found: other.to_string(),
                })
            }
            None => {
                return Err(RuleError::InvalidRuleType {
                    found: "null".to_string(),
                })
            }
        };

        let mut spec = RuleSpec::new(rule_type);
        for (name, v) in object {
            let key: RuleKey = name.parse()?;
            if !rule_type.accepts(key) {
                return Err(RuleError::RuleNotApplicable { key, rule_type });
            }
            spec = match key {
                RuleKey::Type => spec,
                RuleKey::Required => spec.set_required(is_truthy(v)),
                RuleKey::Multiline => spec.set_multiline(is_truthy(v)),
                RuleKey::Fix => spec.fix(bound(key, v)?),
                RuleKey::Min => spec.min(bound(key, v)?),
                RuleKey::Max => spec.max(bound(key, v)?),
                RuleKey::Bit => match v {
                    Value::Array(flags) => spec.bit(flags.iter().map(is_truthy)),
                    other => return Err(expected(key, "an array", other)),
                },
                RuleKey::Match => {
                    let config: MatchConfig = serde_json::from_value(v.clone())
                        .map_err(|_| expected(key, "a pattern string or {pattern, flags}", v))?;
                    spec.pattern(config)
                }
                RuleKey::Func => match v {
                    Value::String(name) => spec.transform_with(transforms.resolve(name)?),
                    other => return Err(expected(key, "a transform name", other)),
                },
            };
        }
        Ok(spec)
    }
}

impl Auditor {
    /// Load a whole rule document: `{ label: { field: rule, ... }, ... }`.
    ///
    /// Atomic across the document: every rule is compiled before any is committed.
    /// Returns the number of field rules registered.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidRuleSpec`] if the document or a label entry is not an
    /// object, [`RuleError::EmptyLabel`] / [`RuleError::EmptyField`] for empty names, and
    /// any error from [`RuleSpec::from_json`] or [`RuleSpec::compile`] wrapped in
    /// [`RuleError::Field`] as `label.field`. On error nothing is registered.
    pub fn load_rules(
        &self,
        document: &Value,
        transforms: &TransformRegistry,
    ) -> Result<usize, RuleError> {
        let labels = object_of(document, "rule document")?;

        let mut batches = Vec::with_capacity(labels.len());
        let mut count = 0;
        for (label, fields) in labels {
            if label.is_empty() {
                return Err(RuleError::EmptyLabel);
            }
            let fields = object_of(fields, &format!("label \"{label}\""))?;
            let batch = fields
                .iter()
                .map(|(field, spec)| {
                    if field.is_empty() {
                        return Err(RuleError::EmptyField);
                    }
                    RuleSpec::from_json(spec, transforms)
                        .and_then(|spec| spec.compile())
                        .map(|rule| (field.clone(), rule))
                        .map_err(|e| e.in_field(format!("{label}.{field}")))
                })
                .collect::<Result<CompiledBatch, _>>()?;
            count += batch.len();
            batches.push((label.clone(), batch));
        }

        self.commit(batches);
        tracing::debug!(count, "loaded rule document");
        Ok(count)
    }
}

fn object_of<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, RuleError> {
    value.as_object().ok_or_else(|| RuleError::InvalidRuleSpec {
        found: format!("{} for {what}", json_kind(value)),
    })
}

fn bound(key: RuleKey, value: &Value) -> Result<f64, RuleError> {
    let parsed = match serde_json::from_value::<BoundConfig>(value.clone()) {
        Ok(BoundConfig::Number(n)) => Some(n),
        Ok(BoundConfig::Text(s)) => s.trim().parse().ok(),
        Err(_) => None,
    };
    parsed.ok_or_else(|| expected(key, "a number", value))
}

fn expected(key: RuleKey, what: &str, found: &Value) -> RuleError {
    RuleError::InvalidRuleValue {
        key,
        reason: format!("expected {what}, got {found}"),
    }
}

/// JSON truthiness: `null`, `false`, `0`, `""` are falsy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
