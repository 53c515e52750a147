//! Post-validation transforms and the registry that names them.
//!
//! A rule's `func` runs after a value has passed every other check. It may reshape the
//! value (`" a "` → `"a"`) or veto it by returning `None` or a falsy value.
//!
//! Rule files cannot carry closures, so they name transforms instead; names resolve
//! through a [`TransformRegistry`] built once at startup:
//!
//! ```
//! use auditor::{register_core_transforms, TransformRegistryBuilder};
//!
//! let registry = register_core_transforms(TransformRegistryBuilder::new())
//!     .transform("nonzero", |v| v.as_number().filter(|n| *n != 0.0).map(Into::into))
//!     .build();
//! assert!(registry.contains("trim"));
//! assert!(registry.contains("nonzero"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat};

use crate::{FieldValue, RuleError, RuleKey};

/// Type-erased transform function.
type BoxedTransform = Arc<dyn Fn(&FieldValue) -> Option<FieldValue> + Send + Sync>;

/// A named post-validation transform.
///
/// Cheap to clone; clones share the function.
#[derive(Clone)]
pub struct Transform {
    name: Arc<str>,
    func: BoxedTransform,
}

impl Transform {
    /// Wrap a function under a name.
    pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(&FieldValue) -> Option<FieldValue> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// The name this transform was registered or created under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the transform.
    ///
    /// Returns `None` when the value is vetoed: the function returned `None`, or a value
    /// that is not truthy (see [`FieldValue::is_truthy`]).
    #[must_use]
    pub fn apply(&self, value: &FieldValue) -> Option<FieldValue> {
        (self.func)(value).filter(FieldValue::is_truthy)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════════════

/// Builder for constructing a [`TransformRegistry`].
///
/// Register functions by name, then call [`build()`](Self::build). The built registry is
/// immutable; registering a name twice keeps the later function.
#[derive(Default)]
pub struct TransformRegistryBuilder {
    transforms: HashMap<String, Transform>,
}

impl TransformRegistryBuilder {
    /// Create a new empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform function under `name`.
    #[must_use]
    pub fn transform<F>(mut self, name: &str, func: F) -> Self
    where
        F: Fn(&FieldValue) -> Option<FieldValue> + Send + Sync + 'static,
    {
        self.transforms
            .insert(name.to_owned(), Transform::new(name, func));
        self
    }

    /// Freeze the registry.
    #[must_use]
    pub fn build(self) -> TransformRegistry {
        TransformRegistry {
            transforms: self.transforms,
        }
    }
}

/// Register the built-in transforms.
///
/// | Name | Input | Output |
/// |------|-------|--------|
/// | `trim` | string | string without surrounding whitespace |
/// | `lowercase` | string | lowercased string |
/// | `uppercase` | string | uppercased string |
/// | `iso8601` | timestamp | RFC 3339 string in UTC, millisecond precision |
/// | `integer` | number | number truncated toward zero |
///
/// Any other input vetoes the value. The veto also applies when the output is falsy, so
/// `trim` rejects whitespace-only text and `integer` rejects values in `(-1, 1)`.
#[must_use]
pub fn register_core_transforms(builder: TransformRegistryBuilder) -> TransformRegistryBuilder {
    builder
        .transform("trim", |v| v.as_str().map(|s| s.trim().into()))
        .transform("lowercase", |v| v.as_str().map(|s| s.to_lowercase().into()))
        .transform("uppercase", |v| v.as_str().map(|s| s.to_uppercase().into()))
        .transform("iso8601", |v| {
            v.as_timestamp()
                .and_then(DateTime::from_timestamp_millis)
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true).into())
        })
        .transform("integer", |v| v.as_number().map(|n| n.trunc().into()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable name → [`Transform`] map, used when decoding rule files.
#[derive(Debug, Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, Transform>,
}

impl TransformRegistry {
    /// Returns the number of registered transforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Returns `true` if no transforms are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Returns the registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up a transform.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Transform> {
        self.transforms.get(name)
    }

    /// Look up a transform for a `func` key.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidRuleValue`] naming the available transforms if `name`
    /// is not registered.
    pub fn resolve(&self, name: &str) -> Result<Transform, RuleError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| RuleError::InvalidRuleValue {
                key: RuleKey::Func,
                reason: format!(
                    "unknown transform \"{name}\"; available: [{}]",
                    self.names().join(", ")
                ),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> TransformRegistry {
        register_core_transforms(TransformRegistryBuilder::new()).build()
    }

    #[test]
    fn builder_registers_and_freezes() {
        let registry = TransformRegistryBuilder::new()
            .transform("double", |v| v.as_number().map(|n| (n * 2.0).into()))
            .build();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("double"));
        assert!(!registry.contains("triple"));
        assert_eq!(registry.get("double").unwrap().name(), "double");
    }

    #[test]
    fn empty_registry() {
        let registry = TransformRegistryBuilder::new().build();
        assert!(registry.is_empty());
        assert!(registry.names().is_empty());
    }

    #[test]
    fn core_names_are_sorted() {
        assert_eq!(
            core().names(),
            vec!["integer", "iso8601", "lowercase", "trim", "uppercase"]
        );
    }

    #[test]
    fn string_transforms() {
        let r = core();
        let apply = |name: &str, v: &str| r.get(name).unwrap().apply(&v.into());
        assert_eq!(apply("trim", "  hi  "), Some("hi".into()));
        assert_eq!(apply("lowercase", "HeLLo"), Some("hello".into()));
        assert_eq!(apply("uppercase", "straße"), Some("STRASSE".into()));
        assert_eq!(apply("trim", "   "), None);
    }

    #[test]
    fn string_transforms_veto_other_types() {
        let trim = core().resolve("trim").unwrap();
        assert_eq!(trim.apply(&FieldValue::Number(3.0)), None);
    }

    #[test]
    fn iso8601_formats_timestamps() {
        let iso = core().resolve("iso8601").unwrap();
        assert_eq!(
            iso.apply(&FieldValue::Timestamp(1_705_314_600_000)),
            Some("2024-01-15T10:30:00.000Z".into())
        );
        assert_eq!(iso.apply(&"2024-01-15".into()), None);
    }

    #[test]
    fn integer_truncates() {
        let int = core().resolve("integer").unwrap();
        assert_eq!(
            int.apply(&FieldValue::Number(7.9)),
            Some(FieldValue::Number(7.0))
        );
        assert_eq!(
            int.apply(&FieldValue::Number(-2.5)),
            Some(FieldValue::Number(-2.0))
        );
        assert_eq!(int.apply(&FieldValue::Number(0.5)), None);
    }

    #[test]
    fn falsy_results_veto() {
        let t = Transform::new("falsy", |_| Some(FieldValue::Bool(false)));
        assert_eq!(t.apply(&"x".into()), None);
        let t = Transform::new("zero", |_| Some(FieldValue::Number(0.0)));
        assert_eq!(t.apply(&"x".into()), None);
    }

    #[test]
    fn unknown_transform_lists_available() {
        let err = core().resolve("reverse").unwrap_err();
        match err {
            RuleError::InvalidRuleValue { key, reason } => {
                assert_eq!(key, RuleKey::Func);
                assert!(reason.contains("reverse"));
                assert!(reason.contains("integer, iso8601"));
            }
            other => panic!("expected InvalidRuleValue, got {other:?}"),
        }
    }

    #[test]
    fn debug_shows_name_only() {
        let t = Transform::new("shout", |v| Some(v.clone()));
        assert_eq!(format!("{t:?}"), "Transform { name: \"shout\", .. }");
    }
}
