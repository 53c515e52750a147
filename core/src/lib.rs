//! auditor - declarative field validation
//!
//! Register typed rules per *label* (a named rule-set, usually one form or record type),
//! then check submitted values one field at a time. Every check yields a verdict with a
//! stable numeric status code instead of an error, so callers can aggregate many fields
//! without exception-style control flow.
//!
//! # Architecture
//!
//! - [`format`]: Leaf grammars: strict/loose email, URL, calendar dates
//! - [`RuleSpec`]: What the user wrote (builder or JSON); compiles to a [`CompiledRule`]
//! - [`CompiledRule`]: Validated, immutable rule; [`CompiledRule::check`] is the algorithm
//! - [`Auditor`]: Label → field → rule registry, safe to share across threads
//! - [`CheckResult`]: Outcome of one check: value, [`Status`], symbolic name and message
//!
//! # Key invariants
//!
//! 1. **Registration fails loudly, checking never does.** Bad rules are rejected with
//!    [`RuleError`] at registration time; bad values come back as data.
//!
//! 2. **Absent optional fields report nothing.** A missing value for a non-required field
//!    yields `None` from [`Auditor::check`], not a passing or failing result.
//!
//! 3. **Compiled rules are never patched.** Re-registering a field replaces its rule
//!    wholesale; a failed registration leaves the previous rule in place.
//!
//! # Example
//!
//! ```
//! use auditor::prelude::*;
//!
//! let auditor = Auditor::new();
//! auditor
//!     .add(
//!         "signup",
//!         [
//!             ("name", RuleSpec::text().required().max(40.0)),
//!             ("age", RuleSpec::unsigned().min(1.0).max(120.0)),
//!             ("email", RuleSpec::email().required()),
//!         ],
//!     )
//!     .unwrap();
//!
//! let age = auditor.check("signup", "age", "42").unwrap();
//! assert_eq!(age.status(), Status::Ok);
//! assert_eq!(age.val(), &FieldValue::Number(42.0));
//!
//! let email = auditor.check("signup", "email", "not-an-address").unwrap();
//! assert_eq!(email.errno(), 406);
//!
//! // Optional and absent: nothing to report.
//! assert!(auditor.check("signup", "age", "").is_none());
//! ```

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod check;
pub mod format;
mod pattern;
mod registry;
mod rule;
mod status;
mod transform;
mod value;

#[cfg(feature = "config")]
mod config;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

pub use check::{normalize_line_endings, CheckResult};
pub use format::UrlParts;
pub use pattern::{Pattern, PatternSpec};
pub use registry::Auditor;
pub use rule::{CompiledRule, RuleKey, RuleSpec, RuleType};
pub use status::Status;
pub use transform::{
    register_core_transforms, Transform, TransformRegistry, TransformRegistryBuilder,
};
pub use value::FieldValue;

/// Prelude module for convenient imports.
///
/// ```
/// use auditor::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Auditor, CheckResult, CompiledRule, FieldValue, PatternSpec, RuleError, RuleKey,
        RuleSpec, RuleType, Status, Transform, TransformRegistry, TransformRegistryBuilder,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum length, in bytes, of a `match` pattern.
///
/// Compilation cost grows with pattern size even with the linear-time `regex` crate,
/// and rule files are often assembled from less trusted sources than the code.
pub const MAX_PATTERN_LENGTH: usize = 4096;

/// Maximum number of entries in a `bit` rule.
///
/// The mask is folded into a `u64`, so values above 63 can never pass.
pub const MAX_BIT_FLAGS: usize = 64;

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors from rule registration.
///
/// These are raised when a rule is added, never when a value is checked. Fix the rule
/// definition and register it again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// The label was empty.
    #[error("label must be a non-empty string")]
    EmptyLabel,

    /// The field name was empty.
    #[error("field must be a non-empty string")]
    EmptyField,

    /// A rule definition was not a key/value mapping.
    #[error("rule must be an object, got {found}")]
    InvalidRuleSpec {
        /// Short description of what was supplied instead.
        found: String,
    },

    /// The `type` key was missing or named no known rule type.
    #[error("invalid rule type {found}; expected one of: {}", RuleType::NAMES.join(", "))]
    InvalidRuleType {
        /// The offending value, rendered for display (`null` when missing).
        found: String,
    },

    /// A key outside the closed set of rule keys.
    #[error("unknown rule: {key}")]
    UnknownRule {
        /// The unrecognized key.
        key: String,
    },

    /// A known rule key that the rule type does not accept (e.g. `bit` on `text`).
    #[error("rule `{key}` does not apply to `{rule_type}` fields")]
    RuleNotApplicable {
        /// The rule key.
        key: RuleKey,
        /// The rule type it was given for.
        rule_type: RuleType,
    },

    /// A rule key carried a value of the wrong kind or an unusable value.
    #[error("invalid rule: {key}: {reason}")]
    InvalidRuleValue {
        /// The rule key whose value was rejected.
        key: RuleKey,
        /// Why the value was rejected.
        reason: String,
    },

    /// A rule in a batch failed; wraps the underlying error with the field name.
    #[error("field \"{field}\": {source}")]
    Field {
        /// The field whose rule failed.
        field: String,
        /// The underlying registration error.
        #[source]
        source: Box<RuleError>,
    },
}

impl RuleError {
    /// Attach the field name to an error raised inside a batch registration.
    #[must_use]
    pub fn in_field(self, field: impl Into<String>) -> Self {
        Self::Field {
            field: field.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with any batch context stripped.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Field { source, .. } => source.root(),
            other => other,
        }
    }
}
