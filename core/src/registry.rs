//! `Auditor`: label → field → rule registry.
//!
//! Rules are compiled outside the lock and committed in one write, so a batch either
//! lands completely or not at all, and checks never observe a half-registered label.
//! Checks hold the read lock only long enough to clone an `Arc<CompiledRule>`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{CheckResult, CompiledRule, FieldValue, RuleError, RuleSpec};

type FieldRules = BTreeMap<String, Arc<CompiledRule>>;

/// A batch of compiled rules for one label, ready to commit.
pub(crate) type CompiledBatch = Vec<(String, CompiledRule)>;

/// Registry of validation rules, grouped by label.
///
/// `Send + Sync`: share it behind an `Arc` (or a `static`) and register or check from any
/// thread.
///
/// # Example
///
/// ```
/// use auditor::{Auditor, RuleSpec, Status};
///
/// let auditor = Auditor::new();
/// auditor.add_field("login", "user", RuleSpec::email().required()).unwrap();
///
/// let result = auditor.check("login", "user", "someone@example.com").unwrap();
/// assert_eq!(result.status(), Status::Ok);
/// assert!(auditor.check("login", "password", "hunter2").is_none());
/// ```
#[derive(Debug, Default)]
pub struct Auditor {
    rules: RwLock<HashMap<String, FieldRules>>,
}

impl Auditor {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Registration
    // ═══════════════════════════════════════════════════════════════════════════

    /// Register (or replace) the rule for one field.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::EmptyLabel`] or [`RuleError::EmptyField`] for empty names, or
    /// the error from [`RuleSpec::compile`] wrapped in [`RuleError::Field`] (use
    /// [`RuleError::root`] to match on the cause). On error the previous rule stays in
    /// place.
    pub fn add_field(&self, label: &str, field: &str, spec: RuleSpec) -> Result<(), RuleError> {
        self.add(label, [(field, spec)])
    }

    /// Register (or replace) the rules for several fields of one label.
    ///
    /// Atomic: every rule is compiled before any is committed. An empty batch registers
    /// nothing, not even the label.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::EmptyLabel`] or [`RuleError::EmptyField`] for empty names, or
    /// the first compile error wrapped in [`RuleError::Field`]. On error nothing is
    /// registered.
    pub fn add<I, K>(&self, label: &str, specs: I) -> Result<(), RuleError>
    where
        I: IntoIterator<Item = (K, RuleSpec)>,
        K: Into<String>,
    {
        if label.is_empty() {
            return Err(RuleError::EmptyLabel);
        }
        let batch = specs
            .into_iter()
            .map(|(field, spec)| {
                let field: String = field.into();
                if field.is_empty() {
                    return Err(RuleError::EmptyField);
                }
                match spec.compile() {
                    Ok(rule) => Ok((field, rule)),
                    Err(e) => Err(e.in_field(field)),
                }
            })
            .collect::<Result<CompiledBatch, _>>()?;

        self.commit(vec![(label.to_owned(), batch)]);
        Ok(())
    }

    /// Commit compiled batches in a single write.
    pub(crate) fn commit(&self, batches: Vec<(String, CompiledBatch)>) {
        let mut rules = self.write();
        for (label, batch) in batches {
            if batch.is_empty() {
                continue;
            }
            tracing::debug!(%label, fields = batch.len(), "registering rules");
            let fields = rules.entry(label).or_default();
            for (field, rule) in batch {
                fields.insert(field, Arc::new(rule));
            }
        }
    }

    /// Remove one field's rule. Returns `true` if it was registered.
    ///
    /// The label stays registered even when its last field is removed.
    pub fn remove_field(&self, label: &str, field: &str) -> bool {
        let removed = self
            .write()
            .get_mut(label)
            .is_some_and(|fields| fields.remove(field).is_some());
        if removed {
            tracing::debug!(label, field, "removed field rule");
        }
        removed
    }

    /// Remove a label and all its rules. Returns `true` if it was registered.
    pub fn remove(&self, label: &str) -> bool {
        let removed = self.write().remove(label).is_some();
        if removed {
            tracing::debug!(label, "removed label");
        }
        removed
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════════

    /// The fields registered under `label`, sorted. `None` if the label is unknown.
    #[must_use]
    pub fn fields(&self, label: &str) -> Option<Vec<String>> {
        self.read().get(label).map(|fields| fields.keys().cloned().collect())
    }

    /// The fields registered under `label`, as a set. `None` if the label is unknown.
    #[must_use]
    pub fn field_set(&self, label: &str) -> Option<BTreeSet<String>> {
        self.read().get(label).map(|fields| fields.keys().cloned().collect())
    }

    /// Every registered label, sorted.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.read().keys().cloned().collect();
        labels.sort_unstable();
        labels
    }

    /// Returns `true` if `field` has a rule under `label`.
    #[must_use]
    pub fn contains(&self, label: &str, field: &str) -> bool {
        self.read()
            .get(label)
            .is_some_and(|fields| fields.contains_key(field))
    }

    /// The compiled rule for one field.
    #[must_use]
    pub fn rule(&self, label: &str, field: &str) -> Option<Arc<CompiledRule>> {
        self.read().get(label)?.get(field).cloned()
    }

    /// Check a submitted value against the rule for `label`/`field`.
    ///
    /// Returns `None` if no such rule is registered, or if the field is optional and the
    /// value absent (see [`CompiledRule::check`]).
    #[must_use]
    pub fn check(
        &self,
        label: &str,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Option<CheckResult> {
        let rule = self.rule(label, field)?;
        rule.check(value)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, FieldRules>> {
        self.rules.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, FieldRules>> {
        self.rules.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RuleKey, RuleType, Status};

    fn signup() -> Auditor {
        let auditor = Auditor::new();
        auditor
            .add(
                "signup",
                [
                    ("name", RuleSpec::text().required().max(10.0)),
                    ("age", RuleSpec::unsigned().min(1.0).max(120.0)),
                ],
            )
            .unwrap();
        auditor
    }

    #[test]
    fn auditor_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Auditor>();
    }

    #[test]
    fn add_and_list_fields() {
        let auditor = signup();
        assert_eq!(
            auditor.fields("signup"),
            Some(vec!["age".to_string(), "name".to_string()])
        );
        assert_eq!(
            auditor.field_set("signup"),
            Some(BTreeSet::from(["age".to_string(), "name".to_string()]))
        );
        assert_eq!(auditor.fields("missing"), None);
        assert_eq!(auditor.field_set("missing"), None);
    }

    #[test]
    fn re_adding_a_field_replaces_it() {
        let auditor = signup();
        auditor
            .add_field("signup", "age", RuleSpec::signed())
            .unwrap();
        assert_eq!(auditor.fields("signup").unwrap().len(), 2);
        assert_eq!(
            auditor.rule("signup", "age").unwrap().rule_type(),
            RuleType::Signed
        );
    }

    #[test]
    fn empty_names_are_rejected() {
        let auditor = Auditor::new();
        assert_eq!(
            auditor.add_field("", "f", RuleSpec::text()),
            Err(RuleError::EmptyLabel)
        );
        assert_eq!(
            auditor.add_field("l", "", RuleSpec::text()),
            Err(RuleError::EmptyField)
        );
        assert!(auditor.labels().is_empty());
    }

    #[test]
    fn failed_batch_commits_nothing() {
        let auditor = signup();
        let err = auditor
            .add(
                "signup",
                [
                    ("name", RuleSpec::email()),
                    ("zip", RuleSpec::email().max(5.0)),
                ],
            )
            .unwrap_err();

        assert!(matches!(err, RuleError::Field { ref field, .. } if field == "zip"));
        assert_eq!(
            err.root(),
            &RuleError::RuleNotApplicable {
                key: RuleKey::Max,
                rule_type: RuleType::Email
            }
        );
        assert_eq!(
            auditor.rule("signup", "name").unwrap().rule_type(),
            RuleType::Text
        );
        assert!(!auditor.contains("signup", "zip"));
    }

    #[test]
    fn empty_batch_registers_nothing() {
        let auditor = Auditor::new();
        auditor
            .add("empty", Vec::<(String, RuleSpec)>::new())
            .unwrap();
        assert_eq!(auditor.fields("empty"), None);
        assert_eq!(auditor.field_set("empty"), None);
        assert!(auditor.labels().is_empty());
    }

    #[test]
    fn empty_batch_leaves_existing_label_alone() {
        let auditor = signup();
        auditor
            .add("signup", Vec::<(String, RuleSpec)>::new())
            .unwrap();
        assert_eq!(auditor.fields("signup").unwrap().len(), 2);
    }

    #[test]
    fn add_field_errors_name_the_field() {
        let auditor = Auditor::new();
        let err = auditor
            .add_field("l", "zip", RuleSpec::email().min(1.0))
            .unwrap_err();
        assert!(matches!(err, RuleError::Field { ref field, .. } if field == "zip"));
        assert_eq!(
            err.root(),
            &RuleError::RuleNotApplicable {
                key: RuleKey::Min,
                rule_type: RuleType::Email
            }
        );
        assert_eq!(auditor.fields("l"), None);
    }

    #[test]
    fn remove_field_keeps_label() {
        let auditor = signup();
        assert!(auditor.remove_field("signup", "age"));
        assert!(!auditor.remove_field("signup", "age"));
        assert!(auditor.remove_field("signup", "name"));
        assert_eq!(auditor.fields("signup"), Some(vec![]));
        assert!(!auditor.remove_field("missing", "x"));
    }

    #[test]
    fn remove_label() {
        let auditor = signup();
        assert!(auditor.remove("signup"));
        assert!(!auditor.remove("signup"));
        assert_eq!(auditor.fields("signup"), None);
        assert!(auditor.check("signup", "name", "x").is_none());
    }

    #[test]
    fn labels_are_sorted() {
        let auditor = Auditor::new();
        for label in ["b", "c", "a"] {
            auditor.add_field(label, "f", RuleSpec::text()).unwrap();
        }
        assert_eq!(auditor.labels(), vec!["a", "b", "c"]);
    }

    #[test]
    fn check_unknown_rule_is_none() {
        let auditor = signup();
        assert!(auditor.check("nope", "name", "x").is_none());
        assert!(auditor.check("signup", "nope", "x").is_none());
    }

    #[test]
    fn check_dispatches_to_rule() {
        let auditor = signup();
        let ok = auditor.check("signup", "age", "42").unwrap();
        assert_eq!(ok.val(), &FieldValue::Number(42.0));

        let missing = auditor.check("signup", "name", FieldValue::None).unwrap();
        assert_eq!(missing.status(), Status::NoContent);

        assert!(auditor.check("signup", "age", "").is_none());
    }

    #[test]
    fn rule_snapshot_survives_replacement() {
        let auditor = signup();
        let before = auditor.rule("signup", "name").unwrap();
        auditor
            .add_field("signup", "name", RuleSpec::text().max(1.0))
            .unwrap();
        assert_eq!(before.max(), Some(10.0));
        assert_eq!(auditor.rule("signup", "name").unwrap().max(), Some(1.0));
    }

    #[test]
    fn concurrent_checks_and_registration() {
        let auditor = Arc::new(signup());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let auditor = Arc::clone(&auditor);
                std::thread::spawn(move || {
                    let field = format!("extra{i}");
                    auditor
                        .add_field("signup", &field, RuleSpec::signed())
                        .unwrap();
                    for n in 0..100 {
                        let result = auditor.check("signup", "age", n + 1).unwrap();
                        assert!(result.is_ok());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(auditor.fields("signup").unwrap().len(), 6);
    }
}
