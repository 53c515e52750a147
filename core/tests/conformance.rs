//! Conformance tests that run YAML fixtures against the auditor
//!
//! Each fixture registers rules for one label from a rule document, then checks values
//! and compares the errno and the reported value.

#![cfg(feature = "config")]

use auditor::prelude::*;
use auditor::register_core_transforms;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// A complete test fixture
#[derive(Debug, Deserialize)]
struct Fixture {
    name: String,
    #[allow(dead_code)]
    description: String,
    label: String,
    rules: Value,
    cases: Vec<TestCase>,
}

/// Test case: one value for one field
#[derive(Debug, Deserialize)]
struct TestCase {
    name: String,
    field: String,
    #[serde(default)]
    value: Value,
    /// `None` means the check must report nothing.
    expect: Option<Expect>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Expect {
    errno: u16,
    /// Checked only when given.
    #[serde(default)]
    val: Option<Value>,
}

/// Result of running a single test case
#[derive(Debug)]
struct CaseResult {
    case_name: String,
    passed: bool,
    expected: Option<Expect>,
    actual: Option<(u16, Value)>,
}

impl Fixture {
    /// Parse multiple fixtures from a YAML file with `---` separators
    fn from_yaml_multi(yaml: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        let mut fixtures = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(yaml) {
            fixtures.push(Self::deserialize(doc)?);
        }
        Ok(fixtures)
    }

    fn build(&self) -> Auditor {
        let transforms = register_core_transforms(TransformRegistryBuilder::new()).build();
        let auditor = Auditor::new();
        let mut document = serde_json::Map::new();
        document.insert(self.label.clone(), self.rules.clone());
        auditor
            .load_rules(&Value::Object(document), &transforms)
            .unwrap_or_else(|e| panic!("fixture '{}' rules failed to load: {e}", self.name));
        auditor
    }

    /// Run all test cases and return results
    fn run(self) -> Vec<CaseResult> {
        let auditor = self.build();
        self.cases
            .into_iter()
            .map(|case| {
                let value = FieldValue::from_json(&case.value)
                    .unwrap_or_else(|| panic!("case '{}': value must be a scalar", case.name));
                let actual = auditor
                    .check(&self.label, &case.field, value)
                    .map(|result| {
                        let val = serde_json::to_value(result.val()).expect("serialize val");
                        (result.errno(), val)
                    });
                let passed = match (&case.expect, &actual) {
                    (None, None) => true,
                    (Some(expect), Some((errno, val))) => {
                        expect.errno == *errno && expect.val.as_ref().map_or(true, |v| v == val)
                    }
                    _ => false,
                };
                CaseResult {
                    case_name: case.name,
                    passed,
                    expected: case.expect,
                    actual,
                }
            })
            .collect()
    }
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn run_fixture_file(file: &str) {
    let path = fixtures_dir().join(file);
    let yaml = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));

    let fixtures = Fixture::from_yaml_multi(&yaml).unwrap_or_else(|e| {
        panic!("Failed to parse {}: {}", path.display(), e);
    });
    assert!(!fixtures.is_empty(), "{} has no fixtures", path.display());

    for fixture in fixtures {
        println!("  Running: {}", fixture.name);
        let name = fixture.name.clone();
        for result in fixture.run() {
            assert!(
                result.passed,
                "Fixture '{}' case '{}' failed: expected {:?}, got {:?}",
                name, result.case_name, result.expected, result.actual
            );
        }
    }
}

#[test]
fn text_rules() {
    run_fixture_file("text.yaml");
}

#[test]
fn numeric_rules() {
    run_fixture_file("numeric.yaml");
}

#[test]
fn email_rules() {
    run_fixture_file("email.yaml");
}

#[test]
fn url_rules() {
    run_fixture_file("url.yaml");
}

#[test]
fn date_rules() {
    run_fixture_file("date.yaml");
}

#[test]
fn required_and_transforms() {
    run_fixture_file("required.yaml");
}
