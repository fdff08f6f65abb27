//! Structured events emitted while a run progresses

use super::result::{Aggregate, ExecutionRecord};
use minitest::SchemaWarning;
use serde::Serialize;
use std::fmt;

/// A non-fatal problem found while running a suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuralWarning {
    /// The suite registered no constructor and is skipped
    MissingConstructor { suite: String },
    /// The suite's constructor failed; the suite is skipped
    ConstructorFailed { suite: String, reason: String },
    /// A data row's argument count differs from the unit's parameter count
    ParameterMismatch {
        suite: String,
        unit: String,
        expected: usize,
        found: usize,
    },
    /// The after-each hook failed; the unit's outcome stands
    TeardownFailed {
        suite: String,
        unit: String,
        reason: String,
    },
    /// More than one hook of a kind was registered
    DuplicateHook { suite: String, hook: String },
}

impl From<&SchemaWarning> for StructuralWarning {
    fn from(warning: &SchemaWarning) -> Self {
        match warning {
            SchemaWarning::DuplicateHook { suite, hook } => StructuralWarning::DuplicateHook {
                suite: suite.clone(),
                hook: hook.to_string(),
            },
        }
    }
}

impl fmt::Display for StructuralWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralWarning::MissingConstructor { suite } => write!(
                f,
                "Suite {} has no constructor registered. Skipping its tests.",
                suite
            ),
            StructuralWarning::ConstructorFailed { suite, reason } => write!(
                f,
                "Could not construct suite {}: {}. Skipping its tests.",
                suite, reason
            ),
            StructuralWarning::ParameterMismatch {
                suite,
                unit,
                expected,
                found,
            } => write!(
                f,
                "Parameter mismatch in test {}.{}. Expected {} parameters, got {}.",
                suite, unit, expected, found
            ),
            StructuralWarning::TeardownFailed {
                suite,
                unit,
                reason,
            } => write!(
                f,
                "After-each hook failed for test {}.{}: {}",
                suite, unit, reason
            ),
            StructuralWarning::DuplicateHook { suite, hook } => write!(
                f,
                "Suite {} declares more than one {} hook; only the first is used.",
                suite, hook
            ),
        }
    }
}

/// Everything a reporter can observe about a run.
///
/// Within a suite, `SuiteCompleted` always follows the events of every unit
/// that ran in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    ModuleLoaded {
        module: String,
        suites: usize,
    },
    LoadFailed {
        module: String,
        error: String,
    },
    SuiteStarted {
        suite: String,
        description: Option<String>,
    },
    UnitStarted {
        suite: String,
        unit: String,
        description: Option<String>,
        data_rows: usize,
    },
    UnitCompleted {
        record: ExecutionRecord,
    },
    /// Every execution of a unit has finished
    UnitFinished {
        suite: String,
        unit: String,
        description: Option<String>,
        aggregate: Aggregate,
    },
    Warning {
        warning: StructuralWarning,
    },
    SuiteCompleted {
        suite: String,
        aggregate: Aggregate,
    },
    ModuleCompleted {
        module: String,
        aggregate: Aggregate,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::result::Outcome;
    use minitest::HookKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parameter_mismatch_message() {
        let warning = StructuralWarning::ParameterMismatch {
            suite: "Calc".into(),
            unit: "Add".into(),
            expected: 2,
            found: 3,
        };
        assert_eq!(
            warning.to_string(),
            "Parameter mismatch in test Calc.Add. Expected 2 parameters, got 3."
        );
    }

    #[test]
    fn test_schema_warning_conversion_keeps_message() {
        let schema = SchemaWarning::DuplicateHook {
            suite: "S".into(),
            hook: HookKind::BeforeEach,
        };
        let warning = StructuralWarning::from(&schema);
        assert_eq!(warning.to_string(), schema.to_string());
    }

    #[test]
    fn test_event_json_shape() {
        let event = RunEvent::UnitCompleted {
            record: ExecutionRecord {
                suite: "Calc".into(),
                unit: "Add".into(),
                row: None,
                outcome: Outcome::failed("boom"),
            },
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "unit_completed",
                "record": {
                    "suite": "Calc",
                    "unit": "Add",
                    "row": null,
                    "outcome": { "status": "failed", "reason": "boom" }
                }
            })
        );
    }

    #[test]
    fn test_warning_json_shape() {
        let event = RunEvent::Warning {
            warning: StructuralWarning::MissingConstructor { suite: "S".into() },
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "warning",
                "warning": { "kind": "missing_constructor", "suite": "S" }
            })
        );
    }
}
