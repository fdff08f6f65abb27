//! Execution records and result aggregates

use serde::Serialize;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Outcome of one execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed { reason: String },
}

impl Outcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Outcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Passed => None,
            Outcome::Failed { reason } => Some(reason),
        }
    }
}

/// Which data row an execution used
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRef {
    /// Position of the row in declaration order
    pub index: usize,
    pub label: Option<String>,
}

/// One (unit, data row) execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionRecord {
    pub suite: String,
    pub unit: String,
    /// `None` when the unit declares no data rows
    pub row: Option<RowRef>,
    pub outcome: Outcome,
}

impl ExecutionRecord {
    /// Label shown for this execution: the row label, else the unit name
    pub fn display_name(&self) -> &str {
        self.row
            .as_ref()
            .and_then(|row| row.label.as_deref())
            .unwrap_or(&self.unit)
    }
}

/// Additive (total, passed, failed) counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Aggregate {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl Aggregate {
    /// Count one outcome
    pub fn record(&mut self, outcome: &Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Passed => self.passed += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn passed_percent(&self) -> f64 {
        percent(self.passed, self.total)
    }

    pub fn failed_percent(&self) -> f64 {
        percent(self.failed, self.total)
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

impl Add for Aggregate {
    type Output = Aggregate;

    fn add(self, other: Aggregate) -> Aggregate {
        Aggregate {
            total: self.total + other.total,
            passed: self.passed + other.passed,
            failed: self.failed + other.failed,
        }
    }
}

impl AddAssign for Aggregate {
    fn add_assign(&mut self, other: Aggregate) {
        *self = *self + other;
    }
}

impl Sum for Aggregate {
    fn sum<I: Iterator<Item = Aggregate>>(iter: I) -> Aggregate {
        iter.fold(Aggregate::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_record_counts() {
        let mut agg = Aggregate::default();
        agg.record(&Outcome::Passed);
        agg.record(&Outcome::failed("nope"));
        agg.record(&Outcome::Passed);
        assert_eq!(
            agg,
            Aggregate {
                total: 3,
                passed: 2,
                failed: 1
            }
        );
        assert!(agg.has_failures());
    }

    #[test]
    fn test_percent_of_empty_is_zero() {
        let agg = Aggregate::default();
        assert_eq!(agg.passed_percent(), 0.0);
        assert_eq!(agg.failed_percent(), 0.0);
    }

    #[test]
    fn test_percent() {
        let agg = Aggregate {
            total: 4,
            passed: 1,
            failed: 3,
        };
        assert_eq!(agg.passed_percent(), 25.0);
        assert_eq!(agg.failed_percent(), 75.0);
    }

    #[test]
    fn test_display_name_prefers_label() {
        let mut record = ExecutionRecord {
            suite: "S".into(),
            unit: "Add".into(),
            row: Some(RowRef {
                index: 0,
                label: Some("sum5".into()),
            }),
            outcome: Outcome::Passed,
        };
        assert_eq!(record.display_name(), "sum5");
        record.row = Some(RowRef {
            index: 1,
            label: None,
        });
        assert_eq!(record.display_name(), "Add");
        record.row = None;
        assert_eq!(record.display_name(), "Add");
    }

    proptest! {
        #[test]
        fn prop_total_is_passed_plus_failed(outcomes in prop::collection::vec(any::<bool>(), 0..64)) {
            let mut agg = Aggregate::default();
            for passed in &outcomes {
                let outcome = if *passed { Outcome::Passed } else { Outcome::failed("x") };
                agg.record(&outcome);
            }
            prop_assert_eq!(agg.total, agg.passed + agg.failed);
            prop_assert_eq!(agg.total, outcomes.len());
        }

        #[test]
        fn prop_sum_is_additive(parts in prop::collection::vec((0usize..100, 0usize..100), 0..16)) {
            let aggregates: Vec<Aggregate> = parts
                .iter()
                .map(|&(passed, failed)| Aggregate { total: passed + failed, passed, failed })
                .collect();
            let grand: Aggregate = aggregates.iter().copied().sum();
            prop_assert_eq!(grand.total, aggregates.iter().map(|a| a.total).sum::<usize>());
            prop_assert_eq!(grand.total, grand.passed + grand.failed);
        }
    }
}
