//! Test runner - execute discovered suites
//!
//! Everything runs sequentially: modules in argument order, suites in
//! registration order, units in (priority, name) order, data rows in
//! declaration order. One suite instance is shared by all of a suite's
//! executions.
//!
//! Per execution the runner:
//!
//! 1. fails the execution with "parameter mismatch" when the data row's
//!    argument count differs from the body's parameter count (no hooks run),
//! 2. runs before-each; if it fails the body is skipped,
//! 3. runs the body,
//! 4. always runs after-each; a failure there is only a warning.

use super::discovery::{discover_suites, discover_units, filter_units, Suite, Unit};
use super::event::{RunEvent, StructuralWarning};
use super::reporter::Reporter;
use super::result::{Aggregate, ExecutionRecord, Outcome, RowRef};
use crate::loader::{LoadError, ModuleHandle, ModuleLoader};
use minitest::invoke::Hook;
use minitest::{DataRow, InvocationError};
use std::any::Any;
use std::path::{Path, PathBuf};

/// Reason recorded when a data row does not fit the unit's parameters
pub const PARAMETER_MISMATCH: &str = "parameter mismatch";

/// Test runner with configuration
pub struct TestRunner<L> {
    loader: L,
    /// Only units whose name contains this pattern run
    filter: Option<String>,
}

impl<L: ModuleLoader> TestRunner<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            filter: None,
        }
    }

    /// Restrict execution to units whose name contains `pattern`
    pub fn with_filter(mut self, pattern: Option<String>) -> Self {
        self.filter = pattern;
        self
    }

    /// Run every module in order and return the grand total.
    ///
    /// A module that fails to load is reported and skipped; it contributes
    /// nothing to the total.
    pub fn run(&self, paths: &[PathBuf], reporter: &mut dyn Reporter) -> Aggregate {
        let mut total = Aggregate::default();
        for path in paths {
            match self.run_module(path, reporter) {
                Ok(aggregate) => total += aggregate,
                Err(err) => {
                    tracing::warn!(module = %path.display(), error = %err, "module failed to load");
                    reporter.report(&RunEvent::LoadFailed {
                        module: path.display().to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }
        reporter.finish(&total);
        total
    }

    /// Load, run, and unload one module
    pub fn run_module(
        &self,
        path: &Path,
        reporter: &mut dyn Reporter,
    ) -> Result<Aggregate, LoadError> {
        let handle = self.loader.load(path)?;
        Ok(self.run_loaded(handle, reporter))
    }

    /// Run an already loaded module, then unload it
    pub fn run_loaded(&self, handle: ModuleHandle, reporter: &mut dyn Reporter) -> Aggregate {
        let module = handle.name();
        let mut aggregate = Aggregate::default();
        {
            let suites = discover_suites(&handle);
            tracing::debug!(module = %module, suites = suites.len(), "running module");
            reporter.report(&RunEvent::ModuleLoaded {
                module: module.clone(),
                suites: suites.len(),
            });
            for suite in &suites {
                aggregate += self.run_suite(suite, reporter);
            }
        }
        reporter.report(&RunEvent::ModuleCompleted { module, aggregate });
        handle.unload();
        aggregate
    }

    /// Instantiate a suite once and run each of its units against it.
    ///
    /// A suite that cannot be instantiated is skipped with a warning and
    /// contributes nothing.
    pub fn run_suite(&self, suite: &Suite<'_>, reporter: &mut dyn Reporter) -> Aggregate {
        reporter.report(&RunEvent::SuiteStarted {
            suite: suite.name().to_string(),
            description: suite.description().map(str::to_string),
        });
        for warning in suite.warnings() {
            warn(reporter, warning.clone());
        }

        let Some(constructor) = suite.constructor() else {
            return Aggregate::default();
        };
        let mut instance = match constructor.construct() {
            Ok(instance) => instance,
            Err(err) => {
                warn(
                    reporter,
                    StructuralWarning::ConstructorFailed {
                        suite: suite.name().to_string(),
                        reason: err.to_string(),
                    },
                );
                return Aggregate::default();
            }
        };

        let mut units = discover_units(suite);
        if let Some(pattern) = &self.filter {
            units = filter_units(units, pattern);
        }
        tracing::debug!(suite = suite.name(), units = units.len(), "running suite");

        let before_each = suite.def().before_each();
        let after_each = suite.def().after_each();
        let mut aggregate = Aggregate::default();
        for unit in &units {
            reporter.report(&RunEvent::UnitStarted {
                suite: suite.name().to_string(),
                unit: unit.name().to_string(),
                description: unit.description().map(str::to_string),
                data_rows: unit.data_rows().len(),
            });

            let mut unit_aggregate = Aggregate::default();
            if unit.data_rows().is_empty() {
                let record = run_unit(
                    suite.name(),
                    instance.as_mut(),
                    before_each,
                    unit,
                    after_each,
                    None,
                    reporter,
                );
                unit_aggregate.record(&record.outcome);
            } else {
                for (index, row) in unit.data_rows().iter().enumerate() {
                    let record = run_unit(
                        suite.name(),
                        instance.as_mut(),
                        before_each,
                        unit,
                        after_each,
                        Some((index, row)),
                        reporter,
                    );
                    unit_aggregate.record(&record.outcome);
                }
            }

            reporter.report(&RunEvent::UnitFinished {
                suite: suite.name().to_string(),
                unit: unit.name().to_string(),
                description: unit.description().map(str::to_string),
                aggregate: unit_aggregate,
            });
            aggregate += unit_aggregate;
        }

        reporter.report(&RunEvent::SuiteCompleted {
            suite: suite.name().to_string(),
            aggregate,
        });
        aggregate
    }
}

/// Run one execution of `unit` against `instance` and report it
pub fn run_unit(
    suite: &str,
    instance: &mut dyn Any,
    before_each: Option<&Hook>,
    unit: &Unit<'_>,
    after_each: Option<&Hook>,
    row: Option<(usize, &DataRow)>,
    reporter: &mut dyn Reporter,
) -> ExecutionRecord {
    let args = row.map(|(_, row)| row.values()).unwrap_or_default();
    let mut record = ExecutionRecord {
        suite: suite.to_string(),
        unit: unit.name().to_string(),
        row: row.map(|(index, row)| RowRef {
            index,
            label: row.label_text().map(str::to_string),
        }),
        outcome: Outcome::Passed,
    };

    if args.len() != unit.param_count() {
        warn(
            reporter,
            StructuralWarning::ParameterMismatch {
                suite: suite.to_string(),
                unit: unit.name().to_string(),
                expected: unit.param_count(),
                found: args.len(),
            },
        );
        record.outcome = Outcome::failed(PARAMETER_MISMATCH);
        reporter.report(&RunEvent::UnitCompleted {
            record: record.clone(),
        });
        return record;
    }

    let setup = match before_each {
        Some(hook) => guarded(|| hook.invoke(&mut *instance)),
        None => Ok(()),
    };
    record.outcome = match setup {
        Err(reason) => Outcome::failed(format!("Before-each hook failed: {}", reason)),
        Ok(()) => match guarded(|| unit.def().body().invoke(&mut *instance, args)) {
            Ok(()) => Outcome::Passed,
            Err(reason) => Outcome::failed(reason),
        },
    };

    let teardown = match after_each {
        Some(hook) => guarded(|| hook.invoke(&mut *instance)),
        None => Ok(()),
    };

    reporter.report(&RunEvent::UnitCompleted {
        record: record.clone(),
    });
    if let Err(reason) = teardown {
        warn(
            reporter,
            StructuralWarning::TeardownFailed {
                suite: suite.to_string(),
                unit: unit.name().to_string(),
                reason,
            },
        );
    }
    record
}

/// Invoke test code, turning its error into a failure reason.
///
/// Panics have already been converted to `InvocationError::Panicked` by the
/// module's copy of `minitest`.
fn guarded<F>(invoke: F) -> Result<(), String>
where
    F: FnOnce() -> Result<(), InvocationError>,
{
    invoke().map_err(|err| err.reason())
}

fn warn(reporter: &mut dyn Reporter, warning: StructuralWarning) {
    tracing::info!(%warning, "structural warning");
    reporter.report(&RunEvent::Warning { warning });
}
