//! Test reporter - display run events

use super::event::{RunEvent, StructuralWarning};
use super::result::{Aggregate, ExecutionRecord, Outcome};
use colored::{Color, Colorize};
use serde_json::json;
use std::fmt::Display;
use std::io::Write;

/// Width of the summary box
pub const SUMMARY_WIDTH: usize = 80;

/// Label of the grand-total summary
pub const GRAND_TOTAL_LABEL: &str = "All modules";

/// Receives run events in the order they happen
pub trait Reporter {
    fn report(&mut self, event: &RunEvent);

    /// Called once after the last module with the grand total
    fn finish(&mut self, _total: &Aggregate) {}
}

/// Human-readable text output
pub struct ConsoleReporter<W> {
    out: W,
    /// Emit ANSI colors
    color: bool,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out, color: true }
    }

    /// Enable or disable colored output
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: impl Display) {
        // Write errors are ignored; the run continues without output.
        let _ = writeln!(self.out, "{}", text);
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn print_record(&mut self, record: &ExecutionRecord) {
        let indent = if record.row.is_some() { " > " } else { "" };
        match &record.outcome {
            Outcome::Passed => {
                let status = self.paint("[PASSED]", Color::Green);
                self.line(format_args!("{}{} {}", indent, status, record.display_name()));
            }
            Outcome::Failed { reason } => {
                let status = self.paint("[FAILED]", Color::Red);
                self.line(format_args!("{}{} {}", indent, status, record.display_name()));
                let pad = " ".repeat(indent.len());
                self.line(format_args!("{}REASON: {}", pad, reason));
            }
        }
    }

    fn print_warning(&mut self, warning: &StructuralWarning) {
        let tag = self.paint("[WARNING]", Color::Yellow);
        self.line(format_args!("{} {}", tag, warning));
    }

    fn print_summary(&mut self, label: &str, aggregate: &Aggregate) {
        for line in summary_lines(label, aggregate) {
            self.line(line);
        }
        self.line("");
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn report(&mut self, event: &RunEvent) {
        match event {
            RunEvent::ModuleLoaded { module, suites } => {
                self.line(format_args!("Loaded module {} ({} suites)", module, suites));
            }
            RunEvent::LoadFailed { error, .. } => {
                let tag = self.paint("[ERROR]", Color::Red);
                self.line(format_args!("{} {}", tag, error));
            }
            RunEvent::SuiteStarted { suite, description } => {
                if let Some(description) = description {
                    self.line(description);
                }
                self.line(format_args!("Running tests from suite {}...", suite));
            }
            RunEvent::UnitStarted {
                unit, data_rows, ..
            } => {
                if *data_rows > 0 {
                    self.line(unit);
                }
            }
            RunEvent::UnitCompleted { record } => self.print_record(record),
            RunEvent::UnitFinished { description, .. } => {
                if let Some(description) = description {
                    self.line(description);
                }
            }
            RunEvent::Warning { warning } => self.print_warning(warning),
            RunEvent::SuiteCompleted { suite, aggregate } => self.print_summary(suite, aggregate),
            RunEvent::ModuleCompleted { module, aggregate } => {
                self.print_summary(module, aggregate)
            }
        }
    }

    fn finish(&mut self, total: &Aggregate) {
        self.print_summary(GRAND_TOTAL_LABEL, total);
        let _ = self.out.flush();
    }
}

/// Center `text` in a field of `width` characters filled with `fill`
pub fn pad_center(text: &str, fill: char, width: usize) -> String {
    let len = text.chars().count();
    let padding = width.saturating_sub(len);
    let left = padding / 2;
    let right = padding - left;
    let mut padded = String::with_capacity(width.max(len));
    padded.extend(std::iter::repeat(fill).take(left));
    padded.push_str(text);
    padded.extend(std::iter::repeat(fill).take(right));
    padded
}

/// The boxed summary printed for a suite, a module, or the grand total
pub fn summary_lines(label: &str, aggregate: &Aggregate) -> Vec<String> {
    let boxed = |text: String| format!("|{}|", pad_center(&text, ' ', SUMMARY_WIDTH - 2));
    vec![
        pad_center(&format!(" {} ", label), '-', SUMMARY_WIDTH),
        boxed(format!(
            "Test passed: {} / {} ({:.2}%)",
            aggregate.passed,
            aggregate.total,
            aggregate.passed_percent()
        )),
        boxed(format!(
            "Test failed: {} / {} ({:.2}%)",
            aggregate.failed,
            aggregate.total,
            aggregate.failed_percent()
        )),
        "-".repeat(SUMMARY_WIDTH),
    ]
}

/// One JSON object per line for every event
pub struct JsonReporter<W> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, value: &impl serde::Serialize) {
        if serde_json::to_writer(&mut self.out, value).is_ok() {
            let _ = writeln!(self.out);
        }
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn report(&mut self, event: &RunEvent) {
        self.write_line(event);
    }

    fn finish(&mut self, total: &Aggregate) {
        self.write_line(&json!({
            "event": "run_completed",
            "aggregate": total,
        }));
        let _ = self.out.flush();
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<RunEvent>,
    finished: Option<Aggregate>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    /// Execution records in the order they completed
    pub fn records(&self) -> Vec<&ExecutionRecord> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RunEvent::UnitCompleted { record } => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<StructuralWarning> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RunEvent::Warning { warning } => Some(warning.clone()),
                _ => None,
            })
            .collect()
    }

    /// The grand total, once the run finished
    pub fn finished(&self) -> Option<Aggregate> {
        self.finished
    }
}

impl Reporter for EventLog {
    fn report(&mut self, event: &RunEvent) {
        self.events.push(event.clone());
    }

    fn finish(&mut self, total: &Aggregate) {
        self.finished = Some(*total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::result::RowRef;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn render(events: &[RunEvent]) -> String {
        let mut reporter = ConsoleReporter::new(Vec::new()).with_color(false);
        for event in events {
            reporter.report(event);
        }
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    fn record(unit: &str, row: Option<RowRef>, outcome: Outcome) -> RunEvent {
        RunEvent::UnitCompleted {
            record: ExecutionRecord {
                suite: "Calc".into(),
                unit: unit.into(),
                row,
                outcome,
            },
        }
    }

    #[rstest]
    #[case("ab", '-', 6, "--ab--")]
    #[case("abc", '-', 6, "-abc--")]
    #[case("toolong", '*', 4, "toolong")]
    #[case("", ' ', 3, "   ")]
    fn test_pad_center(
        #[case] text: &str,
        #[case] fill: char,
        #[case] width: usize,
        #[case] expected: &str,
    ) {
        assert_eq!(pad_center(text, fill, width), expected);
    }

    #[test]
    fn test_summary_of_empty_aggregate() {
        let lines = summary_lines("empty.so", &Aggregate::default());
        assert_eq!(lines.len(), 4);
        for line in &lines {
            assert_eq!(line.chars().count(), SUMMARY_WIDTH);
        }
        assert!(lines[0].contains(" empty.so "));
        assert!(lines[0].starts_with("-----"));
        assert!(lines[1].starts_with('|') && lines[1].ends_with('|'));
        assert!(lines[1].contains("Test passed: 0 / 0 (0.00%)"));
        assert!(lines[2].contains("Test failed: 0 / 0 (0.00%)"));
        assert_eq!(lines[3], "-".repeat(SUMMARY_WIDTH));
    }

    #[test]
    fn test_summary_percentages() {
        let aggregate = Aggregate {
            total: 3,
            passed: 2,
            failed: 1,
        };
        let lines = summary_lines("Calc", &aggregate);
        assert!(lines[1].contains("Test passed: 2 / 3 (66.67%)"));
        assert!(lines[2].contains("Test failed: 1 / 3 (33.33%)"));
    }

    #[test]
    fn test_single_unit_lines() {
        let output = render(&[
            record("Add", None, Outcome::Passed),
            record("Sub", None, Outcome::failed("Expected: 1. Actual: 2.")),
        ]);
        assert_eq!(
            output,
            "[PASSED] Add\n[FAILED] Sub\nREASON: Expected: 1. Actual: 2.\n"
        );
    }

    #[test]
    fn test_data_row_lines_prefixed_by_unit_name() {
        let output = render(&[
            RunEvent::UnitStarted {
                suite: "Calc".into(),
                unit: "Add".into(),
                description: None,
                data_rows: 2,
            },
            record(
                "Add",
                Some(RowRef {
                    index: 0,
                    label: Some("sum5".into()),
                }),
                Outcome::Passed,
            ),
            record(
                "Add",
                Some(RowRef {
                    index: 1,
                    label: None,
                }),
                Outcome::failed("nope"),
            ),
            RunEvent::UnitFinished {
                suite: "Calc".into(),
                unit: "Add".into(),
                description: Some("Adds numbers".into()),
                aggregate: Aggregate {
                    total: 2,
                    passed: 1,
                    failed: 1,
                },
            },
        ]);
        assert_eq!(
            output,
            "Add\n > [PASSED] sum5\n > [FAILED] Add\n   REASON: nope\nAdds numbers\n"
        );
    }

    #[test]
    fn test_suite_description_before_tests() {
        let output = render(&[RunEvent::SuiteStarted {
            suite: "Calc".into(),
            description: Some("Arithmetic".into()),
        }]);
        assert_eq!(output, "Arithmetic\nRunning tests from suite Calc...\n");
    }

    #[test]
    fn test_warning_line() {
        let output = render(&[RunEvent::Warning {
            warning: StructuralWarning::MissingConstructor {
                suite: "S".into(),
            },
        }]);
        assert_eq!(
            output,
            "[WARNING] Suite S has no constructor registered. Skipping its tests.\n"
        );
    }

    #[test]
    fn test_finish_prints_grand_total() {
        let mut reporter = ConsoleReporter::new(Vec::new()).with_color(false);
        reporter.finish(&Aggregate::default());
        let output = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(output.contains(" All modules "));
        assert!(output.contains("Test passed: 0 / 0 (0.00%)"));
    }

    #[test]
    fn test_json_reporter_writes_lines() {
        let mut reporter = JsonReporter::new(Vec::new());
        reporter.report(&RunEvent::SuiteStarted {
            suite: "Calc".into(),
            description: None,
        });
        reporter.finish(&Aggregate {
            total: 1,
            passed: 1,
            failed: 0,
        });
        let output = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "suite_started");
        assert_eq!(lines[0]["suite"], "Calc");
        assert_eq!(lines[1]["event"], "run_completed");
        assert_eq!(lines[1]["aggregate"]["passed"], 1);
    }

    #[test]
    fn test_event_log_collects() {
        let mut log = EventLog::new();
        log.report(&record("Add", None, Outcome::Passed));
        log.report(&RunEvent::Warning {
            warning: StructuralWarning::MissingConstructor {
                suite: "S".into(),
            },
        });
        log.finish(&Aggregate::default());
        assert_eq!(log.events().len(), 2);
        assert_eq!(log.records().len(), 1);
        assert_eq!(log.warnings().len(), 1);
        assert_eq!(log.finished(), Some(Aggregate::default()));
    }
}
