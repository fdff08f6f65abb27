//! Test running infrastructure
//!
//! Discovery reads a loaded module's registry, the runner executes it, and
//! reporters render the events the runner emits.

pub mod discovery;
pub mod event;
pub mod reporter;
pub mod result;
pub mod runner;

pub use discovery::{discover_suites, discover_units, Suite, Unit};
pub use event::{RunEvent, StructuralWarning};
pub use reporter::{ConsoleReporter, EventLog, JsonReporter, Reporter};
pub use result::{Aggregate, ExecutionRecord, Outcome};
pub use runner::{run_unit, TestRunner};
