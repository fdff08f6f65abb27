//! MiniTest authoring crate
//!
//! Test modules depend on this crate to describe their suites. Rust has no
//! runtime attributes to scan, so a module registers its metadata explicitly:
//!
//! - `SuiteBuilder` - suite marker, constructor, description, hooks
//! - `UnitBuilder` - unit marker, priority, description, data rows
//! - `row!` / `DataRow` - literal arguments plus an optional label
//! - `assert` - assertion primitives for use inside bodies
//! - `minitest_module!` - exports the registry from a `cdylib`
//!
//! The runner (`minitest-cli`) loads the module, reads the registry, and
//! executes it.

pub mod assert;
pub mod export;
pub mod invoke;
pub mod registry;
pub mod value;

pub use assert::AssertionError;
pub use invoke::{BoxError, Instance, IntoTestResult, InvocationError, UnitFn};
pub use registry::{
    DataRow, HookKind, ModuleBuilder, ModuleDef, SchemaWarning, SuiteBuilder, SuiteDef,
    UnitBuilder, UnitDef,
};
pub use value::{ConversionError, FromValue, Value};
