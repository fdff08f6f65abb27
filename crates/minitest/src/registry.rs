//! Suite registry and builders
//!
//! A test module describes itself by populating a `ModuleBuilder` from its
//! registration function. Registration records markers only: suites, units,
//! data rows, priorities, descriptions, and hooks. Nothing registered here is
//! executed until the runner asks for it.
//!
//! # Examples
//!
//! ```
//! use minitest::{assert, row, ModuleBuilder, SuiteBuilder, UnitBuilder};
//!
//! #[derive(Default)]
//! struct CalculatorTests;
//!
//! let mut module = ModuleBuilder::new();
//! module.suite(
//!     SuiteBuilder::<CalculatorTests>::default_constructed()
//!         .description("Arithmetic checks")
//!         .unit(
//!             UnitBuilder::new("Add", |_: &mut CalculatorTests, a: i64, b: i64| {
//!                 assert::are_equal(5, a + b, "")
//!             })
//!             .data_row(row![2, 3; "sum5"])
//!             .data_row(row![1, 1; "sum2"]),
//!         ),
//! );
//!
//! let module = module.build();
//! assert_eq!(module.suites()[0].units()[0].data_rows().len(), 2);
//! ```

use crate::invoke::{BoxError, Body, Constructor, Hook, IntoTestResult, UnitFn};
use crate::value::Value;
use std::fmt;
use std::marker::PhantomData;

/// One parameterization of a test unit
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataRow {
    values: Vec<Value>,
    label: Option<String>,
}

impl DataRow {
    /// Create a data row from its argument values
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            label: None,
        }
    }

    /// Attach a display label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Argument values in declaration order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Optional display label
    pub fn label_text(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Build a `DataRow` from literals, with an optional label after `;`
///
/// ```
/// use minitest::{row, Value};
///
/// let r = row![1, "two", 3.0; "mixed"];
/// assert_eq!(r.values()[1], Value::Str("two".into()));
/// assert_eq!(r.label_text(), Some("mixed"));
/// assert!(row![].values().is_empty());
/// ```
#[macro_export]
macro_rules! row {
    ($($value:expr),* $(,)?) => {
        $crate::DataRow::new(vec![$($crate::Value::from($value)),*])
    };
    ($($value:expr),* ; $label:expr) => {
        $crate::DataRow::new(vec![$($crate::Value::from($value)),*]).label($label)
    };
}

/// Which per-unit lifecycle hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    BeforeEach,
    AfterEach,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::BeforeEach => write!(f, "before-each"),
            HookKind::AfterEach => write!(f, "after-each"),
        }
    }
}

/// Problems noticed while registering a suite
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaWarning {
    /// A second hook of the same kind was registered; the first one is kept
    DuplicateHook { suite: String, hook: HookKind },
}

impl fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaWarning::DuplicateHook { suite, hook } => write!(
                f,
                "Suite {} declares more than one {} hook; only the first is used.",
                suite, hook
            ),
        }
    }
}

/// A registered test unit
#[derive(Debug)]
pub struct UnitDef {
    name: String,
    priority: i32,
    description: Option<String>,
    data_rows: Vec<DataRow>,
    body: Body,
}

impl UnitDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective priority (0 unless a priority marker was given)
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Data rows in declaration order
    pub fn data_rows(&self) -> &[DataRow] {
        &self.data_rows
    }

    /// Declared parameter count of the body
    pub fn param_count(&self) -> usize {
        self.body.arity()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}

/// A registered test suite
#[derive(Debug)]
pub struct SuiteDef {
    name: String,
    description: Option<String>,
    constructor: Option<Constructor>,
    before_each: Option<Hook>,
    after_each: Option<Hook>,
    units: Vec<UnitDef>,
    warnings: Vec<SchemaWarning>,
}

impl SuiteDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The no-argument constructor, if one was registered
    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    pub fn before_each(&self) -> Option<&Hook> {
        self.before_each.as_ref()
    }

    pub fn after_each(&self) -> Option<&Hook> {
        self.after_each.as_ref()
    }

    /// Units in registration order
    pub fn units(&self) -> &[UnitDef] {
        &self.units
    }

    pub fn warnings(&self) -> &[SchemaWarning] {
        &self.warnings
    }
}

/// The complete registry of one test module
#[derive(Debug, Default)]
pub struct ModuleDef {
    suites: Vec<SuiteDef>,
}

impl ModuleDef {
    /// Suites in registration order
    pub fn suites(&self) -> &[SuiteDef] {
        &self.suites
    }
}

/// Collects suites while a module registers itself
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    suites: Vec<SuiteDef>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a suite (the suite marker)
    pub fn suite<S: 'static>(&mut self, suite: SuiteBuilder<S>) -> &mut Self {
        self.suites.push(suite.build());
        self
    }

    pub fn build(self) -> ModuleDef {
        ModuleDef {
            suites: self.suites,
        }
    }
}

/// Builder for a suite whose instances have type `S`
pub struct SuiteBuilder<S: 'static> {
    name: String,
    description: Option<String>,
    constructor: Option<Constructor>,
    before_each: Option<Hook>,
    after_each: Option<Hook>,
    units: Vec<UnitDef>,
    warnings: Vec<SchemaWarning>,
    _suite: PhantomData<fn() -> S>,
}

impl<S: 'static> SuiteBuilder<S> {
    /// A suite named after `S` with no constructor registered.
    ///
    /// Such a suite is discovered but skipped with a warning until a
    /// constructor is supplied.
    pub fn new() -> Self {
        Self {
            name: std::any::type_name::<S>().to_string(),
            description: None,
            constructor: None,
            before_each: None,
            after_each: None,
            units: Vec::new(),
            warnings: Vec::new(),
            _suite: PhantomData,
        }
    }

    /// A suite constructed with `S::default()`
    pub fn default_constructed() -> Self
    where
        S: Default,
    {
        Self::new().constructor(S::default)
    }

    /// Register an infallible no-argument constructor
    pub fn constructor<F>(self, constructor: F) -> Self
    where
        F: Fn() -> S + 'static,
    {
        self.try_constructor(move || Ok::<S, BoxError>(constructor()))
    }

    /// Register a no-argument constructor that may fail
    pub fn try_constructor<F, E>(mut self, constructor: F) -> Self
    where
        F: Fn() -> Result<S, E> + 'static,
        E: Into<BoxError>,
    {
        self.constructor = Some(Constructor::new(constructor));
        self
    }

    /// Override the suite name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Register the before-each hook
    pub fn before_each<F, R>(mut self, hook: F) -> Self
    where
        F: Fn(&mut S) -> R + 'static,
        R: IntoTestResult,
    {
        if self.before_each.is_some() {
            self.duplicate(HookKind::BeforeEach);
        } else {
            self.before_each = Some(Hook::new(hook));
        }
        self
    }

    /// Register the after-each hook
    pub fn after_each<F, R>(mut self, hook: F) -> Self
    where
        F: Fn(&mut S) -> R + 'static,
        R: IntoTestResult,
    {
        if self.after_each.is_some() {
            self.duplicate(HookKind::AfterEach);
        } else {
            self.after_each = Some(Hook::new(hook));
        }
        self
    }

    /// Register a test unit
    pub fn unit(mut self, unit: UnitBuilder<S>) -> Self {
        self.units.push(unit.build());
        self
    }

    fn duplicate(&mut self, hook: HookKind) {
        self.warnings.push(SchemaWarning::DuplicateHook {
            suite: self.name.clone(),
            hook,
        });
    }

    fn build(self) -> SuiteDef {
        SuiteDef {
            name: self.name,
            description: self.description,
            constructor: self.constructor,
            before_each: self.before_each,
            after_each: self.after_each,
            units: self.units,
            warnings: self.warnings,
        }
    }
}

impl<S: 'static> Default for SuiteBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one test unit of suite type `S`
pub struct UnitBuilder<S: 'static> {
    name: String,
    priority: i32,
    description: Option<String>,
    data_rows: Vec<DataRow>,
    body: Body,
    _suite: PhantomData<fn() -> S>,
}

impl<S: 'static> UnitBuilder<S> {
    /// A unit running `body` (the unit marker)
    pub fn new<Args, F: UnitFn<S, Args>>(name: impl Into<String>, body: F) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            description: None,
            data_rows: Vec::new(),
            body: Body::new(body),
            _suite: PhantomData,
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a data row; rows run in the order they are added
    pub fn data_row(mut self, row: DataRow) -> Self {
        self.data_rows.push(row);
        self
    }

    fn build(self) -> UnitDef {
        UnitDef {
            name: self.name,
            priority: self.priority,
            description: self.description,
            data_rows: self.data_rows,
            body: self.body,
        }
    }
}
