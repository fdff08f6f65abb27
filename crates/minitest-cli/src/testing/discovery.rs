//! Suite and unit discovery
//!
//! Discovery only reads a module's registry. Descriptors borrow the
//! `ModuleHandle`, so none of them can outlive the module they came from.

use super::event::StructuralWarning;
use crate::loader::ModuleHandle;
use minitest::invoke::Constructor;
use minitest::{DataRow, ModuleDef, SuiteDef, UnitDef};

/// A discovered test suite
#[derive(Debug, Clone)]
pub struct Suite<'m> {
    def: &'m SuiteDef,
    warnings: Vec<StructuralWarning>,
}

impl<'m> Suite<'m> {
    fn new(def: &'m SuiteDef) -> Self {
        let mut warnings: Vec<StructuralWarning> =
            def.warnings().iter().map(StructuralWarning::from).collect();
        if def.constructor().is_none() {
            warnings.push(StructuralWarning::MissingConstructor {
                suite: def.name().to_string(),
            });
        }
        Self { def, warnings }
    }

    pub fn name(&self) -> &'m str {
        self.def.name()
    }

    pub fn description(&self) -> Option<&'m str> {
        self.def.description()
    }

    pub fn def(&self) -> &'m SuiteDef {
        self.def
    }

    /// How to instantiate the suite; `None` means it cannot run
    pub fn constructor(&self) -> Option<&'m Constructor> {
        self.def.constructor()
    }

    /// Warnings found while inspecting the suite
    pub fn warnings(&self) -> &[StructuralWarning] {
        &self.warnings
    }
}

/// A discovered test unit
#[derive(Debug, Clone, Copy)]
pub struct Unit<'m> {
    def: &'m UnitDef,
}

impl<'m> Unit<'m> {
    pub fn name(&self) -> &'m str {
        self.def.name()
    }

    pub fn priority(&self) -> i32 {
        self.def.priority()
    }

    pub fn description(&self) -> Option<&'m str> {
        self.def.description()
    }

    pub fn param_count(&self) -> usize {
        self.def.param_count()
    }

    /// Data rows in declaration order
    pub fn data_rows(&self) -> &'m [DataRow] {
        self.def.data_rows()
    }

    pub fn def(&self) -> &'m UnitDef {
        self.def
    }

    /// Number of executions this unit produces
    pub fn execution_count(&self) -> usize {
        self.data_rows().len().max(1)
    }
}

/// Suites of a loaded module, in registration order
pub fn discover_suites(handle: &ModuleHandle) -> Vec<Suite<'_>> {
    suites_in(handle.module())
}

/// Suites of a registry, in registration order
pub fn suites_in(module: &ModuleDef) -> Vec<Suite<'_>> {
    module.suites().iter().map(Suite::new).collect()
}

/// Units of a suite sorted by (priority, name)
pub fn discover_units<'m>(suite: &Suite<'m>) -> Vec<Unit<'m>> {
    let mut units: Vec<Unit<'m>> = suite.def.units().iter().map(|def| Unit { def }).collect();
    units.sort_by(|a, b| {
        a.priority()
            .cmp(&b.priority())
            .then_with(|| a.name().cmp(b.name()))
    });
    units
}

/// Keep units whose name contains `pattern`
pub fn filter_units<'m>(units: Vec<Unit<'m>>, pattern: &str) -> Vec<Unit<'m>> {
    units
        .into_iter()
        .filter(|unit| unit.name().contains(pattern))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use minitest::{row, ModuleBuilder, SuiteBuilder, UnitBuilder};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[derive(Default)]
    struct Plain;

    struct NoCtor;

    fn sample() -> ModuleDef {
        let mut module = ModuleBuilder::new();
        module
            .suite(
                SuiteBuilder::<Plain>::default_constructed()
                    .named("Ordered")
                    .description("ordering")
                    .unit(UnitBuilder::new("b", |_: &mut Plain| {}))
                    .unit(UnitBuilder::new("a", |_: &mut Plain| {}).priority(1))
                    .unit(UnitBuilder::new("c", |_: &mut Plain| {}).priority(-1))
                    .unit(UnitBuilder::new("a", |_: &mut Plain| {}))
                    .unit(
                        UnitBuilder::new("rows", |_: &mut Plain, _x: i64| {})
                            .data_row(row![1])
                            .data_row(row![2]),
                    ),
            )
            .suite(
                SuiteBuilder::<NoCtor>::new()
                    .named("Skipped")
                    .unit(UnitBuilder::new("never", |_: &mut NoCtor| {})),
            );
        module.build()
    }

    #[test]
    fn test_suites_in_registration_order() {
        let module = sample();
        let suites = suites_in(&module);
        let names: Vec<_> = suites.iter().map(Suite::name).collect();
        assert_eq!(names, vec!["Ordered", "Skipped"]);
        assert_eq!(suites[0].description(), Some("ordering"));
    }

    #[test]
    fn test_units_sorted_by_priority_then_name() {
        let module = sample();
        let suites = suites_in(&module);
        let units = discover_units(&suites[0]);
        let keys: Vec<_> = units.iter().map(|u| (u.priority(), u.name())).collect();
        assert_eq!(
            keys,
            vec![(-1, "c"), (0, "a"), (0, "b"), (0, "rows"), (1, "a")]
        );
    }

    #[test]
    fn test_missing_constructor_warns() {
        let module = sample();
        let suites = suites_in(&module);
        assert!(suites[0].constructor().is_some());
        assert!(suites[0].warnings().is_empty());
        assert!(suites[1].constructor().is_none());
        assert_eq!(
            suites[1].warnings(),
            &[StructuralWarning::MissingConstructor {
                suite: "Skipped".into()
            }]
        );
    }

    #[test]
    fn test_duplicate_hook_surfaces_as_warning() {
        let mut module = ModuleBuilder::new();
        module.suite(
            SuiteBuilder::<Plain>::default_constructed()
                .named("Hooks")
                .after_each(|_: &mut Plain| {})
                .after_each(|_: &mut Plain| {}),
        );
        let module = module.build();
        let suites = suites_in(&module);
        assert!(matches!(
            suites[0].warnings(),
            [StructuralWarning::DuplicateHook { hook, .. }] if hook == "after-each"
        ));
    }

    #[test]
    fn test_execution_count() {
        let module = sample();
        let suites = suites_in(&module);
        let units = discover_units(&suites[0]);
        let rows = units.iter().find(|u| u.name() == "rows").unwrap();
        assert_eq!(rows.execution_count(), 2);
        assert_eq!(units[0].execution_count(), 1);
    }

    #[test]
    fn test_filter_units() {
        let module = sample();
        let suites = suites_in(&module);
        let filtered = filter_units(discover_units(&suites[0]), "ro");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name(), "rows");
        assert!(filter_units(discover_units(&suites[0]), "zzz").is_empty());
    }

    proptest! {
        #[test]
        fn prop_discovery_order_is_sorted_and_repeatable(
            specs in prop::collection::vec((-3i32..3, "[a-d]{1,2}"), 0..12)
        ) {
            let mut suite = SuiteBuilder::<Plain>::default_constructed();
            for (priority, name) in &specs {
                suite = suite.unit(UnitBuilder::new(name.clone(), |_: &mut Plain| {}).priority(*priority));
            }
            let mut module = ModuleBuilder::new();
            module.suite(suite);
            let module = module.build();
            let suites = suites_in(&module);

            let first: Vec<_> = discover_units(&suites[0]).iter().map(|u| (u.priority(), u.name())).collect();
            let second: Vec<_> = discover_units(&suites[0]).iter().map(|u| (u.priority(), u.name())).collect();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.len(), specs.len());
            prop_assert!(first.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
