//! Sample MiniTest module
//!
//! Build with `cargo build -p minitest-demo` and run the resulting cdylib:
//!
//! ```text
//! minitest target/debug/libminitest_demo.so
//! ```
//!
//! Some units fail, one panics, and one suite is skipped on purpose so every
//! kind of report line shows up.

use minitest::{assert, row, BoxError, ModuleBuilder, SuiteBuilder, UnitBuilder};
use std::fmt;

#[derive(Debug)]
pub struct DivisionByZero;

impl fmt::Display for DivisionByZero {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("division by zero")
    }
}

impl std::error::Error for DivisionByZero {}

pub fn divide(a: i64, b: i64) -> Result<i64, DivisionByZero> {
    a.checked_div(b).ok_or(DivisionByZero)
}

#[derive(Default)]
pub struct Calculator;

/// Counts hook invocations on the shared suite instance
#[derive(Default)]
pub struct Counter {
    setups: u32,
    teardowns: u32,
}

#[derive(Default)]
pub struct Greeting;

/// Has no no-argument constructor, so the runner skips it
pub struct Database {
    pub url: String,
}

pub fn register(module: &mut ModuleBuilder) {
    module
        .suite(
            SuiteBuilder::<Calculator>::default_constructed()
                .named("Calculator")
                .description("Integer arithmetic")
                .unit(
                    UnitBuilder::new("Add", |_: &mut Calculator, a: i64, b: i64| {
                        assert::are_equal(5, a + b, "")
                    })
                    .description("a + b == 5")
                    .data_row(row![2, 3; "sum5"])
                    .data_row(row![1, 1; "sum2"]),
                )
                .unit(
                    UnitBuilder::new("Divide", |_: &mut Calculator| -> Result<(), BoxError> {
                        assert::are_equal(5, divide(10, 2)?, "")?;
                        assert::fails_with::<DivisionByZero, _, _, _>(|| divide(1, 0), "")?;
                        Ok(())
                    })
                    .priority(-1),
                )
                .unit(UnitBuilder::new("Remainder", |_: &mut Calculator| {
                    let divisor = divide(0, 1).unwrap_or_default();
                    assert::are_equal(0, 7 % divisor, "")
                })),
        )
        .suite(
            SuiteBuilder::<Counter>::default_constructed()
                .named("Counter")
                .before_each(|c: &mut Counter| c.setups += 1)
                .after_each(|c: &mut Counter| c.teardowns += 1)
                .unit(UnitBuilder::new("first", |c: &mut Counter| {
                    assert::are_equal((1, 0), (c.setups, c.teardowns), "")
                }))
                .unit(UnitBuilder::new("second", |c: &mut Counter| {
                    assert::are_equal((2, 1), (c.setups, c.teardowns), "")
                })),
        )
        .suite(
            SuiteBuilder::<Greeting>::default_constructed()
                .named("Greeting")
                .unit(
                    UnitBuilder::new("greet", |_: &mut Greeting, name: String| {
                        assert::is_false(name.is_empty(), "name must not be empty")
                    })
                    .data_row(row!["world"])
                    .data_row(row!["too", "many"; "extra argument"]),
                ),
        )
        .suite(
            SuiteBuilder::<Database>::new()
                .named("Database")
                .unit(UnitBuilder::new("connect", |db: &mut Database| {
                    assert::is_false(db.url.is_empty(), "")
                })),
        );
}

minitest::minitest_module!(register);
