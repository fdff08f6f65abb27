//! MiniTest runner
//!
//! Loads compiled test modules, discovers the suites they register, runs
//! them, and reports the results. The `minitest` binary is a thin clap front
//! end over [`commands::test::run`].

pub mod commands;
pub mod config;
pub mod loader;
pub mod testing;

pub use loader::{LibraryLoader, LoadError, ModuleHandle, ModuleLoader, StaticLoader};
pub use testing::{Aggregate, TestRunner};
