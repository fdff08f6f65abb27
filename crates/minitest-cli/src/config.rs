//! CLI configuration via environment variables
//!
//! Every setting has a command-line flag; the environment only supplies
//! defaults.

use std::env;
use std::path::PathBuf;

/// Filter directive variable for diagnostic logging
pub const LOG_ENV: &str = "MINITEST_LOG";

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Default to JSON event output (MINITEST_FORMAT=json)
    pub default_json: bool,
    /// Disable colored output (MINITEST_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
    /// Extra dependency search directories (MINITEST_SEARCH_PATH)
    pub search_paths: Vec<PathBuf>,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var_os(name).map(|v| v.to_string_lossy().into_owned()))
    }

    /// Load configuration through `lookup`
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            default_json: lookup("MINITEST_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            no_color: lookup("MINITEST_NO_COLOR").is_some() || lookup("NO_COLOR").is_some(),
            search_paths: lookup("MINITEST_SEARCH_PATH")
                .map(|v| env::split_paths(&v).filter(|p| !p.as_os_str().is_empty()).collect())
                .unwrap_or_default(),
        }
    }
}
