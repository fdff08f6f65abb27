//! CLI command implementations
