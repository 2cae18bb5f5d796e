//! Error types for the rewrite crate.

use thiserror::Error;
use veil_core::ConfigError;

/// Errors that can occur while rewriting statements.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// INSERT on a discriminated table whose rows do not come from a literal
    /// `VALUES` list.
    #[error("cannot discriminate {construct} on table {table}")]
    UnsupportedConstruct { table: String, construct: String },

    /// SQL parsing failed.
    #[error("failed to parse SQL: {0}")]
    Parse(String),

    /// Rule configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
