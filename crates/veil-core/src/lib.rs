//! # veil-core
//!
//! Configuration model and table matching shared by the Veil crates.
//!
//! This crate knows nothing about statement trees. It answers two questions:
//! which discriminator rules are configured, and whether a given
//! `(table, schema)` pair falls under a rule's [`TablePattern`].

pub mod config;
pub mod pattern;

pub use config::{
    ColumnDefinitions, ColumnValue, ConfigError, DiscriminatorConfig, RuleDefinition,
};
pub use pattern::{NameMatcher, NamePredicate, TablePattern};
