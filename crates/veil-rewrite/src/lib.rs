//! # veil-rewrite
//!
//! Transparent discriminator enforcement on SQL statement trees.
//!
//! A discriminator is a column value every row of a table is scoped by: a
//! tenant id, a soft-delete flag, a partition key. Given a list of
//! [`DiscriminatorRule`]s, this crate rewrites outgoing statements so that
//! callers never have to spell the discriminator out themselves.
//!
//! ## How It Works
//!
//! **Before:**
//! ```sql
//! SELECT * FROM orders WHERE status = 'pending'
//! ```
//!
//! **After** (rule: `orders` → `tenant_id = $1`):
//! ```sql
//! SELECT * FROM orders WHERE orders.tenant_id = $1 AND status = 'pending'
//! ```
//!
//! ## Supported Operations
//!
//! | Operation | Behavior |
//! |-----------|----------|
//! | `SELECT`  | AND an equality predicate per column in front of `WHERE` |
//! | `INSERT`  | Append discriminator columns to the `ON CONFLICT` target |
//! | other     | Untouched |
//!
//! Aliased FROM items (`FROM orders o`) and joined tables are not
//! discriminated. INSERT statements on a matching table must use a literal
//! `VALUES` list; anything else fails with
//! [`RewriteError::UnsupportedConstruct`] unless `throw_on_unsupported` is
//! off, in which case the statement passes through.
//!
//! ## Several Rules
//!
//! Rules run one after another, each on the previous rule's output, and each
//! puts its predicates in front of the `WHERE` it receives. With a tenant rule
//! followed by a soft-delete rule:
//!
//! ```sql
//! SELECT * FROM orders WHERE id = 1
//! -- becomes
//! SELECT * FROM orders WHERE orders.deleted = false AND orders.tenant_id = $1 AND id = 1
//! ```
//!
//! The last rule's predicates come first and the original filter stays last.
//! `ON CONFLICT` columns are appended in rule order: `(id, tenant_id, deleted)`.
//!
//! Column names that are not plain lower-case identifiers, or that are
//! reserved words, are emitted double-quoted (`orders."TenantId"`).
//! Configured values must be usable with `=`: `null` and non-finite floats
//! are rejected when the configuration loads.

pub mod error;
pub mod pipeline;
pub mod rule;
pub mod sql;
pub mod table_ref;
pub mod transformer;

pub use error::RewriteError;
pub use pipeline::{PipelineOptions, QueryPlugin, RewritePipeline};
pub use rule::{ColumnMapping, DiscriminatorColumns, DiscriminatorRule, StatementRef};
pub use sql::SqlRewriter;
pub use table_ref::TableReference;
pub use transformer::StatementTransformer;
