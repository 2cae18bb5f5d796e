//! Runtime form of a discriminator rule.

use sqlparser::ast::{Ident, Insert, Select, Value};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use veil_core::{ColumnValue, RuleDefinition, TablePattern};

/// The statement node a derived mapping is computed from.
#[derive(Debug, Clone, Copy)]
pub enum StatementRef<'a> {
    Insert(&'a Insert),
    Select(&'a Select),
}

/// Ordered discriminator columns and the values they must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscriminatorColumns(Vec<(Ident, Value)>);

impl DiscriminatorColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column.
    pub fn with(mut self, column: impl Into<String>, value: Value) -> Self {
        let column: String = column.into();
        self.0.push((column_ident(&column), value));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ident, &Value)> {
        self.0.iter().map(|(column, value)| (column, value))
    }

    /// Column identifiers in mapping order.
    pub fn idents(&self) -> impl Iterator<Item = &Ident> {
        self.0.iter().map(|(column, _)| column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Ident, Value)> for DiscriminatorColumns {
    fn from_iter<I: IntoIterator<Item = (Ident, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Mapping function evaluated against the statement being rewritten.
pub type DeriveColumns = Arc<dyn Fn(StatementRef<'_>) -> DiscriminatorColumns + Send + Sync>;

/// Column values of a rule: fixed, or derived per statement.
#[derive(Clone)]
pub enum ColumnMapping {
    Constant(DiscriminatorColumns),
    Derived(DeriveColumns),
}

impl ColumnMapping {
    /// Resolve the mapping for `node`. Derived mappings are invoked on every call.
    pub fn resolve(&self, node: StatementRef<'_>) -> Cow<'_, DiscriminatorColumns> {
        match self {
            Self::Constant(columns) => Cow::Borrowed(columns),
            Self::Derived(derive) => Cow::Owned(derive(node)),
        }
    }
}

impl fmt::Debug for ColumnMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(columns) => f.debug_tuple("Constant").field(columns).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// A table pattern plus the column values enforced on matching tables.
#[derive(Debug, Clone)]
pub struct DiscriminatorRule {
    pub pattern: TablePattern,
    pub columns: ColumnMapping,
}

impl DiscriminatorRule {
    /// Rule with a fixed mapping.
    pub fn new(pattern: TablePattern, columns: DiscriminatorColumns) -> Self {
        Self {
            pattern,
            columns: ColumnMapping::Constant(columns),
        }
    }

    /// Rule whose mapping is computed from the statement being rewritten.
    pub fn derived<F>(pattern: TablePattern, derive: F) -> Self
    where
        F: Fn(StatementRef<'_>) -> DiscriminatorColumns + Send + Sync + 'static,
    {
        Self {
            pattern,
            columns: ColumnMapping::Derived(Arc::new(derive)),
        }
    }
}

impl From<&RuleDefinition> for DiscriminatorRule {
    fn from(definition: &RuleDefinition) -> Self {
        let columns = definition
            .columns
            .iter()
            .map(|(name, value)| (column_ident(name), sql_value(value)))
            .collect();
        Self::new(definition.pattern(), columns)
    }
}

/// Identifier for a discriminator column.
///
/// PostgreSQL folds unquoted names to lower case, so any name that is not a
/// plain lower-case identifier, or that is a reserved word, is double-quoted.
pub fn column_ident(name: &str) -> Ident {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$');
    if plain && RESERVED_WORDS.binary_search(&name).is_err() {
        Ident::new(name)
    } else {
        Ident::with_quote('"', name)
    }
}

/// PostgreSQL reserved key words, sorted.
const RESERVED_WORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric", "both",
    "case", "cast", "check", "collate", "column", "constraint", "create", "current_catalog",
    "current_date", "current_role", "current_time", "current_timestamp", "current_user",
    "default", "deferrable", "desc", "distinct", "do", "else", "end", "except", "false",
    "fetch", "for", "foreign", "from", "grant", "group", "having", "in", "initially",
    "intersect", "into", "lateral", "leading", "limit", "localtime", "localtimestamp", "not",
    "null", "offset", "on", "only", "or", "order", "placing", "primary", "references",
    "returning", "select", "session_user", "some", "symmetric", "table", "then", "to",
    "trailing", "true", "union", "unique", "user", "using", "variadic", "when", "where",
    "window", "with",
];

/// Convert a configured value into a SQL literal or placeholder.
pub fn sql_value(value: &ColumnValue) -> Value {
    match value {
        ColumnValue::Text(s) => Value::SingleQuotedString(s.clone()),
        ColumnValue::Integer(i) => Value::Number(i.to_string(), false),
        ColumnValue::Float(f) => Value::Number(f.to_string(), false),
        ColumnValue::Boolean(b) => Value::Boolean(*b),
        ColumnValue::Placeholder(p) => Value::Placeholder(p.clone()),
    }
}
