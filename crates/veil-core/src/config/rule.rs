//! Declarative discriminator rules.

use serde::Deserialize;
use std::fmt;

use crate::config::ConfigError;
use crate::pattern::{NameMatcher, TablePattern};

/// One discriminator rule as written in configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDefinition {
    /// Table name matcher: a name, `{ glob: .. }` or `{ regex: .. }`.
    pub table: NameMatcher,

    /// Optional schema matcher. Absent means any schema.
    #[serde(default)]
    pub schema: Option<NameMatcher>,

    /// Column values enforced on matching tables, in declaration order.
    #[serde(default)]
    pub columns: ColumnDefinitions,
}

impl RuleDefinition {
    /// The table pattern this rule applies to.
    pub fn pattern(&self) -> TablePattern {
        TablePattern {
            name: self.table.clone(),
            schema: self.schema.clone(),
        }
    }
}

/// A literal discriminator value.
///
/// Values are compared with `=`, so configuration rejects `null` (which never
/// compares equal) and non-finite floats (which have no SQL literal).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ColumnValueDefinition")]
pub enum ColumnValue {
    Text(String),
    Integer(i64),
    /// Always finite when loaded from configuration.
    Float(f64),
    Boolean(bool),
    /// Bind parameter such as `$1` or `:tenant`, resolved by the host at execution time.
    Placeholder(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnValueDefinition {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Placeholder { placeholder: String },
    Null,
}

impl TryFrom<ColumnValueDefinition> for ColumnValue {
    type Error = ConfigError;

    fn try_from(definition: ColumnValueDefinition) -> Result<Self, Self::Error> {
        match definition {
            ColumnValueDefinition::Boolean(b) => Ok(Self::Boolean(b)),
            ColumnValueDefinition::Integer(i) => Ok(Self::Integer(i)),
            ColumnValueDefinition::Float(f) if f.is_finite() => Ok(Self::Float(f)),
            ColumnValueDefinition::Float(f) => Err(ConfigError::Config(format!(
                "column value {f} is not a finite number"
            ))),
            ColumnValueDefinition::Text(s) => Ok(Self::Text(s)),
            ColumnValueDefinition::Placeholder { placeholder } => {
                Ok(Self::Placeholder(placeholder))
            }
            ColumnValueDefinition::Null => Err(ConfigError::Config(
                "column value must not be null, `= NULL` matches no rows".to_string(),
            )),
        }
    }
}

/// Ordered column-name to value mapping.
///
/// Order is significant: it decides the order of generated predicates and
/// conflict-target columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnDefinitions(Vec<(String, ColumnValue)>);

impl ColumnDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. Later duplicates are kept as-is.
    pub fn with(mut self, column: impl Into<String>, value: ColumnValue) -> Self {
        self.0.push((column.into(), value));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ColumnValue)> for ColumnDefinitions {
    fn from_iter<I: IntoIterator<Item = (String, ColumnValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for ColumnDefinitions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, MapAccess, Visitor};

        struct ColumnsVisitor;

        impl<'de> Visitor<'de> for ColumnsVisitor {
            type Value = ColumnDefinitions;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a mapping of column names to values")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut columns = Vec::new();
                while let Some((name, value)) = map.next_entry::<String, ColumnValue>()? {
                    if name.is_empty() {
                        return Err(de::Error::custom("column names must not be empty"));
                    }
                    columns.push((name, value));
                }
                Ok(ColumnDefinitions(columns))
            }
        }

        deserializer.deserialize_map(ColumnsVisitor)
    }
}
