//! Table pattern matching.
//!
//! A [`TablePattern`] decides whether a table reference found in a statement
//! is in scope for a discriminator rule. Matching is pure: it only looks at
//! the table name and the optional schema name.

use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

use crate::config::ConfigError;

/// Predicate over a table or schema name.
pub type NamePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Matches a single identifier (table name or schema name).
#[derive(Clone, Deserialize)]
#[serde(try_from = "NameMatcherDefinition")]
pub enum NameMatcher {
    /// Case-sensitive equality.
    Exact(String),
    /// Shell-style wildcard (`*` and `?`), anchored at both ends.
    Glob { source: String, regex: Regex },
    /// Regular expression, matched anywhere unless anchored by the pattern itself.
    Regex(Regex),
    /// Arbitrary predicate. Must be pure.
    Predicate(NamePredicate),
}

impl NameMatcher {
    /// Exact, case-sensitive name.
    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    /// Compile a wildcard pattern such as `tenant_*`.
    pub fn glob(pattern: impl Into<String>) -> Result<Self, ConfigError> {
        let source = pattern.into();
        let regex = compile(&glob_to_regex(&source), &source)?;
        Ok(Self::Glob { source, regex })
    }

    /// Compile a regular expression.
    pub fn regex(pattern: &str) -> Result<Self, ConfigError> {
        compile(pattern, pattern).map(Self::Regex)
    }

    /// Wrap a predicate closure.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Test a candidate name.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(name) => name == candidate,
            Self::Glob { regex, .. } | Self::Regex(regex) => regex.is_match(candidate),
            Self::Predicate(f) => f(candidate),
        }
    }
}

impl fmt::Debug for NameMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.debug_tuple("Exact").field(name).finish(),
            Self::Glob { source, .. } => f.debug_tuple("Glob").field(source).finish(),
            Self::Regex(regex) => f.debug_tuple("Regex").field(&regex.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for NameMatcher {
    fn from(name: &str) -> Self {
        Self::exact(name)
    }
}

impl From<String> for NameMatcher {
    fn from(name: String) -> Self {
        Self::Exact(name)
    }
}

/// YAML shape of a [`NameMatcher`]: a bare string, `{ glob: .. }` or `{ regex: .. }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum NameMatcherDefinition {
    Exact(String),
    Glob { glob: String },
    Regex { regex: String },
}

impl TryFrom<NameMatcherDefinition> for NameMatcher {
    type Error = ConfigError;

    fn try_from(definition: NameMatcherDefinition) -> Result<Self, Self::Error> {
        match definition {
            NameMatcherDefinition::Exact(name) if name.is_empty() => Err(ConfigError::Config(
                "table and schema names must not be empty".to_string(),
            )),
            NameMatcherDefinition::Exact(name) => Ok(Self::Exact(name)),
            NameMatcherDefinition::Glob { glob } => Self::glob(glob),
            NameMatcherDefinition::Regex { regex } => Self::regex(&regex),
        }
    }
}

/// Identifies the tables a discriminator rule applies to.
#[derive(Debug, Clone)]
pub struct TablePattern {
    /// Matcher for the table name.
    pub name: NameMatcher,
    /// Matcher for the schema name. `None` accepts any schema, including none.
    pub schema: Option<NameMatcher>,
}

impl TablePattern {
    /// Pattern on the table name only.
    pub fn new(name: impl Into<NameMatcher>) -> Self {
        Self {
            name: name.into(),
            schema: None,
        }
    }

    /// Restrict the pattern to a schema.
    pub fn with_schema(mut self, schema: impl Into<NameMatcher>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Whether `(table_name, schema_name)` is in scope.
    ///
    /// A schema constraint is never satisfied by an unqualified table.
    pub fn test(&self, table_name: &str, schema_name: Option<&str>) -> bool {
        if !self.name.matches(table_name) {
            return false;
        }

        match (&self.schema, schema_name) {
            (None, _) => true,
            (Some(matcher), Some(schema)) => matcher.matches(schema),
            (Some(_), None) => false,
        }
    }
}

fn compile(pattern: &str, source: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|error| ConfigError::InvalidPattern {
        pattern: source.to_string(),
        source: error,
    })
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    let mut literal = String::new();
    for ch in glob.chars() {
        match ch {
            '*' | '?' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if ch == '*' { ".*" } else { "." });
            }
            _ => literal.push(ch),
        }
    }
    out.push_str(&regex::escape(&literal));
    out.push('$');
    out
}
