//! Table references extracted from statement trees.

use sqlparser::ast::{Ident, ObjectName, ObjectNamePart};
use std::fmt;

/// A table named by an INSERT target or a FROM item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReference {
    /// Unquoted table name.
    pub name: String,
    /// Schema the table was qualified with, if any.
    pub schema: Option<String>,
    /// Identifiers as written, used to qualify generated column references.
    qualifier: Vec<Ident>,
}

impl TableReference {
    /// Resolve an object name such as `orders`, `public.orders` or
    /// `db.public.orders`. Returns `None` when any part is not a plain identifier.
    pub fn from_object_name(name: &ObjectName) -> Option<Self> {
        let qualifier = name
            .0
            .iter()
            .map(|part| ObjectNamePart::as_ident(part).cloned())
            .collect::<Option<Vec<Ident>>>()?;

        let (table, rest) = qualifier.split_last()?;
        Some(Self {
            name: table.value.clone(),
            schema: rest.last().map(|schema| schema.value.clone()),
            qualifier: qualifier.clone(),
        })
    }

    /// `<qualifier>.<column>` identifier chain.
    pub fn qualified_column(&self, column: &Ident) -> Vec<Ident> {
        let mut idents = self.qualifier.clone();
        idents.push(column.clone());
        idents
    }
}

impl fmt::Display for TableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn object_name(parts: &[&str]) -> ObjectName {
        ObjectName(
            parts
                .iter()
                .map(|part| ObjectNamePart::Identifier(Ident::new(*part)))
                .collect(),
        )
    }

    #[test]
    fn test_unqualified_table() {
        let table = TableReference::from_object_name(&object_name(&["orders"])).unwrap();
        assert_eq!(table.name, "orders");
        assert_eq!(table.schema, None);
        assert_eq!(table.to_string(), "orders");
    }

    #[test]
    fn test_schema_qualified_table() {
        let table =
            TableReference::from_object_name(&object_name(&["db", "tenant_a", "orders"])).unwrap();
        assert_eq!(table.name, "orders");
        assert_eq!(table.schema.as_deref(), Some("tenant_a"));

        let column: Vec<String> = table
            .qualified_column(&Ident::new("tenant_id"))
            .iter()
            .map(|ident| ident.value.clone())
            .collect();
        assert_eq!(column, vec!["db", "tenant_a", "orders", "tenant_id"]);
    }

    #[test]
    fn test_quoted_identifier_keeps_raw_name() {
        let name = ObjectName(vec![ObjectNamePart::Identifier(Ident::with_quote(
            '"', "Orders",
        ))]);
        let table = TableReference::from_object_name(&name).unwrap();
        assert_eq!(table.name, "Orders");
    }
}
