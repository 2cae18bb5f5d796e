//! SQL text front end.

use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

use crate::error::RewriteError;
use crate::pipeline::RewritePipeline;

/// Parses SQL, runs it through a [`RewritePipeline`] and renders the result.
#[derive(Debug)]
pub struct SqlRewriter {
    pipeline: RewritePipeline,
    dialect: Box<dyn Dialect + Send + Sync>,
}

impl SqlRewriter {
    /// Rewriter using the PostgreSQL dialect.
    pub fn new(pipeline: RewritePipeline) -> Self {
        Self {
            pipeline,
            dialect: Box::new(PostgreSqlDialect {}),
        }
    }

    pub fn with_dialect(mut self, dialect: impl Dialect + Send + Sync) -> Self {
        self.dialect = Box::new(dialect);
        self
    }

    pub fn pipeline(&self) -> &RewritePipeline {
        &self.pipeline
    }

    /// Parse a SQL string into statements.
    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>, RewriteError> {
        Parser::parse_sql(&*self.dialect, sql).map_err(|e| RewriteError::Parse(e.to_string()))
    }

    /// Rewrite every statement in `sql`.
    pub fn rewrite_statements(&self, sql: &str) -> Result<Vec<Statement>, RewriteError> {
        self.parse(sql)?
            .into_iter()
            .map(|statement| self.pipeline.transform_query(statement))
            .collect()
    }

    /// Rewrite `sql` and render it back to text, statements separated by `; `.
    pub fn rewrite(&self, sql: &str) -> Result<String, RewriteError> {
        let statements = self.rewrite_statements(sql)?;
        Ok(statements
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineOptions;
    use crate::rule::{DiscriminatorColumns, DiscriminatorRule};
    use pretty_assertions::assert_eq;
    use sqlparser::ast::Value;
    use sqlparser::dialect::GenericDialect;
    use veil_core::TablePattern;

    fn rewriter() -> SqlRewriter {
        let options = PipelineOptions::new().with_rule(DiscriminatorRule::new(
            TablePattern::new("orders"),
            DiscriminatorColumns::new().with("tenant_id", Value::Number("7".to_string(), false)),
        ));
        SqlRewriter::new(RewritePipeline::new(options))
    }

    #[test]
    fn test_rewrite_multiple_statements() {
        let sql = rewriter()
            .rewrite("SELECT * FROM orders; SELECT * FROM products")
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM orders WHERE orders.tenant_id = 7; SELECT * FROM products"
        );
    }

    #[test]
    fn test_rewrite_statements_matches_pipeline() {
        let rewriter = rewriter();
        let statements = rewriter.parse("SELECT * FROM orders").unwrap();
        let expected = rewriter
            .pipeline()
            .transform_query(statements[0].clone())
            .unwrap();

        assert_eq!(
            rewriter.rewrite_statements("SELECT * FROM orders").unwrap(),
            vec![expected]
        );
    }

    #[test]
    fn test_parse_error() {
        let err = rewriter().rewrite("SELEC nonsense").unwrap_err();
        assert!(matches!(err, RewriteError::Parse(_)));
    }

    #[test]
    fn test_custom_dialect() {
        let sql = rewriter()
            .with_dialect(GenericDialect {})
            .rewrite("SELECT id FROM public.orders")
            .unwrap();
        assert_eq!(
            sql,
            "SELECT id FROM public.orders WHERE public.orders.tenant_id = 7"
        );
    }
}
