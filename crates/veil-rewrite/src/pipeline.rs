//! Rule pipeline and host plugin contract.

use sqlparser::ast::Statement;
use std::path::Path;
use std::sync::Arc;
use veil_core::DiscriminatorConfig;

use crate::error::RewriteError;
use crate::rule::DiscriminatorRule;
use crate::transformer::StatementTransformer;

/// The two hooks a query builder invokes around every statement execution.
pub trait QueryPlugin {
    type Error;

    /// Rewrite an outgoing statement before it is compiled and executed.
    fn transform_query(&self, statement: Statement) -> Result<Statement, Self::Error>;

    /// Post-process an execution result.
    fn transform_result<R>(&self, result: R) -> R;
}

/// Construction options for a [`RewritePipeline`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Rules, applied in order.
    pub rules: Vec<DiscriminatorRule>,
    /// Fail on INSERT statements without a literal `VALUES` list (default: true).
    pub throw_on_unsupported: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            throw_on_unsupported: true,
        }
    }
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: DiscriminatorRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn throw_on_unsupported(mut self, throw: bool) -> Self {
        self.throw_on_unsupported = throw;
        self
    }
}

impl From<&DiscriminatorConfig> for PipelineOptions {
    fn from(config: &DiscriminatorConfig) -> Self {
        Self {
            rules: config.rules.iter().map(DiscriminatorRule::from).collect(),
            throw_on_unsupported: config.throw_on_unsupported,
        }
    }
}

/// Folds statements through one [`StatementTransformer`] per rule.
///
/// The pipeline holds nothing but read-only rules and can be shared freely
/// between threads.
#[derive(Debug, Clone)]
pub struct RewritePipeline {
    transformers: Vec<StatementTransformer>,
}

impl RewritePipeline {
    pub fn new(options: PipelineOptions) -> Self {
        let throw_on_unsupported = options.throw_on_unsupported;
        let transformers = options
            .rules
            .into_iter()
            .map(|rule| StatementTransformer::new(Arc::new(rule), throw_on_unsupported))
            .collect();
        Self { transformers }
    }

    /// Build a pipeline from loaded configuration.
    pub fn from_config(config: &DiscriminatorConfig) -> Self {
        tracing::info!(
            rules = config.rules.len(),
            throw_on_unsupported = config.throw_on_unsupported,
            "Building discriminator pipeline"
        );
        Self::new(PipelineOptions::from(config))
    }

    /// Build a pipeline from YAML configuration content.
    pub fn from_yaml(content: &str) -> Result<Self, RewriteError> {
        let config = DiscriminatorConfig::from_yaml(content)?;
        Ok(Self::from_config(&config))
    }

    /// Build a pipeline from a YAML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RewriteError> {
        let config = DiscriminatorConfig::from_file(path)?;
        Ok(Self::from_config(&config))
    }

    pub fn transformers(&self) -> &[StatementTransformer] {
        &self.transformers
    }

    /// Apply every rule in configured order, each to the previous rule's output.
    pub fn transform_query(&self, statement: Statement) -> Result<Statement, RewriteError> {
        self.transformers
            .iter()
            .try_fold(statement, |statement, transformer| {
                transformer.transform(statement)
            })
    }

    /// Results are never rewritten.
    pub fn transform_result<R>(&self, result: R) -> R {
        result
    }
}

impl QueryPlugin for RewritePipeline {
    type Error = RewriteError;

    fn transform_query(&self, statement: Statement) -> Result<Statement, Self::Error> {
        RewritePipeline::transform_query(self, statement)
    }

    fn transform_result<R>(&self, result: R) -> R {
        RewritePipeline::transform_result(self, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::DiscriminatorColumns;
    use pretty_assertions::assert_eq;
    use sqlparser::ast::Value;
    use sqlparser::dialect::PostgreSqlDialect;
    use sqlparser::parser::Parser;
    use veil_core::TablePattern;

    fn parse(sql: &str) -> Statement {
        Parser::parse_sql(&PostgreSqlDialect {}, sql)
            .unwrap()
            .remove(0)
    }

    fn plugin<P: QueryPlugin>(plugin: &P, statement: Statement) -> Result<Statement, P::Error> {
        plugin.transform_query(statement)
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let pipeline = RewritePipeline::new(PipelineOptions::new());
        let statement = parse("SELECT * FROM orders");
        assert_eq!(
            pipeline.transform_query(statement.clone()).unwrap(),
            statement
        );
    }

    #[test]
    fn test_transform_result_passthrough() {
        let pipeline = RewritePipeline::new(PipelineOptions::new());
        let rows = vec![(1, "a"), (2, "b")];
        assert_eq!(QueryPlugin::transform_result(&pipeline, rows.clone()), rows);
    }

    #[test]
    fn test_plugin_contract_delegates() {
        let options = PipelineOptions::new().with_rule(DiscriminatorRule::new(
            TablePattern::new("orders"),
            DiscriminatorColumns::new().with("deleted", Value::Boolean(false)),
        ));
        let pipeline = RewritePipeline::new(options);
        let result = plugin(&pipeline, parse("SELECT * FROM orders")).unwrap();
        assert_eq!(
            result.to_string(),
            "SELECT * FROM orders WHERE orders.deleted = false"
        );
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
throw_on_unsupported: false
rules:
  - table: orders
    columns:
      tenant_id: { placeholder: "$1" }
"#;
        let pipeline = RewritePipeline::from_yaml(yaml).unwrap();
        assert_eq!(pipeline.transformers().len(), 1);
        let rule = pipeline.transformers()[0].rule();
        assert!(rule.pattern.test("orders", Some("public")));
        assert!(!rule.pattern.test("order_items", None));

        let result = pipeline
            .transform_query(parse("SELECT * FROM orders"))
            .unwrap();
        assert_eq!(
            result.to_string(),
            "SELECT * FROM orders WHERE orders.tenant_id = $1"
        );

        let insert = parse("INSERT INTO orders SELECT * FROM staging");
        assert_eq!(pipeline.transform_query(insert.clone()).unwrap(), insert);
    }

    #[test]
    fn test_from_yaml_reports_config_error() {
        let err = RewritePipeline::from_yaml("rules: [").unwrap_err();
        assert!(matches!(err, RewriteError::Config(_)));
    }

    #[test]
    fn test_pipeline_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RewritePipeline>();
    }
}
