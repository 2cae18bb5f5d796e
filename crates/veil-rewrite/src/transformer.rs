//! Per-rule statement rewriting.
//!
//! [`StatementTransformer`] hooks into `sqlparser`'s derived [`VisitMut`]
//! traversal, which walks every node and calls back after a node's children
//! have been handled. Both hooks below therefore see fully rewritten children:
//!
//! - `post_visit_statement` handles `INSERT`: discriminator columns are
//!   appended to an existing `ON CONFLICT` target.
//! - `post_visit_query` handles every `SELECT` body: an equality predicate per
//!   discriminator column is AND-ed in front of the existing `WHERE`.

use sqlparser::ast::{
    BinaryOperator, ConflictTarget, Expr, Ident, Insert, OnInsert, Query, Select, SetExpr,
    Statement, TableFactor, TableObject, ValueWithSpan, VisitMut, VisitorMut,
};
use std::ops::ControlFlow;
use std::sync::Arc;

use crate::error::RewriteError;
use crate::rule::{DiscriminatorRule, StatementRef};
use crate::table_ref::TableReference;

/// Applies one discriminator rule to statement trees.
#[derive(Debug, Clone)]
pub struct StatementTransformer {
    rule: Arc<DiscriminatorRule>,
    throw_on_unsupported: bool,
}

impl StatementTransformer {
    pub fn new(rule: Arc<DiscriminatorRule>, throw_on_unsupported: bool) -> Self {
        Self {
            rule,
            throw_on_unsupported,
        }
    }

    pub fn rule(&self) -> &DiscriminatorRule {
        &self.rule
    }

    /// Rewrite `statement`, returning the new tree.
    ///
    /// The statement is consumed: on error nothing of it is handed back, so a
    /// caller never observes a partially rewritten tree.
    pub fn transform(&self, mut statement: Statement) -> Result<Statement, RewriteError> {
        let mut hooks = Hooks { transformer: self };
        match VisitMut::visit(&mut statement, &mut hooks) {
            ControlFlow::Continue(()) => Ok(statement),
            ControlFlow::Break(error) => Err(error),
        }
    }

    fn transform_insert(&self, insert: &mut Insert) -> Result<(), RewriteError> {
        let TableObject::TableName(name) = &insert.table else {
            return Ok(());
        };
        let Some(table) = TableReference::from_object_name(name) else {
            tracing::debug!(target_table = %name, "Skipping insert into unresolvable table name");
            return Ok(());
        };
        if !self.rule.pattern.test(&table.name, table.schema.as_deref()) {
            return Ok(());
        }

        if let Some(construct) = unsupported_source(insert) {
            if self.throw_on_unsupported {
                return Err(RewriteError::UnsupportedConstruct {
                    table: table.to_string(),
                    construct: construct.to_string(),
                });
            }
            tracing::warn!(
                table = %table,
                construct,
                "Insert left without discriminator columns"
            );
            return Ok(());
        }

        if !matches!(insert.on, Some(OnInsert::OnConflict(_))) {
            return Ok(());
        }

        let columns: Vec<Ident> = self
            .rule
            .columns
            .resolve(StatementRef::Insert(&*insert))
            .idents()
            .cloned()
            .collect();
        if columns.is_empty() {
            return Ok(());
        }

        let Some(OnInsert::OnConflict(on_conflict)) = insert.on.as_mut() else {
            return Ok(());
        };
        match &mut on_conflict.conflict_target {
            Some(ConflictTarget::Columns(existing)) => {
                tracing::debug!(table = %table, added = columns.len(), "Extending conflict target");
                existing.extend(columns);
            }
            None => {
                tracing::debug!(table = %table, added = columns.len(), "Setting conflict target");
                on_conflict.conflict_target = Some(ConflictTarget::Columns(columns));
            }
            Some(_) => {
                tracing::debug!(table = %table, "Conflict target is a named constraint, leaving it");
            }
        }
        Ok(())
    }

    fn transform_select(&self, select: &mut Select) {
        let mut predicates = Vec::new();
        {
            let node: &Select = select;
            for table_with_joins in &node.from {
                let TableFactor::Table { name, alias, .. } = &table_with_joins.relation else {
                    continue;
                };
                if let Some(alias) = alias {
                    tracing::debug!(
                        table = %name,
                        alias = %alias.name,
                        "Aliased table is not discriminated"
                    );
                    continue;
                }
                let Some(table) = TableReference::from_object_name(name) else {
                    continue;
                };
                if !self.rule.pattern.test(&table.name, table.schema.as_deref()) {
                    continue;
                }

                let columns = self.rule.columns.resolve(StatementRef::Select(node));
                for (column, value) in columns.iter() {
                    predicates.push(equals(
                        Expr::CompoundIdentifier(table.qualified_column(column)),
                        Expr::Value(ValueWithSpan::from(value.clone())),
                    ));
                }
                tracing::debug!(table = %table, predicates = columns.len(), "Discriminating select");
            }
        }

        if predicates.is_empty() {
            return;
        }

        let existing = select.selection.take().map(conjunct);
        select.selection = predicates.into_iter().chain(existing).reduce(and);
    }

    fn transform_set_expr(&self, body: &mut SetExpr) {
        match body {
            SetExpr::Select(select) => self.transform_select(select.as_mut()),
            SetExpr::SetOperation { left, right, .. } => {
                self.transform_set_expr(left.as_mut());
                self.transform_set_expr(right.as_mut());
            }
            // Nested query bodies are visited as their own Query nodes.
            _ => {}
        }
    }
}

struct Hooks<'a> {
    transformer: &'a StatementTransformer,
}

impl VisitorMut for Hooks<'_> {
    type Break = RewriteError;

    fn post_visit_query(&mut self, query: &mut Query) -> ControlFlow<Self::Break> {
        self.transformer.transform_set_expr(query.body.as_mut());
        ControlFlow::Continue(())
    }

    fn post_visit_statement(&mut self, statement: &mut Statement) -> ControlFlow<Self::Break> {
        let Statement::Insert(insert) = statement else {
            return ControlFlow::Continue(());
        };
        match self.transformer.transform_insert(insert) {
            Ok(()) => ControlFlow::Continue(()),
            Err(error) => ControlFlow::Break(error),
        }
    }
}

/// Describes the row source of an INSERT that is not a literal `VALUES` list.
fn unsupported_source(insert: &Insert) -> Option<&'static str> {
    let Some(source) = insert.source.as_deref() else {
        return Some("INSERT without a VALUES list");
    };
    match source.body.as_ref() {
        SetExpr::Values(_) => None,
        SetExpr::Select(_) => Some("INSERT ... SELECT"),
        SetExpr::SetOperation { .. } => Some("INSERT from a set operation"),
        SetExpr::Query(_) => Some("INSERT from a subquery"),
        _ => Some("INSERT from a non-literal source"),
    }
}

fn equals(left: Expr, right: Expr) -> Expr {
    Expr::BinaryOp {
        left: Box::new(left),
        op: BinaryOperator::Eq,
        right: Box::new(right),
    }
}

fn and(left: Expr, right: Expr) -> Expr {
    Expr::BinaryOp {
        left: Box::new(left),
        op: BinaryOperator::And,
        right: Box::new(right),
    }
}

/// Parenthesize a filter that binds looser than AND.
fn conjunct(expr: Expr) -> Expr {
    match expr {
        Expr::BinaryOp {
            op: BinaryOperator::Or | BinaryOperator::Xor,
            ..
        } => Expr::Nested(Box::new(expr)),
        other => other,
    }
}
