//! Preparation stage: query model to unresolved `SqlStatement`.
//!
//! Clauses are visited strictly in source order: main from clause, body
//! clauses, select/group clause, then result operators.

mod expression;
mod result_operator;

use std::collections::HashMap;

use crate::error::{QuillError, QuillResult};
use crate::ids::UniqueIdentifierGenerator;
use crate::ir::{
    DataInfo, JoinSemantics, SqlExpr, SqlOrdering, SqlStatement, SqlStatementBuilder, SqlTable,
    TableInfo,
};
use crate::query::{BodyClause, Expr, FromClause, QueryModel, SelectOrGroupClause};
use crate::transformer::MethodCallTransformerRegistry;

/// Item names visible to an expression: from-clause items and let bindings.
/// Cloned into nested query models so they can refer to outer items.
pub type QuerySourceMapping = HashMap<String, SqlExpr>;

/// Prepares `model` into a statement whose tables, members and method
/// calls are not yet mapped to a schema.
pub fn prepare_query_model(
    model: &QueryModel,
    registry: &MethodCallTransformerRegistry,
    ids: &mut UniqueIdentifierGenerator,
) -> QuillResult<SqlStatement> {
    QueryModelVisitor::new(registry, ids, QuerySourceMapping::new()).visit(model)
}

pub(crate) struct QueryModelVisitor<'a> {
    registry: &'a MethodCallTransformerRegistry,
    ids: &'a mut UniqueIdentifierGenerator,
    mapping: QuerySourceMapping,
    builder: SqlStatementBuilder,
}

impl<'a> QueryModelVisitor<'a> {
    fn new(
        registry: &'a MethodCallTransformerRegistry,
        ids: &'a mut UniqueIdentifierGenerator,
        mapping: QuerySourceMapping,
    ) -> Self {
        Self {
            registry,
            ids,
            mapping,
            builder: SqlStatementBuilder::new(),
        }
    }

    fn visit(mut self, model: &QueryModel) -> QuillResult<SqlStatement> {
        self.add_table(&model.main_from)?;
        for clause in &model.body_clauses {
            self.visit_body_clause(clause)?;
        }
        self.visit_select_or_group(&model.select_or_group)?;
        for operator in &model.result_operators {
            self.visit_result_operator(operator)?;
        }
        self.builder.freeze()
    }

    /// Prepares a nested query model that sees the current item names.
    fn prepare_sub_query(&mut self, model: &QueryModel) -> QuillResult<SqlStatement> {
        QueryModelVisitor::new(self.registry, &mut *self.ids, self.mapping.clone()).visit(model)
    }

    fn add_table(&mut self, from: &FromClause) -> QuillResult<()> {
        let key = self.ids.table_key();
        let table_info = match &from.source {
            Expr::Queryable { item_type } => TableInfo::Unresolved {
                item_type: item_type.clone(),
            },
            Expr::SubQuery(model) => {
                let statement = as_source_statement(self.prepare_sub_query(model)?)?;
                TableInfo::ResolvedSubStatement {
                    alias: self.ids.unique_identifier("q"),
                    statement: Box::new(statement),
                }
            }
            other => {
                return Err(QuillError::UnsupportedClause {
                    clause: format!("from {} in {}", from.item_name, other),
                    reason: "only tables and sub-queries can be used as query sources".to_string(),
                });
            }
        };

        let ty = table_info.item_type();
        self.builder
            .sql_tables
            .push(SqlTable::new(key, table_info, JoinSemantics::Inner));
        self.mapping
            .insert(from.item_name.clone(), SqlExpr::TableReference { key, ty });
        Ok(())
    }

    fn visit_body_clause(&mut self, clause: &BodyClause) -> QuillResult<()> {
        match clause {
            BodyClause::AdditionalFrom(from) => self.add_table(from),
            BodyClause::Where(predicate) => {
                let condition = self.prepare_expression(predicate)?;
                self.builder.add_where_condition(condition);
                Ok(())
            }
            BodyClause::OrderBy(orderings) => {
                let mut prepared = Vec::with_capacity(orderings.len());
                for ordering in orderings {
                    prepared.push(SqlOrdering::new(
                        self.prepare_expression(&ordering.expression)?,
                        ordering.direction,
                    ));
                }
                // A later orderby clause sorts first.
                self.builder.orderings.splice(0..0, prepared);
                Ok(())
            }
            BodyClause::Let { name, expression } => {
                let prepared = self.prepare_expression(expression)?;
                self.mapping.insert(name.clone(), prepared);
                Ok(())
            }
            BodyClause::Join { item_name, .. } => Err(QuillError::UnsupportedClause {
                clause: format!("join {}", item_name),
                reason: "joins on explicit keys are not supported; use navigation members or a where clause"
                    .to_string(),
            }),
            BodyClause::GroupJoin { item_name, .. } => Err(QuillError::UnsupportedClause {
                clause: format!("join into {}", item_name),
                reason: "group joins are not supported".to_string(),
            }),
        }
    }

    fn visit_select_or_group(&mut self, clause: &SelectOrGroupClause) -> QuillResult<()> {
        let projection = match clause {
            SelectOrGroupClause::Select(selector) => self.prepare_expression(selector)?,
            SelectOrGroupClause::Group { key, .. } => {
                let key = self.prepare_expression(key)?;
                self.builder.group_by_expression = Some(key.clone());
                key
            }
        };
        self.builder.data_info = Some(DataInfo::Sequence {
            item_type: projection.ty(),
        });
        self.builder.select_projection = Some(projection);
        Ok(())
    }
}

/// Readies a statement for use as a table source: the projection gets a
/// column name and orderings that no TOP depends on are dropped.
pub(crate) fn as_source_statement(statement: SqlStatement) -> QuillResult<SqlStatement> {
    let mut builder = SqlStatementBuilder::from(statement);
    if let Some(projection) = builder.select_projection.take() {
        builder.select_projection = Some(match projection {
            named @ (SqlExpr::Named(_)
            | SqlExpr::Compound { .. }
            | SqlExpr::TableReference { .. }
            | SqlExpr::Column(_)
            | SqlExpr::Entity(_)
            | SqlExpr::EntityReference { .. }) => named,
            other => SqlExpr::named(None, other),
        });
    }
    if builder.top_expression.is_none() {
        builder.orderings.clear();
    }
    builder.freeze()
}
