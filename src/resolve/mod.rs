//! Mapping resolution stage: unresolved `SqlStatement` to resolved `SqlStatement`.
//!
//! Fixed order per statement: table sources, then joins, then expressions.
//! Already resolved nodes are left as they are, so resolving a resolved
//! statement again yields the same statement.

mod context;
mod expression;
mod resolver;

pub use context::SqlExpressionContext;
pub use resolver::{MappingResolver, MemberSource};

use std::collections::HashMap;

use crate::error::{QuillError, QuillResult};
use crate::ids::{TableKey, UniqueIdentifierGenerator};
use crate::ir::{
    JoinInfo, Joins, SqlColumn, SqlExpr, SqlStatement, SqlStatementBuilder, SqlTable, TableInfo,
    NamedExpression,
};

/// Resolved expression for each table key in scope. Nested statements
/// inherit the outer entries, which is how correlated sub-queries see
/// their enclosing tables.
type ResolvedTables = HashMap<TableKey, SqlExpr>;

/// Resolves `statement` against `resolver`.
///
/// `native_boolean` disables the predicate/value conversions for dialects
/// with a real boolean type. Boolean constants in predicate positions still
/// become `(1 = 1)` / `(1 <> 1)`.
pub fn resolve_statement(
    statement: &SqlStatement,
    resolver: &dyn MappingResolver,
    ids: &mut UniqueIdentifierGenerator,
    native_boolean: bool,
) -> QuillResult<SqlStatement> {
    StatementResolver::new(resolver, ids, native_boolean, ResolvedTables::new()).resolve(statement)
}

pub(crate) struct StatementResolver<'a> {
    resolver: &'a dyn MappingResolver,
    ids: &'a mut UniqueIdentifierGenerator,
    native_boolean: bool,
    tables: ResolvedTables,
    builder: SqlStatementBuilder,
}

impl<'a> StatementResolver<'a> {
    fn new(
        resolver: &'a dyn MappingResolver,
        ids: &'a mut UniqueIdentifierGenerator,
        native_boolean: bool,
        tables: ResolvedTables,
    ) -> Self {
        Self {
            resolver,
            ids,
            native_boolean,
            tables,
            builder: SqlStatementBuilder::new(),
        }
    }

    fn resolve(mut self, statement: &SqlStatement) -> QuillResult<SqlStatement> {
        self.builder = statement.to_builder();

        let mut tables = std::mem::take(&mut self.builder.sql_tables);
        for table in &mut tables {
            self.resolve_table(table)?;
        }
        for table in &mut tables {
            resolve_joins(self.resolver, self.ids, &mut table.joins)?;
        }
        self.builder.sql_tables = tables;

        self.resolve_expressions()?;
        self.builder.freeze()
    }

    fn resolve_nested(&mut self, statement: &SqlStatement) -> QuillResult<SqlStatement> {
        StatementResolver::new(
            self.resolver,
            &mut *self.ids,
            self.native_boolean,
            self.tables.clone(),
        )
        .resolve(statement)
    }

    fn resolve_table(&mut self, table: &mut SqlTable) -> QuillResult<()> {
        if let TableInfo::Unresolved { item_type } = &table.table_info {
            table.table_info = self.resolver.resolve_table_info(item_type, self.ids)?;
            tracing::trace!(key = ?table.key, alias = ?table.table_info.alias(), "resolved table");
        }

        if let TableInfo::ResolvedSubStatement { statement, .. } = &mut table.table_info {
            let resolved = self.resolve_nested(statement)?;
            **statement = resolved;
        }

        let reference = self.table_reference(&table.table_info)?;
        self.tables.insert(table.key, reference);
        Ok(())
    }

    /// Expression a reference to the item of `table_info` resolves to.
    fn table_reference(&mut self, table_info: &TableInfo) -> QuillResult<SqlExpr> {
        match table_info {
            TableInfo::ResolvedSimple {
                item_type, alias, ..
            } => Ok(SqlExpr::Entity(self.resolver.resolve_simple_table_info(
                item_type,
                alias,
                self.ids,
            )?)),
            TableInfo::ResolvedSubStatement { alias, statement } => {
                Ok(exposed_projection(statement.select_projection(), alias))
            }
            TableInfo::Unresolved { item_type } => Err(QuillError::contract(format!(
                "the resolver left table '{}' unresolved",
                item_type
            ))),
        }
    }

    fn resolve_expressions(&mut self) -> QuillResult<()> {
        use SqlExpressionContext::*;

        if let Some(projection) = self.builder.select_projection.take() {
            let resolved = self.resolve_expression(&projection, ValueRequired)?;
            self.builder.select_projection = Some(resolved);
            self.builder.recalculate_data_info(&projection);
        }
        if let Some(condition) = self.builder.where_condition.take() {
            self.builder.where_condition = Some(self.resolve_expression(&condition, PredicateRequired)?);
        }
        if let Some(group_by) = self.builder.group_by_expression.take() {
            self.builder.group_by_expression = Some(self.resolve_expression(&group_by, ValueRequired)?);
        }
        let mut orderings = std::mem::take(&mut self.builder.orderings);
        for ordering in &mut orderings {
            ordering.expression = self.resolve_expression(&ordering.expression, SingleValueRequired)?;
        }
        self.builder.orderings = orderings;
        if let Some(top) = self.builder.top_expression.take() {
            self.builder.top_expression = Some(self.resolve_expression(&top, SingleValueRequired)?);
        }
        if let Some(row_number) = self.builder.row_number_selector.take() {
            self.builder.row_number_selector =
                Some(self.resolve_expression(&row_number, SingleValueRequired)?);
        }
        if let Some(offset) = self.builder.current_row_number_offset.take() {
            self.builder.current_row_number_offset =
                Some(self.resolve_expression(&offset, SingleValueRequired)?);
        }
        Ok(())
    }
}

fn resolve_joins(
    resolver: &dyn MappingResolver,
    ids: &mut UniqueIdentifierGenerator,
    joins: &mut Joins,
) -> QuillResult<()> {
    for joined in joins.iter_mut() {
        if let JoinInfo::Unresolved(unresolved) = &joined.join_info {
            let resolved = resolver.resolve_join_info(unresolved, ids)?;
            joined.join_info = JoinInfo::Resolved(resolved);
        }
        resolve_joins(resolver, ids, &mut joined.joins)?;
    }
    Ok(())
}

/// How the projection of a sub-statement aliased `alias` is seen from the
/// enclosing statement: named values become columns of the alias, entities
/// become references whose columns are addressed through the alias.
pub(crate) fn exposed_projection(projection: &SqlExpr, alias: &str) -> SqlExpr {
    match projection {
        SqlExpr::Named(named) => exposed_member(named, alias),
        SqlExpr::Compound { members } => SqlExpr::Compound {
            members: members
                .iter()
                .map(|member| NamedExpression::new(member.name.clone(), exposed_member(member, alias)))
                .collect(),
        },
        SqlExpr::Entity(entity) => SqlExpr::EntityReference {
            table_alias: alias.to_string(),
            name: entity.name.clone(),
            entity: entity.clone(),
        },
        SqlExpr::EntityReference { name, entity, .. } => SqlExpr::EntityReference {
            table_alias: alias.to_string(),
            name: name.clone(),
            entity: entity.clone().with_name(name.clone()),
        },
        SqlExpr::Column(column) => SqlExpr::Column(SqlColumn::new(
            column.ty.clone(),
            alias,
            &column.name,
            column.is_primary_key,
        )),
        other => SqlExpr::Column(SqlColumn::new(
            other.ty(),
            alias,
            NamedExpression::DEFAULT_NAME,
            false,
        )),
    }
}

fn exposed_member(named: &NamedExpression, alias: &str) -> SqlExpr {
    match named.expression.as_ref() {
        SqlExpr::Entity(entity) => SqlExpr::EntityReference {
            table_alias: alias.to_string(),
            name: named.name.clone(),
            entity: entity.clone().with_name(named.name.clone()),
        },
        SqlExpr::EntityReference { entity, .. } => SqlExpr::EntityReference {
            table_alias: alias.to_string(),
            name: named.name.clone(),
            entity: entity.clone().with_name(named.name.clone()),
        },
        other => SqlExpr::Column(SqlColumn::new(
            other.ty(),
            alias,
            named.effective_name(),
            false,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DataInfo, JoinSemantics, SqlBinaryOperator};
    use crate::mapping::tests::kitchen_resolver;
    use crate::prepare::prepare_query_model;
    use crate::query::{BinaryOperator, Expr, Ordering, QueryModel, ResultOperator};
    use crate::transformer::MethodCallTransformerRegistry;
    use crate::value::{Value, ValueType};
    use pretty_assertions::assert_eq;

    fn cook() -> Expr {
        Expr::source("c", ValueType::entity("Cook"))
    }

    fn resolve(model: QueryModel) -> QuillResult<SqlStatement> {
        resolve_with(model, false)
    }

    fn resolve_with(model: QueryModel, native_boolean: bool) -> QuillResult<SqlStatement> {
        let registry = MethodCallTransformerRegistry::with_defaults();
        let mut ids = UniqueIdentifierGenerator::new();
        let prepared = prepare_query_model(&model, &registry, &mut ids)?;
        resolve_statement(&prepared, &kitchen_resolver(), &mut ids, native_boolean)
    }

    fn column(ty: ValueType, alias: &str, name: &str) -> SqlExpr {
        SqlExpr::Column(SqlColumn::new(ty, alias, name, false))
    }

    #[test]
    fn test_entity_projection() {
        let statement = resolve(QueryModel::from_table("c", "Cook")).unwrap();
        let SqlExpr::Entity(entity) = statement.select_projection() else {
            panic!("expected an entity, found {:?}", statement.select_projection());
        };
        assert_eq!(entity.table_alias, "t0");
        assert_eq!(entity.columns.len(), 6);
        assert!(matches!(
            &statement.sql_tables()[0].table_info,
            TableInfo::ResolvedSimple { table_name, .. } if table_name == "CookTable"
        ));
    }

    #[test]
    fn test_member_projection() {
        let statement =
            resolve(QueryModel::from_table("c", "Cook").select(cook().member("FirstName", ValueType::String)))
                .unwrap();
        assert_eq!(
            statement.select_projection(),
            &column(ValueType::String, "t0", "FirstName")
        );
        assert_eq!(
            statement.data_info(),
            &DataInfo::Sequence {
                item_type: ValueType::String
            }
        );
    }

    #[test]
    fn test_navigation_joins_once() {
        let kitchen = || cook().member("Kitchen", ValueType::entity("Kitchen"));
        let model = QueryModel::from_table("c", "Cook")
            .where_clause(Expr::binary(
                BinaryOperator::Equal,
                kitchen().member("Name", ValueType::String),
                Expr::string("main"),
            ))
            .select(kitchen().member("Name", ValueType::String));
        let statement = resolve(model).unwrap();

        let joins = &statement.sql_tables()[0].joins;
        assert_eq!(joins.len(), 1);
        let (member, joined) = joins.iter().next().unwrap();
        assert_eq!(member, "Kitchen");
        assert_eq!(joined.join_semantics, JoinSemantics::Left);
        assert_eq!(joined.join_info.alias(), Some("t1"));
        assert_eq!(
            statement.select_projection(),
            &column(ValueType::String, "t1", "KitchenName")
        );
    }

    #[test]
    fn test_nested_navigation() {
        let model = QueryModel::from_table("c", "Cook").select(
            cook()
                .member("Kitchen", ValueType::entity("Kitchen"))
                .member("Restaurant", ValueType::entity("Restaurant"))
                .member("Name", ValueType::String),
        );
        let statement = resolve(model).unwrap();
        let (_, kitchen) = statement.sql_tables()[0].joins.iter().next().unwrap();
        let (member, restaurant) = kitchen.joins.iter().next().unwrap();
        assert_eq!(member, "Restaurant");
        assert_eq!(restaurant.join_info.alias(), Some("t2"));
        assert_eq!(
            statement.select_projection(),
            &column(ValueType::String, "t2", "Name")
        );
    }

    #[test]
    fn test_boolean_column_in_predicate() {
        let model = QueryModel::from_table("c", "Cook")
            .where_clause(cook().member("IsStarredCook", ValueType::Boolean));
        let statement = resolve(model).unwrap();
        assert_eq!(
            statement.where_condition(),
            Some(&SqlExpr::equal(
                column(ValueType::Boolean, "t0", "IsStarredCook"),
                SqlExpr::int(1)
            ))
        );
    }

    #[test]
    fn test_predicate_in_projection_becomes_case() {
        let model = QueryModel::from_table("c", "Cook").select(Expr::binary(
            BinaryOperator::Equal,
            cook().member("FirstName", ValueType::String),
            Expr::string("hugo"),
        ));
        let statement = resolve(model).unwrap();
        assert!(matches!(statement.select_projection(), SqlExpr::Case { .. }));
    }

    #[test]
    fn test_boolean_constant_in_predicate_is_tautology() {
        let model = QueryModel::from_table("c", "Cook").where_clause(Expr::bool(true));
        let statement = resolve(model).unwrap();
        assert_eq!(
            statement.where_condition(),
            Some(&SqlExpr::binary(
                SqlBinaryOperator::Equal,
                SqlExpr::int(1),
                SqlExpr::int(1)
            ))
        );
    }

    #[test]
    fn test_native_boolean_keeps_columns_but_collapses_constants() {
        let starred = cook().member("IsStarredCook", ValueType::Boolean);
        let statement = resolve_with(QueryModel::from_table("c", "Cook").where_clause(starred), true).unwrap();
        assert_eq!(
            statement.where_condition(),
            Some(&column(ValueType::Boolean, "t0", "IsStarredCook"))
        );

        let statement =
            resolve_with(QueryModel::from_table("c", "Cook").where_clause(Expr::bool(false)), true).unwrap();
        assert_eq!(
            statement.where_condition(),
            Some(&SqlExpr::binary(
                SqlBinaryOperator::NotEqual,
                SqlExpr::int(1),
                SqlExpr::int(1)
            ))
        );
    }

    #[test]
    fn test_entity_comparison_uses_primary_keys() {
        let other = Expr::constant(
            Value::Entity {
                type_name: "Cook".to_string(),
                id: Box::new(Value::Int(3)),
            },
            ValueType::entity("Cook"),
        );
        let model =
            QueryModel::from_table("c", "Cook").where_clause(Expr::binary(BinaryOperator::Equal, cook(), other));
        let statement = resolve(model).unwrap();
        assert_eq!(
            statement.where_condition(),
            Some(&SqlExpr::equal(
                SqlExpr::Column(SqlColumn::new(ValueType::Int32, "t0", "ID", true)),
                SqlExpr::constant(3i64, ValueType::Int32)
            ))
        );
    }

    #[test]
    fn test_entity_ordering_is_unsupported() {
        let model = QueryModel::from_table("c", "Cook").order_by(vec![Ordering::asc(cook())]);
        assert!(matches!(
            resolve(model),
            Err(QuillError::UnsupportedExpressionKind { kind: "Entity", .. })
        ));
    }

    #[test]
    fn test_unmapped_member() {
        let model = QueryModel::from_table("c", "Cook").select(cook().member("Age", ValueType::Int32));
        assert!(matches!(
            resolve(model),
            Err(QuillError::UnmappedItem { kind: "member", .. })
        ));
    }

    #[test]
    fn test_sub_statement_member_through_alias() {
        let model = QueryModel::from_table("c", "Cook")
            .select(cook().member("FirstName", ValueType::String))
            .result_operator(ResultOperator::Skip(Expr::int(10)));
        let statement = resolve(model).unwrap();
        assert_eq!(
            statement.select_projection(),
            &column(ValueType::String, "q0", "value")
        );
        assert_eq!(
            statement.row_number_selector(),
            Some(&column(ValueType::Int64, "q0", "ROW_NUMBER"))
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let model = QueryModel::from_table("c", "Cook")
            .where_clause(Expr::binary(
                BinaryOperator::AndAlso,
                cook().member("IsStarredCook", ValueType::Boolean),
                Expr::binary(
                    BinaryOperator::NotEqual,
                    cook()
                        .member("Kitchen", ValueType::entity("Kitchen"))
                        .member("Name", ValueType::String),
                    Expr::string("main"),
                ),
            ))
            .result_operator(ResultOperator::Take(Expr::int(3)));
        let registry = MethodCallTransformerRegistry::with_defaults();
        let resolver = kitchen_resolver();
        let mut ids = UniqueIdentifierGenerator::new();
        let prepared = prepare_query_model(&model, &registry, &mut ids).unwrap();
        let once = resolve_statement(&prepared, &resolver, &mut ids, false).unwrap();
        let twice = resolve_statement(&once, &resolver, &mut ids, false).unwrap();
        assert_eq!(once, twice);
    }
}
