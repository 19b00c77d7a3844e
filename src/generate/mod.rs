//! Generation stage: resolved `SqlStatement` to command text and parameters.
//!
//! Clauses are emitted in fixed order:
//! `SELECT [DISTINCT] [TOP (n)] <projection> FROM <sources> [WHERE ..] [GROUP BY ..] [ORDER BY ..]`.

mod command;
mod dialect;
mod expression;
mod traits;

pub use command::{CommandBuilder, CommandParameter, SqlCommand};
pub use dialect::Dialect;
pub use traits::{SqlGenerator, SqlServerGenerator};

use crate::error::{QuillError, QuillResult};
use crate::ir::{JoinInfo, JoinSemantics, Joins, SqlExpr, SqlStatement, TableInfo};

/// Emits `statement` as a complete command. `native_boolean` must match the
/// flag the statement was resolved with.
pub fn generate_command(
    statement: &SqlStatement,
    generator: &dyn SqlGenerator,
    native_boolean: bool,
) -> QuillResult<SqlCommand> {
    let mut command = CommandBuilder::new(generator).with_native_boolean(native_boolean);
    command.append_statement(statement, false)?;
    Ok(command.build())
}

impl CommandBuilder<'_> {
    /// Appends `statement` without surrounding parentheses. Nested statements
    /// only keep their ORDER BY when a TOP limits them.
    pub(crate) fn append_statement(&mut self, statement: &SqlStatement, nested: bool) -> QuillResult<()> {
        self.append("SELECT ");
        if statement.is_distinct() {
            self.append("DISTINCT ");
        }
        if let Some(top) = statement.top_expression() {
            self.append("TOP (");
            self.append_expression(top)?;
            self.append(") ");
        }
        self.append_projection(statement.select_projection())?;

        if !statement.sql_tables().is_empty() {
            self.append(" FROM ");
            self.append_from(statement)?;
        }

        if let Some(condition) = statement.where_condition() {
            self.append(" WHERE ");
            self.append_predicate(condition)?;
        }

        if let Some(group_by) = statement.group_by_expression() {
            self.append(" GROUP BY ");
            self.append_grouping(group_by)?;
        }

        if !statement.orderings().is_empty() && (!nested || statement.top_expression().is_some()) {
            self.append(" ORDER BY ");
            self.append_orderings(statement.orderings())?;
        }
        Ok(())
    }

    fn append_from(&mut self, statement: &SqlStatement) -> QuillResult<()> {
        for (i, table) in statement.sql_tables().iter().enumerate() {
            if i > 0 {
                match (&table.table_info, table.join_semantics) {
                    (TableInfo::ResolvedSubStatement { .. }, JoinSemantics::Left) => {
                        self.append(" OUTER APPLY ")
                    }
                    (TableInfo::ResolvedSubStatement { .. }, JoinSemantics::Inner) => {
                        self.append(" CROSS APPLY ")
                    }
                    _ => self.append(" CROSS JOIN "),
                }
            }
            self.append_table_source(&table.table_info)?;
            self.append_joins(&table.joins)?;
        }
        Ok(())
    }

    fn append_table_source(&mut self, table_info: &TableInfo) -> QuillResult<()> {
        match table_info {
            TableInfo::ResolvedSimple {
                table_name, alias, ..
            } => {
                self.append_identifier(table_name);
                self.append(" AS ");
                self.append_identifier(alias);
            }
            TableInfo::ResolvedSubStatement { alias, statement } => {
                self.append("(");
                self.append_statement(statement, true)?;
                self.append(") AS ");
                self.append_identifier(alias);
            }
            TableInfo::Unresolved { item_type } => {
                return Err(QuillError::UnsupportedExpressionKind {
                    kind: "UnresolvedTableInfo",
                    expression: format!("table source for '{}'", item_type),
                });
            }
        }
        Ok(())
    }

    /// Depth-first: each join is followed by the joins hanging off it.
    fn append_joins(&mut self, joins: &Joins) -> QuillResult<()> {
        for (member, joined) in joins.iter() {
            let JoinInfo::Resolved(join) = &joined.join_info else {
                return Err(QuillError::UnsupportedExpressionKind {
                    kind: "UnresolvedJoinInfo",
                    expression: format!("join for member '{}'", member),
                });
            };
            match joined.join_semantics {
                JoinSemantics::Inner => self.append(" INNER JOIN "),
                JoinSemantics::Left => self.append(" LEFT OUTER JOIN "),
            }
            self.append_table_source(&join.foreign_table_info)?;
            self.append(" ON ");
            self.append_expression(&join.left_key)?;
            self.append(" = ");
            self.append_expression(&join.right_key)?;
            self.append_joins(&joined.joins)?;
        }
        Ok(())
    }

    /// GROUP BY keys: values only, never aliased.
    fn append_grouping(&mut self, expr: &SqlExpr) -> QuillResult<()> {
        match expr {
            SqlExpr::Named(named) => self.append_grouping(&named.expression),
            SqlExpr::Compound { members } => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        self.append(", ");
                    }
                    self.append_grouping(&member.expression)?;
                }
                Ok(())
            }
            SqlExpr::Entity(entity) => {
                for (i, column) in entity.columns.iter().enumerate() {
                    if i > 0 {
                        self.append(", ");
                    }
                    self.append_column(&column.owning_alias, &column.name);
                }
                Ok(())
            }
            other => self.append_expression(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TableKey;
    use crate::ir::{
        DataInfo, ResolvedJoinInfo, SqlColumn, SqlEntity, SqlOrdering, SqlStatementBuilder, SqlTable,
    };
    use crate::query::OrderingDirection;
    use crate::value::{Value, ValueType};
    use pretty_assertions::assert_eq;

    fn simple_table(key: usize, table: &str, alias: &str) -> SqlTable {
        SqlTable::new(
            TableKey(key),
            TableInfo::ResolvedSimple {
                item_type: table.to_string(),
                table_name: table.to_string(),
                alias: alias.to_string(),
            },
            JoinSemantics::Inner,
        )
    }

    fn column(ty: ValueType, alias: &str, name: &str) -> SqlExpr {
        SqlExpr::Column(SqlColumn::new(ty, alias, name, false))
    }

    fn statement(projection: SqlExpr, tables: Vec<SqlTable>) -> SqlStatementBuilder {
        SqlStatementBuilder {
            data_info: Some(DataInfo::Sequence {
                item_type: projection.ty(),
            }),
            select_projection: Some(projection),
            sql_tables: tables,
            ..Default::default()
        }
    }

    fn generate(builder: SqlStatementBuilder) -> SqlCommand {
        generate_command(&builder.freeze().unwrap(), &SqlServerGenerator, false).unwrap()
    }

    #[test]
    fn test_constant_projection() {
        let command = generate(statement(
            SqlExpr::constant("hugo", ValueType::String),
            vec![simple_table(0, "CookTable", "t0")],
        ));
        assert_eq!(command.command_text, "SELECT @1 FROM [CookTable] AS [t0]");
        assert_eq!(
            command.parameters,
            vec![CommandParameter {
                name: "@1".to_string(),
                value: Value::from("hugo"),
            }]
        );
    }

    #[test]
    fn test_single_join() {
        let mut s2 = simple_table(0, "s2", "s2_alias");
        s2.joins.get_or_add("s1", JoinSemantics::Left, || {
            JoinInfo::Resolved(ResolvedJoinInfo {
                foreign_table_info: TableInfo::ResolvedSimple {
                    item_type: "s1".to_string(),
                    table_name: "s1".to_string(),
                    alias: "s1_alias".to_string(),
                },
                left_key: column(ValueType::Int32, "s2_alias", "c2"),
                right_key: column(ValueType::Int32, "s1_alias", "c1"),
            })
        });
        let command = generate(statement(column(ValueType::Int32, "s2_alias", "c2"), vec![s2]));
        assert_eq!(
            command.command_text,
            "SELECT [s2_alias].[c2] FROM [s2] AS [s2_alias] LEFT OUTER JOIN [s1] AS [s1_alias] ON [s2_alias].[c2] = [s1_alias].[c1]"
        );
    }

    #[test]
    fn test_clause_order() {
        let mut builder = statement(
            column(ValueType::String, "t0", "FirstName"),
            vec![simple_table(0, "CookTable", "t0")],
        );
        builder.is_distinct = true;
        builder.top_expression = Some(SqlExpr::int(10));
        builder.where_condition = Some(SqlExpr::equal(
            column(ValueType::Int32, "t0", "ID"),
            SqlExpr::constant(3, ValueType::Int32),
        ));
        builder.orderings = vec![
            SqlOrdering::new(column(ValueType::String, "t0", "Name"), OrderingDirection::Desc),
            SqlOrdering::new(column(ValueType::Int32, "t0", "ID"), OrderingDirection::Asc),
        ];
        let command = generate(builder);
        assert_eq!(
            command.command_text,
            "SELECT DISTINCT TOP (10) [t0].[FirstName] FROM [CookTable] AS [t0] WHERE ([t0].[ID] = @1) ORDER BY [t0].[Name] DESC, [t0].[ID] ASC"
        );
    }

    #[test]
    fn test_cross_join_and_apply() {
        let inner = statement(
            column(ValueType::String, "t1", "Name"),
            vec![simple_table(1, "KitchenTable", "t1")],
        )
        .freeze()
        .unwrap();
        let outer_apply = SqlTable::new(
            TableKey(2),
            TableInfo::ResolvedSubStatement {
                alias: "q0".to_string(),
                statement: Box::new(inner),
            },
            JoinSemantics::Left,
        );
        let command = generate(statement(
            column(ValueType::String, "t0", "Name"),
            vec![
                simple_table(0, "CookTable", "t0"),
                simple_table(3, "RestaurantTable", "t2"),
                outer_apply,
            ],
        ));
        assert_eq!(
            command.command_text,
            "SELECT [t0].[Name] FROM [CookTable] AS [t0] CROSS JOIN [RestaurantTable] AS [t2] OUTER APPLY (SELECT [t1].[Name] FROM [KitchenTable] AS [t1]) AS [q0]"
        );
    }

    #[test]
    fn test_nested_statement_drops_ordering_without_top() {
        let mut inner = statement(
            column(ValueType::String, "t1", "Name"),
            vec![simple_table(1, "KitchenTable", "t1")],
        );
        inner.orderings = vec![SqlOrdering::new(
            column(ValueType::String, "t1", "Name"),
            OrderingDirection::Asc,
        )];
        let inner = inner.freeze().unwrap();
        let command = generate(statement(
            SqlExpr::SubStatement(Box::new(inner)),
            vec![simple_table(0, "CookTable", "t0")],
        ));
        assert_eq!(
            command.command_text,
            "SELECT (SELECT [t1].[Name] FROM [KitchenTable] AS [t1]) FROM [CookTable] AS [t0]"
        );
    }

    #[test]
    fn test_group_by_entity_lists_columns() {
        let entity = SqlEntity {
            item_type: "Kitchen".to_string(),
            table_alias: "t0".to_string(),
            name: None,
            primary_key: SqlColumn::new(ValueType::Int32, "t0", "ID", true),
            columns: vec![
                SqlColumn::new(ValueType::Int32, "t0", "ID", true),
                SqlColumn::new(ValueType::String, "t0", "Name", false),
            ],
        };
        let mut builder = statement(
            SqlExpr::Entity(entity.clone()),
            vec![simple_table(0, "KitchenTable", "t0")],
        );
        builder.group_by_expression = Some(SqlExpr::Entity(entity));
        let command = generate(builder);
        assert_eq!(
            command.command_text,
            "SELECT [t0].[ID], [t0].[Name] FROM [KitchenTable] AS [t0] GROUP BY [t0].[ID], [t0].[Name]"
        );
    }

    #[test]
    fn test_unresolved_table_is_rejected() {
        let builder = statement(
            SqlExpr::int(1),
            vec![SqlTable::new(
                TableKey(0),
                TableInfo::Unresolved {
                    item_type: "Cook".to_string(),
                },
                JoinSemantics::Inner,
            )],
        );
        let err = generate_command(&builder.freeze().unwrap(), &SqlServerGenerator, false).unwrap_err();
        assert!(matches!(
            err,
            QuillError::UnsupportedExpressionKind {
                kind: "UnresolvedTableInfo",
                ..
            }
        ));
    }
}
