//! Expression text.

use super::command::CommandBuilder;
use crate::error::{QuillError, QuillResult};
use crate::ir::{
    AggregationFunction, NamedExpression, SqlBinaryOperator, SqlColumn, SqlEntity, SqlExpr,
    SqlLiteral, SqlOrdering, referenced_column_name,
};
use crate::transformer::like::LIKE_ESCAPE_CHAR;

impl CommandBuilder<'_> {
    /// A value position.
    pub(crate) fn append_expression(&mut self, expr: &SqlExpr) -> QuillResult<()> {
        match expr {
            SqlExpr::Column(column) => self.append_sql_column(column),
            SqlExpr::Constant { value, .. } => {
                if value.is_null() {
                    self.append("NULL");
                } else {
                    self.append_parameter(value.clone());
                }
            }
            SqlExpr::Literal(literal) => self.append_literal(literal),
            SqlExpr::CustomText { text, .. } => self.append(text),
            SqlExpr::Entity(entity) => self.append_entity(entity, None, entity.name.as_deref()),
            SqlExpr::EntityReference {
                table_alias,
                name,
                entity,
            } => self.append_entity_reference(table_alias, entity, name.as_deref()),
            SqlExpr::EntityConstant { primary_key, .. } => self.append_expression(primary_key)?,
            SqlExpr::Binary { op, left, right, .. } => self.append_binary(*op, left, right)?,
            SqlExpr::Like {
                expression,
                pattern,
            } => {
                self.append_expression(expression)?;
                self.append(" LIKE ");
                self.append_expression(pattern)?;
                self.append(&format!(" ESCAPE '{}'", LIKE_ESCAPE_CHAR));
            }
            SqlExpr::LikeEscape(value) => self.append_like_escape(value)?,
            SqlExpr::Logical { op, left, right } => {
                self.append("(");
                self.append_predicate(left)?;
                self.append(&format!(" {} ", op));
                self.append_predicate(right)?;
                self.append(")");
            }
            SqlExpr::Not(operand) => {
                self.append("NOT (");
                self.append_predicate(operand)?;
                self.append(")");
            }
            SqlExpr::Case {
                cases, else_value, ..
            } => {
                self.append("CASE");
                for (test, value) in cases {
                    self.append(" WHEN ");
                    self.append_predicate(test)?;
                    self.append(" THEN ");
                    self.append_expression(value)?;
                }
                if let Some(else_value) = else_value {
                    self.append(" ELSE ");
                    self.append_expression(else_value)?;
                }
                self.append(" END");
            }
            SqlExpr::Function(function) => {
                self.append(&function.name);
                self.append("(");
                self.append_list(&function.args)?;
                self.append(")");
            }
            SqlExpr::Convert {
                target, expression, ..
            } => {
                self.append(&format!("CONVERT({}, ", target));
                self.append_expression(expression)?;
                self.append(")");
            }
            SqlExpr::Aggregation {
                function,
                expression,
                ..
            } => match function {
                AggregationFunction::Count => self.append("COUNT(*)"),
                _ => {
                    self.append(&format!("{}(", function));
                    self.append_expression(expression)?;
                    self.append(")");
                }
            },
            SqlExpr::RowNumber { orderings } => {
                self.append("ROW_NUMBER() OVER (ORDER BY ");
                self.append_orderings(orderings)?;
                self.append(")");
            }
            SqlExpr::Named(named) => self.append_named(named)?,
            SqlExpr::Compound { members } => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        self.append(", ");
                    }
                    self.append_named(member)?;
                }
            }
            SqlExpr::SubStatement(statement) => {
                self.append("(");
                self.append_statement(statement, true)?;
                self.append(")");
            }
            SqlExpr::TableReference { .. }
            | SqlExpr::Member { .. }
            | SqlExpr::EntityRefMember { .. }
            | SqlExpr::MethodCall(_) => {
                return Err(QuillError::UnsupportedExpressionKind {
                    kind: expr.kind_name(),
                    expression: "the expression was not resolved before generation".to_string(),
                });
            }
        }
        Ok(())
    }

    /// A predicate position (WHERE, AND/OR operands, NOT, CASE WHEN tests).
    pub(crate) fn append_predicate(&mut self, expr: &SqlExpr) -> QuillResult<()> {
        if !expr.is_predicate() && !self.native_boolean() {
            return Err(QuillError::UnsupportedCriterionKind {
                kind: expr.kind_name(),
                expression: "a value cannot be used as a predicate".to_string(),
            });
        }
        self.append_expression(expr)
    }

    pub(crate) fn append_projection(&mut self, expr: &SqlExpr) -> QuillResult<()> {
        self.append_expression(expr)
    }

    /// Ordering keys; constants are wrapped in a sub-select since they are
    /// not allowed as ORDER BY items.
    pub(crate) fn append_orderings(&mut self, orderings: &[SqlOrdering]) -> QuillResult<()> {
        for (i, ordering) in orderings.iter().enumerate() {
            if i > 0 {
                self.append(", ");
            }
            match &ordering.expression {
                expr @ (SqlExpr::Constant { .. } | SqlExpr::Literal(_)) => {
                    self.append("(SELECT ");
                    self.append_expression(expr)?;
                    self.append(")");
                }
                expr => self.append_expression(expr)?,
            }
            self.append(&format!(" {}", ordering.direction));
        }
        Ok(())
    }

    pub(crate) fn append_column(&mut self, alias: &str, name: &str) {
        self.append_identifier(alias);
        self.append(".");
        if name == "*" {
            self.append("*");
        } else {
            self.append_identifier(name);
        }
    }

    fn append_sql_column(&mut self, column: &SqlColumn) {
        self.append_column(&column.owning_alias, &column.name);
    }

    fn append_literal(&mut self, literal: &SqlLiteral) {
        match literal {
            SqlLiteral::Int(n) => self.append(&n.to_string()),
            SqlLiteral::String(s) => self.append(&format!("'{}'", s.replace('\'', "''"))),
            SqlLiteral::Null => self.append("NULL"),
        }
    }

    fn append_list(&mut self, exprs: &[SqlExpr]) -> QuillResult<()> {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.append(", ");
            }
            self.append_expression(expr)?;
        }
        Ok(())
    }

    /// Entity columns of the table aliased `entity.table_alias`. Columns are
    /// read under `source_prefix` and aliased under `output_prefix`.
    fn append_entity(&mut self, entity: &SqlEntity, source_prefix: Option<&str>, output_prefix: Option<&str>) {
        self.append_entity_columns(&entity.table_alias, entity, source_prefix, output_prefix);
    }

    fn append_entity_reference(&mut self, table_alias: &str, entity: &SqlEntity, output_prefix: Option<&str>) {
        self.append_entity_columns(table_alias, entity, entity.name.as_deref(), output_prefix);
    }

    fn append_entity_columns(
        &mut self,
        table_alias: &str,
        entity: &SqlEntity,
        source_prefix: Option<&str>,
        output_prefix: Option<&str>,
    ) {
        for (i, column) in entity.columns.iter().enumerate() {
            if i > 0 {
                self.append(", ");
            }
            if column.is_star() {
                self.append_column(table_alias, "*");
                continue;
            }
            let source = referenced_column_name(source_prefix, &column.name);
            let output = referenced_column_name(output_prefix, &column.name);
            self.append_column(table_alias, &source);
            if output != source {
                self.append(" AS ");
                self.append_identifier(&output);
            }
        }
    }

    fn append_named(&mut self, named: &NamedExpression) -> QuillResult<()> {
        match named.expression.as_ref() {
            SqlExpr::Entity(entity) => {
                self.append_entity(entity, None, named.name.as_deref());
                Ok(())
            }
            SqlExpr::EntityReference {
                table_alias,
                entity,
                ..
            } => {
                self.append_entity_reference(table_alias, entity, named.name.as_deref());
                Ok(())
            }
            SqlExpr::Compound { .. } => self.append_expression(&named.expression),
            expr => {
                self.append_expression(expr)?;
                self.append(" AS ");
                self.append_identifier(named.effective_name());
                Ok(())
            }
        }
    }

    fn append_binary(&mut self, op: SqlBinaryOperator, left: &SqlExpr, right: &SqlExpr) -> QuillResult<()> {
        use SqlBinaryOperator::*;

        if op.is_comparison() && (left.is_null_constant() || right.is_null_constant()) {
            let subject = if right.is_null_constant() { left } else { right };
            match op {
                Equal | LessThanOrEqual | GreaterThanOrEqual => {
                    self.append("(");
                    self.append_expression(subject)?;
                    self.append(" IS NULL)");
                }
                NotEqual => {
                    self.append("(");
                    self.append_expression(subject)?;
                    self.append(" IS NOT NULL)");
                }
                _ => self.append("(1 <> 1)"),
            }
            return Ok(());
        }

        if op.is_comparison() && is_nullable_column(left) && is_nullable_column(right) {
            match op {
                Equal | LessThanOrEqual | GreaterThanOrEqual => {
                    self.append("((");
                    self.append_expression(left)?;
                    self.append(" IS NULL AND ");
                    self.append_expression(right)?;
                    self.append(" IS NULL) OR ");
                    self.append_comparison(op, left, right)?;
                    self.append(")");
                    return Ok(());
                }
                NotEqual => {
                    self.append("((");
                    self.append_expression(left)?;
                    self.append(" IS NULL AND ");
                    self.append_expression(right)?;
                    self.append(" IS NOT NULL) OR (");
                    self.append_expression(left)?;
                    self.append(" IS NOT NULL AND ");
                    self.append_expression(right)?;
                    self.append(" IS NULL) OR ");
                    self.append_comparison(op, left, right)?;
                    self.append(")");
                    return Ok(());
                }
                _ => {}
            }
        }

        self.append("(");
        self.append_comparison(op, left, right)?;
        self.append(")");
        Ok(())
    }

    /// `left op right` without parentheses.
    fn append_comparison(&mut self, op: SqlBinaryOperator, left: &SqlExpr, right: &SqlExpr) -> QuillResult<()> {
        self.append_expression(left)?;
        let operator = match op {
            SqlBinaryOperator::Concat => self.generator().string_concat_operator().to_string(),
            op => op.to_string(),
        };
        self.append(&format!(" {} ", operator));
        self.append_expression(right)
    }

    /// Escapes `\ % _ [` (in that order) in a runtime pattern value.
    fn append_like_escape(&mut self, value: &SqlExpr) -> QuillResult<()> {
        self.append("REPLACE(REPLACE(REPLACE(REPLACE(");
        self.append_expression(value)?;
        self.append(r",'\','\\'),'%','\%'),'_','\_'),'[','\[')");
        Ok(())
    }
}

fn is_nullable_column(expr: &SqlExpr) -> bool {
    matches!(expr, SqlExpr::Column(column) if column.ty.is_nullable())
}

#[cfg(test)]
mod tests {
    use crate::generate::{CommandBuilder, SqlServerGenerator};
    use crate::ir::{LogicalOperator, NamedExpression, SqlBinaryOperator, SqlColumn, SqlEntity, SqlExpr};
    use crate::value::{Value, ValueType};
    use pretty_assertions::assert_eq;

    fn render(expr: &SqlExpr) -> String {
        let generator = SqlServerGenerator;
        let mut builder = CommandBuilder::new(&generator);
        builder.append_expression(expr).unwrap();
        builder.text().to_string()
    }

    fn nullable(alias: &str, name: &str) -> SqlExpr {
        SqlExpr::Column(SqlColumn::new(
            ValueType::nullable(ValueType::Int32),
            alias,
            name,
            false,
        ))
    }

    fn name() -> SqlExpr {
        SqlExpr::Column(SqlColumn::new(ValueType::String, "t0", "Name", false))
    }

    fn null() -> SqlExpr {
        SqlExpr::constant(Value::Null, ValueType::String)
    }

    #[test]
    fn test_nullable_columns_equal() {
        let expr = SqlExpr::equal(nullable("t0", "A"), nullable("t1", "B"));
        assert_eq!(
            render(&expr),
            "(([t0].[A] IS NULL AND [t1].[B] IS NULL) OR [t0].[A] = [t1].[B])"
        );
    }

    #[test]
    fn test_nullable_columns_not_equal() {
        let expr = SqlExpr::binary(SqlBinaryOperator::NotEqual, nullable("t0", "A"), nullable("t1", "B"));
        assert_eq!(
            render(&expr),
            "(([t0].[A] IS NULL AND [t1].[B] IS NOT NULL) OR ([t0].[A] IS NOT NULL AND [t1].[B] IS NULL) OR [t0].[A] <> [t1].[B])"
        );
    }

    #[test]
    fn test_nullable_columns_less_or_greater_equal() {
        let expr = SqlExpr::binary(SqlBinaryOperator::LessThanOrEqual, nullable("t0", "A"), nullable("t1", "B"));
        assert_eq!(
            render(&expr),
            "(([t0].[A] IS NULL AND [t1].[B] IS NULL) OR [t0].[A] <= [t1].[B])"
        );
        let expr = SqlExpr::binary(SqlBinaryOperator::GreaterThanOrEqual, nullable("t0", "A"), nullable("t1", "B"));
        assert_eq!(
            render(&expr),
            "(([t0].[A] IS NULL AND [t1].[B] IS NULL) OR [t0].[A] >= [t1].[B])"
        );
    }

    #[test]
    fn test_nullable_columns_less_than_is_plain() {
        let expr = SqlExpr::binary(SqlBinaryOperator::LessThan, nullable("t0", "A"), nullable("t1", "B"));
        assert_eq!(render(&expr), "([t0].[A] < [t1].[B])");
    }

    #[test]
    fn test_null_comparisons_collapse() {
        assert_eq!(render(&SqlExpr::equal(name(), null())), "([t0].[Name] IS NULL)");
        assert_eq!(render(&SqlExpr::equal(null(), name())), "([t0].[Name] IS NULL)");
        assert_eq!(
            render(&SqlExpr::binary(SqlBinaryOperator::NotEqual, name(), null())),
            "([t0].[Name] IS NOT NULL)"
        );
        assert_eq!(
            render(&SqlExpr::binary(SqlBinaryOperator::GreaterThan, name(), null())),
            "(1 <> 1)"
        );
    }

    #[test]
    fn test_like_with_escaped_runtime_pattern() {
        let pattern = SqlExpr::concat(
            SqlExpr::concat(SqlExpr::text("%"), SqlExpr::LikeEscape(Box::new(name()))),
            SqlExpr::text("%"),
        );
        let expr = SqlExpr::Like {
            expression: Box::new(SqlExpr::Column(SqlColumn::new(
                ValueType::String,
                "t0",
                "FirstName",
                false,
            ))),
            pattern: Box::new(pattern),
        };
        assert_eq!(
            render(&expr),
            r"[t0].[FirstName] LIKE (('%' + REPLACE(REPLACE(REPLACE(REPLACE([t0].[Name],'\','\\'),'%','\%'),'_','\_'),'[','\[')) + '%') ESCAPE '\'"
        );
    }

    #[test]
    fn test_string_literal_quotes_are_doubled() {
        assert_eq!(render(&SqlExpr::text("O'Brien")), "'O''Brien'");
    }

    #[test]
    fn test_case_and_logical() {
        let test = SqlExpr::Logical {
            op: LogicalOperator::Or,
            left: Box::new(SqlExpr::equal(SqlExpr::int(1), SqlExpr::int(1))),
            right: Box::new(SqlExpr::Not(Box::new(SqlExpr::equal(SqlExpr::int(1), SqlExpr::int(2))))),
        };
        let expr = SqlExpr::case_when(test, SqlExpr::int(1), SqlExpr::int(0));
        assert_eq!(
            render(&expr),
            "CASE WHEN ((1 = 1) OR NOT ((1 = 2))) THEN 1 ELSE 0 END"
        );
    }

    #[test]
    fn test_value_in_predicate_position_is_rejected() {
        let expr = SqlExpr::Not(Box::new(name()));
        let generator = SqlServerGenerator;
        let mut builder = CommandBuilder::new(&generator);
        assert!(matches!(
            builder.append_expression(&expr),
            Err(crate::QuillError::UnsupportedCriterionKind { kind: "Column", .. })
        ));
    }

    #[test]
    fn test_unresolved_member_is_rejected() {
        let expr = SqlExpr::member(name(), "Length", ValueType::Int32);
        let generator = SqlServerGenerator;
        let mut builder = CommandBuilder::new(&generator);
        assert!(matches!(
            builder.append_expression(&expr),
            Err(crate::QuillError::UnsupportedExpressionKind {
                kind: "MemberAccess",
                ..
            })
        ));
    }

    #[test]
    fn test_named_entity_columns_are_prefixed() {
        let entity = SqlEntity {
            item_type: "Cook".to_string(),
            table_alias: "t0".to_string(),
            name: None,
            primary_key: SqlColumn::new(ValueType::Int32, "t0", "ID", true),
            columns: vec![
                SqlColumn::new(ValueType::Int32, "t0", "ID", true),
                SqlColumn::new(ValueType::String, "t0", "Name", false),
            ],
        };
        let projection = SqlExpr::Compound {
            members: vec![
                NamedExpression::new(Some("c".to_string()), SqlExpr::Entity(entity.clone())),
                NamedExpression::new(Some("n".to_string()), name()),
            ],
        };
        assert_eq!(
            render(&projection),
            "[t0].[ID] AS [c_ID], [t0].[Name] AS [c_Name], [t0].[Name] AS [n]"
        );

        let exposed = SqlExpr::EntityReference {
            table_alias: "q0".to_string(),
            name: Some("c".to_string()),
            entity: entity.with_name(Some("c".to_string())),
        };
        assert_eq!(render(&exposed), "[q0].[c_ID], [q0].[c_Name]");
    }

    #[test]
    fn test_row_number_orders_by_constant_subselect() {
        let expr = SqlExpr::RowNumber {
            orderings: vec![crate::ir::SqlOrdering::new(
                SqlExpr::int(1),
                crate::query::OrderingDirection::Asc,
            )],
        };
        assert_eq!(render(&expr), "ROW_NUMBER() OVER (ORDER BY (SELECT 1) ASC)");
    }
}
