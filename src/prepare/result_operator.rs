//! Folding result operators into the statement being prepared.

use super::{QueryModelVisitor, as_source_statement};
use crate::error::{QuillError, QuillResult};
use crate::ir::{
    AggregationFunction, DataInfo, JoinSemantics, NamedExpression, SqlBinaryOperator, SqlExpr,
    SqlOrdering, SqlStatementBuilder, SqlTable, TableInfo,
};
use crate::query::{OrderingDirection, ResultOperator};
use crate::value::ValueType;

const ROW_NUMBER_NAME: &str = "ROW_NUMBER";

impl QueryModelVisitor<'_> {
    pub(super) fn visit_result_operator(&mut self, operator: &ResultOperator) -> QuillResult<()> {
        if !matches!(self.builder.data_info, Some(DataInfo::Sequence { .. })) {
            return Err(QuillError::result_operator(
                operator.name(),
                "no operator can follow an operator that yields a single value",
            ));
        }

        match operator {
            ResultOperator::Count => self.add_aggregation(AggregationFunction::Count, Some(ValueType::Int32)),
            ResultOperator::LongCount => {
                self.add_aggregation(AggregationFunction::Count, Some(ValueType::Int64))
            }
            ResultOperator::Min => self.add_aggregation(AggregationFunction::Min, None),
            ResultOperator::Max => self.add_aggregation(AggregationFunction::Max, None),
            ResultOperator::Sum => self.add_aggregation(AggregationFunction::Sum, None),
            ResultOperator::Average => {
                self.add_aggregation(AggregationFunction::Average, Some(ValueType::Double))
            }
            ResultOperator::Take(count) => {
                let count = self.prepare_expression(count)?;
                self.add_take(count)
            }
            ResultOperator::Skip(offset) => {
                let offset = self.prepare_expression(offset)?;
                self.add_skip(offset)
            }
            ResultOperator::First {
                return_default_when_empty,
            } => self.add_single_value(1, *return_default_when_empty),
            ResultOperator::Single {
                return_default_when_empty,
            } => self.add_single_value(2, *return_default_when_empty),
            ResultOperator::Distinct => {
                if self.builder.top_expression.is_some() || self.builder.row_number_selector.is_some() {
                    self.move_statement_to_sub_statement()?;
                }
                self.builder.is_distinct = true;
                Ok(())
            }
            ResultOperator::Other(name) => Err(QuillError::result_operator(
                name.as_str(),
                "no translation is registered for this operator",
            )),
        }
    }

    fn add_aggregation(&mut self, function: AggregationFunction, ty: Option<ValueType>) -> QuillResult<()> {
        if self.builder.has_row_limiting() {
            self.move_statement_to_sub_statement()?;
        }
        let projection = self.projection()?;
        let ty = ty.unwrap_or_else(|| projection.ty());
        self.builder.select_projection = Some(SqlExpr::Aggregation {
            function,
            expression: Box::new(projection),
            ty: ty.clone(),
        });
        // Orderings do not influence a scalar result.
        self.builder.orderings.clear();
        self.builder.data_info = Some(DataInfo::Scalar { ty });
        Ok(())
    }

    fn add_take(&mut self, count: SqlExpr) -> QuillResult<()> {
        if let (Some(row_number), Some(offset)) = (
            &self.builder.row_number_selector,
            &self.builder.current_row_number_offset,
        ) {
            let condition = SqlExpr::binary(
                SqlBinaryOperator::LessThanOrEqual,
                row_number.clone(),
                SqlExpr::add(offset.clone(), count),
            );
            self.builder.add_where_condition(condition);
            return Ok(());
        }
        if self.builder.top_expression.is_some() {
            self.move_statement_to_sub_statement()?;
        }
        self.builder.top_expression = Some(count);
        Ok(())
    }

    /// Pages with `ROW_NUMBER()`: the current statement moves into a source
    /// that also exposes the row number, and the outer statement filters on it.
    fn add_skip(&mut self, offset: SqlExpr) -> QuillResult<()> {
        if self.builder.has_row_limiting() {
            self.move_statement_to_sub_statement()?;
        }

        let projection = self.projection()?;
        let projection_ty = projection.ty();
        let mut orderings = std::mem::take(&mut self.builder.orderings);
        if orderings.is_empty() {
            orderings.push(SqlOrdering::new(SqlExpr::int(1), OrderingDirection::Asc));
        }
        self.builder.select_projection = Some(SqlExpr::Compound {
            members: vec![
                NamedExpression::new(Some(NamedExpression::DEFAULT_NAME.to_string()), projection),
                NamedExpression::new(
                    Some(ROW_NUMBER_NAME.to_string()),
                    SqlExpr::RowNumber { orderings },
                ),
            ],
        });
        self.builder.data_info = Some(DataInfo::Sequence {
            item_type: ValueType::Object,
        });

        let reference = self.move_statement_to_sub_statement()?;
        let row_number = SqlExpr::member(reference.clone(), ROW_NUMBER_NAME, ValueType::Int64);
        self.builder.select_projection = Some(SqlExpr::member(
            reference,
            NamedExpression::DEFAULT_NAME,
            projection_ty.clone(),
        ));
        self.builder.add_where_condition(SqlExpr::binary(
            SqlBinaryOperator::GreaterThan,
            row_number.clone(),
            offset.clone(),
        ));
        self.builder.orderings = vec![SqlOrdering::new(row_number.clone(), OrderingDirection::Asc)];
        self.builder.row_number_selector = Some(row_number);
        self.builder.current_row_number_offset = Some(offset);
        self.builder.data_info = Some(DataInfo::Sequence {
            item_type: projection_ty,
        });
        Ok(())
    }

    /// `First` (top 1) and `Single` (top 2, so a second row can be detected).
    fn add_single_value(&mut self, top: i64, return_default_when_empty: bool) -> QuillResult<()> {
        if self.builder.top_expression.is_some() {
            self.move_statement_to_sub_statement()?;
        }
        let ty = self.projection()?.ty();
        self.builder.top_expression = Some(SqlExpr::int(top));
        self.builder.data_info = Some(DataInfo::SingleValue {
            ty,
            return_default_when_empty,
        });
        Ok(())
    }

    fn projection(&self) -> QuillResult<SqlExpr> {
        self.builder
            .select_projection
            .clone()
            .ok_or_else(|| QuillError::contract("a result operator requires a select projection"))
    }

    /// Moves the statement built so far into a sub-statement source of a
    /// fresh outer statement that selects everything it exposes. Returns the
    /// reference to the new source.
    fn move_statement_to_sub_statement(&mut self) -> QuillResult<SqlExpr> {
        let inner = std::mem::take(&mut self.builder).freeze()?;
        let inner = as_source_statement(inner)?;
        let ty = inner.select_projection().ty();

        let key = self.ids.table_key();
        let alias = self.ids.unique_identifier("q");
        let reference = SqlExpr::TableReference { key, ty: ty.clone() };
        self.builder = SqlStatementBuilder {
            select_projection: Some(reference.clone()),
            sql_tables: vec![SqlTable::new(
                key,
                TableInfo::ResolvedSubStatement {
                    alias,
                    statement: Box::new(inner),
                },
                JoinSemantics::Inner,
            )],
            data_info: Some(DataInfo::Sequence { item_type: ty }),
            ..Default::default()
        };
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::super::prepare_query_model;
    use super::*;
    use crate::ids::UniqueIdentifierGenerator;
    use crate::ir::SqlStatement;
    use crate::query::{Expr, Ordering, QueryModel};
    use crate::transformer::MethodCallTransformerRegistry;
    use pretty_assertions::assert_eq;

    fn first_names() -> QueryModel {
        QueryModel::from_table("c", "Cook").select(
            Expr::source("c", ValueType::entity("Cook")).member("FirstName", ValueType::String),
        )
    }

    fn prepare(model: QueryModel) -> QuillResult<SqlStatement> {
        let registry = MethodCallTransformerRegistry::with_defaults();
        let mut ids = UniqueIdentifierGenerator::new();
        prepare_query_model(&model, &registry, &mut ids)
    }

    fn sub_statement(statement: &SqlStatement) -> &SqlStatement {
        match &statement.sql_tables()[0].table_info {
            TableInfo::ResolvedSubStatement { statement, .. } => statement,
            other => panic!("expected a sub-statement source, found {other:?}"),
        }
    }

    #[test]
    fn test_take_sets_top() {
        let statement = prepare(first_names().result_operator(ResultOperator::Take(Expr::int(5)))).unwrap();
        assert_eq!(
            statement.top_expression(),
            Some(&SqlExpr::constant(5, ValueType::Int32))
        );
    }

    #[test]
    fn test_count_discards_orderings() {
        let model = first_names()
            .order_by(vec![Ordering::asc(
                Expr::source("c", ValueType::entity("Cook")).member("Name", ValueType::String),
            )])
            .result_operator(ResultOperator::Count);
        let statement = prepare(model).unwrap();
        assert!(statement.orderings().is_empty());
        assert_eq!(statement.data_info(), &DataInfo::Scalar { ty: ValueType::Int32 });
    }

    #[test]
    fn test_count_after_take_nests_statement() {
        let model = first_names()
            .result_operator(ResultOperator::Take(Expr::int(5)))
            .result_operator(ResultOperator::Count);
        let statement = prepare(model).unwrap();
        assert!(statement.top_expression().is_none());
        assert!(sub_statement(&statement).top_expression().is_some());
    }

    #[test]
    fn test_distinct_after_take_nests_statement() {
        let model = first_names()
            .result_operator(ResultOperator::Take(Expr::int(5)))
            .result_operator(ResultOperator::Distinct);
        let statement = prepare(model).unwrap();
        assert!(statement.is_distinct());
        assert!(!sub_statement(&statement).is_distinct());
    }

    #[test]
    fn test_single_uses_two_rows() {
        let model = first_names().result_operator(ResultOperator::Single {
            return_default_when_empty: false,
        });
        let statement = prepare(model).unwrap();
        assert_eq!(statement.top_expression(), Some(&SqlExpr::int(2)));
        assert_eq!(
            statement.data_info(),
            &DataInfo::SingleValue {
                ty: ValueType::String,
                return_default_when_empty: false
            }
        );
    }

    #[test]
    fn test_operator_after_first_is_unsupported() {
        let model = first_names()
            .result_operator(ResultOperator::First {
                return_default_when_empty: true,
            })
            .result_operator(ResultOperator::Distinct);
        assert!(matches!(
            prepare(model),
            Err(QuillError::UnsupportedResultOperator { .. })
        ));
    }

    #[test]
    fn test_unknown_operator_is_unsupported() {
        let model = first_names().result_operator(ResultOperator::Other("Reverse".to_string()));
        match prepare(model) {
            Err(QuillError::UnsupportedResultOperator { operator, .. }) => assert_eq!(operator, "Reverse"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_skip_pages_with_row_number() {
        let model = first_names()
            .result_operator(ResultOperator::Skip(Expr::int(10)))
            .result_operator(ResultOperator::Take(Expr::int(5)));
        let statement = prepare(model).unwrap();
        assert!(statement.row_number_selector().is_some());
        assert_eq!(
            statement.current_row_number_offset(),
            Some(&SqlExpr::constant(10, ValueType::Int32))
        );
        assert!(statement.top_expression().is_none());
        assert_eq!(statement.orderings().len(), 1);

        let inner = sub_statement(&statement);
        let SqlExpr::Compound { members } = inner.select_projection() else {
            panic!("expected value and row number");
        };
        assert_eq!(members[1].effective_name(), "ROW_NUMBER");
    }
}
