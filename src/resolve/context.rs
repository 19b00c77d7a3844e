//! Predicate / value context of an expression position.

use super::StatementResolver;
use crate::error::{QuillError, QuillResult};
use crate::ir::{SqlBinaryOperator, SqlExpr};
use crate::value::{Value, ValueType};

/// What the position an expression is resolved for requires.
///
/// Passed explicitly down the resolution recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlExpressionContext {
    /// `WHERE`, `AND`/`OR` operands, `NOT`, `CASE WHEN` tests.
    PredicateRequired,
    /// Projections, group keys: entities and compounds are allowed.
    ValueRequired,
    /// Operands, function arguments, orderings, `TOP`: exactly one column value.
    SingleValueRequired,
}

impl StatementResolver<'_> {
    /// Adapts a resolved expression to `context`.
    pub(super) fn apply_context(&self, expr: SqlExpr, context: SqlExpressionContext) -> QuillResult<SqlExpr> {
        if context == SqlExpressionContext::SingleValueRequired
            && matches!(
                expr,
                SqlExpr::Entity(_) | SqlExpr::EntityReference { .. } | SqlExpr::EntityConstant { .. }
            )
        {
            return Err(QuillError::UnsupportedExpressionKind {
                kind: expr.kind_name(),
                expression: "an entity cannot be used where a single value is required".to_string(),
            });
        }
        if context == SqlExpressionContext::PredicateRequired
            && let SqlExpr::Constant {
                value: Value::Bool(value),
                ..
            } = expr
        {
            return Ok(tautology(value));
        }
        if self.native_boolean {
            return Ok(expr);
        }

        Ok(match context {
            SqlExpressionContext::PredicateRequired => match expr {
                expr if expr.is_predicate() => expr,
                expr if expr.ty().is_boolean() => SqlExpr::equal(expr, SqlExpr::int(1)),
                expr => expr,
            },
            SqlExpressionContext::ValueRequired | SqlExpressionContext::SingleValueRequired => {
                if expr.is_predicate() {
                    SqlExpr::Case {
                        cases: vec![(expr, SqlExpr::int(1))],
                        else_value: Some(Box::new(SqlExpr::int(0))),
                        ty: ValueType::Boolean,
                    }
                } else {
                    expr
                }
            }
        })
    }
}

/// `(1 = 1)` or `(1 <> 1)`.
pub(crate) fn tautology(value: bool) -> SqlExpr {
    let op = if value {
        SqlBinaryOperator::Equal
    } else {
        SqlBinaryOperator::NotEqual
    };
    SqlExpr::binary(op, SqlExpr::int(1), SqlExpr::int(1))
}
