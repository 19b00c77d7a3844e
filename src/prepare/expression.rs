//! Front-end expressions to IR expressions.

use super::QueryModelVisitor;
use crate::error::{QuillError, QuillResult};
use crate::ir::{LogicalOperator, NamedExpression, SqlBinaryOperator, SqlExpr, SqlMethodCall};
use crate::query::{BinaryOperator, Expr, MethodCall};
use crate::transformer::MethodSignature;
use crate::value::{Value, ValueType};

impl QueryModelVisitor<'_> {
    pub(super) fn prepare_expression(&mut self, expr: &Expr) -> QuillResult<SqlExpr> {
        match expr {
            Expr::Constant { value, ty } => Ok(SqlExpr::Constant {
                value: value.clone(),
                ty: ty.clone(),
            }),
            Expr::QuerySource { name, .. } => {
                self.mapping.get(name).cloned().ok_or_else(|| {
                    QuillError::contract(format!("query source '{}' is not in scope", name))
                })
            }
            Expr::Member { source, member, ty } => self.prepare_member(expr, source, member, ty),
            Expr::Binary {
                op,
                left,
                right,
                ty,
            } => {
                let left = self.prepare_expression(left)?;
                let right = self.prepare_expression(right)?;
                Ok(prepare_binary(*op, left, right, ty))
            }
            Expr::Not(operand) => Ok(SqlExpr::Not(Box::new(self.prepare_expression(operand)?))),
            Expr::Conditional {
                test,
                if_true,
                if_false,
                ty,
            } => Ok(SqlExpr::Case {
                cases: vec![(
                    self.prepare_expression(test)?,
                    self.prepare_expression(if_true)?,
                )],
                else_value: Some(Box::new(self.prepare_expression(if_false)?)),
                ty: ty.clone(),
            }),
            Expr::MethodCall(call) => self.prepare_method_call(expr, call),
            Expr::New { members } => {
                let mut prepared = Vec::with_capacity(members.len());
                for (name, member) in members {
                    prepared.push(NamedExpression::new(
                        Some(name.clone()),
                        self.prepare_expression(member)?,
                    ));
                }
                Ok(SqlExpr::Compound { members: prepared })
            }
            Expr::SubQuery(model) => Ok(SqlExpr::SubStatement(Box::new(
                self.prepare_sub_query(model)?,
            ))),
            Expr::Queryable { .. } => Err(QuillError::UnsupportedExpressionKind {
                kind: "Queryable",
                expression: expr.to_string(),
            }),
        }
    }

    fn prepare_member(
        &mut self,
        expr: &Expr,
        source: &Expr,
        member: &str,
        ty: &ValueType,
    ) -> QuillResult<SqlExpr> {
        let source = self.prepare_expression(source)?;
        let source_ty = source.ty();

        if let ValueType::Nullable(_) = source_ty {
            match member {
                "Value" => return Ok(source),
                "HasValue" => {
                    return Ok(SqlExpr::binary(
                        SqlBinaryOperator::NotEqual,
                        source,
                        SqlExpr::constant(Value::Null, source_ty),
                    ));
                }
                _ => {}
            }
        }

        match source_ty.underlying() {
            // Mapped members are looked up by the resolver.
            ValueType::Entity(_) | ValueType::Object | ValueType::Sequence(_) => {
                Ok(SqlExpr::member(source, member, ty.clone()))
            }
            scalar => {
                let call = SqlMethodCall {
                    signature: MethodSignature::property(&scalar.to_string(), member),
                    object: Some(Box::new(source)),
                    arguments: Vec::new(),
                    ty: ty.clone(),
                    source_text: expr.to_string(),
                };
                self.registry.transform(&call)
            }
        }
    }

    fn prepare_method_call(&mut self, expr: &Expr, call: &MethodCall) -> QuillResult<SqlExpr> {
        let object = match &call.object {
            Some(object) => Some(Box::new(self.prepare_expression(object)?)),
            None => None,
        };
        let mut arguments = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            arguments.push(self.prepare_expression(argument)?);
        }
        let call = SqlMethodCall {
            signature: MethodSignature::of_call(
                &call.declaring_type,
                &call.method,
                &call.parameter_types,
            ),
            object,
            arguments,
            ty: call.ty.clone(),
            source_text: expr.to_string(),
        };
        self.registry.transform(&call)
    }
}

fn prepare_binary(op: BinaryOperator, left: SqlExpr, right: SqlExpr, ty: &ValueType) -> SqlExpr {
    let sql_op = match op {
        BinaryOperator::AndAlso | BinaryOperator::OrElse => {
            let op = if op == BinaryOperator::AndAlso {
                LogicalOperator::And
            } else {
                LogicalOperator::Or
            };
            return SqlExpr::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        BinaryOperator::Coalesce => {
            return SqlExpr::function("COALESCE", vec![left, right], ty.clone());
        }
        BinaryOperator::Add if left.ty().is_string() || right.ty().is_string() => {
            SqlBinaryOperator::Concat
        }
        BinaryOperator::Add => SqlBinaryOperator::Add,
        BinaryOperator::Subtract => SqlBinaryOperator::Subtract,
        BinaryOperator::Multiply => SqlBinaryOperator::Multiply,
        BinaryOperator::Divide => SqlBinaryOperator::Divide,
        BinaryOperator::Modulo => SqlBinaryOperator::Modulo,
        BinaryOperator::Equal => SqlBinaryOperator::Equal,
        BinaryOperator::NotEqual => SqlBinaryOperator::NotEqual,
        BinaryOperator::LessThan => SqlBinaryOperator::LessThan,
        BinaryOperator::LessThanOrEqual => SqlBinaryOperator::LessThanOrEqual,
        BinaryOperator::GreaterThan => SqlBinaryOperator::GreaterThan,
        BinaryOperator::GreaterThanOrEqual => SqlBinaryOperator::GreaterThanOrEqual,
    };

    if sql_op.is_comparison() || sql_op == SqlBinaryOperator::Concat {
        SqlExpr::binary(sql_op, left, right)
    } else {
        SqlExpr::Binary {
            op: sql_op,
            left: Box::new(left),
            right: Box::new(right),
            ty: ty.clone(),
        }
    }
}
