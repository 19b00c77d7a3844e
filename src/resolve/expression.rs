//! Resolving expression nodes to columns, entities and joins.

use super::context::SqlExpressionContext::{self, *};
use super::resolver::MemberSource;
use super::{StatementResolver, exposed_projection};
use crate::error::{QuillError, QuillResult};
use crate::ir::{
    AggregationFunction, JoinInfo, JoinSemantics, NamedExpression, SqlBinaryOperator,
    SqlColumn, SqlEntity, SqlExpr, SqlFunction, SqlOrdering, TableInfo, UnresolvedJoinInfo,
    referenced_column_name,
};
use crate::value::ValueType;

impl StatementResolver<'_> {
    pub(super) fn resolve_expression(
        &mut self,
        expr: &SqlExpr,
        context: SqlExpressionContext,
    ) -> QuillResult<SqlExpr> {
        let resolved = self.resolve_node(expr, context)?;
        self.apply_context(resolved, context)
    }

    fn resolve_boxed(&mut self, expr: &SqlExpr, context: SqlExpressionContext) -> QuillResult<Box<SqlExpr>> {
        Ok(Box::new(self.resolve_expression(expr, context)?))
    }

    fn resolve_node(&mut self, expr: &SqlExpr, context: SqlExpressionContext) -> QuillResult<SqlExpr> {
        Ok(match expr {
            SqlExpr::Column(_)
            | SqlExpr::Literal(_)
            | SqlExpr::CustomText { .. }
            | SqlExpr::Entity(_)
            | SqlExpr::EntityReference { .. }
            | SqlExpr::EntityConstant { .. } => expr.clone(),
            SqlExpr::Constant { value, ty } => self.resolver.resolve_constant_expression(value, ty)?,
            SqlExpr::TableReference { key, .. } => self.tables.get(key).cloned().ok_or_else(|| {
                QuillError::contract(format!("table {:?} is not part of this statement", key))
            })?,
            SqlExpr::Member { source, member, .. } => {
                let source = self.resolve_expression(source, ValueRequired)?;
                let resolved = self.resolve_member(source, member)?;
                self.resolve_node(&resolved, context)?
            }
            SqlExpr::EntityRefMember { entity, member, .. } => self.resolve_navigation(entity, member)?,
            SqlExpr::MethodCall(call) => {
                return Err(QuillError::UnsupportedExpressionKind {
                    kind: expr.kind_name(),
                    expression: call.source_text.clone(),
                });
            }
            SqlExpr::Binary {
                op,
                left,
                right,
                ty,
            } => self.resolve_binary(*op, left, right, ty)?,
            SqlExpr::Like {
                expression,
                pattern,
            } => SqlExpr::Like {
                expression: self.resolve_boxed(expression, SingleValueRequired)?,
                pattern: self.resolve_boxed(pattern, SingleValueRequired)?,
            },
            SqlExpr::LikeEscape(value) => {
                SqlExpr::LikeEscape(self.resolve_boxed(value, SingleValueRequired)?)
            }
            SqlExpr::Logical { op, left, right } => SqlExpr::Logical {
                op: *op,
                left: self.resolve_boxed(left, PredicateRequired)?,
                right: self.resolve_boxed(right, PredicateRequired)?,
            },
            SqlExpr::Not(operand) => SqlExpr::Not(self.resolve_boxed(operand, PredicateRequired)?),
            SqlExpr::Case {
                cases,
                else_value,
                ty,
            } => {
                let mut resolved = Vec::with_capacity(cases.len());
                for (test, value) in cases {
                    resolved.push((
                        self.resolve_expression(test, PredicateRequired)?,
                        self.resolve_expression(value, SingleValueRequired)?,
                    ));
                }
                let else_value = match else_value {
                    Some(value) => Some(self.resolve_boxed(value, SingleValueRequired)?),
                    None => None,
                };
                SqlExpr::Case {
                    cases: resolved,
                    else_value,
                    ty: ty.clone(),
                }
            }
            SqlExpr::Function(function) => {
                let mut args = Vec::with_capacity(function.args.len());
                for arg in &function.args {
                    args.push(self.resolve_expression(arg, SingleValueRequired)?);
                }
                SqlExpr::Function(SqlFunction {
                    args,
                    ..function.clone()
                })
            }
            SqlExpr::Convert {
                target,
                expression,
                ty,
            } => SqlExpr::Convert {
                target: target.clone(),
                expression: self.resolve_boxed(expression, SingleValueRequired)?,
                ty: ty.clone(),
            },
            SqlExpr::Aggregation {
                function,
                expression,
                ty,
            } => {
                // COUNT(*) does not look at its operand.
                let operand_context = match function {
                    AggregationFunction::Count => ValueRequired,
                    _ => SingleValueRequired,
                };
                SqlExpr::Aggregation {
                    function: *function,
                    expression: self.resolve_boxed(expression, operand_context)?,
                    ty: ty.clone(),
                }
            }
            SqlExpr::RowNumber { orderings } => {
                let mut resolved = Vec::with_capacity(orderings.len());
                for ordering in orderings {
                    resolved.push(SqlOrdering::new(
                        self.resolve_expression(&ordering.expression, SingleValueRequired)?,
                        ordering.direction,
                    ));
                }
                SqlExpr::RowNumber { orderings: resolved }
            }
            SqlExpr::Named(named) => SqlExpr::Named(NamedExpression::new(
                named.name.clone(),
                self.resolve_expression(&named.expression, context)?,
            )),
            SqlExpr::Compound { members } => {
                let mut resolved = Vec::with_capacity(members.len());
                for member in members {
                    resolved.push(NamedExpression::new(
                        member.name.clone(),
                        self.resolve_expression(&member.expression, ValueRequired)?,
                    ));
                }
                SqlExpr::Compound { members: resolved }
            }
            SqlExpr::SubStatement(statement) => {
                SqlExpr::SubStatement(Box::new(self.resolve_nested(statement)?))
            }
        })
    }

    fn resolve_member(&mut self, source: SqlExpr, member: &str) -> QuillResult<SqlExpr> {
        match source {
            SqlExpr::Entity(entity) => self
                .resolver
                .resolve_member_expression(MemberSource::Entity(&entity), member),
            SqlExpr::Column(column) => self
                .resolver
                .resolve_member_expression(MemberSource::Column(&column), member),
            SqlExpr::EntityReference {
                table_alias,
                entity,
                ..
            } => match self
                .resolver
                .resolve_member_expression(MemberSource::Entity(&entity), member)?
            {
                SqlExpr::Column(column) => Ok(SqlExpr::Column(SqlColumn {
                    owning_alias: table_alias,
                    name: referenced_column_name(entity.name.as_deref(), &column.name),
                    ..column
                })),
                other => Err(QuillError::UnsupportedExpressionKind {
                    kind: other.kind_name(),
                    expression: format!(
                        "member '{}' of an entity exposed by sub-statement '{}'",
                        member, table_alias
                    ),
                }),
            },
            SqlExpr::Compound { members } => members
                .into_iter()
                .find(|m| m.name.as_deref() == Some(member))
                .map(|m| *m.expression)
                .ok_or_else(|| QuillError::unmapped("member", member)),
            SqlExpr::Named(named) => self.resolve_member(*named.expression, member),
            other => Err(QuillError::UnsupportedExpressionKind {
                kind: other.kind_name(),
                expression: format!("access to member '{}'", member),
            }),
        }
    }

    /// Navigation `entity.member` to a related entity: adds (or reuses) a left
    /// join below the table owning `entity` and returns the joined entity.
    fn resolve_navigation(&mut self, entity: &SqlEntity, member: &str) -> QuillResult<SqlExpr> {
        let resolver = self.resolver;
        let ids = &mut *self.ids;
        let alias = entity.table_alias.as_str();

        let joins = self
            .builder
            .sql_tables
            .iter_mut()
            .find_map(|table| table.joins_for_alias_mut(alias))
            .ok_or_else(|| QuillError::UnsupportedExpressionKind {
                kind: "EntityRefMember",
                expression: format!(
                    "navigation '{}' from table '{}', which is not a source of this statement",
                    member, alias
                ),
            })?;

        let joined = joins.get_or_add(member, JoinSemantics::Left, || {
            JoinInfo::Unresolved(UnresolvedJoinInfo {
                originating_entity: entity.clone(),
                member: member.to_string(),
            })
        });
        if let JoinInfo::Unresolved(unresolved) = &joined.join_info {
            let resolved = resolver.resolve_join_info(unresolved, ids)?;
            tracing::trace!(member, alias = ?resolved.foreign_table_info.alias(), "resolved join");
            joined.join_info = JoinInfo::Resolved(resolved);
        }

        let JoinInfo::Resolved(resolved) = &joined.join_info else {
            return Err(QuillError::contract(format!("join '{}' is unresolved", member)));
        };
        match &resolved.foreign_table_info {
            TableInfo::ResolvedSimple {
                item_type, alias, ..
            } => Ok(SqlExpr::Entity(resolver.resolve_simple_table_info(item_type, alias, ids)?)),
            TableInfo::ResolvedSubStatement { alias, statement } => {
                Ok(exposed_projection(statement.select_projection(), alias))
            }
            TableInfo::Unresolved { item_type } => Err(QuillError::contract(format!(
                "the resolver left joined table '{}' unresolved",
                item_type
            ))),
        }
    }

    fn resolve_binary(
        &mut self,
        op: SqlBinaryOperator,
        left: &SqlExpr,
        right: &SqlExpr,
        ty: &ValueType,
    ) -> QuillResult<SqlExpr> {
        let mut left = self.resolve_expression(left, ValueRequired)?;
        let mut right = self.resolve_expression(right, ValueRequired)?;

        // Entities compare by identity.
        if matches!(op, SqlBinaryOperator::Equal | SqlBinaryOperator::NotEqual)
            && (left.ty().is_entity() || right.ty().is_entity())
        {
            left = primary_key(left)?;
            right = primary_key(right)?;
        }

        Ok(SqlExpr::Binary {
            op,
            left: Box::new(self.apply_context(left, SingleValueRequired)?),
            right: Box::new(self.apply_context(right, SingleValueRequired)?),
            ty: ty.clone(),
        })
    }
}

fn primary_key(expr: SqlExpr) -> QuillResult<SqlExpr> {
    match expr {
        SqlExpr::Entity(entity) => Ok(SqlExpr::Column(entity.primary_key)),
        SqlExpr::EntityReference {
            table_alias,
            entity,
            ..
        } => Ok(SqlExpr::Column(SqlColumn {
            owning_alias: table_alias,
            name: referenced_column_name(entity.name.as_deref(), &entity.primary_key.name),
            ..entity.primary_key
        })),
        SqlExpr::EntityConstant { primary_key, .. } => Ok(*primary_key),
        SqlExpr::Named(named) => primary_key(*named.expression),
        expr if expr.is_null_constant() => Ok(expr),
        other => Err(QuillError::UnsupportedExpressionKind {
            kind: other.kind_name(),
            expression: "only entities can be compared with entities".to_string(),
        }),
    }
}
