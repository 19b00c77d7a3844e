//! Table sources and join trees.

use super::expr::{SqlEntity, SqlExpr};
use super::statement::SqlStatement;
use crate::ids::TableKey;
use crate::value::ValueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSemantics {
    Inner,
    Left,
}

/// Data source of a table, before or after mapping resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum TableInfo {
    Unresolved {
        item_type: String,
    },
    ResolvedSimple {
        item_type: String,
        table_name: String,
        alias: String,
    },
    /// A nested statement used as a source. Created during preparation, so
    /// the nested statement itself may still be unresolved.
    ResolvedSubStatement {
        alias: String,
        statement: Box<SqlStatement>,
    },
}

impl TableInfo {
    pub fn alias(&self) -> Option<&str> {
        match self {
            TableInfo::Unresolved { .. } => None,
            TableInfo::ResolvedSimple { alias, .. } | TableInfo::ResolvedSubStatement { alias, .. } => {
                Some(alias)
            }
        }
    }

    /// Type of one row produced by this source.
    pub fn item_type(&self) -> ValueType {
        match self {
            TableInfo::Unresolved { item_type } | TableInfo::ResolvedSimple { item_type, .. } => {
                ValueType::entity(item_type.clone())
            }
            TableInfo::ResolvedSubStatement { statement, .. } => statement.select_projection().ty(),
        }
    }
}

/// A to-one navigation from `originating_entity` through `member`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedJoinInfo {
    pub originating_entity: SqlEntity,
    pub member: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedJoinInfo {
    pub foreign_table_info: TableInfo,
    /// Key on the originating side of the `ON` clause.
    pub left_key: SqlExpr,
    /// Key on the joined side of the `ON` clause.
    pub right_key: SqlExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinInfo {
    Unresolved(UnresolvedJoinInfo),
    Resolved(ResolvedJoinInfo),
}

impl JoinInfo {
    pub fn alias(&self) -> Option<&str> {
        match self {
            JoinInfo::Unresolved(_) => None,
            JoinInfo::Resolved(resolved) => resolved.foreign_table_info.alias(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlJoinedTable {
    pub join_info: JoinInfo,
    pub join_semantics: JoinSemantics,
    pub joins: Joins,
}

/// Joins hanging off a table, keyed by the member that originated them.
/// Insertion order is emission order; a member is never joined twice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Joins(Vec<(String, SqlJoinedTable)>);

impl Joins {
    pub fn get_or_add(
        &mut self,
        member: &str,
        join_semantics: JoinSemantics,
        join_info: impl FnOnce() -> JoinInfo,
    ) -> &mut SqlJoinedTable {
        let index = match self.0.iter().position(|(key, _)| key == member) {
            Some(index) => index,
            None => {
                self.0.push((
                    member.to_string(),
                    SqlJoinedTable {
                        join_info: join_info(),
                        join_semantics,
                        joins: Joins::default(),
                    },
                ));
                self.0.len() - 1
            }
        };
        &mut self.0[index].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlJoinedTable)> {
        self.0.iter().map(|(member, join)| (member.as_str(), join))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SqlJoinedTable> {
        self.0.iter_mut().map(|(_, join)| join)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Finds the join list owned by the table (or joined table) aliased `alias`.
fn joins_for_alias<'a>(joins: &'a mut Joins, owner: Option<&str>, alias: &str) -> Option<&'a mut Joins> {
    if owner == Some(alias) {
        return Some(joins);
    }
    for (_, joined) in joins.0.iter_mut() {
        let SqlJoinedTable {
            join_info,
            joins: nested,
            ..
        } = joined;
        if let Some(found) = joins_for_alias(nested, join_info.alias(), alias) {
            return Some(found);
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlTable {
    pub key: TableKey,
    pub table_info: TableInfo,
    pub join_semantics: JoinSemantics,
    pub joins: Joins,
}

impl SqlTable {
    pub fn new(key: TableKey, table_info: TableInfo, join_semantics: JoinSemantics) -> Self {
        Self {
            key,
            table_info,
            join_semantics,
            joins: Joins::default(),
        }
    }

    /// Join list of the table or nested joined table aliased `alias`.
    pub fn joins_for_alias_mut(&mut self, alias: &str) -> Option<&mut Joins> {
        let SqlTable {
            table_info, joins, ..
        } = self;
        joins_for_alias(joins, table_info.alias(), alias)
    }
}
