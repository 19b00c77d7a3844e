//! The injected mapping resolver interface.

use crate::error::QuillResult;
use crate::ids::UniqueIdentifierGenerator;
use crate::ir::{ResolvedJoinInfo, SqlColumn, SqlEntity, SqlExpr, TableInfo, UnresolvedJoinInfo};
use crate::value::{Value, ValueType};

/// What a member is accessed on.
#[derive(Debug, Clone, Copy)]
pub enum MemberSource<'a> {
    Entity(&'a SqlEntity),
    Column(&'a SqlColumn),
}

/// Maps domain types and members onto a physical schema.
///
/// Implementations fail with [`crate::QuillError::UnmappedItem`] for types
/// and members they do not know. They are shared between concurrent
/// compiles, hence `Send + Sync`.
pub trait MappingResolver: Send + Sync {
    /// Table source for a domain type: `ResolvedSimple` (with a fresh alias)
    /// or `ResolvedSubStatement`.
    fn resolve_table_info(
        &self,
        item_type: &str,
        ids: &mut UniqueIdentifierGenerator,
    ) -> QuillResult<TableInfo>;

    /// Foreign table and the key columns equated in the `ON` clause.
    fn resolve_join_info(
        &self,
        join_info: &UnresolvedJoinInfo,
        ids: &mut UniqueIdentifierGenerator,
    ) -> QuillResult<ResolvedJoinInfo>;

    /// Physical columns of a mapped type, owned by `table_alias`.
    fn resolve_simple_table_info(
        &self,
        item_type: &str,
        table_alias: &str,
        ids: &mut UniqueIdentifierGenerator,
    ) -> QuillResult<SqlEntity>;

    /// A column, or an `EntityRefMember` for navigation to a related entity.
    fn resolve_member_expression(&self, source: MemberSource<'_>, member: &str) -> QuillResult<SqlExpr>;

    /// Constants of mapped domain types become `EntityConstant`s carrying
    /// their primary key; anything else is returned as a plain constant.
    fn resolve_constant_expression(&self, value: &Value, ty: &ValueType) -> QuillResult<SqlExpr>;
}
