//! Intermediate representation shared by the three compile stages.

pub mod expr;
pub mod statement;
pub mod table;

pub use expr::{
    AggregationFunction, LogicalOperator, NamedExpression, SqlBinaryOperator, SqlColumn, SqlEntity,
    SqlExpr, SqlFunction, SqlLiteral, SqlMethodCall, SqlOrdering, referenced_column_name,
};
pub use statement::{DataInfo, SqlStatement, SqlStatementBuilder};
pub use table::{
    JoinInfo, JoinSemantics, Joins, ResolvedJoinInfo, SqlJoinedTable, SqlTable,
    TableInfo, UnresolvedJoinInfo,
};
