//! `SqlStatement` and its mutable builder.

use super::expr::{SqlExpr, SqlOrdering};
use super::table::SqlTable;
use crate::error::{QuillError, QuillResult};
use crate::value::ValueType;

/// Logical shape of a statement's result.
#[derive(Debug, Clone, PartialEq)]
pub enum DataInfo {
    /// Zero or more rows.
    Sequence { item_type: ValueType },
    /// At most one row (`First`, `Single`).
    SingleValue {
        ty: ValueType,
        return_default_when_empty: bool,
    },
    /// A computed scalar (`Count`, aggregates).
    Scalar { ty: ValueType },
}

impl DataInfo {
    pub fn result_type(&self) -> ValueType {
        match self {
            DataInfo::Sequence { item_type } => ValueType::sequence(item_type.clone()),
            DataInfo::SingleValue { ty, .. } | DataInfo::Scalar { ty } => ty.clone(),
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, DataInfo::Sequence { .. })
    }
}

/// Immutable IR for one SELECT. Produced only by [`SqlStatementBuilder::freeze`].
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    select_projection: SqlExpr,
    sql_tables: Vec<SqlTable>,
    where_condition: Option<SqlExpr>,
    group_by_expression: Option<SqlExpr>,
    orderings: Vec<SqlOrdering>,
    top_expression: Option<SqlExpr>,
    is_distinct: bool,
    row_number_selector: Option<SqlExpr>,
    current_row_number_offset: Option<SqlExpr>,
    data_info: DataInfo,
}

impl SqlStatement {
    pub fn select_projection(&self) -> &SqlExpr {
        &self.select_projection
    }

    pub fn sql_tables(&self) -> &[SqlTable] {
        &self.sql_tables
    }

    pub fn where_condition(&self) -> Option<&SqlExpr> {
        self.where_condition.as_ref()
    }

    pub fn group_by_expression(&self) -> Option<&SqlExpr> {
        self.group_by_expression.as_ref()
    }

    pub fn orderings(&self) -> &[SqlOrdering] {
        &self.orderings
    }

    pub fn top_expression(&self) -> Option<&SqlExpr> {
        self.top_expression.as_ref()
    }

    pub fn is_distinct(&self) -> bool {
        self.is_distinct
    }

    pub fn row_number_selector(&self) -> Option<&SqlExpr> {
        self.row_number_selector.as_ref()
    }

    pub fn current_row_number_offset(&self) -> Option<&SqlExpr> {
        self.current_row_number_offset.as_ref()
    }

    pub fn data_info(&self) -> &DataInfo {
        &self.data_info
    }

    /// Re-open for rewriting; the statement itself is left untouched.
    pub fn to_builder(&self) -> SqlStatementBuilder {
        SqlStatementBuilder::from(self.clone())
    }
}

/// Mutable form of a statement used while a stage rewrites it.
#[derive(Debug, Clone, Default)]
pub struct SqlStatementBuilder {
    pub select_projection: Option<SqlExpr>,
    pub sql_tables: Vec<SqlTable>,
    pub where_condition: Option<SqlExpr>,
    pub group_by_expression: Option<SqlExpr>,
    pub orderings: Vec<SqlOrdering>,
    pub top_expression: Option<SqlExpr>,
    pub is_distinct: bool,
    pub row_number_selector: Option<SqlExpr>,
    pub current_row_number_offset: Option<SqlExpr>,
    pub data_info: Option<DataInfo>,
}

impl From<SqlStatement> for SqlStatementBuilder {
    fn from(statement: SqlStatement) -> Self {
        Self {
            select_projection: Some(statement.select_projection),
            sql_tables: statement.sql_tables,
            where_condition: statement.where_condition,
            group_by_expression: statement.group_by_expression,
            orderings: statement.orderings,
            top_expression: statement.top_expression,
            is_distinct: statement.is_distinct,
            row_number_selector: statement.row_number_selector,
            current_row_number_offset: statement.current_row_number_offset,
            data_info: Some(statement.data_info),
        }
    }
}

impl SqlStatementBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// AND-combines `condition` into the WHERE clause.
    pub fn add_where_condition(&mut self, condition: SqlExpr) {
        self.where_condition = Some(match self.where_condition.take() {
            Some(existing) => SqlExpr::and(existing, condition),
            None => condition,
        });
    }

    /// Whether a TOP, DISTINCT, paging or grouping already shapes this statement.
    pub fn has_row_limiting(&self) -> bool {
        self.top_expression.is_some()
            || self.is_distinct
            || self.row_number_selector.is_some()
            || self.group_by_expression.is_some()
    }

    /// After the projection was rewritten, derive the new data shape from the
    /// old and new projection types. Sequence stays sequence and single value
    /// stays single value; only the item type follows the projection.
    pub fn recalculate_data_info(&mut self, previous_projection: &SqlExpr) {
        let Some(projection) = &self.select_projection else {
            return;
        };
        let ty = projection.ty();
        if ty == previous_projection.ty() {
            return;
        }
        self.data_info = match self.data_info.take() {
            Some(DataInfo::Sequence { .. }) => Some(DataInfo::Sequence { item_type: ty }),
            Some(DataInfo::SingleValue {
                return_default_when_empty,
                ..
            }) => Some(DataInfo::SingleValue {
                ty,
                return_default_when_empty,
            }),
            other => other,
        };
    }

    pub fn freeze(self) -> QuillResult<SqlStatement> {
        let select_projection = self
            .select_projection
            .ok_or_else(|| QuillError::contract("a statement requires a select projection"))?;
        let data_info = self
            .data_info
            .ok_or_else(|| QuillError::contract("a statement requires a data info"))?;
        if let Some(condition) = &self.where_condition
            && !condition.ty().is_boolean()
        {
            return Err(QuillError::contract(format!(
                "the where condition must be boolean, found '{}' of type {}",
                condition.kind_name(),
                condition.ty()
            )));
        }

        Ok(SqlStatement {
            select_projection,
            sql_tables: self.sql_tables,
            where_condition: self.where_condition,
            group_by_expression: self.group_by_expression,
            orderings: self.orderings,
            top_expression: self.top_expression,
            is_distinct: self.is_distinct,
            row_number_selector: self.row_number_selector,
            current_row_number_offset: self.current_row_number_offset,
            data_info,
        })
    }
}
