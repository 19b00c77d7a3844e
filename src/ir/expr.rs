//! Expression nodes of the SQL statement IR.
//!
//! A closed sum type: every stage matches on it exhaustively, so adding a
//! node kind is a compile error in each stage until handled.

use super::statement::SqlStatement;
use crate::error::{QuillError, QuillResult};
use crate::ids::TableKey;
use crate::query::OrderingDirection;
use crate::transformer::MethodSignature;
use crate::value::{Value, ValueType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlBinaryOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    /// String concatenation; spelled by the dialect.
    Concat,
}

impl SqlBinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            SqlBinaryOperator::Equal
                | SqlBinaryOperator::NotEqual
                | SqlBinaryOperator::LessThan
                | SqlBinaryOperator::LessThanOrEqual
                | SqlBinaryOperator::GreaterThan
                | SqlBinaryOperator::GreaterThanOrEqual
        )
    }
}

impl std::fmt::Display for SqlBinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlBinaryOperator::Equal => write!(f, "="),
            SqlBinaryOperator::NotEqual => write!(f, "<>"),
            SqlBinaryOperator::LessThan => write!(f, "<"),
            SqlBinaryOperator::LessThanOrEqual => write!(f, "<="),
            SqlBinaryOperator::GreaterThan => write!(f, ">"),
            SqlBinaryOperator::GreaterThanOrEqual => write!(f, ">="),
            SqlBinaryOperator::Add => write!(f, "+"),
            SqlBinaryOperator::Subtract => write!(f, "-"),
            SqlBinaryOperator::Multiply => write!(f, "*"),
            SqlBinaryOperator::Divide => write!(f, "/"),
            SqlBinaryOperator::Modulo => write!(f, "%"),
            SqlBinaryOperator::Concat => write!(f, "+"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl std::fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "AND"),
            LogicalOperator::Or => write!(f, "OR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationFunction {
    Count,
    Min,
    Max,
    Sum,
    Average,
}

impl std::fmt::Display for AggregationFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationFunction::Count => write!(f, "COUNT"),
            AggregationFunction::Min => write!(f, "MIN"),
            AggregationFunction::Max => write!(f, "MAX"),
            AggregationFunction::Sum => write!(f, "SUM"),
            AggregationFunction::Average => write!(f, "AVG"),
        }
    }
}

/// A physical column owned by a table alias.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlColumn {
    pub ty: ValueType,
    pub owning_alias: String,
    pub name: String,
    pub is_primary_key: bool,
}

impl SqlColumn {
    pub fn new(ty: ValueType, owning_alias: &str, name: &str, is_primary_key: bool) -> Self {
        Self {
            ty,
            owning_alias: owning_alias.to_string(),
            name: name.to_string(),
            is_primary_key,
        }
    }

    pub fn is_star(&self) -> bool {
        self.name == "*"
    }
}

/// A mapped entity: one row of a table, spelled as its full column list.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlEntity {
    pub item_type: String,
    pub table_alias: String,
    /// Projection name; prefixes column aliases when set.
    pub name: Option<String>,
    pub primary_key: SqlColumn,
    pub columns: Vec<SqlColumn>,
}

impl SqlEntity {
    pub fn ty(&self) -> ValueType {
        ValueType::entity(self.item_type.clone())
    }

    pub fn column(&self, name: &str) -> Option<&SqlColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }
}

/// Name a column of `entity` gets when the entity is exposed by a sub-statement.
pub fn referenced_column_name(entity_name: Option<&str>, column: &str) -> String {
    match entity_name {
        Some(prefix) => format!("{}_{}", prefix, column),
        None => column.to_string(),
    }
}

/// A method call with prepared arguments, before it runs through the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlMethodCall {
    pub signature: MethodSignature,
    pub object: Option<Box<SqlExpr>>,
    pub arguments: Vec<SqlExpr>,
    pub ty: ValueType,
    /// The call as written in the source query, for diagnostics.
    pub source_text: String,
}

impl SqlMethodCall {
    pub fn object(&self) -> QuillResult<&SqlExpr> {
        self.object.as_deref().ok_or_else(|| {
            QuillError::contract(format!(
                "method '{}' requires an instance: {}",
                self.signature, self.source_text
            ))
        })
    }

    pub fn argument(&self, index: usize) -> QuillResult<&SqlExpr> {
        self.arguments.get(index).ok_or_else(|| {
            QuillError::contract(format!(
                "method '{}' expects argument {}: {}",
                self.signature, index, self.source_text
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlFunction {
    pub name: String,
    pub args: Vec<SqlExpr>,
    pub ty: ValueType,
    /// Functions such as `CONTAINS` that already yield a predicate.
    pub is_predicate: bool,
}

/// Text emitted verbatim rather than parameterized.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlLiteral {
    Int(i64),
    String(String),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedExpression {
    pub name: Option<String>,
    pub expression: Box<SqlExpr>,
}

impl NamedExpression {
    pub const DEFAULT_NAME: &'static str = "value";

    pub fn new(name: Option<String>, expression: SqlExpr) -> Self {
        Self {
            name,
            expression: Box::new(expression),
        }
    }

    pub fn effective_name(&self) -> &str {
        self.name.as_deref().unwrap_or(Self::DEFAULT_NAME)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlOrdering {
    pub expression: SqlExpr,
    pub direction: OrderingDirection,
}

impl SqlOrdering {
    pub fn new(expression: SqlExpr, direction: OrderingDirection) -> Self {
        Self {
            expression,
            direction,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    Column(SqlColumn),
    /// A value that becomes a command parameter.
    Constant { value: Value, ty: ValueType },
    Literal(SqlLiteral),
    CustomText { text: String, ty: ValueType },
    Entity(SqlEntity),
    /// An entity exposed by a sub-statement, addressed through the sub-statement's alias.
    EntityReference {
        table_alias: String,
        name: Option<String>,
        entity: SqlEntity,
    },
    /// A constant domain object, compared and emitted through its primary key.
    EntityConstant {
        ty: ValueType,
        value: Value,
        primary_key: Box<SqlExpr>,
    },
    /// Navigation from an entity to a related entity; becomes a join during resolution.
    EntityRefMember {
        entity: SqlEntity,
        member: String,
        ty: ValueType,
    },
    Binary {
        op: SqlBinaryOperator,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
        ty: ValueType,
    },
    Like {
        expression: Box<SqlExpr>,
        pattern: Box<SqlExpr>,
    },
    /// Escapes LIKE wildcards in a runtime pattern value.
    LikeEscape(Box<SqlExpr>),
    Logical {
        op: LogicalOperator,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    Not(Box<SqlExpr>),
    Case {
        cases: Vec<(SqlExpr, SqlExpr)>,
        else_value: Option<Box<SqlExpr>>,
        ty: ValueType,
    },
    Function(SqlFunction),
    Convert {
        target: String,
        expression: Box<SqlExpr>,
        ty: ValueType,
    },
    Aggregation {
        function: AggregationFunction,
        expression: Box<SqlExpr>,
        ty: ValueType,
    },
    RowNumber { orderings: Vec<SqlOrdering> },
    Named(NamedExpression),
    Compound { members: Vec<NamedExpression> },
    SubStatement(Box<SqlStatement>),
    /// Unresolved reference to the item of a `SqlTable`.
    TableReference { key: TableKey, ty: ValueType },
    /// Unresolved member access.
    Member {
        source: Box<SqlExpr>,
        member: String,
        ty: ValueType,
    },
    /// Method call that has not been through the transformer registry.
    MethodCall(SqlMethodCall),
}

impl SqlExpr {
    pub fn constant(value: impl Into<Value>, ty: ValueType) -> Self {
        SqlExpr::Constant {
            value: value.into(),
            ty,
        }
    }

    pub fn int(n: i64) -> Self {
        SqlExpr::Literal(SqlLiteral::Int(n))
    }

    pub fn text(s: &str) -> Self {
        SqlExpr::Literal(SqlLiteral::String(s.to_string()))
    }

    pub fn custom_text(text: impl Into<String>, ty: ValueType) -> Self {
        SqlExpr::CustomText {
            text: text.into(),
            ty,
        }
    }

    pub fn binary(op: SqlBinaryOperator, left: SqlExpr, right: SqlExpr) -> Self {
        let ty = if op.is_comparison() {
            ValueType::Boolean
        } else if op == SqlBinaryOperator::Concat {
            ValueType::String
        } else {
            left.ty()
        };
        SqlExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        }
    }

    pub fn equal(left: SqlExpr, right: SqlExpr) -> Self {
        Self::binary(SqlBinaryOperator::Equal, left, right)
    }

    pub fn add(left: SqlExpr, right: SqlExpr) -> Self {
        Self::binary(SqlBinaryOperator::Add, left, right)
    }

    pub fn subtract(left: SqlExpr, right: SqlExpr) -> Self {
        Self::binary(SqlBinaryOperator::Subtract, left, right)
    }

    pub fn concat(left: SqlExpr, right: SqlExpr) -> Self {
        Self::binary(SqlBinaryOperator::Concat, left, right)
    }

    pub fn and(left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::Logical {
            op: LogicalOperator::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::Logical {
            op: LogicalOperator::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn function(name: &str, args: Vec<SqlExpr>, ty: ValueType) -> Self {
        SqlExpr::Function(SqlFunction {
            name: name.to_string(),
            args,
            ty,
            is_predicate: false,
        })
    }

    pub fn predicate_function(name: &str, args: Vec<SqlExpr>) -> Self {
        SqlExpr::Function(SqlFunction {
            name: name.to_string(),
            args,
            ty: ValueType::Boolean,
            is_predicate: true,
        })
    }

    pub fn case_when(test: SqlExpr, then: SqlExpr, otherwise: SqlExpr) -> Self {
        let ty = then.ty();
        SqlExpr::Case {
            cases: vec![(test, then)],
            else_value: Some(Box::new(otherwise)),
            ty,
        }
    }

    pub fn named(name: Option<String>, expression: SqlExpr) -> Self {
        SqlExpr::Named(NamedExpression::new(name, expression))
    }

    pub fn member(source: SqlExpr, member: &str, ty: ValueType) -> Self {
        SqlExpr::Member {
            source: Box::new(source),
            member: member.to_string(),
            ty,
        }
    }

    pub fn ty(&self) -> ValueType {
        match self {
            SqlExpr::Column(column) => column.ty.clone(),
            SqlExpr::Constant { ty, .. }
            | SqlExpr::CustomText { ty, .. }
            | SqlExpr::EntityConstant { ty, .. }
            | SqlExpr::EntityRefMember { ty, .. }
            | SqlExpr::Binary { ty, .. }
            | SqlExpr::Case { ty, .. }
            | SqlExpr::Convert { ty, .. }
            | SqlExpr::Aggregation { ty, .. }
            | SqlExpr::TableReference { ty, .. }
            | SqlExpr::Member { ty, .. } => ty.clone(),
            SqlExpr::Literal(SqlLiteral::Int(_)) => ValueType::Int32,
            SqlExpr::Literal(SqlLiteral::String(_)) => ValueType::String,
            SqlExpr::Literal(SqlLiteral::Null) => ValueType::Object,
            SqlExpr::Entity(entity) => entity.ty(),
            SqlExpr::EntityReference { entity, .. } => entity.ty(),
            SqlExpr::Like { .. } | SqlExpr::Logical { .. } | SqlExpr::Not(_) => ValueType::Boolean,
            SqlExpr::LikeEscape(_) => ValueType::String,
            SqlExpr::Function(function) => function.ty.clone(),
            SqlExpr::RowNumber { .. } => ValueType::Int64,
            SqlExpr::Named(named) => named.expression.ty(),
            SqlExpr::Compound { .. } => ValueType::Object,
            SqlExpr::SubStatement(statement) => statement.data_info().result_type(),
            SqlExpr::MethodCall(call) => call.ty.clone(),
        }
    }

    /// Whether this node already is a SQL predicate (as opposed to a value).
    pub fn is_predicate(&self) -> bool {
        match self {
            SqlExpr::Binary { op, .. } => op.is_comparison(),
            SqlExpr::Like { .. } | SqlExpr::Logical { .. } | SqlExpr::Not(_) => true,
            SqlExpr::Function(function) => function.is_predicate,
            _ => false,
        }
    }

    pub fn is_null_constant(&self) -> bool {
        matches!(
            self,
            SqlExpr::Constant {
                value: Value::Null,
                ..
            } | SqlExpr::Literal(SqlLiteral::Null)
        )
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            SqlExpr::Column(_) => "Column",
            SqlExpr::Constant { .. } => "Constant",
            SqlExpr::Literal(_) => "Literal",
            SqlExpr::CustomText { .. } => "CustomText",
            SqlExpr::Entity(_) => "Entity",
            SqlExpr::EntityReference { .. } => "EntityReference",
            SqlExpr::EntityConstant { .. } => "EntityConstant",
            SqlExpr::EntityRefMember { .. } => "EntityRefMember",
            SqlExpr::Binary { .. } => "BinaryCondition",
            SqlExpr::Like { .. } => "Like",
            SqlExpr::LikeEscape(_) => "LikeEscape",
            SqlExpr::Logical { .. } => "ComplexCriterion",
            SqlExpr::Not(_) => "NotCriterion",
            SqlExpr::Case { .. } => "Case",
            SqlExpr::Function(_) => "SqlFunction",
            SqlExpr::Convert { .. } => "Convert",
            SqlExpr::Aggregation { .. } => "Aggregation",
            SqlExpr::RowNumber { .. } => "RowNumber",
            SqlExpr::Named(_) => "NamedExpression",
            SqlExpr::Compound { .. } => "Compound",
            SqlExpr::SubStatement(_) => "SubStatement",
            SqlExpr::TableReference { .. } => "TableReference",
            SqlExpr::Member { .. } => "MemberAccess",
            SqlExpr::MethodCall(_) => "MethodCall",
        }
    }
}
