//! Front-end expressions of a query tree.

use serde::{Deserialize, Serialize};

use super::QueryModel;
use crate::value::{Value, ValueType};

/// Binary operators as they appear in the source query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    AndAlso,
    OrElse,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Coalesce,
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
        )
    }
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOperator::Equal => write!(f, "=="),
            BinaryOperator::NotEqual => write!(f, "!="),
            BinaryOperator::LessThan => write!(f, "<"),
            BinaryOperator::LessThanOrEqual => write!(f, "<="),
            BinaryOperator::GreaterThan => write!(f, ">"),
            BinaryOperator::GreaterThanOrEqual => write!(f, ">="),
            BinaryOperator::AndAlso => write!(f, "&&"),
            BinaryOperator::OrElse => write!(f, "||"),
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Subtract => write!(f, "-"),
            BinaryOperator::Multiply => write!(f, "*"),
            BinaryOperator::Divide => write!(f, "/"),
            BinaryOperator::Modulo => write!(f, "%"),
            BinaryOperator::Coalesce => write!(f, "??"),
        }
    }
}

/// A method invocation in the source query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Receiver; `None` for static calls.
    pub object: Option<Box<Expr>>,
    pub declaring_type: String,
    pub method: String,
    pub parameter_types: Vec<ValueType>,
    pub arguments: Vec<Expr>,
    pub ty: ValueType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Constant {
        value: Value,
        ty: ValueType,
    },
    /// A queryable table of mapped entities.
    Queryable {
        item_type: String,
    },
    /// Reference to the item of a from clause or a let binding.
    QuerySource {
        name: String,
        ty: ValueType,
    },
    Member {
        source: Box<Expr>,
        member: String,
        ty: ValueType,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
        ty: ValueType,
    },
    Not(Box<Expr>),
    Conditional {
        test: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
        ty: ValueType,
    },
    MethodCall(MethodCall),
    /// Anonymous projection: `new { Name = c.Name, Age = c.Age }`.
    New {
        members: Vec<(String, Expr)>,
    },
    SubQuery(Box<QueryModel>),
}

impl Expr {
    pub fn constant(value: impl Into<Value>, ty: ValueType) -> Self {
        Expr::Constant {
            value: value.into(),
            ty,
        }
    }

    pub fn string(s: &str) -> Self {
        Expr::constant(s, ValueType::String)
    }

    pub fn int(n: i32) -> Self {
        Expr::constant(n, ValueType::Int32)
    }

    pub fn bool(b: bool) -> Self {
        Expr::constant(b, ValueType::Boolean)
    }

    pub fn null(ty: ValueType) -> Self {
        Expr::Constant {
            value: Value::Null,
            ty,
        }
    }

    pub fn source(name: &str, ty: ValueType) -> Self {
        Expr::QuerySource {
            name: name.to_string(),
            ty,
        }
    }

    pub fn member(self, member: &str, ty: ValueType) -> Self {
        Expr::Member {
            source: Box::new(self),
            member: member.to_string(),
            ty,
        }
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        let ty = match op {
            _ if op.is_comparison() => ValueType::Boolean,
            BinaryOperator::AndAlso | BinaryOperator::OrElse => ValueType::Boolean,
            BinaryOperator::Coalesce => right.ty(),
            _ => left.ty(),
        };
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        }
    }

    /// Instance method call; parameter types are taken from the arguments.
    pub fn call(self, declaring_type: &str, method: &str, arguments: Vec<Expr>, ty: ValueType) -> Self {
        Expr::MethodCall(MethodCall {
            parameter_types: arguments.iter().map(Expr::ty).collect(),
            object: Some(Box::new(self)),
            declaring_type: declaring_type.to_string(),
            method: method.to_string(),
            arguments,
            ty,
        })
    }

    /// Static method call; parameter types are taken from the arguments.
    pub fn static_call(declaring_type: &str, method: &str, arguments: Vec<Expr>, ty: ValueType) -> Self {
        Expr::MethodCall(MethodCall {
            parameter_types: arguments.iter().map(Expr::ty).collect(),
            object: None,
            declaring_type: declaring_type.to_string(),
            method: method.to_string(),
            arguments,
            ty,
        })
    }

    pub fn ty(&self) -> ValueType {
        match self {
            Expr::Constant { ty, .. }
            | Expr::QuerySource { ty, .. }
            | Expr::Member { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Conditional { ty, .. } => ty.clone(),
            Expr::Queryable { item_type } => ValueType::sequence(ValueType::entity(item_type.clone())),
            Expr::Not(_) => ValueType::Boolean,
            Expr::MethodCall(call) => call.ty.clone(),
            Expr::New { .. } => ValueType::Object,
            Expr::SubQuery(model) => model.result_type(),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Constant { value, .. } => write!(f, "{}", value),
            Expr::Queryable { item_type } => write!(f, "Table<{}>", item_type),
            Expr::QuerySource { name, .. } => write!(f, "{}", name),
            Expr::Member { source, member, .. } => write!(f, "{}.{}", source, member),
            Expr::Binary { op, left, right, .. } => write!(f, "({} {} {})", left, op, right),
            Expr::Not(operand) => write!(f, "!{}", operand),
            Expr::Conditional {
                test,
                if_true,
                if_false,
                ..
            } => write!(f, "IIF({}, {}, {})", test, if_true, if_false),
            Expr::MethodCall(call) => {
                match &call.object {
                    Some(object) => write!(f, "{}.{}(", object, call.method)?,
                    None => write!(f, "{}.{}(", call.declaring_type, call.method)?,
                }
                for (i, arg) in call.arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::New { members } => {
                write!(f, "new {{ ")?;
                for (i, (name, expr)) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", name, expr)?;
                }
                write!(f, " }}")
            }
            Expr::SubQuery(model) => write!(f, "{{{}}}", model),
        }
    }
}
