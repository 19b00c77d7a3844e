//! The abstract query tree consumed by the compiler.
//!
//! A front end (out of scope here) produces a [`QueryModel`]; the compiler
//! only ever reads it. Models derive serde so they can be supplied as JSON.

pub mod expr;

pub use expr::{BinaryOperator, Expr, MethodCall};

use serde::{Deserialize, Serialize};

use crate::value::ValueType;

/// A source clause: `from <item_name> in <source>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromClause {
    pub item_name: String,
    pub item_type: ValueType,
    pub source: Expr,
}

impl FromClause {
    /// `from <item_name> in Table<item_type>`.
    pub fn table(item_name: &str, item_type: &str) -> Self {
        Self {
            item_name: item_name.to_string(),
            item_type: ValueType::entity(item_type),
            source: Expr::Queryable {
                item_type: item_type.to_string(),
            },
        }
    }

    /// The expression that refers to this clause's item.
    pub fn reference(&self) -> Expr {
        Expr::source(&self.item_name, self.item_type.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderingDirection {
    Asc,
    Desc,
}

impl std::fmt::Display for OrderingDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderingDirection::Asc => write!(f, "ASC"),
            OrderingDirection::Desc => write!(f, "DESC"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ordering {
    pub expression: Expr,
    pub direction: OrderingDirection,
}

impl Ordering {
    pub fn asc(expression: Expr) -> Self {
        Self {
            expression,
            direction: OrderingDirection::Asc,
        }
    }

    pub fn desc(expression: Expr) -> Self {
        Self {
            expression,
            direction: OrderingDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BodyClause {
    AdditionalFrom(FromClause),
    Where(Expr),
    /// Orderings of one `orderby` clause; a later clause takes precedence.
    OrderBy(Vec<Ordering>),
    /// `let <name> = <expression>`
    Let { name: String, expression: Expr },
    Join {
        item_name: String,
        item_type: ValueType,
        inner_sequence: Expr,
        outer_key: Expr,
        inner_key: Expr,
    },
    GroupJoin {
        item_name: String,
        inner_sequence: Expr,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectOrGroupClause {
    Select(Expr),
    Group { key: Expr, element: Expr },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultOperator {
    Count,
    LongCount,
    Take(Expr),
    Skip(Expr),
    First { return_default_when_empty: bool },
    Single { return_default_when_empty: bool },
    Distinct,
    Min,
    Max,
    Sum,
    Average,
    /// An operator the front end recognises but this backend cannot translate.
    Other(String),
}

impl ResultOperator {
    pub fn name(&self) -> &str {
        match self {
            ResultOperator::Count => "Count",
            ResultOperator::LongCount => "LongCount",
            ResultOperator::Take(_) => "Take",
            ResultOperator::Skip(_) => "Skip",
            ResultOperator::First { .. } => "First",
            ResultOperator::Single { .. } => "Single",
            ResultOperator::Distinct => "Distinct",
            ResultOperator::Min => "Min",
            ResultOperator::Max => "Max",
            ResultOperator::Sum => "Sum",
            ResultOperator::Average => "Average",
            ResultOperator::Other(name) => name,
        }
    }
}

/// A complete query: main source, body clauses, projection, result operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryModel {
    pub main_from: FromClause,
    #[serde(default)]
    pub body_clauses: Vec<BodyClause>,
    pub select_or_group: SelectOrGroupClause,
    #[serde(default)]
    pub result_operators: Vec<ResultOperator>,
}

impl QueryModel {
    /// `from <item_name> in Table<item_type> select <item_name>`.
    pub fn from_table(item_name: &str, item_type: &str) -> Self {
        Self::new(FromClause::table(item_name, item_type))
    }

    pub fn new(main_from: FromClause) -> Self {
        let select = SelectOrGroupClause::Select(main_from.reference());
        Self {
            main_from,
            body_clauses: Vec::new(),
            select_or_group: select,
            result_operators: Vec::new(),
        }
    }

    pub fn where_clause(mut self, predicate: Expr) -> Self {
        self.body_clauses.push(BodyClause::Where(predicate));
        self
    }

    pub fn order_by(mut self, orderings: Vec<Ordering>) -> Self {
        self.body_clauses.push(BodyClause::OrderBy(orderings));
        self
    }

    pub fn body_clause(mut self, clause: BodyClause) -> Self {
        self.body_clauses.push(clause);
        self
    }

    pub fn select(mut self, selector: Expr) -> Self {
        self.select_or_group = SelectOrGroupClause::Select(selector);
        self
    }

    pub fn group_by(mut self, key: Expr, element: Expr) -> Self {
        self.select_or_group = SelectOrGroupClause::Group { key, element };
        self
    }

    pub fn result_operator(mut self, operator: ResultOperator) -> Self {
        self.result_operators.push(operator);
        self
    }

    /// Type of one projected row.
    pub fn projection_type(&self) -> ValueType {
        match &self.select_or_group {
            SelectOrGroupClause::Select(selector) => selector.ty(),
            SelectOrGroupClause::Group { key, .. } => key.ty(),
        }
    }

    /// Type of the query's result after all result operators.
    pub fn result_type(&self) -> ValueType {
        let mut ty = ValueType::sequence(self.projection_type());
        for operator in &self.result_operators {
            ty = match operator {
                ResultOperator::Count => ValueType::Int32,
                ResultOperator::LongCount => ValueType::Int64,
                ResultOperator::Average => ValueType::Double,
                ResultOperator::First { .. }
                | ResultOperator::Single { .. }
                | ResultOperator::Min
                | ResultOperator::Max
                | ResultOperator::Sum => ty.item_type().cloned().unwrap_or(ty),
                _ => ty,
            };
        }
        ty
    }
}

impl std::fmt::Display for QueryModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "from {} in {}",
            self.main_from.item_name, self.main_from.source
        )?;
        for clause in &self.body_clauses {
            match clause {
                BodyClause::AdditionalFrom(from) => {
                    write!(f, " from {} in {}", from.item_name, from.source)?
                }
                BodyClause::Where(predicate) => write!(f, " where {}", predicate)?,
                BodyClause::OrderBy(orderings) => {
                    write!(f, " orderby")?;
                    for (i, ordering) in orderings.iter().enumerate() {
                        let sep = if i > 0 { "," } else { "" };
                        write!(f, "{} {} {}", sep, ordering.expression, ordering.direction)?;
                    }
                }
                BodyClause::Let { name, expression } => write!(f, " let {} = {}", name, expression)?,
                BodyClause::Join { item_name, .. } => write!(f, " join {}", item_name)?,
                BodyClause::GroupJoin { item_name, .. } => write!(f, " join into {}", item_name)?,
            }
        }
        match &self.select_or_group {
            SelectOrGroupClause::Select(selector) => write!(f, " select {}", selector)?,
            SelectOrGroupClause::Group { key, element } => {
                write!(f, " group {} by {}", element, key)?
            }
        }
        for operator in &self.result_operators {
            write!(f, " => {}()", operator.name())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_projection_is_main_item() {
        let model = QueryModel::from_table("c", "Cook");
        assert_eq!(
            model.select_or_group,
            SelectOrGroupClause::Select(Expr::source("c", ValueType::entity("Cook")))
        );
        assert_eq!(
            model.result_type(),
            ValueType::sequence(ValueType::entity("Cook"))
        );
    }

    #[test]
    fn test_result_type_follows_operators() {
        let model = QueryModel::from_table("c", "Cook").result_operator(ResultOperator::Count);
        assert_eq!(model.result_type(), ValueType::Int32);

        let model = QueryModel::from_table("c", "Cook").result_operator(ResultOperator::First {
            return_default_when_empty: false,
        });
        assert_eq!(model.result_type(), ValueType::entity("Cook"));
    }

    #[test]
    fn test_model_round_trips_through_json() {
        let model = QueryModel::from_table("c", "Cook")
            .where_clause(Expr::binary(
                BinaryOperator::Equal,
                Expr::source("c", ValueType::entity("Cook")).member("FirstName", ValueType::String),
                Expr::string("hugo"),
            ))
            .result_operator(ResultOperator::Take(Expr::int(5)));
        let json = serde_json::to_string(&model).unwrap();
        let parsed: QueryModel = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, model);
    }

    #[test]
    fn test_display() {
        let model = QueryModel::from_table("c", "Cook")
            .select(Expr::source("c", ValueType::entity("Cook")).member("Name", ValueType::String));
        assert_eq!(model.to_string(), "from c in Table<Cook> select c.Name");
    }
}
