//! Method signatures used as registry keys.
//!
//! ```text
//! String.Substring(Int32, Int32)     method
//! DateTime.AddDays(Double)           method
//! String.Length                      property
//! ```

use std::fmt;
use std::str::FromStr;

use nom::{
    IResult,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::{all_consuming, opt},
    multi::separated_list0,
    sequence::{delimited, preceded, tuple},
};

use crate::error::QuillError;
use crate::value::ValueType;

/// `(declaring type, name, parameter types)`; properties carry no parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodSignature {
    pub declaring_type: String,
    pub name: String,
    /// `None` for a property, `Some(..)` for a method (possibly without parameters).
    pub parameter_types: Option<Vec<String>>,
}

impl MethodSignature {
    pub fn method(declaring_type: &str, name: &str, parameter_types: &[&str]) -> Self {
        Self {
            declaring_type: declaring_type.to_string(),
            name: name.to_string(),
            parameter_types: Some(parameter_types.iter().map(|t| t.to_string()).collect()),
        }
    }

    pub fn property(declaring_type: &str, name: &str) -> Self {
        Self {
            declaring_type: declaring_type.to_string(),
            name: name.to_string(),
            parameter_types: None,
        }
    }

    /// Signature of a call as seen in a query tree.
    pub fn of_call(declaring_type: &str, name: &str, parameter_types: &[ValueType]) -> Self {
        Self {
            declaring_type: declaring_type.to_string(),
            name: name.to_string(),
            parameter_types: Some(parameter_types.iter().map(ValueType::to_string).collect()),
        }
    }

    pub fn is_property(&self) -> bool {
        self.parameter_types.is_none()
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.name)?;
        if let Some(parameter_types) = &self.parameter_types {
            write!(f, "({})", parameter_types.join(", "))?;
        }
        Ok(())
    }
}

impl FromStr for MethodSignature {
    type Err = QuillError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match all_consuming(parse_signature)(input.trim()) {
            Ok((_, signature)) => Ok(signature),
            Err(e) => Err(QuillError::InvalidSignature {
                input: input.to_string(),
                message: format!("{:?}", e),
            }),
        }
    }
}

fn parse_signature(input: &str) -> IResult<&str, MethodSignature> {
    let (input, (declaring_type, _, name)) =
        tuple((parse_identifier, char('.'), parse_identifier))(input)?;
    let (input, parameter_types) = opt(preceded(multispace0, parse_parameter_list))(input)?;
    Ok((
        input,
        MethodSignature {
            declaring_type: declaring_type.to_string(),
            name: name.to_string(),
            parameter_types: parameter_types
                .map(|types| types.into_iter().map(str::to_string).collect()),
        },
    ))
}

fn parse_parameter_list(input: &str) -> IResult<&str, Vec<&str>> {
    delimited(
        char('('),
        separated_list0(
            delimited(multispace0, char(','), multispace0),
            delimited(multispace0, parse_type_name, multispace0),
        ),
        char(')'),
    )(input)
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

/// Type names may be generic: `Nullable<Int32>`, `Sequence<Cook>`.
fn parse_type_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '<' || c == '>')(input)
}
