//! `Contains` / `StartsWith` / `EndsWith` as `LIKE` predicates.

use super::registry::MethodCallTransformerRegistry;
use super::signature::MethodSignature;
use crate::error::QuillResult;
use crate::ir::{SqlExpr, SqlMethodCall};
use crate::value::{Value, ValueType};

/// Characters that are wildcards inside a `LIKE` pattern, in escape order.
/// The escape character itself comes first so later escapes are not doubled.
pub const LIKE_WILDCARDS: [char; 4] = ['\\', '%', '_', '['];

pub const LIKE_ESCAPE_CHAR: char = '\\';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Both,
    Start,
    End,
}

pub fn register(registry: &mut MethodCallTransformerRegistry) {
    registry.register(
        MethodSignature::method("String", "Contains", &["String"]),
        |call: &SqlMethodCall| like(call, Anchor::Both),
    );
    registry.register(
        MethodSignature::method("String", "StartsWith", &["String"]),
        |call: &SqlMethodCall| like(call, Anchor::Start),
    );
    registry.register(
        MethodSignature::method("String", "EndsWith", &["String"]),
        |call: &SqlMethodCall| like(call, Anchor::End),
    );
}

/// Escapes `\ % _ [` (in that order) with a backslash.
pub fn escape_like_pattern(pattern: &str) -> String {
    let mut escaped = pattern.to_string();
    for wildcard in LIKE_WILDCARDS {
        escaped = escaped.replace(wildcard, &format!("{}{}", LIKE_ESCAPE_CHAR, wildcard));
    }
    escaped
}

fn like(call: &SqlMethodCall, anchor: Anchor) -> QuillResult<SqlExpr> {
    let value = call.object()?.clone();
    let pattern = call.argument(0)?;

    let pattern = match pattern {
        SqlExpr::Constant { value: Value::Null, .. } => {
            return Ok(SqlExpr::constant(false, ValueType::Boolean));
        }
        SqlExpr::Constant {
            value: Value::String(text),
            ..
        } => {
            let escaped = escape_like_pattern(text);
            let anchored = match anchor {
                Anchor::Both => format!("%{}%", escaped),
                Anchor::Start => format!("{}%", escaped),
                Anchor::End => format!("%{}", escaped),
            };
            SqlExpr::constant(anchored, ValueType::String)
        }
        other => {
            let escaped = SqlExpr::LikeEscape(Box::new(other.clone()));
            match anchor {
                Anchor::Both => SqlExpr::concat(
                    SqlExpr::concat(SqlExpr::text("%"), escaped),
                    SqlExpr::text("%"),
                ),
                Anchor::Start => SqlExpr::concat(escaped, SqlExpr::text("%")),
                Anchor::End => SqlExpr::concat(SqlExpr::text("%"), escaped),
            }
        }
    };

    Ok(SqlExpr::Like {
        expression: Box::new(value),
        pattern: Box::new(pattern),
    })
}
