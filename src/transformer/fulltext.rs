//! Full-text predicates: `FullText.ContainsFulltext` / `FullText.ContainsFreetext`.

use super::registry::MethodCallTransformerRegistry;
use super::signature::MethodSignature;
use crate::error::{QuillError, QuillResult};
use crate::ir::{SqlExpr, SqlMethodCall};
use crate::value::{Value, ValueType};

pub fn register(registry: &mut MethodCallTransformerRegistry) {
    for (method, function) in [("ContainsFulltext", "CONTAINS"), ("ContainsFreetext", "FREETEXT")] {
        registry.register_all(
            [
                MethodSignature::method("FullText", method, &["String", "String"]),
                MethodSignature::method("FullText", method, &["String", "String", "String"]),
                MethodSignature::method("FullText", method, &["String", "String", "Int32"]),
            ],
            move |call: &SqlMethodCall| full_text(call, function),
        );
    }
}

fn full_text(call: &SqlMethodCall, function: &str) -> QuillResult<SqlExpr> {
    let mut args = vec![call.argument(0)?.clone(), call.argument(1)?.clone()];
    if let Some(language) = call.arguments.get(2) {
        args.push(language_clause(call, language)?);
    }
    Ok(SqlExpr::predicate_function(function, args))
}

/// `LANGUAGE 1033` / `LANGUAGE 'English'`; the language is inlined, never a parameter.
fn language_clause(call: &SqlMethodCall, language: &SqlExpr) -> QuillResult<SqlExpr> {
    let text = match language {
        SqlExpr::Constant {
            value: Value::Int(lcid),
            ..
        } => lcid.to_string(),
        SqlExpr::Constant {
            value: Value::String(name),
            ..
        } => format!("'{}'", name.replace('\'', "''")),
        other => {
            return Err(QuillError::InvalidMethodArgument {
                method: call.signature.to_string(),
                message: format!(
                    "the language argument must be a literal value, found '{}'",
                    other.kind_name()
                ),
            });
        }
    };
    Ok(SqlExpr::custom_text(format!("LANGUAGE {}", text), ValueType::String))
}
