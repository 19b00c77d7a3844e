//! String methods: Substring, Remove, ToUpper/ToLower, Trim, IndexOf, Insert, Length.

use super::registry::MethodCallTransformerRegistry;
use super::signature::MethodSignature;
use crate::error::QuillResult;
use crate::ir::{SqlBinaryOperator, SqlExpr, SqlMethodCall};
use crate::value::ValueType;

pub fn register(registry: &mut MethodCallTransformerRegistry) {
    registry.register_all(
        [
            MethodSignature::method("String", "Substring", &["Int32"]),
            MethodSignature::method("String", "Substring", &["Int32", "Int32"]),
        ],
        substring,
    );
    registry.register_all(
        [
            MethodSignature::method("String", "Remove", &["Int32"]),
            MethodSignature::method("String", "Remove", &["Int32", "Int32"]),
        ],
        remove,
    );
    registry.register(MethodSignature::method("String", "ToUpper", &[]), to_upper);
    registry.register(MethodSignature::method("String", "ToLower", &[]), to_lower);
    registry.register(MethodSignature::method("String", "Trim", &[]), trim);
    registry.register_all(
        ["String", "Char"].into_iter().flat_map(|value| {
            [
                MethodSignature::method("String", "IndexOf", &[value]),
                MethodSignature::method("String", "IndexOf", &[value, "Int32"]),
                MethodSignature::method("String", "IndexOf", &[value, "Int32", "Int32"]),
            ]
        }),
        index_of,
    );
    registry.register(
        MethodSignature::method("String", "Insert", &["Int32", "String"]),
        insert,
    );
    registry.register(MethodSignature::property("String", "Length"), length);
}

/// `(LEN((x + '#')) - 1)`: the sentinel keeps trailing blanks counted.
pub fn sql_length(value: SqlExpr) -> SqlExpr {
    SqlExpr::subtract(
        SqlExpr::function(
            "LEN",
            vec![SqlExpr::concat(value, SqlExpr::text("#"))],
            ValueType::Int32,
        ),
        SqlExpr::int(1),
    )
}

fn plus_one(index: SqlExpr) -> SqlExpr {
    SqlExpr::add(index, SqlExpr::int(1))
}

/// Explicit length, or everything from `start` to the end of `value`.
fn length_or_rest(call: &SqlMethodCall, value: &SqlExpr, start: &SqlExpr) -> QuillResult<SqlExpr> {
    Ok(match call.arguments.get(1) {
        Some(length) => length.clone(),
        None => SqlExpr::subtract(sql_length(value.clone()), start.clone()),
    })
}

fn substring(call: &SqlMethodCall) -> QuillResult<SqlExpr> {
    let value = call.object()?;
    let start = call.argument(0)?;
    let length = length_or_rest(call, value, start)?;
    Ok(SqlExpr::function(
        "SUBSTRING",
        vec![value.clone(), plus_one(start.clone()), length],
        ValueType::String,
    ))
}

fn remove(call: &SqlMethodCall) -> QuillResult<SqlExpr> {
    let value = call.object()?;
    let start = call.argument(0)?;
    let count = length_or_rest(call, value, start)?;
    Ok(SqlExpr::function(
        "STUFF",
        vec![value.clone(), plus_one(start.clone()), count, SqlExpr::text("")],
        ValueType::String,
    ))
}

fn to_upper(call: &SqlMethodCall) -> QuillResult<SqlExpr> {
    Ok(SqlExpr::function("UPPER", vec![call.object()?.clone()], ValueType::String))
}

fn to_lower(call: &SqlMethodCall) -> QuillResult<SqlExpr> {
    Ok(SqlExpr::function("LOWER", vec![call.object()?.clone()], ValueType::String))
}

fn trim(call: &SqlMethodCall) -> QuillResult<SqlExpr> {
    let rtrim = SqlExpr::function("RTRIM", vec![call.object()?.clone()], ValueType::String);
    Ok(SqlExpr::function("LTRIM", vec![rtrim], ValueType::String))
}

fn length(call: &SqlMethodCall) -> QuillResult<SqlExpr> {
    Ok(sql_length(call.object()?.clone()))
}

fn index_of(call: &SqlMethodCall) -> QuillResult<SqlExpr> {
    let haystack = call.object()?;
    let value = call.argument(0)?;
    let start = call.arguments.get(1);
    let count = call.arguments.get(2);

    let value_is_empty = SqlExpr::equal(sql_length(value.clone()), SqlExpr::int(0));
    let haystack = match (start, count) {
        (Some(start), Some(count)) => SqlExpr::function(
            "SUBSTRING",
            vec![
                haystack.clone(),
                SqlExpr::int(1),
                SqlExpr::add(start.clone(), count.clone()),
            ],
            ValueType::String,
        ),
        _ => haystack.clone(),
    };

    let (test, when_empty, char_index_args) = match start {
        None => (
            value_is_empty,
            SqlExpr::int(0),
            vec![value.clone(), haystack.clone()],
        ),
        Some(start) => {
            let in_bounds = SqlExpr::binary(
                SqlBinaryOperator::LessThanOrEqual,
                plus_one(start.clone()),
                sql_length(haystack.clone()),
            );
            (
                SqlExpr::and(value_is_empty, in_bounds),
                start.clone(),
                vec![value.clone(), haystack.clone(), plus_one(start.clone())],
            )
        }
    };

    let found = SqlExpr::subtract(
        SqlExpr::function("CHARINDEX", char_index_args, ValueType::Int32),
        SqlExpr::int(1),
    );
    Ok(SqlExpr::case_when(test, when_empty, found))
}

fn insert(call: &SqlMethodCall) -> QuillResult<SqlExpr> {
    let haystack = call.object()?;
    let index = call.argument(0)?;
    let value = call.argument(1)?;

    // STUFF yields NULL when the insert position is one past the end.
    let at_end = SqlExpr::equal(
        plus_one(sql_length(haystack.clone())),
        plus_one(index.clone()),
    );
    let appended = SqlExpr::concat(haystack.clone(), value.clone());
    let stuffed = SqlExpr::function(
        "STUFF",
        vec![haystack.clone(), plus_one(index.clone()), SqlExpr::int(0), value.clone()],
        ValueType::String,
    );
    Ok(SqlExpr::case_when(at_end, appended, stuffed))
}
