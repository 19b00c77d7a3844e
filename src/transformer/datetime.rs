//! `DateTime` / `DateOnly` arithmetic and date-part properties.

use super::registry::MethodCallTransformerRegistry;
use super::signature::MethodSignature;
use crate::error::QuillResult;
use crate::ir::{SqlBinaryOperator, SqlExpr, SqlMethodCall};
use crate::value::ValueType;

const MILLISECONDS_PER_DAY: i64 = 86_400_000;
const TICKS_PER_MILLISECOND: i64 = 10_000;

/// Sub-day units and their length in milliseconds.
const MILLISECOND_UNITS: [(&str, i64); 5] = [
    ("AddDays", MILLISECONDS_PER_DAY),
    ("AddHours", 3_600_000),
    ("AddMinutes", 60_000),
    ("AddSeconds", 1_000),
    ("AddMilliseconds", 1),
];

const DATE_PARTS: [(&str, &str); 7] = [
    ("Year", "year"),
    ("Month", "month"),
    ("Day", "day"),
    ("Hour", "hour"),
    ("Minute", "minute"),
    ("Second", "second"),
    ("Millisecond", "millisecond"),
];

pub fn register(registry: &mut MethodCallTransformerRegistry) {
    for (method, factor) in MILLISECOND_UNITS {
        registry.register(
            MethodSignature::method("DateTime", method, &["Double"]),
            move |call: &SqlMethodCall| -> QuillResult<SqlExpr> {
                let milliseconds = SqlExpr::Convert {
                    target: "BIGINT".to_string(),
                    expression: Box::new(SqlExpr::binary(
                        SqlBinaryOperator::Multiply,
                        call.argument(0)?.clone(),
                        SqlExpr::int(factor),
                    )),
                    ty: ValueType::Int64,
                };
                add_milliseconds(call.object()?.clone(), milliseconds)
            },
        );
    }

    registry.register(
        MethodSignature::method("DateTime", "AddTicks", &["Int64"]),
        |call: &SqlMethodCall| -> QuillResult<SqlExpr> {
            let milliseconds = SqlExpr::binary(
                SqlBinaryOperator::Divide,
                call.argument(0)?.clone(),
                SqlExpr::int(TICKS_PER_MILLISECOND),
            );
            add_milliseconds(call.object()?.clone(), milliseconds)
        },
    );

    for declaring_type in ["DateTime", "DateOnly"] {
        registry.register(
            MethodSignature::method(declaring_type, "AddYears", &["Int32"]),
            |call: &SqlMethodCall| date_add(call, "year"),
        );
        registry.register(
            MethodSignature::method(declaring_type, "AddMonths", &["Int32"]),
            |call: &SqlMethodCall| date_add(call, "month"),
        );
    }
    registry.register(
        MethodSignature::method("DateOnly", "AddDays", &["Int32"]),
        |call: &SqlMethodCall| date_add(call, "day"),
    );

    for (property, part) in DATE_PARTS {
        registry.register(
            MethodSignature::property("DateTime", property),
            move |call: &SqlMethodCall| -> QuillResult<SqlExpr> {
                Ok(SqlExpr::function(
                    "DATEPART",
                    vec![unit(part), call.object()?.clone()],
                    ValueType::Int32,
                ))
            },
        );
    }
}

fn unit(name: &str) -> SqlExpr {
    SqlExpr::custom_text(name, ValueType::String)
}

fn dateadd(part: &str, amount: SqlExpr, date: SqlExpr) -> SqlExpr {
    let ty = date.ty();
    SqlExpr::function("DATEADD", vec![unit(part), amount, date], ty)
}

fn date_add(call: &SqlMethodCall, part: &str) -> QuillResult<SqlExpr> {
    Ok(dateadd(part, call.argument(0)?.clone(), call.object()?.clone()))
}

/// DATEADD only takes 32-bit offsets, so whole days and the millisecond
/// remainder are added separately.
fn add_milliseconds(date: SqlExpr, milliseconds: SqlExpr) -> QuillResult<SqlExpr> {
    let days = SqlExpr::binary(
        SqlBinaryOperator::Divide,
        milliseconds.clone(),
        SqlExpr::int(MILLISECONDS_PER_DAY),
    );
    let remainder = SqlExpr::binary(
        SqlBinaryOperator::Modulo,
        milliseconds,
        SqlExpr::int(MILLISECONDS_PER_DAY),
    );
    Ok(dateadd("millisecond", remainder, dateadd("day", days, date)))
}
