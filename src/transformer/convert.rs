//! `Convert.To*` as dialect `CONVERT(type, value)`.

use super::registry::MethodCallTransformerRegistry;
use super::signature::MethodSignature;
use crate::error::{QuillError, QuillResult};
use crate::ir::{SqlExpr, SqlMethodCall};
use crate::value::ValueType;

const CONVERT_METHODS: [&str; 11] = [
    "ToString",
    "ToBoolean",
    "ToByte",
    "ToChar",
    "ToDateTime",
    "ToDecimal",
    "ToDouble",
    "ToInt16",
    "ToInt32",
    "ToInt64",
    "ToSingle",
];

const SOURCE_TYPES: [&str; 12] = [
    "Boolean", "Byte", "Char", "DateTime", "Decimal", "Double", "Int16", "Int32", "Int64", "Object",
    "Single", "String",
];

pub fn register(registry: &mut MethodCallTransformerRegistry) {
    let signatures = CONVERT_METHODS.into_iter().flat_map(|method| {
        SOURCE_TYPES
            .into_iter()
            .map(move |source| MethodSignature::method("Convert", method, &[source]))
    });
    registry.register_all(signatures, convert);
}

/// SQL Server type name for a conversion target.
pub fn sql_type_name(ty: &ValueType) -> Option<&'static str> {
    Some(match ty.underlying() {
        ValueType::String => "NVARCHAR(MAX)",
        ValueType::Boolean => "BIT",
        ValueType::Byte => "TINYINT",
        ValueType::Char => "NCHAR",
        ValueType::DateTime => "DATETIME",
        ValueType::Decimal => "DECIMAL",
        ValueType::Double => "FLOAT",
        ValueType::Int16 => "SMALLINT",
        ValueType::Int32 => "INT",
        ValueType::Int64 => "BIGINT",
        ValueType::Single => "REAL",
        _ => return None,
    })
}

fn convert(call: &SqlMethodCall) -> QuillResult<SqlExpr> {
    let target = sql_type_name(&call.ty).ok_or_else(|| QuillError::InvalidMethodArgument {
        method: call.signature.to_string(),
        message: format!("there is no SQL type for conversion target '{}'", call.ty),
    })?;
    Ok(SqlExpr::Convert {
        target: target.to_string(),
        expression: Box::new(call.argument(0)?.clone()),
        ty: call.ty.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(ty: ValueType) -> SqlMethodCall {
        SqlMethodCall {
            signature: MethodSignature::method("Convert", "ToInt32", &["String"]),
            object: None,
            arguments: vec![SqlExpr::text("42")],
            ty,
            source_text: "Convert.ToInt32(c.Code)".to_string(),
        }
    }

    #[test]
    fn test_convert_to_int() {
        assert_eq!(
            convert(&call(ValueType::Int32)).unwrap(),
            SqlExpr::Convert {
                target: "INT".to_string(),
                expression: Box::new(SqlExpr::text("42")),
                ty: ValueType::Int32,
            }
        );
    }

    #[test]
    fn test_unmapped_target_is_error() {
        let err = convert(&call(ValueType::TimeSpan)).unwrap_err();
        assert!(matches!(err, QuillError::InvalidMethodArgument { .. }));
    }

    #[test]
    fn test_every_method_has_every_source() {
        let mut registry = MethodCallTransformerRegistry::new();
        register(&mut registry);
        assert_eq!(registry.len(), CONVERT_METHODS.len() * SOURCE_TYPES.len());
    }
}
