//! `Equals`, instance (`a.Equals(b)`) and static (`T.Equals(a, b)`).

use super::registry::MethodCallTransformerRegistry;
use super::signature::MethodSignature;
use crate::error::QuillResult;
use crate::ir::{SqlExpr, SqlMethodCall};

const EQUATABLE_TYPES: [&str; 10] = [
    "Boolean", "Char", "DateTime", "Decimal", "Double", "Int16", "Int32", "Int64", "Object", "String",
];

pub fn register(registry: &mut MethodCallTransformerRegistry) {
    let signatures = EQUATABLE_TYPES.into_iter().flat_map(|ty| {
        [
            MethodSignature::method(ty, "Equals", &[ty]),
            MethodSignature::method(ty, "Equals", &[ty, ty]),
            MethodSignature::method(ty, "Equals", &["Object"]),
        ]
    });
    registry.register_all(signatures, equals);
}

fn equals(call: &SqlMethodCall) -> QuillResult<SqlExpr> {
    let (left, right) = match &call.object {
        Some(object) => (object.as_ref(), call.argument(0)?),
        None => (call.argument(0)?, call.argument(1)?),
    };
    Ok(SqlExpr::equal(left.clone(), right.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    #[test]
    fn test_static_and_instance_forms_agree() {
        let instance = SqlMethodCall {
            signature: MethodSignature::method("String", "Equals", &["String"]),
            object: Some(Box::new(SqlExpr::text("a"))),
            arguments: vec![SqlExpr::text("b")],
            ty: ValueType::Boolean,
            source_text: "a.Equals(b)".to_string(),
        };
        let statik = SqlMethodCall {
            signature: MethodSignature::method("String", "Equals", &["String", "String"]),
            object: None,
            arguments: vec![SqlExpr::text("a"), SqlExpr::text("b")],
            ty: ValueType::Boolean,
            source_text: "String.Equals(a, b)".to_string(),
        };
        assert_eq!(equals(&instance).unwrap(), equals(&statik).unwrap());
    }
}
