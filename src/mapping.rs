//! Schema-driven mapping resolver.
//!
//! Maps domain types onto tables from a TOML document:
//!
//! ```toml
//! [types.Cook]
//! table = "CookTable"
//! primary_key = "ID"
//! columns = [
//!     { name = "ID", type = "Int32" },
//!     { name = "FirstName", type = "String" },
//!     { name = "KitchenID", type = "Int32", nullable = true },
//! ]
//!
//! [types.Cook.relations.Kitchen]
//! target = "Kitchen"
//! foreign_key = "KitchenID"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QuillError, QuillResult};
use crate::ids::UniqueIdentifierGenerator;
use crate::ir::{ResolvedJoinInfo, SqlColumn, SqlEntity, SqlExpr, TableInfo, UnresolvedJoinInfo};
use crate::resolve::{MappingResolver, MemberSource};
use crate::value::{Value, ValueType};

/// Mapped domain types by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingSchema {
    #[serde(default)]
    pub types: BTreeMap<String, TypeMapping>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMapping {
    pub table: String,
    /// Member name of the primary key.
    pub primary_key: String,
    pub columns: Vec<ColumnMapping>,
    /// One-to-one navigations to other mapped types.
    #[serde(default)]
    pub relations: BTreeMap<String, RelationMapping>,
}

impl TypeMapping {
    fn column(&self, member: &str) -> Option<&ColumnMapping> {
        self.columns.iter().find(|c| c.name == member)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Member name in the domain type.
    pub name: String,
    /// Physical column name when it differs from the member name.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(rename = "type")]
    pub ty: ValueType,
    #[serde(default)]
    pub nullable: bool,
}

impl ColumnMapping {
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }

    pub fn value_type(&self) -> ValueType {
        if self.nullable {
            ValueType::nullable(self.ty.clone())
        } else {
            self.ty.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationMapping {
    pub target: String,
    /// Member of the originating type holding the foreign key.
    pub foreign_key: String,
    /// Member of the target type the foreign key refers to; its primary key by default.
    #[serde(default)]
    pub target_key: Option<String>,
}

impl MappingSchema {
    pub fn from_toml_str(content: &str) -> QuillResult<Self> {
        toml::from_str(content).map_err(|e| QuillError::Config(format!("invalid mapping schema: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> QuillResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn type_mapping(&self, item_type: &str) -> QuillResult<&TypeMapping> {
        self.types
            .get(item_type)
            .ok_or_else(|| QuillError::unmapped("type", item_type))
    }
}

/// [`MappingResolver`] backed by a [`MappingSchema`]. Table aliases are `t0`, `t1`, ...
#[derive(Debug, Clone)]
pub struct SchemaMappingResolver {
    schema: MappingSchema,
}

impl SchemaMappingResolver {
    pub fn new(schema: MappingSchema) -> Self {
        Self { schema }
    }

    pub fn from_toml_str(content: &str) -> QuillResult<Self> {
        Ok(Self::new(MappingSchema::from_toml_str(content)?))
    }

    pub fn schema(&self) -> &MappingSchema {
        &self.schema
    }

    fn column(
        &self,
        mapping: &TypeMapping,
        item_type: &str,
        member: &str,
        alias: &str,
    ) -> QuillResult<SqlColumn> {
        let column = mapping
            .column(member)
            .ok_or_else(|| QuillError::unmapped("member", format!("{}.{}", item_type, member)))?;
        Ok(SqlColumn::new(
            column.value_type(),
            alias,
            column.column_name(),
            column.name == mapping.primary_key,
        ))
    }
}

impl MappingResolver for SchemaMappingResolver {
    fn resolve_table_info(
        &self,
        item_type: &str,
        ids: &mut UniqueIdentifierGenerator,
    ) -> QuillResult<TableInfo> {
        let mapping = self.schema.type_mapping(item_type)?;
        Ok(TableInfo::ResolvedSimple {
            item_type: item_type.to_string(),
            table_name: mapping.table.clone(),
            alias: ids.unique_identifier("t"),
        })
    }

    fn resolve_join_info(
        &self,
        join_info: &UnresolvedJoinInfo,
        ids: &mut UniqueIdentifierGenerator,
    ) -> QuillResult<ResolvedJoinInfo> {
        let entity = &join_info.originating_entity;
        let mapping = self.schema.type_mapping(&entity.item_type)?;
        let relation = mapping.relations.get(&join_info.member).ok_or_else(|| {
            QuillError::unmapped("relation", format!("{}.{}", entity.item_type, join_info.member))
        })?;
        let target = self.schema.type_mapping(&relation.target)?;

        let alias = ids.unique_identifier("t");
        let left_key = self.column(mapping, &entity.item_type, &relation.foreign_key, &entity.table_alias)?;
        let target_key = relation.target_key.as_deref().unwrap_or(&target.primary_key);
        let right_key = self.column(target, &relation.target, target_key, &alias)?;

        Ok(ResolvedJoinInfo {
            foreign_table_info: TableInfo::ResolvedSimple {
                item_type: relation.target.clone(),
                table_name: target.table.clone(),
                alias,
            },
            left_key: SqlExpr::Column(left_key),
            right_key: SqlExpr::Column(right_key),
        })
    }

    fn resolve_simple_table_info(
        &self,
        item_type: &str,
        table_alias: &str,
        _ids: &mut UniqueIdentifierGenerator,
    ) -> QuillResult<SqlEntity> {
        let mapping = self.schema.type_mapping(item_type)?;
        let primary_key = self.column(mapping, item_type, &mapping.primary_key, table_alias)?;
        let columns = mapping
            .columns
            .iter()
            .map(|column| {
                SqlColumn::new(
                    column.value_type(),
                    table_alias,
                    column.column_name(),
                    column.name == mapping.primary_key,
                )
            })
            .collect();
        Ok(SqlEntity {
            item_type: item_type.to_string(),
            table_alias: table_alias.to_string(),
            name: None,
            primary_key,
            columns,
        })
    }

    fn resolve_member_expression(&self, source: MemberSource<'_>, member: &str) -> QuillResult<SqlExpr> {
        match source {
            MemberSource::Entity(entity) => {
                let mapping = self.schema.type_mapping(&entity.item_type)?;
                if let Some(relation) = mapping.relations.get(member) {
                    return Ok(SqlExpr::EntityRefMember {
                        entity: entity.clone(),
                        member: member.to_string(),
                        ty: ValueType::entity(relation.target.clone()),
                    });
                }
                let column = self.column(mapping, &entity.item_type, member, &entity.table_alias)?;
                Ok(SqlExpr::Column(column))
            }
            MemberSource::Column(column) => Err(QuillError::unmapped(
                "member",
                format!("{}.{}", column.name, member),
            )),
        }
    }

    fn resolve_constant_expression(&self, value: &Value, ty: &ValueType) -> QuillResult<SqlExpr> {
        let Value::Entity { type_name, id } = value else {
            return Ok(SqlExpr::Constant {
                value: value.clone(),
                ty: ty.clone(),
            });
        };
        let mapping = self.schema.type_mapping(type_name)?;
        let key = mapping.column(&mapping.primary_key).ok_or_else(|| {
            QuillError::unmapped("member", format!("{}.{}", type_name, mapping.primary_key))
        })?;
        Ok(SqlExpr::EntityConstant {
            ty: ty.clone(),
            value: value.clone(),
            primary_key: Box::new(SqlExpr::Constant {
                value: (**id).clone(),
                ty: key.value_type(),
            }),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) const KITCHEN_SCHEMA: &str = r#"
        [types.Cook]
        table = "CookTable"
        primary_key = "ID"
        columns = [
            { name = "ID", type = "Int32" },
            { name = "FirstName", type = "String" },
            { name = "Name", type = "String" },
            { name = "IsStarredCook", type = "Boolean" },
            { name = "Weight", type = "Double", nullable = true },
            { name = "KitchenID", type = "Int32", nullable = true },
        ]

        [types.Cook.relations.Kitchen]
        target = "Kitchen"
        foreign_key = "KitchenID"

        [types.Kitchen]
        table = "KitchenTable"
        primary_key = "ID"
        columns = [
            { name = "ID", type = "Int32" },
            { name = "Name", column = "KitchenName", type = "String" },
            { name = "RestaurantID", type = "Int32", nullable = true },
        ]

        [types.Kitchen.relations.Restaurant]
        target = "Restaurant"
        foreign_key = "RestaurantID"

        [types.Restaurant]
        table = "RestaurantTable"
        primary_key = "ID"
        columns = [
            { name = "ID", type = "Int32" },
            { name = "Name", type = "String" },
        ]
    "#;

    pub(crate) fn kitchen_resolver() -> SchemaMappingResolver {
        SchemaMappingResolver::from_toml_str(KITCHEN_SCHEMA).unwrap()
    }

    #[test]
    fn test_parse_schema() {
        let schema = MappingSchema::from_toml_str(KITCHEN_SCHEMA).unwrap();
        assert_eq!(schema.types.len(), 3);
        let kitchen = &schema.types["Kitchen"];
        assert_eq!(kitchen.columns[1].column_name(), "KitchenName");
        assert_eq!(
            kitchen.columns[2].value_type(),
            ValueType::nullable(ValueType::Int32)
        );
    }

    #[test]
    fn test_invalid_schema_is_config_error() {
        let err = MappingSchema::from_toml_str("[types.Cook]\ntable = 3").unwrap_err();
        assert!(matches!(err, QuillError::Config(_)));
    }

    #[test]
    fn test_table_aliases() {
        let resolver = kitchen_resolver();
        let mut ids = UniqueIdentifierGenerator::new();
        let first = resolver.resolve_table_info("Cook", &mut ids).unwrap();
        let second = resolver.resolve_table_info("Kitchen", &mut ids).unwrap();
        assert_eq!(first.alias(), Some("t0"));
        assert_eq!(second.alias(), Some("t1"));
    }

    #[test]
    fn test_unknown_type() {
        let resolver = kitchen_resolver();
        let mut ids = UniqueIdentifierGenerator::new();
        match resolver.resolve_table_info("Chef", &mut ids) {
            Err(QuillError::UnmappedItem { kind, name }) => {
                assert_eq!(kind, "type");
                assert_eq!(name, "Chef");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_entity_members() {
        let resolver = kitchen_resolver();
        let mut ids = UniqueIdentifierGenerator::new();
        let cook = resolver.resolve_simple_table_info("Cook", "t0", &mut ids).unwrap();
        assert_eq!(cook.columns.len(), 6);
        assert!(cook.primary_key.is_primary_key);

        let name = resolver
            .resolve_member_expression(MemberSource::Entity(&cook), "FirstName")
            .unwrap();
        assert_eq!(
            name,
            SqlExpr::Column(SqlColumn::new(ValueType::String, "t0", "FirstName", false))
        );

        let kitchen = resolver
            .resolve_member_expression(MemberSource::Entity(&cook), "Kitchen")
            .unwrap();
        assert!(matches!(kitchen, SqlExpr::EntityRefMember { ref member, .. } if member == "Kitchen"));

        assert!(matches!(
            resolver.resolve_member_expression(MemberSource::Entity(&cook), "Age"),
            Err(QuillError::UnmappedItem { kind: "member", .. })
        ));
    }

    #[test]
    fn test_join_keys() {
        let resolver = kitchen_resolver();
        let mut ids = UniqueIdentifierGenerator::new();
        ids.unique_identifier("t");
        let cook = resolver.resolve_simple_table_info("Cook", "t0", &mut ids).unwrap();
        let join = resolver
            .resolve_join_info(
                &UnresolvedJoinInfo {
                    originating_entity: cook,
                    member: "Kitchen".to_string(),
                },
                &mut ids,
            )
            .unwrap();
        assert_eq!(join.foreign_table_info.alias(), Some("t1"));
        assert_eq!(
            join.left_key,
            SqlExpr::Column(SqlColumn::new(
                ValueType::nullable(ValueType::Int32),
                "t0",
                "KitchenID",
                false
            ))
        );
        assert_eq!(
            join.right_key,
            SqlExpr::Column(SqlColumn::new(ValueType::Int32, "t1", "ID", true))
        );
    }

    #[test]
    fn test_entity_constant_carries_primary_key() {
        let resolver = kitchen_resolver();
        let value = Value::Entity {
            type_name: "Cook".to_string(),
            id: Box::new(Value::Int(7)),
        };
        let resolved = resolver
            .resolve_constant_expression(&value, &ValueType::entity("Cook"))
            .unwrap();
        let SqlExpr::EntityConstant { primary_key, .. } = resolved else {
            panic!("expected an entity constant");
        };
        assert_eq!(*primary_key, SqlExpr::constant(7i64, ValueType::Int32));
    }

    #[test]
    fn test_plain_constant_is_unchanged() {
        let resolver = kitchen_resolver();
        let resolved = resolver
            .resolve_constant_expression(&Value::from("hugo"), &ValueType::String)
            .unwrap();
        assert_eq!(resolved, SqlExpr::constant("hugo", ValueType::String));
    }
}
