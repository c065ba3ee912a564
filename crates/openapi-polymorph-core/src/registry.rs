//! Type registry: the input description of records, enums and their parents.
//!
//! A registry is usually loaded from JSON:
//!
//! ```json
//! {
//!   "roots": ["Dog"],
//!   "types": [
//!     { "name": "Pet", "kind": "record", "extends": "BaseModel",
//!       "fields": { "name": { "type": "string" } }, "required": ["name"] },
//!     { "name": "Dog", "kind": "record", "extends": "Pet",
//!       "fields": { "tags": { "type": { "array": "string" } } } },
//!     { "name": "Color", "kind": "enum", "values": ["RED", "GREEN"] }
//!   ]
//! }
//! ```
//!
//! Loading validates the registry; an invalid registry never reaches discovery.

use std::collections::HashSet;
use std::io::Read;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PolymorphError;
use crate::schema::{AdditionalProperties, UNIVERSAL_BASE_NAME};
use crate::schema_utils::is_identifier;

/// A validated set of type definitions, keyed by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "RegistryFile", into = "RegistryFile")]
pub struct TypeRegistry {
    roots: Vec<String>,
    types: IndexMap<String, TypeDef>,
}

/// On-disk shape of a registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    roots: Vec<String>,
    types: Vec<TypeDef>,
}

impl TryFrom<RegistryFile> for TypeRegistry {
    type Error = PolymorphError;

    fn try_from(file: RegistryFile) -> Result<Self, Self::Error> {
        TypeRegistry::new(file.types, file.roots)
    }
}

impl From<TypeRegistry> for RegistryFile {
    fn from(registry: TypeRegistry) -> Self {
        RegistryFile {
            roots: registry.roots,
            types: registry.types.into_values().collect(),
        }
    }
}

impl TypeRegistry {
    /// Build and validate a registry.
    pub fn new(
        types: impl IntoIterator<Item = TypeDef>,
        roots: impl IntoIterator<Item = String>,
    ) -> Result<Self, PolymorphError> {
        let mut map = IndexMap::new();
        for def in types {
            if map.contains_key(&def.name) {
                return Err(PolymorphError::invalid_registry(
                    &def.name,
                    "type is declared more than once",
                ));
            }
            map.insert(def.name.clone(), def);
        }
        let registry = Self {
            roots: roots.into_iter().collect(),
            types: map,
        };
        registry.validate()?;
        Ok(registry)
    }

    /// Parse and validate a registry. Validation failures surface as
    /// [`PolymorphError::InvalidRegistry`], not as JSON errors.
    pub fn from_json(json: &str) -> Result<Self, PolymorphError> {
        let file: RegistryFile = serde_json::from_str(json)?;
        file.try_into()
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PolymorphError> {
        let file: RegistryFile = serde_json::from_reader(reader)?;
        file.try_into()
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values()
    }

    /// Roots declared in the registry, or every registered name when none are.
    pub fn default_roots(&self) -> Vec<String> {
        if self.roots.is_empty() {
            self.types.keys().cloned().collect()
        } else {
            self.roots.clone()
        }
    }

    fn validate(&self) -> Result<(), PolymorphError> {
        for def in self.types.values() {
            if !is_identifier(&def.name) {
                return Err(PolymorphError::invalid_registry(
                    &def.name,
                    "type names must be identifiers",
                ));
            }
            if def.name == UNIVERSAL_BASE_NAME {
                return Err(PolymorphError::invalid_registry(
                    &def.name,
                    "name is reserved for the universal base schema",
                ));
            }
            if let TypeBody::Record(record) = &def.body {
                for name in &record.required {
                    if !record.fields.contains_key(name) {
                        return Err(PolymorphError::invalid_registry(
                            &def.name,
                            format!("required field {name} is not declared"),
                        ));
                    }
                }
                self.check_extends_chain(def)?;
            }
        }
        Ok(())
    }

    /// Walk the `extends` chain through registered records and reject cycles
    /// and enum ancestors.
    fn check_extends_chain(&self, def: &TypeDef) -> Result<(), PolymorphError> {
        let mut seen = HashSet::from([def.name.as_str()]);
        let mut current = def.parent();
        while let Some(parent) = current {
            if !seen.insert(parent) {
                return Err(PolymorphError::invalid_registry(
                    &def.name,
                    format!("inheritance cycle through {parent}"),
                ));
            }
            let registered = self.get(parent);
            if let Some(TypeDef {
                body: TypeBody::Enum(_),
                ..
            }) = registered
            {
                return Err(PolymorphError::invalid_registry(
                    &def.name,
                    format!("ancestor {parent} is an enum"),
                ));
            }
            current = registered.and_then(TypeDef::parent);
        }
        Ok(())
    }
}

/// One registered record or enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    /// Module path that owns the type, used by the module map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Vendor extensions copied onto the generated schema.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extensions: IndexMap<String, Value>,
    #[serde(flatten)]
    pub body: TypeBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeBody {
    Record(RecordDef),
    Enum(EnumDef),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDef {
    /// Single parent. Sentinel names end the chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default)]
    pub fields: IndexMap<String, FieldDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    pub values: Vec<Value>,
    #[serde(rename = "type", default = "default_enum_type")]
    pub schema_type: String,
}

fn default_enum_type() -> String {
    "string".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

impl FieldDef {
    pub fn new(ty: TypeExpr) -> Self {
        Self {
            ty,
            default: None,
            title: None,
            description: None,
            format: None,
            read_only: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Declared field type, before names are resolved against the registry.
///
/// A bare string is a primitive or a type name; containers are single-key
/// objects: `{"array": T}`, `{"optional": T}`, `{"union": [T, ...]}`,
/// `{"map": T}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeExpr {
    Array(Box<TypeExpr>),
    Optional(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    Map(Box<TypeExpr>),
    #[serde(untagged)]
    Name(String),
}

impl TypeExpr {
    pub fn name(name: impl Into<String>) -> Self {
        TypeExpr::Name(name.into())
    }

    pub fn array(inner: TypeExpr) -> Self {
        TypeExpr::Array(Box::new(inner))
    }

    pub fn optional(inner: TypeExpr) -> Self {
        TypeExpr::Optional(Box::new(inner))
    }

    pub fn map(inner: TypeExpr) -> Self {
        TypeExpr::Map(Box::new(inner))
    }
}

impl TypeDef {
    pub fn record(name: impl Into<String>) -> Self {
        Self::with_body(name, TypeBody::Record(RecordDef::default()))
    }

    pub fn enumeration<V: Into<Value>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::with_body(
            name,
            TypeBody::Enum(EnumDef {
                values: values.into_iter().map(Into::into).collect(),
                schema_type: default_enum_type(),
            }),
        )
    }

    fn with_body(name: impl Into<String>, body: TypeBody) -> Self {
        Self {
            name: name.into(),
            module: None,
            title: None,
            description: None,
            extensions: IndexMap::new(),
            body,
        }
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.body, TypeBody::Enum(_))
    }

    /// Declared parent of a record.
    pub fn parent(&self) -> Option<&str> {
        match &self.body {
            TypeBody::Record(record) => record.extends.as_deref(),
            TypeBody::Enum(_) => None,
        }
    }

    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    // Record-only builders are no-ops on enums.

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        if let TypeBody::Record(record) = &mut self.body {
            record.extends = Some(parent.into());
        }
        self
    }

    pub fn field(self, name: impl Into<String>, ty: TypeExpr) -> Self {
        self.field_def(name, FieldDef::new(ty))
    }

    pub fn field_def(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        if let TypeBody::Record(record) = &mut self.body {
            record.fields.insert(name.into(), def);
        }
        self
    }

    pub fn required<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        if let TypeBody::Record(record) = &mut self.body {
            record.required.extend(names.into_iter().map(str::to_string));
        }
        self
    }

    pub fn additional_properties(mut self, additional: AdditionalProperties) -> Self {
        if let TypeBody::Record(record) = &mut self.body {
            record.additional_properties = Some(additional);
        }
        self
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_registry() {
        let registry = TypeRegistry::from_json(
            &json!({
                "roots": ["Dog"],
                "types": [
                    { "name": "Pet", "kind": "record", "module": "zoo.pets",
                      "fields": { "name": { "type": "string" } }, "required": ["name"] },
                    { "name": "Dog", "kind": "record", "extends": "Pet",
                      "fields": {
                          "tags": { "type": { "array": "string" } },
                          "color": { "type": { "optional": "Color" }, "default": "RED" }
                      } },
                    { "name": "Color", "kind": "enum", "values": ["RED", "GREEN"] }
                ]
            })
            .to_string(),
        )
        .unwrap();

        assert_eq!(registry.default_roots(), vec!["Dog".to_string()]);
        let dog = registry.get("Dog").unwrap();
        assert_eq!(dog.parent(), Some("Pet"));
        let TypeBody::Record(record) = &dog.body else {
            panic!("Dog should be a record");
        };
        assert_eq!(
            record.fields["tags"].ty,
            TypeExpr::array(TypeExpr::name("string"))
        );
        assert_eq!(
            record.fields["color"].ty,
            TypeExpr::optional(TypeExpr::name("Color"))
        );
        assert_eq!(record.fields["color"].default, Some(json!("RED")));

        let color = registry.get("Color").unwrap();
        assert!(color.is_enum());
        assert_eq!(registry.get("Pet").unwrap().module.as_deref(), Some("zoo.pets"));
    }

    #[test]
    fn test_union_and_map_expressions() {
        let expr: TypeExpr =
            serde_json::from_value(json!({ "union": ["integer", { "map": "Room" }] })).unwrap();
        assert_eq!(
            expr,
            TypeExpr::Union(vec![
                TypeExpr::name("integer"),
                TypeExpr::map(TypeExpr::name("Room")),
            ])
        );
    }

    #[test]
    fn test_default_roots_fall_back_to_all_types() {
        let registry =
            TypeRegistry::new(vec![TypeDef::record("A"), TypeDef::record("B")], vec![]).unwrap();
        assert_eq!(registry.default_roots(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = TypeRegistry::new(vec![TypeDef::record("A"), TypeDef::record("A")], vec![])
            .unwrap_err();
        assert!(matches!(err, PolymorphError::InvalidRegistry { ref type_name, .. } if type_name == "A"));
    }

    #[test]
    fn test_non_identifier_name_rejected() {
        let err = TypeRegistry::new(vec![TypeDef::record("not.valid")], vec![]).unwrap_err();
        assert!(matches!(err, PolymorphError::InvalidRegistry { .. }));
    }

    #[test]
    fn test_reserved_name_rejected() {
        let err = TypeRegistry::new(vec![TypeDef::record(UNIVERSAL_BASE_NAME)], vec![]).unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_undeclared_required_rejected() {
        let err = TypeRegistry::new(
            vec![TypeDef::record("A")
                .field("x", TypeExpr::name("string"))
                .required(["y"])],
            vec![],
        )
        .unwrap_err();
        assert!(err.to_string().contains("required field y"));
    }

    #[test]
    fn test_extends_cycle_rejected() {
        let err = TypeRegistry::new(
            vec![
                TypeDef::record("A").extends("B"),
                TypeDef::record("B").extends("C"),
                TypeDef::record("C").extends("A"),
            ],
            vec![],
        )
        .unwrap_err();
        assert!(err.to_string().contains("inheritance cycle"));
    }

    #[test]
    fn test_enum_ancestor_rejected() {
        let err = TypeRegistry::new(
            vec![
                TypeDef::enumeration("Color", ["RED"]),
                TypeDef::record("Paint").extends("Color"),
                TypeDef::record("Gloss").extends("Paint"),
            ],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, PolymorphError::InvalidRegistry { ref type_name, .. } if type_name == "Paint"));
        assert!(err.to_string().contains("ancestor Color is an enum"));
    }

    #[test]
    fn test_unregistered_parent_is_not_a_registry_error() {
        // Sentinels and missing parents are resolved later, during discovery.
        let registry = TypeRegistry::new(vec![TypeDef::record("A").extends("BaseModel")], vec![]);
        assert!(registry.is_ok());
    }

    #[test]
    fn test_registry_round_trip() {
        let registry = TypeRegistry::new(
            vec![
                TypeDef::record("A").field("x", TypeExpr::name("integer")),
                TypeDef::enumeration("E", ["ONE", "TWO"]),
            ],
            vec!["A".to_string()],
        )
        .unwrap();
        let json = serde_json::to_value(&registry).unwrap();
        assert_eq!(json["types"][0]["kind"], json!("record"));
        assert_eq!(json["types"][1]["values"], json!(["ONE", "TWO"]));
        let back: TypeRegistry = serde_json::from_value(json).unwrap();
        assert_eq!(back.get("A"), registry.get("A"));
    }

    #[test]
    fn test_from_json_reports_validation_errors() {
        let err = TypeRegistry::from_json(
            &json!({ "types": [
                { "name": "A", "kind": "record" },
                { "name": "A", "kind": "enum", "values": [] }
            ] })
            .to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, PolymorphError::InvalidRegistry { .. }));
    }

    #[test]
    fn test_invalid_json_reports_json_error() {
        let err = TypeRegistry::from_json("{ not json").unwrap_err();
        assert!(matches!(err, PolymorphError::JsonError(_)));
    }
}
