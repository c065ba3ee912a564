//! Schema document model.
//!
//! A [`SchemaDocument`] maps type names to [`SchemaNode`]s. Each node is one of
//! three explicit shapes (plain object, `allOf` composition, enum) so passes
//! match on the variant instead of probing for `properties` / `allOf` / `enum`
//! keys. Serialization renders the OpenAPI 3 JSON form.

use indexmap::{IndexMap, IndexSet};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema_utils::render_ref;

/// Fixed name of the synthetic ancestor-of-last-resort.
pub const UNIVERSAL_BASE_NAME: &str = "_OpenAPIGenBaseModel";
/// Property used both as the identity field and the discriminator.
pub const IDENTITY_FIELD: &str = "type";
/// Default value of the universal base's identity field.
pub const INVALID_TYPE: &str = "InvalidType";

/// Type name → schema, in insertion order.
pub type SchemaDocument = IndexMap<String, SchemaNode>;

/// A single entry of a [`SchemaDocument`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SchemaNode {
    Object(ObjectSchema),
    Composition(CompositionSchema),
    Enum(EnumSchema),
}

impl SchemaNode {
    /// The object holding this node's own properties: the extension of a
    /// composition, the node itself for a plain object, nothing for an enum.
    pub fn local_object(&self) -> Option<&ObjectSchema> {
        match self {
            SchemaNode::Object(obj) => Some(obj),
            SchemaNode::Composition(comp) => Some(&comp.extension),
            SchemaNode::Enum(_) => None,
        }
    }

    pub fn local_object_mut(&mut self) -> Option<&mut ObjectSchema> {
        match self {
            SchemaNode::Object(obj) => Some(obj),
            SchemaNode::Composition(comp) => Some(&mut comp.extension),
            SchemaNode::Enum(_) => None,
        }
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, SchemaNode::Enum(_))
    }
}

/// Title, description and vendor extensions shared by every node shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Remaining top-level keys, typically `x-*` vendor extensions.
    pub extensions: IndexMap<String, Value>,
}

impl SchemaMeta {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.extensions.is_empty()
    }

    fn write_head<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        if let Some(title) = &self.title {
            map.serialize_entry("title", title)?;
        }
        if let Some(description) = &self.description {
            map.serialize_entry("description", description)?;
        }
        Ok(())
    }

    fn write_extensions<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        for (key, value) in &self.extensions {
            map.serialize_entry(key, value)?;
        }
        Ok(())
    }
}

/// `{ type: object, properties, required, additionalProperties }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    pub meta: SchemaMeta,
    pub properties: IndexMap<String, PropertySchema>,
    pub required: IndexSet<String>,
    pub additional_properties: Option<AdditionalProperties>,
}

impl ObjectSchema {
    pub fn new(meta: SchemaMeta) -> Self {
        Self {
            meta,
            ..Self::default()
        }
    }
}

impl Serialize for ObjectSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.meta.write_head(&mut map)?;
        map.serialize_entry("type", "object")?;
        map.serialize_entry("properties", &self.properties)?;
        // An empty required list is omitted, never written as `[]`.
        if !self.required.is_empty() {
            map.serialize_entry("required", &self.required)?;
        }
        if let Some(additional) = &self.additional_properties {
            map.serialize_entry("additionalProperties", additional)?;
        }
        self.meta.write_extensions(&mut map)?;
        map.end()
    }
}

/// "isA `base`, plus `extension` fields", rendered as a two-element `allOf`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionSchema {
    pub meta: SchemaMeta,
    /// Name of the referenced ancestor entry.
    pub base: String,
    /// Rendered `$ref` to `base`.
    pub base_ref: String,
    pub extension: ObjectSchema,
    pub discriminator: Option<Discriminator>,
}

impl CompositionSchema {
    pub fn new(base: &str, ref_template: &str, extension: ObjectSchema, meta: SchemaMeta) -> Self {
        Self {
            meta,
            base: base.to_string(),
            base_ref: render_ref(ref_template, base),
            extension,
            discriminator: None,
        }
    }
}

impl Serialize for CompositionSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(untagged)]
        enum Part<'a> {
            Ref {
                #[serde(rename = "$ref")]
                ref_path: &'a str,
            },
            Extension(&'a ObjectSchema),
        }

        let mut map = serializer.serialize_map(None)?;
        self.meta.write_head(&mut map)?;
        map.serialize_entry(
            "allOf",
            &[
                Part::Ref {
                    ref_path: &self.base_ref,
                },
                Part::Extension(&self.extension),
            ],
        )?;
        if let Some(discriminator) = &self.discriminator {
            map.serialize_entry("discriminator", discriminator)?;
        }
        self.meta.write_extensions(&mut map)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    pub property_name: String,
}

/// `{ enum: [...], type }`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub meta: SchemaMeta,
    pub schema_type: String,
    pub values: Vec<Value>,
}

impl Serialize for EnumSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.meta.write_head(&mut map)?;
        map.serialize_entry("enum", &self.values)?;
        map.serialize_entry("type", &self.schema_type)?;
        self.meta.write_extensions(&mut map)?;
        map.end()
    }
}

/// Schema of a single property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySchema {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<PropertySchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<PropertySchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl PropertySchema {
    /// A schema with only `type` set.
    pub fn typed(schema_type: impl Into<String>) -> Self {
        Self {
            schema_type: Some(schema_type.into()),
            ..Self::default()
        }
    }

    /// A bare `$ref`.
    pub fn reference(ref_path: impl Into<String>) -> Self {
        Self {
            ref_path: Some(ref_path.into()),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// `{ type: array, items }`.
    pub fn array_of(items: PropertySchema) -> Self {
        Self {
            schema_type: Some("array".to_string()),
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    /// `{ anyOf: variants }`.
    pub fn any_of(variants: Vec<PropertySchema>) -> Self {
        Self {
            any_of: Some(variants),
            ..Self::default()
        }
    }

    /// True for untyped schemas built from `anyOf` / `allOf`.
    pub fn is_composite(&self) -> bool {
        self.schema_type.is_none() && (self.any_of.is_some() || self.all_of.is_some())
    }
}

/// `additionalProperties`: either a flag or a value schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<PropertySchema>),
}

/// The synthetic base every record ultimately composes over.
pub fn universal_base_schema() -> ObjectSchema {
    let mut schema = ObjectSchema::new(SchemaMeta::titled(UNIVERSAL_BASE_NAME));
    schema.properties.insert(
        IDENTITY_FIELD.to_string(),
        PropertySchema {
            title: Some("Type".to_string()),
            description: Some(
                "A base class to use when there is no baseclass available to fall on."
                    .to_string(),
            ),
            schema_type: Some("string".to_string()),
            default: Some(Value::String(INVALID_TYPE.to_string())),
            ..PropertySchema::default()
        },
    );
    schema
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
    fn test_object_schema_serialization() {
        let mut obj = ObjectSchema::new(SchemaMeta::titled("Pet"));
        obj.properties
            .insert("name".to_string(), PropertySchema::typed("string"));
        obj.required.insert("name".to_string());
        obj.meta
            .extensions
            .insert("x-internal".to_string(), json!(true));

        assert_eq!(
            serde_json::to_value(&obj).unwrap(),
            json!({
                "title": "Pet",
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"],
                "x-internal": true
            })
        );
    }

    #[test]
    fn test_empty_required_is_omitted() {
        let obj = ObjectSchema::default();
        let value = serde_json::to_value(&obj).unwrap();
        assert!(value.get("required").is_none());
        assert_eq!(value["properties"], json!({}));
    }

    #[test]
    fn test_composition_serialization() {
        let mut extension = ObjectSchema::default();
        extension
            .properties
            .insert("bark".to_string(), PropertySchema::typed("boolean"));
        let mut comp = CompositionSchema::new(
            "Pet",
            "#/components/schemas/{name}",
            extension,
            SchemaMeta::titled("Dog"),
        );
        comp.discriminator = Some(Discriminator {
            property_name: "type".to_string(),
        });

        assert_eq!(
            serde_json::to_value(&SchemaNode::Composition(comp)).unwrap(),
            json!({
                "title": "Dog",
                "allOf": [
                    { "$ref": "#/components/schemas/Pet" },
                    { "type": "object", "properties": { "bark": { "type": "boolean" } } }
                ],
                "discriminator": { "propertyName": "type" }
            })
        );
    }

    #[test]
    fn test_enum_serialization() {
        let node = SchemaNode::Enum(EnumSchema {
            meta: SchemaMeta::titled("Color"),
            schema_type: "string".to_string(),
            values: vec![json!("RED"), json!("GREEN")],
        });
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({ "title": "Color", "enum": ["RED", "GREEN"], "type": "string" })
        );
    }

    #[test]
    fn test_property_schema_keeps_vendor_keys() {
        let prop: PropertySchema = serde_json::from_value(json!({
            "type": "integer",
            "readOnly": true,
            "x-unit": "ms"
        }))
        .unwrap();
        assert_eq!(prop.schema_type.as_deref(), Some("integer"));
        assert_eq!(prop.read_only, Some(true));
        assert_eq!(prop.extensions["x-unit"], json!("ms"));
        assert_eq!(
            serde_json::to_value(&prop).unwrap(),
            json!({ "type": "integer", "readOnly": true, "x-unit": "ms" })
        );
    }

    #[test]
    fn test_universal_base_shape() {
        let base = universal_base_schema();
        let identity = &base.properties[IDENTITY_FIELD];
        assert_eq!(identity.schema_type.as_deref(), Some("string"));
        assert_eq!(identity.default, Some(json!(INVALID_TYPE)));
        assert!(base.required.is_empty());
    }

    #[test]
    fn test_local_object_per_variant() {
        let obj = SchemaNode::Object(ObjectSchema::default());
        assert!(obj.local_object().is_some());
        let en = SchemaNode::Enum(EnumSchema {
            meta: SchemaMeta::default(),
            schema_type: "string".to_string(),
            values: vec![],
        });
        assert!(en.local_object().is_none());
        assert!(en.is_enum());
    }
}
