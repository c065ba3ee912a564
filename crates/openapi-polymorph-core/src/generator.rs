//! Structural schema generation.
//!
//! Produces the flat, inheritance-unaware schema of a single discovered type:
//! every inherited field and required name is present. Nested records and
//! enums are referenced by name through the ref template, never inlined. The
//! polymorphism compiler only ever sees this output.

use crate::error::PolymorphError;
use crate::passes::p0_discovery::{Field, FieldType, TypeDescriptor, TypeKind};
use crate::schema::{
    AdditionalProperties, EnumSchema, ObjectSchema, PropertySchema, SchemaMeta, SchemaNode,
};
use crate::schema_utils::{render_ref, title_case};

/// Produces the structural schema of one type.
pub trait StructuralGenerator {
    fn generate(&self, ty: &TypeDescriptor) -> Result<SchemaNode, PolymorphError>;
}

/// Generator driven by the resolved registry fields.
#[derive(Debug, Clone)]
pub struct RegistryGenerator {
    ref_template: String,
}

impl RegistryGenerator {
    pub fn new(ref_template: impl Into<String>) -> Self {
        Self {
            ref_template: ref_template.into(),
        }
    }

    fn type_schema(&self, ty: &FieldType) -> PropertySchema {
        match ty {
            FieldType::Primitive(primitive) => PropertySchema::typed(primitive.as_str()),
            FieldType::Reference(name) => {
                PropertySchema::reference(render_ref(&self.ref_template, name))
            }
            // Any value.
            FieldType::Opaque(_) => PropertySchema::default(),
            FieldType::Array(inner) => PropertySchema::array_of(self.type_schema(inner)),
            FieldType::Optional(inner) => {
                let schema = self.type_schema(inner);
                // `$ref` siblings are ignored; optionality lives in `required`.
                if schema.ref_path.is_some() {
                    schema
                } else {
                    PropertySchema {
                        nullable: Some(true),
                        ..schema
                    }
                }
            }
            FieldType::Union(variants) => PropertySchema::any_of(
                variants
                    .iter()
                    .map(|variant| self.type_schema(variant))
                    .collect(),
            ),
            FieldType::Map(inner) => PropertySchema {
                additional_properties: Some(AdditionalProperties::Schema(Box::new(
                    self.type_schema(inner),
                ))),
                ..PropertySchema::typed("object")
            },
        }
    }

    fn field_schema(&self, name: &str, field: &Field) -> PropertySchema {
        let schema = self.type_schema(&field.ty);
        let has_metadata =
            field.title.is_some() || field.description.is_some() || field.default.is_some();

        let mut schema = if schema.ref_path.is_some() {
            // `$ref` siblings are ignored by OpenAPI 3.0, so a reference that
            // carries metadata is wrapped in a single-entry `allOf`.
            if !has_metadata {
                return schema;
            }
            PropertySchema {
                all_of: Some(vec![schema]),
                ..PropertySchema::default()
            }
        } else {
            schema
        };

        schema.title = Some(field.title.clone().unwrap_or_else(|| title_case(name)));
        schema.description = field.description.clone();
        schema.default = field.default.clone();
        schema.read_only = field.read_only;
        if field.format.is_some() {
            schema.format = field.format.clone();
        }
        schema
    }
}

impl StructuralGenerator for RegistryGenerator {
    fn generate(&self, ty: &TypeDescriptor) -> Result<SchemaNode, PolymorphError> {
        let meta = SchemaMeta {
            title: Some(ty.title.clone().unwrap_or_else(|| ty.name.clone())),
            description: ty.description.clone(),
            extensions: ty.extensions.clone(),
        };

        let node = match &ty.kind {
            TypeKind::Record {
                fields,
                required,
                additional_properties,
            } => SchemaNode::Object(ObjectSchema {
                meta,
                properties: fields
                    .iter()
                    .map(|(name, field)| (name.clone(), self.field_schema(name, field)))
                    .collect(),
                required: required.clone(),
                additional_properties: additional_properties.clone(),
            }),
            TypeKind::Enum {
                schema_type,
                values,
            } => SchemaNode::Enum(EnumSchema {
                meta,
                schema_type: schema_type.clone(),
                values: values.clone(),
            }),
        };
        Ok(node)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
