//! Pass 3: Normalization (identity field, discriminator, formats, ordering, tags)
//!
//! Runs over every non-enum entry of the compiled document and edits the
//! object holding the entry's own properties: the extension of a composition,
//! the entry itself otherwise.
//!
//! - **Identity field**: an existing `type` property is marked `readOnly`;
//!   a missing one is synthesized as a read-only string pinned to the type name.
//! - **Discriminator**: compositions get `discriminator.propertyName = "type"`.
//! - **Default formats**: `number` → `double`, `integer` → `int32`, recursing
//!   into array items and `anyOf` branches. `$ref` schemas are left alone.
//! - **Ordering**: required properties first, each group in declared order.
//!
//! Tags are derived from the entry names and sorted by name.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::NormalizeOptions;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::schema::{
    Discriminator, ObjectSchema, PropertySchema, SchemaDocument, SchemaNode, IDENTITY_FIELD,
    UNIVERSAL_BASE_NAME,
};
use crate::schema_utils::walk_property_mut;

/// Output of [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDocument {
    pub schemas: SchemaDocument,
    pub tags: Vec<Tag>,
    /// Tag names in the same order as `tags`.
    pub tag_names: Vec<String>,
}

/// Display tag for one schema entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(rename = "x-displayName")]
    pub display_name: String,
    pub description: String,
}

impl Tag {
    pub fn for_type(name: &str) -> Self {
        Self {
            name: format!("{}_model", name.to_lowercase()),
            display_name: name.to_string(),
            description: format!("<SchemaDefinition schemaRef=\"#/components/schemas/{name}\" />\n"),
        }
    }
}

/// Normalize every entry of `doc` in place and derive its tags.
pub fn normalize(
    mut doc: SchemaDocument,
    options: &NormalizeOptions,
    sink: &mut dyn DiagnosticSink,
) -> NormalizedDocument {
    for (name, node) in doc.iter_mut() {
        if options.add_discriminator {
            if let SchemaNode::Composition(comp) = &mut *node {
                comp.discriminator = Some(Discriminator {
                    property_name: IDENTITY_FIELD.to_string(),
                });
            }
        }

        let Some(local) = node.local_object_mut() else {
            continue;
        };
        if options.add_identity_field {
            apply_identity_field(name, local, sink);
        }
        if options.add_default_formats {
            for prop in local.properties.values_mut() {
                apply_default_formats(prop);
            }
        }
        order_required_first(local);
    }

    let tags = build_tags(&doc, options.tag_enums);
    let tag_names = tags.iter().map(|tag| tag.name.clone()).collect();
    tracing::debug!(entries = doc.len(), tags = tags.len(), "normalized schema document");

    NormalizedDocument {
        schemas: doc,
        tags,
        tag_names,
    }
}

// ---------------------------------------------------------------------------
// Identity field
// ---------------------------------------------------------------------------

/// `{title: "Type", default: name, type: string, pattern: "^name$", readOnly: true}`.
fn identity_property(type_name: &str) -> PropertySchema {
    PropertySchema {
        title: Some("Type".to_string()),
        default: Some(Value::String(type_name.to_string())),
        schema_type: Some("string".to_string()),
        pattern: Some(format!("^{type_name}$")),
        read_only: Some(true),
        ..PropertySchema::default()
    }
}

fn apply_identity_field(type_name: &str, local: &mut ObjectSchema, sink: &mut dyn DiagnosticSink) {
    match local.properties.get_mut(IDENTITY_FIELD) {
        Some(existing) => {
            existing.read_only = Some(true);
            let expected = Value::String(type_name.to_string());
            // The universal base defaults to a placeholder on purpose.
            if type_name != UNIVERSAL_BASE_NAME && existing.default.as_ref() != Some(&expected) {
                sink.report(Diagnostic::IdentityDefaultMismatch {
                    type_name: type_name.to_string(),
                    found: existing.default.clone(),
                });
            }
        }
        None => {
            local
                .properties
                .insert(IDENTITY_FIELD.to_string(), identity_property(type_name));
        }
    }
}

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

fn apply_default_formats(prop: &mut PropertySchema) {
    walk_property_mut(prop, &mut |node| {
        if node.ref_path.is_some() || node.format.is_some() {
            return;
        }
        node.format = match node.schema_type.as_deref() {
            Some("number") => Some("double".to_string()),
            Some("integer") => Some("int32".to_string()),
            _ => None,
        };
    });
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Stable partition of the properties: required, then optional.
fn order_required_first(local: &mut ObjectSchema) {
    if local.required.is_empty() {
        return;
    }
    let required = &local.required;
    let (mut ordered, optional): (Vec<_>, Vec<_>) = std::mem::take(&mut local.properties)
        .into_iter()
        .partition(|(name, _)| required.contains(name));
    ordered.extend(optional);
    local.properties = ordered.into_iter().collect();
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

fn build_tags(doc: &SchemaDocument, tag_enums: bool) -> Vec<Tag> {
    let mut names: Vec<&str> = doc
        .iter()
        .filter(|(_, node)| tag_enums || !node.is_enum())
        .map(|(name, _)| name.as_str())
        .collect();
    names.sort_unstable();
    names.into_iter().map(Tag::for_type).collect()
}

// ===========================================================================
// Tests
// ===========================================================================
