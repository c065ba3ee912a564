//! Pass 2: Polymorphism Compilation (flat object → `allOf` composition)
//!
//! Rewrites every record as `allOf: [{$ref: <ancestor>}, <extension>]`.
//! OpenAPI composition is an overlay, not an additive merge, so the extension
//! must only hold what the ancestor does not already declare:
//!
//! - fields inherited with the same shape are elided;
//! - required names already required upstream are elided;
//! - the identity field (`type`) is always kept so it overrides the inherited one.
//!
//! Input schemas are flat: a record carries every inherited field. Whatever
//! is not elided against the chosen base therefore stays in the extension,
//! including fields of ancestors skipped by widening.
//!
//! A field redeclared with a different shape cannot be expressed as an overlay
//! of the nearest ancestor. The record is then bound one ancestor further up,
//! and finally to the universal base schema. Each attempt is computed from
//! scratch from the flat input document, so failed attempts leave nothing
//! behind. Binding to the universal base always succeeds, which bounds the
//! number of attempts by the chain length plus one.
//!
//! Root records compose over the universal base with nothing elided. Enums
//! and the universal base itself pass through unchanged.

use std::collections::{HashMap, HashSet};

use crate::config::GenerateOptions;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::PolymorphError;
use crate::passes::p0_discovery::TypeGraph;
use crate::schema::{
    CompositionSchema, ObjectSchema, PropertySchema, SchemaDocument, SchemaNode, IDENTITY_FIELD,
    UNIVERSAL_BASE_NAME,
};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compile every record of `doc` into a composition over its ancestors.
///
/// `doc` must be the flat output of assembly; ancestors are read from it, not
/// from the document being built. Skipped entirely when
/// `config.enable_inheritance` is false.
pub fn compile_polymorphism(
    doc: &SchemaDocument,
    graph: &TypeGraph,
    config: &GenerateOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<SchemaDocument, PolymorphError> {
    if !config.enable_inheritance {
        return Ok(doc.clone());
    }

    let mut compiled = SchemaDocument::with_capacity(doc.len());
    for (name, node) in doc {
        if name == UNIVERSAL_BASE_NAME {
            compiled.insert(name.clone(), node.clone());
            continue;
        }
        let Some(descriptor) = graph.get(name) else {
            sink.report(Diagnostic::UnmappedSchemaEntry { name: name.clone() });
            compiled.insert(name.clone(), node.clone());
            continue;
        };

        let updated = match node {
            SchemaNode::Object(own) => SchemaNode::Composition(compose(
                name,
                own,
                &descriptor.ancestors,
                doc,
                &config.ref_template,
                sink,
            )?),
            SchemaNode::Composition(_) | SchemaNode::Enum(_) => node.clone(),
        };
        compiled.insert(name.clone(), updated);
    }
    Ok(compiled)
}

// ---------------------------------------------------------------------------
// Shape signatures
// ---------------------------------------------------------------------------

/// Conflict-comparison key of a property.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ShapeSignature<'a> {
    /// Any typed, non-array schema: compared by type name only.
    Typed(&'a str),
    /// Arrays compare their whole item schema.
    Array(Option<&'a PropertySchema>),
    /// No `type`: a reference or a composite.
    Untyped,
}

impl<'a> ShapeSignature<'a> {
    fn of(prop: &'a PropertySchema) -> Self {
        match prop.schema_type.as_deref() {
            Some("array") => ShapeSignature::Array(prop.items.as_deref()),
            Some(schema_type) => ShapeSignature::Typed(schema_type),
            None => ShapeSignature::Untyped,
        }
    }
}

/// Whether redeclaring `local` over `inherited` breaks the overlay.
///
/// Typed fields conflict when their signature differs. Untyped composites
/// (`anyOf` / `allOf`) cannot be compared by signature and conflict unless
/// the inherited declaration is identical. A bare `$ref` is treated as the
/// inherited declaration.
fn conflicts(local: &PropertySchema, inherited: &PropertySchema) -> bool {
    if local.schema_type.is_some() {
        ShapeSignature::of(local) != ShapeSignature::of(inherited)
    } else if local.is_composite() {
        local != inherited
    } else {
        false
    }
}

// ---------------------------------------------------------------------------
// Inherited declarations
// ---------------------------------------------------------------------------

/// Union of what every ancestor in a chain declares.
#[derive(Debug, Default)]
struct Inherited<'a> {
    required: HashSet<&'a str>,
    declarations: HashMap<&'a str, &'a PropertySchema>,
}

impl<'a> Inherited<'a> {
    fn collect(
        type_name: &str,
        chain: &[String],
        doc: &'a SchemaDocument,
    ) -> Result<Self, PolymorphError> {
        let mut inherited = Inherited::default();
        for ancestor in chain {
            let schema = match doc.get(ancestor) {
                Some(SchemaNode::Object(schema)) => schema,
                Some(_) => {
                    return Err(PolymorphError::AncestorNotObject {
                        type_name: type_name.to_string(),
                        ancestor: ancestor.clone(),
                    })
                }
                None => {
                    return Err(PolymorphError::MissingAncestor {
                        type_name: type_name.to_string(),
                        ancestor: ancestor.clone(),
                    })
                }
            };
            inherited
                .required
                .extend(schema.required.iter().map(String::as_str));
            // The nearest declaration of a name is the one the base exposes.
            for (field, prop) in &schema.properties {
                inherited.declarations.entry(field.as_str()).or_insert(prop);
            }
        }
        Ok(inherited)
    }
}

// ---------------------------------------------------------------------------
// Attempts
// ---------------------------------------------------------------------------

/// Outcome of building an extension against one binding.
enum Attempt {
    Resolved(ObjectSchema),
    Conflict { field: String },
}

/// What a record is being composed over in a single attempt.
#[derive(Debug, Clone, Copy)]
struct Binding<'c> {
    /// Entry referenced by `$ref`.
    base: &'c str,
    /// Ancestors whose declarations are elided from the extension.
    inherited_from: &'c [String],
    /// Last attempt: conflicts keep the local declaration instead of widening.
    last: bool,
}

impl<'c> Binding<'c> {
    /// Drop the nearest ancestor. With one ancestor left, bind to the
    /// universal base instead. The last binding is a fixed point.
    fn widen(self, universal: &'c [String]) -> Self {
        if self.last {
            return self;
        }
        match self.inherited_from {
            [_, rest @ ..] if !rest.is_empty() => Binding {
                base: &rest[0],
                inherited_from: rest,
                last: false,
            },
            _ => Binding {
                base: UNIVERSAL_BASE_NAME,
                inherited_from: universal,
                last: true,
            },
        }
    }
}

/// Build the extension of `own` against `inherited`. Pure: reads only its
/// arguments and returns a fresh object.
fn extend(own: &ObjectSchema, inherited: &Inherited<'_>, keep_conflicts: bool) -> Attempt {
    let mut extension = ObjectSchema::default();

    for (name, prop) in &own.properties {
        match inherited.declarations.get(name.as_str()) {
            None => {
                extension.properties.insert(name.clone(), prop.clone());
            }
            Some(upstream) if !conflicts(prop, upstream) => {}
            Some(_) if keep_conflicts => {
                extension.properties.insert(name.clone(), prop.clone());
            }
            Some(_) => return Attempt::Conflict { field: name.clone() },
        }
    }

    // The identity field always overrides whatever is inherited.
    if let Some(identity) = own.properties.get(IDENTITY_FIELD) {
        extension
            .properties
            .insert(IDENTITY_FIELD.to_string(), identity.clone());
    }

    extension.required = own
        .required
        .iter()
        .filter(|name| !inherited.required.contains(name.as_str()))
        .cloned()
        .collect();
    extension.additional_properties = own.additional_properties.clone();

    Attempt::Resolved(extension)
}

/// Compose one record, widening the binding on every conflict.
fn compose(
    name: &str,
    own: &ObjectSchema,
    ancestors: &[String],
    doc: &SchemaDocument,
    ref_template: &str,
    sink: &mut dyn DiagnosticSink,
) -> Result<CompositionSchema, PolymorphError> {
    let universal = [UNIVERSAL_BASE_NAME.to_string()];
    let mut binding = match ancestors.first() {
        Some(nearest) => Binding {
            base: nearest,
            inherited_from: ancestors,
            last: false,
        },
        None => Binding {
            base: UNIVERSAL_BASE_NAME,
            inherited_from: &[],
            last: true,
        },
    };

    loop {
        let inherited = Inherited::collect(name, binding.inherited_from, doc)?;
        match extend(own, &inherited, binding.last) {
            Attempt::Resolved(extension) => {
                tracing::debug!(type_name = name, base = binding.base, "composed");
                return Ok(CompositionSchema::new(
                    binding.base,
                    ref_template,
                    extension,
                    own.meta.clone(),
                ));
            }
            Attempt::Conflict { field } => {
                sink.report(Diagnostic::FieldConflict {
                    type_name: name.to_string(),
                    field,
                    against: binding.base.to_string(),
                });
                // `extend` never reports a conflict on the last attempt.
                let next = binding.widen(&universal);
                if next.last {
                    sink.report(Diagnostic::UniversalFallback {
                        type_name: name.to_string(),
                    });
                }
                binding = next;
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
