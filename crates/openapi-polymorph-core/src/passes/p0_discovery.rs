//! Pass 0: Type Graph Discovery
//!
//! Walks the registry from a set of roots and produces the closure of every
//! reachable record and enum, then extends it with each record's ancestor
//! chain. Field types are resolved here once: bare names become primitives,
//! references to registered types, or opaque leaves. Ancestor chains are
//! precomputed nearest-first and truncated at the configured sentinel names,
//! so later passes never re-derive them.
//!
//! Records come out flat: each one carries every field and required name of
//! its ancestor chain, followed by its own declarations. The identity field
//! is the exception. Every type owns its own and never inherits it.

use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::config::GenerateOptions;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::PolymorphError;
use crate::registry::{FieldDef, TypeBody, TypeDef, TypeExpr, TypeRegistry};
use crate::schema::{AdditionalProperties, IDENTITY_FIELD};

// ---------------------------------------------------------------------------
// Resolved type model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Integer,
    Number,
    Boolean,
}

impl Primitive {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" | "str" => Some(Primitive::String),
            "integer" | "int" => Some(Primitive::Integer),
            "number" | "float" => Some(Primitive::Number),
            "boolean" | "bool" => Some(Primitive::Boolean),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Integer => "integer",
            Primitive::Number => "number",
            Primitive::Boolean => "boolean",
        }
    }
}

/// A field type with every name resolved against the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Primitive(Primitive),
    /// A registered record or enum.
    Reference(String),
    /// A name that is neither primitive nor registered; accepts any value.
    Opaque(String),
    Array(Box<FieldType>),
    Optional(Box<FieldType>),
    Union(Vec<FieldType>),
    Map(Box<FieldType>),
}

impl FieldType {
    /// Registered names reachable through this type, in declaration order.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            FieldType::Reference(name) => out.push(name),
            FieldType::Array(inner) | FieldType::Optional(inner) | FieldType::Map(inner) => {
                inner.collect_references(out)
            }
            FieldType::Union(variants) => {
                for variant in variants {
                    variant.collect_references(out);
                }
            }
            FieldType::Primitive(_) | FieldType::Opaque(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub ty: FieldType,
    pub default: Option<Value>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub read_only: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Record {
        fields: IndexMap<String, Field>,
        required: IndexSet<String>,
        additional_properties: Option<AdditionalProperties>,
    },
    Enum {
        schema_type: String,
        values: Vec<Value>,
    },
}

/// A discovered type. Immutable once discovery finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
    /// Ancestor names, nearest first, excluding sentinels.
    pub ancestors: Vec<String>,
    pub module: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub extensions: IndexMap<String, Value>,
}

impl TypeDescriptor {
    pub fn is_enum(&self) -> bool {
        matches!(self.kind, TypeKind::Enum { .. })
    }
}

/// Every discovered type, keyed by name, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeGraph {
    types: IndexMap<String, TypeDescriptor>,
}

impl TypeGraph {
    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Ancestor names that end a chain.
    pub sentinels: BTreeSet<String>,
    /// Keep enums in the resulting graph.
    pub include_enums: bool,
}

impl From<&GenerateOptions> for DiscoveryOptions {
    fn from(options: &GenerateOptions) -> Self {
        Self {
            sentinels: options.sentinels.clone(),
            include_enums: true,
        }
    }
}

/// Discover the full type graph reachable from `roots`.
///
/// Unknown roots are reported and skipped. Fails with
/// [`PolymorphError::EmptyGraph`] when nothing remains.
pub fn discover(
    registry: &TypeRegistry,
    roots: &[String],
    options: &DiscoveryOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<TypeGraph, PolymorphError> {
    for root in roots {
        if registry.get(root).is_none() {
            sink.report(Diagnostic::UnknownRoot { name: root.clone() });
        }
    }

    let mut types: IndexMap<String, TypeDescriptor> = IndexMap::new();
    let mut stack: Vec<String> = roots.iter().rev().cloned().collect();

    loop {
        // --- 1. Closure over field references ---
        while let Some(name) = stack.pop() {
            if types.contains_key(&name) {
                continue;
            }
            let Some(def) = registry.get(&name) else {
                continue;
            };
            let descriptor = describe(def, registry, &options.sentinels, sink);
            if let TypeKind::Record { fields, .. } = &descriptor.kind {
                let mut nested: Vec<String> = fields
                    .values()
                    .flat_map(|field| field.ty.references())
                    .filter(|referenced| !types.contains_key(*referenced))
                    .map(str::to_string)
                    .collect();
                nested.reverse();
                stack.extend(nested);
            }
            tracing::debug!(type_name = %name, "discovered type");
            types.insert(name, descriptor);
        }

        // --- 2. Ancestors not reached through fields ---
        // Ancestors bring their own references, so the closure runs again.
        let mut pending: IndexSet<String> = IndexSet::new();
        for descriptor in types.values() {
            for ancestor in &descriptor.ancestors {
                if !types.contains_key(ancestor) && registry.get(ancestor).is_some() {
                    pending.insert(ancestor.clone());
                }
            }
        }
        if pending.is_empty() {
            break;
        }
        stack.extend(pending.into_iter().rev());
    }

    // --- 3. Inherited fields ---
    inherit_fields(&mut types);

    if !options.include_enums {
        types.retain(|_, descriptor| !descriptor.is_enum());
    }
    if types.is_empty() {
        return Err(PolymorphError::EmptyGraph);
    }
    Ok(TypeGraph { types })
}

// ---------------------------------------------------------------------------
// Resolution helpers
// ---------------------------------------------------------------------------

fn describe(
    def: &TypeDef,
    registry: &TypeRegistry,
    sentinels: &BTreeSet<String>,
    sink: &mut dyn DiagnosticSink,
) -> TypeDescriptor {
    let kind = match &def.body {
        TypeBody::Record(record) => TypeKind::Record {
            fields: record
                .fields
                .iter()
                .map(|(field_name, field)| {
                    let resolved = resolve_field(&def.name, field_name, field, registry, sink);
                    (field_name.clone(), resolved)
                })
                .collect(),
            required: record.required.iter().cloned().collect(),
            additional_properties: record.additional_properties.clone(),
        },
        TypeBody::Enum(en) => TypeKind::Enum {
            schema_type: en.schema_type.clone(),
            values: en.values.clone(),
        },
    };

    TypeDescriptor {
        name: def.name.clone(),
        kind,
        ancestors: ancestor_chain(def, registry, sentinels),
        module: def.module.clone(),
        title: def.title.clone(),
        description: def.description.clone(),
        extensions: def.extensions.clone(),
    }
}

/// Merge each record's ancestor fields into it, farthest ancestor first.
///
/// A redeclared field keeps its inherited position and takes the nearer
/// declaration. Required names are unioned. Reads only the declared fields,
/// so the order records are visited in does not matter.
fn inherit_fields(types: &mut IndexMap<String, TypeDescriptor>) {
    let merged: Vec<(usize, IndexMap<String, Field>, IndexSet<String>)> = types
        .values()
        .enumerate()
        .filter_map(|(index, descriptor)| {
            let TypeKind::Record {
                fields, required, ..
            } = &descriptor.kind
            else {
                return None;
            };
            if descriptor.ancestors.is_empty() {
                return None;
            }

            let mut all_fields = IndexMap::new();
            let mut all_required = IndexSet::new();
            for ancestor in descriptor.ancestors.iter().rev() {
                // Missing ancestors are reported by compilation.
                let Some(TypeKind::Record {
                    fields: upstream,
                    required: upstream_required,
                    ..
                }) = types.get(ancestor).map(|a| &a.kind)
                else {
                    continue;
                };
                for (name, field) in upstream {
                    if name != IDENTITY_FIELD {
                        all_fields.insert(name.clone(), field.clone());
                    }
                }
                all_required.extend(
                    upstream_required
                        .iter()
                        .filter(|name| *name != IDENTITY_FIELD)
                        .cloned(),
                );
            }
            for (name, field) in fields {
                all_fields.insert(name.clone(), field.clone());
            }
            all_required.extend(required.iter().cloned());
            Some((index, all_fields, all_required))
        })
        .collect();

    for (index, all_fields, all_required) in merged {
        if let Some((_, descriptor)) = types.get_index_mut(index) {
            if let TypeKind::Record {
                fields, required, ..
            } = &mut descriptor.kind
            {
                *fields = all_fields;
                *required = all_required;
            }
        }
    }
}

/// Parent names nearest-first, stopping at the first sentinel.
///
/// A parent that is neither registered nor a sentinel is kept as the last
/// link so compilation can report it as missing.
fn ancestor_chain(def: &TypeDef, registry: &TypeRegistry, sentinels: &BTreeSet<String>) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = def.parent();
    while let Some(parent) = current {
        if sentinels.contains(parent) {
            break;
        }
        chain.push(parent.to_string());
        current = registry.get(parent).and_then(TypeDef::parent);
    }
    chain
}

fn resolve_field(
    type_name: &str,
    field_name: &str,
    field: &FieldDef,
    registry: &TypeRegistry,
    sink: &mut dyn DiagnosticSink,
) -> Field {
    let mut resolve_name = |name: &str| {
        if let Some(primitive) = Primitive::from_name(name) {
            FieldType::Primitive(primitive)
        } else if registry.get(name).is_some() {
            FieldType::Reference(name.to_string())
        } else {
            sink.report(Diagnostic::OpaqueType {
                type_name: type_name.to_string(),
                field: field_name.to_string(),
                referenced: name.to_string(),
            });
            FieldType::Opaque(name.to_string())
        }
    };

    Field {
        ty: resolve_expr(&field.ty, &mut resolve_name),
        default: field.default.clone(),
        title: field.title.clone(),
        description: field.description.clone(),
        format: field.format.clone(),
        read_only: field.read_only,
    }
}

fn resolve_expr<F>(expr: &TypeExpr, resolve_name: &mut F) -> FieldType
where
    F: FnMut(&str) -> FieldType,
{
    match expr {
        TypeExpr::Name(name) => resolve_name(name),
        TypeExpr::Array(inner) => FieldType::Array(Box::new(resolve_expr(inner, resolve_name))),
        TypeExpr::Optional(inner) => {
            FieldType::Optional(Box::new(resolve_expr(inner, resolve_name)))
        }
        TypeExpr::Map(inner) => FieldType::Map(Box::new(resolve_expr(inner, resolve_name))),
        TypeExpr::Union(variants) => FieldType::Union(
            variants
                .iter()
                .map(|variant| resolve_expr(variant, resolve_name))
                .collect(),
        ),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
