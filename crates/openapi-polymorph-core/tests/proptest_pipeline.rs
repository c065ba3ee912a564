//! Property-based tests over randomly generated single-inheritance registries.
//!
//! Each registry is a forest of records `T0..Tn` where every record may extend
//! an earlier one, drawing its fields from a small shared pool of names so
//! that redeclarations (matching and conflicting) are common.

use std::collections::HashSet;

use openapi_polymorph_core::config::NormalizeOptions;
use openapi_polymorph_core::passes::p0_discovery::{discover, DiscoveryOptions};
use openapi_polymorph_core::passes::p3_normalize::normalize;
use openapi_polymorph_core::registry::TypeBody;
use openapi_polymorph_core::{
    generate, GenerateOptions, SchemaDocument, SchemaNode, TypeDef, TypeExpr, TypeRegistry,
    UNIVERSAL_BASE_NAME,
};
use proptest::prelude::*;
use proptest::sample::Index;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

const FIELD_NAMES: &[&str] = &["a", "b", "c", "count", "type"];
const LEAVES: &[&str] = &["string", "integer", "number", "boolean"];

/// Field type: a primitive leaf or an array of one.
fn arb_type_expr() -> impl Strategy<Value = TypeExpr> {
    let leaf = proptest::sample::select(LEAVES).prop_map(TypeExpr::name);
    prop_oneof![
        4 => leaf.clone(),
        1 => leaf.prop_map(TypeExpr::array),
    ]
}

type FieldSpec = (usize, TypeExpr, bool);

/// (parent pick, has parent, fields as (name index, type, required)).
fn arb_record() -> impl Strategy<Value = (Index, bool, Vec<FieldSpec>)> {
    (
        any::<Index>(),
        any::<bool>(),
        proptest::collection::vec((0..FIELD_NAMES.len(), arb_type_expr(), any::<bool>()), 0..5),
    )
}

fn arb_registry() -> impl Strategy<Value = TypeRegistry> {
    proptest::collection::vec(arb_record(), 1..7).prop_map(|records| {
        let types = records
            .into_iter()
            .enumerate()
            .map(|(i, (parent, has_parent, fields))| {
                let mut def = TypeDef::record(format!("T{i}"));
                if has_parent && i > 0 {
                    def = def.extends(format!("T{}", parent.index(i)));
                }
                let mut required = Vec::new();
                for (name_idx, ty, is_required) in fields {
                    let name = FIELD_NAMES[name_idx];
                    def = def.field(name, ty);
                    if is_required && !required.contains(&name) {
                        required.push(name);
                    }
                }
                def.required(required)
            })
            .collect::<Vec<_>>();
        TypeRegistry::new(types, vec![]).expect("generated registry should be valid")
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `name` followed by its registered ancestors.
fn lineage<'r>(registry: &'r TypeRegistry, name: &'r str) -> Vec<&'r str> {
    let mut chain = vec![name];
    let mut current = registry.get(name).and_then(TypeDef::parent);
    while let Some(parent) = current {
        chain.push(parent);
        current = registry.get(parent).and_then(TypeDef::parent);
    }
    chain
}

fn declared_required<'r>(registry: &'r TypeRegistry, name: &str) -> Vec<&'r str> {
    match registry.get(name).map(|def| &def.body) {
        Some(TypeBody::Record(record)) => record.required.iter().map(String::as_str).collect(),
        _ => Vec::new(),
    }
}

fn declared_fields<'r>(registry: &'r TypeRegistry, name: &str) -> Vec<&'r str> {
    match registry.get(name).map(|def| &def.body) {
        Some(TypeBody::Record(record)) => record.fields.keys().map(String::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Every field and required name declared anywhere in `name`'s lineage,
/// except the identity field, which each type owns.
fn lineage_contract(registry: &TypeRegistry, name: &str) -> (HashSet<String>, HashSet<String>) {
    let chain = lineage(registry, name);
    let fields = chain
        .iter()
        .flat_map(|ancestor| declared_fields(registry, ancestor))
        .filter(|field| *field != "type")
        .map(str::to_string)
        .collect();
    let required = chain
        .iter()
        .flat_map(|ancestor| declared_required(registry, ancestor))
        .filter(|field| *field != "type")
        .map(str::to_string)
        .collect();
    (fields, required)
}

/// Fields and required names a compiled entry exposes through its whole
/// composition chain.
fn exposed(schemas: &SchemaDocument, name: &str) -> (HashSet<String>, HashSet<String>) {
    let mut fields = HashSet::new();
    let mut required = HashSet::new();
    let mut current = name;
    for _ in 0..=schemas.len() {
        let object = match &schemas[current] {
            SchemaNode::Composition(comp) => &comp.extension,
            SchemaNode::Object(obj) => obj,
            SchemaNode::Enum(_) => break,
        };
        fields.extend(object.properties.keys().cloned());
        required.extend(object.required.iter().cloned());
        match &schemas[current] {
            SchemaNode::Composition(comp) => current = comp.base.as_str(),
            _ => break,
        }
    }
    (fields, required)
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn discovery_is_idempotent(registry in arb_registry()) {
        let options = DiscoveryOptions::from(&GenerateOptions::default());
        let roots = registry.default_roots();
        let first = discover(&registry, &roots, &options, &mut Vec::new()).unwrap();
        let second = discover(&registry, &roots, &options, &mut Vec::new()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn compilation_terminates_on_a_real_ancestor_or_universal_base(registry in arb_registry()) {
        let result = generate(&registry, &[], &GenerateOptions::default()).unwrap();

        for (name, node) in &result.schemas {
            if name == UNIVERSAL_BASE_NAME {
                continue;
            }
            prop_assert!(matches!(node, SchemaNode::Composition(_)), "{} should be a composition", name);
            let SchemaNode::Composition(comp) = node else { continue };
            let ancestors = &lineage(&registry, name)[1..];
            prop_assert!(
                comp.base == UNIVERSAL_BASE_NAME || ancestors.contains(&comp.base.as_str()),
                "{} composes over {}, which is not one of its ancestors",
                name,
                comp.base
            );
        }
    }

    #[test]
    fn extension_never_repeats_inherited_required(registry in arb_registry()) {
        let result = generate(&registry, &[], &GenerateOptions::default()).unwrap();

        for node in result.schemas.values() {
            let SchemaNode::Composition(comp) = node else { continue };
            let inherited: HashSet<&str> = lineage(&registry, &comp.base)
                .into_iter()
                .flat_map(|ancestor| declared_required(&registry, ancestor))
                .collect();
            for name in &comp.extension.required {
                prop_assert!(!inherited.contains(name.as_str()));
            }
        }
    }

    #[test]
    fn resolved_extensions_only_hold_new_fields(registry in arb_registry()) {
        let result = generate(&registry, &[], &GenerateOptions::default()).unwrap();

        for (name, node) in &result.schemas {
            let SchemaNode::Composition(comp) = node else { continue };
            if comp.base == UNIVERSAL_BASE_NAME {
                continue;
            }
            let upstream: HashSet<&str> = lineage(&registry, &comp.base)
                .into_iter()
                .flat_map(|ancestor| declared_fields(&registry, ancestor))
                .collect();
            for field in comp.extension.properties.keys() {
                // The identity field always overrides the inherited one.
                if field == "type" {
                    continue;
                }
                prop_assert!(
                    !upstream.contains(field.as_str()),
                    "{}.{} is already declared above {}",
                    name,
                    field,
                    comp.base
                );
            }
        }
    }

    #[test]
    fn ordering_is_idempotent(registry in arb_registry()) {
        let result = generate(&registry, &[], &GenerateOptions::default()).unwrap();
        let again = normalize(result.schemas.clone(), &NormalizeOptions::default(), &mut Vec::new());

        for (name, node) in &result.schemas {
            let before: Vec<&String> = node.local_object().map(|o| o.properties.keys().collect()).unwrap_or_default();
            let after: Vec<&String> = again.schemas[name].local_object().map(|o| o.properties.keys().collect()).unwrap_or_default();
            prop_assert_eq!(before, after);
        }
    }

    #[test]
    fn tags_are_sorted(registry in arb_registry()) {
        let result = generate(&registry, &[], &GenerateOptions::default()).unwrap();
        let mut sorted = result.tags.iter().map(|t| t.display_name.clone()).collect::<Vec<_>>();
        sorted.sort();
        let names: Vec<String> = result.tags.iter().map(|t| t.display_name.clone()).collect();
        prop_assert_eq!(names, sorted);
        prop_assert_eq!(result.tags.len(), result.tag_names.len());
    }

    #[test]
    fn compiled_records_expose_their_whole_lineage(registry in arb_registry()) {
        let result = generate(&registry, &[], &GenerateOptions::default()).unwrap();

        for name in result.schemas.keys().filter(|n| *n != UNIVERSAL_BASE_NAME) {
            let (fields, required) = lineage_contract(&registry, name);
            let (exposed_fields, exposed_required) = exposed(&result.schemas, name);
            prop_assert!(
                fields.is_subset(&exposed_fields),
                "{} exposes {:?}, lineage declares {:?}",
                name,
                exposed_fields,
                fields
            );
            prop_assert!(required.is_subset(&exposed_required), "{} lost required names", name);
        }
    }

    #[test]
    fn flat_records_hold_their_whole_lineage(registry in arb_registry()) {
        let options = GenerateOptions {
            enable_inheritance: false,
            ..GenerateOptions::default()
        };
        let result = generate(&registry, &[], &options).unwrap();

        for (name, node) in result.schemas.iter().filter(|(n, _)| *n != UNIVERSAL_BASE_NAME) {
            prop_assert!(matches!(node, SchemaNode::Object(_)), "{} should stay a flat object", name);
            let SchemaNode::Object(object) = node else { continue };
            let (fields, _) = lineage_contract(&registry, name);
            for field in &fields {
                prop_assert!(object.properties.contains_key(field), "flat {} lacks {}", name, field);
            }
        }
    }
}
