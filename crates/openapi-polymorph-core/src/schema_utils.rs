//! Shared schema utilities for reference rendering, naming and traversal.
//!
//! Provides three concerns used across passes:
//! 1. **Reference templates** (`#/components/schemas/{name}`) in both directions
//! 2. **Naming helpers** for identifiers and generated titles
//! 3. **Shared traversal** over the nested schemas of a property

use std::sync::OnceLock;

use regex::Regex;

use crate::schema::PropertySchema;

/// Placeholder replaced by the type name in a reference template.
const NAME_PLACEHOLDER: &str = "{name}";

// ---------------------------------------------------------------------------
// Reference templates
// ---------------------------------------------------------------------------

/// Render a reference to `name` through `template`.
///
/// # Example
/// ```
/// use openapi_polymorph_core::render_ref;
/// assert_eq!(render_ref("#/components/schemas/{name}", "Pet"), "#/components/schemas/Pet");
/// ```
pub fn render_ref(template: &str, name: &str) -> String {
    template.replace(NAME_PLACEHOLDER, name)
}

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

fn identifier_regex() -> &'static Regex {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid"))
}

/// True when `name` can be embedded verbatim in an anchored pattern.
pub fn is_identifier(name: &str) -> bool {
    identifier_regex().is_match(name)
}

/// Title for a field without an explicit one: `max_count` → `Max Count`.
pub fn title_case(field: &str) -> String {
    field
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Shared traversal
// ---------------------------------------------------------------------------

/// Visit `prop` and every schema nested in it through `items` and `anyOf`.
///
/// `$ref` nodes are passed to `visit` like any other; callers decide whether
/// to touch them.
pub fn walk_property_mut<F>(prop: &mut PropertySchema, visit: &mut F)
where
    F: FnMut(&mut PropertySchema),
{
    visit(prop);
    if let Some(items) = prop.items.as_deref_mut() {
        walk_property_mut(items, visit);
    }
    if let Some(variants) = prop.any_of.as_mut() {
        for variant in variants {
            walk_property_mut(variant, visit);
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
