//! Type name → owning module path lookup, used by downstream generators to
//! lay out their output files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::passes::p0_discovery::TypeGraph;

/// Records and enums keyed by name, each mapped to its module path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMap {
    pub classes: BTreeMap<String, String>,
    pub enums: BTreeMap<String, String>,
}

/// Literal find/replace applied to every module path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRewrite {
    pub find: String,
    pub replace: String,
}

impl ModuleRewrite {
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replace: replace.into(),
        }
    }

    fn apply(&self, path: &str) -> String {
        path.replace(&self.find, &self.replace)
    }
}

/// Build the module map of every discovered type that declares a module.
pub fn module_map(graph: &TypeGraph, rewrite: Option<&ModuleRewrite>) -> ModuleMap {
    let mut map = ModuleMap::default();
    for descriptor in graph.iter() {
        let Some(module) = descriptor.module.as_deref() else {
            continue;
        };
        let module = match rewrite {
            Some(rewrite) => rewrite.apply(module),
            None => module.to_string(),
        };
        let target = if descriptor.is_enum() {
            &mut map.enums
        } else {
            &mut map.classes
        };
        target.insert(descriptor.name.clone(), module);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerateOptions;
    use crate::passes::p0_discovery::{discover, DiscoveryOptions};
    use crate::registry::{TypeDef, TypeExpr, TypeRegistry};
    use pretty_assertions::assert_eq;

    fn graph() -> TypeGraph {
        let registry = TypeRegistry::new(
            vec![
                TypeDef::record("Room")
                    .in_module("honeybee_schema.model")
                    .field("face", TypeExpr::name("Face"))
                    .field("kind", TypeExpr::name("Kind")),
                TypeDef::record("Face").in_module("honeybee_schema.geometry"),
                TypeDef::enumeration("Kind", ["A", "B"]).in_module("honeybee_schema.enums"),
                TypeDef::record("Loose"),
            ],
            vec![],
        )
        .unwrap();
        discover(
            &registry,
            &registry.default_roots(),
            &DiscoveryOptions::from(&GenerateOptions::default()),
            &mut Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_classes_and_enums_are_separated_and_sorted() {
        let map = module_map(&graph(), None);
        assert_eq!(
            map.classes.keys().collect::<Vec<_>>(),
            vec!["Face", "Room"]
        );
        assert_eq!(map.enums["Kind"], "honeybee_schema.enums");
        assert!(!map.classes.contains_key("Loose"));
    }

    #[test]
    fn test_rewrite_applies_to_every_path() {
        let rewrite = ModuleRewrite::new("honeybee_schema", "HoneybeeSchema");
        let map = module_map(&graph(), Some(&rewrite));
        assert_eq!(map.classes["Room"], "HoneybeeSchema.model");
        assert_eq!(map.enums["Kind"], "HoneybeeSchema.enums");
    }
}
