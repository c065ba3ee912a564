//! Compile a single-inheritance type registry into polymorphic OpenAPI
//! component schemas.
//!
//! The pipeline runs four passes in order:
//!
//! 1. [`passes::p0_discovery`]: transitive closure of the roots and every
//!    ancestor chain, truncated at sentinel names.
//! 2. [`passes::p1_assembly`]: one flat structural schema per type, plus the
//!    universal base schema.
//! 3. [`passes::p2_polymorphism`]: records rewritten as `allOf` compositions
//!    over their nearest compatible ancestor.
//! 4. [`passes::p3_normalize`]: identity field, discriminator, numeric
//!    formats, required-first ordering and tags.
//!
//! [`generate`] runs the whole pipeline; [`openapi::build_openapi`] wraps the
//! result in an OpenAPI 3 envelope.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod generator;
pub mod module_map;
pub mod openapi;
pub mod passes;
pub mod registry;
pub mod schema;
pub mod schema_utils;

use serde::Serialize;

pub use config::{GenerateOptions, NormalizeOptions, DEFAULT_REF_TEMPLATE, DEFAULT_SENTINELS};
pub use diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
pub use error::PolymorphError;
pub use generator::{RegistryGenerator, StructuralGenerator};
pub use module_map::{ModuleMap, ModuleRewrite};
pub use openapi::{build_openapi, EnvelopeOptions, OpenApiDocument};
pub use passes::p3_normalize::Tag;
pub use registry::{FieldDef, TypeDef, TypeExpr, TypeRegistry};
pub use schema::{SchemaDocument, SchemaNode, UNIVERSAL_BASE_NAME};
pub use schema_utils::render_ref;

use passes::p0_discovery::{discover, DiscoveryOptions, TypeGraph};
use passes::p1_assembly::assemble;
use passes::p2_polymorphism::compile_polymorphism;
use passes::p3_normalize::normalize;

/// Output of a full generation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateResult {
    /// Compiled and normalized schemas, ready for `components/schemas`.
    pub schemas: SchemaDocument,
    /// Display tags, sorted by type name.
    pub tags: Vec<Tag>,
    pub tag_names: Vec<String>,
    /// Every notice reported while running the pipeline.
    pub diagnostics: Vec<Diagnostic>,
}

/// Run the full pipeline with the default structural generator.
///
/// An empty `roots` slice falls back to [`TypeRegistry::default_roots`].
pub fn generate(
    registry: &TypeRegistry,
    roots: &[String],
    options: &GenerateOptions,
) -> Result<GenerateResult, PolymorphError> {
    let generator = RegistryGenerator::new(&options.ref_template);
    generate_with(registry, roots, options, &generator)
}

/// Run the full pipeline with a caller-supplied structural generator.
pub fn generate_with(
    registry: &TypeRegistry,
    roots: &[String],
    options: &GenerateOptions,
    generator: &dyn StructuralGenerator,
) -> Result<GenerateResult, PolymorphError> {
    let mut diagnostics = Vec::new();

    let graph = discover_types(registry, roots, options, &mut diagnostics)?;
    let flat = assemble(&graph, generator)?;
    let compiled = compile_polymorphism(&flat, &graph, options, &mut diagnostics)?;
    let normalized = normalize(compiled, &options.normalize_options(), &mut diagnostics);

    tracing::debug!(
        schemas = normalized.schemas.len(),
        diagnostics = diagnostics.len(),
        "generation complete"
    );

    Ok(GenerateResult {
        schemas: normalized.schemas,
        tags: normalized.tags,
        tag_names: normalized.tag_names,
        diagnostics,
    })
}

/// Map every type reachable from `roots` to its module path.
pub fn map_modules(
    registry: &TypeRegistry,
    roots: &[String],
    options: &GenerateOptions,
    rewrite: Option<&ModuleRewrite>,
) -> Result<ModuleMap, PolymorphError> {
    let graph = discover_types(registry, roots, options, &mut TracingSink)?;
    Ok(module_map::module_map(&graph, rewrite))
}

fn discover_types(
    registry: &TypeRegistry,
    roots: &[String],
    options: &GenerateOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<TypeGraph, PolymorphError> {
    let defaults;
    let roots = if roots.is_empty() {
        defaults = registry.default_roots();
        &defaults[..]
    } else {
        roots
    };
    discover(registry, roots, &DiscoveryOptions::from(options), sink)
}
