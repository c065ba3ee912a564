//! Pass 1: Schema Assembly
//!
//! Calls the structural generator once per discovered type and collects the
//! results into one flat document. The universal base schema is always added,
//! whether or not anything references it yet, because the polymorphism
//! compiler may need it as an ancestor of last resort.

use crate::error::PolymorphError;
use crate::generator::StructuralGenerator;
use crate::passes::p0_discovery::TypeGraph;
use crate::schema::{universal_base_schema, SchemaDocument, SchemaNode, UNIVERSAL_BASE_NAME};

/// Build the flat schema document for `graph`.
pub fn assemble(
    graph: &TypeGraph,
    generator: &dyn StructuralGenerator,
) -> Result<SchemaDocument, PolymorphError> {
    let mut doc = SchemaDocument::with_capacity(graph.len() + 1);
    for descriptor in graph.iter() {
        let node = generator.generate(descriptor)?;
        doc.insert(descriptor.name.clone(), node);
    }
    doc.insert(
        UNIVERSAL_BASE_NAME.to_string(),
        SchemaNode::Object(universal_base_schema()),
    );
    tracing::debug!(entries = doc.len(), "assembled schema document");
    Ok(doc)
}

// ===========================================================================
// Tests
// ===========================================================================
