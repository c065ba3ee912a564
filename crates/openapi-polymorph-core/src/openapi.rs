//! OpenAPI 3 envelope around a generated schema document.
//!
//! The envelope carries no paths: it only exists to publish
//! `components/schemas` together with the display tags and their tag group.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PolymorphError;
use crate::passes::p3_normalize::Tag;
use crate::schema::SchemaDocument;
use crate::GenerateResult;

/// OpenAPI version written into every envelope.
pub const OPENAPI_VERSION: &str = "3.0.2";
/// Name of the single tag group listing every model tag.
pub const MODELS_TAG_GROUP: &str = "Models";

/// `info` object of the envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Caller-supplied envelope fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvelopeOptions {
    pub title: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub external_docs: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroup {
    pub name: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Components {
    pub schemas: SchemaDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenApiDocument {
    pub openapi: String,
    pub servers: Vec<Value>,
    pub info: ApiInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<Value>,
    pub tags: Vec<Tag>,
    #[serde(rename = "x-tagGroups")]
    pub tag_groups: Vec<TagGroup>,
    pub paths: IndexMap<String, Value>,
    pub components: Components,
}

/// Wrap `generated` in an OpenAPI envelope.
///
/// Fails with [`PolymorphError::MissingVersion`] when no non-empty version is
/// given.
pub fn build_openapi(
    generated: GenerateResult,
    options: EnvelopeOptions,
) -> Result<OpenApiDocument, PolymorphError> {
    let version = options
        .version
        .filter(|version| !version.trim().is_empty())
        .ok_or(PolymorphError::MissingVersion)?;

    Ok(OpenApiDocument {
        openapi: OPENAPI_VERSION.to_string(),
        servers: Vec::new(),
        info: ApiInfo {
            title: options.title,
            version,
            description: options.description,
        },
        external_docs: options.external_docs,
        tags: generated.tags,
        tag_groups: vec![TagGroup {
            name: MODELS_TAG_GROUP.to_string(),
            tags: generated.tag_names,
        }],
        paths: IndexMap::new(),
        components: Components {
            schemas: generated.schemas,
        },
    })
}
