//! Configuration for schema generation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Ancestor names at which inheritance chains are truncated by default.
///
/// These are platform base types that must never be emitted as schemas.
pub const DEFAULT_SENTINELS: &[&str] = &[
    "NoExtraBaseModel",
    "ModelMetaclass",
    "BaseModel",
    "object",
    "Enum",
];

/// Default `$ref` template. `{name}` is replaced with the referenced type name.
pub const DEFAULT_REF_TEMPLATE: &str = "#/components/schemas/{name}";

/// Options for a full generation run.
///
/// ## Serialization Format
///
/// Fields are serialized in `kebab-case` (e.g., `enable-inheritance`, `ref-template`).
/// Missing fields fall back to [`GenerateOptions::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GenerateOptions {
    /// Ancestor names that stop chain discovery.
    pub sentinels: BTreeSet<String>,
    /// Rewrite records as `allOf` compositions over their ancestors.
    pub enable_inheritance: bool,
    /// Set `discriminator.propertyName` on compositions. Only honored when
    /// inheritance is enabled.
    pub add_discriminator: bool,
    /// Synthesize (or mark read-only) the `type` identity property.
    pub add_identity_field: bool,
    /// Default `number` to `double` and `integer` to `int32`.
    pub add_default_formats: bool,
    /// Emit display tags for enum schemas too.
    pub tag_enums: bool,
    /// Template used to render references between schemas.
    pub ref_template: String,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            sentinels: DEFAULT_SENTINELS.iter().map(|s| s.to_string()).collect(),
            enable_inheritance: true,
            add_discriminator: true,
            add_identity_field: true,
            add_default_formats: true,
            tag_enums: true,
            ref_template: DEFAULT_REF_TEMPLATE.to_string(),
        }
    }
}

impl GenerateOptions {
    /// Options for the normalization pass derived from these options.
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            add_discriminator: self.enable_inheritance && self.add_discriminator,
            add_identity_field: self.add_identity_field,
            add_default_formats: self.add_default_formats,
            tag_enums: self.tag_enums,
        }
    }
}

/// Toggles for the normalization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub add_discriminator: bool,
    pub add_identity_field: bool,
    pub add_default_formats: bool,
    pub tag_enums: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        GenerateOptions::default().normalize_options()
    }
}
