//! Non-blocking notices emitted while discovering, compiling and normalizing.
//!
//! Passes report a [`Diagnostic`] to an injected [`DiagnosticSink`] instead of
//! printing. Every report is also logged through `tracing`.

use serde::{Deserialize, Serialize};

/// A structured notice about something that did not stop the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A root name did not resolve to a registered record or enum.
    UnknownRoot { name: String },
    /// A field references a name that is neither primitive nor registered.
    OpaqueType {
        type_name: String,
        field: String,
        referenced: String,
    },
    /// A field was redeclared with a shape incompatible with `against`.
    FieldConflict {
        type_name: String,
        field: String,
        against: String,
    },
    /// Conflict resolution exhausted the real ancestors.
    UniversalFallback { type_name: String },
    /// A document entry has no discovered type and was left as is.
    UnmappedSchemaEntry { name: String },
    /// An existing identity field's default does not name its owning type.
    IdentityDefaultMismatch {
        type_name: String,
        found: Option<serde_json::Value>,
    },
}

impl Diagnostic {
    /// Human-readable description of the notice.
    pub fn message(&self) -> String {
        match self {
            Diagnostic::UnknownRoot { name } => {
                format!("root {name} is not a registered record or enum")
            }
            Diagnostic::OpaqueType {
                type_name,
                field,
                referenced,
            } => format!("{type_name}.{field} references unregistered type {referenced}"),
            Diagnostic::FieldConflict {
                type_name,
                field,
                against,
            } => format!("{type_name}.{field} conflicts with the declaration inherited through {against}"),
            Diagnostic::UniversalFallback { type_name } => {
                format!("{type_name} falls back to the universal base schema")
            }
            Diagnostic::UnmappedSchemaEntry { name } => {
                format!("schema entry {name} has no discovered type")
            }
            Diagnostic::IdentityDefaultMismatch { type_name, found } => match found {
                Some(value) => format!("{type_name}.type defaults to {value}, expected \"{type_name}\""),
                None => format!("{type_name}.type has no default, expected \"{type_name}\""),
            },
        }
    }

    fn log(&self) {
        match self {
            Diagnostic::FieldConflict { .. } | Diagnostic::UniversalFallback { .. } => {
                tracing::debug!(diagnostic = ?self, "{}", self.message());
            }
            _ => tracing::warn!(diagnostic = ?self, "{}", self.message()),
        }
    }
}

/// Receiver of diagnostics.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        diagnostic.log();
        self.push(diagnostic);
    }
}

/// Sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        diagnostic.log();
    }
}
