//! The closed set of types the compiler reasons about.

use serde::{Deserialize, Serialize};

/// A Crisp type as seen by inference and checking.
///
/// `Error` is a distinguished member, not an absence: an `Error`-typed
/// subexpression suppresses every diagnostic its parents would otherwise
/// emit about it. `Unknown` means inference deferred (e.g. an enum literal
/// before resolution) and is likewise skipped by checks.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CrispType {
    Int,
    Float,
    Bool,
    String,
    Void,
    Null,
    BtStatus,
    BtNode,
    Error,
    Unknown,
    /// A host-declared type, carried by name (including any generic arguments,
    /// e.g. `Inventory<Item>`).
    Custom(String),
}

impl CrispType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, CrispType::Int | CrispType::Float)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CrispType::Error)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, CrispType::Unknown)
    }

    /// Error and Unknown are exempt from checking.
    pub fn is_checkable(&self) -> bool {
        !self.is_error() && !self.is_unknown()
    }

    /// Whether a `null` literal may flow into this type.
    pub fn accepts_null(&self) -> bool {
        matches!(
            self,
            CrispType::Custom(_) | CrispType::String | CrispType::Null
        )
    }

    /// Name of a custom type, if any.
    pub fn custom_name(&self) -> Option<&str> {
        match self {
            CrispType::Custom(name) => Some(name),
            _ => None,
        }
    }

    /// Maps a host type-reference string onto the closed set.
    pub fn from_name(name: &str) -> CrispType {
        match name {
            "Int" => CrispType::Int,
            "Float" => CrispType::Float,
            "Bool" => CrispType::Bool,
            "String" => CrispType::String,
            "Void" => CrispType::Void,
            "BtStatus" => CrispType::BtStatus,
            "BtNode" => CrispType::BtNode,
            other => CrispType::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for CrispType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CrispType::Int => "Int",
            CrispType::Float => "Float",
            CrispType::Bool => "Bool",
            CrispType::String => "String",
            CrispType::Void => "Void",
            CrispType::Null => "null",
            CrispType::BtStatus => "BtStatus",
            CrispType::BtNode => "BtNode",
            CrispType::Error => "<error>",
            CrispType::Unknown => "<unknown>",
            CrispType::Custom(name) => name.as_str(),
        };
        f.write_str(name)
    }
}
