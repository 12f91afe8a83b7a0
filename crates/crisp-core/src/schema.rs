//! The context-type descriptor consumed by semantic analysis.
//!
//! Two layers:
//! - **Deserialization layer**: 1:1 mapping to the host's schema JSON
//!   (`RawSchema` and friends).
//! - **Analysis layer**: `DynamicSchema`, an indexed structure behind the
//!   `ContextType` trait that the compiler treats as opaque data.
//!
//! Hosts with their own reflection systems implement `ContextType` directly;
//! `DynamicSchema` is the batteries-included implementation used by tests,
//! tooling, and JSON-described contexts.

use indexmap::IndexMap;

use crate::types::CrispType;

/// What kind of member a context type exposes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MemberKind {
    Property,
    Field,
    Method,
}

/// Nullability annotation on a member's declared type.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
pub enum Nullability {
    /// Declared nullable; dereferencing warrants a warning.
    Annotated,
    /// Declared non-nullable; comparing against null is vacuous.
    NotAnnotated,
    /// No annotation information.
    #[default]
    Oblivious,
}

/// A method parameter.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParamInfo {
    pub name: String,
    pub ty: CrispType,
}

/// A single member of a context type.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MemberInfo {
    pub name: String,
    pub kind: MemberKind,
    /// Declared type for data members, return type for methods.
    pub ty: CrispType,
    pub nullable: Nullability,
    /// Obsolete-attribute message, when the member is marked obsolete.
    pub obsolete: Option<String>,
    /// Parameters; empty for data members.
    pub params: Vec<ParamInfo>,
}

impl MemberInfo {
    pub fn is_method(&self) -> bool {
        self.kind == MemberKind::Method
    }

    pub fn is_data(&self) -> bool {
        !self.is_method()
    }
}

/// A generic type parameter with an optional subtype constraint.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TypeParam {
    pub name: String,
    #[serde(default)]
    pub constraint: Option<String>,
}

/// The descriptor interface the compiler resolves member paths against.
///
/// The compiler never inspects host types directly; everything it knows
/// about the embedding comes through these operations.
pub trait ContextType {
    /// Name of the root context type (the type behind bare `.Member` paths).
    fn context_type(&self) -> &str;

    /// Declaration-order members of `ty`, instantiated for any generic
    /// arguments in the name. Empty for unknown types.
    fn members(&self, ty: &str) -> Vec<MemberInfo>;

    /// Looks up a member of `ty` by exact name.
    fn member(&self, ty: &str, name: &str) -> Option<MemberInfo> {
        self.members(ty).into_iter().find(|m| m.name == name)
    }

    /// Reference-subtype test between named types.
    fn is_assignable(&self, src: &str, tgt: &str) -> bool;

    /// Members of an enum type, or `None` when `ty` is not an enum.
    fn enum_members(&self, ty: &str) -> Option<Vec<String>>;

    /// Whether `ty` (after stripping generic arguments) names a known type.
    fn contains(&self, ty: &str) -> bool;

    /// Generic parameters declared by `ty`. Empty for non-generic types.
    fn type_params(&self, ty: &str) -> Vec<TypeParam>;
}

impl<T: ContextType + ?Sized> ContextType for &T {
    fn context_type(&self) -> &str {
        (*self).context_type()
    }
    fn members(&self, ty: &str) -> Vec<MemberInfo> {
        (*self).members(ty)
    }
    fn member(&self, ty: &str, name: &str) -> Option<MemberInfo> {
        (*self).member(ty, name)
    }
    fn is_assignable(&self, src: &str, tgt: &str) -> bool {
        (*self).is_assignable(src, tgt)
    }
    fn enum_members(&self, ty: &str) -> Option<Vec<String>> {
        (*self).enum_members(ty)
    }
    fn contains(&self, ty: &str) -> bool {
        (*self).contains(ty)
    }
    fn type_params(&self, ty: &str) -> Vec<TypeParam> {
        (*self).type_params(ty)
    }
}

// ============================================================================
// Deserialization layer
// ============================================================================

/// Raw schema document as provided by the host.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct RawSchema {
    /// Name of the context type (may carry generic arguments).
    pub context: String,
    #[serde(default)]
    pub types: Vec<RawType>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawTypeKind {
    #[default]
    Class,
    Enum,
}

/// Raw type definition.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct RawType {
    pub name: String,
    #[serde(default)]
    pub kind: RawTypeKind,
    #[serde(default)]
    pub bases: Vec<String>,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    #[serde(default)]
    pub members: Vec<RawMember>,
    /// Members of an enum type.
    #[serde(default)]
    pub values: Vec<String>,
}

/// Raw member definition. `type` strings name builtins (`Int`, `Float`,
/// `Bool`, `String`, `Void`, `BtStatus`, `BtNode`) or schema types.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct RawMember {
    pub name: String,
    pub kind: MemberKind,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub nullable: Nullability,
    #[serde(default)]
    pub obsolete: Option<String>,
    #[serde(default)]
    pub params: Vec<RawParam>,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct RawParam {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Parse a schema JSON document into the raw layer.
pub fn parse_schema(json: &str) -> Result<RawSchema, serde_json::Error> {
    serde_json::from_str(json)
}

/// Schema construction failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate type `{0}` in schema")]
    DuplicateType(String),
    #[error("context type `{0}` is not defined in the schema")]
    UnknownContext(String),
}

// ============================================================================
// Analysis layer
// ============================================================================

#[derive(Clone, Debug)]
struct TypeDef {
    kind: RawTypeKind,
    bases: Vec<String>,
    type_params: Vec<TypeParam>,
    members: Vec<MemberInfo>,
    values: Vec<String>,
}

/// Indexed context schema built from the raw layer.
#[derive(Clone, Debug, Default)]
pub struct DynamicSchema {
    context: String,
    types: IndexMap<String, TypeDef>,
}

/// Splits `Name<A, B>` into the base name and argument names.
/// Non-generic names come back with an empty argument list.
pub fn split_generic(ty: &str) -> (&str, Vec<&str>) {
    match ty.split_once('<') {
        Some((base, rest)) => {
            let inner = rest.trim_end_matches('>');
            let args = inner
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            (base.trim(), args)
        }
        None => (ty, Vec::new()),
    }
}

impl DynamicSchema {
    /// Build from the raw layer, validating the context-type reference.
    pub fn build(raw: RawSchema) -> Result<DynamicSchema, SchemaError> {
        let mut types = IndexMap::new();
        for raw_ty in raw.types {
            let members = raw_ty
                .members
                .iter()
                .map(|m| MemberInfo {
                    name: m.name.clone(),
                    kind: m.kind,
                    ty: CrispType::from_name(&m.type_name),
                    nullable: m.nullable,
                    obsolete: m.obsolete.clone(),
                    params: m
                        .params
                        .iter()
                        .map(|p| ParamInfo {
                            name: p.name.clone(),
                            ty: CrispType::from_name(&p.type_name),
                        })
                        .collect(),
                })
                .collect();

            let def = TypeDef {
                kind: raw_ty.kind,
                bases: raw_ty.bases,
                type_params: raw_ty.type_params,
                members,
                values: raw_ty.values,
            };
            if types.insert(raw_ty.name.clone(), def).is_some() {
                return Err(SchemaError::DuplicateType(raw_ty.name));
            }
        }

        let (context_base, _) = split_generic(&raw.context);
        if !types.contains_key(context_base) {
            return Err(SchemaError::UnknownContext(raw.context));
        }

        Ok(DynamicSchema {
            context: raw.context,
            types,
        })
    }

    /// Parse and build in one step.
    pub fn from_json(json: &str) -> Result<DynamicSchema, Box<dyn std::error::Error>> {
        Ok(Self::build(parse_schema(json)?)?)
    }

    fn def(&self, ty: &str) -> Option<&TypeDef> {
        let (base, _) = split_generic(ty);
        self.types.get(base)
    }

    /// Substitutes generic parameter names in a member type for the
    /// arguments carried by the instantiated type name.
    fn instantiate(&self, ty: &str, member_ty: &CrispType) -> CrispType {
        let (base, args) = split_generic(ty);
        if args.is_empty() {
            return member_ty.clone();
        }
        let Some(def) = self.types.get(base) else {
            return member_ty.clone();
        };
        if let CrispType::Custom(name) = member_ty {
            for (param, arg) in def.type_params.iter().zip(args.iter().copied()) {
                if param.name == *name {
                    return CrispType::from_name(arg);
                }
            }
        }
        member_ty.clone()
    }
}

impl ContextType for DynamicSchema {
    fn context_type(&self) -> &str {
        &self.context
    }

    fn members(&self, ty: &str) -> Vec<MemberInfo> {
        let Some(def) = self.def(ty) else {
            return Vec::new();
        };
        let mut members: Vec<MemberInfo> = def
            .members
            .iter()
            .map(|m| MemberInfo {
                ty: self.instantiate(ty, &m.ty),
                params: m
                    .params
                    .iter()
                    .map(|p| ParamInfo {
                        name: p.name.clone(),
                        ty: self.instantiate(ty, &p.ty),
                    })
                    .collect(),
                ..m.clone()
            })
            .collect();
        // Inherited members come after declared ones.
        for base in &def.bases {
            members.extend(self.members(base));
        }
        members
    }

    fn is_assignable(&self, src: &str, tgt: &str) -> bool {
        if src == tgt {
            return true;
        }
        let (src_base, _) = split_generic(src);
        let Some(def) = self.types.get(src_base) else {
            return false;
        };
        def.bases.iter().any(|b| self.is_assignable(b, tgt))
    }

    fn enum_members(&self, ty: &str) -> Option<Vec<String>> {
        let def = self.def(ty)?;
        if def.kind == RawTypeKind::Enum {
            Some(def.values.clone())
        } else {
            None
        }
    }

    fn contains(&self, ty: &str) -> bool {
        self.def(ty).is_some()
    }

    fn type_params(&self, ty: &str) -> Vec<TypeParam> {
        self.def(ty).map(|d| d.type_params.clone()).unwrap_or_default()
    }
}
