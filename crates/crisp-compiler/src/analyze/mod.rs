//! Semantic analysis: name resolution, type inference, type checking.
//!
//! The three phases run in a fixed order and append to one diagnostic bag.
//! `resolve` produces the [`SemanticModel`] (resolution + inference results
//! keyed by AST instance ids); `check` validates it top-down and emits
//! advisories. Error-typed subexpressions suppress every diagnostic their
//! parents would otherwise produce.

mod check;
mod infer;
mod resolve;


use std::collections::HashMap;

use indexmap::IndexMap;

use crisp_core::{ContextType, CrispType, MemberKind, MemberPath, Nullability};

use crate::ast::{AstId, AstOrigin, Program};
use crate::diagnostics::Diagnostics;

pub use check::check;

/// One resolved segment of a member path, in the host's casing.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedSegment {
    pub name: String,
    pub kind: MemberKind,
    /// Declared type for data members, return type for methods.
    pub ty: CrispType,
    pub nullable: Nullability,
    /// Parameter types; empty for data members.
    pub params: Vec<CrispType>,
}

/// A member path resolved against the context (or blackboard) type.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedPath {
    pub segments: Vec<ResolvedSegment>,
    pub blackboard: bool,
}

impl ResolvedPath {
    /// The final segment. Paths are non-empty by construction.
    pub fn last(&self) -> &ResolvedSegment {
        self.segments.last().expect("resolved paths are non-empty")
    }

    /// Declared/return type of the whole path.
    pub fn result_type(&self) -> CrispType {
        self.last().ty.clone()
    }

    /// The host-cased member path, for IR emission.
    pub fn member_path(&self) -> MemberPath {
        MemberPath::new(self.segments.iter().map(|s| s.name.clone()).collect())
            .expect("resolved paths are non-empty")
    }
}

/// Resolution and inference results for one program.
#[derive(Debug, Default)]
pub struct SemanticModel {
    types: HashMap<AstId, CrispType>,
    resolutions: HashMap<AstId, ResolvedPath>,
    /// Defined trees in definition order (later definitions shadow earlier).
    pub trees: IndexMap<String, AstOrigin>,
}

impl SemanticModel {
    /// Inferred type of an expression; `Unknown` when inference never saw it.
    pub fn type_of(&self, aid: AstId) -> CrispType {
        self.types.get(&aid).cloned().unwrap_or(CrispType::Unknown)
    }

    pub fn resolution(&self, aid: AstId) -> Option<&ResolvedPath> {
        self.resolutions.get(&aid)
    }

    pub(crate) fn set_type(&mut self, aid: AstId, ty: CrispType) {
        self.types.insert(aid, ty);
    }

    pub(crate) fn set_resolution(&mut self, aid: AstId, path: ResolvedPath) {
        self.resolutions.insert(aid, path);
    }
}

/// Phase 1 + 2: name resolution and bottom-up type inference.
pub fn resolve(
    program: &Program,
    schema: &dyn ContextType,
    diagnostics: &mut Diagnostics,
) -> SemanticModel {
    let mut model = SemanticModel::default();
    resolve::resolve_program(program, schema, &mut model, diagnostics);
    infer::infer_program(program, schema, &mut model, diagnostics);
    model
}

/// Whether `src` may flow into a `tgt`-typed slot.
pub(crate) fn assignable(schema: &dyn ContextType, src: &CrispType, tgt: &CrispType) -> bool {
    if src == tgt {
        return true;
    }
    match (src, tgt) {
        (CrispType::Int, CrispType::Float) => true,
        (CrispType::Null, tgt) => tgt.accepts_null(),
        (CrispType::Custom(a), CrispType::Custom(b)) => schema.is_assignable(a, b),
        _ => false,
    }
}
