//! Core data structures for the Crisp behavior-tree language.
//!
//! Two layers:
//! - **Vocabulary layer**: identifiers, member paths, the `BtStatus` contract,
//!   and the closed `CrispType` set shared by compiler and runtime.
//! - **Host interface layer**: the context-type descriptor consumed during
//!   analysis (`ContextType` / `DynamicSchema`) and the runtime reflection
//!   contract (`Reflect` / `Value`) consumed during ticking.

mod ids;
mod paths;
mod reflect;
mod schema;
mod status;
mod types;
mod value;

pub use ids::{FileId, NodeId};
pub use paths::MemberPath;
pub use reflect::{AccessError, DynamicObject, MethodFn, ObjectHandle, Reflect, TickContext};
pub use schema::{
    ContextType, DynamicSchema, MemberInfo, MemberKind, Nullability, ParamInfo, RawMember,
    RawParam, RawSchema, RawType, RawTypeKind, SchemaError, TypeParam, parse_schema,
    split_generic,
};
pub use status::BtStatus;
pub use types::CrispType;
pub use value::Value;
