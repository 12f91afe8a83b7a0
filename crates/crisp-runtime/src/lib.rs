//! Runtime for executing compiled Crisp behavior trees.
//!
//! The interpreter walks IR trees against a host-supplied context object
//! (and optional blackboard), implementing the behavior-tree status
//! contract with stateful timeout/cooldown decorators. One tick is a
//! synchronous, non-blocking walk with no suspension points.

mod engine;

pub use engine::{Interpreter, RuntimeError};

pub use crisp_core::{BtStatus, DynamicObject, ObjectHandle, Reflect, TickContext, Value};
