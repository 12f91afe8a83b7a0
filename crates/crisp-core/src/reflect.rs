//! The runtime reflection contract between the interpreter and the host.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::Value;

/// Shared handle to a host object navigable by the interpreter.
pub type ObjectHandle = Rc<RefCell<dyn Reflect>>;

/// Host-side access failures surfaced through `Reflect`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AccessError {
    #[error("no member `{0}`")]
    MissingMember(String),
    #[error("no method `{0}`")]
    MissingMethod(String),
    #[error("method `{method}` expects {expected} arguments, got {got}")]
    ArgumentCount {
        method: String,
        expected: usize,
        got: usize,
    },
    #[error("{0}")]
    Host(String),
}

/// Property/field reads and method invocation by name.
///
/// Implemented by the embedding for its context and blackboard objects.
/// `get` covers both properties and fields; the interpreter does not
/// distinguish between them at runtime.
pub trait Reflect {
    /// Reads a property or field. `None` means the member does not exist.
    fn get(&self, name: &str) -> Option<Value>;

    /// Invokes a method with a positional argument list.
    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, AccessError>;
}

/// One tick's worth of ambient data.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TickContext {
    /// Seconds since the previous tick.
    pub delta_time: f32,
    pub frame_index: u64,
}

impl TickContext {
    pub fn new(delta_time: f32) -> TickContext {
        TickContext {
            delta_time,
            frame_index: 0,
        }
    }

    pub fn at_frame(delta_time: f32, frame_index: u64) -> TickContext {
        TickContext {
            delta_time,
            frame_index,
        }
    }
}

/// Boxed host method.
pub type MethodFn = Box<dyn FnMut(&[Value]) -> Result<Value, AccessError>>;

/// Map-backed `Reflect` implementation for tests and dynamic embeddings.
#[derive(Default)]
pub struct DynamicObject {
    properties: IndexMap<String, Value>,
    methods: IndexMap<String, MethodFn>,
}

impl DynamicObject {
    pub fn new() -> DynamicObject {
        DynamicObject::default()
    }

    pub fn with_property(mut self, name: &str, value: impl Into<Value>) -> DynamicObject {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    pub fn with_method(
        mut self,
        name: &str,
        f: impl FnMut(&[Value]) -> Result<Value, AccessError> + 'static,
    ) -> DynamicObject {
        self.methods.insert(name.to_string(), Box::new(f));
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.properties.insert(name.to_string(), value.into());
    }

    pub fn into_handle(self) -> ObjectHandle {
        Rc::new(RefCell::new(self))
    }
}

impl std::fmt::Debug for DynamicObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicObject")
            .field("properties", &self.properties)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Reflect for DynamicObject {
    fn get(&self, name: &str) -> Option<Value> {
        self.properties.get(name).cloned()
    }

    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, AccessError> {
        match self.methods.get_mut(name) {
            Some(f) => f(args),
            None => Err(AccessError::MissingMethod(name.to_string())),
        }
    }
}
