//! The tick-driven tree walker.
//!
//! One interpreter instance owns its decorator state tables; `reset`
//! clears them. Timeout accumulators and cooldown timers are keyed by IR
//! node reference identity (the node's address), so two instantiations of
//! the same template keep independent state.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crisp_core::{BtStatus, ObjectHandle, TickContext, Value};
use crisp_ir::{IrModule, IrNode, IrNodeKind, ParallelPolicy};

use super::error::RuntimeError;

/// Reference identity of an IR node, stable while the node is not moved.
/// Registered trees live behind `Rc`, so theirs never move.
fn state_key(node: &IrNode) -> usize {
    node as *const IrNode as usize
}

pub struct Interpreter {
    trees: IndexMap<String, Rc<IrNode>>,
    context: ObjectHandle,
    blackboard: Option<ObjectHandle>,
    /// Accumulated running time per Timeout node.
    timeouts: HashMap<usize, f32>,
    /// Remaining lockout time per Cooldown node.
    cooldowns: HashMap<usize, f32>,
    delta_time: f32,
}

impl Interpreter {
    pub fn new(context: ObjectHandle) -> Interpreter {
        Interpreter {
            trees: IndexMap::new(),
            context,
            blackboard: None,
            timeouts: HashMap::new(),
            cooldowns: HashMap::new(),
            delta_time: 0.0,
        }
    }

    /// Registers every tree of a compiled module for `tick_tree` and
    /// cross-tree `ref` evaluation.
    pub fn with_module(mut self, module: &IrModule) -> Interpreter {
        for node in module.trees.values() {
            self.register_tree(node.clone());
        }
        self
    }

    pub fn with_blackboard(mut self, blackboard: ObjectHandle) -> Interpreter {
        self.blackboard = Some(blackboard);
        self
    }

    pub fn register_tree(&mut self, node: IrNode) {
        if let Some(name) = node.tree_name() {
            self.trees.insert(name.to_string(), Rc::new(node));
        }
    }

    pub(super) fn context(&self) -> ObjectHandle {
        self.context.clone()
    }

    pub(super) fn blackboard(&self) -> Option<ObjectHandle> {
        self.blackboard.clone()
    }

    /// Clears all stateful decorator tables.
    pub fn reset(&mut self) {
        self.timeouts.clear();
        self.cooldowns.clear();
    }

    /// Ticks a registered tree by name.
    pub fn tick_tree(
        &mut self,
        name: &str,
        tick: &TickContext,
    ) -> Result<BtStatus, RuntimeError> {
        let tree = self
            .trees
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownTree(name.to_string()))?;
        self.tick(&tree, tick)
    }

    /// Ticks an arbitrary IR node.
    pub fn tick(&mut self, node: &IrNode, tick: &TickContext) -> Result<BtStatus, RuntimeError> {
        self.delta_time = tick.delta_time;
        self.tick_node(node)
    }

    fn tick_node(&mut self, node: &IrNode) -> Result<BtStatus, RuntimeError> {
        match &node.kind {
            IrNodeKind::Tree { body, .. } => {
                let mut status = BtStatus::Success;
                for child in body {
                    status = self.tick_node(child)?;
                }
                Ok(status)
            }
            IrNodeKind::Selector { children } | IrNodeKind::ReactiveSelect { children } => {
                // A reactive selector restarts from the head anyway; with
                // stateless composites the walk is the same.
                for child in children {
                    let status = self.tick_node(child)?;
                    if status != BtStatus::Failure {
                        return Ok(status);
                    }
                }
                Ok(BtStatus::Failure)
            }
            IrNodeKind::Sequence { children } => {
                for child in children {
                    let status = self.tick_node(child)?;
                    if status != BtStatus::Success {
                        return Ok(status);
                    }
                }
                Ok(BtStatus::Success)
            }
            IrNodeKind::Parallel { policy, children } => self.tick_parallel(policy, children),
            IrNodeKind::Condition { expr } => {
                let value = self.eval(expr)?;
                match value {
                    Value::Bool(b) => Ok(BtStatus::from_bool(b)),
                    other => Err(RuntimeError::NonBoolCondition(other.type_name())),
                }
            }
            IrNodeKind::Action { method, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                let result = self.invoke(&method.path, &values)?;
                match result {
                    Value::Status(status) => Ok(status),
                    other => Err(RuntimeError::NotAStatus {
                        method: method.name().to_string(),
                        found: other.type_name(),
                    }),
                }
            }
            IrNodeKind::Guard { cond, body } => {
                if self.eval_condition(cond)? {
                    self.tick_node(body)
                } else {
                    Ok(BtStatus::Failure)
                }
            }
            IrNodeKind::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval_condition(cond)? {
                    self.tick_node(then)
                } else {
                    match otherwise {
                        Some(node) => self.tick_node(node),
                        None => Ok(BtStatus::Failure),
                    }
                }
            }
            IrNodeKind::Invert { child } => Ok(self.tick_node(child)?.inverted()),
            IrNodeKind::Repeat { count, child } => {
                for _ in 0..*count {
                    let status = self.tick_node(child)?;
                    if status != BtStatus::Success {
                        return Ok(status);
                    }
                }
                Ok(BtStatus::Success)
            }
            IrNodeKind::Timeout { seconds, child } => {
                let key = state_key(node);
                let status = self.tick_node(child)?;
                if status != BtStatus::Running {
                    self.timeouts.remove(&key);
                    return Ok(status);
                }
                let elapsed = self.timeouts.get(&key).copied().unwrap_or(0.0) + self.delta_time;
                if elapsed >= *seconds {
                    self.timeouts.remove(&key);
                    Ok(BtStatus::Failure)
                } else {
                    self.timeouts.insert(key, elapsed);
                    Ok(BtStatus::Running)
                }
            }
            IrNodeKind::Cooldown { seconds, child } => {
                let key = state_key(node);
                let remaining = self.cooldowns.get(&key).copied().unwrap_or(0.0);
                if remaining > 0.0 {
                    self.cooldowns.insert(key, remaining - self.delta_time);
                    return Ok(BtStatus::Failure);
                }
                let status = self.tick_node(child)?;
                if status == BtStatus::Success {
                    self.cooldowns.insert(key, *seconds);
                }
                Ok(status)
            }
            IrNodeKind::While { cond, body } => {
                if self.eval_condition(cond)? {
                    self.tick_node(body)
                } else {
                    Ok(BtStatus::Success)
                }
            }
            IrNodeKind::Reactive { cond, body } => {
                if self.eval_condition(cond)? {
                    self.tick_node(body)
                } else {
                    self.clear_running_state(body);
                    Ok(BtStatus::Failure)
                }
            }
            IrNodeKind::TreeRef { name } => {
                let tree = self
                    .trees
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RuntimeError::UnknownTree(name.clone()))?;
                self.tick_node(&tree)
            }
        }
    }

    fn tick_parallel(
        &mut self,
        policy: &ParallelPolicy,
        children: &[IrNode],
    ) -> Result<BtStatus, RuntimeError> {
        let mut succeeded = 0usize;
        let mut failed = 0usize;
        let mut running = 0usize;
        for child in children {
            match self.tick_node(child)? {
                BtStatus::Success => succeeded += 1,
                BtStatus::Failure => failed += 1,
                BtStatus::Running => running += 1,
            }
        }
        let status = match policy {
            ParallelPolicy::Any => {
                if succeeded > 0 {
                    BtStatus::Success
                } else if running > 0 {
                    BtStatus::Running
                } else {
                    BtStatus::Failure
                }
            }
            ParallelPolicy::All => {
                if failed > 0 {
                    BtStatus::Failure
                } else if running > 0 {
                    BtStatus::Running
                } else {
                    BtStatus::Success
                }
            }
            ParallelPolicy::N(n) => {
                let n = *n as usize;
                if succeeded >= n {
                    BtStatus::Success
                } else if failed > children.len().saturating_sub(n) {
                    BtStatus::Failure
                } else {
                    BtStatus::Running
                }
            }
        };
        Ok(status)
    }

    fn eval_condition(&mut self, expr: &crisp_ir::IrExpr) -> Result<bool, RuntimeError> {
        match self.eval(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::NonBoolCondition(other.type_name())),
        }
    }

    /// Drops accumulated running state (timeout accumulators) for a subtree,
    /// used when a reactive condition cancels its body.
    fn clear_running_state(&mut self, node: &IrNode) {
        self.timeouts.remove(&state_key(node));
        for child in node.children() {
            self.clear_running_state(child);
        }
    }
}
