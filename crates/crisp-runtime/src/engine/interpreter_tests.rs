use std::cell::Cell;
use std::rc::Rc;

use crisp_core::{
    AccessError, BtStatus, CrispType, DynamicObject, MemberPath, NodeId, ObjectHandle,
    TickContext, Value,
};
use crisp_ir::{
    BinaryOp, IrExpr, IrExprKind, IrModule, IrNode, IrNodeKind, Literal, LogicOp, MethodRef,
    ParallelPolicy,
};

use super::{Interpreter, RuntimeError};

fn node(id: u32, kind: IrNodeKind) -> IrNode {
    IrNode::new(NodeId(id), kind)
}

fn expr(id: u32, kind: IrExprKind) -> IrExpr {
    IrExpr::new(NodeId(id), kind)
}

fn lit(id: u32, literal: Literal) -> IrExpr {
    expr(id, IrExprKind::Literal(literal))
}

fn action(id: u32, method: &str) -> IrNode {
    node(
        id,
        IrNodeKind::Action {
            method: MethodRef::new(MemberPath::parse(method).unwrap()),
            args: Vec::new(),
        },
    )
}

/// A method that returns the scripted statuses in order, repeating the last.
fn scripted(
    statuses: &[BtStatus],
) -> impl FnMut(&[Value]) -> Result<Value, AccessError> + 'static {
    let script: Vec<BtStatus> = statuses.to_vec();
    let index = Cell::new(0usize);
    move |_args| {
        let i = index.get();
        let status = script[i.min(script.len() - 1)];
        index.set(i + 1);
        Ok(Value::Status(status))
    }
}

/// A counting method that always returns the given status.
fn counting(
    counter: Rc<Cell<u32>>,
    status: BtStatus,
) -> impl FnMut(&[Value]) -> Result<Value, AccessError> + 'static {
    move |_args| {
        counter.set(counter.get() + 1);
        Ok(Value::Status(status))
    }
}

fn interp(context: DynamicObject) -> Interpreter {
    Interpreter::new(context.into_handle())
}

fn dt(delta: f32) -> TickContext {
    TickContext::new(delta)
}

#[test]
fn selector_returns_first_non_failure() {
    let context = DynamicObject::new()
        .with_method("A", scripted(&[BtStatus::Failure]))
        .with_method("B", scripted(&[BtStatus::Running]))
        .with_method("C", scripted(&[BtStatus::Success]));
    let tree = node(
        0,
        IrNodeKind::Selector {
            children: vec![action(1, ".A"), action(2, ".B"), action(3, ".C")],
        },
    );
    let mut it = interp(context);
    assert_eq!(it.tick(&tree, &dt(0.1)).unwrap(), BtStatus::Running);
}

#[test]
fn selector_fails_when_all_fail() {
    let context = DynamicObject::new()
        .with_method("A", scripted(&[BtStatus::Failure]))
        .with_method("B", scripted(&[BtStatus::Failure]));
    let tree = node(
        0,
        IrNodeKind::Selector {
            children: vec![action(1, ".A"), action(2, ".B")],
        },
    );
    assert_eq!(
        interp(context).tick(&tree, &dt(0.1)).unwrap(),
        BtStatus::Failure
    );
}

#[test]
fn sequence_returns_first_non_success() {
    let stopped = Rc::new(Cell::new(0));
    let context = DynamicObject::new()
        .with_method("A", scripted(&[BtStatus::Success]))
        .with_method("B", scripted(&[BtStatus::Failure]))
        .with_method("C", counting(stopped.clone(), BtStatus::Success));
    let tree = node(
        0,
        IrNodeKind::Sequence {
            children: vec![action(1, ".A"), action(2, ".B"), action(3, ".C")],
        },
    );
    assert_eq!(
        interp(context).tick(&tree, &dt(0.1)).unwrap(),
        BtStatus::Failure
    );
    // The child after the failure was never ticked.
    assert_eq!(stopped.get(), 0);
}

#[test]
fn parallel_any_succeeds_if_any_succeeded() {
    let context = DynamicObject::new()
        .with_method("A", scripted(&[BtStatus::Running]))
        .with_method("B", scripted(&[BtStatus::Success]))
        .with_method("C", scripted(&[BtStatus::Failure]));
    let tree = node(
        0,
        IrNodeKind::Parallel {
            policy: ParallelPolicy::Any,
            children: vec![action(1, ".A"), action(2, ".B"), action(3, ".C")],
        },
    );
    assert_eq!(
        interp(context).tick(&tree, &dt(0.1)).unwrap(),
        BtStatus::Success
    );
}

#[test]
fn parallel_all_fails_if_any_failed() {
    let context = DynamicObject::new()
        .with_method("A", scripted(&[BtStatus::Running]))
        .with_method("B", scripted(&[BtStatus::Success]))
        .with_method("C", scripted(&[BtStatus::Failure]));
    let tree = node(
        0,
        IrNodeKind::Parallel {
            policy: ParallelPolicy::All,
            children: vec![action(1, ".A"), action(2, ".B"), action(3, ".C")],
        },
    );
    assert_eq!(
        interp(context).tick(&tree, &dt(0.1)).unwrap(),
        BtStatus::Failure
    );
}

#[test]
fn parallel_all_runs_while_nothing_failed() {
    let context = DynamicObject::new()
        .with_method("A", scripted(&[BtStatus::Success]))
        .with_method("B", scripted(&[BtStatus::Running]))
        .with_method("C", scripted(&[BtStatus::Success]));
    let tree = node(
        0,
        IrNodeKind::Parallel {
            policy: ParallelPolicy::All,
            children: vec![action(1, ".A"), action(2, ".B"), action(3, ".C")],
        },
    );
    assert_eq!(
        interp(context).tick(&tree, &dt(0.1)).unwrap(),
        BtStatus::Running
    );
}

#[test]
fn parallel_n_counts_successes_and_failures() {
    let build = |a: BtStatus, b: BtStatus, c: BtStatus| {
        let context = DynamicObject::new()
            .with_method("A", scripted(&[a]))
            .with_method("B", scripted(&[b]))
            .with_method("C", scripted(&[c]));
        let tree = node(
            0,
            IrNodeKind::Parallel {
                policy: ParallelPolicy::N(2),
                children: vec![action(1, ".A"), action(2, ".B"), action(3, ".C")],
            },
        );
        interp(context).tick(&tree, &dt(0.1)).unwrap()
    };
    assert_eq!(
        build(BtStatus::Success, BtStatus::Success, BtStatus::Running),
        BtStatus::Success
    );
    // Two failures leave fewer than two possible successes.
    assert_eq!(
        build(BtStatus::Failure, BtStatus::Failure, BtStatus::Success),
        BtStatus::Failure
    );
    assert_eq!(
        build(BtStatus::Success, BtStatus::Running, BtStatus::Failure),
        BtStatus::Running
    );
}

#[test]
fn condition_evaluates_against_the_context() {
    let cond = |health: f64| {
        let context = DynamicObject::new().with_property("Health", health);
        let tree = node(
            0,
            IrNodeKind::Condition {
                expr: expr(
                    1,
                    IrExprKind::Binary {
                        op: BinaryOp::Lt,
                        lhs: Box::new(expr(
                            2,
                            IrExprKind::MemberLoad(MemberPath::parse(".Health").unwrap()),
                        )),
                        rhs: Box::new(lit(3, Literal::Int(30)).converted(CrispType::Float)),
                    },
                ),
            },
        );
        interp(context).tick(&tree, &dt(0.1)).unwrap()
    };
    assert_eq!(cond(25.0), BtStatus::Success);
    assert_eq!(cond(35.0), BtStatus::Failure);
}

#[test]
fn invert_swaps_success_and_failure() {
    let context = DynamicObject::new()
        .with_method("Fail", scripted(&[BtStatus::Failure]))
        .with_method("Run", scripted(&[BtStatus::Running]));
    let inverted_fail = node(
        0,
        IrNodeKind::Invert {
            child: Box::new(action(1, ".Fail")),
        },
    );
    let inverted_run = node(
        2,
        IrNodeKind::Invert {
            child: Box::new(action(3, ".Run")),
        },
    );
    let mut it = interp(context);
    assert_eq!(it.tick(&inverted_fail, &dt(0.1)).unwrap(), BtStatus::Success);
    assert_eq!(it.tick(&inverted_run, &dt(0.1)).unwrap(), BtStatus::Running);
}

#[test]
fn repeat_ticks_the_child_n_times() {
    let calls = Rc::new(Cell::new(0));
    let context =
        DynamicObject::new().with_method("Step", counting(calls.clone(), BtStatus::Success));
    let tree = node(
        0,
        IrNodeKind::Repeat {
            count: 3,
            child: Box::new(action(1, ".Step")),
        },
    );
    assert_eq!(
        interp(context).tick(&tree, &dt(0.1)).unwrap(),
        BtStatus::Success
    );
    assert_eq!(calls.get(), 3);
}

#[test]
fn repeat_stops_at_the_first_non_success() {
    let context = DynamicObject::new().with_method(
        "Step",
        scripted(&[BtStatus::Success, BtStatus::Failure, BtStatus::Success]),
    );
    let tree = node(
        0,
        IrNodeKind::Repeat {
            count: 3,
            child: Box::new(action(1, ".Step")),
        },
    );
    assert_eq!(
        interp(context).tick(&tree, &dt(0.1)).unwrap(),
        BtStatus::Failure
    );
}

#[test]
fn timeout_fails_once_the_budget_is_spent() {
    let context = DynamicObject::new().with_method("Wait", scripted(&[BtStatus::Running]));
    let tree = node(
        0,
        IrNodeKind::Timeout {
            seconds: 1.0,
            child: Box::new(action(1, ".Wait")),
        },
    );
    let mut it = interp(context);
    assert_eq!(it.tick(&tree, &dt(0.4)).unwrap(), BtStatus::Running);
    assert_eq!(it.tick(&tree, &dt(0.4)).unwrap(), BtStatus::Running);
    assert_eq!(it.tick(&tree, &dt(0.3)).unwrap(), BtStatus::Failure);
    // The accumulator was cleared on failure; the next tick starts over.
    assert_eq!(it.tick(&tree, &dt(0.4)).unwrap(), BtStatus::Running);
}

#[test]
fn timeout_passes_through_a_finished_child() {
    let context = DynamicObject::new().with_method(
        "Work",
        scripted(&[BtStatus::Running, BtStatus::Success]),
    );
    let tree = node(
        0,
        IrNodeKind::Timeout {
            seconds: 10.0,
            child: Box::new(action(1, ".Work")),
        },
    );
    let mut it = interp(context);
    assert_eq!(it.tick(&tree, &dt(0.1)).unwrap(), BtStatus::Running);
    assert_eq!(it.tick(&tree, &dt(0.1)).unwrap(), BtStatus::Success);
}

#[test]
fn cooldown_gates_after_a_success() {
    let context = DynamicObject::new().with_method("Fire", scripted(&[BtStatus::Success]));
    let tree = node(
        0,
        IrNodeKind::Cooldown {
            seconds: 2.0,
            child: Box::new(action(1, ".Fire")),
        },
    );
    let mut it = interp(context);
    assert_eq!(it.tick(&tree, &dt(0.5)).unwrap(), BtStatus::Success);
    // Failure until 2.0s of delta time have been subtracted.
    assert_eq!(it.tick(&tree, &dt(0.5)).unwrap(), BtStatus::Failure);
    assert_eq!(it.tick(&tree, &dt(0.5)).unwrap(), BtStatus::Failure);
    assert_eq!(it.tick(&tree, &dt(0.5)).unwrap(), BtStatus::Failure);
    assert_eq!(it.tick(&tree, &dt(0.5)).unwrap(), BtStatus::Failure);
    assert_eq!(it.tick(&tree, &dt(0.5)).unwrap(), BtStatus::Success);
}

#[test]
fn reset_clears_decorator_state() {
    let context = DynamicObject::new().with_method("Fire", scripted(&[BtStatus::Success]));
    let tree = node(
        0,
        IrNodeKind::Cooldown {
            seconds: 60.0,
            child: Box::new(action(1, ".Fire")),
        },
    );
    let mut it = interp(context);
    assert_eq!(it.tick(&tree, &dt(0.1)).unwrap(), BtStatus::Success);
    assert_eq!(it.tick(&tree, &dt(0.1)).unwrap(), BtStatus::Failure);
    it.reset();
    assert_eq!(it.tick(&tree, &dt(0.1)).unwrap(), BtStatus::Success);
}

#[test]
fn guard_gates_its_body() {
    let run = |armed: bool| {
        let context = DynamicObject::new()
            .with_property("Armed", armed)
            .with_method("Fire", scripted(&[BtStatus::Success]));
        let tree = node(
            0,
            IrNodeKind::Guard {
                cond: expr(1, IrExprKind::MemberLoad(MemberPath::parse(".Armed").unwrap())),
                body: Box::new(action(2, ".Fire")),
            },
        );
        interp(context).tick(&tree, &dt(0.1)).unwrap()
    };
    assert_eq!(run(true), BtStatus::Success);
    assert_eq!(run(false), BtStatus::Failure);
}

#[test]
fn if_takes_the_matching_branch() {
    let run = |flag: bool, with_else: bool| {
        let context = DynamicObject::new()
            .with_property("Flag", flag)
            .with_method("Then", scripted(&[BtStatus::Success]))
            .with_method("Else", scripted(&[BtStatus::Running]));
        let tree = node(
            0,
            IrNodeKind::If {
                cond: expr(1, IrExprKind::MemberLoad(MemberPath::parse(".Flag").unwrap())),
                then: Box::new(action(2, ".Then")),
                otherwise: with_else.then(|| Box::new(action(3, ".Else"))),
            },
        );
        interp(context).tick(&tree, &dt(0.1)).unwrap()
    };
    assert_eq!(run(true, true), BtStatus::Success);
    assert_eq!(run(false, true), BtStatus::Running);
    assert_eq!(run(false, false), BtStatus::Failure);
}

#[test]
fn while_succeeds_when_the_condition_is_false() {
    let calls = Rc::new(Cell::new(0));
    let context = DynamicObject::new()
        .with_property("Busy", false)
        .with_method("Work", counting(calls.clone(), BtStatus::Running));
    let tree = node(
        0,
        IrNodeKind::While {
            cond: expr(1, IrExprKind::MemberLoad(MemberPath::parse(".Busy").unwrap())),
            body: Box::new(action(2, ".Work")),
        },
    );
    assert_eq!(
        interp(context).tick(&tree, &dt(0.1)).unwrap(),
        BtStatus::Success
    );
    assert_eq!(calls.get(), 0);
}

#[test]
fn reactive_cancels_and_clears_running_state() {
    let context = Rc::new(std::cell::RefCell::new(
        DynamicObject::new()
            .with_property("Go", true)
            .with_method("Wait", scripted(&[BtStatus::Running])),
    ));
    let handle: ObjectHandle = context.clone();
    let tree = node(
        0,
        IrNodeKind::Reactive {
            cond: expr(1, IrExprKind::MemberLoad(MemberPath::parse(".Go").unwrap())),
            body: Box::new(node(
                2,
                IrNodeKind::Timeout {
                    seconds: 1.0,
                    child: Box::new(action(3, ".Wait")),
                },
            )),
        },
    );
    let mut it = Interpreter::new(handle.clone());

    assert_eq!(it.tick(&tree, &dt(0.4)).unwrap(), BtStatus::Running);
    assert_eq!(it.tick(&tree, &dt(0.4)).unwrap(), BtStatus::Running);

    // Condition drops: the body's accumulated time is discarded.
    context.borrow_mut().set("Go", false);
    assert_eq!(it.tick(&tree, &dt(0.4)).unwrap(), BtStatus::Failure);

    context.borrow_mut().set("Go", true);
    assert_eq!(it.tick(&tree, &dt(0.4)).unwrap(), BtStatus::Running);
    assert_eq!(it.tick(&tree, &dt(0.4)).unwrap(), BtStatus::Running);
    assert_eq!(it.tick(&tree, &dt(0.4)).unwrap(), BtStatus::Failure);
}

#[test]
fn tree_returns_the_last_child_status_and_empty_is_success() {
    let context = DynamicObject::new()
        .with_method("A", scripted(&[BtStatus::Failure]))
        .with_method("B", scripted(&[BtStatus::Running]));
    let tree = node(
        0,
        IrNodeKind::Tree {
            name: "T".to_string(),
            body: vec![action(1, ".A"), action(2, ".B")],
        },
    );
    let empty = node(
        3,
        IrNodeKind::Tree {
            name: "E".to_string(),
            body: Vec::new(),
        },
    );
    let mut it = interp(context);
    assert_eq!(it.tick(&tree, &dt(0.1)).unwrap(), BtStatus::Running);
    assert_eq!(it.tick(&empty, &dt(0.1)).unwrap(), BtStatus::Success);
}

#[test]
fn tree_refs_resolve_through_the_registry() {
    let context = DynamicObject::new().with_method("Help", scripted(&[BtStatus::Success]));
    let mut module = IrModule::new();
    module.insert(node(
        0,
        IrNodeKind::Tree {
            name: "Main".to_string(),
            body: vec![node(
                1,
                IrNodeKind::TreeRef {
                    name: "Helper".to_string(),
                },
            )],
        },
    ));
    module.insert(node(
        2,
        IrNodeKind::Tree {
            name: "Helper".to_string(),
            body: vec![action(3, ".Help")],
        },
    ));
    let mut it = interp(context).with_module(&module);
    assert_eq!(it.tick_tree("Main", &dt(0.1)).unwrap(), BtStatus::Success);

    assert!(matches!(
        it.tick_tree("Ghost", &dt(0.1)),
        Err(RuntimeError::UnknownTree(_))
    ));
}

#[test]
fn unknown_ref_inside_a_tree_fails_the_tick() {
    let tree = node(
        0,
        IrNodeKind::Tree {
            name: "Main".to_string(),
            body: vec![node(
                1,
                IrNodeKind::TreeRef {
                    name: "Nowhere".to_string(),
                },
            )],
        },
    );
    let mut it = interp(DynamicObject::new());
    assert!(matches!(
        it.tick(&tree, &dt(0.1)),
        Err(RuntimeError::UnknownTree(_))
    ));
}

#[test]
fn blackboard_loads_require_a_blackboard() {
    let cond = node(
        0,
        IrNodeKind::Condition {
            expr: expr(
                1,
                IrExprKind::BlackboardLoad(MemberPath::parse("$.Ready").unwrap()),
            ),
        },
    );

    let board = DynamicObject::new().with_property("Ready", true);
    let mut with_board =
        Interpreter::new(DynamicObject::new().into_handle()).with_blackboard(board.into_handle());
    assert_eq!(with_board.tick(&cond, &dt(0.1)).unwrap(), BtStatus::Success);

    let mut without = interp(DynamicObject::new());
    assert!(matches!(
        without.tick(&cond, &dt(0.1)),
        Err(RuntimeError::BlackboardMissing)
    ));
}

#[test]
fn member_chains_navigate_objects_and_null_short_circuits() {
    let enemy = DynamicObject::new().with_property("Distance", 5.0);
    let context = DynamicObject::new()
        .with_property("Target", Value::Object(enemy.into_handle()));
    let cond = node(
        0,
        IrNodeKind::Condition {
            expr: expr(
                1,
                IrExprKind::Binary {
                    op: BinaryOp::Gt,
                    lhs: Box::new(expr(
                        2,
                        IrExprKind::MemberLoad(MemberPath::parse(".Target.Distance").unwrap()),
                    )),
                    rhs: Box::new(lit(3, Literal::Float(1.0))),
                },
            ),
        },
    );
    assert_eq!(
        interp(context).tick(&cond, &dt(0.1)).unwrap(),
        BtStatus::Success
    );

    // A null link short-circuits the load; `!= null` is then false.
    let context = DynamicObject::new().with_property("Target", Value::Null);
    let null_check = node(
        4,
        IrNodeKind::Condition {
            expr: expr(
                5,
                IrExprKind::Binary {
                    op: BinaryOp::Ne,
                    lhs: Box::new(expr(
                        6,
                        IrExprKind::MemberLoad(MemberPath::parse(".Target.Distance").unwrap()),
                    )),
                    rhs: Box::new(lit(7, Literal::Null)),
                },
            ),
        },
    );
    assert_eq!(
        interp(context).tick(&null_check, &dt(0.1)).unwrap(),
        BtStatus::Failure
    );
}

#[test]
fn missing_members_and_methods_are_runtime_errors() {
    let cond = node(
        0,
        IrNodeKind::Condition {
            expr: expr(1, IrExprKind::MemberLoad(MemberPath::parse(".Ghost").unwrap())),
        },
    );
    let mut it = interp(DynamicObject::new());
    assert!(matches!(
        it.tick(&cond, &dt(0.1)),
        Err(RuntimeError::MissingMember { .. })
    ));

    let act = action(2, ".Vanish");
    assert!(matches!(
        it.tick(&act, &dt(0.1)),
        Err(RuntimeError::Access(AccessError::MissingMethod(_)))
    ));
}

#[test]
fn actions_must_return_a_status() {
    let context =
        DynamicObject::new().with_method("Number", |_args: &[Value]| Ok(Value::Float(1.0)));
    let act = action(0, ".Number");
    assert!(matches!(
        interp(context).tick(&act, &dt(0.1)),
        Err(RuntimeError::NotAStatus { .. })
    ));
}

#[test]
fn logic_operators_short_circuit() {
    let calls = Rc::new(Cell::new(0));
    let inner = calls.clone();
    let context = DynamicObject::new().with_method("Probe", move |_args: &[Value]| {
        inner.set(inner.get() + 1);
        Ok(Value::Bool(true))
    });
    let cond = node(
        0,
        IrNodeKind::Condition {
            expr: expr(
                1,
                IrExprKind::Logic {
                    op: LogicOp::Or,
                    operands: vec![
                        lit(2, Literal::Bool(true)),
                        expr(
                            3,
                            IrExprKind::Call {
                                method: MethodRef::new(MemberPath::parse(".Probe").unwrap()),
                                args: Vec::new(),
                            },
                        ),
                    ],
                },
            ),
        },
    );
    assert_eq!(
        interp(context).tick(&cond, &dt(0.1)).unwrap(),
        BtStatus::Success
    );
    assert_eq!(calls.get(), 0);
}

#[test]
fn division_by_zero_fails_the_tick() {
    let cond = node(
        0,
        IrNodeKind::Condition {
            expr: expr(
                1,
                IrExprKind::Binary {
                    op: BinaryOp::Gt,
                    lhs: Box::new(expr(
                        2,
                        IrExprKind::Binary {
                            op: BinaryOp::Div,
                            lhs: Box::new(lit(3, Literal::Int(1))),
                            rhs: Box::new(lit(4, Literal::Int(0))),
                        },
                    )),
                    rhs: Box::new(lit(5, Literal::Int(1))),
                },
            ),
        },
    );
    let mut it = interp(DynamicObject::new());
    assert!(matches!(
        it.tick(&cond, &dt(0.1)),
        Err(RuntimeError::DivisionByZero)
    ));
}
