//! IR expression evaluation against the runtime context.

use crisp_core::{BtStatus, CrispType, MemberPath, ObjectHandle, Value};
use crisp_ir::{BinaryOp, IrExpr, IrExprKind, Literal, LogicOp, UnaryOp};

use super::error::RuntimeError;
use super::interpreter::Interpreter;

impl Interpreter {
    pub(super) fn eval(&mut self, expr: &IrExpr) -> Result<Value, RuntimeError> {
        match &expr.kind {
            IrExprKind::Literal(lit) => Ok(literal_value(lit)),
            IrExprKind::MemberLoad(path) => {
                let root = self.context();
                load_path(&root, path, "context")
            }
            IrExprKind::BlackboardLoad(path) => {
                let root = self.blackboard().ok_or(RuntimeError::BlackboardMissing)?;
                load_path(&root, path, "blackboard")
            }
            IrExprKind::Binary { op, lhs, rhs } => {
                let left = self.eval(lhs)?;
                let right = self.eval(rhs)?;
                binary(*op, left, right)
            }
            IrExprKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => match value {
                        Value::Bool(b) => Ok(Value::Bool(!b)),
                        other => Err(RuntimeError::InvalidOperands {
                            op: "not",
                            lhs: other.type_name(),
                            rhs: "-",
                        }),
                    },
                    UnaryOp::Neg => match value {
                        Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
                        Value::Float(f) => Ok(Value::Float(-f)),
                        other => Err(RuntimeError::InvalidOperands {
                            op: "-",
                            lhs: other.type_name(),
                            rhs: "-",
                        }),
                    },
                }
            }
            IrExprKind::Logic { op, operands } => {
                // Short-circuit left to right.
                let (early, name) = match op {
                    LogicOp::And => (false, "and"),
                    LogicOp::Or => (true, "or"),
                };
                for operand in operands {
                    let value = self.eval(operand)?;
                    let Value::Bool(b) = value else {
                        return Err(RuntimeError::InvalidOperands {
                            op: name,
                            lhs: value.type_name(),
                            rhs: "Bool",
                        });
                    };
                    if b == early {
                        return Ok(Value::Bool(early));
                    }
                }
                Ok(Value::Bool(!early))
            }
            IrExprKind::Call { method, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                self.invoke(&method.path, &values)
            }
            IrExprKind::Convert { operand, target } => {
                let value = self.eval(operand)?;
                convert(value, target)
            }
        }
    }

    /// Walks the navigation prefix and invokes the final method segment.
    pub(super) fn invoke(
        &mut self,
        path: &MemberPath,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let mut receiver = self.context();
        for segment in path.prefix() {
            let value = receiver.borrow().get(segment);
            match value {
                None => {
                    return Err(RuntimeError::MissingMember {
                        member: segment.clone(),
                        on: "context",
                    });
                }
                Some(Value::Object(obj)) => receiver = obj,
                Some(Value::Null) => {
                    return Err(RuntimeError::NullReceiver {
                        method: path.last().to_string(),
                    });
                }
                Some(other) => {
                    return Err(RuntimeError::MemberOnValue {
                        member: segment.clone(),
                        found: other.type_name(),
                    });
                }
            }
        }
        let result = receiver.borrow_mut().call(path.last(), args)?;
        Ok(result)
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Str(s) => Value::Str(s.clone()),
        Literal::Enum { ty, member } => Value::Enum {
            ty: ty.clone(),
            member: member.clone(),
        },
        Literal::Null => Value::Null,
    }
}

/// Walks a member chain: property/field reads at each segment, null
/// short-circuits, unknown segments are runtime errors.
fn load_path(
    root: &ObjectHandle,
    path: &MemberPath,
    on: &'static str,
) -> Result<Value, RuntimeError> {
    let mut current = Value::Object(root.clone());
    for segment in path.iter() {
        match current {
            Value::Null => return Ok(Value::Null),
            Value::Object(obj) => {
                let value = obj.borrow().get(segment);
                match value {
                    Some(v) => current = v,
                    None => {
                        return Err(RuntimeError::MissingMember {
                            member: segment.clone(),
                            on,
                        });
                    }
                }
            }
            other => {
                return Err(RuntimeError::MemberOnValue {
                    member: segment.clone(),
                    found: other.type_name(),
                });
            }
        }
    }
    Ok(current)
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    if op.is_equality() {
        let equal = lhs == rhs;
        return Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }));
    }

    if op.is_arithmetic() {
        return match (&lhs, &rhs) {
            (Value::Int(a), Value::Int(b)) => int_arith(op, *a, *b),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let a = a.as_f64().expect("numeric");
                let b = b.as_f64().expect("numeric");
                float_arith(op, a, b)
            }
            _ => Err(invalid(op, &lhs, &rhs)),
        };
    }

    // Ordering comparisons: numeric with promotion, or same-type strings.
    let result = match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => compare(op, a.partial_cmp(b)),
        (a, b) if a.is_numeric() && b.is_numeric() => {
            let a = a.as_f64().expect("numeric");
            let b = b.as_f64().expect("numeric");
            compare(op, a.partial_cmp(&b))
        }
        (Value::Str(a), Value::Str(b)) => compare(op, a.partial_cmp(b)),
        _ => None,
    };
    result.ok_or_else(|| invalid(op, &lhs, &rhs))
}

fn invalid(op: BinaryOp, lhs: &Value, rhs: &Value) -> RuntimeError {
    RuntimeError::InvalidOperands {
        op: op.symbol(),
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    }
}

fn compare(op: BinaryOp, ordering: Option<std::cmp::Ordering>) -> Option<Value> {
    let ordering = ordering?;
    let result = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => return None,
    };
    Some(Value::Bool(result))
}

fn int_arith(op: BinaryOp, a: i64, b: i64) -> Result<Value, RuntimeError> {
    let value = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            a.wrapping_div(b)
        }
        BinaryOp::Rem => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            a.wrapping_rem(b)
        }
        _ => unreachable!("arithmetic operator"),
    };
    Ok(Value::Int(value))
}

fn float_arith(op: BinaryOp, a: f64, b: f64) -> Result<Value, RuntimeError> {
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
        _ => unreachable!("arithmetic operator"),
    };
    Ok(Value::Float(value))
}

fn convert(value: Value, target: &CrispType) -> Result<Value, RuntimeError> {
    match target {
        CrispType::Float => value
            .as_f64()
            .map(Value::Float)
            .ok_or_else(|| conversion_error(&value, target)),
        CrispType::Int => match &value {
            Value::Int(i) => Ok(Value::Int(*i)),
            Value::Float(f) => Ok(Value::Int(*f as i64)),
            _ => Err(conversion_error(&value, target)),
        },
        CrispType::String => Ok(Value::Str(match &value {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        })),
        CrispType::BtStatus => match &value {
            Value::Status(s) => Ok(Value::Status(*s)),
            Value::Bool(b) => Ok(Value::Status(BtStatus::from_bool(*b))),
            _ => Err(conversion_error(&value, target)),
        },
        _ => Err(conversion_error(&value, target)),
    }
}

fn conversion_error(value: &Value, target: &CrispType) -> RuntimeError {
    RuntimeError::InvalidConversion {
        from: value.type_name(),
        to: target.to_string(),
    }
}
