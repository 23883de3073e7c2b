use crate::errors::EvalError;
use crate::scope::Scope;
use crate::value::{Deferred, Value};

/// Longest string `*` may produce, in bytes.
pub const MAX_REPEAT_BYTES: usize = 16 * 1024 * 1024;

/// Binary operators of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Self::Add),
            "-" => Some(Self::Sub),
            "*" => Some(Self::Mul),
            "/" => Some(Self::Div),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

/// Apply `op` to two operands.
///
/// A deferred operand yields a new deferred value when `deferred` is set and is
/// forced against `scope` otherwise.
pub fn apply(
    op: Operator,
    left: Value,
    right: Value,
    scope: &Scope,
    deferred: bool,
) -> Result<Value, EvalError> {
    if left.is_deferred() || right.is_deferred() {
        if deferred {
            return Ok(Value::Deferred(Deferred::new(move |scope: &Scope| {
                let left = left.clone().force(scope)?;
                let right = right.clone().force(scope)?;
                apply(op, left, right, scope, false)
            })));
        }
        let left = left.force(scope)?;
        let right = right.force(scope)?;
        return apply(op, left, right, scope, false);
    }

    match left {
        Value::Int(left) => integer(op, left, right),
        Value::Float(left) => float(op, left, right),
        Value::Str(left) => string(op, left, right),
        Value::Bool(left) => match op {
            Operator::Add => string(op, left.to_string(), right),
            _ => Err(incompatible(op, "boolean", &right)),
        },
        other => Err(incompatible(op, other.type_name(), &right)),
    }
}

fn integer(op: Operator, left: i64, right: Value) -> Result<Value, EvalError> {
    let right = match right {
        Value::Int(right) => right,
        Value::Float(right) => return float_op(op, left as f64, right),
        other => return Err(incompatible(op, "integer", &other)),
    };

    let overflow = || EvalError::Arithmetic(format!("{left} {} {right} overflows", op.as_str()));
    let value = match op {
        Operator::Add => left.checked_add(right).ok_or_else(overflow)?,
        Operator::Sub => left.checked_sub(right).ok_or_else(overflow)?,
        Operator::Mul => left.checked_mul(right).ok_or_else(overflow)?,
        Operator::Div => {
            if right == 0 {
                return Err(EvalError::Arithmetic("division by zero".to_string()));
            }
            if left.checked_rem(right) != Some(0) {
                return Ok(Value::Float(left as f64 / right as f64));
            }
            left.checked_div(right).ok_or_else(overflow)?
        }
    };
    Ok(Value::Int(value))
}

fn float(op: Operator, left: f64, right: Value) -> Result<Value, EvalError> {
    match right {
        Value::Int(right) => float_op(op, left, right as f64),
        Value::Float(right) => float_op(op, left, right),
        other => Err(incompatible(op, "decimal", &other)),
    }
}

fn float_op(op: Operator, left: f64, right: f64) -> Result<Value, EvalError> {
    let value = match op {
        Operator::Add => left + right,
        Operator::Sub => left - right,
        Operator::Mul => left * right,
        Operator::Div => {
            if right == 0.0 {
                return Err(EvalError::Arithmetic("division by zero".to_string()));
            }
            left / right
        }
    };
    Ok(Value::Float(value))
}

fn string(op: Operator, left: String, right: Value) -> Result<Value, EvalError> {
    match op {
        Operator::Add => match stringify(&right) {
            Some(right) => Ok(Value::Str(left + &right)),
            None => Err(incompatible(op, "string", &right)),
        },
        Operator::Mul => match right {
            Value::Int(times) => {
                let length = usize::try_from(times)
                    .ok()
                    .and_then(|count| left.len().checked_mul(count).map(|len| (count, len)));
                match length {
                    Some((count, len)) if len <= MAX_REPEAT_BYTES => {
                        Ok(Value::Str(left.repeat(count)))
                    }
                    _ => Err(EvalError::Arithmetic(format!(
                        "cannot repeat a string {times} times"
                    ))),
                }
            }
            other => Err(incompatible(op, "string", &other)),
        },
        Operator::Sub | Operator::Div => Err(incompatible(op, "string", &right)),
    }
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Str(value) => Some(value.clone()),
        Value::Int(value) => Some(value.to_string()),
        Value::Float(value) => Some(value.to_string()),
        Value::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}

fn incompatible(op: Operator, left: &'static str, right: &Value) -> EvalError {
    EvalError::IncompatibleOperands {
        op: op.as_str(),
        left,
        right: right.type_name(),
    }
}
