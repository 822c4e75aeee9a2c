//! Native expression evaluation ("compile and invoke").
//!
//! A tree-walking interpreter over [`Expr`]. Parameters are bound by identity
//! in a persistent scope chain, so closures and quoted expressions capture the
//! scope they were created in. Non-local control flow (goto, break, continue,
//! return) travels up the Rust stack as [`Flow::Jump`] until the block or loop
//! that owns the target label handles it.

use crate::expression::error::{ExecutionError, ExecutionResult};
use crate::expression::expr::{
    CatchBlock, ElementInit, Expr, LabelTarget, LambdaExpr, MemberBinding, Parameter, SwitchCase,
};
use crate::expression::operator::{BinaryOperator, UnaryOperator};
use crate::types::{Method, Type, TypeKind};
use crate::value::{Function, QuotedExpr, Value};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

struct Frame {
    bindings: Vec<(Parameter, Mutex<Value>)>,
    parent: Scope,
}

/// Immutable chain of binding frames. Cloning shares the frames; the bound
/// cells themselves are assignable.
#[derive(Clone, Default)]
pub struct Scope(Option<Arc<Frame>>);

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// New scope whose innermost frame holds `bindings`
    pub fn extend(&self, bindings: impl IntoIterator<Item = (Parameter, Value)>) -> Scope {
        Scope(Some(Arc::new(Frame {
            bindings: bindings
                .into_iter()
                .map(|(parameter, value)| (parameter, Mutex::new(value)))
                .collect(),
            parent: self.clone(),
        })))
    }

    fn find<T>(&self, parameter: &Parameter, f: impl FnOnce(&Mutex<Value>) -> T) -> Option<T> {
        let mut current = self.0.as_ref();
        while let Some(frame) = current {
            if let Some((_, cell)) = frame.bindings.iter().find(|(p, _)| p == parameter) {
                return Some(f(cell));
            }
            current = frame.parent.0.as_ref();
        }
        None
    }

    pub fn lookup(&self, parameter: &Parameter) -> Option<Value> {
        self.find(parameter, |cell| cell.lock().clone())
    }

    /// Returns false when the parameter is not bound anywhere in the chain
    pub fn assign(&self, parameter: &Parameter, value: Value) -> bool {
        self.find(parameter, |cell| *cell.lock() = value).is_some()
    }

    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.0.as_ref();
        while let Some(frame) = current {
            depth += 1;
            current = frame.parent.0.as_ref();
        }
        depth
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope(depth {})", self.depth())
    }
}

/// Why evaluation of a node did not produce a value
#[derive(Debug)]
enum Flow {
    Error(ExecutionError),
    Jump { target: LabelTarget, value: Value },
}

impl From<ExecutionError> for Flow {
    fn from(error: ExecutionError) -> Self {
        Flow::Error(error)
    }
}

impl Flow {
    fn into_error(self) -> ExecutionError {
        match self {
            Flow::Error(error) => error,
            Flow::Jump { target, .. } => ExecutionError::UnresolvedJump(target.to_string()),
        }
    }
}

type Eval<T> = Result<T, Flow>;

/// Evaluates a closed expression
pub fn evaluate(expr: &Expr) -> ExecutionResult<Value> {
    evaluate_in(expr, &Scope::default())
}

/// Evaluates an expression whose free parameters are bound in `scope`
pub fn evaluate_in(expr: &Expr, scope: &Scope) -> ExecutionResult<Value> {
    eval(expr, scope).map_err(Flow::into_error)
}

/// Turns a lambda into a closure over `scope`
pub fn compile_lambda(lambda: &LambdaExpr, scope: &Scope) -> Function {
    let parameters = lambda.parameters.clone();
    let body = lambda.body.clone();
    let scope = scope.clone();
    Function::new(parameters.len(), move |arguments| {
        let frame = scope.extend(parameters.iter().cloned().zip(arguments.iter().cloned()));
        eval(&body, &frame).map_err(Flow::into_error)
    })
}

/// Compiles a quoted lambda in the scope it was quoted in
pub fn compile_quoted(quoted: &QuotedExpr) -> ExecutionResult<Function> {
    match evaluate_in(&quoted.expr, &quoted.scope)? {
        Value::Function(function) => Ok(function),
        other => Err(ExecutionError::NotCallable(other.to_string())),
    }
}

/// Callable view of a closure or a quoted lambda
pub fn as_function(value: &Value) -> ExecutionResult<Function> {
    match value {
        Value::Function(function) => Ok(function.clone()),
        Value::Expression(quoted) => compile_quoted(quoted),
        other => Err(ExecutionError::NotCallable(other.to_string())),
    }
}

fn eval_all(exprs: &[Expr], scope: &Scope) -> Eval<Vec<Value>> {
    exprs.iter().map(|expr| eval(expr, scope)).collect()
}

fn eval_optional(expr: Option<&Expr>, scope: &Scope) -> Eval<Option<Value>> {
    expr.map(|e| eval(e, scope)).transpose()
}

fn eval(expr: &Expr, scope: &Scope) -> Eval<Value> {
    match expr {
        Expr::Constant { value, .. } => Ok(value.clone()),

        Expr::Parameter(parameter) => scope
            .lookup(parameter)
            .ok_or_else(|| ExecutionError::UnboundParameter(parameter.name().to_string()).into()),

        Expr::Member { instance, member } => {
            let instance = eval_optional(instance.as_deref(), scope)?;
            Ok(member.get(instance.as_ref())?)
        }

        Expr::Call {
            instance,
            method,
            arguments,
        } => {
            let instance = eval_optional(instance.as_deref(), scope)?;
            let arguments = eval_all(arguments, scope)?;
            Ok(method.invoke(instance.as_ref(), &arguments)?)
        }

        Expr::Binary {
            op,
            left,
            right,
            method,
            conversion,
        } => eval_binary(*op, left, right, method.as_ref(), conversion.as_ref(), scope),

        Expr::Unary {
            op,
            operand,
            ty,
            method,
        } => eval_unary(*op, operand, ty, method.as_ref(), scope),

        Expr::Conditional {
            test,
            if_true,
            if_false,
        } => match eval(test, scope)? {
            Value::Bool(true) => eval(if_true, scope),
            Value::Bool(false) => eval(if_false, scope),
            other => Err(ExecutionError::InvalidCast {
                value: other.to_string(),
                target: "Boolean".to_string(),
            }
            .into()),
        },

        Expr::Lambda(lambda) => Ok(Value::Function(compile_lambda(lambda, scope))),

        Expr::New {
            constructor,
            arguments,
            members,
        } => {
            let arguments = eval_all(arguments, scope)?;
            Ok(constructor.construct(arguments, members.as_deref())?)
        }

        Expr::NewArray { items, .. } => Ok(Value::Array(eval_all(items, scope)?)),

        Expr::ListInit { new, initializers } => {
            let list = eval(new, scope)?;
            apply_initializers(list, initializers, scope)
        }

        Expr::MemberInit { new, bindings } => {
            let target = eval(new, scope)?;
            apply_bindings(target, bindings, scope)
        }

        Expr::Block {
            ty,
            variables,
            expressions,
        } => eval_block(ty, variables, expressions, scope),

        Expr::TypeIs { operand, ty } => Ok(Value::Bool(eval(operand, scope)?.is_instance_of(ty))),

        Expr::Try {
            body,
            handlers,
            finally,
            fault,
            ..
        } => eval_try(body, handlers, finally.as_deref(), fault.as_deref(), scope),

        Expr::Switch {
            value,
            comparison,
            cases,
            default,
            ..
        } => eval_switch(value, comparison.as_ref(), cases, default.as_deref(), scope),

        Expr::Goto {
            kind,
            target,
            value,
        } => {
            let value = eval_optional(value.as_deref(), scope)?.unwrap_or(Value::Null);
            log::trace!("{:?} jump to {}", kind, target);
            Err(Flow::Jump {
                target: target.clone(),
                value,
            })
        }

        Expr::Label { default, .. } => Ok(eval_optional(default.as_deref(), scope)?.unwrap_or(Value::Null)),

        Expr::Loop {
            body,
            break_label,
            continue_label,
        } => loop {
            match eval(body, scope) {
                Ok(_) => {}
                Err(Flow::Jump { target, value }) => {
                    if break_label.as_ref() == Some(&target) {
                        return Ok(value);
                    }
                    if continue_label.as_ref() != Some(&target) {
                        return Err(Flow::Jump { target, value });
                    }
                }
                Err(error) => return Err(error),
            }
        },

        Expr::Invoke { target, arguments } => {
            let function = as_function(&eval(target, scope)?)?;
            let arguments = eval_all(arguments, scope)?;
            Ok(function.call(&arguments)?)
        }
    }
}

fn eval_binary(
    op: BinaryOperator,
    left: &Expr,
    right: &Expr,
    method: Option<&Method>,
    conversion: Option<&LambdaExpr>,
    scope: &Scope,
) -> Eval<Value> {
    match op {
        BinaryOperator::AndAlso => {
            return match eval(left, scope)? {
                Value::Bool(false) => Ok(Value::Bool(false)),
                Value::Bool(true) => logical_operand(op, eval(right, scope)?),
                // lifted: null && false is false, anything else null
                Value::Null => match eval(right, scope)? {
                    Value::Bool(false) => Ok(Value::Bool(false)),
                    _ => Ok(Value::Null),
                },
                other => Err(invalid_operands(op, &other, &Value::Null).into()),
            }
        }
        BinaryOperator::OrElse => {
            return match eval(left, scope)? {
                Value::Bool(true) => Ok(Value::Bool(true)),
                Value::Bool(false) => logical_operand(op, eval(right, scope)?),
                Value::Null => match eval(right, scope)? {
                    Value::Bool(true) => Ok(Value::Bool(true)),
                    _ => Ok(Value::Null),
                },
                other => Err(invalid_operands(op, &other, &Value::Null).into()),
            }
        }
        BinaryOperator::Coalesce => {
            let value = eval(left, scope)?;
            if value.is_null() {
                return eval(right, scope);
            }
            return match conversion {
                Some(conversion) => Ok(compile_lambda(conversion, scope).call(&[value])?),
                None => Ok(value),
            };
        }
        BinaryOperator::Assign => {
            let value = eval(right, scope)?;
            return match left {
                Expr::Parameter(parameter) => {
                    if scope.assign(parameter, value.clone()) {
                        Ok(value)
                    } else {
                        Err(ExecutionError::UnboundParameter(parameter.name().to_string()).into())
                    }
                }
                other => Err(ExecutionError::NotSupported(format!("assignment to {}", other)).into()),
            };
        }
        _ => {}
    }

    let left = eval(left, scope)?;
    let right = eval(right, scope)?;
    match method {
        Some(method) => Ok(method.invoke(None, &[left, right])?),
        None => Ok(apply_binary(op, left, right)?),
    }
}

fn logical_operand(op: BinaryOperator, value: Value) -> Eval<Value> {
    match value {
        Value::Bool(_) | Value::Null => Ok(value),
        other => Err(invalid_operands(op, &Value::Null, &other).into()),
    }
}

fn invalid_operands(op: BinaryOperator, left: &Value, right: &Value) -> ExecutionError {
    ExecutionError::InvalidOperandTypes {
        operator: op.as_str().to_string(),
        left: left.type_name(),
        right: right.type_name(),
    }
}

/// Applies a strict binary operator to two evaluated operands.
///
/// Arithmetic is lifted over null; comparisons against null are false except
/// equality, where null equals null.
pub fn apply_binary(op: BinaryOperator, left: Value, right: Value) -> ExecutionResult<Value> {
    use std::cmp::Ordering;

    match op {
        BinaryOperator::Equal => return Ok(Value::Bool(left == right)),
        BinaryOperator::NotEqual => return Ok(Value::Bool(left != right)),
        _ if op.is_comparison() => {
            if left.is_null() || right.is_null() {
                return Ok(Value::Bool(false));
            }
            let ordering = left
                .compare(&right)
                .ok_or_else(|| invalid_operands(op, &left, &right))?;
            return Ok(Value::Bool(match op {
                BinaryOperator::LessThan => ordering == Ordering::Less,
                BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
                BinaryOperator::GreaterThan => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }));
        }
        BinaryOperator::ArrayIndex => {
            let items = match &left {
                Value::Array(items) | Value::ArgumentList(items) => items,
                Value::Null => return Err(ExecutionError::NullReference("array index".to_string())),
                _ => return Err(invalid_operands(op, &left, &right)),
            };
            let index = right.as_i64().ok_or_else(|| invalid_operands(op, &left, &right))?;
            return usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or(ExecutionError::IndexOutOfRange {
                    index,
                    length: items.len(),
                });
        }
        _ => {}
    }

    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    if op == BinaryOperator::Add {
        if let (Value::String(_), _) | (_, Value::String(_)) = (&left, &right) {
            return Ok(Value::String(format!("{}{}", plain(&left), plain(&right))));
        }
    }

    match (&left, &right) {
        (Value::Bool(a), Value::Bool(b)) => match op {
            BinaryOperator::And | BinaryOperator::AndAlso => Ok(Value::Bool(*a && *b)),
            BinaryOperator::Or | BinaryOperator::OrElse => Ok(Value::Bool(*a || *b)),
            BinaryOperator::ExclusiveOr => Ok(Value::Bool(a ^ b)),
            _ => Err(invalid_operands(op, &left, &right)),
        },
        (Value::Int(a), Value::Int(b)) => int_op(op, *a, *b).ok_or_else(|| invalid_operands(op, &left, &right))?,
        (Value::Int(_) | Value::Long(_), Value::Int(_) | Value::Long(_)) => {
            match (left.as_i64(), right.as_i64()) {
                (Some(a), Some(b)) => {
                    long_op(op, a, b).ok_or_else(|| invalid_operands(op, &left, &right))?
                }
                _ => Err(invalid_operands(op, &left, &right)),
            }
        }
        (
            Value::Int(_) | Value::Long(_) | Value::Double(_),
            Value::Int(_) | Value::Long(_) | Value::Double(_),
        ) => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => double_op(op, a, b).ok_or_else(|| invalid_operands(op, &left, &right)),
            _ => Err(invalid_operands(op, &left, &right)),
        },
        _ => Err(invalid_operands(op, &left, &right)),
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Char(c) => c.to_string(),
        other => other.to_string(),
    }
}

fn int_op(op: BinaryOperator, a: i32, b: i32) -> Option<ExecutionResult<Value>> {
    Some(Ok(Value::Int(match op {
        BinaryOperator::Add => a.wrapping_add(b),
        BinaryOperator::Subtract => a.wrapping_sub(b),
        BinaryOperator::Multiply => a.wrapping_mul(b),
        BinaryOperator::Divide | BinaryOperator::Modulo if b == 0 => {
            return Some(Err(ExecutionError::DivisionByZero))
        }
        BinaryOperator::Divide => a.wrapping_div(b),
        BinaryOperator::Modulo => a.wrapping_rem(b),
        BinaryOperator::Power => return Some(Ok(Value::Double((a as f64).powf(b as f64)))),
        BinaryOperator::And => a & b,
        BinaryOperator::Or => a | b,
        BinaryOperator::ExclusiveOr => a ^ b,
        BinaryOperator::LeftShift => a.wrapping_shl(b as u32 & 31),
        BinaryOperator::RightShift => a.wrapping_shr(b as u32 & 31),
        _ => return None,
    })))
}

fn long_op(op: BinaryOperator, a: i64, b: i64) -> Option<ExecutionResult<Value>> {
    Some(Ok(Value::Long(match op {
        BinaryOperator::Add => a.wrapping_add(b),
        BinaryOperator::Subtract => a.wrapping_sub(b),
        BinaryOperator::Multiply => a.wrapping_mul(b),
        BinaryOperator::Divide | BinaryOperator::Modulo if b == 0 => {
            return Some(Err(ExecutionError::DivisionByZero))
        }
        BinaryOperator::Divide => a.wrapping_div(b),
        BinaryOperator::Modulo => a.wrapping_rem(b),
        BinaryOperator::Power => return Some(Ok(Value::Double((a as f64).powf(b as f64)))),
        BinaryOperator::And => a & b,
        BinaryOperator::Or => a | b,
        BinaryOperator::ExclusiveOr => a ^ b,
        BinaryOperator::LeftShift => a.wrapping_shl(b as u32 & 63),
        BinaryOperator::RightShift => a.wrapping_shr(b as u32 & 63),
        _ => return None,
    })))
}

fn double_op(op: BinaryOperator, a: f64, b: f64) -> Option<Value> {
    Some(Value::Double(match op {
        BinaryOperator::Add => a + b,
        BinaryOperator::Subtract => a - b,
        BinaryOperator::Multiply => a * b,
        BinaryOperator::Divide => a / b,
        BinaryOperator::Modulo => a % b,
        BinaryOperator::Power => a.powf(b),
        _ => return None,
    }))
}

fn eval_unary(
    op: UnaryOperator,
    operand: &Expr,
    ty: &Type,
    method: Option<&Method>,
    scope: &Scope,
) -> Eval<Value> {
    if op == UnaryOperator::Quote {
        return Ok(Value::Expression(QuotedExpr {
            expr: Arc::new(operand.clone()),
            scope: scope.clone(),
        }));
    }
    let value = eval(operand, scope)?;
    if op == UnaryOperator::Throw {
        return Err(ExecutionError::Thrown(value).into());
    }
    match method {
        Some(method) => Ok(method.invoke(None, &[value])?),
        None => Ok(apply_unary(op, value, ty)?),
    }
}

/// Applies a unary operator to an evaluated operand
pub fn apply_unary(op: UnaryOperator, value: Value, ty: &Type) -> ExecutionResult<Value> {
    let invalid = |value: &Value| ExecutionError::InvalidOperandTypes {
        operator: op.as_str().to_string(),
        left: value.type_name(),
        right: String::new(),
    };
    match op {
        UnaryOperator::Not => match value {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::Bool(!b)),
            Value::Int(i) => Ok(Value::Int(!i)),
            Value::Long(l) => Ok(Value::Long(!l)),
            other => Err(invalid(&other)),
        },
        UnaryOperator::Negate => match value {
            Value::Null => Ok(Value::Null),
            Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
            Value::Long(l) => Ok(Value::Long(l.wrapping_neg())),
            Value::Double(d) => Ok(Value::Double(-d)),
            other => Err(invalid(&other)),
        },
        UnaryOperator::UnaryPlus => match value {
            Value::Null | Value::Int(_) | Value::Long(_) | Value::Double(_) => Ok(value),
            other => Err(invalid(&other)),
        },
        UnaryOperator::Convert => convert(value, ty),
        UnaryOperator::TypeAs => Ok(if value.is_instance_of(ty) {
            value
        } else {
            Value::Null
        }),
        UnaryOperator::ArrayLength => match value {
            Value::Array(items) => Ok(Value::Int(items.len() as i32)),
            Value::Null => Err(ExecutionError::NullReference("Length".to_string())),
            other => Err(invalid(&other)),
        },
        UnaryOperator::Quote | UnaryOperator::Throw => Err(ExecutionError::NotSupported(format!(
            "{} on an evaluated value",
            op.as_str()
        ))),
    }
}

/// Explicit conversion of `value` to `ty`
pub fn convert(value: Value, ty: &Type) -> ExecutionResult<Value> {
    let invalid = |value: &Value| ExecutionError::InvalidCast {
        value: value.to_string(),
        target: ty.name().to_string(),
    };
    match (ty.kind(), value) {
        (_, Value::Null) => Ok(Value::Null),
        (TypeKind::Nullable(inner), value) => convert(value, inner),
        (TypeKind::Int32, Value::Int(i)) => Ok(Value::Int(i)),
        (TypeKind::Int32, Value::Long(l)) => Ok(Value::Int(l as i32)),
        (TypeKind::Int32, Value::Double(d)) => Ok(Value::Int(d as i32)),
        (TypeKind::Int32, Value::Char(c)) => Ok(Value::Int(c as i32)),
        (TypeKind::Int64, Value::Int(i)) => Ok(Value::Long(i as i64)),
        (TypeKind::Int64, Value::Long(l)) => Ok(Value::Long(l)),
        (TypeKind::Int64, Value::Double(d)) => Ok(Value::Long(d as i64)),
        (TypeKind::Double, value @ (Value::Int(_) | Value::Long(_) | Value::Double(_))) => {
            value.as_f64().map(Value::Double).ok_or_else(|| invalid(&value))
        }
        (TypeKind::Char, Value::Int(i)) => u32::try_from(i)
            .ok()
            .and_then(char::from_u32)
            .map(Value::Char)
            .ok_or_else(|| invalid(&Value::Int(i))),
        (TypeKind::Array(_) | TypeKind::List(_), value @ Value::Sequence(_)) => value.materialize(),
        (TypeKind::Seq(_), value @ (Value::Array(_) | Value::Sequence(_) | Value::Queryable(_))) => {
            Ok(value)
        }
        (TypeKind::Func { .. }, Value::Expression(quoted)) => {
            Ok(Value::Function(compile_quoted(&quoted)?))
        }
        (_, value) if value.is_instance_of(ty) => Ok(value),
        (_, value) => Err(invalid(&value)),
    }
}

/// Zero value of `ty`; null for reference types
pub fn default_value(ty: &Type) -> Value {
    match ty.kind() {
        TypeKind::Boolean => Value::Bool(false),
        TypeKind::Int32 => Value::Int(0),
        TypeKind::Int64 => Value::Long(0),
        TypeKind::Double => Value::Double(0.0),
        TypeKind::Char => Value::Char('\0'),
        _ => Value::Null,
    }
}

fn apply_initializers(mut list: Value, initializers: &[ElementInit], scope: &Scope) -> Eval<Value> {
    for init in initializers {
        let arguments = eval_all(&init.arguments, scope)?;
        list = init.add_method.invoke(Some(&list), &arguments)?;
    }
    Ok(list)
}

fn apply_bindings(mut target: Value, bindings: &[MemberBinding], scope: &Scope) -> Eval<Value> {
    for binding in bindings {
        target = match binding {
            MemberBinding::Assignment { member, expression } => {
                let value = eval(expression, scope)?;
                member.set(&target, value)?
            }
            MemberBinding::Member {
                member,
                bindings: nested,
            } => {
                let current = member.get(Some(&target))?;
                let updated = apply_bindings(current, nested, scope)?;
                member.set(&target, updated)?
            }
            MemberBinding::List {
                member,
                initializers,
            } => {
                let current = member.get(Some(&target))?;
                let updated = apply_initializers(current, initializers, scope)?;
                member.set(&target, updated)?
            }
        };
    }
    Ok(target)
}

fn eval_block(
    ty: &Type,
    variables: &[Parameter],
    expressions: &[Expr],
    scope: &Scope,
) -> Eval<Value> {
    let scope = if variables.is_empty() {
        scope.clone()
    } else {
        scope.extend(
            variables
                .iter()
                .map(|variable| (variable.clone(), default_value(variable.ty()))),
        )
    };

    let mut index = 0;
    let mut last = Value::Null;
    // value carried by a jump into one of this block's labels
    let mut resumed: Option<Value> = None;
    while index < expressions.len() {
        let expr = &expressions[index];
        let result = match (expr, resumed.take()) {
            (Expr::Label { .. }, Some(value)) => Ok(value),
            _ => eval(expr, &scope),
        };
        match result {
            Ok(value) => {
                last = value;
                index += 1;
            }
            Err(Flow::Jump { target, value }) => {
                let position = expressions
                    .iter()
                    .position(|e| matches!(e, Expr::Label { target: t, .. } if *t == target));
                match position {
                    Some(position) => {
                        index = position;
                        resumed = Some(value);
                    }
                    None => return Err(Flow::Jump { target, value }),
                }
            }
            Err(error) => return Err(error),
        }
    }
    Ok(if ty.is_void() { Value::Null } else { last })
}

/// Exception value seen by a handler of type `test`, if it catches `error`
fn caught(test: &Type, error: &ExecutionError) -> Option<Value> {
    match (test.kind(), error) {
        (TypeKind::Exception | TypeKind::Object, ExecutionError::Thrown(value)) => Some(value.clone()),
        (TypeKind::Exception | TypeKind::Object, other) => Some(Value::String(other.to_string())),
        (_, ExecutionError::Thrown(value)) if value.is_instance_of(test) => Some(value.clone()),
        _ => None,
    }
}

fn eval_try(
    body: &Expr,
    handlers: &[CatchBlock],
    finally: Option<&Expr>,
    fault: Option<&Expr>,
    scope: &Scope,
) -> Eval<Value> {
    let result = match eval(body, scope) {
        Err(Flow::Error(error)) => {
            let mut handled = None;
            for handler in handlers {
                let Some(exception) = caught(&handler.test, &error) else {
                    continue;
                };
                let handler_scope = match &handler.variable {
                    Some(variable) => scope.extend([(variable.clone(), exception)]),
                    None => scope.clone(),
                };
                if let Some(filter) = &handler.filter {
                    if eval(filter, &handler_scope)?.as_bool() != Some(true) {
                        continue;
                    }
                }
                handled = Some(eval(&handler.body, &handler_scope));
                break;
            }
            match handled {
                Some(result) => result,
                None => {
                    if let Some(fault) = fault {
                        eval(fault, scope)?;
                    }
                    Err(Flow::Error(error))
                }
            }
        }
        other => other,
    };
    if let Some(finally) = finally {
        eval(finally, scope)?;
    }
    result
}

fn eval_switch(
    value: &Expr,
    comparison: Option<&Method>,
    cases: &[SwitchCase],
    default: Option<&Expr>,
    scope: &Scope,
) -> Eval<Value> {
    let value = eval(value, scope)?;
    for case in cases {
        for test in &case.test_values {
            let test = eval(test, scope)?;
            let matched = match comparison {
                Some(method) => method.invoke(None, &[value.clone(), test])?.as_bool() == Some(true),
                None => value == test,
            };
            if matched {
                return eval(&case.body, scope);
            }
        }
    }
    Ok(eval_optional(default, scope)?.unwrap_or(Value::Null))
}
