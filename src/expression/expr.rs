//! Native expression tree definitions.

use crate::ast::GotoKind;
use crate::expression::operator::{BinaryOperator, UnaryOperator};
use crate::types::{Constructor, Member, Method, ResolutionError, Type};
use crate::value::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug)]
struct ParameterDef {
    name: String,
    ty: Type,
}

/// Parameter or block variable.
///
/// Parameters have instance identity: two parameters are the same binding
/// only if they are clones of the same handle, whatever their names.
#[derive(Clone)]
pub struct Parameter(Arc<ParameterDef>);

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Parameter(Arc::new(ParameterDef {
            name: name.into(),
            ty,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn ty(&self) -> &Type {
        &self.0.ty
    }

    /// Address-based identity of this binding
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Parameter {}

impl Hash for Parameter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parameter({}: {}, #{:x})", self.name(), self.ty(), self.id())
    }
}

#[derive(Debug)]
struct LabelDef {
    name: Option<String>,
    ty: Type,
}

/// Jump target with instance identity
#[derive(Clone)]
pub struct LabelTarget(Arc<LabelDef>);

impl LabelTarget {
    pub fn new(name: Option<&str>, ty: Type) -> Self {
        LabelTarget(Arc::new(LabelDef {
            name: name.map(str::to_string),
            ty,
        }))
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn ty(&self) -> &Type {
        &self.0.ty
    }

    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for LabelTarget {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for LabelTarget {}

impl fmt::Debug for LabelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({:?}, #{:x})", self.name(), self.id())
    }
}

impl fmt::Display for LabelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "L{:x}", self.id() & 0xffff),
        }
    }
}

/// Lambda with its parameters. The body is shared with compiled closures.
#[derive(Debug, Clone)]
pub struct LambdaExpr {
    pub parameters: Vec<Parameter>,
    pub body: Arc<Expr>,
}

impl LambdaExpr {
    pub fn new(parameters: Vec<Parameter>, body: Expr) -> Self {
        Self {
            parameters,
            body: Arc::new(body),
        }
    }

    /// `Func<params.., body>`
    pub fn ty(&self) -> Type {
        Type::func(
            self.parameters.iter().map(|p| p.ty().clone()).collect(),
            self.body.ty(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ElementInit {
    pub add_method: Method,
    pub arguments: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub enum MemberBinding {
    Assignment { member: Member, expression: Expr },
    Member { member: Member, bindings: Vec<MemberBinding> },
    List { member: Member, initializers: Vec<ElementInit> },
}

#[derive(Debug, Clone)]
pub struct CatchBlock {
    pub test: Type,
    pub variable: Option<Parameter>,
    pub filter: Option<Expr>,
    pub body: Expr,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub test_values: Vec<Expr>,
    pub body: Expr,
}

/// Native expression tree node
#[derive(Debug, Clone)]
pub enum Expr {
    Constant {
        value: Value,
        ty: Type,
    },

    Parameter(Parameter),

    /// Field or property read; `instance` is `None` for static members
    Member {
        instance: Option<Box<Expr>>,
        member: Member,
    },

    Call {
        instance: Option<Box<Expr>>,
        method: Method,
        arguments: Vec<Expr>,
    },

    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
        /// User-defined operator implementation
        method: Option<Method>,
        /// Applied to the left operand of a coalesce
        conversion: Option<LambdaExpr>,
    },

    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
        ty: Type,
        method: Option<Method>,
    },

    Conditional {
        test: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },

    Lambda(LambdaExpr),

    /// Object construction. `members` names the member each argument
    /// initialises (projection records, dynamic objects).
    New {
        constructor: Constructor,
        arguments: Vec<Expr>,
        members: Option<Vec<Member>>,
    },

    NewArray {
        element_type: Type,
        items: Vec<Expr>,
    },

    ListInit {
        new: Box<Expr>,
        initializers: Vec<ElementInit>,
    },

    MemberInit {
        new: Box<Expr>,
        bindings: Vec<MemberBinding>,
    },

    Block {
        ty: Type,
        variables: Vec<Parameter>,
        expressions: Vec<Expr>,
    },

    TypeIs {
        operand: Box<Expr>,
        ty: Type,
    },

    Try {
        ty: Type,
        body: Box<Expr>,
        handlers: Vec<CatchBlock>,
        finally: Option<Box<Expr>>,
        fault: Option<Box<Expr>>,
    },

    Switch {
        ty: Type,
        value: Box<Expr>,
        comparison: Option<Method>,
        cases: Vec<SwitchCase>,
        default: Option<Box<Expr>>,
    },

    Goto {
        kind: GotoKind,
        target: LabelTarget,
        value: Option<Box<Expr>>,
    },

    Label {
        target: LabelTarget,
        default: Option<Box<Expr>>,
    },

    Loop {
        body: Box<Expr>,
        break_label: Option<LabelTarget>,
        continue_label: Option<LabelTarget>,
    },

    Invoke {
        target: Box<Expr>,
        arguments: Vec<Expr>,
    },
}

impl Expr {
    /// Create a constant expression
    pub fn constant(value: impl Into<Value>, ty: Type) -> Self {
        Expr::Constant {
            value: value.into(),
            ty,
        }
    }

    pub fn int(value: i32) -> Self {
        Expr::constant(value, Type::int32())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::constant(value.into(), Type::string())
    }

    pub fn boolean(value: bool) -> Self {
        Expr::constant(value, Type::boolean())
    }

    /// Typed null
    pub fn null(ty: Type) -> Self {
        Expr::Constant {
            value: Value::Null,
            ty,
        }
    }

    pub fn parameter(parameter: &Parameter) -> Self {
        Expr::Parameter(parameter.clone())
    }

    /// Instance member looked up by name on the instance's static type
    pub fn property(instance: Expr, name: &str) -> Result<Self, ResolutionError> {
        let ty = instance.ty();
        let member = Member::find(&ty, name)
            .ok_or_else(|| ResolutionError::UnknownMember(format!("{}.{}", ty, name)))?;
        Ok(Expr::Member {
            instance: Some(Box::new(instance)),
            member,
        })
    }

    pub fn member(instance: Option<Expr>, member: Member) -> Self {
        Expr::Member {
            instance: instance.map(Box::new),
            member,
        }
    }

    pub fn call(instance: Option<Expr>, method: Method, arguments: Vec<Expr>) -> Self {
        Expr::Call {
            instance: instance.map(Box::new),
            method,
            arguments,
        }
    }

    /// Create a binary operation expression
    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            method: None,
            conversion: None,
        }
    }

    /// Create a unary operation expression whose type follows its operand
    pub fn unary(op: UnaryOperator, operand: Expr) -> Self {
        let ty = match op {
            UnaryOperator::ArrayLength => Type::int32(),
            UnaryOperator::Throw => Type::void(),
            _ => operand.ty(),
        };
        Expr::Unary {
            op,
            operand: Box::new(operand),
            ty,
            method: None,
        }
    }

    pub fn not(operand: Expr) -> Self {
        Expr::unary(UnaryOperator::Not, operand)
    }

    pub fn convert(operand: Expr, ty: Type) -> Self {
        Expr::Unary {
            op: UnaryOperator::Convert,
            operand: Box::new(operand),
            ty,
            method: None,
        }
    }

    /// Quoted lambda, typed `Expression<Func<..>>`
    pub fn quote(lambda: LambdaExpr) -> Self {
        let ty = Type::expression(lambda.ty());
        Expr::Unary {
            op: UnaryOperator::Quote,
            operand: Box::new(Expr::Lambda(lambda)),
            ty,
            method: None,
        }
    }

    pub fn lambda(parameters: Vec<Parameter>, body: Expr) -> Self {
        Expr::Lambda(LambdaExpr::new(parameters, body))
    }

    pub fn conditional(test: Expr, if_true: Expr, if_false: Expr) -> Self {
        Expr::Conditional {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        }
    }

    pub fn invoke(target: Expr, arguments: Vec<Expr>) -> Self {
        Expr::Invoke {
            target: Box::new(target),
            arguments,
        }
    }

    pub fn new_array(element_type: Type, items: Vec<Expr>) -> Self {
        Expr::NewArray {
            element_type,
            items,
        }
    }

    /// Whether this is a bare constant
    pub fn is_constant(&self) -> bool {
        matches!(self, Expr::Constant { .. })
    }

    /// Direct child expressions in evaluation order
    pub fn children(&self) -> Vec<&Expr> {
        fn inits(initializers: &[ElementInit]) -> impl Iterator<Item = &Expr> {
            initializers.iter().flat_map(|init| init.arguments.iter())
        }
        fn bindings<'a>(list: &'a [MemberBinding], out: &mut Vec<&'a Expr>) {
            for binding in list {
                match binding {
                    MemberBinding::Assignment { expression, .. } => out.push(expression),
                    MemberBinding::Member { bindings: nested, .. } => bindings(nested, out),
                    MemberBinding::List { initializers, .. } => out.extend(inits(initializers)),
                }
            }
        }

        let mut out: Vec<&Expr> = Vec::new();
        match self {
            Expr::Constant { .. } | Expr::Parameter(_) => {}
            Expr::Member { instance, .. } => out.extend(instance.as_deref()),
            Expr::Call {
                instance,
                arguments,
                ..
            } => {
                out.extend(instance.as_deref());
                out.extend(arguments.iter());
            }
            Expr::Binary {
                left,
                right,
                conversion,
                ..
            } => {
                out.push(left);
                out.push(right);
                if let Some(conversion) = conversion {
                    out.push(&conversion.body);
                }
            }
            Expr::Unary { operand, .. } => out.push(operand),
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => {
                out.push(test);
                out.push(if_true);
                out.push(if_false);
            }
            Expr::Lambda(lambda) => out.push(&lambda.body),
            Expr::New { arguments, .. } => out.extend(arguments.iter()),
            Expr::NewArray { items, .. } => out.extend(items.iter()),
            Expr::ListInit { new, initializers } => {
                out.push(new);
                out.extend(inits(initializers));
            }
            Expr::MemberInit { new, bindings: b } => {
                out.push(new);
                bindings(b, &mut out);
            }
            Expr::Block { expressions, .. } => out.extend(expressions.iter()),
            Expr::TypeIs { operand, .. } => out.push(operand),
            Expr::Try {
                body,
                handlers,
                finally,
                fault,
                ..
            } => {
                out.push(body);
                for handler in handlers {
                    out.extend(handler.filter.as_ref());
                    out.push(&handler.body);
                }
                out.extend(finally.as_deref());
                out.extend(fault.as_deref());
            }
            Expr::Switch {
                value,
                cases,
                default,
                ..
            } => {
                out.push(value);
                for case in cases {
                    out.extend(case.test_values.iter());
                    out.push(&case.body);
                }
                out.extend(default.as_deref());
            }
            Expr::Goto { value, .. } => out.extend(value.as_deref()),
            Expr::Label { default, .. } => out.extend(default.as_deref()),
            Expr::Loop { body, .. } => out.push(body),
            Expr::Invoke { target, arguments } => {
                out.push(target);
                out.extend(arguments.iter());
            }
        }
        out
    }

    /// Pre-order traversal over every node
    pub fn walk(&self, visit: &mut dyn FnMut(&Expr)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}

fn comma_separated<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for LambdaExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parameters.len() == 1 {
            write!(f, "{}", self.parameters[0].name())?;
        } else {
            let names: Vec<&str> = self.parameters.iter().map(|p| p.name()).collect();
            write!(f, "({})", names.join(", "))?;
        }
        write!(f, " => {}", self.body)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant { value, .. } => write!(f, "{}", value),
            Expr::Parameter(parameter) => write!(f, "{}", parameter.name()),
            Expr::Member { instance, member } => match instance {
                Some(instance) => write!(f, "{}.{}", instance, member.name),
                None => write!(f, "{}.{}", member.declaring_type, member.name),
            },
            Expr::Call {
                instance,
                method,
                arguments,
            } => {
                match instance {
                    Some(instance) => write!(f, "{}.{}(", instance, method.name())?,
                    None => write!(f, "{}.{}(", method.declaring_type(), method.name())?,
                }
                comma_separated(f, arguments)?;
                write!(f, ")")
            }
            Expr::Binary {
                op: BinaryOperator::ArrayIndex,
                left,
                right,
                ..
            } => write!(f, "{}[{}]", left, right),
            Expr::Binary {
                op, left, right, ..
            } => write!(f, "({} {} {})", left, op.as_str(), right),
            Expr::Unary {
                op, operand, ty, ..
            } => match op {
                UnaryOperator::Convert => write!(f, "(({}){})", ty, operand),
                UnaryOperator::TypeAs => write!(f, "({} as {})", operand, ty),
                UnaryOperator::Quote => write!(f, "{}", operand),
                UnaryOperator::ArrayLength => write!(f, "{}.Length", operand),
                UnaryOperator::Throw => write!(f, "throw {}", operand),
                op => write!(f, "{}{}", op.as_str(), operand),
            },
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => write!(f, "({} ? {} : {})", test, if_true, if_false),
            Expr::Lambda(lambda) => write!(f, "{}", lambda),
            Expr::New {
                constructor,
                arguments,
                members,
            } => match members {
                Some(members) => {
                    write!(f, "new {{ ")?;
                    for (i, (member, argument)) in members.iter().zip(arguments).enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{} = {}", member.name, argument)?;
                    }
                    write!(f, " }}")
                }
                None => {
                    write!(f, "new {}(", constructor.declaring_type)?;
                    comma_separated(f, arguments)?;
                    write!(f, ")")
                }
            },
            Expr::NewArray {
                element_type,
                items,
            } => {
                write!(f, "new {}[] {{ ", element_type)?;
                comma_separated(f, items)?;
                write!(f, " }}")
            }
            Expr::ListInit { new, initializers } => {
                write!(f, "{} {{ ", new)?;
                for (i, init) in initializers.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    comma_separated(f, &init.arguments)?;
                }
                write!(f, " }}")
            }
            Expr::MemberInit { new, bindings } => {
                write!(f, "{} {{ ", new)?;
                for (i, binding) in bindings.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match binding {
                        MemberBinding::Assignment { member, expression } => {
                            write!(f, "{} = {}", member.name, expression)?
                        }
                        MemberBinding::Member { member, .. }
                        | MemberBinding::List { member, .. } => {
                            write!(f, "{} = {{ .. }}", member.name)?
                        }
                    }
                }
                write!(f, " }}")
            }
            Expr::Block { expressions, .. } => {
                write!(f, "{{ ")?;
                for expr in expressions {
                    write!(f, "{}; ", expr)?;
                }
                write!(f, "}}")
            }
            Expr::TypeIs { operand, ty } => write!(f, "({} is {})", operand, ty),
            Expr::Try {
                body,
                handlers,
                finally,
                fault,
                ..
            } => {
                write!(f, "try {{ {} }}", body)?;
                for handler in handlers {
                    write!(f, " catch ({}) {{ {} }}", handler.test, handler.body)?;
                }
                if let Some(fault) = fault {
                    write!(f, " fault {{ {} }}", fault)?;
                }
                if let Some(finally) = finally {
                    write!(f, " finally {{ {} }}", finally)?;
                }
                Ok(())
            }
            Expr::Switch {
                value,
                cases,
                default,
                ..
            } => {
                write!(f, "switch ({}) {{ ", value)?;
                for case in cases {
                    write!(f, "case ")?;
                    comma_separated(f, &case.test_values)?;
                    write!(f, ": {}; ", case.body)?;
                }
                if let Some(default) = default {
                    write!(f, "default: {}; ", default)?;
                }
                write!(f, "}}")
            }
            Expr::Goto {
                kind,
                target,
                value,
            } => {
                write!(f, "{:?} {}", kind, target)?;
                if let Some(value) = value {
                    write!(f, " {}", value)?;
                }
                Ok(())
            }
            Expr::Label { target, .. } => write!(f, "{}:", target),
            Expr::Loop { body, .. } => write!(f, "loop {{ {} }}", body),
            Expr::Invoke { target, arguments } => {
                write!(f, "{}(", target)?;
                comma_separated(f, arguments)?;
                write!(f, ")")
            }
        }
    }
}
