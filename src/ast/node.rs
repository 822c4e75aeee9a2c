//! Node kinds of the query AST.
//!
//! Nodes reference types and members through descriptors only. `Constant` is
//! the single node kind that carries a value, and that value is a
//! [`GraphValue`], which may itself hold another expression tree.

use crate::ast::operator::{BinaryOperator, UnaryOperator};
use crate::graph::GraphValue;
use crate::types::{ConstructorInfo, MemberInfo, MethodInfo, TypeInfo};
use serde::{Deserialize, Serialize};

/// Query AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Constant(ConstantExpression),

    Parameter(ParameterExpression),

    MemberAccess {
        instance: Option<Box<Expression>>,
        member: MemberInfo,
    },

    MethodCall {
        instance: Option<Box<Expression>>,
        method: MethodInfo,
        arguments: Vec<Expression>,
    },

    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        method: Option<MethodInfo>,
        conversion: Option<Box<LambdaExpression>>,
    },

    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
        /// Target type of conversions; omitted where the operand determines it
        ty: Option<TypeInfo>,
        method: Option<MethodInfo>,
    },

    Conditional {
        test: Box<Expression>,
        if_true: Box<Expression>,
        if_false: Box<Expression>,
    },

    Lambda(LambdaExpression),

    New {
        constructor: ConstructorInfo,
        arguments: Vec<Expression>,
        members: Option<Vec<MemberInfo>>,
    },

    NewArray {
        element_type: TypeInfo,
        items: Vec<Expression>,
    },

    ListInit {
        new: Box<Expression>,
        initializers: Vec<ElementInit>,
    },

    MemberInit {
        new: Box<Expression>,
        bindings: Vec<MemberBinding>,
    },

    /// Enumerated items of a constant collection
    Collection {
        element_type: TypeInfo,
        items: Vec<ConstantExpression>,
    },

    Block {
        ty: TypeInfo,
        variables: Vec<ParameterExpression>,
        expressions: Vec<Expression>,
    },

    TypeTest {
        operand: Box<Expression>,
        ty: TypeInfo,
    },

    Try {
        ty: TypeInfo,
        body: Box<Expression>,
        handlers: Vec<CatchBlock>,
        finally: Option<Box<Expression>>,
        fault: Option<Box<Expression>>,
    },

    Switch {
        ty: TypeInfo,
        value: Box<Expression>,
        comparison: Option<MethodInfo>,
        cases: Vec<SwitchCase>,
        default: Option<Box<Expression>>,
    },

    Goto {
        kind: GotoKind,
        target: LabelTarget,
        value: Option<Box<Expression>>,
    },

    Label {
        target: LabelTarget,
        default: Option<Box<Expression>>,
    },

    Loop {
        body: Box<Expression>,
        break_label: Option<LabelTarget>,
        continue_label: Option<LabelTarget>,
    },

    Invoke {
        target: Box<Expression>,
        arguments: Vec<Expression>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantExpression {
    pub ty: TypeInfo,
    pub value: GraphValue,
}

impl ConstantExpression {
    pub fn new(value: GraphValue, ty: TypeInfo) -> Self {
        Self { ty, value }
    }
}

/// Parameters are identified by `(type, name)` within one tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterExpression {
    pub name: String,
    pub ty: TypeInfo,
}

impl ParameterExpression {
    pub fn new(name: impl Into<String>, ty: TypeInfo) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaExpression {
    pub parameters: Vec<ParameterExpression>,
    pub body: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementInit {
    pub add_method: MethodInfo,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemberBinding {
    Assignment {
        member: MemberInfo,
        expression: Expression,
    },
    Member {
        member: MemberInfo,
        bindings: Vec<MemberBinding>,
    },
    List {
        member: MemberInfo,
        initializers: Vec<ElementInit>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchBlock {
    pub test: TypeInfo,
    pub variable: Option<ParameterExpression>,
    pub filter: Option<Expression>,
    pub body: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub test_values: Vec<Expression>,
    pub body: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GotoKind {
    Goto,
    Return,
    Break,
    Continue,
}

/// Jump target. `id` is unique within one tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelTarget {
    pub id: u32,
    pub name: Option<String>,
    pub ty: TypeInfo,
}

impl Expression {
    pub fn constant(value: GraphValue, ty: TypeInfo) -> Self {
        Expression::Constant(ConstantExpression::new(value, ty))
    }

    pub fn parameter(name: impl Into<String>, ty: TypeInfo) -> Self {
        Expression::Parameter(ParameterExpression::new(name, ty))
    }

    /// Number of nodes in the tree, constants' nested trees excluded
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }

    /// Pre-order traversal over every node
    pub fn walk(&self, visit: &mut dyn FnMut(&Expression)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Direct child expressions in evaluation order
    pub fn children(&self) -> Vec<&Expression> {
        fn inits(initializers: &[ElementInit]) -> impl Iterator<Item = &Expression> {
            initializers.iter().flat_map(|init| init.arguments.iter())
        }
        fn bindings<'a>(list: &'a [MemberBinding], out: &mut Vec<&'a Expression>) {
            for binding in list {
                match binding {
                    MemberBinding::Assignment { expression, .. } => out.push(expression),
                    MemberBinding::Member { bindings: nested, .. } => bindings(nested, out),
                    MemberBinding::List { initializers, .. } => out.extend(inits(initializers)),
                }
            }
        }

        let mut out: Vec<&Expression> = Vec::new();
        match self {
            Expression::Constant(_) | Expression::Parameter(_) | Expression::Collection { .. } => {}
            Expression::MemberAccess { instance, .. } => out.extend(instance.as_deref()),
            Expression::MethodCall {
                instance,
                arguments,
                ..
            } => {
                out.extend(instance.as_deref());
                out.extend(arguments.iter());
            }
            Expression::Binary {
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
            Expression::Unary { operand, .. } => out.push(operand),
            Expression::Conditional {
                test,
                if_true,
                if_false,
            } => {
                out.push(test);
                out.push(if_true);
                out.push(if_false);
            }
            Expression::Lambda(lambda) => out.push(&lambda.body),
            Expression::New { arguments, .. } => out.extend(arguments.iter()),
            Expression::NewArray { items, .. } => out.extend(items.iter()),
            Expression::ListInit { new, initializers } => {
                out.push(new);
                out.extend(inits(initializers));
            }
            Expression::MemberInit { new, bindings: b } => {
                out.push(new);
                bindings(b, &mut out);
            }
            Expression::Block { expressions, .. } => out.extend(expressions.iter()),
            Expression::TypeTest { operand, .. } => out.push(operand),
            Expression::Try {
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
            Expression::Switch {
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
            Expression::Goto { value, .. } => out.extend(value.as_deref()),
            Expression::Label { default, .. } => out.extend(default.as_deref()),
            Expression::Loop { body, .. } => out.push(body),
            Expression::Invoke { target, arguments } => {
                out.push(target);
                out.extend(arguments.iter());
            }
        }
        out
    }
}
