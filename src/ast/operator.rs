//! Operators of the query AST.

use serde::{Deserialize, Serialize};

/// Binary operators carried by the query AST
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,

    // Logical (short-circuit)
    And,
    Or,

    // Bitwise
    BitwiseAnd,
    BitwiseOr,
    ExclusiveOr,
    LeftShift,
    RightShift,

    Coalesce,
    ArrayIndex,
    Assign,

    // String predicates, receiver on the left
    StringContains,
    StringStartsWith,
    StringEndsWith,

    /// Membership of the left operand in a constant collection on the right
    In,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "**",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::ExclusiveOr => "^",
            BinaryOperator::LeftShift => "<<",
            BinaryOperator::RightShift => ">>",
            BinaryOperator::Coalesce => "??",
            BinaryOperator::ArrayIndex => "[]",
            BinaryOperator::Assign => "=",
            BinaryOperator::StringContains => "contains",
            BinaryOperator::StringStartsWith => "startswith",
            BinaryOperator::StringEndsWith => "endswith",
            BinaryOperator::In => "in",
        }
    }
}

/// Unary operators carried by the query AST
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Negate,
    UnaryPlus,
    Convert,
    TypeAs,
    ArrayLength,
    Quote,
    Throw,
    IsNull,
    IsNotNull,
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::Negate => "-",
            UnaryOperator::UnaryPlus => "+",
            UnaryOperator::Convert => "convert",
            UnaryOperator::TypeAs => "as",
            UnaryOperator::ArrayLength => "length",
            UnaryOperator::Quote => "quote",
            UnaryOperator::Throw => "throw",
            UnaryOperator::IsNull => "isnull",
            UnaryOperator::IsNotNull => "isnotnull",
        }
    }
}
