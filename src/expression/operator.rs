//! Operator definitions for native expressions.

/// Binary operators supported in native expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
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

    // Short-circuit logical
    AndAlso,
    OrElse,

    // Bitwise, or non-short-circuit logical on booleans
    And,
    Or,
    ExclusiveOr,
    LeftShift,
    RightShift,

    Coalesce,
    ArrayIndex,
    Assign,
}

impl BinaryOperator {
    /// Check if this is a comparison operator
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
        )
    }

    /// Check if this is an arithmetic operator
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
                | BinaryOperator::Modulo
                | BinaryOperator::Power
        )
    }

    /// Get the string representation of this operator
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
            BinaryOperator::AndAlso => "&&",
            BinaryOperator::OrElse => "||",
            BinaryOperator::And => "&",
            BinaryOperator::Or => "|",
            BinaryOperator::ExclusiveOr => "^",
            BinaryOperator::LeftShift => "<<",
            BinaryOperator::RightShift => ">>",
            BinaryOperator::Coalesce => "??",
            BinaryOperator::ArrayIndex => "[]",
            BinaryOperator::Assign => "=",
        }
    }
}

/// Unary operators supported in native expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Negate,
    UnaryPlus,
    Convert,
    TypeAs,
    ArrayLength,
    /// Captures the operand as data instead of evaluating it
    Quote,
    Throw,
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
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_classification() {
        assert!(BinaryOperator::LessThan.is_comparison());
        assert!(!BinaryOperator::AndAlso.is_comparison());
        assert!(BinaryOperator::Modulo.is_arithmetic());
        assert!(!BinaryOperator::Coalesce.is_arithmetic());
    }
}
