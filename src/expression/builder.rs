//! Fluent construction of query expressions.
//!
//! The builder assembles `Queryable.*` operator calls with quoted lambda
//! arguments, the same shape a language-integrated query front end would
//! produce.

use crate::expression::expr::{Expr, LambdaExpr, Parameter};
use crate::types::{Member, ResolutionError, Type, TypeRegistry};
use crate::value::{QuerySource, Record, Value};
use std::sync::Arc;

const QUERYABLE: &str = "Queryable";

/// Query under construction over a sequence of `element_type`
pub struct QueryBuilder<'r> {
    registry: &'r TypeRegistry,
    expr: Expr,
    element_type: Type,
}

type BuildResult<T> = Result<T, ResolutionError>;

impl<'r> QueryBuilder<'r> {
    /// Starts from a live data source
    pub fn from_source(registry: &'r TypeRegistry, source: Arc<dyn QuerySource>) -> Self {
        let element_type = source.element_type().clone();
        let expr = Expr::constant(Value::Queryable(source), Type::queryable(element_type.clone()));
        Self {
            registry,
            expr,
            element_type,
        }
    }

    /// Continues from an existing sequence-typed expression
    pub fn from_expr(registry: &'r TypeRegistry, expr: Expr) -> BuildResult<Self> {
        let ty = expr.ty();
        let element_type = ty
            .element_type()
            .cloned()
            .ok_or_else(|| ResolutionError::UnknownType(format!("element type of {}", ty)))?;
        Ok(Self {
            registry,
            expr,
            element_type,
        })
    }

    pub fn element_type(&self) -> &Type {
        &self.element_type
    }

    /// Quoted single-parameter lambda over the current element type
    fn quoted(&self, body: impl FnOnce(Expr) -> BuildResult<Expr>) -> BuildResult<(Expr, Type)> {
        let parameter = Parameter::new(parameter_name(&self.element_type), self.element_type.clone());
        let body = body(Expr::parameter(&parameter))?;
        let result = body.ty();
        Ok((Expr::quote(LambdaExpr::new(vec![parameter], body)), result))
    }

    fn apply(self, name: &str, generic_arguments: &[Type], extra: Vec<Expr>) -> BuildResult<Expr> {
        let method = self
            .registry
            .method(QUERYABLE, name, generic_arguments, extra.len() + 1)?;
        let mut arguments = Vec::with_capacity(extra.len() + 1);
        arguments.push(self.expr);
        arguments.extend(extra);
        Ok(Expr::call(None, method, arguments))
    }

    fn chain(self, name: &str, generic_arguments: &[Type], extra: Vec<Expr>) -> BuildResult<Self> {
        let registry = self.registry;
        let expr = self.apply(name, generic_arguments, extra)?;
        Self::from_expr(registry, expr)
    }

    /// `Where(x => predicate(x))`
    pub fn filter(self, predicate: impl FnOnce(Expr) -> BuildResult<Expr>) -> BuildResult<Self> {
        let (lambda, _) = self.quoted(predicate)?;
        let t = self.element_type.clone();
        self.chain("Where", &[t], vec![lambda])
    }

    /// `Select(x => selector(x))`
    pub fn select(self, selector: impl FnOnce(Expr) -> BuildResult<Expr>) -> BuildResult<Self> {
        let (lambda, result) = self.quoted(selector)?;
        let t = self.element_type.clone();
        self.chain("Select", &[t, result], vec![lambda])
    }

    fn ordering(self, name: &str, key: impl FnOnce(Expr) -> BuildResult<Expr>) -> BuildResult<Self> {
        let (lambda, key_type) = self.quoted(key)?;
        let t = self.element_type.clone();
        self.chain(name, &[t, key_type], vec![lambda])
    }

    pub fn order_by(self, key: impl FnOnce(Expr) -> BuildResult<Expr>) -> BuildResult<Self> {
        self.ordering("OrderBy", key)
    }

    pub fn order_by_descending(self, key: impl FnOnce(Expr) -> BuildResult<Expr>) -> BuildResult<Self> {
        self.ordering("OrderByDescending", key)
    }

    pub fn then_by(self, key: impl FnOnce(Expr) -> BuildResult<Expr>) -> BuildResult<Self> {
        self.ordering("ThenBy", key)
    }

    pub fn then_by_descending(self, key: impl FnOnce(Expr) -> BuildResult<Expr>) -> BuildResult<Self> {
        self.ordering("ThenByDescending", key)
    }

    pub fn take(self, count: i32) -> BuildResult<Self> {
        let t = self.element_type.clone();
        self.chain("Take", &[t], vec![Expr::int(count)])
    }

    pub fn skip(self, count: i32) -> BuildResult<Self> {
        let t = self.element_type.clone();
        self.chain("Skip", &[t], vec![Expr::int(count)])
    }

    pub fn distinct(self) -> BuildResult<Self> {
        let t = self.element_type.clone();
        self.chain("Distinct", &[t], Vec::new())
    }

    /// Terminal `Count()`
    pub fn count(self) -> BuildResult<Expr> {
        let t = self.element_type.clone();
        self.apply("Count", &[t], Vec::new())
    }

    /// Terminal `First()`
    pub fn first(self) -> BuildResult<Expr> {
        let t = self.element_type.clone();
        self.apply("First", &[t], Vec::new())
    }

    pub fn first_or_default(self) -> BuildResult<Expr> {
        let t = self.element_type.clone();
        self.apply("FirstOrDefault", &[t], Vec::new())
    }

    /// Terminal `Single()`
    pub fn single(self) -> BuildResult<Expr> {
        let t = self.element_type.clone();
        self.apply("Single", &[t], Vec::new())
    }

    /// Terminal `Single(x => predicate(x))`
    pub fn single_where(self, predicate: impl FnOnce(Expr) -> BuildResult<Expr>) -> BuildResult<Expr> {
        let (lambda, _) = self.quoted(predicate)?;
        let t = self.element_type.clone();
        self.apply("Single", &[t], vec![lambda])
    }

    /// Terminal `Any(x => predicate(x))`
    pub fn any(self, predicate: impl FnOnce(Expr) -> BuildResult<Expr>) -> BuildResult<Expr> {
        let (lambda, _) = self.quoted(predicate)?;
        let t = self.element_type.clone();
        self.apply("Any", &[t], vec![lambda])
    }

    pub fn build(self) -> Expr {
        self.expr
    }
}

fn parameter_name(ty: &Type) -> String {
    ty.name()
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase().to_string())
        .unwrap_or_else(|| "x".to_string())
}

impl Expr {
    /// A local variable captured by a closure: a field read on a constant
    /// closure-environment record holding `value`.
    pub fn captured(name: &str, value: impl Into<Value>, ty: Type) -> Expr {
        let environment = Type::record(format!("<>c__DisplayClass_{}", name), vec![(name, ty.clone())]);
        let record = Record::new(environment.clone(), vec![value.into()]);
        Expr::Member {
            instance: Some(Box::new(Expr::constant(
                Value::Record(Arc::new(record)),
                environment.clone(),
            ))),
            member: Member::new(environment, name, ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::eval::evaluate;
    use crate::expression::operator::BinaryOperator;
    use crate::value::InMemorySource;

    fn product_type() -> Type {
        Type::record("Product", vec![("Name", Type::string()), ("Price", Type::int32())])
    }

    fn product(name: &str, price: i32) -> Value {
        Value::Record(Arc::new(Record::new(
            product_type(),
            vec![Value::from(name), Value::Int(price)],
        )))
    }

    fn products() -> Arc<dyn QuerySource> {
        InMemorySource::shared(
            product_type(),
            vec![product("A", 1), product("B", 20), product("C", 30)],
        )
    }

    #[test]
    fn test_filter_select() {
        let registry = TypeRegistry::with_builtins();
        let query = QueryBuilder::from_source(&registry, products())
            .filter(|p| {
                Ok(Expr::binary(
                    BinaryOperator::GreaterThan,
                    Expr::property(p, "Price")?,
                    Expr::int(10),
                ))
            })
            .and_then(|q| q.order_by_descending(|p| Expr::property(p, "Price")))
            .and_then(|q| q.select(|p| Expr::property(p, "Name")))
            .unwrap();
        assert_eq!(query.element_type(), &Type::string());

        let result = evaluate(&query.build()).unwrap().materialize().unwrap();
        assert_eq!(result, Value::from(vec!["C", "B"]));
    }

    #[test]
    fn test_count_and_display() {
        let registry = TypeRegistry::with_builtins();
        let count = QueryBuilder::from_source(&registry, products())
            .take(2)
            .and_then(|q| q.count())
            .unwrap();
        assert_eq!(evaluate(&count).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_captured_variable() {
        let captured = Expr::captured("limit", 10, Type::int32());
        assert_eq!(captured.ty(), Type::int32());
        assert_eq!(evaluate(&captured).unwrap(), Value::Int(10));
    }
}
