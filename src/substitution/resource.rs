use super::ValueSubstitution;
use crate::expression::{Expr, ExprRewriter};
use crate::value::{NotSupportedError, ResourceDescriptor, SourceProvider, Value};
use std::convert::Infallible;

/// Replaces every live data source with a descriptor of its element type
pub fn replace_resources(expr: &Expr) -> Expr {
    ValueSubstitution::new(|value: &Value| -> Result<Option<Value>, Infallible> {
        Ok(match value {
            Value::Queryable(source) => {
                let descriptor = ResourceDescriptor::new(source.element_type());
                log::trace!("source of {} becomes a resource descriptor", descriptor.element_type);
                Some(Value::Resource(descriptor))
            }
            _ => None,
        })
    })
    .rewrite(expr)
    .unwrap_or_else(|never| match never {})
}

/// Binds every resource descriptor to the source `provider` serves for its
/// element type
pub fn resolve_resources(
    expr: &Expr,
    provider: &dyn SourceProvider,
) -> Result<Expr, NotSupportedError> {
    ValueSubstitution::new(|value: &Value| -> Result<Option<Value>, NotSupportedError> {
        Ok(match value {
            Value::Resource(descriptor) => {
                log::trace!("binding resource of {}", descriptor.element_type);
                Some(Value::Queryable(provider.provide(&descriptor.element_type)?))
            }
            _ => None,
        })
    })
    .rewrite(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::evaluate;
    use crate::types::{Type, TypeInfo, TypeRegistry};
    use crate::value::{InMemorySource, Record, SourceRegistry};
    use std::sync::Arc;

    fn count_of(registry: &TypeRegistry, element: &Type, source: Value) -> Expr {
        let count = registry
            .method("Queryable", "Count", &[element.clone()], 1)
            .unwrap();
        Expr::call(
            None,
            count,
            vec![Expr::constant(source, Type::queryable(element.clone()))],
        )
    }

    #[test]
    fn test_round_trip_binds_new_source() {
        let registry = TypeRegistry::with_builtins();
        let int = Type::int32();
        let client = InMemorySource::shared(int.clone(), vec![Value::Int(1)]);
        let expr = count_of(&registry, &int, Value::Queryable(client));

        let outbound = replace_resources(&expr);
        let Expr::Call { arguments, .. } = &outbound else {
            panic!("expected call");
        };
        assert!(matches!(
            &arguments[0],
            Expr::Constant {
                value: Value::Resource(d),
                ..
            } if d.element_type == TypeInfo::new("Int32")
        ));

        let server = SourceRegistry::new();
        server.register(InMemorySource::shared(
            int,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)],
        ));
        let inbound = resolve_resources(&outbound, &server).unwrap();
        assert_eq!(evaluate(&inbound).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_missing_source_is_not_supported() {
        let registry = TypeRegistry::with_builtins();
        let expr = count_of(
            &registry,
            &Type::string(),
            Value::Resource(ResourceDescriptor::new(&Type::string())),
        );
        let err = resolve_resources(&expr, &SourceRegistry::new()).unwrap_err();
        assert_eq!(err, NotSupportedError("String".to_string()));
    }

    #[test]
    fn test_nested_in_property_bag() {
        let holder = Type::record("Holder", vec![("source", Type::queryable(Type::int32()))]);
        let record = Record::new(
            holder.clone(),
            vec![Value::Queryable(InMemorySource::shared(Type::int32(), Vec::new()))],
        );
        let expr = Expr::constant(Value::Record(Arc::new(record)), holder);
        let Expr::Constant {
            value: Value::Record(replaced),
            ..
        } = replace_resources(&expr)
        else {
            panic!("expected record constant");
        };
        assert!(matches!(replaced.fields()[0], Value::Resource(_)));

        // already replaced: nothing left to do
        let again = replace_resources(&Expr::constant(
            Value::Record(replaced.clone()),
            replaced.ty().clone(),
        ));
        let Expr::Constant {
            value: Value::Record(unchanged),
            ..
        } = again
        else {
            panic!("expected record constant");
        };
        assert!(Arc::ptr_eq(&unchanged, &replaced));
    }
}
