//! Built-in query operators and library methods.
//!
//! Sequence operators are registered twice: on `Queryable`, where lambda
//! arguments are quoted (`Expression<Func<..>>`) and sources are
//! `Queryable<T>`, and on `Enumerable`, where they are plain `Func<..>` over
//! `Seq<T>`. Both flavors accept either a closure or a quoted lambda at run
//! time. Filtering, projection and ordering are deferred; aggregates and
//! element operators enumerate eagerly.

use crate::expression::eval::{apply_binary, as_function, default_value};
use crate::expression::{BinaryOperator, ExecutionError, ExecutionResult, TerminalOutcome};
use crate::types::{method_impl, Method, MethodImpl, MethodTemplate, Type, TypeRegistry};
use crate::value::{Function, LazySequence, SortKey, Value};
use std::cmp::Ordering;

/// Registers every built-in on `registry`
pub fn register(registry: &TypeRegistry) {
    for class in ["Queryable", "Enumerable", "Math"] {
        registry.register_type(Type::static_class(class));
    }
    for flavor in [Flavor::Queryable, Flavor::Enumerable] {
        register_filtering(registry, flavor);
        register_ordering(registry, flavor);
        register_partitioning(registry, flavor);
        register_aggregates(registry, flavor);
        register_element_operators(registry, flavor);
    }
    register_string_methods(registry);
    register_collection_methods(registry);
    register_math(registry);
}

#[derive(Debug, Clone, Copy)]
enum Flavor {
    Queryable,
    Enumerable,
}

impl Flavor {
    fn class(self) -> &'static str {
        match self {
            Flavor::Queryable => "Queryable",
            Flavor::Enumerable => "Enumerable",
        }
    }

    fn sequence(self, element: &Type) -> Type {
        match self {
            Flavor::Queryable => Type::queryable(element.clone()),
            Flavor::Enumerable => Type::seq(element.clone()),
        }
    }

    fn lambda(self, parameter: &Type, result: Type) -> Type {
        let func = Type::func(vec![parameter.clone()], result);
        match self {
            Flavor::Queryable => Type::expression(func),
            Flavor::Enumerable => func,
        }
    }
}

/// Signature and body of one instantiation
type Instantiation = (Vec<Type>, Type, MethodImpl);

fn define<F>(
    registry: &TypeRegistry,
    flavor: Flavor,
    name: &'static str,
    generic_arity: usize,
    parameter_count: usize,
    build: F,
) where
    F: Fn(&[Type]) -> Instantiation + Send + Sync + 'static,
{
    let declaring = Type::static_class(flavor.class());
    registry.register_method(MethodTemplate::new(
        declaring,
        name,
        generic_arity,
        parameter_count,
        move |declaring, generics| {
            let (parameters, result, implementation) = build(generics);
            Method::new_static(
                declaring.clone(),
                name,
                generics.to_vec(),
                parameters,
                result,
                implementation,
            )
        },
    ));
}

fn deferred(
    producer: impl Fn() -> ExecutionResult<Vec<Value>> + Send + Sync + 'static,
) -> Value {
    Value::Sequence(LazySequence::new(producer))
}

fn holds(predicate: &Function, item: &Value) -> ExecutionResult<bool> {
    match predicate.call(std::slice::from_ref(item))? {
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        other => Err(ExecutionError::InvalidCast {
            value: other.to_string(),
            target: "Boolean".to_string(),
        }),
    }
}

fn matching(source: &Value, predicate: Option<&Value>) -> ExecutionResult<Vec<Value>> {
    let items = source.enumerate()?;
    match predicate {
        None => Ok(items),
        Some(predicate) => {
            let predicate = as_function(predicate)?;
            let mut out = Vec::new();
            for item in items {
                if holds(&predicate, &item)? {
                    out.push(item);
                }
            }
            Ok(out)
        }
    }
}

fn as_count(value: &Value) -> ExecutionResult<i64> {
    value.as_i64().ok_or_else(|| ExecutionError::InvalidCast {
        value: value.to_string(),
        target: "Int32".to_string(),
    })
}

fn register_filtering(registry: &TypeRegistry, flavor: Flavor) {
    define(registry, flavor, "Where", 1, 2, move |g| {
        let t = &g[0];
        (
            vec![flavor.sequence(t), flavor.lambda(t, Type::boolean())],
            flavor.sequence(t),
            method_impl(|_, args| {
                let source = args[0].clone();
                let predicate = args[1].clone();
                Ok(deferred(move || matching(&source, Some(&predicate))))
            }),
        )
    });

    define(registry, flavor, "Select", 2, 2, move |g| {
        let (t, r) = (&g[0], &g[1]);
        (
            vec![flavor.sequence(t), flavor.lambda(t, r.clone())],
            flavor.sequence(r),
            method_impl(|_, args| {
                let source = args[0].clone();
                let selector = as_function(&args[1])?;
                Ok(deferred(move || {
                    source
                        .enumerate()?
                        .iter()
                        .map(|item| selector.call(std::slice::from_ref(item)))
                        .collect()
                }))
            }),
        )
    });

    define(registry, flavor, "SelectMany", 2, 2, move |g| {
        let (t, r) = (&g[0], &g[1]);
        (
            vec![flavor.sequence(t), flavor.lambda(t, Type::seq(r.clone()))],
            flavor.sequence(r),
            method_impl(|_, args| {
                let source = args[0].clone();
                let selector = as_function(&args[1])?;
                Ok(deferred(move || {
                    let mut out = Vec::new();
                    for item in source.enumerate()? {
                        out.extend(selector.call(&[item])?.enumerate()?);
                    }
                    Ok(out)
                }))
            }),
        )
    });

    define(registry, flavor, "Distinct", 1, 1, move |g| {
        let t = &g[0];
        (
            vec![flavor.sequence(t)],
            flavor.sequence(t),
            method_impl(|_, args| {
                let source = args[0].clone();
                Ok(deferred(move || {
                    let mut out: Vec<Value> = Vec::new();
                    for item in source.enumerate()? {
                        if !out.contains(&item) {
                            out.push(item);
                        }
                    }
                    Ok(out)
                }))
            }),
        )
    });
}

fn register_ordering(registry: &TypeRegistry, flavor: Flavor) {
    for (name, descending) in [("OrderBy", false), ("OrderByDescending", true)] {
        define(registry, flavor, name, 2, 2, move |g| {
            let (t, k) = (&g[0], &g[1]);
            (
                vec![flavor.sequence(t), flavor.lambda(t, k.clone())],
                flavor.sequence(t),
                method_impl(move |_, args| {
                    let source = args[0].clone();
                    let selector = as_function(&args[1])?;
                    let unsorted = LazySequence::new(move || source.enumerate());
                    Ok(Value::Sequence(LazySequence::ordered(
                        unsorted,
                        vec![SortKey {
                            selector,
                            descending,
                        }],
                    )))
                }),
            )
        });
    }

    for (name, descending) in [("ThenBy", false), ("ThenByDescending", true)] {
        define(registry, flavor, name, 2, 2, move |g| {
            let (t, k) = (&g[0], &g[1]);
            (
                vec![flavor.sequence(t), flavor.lambda(t, k.clone())],
                flavor.sequence(t),
                method_impl(move |_, args| {
                    let spec = match &args[0] {
                        Value::Sequence(sequence) => sequence.ordering().cloned(),
                        _ => None,
                    }
                    .ok_or_else(|| {
                        ExecutionError::NotSupported(format!("{} on an unordered sequence", name))
                    })?;
                    let mut keys = spec.keys;
                    keys.push(SortKey {
                        selector: as_function(&args[1])?,
                        descending,
                    });
                    Ok(Value::Sequence(LazySequence::ordered(spec.source, keys)))
                }),
            )
        });
    }
}

fn register_partitioning(registry: &TypeRegistry, flavor: Flavor) {
    for (name, taking) in [("Take", true), ("Skip", false)] {
        define(registry, flavor, name, 1, 2, move |g| {
            let t = &g[0];
            (
                vec![flavor.sequence(t), Type::int32()],
                flavor.sequence(t),
                method_impl(move |_, args| {
                    let source = args[0].clone();
                    let count = usize::try_from(as_count(&args[1])?).unwrap_or(0);
                    Ok(deferred(move || {
                        let items = source.enumerate()?.into_iter();
                        Ok(if taking {
                            items.take(count).collect()
                        } else {
                            items.skip(count).collect()
                        })
                    }))
                }),
            )
        });
    }
}

fn zero(ty: &Type) -> Value {
    match default_value(ty) {
        Value::Null => Value::Int(0),
        zero => zero,
    }
}

fn projected(source: &Value, selector: Option<&Value>) -> ExecutionResult<Vec<Value>> {
    let items = source.enumerate()?;
    match selector {
        None => Ok(items),
        Some(selector) => {
            let selector = as_function(selector)?;
            items
                .iter()
                .map(|item| selector.call(std::slice::from_ref(item)))
                .collect()
        }
    }
}

fn extreme(values: Vec<Value>, keep: Ordering) -> ExecutionResult<Value> {
    let mut best: Option<Value> = None;
    for value in values.into_iter().filter(|v| !v.is_null()) {
        best = match best {
            Some(current) => {
                let ordering = value.compare(&current).ok_or_else(|| {
                    ExecutionError::InvalidOperandTypes {
                        operator: "compare".to_string(),
                        left: value.type_name(),
                        right: current.type_name(),
                    }
                })?;
                Some(if ordering == keep { value } else { current })
            }
            None => Some(value),
        };
    }
    best.ok_or(ExecutionError::Terminal(TerminalOutcome::NoElements))
}

fn register_aggregates(registry: &TypeRegistry, flavor: Flavor) {
    for parameter_count in [1, 2] {
        let with_predicate = parameter_count == 2;
        let predicate_arg = move |args: &[Value]| -> Option<Value> {
            if with_predicate {
                Some(args[1].clone())
            } else {
                None
            }
        };
        let parameters = move |t: &Type| {
            let mut parameters = vec![flavor.sequence(t)];
            if with_predicate {
                parameters.push(flavor.lambda(t, Type::boolean()));
            }
            parameters
        };

        define(registry, flavor, "Count", 1, parameter_count, move |g| {
            (
                parameters(&g[0]),
                Type::int32(),
                method_impl(move |_, args| {
                    let count = matching(&args[0], predicate_arg(args).as_ref())?.len();
                    Ok(Value::Int(count as i32))
                }),
            )
        });

        define(registry, flavor, "LongCount", 1, parameter_count, move |g| {
            (
                parameters(&g[0]),
                Type::int64(),
                method_impl(move |_, args| {
                    let count = matching(&args[0], predicate_arg(args).as_ref())?.len();
                    Ok(Value::Long(count as i64))
                }),
            )
        });

        define(registry, flavor, "Any", 1, parameter_count, move |g| {
            (
                parameters(&g[0]),
                Type::boolean(),
                method_impl(move |_, args| {
                    let found = !matching(&args[0], predicate_arg(args).as_ref())?.is_empty();
                    Ok(Value::Bool(found))
                }),
            )
        });
    }

    define(registry, flavor, "All", 1, 2, move |g| {
        let t = &g[0];
        (
            vec![flavor.sequence(t), flavor.lambda(t, Type::boolean())],
            Type::boolean(),
            method_impl(|_, args| {
                let predicate = as_function(&args[1])?;
                for item in args[0].enumerate()? {
                    if !holds(&predicate, &item)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }),
        )
    });

    define(registry, flavor, "Contains", 1, 2, move |g| {
        let t = &g[0];
        (
            vec![flavor.sequence(t), t.clone()],
            Type::boolean(),
            method_impl(|_, args| Ok(Value::Bool(args[0].enumerate()?.contains(&args[1])))),
        )
    });

    // Sum, Min, Max and Average come as `<T>(seq)` and `<T, R>(seq, selector)`
    for (generic_arity, parameter_count) in [(1, 1), (2, 2)] {
        let signature = move |g: &[Type]| {
            let t = &g[0];
            let r = g.get(1).unwrap_or(t).clone();
            let mut parameters = vec![flavor.sequence(t)];
            if parameter_count == 2 {
                parameters.push(flavor.lambda(t, r.clone()));
            }
            (parameters, r)
        };

        define(registry, flavor, "Sum", generic_arity, parameter_count, move |g| {
            let (parameters, r) = signature(g);
            let start = zero(&r);
            (
                parameters,
                r,
                method_impl(move |_, args| {
                    let mut total = start.clone();
                    for value in projected(&args[0], args.get(1))? {
                        if !value.is_null() {
                            total = apply_binary(BinaryOperator::Add, total, value)?;
                        }
                    }
                    Ok(total)
                }),
            )
        });

        for (name, keep) in [("Min", Ordering::Less), ("Max", Ordering::Greater)] {
            define(registry, flavor, name, generic_arity, parameter_count, move |g| {
                let (parameters, r) = signature(g);
                (
                    parameters,
                    r,
                    method_impl(move |_, args| extreme(projected(&args[0], args.get(1))?, keep)),
                )
            });
        }

        define(registry, flavor, "Average", generic_arity, parameter_count, move |g| {
            let (parameters, _) = signature(g);
            (
                parameters,
                Type::double(),
                method_impl(|_, args| {
                    let values: Vec<f64> = projected(&args[0], args.get(1))?
                        .iter()
                        .filter_map(Value::as_f64)
                        .collect();
                    if values.is_empty() {
                        return Err(ExecutionError::Terminal(TerminalOutcome::NoElements));
                    }
                    Ok(Value::Double(values.iter().sum::<f64>() / values.len() as f64))
                }),
            )
        });
    }
}

#[derive(Debug, Clone, Copy)]
enum Pick {
    First,
    Last,
    Single,
}

fn pick(items: Vec<Value>, pick: Pick) -> Result<Value, TerminalOutcome> {
    let mut items = items.into_iter();
    match pick {
        Pick::First => items.next().ok_or(TerminalOutcome::NoElements),
        Pick::Last => items.last().ok_or(TerminalOutcome::NoElements),
        Pick::Single => match (items.next(), items.next()) {
            (Some(only), None) => Ok(only),
            (None, _) => Err(TerminalOutcome::NoElements),
            (Some(first), Some(second)) => Err(TerminalOutcome::MoreThanOneElement(
                Box::new(first),
                Box::new(second),
            )),
        },
    }
}

fn register_element_operators(registry: &TypeRegistry, flavor: Flavor) {
    let operators = [
        ("First", Pick::First, false),
        ("FirstOrDefault", Pick::First, true),
        ("Last", Pick::Last, false),
        ("LastOrDefault", Pick::Last, true),
        ("Single", Pick::Single, false),
        ("SingleOrDefault", Pick::Single, true),
    ];
    for (name, which, or_default) in operators {
        for parameter_count in [1, 2] {
            define(registry, flavor, name, 1, parameter_count, move |g| {
                let t = g[0].clone();
                let fallback = default_value(&t);
                let mut parameters = vec![flavor.sequence(&t)];
                if parameter_count == 2 {
                    parameters.push(flavor.lambda(&t, Type::boolean()));
                }
                (
                    parameters,
                    t,
                    method_impl(move |_, args| {
                        let items = matching(&args[0], args.get(1))?;
                        match pick(items, which) {
                            Ok(value) => Ok(value),
                            // an ambiguous single stays an error even with a default
                            Err(TerminalOutcome::NoElements) if or_default => Ok(fallback.clone()),
                            Err(outcome) => Err(ExecutionError::Terminal(outcome)),
                        }
                    }),
                )
            });
        }
    }

    define(registry, flavor, "ElementAt", 1, 2, move |g| {
        let t = &g[0];
        (
            vec![flavor.sequence(t), Type::int32()],
            t.clone(),
            method_impl(|_, args| {
                let items = args[0].enumerate()?;
                let index = as_count(&args[1])?;
                usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i))
                    .cloned()
                    .ok_or(ExecutionError::IndexOutOfRange {
                        index,
                        length: items.len(),
                    })
            }),
        )
    });

    define(registry, flavor, "ToArray", 1, 1, move |g| {
        let t = &g[0];
        (
            vec![flavor.sequence(t)],
            Type::array(t.clone()),
            method_impl(|_, args| Ok(Value::Array(args[0].enumerate()?))),
        )
    });
}

fn string_arg<'a>(args: &'a [Value], index: usize, callee: &str) -> ExecutionResult<&'a str> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(Value::Null) | None => Err(ExecutionError::NullReference(callee.to_string())),
        Some(other) => Err(ExecutionError::InvalidCast {
            value: other.to_string(),
            target: "String".to_string(),
        }),
    }
}

fn string_method<F>(registry: &TypeRegistry, name: &'static str, parameters: Vec<Type>, result: Type, f: F)
where
    F: Fn(&str, &[Value]) -> ExecutionResult<Value> + Send + Sync + 'static,
{
    let method = Method::new_instance(
        Type::string(),
        name,
        parameters,
        result,
        method_impl(move |instance, args| match instance {
            Some(Value::String(s)) => f(s.as_str(), args),
            Some(other) => Err(ExecutionError::InvalidCast {
                value: other.to_string(),
                target: "String".to_string(),
            }),
            None => Err(ExecutionError::NullReference(name.to_string())),
        }),
    );
    registry.register_method(MethodTemplate::fixed(method));
}

fn substring(s: &str, start: i64, length: Option<i64>) -> ExecutionResult<Value> {
    let chars: Vec<char> = s.chars().collect();
    let out_of_range = |index: i64| ExecutionError::IndexOutOfRange {
        index,
        length: chars.len(),
    };
    let begin = usize::try_from(start)
        .ok()
        .filter(|b| *b <= chars.len())
        .ok_or_else(|| out_of_range(start))?;
    let end = match length {
        Some(length) => usize::try_from(length)
            .ok()
            .map(|l| begin + l)
            .filter(|e| *e <= chars.len())
            .ok_or_else(|| out_of_range(start + length))?,
        None => chars.len(),
    };
    Ok(Value::String(chars[begin..end].iter().collect()))
}

fn register_string_methods(registry: &TypeRegistry) {
    let string = Type::string;

    string_method(registry, "Contains", vec![string()], Type::boolean(), |s, args| {
        Ok(Value::Bool(s.contains(string_arg(args, 0, "Contains")?)))
    });
    string_method(registry, "StartsWith", vec![string()], Type::boolean(), |s, args| {
        Ok(Value::Bool(s.starts_with(string_arg(args, 0, "StartsWith")?)))
    });
    string_method(registry, "EndsWith", vec![string()], Type::boolean(), |s, args| {
        Ok(Value::Bool(s.ends_with(string_arg(args, 0, "EndsWith")?)))
    });
    string_method(registry, "ToUpper", vec![], string(), |s, _| Ok(Value::from(s.to_uppercase())));
    string_method(registry, "ToLower", vec![], string(), |s, _| Ok(Value::from(s.to_lowercase())));
    string_method(registry, "Trim", vec![], string(), |s, _| Ok(Value::from(s.trim())));
    string_method(registry, "Substring", vec![Type::int32()], string(), |s, args| {
        substring(s, as_count(&args[0])?, None)
    });
    string_method(
        registry,
        "Substring",
        vec![Type::int32(), Type::int32()],
        string(),
        |s, args| substring(s, as_count(&args[0])?, Some(as_count(&args[1])?)),
    );

    registry.register_method(MethodTemplate::fixed(Method::new_static(
        string(),
        "Concat",
        Vec::new(),
        vec![string(), string()],
        string(),
        method_impl(|_, args| {
            let part = |value: &Value| match value {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Ok(Value::String(format!("{}{}", part(&args[0]), part(&args[1]))))
        }),
    )));
    registry.register_method(MethodTemplate::fixed(Method::new_static(
        string(),
        "IsNullOrEmpty",
        Vec::new(),
        vec![string()],
        Type::boolean(),
        method_impl(|_, args| {
            Ok(Value::Bool(match &args[0] {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                _ => false,
            }))
        }),
    )));
}

fn register_collection_methods(registry: &TypeRegistry) {
    registry.register_method(MethodTemplate::fixed(Method::new_instance(
        Type::dynamic_object(),
        "get_Item",
        vec![Type::string()],
        Type::object(),
        method_impl(|instance, args| {
            let key = string_arg(args, 0, "get_Item")?;
            match instance {
                Some(Value::Dynamic(properties)) => Ok(properties
                    .iter()
                    .find(|(name, _)| name == key)
                    .map(|(_, value)| value.clone())
                    .unwrap_or(Value::Null)),
                Some(Value::Record(record)) => Ok(record.field(key).cloned().unwrap_or(Value::Null)),
                _ => Err(ExecutionError::NullReference("get_Item".to_string())),
            }
        }),
    )));

    // List<T>.Add returns the extended list
    registry.register_method(MethodTemplate::new(
        Type::list(Type::object()),
        "Add",
        0,
        1,
        |declaring, _| {
            let element = declaring.element_type().cloned().unwrap_or_else(Type::object);
            Method::new_instance(
                declaring.clone(),
                "Add",
                vec![element],
                declaring.clone(),
                method_impl(|instance, args| match instance {
                    Some(Value::Array(items)) => {
                        let mut items = items.clone();
                        items.push(args[0].clone());
                        Ok(Value::Array(items))
                    }
                    _ => Err(ExecutionError::NullReference("Add".to_string())),
                }),
            )
        },
    ));
}

fn math(registry: &TypeRegistry, name: &'static str, parameters: Vec<Type>, result: Type, implementation: MethodImpl) {
    registry.register_method(MethodTemplate::fixed(Method::new_static(
        Type::static_class("Math"),
        name,
        Vec::new(),
        parameters,
        result,
        implementation,
    )));
}

fn double_arg(args: &[Value], index: usize) -> ExecutionResult<f64> {
    args[index].as_f64().ok_or_else(|| ExecutionError::InvalidCast {
        value: args[index].to_string(),
        target: "Double".to_string(),
    })
}

fn register_math(registry: &TypeRegistry) {
    let (int, double) = (Type::int32, Type::double);

    math(registry, "Abs", vec![int()], int(), method_impl(|_, args| match &args[0] {
        Value::Int(i) => Ok(Value::Int(i.wrapping_abs())),
        other => Err(ExecutionError::InvalidCast {
            value: other.to_string(),
            target: "Int32".to_string(),
        }),
    }));
    math(registry, "Abs", vec![double()], double(), method_impl(|_, args| {
        Ok(Value::Double(double_arg(args, 0)?.abs()))
    }));
    math(registry, "Round", vec![double()], double(), method_impl(|_, args| {
        // banker's rounding
        let x = double_arg(args, 0)?;
        let rounded = x.round();
        let adjusted = if (x - x.trunc()).abs() == 0.5 && rounded % 2.0 != 0.0 {
            rounded - x.signum()
        } else {
            rounded
        };
        Ok(Value::Double(adjusted))
    }));
    math(registry, "Sqrt", vec![double()], double(), method_impl(|_, args| {
        Ok(Value::Double(double_arg(args, 0)?.sqrt()))
    }));
    math(registry, "Pow", vec![double(), double()], double(), method_impl(|_, args| {
        Ok(Value::Double(double_arg(args, 0)?.powf(double_arg(args, 1)?)))
    }));
    for (name, keep) in [("Max", Ordering::Greater), ("Min", Ordering::Less)] {
        for ty in [int(), double()] {
            math(
                registry,
                name,
                vec![ty.clone(), ty.clone()],
                ty,
                method_impl(move |_, args| extreme(args.to_vec(), keep)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeResolver;
    use crate::types::{MethodInfo, TypeInfo};

    fn registry() -> TypeRegistry {
        TypeRegistry::with_builtins()
    }

    fn ints(values: &[i32]) -> Value {
        Value::Array(values.iter().map(|v| Value::Int(*v)).collect())
    }

    fn lambda(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Value {
        Value::Function(Function::new(1, move |args| Ok(f(&args[0]))))
    }

    fn call(name: &str, generics: &[Type], args: &[Value]) -> ExecutionResult<Value> {
        let method = registry()
            .method("Enumerable", name, generics, args.len())
            .unwrap();
        method.invoke(None, args)
    }

    #[test]
    fn test_where_is_deferred() {
        let result = call(
            "Where",
            &[Type::int32()],
            &[ints(&[1, 5, 10]), lambda(|v| Value::Bool(v.as_i64() > Some(3)))],
        )
        .unwrap();
        assert!(matches!(result, Value::Sequence(_)));
        assert_eq!(result.materialize().unwrap(), ints(&[5, 10]));
    }

    #[test]
    fn test_order_then_by() {
        let pairs = Value::Array(vec![
            Value::Array(vec![Value::Int(2), Value::from("b")]),
            Value::Array(vec![Value::Int(1), Value::from("z")]),
            Value::Array(vec![Value::Int(2), Value::from("a")]),
        ]);
        let first = |v: &Value| match v {
            Value::Array(items) => items[0].clone(),
            _ => Value::Null,
        };
        let second = |v: &Value| match v {
            Value::Array(items) => items[1].clone(),
            _ => Value::Null,
        };
        let element = Type::array(Type::object());
        let ordered = call(
            "OrderByDescending",
            &[element.clone(), Type::int32()],
            &[pairs, lambda(first)],
        )
        .unwrap();
        let refined = call("ThenBy", &[element, Type::string()], &[ordered, lambda(second)]).unwrap();
        let names: Vec<Value> = refined.enumerate().unwrap().iter().map(second).collect();
        assert_eq!(names, vec![Value::from("a"), Value::from("b"), Value::from("z")]);
    }

    #[test]
    fn test_then_by_requires_ordering() {
        let result = call(
            "ThenBy",
            &[Type::int32(), Type::int32()],
            &[ints(&[1]), lambda(|v| v.clone())],
        );
        assert!(matches!(result, Err(ExecutionError::NotSupported(_))));
    }

    #[test]
    fn test_terminal_outcomes() {
        let t = [Type::int32()];
        assert_eq!(
            call("Single", &t, &[ints(&[]), lambda(|_| Value::Bool(true))]).unwrap_err().to_string(),
            "Sequence contains no matching element"
        );
        match call("Single", &t, &[ints(&[4, 5, 6])]) {
            Err(ExecutionError::Terminal(TerminalOutcome::MoreThanOneElement(a, b))) => {
                assert_eq!(*a, Value::Int(4));
                assert_eq!(*b, Value::Int(5));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(call("FirstOrDefault", &t, &[ints(&[])]).unwrap(), Value::Int(0));
        assert!(call("SingleOrDefault", &t, &[ints(&[1, 2])]).is_err());
        assert_eq!(call("Last", &t, &[ints(&[1, 2])]).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_aggregates() {
        let t = [Type::int32()];
        assert_eq!(call("Sum", &t, &[ints(&[1, 2, 3])]).unwrap(), Value::Int(6));
        assert_eq!(call("Max", &t, &[ints(&[1, 7, 3])]).unwrap(), Value::Int(7));
        assert_eq!(call("Average", &t, &[ints(&[1, 2])]).unwrap(), Value::Double(1.5));
        assert_eq!(call("Count", &t, &[ints(&[1, 2])]).unwrap(), Value::Int(2));
        assert_eq!(call("Contains", &t, &[ints(&[1, 2]), Value::Int(2)]).unwrap(), Value::Bool(true));
        assert!(matches!(
            call("Min", &t, &[ints(&[])]),
            Err(ExecutionError::Terminal(TerminalOutcome::NoElements))
        ));
    }

    #[test]
    fn test_resolve_by_descriptor() {
        let registry = registry();
        let info = MethodInfo {
            declaring_type: TypeInfo::new("Math"),
            name: "Max".to_string(),
            generic_arguments: Vec::new(),
            parameter_types: vec![TypeInfo::new("Double"), TypeInfo::new("Double")],
        };
        let method = registry.resolve_method(&info).unwrap();
        assert_eq!(method.return_type(), &Type::double());
        assert_eq!(
            method.invoke(None, &[Value::Double(1.5), Value::Double(2.5)]).unwrap(),
            Value::Double(2.5)
        );
    }

    #[test]
    fn test_string_methods() {
        let registry = registry();
        let info = |name: &str, params: Vec<TypeInfo>| MethodInfo {
            declaring_type: TypeInfo::new("String"),
            name: name.to_string(),
            generic_arguments: Vec::new(),
            parameter_types: params,
        };
        let starts = registry
            .resolve_method(&info("StartsWith", vec![TypeInfo::new("String")]))
            .unwrap();
        assert_eq!(
            starts.invoke(Some(&Value::from("hello")), &[Value::from("he")]).unwrap(),
            Value::Bool(true)
        );
        let substring = registry
            .resolve_method(&info("Substring", vec![TypeInfo::new("Int32"), TypeInfo::new("Int32")]))
            .unwrap();
        assert_eq!(
            substring.invoke(Some(&Value::from("hello")), &[Value::Int(1), Value::Int(3)]).unwrap(),
            Value::from("ell")
        );
        assert!(substring
            .invoke(Some(&Value::from("hi")), &[Value::Int(1), Value::Int(5)])
            .is_err());
    }

    #[test]
    fn test_list_add() {
        let registry = registry();
        let info = MethodInfo {
            declaring_type: TypeInfo::generic("List", vec![TypeInfo::new("Int32")]),
            name: "Add".to_string(),
            generic_arguments: Vec::new(),
            parameter_types: vec![TypeInfo::new("Int32")],
        };
        let add = registry.resolve_method(&info).unwrap();
        assert_eq!(add.return_type(), &Type::list(Type::int32()));
        assert_eq!(add.invoke(Some(&ints(&[1])), &[Value::Int(2)]).unwrap(), ints(&[1, 2]));
    }
}
