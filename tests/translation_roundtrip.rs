use rand::Rng;
use remote_query::config::TranslationOptions;
use remote_query::expression::{
    compile_lambda, BinaryOperator, CatchBlock, ElementInit, Expr, MemberBinding, Parameter,
    Scope, UnaryOperator,
};
use remote_query::translation::{to_ast, to_native};
use remote_query::types::{Constructor, Member, MethodInfo, Type, TypeInfo, TypeRegistry, TypeResolver};
use remote_query::value::{Record, Value};
use std::sync::Arc;

fn product_type() -> Type {
    Type::record("Product", vec![("Name", Type::string()), ("Price", Type::int32())])
}

fn registry() -> TypeRegistry {
    let registry = TypeRegistry::with_builtins();
    registry.register_type(product_type());
    registry
}

/// `try { x > 1 ? throw "boom" : "ok" } catch (string e) { e }`
fn guarded_throw(x: &Parameter) -> Expr {
    let e = Parameter::new("e", Type::string());
    Expr::Try {
        ty: Type::string(),
        body: Box::new(Expr::conditional(
            Expr::binary(BinaryOperator::GreaterThan, Expr::parameter(x), Expr::int(1)),
            Expr::Unary {
                op: UnaryOperator::Throw,
                operand: Box::new(Expr::string("boom")),
                ty: Type::string(),
                method: None,
            },
            Expr::string("ok"),
        )),
        handlers: vec![CatchBlock {
            test: Type::string(),
            variable: Some(e.clone()),
            filter: None,
            body: Expr::parameter(&e),
        }],
        finally: None,
        fault: None,
    }
}

fn lambdas(registry: &TypeRegistry) -> Vec<(&'static str, Expr)> {
    let x = Parameter::new("x", Type::int32());
    let px = || Expr::parameter(&x);
    let int = Type::int32();

    let contains = registry
        .method("Enumerable", "Contains", &[int.clone()], 2)
        .unwrap();
    let abs = registry.method("Math", "Abs", &[], 1).unwrap();
    let list_add = registry
        .resolve_method(&MethodInfo {
            declaring_type: TypeInfo::generic("List", vec![TypeInfo::new("Int32")]),
            name: "Add".to_string(),
            generic_arguments: Vec::new(),
            parameter_types: vec![TypeInfo::new("Int32")],
        })
        .unwrap();
    let product = product_type();
    let price = Member::find(&product, "Price").unwrap();
    let v = Parameter::new("v", int.clone());

    vec![
        (
            "x * 3 + 7",
            Expr::binary(
                BinaryOperator::Add,
                Expr::binary(BinaryOperator::Multiply, px(), Expr::int(3)),
                Expr::int(7),
            ),
        ),
        (
            "x > 0 ? x - 50 : -x",
            Expr::conditional(
                Expr::binary(BinaryOperator::GreaterThan, px(), Expr::int(0)),
                Expr::binary(BinaryOperator::Subtract, px(), Expr::int(50)),
                Expr::unary(UnaryOperator::Negate, px()),
            ),
        ),
        (
            "x % 7 == 0 || x < 10",
            Expr::binary(
                BinaryOperator::OrElse,
                Expr::binary(
                    BinaryOperator::Equal,
                    Expr::binary(BinaryOperator::Modulo, px(), Expr::int(7)),
                    Expr::int(0),
                ),
                Expr::binary(BinaryOperator::LessThan, px(), Expr::int(10)),
            ),
        ),
        (
            "[1, 5, 9].Contains(x)",
            Expr::call(
                None,
                contains,
                vec![
                    Expr::constant(
                        Value::Array(vec![Value::Int(1), Value::Int(5), Value::Int(9)]),
                        Type::seq(int.clone()),
                    ),
                    px(),
                ],
            ),
        ),
        (
            "Math.Abs(x) + new[] { x, x }.Length",
            Expr::binary(
                BinaryOperator::Add,
                Expr::call(None, abs, vec![px()]),
                Expr::unary(
                    UnaryOperator::ArrayLength,
                    Expr::new_array(int.clone(), vec![px(), px()]),
                ),
            ),
        ),
        (
            "(2 + 3) * x",
            Expr::binary(
                BinaryOperator::Multiply,
                Expr::binary(BinaryOperator::Add, Expr::int(2), Expr::int(3)),
                px(),
            ),
        ),
        (
            "new List<int> { x, x + 1 }",
            Expr::ListInit {
                new: Box::new(Expr::New {
                    constructor: Constructor::new(Type::list(int.clone()), Vec::new()),
                    arguments: Vec::new(),
                    members: None,
                }),
                initializers: vec![
                    ElementInit {
                        add_method: list_add.clone(),
                        arguments: vec![px()],
                    },
                    ElementInit {
                        add_method: list_add,
                        arguments: vec![Expr::binary(BinaryOperator::Add, px(), Expr::int(1))],
                    },
                ],
            },
        ),
        (
            "new Product(\"n\", 0) { Price = x }",
            Expr::MemberInit {
                new: Box::new(Expr::New {
                    constructor: Constructor::for_record(&product).unwrap(),
                    arguments: vec![Expr::string("n"), Expr::int(0)],
                    members: None,
                }),
                bindings: vec![MemberBinding::Assignment {
                    member: price,
                    expression: px(),
                }],
            },
        ),
        ("try { x > 1 ? throw \"boom\" : \"ok\" } catch (string e) { e }", guarded_throw(&x)),
        (
            "(object)x is Int32 && x > 0",
            Expr::binary(
                BinaryOperator::AndAlso,
                Expr::TypeIs {
                    operand: Box::new(Expr::convert(px(), Type::object())),
                    ty: int.clone(),
                },
                Expr::binary(BinaryOperator::GreaterThan, px(), Expr::int(0)),
            ),
        ),
        (
            "{ int v; v = x + 1; v * v }",
            Expr::Block {
                ty: int.clone(),
                variables: vec![v.clone()],
                expressions: vec![
                    Expr::binary(
                        BinaryOperator::Assign,
                        Expr::parameter(&v),
                        Expr::binary(BinaryOperator::Add, px(), Expr::int(1)),
                    ),
                    Expr::binary(BinaryOperator::Multiply, Expr::parameter(&v), Expr::parameter(&v)),
                ],
            },
        ),
    ]
    .into_iter()
    .map(|(name, body)| (name, Expr::lambda(vec![x.clone()], body)))
    .collect()
}

fn apply(lambda: &Expr, x: i32) -> Value {
    let Expr::Lambda(lambda) = lambda else {
        panic!("expected lambda, got {}", lambda);
    };
    compile_lambda(lambda, &Scope::new())
        .call(&[Value::Int(x)])
        .unwrap()
}

#[test]
fn test_round_trip_preserves_results() {
    let registry = registry();
    let mut rng = rand::thread_rng();
    for options in [
        TranslationOptions::default(),
        TranslationOptions {
            evaluate_locally: false,
            ..TranslationOptions::default()
        },
    ] {
        for (name, original) in lambdas(&registry) {
            let ast = to_ast(&original, &options).unwrap();
            let restored = to_native(&ast, &registry).unwrap();
            for _ in 0..50 {
                let x = rng.gen_range(-100..100);
                assert_eq!(apply(&original, x), apply(&restored, x), "{} at x = {}", name, x);
            }
        }
    }
}

#[test]
fn test_second_round_trip_is_stable() {
    let registry = registry();
    let options = TranslationOptions::default();
    for (name, original) in lambdas(&registry) {
        let first = to_ast(&original, &options).unwrap();
        let second = to_ast(&to_native(&first, &registry).unwrap(), &options).unwrap();
        assert_eq!(first, second, "{}", name);
    }
}

#[test]
fn test_local_evaluation_folds_closed_subtrees() {
    let registry = registry();
    let (_, original) = lambdas(&registry)
        .into_iter()
        .find(|(name, _)| *name == "(2 + 3) * x")
        .unwrap();
    let ast = to_ast(&original, &TranslationOptions::default()).unwrap();
    let rendered = ast.to_string();
    assert!(rendered.contains('5'), "{}", rendered);
    assert!(!rendered.contains('+'), "{}", rendered);
}

#[test]
fn test_guarded_throw_runs_only_on_its_branch() {
    let registry = registry();
    let x = Parameter::new("x", Type::int32());
    let original = Expr::lambda(vec![x.clone()], guarded_throw(&x));
    let ast = to_ast(&original, &TranslationOptions::default()).unwrap();
    let restored = to_native(&ast, &registry).unwrap();
    assert_eq!(apply(&restored, 0), Value::from("ok"));
    assert_eq!(apply(&restored, 3), Value::from("boom"));
}

#[test]
fn test_initializers_survive_the_round_trip() {
    let registry = registry();
    let lambdas = lambdas(&registry);
    let restored = |name: &str| {
        let (_, original) = lambdas.iter().find(|(n, _)| *n == name).unwrap();
        let ast = to_ast(original, &TranslationOptions::default()).unwrap();
        to_native(&ast, &registry).unwrap()
    };

    assert_eq!(
        apply(&restored("new List<int> { x, x + 1 }"), 3),
        Value::Array(vec![Value::Int(3), Value::Int(4)])
    );
    assert_eq!(
        apply(&restored("new Product(\"n\", 0) { Price = x }"), 3),
        Value::Record(Arc::new(Record::new(
            product_type(),
            vec![Value::from("n"), Value::Int(3)],
        )))
    );
}
