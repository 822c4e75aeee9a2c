//! Default type resolver backed by concurrent maps.

use crate::types::descriptor::{ConstructorInfo, MemberInfo, MethodInfo, TypeInfo};
use crate::types::member::{Constructor, Member, Method, MethodTemplate};
use crate::types::resolver::{ResolutionError, TypeResolver};
use crate::types::ty::{Type, TypeKind};
use dashmap::DashMap;

/// Registry of named types, method templates and static members.
///
/// Generic type constructors (`Seq<T>`, `Func<..>`, ...) are built in and need
/// no registration. Records and static classes are registered by name.
pub struct TypeRegistry {
    types: DashMap<String, Type>,
    methods: DashMap<(String, String), Vec<MethodTemplate>>,
    static_members: DashMap<(String, String), Member>,
    instantiated: DashMap<MethodInfo, Method>,
}

impl TypeRegistry {
    /// Registry with the primitive types only
    pub fn new() -> Self {
        let registry = Self {
            types: DashMap::new(),
            methods: DashMap::new(),
            static_members: DashMap::new(),
            instantiated: DashMap::new(),
        };
        for ty in [
            Type::void(),
            Type::boolean(),
            Type::int32(),
            Type::int64(),
            Type::double(),
            Type::char(),
            Type::string(),
            Type::object(),
            Type::exception(),
            Type::dynamic_object(),
        ] {
            registry.register_type(ty);
        }
        registry
    }

    /// Registry with the built-in query operators, string API and math helpers
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        crate::operators::register(&registry);
        registry
    }

    pub fn register_type(&self, ty: Type) {
        self.types.insert(ty.name().to_string(), ty);
    }

    pub fn register_method(&self, template: MethodTemplate) {
        let key = (
            TypeInfo::from(&template.declaring_type).name,
            template.name.clone(),
        );
        self.methods.entry(key).or_default().push(template);
    }

    pub fn register_static_member(&self, member: Member) {
        let key = (member.declaring_type.name().to_string(), member.name.clone());
        self.static_members.insert(key, member);
    }

    /// Looks up a type by canonical name
    pub fn get_type(&self, name: &str) -> Option<Type> {
        self.types.get(name).map(|entry| entry.value().clone())
    }

    /// Instantiates the overload of `declaring.name` with the given generic
    /// arguments and parameter count.
    pub fn method(
        &self,
        declaring: &str,
        name: &str,
        generic_arguments: &[Type],
        parameter_count: usize,
    ) -> Result<Method, ResolutionError> {
        let declaring_type = self
            .get_type(declaring)
            .ok_or_else(|| ResolutionError::UnknownType(declaring.to_string()))?;
        self.candidates(&declaring_type, name, generic_arguments, parameter_count)
            .into_iter()
            .next()
            .ok_or_else(|| ResolutionError::UnknownMethod(format!("{}.{}", declaring, name)))
    }

    fn candidates(
        &self,
        declaring: &Type,
        name: &str,
        generic_arguments: &[Type],
        parameter_count: usize,
    ) -> Vec<Method> {
        let key = (TypeInfo::from(declaring).name, name.to_string());
        match self.methods.get(&key) {
            Some(templates) => templates
                .iter()
                .filter(|t| {
                    t.generic_arity == generic_arguments.len()
                        && t.parameter_count == parameter_count
                })
                .map(|t| t.instantiate(declaring, generic_arguments))
                .collect(),
            None => Vec::new(),
        }
    }

    fn resolve_all(&self, infos: &[TypeInfo]) -> Result<Vec<Type>, ResolutionError> {
        infos.iter().map(|info| self.resolve_type(info)).collect()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TypeResolver for TypeRegistry {
    fn resolve_type(&self, info: &TypeInfo) -> Result<Type, ResolutionError> {
        let args = self.resolve_all(&info.generic_arguments)?;
        let single = |build: fn(Type) -> Type| match args.as_slice() {
            [inner] => Ok(build(inner.clone())),
            _ => Err(ResolutionError::GenericArity {
                name: info.name.clone(),
                expected: 1,
                actual: args.len(),
            }),
        };
        match info.name.as_str() {
            "Nullable" => single(Type::nullable),
            "Array" => single(Type::array),
            "List" => single(Type::list),
            "Seq" => single(Type::seq),
            "Expression" => single(Type::expression),
            "VariableQueryArgument" => single(Type::variable_argument),
            "VariableQueryArgumentList" => single(Type::variable_argument_list),
            // the static operator class shares its name with the generic type
            "Queryable" if !args.is_empty() => single(Type::queryable),
            "Func" => match args.split_last() {
                Some((result, parameters)) => Ok(Type::func(parameters.to_vec(), result.clone())),
                None => Err(ResolutionError::GenericArity {
                    name: info.name.clone(),
                    expected: 1,
                    actual: 0,
                }),
            },
            name if args.is_empty() => self
                .get_type(name)
                .ok_or_else(|| ResolutionError::UnknownType(info.to_string())),
            _ => Err(ResolutionError::UnknownType(info.to_string())),
        }
    }

    fn resolve_member(&self, info: &MemberInfo) -> Result<Member, ResolutionError> {
        let declaring = self.resolve_type(&info.declaring_type)?;
        let key = (declaring.name().to_string(), info.name.clone());
        if let Some(member) = self.static_members.get(&key) {
            return Ok(member.value().clone());
        }
        if matches!(declaring.kind(), TypeKind::DynamicObject) {
            // dynamic members keep the type the sender saw
            let ty = self.resolve_type(&info.member_type)?;
            return Ok(Member::new(declaring, info.name.clone(), ty));
        }
        Member::find(&declaring, &info.name)
            .ok_or_else(|| ResolutionError::UnknownMember(info.to_string()))
    }

    fn resolve_method(&self, info: &MethodInfo) -> Result<Method, ResolutionError> {
        if let Some(method) = self.instantiated.get(info) {
            return Ok(method.value().clone());
        }
        let declaring = self.resolve_type(&info.declaring_type)?;
        let generic_arguments = self.resolve_all(&info.generic_arguments)?;
        let candidates = self.candidates(
            &declaring,
            &info.name,
            &generic_arguments,
            info.parameter_types.len(),
        );
        if candidates.is_empty() {
            return Err(ResolutionError::UnknownMethod(info.to_string()));
        }
        let method = candidates
            .into_iter()
            .find(|candidate| {
                candidate
                    .parameter_types()
                    .iter()
                    .map(TypeInfo::from)
                    .eq(info.parameter_types.iter().cloned())
            })
            .ok_or_else(|| ResolutionError::UnknownMethod(info.to_string()))?;
        log::trace!("resolved method {}", info);
        self.instantiated.insert(info.clone(), method.clone());
        Ok(method)
    }

    fn resolve_constructor(&self, info: &ConstructorInfo) -> Result<Constructor, ResolutionError> {
        let declaring = self.resolve_type(&info.declaring_type)?;
        let parameter_types = self.resolve_all(&info.parameter_types)?;
        let accepted = match declaring.kind() {
            TypeKind::Record(shape) => {
                shape.fields.len() == parameter_types.len()
                    && shape
                        .fields
                        .iter()
                        .zip(&parameter_types)
                        .all(|((_, field), param)| field.is_assignable_from(param))
            }
            TypeKind::DynamicObject => true,
            TypeKind::List(_) => parameter_types.is_empty(),
            _ => false,
        };
        if !accepted {
            return Err(ResolutionError::UnknownConstructor(info.to_string()));
        }
        Ok(Constructor::new(declaring, parameter_types))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_product() -> (TypeRegistry, Type) {
        let registry = TypeRegistry::with_builtins();
        let product = Type::record(
            "Product",
            vec![("Name", Type::string()), ("Price", Type::int32())],
        );
        registry.register_type(product.clone());
        (registry, product)
    }

    #[test]
    fn test_resolve_generic_type() {
        let (registry, product) = registry_with_product();
        let info = TypeInfo::from(&Type::queryable(product.clone()));
        assert_eq!(registry.resolve_type(&info).unwrap(), Type::queryable(product));
    }

    #[test]
    fn test_queryable_static_class_and_generic_type_are_distinct() {
        let registry = TypeRegistry::with_builtins();
        let class = registry.resolve_type(&TypeInfo::new("Queryable")).unwrap();
        assert!(matches!(class.kind(), TypeKind::StaticClass(_)));
    }

    #[test]
    fn test_unknown_type() {
        let registry = TypeRegistry::new();
        assert_eq!(
            registry.resolve_type(&TypeInfo::new("Customer")),
            Err(ResolutionError::UnknownType("Customer".to_string()))
        );
    }

    #[test]
    fn test_generic_arity_mismatch() {
        let registry = TypeRegistry::new();
        let info = TypeInfo::generic("Seq", vec![TypeInfo::new("Int32"), TypeInfo::new("Int32")]);
        assert!(matches!(
            registry.resolve_type(&info),
            Err(ResolutionError::GenericArity { expected: 1, actual: 2, .. })
        ));
    }

    #[test]
    fn test_resolve_method_round_trips_descriptor() {
        let (registry, product) = registry_with_product();
        let method = registry.method("Queryable", "Where", &[product], 2).unwrap();
        let info = MethodInfo::from(&method);
        let resolved = registry.resolve_method(&info).unwrap();
        assert_eq!(resolved, method);
        assert_eq!(resolved.return_type(), method.return_type());
    }

    #[test]
    fn test_resolve_method_picks_overload_by_signature() {
        let registry = TypeRegistry::with_builtins();
        let info = MethodInfo {
            declaring_type: TypeInfo::new("Math"),
            name: "Max".to_string(),
            generic_arguments: Vec::new(),
            parameter_types: vec![TypeInfo::new("Double"), TypeInfo::new("Double")],
        };
        let method = registry.resolve_method(&info).unwrap();
        assert_eq!(method.return_type(), &Type::double());
    }

    #[test]
    fn test_unknown_method() {
        let registry = TypeRegistry::with_builtins();
        let info = MethodInfo {
            declaring_type: TypeInfo::new("Queryable"),
            name: "Frobnicate".to_string(),
            generic_arguments: Vec::new(),
            parameter_types: Vec::new(),
        };
        assert!(matches!(
            registry.resolve_method(&info),
            Err(ResolutionError::UnknownMethod(_))
        ));
    }

    #[test]
    fn test_resolve_record_member_and_constructor() {
        let (registry, product) = registry_with_product();
        let member = registry
            .resolve_member(&MemberInfo {
                declaring_type: TypeInfo::new("Product"),
                name: "Price".to_string(),
                member_type: TypeInfo::new("Int32"),
            })
            .unwrap();
        assert_eq!(member.ty, Type::int32());

        let ctor = registry
            .resolve_constructor(&ConstructorInfo {
                declaring_type: TypeInfo::new("Product"),
                parameter_types: vec![TypeInfo::new("String"), TypeInfo::new("Int32")],
            })
            .unwrap();
        assert_eq!(ctor.declaring_type, product);

        assert!(registry
            .resolve_constructor(&ConstructorInfo {
                declaring_type: TypeInfo::new("Product"),
                parameter_types: vec![TypeInfo::new("String")],
            })
            .is_err());
    }
}
