//! Wrapped type -> TypeScript type text.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;

use crate::host::{self, ANY, BOOL, CHAR, STRING, UNIT};
use crate::wrapped::{CollectionType, WrappedType};

/// Emitted for types no rule understands.
pub const UNKNOWN_TYPE: &str = "any /* unknown type */";

/// How a custom rule decides whether a property is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Nullability {
    Nullable,
    NonNull,
    #[default]
    Inherit,
}

/// A custom rule: when `predicate` matches, the type is emitted as `text`.
pub struct TypeTransformer {
    predicate: Box<dyn Fn(&WrappedType) -> bool>,
    text: String,
    nullability: Nullability,
}

impl TypeTransformer {
    pub fn new(
        predicate: impl Fn(&WrappedType) -> bool + 'static,
        text: impl Into<String>,
        nullability: Nullability,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            text: text.into(),
            nullability,
        }
    }

    /// Match properties carrying the annotation `tag`.
    ///
    /// Tags are the paths of the field's attributes (`#[serde(..)]` gives
    /// `serde`) and the values of `#[ts(tag = "...")]`.
    pub fn for_annotation(
        tag: impl Into<String>,
        text: impl Into<String>,
        nullability: Nullability,
    ) -> Self {
        let tag = tag.into();
        Self::new(move |ty| ty.has_annotation(&tag), text, nullability)
    }

    /// Match a type by canonical path, e.g. `"uuid::Uuid"`.
    pub fn for_type(
        canonical: impl Into<String>,
        text: impl Into<String>,
        nullability: Nullability,
    ) -> Self {
        let canonical = canonical.into();
        Self::new(
            move |ty| ty.canonical_name() == Some(canonical.as_str()),
            text,
            nullability,
        )
    }

    pub fn matches(&self, ty: &WrappedType) -> bool {
        (self.predicate)(ty)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn nullability(&self) -> Nullability {
        self.nullability
    }
}

impl fmt::Debug for TypeTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeTransformer")
            .field("text", &self.text)
            .field("nullability", &self.nullability)
            .finish_non_exhaustive()
    }
}

/// Primitive types that map to a fixed text when written without arguments.
const PRIMITIVES: &[(&str, &str)] = &[
    (STRING, "string"),
    (CHAR, "string"),
    (BOOL, "boolean"),
    ("i8", "number"),
    ("i16", "number"),
    ("i32", "number"),
    ("i64", "number"),
    ("i128", "number"),
    ("isize", "number"),
    ("u8", "number"),
    ("u16", "number"),
    ("u32", "number"),
    ("u64", "number"),
    ("u128", "number"),
    ("usize", "number"),
    ("f32", "number"),
    ("f64", "number"),
    ("[i8]", "Array<number>"),
    ("[i16]", "Array<number>"),
    ("[i32]", "Array<number>"),
    ("[i64]", "Array<number>"),
    ("[i128]", "Array<number>"),
    ("[isize]", "Array<number>"),
    ("[u8]", "Array<number>"),
    ("[u16]", "Array<number>"),
    ("[u32]", "Array<number>"),
    ("[u64]", "Array<number>"),
    ("[u128]", "Array<number>"),
    ("[usize]", "Array<number>"),
    ("[f32]", "Array<number>"),
    ("[f64]", "Array<number>"),
    ("[char]", "Array<string>"),
    (ANY, "any"),
    (UNIT, "null"),
];

fn primitive_text(canonical: &str) -> Option<&'static str> {
    PRIMITIVES
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, text)| *text)
}

/// Built-in rule table, consulted after the custom rules.
#[derive(Debug, Default)]
pub struct TypeScriptTransformer {
    custom: Vec<TypeTransformer>,
}

impl TypeScriptTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a custom rule. Rules are tried in insertion order.
    pub fn add(&mut self, transformer: TypeTransformer) -> &mut Self {
        self.custom.push(transformer);
        self
    }

    pub fn custom_rules(&self) -> &[TypeTransformer] {
        &self.custom
    }

    fn custom_rule(&self, ty: &WrappedType) -> Option<&TypeTransformer> {
        self.custom.iter().find(|rule| rule.matches(ty))
    }

    /// Render `ty`. `scope` holds the simple names being generated and
    /// `vars` the type variables of the enclosing declaration.
    pub fn transform(
        &self,
        ty: &WrappedType,
        scope: &BTreeSet<String>,
        vars: &IndexMap<String, WrappedType>,
    ) -> String {
        if let Some(rule) = self.custom_rule(ty) {
            return rule.text.clone();
        }
        if ty.is_wildcard() {
            return "any".to_string();
        }

        let name = ty.display_name();
        if let Some(name) = name
            && scope.contains(name)
        {
            return self.with_parameters(name, ty, scope, vars);
        }
        if let Some(name) = name
            && ty.returns_type_variable()
        {
            return name.to_string();
        }
        if let Some(name) = name
            && ty.is_type_variable()
            && vars.contains_key(name)
        {
            return self.with_parameters(name, ty, scope, vars);
        }

        if !ty.has_parameters()
            && let Some(text) = ty.canonical_name().and_then(primitive_text)
        {
            return text.to_string();
        }

        self.collection(ty, scope, vars)
            .unwrap_or_else(|| UNKNOWN_TYPE.to_string())
    }

    /// Whether a property of type `ty` is emitted as optional.
    pub fn is_nullable(&self, ty: &WrappedType) -> bool {
        match self.custom_rule(ty).map(TypeTransformer::nullability) {
            Some(Nullability::Nullable) => true,
            Some(Nullability::NonNull) => false,
            Some(Nullability::Inherit) | None => ty.is_nullable(),
        }
    }

    fn with_parameters(
        &self,
        name: &str,
        ty: &WrappedType,
        scope: &BTreeSet<String>,
        vars: &IndexMap<String, WrappedType>,
    ) -> String {
        if !ty.has_parameters() {
            return name.to_string();
        }
        let params: Vec<_> = ty
            .arguments()
            .map(|param| self.transform(param, scope, vars))
            .collect();
        format!("{name}<{}>", params.join(", "))
    }

    fn collection(
        &self,
        ty: &WrappedType,
        scope: &BTreeSet<String>,
        vars: &IndexMap<String, WrappedType>,
    ) -> Option<String> {
        let render = |param: &WrappedType| self.transform(param, scope, vars);
        let pair = match (ty.first_parameter(), ty.second_parameter()) {
            (Ok(first), Ok(second)) => Some((first, second)),
            _ => None,
        };
        let count = ty.ty().args().len();

        let text = match ty.collection_type() {
            CollectionType::Map => match pair {
                Some((key, value)) => {
                    let key_name = key.canonical_name().filter(|_| !key.has_parameters());
                    match key_name {
                        Some(STRING) => format!("{{ [key: string]: {} }}", render(value)),
                        Some(k) if host::is_numeric(k) => {
                            format!("{{ [key: number]: {} }}", render(value))
                        }
                        _ => format!("Map<{}, {}>", render(key), render(value)),
                    }
                }
                None => "Map<any, any>".to_string(),
            },
            CollectionType::Iterable | CollectionType::Array => match count {
                0 => "Array<any>".to_string(),
                1 => format!("Array<{}>", render(ty.first_parameter().ok()?)),
                _ => return None,
            },
            CollectionType::Pair => match pair {
                Some((first, second)) => format!("[{}, {}]", render(first), render(second)),
                None => "[any, any]".to_string(),
            },
            CollectionType::Set => match ty.first_parameter() {
                Ok(element) => format!("Set<{}>", render(element)),
                Err(_) => "Set<any>".to_string(),
            },
            CollectionType::None => return None,
        };
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{TypeRef, HASH_MAP, HASH_SET, NUMERICS, PAIR};
    use pretty_assertions::assert_eq;

    fn classified(ty: TypeRef, kind: CollectionType) -> WrappedType {
        let wrapped = WrappedType::property(ty, BTreeSet::new());
        wrapped.classify_as(kind);
        wrapped
    }

    fn render(ty: &WrappedType) -> String {
        TypeScriptTransformer::new().transform(ty, &BTreeSet::new(), &IndexMap::new())
    }

    #[test]
    fn test_primitives_ignore_nullability() {
        let transformer = TypeScriptTransformer::new();
        for name in NUMERICS {
            for nullable in [false, true] {
                let ty = WrappedType::property(
                    TypeRef::simple(*name).with_nullable(nullable),
                    BTreeSet::new(),
                );
                assert_eq!(render(&ty), "number");
                assert_eq!(transformer.is_nullable(&ty), nullable);
            }
        }
        let string = WrappedType::property(TypeRef::string(), BTreeSet::new());
        assert_eq!(render(&string), "string");
        let flag = WrappedType::property(TypeRef::simple(BOOL), BTreeSet::new());
        assert_eq!(render(&flag), "boolean");
        let unit = WrappedType::property(TypeRef::simple(UNIT), BTreeSet::new());
        assert_eq!(render(&unit), "null");
    }

    #[test]
    fn test_primitive_arrays() {
        let bytes = WrappedType::property(TypeRef::simple("[u8]"), BTreeSet::new());
        assert_eq!(render(&bytes), "Array<number>");
        let chars = WrappedType::property(TypeRef::simple("[char]"), BTreeSet::new());
        assert_eq!(render(&chars), "Array<string>");
    }

    #[test]
    fn test_list_of_string() {
        let ty = classified(TypeRef::vec(TypeRef::string()), CollectionType::Iterable);
        assert_eq!(render(&ty), "Array<string>");
    }

    #[test]
    fn test_list_of_int() {
        let ty = classified(TypeRef::vec(TypeRef::simple("i32")), CollectionType::Iterable);
        assert_eq!(render(&ty), "Array<number>");
    }

    #[test]
    fn test_string_keyed_map_of_type_variable() {
        let ty = classified(
            TypeRef::named(HASH_MAP, vec![TypeRef::string(), TypeRef::variable("T", vec![])]),
            CollectionType::Map,
        );
        let mut vars = IndexMap::new();
        vars.insert(
            "T".to_string(),
            WrappedType::type_variable(TypeRef::variable("T", vec![])),
        );

        let text = TypeScriptTransformer::new().transform(&ty, &BTreeSet::new(), &vars);
        assert_eq!(text, "{ [key: string]: T }");
    }

    #[test]
    fn test_map_key_shapes() {
        let numeric = classified(
            TypeRef::named(HASH_MAP, vec![TypeRef::simple("u64"), TypeRef::string()]),
            CollectionType::Map,
        );
        assert_eq!(render(&numeric), "{ [key: number]: string }");

        let scope = BTreeSet::from(["UserId".to_string()]);
        let keyed = classified(
            TypeRef::named(
                HASH_MAP,
                vec![TypeRef::simple("crate::UserId"), TypeRef::simple("bool")],
            ),
            CollectionType::Map,
        );
        let text = TypeScriptTransformer::new().transform(&keyed, &scope, &IndexMap::new());
        assert_eq!(text, "Map<UserId, boolean>");
    }

    #[test]
    fn test_collections_without_parameters() {
        let cases = [
            (CollectionType::Map, "Map<any, any>"),
            (CollectionType::Iterable, "Array<any>"),
            (CollectionType::Array, "Array<any>"),
            (CollectionType::Pair, "[any, any]"),
            (CollectionType::Set, "Set<any>"),
        ];
        for (kind, expected) in cases {
            let ty = classified(TypeRef::simple("crate::Raw"), kind);
            assert_eq!(render(&ty), expected);
        }
    }

    #[test]
    fn test_pair_and_set() {
        let pair = classified(
            TypeRef::named(PAIR, vec![TypeRef::string(), TypeRef::simple("f64")]),
            CollectionType::Pair,
        );
        assert_eq!(render(&pair), "[string, number]");

        let same = classified(
            TypeRef::named(PAIR, vec![TypeRef::string(), TypeRef::string()]),
            CollectionType::Pair,
        );
        assert_eq!(render(&same), "[string, string]");

        let set = classified(
            TypeRef::named(HASH_SET, vec![TypeRef::simple("u16")]),
            CollectionType::Set,
        );
        assert_eq!(render(&set), "Set<number>");
    }

    #[test]
    fn test_custom_annotation_rule_forces_non_null() {
        let mut transformer = TypeScriptTransformer::new();
        transformer.add(TypeTransformer::for_annotation(
            "timestamp",
            "string",
            Nullability::NonNull,
        ));

        let mut annotations = BTreeSet::new();
        annotations.insert("timestamp".to_string());
        let ty = WrappedType::property(
            TypeRef::simple("crate::Instant").with_nullable(true),
            annotations,
        );

        assert_eq!(
            transformer.transform(&ty, &BTreeSet::new(), &IndexMap::new()),
            "string"
        );
        assert!(!transformer.is_nullable(&ty));
    }

    #[test]
    fn test_custom_rule_beats_scope_and_type_variables() {
        let mut transformer = TypeScriptTransformer::new();
        transformer.add(TypeTransformer::new(
            |ty| ty.display_name() == Some("T") || ty.display_name() == Some("User"),
            "unknown",
            Nullability::Inherit,
        ));

        let scope = BTreeSet::from(["User".to_string()]);
        let mut vars = IndexMap::new();
        vars.insert(
            "T".to_string(),
            WrappedType::type_variable(TypeRef::variable("T", vec![])),
        );

        let user = WrappedType::property(TypeRef::simple("crate::User"), BTreeSet::new());
        let var = WrappedType::type_variable(TypeRef::variable("T", vec![]));
        assert_eq!(transformer.transform(&user, &scope, &vars), "unknown");
        assert_eq!(transformer.transform(&var, &scope, &vars), "unknown");
    }

    #[test]
    fn test_scope_names_expand_parameters() {
        let scope = BTreeSet::from(["Page".to_string(), "User".to_string()]);
        let ty = WrappedType::property(
            TypeRef::named("crate::Page", vec![TypeRef::simple("crate::User")]),
            BTreeSet::new(),
        );
        let text = TypeScriptTransformer::new().transform(&ty, &scope, &IndexMap::new());
        assert_eq!(text, "Page<User>");
    }

    #[test]
    fn test_wildcard_and_unknown() {
        let wildcard = WrappedType::property(TypeRef::wildcard(), BTreeSet::new());
        assert_eq!(render(&wildcard), "any");

        let unknown = classified(TypeRef::simple("std::path::PathBuf"), CollectionType::None);
        assert_eq!(render(&unknown), UNKNOWN_TYPE);

        let free = WrappedType::property(TypeRef::variable("U", vec![]), BTreeSet::new());
        assert_eq!(render(&free), UNKNOWN_TYPE);
    }

    #[test]
    fn test_custom_type_rule() {
        let mut transformer = TypeScriptTransformer::new();
        transformer.add(TypeTransformer::for_type(
            "uuid::Uuid",
            "string",
            Nullability::Nullable,
        ));
        let ty = WrappedType::property(TypeRef::simple("uuid::Uuid"), BTreeSet::new());
        let list = classified(TypeRef::vec(TypeRef::simple("uuid::Uuid")), CollectionType::Iterable);

        assert_eq!(
            transformer.transform(&list, &BTreeSet::new(), &IndexMap::new()),
            "Array<string>"
        );
        assert!(transformer.is_nullable(&ty));
        assert!(!transformer.is_nullable(&list));
    }
}
