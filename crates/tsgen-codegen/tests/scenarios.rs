use std::collections::BTreeSet;

use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use tsgen_codegen::context::TargetContext;
use tsgen_codegen::host::{self, Member, Supertype, TypeDecl, TypeParam, TypeRef};
use tsgen_codegen::transform::TypeScriptTransformer;
use tsgen_codegen::wrapped::WrappedType;
use tsgen_codegen::{
    ModuleOption, Nullability, TypeOracle, TypeScriptGenerator, TypeTransformer, resolver,
};

fn generator() -> TypeScriptGenerator {
    let mut generator = TypeScriptGenerator::new();
    generator
        .set_timestamp("0")
        .set_module_option(ModuleOption::None);
    generator
}

fn property_line(code: &str, name: &str) -> String {
    code.lines()
        .map(str::trim)
        .find(|line| line.starts_with(&format!("{name}:")) || line.starts_with(&format!("{name}?:")))
        .unwrap_or_default()
        .to_string()
}

#[test]
fn list_of_string_is_array_of_string() {
    let mut generator = generator();
    generator
        .register_type(TypeDecl::structure(
            "crate::Doc",
            vec![Member::new("lines", TypeRef::vec(TypeRef::string()))],
        ))
        .add_root("crate::Doc");

    let code = generator.generate().unwrap();
    assert_eq!(property_line(&code, "lines"), "lines: Array<string>;");
}

#[test]
fn string_keyed_map_of_type_variable_is_index_signature() {
    let mut generator = generator();
    generator
        .register_type(
            TypeDecl::structure(
                "crate::Cache",
                vec![Member::new(
                    "entries",
                    TypeRef::named(
                        host::HASH_MAP,
                        vec![TypeRef::string(), TypeRef::variable("T", vec![])],
                    ),
                )],
            )
            .with_type_param(TypeParam::new("T", vec![])),
        )
        .add_root("crate::Cache");

    let code = generator.generate().unwrap();
    assert!(code.contains("interface Cache<T> {"));
    assert_eq!(property_line(&code, "entries"), "entries: { [key: string]: T };");
}

#[test]
fn list_of_int_is_array_of_number() {
    let mut generator = generator();
    generator
        .register_type(TypeDecl::structure(
            "crate::Histogram",
            vec![Member::new("buckets", TypeRef::vec(TypeRef::simple("i32")))],
        ))
        .add_root("crate::Histogram");

    let code = generator.generate().unwrap();
    assert_eq!(property_line(&code, "buckets"), "buckets: Array<number>;");
}

#[test]
fn annotation_rule_forces_text_and_nullability() {
    let mut transformer = TypeScriptTransformer::new();
    transformer.add(TypeTransformer::for_annotation(
        "timestamp",
        "string",
        Nullability::NonNull,
    ));

    let ty = WrappedType::property(
        TypeRef::simple("chrono::DateTime").with_nullable(true),
        BTreeSet::from(["timestamp".to_string()]),
    );
    assert_eq!(
        transformer.transform(&ty, &BTreeSet::new(), &IndexMap::new()),
        "string"
    );
    assert!(!transformer.is_nullable(&ty));
}

#[test]
fn mutual_references_are_emitted_once_and_sorted() {
    let mut generator = generator();
    generator
        .register_type(TypeDecl::structure(
            "crate::B",
            vec![Member::new("a", TypeRef::simple("crate::A"))],
        ))
        .register_type(TypeDecl::structure(
            "crate::A",
            vec![Member::new("b", TypeRef::simple("crate::B"))],
        ))
        .add_root("crate::B")
        .add_root("crate::A");

    let code = generator.generate().unwrap();
    assert_eq!(
        code,
        "/* generated @ 0 */\n\
         interface A {\n  b: B;\n}\n\
         interface B {\n  a: A;\n}\n"
    );
}

#[test]
fn bounded_type_parameter_extends_its_bound() {
    let mut generator = generator();
    generator
        .register_type(TypeDecl::structure(
            "crate::UpperBound",
            vec![Member::new("id", TypeRef::simple("u64"))],
        ))
        .register_type(
            TypeDecl::structure("crate::Box", vec![]).with_type_param(TypeParam::new(
                "T",
                vec![TypeRef::simple("crate::UpperBound")],
            )),
        )
        .add_root("crate::Box");

    let code = generator.generate().unwrap();
    assert!(code.contains("interface Box<T extends UpperBound> {"));
    assert!(code.contains("interface UpperBound {"));
}

#[test]
fn top_type_bound_has_no_extends_clause() {
    let mut generator = generator();
    generator
        .register_type(
            TypeDecl::structure("crate::Box", vec![])
                .with_type_param(TypeParam::new("T", vec![TypeRef::simple(host::ANY)])),
        )
        .add_root("crate::Box");

    let code = generator.generate().unwrap();
    assert!(code.contains("interface Box<T> {"));
    assert!(!code.contains("extends"));
}

#[test]
fn parameterless_collections_use_any() {
    let mut generator = generator();
    generator
        .register_type(TypeDecl::structure(
            "crate::Raw",
            vec![
                Member::new("list", TypeRef::simple(host::VEC)),
                Member::new("map", TypeRef::simple(host::HASH_MAP)),
                Member::new("set", TypeRef::simple(host::HASH_SET)),
                Member::new("pair", TypeRef::simple(host::PAIR)),
            ],
        ))
        .add_root("crate::Raw");

    let code = generator.generate().unwrap();
    assert_eq!(property_line(&code, "list"), "list: Array<any>;");
    assert_eq!(property_line(&code, "map"), "map: Map<any, any>;");
    assert_eq!(property_line(&code, "set"), "set: Set<any>;");
    assert_eq!(property_line(&code, "pair"), "pair: [any, any];");
}

#[test]
fn collection_family_supertype_classifies_custom_types() {
    let mut generator = generator();
    generator
        .register_type(
            TypeDecl::structure("crate::Bag", vec![])
                .with_type_param(TypeParam::new("T", vec![]))
                .with_supertype(Supertype::interface(TypeRef::named(
                    host::COLLECTION_FAMILY,
                    vec![TypeRef::variable("T", vec![])],
                ))),
        )
        .register_type(TypeDecl::structure(
            "crate::Inventory",
            vec![
                Member::new(
                    "bag",
                    TypeRef::named("crate::Bag", vec![TypeRef::simple("u16")]),
                ),
                Member::new(
                    "queue",
                    TypeRef::named("std::collections::VecDeque", vec![TypeRef::string()]),
                ),
            ],
        ))
        .add_root("crate::Inventory");

    let code = generator.generate().unwrap();
    assert_eq!(property_line(&code, "bag"), "bag: Array<number>;");
    assert_eq!(property_line(&code, "queue"), "queue: Array<string>;");
    assert!(!code.contains("interface Bag"));
}

/// An oracle backed by a plain list, standing in for another host.
struct ListOracle(Vec<TypeDecl>);

impl TypeOracle for ListOracle {
    fn lookup(&self, canonical: &str) -> Option<&TypeDecl> {
        self.0.iter().find(|decl| decl.name.canonical() == canonical)
    }
}

#[test]
fn resolver_works_with_any_oracle() {
    let oracle = ListOracle(vec![
        TypeDecl::structure(
            "app::Order",
            vec![Member::new("customer", TypeRef::simple("app::Customer"))],
        ),
        TypeDecl::structure("app::Customer", vec![Member::new("name", TypeRef::string())]),
    ]);
    let mut ctx = TargetContext::new(&oracle);

    let mut names: Vec<_> = resolver::resolve("app::Order", &mut ctx)
        .iter()
        .map(|target| target.simple_name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, ["Customer", "Order"]);
    assert!(ctx.diagnostics().is_empty());
}
