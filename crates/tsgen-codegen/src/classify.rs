//! Collection classification.
//!
//! Well-known names are matched directly. Everything else is looked up in the
//! oracle: array declarations classify as [`CollectionType::Array`], and other
//! declarations are classified by the first of their *direct* supertypes that
//! names a collection family marker. A type implementing both `Set` and
//! `Collection` gets whichever it lists first.

use crate::host::{self, TypeDecl, TypeOracle};
use crate::wrapped::{CollectionType, WrappedType};

/// Classify `wrapped` unless it is primitive or already classified.
pub fn classify(wrapped: &WrappedType, oracle: &dyn TypeOracle) {
    if wrapped.is_classified() || wrapped.is_primitive() {
        return;
    }
    wrapped.classify_as(classify_kind(wrapped, oracle));
}

fn classify_kind(wrapped: &WrappedType, oracle: &dyn TypeOracle) -> CollectionType {
    if let Some(kind) = wrapped.canonical_name().and_then(by_name) {
        return kind;
    }

    let Some(decl) = mirror(wrapped, oracle) else {
        return CollectionType::None;
    };

    if decl.kind == host::DeclKind::Array {
        return CollectionType::Array;
    }

    oracle
        .direct_supertypes(decl)
        .iter()
        .find_map(|supertype| match supertype.ty.canonical() {
            Some(host::MAP_FAMILY) => Some(CollectionType::Map),
            Some(host::SET_FAMILY) => Some(CollectionType::Set),
            Some(host::COLLECTION_FAMILY) => Some(CollectionType::Iterable),
            _ => None,
        })
        .unwrap_or_default()
}

fn by_name(canonical: &str) -> Option<CollectionType> {
    match canonical {
        host::PAIR => Some(CollectionType::Pair),
        host::VEC => Some(CollectionType::Iterable),
        host::HASH_SET => Some(CollectionType::Set),
        host::BTREE_MAP | host::HASH_MAP => Some(CollectionType::Map),
        _ => None,
    }
}

/// The declaration describing `wrapped`: its declaration site first, then the
/// unsubstituted name, then the current name.
fn mirror<'o>(wrapped: &WrappedType, oracle: &'o dyn TypeOracle) -> Option<&'o TypeDecl> {
    wrapped
        .site()
        .and_then(|site| site.canonical())
        .and_then(|canonical| oracle.lookup(canonical))
        .or_else(|| {
            wrapped
                .original_canonical_name()
                .and_then(|canonical| oracle.lookup(canonical))
        })
        .or_else(|| {
            wrapped
                .canonical_name()
                .and_then(|canonical| oracle.lookup(canonical))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{
        DeclKind, HostModel, Supertype, TypeDecl, TypeParam, TypeRef, ARRAY, COLLECTION_FAMILY,
        MAP_FAMILY, SET_FAMILY,
    };
    use std::collections::BTreeSet;

    fn property(ty: TypeRef) -> WrappedType {
        WrappedType::property(ty, BTreeSet::new())
    }

    fn classified(ty: TypeRef, model: &HostModel) -> CollectionType {
        let wrapped = property(ty);
        classify(&wrapped, model);
        wrapped.collection_type()
    }

    #[test]
    fn test_well_known_names() {
        let model = HostModel::new();
        let string = TypeRef::string();
        assert_eq!(
            classified(TypeRef::vec(string.clone()), &model),
            CollectionType::Iterable
        );
        assert_eq!(
            classified(TypeRef::named(host::HASH_SET, vec![string.clone()]), &model),
            CollectionType::Set
        );
        assert_eq!(
            classified(
                TypeRef::named(host::HASH_MAP, vec![string.clone(), string.clone()]),
                &model
            ),
            CollectionType::Map
        );
        assert_eq!(
            classified(TypeRef::named(host::PAIR, vec![string.clone(), string]), &model),
            CollectionType::Pair
        );
    }

    #[test]
    fn test_builtin_families() {
        let model = HostModel::with_builtins();
        let u32 = TypeRef::simple("u32");
        assert_eq!(
            classified(
                TypeRef::named("indexmap::IndexMap", vec![TypeRef::string(), u32.clone()]),
                &model
            ),
            CollectionType::Map
        );
        assert_eq!(
            classified(TypeRef::named("std::collections::BTreeSet", vec![u32.clone()]), &model),
            CollectionType::Set
        );
        assert_eq!(
            classified(TypeRef::named("std::collections::VecDeque", vec![u32.clone()]), &model),
            CollectionType::Iterable
        );
        assert_eq!(
            classified(TypeRef::named(ARRAY, vec![u32]), &model),
            CollectionType::Array
        );
    }

    #[test]
    fn test_user_type_classified_by_supertype() {
        let mut model = HostModel::new();
        model.register(
            TypeDecl::new("crate::Registry", DeclKind::Struct)
                .with_type_param(TypeParam::new("V", vec![]))
                .with_supertype(Supertype::interface(TypeRef::simple("std::fmt::Debug")))
                .with_supertype(Supertype::interface(TypeRef::named(
                    MAP_FAMILY,
                    vec![TypeRef::string(), TypeRef::variable("V", vec![])],
                ))),
        );

        let ty = TypeRef::named("crate::Registry", vec![TypeRef::simple("u8")]);
        assert_eq!(classified(ty, &model), CollectionType::Map);
    }

    #[test]
    fn test_first_matching_supertype_wins() {
        let mut model = HostModel::new();
        model.register(
            TypeDecl::new("crate::Bag", DeclKind::Struct)
                .with_supertype(Supertype::interface(TypeRef::simple(SET_FAMILY)))
                .with_supertype(Supertype::interface(TypeRef::simple(COLLECTION_FAMILY))),
        );
        model.register(
            TypeDecl::new("crate::Pile", DeclKind::Struct)
                .with_supertype(Supertype::interface(TypeRef::simple(COLLECTION_FAMILY)))
                .with_supertype(Supertype::interface(TypeRef::simple(SET_FAMILY))),
        );

        assert_eq!(classified(TypeRef::simple("crate::Bag"), &model), CollectionType::Set);
        assert_eq!(
            classified(TypeRef::simple("crate::Pile"), &model),
            CollectionType::Iterable
        );
    }

    #[test]
    fn test_supertype_walk_is_one_level() {
        let mut model = HostModel::new();
        model.register(
            TypeDecl::new("crate::Lookup", DeclKind::Trait)
                .with_supertype(Supertype::interface(TypeRef::simple(MAP_FAMILY))),
        );
        model.register(
            TypeDecl::new("crate::Phonebook", DeclKind::Struct)
                .with_supertype(Supertype::interface(TypeRef::simple("crate::Lookup"))),
        );

        assert_eq!(
            classified(TypeRef::simple("crate::Phonebook"), &model),
            CollectionType::None
        );
    }

    #[test]
    fn test_type_variable_classified_through_bound() {
        let mut model = HostModel::new();
        model.register(
            TypeDecl::new("crate::Lookup", DeclKind::Trait)
                .with_supertype(Supertype::interface(TypeRef::simple(MAP_FAMILY))),
        );

        let site = TypeRef::variable("M", vec![TypeRef::simple("crate::Lookup")]);
        let wrapped = WrappedType::type_variable_at(TypeRef::simple("crate::Unknown"), site);
        classify(&wrapped, &model);
        assert_eq!(wrapped.collection_type(), CollectionType::Map);
    }

    #[test]
    fn test_primitives_and_unknowns() {
        let model = HostModel::with_builtins();
        let string = property(TypeRef::string());
        classify(&string, &model);
        assert!(!string.is_classified());

        assert_eq!(
            classified(TypeRef::simple("uuid::Uuid"), &model),
            CollectionType::None
        );
    }
}
