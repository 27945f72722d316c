//! One occurrence of a type at a use-site, with its generic structure resolved.

use std::cell::OnceCell;
use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::error::StructuralError;
use crate::host::{self, TypeRef, TypeRefKind};

/// Where a wrapped type occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseSite {
    /// The declared type of a struct field.
    Property,
    /// A generic parameter, or a generic argument nested inside another type.
    TypeVariable,
    /// The type of an enum value, which is always the enum itself.
    EnumValue,
    /// A trait bound of a type variable.
    Bound,
}

/// The collection shape that drives emission syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionType {
    Map,
    Set,
    Iterable,
    Pair,
    Array,
    #[default]
    None,
}

#[derive(Debug, Clone)]
pub struct WrappedType {
    ty: TypeRef,
    /// The type as written at the declaration, before generic substitution.
    site: Option<TypeRef>,
    use_site: UseSite,
    annotations: BTreeSet<String>,
    parameters: IndexMap<String, WrappedType>,
    bounds: IndexMap<String, WrappedType>,
    original_canonical_name: Option<String>,
    collection_type: OnceCell<CollectionType>,
    returns_type_variable: bool,
}

impl WrappedType {
    /// Wrap a field type. The field type doubles as its own declaration site.
    pub fn property(ty: TypeRef, annotations: BTreeSet<String>) -> Self {
        let site = ty.clone();
        Self::new(ty, Some(site), UseSite::Property, annotations)
    }

    pub fn type_variable(ty: TypeRef) -> Self {
        Self::new(ty, None, UseSite::TypeVariable, BTreeSet::new())
    }

    /// Wrap a type that was substituted for a declared type variable `site`.
    pub fn type_variable_at(ty: TypeRef, site: TypeRef) -> Self {
        Self::new(ty, Some(site), UseSite::TypeVariable, BTreeSet::new())
    }

    pub fn enum_value(ty: TypeRef) -> Self {
        Self::new(ty, None, UseSite::EnumValue, BTreeSet::new())
    }

    pub fn bound(ty: TypeRef) -> Self {
        Self::new(ty, None, UseSite::Bound, BTreeSet::new())
    }

    fn new(
        ty: TypeRef,
        site: Option<TypeRef>,
        use_site: UseSite,
        annotations: BTreeSet<String>,
    ) -> Self {
        let site_args = site.as_ref().map(TypeRef::args).unwrap_or_default();

        let mut parameters = IndexMap::new();
        for (index, arg) in ty.args().iter().enumerate() {
            let nested = match site_args.get(index) {
                Some(site) => Self::type_variable_at(arg.clone(), site.clone()),
                None => Self::type_variable(arg.clone()),
            };
            // First argument wins when two share a display name.
            parameters.entry(nested.key()).or_insert(nested);
        }

        let mut bounds = IndexMap::new();
        if use_site == UseSite::TypeVariable
            && let TypeRefKind::Variable { bounds: declared, .. } = &ty.kind
        {
            for bound in declared {
                let nested = Self::bound(bound.clone());
                bounds.entry(nested.key()).or_insert(nested);
            }
        }

        let original_canonical_name = site.as_ref().and_then(original_canonical);

        Self {
            ty,
            site,
            use_site,
            annotations,
            parameters,
            bounds,
            original_canonical_name,
            collection_type: OnceCell::new(),
            returns_type_variable: false,
        }
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn site(&self) -> Option<&TypeRef> {
        self.site.as_ref()
    }

    pub fn use_site(&self) -> UseSite {
        self.use_site
    }

    /// Name used in emitted text: `any` for wildcards, the variable name for
    /// type variables, the simple name for everything nameable.
    pub fn display_name(&self) -> Option<&str> {
        match &self.ty.kind {
            TypeRefKind::Wildcard => Some("any"),
            TypeRefKind::Variable { name, .. } => Some(name),
            TypeRefKind::Named { name, .. } => Some(name.simple()),
            TypeRefKind::Opaque(_) => None,
        }
    }

    pub fn canonical_name(&self) -> Option<&str> {
        self.ty.canonical()
    }

    pub fn original_canonical_name(&self) -> Option<&str> {
        self.original_canonical_name.as_deref()
    }

    pub fn is_nullable(&self) -> bool {
        self.ty.nullable
    }

    pub fn is_wildcard(&self) -> bool {
        self.ty.is_wildcard()
    }

    pub fn is_type_variable(&self) -> bool {
        self.ty.is_variable()
    }

    pub fn has_raw_type(&self) -> bool {
        self.canonical_name().is_some()
    }

    /// Nameable, and not the self-reference of an enum value.
    pub fn is_instantiable(&self) -> bool {
        self.has_raw_type() && self.use_site != UseSite::EnumValue
    }

    pub fn is_primitive(&self) -> bool {
        self.canonical_name().is_some_and(host::is_primitive)
    }

    pub fn annotations(&self) -> &BTreeSet<String> {
        &self.annotations
    }

    pub fn has_annotation(&self, tag: &str) -> bool {
        self.annotations.contains(tag)
    }

    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }

    pub fn parameters(&self) -> &IndexMap<String, WrappedType> {
        &self.parameters
    }

    /// The wrapped type at each argument position, in order.
    ///
    /// Positions whose display name repeats an earlier one resolve to the
    /// first wrapped occurrence.
    pub fn arguments(&self) -> impl Iterator<Item = &WrappedType> {
        self.ty
            .args()
            .iter()
            .filter_map(|arg| self.parameters.get(&key_of(arg)))
    }

    pub fn parameter_at(&self, index: usize) -> Result<&WrappedType, StructuralError> {
        let args = self.ty.args();
        if args.is_empty() {
            return Err(StructuralError::NoParameters(self.describe()));
        }
        let arg = args.get(index).ok_or_else(|| StructuralError::IndexOutOfRange {
            name: self.describe(),
            index,
            len: args.len(),
        })?;
        let key = key_of(arg);
        self.parameters
            .get(&key)
            .ok_or_else(|| StructuralError::MissingParameter {
                name: self.describe(),
                key,
            })
    }

    pub fn first_parameter(&self) -> Result<&WrappedType, StructuralError> {
        self.parameter_at(0)
    }

    pub fn second_parameter(&self) -> Result<&WrappedType, StructuralError> {
        self.parameter_at(1)
    }

    /// Bounds of a type variable, keyed by display name.
    pub fn bounds(&self) -> Result<&IndexMap<String, WrappedType>, StructuralError> {
        if self.use_site == UseSite::TypeVariable {
            Ok(&self.bounds)
        } else {
            Err(StructuralError::BoundsOnNonVariable(self.describe()))
        }
    }

    pub fn collection_type(&self) -> CollectionType {
        self.collection_type.get().copied().unwrap_or_default()
    }

    pub fn is_classified(&self) -> bool {
        self.collection_type.get().is_some()
    }

    /// Record the classification. Later calls keep the first value.
    pub fn classify_as(&self, collection_type: CollectionType) {
        let _ = self.collection_type.set(collection_type);
    }

    pub fn returns_type_variable(&self) -> bool {
        self.returns_type_variable
    }

    pub fn mark_returns_type_variable(&mut self) {
        self.returns_type_variable = true;
    }

    /// Visit this type, then its parameters and bounds, depth first.
    pub fn walk(&self, visit: &mut impl FnMut(&WrappedType)) {
        visit(self);
        for parameter in self.parameters.values() {
            parameter.walk(visit);
        }
        for bound in self.bounds.values() {
            bound.walk(visit);
        }
    }

    fn key(&self) -> String {
        key_of(&self.ty)
    }

    fn describe(&self) -> String {
        self.ty.to_string()
    }
}

fn key_of(ty: &TypeRef) -> String {
    match &ty.kind {
        TypeRefKind::Wildcard => "any".to_string(),
        TypeRefKind::Variable { name, .. } => name.clone(),
        TypeRefKind::Named { name, .. } => name.simple().to_string(),
        TypeRefKind::Opaque(text) => text.clone(),
    }
}

/// Canonical name of the declaration-site type. Type variables answer with
/// their first bound.
fn original_canonical(site: &TypeRef) -> Option<String> {
    match &site.kind {
        TypeRefKind::Named { name, .. } => Some(name.canonical().to_string()),
        TypeRefKind::Variable { bounds, .. } => bounds
            .first()
            .and_then(TypeRef::canonical)
            .map(str::to_string),
        TypeRefKind::Wildcard | TypeRefKind::Opaque(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ANY, STRING};

    #[test]
    fn test_parameters_wrapped_as_type_variables() {
        let ty = TypeRef::named(
            "std::collections::HashMap",
            vec![TypeRef::string(), TypeRef::vec(TypeRef::simple("u32"))],
        );
        let wrapped = WrappedType::property(ty, BTreeSet::new());

        assert!(wrapped.has_parameters());
        let keys: Vec<_> = wrapped.parameters().keys().cloned().collect();
        assert_eq!(keys, ["String", "Vec"]);

        let value = wrapped.second_parameter().unwrap();
        assert_eq!(value.use_site(), UseSite::TypeVariable);
        assert_eq!(value.first_parameter().unwrap().canonical_name(), Some("u32"));
    }

    #[test]
    fn test_duplicate_display_names_keep_first() {
        let ty = TypeRef::named(
            "crate::Either",
            vec![TypeRef::vec(TypeRef::string()), TypeRef::vec(TypeRef::simple("u8"))],
        );
        let wrapped = WrappedType::property(ty, BTreeSet::new());

        assert_eq!(wrapped.parameters().len(), 1);
        let second = wrapped.second_parameter().unwrap();
        assert_eq!(second.first_parameter().unwrap().canonical_name(), Some(STRING));
        assert_eq!(wrapped.arguments().count(), 2);
    }

    #[test]
    fn test_parameter_index_out_of_range() {
        let wrapped = WrappedType::property(TypeRef::vec(TypeRef::string()), BTreeSet::new());
        assert!(matches!(
            wrapped.parameter_at(3),
            Err(StructuralError::IndexOutOfRange { index: 3, len: 1, .. })
        ));

        let plain = WrappedType::property(TypeRef::string(), BTreeSet::new());
        assert!(matches!(
            plain.first_parameter(),
            Err(StructuralError::NoParameters(_))
        ));
    }

    #[test]
    fn test_bounds_only_on_type_variables() {
        let var = TypeRef::variable(
            "T",
            vec![TypeRef::simple("crate::Shape"), TypeRef::simple(ANY)],
        );
        let wrapped = WrappedType::type_variable(var.clone());
        let bounds = wrapped.bounds().unwrap();
        assert_eq!(bounds.len(), 2);
        assert_eq!(bounds["Shape"].use_site(), UseSite::Bound);

        let property = WrappedType::property(var, BTreeSet::new());
        assert!(matches!(
            property.bounds(),
            Err(StructuralError::BoundsOnNonVariable(_))
        ));
    }

    #[test]
    fn test_display_names() {
        let wildcard = WrappedType::type_variable(TypeRef::wildcard());
        assert_eq!(wildcard.display_name(), Some("any"));
        assert!(!wildcard.has_raw_type());

        let var = WrappedType::type_variable(TypeRef::variable("T", vec![]));
        assert_eq!(var.display_name(), Some("T"));
        assert_eq!(var.canonical_name(), None);

        let named = WrappedType::type_variable(TypeRef::simple("crate::models::User"));
        assert_eq!(named.display_name(), Some("User"));

        let opaque = WrappedType::type_variable(TypeRef::opaque("fn() -> u8"));
        assert_eq!(opaque.display_name(), None);
    }

    #[test]
    fn test_original_canonical_name_from_site() {
        let site = TypeRef::variable("C", vec![TypeRef::simple("crate::Registry")]);
        let wrapped = WrappedType::type_variable_at(TypeRef::simple("crate::Users"), site);
        assert_eq!(wrapped.canonical_name(), Some("crate::Users"));
        assert_eq!(wrapped.original_canonical_name(), Some("crate::Registry"));
    }

    #[test]
    fn test_original_canonical_name_recurses_by_index() {
        let site = TypeRef::named(
            "crate::Holder",
            vec![TypeRef::variable("M", vec![TypeRef::simple("crate::Lookup")])],
        );
        let ty = TypeRef::named("crate::Holder", vec![TypeRef::simple("crate::Phonebook")]);
        let wrapped = WrappedType::type_variable_at(ty, site);

        let nested = wrapped.first_parameter().unwrap();
        assert_eq!(nested.original_canonical_name(), Some("crate::Lookup"));
    }

    #[test]
    fn test_classification_is_set_once() {
        let wrapped = WrappedType::property(TypeRef::vec(TypeRef::string()), BTreeSet::new());
        assert_eq!(wrapped.collection_type(), CollectionType::None);
        assert!(!wrapped.is_classified());

        wrapped.classify_as(CollectionType::Iterable);
        wrapped.classify_as(CollectionType::Map);
        assert_eq!(wrapped.collection_type(), CollectionType::Iterable);
    }

    #[test]
    fn test_walk_is_pre_order() {
        // C<A<List<String>>>
        let ty = TypeRef::named(
            "crate::C",
            vec![TypeRef::named(
                "crate::A",
                vec![TypeRef::named("crate::List", vec![TypeRef::string()])],
            )],
        );
        let wrapped = WrappedType::property(ty, BTreeSet::new());

        let mut order = Vec::new();
        wrapped.walk(&mut |w: &WrappedType| order.push(w.display_name().unwrap_or_default().to_string()));
        assert_eq!(order, ["C", "A", "List", "String"]);
    }
}
