//! In-memory model of the host type system.
//!
//! The generation pipeline never looks at Rust syntax directly. It asks a
//! [`TypeOracle`] for declarations by canonical path and works on the
//! structural [`TypeRef`] descriptors those declarations carry. [`HostModel`]
//! is the oracle filled in by the source extractor, and can also be populated
//! by hand through [`HostModel::register`].
//!
//! ## Built-in declarations
//!
//! [`HostModel::with_builtins`] registers the collection types the generator
//! understands without seeing their source:
//!
//! | Rust type | Family |
//! |-----------|--------|
//! | `std::collections::BTreeMap<K, V>` | [`Map`](crate::collections::Map) |
//! | `std::collections::BTreeSet<T>` | [`Set`](crate::collections::Set) |
//! | `std::collections::VecDeque<T>` | [`Collection`](crate::collections::Collection) |
//! | `std::collections::LinkedList<T>` | [`Collection`](crate::collections::Collection) |
//! | `std::collections::BinaryHeap<T>` | [`Collection`](crate::collections::Collection) |
//! | `hashbrown::HashMap<K, V>` | [`Map`](crate::collections::Map) |
//! | `hashbrown::HashSet<T>` | [`Set`](crate::collections::Set) |
//! | `indexmap::IndexMap<K, V>` | [`Map`](crate::collections::Map) |
//! | `indexmap::IndexSet<T>` | [`Set`](crate::collections::Set) |
//! | `thin_vec::ThinVec<T>` | [`Collection`](crate::collections::Collection) |
//! | `arrayvec::ArrayVec<T, N>` | [`Collection`](crate::collections::Collection) |
//! | `smallvec::SmallVec<[T; N]>` | [`Collection`](crate::collections::Collection) |
//! | `tinyvec::ArrayVec<[T; N]>` | [`Collection`](crate::collections::Collection) |
//! | `tinyvec::TinyVec<[T; N]>` | [`Collection`](crate::collections::Collection) |
//!
//! `std::vec::Vec`, `std::collections::HashMap` and `std::collections::HashSet`
//! are recognized by name and need no declaration.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;

/// Canonical path of the owned string type.
pub const STRING: &str = "std::string::String";
pub const CHAR: &str = "char";
pub const BOOL: &str = "bool";
/// The unit type `()`.
pub const UNIT: &str = "()";
/// The universal top type. Bounds on marker traits lower to it.
pub const ANY: &str = "std::any::Any";
/// Canonical name of the two-element tuple.
pub const PAIR: &str = "(,)";
/// Canonical name of the array/slice pseudo-type. Its single argument is the element.
pub const ARRAY: &str = "[]";

pub const VEC: &str = "std::vec::Vec";
pub const HASH_MAP: &str = "std::collections::HashMap";
pub const HASH_SET: &str = "std::collections::HashSet";
pub const BTREE_MAP: &str = "std::collections::BTreeMap";

/// Marker trait paths for the three collection families.
pub const MAP_FAMILY: &str = "tsgen_codegen::collections::Map";
pub const SET_FAMILY: &str = "tsgen_codegen::collections::Set";
pub const COLLECTION_FAMILY: &str = "tsgen_codegen::collections::Collection";

pub const NUMERICS: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
    "f32", "f64",
];

pub fn is_numeric(canonical: &str) -> bool {
    NUMERICS.contains(&canonical)
}

/// Scalar types that are never classified or discovered.
pub fn is_primitive(canonical: &str) -> bool {
    is_numeric(canonical) || matches!(canonical, STRING | CHAR | BOOL | UNIT | ANY)
}

/// Name of the parameterless array type for a numeric or `char` element, e.g. `[u8]`.
pub fn primitive_array(element: &str) -> Option<String> {
    (is_numeric(element) || element == CHAR).then(|| format!("[{element}]"))
}

/// A `::`-separated canonical path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName(String);

impl QualifiedName {
    pub fn new(canonical: impl Into<String>) -> Self {
        Self(canonical.into())
    }

    pub fn canonical(&self) -> &str {
        &self.0
    }

    /// The last path segment.
    pub fn simple(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }

    /// Everything before the last segment, if the path has more than one.
    pub fn module(&self) -> Option<&str> {
        self.0.rsplit_once("::").map(|(module, _)| module)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QualifiedName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Structural description of one type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub kind: TypeRefKind,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRefKind {
    /// A nameable type with its generic arguments.
    Named { name: QualifiedName, args: Vec<TypeRef> },
    /// A generic parameter with its declared bounds.
    Variable { name: String, bounds: Vec<TypeRef> },
    /// `dyn Trait`, `impl Trait` and `_`.
    Wildcard,
    /// Anything the host model cannot describe (function pointers, macros, ...).
    Opaque(String),
}

impl TypeRef {
    pub fn named(canonical: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self {
            kind: TypeRefKind::Named {
                name: QualifiedName::new(canonical),
                args,
            },
            nullable: false,
        }
    }

    pub fn simple(canonical: impl Into<String>) -> Self {
        Self::named(canonical, Vec::new())
    }

    pub fn variable(name: impl Into<String>, bounds: Vec<TypeRef>) -> Self {
        Self {
            kind: TypeRefKind::Variable {
                name: name.into(),
                bounds,
            },
            nullable: false,
        }
    }

    pub fn wildcard() -> Self {
        Self {
            kind: TypeRefKind::Wildcard,
            nullable: false,
        }
    }

    pub fn opaque(text: impl Into<String>) -> Self {
        Self {
            kind: TypeRefKind::Opaque(text.into()),
            nullable: false,
        }
    }

    pub fn string() -> Self {
        Self::simple(STRING)
    }

    pub fn vec(element: TypeRef) -> Self {
        Self::named(VEC, vec![element])
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn canonical(&self) -> Option<&str> {
        match &self.kind {
            TypeRefKind::Named { name, .. } => Some(name.canonical()),
            _ => None,
        }
    }

    pub fn qualified_name(&self) -> Option<&QualifiedName> {
        match &self.kind {
            TypeRefKind::Named { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn args(&self) -> &[TypeRef] {
        match &self.kind {
            TypeRefKind::Named { args, .. } => args,
            _ => &[],
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.kind, TypeRefKind::Variable { .. })
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self.kind, TypeRefKind::Wildcard)
    }

    /// Replace type variables named in `bindings`, keeping nullability from either side.
    pub fn substitute(&self, bindings: &IndexMap<String, TypeRef>) -> TypeRef {
        match &self.kind {
            TypeRefKind::Variable { name, .. } => match bindings.get(name) {
                Some(bound) => {
                    let nullable = bound.nullable || self.nullable;
                    bound.clone().with_nullable(nullable)
                }
                None => self.clone(),
            },
            TypeRefKind::Named { name, args } => TypeRef {
                kind: TypeRefKind::Named {
                    name: name.clone(),
                    args: args.iter().map(|arg| arg.substitute(bindings)).collect(),
                },
                nullable: self.nullable,
            },
            TypeRefKind::Wildcard | TypeRefKind::Opaque(_) => self.clone(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeRefKind::Named { name, args } => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    let args: Vec<_> = args.iter().map(ToString::to_string).collect();
                    write!(f, "<{}>", args.join(", "))?;
                }
            }
            TypeRefKind::Variable { name, .. } => f.write_str(name)?,
            TypeRefKind::Wildcard => f.write_str("_")?,
            TypeRefKind::Opaque(text) => f.write_str(text)?,
        }
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

/// What kind of item a declaration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    /// Struct with named fields.
    Struct,
    TupleStruct,
    UnitStruct,
    /// Enum whose variants are all unit variants.
    Enum,
    /// Enum with at least one variant carrying data.
    DataEnum,
    Union,
    Trait,
    /// The array pseudo-type.
    Array,
    /// A type known only by name.
    Opaque,
}

/// Where an item was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeclOrigin {
    #[default]
    TopLevel,
    /// Inside a `const`/`static` initializer block.
    Nested,
    /// Inside a function body.
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    pub bounds: Vec<TypeRef>,
}

impl TypeParam {
    pub fn new(name: impl Into<String>, bounds: Vec<TypeRef>) -> Self {
        Self {
            name: name.into(),
            bounds,
        }
    }

    /// The parameter as a type expression.
    pub fn as_type_ref(&self) -> TypeRef {
        TypeRef::variable(self.name.clone(), self.bounds.clone())
    }
}

/// A field of a struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub ty: TypeRef,
    /// Attribute paths and `#[ts(tag = "..")]` values seen on the field.
    pub annotations: BTreeSet<String>,
    pub serial_name: Option<String>,
}

impl Member {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: BTreeSet::new(),
            serial_name: None,
        }
    }

    pub fn with_annotation(mut self, tag: impl Into<String>) -> Self {
        self.annotations.insert(tag.into());
        self
    }

    pub fn with_serial_name(mut self, name: impl Into<String>) -> Self {
        self.serial_name = Some(name.into());
        self
    }
}

/// A unit variant of an enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    pub name: String,
    pub serial_name: Option<String>,
}

impl EnumConstant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            serial_name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupertypeKind {
    /// A flattened or explicitly extended data type.
    Data,
    /// An implemented trait.
    Interface,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supertype {
    pub ty: TypeRef,
    pub kind: SupertypeKind,
}

impl Supertype {
    pub fn data(ty: TypeRef) -> Self {
        Self {
            ty,
            kind: SupertypeKind::Data,
        }
    }

    pub fn interface(ty: TypeRef) -> Self {
        Self {
            ty,
            kind: SupertypeKind::Interface,
        }
    }
}

/// Everything the generator knows about one declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: QualifiedName,
    pub kind: DeclKind,
    pub origin: DeclOrigin,
    pub type_params: Vec<TypeParam>,
    pub members: Vec<Member>,
    pub variants: Vec<EnumConstant>,
    pub supertypes: Vec<Supertype>,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>, kind: DeclKind) -> Self {
        Self {
            name: QualifiedName::new(name),
            kind,
            origin: DeclOrigin::TopLevel,
            type_params: Vec::new(),
            members: Vec::new(),
            variants: Vec::new(),
            supertypes: Vec::new(),
        }
    }

    pub fn structure(name: impl Into<String>, members: Vec<Member>) -> Self {
        Self {
            members,
            ..Self::new(name, DeclKind::Struct)
        }
    }

    pub fn enumeration(name: impl Into<String>, variants: &[&str]) -> Self {
        Self {
            variants: variants.iter().map(|v| EnumConstant::new(*v)).collect(),
            ..Self::new(name, DeclKind::Enum)
        }
    }

    pub fn with_type_param(mut self, param: TypeParam) -> Self {
        self.type_params.push(param);
        self
    }

    pub fn with_supertype(mut self, supertype: Supertype) -> Self {
        self.supertypes.push(supertype);
        self
    }

    pub fn with_origin(mut self, origin: DeclOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// The declaration as a type expression over its own parameters.
    pub fn as_type_ref(&self) -> TypeRef {
        TypeRef::named(
            self.name.canonical(),
            self.type_params.iter().map(TypeParam::as_type_ref).collect(),
        )
    }

    pub fn has_type_param(&self, name: &str) -> bool {
        self.type_params.iter().any(|p| p.name == name)
    }
}

/// Read-only access to host type metadata.
pub trait TypeOracle {
    fn lookup(&self, canonical: &str) -> Option<&TypeDecl>;

    /// Direct supertypes in declaration order.
    fn direct_supertypes<'a>(&'a self, decl: &'a TypeDecl) -> &'a [Supertype] {
        &decl.supertypes
    }

    /// Serialization name override for a struct field.
    fn member_serial_name<'a>(&'a self, member: &'a Member) -> Option<&'a str> {
        member.serial_name.as_deref()
    }

    /// Serialization name override for an enum variant.
    fn variant_serial_name<'a>(&'a self, variant: &'a EnumConstant) -> Option<&'a str> {
        variant.serial_name.as_deref()
    }
}

/// A registry of canonical path -> [`TypeDecl`], plus the annotated roots.
#[derive(Debug, Clone, Default)]
pub struct HostModel {
    decls: IndexMap<String, TypeDecl>,
    roots: Vec<String>,
}

impl HostModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a model pre-populated with the built-in collection declarations.
    pub fn with_builtins() -> Self {
        let mut model = Self::new();
        model.register_builtins();
        model
    }

    pub fn register_builtins(&mut self) {
        self.register(TypeDecl::new(ARRAY, DeclKind::Array).with_type_param(TypeParam::new("T", vec![])));

        for map in [BTREE_MAP, "hashbrown::HashMap", "indexmap::IndexMap"] {
            self.register(family(map, MAP_FAMILY, &["K", "V"]));
        }
        for set in ["std::collections::BTreeSet", "hashbrown::HashSet", "indexmap::IndexSet"] {
            self.register(family(set, SET_FAMILY, &["T"]));
        }
        for list in [
            "std::collections::VecDeque",
            "std::collections::LinkedList",
            "std::collections::BinaryHeap",
            "thin_vec::ThinVec",
            "arrayvec::ArrayVec",
            "smallvec::SmallVec",
            "tinyvec::ArrayVec",
            "tinyvec::TinyVec",
        ] {
            self.register(family(list, COLLECTION_FAMILY, &["T"]));
        }
    }

    /// Register a declaration, replacing any previous one with the same path.
    pub fn register(&mut self, decl: TypeDecl) -> &mut Self {
        self.decls.insert(decl.name.canonical().to_string(), decl);
        self
    }

    pub fn unregister(&mut self, canonical: &str) -> Option<TypeDecl> {
        self.roots.retain(|root| root != canonical);
        self.decls.shift_remove(canonical)
    }

    /// Look up a declaration by exact canonical path.
    pub fn get(&self, canonical: &str) -> Option<&TypeDecl> {
        self.decls.get(canonical)
    }

    pub fn get_mut(&mut self, canonical: &str) -> Option<&mut TypeDecl> {
        self.decls.get_mut(canonical)
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.decls.contains_key(canonical)
    }

    /// Mark a registered type as explicitly annotated. Roots keep insertion order.
    pub fn mark_root(&mut self, canonical: impl Into<String>) -> &mut Self {
        let canonical = canonical.into();
        if !self.roots.contains(&canonical) {
            self.roots.push(canonical);
        }
        self
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn decls(&self) -> impl Iterator<Item = &TypeDecl> {
        self.decls.values()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

impl TypeOracle for HostModel {
    /// Exact match first. Crate-local paths the extractor could not qualify (a
    /// type used in one file and declared in another) fall back to a unique
    /// simple name.
    fn lookup(&self, canonical: &str) -> Option<&TypeDecl> {
        if let Some(decl) = self.decls.get(canonical) {
            return Some(decl);
        }
        if !canonical.starts_with("crate::") {
            return None;
        }
        let wanted = QualifiedName::new(canonical);
        let simple = wanted.simple();
        let mut candidates = self
            .decls
            .values()
            .filter(|decl| decl.name.simple() == simple && decl.kind != DeclKind::Trait);
        match (candidates.next(), candidates.next()) {
            (Some(decl), None) => Some(decl),
            _ => None,
        }
    }
}

fn family(canonical: &str, marker: &str, params: &[&str]) -> TypeDecl {
    let params: Vec<_> = params.iter().map(|p| TypeParam::new(*p, vec![])).collect();
    let args = params.iter().map(TypeParam::as_type_ref).collect();
    TypeDecl {
        type_params: params,
        supertypes: vec![Supertype::interface(TypeRef::named(marker, args))],
        ..TypeDecl::new(canonical, DeclKind::Opaque)
    }
}
