//! Source file parser that fills the host model from Rust source.
//!
//! Every struct, enum, union and trait becomes a [`TypeDecl`] so discovered
//! types can be looked up later; the ones carrying `#[derive(TypeScript)]`
//! are marked as roots.
//!
//! ## Use-item analysis
//!
//! The extractor processes `use` statements in each source file (and inline
//! module or block) to build a mapping from local names to canonical paths:
//!
//! - `use std::collections::HashMap` maps `"HashMap"` to `"std::collections::HashMap"`
//! - `use tsgen_codegen::TypeScript as Ts` maps `"Ts"` to `"tsgen_codegen::TypeScript"`,
//!   which is then recognized as the marker derive
//! - `use super::Shared` inside `crate::api` maps `"Shared"` to `"crate::Shared"`
//!
//! Names that are neither imported nor in the prelude resolve into the
//! current module. Type aliases are expanded at the use site.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Component, Path};

use indexmap::IndexMap;
use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::{
    Attribute, Block, Expr, ExprLit, Fields, GenericArgument, Generics, Ident, ImplItem, Item,
    ItemEnum, ItemImpl, ItemStruct, ItemTrait, ItemType, Lit, Meta, PathArguments, Stmt,
    TraitBoundModifier, Type, TypeArray, TypeParamBound, TypePath, TypeSlice, UseTree,
    WherePredicate,
};
use walkdir::WalkDir;

use crate::TypeScriptGenerator;
use crate::error::Error;
use crate::host::{
    self, DeclKind, DeclOrigin, EnumConstant, Member, Supertype, TypeDecl, TypeOracle, TypeParam,
    TypeRef,
};

/// Fully-qualified derive paths that mark a type for generation.
const MARKERS: &[&str] = &["tsgen_codegen::TypeScript", "tsgen_derive::TypeScript"];

const OPTION: &str = "std::option::Option";

/// Names usable without an import.
const PRELUDE: &[(&str, &str)] = &[
    ("String", host::STRING),
    ("Vec", host::VEC),
    ("Option", OPTION),
    ("Box", "std::boxed::Box"),
];

/// Wrappers that serialize as their contents.
const TRANSPARENT: &[&str] = &[
    "std::boxed::Box",
    "std::rc::Rc",
    "std::sync::Arc",
    "std::borrow::Cow",
    "std::cell::Cell",
    "std::cell::RefCell",
];

/// Collections written as `Name<[T; N]>`.
const INLINE_ARRAY_VECS: &[&str] = &[
    "smallvec::SmallVec",
    "arrayvec::ArrayVec",
    "tinyvec::ArrayVec",
    "tinyvec::TinyVec",
];

/// Traits that say nothing about the shape of a type. Bounds on them lower
/// to the universal top type.
const SHAPELESS_TRAITS: &[&str] = &[
    "Any",
    "Clone",
    "Copy",
    "Debug",
    "Default",
    "Deserialize",
    "DeserializeOwned",
    "Display",
    "Eq",
    "Hash",
    "Ord",
    "PartialEq",
    "PartialOrd",
    "Send",
    "Serialize",
    "Sized",
    "Sync",
    "ToString",
    "TypeScript",
    "Unpin",
];

/// Types that flatten into arbitrary extra keys.
const OPEN_OBJECTS: &[&str] = &[
    host::HASH_MAP,
    host::BTREE_MAP,
    "hashbrown::HashMap",
    "indexmap::IndexMap",
    "serde_json::Map",
    "serde_json::Value",
];

const MAX_ALIAS_DEPTH: usize = 16;

/// Per-scope context built from `use` items, type aliases and inline modules.
#[derive(Debug, Clone)]
struct SourceContext {
    /// Module the names of this scope resolve into, e.g. `crate::models`.
    module: String,
    /// Maps local name -> canonical path.
    ///
    /// Glob imports are not tracked since they can't be resolved statically.
    imports: HashMap<String, String>,
    aliases: HashMap<String, ItemType>,
    /// Modules declared in this scope, so `use models::User` resolves locally.
    local_modules: HashSet<String>,
}

impl SourceContext {
    fn new(module: String, items: &[&Item]) -> Self {
        let root = Self {
            module,
            imports: HashMap::new(),
            aliases: HashMap::new(),
            local_modules: HashSet::new(),
        };
        root.with_items(items)
    }

    /// A child scope that also sees the imports and aliases declared in `items`.
    fn with_items(&self, items: &[&Item]) -> Self {
        let mut ctx = self.clone();
        let mut imports = HashMap::new();
        for item in items {
            match item {
                Item::Use(item_use) => collect_imports(&item_use.tree, &[], &mut imports),
                Item::Type(item_type) => {
                    ctx.aliases
                        .insert(item_type.ident.to_string(), item_type.clone());
                }
                Item::Mod(item_mod) => {
                    ctx.local_modules.insert(item_mod.ident.to_string());
                }
                _ => {}
            }
        }
        for (name, path) in imports {
            let path = ctx.absolute(&path);
            ctx.imports.insert(name, path);
        }
        ctx
    }

    /// Anchor `crate`, `self`, `super` and local-module paths at the crate root.
    fn absolute(&self, path: &str) -> String {
        let mut module: Vec<&str> = self.module.split("::").collect();
        let mut rest = path.split("::").peekable();
        match rest.peek().copied() {
            Some("crate") => return path.to_string(),
            Some("self") => {
                rest.next();
            }
            Some("super") => {
                while rest.peek() == Some(&"super") {
                    rest.next();
                    if module.len() > 1 {
                        module.pop();
                    }
                }
            }
            Some(first) if self.local_modules.contains(first) => {}
            _ => return path.to_string(),
        }
        module.extend(rest);
        module.join("::")
    }

    fn resolve_ident(&self, ident: &str) -> String {
        if let Some(path) = self.imports.get(ident) {
            return path.clone();
        }
        if let Some((_, canonical)) = PRELUDE.iter().find(|(name, _)| *name == ident) {
            return canonical.to_string();
        }
        if host::is_primitive(ident) || ident == "str" {
            return ident.to_string();
        }
        format!("{}::{ident}", self.module)
    }

    /// Resolve a path to its canonical form using the import map.
    fn resolve_path(&self, path: &syn::Path) -> String {
        let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
        let Some((first, rest)) = segments.split_first() else {
            return String::new();
        };
        if rest.is_empty() {
            return std_path(self.resolve_ident(first));
        }
        let head = match self.imports.get(first) {
            Some(imported) => imported.clone(),
            None => self.absolute(first),
        };
        std_path(format!("{head}::{}", rest.join("::")))
    }
}

/// Recursively flatten a `UseTree` into import entries.
///
/// Each entry maps the local name to its fully-qualified path built from `prefix`.
fn collect_imports(tree: &UseTree, prefix: &[String], imports: &mut HashMap<String, String>) {
    match tree {
        UseTree::Path(p) => {
            let mut new_prefix = prefix.to_vec();
            new_prefix.push(p.ident.to_string());
            collect_imports(&p.tree, &new_prefix, imports);
        }
        UseTree::Name(n) if n.ident == "self" => {
            if let Some(last) = prefix.last() {
                imports.insert(last.clone(), prefix.join("::"));
            }
        }
        UseTree::Name(n) => {
            let name = n.ident.to_string();
            let full_path = make_full_path(prefix, &name);
            imports.insert(name, full_path);
        }
        UseTree::Rename(r) => {
            let full_path = make_full_path(prefix, &r.ident.to_string());
            imports.insert(r.rename.to_string(), full_path);
        }
        UseTree::Glob(_) => {}
        UseTree::Group(g) => {
            for item in &g.items {
                collect_imports(item, prefix, imports);
            }
        }
    }
}

/// Join prefix segments with the final name using `::`.
fn make_full_path(prefix: &[String], name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}::{}", prefix.join("::"), name)
    }
}

fn std_path(path: String) -> String {
    for prefix in ["core::", "alloc::"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            return format!("std::{rest}");
        }
    }
    path
}

/// Check if an item has the `TypeScript` marker derive.
///
/// Recognizes:
/// - `#[derive(TypeScript)]` when `use tsgen_codegen::TypeScript` is in scope
/// - `#[derive(tsgen_codegen::TypeScript)]` or any qualified path ending in `::TypeScript`
/// - `#[derive(Ts)]` when `use tsgen_codegen::TypeScript as Ts` is in scope
fn has_marker_derive(attrs: &[Attribute], ctx: &SourceContext) -> bool {
    for attr in attrs {
        if attr.path().is_ident("derive")
            && let Ok(nested) =
                attr.parse_args_with(Punctuated::<syn::Path, syn::Token![,]>::parse_terminated)
        {
            for path in nested {
                if path.segments.len() == 1 {
                    let ident = path.segments[0].ident.to_string();
                    if ctx
                        .imports
                        .get(&ident)
                        .is_some_and(|p| MARKERS.contains(&p.as_str()))
                    {
                        return true;
                    }
                } else {
                    let qualified = path
                        .segments
                        .iter()
                        .map(|s| s.ident.to_string())
                        .collect::<Vec<_>>()
                        .join("::");
                    if qualified.ends_with("::TypeScript") {
                        return true;
                    }
                }
            }
        }
    }
    false
}

fn meta_items(attr: &Attribute) -> Vec<Meta> {
    attr.parse_args_with(Punctuated::<Meta, syn::Token![,]>::parse_terminated)
        .map(|nested| nested.into_iter().collect())
        .unwrap_or_default()
}

/// `key = "value"`, or `key(serialize = "value")`.
fn string_value(meta: &Meta, key: &str) -> Option<String> {
    match meta {
        Meta::NameValue(nv) if nv.path.is_ident(key) => match &nv.value {
            Expr::Lit(ExprLit {
                lit: Lit::Str(value),
                ..
            }) => Some(value.value()),
            _ => None,
        },
        Meta::List(list) if list.path.is_ident(key) => list
            .parse_args_with(Punctuated::<Meta, syn::Token![,]>::parse_terminated)
            .ok()?
            .iter()
            .find_map(|nested| string_value(nested, "serialize")),
        _ => None,
    }
}

fn is_serde_or_ts(attr: &Attribute) -> bool {
    attr.path().is_ident("serde") || attr.path().is_ident("ts")
}

/// Field or variant attributes.
#[derive(Debug, Default)]
struct MemberAttrs {
    rename: Option<String>,
    skip: bool,
    flatten: bool,
    tags: Vec<String>,
}

impl MemberAttrs {
    fn parse(attrs: &[Attribute]) -> Self {
        let mut parsed = Self::default();
        for attr in attrs {
            let path = attr
                .path()
                .segments
                .iter()
                .map(|s| s.ident.to_string())
                .collect::<Vec<_>>()
                .join("::");
            if path != "doc" {
                parsed.tags.push(path);
            }
            if !is_serde_or_ts(attr) {
                continue;
            }
            for meta in meta_items(attr) {
                if let Some(rename) = string_value(&meta, "rename") {
                    parsed.rename = Some(rename);
                }
                if let Some(tag) = string_value(&meta, "tag") {
                    parsed.tags.push(tag);
                }
                let path = meta.path();
                if path.is_ident("skip") || path.is_ident("skip_serializing") {
                    parsed.skip = true;
                }
                if path.is_ident("flatten") {
                    parsed.flatten = true;
                }
            }
        }
        parsed
    }
}

/// Struct or enum attributes.
#[derive(Debug, Default)]
struct ContainerAttrs {
    rename_all: Option<String>,
    extends: Vec<String>,
}

impl ContainerAttrs {
    fn parse(attrs: &[Attribute]) -> Self {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|attr| is_serde_or_ts(attr)) {
            for meta in meta_items(attr) {
                if let Some(rule) = string_value(&meta, "rename_all") {
                    parsed.rename_all = Some(rule);
                }
                if attr.path().is_ident("ts")
                    && let Some(extends) = string_value(&meta, "extends")
                {
                    parsed.extends.push(extends);
                }
            }
        }
        parsed
    }

    fn rename(&self, name: &str, variant: bool) -> Option<String> {
        let rule = self.rename_all.as_deref()?;
        let renamed = if variant {
            rename_variant(rule, name)
        } else {
            rename_field(rule, name)
        };
        match renamed {
            Some(renamed) if renamed != name => Some(renamed),
            Some(_) => None,
            None => {
                tracing::warn!("ignoring unknown rename_all rule `{rule}`");
                None
            }
        }
    }
}

/// Apply a serde `rename_all` rule to a `PascalCase` variant name.
fn rename_variant(rule: &str, name: &str) -> Option<String> {
    let snake = || {
        let mut snake = String::new();
        for (i, ch) in name.char_indices() {
            if i > 0 && ch.is_uppercase() {
                snake.push('_');
            }
            snake.push(ch.to_ascii_lowercase());
        }
        snake
    };
    Some(match rule {
        "lowercase" => name.to_ascii_lowercase(),
        "UPPERCASE" => name.to_ascii_uppercase(),
        "PascalCase" => name.to_string(),
        "camelCase" => {
            let mut chars = name.chars();
            match chars.next() {
                Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        }
        "snake_case" => snake(),
        "SCREAMING_SNAKE_CASE" => snake().to_ascii_uppercase(),
        "kebab-case" => snake().replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => snake().to_ascii_uppercase().replace('_', "-"),
        _ => return None,
    })
}

/// Apply a serde `rename_all` rule to a `snake_case` field name.
fn rename_field(rule: &str, name: &str) -> Option<String> {
    let pascal = || {
        let mut pascal = String::new();
        let mut capitalize = true;
        for ch in name.chars() {
            if ch == '_' {
                capitalize = true;
            } else if capitalize {
                pascal.push(ch.to_ascii_uppercase());
                capitalize = false;
            } else {
                pascal.push(ch);
            }
        }
        pascal
    };
    Some(match rule {
        "lowercase" | "snake_case" => name.to_string(),
        "UPPERCASE" | "SCREAMING_SNAKE_CASE" => name.to_ascii_uppercase(),
        "PascalCase" => pascal(),
        "camelCase" => {
            let pascal = pascal();
            let mut chars = pascal.chars();
            match chars.next() {
                Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        }
        "kebab-case" => name.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => name.to_ascii_uppercase().replace('_', "-"),
        _ => return None,
    })
}

/// Collect all type arguments from a path segment's angle brackets,
/// skipping const and lifetime arguments.
fn type_args(segment: &syn::PathSegment) -> Vec<&Type> {
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return vec![];
    };
    args.args
        .iter()
        .filter_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        })
        .collect()
}

fn type_param_names(generics: &Generics) -> Vec<String> {
    generics
        .type_params()
        .map(|param| param.ident.to_string())
        .collect()
}

/// Lowers `syn` types to [`TypeRef`]s inside one generic scope.
struct Lowering<'a> {
    ctx: &'a SourceContext,
    /// Generic parameters in scope.
    params: &'a [String],
}

impl Lowering<'_> {
    fn lower(&self, ty: &Type) -> TypeRef {
        self.lower_at(ty, 0)
    }

    fn lower_at(&self, ty: &Type, depth: usize) -> TypeRef {
        match ty {
            Type::Path(TypePath { qself: None, path }) => self.lower_path(path, depth),
            Type::Reference(reference) => self.lower_at(&reference.elem, depth),
            Type::Paren(paren) => self.lower_at(&paren.elem, depth),
            Type::Group(group) => self.lower_at(&group.elem, depth),
            Type::Ptr(ptr) => self.lower_at(&ptr.elem, depth),
            Type::Tuple(tuple) => match tuple.elems.len() {
                0 => TypeRef::simple(host::UNIT),
                2 => TypeRef::named(
                    host::PAIR,
                    tuple.elems.iter().map(|e| self.lower_at(e, depth)).collect(),
                ),
                n => TypeRef::opaque(format!("{n}-tuple")),
            },
            Type::Array(TypeArray { elem, .. }) | Type::Slice(TypeSlice { elem, .. }) => {
                self.lower_array(elem, depth)
            }
            Type::TraitObject(_) | Type::ImplTrait(_) | Type::Infer(_) => TypeRef::wildcard(),
            Type::BareFn(_) => TypeRef::opaque("fn"),
            Type::Macro(_) => TypeRef::opaque("macro"),
            _ => TypeRef::opaque("unsupported"),
        }
    }

    fn lower_path(&self, path: &syn::Path, depth: usize) -> TypeRef {
        let Some(segment) = path.segments.last() else {
            return TypeRef::wildcard();
        };
        let mut args = type_args(segment);

        if path.segments.len() == 1 {
            let ident = segment.ident.to_string();
            if self.params.contains(&ident) {
                return TypeRef::variable(ident, vec![]);
            }
            if let Some(alias) = self.ctx.aliases.get(&ident) {
                return self.expand_alias(alias, &args, depth);
            }
        }

        let canonical = self.ctx.resolve_path(path);
        if canonical == OPTION {
            return match args.first() {
                Some(inner) => self.lower_at(inner, depth).with_nullable(true),
                None => TypeRef::wildcard().with_nullable(true),
            };
        }
        if canonical == "str" {
            return TypeRef::string();
        }
        if TRANSPARENT.contains(&canonical.as_str()) {
            return match args.first() {
                Some(inner) => self.lower_at(inner, depth),
                None => TypeRef::wildcard(),
            };
        }
        if INLINE_ARRAY_VECS.contains(&canonical.as_str()) {
            args = args
                .into_iter()
                .map(|arg| match arg {
                    Type::Array(TypeArray { elem, .. }) => elem.as_ref(),
                    other => other,
                })
                .collect();
        }
        let args = args.iter().map(|arg| self.lower_at(arg, depth)).collect();
        TypeRef::named(canonical, args)
    }

    /// `[T; N]` and `[T]`. Numeric and `char` elements use the parameterless
    /// primitive array types.
    fn lower_array(&self, elem: &Type, depth: usize) -> TypeRef {
        let elem = self.lower_at(elem, depth);
        if !elem.nullable
            && elem.args().is_empty()
            && let Some(name) = elem.canonical().and_then(host::primitive_array)
        {
            return TypeRef::simple(name);
        }
        TypeRef::named(host::ARRAY, vec![elem])
    }

    fn expand_alias(&self, alias: &ItemType, args: &[&Type], depth: usize) -> TypeRef {
        if depth >= MAX_ALIAS_DEPTH {
            return TypeRef::opaque(alias.ident.to_string());
        }
        let params = type_param_names(&alias.generics);
        let body = Lowering {
            ctx: self.ctx,
            params: &params,
        }
        .lower_at(&alias.ty, depth + 1);
        let bindings: IndexMap<String, TypeRef> = params
            .iter()
            .zip(args)
            .map(|(param, arg)| (param.clone(), self.lower_at(arg, depth)))
            .collect();
        body.substitute(&bindings)
    }

    /// Supertrait bounds. Lifetimes and `?Sized` are dropped; shapeless traits
    /// become the top type.
    fn lower_bound(&self, bound: &TypeParamBound) -> Option<TypeRef> {
        let TypeParamBound::Trait(trait_bound) = bound else {
            return None;
        };
        if matches!(trait_bound.modifier, TraitBoundModifier::Maybe(_)) {
            return None;
        }
        let last = trait_bound.path.segments.last()?;
        if SHAPELESS_TRAITS.contains(&last.ident.to_string().as_str()) {
            return Some(TypeRef::simple(host::ANY));
        }
        let canonical = self.ctx.resolve_path(&trait_bound.path);
        let args = type_args(last).iter().map(|arg| self.lower(arg)).collect();
        Some(TypeRef::named(canonical, args))
    }

    /// Trait bounds on type parameters carry no data shape and lower to the
    /// top type. `?Sized` and lifetimes are dropped.
    fn param_bound(bound: &TypeParamBound) -> Option<TypeRef> {
        match bound {
            TypeParamBound::Trait(trait_bound)
                if !matches!(trait_bound.modifier, TraitBoundModifier::Maybe(_)) =>
            {
                Some(TypeRef::simple(host::ANY))
            }
            _ => None,
        }
    }

    fn type_params(&self, generics: &Generics) -> Vec<TypeParam> {
        generics
            .type_params()
            .map(|param| {
                let mut bounds: Vec<_> = param
                    .bounds
                    .iter()
                    .filter_map(Self::param_bound)
                    .collect();
                if let Some(where_clause) = &generics.where_clause {
                    for predicate in &where_clause.predicates {
                        if let WherePredicate::Type(predicate) = predicate
                            && let Type::Path(TypePath { qself: None, path }) =
                                &predicate.bounded_ty
                            && path.is_ident(&param.ident)
                        {
                            bounds.extend(
                                predicate
                                    .bounds
                                    .iter()
                                    .filter_map(Self::param_bound),
                            );
                        }
                    }
                }
                TypeParam::new(param.ident.to_string(), bounds)
            })
            .collect()
    }
}

/// Naming prefix and origin of the items being visited.
#[derive(Debug, Clone)]
struct Scope {
    path: String,
    origin: DeclOrigin,
}

impl Scope {
    fn name_of(&self, ident: &Ident) -> String {
        format!("{}::{}", self.path, ident.unraw())
    }

    fn nested(&self, ident: &Ident, origin: DeclOrigin) -> Self {
        Self {
            path: format!("{}::{}", self.path, ident.unraw()),
            origin: match self.origin {
                DeclOrigin::TopLevel => origin,
                inherited => inherited,
            },
        }
    }
}

fn register(codegen: &mut TypeScriptGenerator, decl: TypeDecl, root: bool) {
    let canonical = decl.name.canonical().to_string();
    tracing::debug!(ty = %canonical, kind = ?decl.kind, root, "extracted declaration");
    codegen.model.register(decl);
    if root {
        codegen.model.mark_root(canonical);
    }
}

/// Whether a flattened field can become an interface supertype. Type
/// variables and open objects have no shape to extend.
fn has_fixed_shape(ty: &TypeRef) -> bool {
    !ty.is_variable()
        && !ty.is_wildcard()
        && !ty.canonical().is_some_and(|c| OPEN_OBJECTS.contains(&c))
}

fn process_struct(
    codegen: &mut TypeScriptGenerator,
    item: &ItemStruct,
    ctx: &SourceContext,
    scope: &Scope,
) {
    let params = type_param_names(&item.generics);
    let lowering = Lowering {
        ctx,
        params: &params,
    };
    let container = ContainerAttrs::parse(&item.attrs);

    let kind = match &item.fields {
        Fields::Named(_) => DeclKind::Struct,
        Fields::Unnamed(_) => DeclKind::TupleStruct,
        Fields::Unit => DeclKind::UnitStruct,
    };
    let mut decl = TypeDecl::new(scope.name_of(&item.ident), kind).with_origin(scope.origin);
    decl.type_params = lowering.type_params(&item.generics);

    if let Fields::Named(named) = &item.fields {
        for field in &named.named {
            let attrs = MemberAttrs::parse(&field.attrs);
            if attrs.skip {
                continue;
            }
            let ty = lowering.lower(&field.ty);
            if attrs.flatten {
                if has_fixed_shape(&ty) {
                    decl.supertypes.push(Supertype::data(ty));
                } else {
                    tracing::warn!(
                        ty = %decl.name,
                        field = ?field.ident.as_ref().map(ToString::to_string),
                        "dropping flattened field with no fixed shape"
                    );
                }
                continue;
            }
            let Some(ident) = &field.ident else {
                continue;
            };
            let name = ident.unraw().to_string();
            let mut member = Member::new(name.clone(), ty);
            member.annotations.extend(attrs.tags);
            member.serial_name = attrs.rename.or_else(|| container.rename(&name, false));
            decl.members.push(member);
        }
    }

    for extends in &container.extends {
        match syn::parse_str::<Type>(extends) {
            Ok(ty) => decl.supertypes.push(Supertype::data(lowering.lower(&ty))),
            Err(err) => tracing::warn!(ty = %decl.name, "ignoring `extends = {extends:?}`: {err}"),
        }
    }

    register(codegen, decl, has_marker_derive(&item.attrs, ctx));
}

fn process_enum(
    codegen: &mut TypeScriptGenerator,
    item: &ItemEnum,
    ctx: &SourceContext,
    scope: &Scope,
) {
    let params = type_param_names(&item.generics);
    let lowering = Lowering {
        ctx,
        params: &params,
    };
    let container = ContainerAttrs::parse(&item.attrs);

    let unit_only = item
        .variants
        .iter()
        .all(|variant| matches!(variant.fields, Fields::Unit));
    let kind = if unit_only {
        DeclKind::Enum
    } else {
        DeclKind::DataEnum
    };
    let mut decl = TypeDecl::new(scope.name_of(&item.ident), kind).with_origin(scope.origin);
    decl.type_params = lowering.type_params(&item.generics);

    for variant in &item.variants {
        let attrs = MemberAttrs::parse(&variant.attrs);
        if attrs.skip {
            continue;
        }
        let name = variant.ident.unraw().to_string();
        let serial_name = attrs.rename.or_else(|| container.rename(&name, true));
        decl.variants.push(EnumConstant { name, serial_name });
    }

    register(codegen, decl, has_marker_derive(&item.attrs, ctx));
}

fn process_trait(
    codegen: &mut TypeScriptGenerator,
    item: &ItemTrait,
    ctx: &SourceContext,
    scope: &Scope,
) {
    let params = type_param_names(&item.generics);
    let lowering = Lowering {
        ctx,
        params: &params,
    };
    let mut decl =
        TypeDecl::new(scope.name_of(&item.ident), DeclKind::Trait).with_origin(scope.origin);
    decl.type_params = lowering.type_params(&item.generics);
    decl.supertypes = item
        .supertraits
        .iter()
        .filter_map(|bound| lowering.lower_bound(bound))
        .filter(|bound| bound.canonical() != Some(host::ANY))
        .map(Supertype::interface)
        .collect();

    register(codegen, decl, false);

    for trait_item in &item.items {
        if let syn::TraitItem::Fn(method) = trait_item
            && let Some(block) = &method.default
        {
            visit_block(
                codegen,
                block,
                ctx,
                &scope.nested(&method.sig.ident, DeclOrigin::Local),
            );
        }
    }
}

/// `impl Trait for Type` records `Trait` as an interface supertype of `Type`.
fn process_impl(
    codegen: &mut TypeScriptGenerator,
    item: &ItemImpl,
    ctx: &SourceContext,
    scope: &Scope,
) {
    let params = type_param_names(&item.generics);
    let lowering = Lowering {
        ctx,
        params: &params,
    };

    if let Some((None, trait_path, _)) = &item.trait_
        && let Type::Path(TypePath {
            qself: None,
            path: self_path,
        }) = item.self_ty.as_ref()
        && let Some(last) = trait_path.segments.last()
    {
        let args = type_args(last).iter().map(|arg| lowering.lower(arg)).collect();
        let supertype = Supertype::interface(TypeRef::named(ctx.resolve_path(trait_path), args));
        codegen
            .deferred_impls
            .push((ctx.resolve_path(self_path), supertype));
    }

    for impl_item in &item.items {
        if let ImplItem::Fn(method) = impl_item {
            visit_block(
                codegen,
                &method.block,
                ctx,
                &scope.nested(&method.sig.ident, DeclOrigin::Local),
            );
        }
    }
}

/// Attach deferred `impl` supertypes to the declarations extracted so far.
fn attach_impls(codegen: &mut TypeScriptGenerator) {
    let pending = std::mem::take(&mut codegen.deferred_impls);
    for (target, supertype) in pending {
        let canonical = codegen
            .model
            .lookup(&target)
            .map(|decl| decl.name.canonical().to_string());
        let decl = match canonical {
            Some(canonical) => codegen.model.get_mut(&canonical),
            None => None,
        };
        match decl {
            Some(decl) => {
                if !decl.supertypes.contains(&supertype) {
                    decl.supertypes.push(supertype);
                }
            }
            None => codegen.deferred_impls.push((target, supertype)),
        }
    }
}

fn visit_items(
    codegen: &mut TypeScriptGenerator,
    items: &[&Item],
    ctx: &SourceContext,
    scope: &Scope,
) {
    for item in items {
        match item {
            Item::Struct(item) => process_struct(codegen, item, ctx, scope),
            Item::Enum(item) => process_enum(codegen, item, ctx, scope),
            Item::Union(item) => {
                let decl = TypeDecl::new(scope.name_of(&item.ident), DeclKind::Union)
                    .with_origin(scope.origin);
                register(codegen, decl, has_marker_derive(&item.attrs, ctx));
            }
            Item::Trait(item) => process_trait(codegen, item, ctx, scope),
            Item::Impl(item) => process_impl(codegen, item, ctx, scope),
            Item::Mod(item) => {
                if let Some((_, content)) = &item.content {
                    let items: Vec<&Item> = content.iter().collect();
                    let child = SourceContext::new(format!("{}::{}", ctx.module, item.ident), &items);
                    let child_scope = Scope {
                        path: format!("{}::{}", scope.path, item.ident),
                        origin: scope.origin,
                    };
                    visit_items(codegen, &items, &child, &child_scope);
                }
            }
            Item::Fn(item) => visit_block(
                codegen,
                &item.block,
                ctx,
                &scope.nested(&item.sig.ident, DeclOrigin::Local),
            ),
            Item::Const(item) => visit_initializer(
                codegen,
                &item.expr,
                ctx,
                &scope.nested(&item.ident, DeclOrigin::Nested),
            ),
            Item::Static(item) => visit_initializer(
                codegen,
                &item.expr,
                ctx,
                &scope.nested(&item.ident, DeclOrigin::Nested),
            ),
            _ => {}
        }
    }
}

fn visit_block(codegen: &mut TypeScriptGenerator, block: &Block, ctx: &SourceContext, scope: &Scope) {
    let items: Vec<&Item> = block
        .stmts
        .iter()
        .filter_map(|stmt| match stmt {
            Stmt::Item(item) => Some(item),
            _ => None,
        })
        .collect();
    if items.is_empty() {
        return;
    }
    let local = ctx.with_items(&items);
    visit_items(codegen, &items, &local, scope);
}

fn visit_initializer(
    codegen: &mut TypeScriptGenerator,
    expr: &Expr,
    ctx: &SourceContext,
    scope: &Scope,
) {
    match expr {
        Expr::Block(block) => visit_block(codegen, &block.block, ctx, scope),
        Expr::Unsafe(block) => visit_block(codegen, &block.block, ctx, scope),
        _ => {}
    }
}

fn parse_source_file(
    codegen: &mut TypeScriptGenerator,
    source: &str,
    module: &str,
) -> syn::Result<()> {
    let file = syn::parse_file(source)?;
    let items: Vec<&Item> = file.items.iter().collect();

    let ctx = SourceContext::new(module.to_string(), &items);
    let scope = Scope {
        path: module.to_string(),
        origin: DeclOrigin::TopLevel,
    };
    visit_items(codegen, &items, &ctx, &scope);
    attach_impls(codegen);
    Ok(())
}

/// Module path of a file below a source root. `lib.rs`, `main.rs` and
/// `mod.rs` belong to their directory's module.
fn module_path(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let mut segments = vec!["crate".to_string()];
    for component in relative.components() {
        if let Component::Normal(name) = component {
            segments.push(name.to_string_lossy().into_owned());
        }
    }
    if let Some(last) = segments.pop() {
        let stem = last.strip_suffix(".rs").unwrap_or(&last);
        if !matches!(stem, "lib" | "main" | "mod") {
            segments.push(stem.to_string());
        }
    }
    if segments.is_empty() {
        segments.push("crate".to_string());
    }
    segments.join("::")
}

impl TypeScriptGenerator {
    /// Parse a single Rust source file as the crate root and extract its types.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> Result<(), tsgen_codegen::Error> {
    /// use tsgen_codegen::TypeScriptGenerator;
    ///
    /// let mut generator = TypeScriptGenerator::new();
    /// generator.add_source_file("src/lib.rs")?;
    /// generator.write_to_file("types.d.ts")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn add_source_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, Error> {
        self.add_source_file_in("crate", path)
    }

    /// Parse a Rust source file whose items live in `module`, e.g. `crate::models`.
    pub fn add_source_file_in(
        &mut self,
        module: &str,
        path: impl AsRef<Path>,
    ) -> Result<&mut Self, Error> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        parse_source_file(self, &source, module).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self)
    }

    /// Parse Rust source from a string as the crate root.
    ///
    /// Source that fails to parse is skipped with a warning.
    pub fn add_source_str(&mut self, source: &str) -> &mut Self {
        self.add_source_str_in("crate", source)
    }

    pub fn add_source_str_in(&mut self, module: &str, source: &str) -> &mut Self {
        if let Err(err) = parse_source_file(self, source, module) {
            tracing::warn!(%err, "skipping source that failed to parse");
        }
        self
    }

    /// Recursively scan a directory for `.rs` files and extract their types.
    /// Module paths follow the file layout below `path`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> Result<(), tsgen_codegen::Error> {
    /// use tsgen_codegen::TypeScriptGenerator;
    ///
    /// let mut generator = TypeScriptGenerator::new();
    /// generator.add_source_dir("src/")?;
    /// generator.write_to_file("types.d.ts")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn add_source_dir(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, Error> {
        let root = path.as_ref();
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "rs") {
                let module = module_path(root, path);
                self.add_source_file_in(&module, path)?;
            }
        }
        Ok(self)
    }
}
