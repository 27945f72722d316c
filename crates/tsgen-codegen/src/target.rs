//! Target types: the declarations selected for emission.

use indexmap::IndexMap;

use crate::context::{ResolutionMode, TargetContext};
use crate::error::Rejection;
use crate::host::{
    self, DeclKind, DeclOrigin, QualifiedName, SupertypeKind, TypeDecl, TypeOracle, TypeRef,
};
use crate::wrapped::WrappedType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Interface,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOrigin {
    Annotated,
    Discovered,
}

#[derive(Debug, Clone)]
pub struct TargetProperty {
    pub name: String,
    pub ty: WrappedType,
    pub serial_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TargetEnumValue {
    pub name: String,
    pub ty: WrappedType,
    pub serial_name: Option<String>,
}

#[derive(Debug, Clone)]
pub enum TargetMember {
    Property(TargetProperty),
    EnumValue(TargetEnumValue),
}

impl TargetMember {
    pub fn name(&self) -> &str {
        match self {
            TargetMember::Property(p) => &p.name,
            TargetMember::EnumValue(v) => &v.name,
        }
    }

    pub fn ty(&self) -> &WrappedType {
        match self {
            TargetMember::Property(p) => &p.ty,
            TargetMember::EnumValue(v) => &v.ty,
        }
    }

    /// The name used in JSON: the serialization override with `$` escaped,
    /// or the member name.
    pub fn json_name(&self) -> String {
        let serial = match self {
            TargetMember::Property(p) => p.serial_name.as_deref(),
            TargetMember::EnumValue(v) => v.serial_name.as_deref(),
        };
        match serial {
            Some(serial) => serial.replace('$', "\\$"),
            None => self.name().to_string(),
        }
    }
}

/// A supertype together with the arguments the subtype supplies for it.
#[derive(Debug, Clone)]
pub struct AppliedType {
    pub name: QualifiedName,
    pub arguments: Vec<WrappedType>,
    /// Supertype parameter name -> argument supplied by the subtype.
    pub resolution: IndexMap<String, TypeRef>,
}

#[derive(Debug, Clone)]
pub struct TargetType {
    pub name: QualifiedName,
    pub kind: TargetKind,
    pub origin: TargetOrigin,
    pub members: IndexMap<String, TargetMember>,
    pub type_variables: IndexMap<String, WrappedType>,
    pub supertypes: Vec<AppliedType>,
}

impl TargetType {
    pub fn simple_name(&self) -> &str {
        self.name.simple()
    }

    pub fn is_enum(&self) -> bool {
        self.kind == TargetKind::Enum
    }
}

/// Build the target type for `decl`, or record why it cannot be generated.
pub fn assemble(decl: &TypeDecl, ctx: &mut TargetContext<'_>) -> Option<TargetType> {
    if decl.name.canonical() == host::PAIR {
        return None;
    }
    if let Some(rejection) = check_eligibility(decl, ctx) {
        ctx.reject(rejection);
        return None;
    }

    let origin = match ctx.mode() {
        ResolutionMode::ExplicitRoot => TargetOrigin::Annotated,
        ResolutionMode::Transitive => TargetOrigin::Discovered,
    };

    let target = match decl.kind {
        DeclKind::Enum => TargetType {
            name: decl.name.clone(),
            kind: TargetKind::Enum,
            origin,
            members: enum_values(decl, ctx),
            type_variables: IndexMap::new(),
            supertypes: Vec::new(),
        },
        _ => TargetType {
            name: decl.name.clone(),
            kind: TargetKind::Interface,
            origin,
            type_variables: type_variables(decl, ctx),
            members: properties(decl, ctx),
            supertypes: supertypes(decl, ctx),
        },
    };
    Some(target)
}

fn check_eligibility(decl: &TypeDecl, ctx: &TargetContext<'_>) -> Option<Rejection> {
    let name = decl.name.canonical().to_string();
    if !matches!(decl.kind, DeclKind::Struct | DeclKind::Enum) {
        return Some(Rejection::NotDataShape { name });
    }
    match decl.origin {
        DeclOrigin::Nested => return Some(Rejection::Nested { name }),
        DeclOrigin::Local => return Some(Rejection::Local { name }),
        DeclOrigin::TopLevel => {}
    }
    data_supertypes(decl, ctx.oracle())
        .into_iter()
        .find(|(_, found)| found.is_none())
        .map(|(ty, _)| Rejection::OpaqueSupertype {
            name,
            supertype: ty.to_string(),
        })
}

/// Data supertypes other than the top type, paired with their declarations.
fn data_supertypes<'a>(
    decl: &'a TypeDecl,
    oracle: &'a dyn TypeOracle,
) -> Vec<(&'a TypeRef, Option<&'a TypeDecl>)> {
    oracle
        .direct_supertypes(decl)
        .iter()
        .filter(|s| s.kind == SupertypeKind::Data && s.ty.canonical() != Some(host::ANY))
        .map(|s| (&s.ty, s.ty.canonical().and_then(|c| oracle.lookup(c))))
        .collect()
}

fn type_variables(decl: &TypeDecl, ctx: &mut TargetContext<'_>) -> IndexMap<String, WrappedType> {
    let mut variables = IndexMap::new();
    for param in &decl.type_params {
        let wrapped = WrappedType::type_variable(param.as_type_ref());
        ctx.classify_and_enqueue(&wrapped);
        variables.entry(param.name.clone()).or_insert(wrapped);
    }
    variables
}

fn properties(decl: &TypeDecl, ctx: &mut TargetContext<'_>) -> IndexMap<String, TargetMember> {
    let oracle = ctx.oracle();
    let mut members = IndexMap::new();
    for member in &decl.members {
        let mut ty = WrappedType::property(member.ty.clone(), member.annotations.clone());
        if ty.display_name().is_some_and(|name| decl.has_type_param(name)) {
            ty.mark_returns_type_variable();
        }
        ctx.classify_and_enqueue(&ty);
        let property = TargetProperty {
            name: member.name.clone(),
            ty,
            serial_name: oracle.member_serial_name(member).map(str::to_string),
        };
        members.insert(member.name.clone(), TargetMember::Property(property));
    }
    members
}

fn supertypes(decl: &TypeDecl, ctx: &mut TargetContext<'_>) -> Vec<AppliedType> {
    let found: Vec<_> = data_supertypes(decl, ctx.oracle())
        .into_iter()
        .filter_map(|(ty, found)| found.map(|sup| (ty, sup)))
        .filter(|(_, sup)| sup.kind == DeclKind::Struct && sup.name != decl.name)
        .collect();

    let mut applied = Vec::new();
    for (ty, sup) in found {
        ctx.enqueue(&sup.name);

        let mut arguments = Vec::new();
        let mut resolution = IndexMap::new();
        for (index, arg) in ty.args().iter().enumerate() {
            let wrapped = match sup.type_params.get(index) {
                Some(param) => {
                    resolution.insert(param.name.clone(), arg.clone());
                    WrappedType::type_variable_at(arg.clone(), param.as_type_ref())
                }
                None => WrappedType::type_variable(arg.clone()),
            };
            ctx.classify_and_enqueue(&wrapped);
            arguments.push(wrapped);
        }

        applied.push(AppliedType {
            name: sup.name.clone(),
            arguments,
            resolution,
        });
    }
    applied
}

fn enum_values(decl: &TypeDecl, ctx: &TargetContext<'_>) -> IndexMap<String, TargetMember> {
    let oracle = ctx.oracle();
    decl.variants
        .iter()
        .map(|variant| {
            let value = TargetEnumValue {
                name: variant.name.clone(),
                ty: WrappedType::enum_value(TypeRef::simple(decl.name.canonical())),
                serial_name: oracle.variant_serial_name(variant).map(str::to_string),
            };
            (variant.name.clone(), TargetMember::EnumValue(value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;
    use crate::host::{EnumConstant, HostModel, Member, Supertype, TypeParam};

    fn model() -> HostModel {
        HostModel::with_builtins()
    }

    #[test]
    fn test_assemble_struct() {
        let mut model = model();
        let decl = TypeDecl::structure(
            "crate::User",
            vec![
                Member::new("name", TypeRef::string()),
                Member::new("address", TypeRef::simple("crate::Address"))
                    .with_serial_name("home$address"),
            ],
        );
        model.register(decl.clone());
        model.register(TypeDecl::structure("crate::Address", vec![]));
        let mut ctx = TargetContext::new(&model);

        let target = assemble(&decl, &mut ctx).unwrap();
        assert_eq!(target.kind, TargetKind::Interface);
        assert_eq!(target.origin, TargetOrigin::Annotated);
        let names: Vec<_> = target.members.keys().cloned().collect();
        assert_eq!(names, ["name", "address"]);
        assert_eq!(target.members["address"].json_name(), "home\\$address");
        assert_eq!(target.members["name"].json_name(), "name");

        let pending: Vec<_> = ctx.pending_snapshot().into_iter().map(|(s, _)| s).collect();
        assert_eq!(pending, ["Address"]);
    }

    #[test]
    fn test_property_returning_type_variable() {
        let decl = TypeDecl::structure(
            "crate::Envelope",
            vec![
                Member::new("body", TypeRef::variable("T", vec![])),
                Member::new("items", TypeRef::vec(TypeRef::variable("T", vec![]))),
            ],
        )
        .with_type_param(TypeParam::new("T", vec![]));
        let model = model();
        let mut ctx = TargetContext::new(&model);

        let target = assemble(&decl, &mut ctx).unwrap();
        assert!(target.members["body"].ty().returns_type_variable());
        assert!(!target.members["items"].ty().returns_type_variable());
        assert!(target.type_variables.contains_key("T"));
    }

    #[test]
    fn test_bounds_are_queued() {
        let mut model = model();
        model.register(TypeDecl::structure("crate::Shape", vec![]));
        let decl = TypeDecl::structure("crate::Canvas", vec![]).with_type_param(TypeParam::new(
            "S",
            vec![TypeRef::simple("crate::Shape")],
        ));
        let mut ctx = TargetContext::new(&model);

        assemble(&decl, &mut ctx).unwrap();
        let pending: Vec<_> = ctx.pending_snapshot().into_iter().map(|(s, _)| s).collect();
        assert_eq!(pending, ["Shape"]);
    }

    #[test]
    fn test_enum_values_use_enum_type() {
        let mut decl = TypeDecl::enumeration("crate::Status", &["Active", "Banned"]);
        decl.variants[1] = EnumConstant {
            name: "Banned".into(),
            serial_name: Some("banned".into()),
        };
        let model = model();
        let mut ctx = TargetContext::new(&model);

        let target = assemble(&decl, &mut ctx).unwrap();
        assert!(target.is_enum());
        assert_eq!(
            target.members["Active"].ty().canonical_name(),
            Some("crate::Status")
        );
        assert_eq!(target.members["Banned"].json_name(), "banned");
        assert!(ctx.pending_snapshot().is_empty());
    }

    #[test]
    fn test_supertypes_resolved_and_filtered() {
        let mut model = model();
        model.register(
            TypeDecl::structure(
                "crate::Page",
                vec![Member::new("items", TypeRef::vec(TypeRef::variable("T", vec![])))],
            )
            .with_type_param(TypeParam::new("T", vec![])),
        );
        model.register(TypeDecl::structure("crate::User", vec![]));
        let decl = TypeDecl::structure("crate::UserPage", vec![])
            .with_supertype(Supertype::data(TypeRef::simple(host::ANY)))
            .with_supertype(Supertype::interface(TypeRef::simple("std::fmt::Debug")))
            .with_supertype(Supertype::data(TypeRef::named(
                "crate::Page",
                vec![TypeRef::simple("crate::User")],
            )));
        let mut ctx = TargetContext::new(&model);

        let target = assemble(&decl, &mut ctx).unwrap();
        assert_eq!(target.supertypes.len(), 1);
        let page = &target.supertypes[0];
        assert_eq!(page.name.simple(), "Page");
        assert_eq!(page.resolution["T"].canonical(), Some("crate::User"));
        assert_eq!(page.arguments[0].display_name(), Some("User"));

        let pending: Vec<_> = ctx.pending_snapshot().into_iter().map(|(s, _)| s).collect();
        assert_eq!(pending, ["Page", "User"]);
    }

    #[test]
    fn test_opaque_supertype_rejected() {
        let model = model();
        let decl = TypeDecl::structure(
            "crate::Wrapper",
            vec![Member::new("x", TypeRef::simple("crate::Leak"))],
        )
        .with_supertype(Supertype::data(TypeRef::simple("other_crate::Base")));
        let mut ctx = TargetContext::new(&model);

        assert!(assemble(&decl, &mut ctx).is_none());
        assert!(matches!(
            ctx.diagnostics()[0].rejection,
            Rejection::OpaqueSupertype { .. }
        ));
        assert!(ctx.pending_snapshot().is_empty());
    }

    #[test]
    fn test_eligibility_severity() {
        let model = model();
        let tuple = TypeDecl::new("crate::Meters", DeclKind::TupleStruct);
        let local = TypeDecl::structure("crate::Scratch", vec![]).with_origin(DeclOrigin::Local);
        let nested = TypeDecl::structure("crate::Hidden", vec![]).with_origin(DeclOrigin::Nested);
        let mut ctx = TargetContext::new(&model);

        assert!(assemble(&tuple, &mut ctx).is_none());
        ctx.set_mode(ResolutionMode::Transitive);
        assert!(assemble(&local, &mut ctx).is_none());
        assert!(assemble(&nested, &mut ctx).is_none());

        let diagnostics = ctx.diagnostics();
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert!(matches!(diagnostics[0].rejection, Rejection::NotDataShape { .. }));
        assert_eq!(diagnostics[1].severity, Severity::Warning);
        assert!(matches!(diagnostics[1].rejection, Rejection::Local { .. }));
        assert!(matches!(diagnostics[2].rejection, Rejection::Nested { .. }));
    }

    #[test]
    fn test_pair_is_never_generated() {
        let model = model();
        let pair = TypeDecl::structure(host::PAIR, vec![]);
        let mut ctx = TargetContext::new(&model);

        assert!(assemble(&pair, &mut ctx).is_none());
        assert!(ctx.diagnostics().is_empty());
    }
}
