//! Scope resolution: from one annotated root to every type it reaches.

use crate::context::{ResolutionMode, TargetContext};
use crate::error::Rejection;
use crate::host::TypeDecl;
use crate::target::{self, TargetType};

/// Resolve `root` and everything reachable from it that is not yet in scope.
///
/// Types already in scope are skipped, so across several calls on one
/// context every type is returned once.
#[tracing::instrument(level = "debug", skip(ctx))]
pub fn resolve(root: &str, ctx: &mut TargetContext<'_>) -> Vec<TargetType> {
    let mut resolved = Vec::new();

    ctx.set_mode(ResolutionMode::ExplicitRoot);
    match ctx.oracle().lookup(root) {
        Some(decl) => resolved.extend(process(decl, ctx)),
        None => ctx.reject(Rejection::Unknown {
            name: root.to_string(),
        }),
    }

    ctx.set_mode(ResolutionMode::Transitive);
    loop {
        let snapshot = ctx.pending_snapshot();
        if snapshot.is_empty() {
            break;
        }
        tracing::debug!(pending = snapshot.len(), "resolving discovered types");
        for (simple, canonical) in snapshot {
            ctx.remove_pending(&simple);
            if ctx.is_in_scope(&simple) {
                continue;
            }
            if let Some(decl) = ctx.oracle().lookup(&canonical) {
                resolved.extend(process(decl, ctx));
            }
        }
    }

    resolved
}

fn process(decl: &TypeDecl, ctx: &mut TargetContext<'_>) -> Option<TargetType> {
    let simple = decl.name.simple();
    if ctx.is_in_scope(simple) {
        if ctx.mode() == ResolutionMode::ExplicitRoot
            && let Some(existing) = ctx.annotated(simple)
            && existing != decl.name.canonical()
        {
            let rejection = Rejection::DuplicateName {
                name: simple.to_string(),
                existing: existing.to_string(),
                duplicate: decl.name.canonical().to_string(),
            };
            ctx.error(rejection);
        }
        return None;
    }

    let Some(target) = target::assemble(decl, ctx) else {
        ctx.mark_rejected(&decl.name);
        return None;
    };
    ctx.add_to_scope(&target.name);
    tracing::debug!(ty = %target.name, origin = ?target.origin, "added to scope");
    Some(target)
}
