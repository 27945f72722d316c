use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::classify;
use crate::error::{Diagnostic, Rejection};
use crate::host::{QualifiedName, TypeOracle};
use crate::wrapped::{CollectionType, WrappedType};

/// Whether the type being resolved was annotated or discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    ExplicitRoot,
    Transitive,
}

/// Mutable state of one generation run.
pub struct TargetContext<'o> {
    oracle: &'o dyn TypeOracle,
    /// Simple names committed to generation.
    types_within_scope: BTreeSet<String>,
    /// Simple name -> canonical path, for annotated types only.
    annotated: IndexMap<String, String>,
    /// Simple name -> canonical path, waiting to be resolved.
    pending: IndexMap<String, String>,
    /// Simple names of types that failed eligibility.
    rejected: BTreeSet<String>,
    mode: ResolutionMode,
    diagnostics: Vec<Diagnostic>,
}

impl<'o> TargetContext<'o> {
    pub fn new(oracle: &'o dyn TypeOracle) -> Self {
        Self {
            oracle,
            types_within_scope: BTreeSet::new(),
            annotated: IndexMap::new(),
            pending: IndexMap::new(),
            rejected: BTreeSet::new(),
            mode: ResolutionMode::ExplicitRoot,
            diagnostics: Vec::new(),
        }
    }

    pub fn oracle(&self) -> &'o dyn TypeOracle {
        self.oracle
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ResolutionMode) {
        self.mode = mode;
    }

    pub fn is_in_scope(&self, simple: &str) -> bool {
        self.types_within_scope.contains(simple)
    }

    pub fn types_within_scope(&self) -> &BTreeSet<String> {
        &self.types_within_scope
    }

    /// Canonical path of the annotated type already using `simple`, if any.
    pub fn annotated(&self, simple: &str) -> Option<&str> {
        self.annotated.get(simple).map(String::as_str)
    }

    pub fn add_to_scope(&mut self, name: &QualifiedName) {
        let simple = name.simple().to_string();
        if self.mode == ResolutionMode::ExplicitRoot {
            self.annotated
                .insert(simple.clone(), name.canonical().to_string());
        }
        self.types_within_scope.insert(simple);
    }

    /// Remember a type that will not be generated so it is not queued again.
    pub fn mark_rejected(&mut self, name: &QualifiedName) {
        self.rejected.insert(name.simple().to_string());
    }

    pub fn is_rejected(&self, simple: &str) -> bool {
        self.rejected.contains(simple)
    }

    /// Queue a declared type for discovery unless it is already known.
    pub fn enqueue(&mut self, name: &QualifiedName) {
        let simple = name.simple();
        if self.is_in_scope(simple)
            || self.is_rejected(simple)
            || self.pending.contains_key(simple)
        {
            return;
        }
        tracing::debug!(ty = %name, "queued for discovery");
        self.pending
            .insert(simple.to_string(), name.canonical().to_string());
    }

    /// Classify `wrapped` and everything nested in it, queueing each newly
    /// seen declared type that is not a collection.
    pub fn classify_and_enqueue(&mut self, wrapped: &WrappedType) {
        let oracle = self.oracle;
        let mut discovered = Vec::new();
        wrapped.walk(&mut |nested: &WrappedType| {
            classify::classify(nested, oracle);
            if nested.is_primitive()
                || !nested.is_instantiable()
                || nested.collection_type() != CollectionType::None
            {
                return;
            }
            if let Some(decl) = nested.canonical_name().and_then(|c| oracle.lookup(c)) {
                discovered.push(decl.name.clone());
            }
        });
        for name in &discovered {
            self.enqueue(name);
        }
    }

    pub fn pending_snapshot(&self) -> Vec<(String, String)> {
        self.pending
            .iter()
            .map(|(simple, canonical)| (simple.clone(), canonical.clone()))
            .collect()
    }

    pub fn remove_pending(&mut self, simple: &str) {
        self.pending.shift_remove(simple);
    }

    /// Record a rejection. Annotated types fail the run, discovered types
    /// are dropped with a warning.
    pub fn reject(&mut self, rejection: Rejection) {
        match self.mode {
            ResolutionMode::ExplicitRoot => self.error(rejection),
            ResolutionMode::Transitive => {
                tracing::warn!("skipping discovered type: {rejection}");
                self.diagnostics.push(Diagnostic::warning(rejection));
            }
        }
    }

    pub fn error(&mut self, rejection: Rejection) {
        tracing::debug!("rejected: {rejection}");
        self.diagnostics.push(Diagnostic::error(rejection));
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
