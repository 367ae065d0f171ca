//! Per-request resolution state.

use crate::catalog::ScopeKey;
use crate::error::Diagnostic;
use crate::guard::CycleGuard;
use crate::metadata::LiteralTable;
use crate::types::TypeDescriptor;

/// State carried through one top-level resolution request.
///
/// Holds the ordered scope chain consulted for registered strategies, whether
/// structural fallback may use constructors with arguments, the cycle guard,
/// the literal constants in effect, and the diagnostics collected so far.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    scope_chain: Vec<ScopeKey>,
    structural_fallback: bool,
    guard: CycleGuard,
    operation_literals: Option<LiteralTable>,
    type_literals: LiteralTable,
    diagnostics: Vec<Diagnostic>,
}

impl ResolutionContext {
    pub fn new(scope_chain: Vec<ScopeKey>) -> Self {
        Self {
            scope_chain,
            structural_fallback: true,
            ..Self::default()
        }
    }

    /// Context for one parameter of an operation of `declaring`
    pub fn for_parameter(declaring: &TypeDescriptor, operation: &str, ordinal: usize) -> Self {
        Self::new(vec![
            ScopeKey::local(operation, ordinal),
            ScopeKey::DeclaringType(declaring.clone()),
            ScopeKey::namespace(declaring.namespace()),
            ScopeKey::Default,
        ])
    }

    /// Context for values used anywhere inside `declaring`, such as receivers
    pub fn for_type(declaring: &TypeDescriptor) -> Self {
        Self::new(vec![
            ScopeKey::DeclaringType(declaring.clone()),
            ScopeKey::namespace(declaring.namespace()),
            ScopeKey::Default,
        ])
    }

    pub fn with_structural_fallback(mut self, enabled: bool) -> Self {
        self.structural_fallback = enabled;
        self
    }

    pub fn with_operation_literals(mut self, literals: LiteralTable) -> Self {
        self.operation_literals = Some(literals);
        self
    }

    pub fn with_type_literals(mut self, literals: LiteralTable) -> Self {
        self.type_literals = literals;
        self
    }

    pub fn scope_chain(&self) -> &[ScopeKey] {
        &self.scope_chain
    }

    pub fn structural_fallback(&self) -> bool {
        self.structural_fallback
    }

    pub fn guard(&self) -> &CycleGuard {
        &self.guard
    }

    /// Run `expand` with `ty` marked in progress.
    ///
    /// Returns `None` without running it when `ty` is already being expanded
    /// further up. The mark is removed afterwards so later siblings can
    /// expand the same type.
    pub fn expand<R>(&mut self, ty: &TypeDescriptor, expand: impl FnOnce(&mut Self) -> R) -> Option<R> {
        if !self.guard.enter(ty) {
            return None;
        }
        let result = expand(self);
        self.guard.exit(ty);
        Some(result)
    }

    /// Context for resolving constructor arguments: operation-local scopes
    /// and literals no longer apply, the guard carries over
    pub fn nested(&self) -> Self {
        Self {
            scope_chain: self
                .scope_chain
                .iter()
                .filter(|key| !matches!(key, ScopeKey::Local { .. }))
                .cloned()
                .collect(),
            structural_fallback: self.structural_fallback,
            guard: self.guard.clone(),
            operation_literals: None,
            type_literals: self.type_literals.clone(),
            diagnostics: Vec::new(),
        }
    }

    /// Snapshot for re-deriving sequences later; diagnostics start empty
    pub fn fork(&self) -> Self {
        Self {
            diagnostics: Vec::new(),
            ..self.clone()
        }
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Take over the diagnostics of a nested context
    pub fn absorb(&mut self, nested: ResolutionContext) {
        self.diagnostics.extend(nested.diagnostics);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Literal texts of `ty` in effect, operation literals first, without
    /// duplicates
    pub fn literal_texts(&self, ty: &TypeDescriptor) -> Vec<String> {
        let mut texts: Vec<String> = Vec::new();
        let tables = self.operation_literals.iter().chain([&self.type_literals]);
        for text in tables.flat_map(|table| table.literals_for(ty)) {
            if !texts.iter().any(|seen| seen == text) {
                texts.push(text.to_string());
            }
        }
        texts
    }

    /// Types named by type literals in effect
    pub fn type_references(&self) -> Vec<TypeDescriptor> {
        let mut references: Vec<TypeDescriptor> = Vec::new();
        let tables = self.operation_literals.iter().chain([&self.type_literals]);
        for ty in tables.flat_map(|table| table.type_references()) {
            if !references.contains(&ty) {
                references.push(ty);
            }
        }
        references
    }
}
