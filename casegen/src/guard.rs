//! Cycle detection for structural instantiation.

use std::collections::HashSet;

use crate::types::TypeDescriptor;

/// The set of types currently being structurally expanded.
///
/// Owned by a [`ResolutionContext`](crate::context::ResolutionContext), never
/// global: independent requests each carry their own guard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleGuard {
    in_progress: HashSet<TypeDescriptor>,
}

impl CycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `ty` as in progress. Returns false, leaving the set unchanged,
    /// if it already was: the caller has found a cycle.
    pub fn enter(&mut self, ty: &TypeDescriptor) -> bool {
        self.in_progress.insert(ty.clone())
    }

    /// Mark `ty` as done
    pub fn exit(&mut self, ty: &TypeDescriptor) {
        self.in_progress.remove(ty);
    }

    pub fn is_in_progress(&self, ty: &TypeDescriptor) -> bool {
        self.in_progress.contains(ty)
    }

    pub fn is_empty(&self) -> bool {
        self.in_progress.is_empty()
    }

    pub fn len(&self) -> usize {
        self.in_progress.len()
    }
}
