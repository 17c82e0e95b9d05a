//! Conservative tracking of scope-graph extensions that may still happen.
//!
//! Each unsolved constraint contributes the `(scope, label)` pairs it may
//! still extend. The scope terms are kept as written in the constraint and
//! compared through the unifier when asked, so a pair whose scope is an
//! unbound variable blocks every scope it might become.

use crate::constraint::Constraint;
use crate::spec::Spec;
use crate::term::{TermId, TermStore};
use crate::unify::Unifier;
use im::OrdMap;

/// Pending extension counts, indexed by label and then by scope term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completeness {
    incomplete: OrdMap<TermId, OrdMap<TermId, usize>>,
}

impl Completeness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, constraint: &Constraint, spec: &Spec) {
        for (scope, label) in constraint.critical_edges(spec) {
            self.add_edge(scope, label);
        }
    }

    /// Returns true if any pair was released.
    pub fn remove(&mut self, constraint: &Constraint, spec: &Spec) -> bool {
        let mut changed = false;
        for (scope, label) in constraint.critical_edges(spec) {
            changed |= self.remove_edge(scope, label);
        }
        changed
    }

    pub fn add_edge(&mut self, scope: TermId, label: TermId) {
        let mut scopes = self.incomplete.get(&label).cloned().unwrap_or_default();
        let count = scopes.get(&scope).copied().unwrap_or(0);
        scopes.insert(scope, count + 1);
        self.incomplete.insert(label, scopes);
    }

    pub fn remove_edge(&mut self, scope: TermId, label: TermId) -> bool {
        let Some(mut scopes) = self.incomplete.get(&label).cloned() else {
            return false;
        };
        match scopes.get(&scope).copied() {
            None => return false,
            Some(1) => {
                scopes.remove(&scope);
            }
            Some(count) => {
                scopes.insert(scope, count - 1);
            }
        }
        if scopes.is_empty() {
            self.incomplete.remove(&label);
        } else {
            self.incomplete.insert(label, scopes);
        }
        true
    }

    /// No remaining constraint can add `label` edges to `scope`.
    ///
    /// Only the pending scopes of `label` are compared, and only those that
    /// are not already the same term need a unification trial.
    pub fn is_complete(
        &self,
        scope: TermId,
        label: TermId,
        unifier: &Unifier,
        terms: &TermStore,
    ) -> bool {
        let Some(scopes) = self.incomplete.get(&label) else {
            return true;
        };
        if scopes.contains_key(&scope) {
            return false;
        }
        !scopes
            .keys()
            .any(|s| unifier.are_equal(*s, scope, terms).unwrap_or(true))
    }

    pub fn is_empty(&self) -> bool {
        self.incomplete.is_empty()
    }

    pub fn len(&self) -> usize {
        self.incomplete
            .values()
            .map(|scopes| scopes.values().sum::<usize>())
            .sum()
    }
}

#[cfg(test)]
#[path = "tests/completeness.rs"]
mod tests;
