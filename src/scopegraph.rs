//! Persistent scope graph and resolution paths.
//!
//! Scopes, labels and relations are addressed by ground terms. Edges and
//! data are kept in insertion order per `(scope, label)` key.

use crate::term::{format_term, TermId, TermStore};
use im::{OrdMap, OrdSet, Vector};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeGraph {
    scopes: OrdSet<TermId>,
    edges: OrdMap<(TermId, TermId), Vector<TermId>>,
    data: OrdMap<(TermId, TermId), Vector<TermId>>,
}

impl ScopeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_scope(&mut self, scope: TermId) {
        self.scopes.insert(scope);
    }

    pub fn add_edge(&mut self, source: TermId, label: TermId, target: TermId) {
        self.scopes.insert(source);
        self.scopes.insert(target);
        let mut targets = self.edges.get(&(source, label)).cloned().unwrap_or_default();
        targets.push_back(target);
        self.edges.insert((source, label), targets);
    }

    pub fn add_datum(&mut self, scope: TermId, relation: TermId, datum: TermId) {
        self.scopes.insert(scope);
        let mut data = self.data.get(&(scope, relation)).cloned().unwrap_or_default();
        data.push_back(datum);
        self.data.insert((scope, relation), data);
    }

    pub fn scopes(&self) -> &OrdSet<TermId> {
        &self.scopes
    }

    pub fn edges(&self, source: TermId, label: TermId) -> Vec<TermId> {
        self.edges
            .get(&(source, label))
            .map(|targets| targets.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn data(&self, scope: TermId, relation: TermId) -> Vec<TermId> {
        self.data
            .get(&(scope, relation))
            .map(|data| data.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vector::len).sum()
    }

    pub fn data_count(&self) -> usize {
        self.data.values().map(Vector::len).sum()
    }

    /// Do both graphs agree on every edge and datum leaving `scopes`?
    pub fn same_on(&self, other: &ScopeGraph, scopes: &OrdSet<TermId>) -> bool {
        let restrict = |map: &OrdMap<(TermId, TermId), Vector<TermId>>| {
            map.iter()
                .filter(|((scope, _), _)| scopes.contains(scope))
                .map(|(key, values)| (*key, values.clone()))
                .collect::<OrdMap<(TermId, TermId), Vector<TermId>>>()
        };
        restrict(&self.edges) == restrict(&other.edges)
            && restrict(&self.data) == restrict(&other.data)
    }
}

/// A path through the scope graph: a start scope and `(label, scope)`
/// steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopePath {
    start: TermId,
    steps: Vec<(TermId, TermId)>,
}

impl ScopePath {
    pub fn new(start: TermId) -> Self {
        ScopePath {
            start,
            steps: Vec::new(),
        }
    }

    /// Extend by one edge.
    pub fn step(&self, label: TermId, target: TermId) -> ScopePath {
        let mut steps = self.steps.clone();
        steps.push((label, target));
        ScopePath {
            start: self.start,
            steps,
        }
    }

    pub fn source(&self) -> TermId {
        self.start
    }

    pub fn target(&self) -> TermId {
        self.steps.last().map(|(_, s)| *s).unwrap_or(self.start)
    }

    pub fn labels(&self) -> Vec<TermId> {
        self.steps.iter().map(|(l, _)| *l).collect()
    }

    pub fn scopes(&self) -> Vec<TermId> {
        std::iter::once(self.start)
            .chain(self.steps.iter().map(|(_, s)| *s))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Would stepping to `scope` revisit a scope?
    pub fn contains(&self, scope: TermId) -> bool {
        self.start == scope || self.steps.iter().any(|(_, s)| *s == scope)
    }

    pub fn format(&self, terms: &TermStore) -> String {
        let mut out = format_term(self.start, terms);
        for (label, scope) in &self.steps {
            out.push_str(&format!(
                " -{}-> {}",
                format_term(*label, terms),
                format_term(*scope, terms)
            ));
        }
        out
    }
}

/// A resolved path with the datum found at its end.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolutionPath {
    pub path: ScopePath,
    pub relation: Option<TermId>,
    pub datum: TermId,
}

#[cfg(test)]
#[path = "tests/scopegraph.rs"]
mod tests;
