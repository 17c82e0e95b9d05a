//! Solver state: unifier, scope graph, fresh names and AST properties.
//!
//! States are values. A step clones the state it is given (cheap, every
//! field is persistent) and returns the modified copy.

use crate::scopegraph::ScopeGraph;
use crate::symbol::{base_of, FuncId, FRESH_SEPARATOR};
use crate::term::{Term, TermId, TermIndex, TermStore, TermVar};
use crate::unify::Unifier;
use im::{OrdMap, OrdSet};

/// Operator of fresh scope terms: `Scope("resource", "name")`.
pub const SCOPE_OP: &str = "Scope";
/// Operator of AST index terms: `TermIndex("resource", id)`.
pub const TERM_INDEX_OP: &str = "TermIndex";

#[derive(Debug, Clone)]
pub struct State {
    resource: String,
    unifier: Unifier,
    scope_graph: ScopeGraph,
    next_fresh: u64,
    vars: OrdSet<TermVar>,
    scopes: OrdSet<TermId>,
    properties: OrdMap<(TermIndex, FuncId), TermId>,
}

impl State {
    pub fn new(resource: &str) -> Self {
        Self::with_unifier(resource, Unifier::default())
    }

    pub fn with_unifier(resource: &str, unifier: Unifier) -> Self {
        State {
            resource: resource.to_string(),
            unifier,
            scope_graph: ScopeGraph::new(),
            next_fresh: 0,
            vars: OrdSet::new(),
            scopes: OrdSet::new(),
            properties: OrdMap::new(),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn unifier(&self) -> &Unifier {
        &self.unifier
    }

    pub fn set_unifier(&mut self, unifier: Unifier) {
        self.unifier = unifier;
    }

    pub fn scope_graph(&self) -> &ScopeGraph {
        &self.scope_graph
    }

    pub fn scope_graph_mut(&mut self) -> &mut ScopeGraph {
        &mut self.scope_graph
    }

    /// Variables created by this state.
    pub fn vars(&self) -> &OrdSet<TermVar> {
        &self.vars
    }

    /// Scopes created by this state.
    pub fn scopes(&self) -> &OrdSet<TermId> {
        &self.scopes
    }

    fn fresh_name(&mut self, base: &str) -> String {
        let n = self.next_fresh;
        self.next_fresh += 1;
        format!("{}{}{}", base_of(base), FRESH_SEPARATOR, n)
    }

    /// A variable no other part of the state mentions.
    pub fn fresh_var(&mut self, base: &str, terms: &TermStore) -> TermVar {
        let name = self.fresh_name(base);
        let var = terms.make_var(&self.resource, &name);
        self.vars.insert(var);
        var
    }

    /// Fresh variables renaming `vars`, one each.
    pub fn freshen(&mut self, vars: &[TermVar], terms: &TermStore) -> Vec<(TermVar, TermVar)> {
        vars.iter()
            .map(|var| {
                let base = terms.symbols().base_name(var.name).to_string();
                (*var, self.fresh_var(&base, terms))
            })
            .collect()
    }

    pub fn fresh_scope(&mut self, base: &str, terms: &TermStore) -> TermId {
        let name = self.fresh_name(base);
        let scope = terms.appl2(SCOPE_OP, terms.string(&self.resource), terms.string(&name));
        self.scopes.insert(scope);
        self.scope_graph.add_scope(scope);
        scope
    }

    pub fn property(&self, index: TermIndex, property: FuncId) -> Option<TermId> {
        self.properties.get(&(index, property)).copied()
    }

    /// Returns false, leaving the state unchanged, if the property is
    /// already set.
    pub fn set_property(&mut self, index: TermIndex, property: FuncId, value: TermId) -> bool {
        if self.properties.contains_key(&(index, property)) {
            return false;
        }
        self.properties.insert((index, property), value);
        true
    }

    pub fn properties(&self) -> impl Iterator<Item = (TermIndex, FuncId, TermId)> + '_ {
        self.properties.iter().map(|((i, p), v)| (*i, *p, *v))
    }
}

/// The term form of an AST index.
pub fn index_term(index: TermIndex, terms: &TermStore) -> TermId {
    terms.appl2(
        TERM_INDEX_OP,
        terms.string(terms.symbols().name(index.resource)),
        terms.int(i64::from(index.id)),
    )
}

/// Read back a ground `TermIndex("resource", id)` term.
pub fn parse_index_term(term: TermId, terms: &TermStore) -> Option<TermIndex> {
    let (op, args) = terms.is_appl(term)?;
    if terms.symbols().name(op) != TERM_INDEX_OP || args.len() != 2 {
        return None;
    }
    let resource = terms.intern_symbol(terms.as_str(args[0])?);
    let id = match terms.resolve(args[1])? {
        Term::Int(id) => u32::try_from(id).ok()?,
        _ => return None,
    };
    Some(TermIndex { resource, id })
}

#[cfg(test)]
#[path = "tests/state.rs"]
mod tests;
