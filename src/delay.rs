//! Delay: the condition a stuck constraint waits for.

use crate::term::{format_term, format_var, TermId, TermStore, TermVar};
use im::OrdSet;

/// Variables that must be bound and `(scope, label)` edges that must
/// become complete before a constraint is retried.
///
/// An empty delay means the constraint is stuck without a known cause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delay {
    pub vars: OrdSet<TermVar>,
    pub critical_edges: OrdSet<(TermId, TermId)>,
}

impl Delay {
    pub fn of_vars<I: IntoIterator<Item = TermVar>>(vars: I) -> Self {
        Delay {
            vars: vars.into_iter().collect(),
            critical_edges: OrdSet::new(),
        }
    }

    pub fn of_var(var: TermVar) -> Self {
        Self::of_vars([var])
    }

    pub fn of_edge(scope: TermId, label: TermId) -> Self {
        Delay {
            vars: OrdSet::new(),
            critical_edges: OrdSet::unit((scope, label)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.critical_edges.is_empty()
    }

    pub fn merge(&mut self, other: Delay) {
        self.vars.extend(other.vars);
        self.critical_edges.extend(other.critical_edges);
    }

    /// Drop variables in `vars`, keeping edges.
    pub fn without_vars(&self, vars: &OrdSet<TermVar>) -> Delay {
        Delay {
            vars: self.vars.clone().relative_complement(vars.clone()),
            critical_edges: self.critical_edges.clone(),
        }
    }

    pub fn format(&self, terms: &TermStore) -> String {
        let mut parts: Vec<String> = self
            .vars
            .iter()
            .map(|v| format_var(*v, terms.symbols()))
            .collect();
        parts.extend(self.critical_edges.iter().map(|(scope, label)| {
            format!("{}-{}", format_term(*scope, terms), format_term(*label, terms))
        }));
        if parts.is_empty() {
            "stuck".to_string()
        } else {
            format!("waiting on {}", parts.join(", "))
        }
    }
}

#[cfg(test)]
#[path = "tests/delay.rs"]
mod tests;
