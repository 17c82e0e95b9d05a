//! Rule sets, relation declarations and scope extensions.

use crate::constraint::{Constraint, ConstraintKind};
use crate::subst::Subst;
use crate::term::{format_term, format_var, TermId, TermStore, TermVar};
use hashbrown::HashMap;
use im::OrdSet;

#[cfg(feature = "tracing")]
use crate::trace::debug;

/// A user rule `name(params) | guard :- body`.
///
/// Parameter variables are bound by matching. Guard and body variables
/// are renamed apart every time the rule is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub name: String,
    pub params: Vec<TermId>,
    pub guard_vars: Vec<TermVar>,
    pub guard: Constraint,
    pub body_vars: Vec<TermVar>,
    pub body: Constraint,
}

impl Rule {
    pub fn new(name: &str, params: Vec<TermId>, body: Constraint) -> Self {
        Rule {
            name: name.to_string(),
            params,
            guard_vars: Vec::new(),
            guard: Constraint::trivial(),
            body_vars: Vec::new(),
            body,
        }
    }

    /// An anonymous rule, used as a query predicate.
    pub fn lambda(params: Vec<TermId>, body: Constraint) -> Self {
        Self::new("", params, body)
    }

    pub fn with_guard(mut self, vars: Vec<TermVar>, guard: Constraint) -> Self {
        self.guard_vars = vars;
        self.guard = guard;
        self
    }

    pub fn with_body_vars(mut self, vars: Vec<TermVar>) -> Self {
        self.body_vars = vars;
        self
    }

    pub fn has_guard(&self) -> bool {
        !matches!(self.guard.kind, ConstraintKind::True)
    }

    /// Variables bound by the rule itself.
    pub fn bound_vars(&self, terms: &TermStore) -> OrdSet<TermVar> {
        let mut out: OrdSet<TermVar> = self.params.iter().flat_map(|p| terms.vars(*p)).collect();
        out.extend(self.guard_vars.iter().copied());
        out.extend(self.body_vars.iter().copied());
        out
    }

    /// Variables the rule captures from its context.
    pub fn free_vars(&self, terms: &TermStore) -> OrdSet<TermVar> {
        let bound = self.bound_vars(terms);
        let mut out = self.guard.free_vars(terms);
        out.extend(self.body.free_vars(terms));
        out.into_iter().filter(|v| !bound.contains(v)).collect()
    }

    /// Substitute captured variables; bound ones are left alone.
    pub fn apply(&self, subst: &Subst, terms: &TermStore) -> Rule {
        let inner = subst.without(self.bound_vars(terms).iter());
        Rule {
            name: self.name.clone(),
            params: self.params.clone(),
            guard_vars: self.guard_vars.clone(),
            guard: self.guard.apply(&inner, terms),
            body_vars: self.body_vars.clone(),
            body: self.body.apply(&inner, terms),
        }
    }

    pub fn format(&self, terms: &TermStore) -> String {
        let params: Vec<String> = self.params.iter().map(|p| format_term(*p, terms)).collect();
        let mut out = if self.name.is_empty() {
            format!("{{ {}", params.join(", "))
        } else {
            format!("{}({})", self.name, params.join(", "))
        };
        if self.has_guard() {
            let vars: Vec<String> = self
                .guard_vars
                .iter()
                .map(|v| format_var(*v, terms.symbols()))
                .collect();
            out.push_str(&format!(" | {{{}}} {}", vars.join(" "), self.guard.format(terms)));
        }
        out.push_str(" :- ");
        if !self.body_vars.is_empty() {
            let vars: Vec<String> = self
                .body_vars
                .iter()
                .map(|v| format_var(*v, terms.symbols()))
                .collect();
            out.push_str(&format!("{{{}}} ", vars.join(" ")));
        }
        out.push_str(&self.body.format(terms));
        if self.name.is_empty() {
            out.push_str(" }");
        } else {
            out.push('.');
        }
        out
    }
}

/// Arity of a relation. Data are tuples of `input_arity + output_arity`
/// terms; queries compare and filter on the input part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationType {
    pub input_arity: usize,
    pub output_arity: usize,
}

impl RelationType {
    pub fn arity(&self) -> usize {
        self.input_arity + self.output_arity
    }
}

#[derive(Debug, Clone, Default)]
pub struct Spec {
    rules: HashMap<String, Vec<Rule>>,
    relations: HashMap<TermId, RelationType>,
    labels: Vec<TermId>,
    scope_extensions: HashMap<String, Vec<(usize, TermId)>>,
}

impl Spec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.entry(rule.name.clone()).or_default().push(rule);
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.add_rule(rule);
        self
    }

    /// Rules for a constraint name, in declaration order.
    pub fn rules(&self, name: &str) -> &[Rule] {
        self.rules.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn add_relation(&mut self, relation: TermId, input_arity: usize, output_arity: usize) {
        self.relations.insert(
            relation,
            RelationType {
                input_arity,
                output_arity,
            },
        );
    }

    pub fn relation(&self, relation: TermId) -> Option<RelationType> {
        self.relations.get(&relation).copied()
    }

    /// Declare an edge label. Resolution only follows declared labels.
    pub fn add_label(&mut self, label: TermId) {
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
    }

    pub fn labels(&self) -> &[TermId] {
        &self.labels
    }

    /// `(argument index, label)` pairs a constraint of this name may
    /// extend.
    pub fn scope_extensions(&self, name: &str) -> &[(usize, TermId)] {
        self.scope_extensions
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns true if the extension was new.
    pub fn add_scope_extension(&mut self, name: &str, index: usize, label: TermId) -> bool {
        let entry = self.scope_extensions.entry(name.to_string()).or_default();
        if entry.contains(&(index, label)) {
            return false;
        }
        entry.push((index, label));
        true
    }

    /// Derive scope extensions from rule bodies.
    ///
    /// A parameter variable is extended with a label when the body tells an
    /// edge or relation on it, or passes it to a constraint that extends
    /// the corresponding argument. Iterates to a fixpoint.
    pub fn compute_scope_extensions(&mut self, terms: &TermStore) {
        loop {
            let mut found: Vec<(String, usize, TermId)> = Vec::new();
            for (name, rules) in &self.rules {
                for rule in rules {
                    for (index, param) in rule.params.iter().enumerate() {
                        let Some(var) = terms.is_var(*param) else {
                            continue;
                        };
                        for label in self.extended_labels(var, &rule.body, terms) {
                            found.push((name.clone(), index, label));
                        }
                    }
                }
            }
            let mut changed = false;
            for (name, index, label) in found {
                changed |= self.add_scope_extension(&name, index, label);
            }
            if !changed {
                break;
            }
        }
        #[cfg(feature = "tracing")]
        debug!(
            constraints = self.scope_extensions.len(),
            "scope_extensions_computed"
        );
    }

    fn extended_labels(&self, var: TermVar, body: &Constraint, terms: &TermStore) -> Vec<TermId> {
        let is_var = |term: &TermId| terms.is_var(*term) == Some(var);
        let mut out = Vec::new();
        let mut stack = vec![body];
        while let Some(c) = stack.pop() {
            match &c.kind {
                ConstraintKind::Conj(left, right) => {
                    stack.push(left);
                    stack.push(right);
                }
                ConstraintKind::Exists(vars, inner) => {
                    if !vars.contains(&var) {
                        stack.push(inner);
                    }
                }
                ConstraintKind::TellEdge { source, label, .. } if is_var(source) => {
                    out.push(*label)
                }
                ConstraintKind::TellRel {
                    scope, relation, ..
                } if is_var(scope) => out.push(*relation),
                ConstraintKind::User { name, args } => {
                    for (index, label) in self.scope_extensions(name) {
                        if args.get(*index).is_some_and(is_var) {
                            out.push(*label);
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "tests/spec.rs"]
mod tests;
