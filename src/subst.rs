use crate::term::{Term, TermId, TermStore, TermVar};
use im::OrdMap;
use smallvec::SmallVec;

/// A simultaneous substitution from variables to terms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Subst {
    bindings: OrdMap<TermVar, TermId>,
}

impl Subst {
    pub fn new() -> Self {
        Self {
            bindings: OrdMap::new(),
        }
    }

    /// Bind a variable to a term, replacing any previous binding.
    pub fn bind(&mut self, var: TermVar, term: TermId) {
        self.bindings.insert(var, term);
    }

    pub fn get(&self, var: TermVar) -> Option<TermId> {
        self.bindings.get(&var).copied()
    }

    pub fn is_bound(&self, var: TermVar) -> bool {
        self.bindings.contains_key(&var)
    }

    pub fn remove(&mut self, var: TermVar) -> Option<TermId> {
        self.bindings.remove(&var)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TermVar, TermId)> + '_ {
        self.bindings.iter().map(|(var, term)| (*var, *term))
    }

    pub fn domain(&self) -> impl Iterator<Item = TermVar> + '_ {
        self.bindings.keys().copied()
    }

    /// The substitution without bindings for the given variables.
    /// Used when entering a binder that shadows them.
    pub fn without<'a, I: IntoIterator<Item = &'a TermVar>>(&self, vars: I) -> Subst {
        let mut bindings = self.bindings.clone();
        for var in vars {
            bindings.remove(var);
        }
        Subst { bindings }
    }

    /// Extend with `var -> term`, rewriting existing ranges so the result
    /// stays idempotent.
    pub fn compose(&mut self, var: TermVar, term: TermId, terms: &TermStore) {
        let term = apply_subst(term, self, terms);
        let mut single = Subst::new();
        single.bind(var, term);
        let updated: OrdMap<TermVar, TermId> = self
            .bindings
            .iter()
            .map(|(k, v)| (*k, apply_subst(*v, &single, terms)))
            .collect();
        self.bindings = updated;
        self.bindings.insert(var, term);
    }

    pub fn apply(&self, term: TermId, terms: &TermStore) -> TermId {
        apply_subst(term, self, terms)
    }
}

impl FromIterator<(TermVar, TermId)> for Subst {
    fn from_iter<I: IntoIterator<Item = (TermVar, TermId)>>(iter: I) -> Self {
        Self {
            bindings: iter.into_iter().collect(),
        }
    }
}

/// Apply a substitution to a term, returning a new term.
/// Bound variables are replaced once (no chain following); unbound variables stay.
/// Subterms without substituted variables keep their TermId, including attachments.
///
/// Uses explicit stack to avoid recursion.
pub fn apply_subst(term: TermId, subst: &Subst, terms: &TermStore) -> TermId {
    if subst.is_empty() {
        return term;
    }

    // (term, children_done)
    let mut work_stack: Vec<(TermId, bool)> = vec![(term, false)];
    let mut result_stack: Vec<TermId> = Vec::new();

    while let Some((tid, children_done)) = work_stack.pop() {
        if children_done {
            let children = terms.children(tid);
            let n = children.len();
            let new_children: SmallVec<[TermId; 4]> =
                result_stack.drain(result_stack.len() - n..).collect();
            if new_children == children {
                result_stack.push(tid);
            } else {
                result_stack.push(terms.rebuild(tid, &new_children));
            }
            continue;
        }

        match terms.resolve(tid) {
            Some(Term::Var(var)) => result_stack.push(subst.get(var).unwrap_or(tid)),
            Some(Term::Appl(_, _)) | Some(Term::Cons(_, _)) => {
                let children = terms.children(tid);
                if children.is_empty() {
                    result_stack.push(tid);
                } else {
                    work_stack.push((tid, true));
                    for child in children.iter().rev() {
                        work_stack.push((*child, false));
                    }
                }
            }
            _ => result_stack.push(tid),
        }
    }

    result_stack.pop().unwrap_or(term)
}

#[cfg(test)]
#[path = "tests/subst.rs"]
mod tests;
