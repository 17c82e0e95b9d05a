//! Persistent unifier with disequalities.
//!
//! A [`Unifier`] is an immutable value: every operation returns a new
//! unifier and leaves the receiver untouched. Internally it is a union-find
//! over [`TermVar`]s (`reps` + `ranks`), a binding per class representative
//! (`terms`), and a set of reduced disequalities.
//!
//! Path compression in [`Unifier::find_rep`] rewrites the `reps` cache in
//! place. Compression never changes which representative a variable resolves
//! to, so it is invisible to callers. The cache lives in a `RefCell`, which
//! makes a unifier `!Sync`; parallel users must clone their own copy.

use crate::subst::Subst;
use crate::term::{format_term, format_var, Term, TermId, TermStore, TermVar};
use hashbrown::{HashMap, HashSet};
use im::{OrdMap, OrdSet};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use thiserror::Error;

#[cfg(feature = "tracing")]
use crate::trace::{debug_span, trace};

/// Unification produced cyclic terms in finite mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("occurs check failed on {} variable(s)", .vars.len())]
pub struct OccursError {
    /// Every variable that became cyclic, not just the first one found.
    pub vars: Vec<TermVar>,
}

/// A reduced negative constraint: `forall universals. not(all equalities hold)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Diseq {
    pub universals: OrdSet<TermVar>,
    pub equalities: OrdMap<TermVar, TermId>,
}

impl Diseq {
    /// The equalities as term pairs, ready to be re-unified.
    pub fn pairs(&self, terms: &TermStore) -> Vec<(TermId, TermId)> {
        self.equalities
            .iter()
            .map(|(var, term)| (terms.var_term(*var), *term))
            .collect()
    }

    /// Build a disequality from the diff of an attempted unification.
    /// Returns None when nothing remains after dropping the universals,
    /// i.e. the terms are equal for every choice of the universals.
    fn from_diff(universals: &OrdSet<TermVar>, diff: &Unifier, terms: &TermStore) -> Option<Diseq> {
        let reduced = diff.remove_all(universals.iter().copied(), terms).unifier;
        if reduced.is_empty() {
            return None;
        }
        let free = reduced.free_var_set(terms);
        Some(Diseq {
            universals: universals.clone().intersection(free),
            equalities: reduced.equality_map(terms),
        })
    }
}

/// Result of a successful unification.
#[derive(Debug, Clone)]
pub struct UnifyResult {
    /// Only the bindings introduced by this call.
    pub diff: Unifier,
    /// The updated unifier.
    pub unifier: Unifier,
}

/// Result of a disunification that did not find the terms equal.
#[derive(Debug, Clone)]
pub struct DisunifyResult {
    /// The stored disequality, or None when the terms are already distinct.
    pub residual: Option<Diseq>,
    pub unifier: Unifier,
}

/// Result of removing variables from a unifier.
#[derive(Debug, Clone)]
pub struct RemoveResult {
    pub unifier: Unifier,
    /// Rewrites terms mentioning removed variables.
    pub subst: Subst,
}

#[derive(Debug, Clone)]
pub struct Unifier {
    finite: bool,
    reps: RefCell<OrdMap<TermVar, TermVar>>,
    ranks: OrdMap<TermVar, usize>,
    terms: OrdMap<TermVar, TermId>,
    diseqs: OrdSet<Diseq>,
}

impl Default for Unifier {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Follow parent pointers to the root, compressing the path on the way.
fn find_rep_in(reps: &mut OrdMap<TermVar, TermVar>, var: TermVar) -> TermVar {
    let mut path: SmallVec<[TermVar; 8]> = SmallVec::new();
    let mut current = var;
    while let Some(&parent) = reps.get(&current) {
        path.push(current);
        current = parent;
    }
    if path.len() > 1 {
        for v in &path[..path.len() - 1] {
            reps.insert(*v, current);
        }
    }
    current
}

/// Mutable working copy used while a single operation runs.
struct Transient {
    finite: bool,
    reps: OrdMap<TermVar, TermVar>,
    ranks: OrdMap<TermVar, usize>,
    terms: OrdMap<TermVar, TermId>,
    diseqs: OrdSet<Diseq>,
}

impl Transient {
    fn empty(finite: bool) -> Self {
        Transient {
            finite,
            reps: OrdMap::new(),
            ranks: OrdMap::new(),
            terms: OrdMap::new(),
            diseqs: OrdSet::new(),
        }
    }

    fn freeze(self) -> Unifier {
        Unifier {
            finite: self.finite,
            reps: RefCell::new(self.reps),
            ranks: self.ranks,
            terms: self.terms,
            diseqs: self.diseqs,
        }
    }

    fn find_rep(&mut self, var: TermVar) -> TermVar {
        find_rep_in(&mut self.reps, var)
    }

    /// Variables whose parent pointer is exactly `var`.
    fn inv_reps(&self, var: TermVar) -> Vec<TermVar> {
        self.reps
            .iter()
            .filter(|(_, parent)| **parent == var)
            .map(|(child, _)| *child)
            .collect()
    }

    /// Process one pair. Returns false on a definite clash.
    fn step(
        &mut self,
        left: TermId,
        right: TermId,
        terms: &TermStore,
        worklist: &mut SmallVec<[(TermId, TermId); 32]>,
        changed: &mut OrdSet<TermVar>,
    ) -> bool {
        if left == right {
            return true;
        }
        match (terms.resolve(left), terms.resolve(right)) {
            (Some(Term::Var(l)), Some(Term::Var(r))) => {
                self.unify_vars(l, r, worklist, changed);
                true
            }
            (Some(Term::Var(var)), Some(_)) => {
                self.unify_var_term(var, right, worklist, changed);
                true
            }
            (Some(_), Some(Term::Var(var))) => {
                self.unify_var_term(var, left, worklist, changed);
                true
            }
            (Some(Term::Appl(f, xs)), Some(Term::Appl(g, ys))) => {
                if f != g || xs.len() != ys.len() {
                    #[cfg(feature = "tracing")]
                    trace!(?left, ?right, "unify_operator_mismatch");
                    return false;
                }
                worklist.extend(xs.into_iter().zip(ys));
                true
            }
            (Some(Term::Cons(h1, t1)), Some(Term::Cons(h2, t2))) => {
                worklist.push((t1, t2));
                worklist.push((h1, h2));
                true
            }
            (Some(Term::Nil), Some(Term::Nil)) => true,
            (Some(Term::Str(a)), Some(Term::Str(b))) => a == b,
            (Some(Term::Int(a)), Some(Term::Int(b))) => a == b,
            (Some(Term::Blob(a)), Some(Term::Blob(b))) => a == b,
            _ => {
                #[cfg(feature = "tracing")]
                trace!(?left, ?right, "unify_constructor_mismatch");
                false
            }
        }
    }

    fn unify_vars(
        &mut self,
        left: TermVar,
        right: TermVar,
        worklist: &mut SmallVec<[(TermId, TermId); 32]>,
        changed: &mut OrdSet<TermVar>,
    ) {
        let left_rep = self.find_rep(left);
        let right_rep = self.find_rep(right);
        if left_rep == right_rep {
            return;
        }
        let left_rank = self.ranks.remove(&left_rep).unwrap_or(1);
        let right_rank = self.ranks.remove(&right_rep).unwrap_or(1);
        // Ties keep the left root.
        let (rep, var) = if left_rank >= right_rank {
            (left_rep, right_rep)
        } else {
            (right_rep, left_rep)
        };
        self.ranks.insert(rep, left_rank + right_rank);
        self.reps.insert(var, rep);
        match self.terms.remove(&var) {
            Some(var_term) => match self.terms.get(&rep) {
                Some(&rep_term) => worklist.push((var_term, rep_term)),
                None => {
                    self.terms.insert(rep, var_term);
                    changed.insert(rep);
                }
            },
            None => {
                changed.insert(var);
            }
        }
    }

    fn unify_var_term(
        &mut self,
        var: TermVar,
        term: TermId,
        worklist: &mut SmallVec<[(TermId, TermId); 32]>,
        changed: &mut OrdSet<TermVar>,
    ) {
        let rep = self.find_rep(var);
        match self.terms.get(&rep) {
            Some(&rep_term) => worklist.push((rep_term, term)),
            None => {
                self.terms.insert(rep, term);
                changed.insert(rep);
            }
        }
    }
}

impl Unifier {
    /// An empty unifier. `finite` selects acyclic terms with an occurs check;
    /// otherwise rational (cyclic) terms are allowed.
    pub fn new(finite: bool) -> Self {
        Transient::empty(finite).freeze()
    }

    fn melt(&self) -> Transient {
        Transient {
            finite: self.finite,
            reps: self.reps.borrow().clone(),
            ranks: self.ranks.clone(),
            terms: self.terms.clone(),
            diseqs: self.diseqs.clone(),
        }
    }

    fn reps_snapshot(&self) -> OrdMap<TermVar, TermVar> {
        self.reps.borrow().clone()
    }

    pub fn is_finite(&self) -> bool {
        self.finite
    }

    // ========== QUERIES ==========

    /// Representative of the variable's class. Idempotent.
    pub fn find_rep(&self, var: TermVar) -> TermVar {
        let mut reps = self.reps.borrow_mut();
        find_rep_in(&mut reps, var)
    }

    /// Shallow resolution: a variable becomes its class binding or its
    /// representative; other terms are returned unchanged.
    pub fn find(&self, term: TermId, terms: &TermStore) -> TermId {
        match terms.resolve(term) {
            Some(Term::Var(var)) => {
                let rep = self.find_rep(var);
                match self.terms.get(&rep) {
                    Some(&bound) => bound,
                    None => terms.var_term(rep),
                }
            }
            _ => term,
        }
    }

    /// The term bound to the variable's class, if any.
    pub fn find_term(&self, var: TermVar) -> Option<TermId> {
        let rep = self.find_rep(var);
        self.terms.get(&rep).copied()
    }

    /// Fully instantiate a term. Free variables become their representatives.
    /// Cyclic references (rational mode) are left as variables.
    pub fn find_recursive(&self, term: TermId, terms: &TermStore) -> TermId {
        enum Work {
            Visit(TermId),
            Build(TermId),
            Leave,
        }

        let mut work = vec![Work::Visit(term)];
        let mut results: Vec<TermId> = Vec::new();
        let mut active: Vec<TermVar> = Vec::new();

        while let Some(item) = work.pop() {
            match item {
                Work::Visit(t) => match terms.resolve(t) {
                    Some(Term::Var(var)) => {
                        let rep = self.find_rep(var);
                        match self.terms.get(&rep) {
                            Some(&bound) if !active.contains(&rep) => {
                                active.push(rep);
                                work.push(Work::Leave);
                                work.push(Work::Visit(bound));
                            }
                            _ => results.push(terms.var_term(rep)),
                        }
                    }
                    Some(Term::Appl(_, _)) | Some(Term::Cons(_, _)) => {
                        let children = terms.children(t);
                        if children.is_empty() {
                            results.push(t);
                        } else {
                            work.push(Work::Build(t));
                            for child in children.iter().rev() {
                                work.push(Work::Visit(*child));
                            }
                        }
                    }
                    _ => results.push(t),
                },
                Work::Build(t) => {
                    let children = terms.children(t);
                    let n = children.len();
                    let rebuilt: SmallVec<[TermId; 4]> =
                        results.drain(results.len() - n..).collect();
                    if rebuilt == children {
                        results.push(t);
                    } else {
                        results.push(terms.rebuild(t, &rebuilt));
                    }
                }
                Work::Leave => {
                    active.pop();
                }
            }
        }

        results.pop().unwrap_or(term)
    }

    /// Free representative variables reachable from the term.
    pub fn free_vars(&self, term: TermId, terms: &TermStore) -> OrdSet<TermVar> {
        let mut out = OrdSet::new();
        let mut seen: HashSet<TermVar> = HashSet::new();
        let mut stack = terms.vars(term);
        while let Some(var) = stack.pop() {
            let rep = self.find_rep(var);
            if !seen.insert(rep) {
                continue;
            }
            match self.terms.get(&rep) {
                Some(&bound) => stack.extend(terms.vars(bound)),
                None => {
                    out.insert(rep);
                }
            }
        }
        out
    }

    pub fn is_ground(&self, term: TermId, terms: &TermStore) -> bool {
        self.free_vars(term, terms).is_empty()
    }

    /// True if any variable of the term is part of a cycle.
    pub fn is_cyclic(&self, term: TermId, terms: &TermStore) -> bool {
        terms
            .vars(term)
            .into_iter()
            .any(|var| self.is_cyclic_var(var, terms))
    }

    fn is_cyclic_var(&self, var: TermVar, terms: &TermStore) -> bool {
        enum Frame {
            Enter(TermVar),
            Exit(TermVar),
        }

        // false = on the current path, true = finished
        let mut marks: HashMap<TermVar, bool> = HashMap::new();
        let mut stack = vec![Frame::Enter(self.find_rep(var))];
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Exit(rep) => {
                    marks.insert(rep, true);
                }
                Frame::Enter(rep) => match marks.get(&rep) {
                    Some(false) => return true,
                    Some(true) => {}
                    None => {
                        marks.insert(rep, false);
                        stack.push(Frame::Exit(rep));
                        if let Some(&bound) = self.terms.get(&rep) {
                            for inner in terms.vars(bound) {
                                stack.push(Frame::Enter(self.find_rep(inner)));
                            }
                        }
                    }
                },
            }
        }
        false
    }

    /// Some(true) if the terms are equal under this unifier, Some(false) if
    /// they can never be, None if that depends on future bindings.
    pub fn are_equal(&self, left: TermId, right: TermId, terms: &TermStore) -> Option<bool> {
        match self.unify_pairs(vec![(left, right)], terms, true) {
            Ok(Some(result)) if result.diff.is_empty() => Some(true),
            Ok(Some(_)) => None,
            _ => Some(false),
        }
    }

    pub fn are_unequal(&self, left: TermId, right: TermId, terms: &TermStore) -> bool {
        self.are_equal(left, right, terms) == Some(false)
    }

    /// The bindings unifying the two terms would add, without committing them.
    pub fn diff(&self, left: TermId, right: TermId, terms: &TermStore) -> Option<Unifier> {
        match self.unify_pairs(vec![(left, right)], terms, true) {
            Ok(Some(result)) => Some(result.diff),
            _ => None,
        }
    }

    /// Variables with a parent pointer or a binding.
    pub fn domain(&self) -> OrdSet<TermVar> {
        let mut out: OrdSet<TermVar> = self.reps.borrow().keys().copied().collect();
        out.extend(self.terms.keys().copied());
        out
    }

    /// Every variable the unifier mentions, including free variables
    /// occurring in bindings.
    pub fn var_set(&self, terms: &TermStore) -> OrdSet<TermVar> {
        let mut out = self.domain();
        out.extend(self.reps.borrow().values().copied());
        for bound in self.terms.values() {
            out.extend(terms.vars(*bound));
        }
        out
    }

    /// Free class representatives among the variables the unifier mentions.
    pub fn free_var_set(&self, terms: &TermStore) -> OrdSet<TermVar> {
        self.var_set(terms)
            .into_iter()
            .map(|var| self.find_rep(var))
            .filter(|rep| !self.terms.contains_key(rep))
            .collect()
    }

    pub fn size(&self) -> usize {
        self.domain().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reps.borrow().is_empty() && self.terms.is_empty()
    }

    pub fn disequalities(&self) -> &OrdSet<Diseq> {
        &self.diseqs
    }

    /// All equalities as `var -> term`: class members map to their
    /// representative, representatives to their binding.
    pub fn equality_map(&self, terms: &TermStore) -> OrdMap<TermVar, TermId> {
        let mut out = OrdMap::new();
        for var in self.reps_snapshot().keys() {
            out.insert(*var, terms.var_term(self.find_rep(*var)));
        }
        for (var, bound) in self.terms.iter() {
            out.insert(*var, *bound);
        }
        out
    }

    // ========== UNIFICATION ==========

    /// Unify two terms.
    ///
    /// `Ok(None)` means the terms clash or the result violates a stored
    /// disequality. `Err` reports cyclic variables in finite mode.
    pub fn unify(
        &self,
        left: TermId,
        right: TermId,
        terms: &TermStore,
    ) -> Result<Option<UnifyResult>, OccursError> {
        self.unify_pairs(vec![(left, right)], terms, true)
    }

    /// Unify every pair in one atomic step.
    pub fn unify_all<I: IntoIterator<Item = (TermId, TermId)>>(
        &self,
        pairs: I,
        terms: &TermStore,
    ) -> Result<Option<UnifyResult>, OccursError> {
        self.unify_pairs(pairs.into_iter().collect(), terms, true)
    }

    /// Add every equality and disequality of another unifier.
    pub fn unify_unifier(
        &self,
        other: &Unifier,
        terms: &TermStore,
    ) -> Result<Option<UnifyResult>, OccursError> {
        let pairs: Vec<(TermId, TermId)> = other
            .equality_map(terms)
            .iter()
            .map(|(var, term)| (terms.var_term(*var), *term))
            .collect();
        let mut result = match self.unify_pairs(pairs, terms, true)? {
            Some(result) => result,
            None => return Ok(None),
        };
        for diseq in other.diseqs.iter() {
            match result
                .unifier
                .disunify_pairs(&diseq.universals, diseq.pairs(terms), terms)
            {
                Some(disunified) => result.unifier = disunified.unifier,
                None => return Ok(None),
            }
        }
        Ok(Some(result))
    }

    fn unify_pairs(
        &self,
        pairs: Vec<(TermId, TermId)>,
        terms: &TermStore,
        check_diseqs: bool,
    ) -> Result<Option<UnifyResult>, OccursError> {
        #[cfg(feature = "tracing")]
        let _span = debug_span!("unify", pairs = pairs.len()).entered();

        let mut state = self.melt();
        let mut worklist: SmallVec<[(TermId, TermId); 32]> = pairs.into_iter().collect();
        let mut changed: OrdSet<TermVar> = OrdSet::new();

        while let Some((left, right)) = worklist.pop() {
            if !state.step(left, right, terms, &mut worklist, &mut changed) {
                return Ok(None);
            }
        }

        let unifier = state.freeze();
        if unifier.finite {
            let cyclic: Vec<TermVar> = changed
                .iter()
                .copied()
                .filter(|var| unifier.is_cyclic_var(*var, terms))
                .collect();
            if !cyclic.is_empty() {
                #[cfg(feature = "tracing")]
                trace!(count = cyclic.len(), "unify_occurs_check_failed");
                return Err(OccursError { vars: cyclic });
            }
        }

        let diff = unifier.diff_unifier(&changed);
        if !check_diseqs || diff.is_empty() {
            return Ok(Some(UnifyResult { diff, unifier }));
        }
        match unifier.disunify_all(terms) {
            Some(unifier) => Ok(Some(UnifyResult { diff, unifier })),
            None => {
                #[cfg(feature = "tracing")]
                trace!("unify_violates_disequality");
                Ok(None)
            }
        }
    }

    fn diff_unifier(&self, changed: &OrdSet<TermVar>) -> Unifier {
        let mut diff = Transient::empty(self.finite);
        for var in changed.iter().copied() {
            let rep = self.find_rep(var);
            if rep != var {
                diff.reps.insert(var, rep);
            } else if let Some(&bound) = self.terms.get(&var) {
                diff.terms.insert(var, bound);
            }
        }
        diff.freeze()
    }

    // ========== DISUNIFICATION ==========

    /// Assert that two terms are different for every choice of `universals`.
    ///
    /// Returns None if the terms are already equal (the assertion is
    /// violated). Otherwise returns the new unifier, with the residual
    /// disequality if it is not yet decided.
    pub fn disunify(
        &self,
        universals: &OrdSet<TermVar>,
        left: TermId,
        right: TermId,
        terms: &TermStore,
    ) -> Option<DisunifyResult> {
        self.disunify_pairs(universals, vec![(left, right)], terms)
    }

    fn disunify_pairs(
        &self,
        universals: &OrdSet<TermVar>,
        pairs: Vec<(TermId, TermId)>,
        terms: &TermStore,
    ) -> Option<DisunifyResult> {
        let diff = match self.unify_pairs(pairs, terms, false) {
            Ok(Some(result)) => result.diff,
            // Clash or cycle: the terms can never be equal.
            _ => {
                return Some(DisunifyResult {
                    residual: None,
                    unifier: self.clone(),
                })
            }
        };
        let diseq = Diseq::from_diff(universals, &diff, terms)?;
        let mut unifier = self.clone();
        unifier.diseqs.insert(diseq.clone());
        Some(DisunifyResult {
            residual: Some(diseq),
            unifier,
        })
    }

    /// Re-check every stored disequality. Discharged ones are dropped,
    /// the others are kept in reduced form. None if any became violated.
    fn disunify_all(&self, terms: &TermStore) -> Option<Unifier> {
        let mut kept = OrdSet::new();
        for diseq in self.diseqs.iter() {
            if let Ok(Some(result)) = self.unify_pairs(diseq.pairs(terms), terms, false) {
                kept.insert(Diseq::from_diff(&diseq.universals, &result.diff, terms)?);
            }
        }
        Some(Unifier {
            diseqs: kept,
            ..self.clone()
        })
    }

    // ========== REMOVAL ==========

    /// Remove variables from the unifier, keeping every equality between
    /// the remaining variables.
    pub fn remove_all<I: IntoIterator<Item = TermVar>>(
        &self,
        vars: I,
        terms: &TermStore,
    ) -> RemoveResult {
        let vars: OrdSet<TermVar> = vars.into_iter().collect();
        let mut state = self.melt();
        let mut subst = Subst::new();

        for var in vars.iter().copied() {
            if let Some(rep) = state.reps.remove(&var) {
                subst.compose(var, terms.var_term(rep), terms);
                for child in state.inv_reps(var) {
                    state.reps.insert(child, rep);
                }
                state.ranks.remove(&var);
                continue;
            }
            let children = state.inv_reps(var);
            // Highest rank becomes the new root; ties go to the smallest variable.
            let new_rep = children.iter().copied().max_by_key(|child| {
                let rank = state.ranks.get(child).copied().unwrap_or(1);
                (rank, Reverse(*child))
            });
            if let Some(rep) = new_rep {
                state.reps.remove(&rep);
                subst.compose(var, terms.var_term(rep), terms);
                for child in children.iter().copied().filter(|child| *child != rep) {
                    state.reps.insert(child, rep);
                }
                let rank = state.ranks.remove(&var).unwrap_or(1);
                state.ranks.insert(rep, rank);
                if let Some(bound) = state.terms.remove(&var) {
                    state.terms.insert(rep, bound);
                }
            } else if let Some(bound) = state.terms.remove(&var) {
                subst.compose(var, bound, terms);
                state.ranks.remove(&var);
            }
        }

        if !subst.is_empty() {
            state.terms = state
                .terms
                .iter()
                .map(|(var, bound)| (*var, subst.apply(*bound, terms)))
                .collect();
        }

        let diseqs = std::mem::take(&mut state.diseqs);
        let base = state.freeze();
        let mut kept = OrdSet::new();
        for diseq in diseqs.iter() {
            // Mentions a variable that is gone entirely: satisfiable by choosing it.
            let dangling = diseq.equalities.iter().any(|(var, term)| {
                let removed = |v: &TermVar| {
                    vars.contains(v) && !subst.is_bound(*v) && !diseq.universals.contains(v)
                };
                removed(var) || terms.vars(*term).iter().any(removed)
            });
            if dangling {
                continue;
            }
            let pairs: Vec<(TermId, TermId)> = diseq
                .pairs(terms)
                .into_iter()
                .map(|(l, r)| (subst.apply(l, terms), subst.apply(r, terms)))
                .collect();
            if let Ok(Some(result)) = base.unify_pairs(pairs, terms, false) {
                if let Some(reduced) = Diseq::from_diff(&diseq.universals, &result.diff, terms) {
                    kept.insert(reduced);
                }
            }
        }

        RemoveResult {
            unifier: Unifier {
                diseqs: kept,
                ..base
            },
            subst,
        }
    }

    /// Keep only the given variables; everything else the unifier mentions
    /// is removed.
    pub fn retain_all<I: IntoIterator<Item = TermVar>>(
        &self,
        vars: I,
        terms: &TermStore,
    ) -> RemoveResult {
        let keep: OrdSet<TermVar> = vars.into_iter().collect();
        let remove = self.var_set(terms).relative_complement(keep);
        self.remove_all(remove, terms)
    }

    // ========== COMPARISON ==========

    /// Semantic equality: same classes, same bindings, same disequalities.
    /// Representative choice does not matter.
    pub fn equivalent(&self, other: &Unifier, terms: &TermStore) -> bool {
        let vars = self.var_set(terms).union(other.var_set(terms));
        self.canonical(&vars, terms) == other.canonical(&vars, terms)
    }

    fn canonical(&self, vars: &OrdSet<TermVar>, terms: &TermStore) -> CanonicalForm {
        let mut class_min: OrdMap<TermVar, TermVar> = OrdMap::new();
        for var in vars.iter().copied() {
            let rep = self.find_rep(var);
            if !class_min.contains_key(&rep) {
                class_min.insert(rep, var);
            }
        }
        let rename: Subst = class_min
            .iter()
            .map(|(rep, min)| (*rep, terms.var_term(*min)))
            .collect();
        let canon = |term: TermId| rename.apply(self.find_recursive(term, terms), terms);

        let classes: Vec<(TermVar, TermVar, Option<TermId>)> = vars
            .iter()
            .copied()
            .map(|var| {
                let rep = self.find_rep(var);
                let min = class_min.get(&rep).copied().unwrap_or(rep);
                let bound = self.terms.get(&rep).map(|bound| canon(*bound));
                (var, min, bound)
            })
            .collect();

        let diseqs: BTreeSet<CanonicalDiseq> = self
            .diseqs
            .iter()
            .map(|diseq| {
                let pairs: BTreeSet<(TermId, TermId)> = diseq
                    .pairs(terms)
                    .into_iter()
                    .map(|(l, r)| {
                        let (l, r) = (canon(l), canon(r));
                        if l <= r {
                            (l, r)
                        } else {
                            (r, l)
                        }
                    })
                    .collect();
                (diseq.universals.iter().copied().collect(), pairs)
            })
            .collect();

        CanonicalForm { classes, diseqs }
    }

    /// Human-readable rendering for diagnostics and logs.
    pub fn format(&self, terms: &TermStore) -> String {
        let symbols = terms.symbols();
        let mut parts: Vec<String> = Vec::new();
        for (var, parent) in self.reps_snapshot().iter() {
            parts.push(format!(
                "{} == {}",
                format_var(*var, symbols),
                format_var(*parent, symbols)
            ));
        }
        for (var, bound) in self.terms.iter() {
            parts.push(format!(
                "{} |-> {}",
                format_var(*var, symbols),
                format_term(*bound, terms)
            ));
        }
        for diseq in self.diseqs.iter() {
            let equalities: Vec<String> = diseq
                .equalities
                .iter()
                .map(|(var, term)| {
                    format!("{} == {}", format_var(*var, symbols), format_term(*term, terms))
                })
                .collect();
            let universals: Vec<String> = diseq
                .universals
                .iter()
                .map(|var| format_var(*var, symbols))
                .collect();
            if universals.is_empty() {
                parts.push(format!("not({})", equalities.join(" & ")));
            } else {
                parts.push(format!(
                    "forall {}. not({})",
                    universals.join(" "),
                    equalities.join(" & ")
                ));
            }
        }
        format!("{{{}}}", parts.join(", "))
    }
}

type CanonicalDiseq = (BTreeSet<TermVar>, BTreeSet<(TermId, TermId)>);

#[derive(PartialEq, Eq)]
struct CanonicalForm {
    classes: Vec<(TermVar, TermVar, Option<TermId>)>,
    diseqs: BTreeSet<CanonicalDiseq>,
}
