//! Active queue and delayed-constraint index of one fixpoint run.
//!
//! Delayed constraints are indexed by every variable and critical edge
//! they wait on. Activation through one key leaves stale ids under the
//! other keys; those are skipped when their key fires.

use crate::completeness::Completeness;
use crate::constraint::Constraint;
use crate::delay::Delay;
use crate::term::{TermId, TermStore, TermVar};
use crate::unify::Unifier;
use hashbrown::HashMap;
use std::collections::VecDeque;

#[cfg(feature = "tracing")]
use crate::trace::trace;

#[derive(Debug, Default)]
pub(crate) struct ConstraintStore {
    active: VecDeque<Constraint>,
    delayed: HashMap<u64, (Constraint, Delay)>,
    on_var: HashMap<TermVar, Vec<u64>>,
    on_edge: HashMap<(TermId, TermId), Vec<u64>>,
    /// Delayed without a known cause; retried after any progress.
    stuck: Vec<(Constraint, Delay)>,
    next_id: u64,
    progress: bool,
}

impl ConstraintStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, constraint: Constraint) {
        self.active.push_back(constraint);
    }

    pub(crate) fn push_front(&mut self, constraint: Constraint) {
        self.active.push_front(constraint);
    }

    /// Next active constraint. When the queue runs dry after progress,
    /// constraints stuck without a cause are retried once more.
    pub(crate) fn pop(&mut self) -> Option<Constraint> {
        if self.active.is_empty() && self.progress && !self.stuck.is_empty() {
            self.progress = false;
            #[cfg(feature = "tracing")]
            trace!(count = self.stuck.len(), "activate_stray");
            for (constraint, _) in self.stuck.drain(..) {
                self.active.push_back(constraint);
            }
        }
        self.active.pop_front()
    }

    pub(crate) fn record_progress(&mut self) {
        self.progress = true;
    }

    /// Park a constraint until its delay is resolved.
    ///
    /// Variables are keyed by representative. A delay that is already
    /// resolved (a bound variable, a complete edge) reactivates at once.
    pub(crate) fn delay(
        &mut self,
        constraint: Constraint,
        delay: Delay,
        unifier: &Unifier,
        completeness: &Completeness,
        terms: &TermStore,
    ) {
        if delay.is_empty() {
            self.stuck.push((constraint, delay));
            return;
        }
        let reps: Vec<TermVar> = delay.vars.iter().map(|v| unifier.find_rep(*v)).collect();
        let resolved = reps.iter().any(|rep| unifier.find_term(*rep).is_some())
            || delay
                .critical_edges
                .iter()
                .any(|(scope, label)| completeness.is_complete(*scope, *label, unifier, terms));
        if resolved {
            self.active.push_back(constraint);
            return;
        }

        let id = self.next_id;
        self.next_id += 1;
        for rep in reps {
            self.on_var.entry(rep).or_default().push(id);
        }
        for edge in delay.critical_edges.iter() {
            self.on_edge.entry(*edge).or_default().push(id);
        }
        self.delayed.insert(id, (constraint, delay));
    }

    /// Reactivate constraints waiting on any of `vars`. Returns how many.
    pub(crate) fn activate_from_vars<'a, I>(&mut self, vars: I) -> usize
    where
        I: IntoIterator<Item = &'a TermVar>,
    {
        let mut count = 0;
        for var in vars {
            if let Some(ids) = self.on_var.remove(var) {
                count += self.activate_ids(ids);
            }
        }
        count
    }

    /// Reactivate constraints waiting on edges that are now complete.
    pub(crate) fn activate_from_edges(
        &mut self,
        completeness: &Completeness,
        unifier: &Unifier,
        terms: &TermStore,
    ) -> usize {
        let ready: Vec<(TermId, TermId)> = self
            .on_edge
            .keys()
            .filter(|(scope, label)| completeness.is_complete(*scope, *label, unifier, terms))
            .copied()
            .collect();
        let mut count = 0;
        for edge in ready {
            if let Some(ids) = self.on_edge.remove(&edge) {
                count += self.activate_ids(ids);
            }
        }
        count
    }

    fn activate_ids(&mut self, ids: Vec<u64>) -> usize {
        let mut count = 0;
        for id in ids {
            if let Some((constraint, _)) = self.delayed.remove(&id) {
                self.active.push_back(constraint);
                count += 1;
            }
        }
        count
    }

    pub(crate) fn active_len(&self) -> usize {
        self.active.len()
    }

    pub(crate) fn delayed_len(&self) -> usize {
        self.delayed.len() + self.stuck.len()
    }

    /// Every constraint not yet solved, active ones first.
    pub(crate) fn remaining(&self) -> Vec<Constraint> {
        let mut out: Vec<Constraint> = self.active.iter().cloned().collect();
        out.extend(self.delayed_sorted().into_iter().map(|(c, _)| c));
        out.extend(self.stuck.iter().map(|(c, _)| c.clone()));
        out
    }

    /// Drain into `(constraint, delay)` pairs in delay order. Active
    /// constraints get an empty delay.
    pub(crate) fn into_unsolved(mut self) -> Vec<(Constraint, Delay)> {
        let mut out: Vec<(Constraint, Delay)> = self
            .active
            .drain(..)
            .map(|c| (c, Delay::default()))
            .collect();
        out.extend(self.delayed_sorted());
        out.append(&mut self.stuck);
        out
    }

    fn delayed_sorted(&self) -> Vec<(Constraint, Delay)> {
        let mut ids: Vec<u64> = self.delayed.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| self.delayed.get(&id).cloned())
            .collect()
    }
}

#[cfg(test)]
#[path = "../tests/store.rs"]
mod tests;
