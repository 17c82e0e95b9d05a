//! Fixpoint constraint solver.
//!
//! A run keeps a queue of active constraints and an index of delayed ones.
//! Each step takes one active constraint and either reduces it (possibly
//! producing new constraints and a new state), delays it on the variables
//! or critical edges it waits for, or fails it. Reductions reactivate the
//! delayed constraints whose variables changed or whose edges became
//! complete. The run ends when nothing is active; whatever is still
//! delayed is reported as unsolved.

mod step;
mod store;
mod user;

use crate::completeness::Completeness;
use crate::config::SolverConfig;
use crate::constraint::Constraint;
use crate::delay::Delay;
use crate::diagnostic::{Diagnostic, MessageKind, SolverResult};
use crate::metrics::SolverMetrics;
use crate::spec::Spec;
use crate::state::State;
use crate::term::{TermId, TermStore, TermVar};
use crate::unify::Unifier;
use im::OrdSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use step::StepResult;
use store::ConstraintStore;
use thiserror::Error;

#[cfg(feature = "tracing")]
use crate::trace::{debug, debug_span, info, trace};

/// Cooperative cancellation, checked between solver steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("{count} rules for `{name}` apply to {constraint}")]
    Overlap {
        name: String,
        count: usize,
        constraint: String,
    },
    /// The run was cancelled. Carries the last consistent state and every
    /// constraint not yet solved.
    #[error("solving interrupted with {} constraint(s) left", .constraints.len())]
    Interrupted {
        state: Box<State>,
        constraints: Vec<Constraint>,
    },
}

/// Result of checking whether a constraint holds in a state without
/// changing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entailment {
    Entailed,
    /// The constraint fails in this state.
    Failed,
    /// Solving succeeds but refines these outer variables.
    NotEntailed(OrdSet<TermVar>),
    /// Solving is stuck on outer variables or critical edges.
    Delayed(Delay),
}

/// Raw outcome of one fixpoint run.
#[derive(Debug)]
struct RunOutcome {
    state: State,
    failed: Vec<(Constraint, Option<String>)>,
    unsolved: Vec<(Constraint, Delay)>,
    /// True when the run stopped before reaching a fixpoint.
    stopped: bool,
}

pub struct Solver<'a> {
    spec: &'a Spec,
    terms: &'a TermStore,
    config: SolverConfig,
    metrics: SolverMetrics,
    cancel: CancelToken,
}

impl<'a> Solver<'a> {
    pub fn new(spec: &'a Spec, terms: &'a TermStore) -> Self {
        Solver {
            spec,
            terms,
            config: SolverConfig::default(),
            metrics: SolverMetrics::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn metrics(&self) -> &SolverMetrics {
        &self.metrics
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn spec(&self) -> &Spec {
        self.spec
    }

    pub fn terms(&self) -> &TermStore {
        self.terms
    }

    /// An empty state honouring the configured term semantics.
    pub fn initial_state(&self, resource: &str) -> State {
        State::with_unifier(resource, Unifier::new(self.config.finite))
    }

    /// Solve `constraints` starting from `state`.
    ///
    /// Failed and unsolved constraints become diagnostics. Only rule
    /// overlap and cancellation are errors.
    pub fn solve(
        &self,
        state: State,
        constraints: Vec<Constraint>,
    ) -> Result<SolverResult, SolverError> {
        #[cfg(feature = "tracing")]
        let _span = debug_span!("solve", constraints = constraints.len()).entered();

        let outcome = self.run(state, constraints, Completeness::new(), false)?;
        let mut messages: Vec<Diagnostic> = outcome
            .failed
            .iter()
            .map(|(c, reason)| Diagnostic::failed(c, reason.as_deref(), &outcome.state, self.terms))
            .collect();
        if !outcome.stopped {
            messages.extend(
                outcome
                    .unsolved
                    .iter()
                    .map(|(c, delay)| Diagnostic::unsolved(c, delay, &outcome.state, self.terms)),
            );
        }

        #[cfg(feature = "tracing")]
        info!(
            failed = outcome.failed.len(),
            unsolved = outcome.unsolved.len(),
            "solve_done"
        );

        Ok(SolverResult {
            state: outcome.state,
            failed: outcome.failed.into_iter().map(|(c, _)| c).collect(),
            delays: outcome.unsolved,
            messages,
        })
    }

    /// Does `constraints` hold in `state` without binding anything but
    /// `local_vars`?
    ///
    /// `Err` carries what the answer waits on. Rule overlap or
    /// cancellation during the check count as not entailed.
    pub fn entails(
        &self,
        state: &State,
        constraints: Vec<Constraint>,
        local_vars: &[TermVar],
    ) -> Result<bool, Delay> {
        let local: OrdSet<TermVar> = local_vars.iter().copied().collect();
        let constraint = Constraint::conj_all(constraints);
        match self.check_entailment(state, constraint, &local, &Completeness::new()) {
            Ok(Entailment::Entailed) => Ok(true),
            Ok(Entailment::Failed) | Ok(Entailment::NotEntailed(_)) | Err(_) => Ok(false),
            Ok(Entailment::Delayed(delay)) => Err(delay),
        }
    }

    /// Solve `constraint` in a copy of `state` and compare the result on
    /// the outer variables: everything the state or the constraint
    /// mentions, except `local_vars`.
    pub fn check_entailment(
        &self,
        state: &State,
        constraint: Constraint,
        local_vars: &OrdSet<TermVar>,
        completeness: &Completeness,
    ) -> Result<Entailment, SolverError> {
        self.metrics.record_nested_solve();
        let terms = self.terms;
        let unifier = state.unifier();
        let mentioned = constraint
            .free_vars(terms)
            .relative_complement(local_vars.clone());
        let outer: OrdSet<TermVar> = unifier
            .var_set(terms)
            .relative_complement(local_vars.clone())
            .union(mentioned.clone());

        let outcome = self.run(state.clone(), vec![constraint], completeness.clone(), true)?;
        if !outcome.failed.is_empty() {
            return Ok(Entailment::Failed);
        }
        let nested = outcome.state.unifier();

        if !outcome.unsolved.is_empty() {
            let mut waiting = Delay::default();
            for (_, delay) in outcome.unsolved {
                waiting.merge(delay);
            }
            let vars: OrdSet<TermVar> = outer
                .iter()
                .filter(|v| waiting.vars.contains(&nested.find_rep(**v)))
                .map(|v| unifier.find_rep(*v))
                .filter(|rep| unifier.find_term(*rep).is_none())
                .collect();
            // Edges only the nested constraints keep open can never close
            // from outside.
            let critical_edges: OrdSet<(TermId, TermId)> = waiting
                .critical_edges
                .into_iter()
                .filter(|(scope, label)| {
                    !completeness.is_complete(*scope, *label, unifier, terms)
                })
                .collect();
            let delay = Delay {
                vars,
                critical_edges,
            };
            #[cfg(feature = "tracing")]
            trace!(empty = delay.is_empty(), "entailment_delayed");
            return Ok(if delay.is_empty() {
                Entailment::Failed
            } else {
                Entailment::Delayed(delay)
            });
        }

        let before = unifier.retain_all(outer.iter().copied(), terms).unifier;
        let after = nested.retain_all(outer.iter().copied(), terms).unifier;
        let graph_unchanged = outcome
            .state
            .scope_graph()
            .same_on(state.scope_graph(), state.scope_graph().scopes());
        if after.equivalent(&before, terms) && graph_unchanged {
            return Ok(Entailment::Entailed);
        }

        let mut refined = OrdSet::new();
        for var in outer.iter() {
            let term = terms.var_term(*var);
            if unifier.find_recursive(term, terms) != nested.find_recursive(term, terms) {
                refined.extend(unifier.free_vars(term, terms));
            }
        }
        if refined.is_empty() {
            // Only disequalities or the scope graph changed.
            for var in mentioned.iter() {
                refined.extend(unifier.free_vars(terms.var_term(*var), terms));
            }
        }
        Ok(Entailment::NotEntailed(refined))
    }

    fn run(
        &self,
        state: State,
        constraints: Vec<Constraint>,
        completeness: Completeness,
        nested: bool,
    ) -> Result<RunOutcome, SolverError> {
        let terms = self.terms;
        let mut completeness = completeness;
        let mut store = ConstraintStore::new();
        for constraint in constraints {
            completeness.add(&constraint, self.spec);
            store.push(constraint);
        }

        let mut state = state;
        let mut failed: Vec<(Constraint, Option<String>)> = Vec::new();
        let mut steps: u64 = 0;
        let mut stopped = false;

        loop {
            if self.cancel.is_cancelled() {
                #[cfg(feature = "tracing")]
                debug!(remaining = store.active_len() + store.delayed_len(), "interrupted");
                return Err(SolverError::Interrupted {
                    constraints: store.remaining(),
                    state: Box::new(state),
                });
            }
            let Some(constraint) = store.pop() else {
                break;
            };
            if self.config.max_steps.is_some_and(|max| steps >= max) {
                #[cfg(feature = "tracing")]
                debug!(steps, "step_limit_reached");
                store.push_front(constraint);
                break;
            }
            steps += 1;
            self.metrics.record_step();

            let result = match step::step(self, &constraint, &state, &completeness) {
                Ok(result) => result,
                Err(SolverError::Interrupted { .. }) => {
                    let mut remaining = vec![constraint];
                    remaining.extend(store.remaining());
                    return Err(SolverError::Interrupted {
                        constraints: remaining,
                        state: Box::new(state),
                    });
                }
                Err(err) => return Err(err),
            };

            match result {
                StepResult::Success {
                    state: next,
                    constraints,
                    changed,
                } => {
                    self.metrics.record_reduction();
                    for new in &constraints {
                        completeness.add(new, self.spec);
                    }
                    completeness.remove(&constraint, self.spec);
                    state = next;
                    for new in constraints {
                        store.push(new);
                    }
                    let activated = store.activate_from_vars(changed.iter())
                        + store.activate_from_edges(&completeness, state.unifier(), terms);
                    self.metrics.record_activations(activated as u64);
                    store.record_progress();
                }
                StepResult::Delay(delay) => {
                    self.metrics.record_delay();
                    #[cfg(feature = "tracing")]
                    trace!(delay = %delay.format(terms), "delayed");
                    store.delay(constraint, delay, state.unifier(), &completeness, terms);
                    self.metrics.update_max_delayed(store.delayed_len() as u64);
                }
                StepResult::Failure(reason) => {
                    self.metrics.record_failure();
                    #[cfg(feature = "tracing")]
                    debug!(constraint = %constraint.format(terms), "failed");
                    completeness.remove(&constraint, self.spec);
                    let activated =
                        store.activate_from_edges(&completeness, state.unifier(), terms);
                    self.metrics.record_activations(activated as u64);
                    store.record_progress();
                    let is_error = constraint
                        .find_message()
                        .map_or(true, |m| m.kind == MessageKind::Error);
                    failed.push((constraint, reason));
                    if is_error && (nested || self.config.return_on_first_error) {
                        stopped = true;
                        break;
                    }
                }
            }
        }

        Ok(RunOutcome {
            state,
            failed,
            unsolved: store.into_unsolved(),
            stopped,
        })
    }
}
