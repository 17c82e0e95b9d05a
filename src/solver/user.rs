//! Rule selection for user constraints, and rule lambdas as predicates.
//!
//! Every rule of the constraint's name is a candidate. A matching
//! candidate is accepted when its guard is entailed by the current state.
//! Only a failing guard removes a candidate; a mismatch or an undecided
//! guard leaves it in the set, so the constraint waits while any
//! candidate remains. Exactly one accepted candidate fires. Two or more
//! is a rule overlap, reported as an error rather than resolved by order.

use super::step::StepResult;
use super::{Entailment, Solver, SolverError};
use crate::completeness::Completeness;
use crate::constraint::Constraint;
use crate::delay::Delay;
use crate::matching::{match_params, MatchOutcome};
use crate::spec::Rule;
use crate::state::State;
use crate::subst::Subst;
use crate::term::{TermId, TermVar};
use im::OrdSet;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use crate::trace::{debug, trace};

enum Candidate {
    Accepted { subst: Subst, state: State },
    Rejected,
    Pending(Delay),
}

pub(super) fn solve_user(
    solver: &Solver,
    c: &Constraint,
    name: &str,
    args: &[TermId],
    state: &State,
    completeness: &Completeness,
) -> Result<StepResult, SolverError> {
    let terms = solver.terms;
    let rules = solver.spec.rules(name);
    if rules.is_empty() {
        return Ok(StepResult::Failure(Some(format!("no rules for {}", name))));
    }

    let mut accepted: Vec<(&Rule, Subst, State)> = Vec::new();
    let mut pending = 0usize;
    let mut delay = Delay::default();
    for rule in rules {
        match select(solver, rule, args, state, completeness)? {
            Candidate::Accepted { subst, state } => accepted.push((rule, subst, state)),
            Candidate::Rejected => {}
            Candidate::Pending(waiting) => {
                pending += 1;
                delay.merge(waiting);
            }
        }
    }

    #[cfg(feature = "tracing")]
    trace!(name, accepted = accepted.len(), pending, "rule_selection");

    if accepted.len() > 1 {
        solver.metrics.record_overlap();
        #[cfg(feature = "tracing")]
        debug!(name, count = accepted.len(), "rule_overlap");
        return Err(SolverError::Overlap {
            name: name.to_string(),
            count: accepted.len(),
            constraint: c.instantiate(state.unifier(), terms).format(terms),
        });
    }
    let Some((rule, mut subst, mut next)) = accepted.pop() else {
        // An empty delay parks the constraint as stuck.
        return Ok(if pending == 0 {
            StepResult::Failure(Some(format!("no rule for {} applies", name)))
        } else {
            StepResult::Delay(delay)
        });
    };

    for (var, fresh) in next.freshen(&rule.body_vars, terms) {
        subst.bind(var, terms.var_term(fresh));
    }
    let mut body = rule.body.apply(&subst, terms);
    if rule.has_guard() {
        // The guard holds; solving it again binds the guard variables the
        // body may use.
        body = Constraint::conj(rule.guard.apply(&subst, terms), body);
    }
    Ok(StepResult::with_constraints(
        next,
        vec![body.with_cause(Some(Arc::new(c.clone())))],
    ))
}

/// Match one candidate and decide its guard.
fn select(
    solver: &Solver,
    rule: &Rule,
    args: &[TermId],
    state: &State,
    completeness: &Completeness,
) -> Result<Candidate, SolverError> {
    let terms = solver.terms;
    let mut subst = match match_params(&rule.params, args, state.unifier(), terms) {
        MatchOutcome::Matched(subst) => subst,
        MatchOutcome::Mismatch => return Ok(Candidate::Pending(Delay::default())),
        MatchOutcome::Undetermined(vars) => return Ok(Candidate::Pending(Delay::of_vars(vars))),
    };
    if !rule.has_guard() {
        return Ok(Candidate::Accepted {
            subst,
            state: state.clone(),
        });
    }

    let mut next = state.clone();
    let local = bind_fresh(&mut next, &rule.guard_vars, &mut subst, solver);
    let guard = rule.guard.apply(&subst, terms);
    Ok(
        match solver.check_entailment(&next, guard, &local, completeness)? {
            Entailment::Entailed => Candidate::Accepted { subst, state: next },
            Entailment::Failed => Candidate::Rejected,
            Entailment::NotEntailed(vars) => Candidate::Pending(Delay::of_vars(vars)),
            Entailment::Delayed(delay) => Candidate::Pending(delay),
        },
    )
}

fn bind_fresh(
    state: &mut State,
    vars: &[TermVar],
    subst: &mut Subst,
    solver: &Solver,
) -> OrdSet<TermVar> {
    let mut local = OrdSet::new();
    for (var, fresh) in state.freshen(vars, solver.terms) {
        subst.bind(var, solver.terms.var_term(fresh));
        local.insert(fresh);
    }
    local
}

/// Evaluate a rule lambda on `args`: true when its guard and body are
/// entailed, `Err` with the delay when that cannot be decided yet.
pub(super) fn eval_predicate(
    solver: &Solver,
    rule: &Rule,
    args: &[TermId],
    state: &State,
    completeness: &Completeness,
) -> Result<Result<bool, Delay>, SolverError> {
    let terms = solver.terms;
    let mut subst = match match_params(&rule.params, args, state.unifier(), terms) {
        MatchOutcome::Matched(subst) => subst,
        MatchOutcome::Mismatch => return Ok(Ok(false)),
        MatchOutcome::Undetermined(vars) => return Ok(Err(Delay::of_vars(vars))),
    };
    let mut next = state.clone();
    let mut local = bind_fresh(&mut next, &rule.guard_vars, &mut subst, solver);
    local.extend(bind_fresh(&mut next, &rule.body_vars, &mut subst, solver));
    let constraint = Constraint::conj(
        rule.guard.apply(&subst, terms),
        rule.body.apply(&subst, terms),
    );

    Ok(
        match solver.check_entailment(&next, constraint, &local, completeness)? {
            Entailment::Entailed => Ok(true),
            Entailment::Failed => Ok(false),
            Entailment::NotEntailed(vars) if vars.is_empty() => Ok(false),
            Entailment::NotEntailed(vars) => Err(Delay::of_vars(vars)),
            Entailment::Delayed(delay) => Err(delay),
        },
    )
}
