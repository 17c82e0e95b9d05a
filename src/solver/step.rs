//! One solver step per constraint kind.

use super::{user, Entailment, Solver, SolverError};
use crate::completeness::Completeness;
use crate::constraint::{Constraint, ConstraintKind, DataPredicate, PathProjection, Query};
use crate::delay::Delay;
use crate::resolve::{NameResolution, ResolutionContext, ResolutionError};
use crate::scopegraph::{ResolutionPath, ScopePath};
use crate::state::{index_term, parse_index_term, State};
use crate::subst::Subst;
use crate::term::{format_term, Blob, TermId, TermVar};
use im::OrdSet;
use std::cell::RefCell;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use crate::trace::trace;

pub(crate) enum StepResult {
    Success {
        state: State,
        constraints: Vec<Constraint>,
        /// Variables whose class or binding changed.
        changed: OrdSet<TermVar>,
    },
    Delay(Delay),
    Failure(Option<String>),
}

impl StepResult {
    fn done(state: State) -> Self {
        Self::with_constraints(state, Vec::new())
    }

    pub(super) fn with_constraints(state: State, constraints: Vec<Constraint>) -> Self {
        StepResult::Success {
            state,
            constraints,
            changed: OrdSet::new(),
        }
    }

    fn fail(reason: &str) -> Self {
        StepResult::Failure(Some(reason.to_string()))
    }
}

/// A constraint produced by `parent`.
fn caused_by(child: Constraint, parent: &Constraint) -> Constraint {
    child.with_cause(Some(Arc::new(parent.clone())))
}

/// A part of `parent` taking over its cause and message.
fn part_of(child: Constraint, parent: &Constraint) -> Constraint {
    let mut child = child.inherit_cause(&parent.cause);
    if child.message.is_none() {
        child.message = parent.message.clone();
    }
    child
}

/// Delay on the free variables of `term` unless it is ground.
fn require_ground(solver: &Solver, state: &State, term: TermId) -> Result<TermId, Delay> {
    let unifier = state.unifier();
    let instance = unifier.find_recursive(term, solver.terms);
    if solver.terms.is_ground(instance) {
        Ok(instance)
    } else {
        Err(Delay::of_vars(unifier.free_vars(term, solver.terms)))
    }
}

pub(crate) fn step(
    solver: &Solver,
    c: &Constraint,
    state: &State,
    completeness: &Completeness,
) -> Result<StepResult, SolverError> {
    let terms = solver.terms;

    #[cfg(feature = "tracing")]
    trace!(constraint = %c.format(terms), "step");

    let result = match &c.kind {
        ConstraintKind::True => StepResult::done(state.clone()),
        ConstraintKind::False => StepResult::Failure(None),
        ConstraintKind::Conj(left, right) => StepResult::with_constraints(
            state.clone(),
            vec![part_of((**left).clone(), c), part_of((**right).clone(), c)],
        ),
        ConstraintKind::Exists(vars, body) => {
            let mut next = state.clone();
            let subst: Subst = next
                .freshen(vars, terms)
                .into_iter()
                .map(|(var, fresh)| (var, terms.var_term(fresh)))
                .collect();
            let body = part_of(body.apply(&subst, terms), c);
            StepResult::with_constraints(next, vec![body])
        }
        ConstraintKind::Equal(left, right) => {
            match state.unifier().unify(*left, *right, terms) {
                Ok(Some(result)) => {
                    solver.metrics.record_unification();
                    let mut next = state.clone();
                    let changed = result.diff.var_set(terms);
                    next.set_unifier(result.unifier);
                    StepResult::Success {
                        state: next,
                        constraints: Vec::new(),
                        changed,
                    }
                }
                Ok(None) => {
                    solver.metrics.record_unification_failure();
                    StepResult::Failure(None)
                }
                Err(err) => {
                    solver.metrics.record_unification_failure();
                    StepResult::Failure(Some(err.to_string()))
                }
            }
        }
        ConstraintKind::Inequal {
            universals,
            left,
            right,
        } => {
            let universals: OrdSet<TermVar> = universals.iter().copied().collect();
            match state.unifier().disunify(&universals, *left, *right, terms) {
                Some(result) => {
                    let mut next = state.clone();
                    next.set_unifier(result.unifier);
                    StepResult::done(next)
                }
                None => StepResult::Failure(None),
            }
        }
        ConstraintKind::New(scopes) => {
            let mut next = state.clone();
            let equalities = scopes
                .iter()
                .map(|term| {
                    let base = match terms.is_var(*term) {
                        Some(var) => terms.symbols().base_name(var.name).to_string(),
                        None => "s".to_string(),
                    };
                    let scope = next.fresh_scope(&base, terms);
                    caused_by(Constraint::equal(*term, scope), c)
                })
                .collect();
            StepResult::with_constraints(next, equalities)
        }
        ConstraintKind::TellEdge {
            source,
            label,
            target,
        } => match (
            require_ground(solver, state, *source),
            require_ground(solver, state, *target),
        ) {
            (Ok(source), Ok(target)) => {
                let mut next = state.clone();
                next.scope_graph_mut().add_edge(source, *label, target);
                StepResult::done(next)
            }
            (Err(mut delay), other) => {
                if let Err(more) = other {
                    delay.merge(more);
                }
                StepResult::Delay(delay)
            }
            (Ok(_), Err(delay)) => StepResult::Delay(delay),
        },
        ConstraintKind::TellRel {
            scope,
            relation,
            datum,
        } => {
            let Some(ty) = solver.spec.relation(*relation) else {
                return Ok(StepResult::fail(&format!(
                    "relation {} is not declared",
                    format_term(*relation, terms)
                )));
            };
            if datum.len() != ty.arity() {
                return Ok(StepResult::fail(&format!(
                    "datum has {} components, relation expects {}",
                    datum.len(),
                    ty.arity()
                )));
            }
            match require_ground(solver, state, *scope) {
                Ok(scope) => {
                    let unifier = state.unifier();
                    let datum =
                        terms.tuple(datum.iter().map(|d| unifier.find_recursive(*d, terms)));
                    let mut next = state.clone();
                    next.scope_graph_mut().add_datum(scope, *relation, datum);
                    StepResult::done(next)
                }
                Err(delay) => StepResult::Delay(delay),
            }
        }
        ConstraintKind::ResolveQuery(query) => {
            resolve_query(solver, c, query, state, completeness)?
        }
        ConstraintKind::PathProj {
            path,
            projection,
            result,
        } => match require_ground(solver, state, *path) {
            Err(delay) => StepResult::Delay(delay),
            Ok(path) => match project(solver, path, *projection) {
                Some(value) => StepResult::with_constraints(
                    state.clone(),
                    vec![caused_by(Constraint::equal(*result, value), c)],
                ),
                None => StepResult::fail("not a scope graph path"),
            },
        },
        ConstraintKind::AstId { term, id } => match require_ground(solver, state, *term) {
            Err(delay) => StepResult::Delay(delay),
            Ok(_) => {
                let top = state.unifier().find(*term, terms);
                match terms.index_of(top) {
                    Some(index) => StepResult::with_constraints(
                        state.clone(),
                        vec![caused_by(Constraint::equal(*id, index_term(index, terms)), c)],
                    ),
                    None => StepResult::fail("term has no AST index"),
                }
            }
        },
        ConstraintKind::AstProperty {
            index,
            property,
            value,
        } => match require_ground(solver, state, *index) {
            Err(delay) => StepResult::Delay(delay),
            Ok(index) => match parse_index_term(index, terms) {
                None => StepResult::fail("not an AST index"),
                Some(index) => {
                    let mut next = state.clone();
                    if next.set_property(index, *property, *value) {
                        StepResult::done(next)
                    } else {
                        StepResult::fail("property is already set")
                    }
                }
            },
        },
        ConstraintKind::Try(body) => {
            match solver.check_entailment(state, (**body).clone(), &OrdSet::new(), completeness)? {
                Entailment::Entailed => StepResult::done(state.clone()),
                Entailment::Failed | Entailment::NotEntailed(_) => {
                    StepResult::fail("not entailed")
                }
                Entailment::Delayed(delay) => StepResult::Delay(delay),
            }
        }
        ConstraintKind::User { name, args } => {
            user::solve_user(solver, c, name, args, state, completeness)?
        }
    };
    Ok(result)
}

fn project(solver: &Solver, path: TermId, projection: PathProjection) -> Option<TermId> {
    let terms = solver.terms;
    let blob = terms.as_blob(path)?;
    let path: &ScopePath = match blob.downcast_ref::<ResolutionPath>() {
        Some(resolved) => &resolved.path,
        None => blob.downcast_ref::<ScopePath>()?,
    };
    Some(match projection {
        PathProjection::Src => path.source(),
        PathProjection::Dst => path.target(),
        PathProjection::Labels => terms.list(&path.labels()),
        PathProjection::Scopes => terms.list(&path.scopes()),
    })
}

fn resolve_query(
    solver: &Solver,
    c: &Constraint,
    query: &Query,
    state: &State,
    completeness: &Completeness,
) -> Result<StepResult, SolverError> {
    let terms = solver.terms;
    let scope = match require_ground(solver, state, query.scope) {
        Ok(scope) => scope,
        Err(delay) => return Ok(StepResult::Delay(delay)),
    };
    let relation = match query.relation {
        None => None,
        Some(relation) => match solver.spec.relation(relation) {
            Some(ty) => Some((relation, ty)),
            None => {
                return Ok(StepResult::fail(&format!(
                    "relation {} is not declared",
                    format_term(relation, terms)
                )));
            }
        },
    };

    let context = QueryContext {
        solver,
        state,
        completeness,
        query,
        aborted: RefCell::new(None),
    };
    let resolution = NameResolution::new(
        terms,
        solver.spec.labels(),
        relation,
        &query.filter.label_wf,
        &query.min.label_order,
        &context,
    );
    let resolved = resolution.resolve(scope);
    if let Some(err) = context.aborted.borrow_mut().take() {
        return Err(err);
    }

    Ok(match resolved {
        Ok(paths) => {
            let items: Vec<TermId> = paths
                .into_iter()
                .map(|path| {
                    let datum = path.datum;
                    let has_relation = path.relation.is_some();
                    let blob = terms.blob(Blob::new(path));
                    if has_relation {
                        terms.tuple([blob, datum])
                    } else {
                        blob
                    }
                })
                .collect();
            let answer = terms.list(&items);
            StepResult::with_constraints(
                state.clone(),
                vec![caused_by(Constraint::equal(answer, query.result), c)],
            )
        }
        Err(ResolutionError::IncompleteEdge { scope, label }) => {
            StepResult::Delay(Delay::of_edge(scope, label))
        }
        Err(ResolutionError::IncompleteData { scope, relation }) => {
            StepResult::Delay(Delay::of_edge(scope, relation))
        }
        Err(ResolutionError::Delayed(delay)) => StepResult::Delay(delay),
        Err(err) => StepResult::Failure(Some(err.to_string())),
    })
}

/// Resolution context backed by the solver state. Data predicates are
/// decided by entailment; a solver error during one aborts resolution and
/// is reported afterwards.
struct QueryContext<'s, 'a> {
    solver: &'s Solver<'a>,
    state: &'s State,
    completeness: &'s Completeness,
    query: &'s Query,
    aborted: RefCell<Option<SolverError>>,
}

impl QueryContext<'_, '_> {
    fn holds(&self, predicate: &DataPredicate, args: &[TermId]) -> Result<bool, ResolutionError> {
        let rule = match predicate {
            DataPredicate::Always => return Ok(true),
            DataPredicate::Never => return Ok(false),
            DataPredicate::Rule(rule) => rule,
        };
        match user::eval_predicate(self.solver, rule, args, self.state, self.completeness) {
            Ok(Ok(holds)) => Ok(holds),
            Ok(Err(delay)) => Err(ResolutionError::Delayed(delay)),
            Err(err) => {
                *self.aborted.borrow_mut() = Some(err);
                Err(ResolutionError::Delayed(Delay::default()))
            }
        }
    }
}

impl ResolutionContext for QueryContext<'_, '_> {
    fn edges(&self, scope: TermId, label: TermId) -> Vec<TermId> {
        self.state.scope_graph().edges(scope, label)
    }

    fn data(&self, scope: TermId, relation: TermId) -> Vec<TermId> {
        self.state.scope_graph().data(scope, relation)
    }

    fn is_complete(&self, scope: TermId, label: TermId) -> bool {
        self.completeness
            .is_complete(scope, label, self.state.unifier(), self.solver.terms)
    }

    fn data_wf(&self, key: TermId) -> Result<bool, ResolutionError> {
        self.holds(&self.query.filter.data_wf, &[key])
    }

    fn data_equiv(&self, left: TermId, right: TermId) -> Result<bool, ResolutionError> {
        self.holds(&self.query.min.data_equiv, &[left, right])
    }
}
