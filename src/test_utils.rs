use crate::constraint::{Constraint, DataPredicate, Query, QueryFilter, QueryMin};
use crate::diagnostic::SolverResult;
use crate::resolve::order::LabelOrder;
use crate::resolve::regex::LabelRegex;
use crate::solver::Solver;
use crate::spec::Spec;
use crate::state::State;
use crate::term::{TermId, TermStore, TermVar};

pub(crate) fn setup() -> TermStore {
    TermStore::new()
}

/// An unqualified variable term and its identity.
pub(crate) fn var(terms: &TermStore, name: &str) -> (TermVar, TermId) {
    let v = terms.make_var("", name);
    (v, terms.var_term(v))
}

/// Run the solver with the default configuration from an empty state.
pub(crate) fn solve(spec: &Spec, terms: &TermStore, constraints: Vec<Constraint>) -> SolverResult {
    Solver::new(spec, terms)
        .solve(State::new("test"), constraints)
        .expect("no solver error")
}

/// A query with permissive data filters and no shadowing.
pub(crate) fn plain_query(
    relation: Option<TermId>,
    label_wf: LabelRegex,
    scope: TermId,
    result: TermId,
) -> Query {
    Query {
        relation,
        filter: QueryFilter {
            label_wf,
            data_wf: DataPredicate::Always,
        },
        min: QueryMin {
            label_order: LabelOrder::none(),
            data_equiv: DataPredicate::Never,
        },
        scope,
        result,
    }
}
