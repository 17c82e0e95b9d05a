pub mod completeness;
pub mod config;
pub mod constraint;
pub mod delay;
pub mod diagnostic;
pub mod matching;
pub mod metrics;
pub mod resolve;
pub mod scopegraph;
pub mod solver;
pub mod spec;
pub mod state;
pub mod subst;
pub mod symbol;
pub mod term;
pub mod trace;
pub mod unify;

pub use config::SolverConfig;
pub use constraint::{Constraint, ConstraintKind, Message};
pub use diagnostic::{Diagnostic, MessageKind, SolverResult};
pub use solver::{CancelToken, Solver, SolverError};
pub use spec::{Rule, Spec};
pub use state::State;
pub use term::{TermId, TermStore, TermVar};
pub use unify::Unifier;

#[cfg(test)]
pub(crate) mod test_utils;
