//! One-sided matching of rule parameter patterns against actual arguments.
//!
//! Pattern variables belong to the rule and are bound by the match; the
//! arguments are read through the unifier and never bound. A pattern that
//! needs structure where the argument is still a free variable is
//! undetermined: the match waits on that variable instead of failing.

use crate::subst::Subst;
use crate::term::{Term, TermId, TermStore, TermVar};
use crate::unify::Unifier;
use im::OrdSet;
use smallvec::SmallVec;

#[cfg(feature = "tracing")]
use crate::trace::{debug_span, trace};

/// Outcome of matching a parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Every pattern variable is bound.
    Matched(Subst),
    /// The patterns can never match these arguments.
    Mismatch,
    /// The match depends on these (representative) variables.
    Undetermined(OrdSet<TermVar>),
}

/// Match `patterns` against `args` pairwise.
///
/// Repeated pattern variables must be bound to equal arguments; when the
/// unifier cannot decide that yet, the free variables of both arguments
/// are reported.
///
/// Uses an explicit worklist to avoid recursion.
pub fn match_params(
    patterns: &[TermId],
    args: &[TermId],
    unifier: &Unifier,
    terms: &TermStore,
) -> MatchOutcome {
    #[cfg(feature = "tracing")]
    let _span = debug_span!("match_params", arity = args.len()).entered();

    if patterns.len() != args.len() {
        #[cfg(feature = "tracing")]
        trace!("match_arity_mismatch");
        return MatchOutcome::Mismatch;
    }

    let mut subst = Subst::new();
    let mut waiting: OrdSet<TermVar> = OrdSet::new();
    let mut worklist: SmallVec<[(TermId, TermId); 32]> =
        patterns.iter().copied().zip(args.iter().copied()).collect();

    while let Some((pattern, arg)) = worklist.pop() {
        let pattern_term = match terms.resolve(pattern) {
            Some(term) => term,
            None => return MatchOutcome::Mismatch,
        };

        if let Term::Var(var) = pattern_term {
            match subst.get(var) {
                None => subst.bind(var, arg),
                Some(previous) => match unifier.are_equal(previous, arg, terms) {
                    Some(true) => {}
                    Some(false) => {
                        #[cfg(feature = "tracing")]
                        trace!(?var, "match_nonlinear_mismatch");
                        return MatchOutcome::Mismatch;
                    }
                    None => {
                        waiting.extend(unifier.free_vars(previous, terms));
                        waiting.extend(unifier.free_vars(arg, terms));
                    }
                },
            }
            continue;
        }

        let arg = unifier.find(arg, terms);
        let arg_term = match terms.resolve(arg) {
            Some(term) => term,
            None => return MatchOutcome::Mismatch,
        };
        match (pattern_term, arg_term) {
            (_, Term::Var(free)) => {
                waiting.insert(unifier.find_rep(free));
            }
            (Term::Appl(f, ps), Term::Appl(g, xs)) => {
                if f != g || ps.len() != xs.len() {
                    #[cfg(feature = "tracing")]
                    trace!("match_operator_mismatch");
                    return MatchOutcome::Mismatch;
                }
                worklist.extend(ps.into_iter().zip(xs));
            }
            (Term::Cons(ph, pt), Term::Cons(xh, xt)) => {
                worklist.push((pt, xt));
                worklist.push((ph, xh));
            }
            (Term::Nil, Term::Nil) => {}
            (Term::Str(a), Term::Str(b)) if a == b => {}
            (Term::Int(a), Term::Int(b)) if a == b => {}
            (Term::Blob(a), Term::Blob(b)) if a == b => {}
            _ => {
                #[cfg(feature = "tracing")]
                trace!("match_constructor_mismatch");
                return MatchOutcome::Mismatch;
            }
        }
    }

    if waiting.is_empty() {
        #[cfg(feature = "tracing")]
        trace!(bindings = subst.len(), "match_success");
        MatchOutcome::Matched(subst)
    } else {
        MatchOutcome::Undetermined(waiting)
    }
}

#[cfg(test)]
#[path = "tests/matching.rs"]
mod tests;
