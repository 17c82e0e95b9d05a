//! Diagnostics and solver results.

use crate::constraint::{Constraint, ConstraintKind};
use crate::delay::Delay;
use crate::state::State;
use crate::term::{TermId, TermIndex, TermStore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Error,
    Warning,
    Note,
}

/// A failed or unsolved constraint, rendered against the final state.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: MessageKind,
    pub text: String,
    /// `(resource, id)` of the AST node the diagnostic points at.
    pub location: Option<(String, u32)>,
    /// Formatted causes, nearest first.
    pub causes: Vec<String>,
    #[serde(skip)]
    pub origin: Option<TermId>,
    #[serde(skip)]
    pub constraint: Constraint,
}

impl Diagnostic {
    /// Diagnostic for a constraint that failed.
    pub fn failed(
        constraint: &Constraint,
        reason: Option<&str>,
        state: &State,
        terms: &TermStore,
    ) -> Self {
        let fallback = match reason {
            Some(reason) => format!("{}: {}", reason, render(constraint, state, terms)),
            None => format!("Failed: {}", render(constraint, state, terms)),
        };
        Self::build(constraint, fallback, state, terms)
    }

    /// Diagnostic for a constraint left unsolved.
    pub fn unsolved(
        constraint: &Constraint,
        delay: &Delay,
        state: &State,
        terms: &TermStore,
    ) -> Self {
        let fallback = format!(
            "Unsolved: {} ({})",
            render(constraint, state, terms),
            delay.format(terms)
        );
        Self::build(constraint, fallback, state, terms)
    }

    fn build(constraint: &Constraint, fallback: String, state: &State, terms: &TermStore) -> Self {
        let unifier = state.unifier();
        let message = constraint.find_message();
        let (kind, text) = match &message {
            Some(message) => (message.kind, message.format(unifier, terms)),
            None => (MessageKind::Error, fallback),
        };
        let origin = message
            .and_then(|m| m.origin)
            .map(|o| unifier.find(o, terms))
            .or_else(|| find_origin(constraint, state, terms));
        let location = origin
            .and_then(|o| terms.index_of(o))
            .map(|index: TermIndex| (terms.symbols().name(index.resource).to_string(), index.id));
        let causes = constraint
            .causes()
            .iter()
            .map(|cause| render(cause, state, terms))
            .collect();
        Diagnostic {
            kind,
            text,
            location,
            causes,
            origin,
            constraint: constraint.clone(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == MessageKind::Error
    }
}

fn render(constraint: &Constraint, state: &State, terms: &TermStore) -> String {
    constraint.instantiate(state.unifier(), terms).format(terms)
}

/// First AST-indexed term among the constraint's arguments, then among
/// its causes' arguments.
fn find_origin(constraint: &Constraint, state: &State, terms: &TermStore) -> Option<TermId> {
    let unifier = state.unifier();
    std::iter::once(constraint.clone())
        .chain(constraint.causes().iter().map(|c| (**c).clone()))
        .find_map(|c| {
            argument_terms(&c)
                .into_iter()
                .map(|t| unifier.find(t, terms))
                .find(|t| terms.index_of(*t).is_some())
        })
}

fn argument_terms(constraint: &Constraint) -> SmallVec<[TermId; 4]> {
    match &constraint.kind {
        ConstraintKind::Equal(left, right) => smallvec::smallvec![*left, *right],
        ConstraintKind::Inequal { left, right, .. } => smallvec::smallvec![*left, *right],
        ConstraintKind::User { args, .. } => args.iter().copied().collect(),
        ConstraintKind::AstId { term, .. } => smallvec::smallvec![*term],
        ConstraintKind::ResolveQuery(query) => smallvec::smallvec![query.scope, query.result],
        ConstraintKind::TellEdge { source, target, .. } => smallvec::smallvec![*source, *target],
        ConstraintKind::TellRel { scope, datum, .. } => {
            std::iter::once(*scope).chain(datum.iter().copied()).collect()
        }
        _ => SmallVec::new(),
    }
}

/// Outcome of a top-level solver run.
#[derive(Debug, Clone)]
pub struct SolverResult {
    pub state: State,
    pub failed: Vec<Constraint>,
    pub delays: Vec<(Constraint, Delay)>,
    pub messages: Vec<Diagnostic>,
}

impl SolverResult {
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(Diagnostic::is_error)
    }

    /// Nothing failed and nothing is left.
    pub fn is_solved(&self) -> bool {
        self.failed.is_empty() && self.delays.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter().filter(|d| d.kind == MessageKind::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter().filter(|d| d.kind == MessageKind::Warning)
    }

    pub fn notes(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter().filter(|d| d.kind == MessageKind::Note)
    }

    /// JSON report of the diagnostics.
    pub fn to_json(&self) -> Value {
        json!({
            "has_errors": self.has_errors(),
            "unsolved": self.delays.len(),
            "messages": self.messages,
        })
    }
}

#[cfg(test)]
#[path = "tests/diagnostic.rs"]
mod tests;
