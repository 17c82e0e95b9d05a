//! Name resolution over a scope graph.
//!
//! Paths are explored from a start scope along edges whose labels keep the
//! label regex alive. At each scope the candidate labels are split by the
//! label order: results through smaller labels shadow results through larger
//! ones whenever their data keys are equivalent. Any edge or relation the
//! context cannot declare complete stops resolution with an error naming
//! exactly that scope and label.

pub mod order;
pub mod regex;

use crate::delay::Delay;
use crate::scopegraph::{ResolutionPath, ScopePath};
use crate::spec::RelationType;
use crate::term::{TermId, TermStore};
use order::{EdgeOrData, LabelOrder};
use regex::LabelRegex;
use thiserror::Error;

#[cfg(feature = "tracing")]
use crate::trace::{debug_span, trace};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("edges of {scope:?} with label {label:?} may still be added")]
    IncompleteEdge { scope: TermId, label: TermId },
    #[error("data of {scope:?} in relation {relation:?} may still be added")]
    IncompleteData { scope: TermId, relation: TermId },
    #[error("data predicate is undetermined")]
    Delayed(Delay),
    #[error("datum has {found} components, relation expects {expected}")]
    WrongArity { expected: usize, found: usize },
}

/// What resolution needs from the outside world.
pub trait ResolutionContext {
    fn edges(&self, scope: TermId, label: TermId) -> Vec<TermId>;

    fn data(&self, scope: TermId, relation: TermId) -> Vec<TermId>;

    /// Can no more edges (or data) with this label be added to the scope?
    fn is_complete(&self, scope: TermId, label: TermId) -> bool;

    fn data_wf(&self, key: TermId) -> Result<bool, ResolutionError>;

    fn data_equiv(&self, left: TermId, right: TermId) -> Result<bool, ResolutionError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Answer {
    path: ResolutionPath,
    key: TermId,
}

pub struct NameResolution<'a, C: ResolutionContext> {
    terms: &'a TermStore,
    labels: &'a [TermId],
    relation: Option<(TermId, RelationType)>,
    label_wf: &'a LabelRegex,
    label_order: &'a LabelOrder,
    context: &'a C,
}

impl<'a, C: ResolutionContext> NameResolution<'a, C> {
    pub fn new(
        terms: &'a TermStore,
        labels: &'a [TermId],
        relation: Option<(TermId, RelationType)>,
        label_wf: &'a LabelRegex,
        label_order: &'a LabelOrder,
        context: &'a C,
    ) -> Self {
        NameResolution {
            terms,
            labels,
            relation,
            label_wf,
            label_order,
            context,
        }
    }

    pub fn resolve(&self, scope: TermId) -> Result<Vec<ResolutionPath>, ResolutionError> {
        #[cfg(feature = "tracing")]
        let _span = debug_span!("resolve", scope = scope.raw()).entered();

        let answers = self.env(&ScopePath::new(scope), self.label_wf)?;

        #[cfg(feature = "tracing")]
        trace!(answers = answers.len(), "resolve_done");
        Ok(answers.into_iter().map(|a| a.path).collect())
    }

    fn env(&self, path: &ScopePath, re: &LabelRegex) -> Result<Vec<Answer>, ResolutionError> {
        let mut labels = Vec::new();
        if re.nullable() {
            labels.push(EdgeOrData::Data);
        }
        for label in self.labels {
            if !re.derive(*label).is_empty() {
                labels.push(EdgeOrData::Edge(*label));
            }
        }
        self.env_labels(&labels, path, re)
    }

    fn env_labels(
        &self,
        labels: &[EdgeOrData],
        path: &ScopePath,
        re: &LabelRegex,
    ) -> Result<Vec<Answer>, ResolutionError> {
        let mut out: Vec<Answer> = Vec::new();
        for label in self.label_order.max(labels) {
            let smaller = self.label_order.smaller(labels, label);
            let preferred = self.env_labels(&smaller, path, re)?;
            let own = self.env_label(label, path, re)?;
            for answer in self.shadow(preferred, own)? {
                if !out.contains(&answer) {
                    out.push(answer);
                }
            }
        }
        Ok(out)
    }

    /// `preferred` plus the answers of `rest` not equivalent to any of them.
    fn shadow(
        &self,
        preferred: Vec<Answer>,
        rest: Vec<Answer>,
    ) -> Result<Vec<Answer>, ResolutionError> {
        let mut out = preferred.clone();
        for answer in rest {
            let mut shadowed = false;
            for kept in &preferred {
                if self.context.data_equiv(kept.key, answer.key)? {
                    shadowed = true;
                    break;
                }
            }
            if !shadowed {
                out.push(answer);
            }
        }
        Ok(out)
    }

    fn env_label(
        &self,
        label: EdgeOrData,
        path: &ScopePath,
        re: &LabelRegex,
    ) -> Result<Vec<Answer>, ResolutionError> {
        let scope = path.target();
        match label {
            EdgeOrData::Data => self.env_data(path, scope),
            EdgeOrData::Edge(l) => {
                let next = re.derive(l);
                if next.is_empty() {
                    return Ok(Vec::new());
                }
                if !self.context.is_complete(scope, l) {
                    #[cfg(feature = "tracing")]
                    trace!(scope = scope.raw(), label = l.raw(), "resolve_incomplete_edge");
                    return Err(ResolutionError::IncompleteEdge { scope, label: l });
                }
                let mut out = Vec::new();
                for target in self.context.edges(scope, l) {
                    if path.contains(target) {
                        continue;
                    }
                    out.extend(self.env(&path.step(l, target), &next)?);
                }
                Ok(out)
            }
        }
    }

    fn env_data(&self, path: &ScopePath, scope: TermId) -> Result<Vec<Answer>, ResolutionError> {
        let Some((relation, ty)) = self.relation else {
            if !self.context.data_wf(scope)? {
                return Ok(Vec::new());
            }
            return Ok(vec![Answer {
                path: ResolutionPath {
                    path: path.clone(),
                    relation: None,
                    datum: scope,
                },
                key: scope,
            }]);
        };
        if !self.context.is_complete(scope, relation) {
            return Err(ResolutionError::IncompleteData { scope, relation });
        }
        let mut out = Vec::new();
        for datum in self.context.data(scope, relation) {
            let components = self.terms.children(datum);
            if components.len() != ty.arity() {
                return Err(ResolutionError::WrongArity {
                    expected: ty.arity(),
                    found: components.len(),
                });
            }
            let key = if ty.input_arity == 1 {
                components[0]
            } else {
                self.terms.tuple(components[..ty.input_arity].iter().copied())
            };
            if self.context.data_wf(key)? {
                out.push(Answer {
                    path: ResolutionPath {
                        path: path.clone(),
                        relation: Some(relation),
                        datum,
                    },
                    key,
                });
            }
        }
        Ok(out)
    }
}
