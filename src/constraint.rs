//! Constraint language.
//!
//! A [`Constraint`] is an immutable tree. Every node may carry the
//! constraint that produced it (`cause`) and a user [`Message`] used when it
//! fails. Substitution builds a new tree and respects binders: `Exists`
//! variables and the bound variables of rule lambdas are never replaced.

use crate::diagnostic::MessageKind;
use crate::resolve::order::LabelOrder;
use crate::resolve::regex::LabelRegex;
use crate::spec::{Rule, Spec};
use crate::subst::Subst;
use crate::symbol::FuncId;
use crate::term::{format_term, format_var, TermId, TermStore, TermVar};
use crate::unify::Unifier;
use im::OrdSet;
use std::sync::Arc;

/// A piece of a user message: literal text or an embedded term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessagePart {
    Text(String),
    Term(TermId),
}

/// User-supplied diagnostic attached to a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    pub kind: MessageKind,
    pub parts: Vec<MessagePart>,
    /// Term whose AST index locates the message.
    pub origin: Option<TermId>,
}

impl Message {
    pub fn new(kind: MessageKind, text: &str) -> Self {
        Message {
            kind,
            parts: vec![MessagePart::Text(text.to_string())],
            origin: None,
        }
    }

    pub fn error(text: &str) -> Self {
        Self::new(MessageKind::Error, text)
    }

    pub fn warning(text: &str) -> Self {
        Self::new(MessageKind::Warning, text)
    }

    pub fn note(text: &str) -> Self {
        Self::new(MessageKind::Note, text)
    }

    pub fn with_term(mut self, term: TermId) -> Self {
        self.parts.push(MessagePart::Term(term));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.parts.push(MessagePart::Text(text.to_string()));
        self
    }

    pub fn with_origin(mut self, origin: TermId) -> Self {
        self.origin = Some(origin);
        self
    }

    fn apply(&self, subst: &Subst, terms: &TermStore) -> Message {
        Message {
            kind: self.kind,
            parts: self
                .parts
                .iter()
                .map(|part| match part {
                    MessagePart::Text(text) => MessagePart::Text(text.clone()),
                    MessagePart::Term(term) => MessagePart::Term(subst.apply(*term, terms)),
                })
                .collect(),
            origin: self.origin.map(|origin| subst.apply(origin, terms)),
        }
    }

    /// Render with embedded terms instantiated by the unifier.
    pub fn format(&self, unifier: &Unifier, terms: &TermStore) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                MessagePart::Text(text) => text.clone(),
                MessagePart::Term(term) => {
                    format_term(unifier.find_recursive(*term, terms), terms)
                }
            })
            .collect()
    }
}

/// Predicate over data, used for data well-formedness (one argument) and
/// data equivalence (two arguments) in queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataPredicate {
    Always,
    Never,
    /// Holds when the lambda's body is entailed for the arguments.
    Rule(Box<Rule>),
}

impl DataPredicate {
    fn apply(&self, subst: &Subst, terms: &TermStore) -> DataPredicate {
        match self {
            DataPredicate::Rule(rule) => DataPredicate::Rule(Box::new(rule.apply(subst, terms))),
            other => other.clone(),
        }
    }

    fn free_vars(&self, terms: &TermStore, out: &mut OrdSet<TermVar>) {
        if let DataPredicate::Rule(rule) = self {
            out.extend(rule.free_vars(terms));
        }
    }

    fn format(&self, terms: &TermStore) -> String {
        match self {
            DataPredicate::Always => "true".to_string(),
            DataPredicate::Never => "false".to_string(),
            DataPredicate::Rule(rule) => rule.format(terms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryFilter {
    pub label_wf: LabelRegex,
    pub data_wf: DataPredicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryMin {
    pub label_order: LabelOrder,
    pub data_equiv: DataPredicate,
}

/// Scope-graph query. Without a relation the datum of a path is its
/// target scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    pub relation: Option<TermId>,
    pub filter: QueryFilter,
    pub min: QueryMin,
    pub scope: TermId,
    pub result: TermId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathProjection {
    Src,
    Dst,
    Labels,
    Scopes,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    True,
    False,
    Conj(Box<Constraint>, Box<Constraint>),
    Exists(Vec<TermVar>, Box<Constraint>),
    Equal(TermId, TermId),
    Inequal {
        universals: Vec<TermVar>,
        left: TermId,
        right: TermId,
    },
    /// Bind each term to a fresh scope.
    New(Vec<TermId>),
    ResolveQuery(Box<Query>),
    TellEdge {
        source: TermId,
        label: TermId,
        target: TermId,
    },
    TellRel {
        scope: TermId,
        relation: TermId,
        datum: Vec<TermId>,
    },
    PathProj {
        path: TermId,
        projection: PathProjection,
        result: TermId,
    },
    AstId {
        term: TermId,
        id: TermId,
    },
    AstProperty {
        index: TermId,
        property: FuncId,
        value: TermId,
    },
    Try(Box<Constraint>),
    User {
        name: String,
        args: Vec<TermId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub cause: Option<Arc<Constraint>>,
    pub message: Option<Message>,
}

impl Constraint {
    pub fn new(kind: ConstraintKind) -> Self {
        Constraint {
            kind,
            cause: None,
            message: None,
        }
    }

    // ========== BUILDERS ==========

    pub fn trivial() -> Self {
        Self::new(ConstraintKind::True)
    }

    pub fn fail() -> Self {
        Self::new(ConstraintKind::False)
    }

    pub fn conj(left: Constraint, right: Constraint) -> Self {
        Self::new(ConstraintKind::Conj(Box::new(left), Box::new(right)))
    }

    /// Right-nested conjunction; `True` for no constraints.
    pub fn conj_all<I>(constraints: I) -> Self
    where
        I: IntoIterator<Item = Constraint>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut iter = constraints.into_iter().rev();
        match iter.next() {
            None => Self::trivial(),
            Some(last) => iter.fold(last, |acc, c| Self::conj(c, acc)),
        }
    }

    pub fn exists(vars: Vec<TermVar>, body: Constraint) -> Self {
        Self::new(ConstraintKind::Exists(vars, Box::new(body)))
    }

    pub fn equal(left: TermId, right: TermId) -> Self {
        Self::new(ConstraintKind::Equal(left, right))
    }

    pub fn inequal(left: TermId, right: TermId) -> Self {
        Self::new(ConstraintKind::Inequal {
            universals: Vec::new(),
            left,
            right,
        })
    }

    pub fn inequal_forall(universals: Vec<TermVar>, left: TermId, right: TermId) -> Self {
        Self::new(ConstraintKind::Inequal {
            universals,
            left,
            right,
        })
    }

    pub fn new_scopes(scopes: Vec<TermId>) -> Self {
        Self::new(ConstraintKind::New(scopes))
    }

    pub fn query(query: Query) -> Self {
        Self::new(ConstraintKind::ResolveQuery(Box::new(query)))
    }

    pub fn tell_edge(source: TermId, label: TermId, target: TermId) -> Self {
        Self::new(ConstraintKind::TellEdge {
            source,
            label,
            target,
        })
    }

    pub fn tell_rel(scope: TermId, relation: TermId, datum: Vec<TermId>) -> Self {
        Self::new(ConstraintKind::TellRel {
            scope,
            relation,
            datum,
        })
    }

    pub fn path_proj(path: TermId, projection: PathProjection, result: TermId) -> Self {
        Self::new(ConstraintKind::PathProj {
            path,
            projection,
            result,
        })
    }

    pub fn ast_id(term: TermId, id: TermId) -> Self {
        Self::new(ConstraintKind::AstId { term, id })
    }

    pub fn ast_property(index: TermId, property: FuncId, value: TermId) -> Self {
        Self::new(ConstraintKind::AstProperty {
            index,
            property,
            value,
        })
    }

    pub fn try_body(body: Constraint) -> Self {
        Self::new(ConstraintKind::Try(Box::new(body)))
    }

    pub fn user(name: &str, args: Vec<TermId>) -> Self {
        Self::new(ConstraintKind::User {
            name: name.to_string(),
            args,
        })
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }

    pub fn with_cause(mut self, cause: Option<Arc<Constraint>>) -> Self {
        self.cause = cause;
        self
    }

    /// Set the cause unless one is already present.
    pub fn inherit_cause(mut self, cause: &Option<Arc<Constraint>>) -> Self {
        if self.cause.is_none() {
            self.cause = cause.clone();
        }
        self
    }

    // ========== CAUSES AND MESSAGES ==========

    /// The chain of causes, nearest first.
    pub fn causes(&self) -> Vec<Arc<Constraint>> {
        let mut out = Vec::new();
        let mut current = self.cause.clone();
        while let Some(cause) = current {
            current = cause.cause.clone();
            out.push(cause);
        }
        out
    }

    /// The message of this constraint or of its nearest cause that has one.
    pub fn find_message(&self) -> Option<Message> {
        if let Some(message) = &self.message {
            return Some(message.clone());
        }
        self.causes().into_iter().find_map(|c| c.message.clone())
    }

    // ========== SUBSTITUTION ==========

    pub fn apply(&self, subst: &Subst, terms: &TermStore) -> Constraint {
        if subst.is_empty() {
            return self.clone();
        }
        let t = |term: &TermId| subst.apply(*term, terms);
        let kind = match &self.kind {
            ConstraintKind::True => ConstraintKind::True,
            ConstraintKind::False => ConstraintKind::False,
            ConstraintKind::Conj(left, right) => ConstraintKind::Conj(
                Box::new(left.apply(subst, terms)),
                Box::new(right.apply(subst, terms)),
            ),
            ConstraintKind::Exists(vars, body) => {
                let inner = subst.without(vars.iter());
                ConstraintKind::Exists(vars.clone(), Box::new(body.apply(&inner, terms)))
            }
            ConstraintKind::Equal(left, right) => ConstraintKind::Equal(t(left), t(right)),
            ConstraintKind::Inequal {
                universals,
                left,
                right,
            } => {
                let inner = subst.without(universals.iter());
                ConstraintKind::Inequal {
                    universals: universals.clone(),
                    left: inner.apply(*left, terms),
                    right: inner.apply(*right, terms),
                }
            }
            ConstraintKind::New(scopes) => ConstraintKind::New(scopes.iter().map(t).collect()),
            ConstraintKind::ResolveQuery(query) => ConstraintKind::ResolveQuery(Box::new(Query {
                relation: query.relation,
                filter: QueryFilter {
                    label_wf: query.filter.label_wf.clone(),
                    data_wf: query.filter.data_wf.apply(subst, terms),
                },
                min: QueryMin {
                    label_order: query.min.label_order.clone(),
                    data_equiv: query.min.data_equiv.apply(subst, terms),
                },
                scope: t(&query.scope),
                result: t(&query.result),
            })),
            ConstraintKind::TellEdge {
                source,
                label,
                target,
            } => ConstraintKind::TellEdge {
                source: t(source),
                label: *label,
                target: t(target),
            },
            ConstraintKind::TellRel {
                scope,
                relation,
                datum,
            } => ConstraintKind::TellRel {
                scope: t(scope),
                relation: *relation,
                datum: datum.iter().map(t).collect(),
            },
            ConstraintKind::PathProj {
                path,
                projection,
                result,
            } => ConstraintKind::PathProj {
                path: t(path),
                projection: *projection,
                result: t(result),
            },
            ConstraintKind::AstId { term, id } => ConstraintKind::AstId {
                term: t(term),
                id: t(id),
            },
            ConstraintKind::AstProperty {
                index,
                property,
                value,
            } => ConstraintKind::AstProperty {
                index: t(index),
                property: *property,
                value: t(value),
            },
            ConstraintKind::Try(body) => ConstraintKind::Try(Box::new(body.apply(subst, terms))),
            ConstraintKind::User { name, args } => ConstraintKind::User {
                name: name.clone(),
                args: args.iter().map(t).collect(),
            },
        };
        Constraint {
            kind,
            cause: self.cause.clone(),
            message: self.message.as_ref().map(|m| m.apply(subst, terms)),
        }
    }

    /// Replace free variables by their instantiation under the unifier.
    pub fn instantiate(&self, unifier: &Unifier, terms: &TermStore) -> Constraint {
        let subst: Subst = self
            .free_vars(terms)
            .into_iter()
            .map(|var| (var, unifier.find_recursive(terms.var_term(var), terms)))
            .collect();
        self.apply(&subst, terms)
    }

    // ========== VARIABLES ==========

    /// Variables not bound by an enclosing binder.
    pub fn free_vars(&self, terms: &TermStore) -> OrdSet<TermVar> {
        let mut out = OrdSet::new();
        self.collect_free_vars(terms, &mut out);
        out
    }

    fn collect_free_vars(&self, terms: &TermStore, out: &mut OrdSet<TermVar>) {
        let add = |term: TermId, out: &mut OrdSet<TermVar>| out.extend(terms.vars(term));
        match &self.kind {
            ConstraintKind::True | ConstraintKind::False => {}
            ConstraintKind::Conj(left, right) => {
                left.collect_free_vars(terms, out);
                right.collect_free_vars(terms, out);
            }
            ConstraintKind::Exists(vars, body) => {
                let inner = body.free_vars(terms);
                out.extend(inner.into_iter().filter(|v| !vars.contains(v)));
            }
            ConstraintKind::Equal(left, right) => {
                add(*left, out);
                add(*right, out);
            }
            ConstraintKind::Inequal {
                universals,
                left,
                right,
            } => {
                for term in [*left, *right] {
                    out.extend(
                        terms
                            .vars(term)
                            .into_iter()
                            .filter(|v| !universals.contains(v)),
                    );
                }
            }
            ConstraintKind::New(scopes) => scopes.iter().for_each(|s| add(*s, out)),
            ConstraintKind::ResolveQuery(query) => {
                add(query.scope, out);
                add(query.result, out);
                query.filter.data_wf.free_vars(terms, out);
                query.min.data_equiv.free_vars(terms, out);
            }
            ConstraintKind::TellEdge { source, target, .. } => {
                add(*source, out);
                add(*target, out);
            }
            ConstraintKind::TellRel { scope, datum, .. } => {
                add(*scope, out);
                datum.iter().for_each(|d| add(*d, out));
            }
            ConstraintKind::PathProj { path, result, .. } => {
                add(*path, out);
                add(*result, out);
            }
            ConstraintKind::AstId { term, id } => {
                add(*term, out);
                add(*id, out);
            }
            ConstraintKind::AstProperty { index, value, .. } => {
                add(*index, out);
                add(*value, out);
            }
            ConstraintKind::Try(body) => body.collect_free_vars(terms, out),
            ConstraintKind::User { args, .. } => args.iter().for_each(|a| add(*a, out)),
        }
    }

    /// Scope-graph extensions this constraint may still perform, as
    /// `(scope, label-or-relation)` pairs.
    pub fn critical_edges(&self, spec: &Spec) -> Vec<(TermId, TermId)> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(c) = stack.pop() {
            match &c.kind {
                ConstraintKind::Conj(left, right) => {
                    stack.push(right);
                    stack.push(left);
                }
                ConstraintKind::Exists(_, body) => stack.push(body),
                ConstraintKind::TellEdge { source, label, .. } => out.push((*source, *label)),
                ConstraintKind::TellRel {
                    scope, relation, ..
                } => out.push((*scope, *relation)),
                ConstraintKind::User { name, args } => {
                    for (index, label) in spec.scope_extensions(name) {
                        if let Some(arg) = args.get(*index) {
                            out.push((*arg, *label));
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }

    // ========== DISPLAY ==========

    pub fn format(&self, terms: &TermStore) -> String {
        let t = |term: &TermId| format_term(*term, terms);
        let symbols = terms.symbols();
        match &self.kind {
            ConstraintKind::True => "true".to_string(),
            ConstraintKind::False => "false".to_string(),
            ConstraintKind::Conj(left, right) => {
                format!("{}, {}", left.format(terms), right.format(terms))
            }
            ConstraintKind::Exists(vars, body) => {
                let vars: Vec<String> = vars.iter().map(|v| format_var(*v, symbols)).collect();
                format!("{{{}}} {}", vars.join(" "), body.format(terms))
            }
            ConstraintKind::Equal(left, right) => format!("{} == {}", t(left), t(right)),
            ConstraintKind::Inequal {
                universals,
                left,
                right,
            } => {
                if universals.is_empty() {
                    format!("{} != {}", t(left), t(right))
                } else {
                    let vars: Vec<String> =
                        universals.iter().map(|v| format_var(*v, symbols)).collect();
                    format!("forall {}. {} != {}", vars.join(" "), t(left), t(right))
                }
            }
            ConstraintKind::New(scopes) => {
                let scopes: Vec<String> = scopes.iter().map(t).collect();
                format!("new {}", scopes.join(" "))
            }
            ConstraintKind::ResolveQuery(query) => {
                let relation = match query.relation {
                    Some(rel) => t(&rel),
                    None => "()".to_string(),
                };
                format!(
                    "query {} filter {} and {} min {} and {} in {} |-> {}",
                    relation,
                    query.filter.label_wf.format(terms),
                    query.filter.data_wf.format(terms),
                    query.min.label_order.format(terms),
                    query.min.data_equiv.format(terms),
                    t(&query.scope),
                    t(&query.result)
                )
            }
            ConstraintKind::TellEdge {
                source,
                label,
                target,
            } => format!("{} -{}-> {}", t(source), t(label), t(target)),
            ConstraintKind::TellRel {
                scope,
                relation,
                datum,
            } => {
                let datum: Vec<String> = datum.iter().map(t).collect();
                format!("!{}[{}] in {}", t(relation), datum.join(", "), t(scope))
            }
            ConstraintKind::PathProj {
                path,
                projection,
                result,
            } => {
                let name = match projection {
                    PathProjection::Src => "src",
                    PathProjection::Dst => "dst",
                    PathProjection::Labels => "labels",
                    PathProjection::Scopes => "scopes",
                };
                format!("{}({}, {})", name, t(path), t(result))
            }
            ConstraintKind::AstId { term, id } => format!("astId({}, {})", t(term), t(id)),
            ConstraintKind::AstProperty {
                index,
                property,
                value,
            } => format!("@{}.{} := {}", t(index), symbols.name(*property), t(value)),
            ConstraintKind::Try(body) => format!("try {{ {} }}", body.format(terms)),
            ConstraintKind::User { name, args } => {
                let args: Vec<String> = args.iter().map(t).collect();
                format!("{}({})", name, args.join(", "))
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/constraint.rs"]
mod tests;
