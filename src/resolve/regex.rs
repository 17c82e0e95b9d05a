//! Regular expressions over edge labels, stepped by Brzozowski derivatives.

use crate::term::{format_term, TermId, TermStore};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LabelRegex {
    /// Matches nothing.
    Empty,
    /// Matches the empty path.
    Epsilon,
    Label(TermId),
    Concat(Box<LabelRegex>, Box<LabelRegex>),
    Or(Box<LabelRegex>, Box<LabelRegex>),
    And(Box<LabelRegex>, Box<LabelRegex>),
    Star(Box<LabelRegex>),
    Complement(Box<LabelRegex>),
}

impl LabelRegex {
    pub fn label(label: TermId) -> Self {
        LabelRegex::Label(label)
    }

    pub fn concat(left: LabelRegex, right: LabelRegex) -> Self {
        match (left, right) {
            (LabelRegex::Empty, _) | (_, LabelRegex::Empty) => LabelRegex::Empty,
            (LabelRegex::Epsilon, r) | (r, LabelRegex::Epsilon) => r,
            (l, r) => LabelRegex::Concat(Box::new(l), Box::new(r)),
        }
    }

    pub fn or(left: LabelRegex, right: LabelRegex) -> Self {
        match (left, right) {
            (LabelRegex::Empty, r) | (r, LabelRegex::Empty) => r,
            (l, r) if l == r => l,
            (l, r) => LabelRegex::Or(Box::new(l), Box::new(r)),
        }
    }

    pub fn and(left: LabelRegex, right: LabelRegex) -> Self {
        match (left, right) {
            (LabelRegex::Empty, _) | (_, LabelRegex::Empty) => LabelRegex::Empty,
            (l, r) if l == r => l,
            (l, r) => LabelRegex::And(Box::new(l), Box::new(r)),
        }
    }

    pub fn star(inner: LabelRegex) -> Self {
        match inner {
            LabelRegex::Empty | LabelRegex::Epsilon => LabelRegex::Epsilon,
            s @ LabelRegex::Star(_) => s,
            r => LabelRegex::Star(Box::new(r)),
        }
    }

    pub fn complement(inner: LabelRegex) -> Self {
        match inner {
            LabelRegex::Complement(r) => *r,
            r => LabelRegex::Complement(Box::new(r)),
        }
    }

    /// `r+` as `r r*`.
    pub fn plus(inner: LabelRegex) -> Self {
        Self::concat(inner.clone(), Self::star(inner))
    }

    /// `r?` as `e | r`.
    pub fn optional(inner: LabelRegex) -> Self {
        Self::or(LabelRegex::Epsilon, inner)
    }

    /// Concatenation of a label sequence.
    pub fn path(labels: &[TermId]) -> Self {
        labels
            .iter()
            .rev()
            .fold(LabelRegex::Epsilon, |acc, l| Self::concat(LabelRegex::Label(*l), acc))
    }

    /// Does the regex accept the empty path?
    pub fn nullable(&self) -> bool {
        match self {
            LabelRegex::Empty | LabelRegex::Label(_) => false,
            LabelRegex::Epsilon | LabelRegex::Star(_) => true,
            LabelRegex::Concat(l, r) | LabelRegex::And(l, r) => l.nullable() && r.nullable(),
            LabelRegex::Or(l, r) => l.nullable() || r.nullable(),
            LabelRegex::Complement(r) => !r.nullable(),
        }
    }

    /// The regex accepting `w` exactly when `self` accepts `label w`.
    pub fn derive(&self, label: TermId) -> LabelRegex {
        match self {
            LabelRegex::Empty | LabelRegex::Epsilon => LabelRegex::Empty,
            LabelRegex::Label(l) => {
                if *l == label {
                    LabelRegex::Epsilon
                } else {
                    LabelRegex::Empty
                }
            }
            LabelRegex::Concat(l, r) => {
                let first = Self::concat(l.derive(label), (**r).clone());
                if l.nullable() {
                    Self::or(first, r.derive(label))
                } else {
                    first
                }
            }
            LabelRegex::Or(l, r) => Self::or(l.derive(label), r.derive(label)),
            LabelRegex::And(l, r) => Self::and(l.derive(label), r.derive(label)),
            LabelRegex::Star(r) => Self::concat(r.derive(label), Self::star((**r).clone())),
            LabelRegex::Complement(r) => Self::complement(r.derive(label)),
        }
    }

    /// Syntactic emptiness. Complements are never considered empty.
    pub fn is_empty(&self) -> bool {
        match self {
            LabelRegex::Empty => true,
            LabelRegex::Epsilon
            | LabelRegex::Label(_)
            | LabelRegex::Star(_)
            | LabelRegex::Complement(_) => false,
            LabelRegex::Concat(l, r) => l.is_empty() || r.is_empty(),
            LabelRegex::Or(l, r) => l.is_empty() && r.is_empty(),
            LabelRegex::And(l, r) => l.is_empty() || r.is_empty(),
        }
    }

    /// Does the regex accept the whole label sequence?
    pub fn accepts(&self, labels: &[TermId]) -> bool {
        let mut current = self.clone();
        for label in labels {
            current = current.derive(*label);
            if current.is_empty() {
                return false;
            }
        }
        current.nullable()
    }

    pub fn format(&self, terms: &TermStore) -> String {
        match self {
            LabelRegex::Empty => "0".to_string(),
            LabelRegex::Epsilon => "e".to_string(),
            LabelRegex::Label(l) => format_term(*l, terms),
            LabelRegex::Concat(l, r) => format!("{} {}", l.format(terms), r.format(terms)),
            LabelRegex::Or(l, r) => format!("({} | {})", l.format(terms), r.format(terms)),
            LabelRegex::And(l, r) => format!("({} & {})", l.format(terms), r.format(terms)),
            LabelRegex::Star(r) => format!("({})*", r.format(terms)),
            LabelRegex::Complement(r) => format!("~({})", r.format(terms)),
        }
    }
}
