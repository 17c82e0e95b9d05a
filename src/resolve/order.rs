//! Label orders for shadowing.

use crate::term::{format_term, TermId, TermStore};

/// An edge label, or `$`: the end of a path where data is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeOrData {
    Edge(TermId),
    Data,
}

impl EdgeOrData {
    pub fn format(&self, terms: &TermStore) -> String {
        match self {
            EdgeOrData::Edge(label) => format_term(*label, terms),
            EdgeOrData::Data => "$".to_string(),
        }
    }
}

/// Strict partial order on [`EdgeOrData`]; `lt(a, b)` means results
/// through `a` shadow results through `b`.
///
/// Stored transitively closed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LabelOrder {
    pairs: Vec<(EdgeOrData, EdgeOrData)>,
}

impl LabelOrder {
    /// The empty order: nothing shadows anything.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new<I: IntoIterator<Item = (EdgeOrData, EdgeOrData)>>(pairs: I) -> Self {
        let mut order = Self::default();
        for (smaller, larger) in pairs {
            order.add(smaller, larger);
        }
        order
    }

    /// Add `smaller < larger` and close transitively.
    pub fn add(&mut self, smaller: EdgeOrData, larger: EdgeOrData) {
        let mut pending = vec![(smaller, larger)];
        while let Some((a, b)) = pending.pop() {
            if self.lt(a, b) {
                continue;
            }
            self.pairs.push((a, b));
            for &(x, y) in &self.pairs {
                if y == a {
                    pending.push((x, b));
                }
                if x == b {
                    pending.push((a, y));
                }
            }
        }
        self.pairs.sort();
    }

    pub fn lt(&self, a: EdgeOrData, b: EdgeOrData) -> bool {
        self.pairs.contains(&(a, b))
    }

    /// Labels of `labels` that nothing else in `labels` is larger than.
    pub fn max(&self, labels: &[EdgeOrData]) -> Vec<EdgeOrData> {
        labels
            .iter()
            .copied()
            .filter(|l| !labels.iter().any(|other| self.lt(*l, *other)))
            .collect()
    }

    /// Labels of `labels` smaller than `label`.
    pub fn smaller(&self, labels: &[EdgeOrData], label: EdgeOrData) -> Vec<EdgeOrData> {
        labels
            .iter()
            .copied()
            .filter(|l| self.lt(*l, label))
            .collect()
    }

    pub fn format(&self, terms: &TermStore) -> String {
        let pairs: Vec<String> = self
            .pairs
            .iter()
            .map(|(a, b)| format!("{} < {}", a.format(terms), b.format(terms)))
            .collect();
        format!("{{{}}}", pairs.join(", "))
    }
}
