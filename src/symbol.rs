//! Interned names.
//!
//! Operators, string literals, variable names and resource names all live
//! in one interner shared by a `TermStore`. The tuple operator is the
//! empty name.

use lasso::{Spur, ThreadedRodeo};

/// Interned name id.
pub type FuncId = Spur;

/// Separator between a name and the counter a fresh-name supply appends.
pub const FRESH_SEPARATOR: char = '-';

/// The part of `name` before any freshness suffix: `x-3` becomes `x`.
pub fn base_of(name: &str) -> &str {
    name.split(FRESH_SEPARATOR).next().unwrap_or(name)
}

pub struct SymbolStore {
    rodeo: ThreadedRodeo,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    pub fn intern(&self, name: &str) -> FuncId {
        self.rodeo.get_or_intern(name)
    }

    /// None for ids minted by another store.
    pub fn resolve(&self, id: FuncId) -> Option<&str> {
        self.rodeo.try_resolve(&id)
    }

    /// Like `resolve`, with the empty name for foreign ids.
    pub fn name(&self, id: FuncId) -> &str {
        self.resolve(id).unwrap_or("")
    }

    /// The name of `id` without its freshness suffix, used to derive
    /// readable names for renamed variables and new scopes.
    pub fn base_name(&self, id: FuncId) -> &str {
        base_of(self.name(id))
    }

    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

impl Default for SymbolStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/symbol.rs"]
mod tests;
