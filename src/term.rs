use crate::symbol::{FuncId, SymbolStore};
use hashbrown::HashMap;
use parking_lot::RwLock;
use rustc_hash::FxHasher;
use smallvec::SmallVec;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Unique identifier for a term in the term store.
/// Structurally equal terms (with equal attachments) share one TermId.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(u32);

impl TermId {
    /// Get the raw u32 value (for debugging/display).
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// A unification variable: a name qualified by the resource that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermVar {
    pub resource: FuncId,
    pub name: FuncId,
}

/// Identifies the AST node a term was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermIndex {
    pub resource: FuncId,
    pub id: u32,
}

/// Host value carried opaquely inside a term.
///
/// Blobs compare by value equality and are never decomposed by unification.
pub trait BlobValue: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn BlobValue) -> bool;
    fn dyn_hash(&self, state: &mut dyn Hasher);
}

impl<T> BlobValue for T
where
    T: Any + fmt::Debug + Eq + Hash + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn BlobValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| other == self)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }
}

#[derive(Clone)]
pub struct Blob(Arc<dyn BlobValue>);

impl Blob {
    pub fn new<T: BlobValue>(value: T) -> Self {
        Blob(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().as_any().downcast_ref::<T>()
    }
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref().dyn_eq(other.0.as_ref())
    }
}

impl Eq for Blob {}

impl Hash for Blob {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_ref().dyn_hash(state);
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.0.as_ref(), f)
    }
}

/// A term node. Children are referenced by TermId.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// Constructor application. Tuples use the empty operator.
    Appl(FuncId, SmallVec<[TermId; 4]>),
    Cons(TermId, TermId),
    Nil,
    Str(FuncId),
    Int(i64),
    Blob(Blob),
    Var(TermVar),
}

/// Interned node: the term plus its optional AST attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Node {
    term: Term,
    index: Option<TermIndex>,
}

/// Number of shards for hashcons maps (power of 2 for fast modulo).
const NUM_SHARDS: usize = 16;

/// Thread-safe term store with hashconsing.
///
/// Guarantees:
/// - Structurally equal terms with equal attachments get the same TermId
/// - TermId can be resolved back to the term
/// - Interned terms never change, so a TermId is a frozen value
pub struct TermStore {
    symbols: SymbolStore,
    /// Central storage of all terms, indexed by TermId.
    nodes: RwLock<Vec<Node>>,
    /// Sharded hashcons maps for reducing contention.
    shards: [RwLock<HashMap<Node, TermId>>; NUM_SHARDS],
    next_id: AtomicU32,
}

impl TermStore {
    pub fn new() -> Self {
        let shards = std::array::from_fn(|_| RwLock::new(HashMap::new()));
        Self {
            symbols: SymbolStore::new(),
            nodes: RwLock::new(Vec::new()),
            shards,
            next_id: AtomicU32::new(0),
        }
    }

    pub fn symbols(&self) -> &SymbolStore {
        &self.symbols
    }

    pub fn intern_symbol(&self, name: &str) -> FuncId {
        self.symbols.intern(name)
    }

    fn intern(&self, node: Node) -> TermId {
        let shard = &self.shards[Self::shard_index(&node)];

        {
            let map = shard.read();
            if let Some(&id) = map.get(&node) {
                return id;
            }
        }

        let mut map = shard.write();
        if let Some(&id) = map.get(&node) {
            return id;
        }

        let id = TermId(self.next_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut nodes = self.nodes.write();
            let idx = id.0 as usize;
            if nodes.len() <= idx {
                nodes.resize(
                    idx + 1,
                    Node {
                        term: Term::Nil,
                        index: None,
                    },
                );
            }
            nodes[idx] = node.clone();
        }
        map.insert(node, id);
        id
    }

    fn plain(&self, term: Term) -> TermId {
        self.intern(Node { term, index: None })
    }

    // ========== CONSTRUCTORS ==========

    pub fn make_var(&self, resource: &str, name: &str) -> TermVar {
        TermVar {
            resource: self.symbols.intern(resource),
            name: self.symbols.intern(name),
        }
    }

    /// Create a variable term from a resource and a name.
    pub fn var(&self, resource: &str, name: &str) -> TermId {
        self.var_term(self.make_var(resource, name))
    }

    pub fn var_term(&self, var: TermVar) -> TermId {
        self.plain(Term::Var(var))
    }

    pub fn appl_id(&self, op: FuncId, args: SmallVec<[TermId; 4]>) -> TermId {
        self.plain(Term::Appl(op, args))
    }

    pub fn appl<I: IntoIterator<Item = TermId>>(&self, op: &str, args: I) -> TermId {
        self.appl_id(self.symbols.intern(op), args.into_iter().collect())
    }

    pub fn appl0(&self, op: &str) -> TermId {
        self.appl(op, [])
    }

    pub fn appl1(&self, op: &str, arg: TermId) -> TermId {
        self.appl(op, [arg])
    }

    pub fn appl2(&self, op: &str, left: TermId, right: TermId) -> TermId {
        self.appl(op, [left, right])
    }

    pub fn tuple<I: IntoIterator<Item = TermId>>(&self, args: I) -> TermId {
        self.appl("", args)
    }

    pub fn string(&self, value: &str) -> TermId {
        self.plain(Term::Str(self.symbols.intern(value)))
    }

    pub fn int(&self, value: i64) -> TermId {
        self.plain(Term::Int(value))
    }

    pub fn blob(&self, value: Blob) -> TermId {
        self.plain(Term::Blob(value))
    }

    pub fn nil(&self) -> TermId {
        self.plain(Term::Nil)
    }

    pub fn cons(&self, head: TermId, tail: TermId) -> TermId {
        self.plain(Term::Cons(head, tail))
    }

    /// Build a proper list from its elements.
    pub fn list(&self, items: &[TermId]) -> TermId {
        self.list_with_tail(items, self.nil())
    }

    pub fn list_with_tail(&self, items: &[TermId], tail: TermId) -> TermId {
        items
            .iter()
            .rev()
            .fold(tail, |acc, &item| self.cons(item, acc))
    }

    /// The same term carrying an AST index attachment.
    pub fn with_index(&self, id: TermId, index: TermIndex) -> TermId {
        match self.resolve(id) {
            Some(term) => self.intern(Node {
                term,
                index: Some(index),
            }),
            None => id,
        }
    }

    /// Rebuild a compound term with new children, keeping operator and attachment.
    pub fn rebuild(&self, id: TermId, children: &[TermId]) -> TermId {
        let node = {
            let nodes = self.nodes.read();
            match nodes.get(id.0 as usize) {
                Some(node) => node.clone(),
                None => return id,
            }
        };
        let term = match node.term {
            Term::Appl(op, _) => Term::Appl(op, children.iter().copied().collect()),
            Term::Cons(_, _) if children.len() == 2 => Term::Cons(children[0], children[1]),
            _ => return id,
        };
        self.intern(Node {
            term,
            index: node.index,
        })
    }

    // ========== INSPECTION ==========

    pub fn resolve(&self, id: TermId) -> Option<Term> {
        let nodes = self.nodes.read();
        nodes.get(id.0 as usize).map(|node| node.term.clone())
    }

    pub fn index_of(&self, id: TermId) -> Option<TermIndex> {
        let nodes = self.nodes.read();
        nodes.get(id.0 as usize).and_then(|node| node.index)
    }

    pub fn is_var(&self, id: TermId) -> Option<TermVar> {
        match self.resolve(id)? {
            Term::Var(var) => Some(var),
            _ => None,
        }
    }

    pub fn is_appl(&self, id: TermId) -> Option<(FuncId, SmallVec<[TermId; 4]>)> {
        match self.resolve(id)? {
            Term::Appl(op, args) => Some((op, args)),
            _ => None,
        }
    }

    pub fn as_blob(&self, id: TermId) -> Option<Blob> {
        match self.resolve(id)? {
            Term::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    pub fn as_str(&self, id: TermId) -> Option<&str> {
        match self.resolve(id)? {
            Term::Str(value) => self.symbols.resolve(value),
            _ => None,
        }
    }

    /// Direct sub-terms: application arguments or list head and tail.
    pub fn children(&self, id: TermId) -> SmallVec<[TermId; 4]> {
        match self.resolve(id) {
            Some(Term::Appl(_, args)) => args,
            Some(Term::Cons(head, tail)) => smallvec::smallvec![head, tail],
            _ => SmallVec::new(),
        }
    }

    /// Elements of a proper list, or None if the term is not a proper list.
    pub fn list_items(&self, id: TermId) -> Option<Vec<TermId>> {
        let mut items = Vec::new();
        let mut current = id;
        loop {
            match self.resolve(current)? {
                Term::Nil => return Some(items),
                Term::Cons(head, tail) => {
                    items.push(head);
                    current = tail;
                }
                _ => return None,
            }
        }
    }

    /// Distinct variables of a term in first-occurrence order.
    pub fn vars(&self, id: TermId) -> Vec<TermVar> {
        let mut out = Vec::new();
        let mut stack: SmallVec<[TermId; 16]> = SmallVec::new();
        stack.push(id);
        while let Some(t) = stack.pop() {
            match self.resolve(t) {
                Some(Term::Var(var)) => {
                    if !out.contains(&var) {
                        out.push(var);
                    }
                }
                Some(Term::Appl(_, args)) => stack.extend(args.iter().rev().copied()),
                Some(Term::Cons(head, tail)) => {
                    stack.push(tail);
                    stack.push(head);
                }
                _ => {}
            }
        }
        out
    }

    /// True when the term contains no variables at all.
    pub fn is_ground(&self, id: TermId) -> bool {
        self.vars(id).is_empty()
    }

    fn shard_index(node: &Node) -> usize {
        let mut hasher = FxHasher::default();
        node.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }
}

impl Default for TermStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a variable as `?name`, or `?resource-name` for a qualified one.
pub fn format_var(var: TermVar, symbols: &SymbolStore) -> String {
    let resource = symbols.name(var.resource);
    if resource.is_empty() {
        format!("?{}", symbols.name(var.name))
    } else {
        format!("?{}-{}", resource, symbols.name(var.name))
    }
}

/// Render a term in `f(a, "s", 1, [x | ?T])` notation.
pub fn format_term(term: TermId, terms: &TermStore) -> String {
    fn render(term: TermId, terms: &TermStore, out: &mut String) {
        let symbols = terms.symbols();
        match terms.resolve(term) {
            Some(Term::Var(var)) => out.push_str(&format_var(var, symbols)),
            Some(Term::Appl(op, args)) => {
                out.push_str(symbols.name(op));
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    render(*arg, terms, out);
                }
                out.push(')');
            }
            Some(Term::Nil) => out.push_str("[]"),
            Some(Term::Cons(head, tail)) => {
                out.push('[');
                render(head, terms, out);
                let mut rest = tail;
                loop {
                    match terms.resolve(rest) {
                        Some(Term::Nil) => break,
                        Some(Term::Cons(h, t)) => {
                            out.push_str(", ");
                            render(h, terms, out);
                            rest = t;
                        }
                        _ => {
                            out.push_str(" | ");
                            render(rest, terms, out);
                            break;
                        }
                    }
                }
                out.push(']');
            }
            Some(Term::Str(value)) => {
                out.push('"');
                out.push_str(symbols.name(value));
                out.push('"');
            }
            Some(Term::Int(value)) => out.push_str(&value.to_string()),
            Some(Term::Blob(blob)) => out.push_str(&format!("{:?}", blob)),
            None => out.push_str(&format!("<unknown {}>", term.raw())),
        }
    }

    let mut out = String::new();
    render(term, terms, &mut out);
    out
}

#[cfg(test)]
#[path = "tests/term.rs"]
mod tests;
