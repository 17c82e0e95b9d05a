use super::*;
use crate::test_utils::{setup, var};

#[test]
fn fresh_vars_are_distinct_and_recorded() {
    let terms = setup();
    let mut state = State::new("main");
    let a = state.fresh_var("x", &terms);
    let b = state.fresh_var("x", &terms);
    assert_ne!(a, b);
    assert!(state.vars().contains(&a) && state.vars().contains(&b));
    assert_eq!(terms.symbols().name(a.resource), "main");
    assert_eq!(terms.symbols().name(a.name), "x-0");
    assert_eq!(terms.symbols().name(b.name), "x-1");
}

#[test]
fn fresh_names_drop_previous_suffix() {
    let terms = setup();
    let mut state = State::new("main");
    let first = state.fresh_var("T", &terms);
    let base = terms.symbols().name(first.name).to_string();
    let second = state.fresh_var(&base, &terms);
    assert_eq!(terms.symbols().name(second.name), "T-1");
}

#[test]
fn freshen_renames_each_var() {
    let terms = setup();
    let (x, _) = var(&terms, "x");
    let (y, _) = var(&terms, "y");
    let mut state = State::new("r");
    let renamed = state.freshen(&[x, y], &terms);
    assert_eq!(renamed.len(), 2);
    assert_eq!(renamed[0].0, x);
    assert_eq!(renamed[1].0, y);
    assert_ne!(renamed[0].1, x);
    assert_eq!(terms.symbols().name(renamed[1].1.name), "y-1");
}

#[test]
fn fresh_scopes_are_ground_and_in_the_graph() {
    let terms = setup();
    let mut state = State::new("r");
    let s = state.fresh_scope("s", &terms);
    let t = state.fresh_scope("s", &terms);
    assert_ne!(s, t);
    assert!(terms.is_ground(s));
    assert!(state.scopes().contains(&s));
    assert!(state.scope_graph().scopes().contains(&t));
    assert_eq!(
        s,
        terms.appl2(SCOPE_OP, terms.string("r"), terms.string("s-0"))
    );
}

#[test]
fn clones_do_not_share_fresh_counter_effects() {
    let terms = setup();
    let mut state = State::new("r");
    let snapshot = state.clone();
    state.fresh_scope("s", &terms);
    assert!(snapshot.scopes().is_empty());
    assert_eq!(state.scopes().len(), 1);
}

#[test]
fn properties_are_set_once() {
    let terms = setup();
    let mut state = State::new("r");
    let index = TermIndex {
        resource: terms.intern_symbol("file"),
        id: 3,
    };
    let ty = terms.intern_symbol("type");
    assert!(state.property(index, ty).is_none());
    assert!(state.set_property(index, ty, terms.int(1)));
    assert!(!state.set_property(index, ty, terms.int(2)));
    assert_eq!(state.property(index, ty), Some(terms.int(1)));
    assert_eq!(state.properties().count(), 1);
}

#[test]
fn index_terms_read_back() {
    let terms = setup();
    let index = TermIndex {
        resource: terms.intern_symbol("file.x"),
        id: 42,
    };
    let term = index_term(index, &terms);
    assert!(terms.is_ground(term));
    assert_eq!(parse_index_term(term, &terms), Some(index));
}

#[test]
fn parse_index_term_rejects_other_terms() {
    let terms = setup();
    let (_, x) = var(&terms, "x");
    assert_eq!(parse_index_term(x, &terms), None);
    assert_eq!(parse_index_term(terms.appl0("TermIndex"), &terms), None);
    let negative = terms.appl2(TERM_INDEX_OP, terms.string("f"), terms.int(-1));
    assert_eq!(parse_index_term(negative, &terms), None);
}
