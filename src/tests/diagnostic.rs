use super::*;
use crate::constraint::Message;
use crate::test_utils::{setup, var};
use crate::unify::Unifier;
use std::sync::Arc;

fn state_with(terms: &TermStore, left: TermId, right: TermId) -> State {
    let unifier = Unifier::default()
        .unify(left, right, terms)
        .expect("no occurs failure")
        .expect("terms unify")
        .unifier;
    let mut state = State::new("test");
    state.set_unifier(unifier);
    state
}

fn result_with(messages: Vec<Diagnostic>) -> SolverResult {
    SolverResult {
        state: State::new("test"),
        failed: Vec::new(),
        delays: Vec::new(),
        messages,
    }
}

// ========== TEXT ==========

#[test]
fn failed_without_message_renders_constraint() {
    let terms = setup();
    let c = Constraint::equal(terms.int(1), terms.int(2));
    let d = Diagnostic::failed(&c, None, &State::new("test"), &terms);
    assert_eq!(d.kind, MessageKind::Error);
    assert_eq!(d.text, "Failed: 1 == 2");
    assert!(d.location.is_none());
}

#[test]
fn failed_with_reason() {
    let terms = setup();
    let c = Constraint::user("check", Vec::new());
    let d = Diagnostic::failed(&c, Some("no rules for check"), &State::new("test"), &terms);
    assert_eq!(d.text, "no rules for check: check()");
}

#[test]
fn failed_renders_instantiated_terms() {
    let terms = setup();
    let (_, x) = var(&terms, "x");
    let state = state_with(&terms, x, terms.int(3));
    let c = Constraint::equal(x, terms.int(4));
    let d = Diagnostic::failed(&c, None, &state, &terms);
    assert_eq!(d.text, "Failed: 3 == 4");
}

#[test]
fn message_of_a_cause_wins_over_fallback() {
    let terms = setup();
    let (_, x) = var(&terms, "x");
    let state = state_with(&terms, x, terms.appl0("int"));
    let parent = Arc::new(
        Constraint::user("typeOf", vec![x])
            .with_message(Message::warning("unexpected type ").with_term(x)),
    );
    let c = Constraint::fail().with_cause(Some(parent));
    let d = Diagnostic::failed(&c, None, &state, &terms);
    assert_eq!(d.kind, MessageKind::Warning);
    assert_eq!(d.text, "unexpected type int()");
    assert!(!d.is_error());
    assert_eq!(d.causes, vec!["typeOf(int())".to_string()]);
}

#[test]
fn unsolved_names_what_it_waits_on() {
    let terms = setup();
    let (xv, x) = var(&terms, "x");
    let c = Constraint::user("p", vec![x]);
    let d = Diagnostic::unsolved(&c, &Delay::of_var(xv), &State::new("test"), &terms);
    assert_eq!(d.text, "Unsolved: p(?x) (waiting on ?x)");
    assert!(d.is_error());
}

// ========== LOCATION ==========

#[test]
fn location_from_indexed_argument() {
    let terms = setup();
    let index = TermIndex {
        resource: terms.intern_symbol("main.x"),
        id: 12,
    };
    let node = terms.with_index(terms.appl0("Var"), index);
    let c = Constraint::user("typeOf", vec![terms.int(0), node]);
    let d = Diagnostic::failed(&c, None, &State::new("test"), &terms);
    assert_eq!(d.location, Some(("main.x".to_string(), 12)));
    assert_eq!(d.origin, Some(node));
}

#[test]
fn location_falls_back_to_causes() {
    let terms = setup();
    let index = TermIndex {
        resource: terms.intern_symbol("f"),
        id: 1,
    };
    let node = terms.with_index(terms.appl0("Call"), index);
    let parent = Arc::new(Constraint::user("check", vec![node]));
    let c = Constraint::fail().with_cause(Some(parent));
    let d = Diagnostic::failed(&c, None, &State::new("test"), &terms);
    assert_eq!(d.location, Some(("f".to_string(), 1)));
}

#[test]
fn location_from_message_origin_through_unifier() {
    let terms = setup();
    let (_, x) = var(&terms, "x");
    let index = TermIndex {
        resource: terms.intern_symbol("g"),
        id: 5,
    };
    let node = terms.with_index(terms.appl0("Lit"), index);
    let state = state_with(&terms, x, node);
    let c = Constraint::fail().with_message(Message::error("bad literal").with_origin(x));
    let d = Diagnostic::failed(&c, None, &state, &terms);
    assert_eq!(d.location, Some(("g".to_string(), 5)));
}

// ========== RESULTS ==========

#[test]
fn result_filters_by_kind() {
    let terms = setup();
    let state = State::new("test");
    let error = Diagnostic::failed(&Constraint::fail(), None, &state, &terms);
    let warning = Diagnostic::failed(
        &Constraint::fail().with_message(Message::warning("w")),
        None,
        &state,
        &terms,
    );
    let note = Diagnostic::failed(
        &Constraint::fail().with_message(Message::note("n")),
        None,
        &state,
        &terms,
    );

    let result = result_with(vec![error, warning.clone(), note]);
    assert!(result.has_errors());
    assert_eq!(result.errors().count(), 1);
    assert_eq!(result.warnings().count(), 1);
    assert_eq!(result.notes().count(), 1);

    let quiet = result_with(vec![warning]);
    assert!(!quiet.has_errors());
    assert!(quiet.is_solved());
}

#[test]
fn result_json_report() {
    let terms = setup();
    let (xv, x) = var(&terms, "x");
    let state = State::new("test");
    let c = Constraint::user("p", vec![x]);
    let delay = Delay::of_var(xv);
    let mut result = result_with(vec![Diagnostic::unsolved(&c, &delay, &state, &terms)]);
    result.delays.push((c, delay));

    let json = result.to_json();
    assert_eq!(json["has_errors"], true);
    assert_eq!(json["unsolved"], 1);
    assert_eq!(json["messages"][0]["kind"], "error");
    assert_eq!(json["messages"][0]["text"], "Unsolved: p(?x) (waiting on ?x)");
    assert!(json["messages"][0].get("constraint").is_none());
    assert!(!result.is_solved());
}
