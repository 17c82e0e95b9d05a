use super::*;
use crate::test_utils::{setup, var};
use crate::unify::Unifier;

fn subst_of(pairs: &[(TermVar, TermId)]) -> Subst {
    pairs.iter().copied().collect()
}

// ========== BUILDERS ==========

#[test]
fn conj_all_of_nothing_is_true() {
    let c = Constraint::conj_all(Vec::new());
    assert_eq!(c.kind, ConstraintKind::True);
}

#[test]
fn conj_all_of_one_is_that_constraint() {
    let terms = setup();
    let a = terms.int(1);
    let c = Constraint::conj_all(vec![Constraint::equal(a, a)]);
    assert_eq!(c, Constraint::equal(a, a));
}

#[test]
fn conj_all_nests_to_the_right() {
    let terms = setup();
    let (a, b, c) = (terms.int(1), terms.int(2), terms.int(3));
    let all = Constraint::conj_all(vec![
        Constraint::equal(a, a),
        Constraint::equal(b, b),
        Constraint::equal(c, c),
    ]);
    let expected = Constraint::conj(
        Constraint::equal(a, a),
        Constraint::conj(Constraint::equal(b, b), Constraint::equal(c, c)),
    );
    assert_eq!(all, expected);
}

#[test]
fn inherit_cause_keeps_existing_cause() {
    let own = Arc::new(Constraint::fail());
    let other = Some(Arc::new(Constraint::trivial()));
    let c = Constraint::trivial()
        .with_cause(Some(own.clone()))
        .inherit_cause(&other);
    assert_eq!(c.cause, Some(own));

    let fresh = Constraint::trivial().inherit_cause(&other);
    assert_eq!(fresh.cause, other);
}

// ========== CAUSES AND MESSAGES ==========

#[test]
fn causes_are_listed_nearest_first() {
    let root = Arc::new(Constraint::user("root", Vec::new()));
    let middle = Arc::new(Constraint::user("middle", Vec::new()).with_cause(Some(root.clone())));
    let leaf = Constraint::fail().with_cause(Some(middle.clone()));

    let causes = leaf.causes();
    assert_eq!(causes.len(), 2);
    assert_eq!(causes[0], middle);
    assert_eq!(causes[1], root);
}

#[test]
fn find_message_prefers_own_message() {
    let parent = Arc::new(Constraint::trivial().with_message(Message::error("parent")));
    let c = Constraint::fail()
        .with_message(Message::warning("own"))
        .with_cause(Some(parent));
    let message = c.find_message().expect("has a message");
    assert_eq!(message.kind, MessageKind::Warning);
    assert_eq!(message.parts, vec![MessagePart::Text("own".to_string())]);
}

#[test]
fn find_message_walks_causes() {
    let root = Arc::new(Constraint::trivial().with_message(Message::note("from root")));
    let middle = Arc::new(Constraint::trivial().with_cause(Some(root)));
    let c = Constraint::fail().with_cause(Some(middle));
    let message = c.find_message().expect("inherited message");
    assert_eq!(message.kind, MessageKind::Note);
}

#[test]
fn find_message_none_without_messages() {
    let c = Constraint::fail().with_cause(Some(Arc::new(Constraint::trivial())));
    assert!(c.find_message().is_none());
}

#[test]
fn message_format_instantiates_terms() {
    let terms = setup();
    let (x, tx) = var(&terms, "x");
    let mut unifier = Unifier::default();
    unifier = unifier
        .unify(tx, terms.int(7), &terms)
        .expect("no occurs failure")
        .expect("unifies")
        .unifier;
    let message = Message::error("expected ")
        .with_term(terms.var_term(x))
        .with_text(" here");
    assert_eq!(message.format(&unifier, &terms), "expected 7 here");
}

// ========== SUBSTITUTION ==========

#[test]
fn apply_replaces_free_vars() {
    let terms = setup();
    let (x, tx) = var(&terms, "x");
    let one = terms.int(1);
    let c = Constraint::equal(tx, terms.appl1("f", tx));
    let applied = c.apply(&subst_of(&[(x, one)]), &terms);
    assert_eq!(applied, Constraint::equal(one, terms.appl1("f", one)));
}

#[test]
fn apply_respects_exists_binder() {
    let terms = setup();
    let (x, tx) = var(&terms, "x");
    let (_, ty) = var(&terms, "y");
    let one = terms.int(1);
    let c = Constraint::conj(
        Constraint::equal(tx, ty),
        Constraint::exists(vec![x], Constraint::equal(tx, ty)),
    );
    let applied = c.apply(&subst_of(&[(x, one)]), &terms);
    let expected = Constraint::conj(
        Constraint::equal(one, ty),
        Constraint::exists(vec![x], Constraint::equal(tx, ty)),
    );
    assert_eq!(applied, expected);
}

#[test]
fn apply_respects_inequality_universals() {
    let terms = setup();
    let (x, tx) = var(&terms, "x");
    let (y, ty) = var(&terms, "y");
    let c = Constraint::inequal_forall(vec![x], tx, ty);
    let applied = c.apply(&subst_of(&[(x, terms.int(1)), (y, terms.int(2))]), &terms);
    assert_eq!(applied, Constraint::inequal_forall(vec![x], tx, terms.int(2)));
}

#[test]
fn apply_substitutes_message_terms_and_keeps_cause() {
    let terms = setup();
    let (x, tx) = var(&terms, "x");
    let cause = Some(Arc::new(Constraint::user("c", Vec::new())));
    let c = Constraint::fail()
        .with_message(Message::error("bad ").with_term(tx).with_origin(tx))
        .with_cause(cause.clone());
    let applied = c.apply(&subst_of(&[(x, terms.int(3))]), &terms);
    let message = applied.message.expect("message kept");
    assert_eq!(message.parts[1], MessagePart::Term(terms.int(3)));
    assert_eq!(message.origin, Some(terms.int(3)));
    assert_eq!(applied.cause, cause);
}

#[test]
fn apply_leaves_lambda_params_alone() {
    let terms = setup();
    let (x, tx) = var(&terms, "x");
    let (y, ty) = var(&terms, "y");
    let lambda = Rule::lambda(vec![tx], Constraint::equal(tx, ty));
    let c = Constraint::query(Query {
        relation: None,
        filter: QueryFilter {
            label_wf: LabelRegex::Epsilon,
            data_wf: DataPredicate::Rule(Box::new(lambda)),
        },
        min: QueryMin {
            label_order: LabelOrder::none(),
            data_equiv: DataPredicate::Never,
        },
        scope: terms.appl0("s"),
        result: terms.appl0("r"),
    });
    let applied = c.apply(&subst_of(&[(x, terms.int(1)), (y, terms.int(2))]), &terms);
    let ConstraintKind::ResolveQuery(query) = applied.kind else {
        panic!("still a query");
    };
    let DataPredicate::Rule(rule) = query.filter.data_wf else {
        panic!("still a lambda");
    };
    assert_eq!(rule.params, vec![tx]);
    assert_eq!(rule.body, Constraint::equal(tx, terms.int(2)));
}

#[test]
fn instantiate_uses_unifier_bindings() {
    let terms = setup();
    let (_, tx) = var(&terms, "x");
    let unifier = Unifier::default()
        .unify(tx, terms.int(5), &terms)
        .expect("no occurs failure")
        .expect("unifies")
        .unifier;
    let c = Constraint::user("p", vec![terms.appl1("f", tx)]);
    let instantiated = c.instantiate(&unifier, &terms);
    assert_eq!(
        instantiated,
        Constraint::user("p", vec![terms.appl1("f", terms.int(5))])
    );
}

// ========== VARIABLES ==========

#[test]
fn free_vars_exclude_exists_bound() {
    let terms = setup();
    let (x, tx) = var(&terms, "x");
    let (y, ty) = var(&terms, "y");
    let c = Constraint::exists(vec![x], Constraint::equal(tx, ty));
    let free = c.free_vars(&terms);
    assert!(free.contains(&y));
    assert!(!free.contains(&x));
}

#[test]
fn free_vars_exclude_inequality_universals() {
    let terms = setup();
    let (x, tx) = var(&terms, "x");
    let (y, ty) = var(&terms, "y");
    let free = Constraint::inequal_forall(vec![x], tx, ty).free_vars(&terms);
    assert_eq!(free.len(), 1);
    assert!(free.contains(&y));
}

#[test]
fn free_vars_cover_nested_kinds() {
    let terms = setup();
    let (a, ta) = var(&terms, "a");
    let (b, tb) = var(&terms, "b");
    let (c, tc) = var(&terms, "c");
    let label = terms.appl0("P");
    let constraint = Constraint::conj_all(vec![
        Constraint::tell_edge(ta, label, tb),
        Constraint::try_body(Constraint::user("q", vec![tc])),
    ]);
    let free = constraint.free_vars(&terms);
    assert!(free.contains(&a) && free.contains(&b) && free.contains(&c));
}

// ========== CRITICAL EDGES ==========

#[test]
fn critical_edges_of_tells() {
    let terms = setup();
    let s = terms.appl0("s");
    let p = terms.appl0("P");
    let rel = terms.appl0("var");
    let spec = Spec::new();
    let c = Constraint::conj(
        Constraint::tell_edge(s, p, terms.appl0("t")),
        Constraint::exists(Vec::new(), Constraint::tell_rel(s, rel, vec![terms.int(1)])),
    );
    assert_eq!(c.critical_edges(&spec), vec![(s, p), (s, rel)]);
}

#[test]
fn critical_edges_of_user_follow_scope_extensions() {
    let terms = setup();
    let s = terms.appl0("s");
    let p = terms.appl0("P");
    let mut spec = Spec::new();
    spec.add_scope_extension("declare", 1, p);
    let c = Constraint::user("declare", vec![terms.int(0), s]);
    assert_eq!(c.critical_edges(&spec), vec![(s, p)]);
    assert!(Constraint::user("other", vec![s]).critical_edges(&spec).is_empty());
}

#[test]
fn critical_edges_ignore_try_and_queries() {
    let terms = setup();
    let s = terms.appl0("s");
    let p = terms.appl0("P");
    let c = Constraint::try_body(Constraint::tell_edge(s, p, s));
    assert!(c.critical_edges(&Spec::new()).is_empty());
}

// ========== DISPLAY ==========

#[test]
fn format_basic_kinds() {
    let terms = setup();
    let (x, tx) = var(&terms, "x");
    let one = terms.int(1);
    assert_eq!(Constraint::equal(tx, one).format(&terms), "?x == 1");
    assert_eq!(Constraint::inequal(tx, one).format(&terms), "?x != 1");
    assert_eq!(
        Constraint::inequal_forall(vec![x], tx, one).format(&terms),
        "forall ?x. ?x != 1"
    );
    assert_eq!(
        Constraint::exists(vec![x], Constraint::trivial()).format(&terms),
        "{?x} true"
    );
    assert_eq!(
        Constraint::conj(Constraint::trivial(), Constraint::fail()).format(&terms),
        "true, false"
    );
    assert_eq!(
        Constraint::user("typeOf", vec![tx, one]).format(&terms),
        "typeOf(?x, 1)"
    );
    assert_eq!(
        Constraint::try_body(Constraint::fail()).format(&terms),
        "try { false }"
    );
}

#[test]
fn format_scope_graph_kinds() {
    let terms = setup();
    let (_, ts) = var(&terms, "s");
    let p = terms.appl0("P");
    let rel = terms.appl0("type");
    assert_eq!(
        Constraint::tell_edge(ts, p, terms.appl0("t")).format(&terms),
        "?s -P()-> t()"
    );
    assert_eq!(
        Constraint::tell_rel(ts, rel, vec![terms.string("x"), terms.int(1)]).format(&terms),
        "!type()[\"x\", 1] in ?s"
    );
    assert_eq!(
        Constraint::path_proj(ts, PathProjection::Dst, ts).format(&terms),
        "dst(?s, ?s)"
    );
    assert_eq!(Constraint::new_scopes(vec![ts]).format(&terms), "new ?s");
}
