use super::*;
use crate::test_utils::{setup, var};

// ========== RULES ==========

#[test]
fn rules_keep_declaration_order() {
    let terms = setup();
    let first = Rule::new("ok", vec![terms.int(1)], Constraint::trivial());
    let second = Rule::new("ok", vec![terms.int(2)], Constraint::fail());
    let spec = Spec::new().with_rule(first.clone()).with_rule(second.clone());
    assert_eq!(spec.rules("ok"), &[first, second]);
    assert!(spec.rules("missing").is_empty());
    assert_eq!(spec.rule_names().collect::<Vec<_>>(), vec!["ok"]);
}

#[test]
fn has_guard_only_when_guard_is_not_true() {
    let terms = setup();
    let (_, x) = var(&terms, "x");
    let plain = Rule::new("r", vec![x], Constraint::trivial());
    assert!(!plain.has_guard());
    let guarded = plain.with_guard(Vec::new(), Constraint::equal(x, terms.int(0)));
    assert!(guarded.has_guard());
}

#[test]
fn rule_free_vars_exclude_bound_ones() {
    let terms = setup();
    let (_, x) = var(&terms, "x");
    let (g, tg) = var(&terms, "g");
    let (b, tb) = var(&terms, "b");
    let (captured, tc) = var(&terms, "c");
    let rule = Rule::new(
        "r",
        vec![terms.appl1("f", x)],
        Constraint::conj(Constraint::equal(tb, tc), Constraint::equal(x, tb)),
    )
    .with_guard(vec![g], Constraint::equal(tg, x))
    .with_body_vars(vec![b]);

    let free = rule.free_vars(&terms);
    assert_eq!(free.len(), 1);
    assert!(free.contains(&captured));
}

#[test]
fn rule_apply_only_touches_captured_vars() {
    let terms = setup();
    let (x, tx) = var(&terms, "x");
    let (c, tc) = var(&terms, "c");
    let rule = Rule::lambda(vec![tx], Constraint::equal(tx, tc));
    let subst: Subst = [(x, terms.int(1)), (c, terms.int(2))].into_iter().collect();
    let applied = rule.apply(&subst, &terms);
    assert_eq!(applied.params, vec![tx]);
    assert_eq!(applied.body, Constraint::equal(tx, terms.int(2)));
}

#[test]
fn rule_format_shows_guard_and_body_vars() {
    let terms = setup();
    let (_, x) = var(&terms, "x");
    let (g, tg) = var(&terms, "g");
    let (b, tb) = var(&terms, "b");
    let rule = Rule::new("r", vec![x], Constraint::equal(x, tb))
        .with_guard(vec![g], Constraint::equal(tg, x))
        .with_body_vars(vec![b]);
    assert_eq!(
        rule.format(&terms),
        "r(?x) | {?g} ?g == ?x :- {?b} ?x == ?b."
    );

    let lambda = Rule::lambda(vec![x], Constraint::trivial());
    assert_eq!(lambda.format(&terms), "{ ?x :- true }");
}

// ========== RELATIONS AND LABELS ==========

#[test]
fn relations_record_arity() {
    let terms = setup();
    let rel = terms.appl0("type");
    let mut spec = Spec::new();
    spec.add_relation(rel, 1, 1);
    let ty = spec.relation(rel).expect("declared");
    assert_eq!(ty.arity(), 2);
    assert!(spec.relation(terms.appl0("other")).is_none());
}

#[test]
fn labels_are_deduplicated() {
    let terms = setup();
    let p = terms.appl0("P");
    let i = terms.appl0("I");
    let mut spec = Spec::new();
    spec.add_label(p);
    spec.add_label(i);
    spec.add_label(p);
    assert_eq!(spec.labels(), &[p, i]);
}

// ========== SCOPE EXTENSIONS ==========

#[test]
fn add_scope_extension_reports_novelty() {
    let terms = setup();
    let p = terms.appl0("P");
    let mut spec = Spec::new();
    assert!(spec.add_scope_extension("decl", 0, p));
    assert!(!spec.add_scope_extension("decl", 0, p));
    assert_eq!(spec.scope_extensions("decl"), &[(0, p)]);
}

#[test]
fn scope_extensions_from_direct_tells() {
    let terms = setup();
    let (_, s) = var(&terms, "s");
    let (_, t) = var(&terms, "t");
    let p = terms.appl0("P");
    let rel = terms.appl0("var");
    let body = Constraint::conj(
        Constraint::tell_edge(s, p, t),
        Constraint::tell_rel(s, rel, vec![terms.string("x")]),
    );
    let mut spec = Spec::new().with_rule(Rule::new("decl", vec![s, t], body));
    spec.compute_scope_extensions(&terms);

    let ext = spec.scope_extensions("decl");
    assert_eq!(ext.len(), 2);
    assert!(ext.contains(&(0, p)));
    assert!(ext.contains(&(0, rel)));
}

#[test]
fn scope_extensions_propagate_through_calls() {
    let terms = setup();
    let (_, s) = var(&terms, "s");
    let (_, u) = var(&terms, "u");
    let p = terms.appl0("P");
    // outer(s) calls middle(s), middle(u) calls inner(u), inner(s) tells s -P->.
    let spec = Spec::new()
        .with_rule(Rule::new("outer", vec![terms.int(0), s], Constraint::user("middle", vec![s])))
        .with_rule(Rule::new("middle", vec![u], Constraint::user("inner", vec![u])))
        .with_rule(Rule::new("inner", vec![s], Constraint::tell_edge(s, p, s)));
    let mut spec = spec;
    spec.compute_scope_extensions(&terms);

    assert_eq!(spec.scope_extensions("inner"), &[(0, p)]);
    assert_eq!(spec.scope_extensions("middle"), &[(0, p)]);
    assert_eq!(spec.scope_extensions("outer"), &[(1, p)]);
}

#[test]
fn scope_extensions_skip_shadowed_params() {
    let terms = setup();
    let (sv, s) = var(&terms, "s");
    let p = terms.appl0("P");
    let body = Constraint::exists(vec![sv], Constraint::tell_edge(s, p, s));
    let mut spec = Spec::new().with_rule(Rule::new("local", vec![s], body));
    spec.compute_scope_extensions(&terms);
    assert!(spec.scope_extensions("local").is_empty());
}

#[test]
fn scope_extensions_ignore_non_variable_params() {
    let terms = setup();
    let p = terms.appl0("P");
    let fixed = terms.appl0("root");
    let mut spec = Spec::new().with_rule(Rule::new(
        "fixed",
        vec![fixed],
        Constraint::tell_edge(fixed, p, fixed),
    ));
    spec.compute_scope_extensions(&terms);
    assert!(spec.scope_extensions("fixed").is_empty());
}
