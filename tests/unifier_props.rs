use im::OrdSet;
use proptest::prelude::*;
use scopecheck::term::{TermId, TermStore, TermVar};
use scopecheck::unify::Unifier;

const MAX_VAR: u32 = 4;

const FUNCTOR_NAMES: [&str; 6] = ["a", "b", "c", "f", "g", "h"];

#[derive(Clone, Debug)]
enum RawTerm {
    Var(u32),
    App { f: usize, kids: Vec<RawTerm> },
}

fn raw_term_strategy() -> impl Strategy<Value = RawTerm> {
    let leaf = prop_oneof![
        (0..=MAX_VAR).prop_map(RawTerm::Var),
        Just(RawTerm::App { f: 0, kids: vec![] }),
        Just(RawTerm::App { f: 1, kids: vec![] }),
        Just(RawTerm::App { f: 2, kids: vec![] }),
    ];

    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(|t| RawTerm::App {
                f: 3,
                kids: vec![t]
            }),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| RawTerm::App {
                f: 4,
                kids: vec![a, b],
            }),
            (inner.clone(), inner).prop_map(|(a, b)| RawTerm::App {
                f: 5,
                kids: vec![a, b],
            }),
        ]
    })
}

fn var_of(terms: &TermStore, index: u32) -> TermVar {
    terms.make_var("", &format!("x{}", index))
}

fn build_term(raw: &RawTerm, terms: &TermStore) -> TermId {
    match raw {
        RawTerm::Var(index) => terms.var_term(var_of(terms, *index)),
        RawTerm::App { f, kids } => {
            let args: Vec<TermId> = kids.iter().map(|k| build_term(k, terms)).collect();
            terms.appl(FUNCTOR_NAMES[*f], args)
        }
    }
}

/// Unify, treating an occurs failure like a clash.
fn unify(u: &Unifier, left: TermId, right: TermId, terms: &TermStore) -> Option<Unifier> {
    match u.unify(left, right, terms) {
        Ok(Some(result)) => Some(result.unifier),
        _ => None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // ========== IDEMPOTENCE ==========

    #[test]
    fn unified_terms_become_equal(a in raw_term_strategy(), b in raw_term_strategy()) {
        let terms = TermStore::new();
        let left = build_term(&a, &terms);
        let right = build_term(&b, &terms);
        if let Some(u) = unify(&Unifier::new(true), left, right, &terms) {
            prop_assert_eq!(u.find_recursive(left, &terms), u.find_recursive(right, &terms));
            let again = u.unify(left, right, &terms).unwrap().unwrap();
            prop_assert!(again.diff.is_empty());
            prop_assert!(again.unifier.equivalent(&u, &terms));
        }
    }

    // ========== ORDER INDEPENDENCE ==========

    #[test]
    fn unification_order_does_not_matter(
        a1 in raw_term_strategy(),
        b1 in raw_term_strategy(),
        a2 in raw_term_strategy(),
        b2 in raw_term_strategy(),
    ) {
        let terms = TermStore::new();
        let (a1, b1) = (build_term(&a1, &terms), build_term(&b1, &terms));
        let (a2, b2) = (build_term(&a2, &terms), build_term(&b2, &terms));
        let empty = Unifier::new(true);

        let forward = unify(&empty, a1, b1, &terms).and_then(|u| unify(&u, a2, b2, &terms));
        let backward = unify(&empty, a2, b2, &terms).and_then(|u| unify(&u, a1, b1, &terms));
        prop_assert_eq!(forward.is_some(), backward.is_some());
        if let (Some(f), Some(b)) = (forward, backward) {
            prop_assert!(f.equivalent(&b, &terms));
        }
    }

    // ========== OCCURS CHECK ==========

    #[test]
    fn cyclic_binding_depends_on_finiteness(index in 0..=MAX_VAR, wrap in 1usize..4) {
        let terms = TermStore::new();
        let x = terms.var_term(var_of(&terms, index));
        let mut cyclic = x;
        for _ in 0..wrap {
            cyclic = terms.appl("f", [cyclic]);
        }

        let err = Unifier::new(true).unify(x, cyclic, &terms).expect_err("occurs check");
        prop_assert!(err.vars.contains(&var_of(&terms, index)));

        let rational = Unifier::new(false).unify(x, cyclic, &terms).unwrap();
        prop_assert!(rational.is_some());
    }

    // ========== DISEQUALITIES ==========

    #[test]
    fn disequality_forbids_later_equality(a in raw_term_strategy(), b in raw_term_strategy()) {
        let terms = TermStore::new();
        let left = build_term(&a, &terms);
        let right = build_term(&b, &terms);
        let empty = Unifier::new(true);
        match empty.disunify(&OrdSet::new(), left, right, &terms) {
            Some(result) => {
                prop_assert!(unify(&result.unifier, left, right, &terms).is_none());
            }
            None => {
                prop_assert_eq!(empty.are_equal(left, right, &terms), Some(true));
            }
        }
    }

    #[test]
    fn disequality_keeps_consistent_bindings(
        a in raw_term_strategy(),
        b in raw_term_strategy(),
        c in raw_term_strategy(),
        d in raw_term_strategy(),
    ) {
        let terms = TermStore::new();
        let (a, b) = (build_term(&a, &terms), build_term(&b, &terms));
        let (c, d) = (build_term(&c, &terms), build_term(&d, &terms));
        let empty = Unifier::new(true);
        let Some(diseq) = empty.disunify(&OrdSet::new(), a, b, &terms) else {
            return Ok(());
        };
        if let Some(u) = unify(&diseq.unifier, c, d, &terms) {
            prop_assert!(u.are_equal(a, b, &terms) != Some(true));
        }
    }

    // ========== RETAIN / REMOVE ==========

    #[test]
    fn retain_is_remove_of_the_rest(
        a in raw_term_strategy(),
        b in raw_term_strategy(),
        keep in prop::collection::btree_set(0..=MAX_VAR, 0..=3),
    ) {
        let terms = TermStore::new();
        let left = build_term(&a, &terms);
        let right = build_term(&b, &terms);
        let Some(u) = unify(&Unifier::new(true), left, right, &terms) else {
            return Ok(());
        };
        let keep: OrdSet<TermVar> = keep.into_iter().map(|i| var_of(&terms, i)).collect();
        let rest = u.var_set(&terms).relative_complement(keep.clone());

        let retained = u.retain_all(keep.iter().copied(), &terms).unifier;
        let removed = u.remove_all(rest.iter().copied(), &terms).unifier;
        prop_assert!(retained.equivalent(&removed, &terms));
    }

    #[test]
    fn retaining_everything_changes_nothing(a in raw_term_strategy(), b in raw_term_strategy()) {
        let terms = TermStore::new();
        let left = build_term(&a, &terms);
        let right = build_term(&b, &terms);
        let Some(u) = unify(&Unifier::new(true), left, right, &terms) else {
            return Ok(());
        };
        let all = u.var_set(&terms);
        let retained = u.retain_all(all.iter().copied(), &terms);
        prop_assert!(retained.subst.is_empty());
        prop_assert!(retained.unifier.equivalent(&u, &terms));
    }

    #[test]
    fn removing_nothing_changes_nothing(a in raw_term_strategy(), b in raw_term_strategy()) {
        let terms = TermStore::new();
        let left = build_term(&a, &terms);
        let right = build_term(&b, &terms);
        let Some(u) = unify(&Unifier::new(true), left, right, &terms) else {
            return Ok(());
        };
        let same = u.remove_all(std::iter::empty(), &terms).unifier;
        prop_assert!(same.equivalent(&u, &terms));
    }
}
