//! Solver benchmarks using Criterion.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scopecheck::constraint::{DataPredicate, Query, QueryFilter, QueryMin};
use scopecheck::resolve::order::LabelOrder;
use scopecheck::resolve::regex::LabelRegex;
use scopecheck::{Constraint, Rule, Solver, Spec, State, TermId, TermStore, Unifier};

fn vars(terms: &TermStore, base: &str, n: usize) -> Vec<TermId> {
    (0..n).map(|i| terms.var("", &format!("{}{}", base, i))).collect()
}

/// Bind x0 == x1 == ... == xn, then xn to a constant.
fn bench_unify_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("unify_chain");
    for n in [10usize, 100, 1000] {
        let terms = TermStore::new();
        let xs = vars(&terms, "x", n + 1);
        let constant = terms.appl0("c");
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let mut u = Unifier::default();
                for pair in xs.windows(2) {
                    u = u
                        .unify(pair[0], pair[1], &terms)
                        .expect("no cycle")
                        .expect("unifies")
                        .unifier;
                }
                u = u
                    .unify(xs[n], constant, &terms)
                    .expect("no cycle")
                    .expect("unifies")
                    .unifier;
                black_box(u.find(xs[0], &terms))
            });
        });
    }
    group.finish();
}

/// `len(nil(), N) :- N == Z()` and
/// `len(cons(_, T), N) :- {M} N == S(M), len(T, M)` over a list of length n.
fn bench_rule_recursion(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_recursion");
    for n in [10usize, 50, 200] {
        let terms = TermStore::new();
        let h = terms.var("", "h");
        let t = terms.var("", "t");
        let len = terms.var("", "n");
        let m = terms.make_var("", "m");
        let spec = Spec::new()
            .with_rule(Rule::new(
                "len",
                vec![terms.nil(), len],
                Constraint::equal(len, terms.appl0("Z")),
            ))
            .with_rule(
                Rule::new(
                    "len",
                    vec![terms.cons(h, t), len],
                    Constraint::conj(
                        Constraint::equal(len, terms.appl1("S", terms.var_term(m))),
                        Constraint::user("len", vec![t, terms.var_term(m)]),
                    ),
                )
                .with_body_vars(vec![m]),
            );
        let items: Vec<TermId> = (0..n as i64).map(|i| terms.int(i)).collect();
        let list = terms.list(&items);
        let result = terms.var("", "R");
        let solver = Solver::new(&spec, &terms);

        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let goal = Constraint::user("len", vec![list, result]);
                let out = solver
                    .solve(State::new("bench"), vec![goal])
                    .expect("no overlap");
                black_box(out.is_solved())
            });
        });
    }
    group.finish();
}

/// Resolve through a chain of n scopes linked by `P` edges.
fn bench_query_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_chain");
    for n in [5usize, 20, 80] {
        let terms = TermStore::new();
        let p = terms.appl0("P");
        let rel = terms.appl0("var");
        let mut spec = Spec::new();
        spec.add_label(p);
        spec.add_relation(rel, 1, 0);

        let scopes = vars(&terms, "s", n);
        let mut constraints = vec![Constraint::new_scopes(scopes.clone())];
        for pair in scopes.windows(2) {
            constraints.push(Constraint::tell_edge(pair[1], p, pair[0]));
        }
        constraints.push(Constraint::tell_rel(scopes[0], rel, vec![terms.string("x")]));
        let result = terms.var("", "R");
        constraints.push(Constraint::query(Query {
            relation: Some(rel),
            filter: QueryFilter {
                label_wf: LabelRegex::star(LabelRegex::label(p)),
                data_wf: DataPredicate::Always,
            },
            min: QueryMin {
                label_order: LabelOrder::none(),
                data_equiv: DataPredicate::Never,
            },
            scope: scopes[n - 1],
            result,
        }));
        let solver = Solver::new(&spec, &terms);

        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let out = solver
                    .solve(State::new("bench"), constraints.clone())
                    .expect("no overlap");
                black_box(out.is_solved())
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_unify_chain,
    bench_rule_recursion,
    bench_query_chain
);
criterion_main!(benches);
