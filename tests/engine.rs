//! End-to-end solver runs over a three-category puzzle.
//!
//! The wine puzzle exercises every rule kind at once; the assertions stick
//! to the engine's hard guarantees — shape invariance, value bounds,
//! stochastic marginals, deterministic extraction — plus the dominance of
//! the one hard-committed pairing.

use zebra_core::{
    Assignments, Convergence, Item, MatrixStore, Relation, Rule, Solver,
};

// ─── helpers ─────────────────────────────────────────────────────────────────

fn wine_store() -> MatrixStore {
    MatrixStore::new(vec![
        (
            "Vintage".to_string(),
            vec![
                Item::from(1984),
                Item::from(1988),
                Item::from(1992),
                Item::from(1996),
            ],
        ),
        (
            "Wine".to_string(),
            vec![
                Item::from("Annata Branco"),
                Item::from("Bianca Flaux"),
                Item::from("Ece Suss"),
                Item::from("Vendemmia"),
            ],
        ),
        (
            "Type".to_string(),
            vec![
                Item::from("gewurztraminer"),
                Item::from("merlot"),
                Item::from("pinot noir"),
                Item::from("riesling"),
            ],
        ),
    ])
    .unwrap()
}

fn wine_rules() -> Vec<Rule> {
    vec![
        // Ece Suss was bottled after Annata Branco.
        Rule::Order {
            cat: "Vintage".to_string(),
            item1: Item::from("Ece Suss"),
            item2: Item::from("Annata Branco"),
            relation: Relation::Greater,
        },
        // Vendemmia was bottled 4 years after Bianca Flaux.
        Rule::ExactDifference {
            cat: "Vintage".to_string(),
            item1: Item::from("Bianca Flaux"),
            item2: Item::from("Vendemmia"),
            diff: 4,
        },
        // The merlot is either Annata Branco or Bianca Flaux.
        Rule::ExclusiveOr {
            cat1: "Wine".to_string(),
            items1: vec![Item::from("Annata Branco"), Item::from("Bianca Flaux")],
            cat2: "Type".to_string(),
            item2: Item::from("merlot"),
        },
        // The 1988 bottle is the pinot noir.
        Rule::DirectAssignment {
            cat1: "Vintage".to_string(),
            item1: Item::from(1988),
            cat2: "Type".to_string(),
            item2: Item::from("pinot noir"),
        },
    ]
}

fn assert_row_stochastic(store: &MatrixStore, tol: f64) {
    for (a, b) in store.pairs().collect::<Vec<_>>() {
        let v = store.view(a, b).unwrap();
        for r in 0..v.rows() {
            let sum: f64 = (0..v.cols()).map(|c| v.get(r, c)).sum();
            assert!((sum - 1.0).abs() < tol, "({a},{b}) row {r} sum = {sum}");
        }
    }
}

// ─── tests ───────────────────────────────────────────────────────────────────

#[test]
fn solve_preserves_shapes_and_bounds() {
    let mut store = wine_store();
    let report = Solver::default().solve(&mut store, &wine_rules()).unwrap();
    assert!(report.converged, "{report:?}");

    for (a, b) in store.pairs().collect::<Vec<_>>() {
        let v = store.view(a, b).unwrap();
        assert_eq!((v.rows(), v.cols()), (4, 4), "({a},{b}) shape changed");
        for r in 0..4 {
            for c in 0..4 {
                let p = v.get(r, c);
                assert!(p.is_finite() && (0.0..=1.0).contains(&p), "({a},{b})[{r},{c}] = {p}");
            }
        }
    }
    assert_row_stochastic(&store, 1e-3);
}

#[test]
fn hard_commitment_dominates_its_row() {
    let mut store = wine_store();
    Solver::default().solve(&mut store, &wine_rules()).unwrap();

    // 1988 → pinot noir was directly assigned; after convergence it must
    // still be the most likely type for 1988.
    let v = store.view("Vintage", "Type").unwrap();
    for c in [0, 1, 3] {
        assert!(
            v.get(1, 2) > v.get(1, c),
            "pinot noir lost row dominance: {} vs col {c} = {}",
            v.get(1, 2),
            v.get(1, c)
        );
    }

    let table = Assignments::extract(&store);
    assert_eq!(
        table.best(&Item::from(1988), "Type"),
        Some(&Item::from("pinot noir"))
    );
}

#[test]
fn extraction_is_total_and_deterministic() {
    let mut store = wine_store();
    Solver::default().solve(&mut store, &wine_rules()).unwrap();

    let first = Assignments::extract(&store);
    let second = Assignments::extract(&store);
    assert_eq!(first, second);
    // 3 pairs x 4 rows.
    assert_eq!(first.len(), 12);
    for (key, best) in first.iter() {
        let (_, category) = key;
        assert!(
            store.category(category).unwrap().contains(best),
            "extracted item {best} outside category {category}"
        );
    }
}

#[test]
fn rerunning_the_loop_is_safe() {
    // Rules compound multiplicatively; a second solve must not break any
    // invariant or move cells outside [0, 1].
    let mut store = wine_store();
    let solver = Solver::default();
    solver.solve(&mut store, &wine_rules()).unwrap();
    let report = solver.solve(&mut store, &wine_rules()).unwrap();
    assert!(report.converged);
    assert_row_stochastic(&store, 1e-3);
}

#[test]
fn unresolvable_rules_do_not_poison_the_run() {
    let mut store = wine_store();
    let mut rules = wine_rules();
    rules.push(Rule::DirectAssignment {
        cat1: "Region".to_string(),
        item1: Item::from("Tuscany"),
        cat2: "Wine".to_string(),
        item2: Item::from("Vendemmia"),
    });
    let report = Solver::default().solve(&mut store, &rules).unwrap();
    assert!(report.converged);
    assert_row_stochastic(&store, 1e-3);
}

#[test]
fn zero_round_solver_reports_trivially() {
    let mut store = wine_store();
    let report = Solver::with_rounds(0)
        .solve(&mut store, &wine_rules())
        .unwrap();
    assert_eq!(report, Convergence::trivial());
}
