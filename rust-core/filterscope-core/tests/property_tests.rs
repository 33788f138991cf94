// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for scope compilation

use std::collections::BTreeSet;

use filterscope_core::{
    CompileOptions, CompilerConfig, Domain, FilterSet, FilterTriple, MemoryDatabase,
    ScopeCompiler, Value,
};
use proptest::prelude::*;

const GOAL_NAMES: [&str; 5] = ["pig", "Pig pen", "dog", "cat", "guinea PIG"];

fn compile_ids(db: &MemoryDatabase, domain: Domain, triple: FilterTriple) -> Vec<i64> {
    let compiler = ScopeCompiler::new(CompilerConfig::default()).unwrap();
    let result = compiler
        .compile(
            &FilterSet::from_triples(vec![triple]),
            &CompileOptions::default(),
        )
        .unwrap();
    db.select(domain, result.get(domain).unwrap()).unwrap()
}

/// Grants `1..=grants`, each goal attached to one of them by index.
fn grant_fixture(grants: i64, goals: &[(i64, &str)], regions: &[Option<i64>]) -> MemoryDatabase {
    let mut db = MemoryDatabase::new();
    for id in 1..=grants {
        let mut row = vec![("id", Value::Int(id))];
        if let Some(Some(region)) = regions.get((id - 1) as usize) {
            row.push(("regionId", Value::Int(*region)));
        }
        db.insert("Grants", row);
    }
    for (i, (grant, name)) in goals.iter().enumerate() {
        let mut row = vec![("id", Value::Int(i as i64 + 1)), ("name", Value::text(*name))];
        if *grant > 0 {
            row.push(("grantId", Value::Int(*grant)));
        }
        db.insert("Goals", row);
    }
    db
}

fn arb_goals(grants: i64) -> impl Strategy<Value = Vec<(i64, &'static str)>> {
    prop::collection::vec((0..=grants, prop::sample::select(GOAL_NAMES.to_vec())), 0..12)
}

fn arb_regions() -> impl Strategy<Value = Vec<Option<i64>>> {
    prop::collection::vec(prop::option::of(1i64..4), 6)
}

/// Recognized filters with well-formed values.
fn arb_known_triple() -> impl Strategy<Value = FilterTriple> {
    prop_oneof![
        prop::collection::vec(1i64..12, 1..4).prop_map(|regions| FilterTriple::new(
            "region",
            "in",
            regions.iter().map(|r| r.to_string()).collect::<Vec<_>>()
        )),
        "[a-z_%]{1,8}".prop_map(|s| FilterTriple::new("goalName", "nctn", s)),
        "[a-z]{1,8}".prop_map(|s| FilterTriple::new("recipient", "ctn", s)),
        prop::sample::select(vec!["Coaching", "Potato", "Behavioral / Mental Health / Trauma"])
            .prop_map(|t| FilterTriple::new("topic", "nin", vec![t])),
        prop::sample::select(vec!["Grantee Specialist", "Not A Real Role"])
            .prop_map(|r| FilterTriple::new("role", "in", vec![r])),
    ]
}

proptest! {
    #[test]
    fn test_include_never_multiplies_rows(matching in 1usize..20) {
        let goals: Vec<(i64, &str)> = (0..matching).map(|_| (1, "guinea pig")).collect();
        let db = grant_fixture(1, &goals, &[]);
        let ids = compile_ids(&db, Domain::Grant, FilterTriple::new("goalName", "ctn", "pig"));
        prop_assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_include_and_exclude_partition_grants(
        grants in 1i64..6,
        goals in arb_goals(5),
        needle in prop::sample::select(vec!["pig", "dog", "pen", "_pig", "%"]),
    ) {
        let goals: Vec<(i64, &str)> = goals
            .into_iter()
            .map(|(g, n)| (g.min(grants), n))
            .collect();
        let db = grant_fixture(grants, &goals, &[]);
        let include = compile_ids(&db, Domain::Grant, FilterTriple::new("goalName", "ctn", needle));
        let exclude = compile_ids(&db, Domain::Grant, FilterTriple::new("goalName", "nctn", needle));

        let inc: BTreeSet<i64> = include.iter().copied().collect();
        let exc: BTreeSet<i64> = exclude.iter().copied().collect();
        prop_assert_eq!(inc.len(), include.len());
        prop_assert_eq!(exc.len(), exclude.len());
        prop_assert!(inc.is_disjoint(&exc));
        let universe: BTreeSet<i64> = (1..=grants).collect();
        prop_assert_eq!(inc.union(&exc).copied().collect::<BTreeSet<_>>(), universe);

        for grant in 1..=grants {
            if !goals.iter().any(|(g, _)| *g == grant) {
                prop_assert!(exc.contains(&grant));
            }
        }
    }

    #[test]
    fn test_many_to_one_partition_includes_null_regions(
        goals in arb_goals(5),
        regions in arb_regions(),
        region in 1i64..4,
    ) {
        let db = grant_fixture(5, &goals, &regions);
        let value = vec![region.to_string()];
        let include = compile_ids(&db, Domain::Goal, FilterTriple::new("region", "in", value.clone()));
        let exclude = compile_ids(&db, Domain::Goal, FilterTriple::new("region", "nin", value));

        let mut all: Vec<i64> = include.iter().chain(exclude.iter()).copied().collect();
        all.sort_unstable();
        let universe: Vec<i64> = (1..=goals.len() as i64).collect();
        prop_assert_eq!(all, universe);
    }

    #[test]
    fn test_unknown_key_is_a_no_op(
        known in prop::collection::vec(arb_known_triple(), 0..4),
        topic in "zz[a-z]{1,8}",
        condition in prop::sample::select(vec!["in", "nin", "ctn", "between"]),
        value in "[ -~]{0,16}",
    ) {
        let compiler = ScopeCompiler::new(CompilerConfig::default()).unwrap();
        let options = CompileOptions::default();
        let base = FilterSet::from_triples(known);
        let mut noisy = base.clone();
        noisy.insert(FilterTriple::new(topic, condition, value));
        prop_assert_eq!(
            compiler.compile(&base, &options).unwrap(),
            compiler.compile(&noisy, &options).unwrap()
        );
    }

    #[test]
    fn test_compile_is_idempotent(
        known in prop::collection::vec(arb_known_triple(), 0..6),
        user in prop::option::of(1i64..100),
    ) {
        let filters = FilterSet::from_triples(known);
        let options = CompileOptions { user_id: user };
        let first = ScopeCompiler::new(CompilerConfig::default())
            .unwrap()
            .compile(&filters, &options)
            .unwrap();
        let second = ScopeCompiler::new(CompilerConfig::default())
            .unwrap()
            .compile(&filters, &options)
            .unwrap();
        prop_assert_eq!(first.fingerprint(), second.fingerprint());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_raw_values_never_reach_sql_text(value in "zq[a-zA-Z' ;-]{0,22}") {
        let compiler = ScopeCompiler::new(CompilerConfig::default()).unwrap();
        let filters = FilterSet::from_triples(vec![
            FilterTriple::new("goalName", "ctn", value.clone()),
            FilterTriple::new("role", "in", vec![value.clone()]),
        ]);
        let result = compiler.compile(&filters, &CompileOptions::default()).unwrap();
        for (_, scope) in result.iter() {
            let rendered = scope.to_sql();
            prop_assert!(!rendered.where_clause.contains("zq"));
            prop_assert!(rendered.joins.iter().all(|j| !j.contains("zq")));
        }
    }
}
