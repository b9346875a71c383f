use context_indexer::ProjectContext;
use context_protocol::{CandidateKind, CandidateSymbol};
use context_search::{
    query_tokens, select_jump_targets, AttackPlan, CandidateRanker, FixedRecency, QuerySignals,
    MAX_PER_FILE, MAX_RANKED, SCORE_WEIGHTS,
};
use proptest::prelude::*;
use std::collections::HashMap;

fn candidates() -> impl Strategy<Value = Vec<CandidateSymbol>> {
    prop::collection::vec(
        (0usize..6, "[a-z]{1,10}", 1usize..200),
        0..80,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(file, symbol, line)| {
                CandidateSymbol::new(
                    format!("src/mod{file}/file.ts"),
                    symbol,
                    line,
                    line + 3,
                    CandidateKind::Export,
                )
            })
            .collect()
    })
}

fn plans() -> impl Strategy<Value = AttackPlan> {
    prop_oneof![
        Just(AttackPlan::InitReadWrite),
        Just(AttackPlan::ApiRoute),
        Just(AttackPlan::Auth),
        Just(AttackPlan::ErrorDriven),
    ]
}

proptest! {
    #[test]
    fn diversity_bounds_hold(input in candidates(), plan in plans(), query in "[a-z ]{0,30}") {
        let signals = QuerySignals::new(plan, &query, query_tokens(&query));
        let context = ProjectContext::default();
        let recency = FixedRecency(0.5);
        let ranked = CandidateRanker::new(&signals, &context, &recency).rank(input);

        prop_assert!(ranked.len() <= MAX_RANKED);
        let mut per_file: HashMap<&str, usize> = HashMap::new();
        for entry in &ranked {
            *per_file.entry(entry.candidate.file.as_str()).or_default() += 1;
        }
        prop_assert!(per_file.values().all(|count| *count <= MAX_PER_FILE));
    }

    #[test]
    fn scores_are_weighted_sums_in_descending_order(input in candidates(), plan in plans()) {
        let signals = QuerySignals::new(plan, "init database", query_tokens("init database"));
        let context = ProjectContext::default();
        let recency = FixedRecency(0.7);
        let ranked = CandidateRanker::new(&signals, &context, &recency).rank(input);

        for (idx, entry) in ranked.iter().enumerate() {
            prop_assert_eq!(entry.ranking, idx + 1);
            let expected = entry.breakdown.weighted(&SCORE_WEIGHTS);
            prop_assert!((entry.final_score - expected).abs() < 1e-5);
            prop_assert!(entry.final_score >= 0.0 && entry.final_score <= 1.0 + 1e-5);
        }
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].final_score >= pair[1].final_score);
        }
    }

    #[test]
    fn ranking_is_deterministic(input in candidates(), requested in 0usize..60) {
        let signals = QuerySignals::new(AttackPlan::Auth, "login", query_tokens("login"));
        let context = ProjectContext::default();
        let recency = FixedRecency(0.3);
        let ranker = CandidateRanker::new(&signals, &context, &recency);

        let first = ranker.rank(input.clone());
        let second = ranker.rank(input.clone());
        prop_assert_eq!(&first, &second);

        let targets = select_jump_targets(&first, &input, requested);
        prop_assert!(targets.len() <= requested.clamp(1, 20));
        prop_assert_eq!(targets.is_empty(), input.is_empty());
    }
}
