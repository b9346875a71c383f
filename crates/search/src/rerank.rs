use crate::signals::{
    candidate_connections, context_boost, degree_boost, domain_boost, keyword_score, path_prior,
    surface_boost, QuerySignals, RecencySource, ScoreBreakdown, ScoreWeights,
};
use context_indexer::ProjectContext;
use context_protocol::CandidateSymbol;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

pub const MAX_PER_FILE: usize = 3;
pub const MAX_RANKED: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub candidate: CandidateSymbol,
    pub breakdown: ScoreBreakdown,
    pub final_score: f32,
    /// 1-based position in the ranked list.
    pub ranking: usize,
}

/// Seven-signal scorer with a per-file diversity cap.
pub struct CandidateRanker<'a> {
    query: &'a QuerySignals,
    context: &'a ProjectContext,
    recency: &'a dyn RecencySource,
    weights: ScoreWeights,
}

impl<'a> CandidateRanker<'a> {
    pub fn new(
        query: &'a QuerySignals,
        context: &'a ProjectContext,
        recency: &'a dyn RecencySource,
    ) -> Self {
        Self {
            query,
            context,
            recency,
            weights: ScoreWeights::default(),
        }
    }

    /// Score every candidate.
    pub fn breakdowns(&self, candidates: &[CandidateSymbol]) -> Vec<ScoreBreakdown> {
        let exported: HashSet<&str> = self
            .context
            .exports
            .iter()
            .map(|export| export.name.as_str())
            .collect();
        let connections = candidate_connections(candidates);

        candidates
            .iter()
            .zip(connections)
            .map(|(candidate, connections)| ScoreBreakdown {
                path_prior: path_prior(&candidate.file, self.query.plan),
                keyword_score: keyword_score(candidate, self.query),
                surface_boost: surface_boost(
                    candidate,
                    exported.contains(candidate.symbol.as_str()),
                ),
                degree_boost: degree_boost(connections),
                recency_boost: self.recency.recency(&candidate.file).clamp(0.0, 1.0),
                context_boost: context_boost(candidate, &self.query.tokens),
                domain_boost: domain_boost(candidate, self.query.plan),
            })
            .collect()
    }

    /// Score, sort (stable, descending) and apply the diversity cap.
    pub fn rank(&self, candidates: Vec<CandidateSymbol>) -> Vec<RankedCandidate> {
        let breakdowns = self.breakdowns(&candidates);
        let mut scored: Vec<RankedCandidate> = candidates
            .into_iter()
            .zip(breakdowns)
            .filter_map(|(candidate, breakdown)| {
                let final_score = breakdown.weighted(&self.weights);
                if !final_score.is_finite() {
                    log::debug!(
                        "Dropping {}:{} with non-finite score",
                        candidate.file,
                        candidate.symbol
                    );
                    return None;
                }
                Some(RankedCandidate {
                    candidate,
                    breakdown,
                    final_score,
                    ranking: 0,
                })
            })
            .collect();

        // `sort_by` is stable, so equal scores keep input order.
        scored.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(Ordering::Equal)
        });

        let total = scored.len();
        let mut ranked = apply_diversity(scored, MAX_PER_FILE, MAX_RANKED);
        for (idx, entry) in ranked.iter_mut().enumerate() {
            entry.ranking = idx + 1;
            entry.candidate.score = entry.final_score;
        }
        log::debug!("Ranked {} of {} scored candidates", ranked.len(), total);
        ranked
    }
}

/// Keep at most `per_file` entries per file, stopping at `limit` entries.
pub fn apply_diversity(
    sorted: Vec<RankedCandidate>,
    per_file: usize,
    limit: usize,
) -> Vec<RankedCandidate> {
    let mut per_file_counts: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();
    for entry in sorted {
        if out.len() >= limit {
            break;
        }
        let count = per_file_counts.entry(entry.candidate.file.clone()).or_default();
        if *count >= per_file {
            continue;
        }
        *count += 1;
        out.push(entry);
    }
    out
}
