use crate::answer::{draft_answer, AnswerInputs};
use crate::bundle::{build_retrieval_bundle, BundleInputs};
use crate::collaborators::Collaborators;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use context_indexer::ProjectContext;
use context_protocol::{
    enforce_token_budget, estimate_tokens, BundleDebug, CandidateSymbol, EvidencePointer,
    JumpTarget, LocalContextRequest, LocalContextResponse, NextMode, NextStep, ResponseMetadata,
    StructuralQuery,
};
use context_search::{
    active_matchers, classify_topic, compile_queries, query_tokens, run_detectors,
    select_jump_targets, select_plan, AttackPlan, CandidateRanker, FilePrioritizer, FsRecency,
    QuerySignals, TaskType, Topic,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

const MAX_OPEN_FILES: usize = 5;
const MAX_CHECKS: usize = 3;

/// A request that passed validation, with everything parsed up front.
struct ValidatedRequest {
    project_path: PathBuf,
    query: String,
    task: TaskType,
    requested_plan: AttackPlan,
    topic: Topic,
    prioritizer: FilePrioritizer,
    ast_queries: Vec<StructuralQuery>,
    max_similar_chunks: usize,
    max_tokens: usize,
    use_cache: bool,
    debug: bool,
}

impl ValidatedRequest {
    fn from_request(request: &LocalContextRequest) -> Result<Self> {
        let project_path = request
            .project_path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .ok_or_else(|| EngineError::Validation("projectPath is required".to_string()))?;
        let query = request
            .query
            .clone()
            .ok_or_else(|| EngineError::Validation("query is required".to_string()))?;
        let requested_plan: AttackPlan = request
            .attack_plan
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(|e| EngineError::Validation(format!("{e}")))?;
        let task: TaskType = request
            .task_type
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(|e| EngineError::Validation(format!("{e}")))?;

        let topic = classify_topic(&query);
        let prioritizer = FilePrioritizer::new(topic, &request.exclude_patterns)
            .map_err(|e| EngineError::Validation(format!("excludePatterns: {e}")))?;

        Ok(Self {
            project_path: PathBuf::from(project_path),
            query,
            task,
            requested_plan,
            topic,
            prioritizer,
            ast_queries: request.ast_queries.clone(),
            max_similar_chunks: request.effective_max_similar_chunks(),
            max_tokens: request.effective_max_tokens(),
            use_cache: request.use_cache(),
            debug: request.debug,
        })
    }
}

/// Deterministic retrieval and ranking for one code question at a time.
///
/// The engine holds no per-request state; concurrent calls are independent.
#[derive(Clone)]
pub struct LocalContextEngine {
    config: Arc<EngineConfig>,
    collaborators: Collaborators,
}

impl LocalContextEngine {
    pub fn new(config: EngineConfig) -> Self {
        let collaborators = Collaborators::default_stack(&config);
        Self::with_collaborators(config, collaborators)
    }

    pub fn with_collaborators(config: EngineConfig, collaborators: Collaborators) -> Self {
        Self {
            config: Arc::new(config),
            collaborators,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Answer one request.
    ///
    /// Invalid requests are returned as [`EngineError::Validation`] before any work
    /// starts. Every other failure becomes a `success: false` response.
    pub async fn run(&self, request: &LocalContextRequest) -> Result<LocalContextResponse> {
        let validated = ValidatedRequest::from_request(request)?;
        let engine = self.clone();
        let handle = tokio::spawn(async move { engine.execute(validated).await });

        match handle.await {
            Ok(response) => Ok(response),
            Err(e) => {
                log::error!("Local context pipeline failed: {e}");
                Ok(LocalContextResponse::failure(format!(
                    "Local context pipeline failed: {e}"
                )))
            }
        }
    }

    async fn execute(&self, request: ValidatedRequest) -> LocalContextResponse {
        let started = Instant::now();
        let query = request.query.as_str();
        let topic = request.topic;
        let plan = select_plan(request.requested_plan, query);
        let signals = QuerySignals::new(plan, query, query_tokens(query));
        let queries = compile_queries(plan, query, &request.ast_queries);
        log::debug!(
            "Topic {topic}, plan {plan} (requested {}), {} structural queries",
            request.requested_plan,
            queries.len()
        );

        let context = self
            .collaborators
            .index_loader
            .load(&request.project_path, request.use_cache)
            .await;
        let root = project_root(&context, &request.project_path);
        let files = request.prioritizer.prioritize(&context.files);
        log::debug!(
            "Prioritized {} of {} indexed files",
            files.len(),
            context.files.len()
        );

        let raw = self
            .generate_candidates(&root, topic, &files, &queries, &request.prioritizer)
            .await;

        let recency = FsRecency::new(&root);
        let ranked = CandidateRanker::new(&signals, &context, &recency).rank(raw.clone());
        let targets = select_jump_targets(&ranked, &raw, request.max_similar_chunks);
        log::debug!(
            "{} candidates, {} ranked, {} jump targets",
            raw.len(),
            ranked.len(),
            targets.len()
        );

        let mut mini_bundle = self
            .collaborators
            .bundle_assembler
            .assemble(&root, &targets, request.max_tokens)
            .await;
        let bundle_tokens = enforce_token_budget(&mut mini_bundle, request.max_tokens, |item| {
            estimate_tokens(&item.snippet)
        });

        let answer_draft = draft_answer(
            request.task,
            plan,
            &AnswerInputs {
                targets: &targets,
                context: &context,
            },
        );

        let graph = self.collaborators.import_graph.build(&context).await;
        let fingerprint = self.collaborators.fingerprinter.fingerprint(&context.files).await;
        let debug = request.debug.then(|| BundleDebug {
            plan: plan.as_str().to_string(),
            queries: queries.len(),
            files_considered: files.len(),
            candidates: raw.len(),
            ranked: ranked.len(),
        });
        let retrieval_bundle = build_retrieval_bundle(BundleInputs {
            topic,
            ui_query: signals.ui_query,
            ranked: &ranked,
            context: &context,
            graph: &graph,
            fingerprint,
            excerpt_window_lines: self.config.excerpt_window_lines,
            debug,
        });

        let original_tokens = original_tokens(&root, &targets).await;
        let compacted_tokens = bundle_tokens + estimate_tokens(&answer_draft);
        let processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        log::info!(
            "Local context '{}': topic={topic} plan={plan} files={} candidates={} targets={} bundle_tokens={} in {}ms",
            query,
            files.len(),
            raw.len(),
            targets.len(),
            bundle_tokens,
            processing_time_ms
        );

        LocalContextResponse {
            success: true,
            answer_draft,
            next: next_step(&targets),
            evidence: evidence(&targets),
            jump_targets: targets,
            mini_bundle,
            metadata: ResponseMetadata {
                files_scanned: files.len(),
                symbols_considered: raw.len(),
                original_tokens,
                compacted_tokens,
                bundle_tokens,
                processing_time_ms,
            },
            retrieval_bundle: Some(retrieval_bundle),
        }
    }

    /// Structural search (timeout-bounded) followed by the topic's detectors,
    /// minus anything on a stoplisted or excluded path.
    async fn generate_candidates(
        &self,
        root: &Path,
        topic: Topic,
        files: &[String],
        queries: &[StructuralQuery],
        prioritizer: &FilePrioritizer,
    ) -> Vec<CandidateSymbol> {
        let search = self.collaborators.structural_search.run(
            root,
            files,
            queries,
            self.config.max_structural_matches,
        );
        let mut raw = match tokio::time::timeout(self.config.structural_timeout(), search).await {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                log::warn!("Structural search failed: {e}; continuing without its candidates");
                Vec::new()
            }
            Err(_) => {
                log::warn!(
                    "Structural search timed out after {}ms; continuing without its candidates",
                    self.config.structural_timeout_ms
                );
                Vec::new()
            }
        };
        let generic = raw.len();

        let matchers = active_matchers(topic, &self.collaborators.matchers);
        raw.extend(run_detectors(root, files, &matchers, self.config.detector_batch_size).await);

        let before = raw.len();
        raw.retain(|candidate| !prioritizer.is_excluded(&candidate.file));
        log::debug!(
            "Candidates: {generic} structural, {} detected, {} dropped by path filters",
            before - generic,
            before - raw.len()
        );
        raw
    }
}

fn project_root(context: &ProjectContext, requested: &Path) -> PathBuf {
    if context.root.as_os_str().is_empty() {
        requested.to_path_buf()
    } else {
        context.root.clone()
    }
}

fn next_step(targets: &[JumpTarget]) -> NextStep {
    if targets.is_empty() {
        return NextStep {
            mode: NextMode::RefineQuery,
            open_files: Vec::new(),
            checks: vec![
                "Name a concrete symbol, file or error message in the query".to_string(),
                "Try an explicit attackPlan".to_string(),
            ],
        };
    }
    let mut seen = HashSet::new();
    let open_files = targets
        .iter()
        .filter(|target| seen.insert(target.file.as_str()))
        .take(MAX_OPEN_FILES)
        .map(|target| target.file.clone())
        .collect();
    let checks = targets
        .iter()
        .take(MAX_CHECKS)
        .map(|target| {
            let place = match target.start {
                Some(line) => format!("at {}:{line}", target.file),
                None => format!("in {}", target.file),
            };
            format!("Confirm {} `{}` {place}", target.role, target.symbol)
        })
        .collect();
    NextStep {
        mode: NextMode::OpenFiles,
        open_files,
        checks,
    }
}

fn evidence(targets: &[JumpTarget]) -> Vec<EvidencePointer> {
    targets
        .iter()
        .filter_map(|target| {
            let start = target.start?;
            Some(EvidencePointer {
                file: target.file.clone(),
                start_line: start,
                end_line: target.end.unwrap_or(start).max(start),
                symbol: target.symbol.clone(),
            })
        })
        .collect()
}

/// Estimated tokens of the full text of every distinct target file.
async fn original_tokens(root: &Path, targets: &[JumpTarget]) -> usize {
    let mut seen = HashSet::new();
    let mut total = 0;
    for target in targets {
        if !seen.insert(target.file.as_str()) {
            continue;
        }
        match tokio::fs::read_to_string(root.join(&target.file)).await {
            Ok(text) => total += estimate_tokens(&text),
            Err(e) => log::debug!("Cannot size {}: {e}", target.file),
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn target(file: &str, symbol: &str, start: Option<usize>) -> JumpTarget {
        JumpTarget {
            file: file.to_string(),
            symbol: symbol.to_string(),
            start,
            end: start.map(|s| s + 2),
            role: "initialization".to_string(),
            confidence: 0.6,
            why: Vec::new(),
        }
    }

    #[test]
    fn validation_rejects_missing_fields() {
        let mut request = LocalContextRequest::new("  ", "database");
        assert!(matches!(
            ValidatedRequest::from_request(&request),
            Err(EngineError::Validation(_))
        ));

        request.project_path = Some("/repo".to_string());
        request.query = None;
        assert!(matches!(
            ValidatedRequest::from_request(&request),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn validation_rejects_unknown_plan_task_and_bad_globs() {
        let base = LocalContextRequest::new("/repo", "database");
        for request in [
            base.clone().with_attack_plan("shotgun"),
            base.clone().with_task_type("celebrate"),
            base.clone().with_exclude_patterns(["src/["]),
        ] {
            assert!(matches!(
                ValidatedRequest::from_request(&request),
                Err(EngineError::Validation(_))
            ));
        }
    }

    #[test]
    fn validation_parses_defaults() {
        let validated =
            ValidatedRequest::from_request(&LocalContextRequest::new("/repo", "")).unwrap();
        assert_eq!(validated.requested_plan, AttackPlan::Auto);
        assert_eq!(validated.task, TaskType::Understand);
        assert_eq!(validated.topic, Topic::Unknown);
        assert_eq!(validated.max_similar_chunks, 20);
        assert_eq!(validated.max_tokens, 3000);
        assert!(validated.use_cache);
    }

    #[test]
    fn next_step_opens_distinct_target_files() {
        let targets = vec![
            target("src/db.ts", "initializeDatabase", Some(3)),
            target("src/db.ts", "closeDatabase", Some(20)),
            target("src/server.ts", "start", None),
        ];
        let next = next_step(&targets);
        assert_eq!(next.mode, NextMode::OpenFiles);
        assert_eq!(
            next.open_files,
            vec!["src/db.ts".to_string(), "src/server.ts".to_string()]
        );
        assert_eq!(
            next.checks[0],
            "Confirm initialization `initializeDatabase` at src/db.ts:3"
        );
        assert_eq!(next_step(&[]).mode, NextMode::RefineQuery);
    }

    #[test]
    fn evidence_skips_targets_without_lines() {
        let targets = vec![
            target("src/db.ts", "initializeDatabase", Some(3)),
            target("src/server.ts", "start", None),
        ];
        assert_eq!(
            evidence(&targets),
            vec![EvidencePointer {
                file: "src/db.ts".to_string(),
                start_line: 3,
                end_line: 5,
                symbol: "initializeDatabase".to_string(),
            }]
        );
    }
}
