//! Retrieval pipeline: validation, workspace resolution, index gating, semantic query,
//! structural matching, fusion and enrichment.
//!
//! Every stage boundary checks the caller's [`CancellationToken`]. Backend calls are
//! bounded by the configured timeout and raced against the token.

use crate::config::RetrievalConfig;
use crate::enrich::ContextEnricher;
use crate::error::{Result, SearchError};
use crate::fusion::ResultFusionEngine;
use crate::query::{HybridQuery, SemanticQuery};
use crate::structural::StructuralMatcher;
use crate::tokenizer::QueryTokenizer;
use crate::types::{Cancelled, CodeMatch, EnrichedMatch};
use scout_protocol::path_filters::{file_type_allows, same_workspace_path, scope_allows};
use scout_protocol::{
    Focus, HybridSearchParams, IndexStatus, SemanticSearchParams, WorkspaceEntry,
};
use scout_vector_client::{BackendError, SemanticBackend};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStage {
    Validating,
    ResolvingWorkspace,
    CheckingIndexStatus,
    TriggeringIndex,
    QueryingSemantic,
    FilteringByScope,
    StructuralMatching,
    Fusing,
    Enriching,
    Done,
}

impl RetrievalStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            RetrievalStage::Validating => "validating",
            RetrievalStage::ResolvingWorkspace => "resolving_workspace",
            RetrievalStage::CheckingIndexStatus => "checking_index_status",
            RetrievalStage::TriggeringIndex => "triggering_index",
            RetrievalStage::QueryingSemantic => "querying_semantic",
            RetrievalStage::FilteringByScope => "filtering_by_scope",
            RetrievalStage::StructuralMatching => "structural_matching",
            RetrievalStage::Fusing => "fusing",
            RetrievalStage::Enriching => "enriching",
            RetrievalStage::Done => "done",
        }
    }
}

impl fmt::Display for RetrievalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ranked matches of one successful request.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalReport {
    pub query: String,
    pub workspace_id: String,
    /// `None` for semantic-only searches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<Focus>,
    pub matches: Vec<EnrichedMatch>,
    /// Chunks returned by the backend before filtering
    pub semantic_chunks: usize,
    /// Distinct candidates before truncation
    pub candidates: usize,
    pub elapsed_ms: u64,
    pub backend_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetrievalOutcome {
    Ready(RetrievalReport),
    /// The vector index is missing or being built; nothing was searched.
    IndexNotReady {
        workspace_id: String,
        triggered: bool,
        building: bool,
    },
    Cancelled { stage: RetrievalStage },
}

/// Workspace identity plus its index state.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceStatus {
    pub workspace: WorkspaceEntry,
    pub status: IndexStatus,
}

/// Why a pipeline stopped before `Done`.
enum Halt {
    Cancelled(RetrievalStage),
    /// Backend answered that the workspace index is mid-build.
    Building(String),
    Failed(SearchError),
}

impl From<SearchError> for Halt {
    fn from(err: SearchError) -> Self {
        Halt::Failed(err)
    }
}

type Flow<T> = std::result::Result<T, Halt>;

fn settle<T>(flow: Flow<T>) -> Result<Option<T>> {
    match flow {
        Ok(value) => Ok(Some(value)),
        Err(Halt::Cancelled(_)) => Ok(None),
        Err(Halt::Building(id)) => Err(BackendError::IndexBuilding(id).into()),
        Err(Halt::Failed(err)) => Err(err),
    }
}

fn finish(flow: Flow<RetrievalOutcome>) -> Result<RetrievalOutcome> {
    match flow {
        Ok(outcome) => Ok(outcome),
        Err(Halt::Cancelled(stage)) => {
            log::debug!("Retrieval cancelled during {stage}");
            Ok(RetrievalOutcome::Cancelled { stage })
        }
        Err(Halt::Building(workspace_id)) => {
            log::info!("Index for {workspace_id} started building mid-search");
            Ok(RetrievalOutcome::IndexNotReady {
                workspace_id,
                triggered: false,
                building: true,
            })
        }
        Err(Halt::Failed(err)) => Err(err),
    }
}

/// Hybrid retrieval over one semantic backend.
///
/// Holds no per-query state; concurrent calls on one engine are independent.
pub struct RetrievalEngine<B> {
    backend: B,
    config: RetrievalConfig,
    matcher: StructuralMatcher,
    fusion: ResultFusionEngine,
    enricher: ContextEnricher,
}

impl<B: SemanticBackend> RetrievalEngine<B> {
    pub fn new(backend: B, config: RetrievalConfig) -> Self {
        let enricher = ContextEnricher::new(config.max_enrich_file_bytes);
        Self::with_enricher(backend, config, enricher)
    }

    pub fn with_enricher(backend: B, config: RetrievalConfig, enricher: ContextEnricher) -> Self {
        Self {
            matcher: StructuralMatcher::from_config(&config),
            fusion: ResultFusionEngine::new(config.structural_boost),
            enricher,
            backend,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Semantic chunks fused with the declarations found inside them.
    pub async fn search(
        &self,
        params: HybridSearchParams,
        cancel: &CancellationToken,
    ) -> Result<RetrievalOutcome> {
        finish(self.run_hybrid(params, cancel).await)
    }

    /// Semantic chunks only, filtered by score, scope and file suffix.
    pub async fn search_semantic(
        &self,
        params: SemanticSearchParams,
        cancel: &CancellationToken,
    ) -> Result<RetrievalOutcome> {
        finish(self.run_semantic(params, cancel).await)
    }

    /// Backend workspace whose path matches `path`; `None` when cancelled.
    pub async fn resolve_workspace(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<WorkspaceEntry>> {
        settle(self.find_workspace(path, cancel).await)
    }

    /// Workspace identity and index state; `None` when cancelled.
    pub async fn workspace_status(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<WorkspaceStatus>> {
        let lookup = async {
            let workspace = self.find_workspace(path, cancel).await?;
            let status = match self
                .bounded(cancel, RetrievalStage::CheckingIndexStatus, async {
                    self.backend.index_status(&workspace.id).await
                })
                .await
            {
                Err(Halt::Building(_)) => IndexStatus {
                    is_vector_indexing: true,
                    ..IndexStatus::default()
                },
                other => other?,
            };
            Ok::<_, Halt>(WorkspaceStatus { workspace, status })
        };
        settle(lookup.await)
    }

    async fn run_hybrid(
        &self,
        params: HybridSearchParams,
        cancel: &CancellationToken,
    ) -> Flow<RetrievalOutcome> {
        let started = Instant::now();

        enter(RetrievalStage::Validating, cancel)?;
        let query = HybridQuery::from_params(params, &self.config.limits)?;
        let terms = QueryTokenizer::tokenize(&query.text);
        log::debug!(
            "Query '{}' -> {} term(s), focus {}, limit {}",
            query.text,
            terms.len(),
            query.focus,
            query.limit
        );

        let workspace = match self.gate_workspace(&query.workspace, cancel).await? {
            Ok(workspace) => workspace,
            Err(not_ready) => return Ok(not_ready),
        };

        enter(RetrievalStage::QueryingSemantic, cancel)?;
        let fetch = query.limit.saturating_mul(self.config.candidate_multiplier);
        let response = self
            .bounded(cancel, RetrievalStage::QueryingSemantic, async {
                self.backend.search(&workspace.id, &query.text, fetch).await
            })
            .await?;
        let semantic_chunks = response.results.len();
        log::debug!(
            "Backend returned {semantic_chunks} chunk(s) in {} ms",
            response.query_time_ms
        );

        enter(RetrievalStage::FilteringByScope, cancel)?;
        let chunks: Vec<_> = response
            .results
            .into_iter()
            .filter(|chunk| scope_allows(&chunk.relative_path, query.scope.as_deref()))
            .collect();

        enter(RetrievalStage::StructuralMatching, cancel)?;
        let candidates = self
            .fusion
            .collect(&chunks, query.focus, &terms, &self.matcher, cancel)
            .map_err(|Cancelled| Halt::Cancelled(RetrievalStage::StructuralMatching))?;

        enter(RetrievalStage::Fusing, cancel)?;
        let (merged, distinct) = self.merge_counted(candidates, query.limit);
        log::info!(
            "Fused {distinct} candidate(s) from {} chunk(s) into {} match(es)",
            chunks.len(),
            merged.len()
        );

        enter(RetrievalStage::Enriching, cancel)?;
        let matches = self
            .enricher
            .enrich(merged, query.context_lines, cancel)
            .await
            .map_err(|Cancelled| Halt::Cancelled(RetrievalStage::Enriching))?;

        enter(RetrievalStage::Done, cancel)?;
        Ok(RetrievalOutcome::Ready(RetrievalReport {
            query: query.text,
            workspace_id: workspace.id,
            focus: Some(query.focus),
            matches,
            semantic_chunks,
            candidates: distinct,
            elapsed_ms: elapsed_ms(started),
            backend_ms: response.query_time_ms,
        }))
    }

    async fn run_semantic(
        &self,
        params: SemanticSearchParams,
        cancel: &CancellationToken,
    ) -> Flow<RetrievalOutcome> {
        let started = Instant::now();

        enter(RetrievalStage::Validating, cancel)?;
        let query = SemanticQuery::from_params(params, &self.config.limits)?;

        let workspace = match self.gate_workspace(&query.workspace, cancel).await? {
            Ok(workspace) => workspace,
            Err(not_ready) => return Ok(not_ready),
        };

        enter(RetrievalStage::QueryingSemantic, cancel)?;
        let response = self
            .bounded(cancel, RetrievalStage::QueryingSemantic, async {
                self.backend.search(&workspace.id, &query.text, query.limit).await
            })
            .await?;
        let semantic_chunks = response.results.len();

        enter(RetrievalStage::FilteringByScope, cancel)?;
        let candidates: Vec<CodeMatch> = response
            .results
            .iter()
            .filter(|chunk| chunk.score >= query.min_score)
            .filter(|chunk| scope_allows(&chunk.relative_path, query.scope.as_deref()))
            .filter(|chunk| file_type_allows(&chunk.relative_path, query.file_type.as_deref()))
            .map(CodeMatch::semantic)
            .collect();

        enter(RetrievalStage::Fusing, cancel)?;
        let (merged, distinct) = self.merge_counted(candidates, query.limit);

        enter(RetrievalStage::Enriching, cancel)?;
        let matches = self
            .enricher
            .enrich(merged, query.context_lines, cancel)
            .await
            .map_err(|Cancelled| Halt::Cancelled(RetrievalStage::Enriching))?;

        enter(RetrievalStage::Done, cancel)?;
        Ok(RetrievalOutcome::Ready(RetrievalReport {
            query: query.text,
            workspace_id: workspace.id,
            focus: None,
            matches,
            semantic_chunks,
            candidates: distinct,
            elapsed_ms: elapsed_ms(started),
            backend_ms: response.query_time_ms,
        }))
    }

    /// Resolves the workspace and checks its index. The inner `Err` is the
    /// not-ready outcome to return instead of searching.
    async fn gate_workspace(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Flow<std::result::Result<WorkspaceEntry, RetrievalOutcome>> {
        enter(RetrievalStage::ResolvingWorkspace, cancel)?;
        let workspace = self.find_workspace(path, cancel).await?;

        enter(RetrievalStage::CheckingIndexStatus, cancel)?;
        let status = self
            .bounded(cancel, RetrievalStage::CheckingIndexStatus, async {
                self.backend.index_status(&workspace.id).await
            })
            .await?;

        if status.vector_ready {
            return Ok(Ok(workspace));
        }
        if !status.needs_indexing() {
            log::info!("Index for {} is still building", workspace.id);
            return Ok(Err(RetrievalOutcome::IndexNotReady {
                workspace_id: workspace.id,
                triggered: false,
                building: true,
            }));
        }

        enter(RetrievalStage::TriggeringIndex, cancel)?;
        self.bounded(cancel, RetrievalStage::TriggeringIndex, async {
            self.backend.trigger_index(&workspace.id).await
        })
        .await?;
        log::info!("Triggered indexing for {}", workspace.id);
        Ok(Err(RetrievalOutcome::IndexNotReady {
            workspace_id: workspace.id,
            triggered: true,
            building: false,
        }))
    }

    async fn find_workspace(&self, path: &Path, cancel: &CancellationToken) -> Flow<WorkspaceEntry> {
        let requested = path.to_string_lossy().into_owned();
        let workspaces = self
            .bounded(cancel, RetrievalStage::ResolvingWorkspace, async {
                self.backend.list_workspaces().await
            })
            .await?;

        workspaces
            .into_iter()
            .find(|entry| same_workspace_path(&entry.path, &requested))
            .ok_or_else(|| Halt::Failed(SearchError::WorkspaceNotIndexed(requested)))
    }

    fn merge_counted(&self, candidates: Vec<CodeMatch>, limit: usize) -> (Vec<CodeMatch>, usize) {
        let merged = self.fusion.merge(candidates, usize::MAX);
        let distinct = merged.len();
        (merged.into_iter().take(limit).collect(), distinct)
    }

    /// Runs a backend call under the configured timeout, abandoning it on cancellation.
    async fn bounded<T, F>(&self, cancel: &CancellationToken, stage: RetrievalStage, call: F) -> Flow<T>
    where
        F: Future<Output = scout_vector_client::Result<T>>,
    {
        let timeout_ms = self.config.backend_timeout_ms;
        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Halt::Cancelled(stage)),
            result = tokio::time::timeout(Duration::from_millis(timeout_ms), call) => result,
        };
        log::debug!("Backend call during {stage} took {} ms", elapsed_ms(started));

        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(BackendError::IndexBuilding(id))) => Err(Halt::Building(id)),
            Ok(Err(err)) => Err(Halt::Failed(err.into())),
            Err(_) => Err(Halt::Failed(SearchError::Timeout(timeout_ms))),
        }
    }
}

fn enter(stage: RetrievalStage, cancel: &CancellationToken) -> Flow<()> {
    if cancel.is_cancelled() {
        return Err(Halt::Cancelled(stage));
    }
    log::debug!("Retrieval stage: {stage}");
    Ok(())
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
