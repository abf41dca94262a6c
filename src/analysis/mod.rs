//! Analysis pipeline
//!
//! Plans chunks, sends them to the text-generation backend (concurrently for
//! multi-chunk plans), and merges the partial results into one
//! [`ArchitecturalAnalysis`]. A successful run then asks for diagrams,
//! recommendations and, when enabled, the cross-file repository structure.
//! Every backend call is bounded by the configured timeout and all but the
//! structure calls go through the content-addressed cache.

pub mod diagrams;
pub mod generator;
pub mod prompts;
pub mod response;
pub mod structure;
pub mod synthesis;

pub use diagrams::{DiagramKind, parse_diagram, parse_recommendations};
pub use generator::{GenerationRequest, TextGenerator, generate_with_timeout};
pub use response::{extract_json_object, extract_section, parse_cobol, parse_structured};
pub use synthesis::{
    PartialAnalysis, collect_partials, group_by_section, merge_locally, summarize_partials,
};

use crate::cache::{AnalysisCache, CacheMetadata, CacheNamespace, CacheSet};
use crate::chunking::{ChunkPlanner, SimilarityGrouper};
use crate::config::{AnalysisOptions, Config, GenerationConfig};
use crate::error::{GenerationError, LensError};
use crate::types::{
    AnalysisReport, AnalysisStatus, ArchitecturalAnalysis, Chunk, ChunkPlan, RepositoryInfo,
    SourceFile,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// What each backend task needs; cheap to clone into spawned tasks
#[derive(Clone)]
struct Backend {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl Backend {
    /// Cached response for `key` if fresh, else a bounded backend call whose
    /// result is written back
    ///
    /// Cache files are read and written on the blocking pool.
    async fn call(
        &self,
        cache: Option<&AnalysisCache>,
        key: &str,
        metadata: &CacheMetadata,
        request: GenerationRequest,
    ) -> Result<String, GenerationError> {
        if let Some(cache) = cache
            && let Some(hit) = cache.fetch(key.to_string(), metadata.clone()).await
        {
            return Ok(hit);
        }

        let text = self.generate(&metadata.name, request).await?;

        if let Some(cache) = cache
            && let Err(e) = cache
                .store(key.to_string(), metadata.clone(), text.clone())
                .await
        {
            tracing::warn!("Failed to cache response for {}: {}", metadata.name, e);
        }
        Ok(text)
    }

    /// Bounded backend call that bypasses the cache
    async fn generate(&self, name: &str, request: GenerationRequest) -> Result<String, GenerationError> {
        tracing::debug!("Calling {} for {}", self.generator.name(), name);
        generate_with_timeout(self.generator.as_ref(), request, self.timeout).await
    }
}

type PartialTask = JoinHandle<Result<PartialAnalysis, GenerationError>>;

/// Await every task in spawn order; a panicked or aborted task counts as a
/// failed call
async fn join_partials(tasks: Vec<PartialTask>) -> Vec<Result<PartialAnalysis, GenerationError>> {
    join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap_or_else(|e| Err(GenerationError::TaskFailed(e.to_string()))))
        .collect()
}

/// Runs the whole analysis for one repository
pub struct Analyzer {
    planner: ChunkPlanner,
    grouper: SimilarityGrouper,
    backend: Backend,
    caches: Option<CacheSet>,
    generation: GenerationConfig,
    options: AnalysisOptions,
}

impl Analyzer {
    /// Build an analyzer from configuration
    ///
    /// A cache directory that can't be created disables caching rather than
    /// failing.
    pub fn new(config: &Config, generator: Arc<dyn TextGenerator>) -> Self {
        let caches = if config.cache.enabled {
            match CacheSet::open(&config.cache.directory, config.cache.ttl_hours) {
                Ok(caches) => Some(caches),
                Err(e) => {
                    tracing::warn!("Analysis cache unavailable, continuing without it: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self::with_parts(
            ChunkPlanner::from_config(config),
            SimilarityGrouper::new(config.similarity.clone()),
            generator,
            caches,
            config.generation.clone(),
        )
        .with_options(config.analysis.clone())
    }

    pub fn with_parts(
        planner: ChunkPlanner,
        grouper: SimilarityGrouper,
        generator: Arc<dyn TextGenerator>,
        caches: Option<CacheSet>,
        generation: GenerationConfig,
    ) -> Self {
        Self {
            planner,
            grouper,
            backend: Backend {
                generator,
                timeout: Duration::from_secs(generation.timeout_secs),
            },
            caches,
            generation,
            options: AnalysisOptions::default(),
        }
    }

    /// Choose which follow-up calls run after a successful analysis
    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    pub fn planner(&self) -> &ChunkPlanner {
        &self.planner
    }

    fn cache(&self, namespace: CacheNamespace) -> Option<AnalysisCache> {
        self.caches.as_ref().map(|set| set.get(namespace).clone())
    }

    fn request(&self, system: &str, user: String, max_output_tokens: u32) -> GenerationRequest {
        GenerationRequest {
            system_prompt: system.to_string(),
            user_prompt: user,
            temperature: self.generation.temperature,
            max_output_tokens,
        }
    }

    /// Analyze `files` and return the unified result
    ///
    /// Fails only when there is nothing to analyze or every backend call for
    /// the plan failed.
    pub async fn analyze(
        &self,
        files: &[SourceFile],
        name: Option<&str>,
    ) -> Result<ArchitecturalAnalysis, LensError> {
        let repo = RepositoryInfo::from_files(files, name)?;
        let plan = self.planner.plan(files)?;
        self.execute(&repo, &plan).await
    }

    /// Analyze `files` and report the outcome, successful or not
    ///
    /// The returned report is always `Completed` or `Failed`.
    pub async fn run(&self, files: &[SourceFile], name: Option<&str>) -> AnalysisReport {
        let mut report = AnalysisReport::pending();
        report.status = AnalysisStatus::Processing;
        tracing::info!("Starting analysis {}", report.analysis_id);

        let repo = match RepositoryInfo::from_files(files, name) {
            Ok(repo) => repo,
            Err(e) => {
                tracing::error!("Analysis {} failed: {}", report.analysis_id, e);
                return report.fail(e.to_string());
            }
        };
        report.repository = Some(repo.clone());

        let outcome = match self.planner.plan(files) {
            Ok(plan) => {
                report.strategy = Some(plan.strategy().to_string());
                self.execute(&repo, &plan).await
            }
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(analysis) => {
                let (diagrams, recommendations, structure) = tokio::join!(
                    async {
                        if self.options.include_diagrams {
                            self.generate_diagrams(&repo, &analysis).await
                        } else {
                            Vec::new()
                        }
                    },
                    async {
                        if self.options.include_recommendations {
                            self.generate_recommendations(&repo, &analysis).await
                        } else {
                            Vec::new()
                        }
                    },
                    async {
                        if !self.options.include_structure {
                            return None;
                        }
                        self.analyze_structure(files, Some(&repo.name))
                            .await
                            .inspect_err(|e| {
                                tracing::warn!("Structure analysis of {} failed: {}", repo.name, e)
                            })
                            .ok()
                    },
                );
                report.diagrams = diagrams;
                report.recommendations = recommendations;
                report.structure = structure;

                tracing::info!("Analysis {} of {} completed", report.analysis_id, repo.name);
                report.complete(analysis)
            }
            Err(e) => {
                tracing::error!("Analysis {} of {} failed: {}", report.analysis_id, repo.name, e);
                report.fail(format!("Analysis of '{}' failed: {}", repo.name, e))
            }
        }
    }

    async fn execute(
        &self,
        repo: &RepositoryInfo,
        plan: &ChunkPlan,
    ) -> Result<ArchitecturalAnalysis, LensError> {
        tracing::info!(
            "Analyzing {} with {} strategy ({} chunks, {} tokens)",
            repo.name,
            plan.strategy(),
            plan.len(),
            plan.total_tokens()
        );

        match plan {
            ChunkPlan::Single(chunk) if chunk.members.iter().all(|m| m.language == "cobol") => {
                self.analyze_cobol_single(repo, chunk).await
            }
            ChunkPlan::Single(chunk) => self.analyze_single(repo, chunk).await,
            ChunkPlan::Structured(chunks, language) if language == "cobol" => {
                self.analyze_cobol_chunks(repo, chunks).await
            }
            ChunkPlan::Structured(chunks, _) | ChunkPlan::Multi(chunks) => {
                self.analyze_groups(repo, chunks, plan.strategy()).await
            }
        }
    }

    async fn analyze_single(
        &self,
        repo: &RepositoryInfo,
        chunk: &Chunk,
    ) -> Result<ArchitecturalAnalysis, LensError> {
        let metadata = CacheMetadata::new(&repo.name, &repo.primary_language)
            .with_attribute("strategy", "single_chunk");
        let request = self.request(
            prompts::FOCUSED_SYSTEM_PROMPT,
            prompts::focused_prompt(repo, &chunk.content),
            self.generation.single_max_tokens,
        );
        let cache = self.cache(CacheNamespace::Repository);

        let result = self
            .backend
            .call(cache.as_ref(), &chunk.content, &metadata, request)
            .await
            .map(|text| PartialAnalysis {
                index: chunk.sequence,
                label: chunk.label.clone(),
                text,
            });

        let partials = collect_partials(&repo.name, vec![result])?;
        Ok(merge_parsed(&partials, parse_structured))
    }

    async fn analyze_cobol_single(
        &self,
        repo: &RepositoryInfo,
        chunk: &Chunk,
    ) -> Result<ArchitecturalAnalysis, LensError> {
        let name = match chunk.members.as_slice() {
            [only] => only.path.rsplit('/').next().unwrap_or(only.path.as_str()).to_string(),
            _ => repo.name.clone(),
        };
        let metadata =
            CacheMetadata::new(&name, "cobol").with_attribute("strategy", "single_chunk");
        let request = self.request(
            prompts::COBOL_SYSTEM_PROMPT,
            prompts::cobol_prompt(&name, &chunk.content),
            self.generation.single_max_tokens,
        );
        let cache = self.cache(CacheNamespace::Cobol);

        let result = self
            .backend
            .call(cache.as_ref(), &chunk.content, &metadata, request)
            .await
            .map(|text| PartialAnalysis {
                index: chunk.sequence,
                label: chunk.label.clone(),
                text,
            });

        let partials = collect_partials(&repo.name, vec![result])?;
        Ok(merge_parsed(&partials, parse_cobol))
    }

    /// Similarity groups analyzed concurrently, then synthesized
    async fn analyze_groups(
        &self,
        repo: &RepositoryInfo,
        chunks: &[Chunk],
        strategy: &'static str,
    ) -> Result<ArchitecturalAnalysis, LensError> {
        let documents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let groups = self.grouper.group(&documents);
        let total = groups.len();
        tracing::info!("Grouped {} chunks into {} groups", chunks.len(), total);

        let tasks: Vec<PartialTask> = groups
            .iter()
            .enumerate()
            .map(|(i, members)| {
                let group = i + 1;
                let members: Vec<&Chunk> =
                    members.iter().filter_map(|&idx| chunks.get(idx)).collect();
                let key = members
                    .iter()
                    .map(|c| c.content.as_str())
                    .collect::<Vec<_>>()
                    .join(prompts::CHUNK_SEPARATOR);
                let label = members.first().and_then(|c| c.label.clone());
                let metadata = CacheMetadata::new(&repo.name, &repo.primary_language)
                    .with_attribute("strategy", strategy)
                    .with_attribute("group", group);
                let request = self.request(
                    prompts::CHUNK_GROUP_SYSTEM_PROMPT,
                    prompts::chunk_group_prompt(&members, group, total),
                    self.generation.chunk_max_tokens,
                );
                let backend = self.backend.clone();
                let cache = self.cache(CacheNamespace::Generic);

                tracing::info!(
                    "Analyzing chunk group {}/{} ({} chunks)",
                    group,
                    total,
                    members.len()
                );
                tokio::spawn(async move {
                    let text = backend.call(cache.as_ref(), &key, &metadata, request).await?;
                    Ok(PartialAnalysis {
                        index: group,
                        label,
                        text,
                    })
                })
            })
            .collect();

        let partials = collect_partials(&repo.name, join_partials(tasks).await)?;
        let summary = summarize_partials(&partials);

        let metadata = CacheMetadata::new(&repo.name, &repo.primary_language)
            .with_attribute("strategy", "synthesis")
            .with_attribute("groups", partials.len());
        let request = self.request(
            prompts::SYNTHESIS_SYSTEM_PROMPT,
            prompts::synthesis_prompt(repo, &summary),
            self.generation.synthesis_max_tokens,
        );
        let cache = self.cache(CacheNamespace::Repository);

        match self
            .backend
            .call(cache.as_ref(), &summary, &metadata, request)
            .await
        {
            Ok(text) => Ok(parse_structured(&text)),
            Err(e) => {
                tracing::warn!(
                    "Synthesis failed for {}, merging {} partial analyses locally: {}",
                    repo.name,
                    partials.len(),
                    e
                );
                Ok(merge_parsed(&partials, parse_structured))
            }
        }
    }

    /// Structure-aware COBOL chunks analyzed concurrently, then merged by
    /// section
    async fn analyze_cobol_chunks(
        &self,
        repo: &RepositoryInfo,
        chunks: &[Chunk],
    ) -> Result<ArchitecturalAnalysis, LensError> {
        let total = chunks.len();

        let tasks: Vec<PartialTask> = chunks
            .iter()
            .map(|chunk| {
                let label = chunk.label.clone();
                let metadata = CacheMetadata::new(
                    format!(
                        "chunk_{}_{}",
                        chunk.sequence,
                        label.as_deref().unwrap_or("UNKNOWN")
                    ),
                    "cobol",
                )
                .with_attribute("strategy", "structured")
                .with_attribute("chunk", chunk.sequence);
                let request = self.request(
                    prompts::COBOL_CHUNK_SYSTEM_PROMPT,
                    prompts::cobol_chunk_prompt(chunk, total),
                    self.generation.chunk_max_tokens,
                );
                let key = chunk.content.clone();
                let index = chunk.sequence;
                let backend = self.backend.clone();
                let cache = self.cache(CacheNamespace::Cobol);

                tracing::info!(
                    "Analyzing COBOL chunk {}/{}: {}",
                    index,
                    total,
                    label.as_deref().unwrap_or("UNKNOWN")
                );
                tokio::spawn(async move {
                    let text = backend.call(cache.as_ref(), &key, &metadata, request).await?;
                    Ok(PartialAnalysis { index, label, text })
                })
            })
            .collect();

        let partials = collect_partials(&repo.name, join_partials(tasks).await)?;
        let sections = group_by_section(&partials);
        let merge_prompt = prompts::cobol_merge_prompt(repo, &sections);

        let metadata = CacheMetadata::new(&repo.name, "cobol")
            .with_attribute("strategy", "cobol_merge")
            .with_attribute("sections", sections.len());
        let request = self.request(
            prompts::COBOL_MERGE_SYSTEM_PROMPT,
            merge_prompt.clone(),
            self.generation.cobol_merge_max_tokens,
        );
        let cache = self.cache(CacheNamespace::Cobol);

        match self
            .backend
            .call(cache.as_ref(), &merge_prompt, &metadata, request)
            .await
        {
            Ok(text) => Ok(response::parse_cobol_merge(&text)),
            Err(e) => {
                tracing::warn!(
                    "COBOL merge failed for {}, merging {} chunk analyses locally: {}",
                    repo.name,
                    partials.len(),
                    e
                );
                Ok(merge_parsed(&partials, parse_cobol))
            }
        }
    }
}

fn merge_parsed(
    partials: &[PartialAnalysis],
    parse: fn(&str) -> ArchitecturalAnalysis,
) -> ArchitecturalAnalysis {
    let parsed: Vec<ArchitecturalAnalysis> = partials.iter().map(|p| parse(&p.text)).collect();
    match parsed.len() {
        1 => parsed.into_iter().next().unwrap_or_default(),
        _ => merge_locally(&parsed),
    }
}
