//! Chunk planning
//!
//! Decides how a repository is cut into chunks for analysis:
//! - everything that fits the budget becomes one chunk
//! - all-COBOL repositories are split along divisions, sections and paragraphs
//! - anything else is grouped into semantic buckets, and buckets that exceed
//!   the budget are packed into parts, with oversized files split on their own

pub mod boundary;
pub mod builder;
pub mod ranking;
pub mod similarity;

pub use boundary::{Boundary, BoundaryLevel, BoundaryMap, detect_boundaries};
pub use builder::{FileChunker, Segment, SegmentBuilder};
pub use ranking::{FileBucket, ImportanceRanker};
pub use similarity::{SimilarityGrouper, TfidfVectorizer, cosine_similarity};

use crate::config::{ChunkingConfig, Config, RankingConfig};
use crate::error::ChunkingError;
use crate::tokenizer::{TokenEstimator, estimator_from_config};
use crate::types::{Chunk, ChunkMember, ChunkPlan, SourceFile};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

const REPOSITORY_BANNER: &str = "=== COMPLETE REPOSITORY ANALYSIS ===";

/// Estimated cost of one file inside a multi-file chunk
#[derive(Debug, Clone, Copy)]
struct Entry<'a> {
    file: &'a SourceFile,
    /// Header plus content plus separator
    tokens: usize,
}

/// Turns a set of source files into a [`ChunkPlan`]
pub struct ChunkPlanner {
    estimator: Arc<dyn TokenEstimator>,
    config: ChunkingConfig,
    ranker: ImportanceRanker,
    file_chunker: FileChunker,
}

impl ChunkPlanner {
    pub fn new(
        estimator: Arc<dyn TokenEstimator>,
        config: ChunkingConfig,
        ranking: RankingConfig,
    ) -> Self {
        Self {
            file_chunker: FileChunker::new(estimator.clone(), config.clone()),
            ranker: ImportanceRanker::new(ranking),
            estimator,
            config,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            estimator_from_config(&config.tokenizer),
            config.chunking.clone(),
            config.ranking.clone(),
        )
    }

    pub fn estimator(&self) -> &Arc<dyn TokenEstimator> {
        &self.estimator
    }

    pub fn ranker(&self) -> &ImportanceRanker {
        &self.ranker
    }

    /// Plan chunks for `files`
    ///
    /// Chunks are numbered from 1 across the whole plan.
    pub fn plan(&self, files: &[SourceFile]) -> Result<ChunkPlan, ChunkingError> {
        if files.is_empty() {
            return Err(ChunkingError::EmptyInput);
        }
        if self.config.max_tokens == 0 {
            return Err(ChunkingError::InvalidBudget(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        let entries: Vec<Entry<'_>> = files
            .par_iter()
            .map(|file| Entry {
                file,
                tokens: self.estimator.estimate(&file_header(file))
                    + self.estimator.estimate(&file.content)
                    + self.estimator.estimate("\n\n"),
            })
            .collect();
        let total: usize = entries.iter().map(|e| e.tokens).sum();

        tracing::info!(
            "Planning {} files, ~{} tokens against a budget of {}",
            files.len(),
            total,
            self.config.max_tokens
        );

        if total <= self.config.max_tokens
            && let Some(chunk) = self.single_chunk(files)
        {
            tracing::info!("Repository fits in a single chunk ({} tokens)", chunk.token_count);
            return Ok(ChunkPlan::Single(chunk));
        }

        if files.iter().all(|f| f.is_cobol()) {
            let chunks = self.structured_chunks(files)?;
            tracing::info!("Created {} COBOL structured chunks", chunks.len());
            return Ok(ChunkPlan::Structured(renumber(chunks), "cobol".to_string()));
        }

        let by_path: HashMap<&str, Entry<'_>> =
            entries.iter().map(|e| (e.file.path.as_str(), *e)).collect();

        let mut chunks = Vec::new();
        for (bucket, members) in self.ranker.group(files) {
            let members: Vec<Entry<'_>> = members
                .into_iter()
                .filter_map(|file| by_path.get(file.path.as_str()).copied())
                .collect();
            chunks.extend(self.bucket_chunks(bucket, &members)?);
        }

        tracing::info!("Created {} chunks from file groups", chunks.len());
        Ok(ChunkPlan::Multi(renumber(chunks)))
    }

    /// The whole repository as one chunk, if its rendering fits the budget
    fn single_chunk(&self, files: &[SourceFile]) -> Option<Chunk> {
        let chunk = match files {
            [file] if file.is_cobol() => self.file_chunker.whole_file(file),
            _ => {
                let ranked = self.ranker.rank(files);
                self.files_chunk(REPOSITORY_BANNER, &ranked, None)
            }
        };
        (chunk.token_count <= self.config.max_tokens).then_some(chunk)
    }

    fn structured_chunks(&self, files: &[SourceFile]) -> Result<Vec<Chunk>, ChunkingError> {
        let mut chunks = Vec::new();
        for file in files {
            let whole = self.file_chunker.whole_file(file);
            if whole.token_count <= self.config.max_tokens {
                chunks.push(whole);
            } else {
                chunks.extend(self.file_chunker.chunk_file(file)?);
            }
        }
        Ok(chunks)
    }

    fn bucket_chunks(
        &self,
        bucket: FileBucket,
        members: &[Entry<'_>],
    ) -> Result<Vec<Chunk>, ChunkingError> {
        let budget = self.config.max_tokens as f64;
        let fill_limit = (budget * self.config.group_fill_ratio) as usize;
        // A file no part can hold is split on its own whatever the ratios say
        let large_limit = ((budget * self.config.large_file_ratio) as usize).min(fill_limit);
        let group_name = bucket.as_str().to_uppercase();

        let group_tokens: usize = members.iter().map(|e| e.tokens).sum();
        if group_tokens <= fill_limit {
            let files: Vec<&SourceFile> = members.iter().map(|e| e.file).collect();
            let banner = format!("=== {} FILES GROUP ===", group_name);
            return Ok(vec![self.files_chunk(&banner, &files, Some(bucket))]);
        }

        tracing::debug!(
            "Splitting {} group ({} files, ~{} tokens)",
            bucket,
            members.len(),
            group_tokens
        );

        let mut parts = PartWriter {
            bucket,
            group_name,
            number: 1,
            chunks: Vec::new(),
        };
        let mut current: Vec<&SourceFile> = Vec::new();
        let mut current_tokens = 0;

        for entry in members {
            if entry.tokens > large_limit {
                parts.flush(self, &mut current);
                current_tokens = 0;

                let pieces = self.file_chunker.chunk_file(entry.file)?;
                parts.number += pieces.len();
                parts.chunks.extend(pieces);
            } else if current_tokens + entry.tokens > fill_limit {
                parts.flush(self, &mut current);
                current.push(entry.file);
                current_tokens = entry.tokens;
            } else {
                current.push(entry.file);
                current_tokens += entry.tokens;
            }
        }
        parts.flush(self, &mut current);

        Ok(parts.chunks)
    }

    /// Several whole files under one banner
    fn files_chunk(&self, banner: &str, files: &[&SourceFile], bucket: Option<FileBucket>) -> Chunk {
        let mut content = format!("{}\n\n", banner);
        for file in files {
            content.push_str(&file_header(file));
            content.push_str(&file.content);
            content.push_str("\n\n");
        }

        Chunk {
            sequence: 1,
            token_count: self.estimator.estimate(&content),
            content,
            members: files
                .iter()
                .map(|file| ChunkMember {
                    path: file.path.clone(),
                    language: file.language.clone(),
                    start_line: 1,
                    end_line: file.lines,
                    overlap_lines: 0,
                })
                .collect(),
            label: bucket.map(|b| b.as_str().to_string()),
        }
    }
}

/// Numbered parts of one oversized bucket
struct PartWriter {
    bucket: FileBucket,
    group_name: String,
    number: usize,
    chunks: Vec<Chunk>,
}

impl PartWriter {
    fn flush(&mut self, planner: &ChunkPlanner, files: &mut Vec<&SourceFile>) {
        if files.is_empty() {
            return;
        }
        let banner = format!("=== {} GROUP - PART {} ===", self.group_name, self.number);
        self.chunks
            .push(planner.files_chunk(&banner, files, Some(self.bucket)));
        self.number += 1;
        files.clear();
    }
}

fn file_header(file: &SourceFile) -> String {
    format!("\n--- File: {} ({}) ---\n", file.path, file.language)
}

fn renumber(mut chunks: Vec<Chunk>) -> Vec<Chunk> {
    for (index, chunk) in chunks.iter_mut().enumerate() {
        chunk.sequence = index + 1;
    }
    chunks
}
