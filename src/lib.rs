//! # archlens - Token-Budgeted Chunking and Caching for Repository Analysis
//!
//! The core of an LLM-driven architecture analyzer: it decides how source
//! files are cut into bounded chunks, remembers backend responses in a
//! content-addressed cache, and merges per-chunk results into one
//! architectural analysis.
//!
//! ## Overview
//!
//! Repositories that fit the token budget are analyzed in a single call.
//! COBOL programs are split along divisions, sections and paragraphs with
//! overlap between chunks. Other repositories are grouped into semantic
//! buckets, split where a bucket exceeds the budget, clustered by TF-IDF
//! similarity and analyzed concurrently before a final synthesis call.
//! A finished analysis can be followed by Mermaid diagrams, recommendations
//! and a cross-file repository structure with a PlantUML sequence diagram.
//!
//! ## Key Features
//!
//! - **Token Estimation**: cl100k_base counts via tiktoken, with a conservative heuristic fallback
//! - **Structure-Aware Chunking**: COBOL divisions/sections/paragraphs and declarations in 10 languages
//! - **Importance Ranking**: configurable keyword and language weights
//! - **Similarity Grouping**: TF-IDF vectors and greedy cosine clustering
//! - **Content-Addressed Cache**: SHA-256 fingerprints with TTL, scoped by namespace
//! - **Partial-Failure Tolerance**: failed chunk calls are dropped, not fatal
//! - **Follow-up Calls**: diagrams, recommendations and repository structure, each switchable
//! - **Ignore-Aware Loading**: `.gitignore` plus include/exclude globs
//!
//! ## Architecture
//!
//! ```text
//!  SourceFile[] ──► ChunkPlanner ──► ChunkPlan ─┬─ Single ─────► focused / COBOL call
//!                    │  ranking                  ├─ Multi ──────► SimilarityGrouper ─► group calls ─► synthesis
//!                    │  boundary                 └─ Structured ─► COBOL chunk calls ─► section merge
//!                    └─ builder                              │
//!                                                AnalysisCache (per namespace, TTL)
//! ```
//!
//! ## Modules
//!
//! - [`tokenizer`]: Token estimators
//! - [`chunking`]: Boundary detection, chunk building, ranking and similarity grouping
//! - [`cache`]: Content-addressed response cache
//! - [`analysis`]: Backend seam, prompts, response parsing, synthesis and follow-up calls
//! - [`ingest`]: Language detection and directory loading
//! - [`config`]: Configuration management with environment variable support
//! - [`types`]: Data model shared by every stage
//! - [`error`]: Error types
//! - [`paths`]: Platform cache and config directories
//!
//! ## Usage Example
//!
//! ```no_run
//! use archlens::analysis::{Analyzer, GenerationRequest, TextGenerator};
//! use archlens::config::Config;
//! use archlens::error::GenerationError;
//! use archlens::ingest::SourceLoader;
//! use std::sync::Arc;
//!
//! struct MyBackend;
//!
//! #[async_trait::async_trait]
//! impl TextGenerator for MyBackend {
//!     async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
//!         // Call a model here
//!         Ok(format!("{{\"overview\": \"{} chars analyzed\"}}", request.user_prompt.len()))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new()?;
//!     let files = SourceLoader::new("./my-repo").load()?;
//!     let analyzer = Analyzer::new(&config, Arc::new(MyBackend));
//!
//!     let report = analyzer.run(&files, Some("my-repo")).await;
//!     println!("{:?}", report.status);
//!     Ok(())
//! }
//! ```

/// Backend calls, prompts, response parsing and synthesis
pub mod analysis;

/// Content-addressed cache of backend responses
pub mod cache;

/// Chunk planning: boundaries, builder, ranking, similarity
pub mod chunking;

/// Configuration management with environment variable overrides
pub mod config;

/// Error types and utilities
pub mod error;

/// Language detection and source loading
pub mod ingest;

/// Platform directories
pub mod paths;

/// Token estimation
pub mod tokenizer;

/// Shared data model
pub mod types;
