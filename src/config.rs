/// Configuration system for archlens
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, LensError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Chunk budget and split thresholds
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Token estimator selection
    #[serde(default)]
    pub tokenizer: TokenizerConfig,

    /// File importance weights
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Similarity grouping of chunks
    #[serde(default)]
    pub similarity: SimilarityConfig,

    /// Analysis cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Text-generation call parameters
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Repository walking and file filters
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Optional calls made after synthesis
    #[serde(default)]
    pub analysis: AnalysisOptions,
}

/// Chunk budget and split thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum estimated tokens per chunk
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Fraction of the budget after which a division/section boundary closes a chunk
    #[serde(default = "default_high_level_split_ratio")]
    pub high_level_split_ratio: f64,

    /// Fraction of the budget that triggers an emergency split
    #[serde(default = "default_emergency_split_ratio")]
    pub emergency_split_ratio: f64,

    /// Where a forced split cuts the accumulated lines when no boundary is in range
    #[serde(default = "default_forced_split_ratio")]
    pub forced_split_ratio: f64,

    /// Fill level at which a file group starts a new part
    #[serde(default = "default_group_fill_ratio")]
    pub group_fill_ratio: f64,

    /// Files above this fraction of the budget are split on their own
    #[serde(default = "default_large_file_ratio")]
    pub large_file_ratio: f64,

    /// How many lines back an emergency split looks for a boundary
    #[serde(default = "default_boundary_search_window")]
    pub boundary_search_window: usize,

    /// Trailing context carried into a chunk opened at a high-level boundary
    #[serde(default = "default_boundary_overlap_lines")]
    pub boundary_overlap_lines: usize,

    /// Overlap carried after an emergency split at a boundary
    #[serde(default = "default_emergency_overlap_lines")]
    pub emergency_overlap_lines: usize,

    /// Line window used when a file has no structural boundaries
    #[serde(default = "default_fallback_max_lines")]
    pub fallback_max_lines: usize,

    /// Overlap between consecutive line windows
    #[serde(default = "default_fallback_overlap_lines")]
    pub fallback_overlap_lines: usize,
}

/// Token estimator selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Estimator: "bpe" (cl100k_base) or "heuristic"
    #[serde(default = "default_estimator")]
    pub estimator: String,

    /// Characters per token assumed by the heuristic estimator
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,
}

/// One entry of the ordered file-name keyword table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordWeight {
    pub keyword: String,
    pub weight: u32,
}

/// File importance weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Ordered keyword table; the first keyword contained in the file name wins
    #[serde(default = "default_keyword_weights")]
    pub keyword_weights: Vec<KeywordWeight>,

    /// Weight per language tag
    #[serde(default = "default_language_weights")]
    pub language_weights: BTreeMap<String, u32>,

    /// Weight for languages missing from `language_weights`
    #[serde(default = "default_language_weight")]
    pub default_language_weight: u32,

    /// Lines per bonus point
    #[serde(default = "default_size_bonus_divisor")]
    pub size_bonus_divisor: usize,

    /// Upper bound of the size bonus
    #[serde(default = "default_size_bonus_cap")]
    pub size_bonus_cap: f64,
}

/// Similarity grouping of chunks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cosine similarity a chunk must exceed to join a group
    #[serde(default = "default_similarity_threshold")]
    pub threshold: f64,

    /// Grouping only runs when there are more chunks than this
    #[serde(default = "default_min_chunks")]
    pub min_chunks: usize,

    /// Vocabulary size of the TF-IDF vectorizer
    #[serde(default = "default_max_features")]
    pub max_features: usize,
}

/// Analysis cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Root directory; one sub-directory per namespace
    #[serde(default = "default_cache_directory")]
    pub directory: PathBuf,

    /// Entries older than this are treated as misses
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
}

/// Text-generation call parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Timeout in seconds for each backend call
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_chunk_max_tokens")]
    pub chunk_max_tokens: u32,

    #[serde(default = "default_synthesis_max_tokens")]
    pub synthesis_max_tokens: u32,

    #[serde(default = "default_single_max_tokens")]
    pub single_max_tokens: u32,

    #[serde(default = "default_cobol_merge_max_tokens")]
    pub cobol_merge_max_tokens: u32,

    #[serde(default = "default_diagram_max_tokens")]
    pub diagram_max_tokens: u32,

    #[serde(default = "default_recommendation_max_tokens")]
    pub recommendation_max_tokens: u32,

    /// Budget of the relationship and documentation calls of a structure analysis
    #[serde(default = "default_structure_max_tokens")]
    pub structure_max_tokens: u32,

    #[serde(default = "default_plantuml_max_tokens")]
    pub plantuml_max_tokens: u32,
}

/// Repository walking and file filters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Glob patterns a file must match to be loaded; empty loads everything
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Glob patterns excluded on top of the built-in excludes
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Honor .gitignore, .git/info/exclude and the global gitignore
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    /// Files larger than this are skipped
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

/// Optional calls made after synthesis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Mermaid diagrams of components and process flow
    #[serde(default = "default_true")]
    pub include_diagrams: bool,

    /// Separate recommendations call
    #[serde(default = "default_true")]
    pub include_recommendations: bool,

    /// Cross-file relationships, PlantUML and documentation
    #[serde(default)]
    pub include_structure: bool,
}

// Default value functions
fn default_max_tokens() -> usize {
    120_000
}

fn default_high_level_split_ratio() -> f64 {
    0.7
}

fn default_emergency_split_ratio() -> f64 {
    0.9
}

fn default_forced_split_ratio() -> f64 {
    0.8
}

fn default_group_fill_ratio() -> f64 {
    0.8
}

fn default_large_file_ratio() -> f64 {
    0.7
}

fn default_boundary_search_window() -> usize {
    50
}

fn default_boundary_overlap_lines() -> usize {
    3
}

fn default_emergency_overlap_lines() -> usize {
    5
}

fn default_fallback_max_lines() -> usize {
    1000
}

fn default_fallback_overlap_lines() -> usize {
    50
}

fn default_estimator() -> String {
    "bpe".to_string()
}

fn default_chars_per_token() -> usize {
    3
}

fn default_keyword_weights() -> Vec<KeywordWeight> {
    [
        ("main", 100),
        ("index", 90),
        ("app", 85),
        ("server", 80),
        ("config", 70),
        ("settings", 65),
        ("package", 60),
        ("model", 75),
        ("controller", 75),
        ("service", 75),
        ("component", 70),
        ("util", 50),
        ("helper", 50),
        ("test", 30),
        ("spec", 30),
        ("readme", 20),
    ]
    .into_iter()
    .map(|(keyword, weight)| KeywordWeight {
        keyword: keyword.to_string(),
        weight,
    })
    .collect()
}

fn default_language_weights() -> BTreeMap<String, u32> {
    [
        ("cobol", 100),
        ("python", 90),
        ("javascript", 85),
        ("typescript", 85),
        ("java", 80),
        ("cpp", 75),
        ("c", 75),
        ("go", 70),
        ("json", 40),
        ("yaml", 40),
        ("xml", 35),
        ("text", 20),
    ]
    .into_iter()
    .map(|(lang, weight)| (lang.to_string(), weight))
    .collect()
}

fn default_language_weight() -> u32 {
    30
}

fn default_size_bonus_divisor() -> usize {
    50
}

fn default_size_bonus_cap() -> f64 {
    30.0
}

fn default_true() -> bool {
    true
}

fn default_similarity_threshold() -> f64 {
    0.3
}

fn default_min_chunks() -> usize {
    3
}

fn default_max_features() -> usize {
    1000
}

fn default_cache_directory() -> PathBuf {
    crate::paths::PlatformPaths::default_analysis_cache_dir()
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_temperature() -> f32 {
    0.1
}

fn default_generation_timeout() -> u64 {
    120
}

fn default_chunk_max_tokens() -> u32 {
    1500
}

fn default_synthesis_max_tokens() -> u32 {
    2500
}

fn default_single_max_tokens() -> u32 {
    3000
}

fn default_diagram_max_tokens() -> u32 {
    800
}

fn default_recommendation_max_tokens() -> u32 {
    1000
}

fn default_structure_max_tokens() -> u32 {
    3000
}

fn default_plantuml_max_tokens() -> u32 {
    2000
}

fn default_max_file_size() -> u64 {
    1_048_576
}

fn default_cobol_merge_max_tokens() -> u32 {
    3000
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            high_level_split_ratio: default_high_level_split_ratio(),
            emergency_split_ratio: default_emergency_split_ratio(),
            forced_split_ratio: default_forced_split_ratio(),
            group_fill_ratio: default_group_fill_ratio(),
            large_file_ratio: default_large_file_ratio(),
            boundary_search_window: default_boundary_search_window(),
            boundary_overlap_lines: default_boundary_overlap_lines(),
            emergency_overlap_lines: default_emergency_overlap_lines(),
            fallback_max_lines: default_fallback_max_lines(),
            fallback_overlap_lines: default_fallback_overlap_lines(),
        }
    }
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            estimator: default_estimator(),
            chars_per_token: default_chars_per_token(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            keyword_weights: default_keyword_weights(),
            language_weights: default_language_weights(),
            default_language_weight: default_language_weight(),
            size_bonus_divisor: default_size_bonus_divisor(),
            size_bonus_cap: default_size_bonus_cap(),
        }
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: default_similarity_threshold(),
            min_chunks: default_min_chunks(),
            max_features: default_max_features(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_cache_directory(),
            ttl_hours: default_ttl_hours(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            timeout_secs: default_generation_timeout(),
            chunk_max_tokens: default_chunk_max_tokens(),
            synthesis_max_tokens: default_synthesis_max_tokens(),
            single_max_tokens: default_single_max_tokens(),
            cobol_merge_max_tokens: default_cobol_merge_max_tokens(),
            diagram_max_tokens: default_diagram_max_tokens(),
            recommendation_max_tokens: default_recommendation_max_tokens(),
            structure_max_tokens: default_structure_max_tokens(),
            plantuml_max_tokens: default_plantuml_max_tokens(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            respect_gitignore: true,
            max_file_size: default_max_file_size(),
        }
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            include_diagrams: true,
            include_recommendations: true,
            include_structure: false,
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> LensError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}

fn check_ratio(key: &str, value: f64) -> Result<(), LensError> {
    if value <= 0.0 || value > 1.0 {
        return Err(invalid(key, format!("must be in (0.0, 1.0], got {}", value)));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, LensError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, LensError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), LensError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), LensError> {
        let chunking = &self.chunking;

        if chunking.max_tokens == 0 {
            return Err(invalid("chunking.max_tokens", "must be greater than 0"));
        }

        check_ratio("chunking.high_level_split_ratio", chunking.high_level_split_ratio)?;
        check_ratio("chunking.emergency_split_ratio", chunking.emergency_split_ratio)?;
        check_ratio("chunking.forced_split_ratio", chunking.forced_split_ratio)?;
        check_ratio("chunking.group_fill_ratio", chunking.group_fill_ratio)?;
        check_ratio("chunking.large_file_ratio", chunking.large_file_ratio)?;

        if chunking.high_level_split_ratio > chunking.emergency_split_ratio {
            return Err(invalid(
                "chunking.high_level_split_ratio",
                format!(
                    "must not exceed emergency_split_ratio ({})",
                    chunking.emergency_split_ratio
                ),
            ));
        }

        // A file between the two limits would otherwise sit alone in a group part
        if chunking.large_file_ratio > chunking.group_fill_ratio {
            return Err(invalid(
                "chunking.large_file_ratio",
                format!(
                    "must not exceed group_fill_ratio ({})",
                    chunking.group_fill_ratio
                ),
            ));
        }

        if chunking.boundary_search_window == 0 {
            return Err(invalid(
                "chunking.boundary_search_window",
                "must be greater than 0",
            ));
        }

        if chunking.fallback_max_lines == 0 {
            return Err(invalid("chunking.fallback_max_lines", "must be greater than 0"));
        }

        if self.tokenizer.estimator != "bpe" && self.tokenizer.estimator != "heuristic" {
            return Err(invalid(
                "tokenizer.estimator",
                format!(
                    "must be 'bpe' or 'heuristic', got '{}'",
                    self.tokenizer.estimator
                ),
            ));
        }

        if self.tokenizer.chars_per_token == 0 {
            return Err(invalid("tokenizer.chars_per_token", "must be greater than 0"));
        }

        if self.ranking.size_bonus_divisor == 0 {
            return Err(invalid("ranking.size_bonus_divisor", "must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.similarity.threshold) {
            return Err(invalid(
                "similarity.threshold",
                format!("must be between 0.0 and 1.0, got {}", self.similarity.threshold),
            ));
        }

        if self.similarity.max_features == 0 {
            return Err(invalid("similarity.max_features", "must be greater than 0"));
        }

        if self.cache.ttl_hours == 0 {
            return Err(invalid("cache.ttl_hours", "must be greater than 0"));
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(invalid(
                "generation.temperature",
                format!(
                    "must be between 0.0 and 2.0, got {}",
                    self.generation.temperature
                ),
            ));
        }

        if self.generation.timeout_secs == 0 {
            return Err(invalid("generation.timeout_secs", "must be greater than 0"));
        }

        if self.ingest.max_file_size == 0 {
            return Err(invalid("ingest.max_file_size", "must be greater than 0"));
        }

        for pattern in self
            .ingest
            .include_patterns
            .iter()
            .chain(&self.ingest.exclude_patterns)
        {
            if let Err(e) = globset::Glob::new(pattern) {
                return Err(invalid("ingest", format!("invalid glob '{}': {}", pattern, e)));
            }
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(max_tokens) = std::env::var("ARCHLENS_MAX_TOKENS")
            && let Ok(tokens) = max_tokens.parse()
        {
            self.chunking.max_tokens = tokens;
        }

        if let Ok(estimator) = std::env::var("ARCHLENS_ESTIMATOR") {
            self.tokenizer.estimator = estimator;
        }

        if let Ok(dir) = std::env::var("ARCHLENS_CACHE_DIR") {
            self.cache.directory = PathBuf::from(dir);
        }

        if let Ok(ttl) = std::env::var("ARCHLENS_CACHE_TTL_HOURS")
            && let Ok(hours) = ttl.parse()
        {
            self.cache.ttl_hours = hours;
        }

        if let Ok(threshold) = std::env::var("ARCHLENS_SIMILARITY_THRESHOLD")
            && let Ok(value) = threshold.parse()
        {
            self.similarity.threshold = value;
        }

        if let Ok(timeout) = std::env::var("ARCHLENS_GENERATION_TIMEOUT")
            && let Ok(secs) = timeout.parse()
        {
            self.generation.timeout_secs = secs;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, LensError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}
