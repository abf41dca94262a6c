use crate::error::AnalysisError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One source file supplied by the ingestion collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path relative to the repository root, using '/' separators
    pub path: String,
    /// Lowercase language tag (e.g. "cobol", "python")
    pub language: String,
    /// Full text of the file
    pub content: String,
    /// Size of the original bytes
    pub size: usize,
    /// Number of lines in `content`
    pub lines: usize,
}

impl SourceFile {
    /// Build a file record, detecting the language from the path extension
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let language = crate::ingest::detect_language(&path);
        Self::with_language(path, language, content)
    }

    /// Build a file record with an explicit language tag
    pub fn with_language(
        path: impl Into<String>,
        language: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            language: language.into().to_lowercase(),
            size: content.len(),
            lines: content.lines().count(),
            content,
        }
    }

    /// File name without directories
    pub fn name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str())
    }

    pub fn is_cobol(&self) -> bool {
        self.language == "cobol"
    }
}

/// Reference from a chunk back to the file lines it carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMember {
    pub path: String,
    pub language: String,
    /// First line carried, 1-based
    pub start_line: usize,
    /// Last line carried, 1-based inclusive
    pub end_line: usize,
    /// Leading lines repeated from the previous chunk of the same file
    pub overlap_lines: usize,
}

impl ChunkMember {
    /// Number of lines carried, overlap included
    pub fn line_count(&self) -> usize {
        if self.end_line < self.start_line {
            0
        } else {
            self.end_line - self.start_line + 1
        }
    }
}

/// A bounded unit of source text sent to one analysis call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in the plan, 1-based
    pub sequence: usize,
    /// Banner line(s) followed by the carried source text
    pub content: String,
    pub members: Vec<ChunkMember>,
    /// Estimated tokens of `content`
    pub token_count: usize,
    /// Structural section or file group this chunk belongs to
    pub label: Option<String>,
}

impl Chunk {
    /// Content without the leading banner line and the blank line after it
    pub fn body(&self) -> &str {
        match self.content.split_once('\n') {
            Some((_, rest)) => rest.strip_prefix('\n').unwrap_or(rest),
            None => "",
        }
    }

    /// The banner line
    pub fn banner(&self) -> &str {
        self.content.lines().next().unwrap_or("")
    }
}

/// How a repository was cut into chunks
///
/// Every consumer matches on all variants, so adding a strategy forces each
/// of them to decide how to handle it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChunkPlan {
    /// Everything fits in one call
    Single(Chunk),
    /// Files grouped by semantic bucket, split where a bucket exceeds the budget
    Multi(Vec<Chunk>),
    /// Structure-aware chunks of one language (COBOL)
    Structured(Vec<Chunk>, String),
}

impl ChunkPlan {
    pub fn chunks(&self) -> &[Chunk] {
        match self {
            ChunkPlan::Single(chunk) => std::slice::from_ref(chunk),
            ChunkPlan::Multi(chunks) | ChunkPlan::Structured(chunks, _) => chunks,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks().is_empty()
    }

    /// Short tag used in logs and cache metadata
    pub fn strategy(&self) -> &'static str {
        match self {
            ChunkPlan::Single(_) => "single_chunk",
            ChunkPlan::Multi(_) => "smart_chunking",
            ChunkPlan::Structured(..) => "structured",
        }
    }

    pub fn total_tokens(&self) -> usize {
        self.chunks().iter().map(|c| c.token_count).sum()
    }
}

/// Aggregate metadata about the analyzed repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub name: String,
    pub total_files: usize,
    pub total_lines: usize,
    pub total_size: usize,
    pub primary_language: String,
    /// Languages ordered by descending line count
    pub languages: Vec<String>,
}

impl RepositoryInfo {
    /// Summarize a set of files
    ///
    /// Without an explicit name, the first path component of the first file
    /// names the repository.
    pub fn from_files(files: &[SourceFile], name: Option<&str>) -> Result<Self, AnalysisError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => files
                .first()
                .and_then(|f| f.path.split_once('/'))
                .map(|(root, _)| root.to_string())
                .filter(|root| !root.is_empty())
                .unwrap_or_else(|| "Unknown Project".to_string()),
        };

        if files.is_empty() {
            return Err(AnalysisError::EmptyInput { repository: name });
        }

        let mut line_counts: Vec<(String, usize)> = Vec::new();
        for file in files {
            match line_counts.iter_mut().find(|(lang, _)| *lang == file.language) {
                Some((_, lines)) => *lines += file.lines,
                None => line_counts.push((file.language.clone(), file.lines)),
            }
        }
        // Stable sort keeps first-seen order for ties
        line_counts.sort_by(|a, b| b.1.cmp(&a.1));

        let languages: Vec<String> = line_counts.into_iter().map(|(lang, _)| lang).collect();

        Ok(Self {
            name,
            total_files: files.len(),
            total_lines: files.iter().map(|f| f.lines).sum(),
            total_size: files.iter().map(|f| f.size).sum(),
            primary_language: languages
                .first()
                .cloned()
                .unwrap_or_else(|| "unknown".to_string()),
            languages,
        })
    }

    pub fn is_cobol(&self) -> bool {
        self.primary_language == "cobol"
    }
}

fn default_component_name() -> String {
    "Unknown".to_string()
}

fn default_component_type() -> String {
    "Component".to_string()
}

fn default_pattern_name() -> String {
    "Unknown".to_string()
}

fn default_confidence() -> f64 {
    0.5
}

fn default_recommendation_title() -> String {
    "Recommendation".to_string()
}

fn default_priority() -> String {
    "medium".to_string()
}

fn default_category() -> String {
    "architecture".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitecturalComponent {
    #[serde(default = "default_component_name")]
    pub component_name: String,
    #[serde(rename = "type", default = "default_component_type")]
    pub kind: String,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub file_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitecturalPattern {
    #[serde(default = "default_pattern_name")]
    pub pattern: String,
    #[serde(default)]
    pub description: String,
    /// Clamped to [0, 1] by the response adapter
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default = "default_recommendation_title")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub impact: String,
}

/// The unified result of one repository analysis
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArchitecturalAnalysis {
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub components: Vec<ArchitecturalComponent>,
    #[serde(default)]
    pub patterns: Vec<ArchitecturalPattern>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub external_integrations: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

/// Mermaid source of one diagram, rendered by the consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramData {
    pub title: String,
    /// "component", "sequence", "flowchart" or "graph"
    pub diagram_type: String,
    pub mermaid_code: String,
    pub description: String,
}

/// One file as the relationship call sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    pub name: String,
    pub size: usize,
    #[serde(rename = "type")]
    pub file_type: String,
    pub key_elements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CallRelationship {
    pub caller: String,
    pub called: String,
    /// CALL, COPY or INCLUDE
    pub relationship_type: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataFlow {
    pub from: String,
    pub to: String,
    pub data_type: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedResource {
    pub resource: String,
    pub used_by: Vec<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessProcess {
    pub process: String,
    pub files: Vec<String>,
    pub flow: String,
}

/// How the files of a repository call and feed each other
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRelationships {
    pub entry_points: Vec<String>,
    pub call_relationships: Vec<CallRelationship>,
    pub data_flow: Vec<DataFlow>,
    pub shared_resources: Vec<SharedResource>,
    pub business_processes: Vec<BusinessProcess>,
}

/// Cross-file view of a whole repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryStructure {
    pub repository_name: String,
    pub total_files: usize,
    pub file_relationships: FileRelationships,
    /// PlantUML source from `@startuml` to `@enduml`
    pub plantuml_diagram: String,
    /// Markdown
    pub documentation: String,
    pub analysis_timestamp: DateTime<Utc>,
}

/// Lifecycle of an analysis request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Outcome of one analysis request, successful or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis_id: String,
    pub status: AnalysisStatus,
    pub repository: Option<RepositoryInfo>,
    pub strategy: Option<String>,
    pub analysis: Option<ArchitecturalAnalysis>,
    #[serde(default)]
    pub diagrams: Vec<DiagramData>,
    /// From the separate recommendations call
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub structure: Option<RepositoryStructure>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisReport {
    /// A new request in the pending state
    pub fn pending() -> Self {
        Self {
            analysis_id: uuid::Uuid::new_v4().to_string(),
            status: AnalysisStatus::Pending,
            repository: None,
            strategy: None,
            analysis: None,
            diagrams: Vec::new(),
            recommendations: Vec::new(),
            structure: None,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn complete(mut self, analysis: ArchitecturalAnalysis) -> Self {
        self.status = AnalysisStatus::Completed;
        self.analysis = Some(analysis);
        self.completed_at = Some(Utc::now());
        self
    }

    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.status = AnalysisStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(Utc::now());
        self
    }
}
