//! Whole-repository structure: file relationships, a PlantUML sequence
//! diagram and markdown documentation

use super::{Analyzer, extract_json_object, prompts};
use crate::cache::{CacheMetadata, CacheNamespace};
use crate::error::LensError;
use crate::types::{FileRelationships, FileSummary, RepositoryInfo, RepositoryStructure, SourceFile};
use regex::Regex;
use std::sync::LazyLock;

static CALL_TARGET: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"CALL\s+['"]([^'"]+)['"]"#).ok());
static SELECTED_FILE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"SELECT\s+([A-Z0-9-]+)").ok());

/// First `limit` captures of `regex` in `text`, formatted under `tag`
fn captured(regex: &Option<Regex>, text: &str, tag: &str, limit: usize) -> Vec<String> {
    regex
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .take(limit)
        .map(|c| format!("{}: {}", tag, &c[1]))
        .collect()
}

const MAX_CALLS: usize = 5;
const MAX_SELECTS: usize = 3;

/// Role of a file within a mainframe-style repository
pub fn detect_file_type(file: &SourceFile) -> &'static str {
    let path = file.path.to_lowercase();
    if path.ends_with(".cpy") {
        return "COPYBOOK";
    }
    if file.language == "cobol" {
        let upper = file.content.to_uppercase();
        if upper.contains("IDENTIFICATION DIVISION") {
            if upper.contains("PROGRAM-ID") {
                return "COBOL_PROGRAM";
            }
        } else if upper.contains("COPY") || upper.contains("INCLUDE") {
            return "COPYBOOK";
        }
        return "UNKNOWN";
    }
    if path.ends_with(".jcl") {
        "JCL_JOB"
    } else if path.ends_with(".sql") {
        "SQL_SCRIPT"
    } else {
        "UNKNOWN"
    }
}

/// Program id, called programs and selected files of a COBOL source
pub fn key_elements(file: &SourceFile) -> Vec<String> {
    if file.language != "cobol" {
        return Vec::new();
    }
    let upper = file.content.to_uppercase();
    let mut elements = Vec::new();

    if let Some(line) = upper.lines().find(|l| l.contains("PROGRAM-ID.")) {
        elements.push(format!("PROGRAM-ID: {}", line.trim()));
    }
    elements.extend(captured(&CALL_TARGET, &upper, "CALLS", MAX_CALLS));
    elements.extend(captured(&SELECTED_FILE, &upper, "FILE", MAX_SELECTS));
    elements
}

pub fn summarize_file(file: &SourceFile) -> FileSummary {
    FileSummary {
        name: file.path.clone(),
        size: file.content.len(),
        file_type: detect_file_type(file).to_string(),
        key_elements: key_elements(file),
    }
}

/// Cache key for a repository: every path with its content length
pub fn repository_key(files: &[SourceFile]) -> String {
    files
        .iter()
        .map(|f| format!("{}:{}", f.path, f.content.len()))
        .collect::<Vec<_>>()
        .join("|")
}

/// Relationships from a backend reply; empty when the reply can't be read
pub fn parse_relationships(text: &str) -> FileRelationships {
    let parsed = extract_json_object(text)
        .ok_or_else(|| "no JSON object".to_string())
        .and_then(|json| serde_json::from_str(json).map_err(|e| e.to_string()));
    parsed.unwrap_or_else(|e| {
        tracing::error!("Unreadable file relationships: {}", e);
        FileRelationships::default()
    })
}

/// The `@startuml` .. `@enduml` block of a reply, else the whole reply
pub fn extract_plantuml(text: &str) -> String {
    match (text.find("@startuml"), text.rfind("@enduml")) {
        (Some(start), Some(end)) if start < end => text[start..end + "@enduml".len()].to_string(),
        _ => text.trim().to_string(),
    }
}

impl Analyzer {
    /// Cross-file structure of `files`
    ///
    /// The finished structure is cached under the repository's paths and
    /// sizes. Each of the three backend calls must succeed.
    pub async fn analyze_structure(
        &self,
        files: &[SourceFile],
        name: Option<&str>,
    ) -> Result<RepositoryStructure, LensError> {
        let repo = RepositoryInfo::from_files(files, name)?;
        let key = repository_key(files);
        let metadata = CacheMetadata::new(format!("repo_{}", repo.name), "REPOSITORY")
            .with_attribute("strategy", "full_repository")
            .with_attribute("file_count", files.len());
        let cache = self.cache(CacheNamespace::Repository);

        if let Some(cache) = &cache
            && let Some(hit) = cache.fetch(key.clone(), metadata.clone()).await
        {
            match serde_json::from_str(&hit) {
                Ok(structure) => {
                    tracing::info!("Using cached repository structure for {}", repo.name);
                    return Ok(structure);
                }
                Err(e) => tracing::warn!("Ignoring unreadable cached structure: {}", e),
            }
        }

        tracing::info!("Analyzing structure of {} ({} files)", repo.name, files.len());
        let summaries: Vec<FileSummary> = files.iter().map(summarize_file).collect();
        let summaries = serde_json::to_string_pretty(&summaries).unwrap_or_default();
        let request = self.request(
            prompts::RELATIONSHIP_SYSTEM_PROMPT,
            prompts::relationship_prompt(&repo, &summaries),
            self.generation.structure_max_tokens,
        );
        let reply = self.backend.generate(&metadata.name, request).await?;
        let relationships = parse_relationships(&reply);

        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        let relationships_json = serde_json::to_string_pretty(&relationships).unwrap_or_default();
        let plantuml = self.request(
            prompts::PLANTUML_SYSTEM_PROMPT,
            prompts::plantuml_prompt(&repo, &paths, &relationships_json),
            self.generation.plantuml_max_tokens,
        );
        let documentation = self.request(
            prompts::DOCUMENTATION_SYSTEM_PROMPT,
            prompts::documentation_prompt(&repo, &paths, &relationships_json),
            self.generation.structure_max_tokens,
        );
        let (plantuml, documentation) = tokio::try_join!(
            self.backend.generate(&metadata.name, plantuml),
            self.backend.generate(&metadata.name, documentation),
        )?;

        let structure = RepositoryStructure {
            repository_name: repo.name.clone(),
            total_files: files.len(),
            file_relationships: relationships,
            plantuml_diagram: extract_plantuml(&plantuml),
            documentation: documentation.trim().to_string(),
            analysis_timestamp: chrono::Utc::now(),
        };

        if let Some(cache) = &cache {
            match serde_json::to_string(&structure) {
                Ok(json) => {
                    if let Err(e) = cache.store(key, metadata, json).await {
                        tracing::warn!("Failed to cache structure of {}: {}", repo.name, e);
                    }
                }
                Err(e) => tracing::warn!("Failed to serialize structure of {}: {}", repo.name, e),
            }
        }

        Ok(structure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{GenerationRequest, TextGenerator};
    use crate::config::Config;
    use crate::error::GenerationError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const PAYROLL: &str = "       IDENTIFICATION DIVISION.
       PROGRAM-ID. PAYROLL.
       ENVIRONMENT DIVISION.
       INPUT-OUTPUT SECTION.
       FILE-CONTROL.
           SELECT EMPLOYEE-FILE ASSIGN TO EMPFILE.
       PROCEDURE DIVISION.
           CALL 'TAXCALC' USING WS-PAY.
           CALL \"AUDITLOG\".
           STOP RUN.
";

    struct Replies {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TextGenerator for Replies {
        async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match request.system_prompt.as_str() {
                prompts::RELATIONSHIP_SYSTEM_PROMPT => {
                    "{\"entry_points\": [\"PAYROLL.cbl\"], \"call_relationships\": [{\"caller\": \"PAYROLL.cbl\", \"called\": \"TAXCALC.cbl\"}]}".to_string()
                }
                prompts::PLANTUML_SYSTEM_PROMPT => {
                    "Sure:\n```\n@startuml\nPAYROLL -> TAXCALC\n@enduml\n```".to_string()
                }
                _ => "# Payroll\n".to_string(),
            })
        }
    }

    fn files() -> Vec<SourceFile> {
        vec![
            SourceFile::with_language("PAYROLL.cbl", "cobol", PAYROLL),
            SourceFile::with_language("EMPREC.cpy", "cobol", "       01 EMP-REC.\n"),
            SourceFile::with_language("RUN.jcl", "jcl", "//RUN JOB\n"),
        ]
    }

    #[test]
    fn test_detect_file_type() {
        let files = files();
        assert_eq!(detect_file_type(&files[0]), "COBOL_PROGRAM");
        assert_eq!(detect_file_type(&files[1]), "COPYBOOK");
        assert_eq!(detect_file_type(&files[2]), "JCL_JOB");

        let copying = SourceFile::with_language("COMMON.cbl", "cobol", "       COPY EMPREC.\n");
        assert_eq!(detect_file_type(&copying), "COPYBOOK");
        let script = SourceFile::with_language("db/init.sql", "sql", "CREATE TABLE t (id INT);\n");
        assert_eq!(detect_file_type(&script), "SQL_SCRIPT");
        let other = SourceFile::with_language("app.py", "python", "pass\n");
        assert_eq!(detect_file_type(&other), "UNKNOWN");
    }

    #[test]
    fn test_key_elements() {
        let summary = summarize_file(&files()[0]);
        assert_eq!(summary.file_type, "COBOL_PROGRAM");
        assert_eq!(summary.size, PAYROLL.len());
        assert_eq!(
            summary.key_elements,
            vec![
                "PROGRAM-ID: PROGRAM-ID. PAYROLL.",
                "CALLS: TAXCALC",
                "CALLS: AUDITLOG",
                "FILE: EMPLOYEE-FILE",
            ]
        );
        assert!(key_elements(&files()[2]).is_empty());
    }

    #[test]
    fn test_repository_key() {
        assert_eq!(
            repository_key(&files()[1..]),
            "EMPREC.cpy:19|RUN.jcl:10"
        );
    }

    #[test]
    fn test_parse_relationships_fallback() {
        let parsed = parse_relationships("{\"entry_points\": [\"A.cbl\"]}");
        assert_eq!(parsed.entry_points, vec!["A.cbl"]);
        assert!(parsed.data_flow.is_empty());
        assert_eq!(parse_relationships("nothing"), FileRelationships::default());
    }

    #[test]
    fn test_extract_plantuml() {
        assert_eq!(
            extract_plantuml("text\n@startuml\nA -> B\n@enduml\ntrailer"),
            "@startuml\nA -> B\n@enduml"
        );
        assert_eq!(extract_plantuml("  A -> B \n"), "A -> B");
    }

    #[tokio::test]
    async fn test_structure_is_cached() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.tokenizer.estimator = "heuristic".to_string();
        config.cache.directory = dir.path().to_path_buf();
        let generator = Arc::new(Replies {
            calls: AtomicUsize::new(0),
        });
        let analyzer = Analyzer::new(&config, generator.clone());

        let structure = analyzer.analyze_structure(&files(), Some("payroll")).await.unwrap();
        assert_eq!(structure.repository_name, "payroll");
        assert_eq!(structure.total_files, 3);
        assert_eq!(structure.file_relationships.entry_points, vec!["PAYROLL.cbl"]);
        assert_eq!(
            structure.file_relationships.call_relationships[0].called,
            "TAXCALC.cbl"
        );
        assert_eq!(structure.plantuml_diagram, "@startuml\nPAYROLL -> TAXCALC\n@enduml");
        assert_eq!(structure.documentation, "# Payroll");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);

        let again = analyzer.analyze_structure(&files(), Some("payroll")).await.unwrap();
        assert_eq!(again, structure);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }
}
