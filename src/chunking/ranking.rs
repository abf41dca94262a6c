//! File importance scoring and semantic bucketing

use crate::config::RankingConfig;
use crate::types::SourceFile;
use serde::{Deserialize, Serialize};

/// Semantic bucket a file is grouped into before chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileBucket {
    Core,
    BusinessLogic,
    Configuration,
    Utilities,
    Tests,
    Documentation,
}

impl FileBucket {
    /// Buckets in chunking order
    pub const ALL: [FileBucket; 6] = [
        FileBucket::Core,
        FileBucket::BusinessLogic,
        FileBucket::Configuration,
        FileBucket::Utilities,
        FileBucket::Tests,
        FileBucket::Documentation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileBucket::Core => "core",
            FileBucket::BusinessLogic => "business_logic",
            FileBucket::Configuration => "configuration",
            FileBucket::Utilities => "utilities",
            FileBucket::Tests => "tests",
            FileBucket::Documentation => "documentation",
        }
    }
}

impl std::fmt::Display for FileBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const CORE_NAMES: &[&str] = &["main", "index", "app", "server"];
const BUSINESS_PATHS: &[&str] = &["model", "service", "controller", "business", "logic"];
const CONFIG_NAMES: &[&str] = &["config", "settings", "package", ".env"];
const TEST_PATHS: &[&str] = &["test", "spec", "__test__"];
const DOC_NAMES: &[&str] = &["readme", "doc", "guide"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Scores files and sorts them into buckets
#[derive(Debug, Clone)]
pub struct ImportanceRanker {
    config: RankingConfig,
}

impl ImportanceRanker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    /// Name keyword weight + language weight + capped size bonus
    pub fn importance(&self, file: &SourceFile) -> f64 {
        let name = file.name().to_lowercase();

        let keyword = self
            .config
            .keyword_weights
            .iter()
            .find(|kw| name.contains(&kw.keyword))
            .map(|kw| kw.weight)
            .unwrap_or(0);

        let language = self
            .config
            .language_weights
            .get(&file.language)
            .copied()
            .unwrap_or(self.config.default_language_weight);

        let divisor = self.config.size_bonus_divisor.max(1) as f64;
        let size_bonus = (file.lines as f64 / divisor).min(self.config.size_bonus_cap);

        keyword as f64 + language as f64 + size_bonus
    }

    /// First matching rule wins; unmatched files are utilities
    pub fn bucket(&self, file: &SourceFile) -> FileBucket {
        let name = file.name().to_lowercase();
        let path = file.path.to_lowercase();

        if contains_any(&name, CORE_NAMES) {
            FileBucket::Core
        } else if contains_any(&path, BUSINESS_PATHS) {
            FileBucket::BusinessLogic
        } else if contains_any(&name, CONFIG_NAMES) {
            FileBucket::Configuration
        } else if contains_any(&path, TEST_PATHS) {
            FileBucket::Tests
        } else if contains_any(&name, DOC_NAMES) {
            FileBucket::Documentation
        } else {
            FileBucket::Utilities
        }
    }

    /// Files ordered by descending importance; ties keep input order
    pub fn rank<'a>(&self, files: &'a [SourceFile]) -> Vec<&'a SourceFile> {
        let mut scored: Vec<(f64, &SourceFile)> =
            files.iter().map(|f| (self.importance(f), f)).collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().map(|(_, f)| f).collect()
    }

    /// Non-empty buckets in chunking order, each ranked by importance
    pub fn group<'a>(&self, files: &'a [SourceFile]) -> Vec<(FileBucket, Vec<&'a SourceFile>)> {
        let ranked = self.rank(files);
        FileBucket::ALL
            .iter()
            .filter_map(|bucket| {
                let members: Vec<&SourceFile> = ranked
                    .iter()
                    .copied()
                    .filter(|f| self.bucket(f) == *bucket)
                    .collect();
                (!members.is_empty()).then_some((*bucket, members))
            })
            .collect()
    }
}

impl Default for ImportanceRanker {
    fn default() -> Self {
        Self::new(RankingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, language: &str, lines: usize) -> SourceFile {
        let content = "x\n".repeat(lines);
        SourceFile::with_language(path, language, content)
    }

    #[test]
    fn test_importance_components() {
        let ranker = ImportanceRanker::default();
        // main (100) + python (90) + 100 lines / 50
        assert_eq!(ranker.importance(&file("src/main.py", "python", 100)), 192.0);
        // no keyword + default language (30) + capped bonus
        assert_eq!(ranker.importance(&file("src/zz.rb", "ruby", 10_000)), 60.0);
    }

    #[test]
    fn test_first_keyword_wins() {
        let ranker = ImportanceRanker::default();
        // "app_config" contains both "app" (85) and "config" (70); table order picks "app"
        assert_eq!(ranker.importance(&file("app_config.json", "json", 0)), 125.0);
    }

    #[test]
    fn test_keyword_uses_file_name_only() {
        let ranker = ImportanceRanker::default();
        assert_eq!(ranker.importance(&file("main/zz.txt", "text", 0)), 20.0);
    }

    #[test]
    fn test_buckets() {
        let ranker = ImportanceRanker::default();
        assert_eq!(ranker.bucket(&file("src/App.tsx", "typescript", 1)), FileBucket::Core);
        assert_eq!(
            ranker.bucket(&file("src/services/billing.py", "python", 1)),
            FileBucket::BusinessLogic
        );
        assert_eq!(ranker.bucket(&file("settings.yaml", "yaml", 1)), FileBucket::Configuration);
        assert_eq!(ranker.bucket(&file("tests/test_x.py", "python", 1)), FileBucket::Tests);
        assert_eq!(ranker.bucket(&file("README.md", "markdown", 1)), FileBucket::Documentation);
        assert_eq!(ranker.bucket(&file("lib/strings.c", "c", 1)), FileBucket::Utilities);
    }

    #[test]
    fn test_bucket_rule_order() {
        let ranker = ImportanceRanker::default();
        // A "main" file under a test directory is still core
        assert_eq!(ranker.bucket(&file("tests/main.py", "python", 1)), FileBucket::Core);
        // A config under models/ is business logic because path rules come first
        assert_eq!(
            ranker.bucket(&file("models/config.py", "python", 1)),
            FileBucket::BusinessLogic
        );
    }

    #[test]
    fn test_group_orders_buckets_and_members() {
        let ranker = ImportanceRanker::default();
        let files = vec![
            file("docs/guide.md", "markdown", 5),
            file("lib/small.py", "python", 10),
            file("lib/helper.py", "python", 10),
            file("server.js", "javascript", 10),
        ];
        let groups = ranker.group(&files);

        let buckets: Vec<FileBucket> = groups.iter().map(|(b, _)| *b).collect();
        assert_eq!(
            buckets,
            vec![FileBucket::Core, FileBucket::Utilities, FileBucket::Documentation]
        );
        let utilities: Vec<&str> = groups[1].1.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(utilities, vec!["lib/helper.py", "lib/small.py"]);
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let ranker = ImportanceRanker::default();
        let files = vec![file("a.go", "go", 1), file("b.go", "go", 1)];
        let ranked: Vec<&str> = ranker.rank(&files).iter().map(|f| f.path.as_str()).collect();
        assert_eq!(ranked, vec!["a.go", "b.go"]);
    }

    #[test]
    fn test_bucket_serializes_snake_case() {
        let json = serde_json::to_string(&FileBucket::BusinessLogic).unwrap();
        assert_eq!(json, "\"business_logic\"");
        assert_eq!(FileBucket::BusinessLogic.to_string(), "business_logic");
    }
}
