use super::language::{detect_language, is_binary_extension};
use crate::config::IngestConfig;
use crate::types::SourceFile;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

/// Directories that are never part of an analysis, on top of ignore files
const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".svn",
    ".hg",
    "__pycache__",
    ".pytest_cache",
    "venv",
    "env",
    ".env",
    "dist",
    "build",
    "target",
    "bin",
    "obj",
    ".idea",
    ".vscode",
    ".vs",
    "coverage",
    ".nyc_output",
];

/// Bytes inspected for NUL when sniffing binary content
const BINARY_SNIFF_LEN: usize = 1024;

/// Loads a directory tree into [`SourceFile`] records
pub struct SourceLoader {
    root: PathBuf,
    config: IngestConfig,
}

impl SourceLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config: IngestConfig::default(),
        }
    }

    pub fn with_config(mut self, config: IngestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.config.max_file_size = max_file_size;
        self
    }

    /// Walk the directory and collect every eligible text file, sorted by path
    pub fn load(&self) -> Result<Vec<SourceFile>> {
        if !self.root.exists() {
            anyhow::bail!("Root directory does not exist: {:?}", self.root);
        }
        if !self.root.is_dir() {
            anyhow::bail!("Root path is not a directory: {:?}", self.root);
        }

        let includes = if self.config.include_patterns.is_empty() {
            None
        } else {
            Some(build_globset(&self.config.include_patterns)?)
        };
        let excludes = build_globset(&self.exclude_patterns())?;

        let root = self.root.clone();
        let gitignore = self.config.respect_gitignore;
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(gitignore)
            .hidden(false)
            .git_ignore(gitignore)
            .git_exclude(gitignore)
            .git_global(gitignore)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                entry.depth() == 0 || !excludes.is_match(relative_path(&root, entry.path()))
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.context("Failed to read directory entry")?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let relative_path = relative_path(&self.root, entry.path());

            if let Some(includes) = &includes
                && !includes.is_match(&relative_path)
            {
                continue;
            }

            if is_binary_extension(&relative_path) {
                tracing::debug!("Skipping binary file: {}", relative_path);
                continue;
            }

            if let Ok(metadata) = entry.metadata()
                && metadata.len() > self.config.max_file_size
            {
                tracing::debug!("Skipping large file: {}", relative_path);
                continue;
            }

            let bytes = fs::read(entry.path())
                .with_context(|| format!("Failed to read {}", relative_path))?;

            if looks_binary(&bytes) {
                tracing::debug!("Skipping file with binary content: {}", relative_path);
                continue;
            }

            let size = bytes.len();
            let content = match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            };

            let language = detect_language(&relative_path);
            let mut file = SourceFile::with_language(relative_path, language, content);
            file.size = size;
            files.push(file);
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));

        tracing::info!("Loaded {} source files from {:?}", files.len(), self.root);
        Ok(files)
    }

    /// Built-in directory excludes followed by the configured ones
    fn exclude_patterns(&self) -> Vec<String> {
        DEFAULT_EXCLUDED_DIRS
            .iter()
            .flat_map(|dir| [format!("**/{}", dir), format!("**/{}/**", dir)])
            .chain(self.config.exclude_patterns.iter().cloned())
            .collect()
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))?);
    }
    Ok(builder.build()?)
}

/// Path below `root` with forward slashes
fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(BINARY_SNIFF_LEN).any(|&b| b == 0)
}
