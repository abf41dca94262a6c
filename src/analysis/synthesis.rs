//! Merging partial analyses into one result

use crate::error::{AnalysisError, GenerationError};
use crate::types::{ArchitecturalAnalysis, ArchitecturalPattern};
use std::collections::{HashMap, HashSet};

/// Paragraphs per partial that contribute to the summary
const SUMMARY_PARAGRAPHS: usize = 3;

const UNKNOWN_SECTION: &str = "UNKNOWN";

/// Backend output for one chunk or chunk group
#[derive(Debug, Clone, PartialEq)]
pub struct PartialAnalysis {
    /// 1-based position of the group or chunk that produced this
    pub index: usize,
    /// Section label for structured chunks
    pub label: Option<String>,
    pub text: String,
}

/// Keep successful partials in their original order
///
/// Failed calls are logged and dropped. Only when nothing succeeded is the
/// request failed.
pub fn collect_partials(
    repository: &str,
    results: Vec<Result<PartialAnalysis, GenerationError>>,
) -> Result<Vec<PartialAnalysis>, AnalysisError> {
    let mut partials = Vec::with_capacity(results.len());
    let mut reasons = Vec::new();

    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(partial) => partials.push(partial),
            Err(e) => {
                tracing::warn!("Analysis of part {} failed for {}: {}", i + 1, repository, e);
                reasons.push(e.to_string());
            }
        }
    }

    if partials.is_empty() {
        let reason = if reasons.is_empty() {
            "no chunk analyses were produced".to_string()
        } else {
            reasons.join("; ")
        };
        return Err(AnalysisError::AllChunksFailed {
            repository: repository.to_string(),
            failed: reasons.len(),
            reason,
        });
    }

    if !reasons.is_empty() {
        tracing::info!(
            "Continuing with {} of {} partial analyses for {}",
            partials.len(),
            partials.len() + reasons.len(),
            repository
        );
    }

    Ok(partials)
}

fn first_sentence(paragraph: &str) -> Option<String> {
    let paragraph = paragraph.trim();
    if paragraph.is_empty() {
        return None;
    }
    let sentence = paragraph.split(". ").next().unwrap_or(paragraph).trim_end();
    if sentence.ends_with(['.', '!', '?', ':']) {
        Some(sentence.to_string())
    } else {
        Some(format!("{}.", sentence))
    }
}

/// Condensed text fed to the synthesis call
///
/// Each partial contributes the first sentence of each of its first few
/// paragraphs, under a `Group n:` prefix.
pub fn summarize_partials(partials: &[PartialAnalysis]) -> String {
    partials
        .iter()
        .enumerate()
        .filter_map(|(i, partial)| {
            let points: Vec<String> = partial
                .text
                .split("\n\n")
                .filter_map(first_sentence)
                .take(SUMMARY_PARAGRAPHS)
                .collect();
            (!points.is_empty()).then(|| format!("Group {}: {}", i + 1, points.join(" ")))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Partial texts bucketed by section label in first-seen order
pub fn group_by_section(partials: &[PartialAnalysis]) -> Vec<(String, Vec<String>)> {
    let mut sections: Vec<(String, Vec<String>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for partial in partials {
        let label = partial.label.as_deref().unwrap_or(UNKNOWN_SECTION);
        match positions.get(label) {
            Some(&pos) => sections[pos].1.push(partial.text.clone()),
            None => {
                positions.insert(label.to_string(), sections.len());
                sections.push((label.to_string(), vec![partial.text.clone()]));
            }
        }
    }

    sections
}

fn extend_unique(target: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

/// Deterministic union of parsed partials, used when the backend can't
/// synthesize
///
/// Components merge by name, patterns by name keeping the highest
/// confidence, recommendations by title. Lists keep first-seen order.
pub fn merge_locally(analyses: &[ArchitecturalAnalysis]) -> ArchitecturalAnalysis {
    let mut merged = ArchitecturalAnalysis::default();
    let mut overviews: Vec<&str> = Vec::new();
    let mut recommendation_titles: HashSet<String> = HashSet::new();

    for analysis in analyses {
        let overview = analysis.overview.trim();
        if !overview.is_empty() && !overviews.contains(&overview) {
            overviews.push(overview);
        }

        for component in &analysis.components {
            match merged
                .components
                .iter_mut()
                .find(|c| c.component_name == component.component_name)
            {
                Some(existing) => {
                    extend_unique(&mut existing.responsibilities, &component.responsibilities);
                    extend_unique(&mut existing.dependencies, &component.dependencies);
                    extend_unique(&mut existing.file_paths, &component.file_paths);
                }
                None => merged.components.push(component.clone()),
            }
        }

        for pattern in &analysis.patterns {
            merge_pattern(&mut merged.patterns, pattern);
        }

        extend_unique(&mut merged.dependencies, &analysis.dependencies);
        extend_unique(
            &mut merged.external_integrations,
            &analysis.external_integrations,
        );

        for recommendation in &analysis.recommendations {
            if recommendation_titles.insert(recommendation.title.clone()) {
                merged.recommendations.push(recommendation.clone());
            }
        }
    }

    merged.overview = overviews.join("\n\n");
    merged
}

fn merge_pattern(patterns: &mut Vec<ArchitecturalPattern>, pattern: &ArchitecturalPattern) {
    match patterns.iter_mut().find(|p| p.pattern == pattern.pattern) {
        Some(existing) => {
            if pattern.confidence > existing.confidence {
                existing.confidence = pattern.confidence;
                existing.description = pattern.description.clone();
            }
            extend_unique(&mut existing.evidence, &pattern.evidence);
        }
        None => patterns.push(pattern.clone()),
    }
}
