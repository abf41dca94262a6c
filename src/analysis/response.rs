//! Response-shape adapter
//!
//! Backend output is free text. Structured calls are asked for a JSON object,
//! COBOL calls for three fixed headings. Both parsers degrade to a raw-text
//! overview when the expected shape is missing instead of failing.

use crate::types::{
    ArchitecturalAnalysis, ArchitecturalComponent, ArchitecturalPattern, Recommendation,
};
use serde::Deserialize;

const DEFAULT_OVERVIEW: &str = "Architectural analysis completed";

pub const CALL_TREE_HEADING: &str = "Call Tree + Pseudocode";
pub const DATA_DICTIONARY_HEADING: &str = "Data Dictionary & Structural Layout";
pub const PLANTUML_HEADING: &str = "PlantUML Diagrams";

const COBOL_HEADINGS: [&str; 3] = [CALL_TREE_HEADING, DATA_DICTIONARY_HEADING, PLANTUML_HEADING];

/// Wire shape of a structured response; only `overview` distinguishes
/// "missing" from "empty"
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    overview: Option<String>,
    #[serde(default)]
    components: Vec<ArchitecturalComponent>,
    #[serde(default)]
    patterns: Vec<ArchitecturalPattern>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    external_integrations: Vec<String>,
    #[serde(default)]
    recommendations: Vec<Recommendation>,
}

impl From<RawAnalysis> for ArchitecturalAnalysis {
    fn from(raw: RawAnalysis) -> Self {
        let patterns = raw
            .patterns
            .into_iter()
            .map(|mut p| {
                p.confidence = p.confidence.clamp(0.0, 1.0);
                p
            })
            .collect();

        ArchitecturalAnalysis {
            overview: raw
                .overview
                .unwrap_or_else(|| DEFAULT_OVERVIEW.to_string()),
            components: raw.components,
            patterns,
            dependencies: raw.dependencies,
            external_integrations: raw.external_integrations,
            recommendations: raw.recommendations,
        }
    }
}

/// Text between the first `{` and the last `}`, inclusive
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn try_parse_json(text: &str) -> Option<ArchitecturalAnalysis> {
    let json = extract_json_object(text)?;
    match serde_json::from_str::<RawAnalysis>(json) {
        Ok(raw) => Some(raw.into()),
        Err(e) => {
            tracing::debug!("Response JSON did not match the analysis shape: {}", e);
            None
        }
    }
}

/// Parse a JSON-shaped analysis, passing raw text through as the overview
/// when no usable object is present
pub fn parse_structured(text: &str) -> ArchitecturalAnalysis {
    match try_parse_json(text) {
        Some(analysis) => analysis,
        None => {
            tracing::warn!(
                "No structured analysis found in response ({} chars), using raw text",
                text.len()
            );
            ArchitecturalAnalysis {
                overview: text.trim().to_string(),
                ..Default::default()
            }
        }
    }
}

fn find_heading(text: &str, title: &str, from: usize) -> Option<usize> {
    let haystack = text.get(from..)?;
    haystack
        .find(&format!("# {}", title))
        .or_else(|| haystack.find(title))
        .map(|pos| pos + from)
}

/// Slice of `text` from the heading `title` up to the nearest other COBOL
/// heading, trimmed; empty when the heading is absent
pub fn extract_section<'a>(text: &'a str, title: &str) -> &'a str {
    let Some(start) = find_heading(text, title, 0) else {
        return "";
    };

    let end = COBOL_HEADINGS
        .iter()
        .filter(|other| **other != title)
        .filter_map(|other| find_heading(text, other, start + 1))
        .min()
        .unwrap_or(text.len());

    text[start..end].trim()
}

fn is_separator_cell(cell: &str) -> bool {
    !cell.is_empty() && cell.chars().all(|c| matches!(c, '-' | ':' | ' '))
}

/// Paragraph rows of the "Orchestration paragraphs" table
fn orchestration_components(data_dictionary: &str) -> Vec<ArchitecturalComponent> {
    let mut components = Vec::new();
    let mut in_table = false;

    for line in data_dictionary.lines() {
        let row = line.trim_start();
        if line.contains("Orchestration paragraphs") || line.contains("Paragraph | Role") {
            in_table = true;
            continue;
        }
        if line.contains("Working-Storage structures")
            || (in_table && !row.is_empty() && !row.starts_with('|'))
        {
            in_table = false;
        }
        if !in_table || !row.starts_with('|') || row.starts_with("|---") {
            continue;
        }

        let cells: Vec<&str> = row.split('|').map(str::trim).collect();
        if cells.len() < 3 {
            continue;
        }
        let (name, role) = (cells[1], cells[2]);
        if name.is_empty() || role.is_empty() || name == "Paragraph" || is_separator_cell(name) {
            continue;
        }
        components.push(ArchitecturalComponent {
            component_name: name.to_string(),
            kind: "paragraph".to_string(),
            responsibilities: vec![role.to_string()],
            dependencies: Vec::new(),
            file_paths: Vec::new(),
        });
    }

    components
}

fn pattern(name: &str, description: &str, confidence: f64) -> ArchitecturalPattern {
    ArchitecturalPattern {
        pattern: name.to_string(),
        description: description.to_string(),
        confidence,
        evidence: Vec::new(),
    }
}

fn call_tree_patterns(call_tree: &str) -> Vec<ArchitecturalPattern> {
    let lower = call_tree.to_lowercase();
    let mut patterns = Vec::new();

    if call_tree.contains("PERFORM") {
        patterns.push(pattern(
            "PERFORM Statement Pattern",
            "Uses PERFORM statements for modular paragraph execution",
            0.9,
        ));
    }
    if call_tree.contains("SEARCH") || lower.contains("table") {
        patterns.push(pattern(
            "Table Processing Pattern",
            "Implements table search and processing operations",
            0.8,
        ));
    }
    if call_tree.contains("88-level") || lower.contains("condition") {
        patterns.push(pattern(
            "Condition Name Pattern",
            "Uses 88-level condition names for data validation",
            0.7,
        ));
    }

    patterns
}

/// Parse the three-deliverable COBOL response
pub fn parse_cobol(text: &str) -> ArchitecturalAnalysis {
    let call_tree = extract_section(text, CALL_TREE_HEADING);
    let data_dictionary = extract_section(text, DATA_DICTIONARY_HEADING);
    let plantuml = extract_section(text, PLANTUML_HEADING);

    tracing::debug!(
        "COBOL response sections: call tree {} chars, data dictionary {} chars, diagrams {} chars",
        call_tree.len(),
        data_dictionary.len(),
        plantuml.len()
    );

    if call_tree.is_empty() && data_dictionary.is_empty() && plantuml.is_empty() {
        tracing::warn!("COBOL response has none of the expected sections, using raw text");
        return ArchitecturalAnalysis {
            overview: format!("COBOL Analysis Results:\n\n{}", text),
            ..Default::default()
        };
    }

    let mut overview = String::from("COBOL Program Analysis\n\n");
    for (heading, body) in [
        ("Call Tree & Program Flow", call_tree),
        ("Data Structures", data_dictionary),
        ("Sequence Diagrams", plantuml),
    ] {
        if !body.is_empty() {
            overview.push_str(&format!("## {}\n{}\n\n", heading, body));
        }
    }

    ArchitecturalAnalysis {
        overview,
        components: orchestration_components(data_dictionary),
        patterns: call_tree_patterns(call_tree),
        ..Default::default()
    }
}

/// Parse a merged COBOL response, which may come back as JSON or in the
/// three-section layout
pub fn parse_cobol_merge(text: &str) -> ArchitecturalAnalysis {
    try_parse_json(text).unwrap_or_else(|| parse_cobol(text))
}
