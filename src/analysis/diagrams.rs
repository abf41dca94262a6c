//! Mermaid diagrams and recommendations derived from a finished analysis

use super::{Analyzer, extract_json_object, prompts};
use crate::cache::{CacheMetadata, CacheNamespace};
use crate::types::{ArchitecturalAnalysis, DiagramData, Recommendation, RepositoryInfo};
use serde::Deserialize;

/// The diagrams the analyzer knows how to ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramKind {
    Component,
    Sequence,
    CobolFlow,
    CobolData,
}

impl DiagramKind {
    /// Diagrams requested for a repository whose primary language is `language`
    pub fn for_language(language: &str) -> &'static [DiagramKind] {
        match language {
            "cobol" => &[DiagramKind::CobolFlow, DiagramKind::CobolData],
            _ => &[DiagramKind::Component, DiagramKind::Sequence],
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            DiagramKind::Component => "System Components",
            DiagramKind::Sequence => "Process Flow",
            DiagramKind::CobolFlow => "COBOL Program Flow",
            DiagramKind::CobolData => "COBOL Data Structures",
        }
    }

    pub fn diagram_type(self) -> &'static str {
        match self {
            DiagramKind::Component => "component",
            DiagramKind::Sequence => "sequence",
            DiagramKind::CobolFlow => "flowchart",
            DiagramKind::CobolData => "graph",
        }
    }

    fn fallback(self) -> (&'static str, &'static str) {
        match self {
            DiagramKind::Component => ("graph TD\nA[Component A]", "System component relationships"),
            DiagramKind::Sequence => ("sequenceDiagram\nA->>B: Process", "Main system process flow"),
            DiagramKind::CobolFlow => ("flowchart TD\nA[Main Program]", "COBOL program execution flow"),
            DiagramKind::CobolData => ("graph TD\nA[Data Structure]", "COBOL data organization"),
        }
    }

    fn system_prompt(self) -> &'static str {
        match self {
            DiagramKind::Component | DiagramKind::Sequence => prompts::DIAGRAM_SYSTEM_PROMPT,
            DiagramKind::CobolFlow => prompts::COBOL_FLOW_SYSTEM_PROMPT,
            DiagramKind::CobolData => prompts::COBOL_DATA_SYSTEM_PROMPT,
        }
    }

    fn prompt(self, analysis: &ArchitecturalAnalysis) -> String {
        match self {
            DiagramKind::Component => prompts::component_diagram_prompt(analysis),
            DiagramKind::Sequence => prompts::sequence_diagram_prompt(analysis),
            DiagramKind::CobolFlow => prompts::cobol_flow_prompt(analysis),
            DiagramKind::CobolData => prompts::cobol_data_prompt(analysis),
        }
    }

    /// Generic diagrams are drawn from components and are pointless without them
    fn needs_components(self) -> bool {
        matches!(self, DiagramKind::Component | DiagramKind::Sequence)
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct DiagramReply {
    mermaid_code: Option<String>,
    description: Option<String>,
}

/// Diagram from a backend reply; `None` when the reply holds no JSON object
///
/// Missing fields take the kind's placeholder.
pub fn parse_diagram(text: &str, kind: DiagramKind) -> Option<DiagramData> {
    let reply: DiagramReply = match serde_json::from_str(extract_json_object(text)?) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!("Unreadable {} diagram reply: {}", kind.title(), e);
            return None;
        }
    };
    let (code, description) = kind.fallback();
    Some(DiagramData {
        title: kind.title().to_string(),
        diagram_type: kind.diagram_type().to_string(),
        mermaid_code: reply.mermaid_code.unwrap_or_else(|| code.to_string()),
        description: reply.description.unwrap_or_else(|| description.to_string()),
    })
}

/// Recommendations from the first JSON array in `text`; empty when there is none
pub fn parse_recommendations(text: &str) -> Vec<Recommendation> {
    let array = match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => {
            tracing::warn!("No recommendation list in reply");
            return Vec::new();
        }
    };
    serde_json::from_str(array).unwrap_or_else(|e| {
        tracing::warn!("Unreadable recommendation list: {}", e);
        Vec::new()
    })
}

impl Analyzer {
    /// Diagrams for a finished analysis, in request order
    ///
    /// A failed or unreadable call leaves its diagram out.
    pub async fn generate_diagrams(
        &self,
        repo: &RepositoryInfo,
        analysis: &ArchitecturalAnalysis,
    ) -> Vec<DiagramData> {
        let cache = self.cache(CacheNamespace::Repository);
        let mut diagrams = Vec::new();

        for &kind in DiagramKind::for_language(&repo.primary_language) {
            if kind.needs_components() && analysis.components.is_empty() {
                tracing::debug!("Skipping {} diagram, no components", kind.title());
                continue;
            }

            let prompt = kind.prompt(analysis);
            let metadata = CacheMetadata::new(&repo.name, &repo.primary_language)
                .with_attribute("strategy", "diagram")
                .with_attribute("diagram", kind.diagram_type());
            let request = self.request(
                kind.system_prompt(),
                prompt.clone(),
                self.generation.diagram_max_tokens,
            );

            match self
                .backend
                .call(cache.as_ref(), &prompt, &metadata, request)
                .await
            {
                Ok(text) => diagrams.extend(parse_diagram(&text, kind)),
                Err(e) => tracing::warn!("{} diagram failed for {}: {}", kind.title(), repo.name, e),
            }
        }

        diagrams
    }

    /// Improvement recommendations for a finished analysis
    pub async fn generate_recommendations(
        &self,
        repo: &RepositoryInfo,
        analysis: &ArchitecturalAnalysis,
    ) -> Vec<Recommendation> {
        let prompt = prompts::recommendation_prompt(repo, analysis);
        let metadata = CacheMetadata::new(&repo.name, &repo.primary_language)
            .with_attribute("strategy", "recommendations");
        let request = self.request(
            prompts::RECOMMENDATION_SYSTEM_PROMPT,
            prompt.clone(),
            self.generation.recommendation_max_tokens,
        );
        let cache = self.cache(CacheNamespace::Repository);

        match self
            .backend
            .call(cache.as_ref(), &prompt, &metadata, request)
            .await
        {
            Ok(text) => parse_recommendations(&text),
            Err(e) => {
                tracing::warn!("Recommendations failed for {}: {}", repo.name, e);
                Vec::new()
            }
        }
    }
}
