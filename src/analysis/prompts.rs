//! Prompt text for every backend call kind

use crate::types::{ArchitecturalAnalysis, Chunk, RepositoryInfo};

/// Joins the chunks of one similarity group into a single prompt body
pub const CHUNK_SEPARATOR: &str = "\n\n--- CHUNK SEPARATOR ---\n\n";

pub const FOCUSED_SYSTEM_PROMPT: &str = r#"You are an expert software architect. Analyze code repositories quickly and efficiently.

Focus on:
1. Main architectural components (3-5 key components)
2. Primary design patterns (2-3 most important)
3. Critical dependencies and integrations
4. Top 3 architectural recommendations

Be concise but comprehensive. Provide actionable insights.

Return analysis as JSON with this structure:
{
  "overview": "Brief architectural overview",
  "components": [{"component_name": "name", "type": "type", "responsibilities": ["resp1", "resp2"], "dependencies": ["dep1"]}],
  "patterns": [{"pattern": "pattern_name", "description": "brief_desc", "confidence": 0.8}],
  "dependencies": ["dep1", "dep2"],
  "external_integrations": ["integration1"],
  "recommendations": [{"title": "title", "description": "desc", "priority": "high|medium|low", "impact": "impact"}]
}"#;

pub const CHUNK_GROUP_SYSTEM_PROMPT: &str = "You are a software architect analyzing related code chunks.

Provide concise analysis focusing on:
1. Architectural components in this code group
2. Design patterns and relationships
3. Key dependencies
4. Business logic flow

Be brief but capture the essential architectural aspects.";

pub const SYNTHESIS_SYSTEM_PROMPT: &str = "You are a software architect synthesizing multiple code analyses.

Create a unified architectural view from the provided analysis summaries.

Return JSON with the same structure as individual analyses but focus on:
1. Most important components across all analyses
2. Key patterns that appear multiple times
3. Critical dependencies
4. Top recommendations based on all findings

Be comprehensive but concise.";

pub const COBOL_SYSTEM_PROMPT: &str = r#"You are a senior COBOL code analyst. Your job: read the supplied COBOL source and produce a precise, self-contained analysis with zero external assumptions. Do not invent paragraphs or data that aren't present. If something is missing, say so briefly and continue with what is available.

Analyze the following COBOL program and produce THREE deliverables in this exact order and formatting.

RESPONSE REQUIREMENTS (STRICT)
1) Call Tree + Pseudocode (Step-by-step mental model)
   - Title: "Call Tree + Pseudocode"
   - First, a monospace call tree showing PERFORM/call relationships from entry paragraph downward.
     * Show each paragraph label exactly as in code.
     * Use indentation and box-drawing or ASCII tree.
   - Then provide concise pseudocode blocks for each major paragraph (top-level first), summarizing loops, SEARCH/WHEN, IF/ELSE, table traversals (1D/2D/3D), accumulators, and DISPLAY side effects.
   - Note whether tables use SUBSCRIPTS or INDEXED BY and where 88-level condition names are used.

2) Data Dictionary & Structural Layout (Tabular)
   - Title: "Data Dictionary & Structural Layout"
   - Two subtables minimum:
     A) "Orchestration paragraphs" with columns: Paragraph | Role/Responsibility.
     B) "Working-Storage structures" with columns: Group/Area | Structure name | Purpose | Key fields/occurs/indexing.
   - If present, also add a short "Traversal mechanics & invariants" bullet list and "Outputs" (what the program prints/returns).
   - Pull names exactly from WORKING-STORAGE/PARAMETERS/FD/01-level groups, including OCCURS counts, INDEXED BY names, and 88-level condition names.

3) PlantUML Sequence Diagrams
   - Title: "PlantUML Diagrams"
   - Provide TWO separate code blocks, both fenced with ```plantuml
     A) High-Level Orchestration: show the call flow among paragraphs and a lifeline for Working-Storage tables.
     B) Processing Deep-Dive: focus on the densest processing area identified.
   - Do not embed rendered images; output only the PlantUML source.

GENERAL RULES
- Base everything strictly on the provided code; do not import outside knowledge.
- Quote paragraph and data names verbatim.
- If a section is absent in the code, include the section heading with a one-line note: "Not present in source."
- Keep each section concise but complete; no fluff.
- Use consistent headings exactly as specified so the sections can be split reliably."#;

pub const COBOL_CHUNK_SYSTEM_PROMPT: &str = "You are a COBOL expert analyzing a section of COBOL code.

Focus on:
1. COBOL division/section structure
2. Data definitions and usage patterns
3. Paragraph logic and control flow
4. File I/O operations
5. Business logic implementation
6. COBOL-specific constructs and patterns

Provide concise analysis highlighting the most important architectural aspects of this code section.";

pub const COBOL_MERGE_SYSTEM_PROMPT: &str = "You are a COBOL architect merging multiple section analyses into a unified view.

Create a comprehensive architectural analysis that:
1. Combines insights from all sections
2. Identifies overall program structure and flow
3. Maps data architecture and dependencies
4. Highlights business logic patterns
5. Provides actionable recommendations

Return the same JSON structure as individual analyses but with merged, comprehensive content.";

/// Whole repository in one call
pub fn focused_prompt(repo: &RepositoryInfo, content: &str) -> String {
    format!(
        "Analyze this {} repository:\n\n\
         Repository: {}\n\
         Files: {}, Lines: {}\n\n\
         Code:\n{}\n\n\
         Provide architectural analysis focusing on the most important aspects.",
        repo.primary_language, repo.name, repo.total_files, repo.total_lines, content
    )
}

/// One similarity group; `group` is 1-based
pub fn chunk_group_prompt(chunks: &[&Chunk], group: usize, total: usize) -> String {
    let combined = chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR);

    format!(
        "Analyze this group of related code chunks (Group {}/{}):\n\n\
         {}\n\n\
         Focus on:\n\
         1. Main architectural components\n\
         2. Key patterns and relationships\n\
         3. Important dependencies\n\
         4. Business logic flow\n\n\
         Provide a concise analysis focusing on the most important architectural aspects.",
        group, total, combined
    )
}

pub fn synthesis_prompt(repo: &RepositoryInfo, summary: &str) -> String {
    format!(
        "Repository: {} ({})\n\
         Files: {}, Lines: {}\n\n\
         Analysis Summary:\n{}\n\n\
         Synthesize into a unified architectural analysis with focus on:\n\
         1. Main components and their relationships\n\
         2. Key architectural patterns\n\
         3. Critical dependencies\n\
         4. 2-3 most important recommendations",
        repo.name, repo.primary_language, repo.total_files, repo.total_lines, summary
    )
}

/// Single COBOL program, fenced so the backend sees it verbatim
pub fn cobol_prompt(name: &str, content: &str) -> String {
    format!(
        "INPUT METADATA\n\
         - File name: {}\n\
         - Language: COBOL\n\
         - Purpose: Architectural & Structural understanding for a code-analysis app\n\
         - Source Code (verbatim, unchanged) begins after the line \"<<<CODE>>>\":\n\
         <<<CODE>>>\n\
         {}\n\
         <<<END-CODE>>>",
        name, content
    )
}

pub fn cobol_chunk_prompt(chunk: &Chunk, total: usize) -> String {
    let lines: usize = chunk.members.iter().map(|m| m.line_count()).sum();
    format!(
        "Analyze this COBOL code chunk ({}/{}):\n\n\
         Section: {}\n\
         Lines: {}\n\n\
         Code:\n{}\n\n\
         Focus on COBOL-specific elements:\n\
         1. Division/Section structure\n\
         2. Data definitions and usage\n\
         3. Paragraph logic and flow\n\
         4. File operations and I/O\n\
         5. Business logic patterns\n\
         6. COBOL-specific constructs (MOVE, PERFORM, etc.)",
        chunk.sequence,
        total,
        chunk.label.as_deref().unwrap_or("UNKNOWN"),
        lines,
        chunk.content
    )
}

/// Section analyses in first-seen section order
pub fn cobol_merge_prompt(repo: &RepositoryInfo, sections: &[(String, Vec<String>)]) -> String {
    let mut body = format!(
        "COBOL Program: {}\nTotal Lines: {}\n\nSection Analyses:\n",
        repo.name, repo.total_lines
    );
    for (section, analyses) in sections {
        body.push_str(&format!("\n=== {} ===\n", section));
        for (i, analysis) in analyses.iter().enumerate() {
            body.push_str(&format!("Part {}: {}\n\n", i + 1, analysis));
        }
    }

    format!(
        "{}\n\
         Merge these COBOL section analyses into a unified architectural view.\n\
         Focus on:\n\
         1. Overall program structure and flow\n\
         2. Data architecture (files, records, working storage)\n\
         3. Business logic organization\n\
         4. Integration points and dependencies\n\
         5. COBOL-specific patterns and practices\n\
         6. Recommendations for improvement",
        body
    )
}

pub const DIAGRAM_SYSTEM_PROMPT: &str =
    "You are a diagram generator. Return only valid JSON with mermaid_code and description.";

pub const COBOL_FLOW_SYSTEM_PROMPT: &str =
    "Create COBOL-specific Mermaid diagrams. Return only valid JSON.";

pub const COBOL_DATA_SYSTEM_PROMPT: &str =
    "Create COBOL data structure diagrams. Return only valid JSON.";

pub const RECOMMENDATION_SYSTEM_PROMPT: &str =
    "You are an architecture consultant. Return only valid JSON array of recommendations.";

pub const RELATIONSHIP_SYSTEM_PROMPT: &str = "You are an expert software architect analyzing code repositories. Your task is to identify
relationships between files, understand the system architecture, and map out how different components interact.

Focus on:
1. Program entry points and main flows
2. File dependencies (CALL, COPY, INCLUDE relationships)
3. Data sharing and parameter passing
4. Business process workflows
5. System integration points

Be precise and identify actual relationships based on the code structure and content.";

pub const PLANTUML_SYSTEM_PROMPT: &str = "You are an expert at creating PlantUML sequence diagrams for software systems.
Create a comprehensive sequence diagram showing the flow between all files in the repository.";

pub const DOCUMENTATION_SYSTEM_PROMPT: &str = "You are a technical documentation expert. Create comprehensive repository documentation
that explains the system architecture, file relationships, and business processes.";

/// Bracketed, comma-separated list of names
fn name_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    format!("[{}]", names.into_iter().collect::<Vec<_>>().join(", "))
}

fn component_names(analysis: &ArchitecturalAnalysis, limit: usize) -> String {
    name_list(
        analysis
            .components
            .iter()
            .take(limit)
            .map(|c| c.component_name.as_str()),
    )
}

fn dependency_names(analysis: &ArchitecturalAnalysis) -> String {
    name_list(analysis.dependencies.iter().map(String::as_str))
}

pub fn component_diagram_prompt(analysis: &ArchitecturalAnalysis) -> String {
    format!(
        "Create a Mermaid component diagram for these architectural components:\n\n\
         Components: {}\n\
         Dependencies: {}\n\n\
         Create a simple component diagram showing relationships.\n\
         Return ONLY JSON: {{\"mermaid_code\": \"graph TD\\n...\", \"description\": \"Component relationships\"}}",
        component_names(analysis, usize::MAX),
        dependency_names(analysis)
    )
}

/// Sequence diagram over the first four components
pub fn sequence_diagram_prompt(analysis: &ArchitecturalAnalysis) -> String {
    format!(
        "Create a Mermaid sequence diagram for this system:\n\n\
         Components: {}\n\n\
         Create a simple sequence diagram showing main interactions.\n\
         Return ONLY JSON: {{\"mermaid_code\": \"sequenceDiagram\\n...\", \"description\": \"Main process flow\"}}",
        component_names(analysis, 4)
    )
}

pub fn cobol_flow_prompt(analysis: &ArchitecturalAnalysis) -> String {
    format!(
        "Create a Mermaid flowchart for this COBOL program:\n\n\
         Components: {}\n\
         Overview: {}\n\n\
         Create a flowchart showing:\n\
         1. Main program flow\n\
         2. Paragraph calls and relationships\n\
         3. Decision points\n\
         4. File operations\n\n\
         Return ONLY JSON: {{\"mermaid_code\": \"flowchart TD\\n...\", \"description\": \"COBOL program flow\"}}",
        component_names(analysis, usize::MAX),
        analysis.overview
    )
}

pub fn cobol_data_prompt(analysis: &ArchitecturalAnalysis) -> String {
    format!(
        "Create a Mermaid diagram showing COBOL data structures:\n\n\
         Dependencies: {}\n\
         Components: {}\n\n\
         Show:\n\
         1. File definitions and records\n\
         2. Working storage variables\n\
         3. Data relationships\n\
         4. COPY book usage\n\n\
         Return ONLY JSON: {{\"mermaid_code\": \"graph TD\\n...\", \"description\": \"COBOL data structures\"}}",
        dependency_names(analysis),
        component_names(analysis, usize::MAX)
    )
}

pub fn recommendation_prompt(repo: &RepositoryInfo, analysis: &ArchitecturalAnalysis) -> String {
    format!(
        "Based on this architectural analysis, provide 3-5 key recommendations:\n\n\
         Repository: {} ({})\n\
         Components: {}\n\
         Patterns: {}\n\n\
         Focus on:\n\
         1. Architecture improvements\n\
         2. Code quality enhancements\n\
         3. Performance optimizations\n\
         4. Maintainability improvements\n\n\
         Return JSON array: [{{\"title\": \"...\", \"description\": \"...\", \"priority\": \"high|medium|low\", \"impact\": \"...\"}}]",
        repo.name,
        repo.primary_language,
        analysis.components.len(),
        name_list(analysis.patterns.iter().map(|p| p.pattern.as_str()))
    )
}

/// `summaries` is the pretty-printed JSON array of file summaries
pub fn relationship_prompt(repo: &RepositoryInfo, summaries: &str) -> String {
    format!(
        "Analyze the relationships between these files in a {} repository:\n\n\
         Repository: {}\n\
         Total Files: {}\n\n\
         File Summaries:\n{}\n\n\
         Identify:\n\
         1. Main program entry points\n\
         2. Called programs/modules\n\
         3. Data flow between files\n\
         4. Shared data structures\n\
         5. File dependencies and call hierarchy\n\
         6. Business process flow across files\n\n\
         Return as JSON with this structure:\n\
         {{\n  \"entry_points\": [\"main_file1.cbl\", \"main_file2.cbl\"],\n  \
         \"call_relationships\": [\n    {{\"caller\": \"file1.cbl\", \"called\": \"file2.cbl\", \"relationship_type\": \"CALL|COPY|INCLUDE\", \"description\": \"...\"}}\n  ],\n  \
         \"data_flow\": [\n    {{\"from\": \"file1.cbl\", \"to\": \"file2.cbl\", \"data_type\": \"record|file|parameter\", \"description\": \"...\"}}\n  ],\n  \
         \"shared_resources\": [\n    {{\"resource\": \"CUSTOMER-RECORD\", \"used_by\": [\"file1.cbl\", \"file2.cbl\"], \"type\": \"copybook|data_structure\"}}\n  ],\n  \
         \"business_processes\": [\n    {{\"process\": \"Customer Processing\", \"files\": [\"file1.cbl\", \"file2.cbl\"], \"flow\": \"sequential|parallel\"}}\n  ]\n}}",
        repo.primary_language, repo.name, repo.total_files, summaries
    )
}

/// `relationships` is the pretty-printed JSON of the relationship call
pub fn plantuml_prompt(repo: &RepositoryInfo, files: &[&str], relationships: &str) -> String {
    format!(
        "Create a PlantUML sequence diagram for this {} repository:\n\n\
         Repository: {}\n\
         Files: {}\n\n\
         Relationships:\n{}\n\n\
         Create a sequence diagram that shows:\n\
         1. Main entry points as actors or participants\n\
         2. File-to-file calls and interactions\n\
         3. Data flow between components\n\
         4. Business process flow\n\
         5. External system interactions (if any)\n\n\
         Use proper PlantUML syntax:\n\
         - Use participant declarations\n\
         - Show activation/deactivation\n\
         - Include notes for important business logic\n\
         - Group related interactions\n\
         - Use different arrow types for different relationship types\n\n\
         Return ONLY the PlantUML code starting with @startuml and ending with @enduml.",
        repo.primary_language,
        repo.name,
        name_list(files.iter().copied()),
        relationships
    )
}

pub fn documentation_prompt(repo: &RepositoryInfo, files: &[&str], relationships: &str) -> String {
    format!(
        "Create comprehensive documentation for this {} repository:\n\n\
         Repository: {}\n\
         Total Files: {}\n\
         Files: {}\n\n\
         Relationships Analysis:\n{}\n\n\
         Create documentation with these sections:\n\
         1. **System Overview** - High-level description of what this system does\n\
         2. **Architecture Summary** - How files are organized and interact\n\
         3. **File Relationships** - Detailed explanation of how files call each other\n\
         4. **Data Flow** - How data moves through the system\n\
         5. **Business Processes** - Key business workflows implemented\n\
         6. **Entry Points** - Main programs and how to execute them\n\
         7. **Dependencies** - External dependencies and shared resources\n\n\
         Use markdown formatting with clear headings and bullet points.",
        repo.primary_language,
        repo.name,
        files.len(),
        name_list(files.iter().copied()),
        relationships
    )
}
