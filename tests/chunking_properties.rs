/// Integration tests for chunk planning guarantees
use archlens::chunking::{BoundaryLevel, ChunkPlanner, FileChunker, detect_boundaries};
use archlens::config::{ChunkingConfig, Config};
use archlens::tokenizer::{HeuristicEstimator, TokenEstimator};
use archlens::types::{Chunk, ChunkPlan, SourceFile};
use std::sync::Arc;

fn planner(max_tokens: usize) -> ChunkPlanner {
    let mut config = Config::default();
    config.tokenizer.estimator = "heuristic".to_string();
    config.chunking.max_tokens = max_tokens;
    ChunkPlanner::from_config(&config)
}

fn chunker(max_tokens: usize) -> FileChunker {
    FileChunker::new(
        Arc::new(HeuristicEstimator::default()),
        ChunkingConfig {
            max_tokens,
            ..ChunkingConfig::default()
        },
    )
}

/// Source lines carried by `chunks`, skipping banners and carried-over lines
fn reassemble(chunks: &[Chunk]) -> Vec<String> {
    chunks
        .iter()
        .flat_map(|chunk| {
            let overlap = chunk.members[0].overlap_lines;
            chunk
                .body()
                .split('\n')
                .skip(overlap)
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn source_lines(file: &SourceFile) -> Vec<String> {
    file.content.lines().map(str::to_string).collect()
}

fn text_cost(text: &str) -> usize {
    let estimator = HeuristicEstimator::default();
    text.lines().map(|l| estimator.line_cost(l)).sum()
}

/// A COBOL program whose procedure division holds `sections` sections
fn cobol_program(sections: usize, statements: usize) -> String {
    let mut lines = vec![
        "       IDENTIFICATION DIVISION.".to_string(),
        "       PROGRAM-ID. PAYROLL.".to_string(),
        "       PROCEDURE DIVISION.".to_string(),
    ];
    for s in 1..=sections {
        lines.push(format!("       S{}00-STEP SECTION.", s));
        for i in 0..statements {
            lines.push(format!(
                "           COMPUTE WS-TOTAL-{} = WS-TOTAL-{} + WS-RATE * {}.",
                s, s, i
            ));
        }
    }
    lines.join("\n")
}

#[test]
fn test_chunk_coverage_reconstructs_cobol_file() {
    let file = SourceFile::with_language("PAYROLL.cbl", "cobol", cobol_program(6, 60));
    let chunks = chunker(900).chunk_file(&file).unwrap();

    assert!(chunks.len() > 1);
    assert_eq!(reassemble(&chunks), source_lines(&file));
}

#[test]
fn test_chunk_coverage_reconstructs_unstructured_file() {
    let content = (0..2_500)
        .map(|i| format!("row {} | {}", i, "x".repeat(i % 17)))
        .collect::<Vec<_>>()
        .join("\n");
    let file = SourceFile::with_language("data/rows.txt", "text", content);
    let chunks = chunker(120_000).chunk_file(&file).unwrap();

    // 1000-line windows overlapping by 50 lines
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[1].members[0].overlap_lines, 50);
    assert_eq!(reassemble(&chunks), source_lines(&file));
}

#[test]
fn test_chunk_coverage_reconstructs_python_file() {
    let mut content = String::from("import os\nimport sys\n\n");
    for c in 0..12 {
        content.push_str(&format!("class Handler{}:\n", c));
        for m in 0..8 {
            content.push_str(&format!(
                "    def method_{}(self, value):\n        return os.path.join(str(value), '{}')\n\n",
                m, m
            ));
        }
    }
    let file = SourceFile::with_language("app/handlers.py", "python", content);
    let chunks = chunker(700).chunk_file(&file).unwrap();

    assert!(chunks.len() > 2);
    assert_eq!(reassemble(&chunks), source_lines(&file));
}

#[test]
fn test_every_chunk_respects_budget() {
    let budget = 1_000;
    let file = SourceFile::with_language("PAYROLL.cbl", "cobol", cobol_program(8, 45));
    let chunks = chunker(budget).chunk_file(&file).unwrap();

    assert!(chunks.len() > 2);
    for chunk in &chunks {
        assert!(
            chunk.token_count <= budget,
            "chunk {} has {} tokens",
            chunk.sequence,
            chunk.token_count
        );
    }
}

#[test]
fn test_division_wins_over_section_on_same_line() {
    let lines = ["       DATA DIVISION. WORKING-STORAGE SECTION."];
    let map = detect_boundaries(&lines, "cobol");

    assert_eq!(map.len(), 1);
    let boundary = map.iter().next().unwrap();
    assert_eq!(boundary.level, BoundaryLevel::Division);
    assert_eq!(boundary.label, "DATA_DIVISION");
}

#[test]
fn test_giant_paragraph_terminates() {
    let mut lines = vec![
        "       PROCEDURE DIVISION.".to_string(),
        "       0000-MAIN.".to_string(),
    ];
    for i in 0..5_000 {
        lines.push(format!("           MOVE {} TO WS-COUNTER-{}.", i, i % 7));
    }
    let file = SourceFile::with_language("GIANT.cbl", "cobol", lines.join("\n"));
    let budget = 2_000;
    let chunks = chunker(budget).chunk_file(&file).unwrap();

    assert!(chunks.len() > 5);
    assert!(chunks.iter().all(|c| c.token_count <= budget));
    // Each chunk moves past the previous one
    for pair in chunks.windows(2) {
        assert!(pair[1].members[0].start_line > pair[0].members[0].start_line);
    }
    assert_eq!(reassemble(&chunks), source_lines(&file));
}

#[test]
fn test_small_repository_is_one_chunk_in_ranked_order() {
    let files = vec![
        SourceFile::with_language("shop/README.md", "markdown", "# Shop\nA tiny shop."),
        SourceFile::with_language("shop/utils.py", "python", "def money(x):\n    return round(x, 2)"),
        SourceFile::with_language("shop/main.py", "python", "from utils import money\nprint(money(3))"),
    ];
    let plan = planner(120_000).plan(&files).unwrap();

    let ChunkPlan::Single(chunk) = plan else {
        panic!("expected a single chunk");
    };
    assert_eq!(chunk.members.len(), 3);

    let main = chunk.content.find("--- File: shop/main.py (python) ---").unwrap();
    let utils = chunk.content.find("--- File: shop/utils.py (python) ---").unwrap();
    let readme = chunk.content.find("--- File: shop/README.md (markdown) ---").unwrap();
    assert!(main < utils && utils < readme);
}

#[test]
fn test_cobol_sections_over_budget() {
    let budget = 1_200;
    let program = cobol_program(5, 39);
    assert!(text_cost(&program) > 3 * budget);

    let files = vec![SourceFile::with_language("PAYROLL.cbl", "cobol", program)];
    let plan = planner(budget).plan(&files).unwrap();

    let ChunkPlan::Structured(chunks, language) = &plan else {
        panic!("expected a structured plan");
    };
    assert_eq!(language, "cobol");

    // Each section costs 819 tokens, past the 805 token high-level threshold,
    // so every later section opens a chunk of its own
    let labels: Vec<&str> = chunks.iter().map(|c| c.label.as_deref().unwrap()).collect();
    assert_eq!(
        labels,
        vec![
            "IDENTIFICATION_DIVISION",
            "S200-STEP_SECTION",
            "S300-STEP_SECTION",
            "S400-STEP_SECTION",
            "S500-STEP_SECTION",
        ]
    );

    for (index, chunk) in chunks.iter().enumerate() {
        assert!(chunk.token_count <= budget);
        let label = chunk.label.as_deref().unwrap();

        // The first line the chunk adds is the header it is labelled after
        let overlap = chunk.members[0].overlap_lines;
        let opening = chunk.body().split('\n').nth(overlap).unwrap();
        assert_eq!(opening.trim().trim_end_matches('.').replace(' ', "_"), label);
        if index > 0 {
            assert_eq!(overlap, 3);
        }

        assert_eq!(
            chunk.banner(),
            format!("=== COBOL FILE: PAYROLL.cbl - CHUNK {} ({}) ===", index + 1, label)
        );
    }

    assert_eq!(reassemble(chunks), source_lines(&files[0]));
}
