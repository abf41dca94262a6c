//! Structure-aware splitting of one file into budget-bounded chunks
//!
//! [`SegmentBuilder`] walks the line stream and decides where chunks start
//! and end; [`FileChunker`] renders those line ranges with their banners.

use super::boundary::{BoundaryMap, detect_boundaries};
use crate::config::ChunkingConfig;
use crate::error::ChunkingError;
use crate::tokenizer::TokenEstimator;
use crate::types::{Chunk, ChunkMember, SourceFile};
use std::sync::Arc;

/// Longest label a banner carries
pub const MAX_LABEL_LEN: usize = 48;

/// Label used for lines before the first boundary of a structured file
pub const PREAMBLE_LABEL: &str = "PREAMBLE";

/// Tokens kept free on top of the banner estimate
const BANNER_SLACK: usize = 16;

/// A contiguous line range of one file chosen to become a chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// First line, 0-based
    pub start: usize,
    /// One past the last line
    pub end: usize,
    /// Leading lines repeated from the previous segment
    pub overlap: usize,
    /// Sum of line costs over the range
    pub tokens: usize,
    pub label: Option<String>,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// First line that is not carried over from the previous segment
    pub fn first_new_line(&self) -> usize {
        self.start + self.overlap
    }
}

/// Token thresholds in effect for one file
#[derive(Debug, Clone, Copy)]
struct Limits {
    high_level: usize,
    emergency: usize,
    forced_ratio: f64,
    window: usize,
    boundary_overlap: usize,
    emergency_overlap: usize,
    fallback_max_lines: usize,
    fallback_overlap: usize,
}

impl Limits {
    fn new(budget: usize, config: &ChunkingConfig) -> Self {
        let ratio = |r: f64| (budget as f64 * r).floor() as usize;
        Self {
            high_level: ratio(config.high_level_split_ratio),
            emergency: ratio(config.emergency_split_ratio),
            forced_ratio: config.forced_split_ratio,
            window: config.boundary_search_window,
            boundary_overlap: config.boundary_overlap_lines,
            emergency_overlap: config.emergency_overlap_lines,
            fallback_max_lines: config.fallback_max_lines.max(2),
            fallback_overlap: config.fallback_overlap_lines,
        }
    }
}

/// State machine that cuts a line stream into segments
///
/// The accumulation is `[start, start + len)`, of which the first `overlap`
/// lines were already emitted with the previous segment. Every split moves
/// the accumulation forward, so the builder terminates on any input; a single
/// line larger than the budget becomes a segment of its own.
pub struct SegmentBuilder<'a> {
    boundaries: &'a BoundaryMap,
    /// prefix[i] is the cost of lines [0, i)
    prefix: Vec<usize>,
    limits: Limits,
    start: usize,
    len: usize,
    overlap: usize,
    segments: Vec<Segment>,
}

impl<'a> SegmentBuilder<'a> {
    /// Create a builder for lines whose costs are `costs`, with `budget`
    /// tokens available for source text per segment
    pub fn new(
        costs: &[usize],
        boundaries: &'a BoundaryMap,
        budget: usize,
        config: &ChunkingConfig,
    ) -> Self {
        let mut prefix = Vec::with_capacity(costs.len() + 1);
        prefix.push(0);
        let mut total = 0;
        for cost in costs {
            total += cost;
            prefix.push(total);
        }

        Self {
            boundaries,
            prefix,
            limits: Limits::new(budget, config),
            start: 0,
            len: 0,
            overlap: 0,
            segments: Vec::new(),
        }
    }

    /// Run the state machine over every line and return the segments
    pub fn build(mut self) -> Vec<Segment> {
        let line_count = self.prefix.len() - 1;

        for line in 0..line_count {
            if self.boundaries.is_empty() {
                self.close_window(line);
            } else {
                self.close_at_boundary(line);
            }

            self.len += 1;
            self.relieve();
        }

        if self.len > self.overlap {
            self.emit(self.start + self.len);
        }

        self.segments
    }

    fn tokens(&self) -> usize {
        self.cost(self.start, self.start + self.len)
    }

    fn cost(&self, start: usize, end: usize) -> usize {
        self.prefix[end] - self.prefix[start]
    }

    fn has_new_lines(&self) -> bool {
        self.len > self.overlap
    }

    /// Close the accumulation before a high-level boundary once it is large enough
    fn close_at_boundary(&mut self, line: usize) {
        let Some(boundary) = self.boundaries.get(line) else {
            return;
        };
        if !self.boundaries.is_major(boundary)
            || self.tokens() <= self.limits.high_level
            || !self.has_new_lines()
        {
            return;
        }

        self.emit(line);
        let context = self.limits.boundary_overlap.min(self.len);
        self.restart(line - context, context, context);
    }

    /// Close a fixed line window of a file without structure
    fn close_window(&mut self, line: usize) {
        if self.len < self.limits.fallback_max_lines || !self.has_new_lines() {
            return;
        }

        self.emit(line);
        let context = self.limits.fallback_overlap.min(self.len - 1);
        self.restart(line - context, context, context);
    }

    /// Split until the accumulation is back under the emergency threshold
    fn relieve(&mut self) {
        while self.tokens() > self.limits.emergency && self.len > 1 {
            if let Some(split) = self.boundary_split_point() {
                let context = self.limits.emergency_overlap.min(split - 1);
                let end = self.start + split;
                tracing::trace!("Emergency split at boundary line {}", end);
                self.emit(end);
                self.restart(end - context, self.len - split + context, context);
            } else if let Some(split) = self.forced_split_point() {
                let end = self.start + split;
                tracing::trace!("Forced split at line {}", end);
                self.emit(end);
                self.restart(end, self.len - split, 0);
            } else {
                // Only carried context is left to give up
                self.start += self.overlap;
                self.len -= self.overlap;
                self.overlap = 0;
            }
        }
    }

    /// Nearest boundary in the backward window that leaves new lines on both sides
    fn boundary_split_point(&self) -> Option<usize> {
        let lowest = (self.overlap + 1).max(self.len.saturating_sub(self.limits.window));
        (lowest..self.len)
            .rev()
            .find(|offset| self.boundaries.get(self.start + offset).is_some())
    }

    fn forced_split_point(&self) -> Option<usize> {
        let split = (self.overlap + 1)
            .max((self.len as f64 * self.limits.forced_ratio).floor() as usize);
        (split < self.len).then_some(split)
    }

    fn emit(&mut self, end: usize) {
        let first_new = self.start + self.overlap;
        let label = if self.boundaries.is_empty() {
            None
        } else {
            Some(
                self.boundaries
                    .label_at(first_new)
                    .map(sanitize_label)
                    .unwrap_or_else(|| PREAMBLE_LABEL.to_string()),
            )
        };

        self.segments.push(Segment {
            start: self.start,
            end,
            overlap: self.overlap,
            tokens: self.cost(self.start, end),
            label,
        });
    }

    /// Continue with `len` lines at `start`, the first `overlap` of them already emitted
    fn restart(&mut self, start: usize, len: usize, overlap: usize) {
        self.start = start;
        self.len = len;
        self.overlap = overlap;
    }
}

/// Reduce a label to printable ASCII of bounded length
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .take(MAX_LABEL_LEN)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Renders the segments of one file as chunks with banners
pub struct FileChunker {
    estimator: Arc<dyn TokenEstimator>,
    config: ChunkingConfig,
}

impl FileChunker {
    pub fn new(estimator: Arc<dyn TokenEstimator>, config: ChunkingConfig) -> Self {
        Self { estimator, config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split a file into chunks numbered from 1 within the file
    pub fn chunk_file(&self, file: &SourceFile) -> Result<Vec<Chunk>, ChunkingError> {
        let lines: Vec<&str> = file.content.lines().collect();
        if lines.is_empty() {
            return Ok(vec![self.whole_file(file)]);
        }

        let reserve = self.banner_reserve(file);
        let budget = self
            .config
            .max_tokens
            .checked_sub(reserve)
            .filter(|b| *b > 0)
            .ok_or_else(|| {
                ChunkingError::InvalidBudget(format!(
                    "{} tokens leave no room for source text after a {} token banner",
                    self.config.max_tokens, reserve
                ))
            })?;

        let boundaries = detect_boundaries(&lines, &file.language);
        let costs: Vec<usize> = lines.iter().map(|l| self.estimator.line_cost(l)).collect();
        let segments = SegmentBuilder::new(&costs, &boundaries, budget, &self.config).build();

        tracing::debug!(
            "Split {} ({} lines, {} boundaries) into {} chunks",
            file.path,
            lines.len(),
            boundaries.len(),
            segments.len()
        );

        Ok(segments
            .iter()
            .enumerate()
            .map(|(index, segment)| self.render(file, &lines, segment, index + 1))
            .collect())
    }

    /// One chunk carrying the whole file
    pub fn whole_file(&self, file: &SourceFile) -> Chunk {
        let banner = if file.is_cobol() {
            format!("=== COBOL FILE: {} ===", file.name())
        } else {
            format!("--- File: {} ---", file.path)
        };
        let content = format!("{}\n\n{}", banner, file.content);

        Chunk {
            sequence: 1,
            token_count: self.estimator.estimate(&content),
            content,
            members: vec![ChunkMember {
                path: file.path.clone(),
                language: file.language.clone(),
                start_line: 1,
                end_line: file.lines,
                overlap_lines: 0,
            }],
            label: None,
        }
    }

    fn banner(&self, file: &SourceFile, part: usize, label: Option<&str>) -> String {
        match (file.is_cobol(), label) {
            (true, Some(label)) => {
                format!("=== COBOL FILE: {} - CHUNK {} ({}) ===", file.name(), part, label)
            }
            (true, None) => format!("=== COBOL FILE: {} - CHUNK {} ===", file.name(), part),
            (false, Some(label)) => {
                format!("--- File: {} (Part {}: {}) ---", file.path, part, label)
            }
            (false, None) => format!("--- File: {} (Part {}) ---", file.path, part),
        }
    }

    /// Worst-case banner cost for this file
    fn banner_reserve(&self, file: &SourceFile) -> usize {
        let widest_label = "X".repeat(MAX_LABEL_LEN);
        let banner = self.banner(file, 9999, Some(&widest_label));
        self.estimator.estimate(&banner) + self.estimator.estimate("\n\n") + BANNER_SLACK
    }

    fn render(&self, file: &SourceFile, lines: &[&str], segment: &Segment, part: usize) -> Chunk {
        let banner = self.banner(file, part, segment.label.as_deref());
        let content = format!("{}\n\n{}", banner, lines[segment.start..segment.end].join("\n"));

        Chunk {
            sequence: part,
            token_count: self.estimator.estimate(&content),
            content,
            members: vec![ChunkMember {
                path: file.path.clone(),
                language: file.language.clone(),
                start_line: segment.start + 1,
                end_line: segment.end,
                overlap_lines: segment.overlap,
            }],
            label: segment.label.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::boundary::BoundaryPolicy;
    use crate::tokenizer::HeuristicEstimator;

    fn config(max_tokens: usize) -> ChunkingConfig {
        ChunkingConfig {
            max_tokens,
            ..ChunkingConfig::default()
        }
    }

    fn chunker(max_tokens: usize) -> FileChunker {
        FileChunker::new(Arc::new(HeuristicEstimator::default()), config(max_tokens))
    }

    /// Rebuild the file lines from segments, skipping carried-over lines
    fn reassemble(segments: &[Segment], lines: &[String]) -> Vec<String> {
        segments
            .iter()
            .flat_map(|s| lines[s.first_new_line()..s.end].iter().cloned())
            .collect()
    }

    fn build(lines: &[String], language: &str, budget: usize) -> Vec<Segment> {
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let map = detect_boundaries(&refs, language);
        let est = HeuristicEstimator::default();
        let costs: Vec<usize> = refs.iter().map(|l| est.line_cost(l)).collect();
        SegmentBuilder::new(&costs, &map, budget, &config(budget)).build()
    }

    fn assert_contiguous(segments: &[Segment]) {
        for pair in segments.windows(2) {
            assert_eq!(pair[1].first_new_line(), pair[0].end, "{:?}", pair);
            assert!(pair[1].overlap < pair[1].len());
        }
    }

    #[test]
    fn test_small_input_is_one_segment() {
        let lines: Vec<String> = (0..5).map(|i| format!("line {}", i)).collect();
        let segments = build(&lines, "text", 1000);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, 0);
        assert_eq!(segments[0].end, 5);
        assert_eq!(segments[0].overlap, 0);
        assert_eq!(segments[0].label, None);
    }

    #[test]
    fn test_empty_input_has_no_segments() {
        let map = BoundaryMap::new(BoundaryPolicy::Generic);
        let segments = SegmentBuilder::new(&[], &map, 100, &config(100)).build();
        assert!(segments.is_empty());
    }

    #[test]
    fn test_splits_at_sections_past_high_level_threshold() {
        let mut lines = vec!["PROCEDURE DIVISION.".to_string()];
        for section in 0..4 {
            lines.push(format!("S{}00-WORK SECTION.", section));
            for i in 0..20 {
                lines.push(format!("    MOVE WS-FIELD-{:02} TO WS-TOTAL.", i));
            }
        }
        let segments = build(&lines, "cobol", 330);

        assert_eq!(segments.len(), 4);
        assert_contiguous(&segments);
        assert_eq!(reassemble(&segments, &lines), lines);
        for segment in &segments[1..] {
            let label = segment.label.as_deref().unwrap();
            assert!(label.ends_with("-WORK_SECTION"), "{}", label);
            // Closed at a section boundary: the first new line is the section header
            assert!(lines[segment.first_new_line()].contains("SECTION"));
            assert!(segment.overlap <= 3);
        }
    }

    #[test]
    fn test_giant_paragraph_terminates_within_budget() {
        let mut lines = vec!["PROCEDURE DIVISION.".to_string(), "0100-BIG.".to_string()];
        for i in 0..2000 {
            lines.push(format!("    ADD {} TO WS-COUNTER GIVING WS-RESULT.", i));
        }
        let budget = 500;
        let segments = build(&lines, "cobol", budget);

        assert!(segments.len() > 5);
        assert_contiguous(&segments);
        assert_eq!(reassemble(&segments, &lines), lines);
        for segment in &segments {
            assert!(segment.tokens <= budget, "{:?}", segment);
            assert!(segment.len() > segment.overlap);
        }
    }

    #[test]
    fn test_single_oversized_line_is_isolated() {
        let lines = vec![
            "short".to_string(),
            "x".repeat(3000),
            "tail one".to_string(),
            "tail two".to_string(),
        ];
        let segments = build(&lines, "text", 100);

        assert_contiguous(&segments);
        assert_eq!(reassemble(&segments, &lines), lines);
        let giant = segments
            .iter()
            .find(|s| s.tokens > 100)
            .expect("oversized segment");
        assert_eq!(giant.len() - giant.overlap, 1);
        assert_eq!(giant.first_new_line(), 1);
    }

    #[test]
    fn test_generic_splits_land_on_declarations() {
        let mut lines = Vec::new();
        for func in 0..6 {
            lines.push(format!("def handler_{}(request):", func));
            for i in 0..10 {
                lines.push(format!("    value_{} = compute(request, {})", i, i));
            }
        }
        let segments = build(&lines, "python", 300);

        assert!(segments.len() > 1);
        assert_contiguous(&segments);
        assert_eq!(reassemble(&segments, &lines), lines);
        for segment in &segments[1..] {
            assert!(lines[segment.first_new_line()].starts_with("def handler_"));
            assert!(segment.label.as_deref().unwrap().starts_with("handler_"));
        }
    }

    #[test]
    fn test_unstructured_file_uses_line_windows() {
        let lines: Vec<String> = (0..250).map(|i| format!("{}", i)).collect();
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let map = detect_boundaries(&refs, "text");
        let costs = vec![1; lines.len()];
        let cfg = ChunkingConfig {
            fallback_max_lines: 100,
            fallback_overlap_lines: 10,
            ..config(100_000)
        };
        let segments = SegmentBuilder::new(&costs, &map, 100_000, &cfg).build();

        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|s| s.len() <= 100));
        assert_eq!(segments[1].overlap, 10);
        assert_contiguous(&segments);
        assert_eq!(reassemble(&segments, &lines), lines);
    }

    #[test]
    fn test_preamble_label_before_first_boundary() {
        let mut lines: Vec<String> = (0..40).map(|i| format!("# comment line {}", i)).collect();
        lines.push("def late():".to_string());
        lines.push("    return 1".to_string());
        let segments = build(&lines, "python", 200);
        assert_eq!(segments[0].label.as_deref(), Some(PREAMBLE_LABEL));
    }

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("MAIN_SECTION"), "MAIN_SECTION");
        assert_eq!(sanitize_label("caf\u{e9}"), "caf_");
        assert_eq!(sanitize_label(&"A".repeat(100)).len(), MAX_LABEL_LEN);
    }

    #[test]
    fn test_chunk_file_banners_and_members() {
        let mut content = String::from("IDENTIFICATION DIVISION.\nPROGRAM-ID. BIG.\nPROCEDURE DIVISION.\n");
        for section in 0..3 {
            content.push_str(&format!("A{}00-STEP SECTION.\n", section));
            for i in 0..30 {
                content.push_str(&format!("    DISPLAY 'STEP {} LINE {}'.\n", section, i));
            }
        }
        let file = SourceFile::with_language("legacy/BIG.cbl", "cobol", content.clone());
        let chunks = chunker(600).chunk_file(&file).unwrap();

        assert!(chunks.len() > 1);
        for (index, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.sequence, index + 1);
            assert!(chunk.banner().starts_with(&format!("=== COBOL FILE: BIG.cbl - CHUNK {} (", index + 1)));
            assert!(chunk.token_count <= 600, "chunk {} has {}", index, chunk.token_count);
            assert_eq!(chunk.members.len(), 1);
        }

        let rebuilt: Vec<&str> = chunks
            .iter()
            .flat_map(|c| c.body().lines().skip(c.members[0].overlap_lines))
            .collect();
        let original: Vec<&str> = content.lines().collect();
        assert_eq!(rebuilt, original);
        assert_eq!(chunks.last().unwrap().members[0].end_line, original.len());
    }

    #[test]
    fn test_chunk_file_generic_banner() {
        let content = (0..400)
            .map(|i| format!("plain text line number {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let file = SourceFile::with_language("docs/notes.txt", "text", content);
        let chunks = chunker(1000).chunk_file(&file).unwrap();

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].banner(), "--- File: docs/notes.txt (Part 1) ---");
        assert!(chunks.iter().all(|c| c.token_count <= 1000));
    }

    #[test]
    fn test_chunk_file_rejects_tiny_budget() {
        let file = SourceFile::with_language("a.py", "python", "x = 1\n");
        let err = chunker(10).chunk_file(&file).unwrap_err();
        assert!(matches!(err, ChunkingError::InvalidBudget(_)));
    }

    #[test]
    fn test_whole_file_banners() {
        let cobol = SourceFile::with_language("src/PAY.cbl", "cobol", "A.\nB.");
        let chunk = chunker(1000).whole_file(&cobol);
        assert_eq!(chunk.banner(), "=== COBOL FILE: PAY.cbl ===");
        assert_eq!(chunk.body(), "A.\nB.");
        assert_eq!(chunk.members[0].end_line, 2);

        let python = SourceFile::with_language("src/app.py", "python", "x = 1");
        assert_eq!(chunker(1000).whole_file(&python).banner(), "--- File: src/app.py ---");
    }
}
