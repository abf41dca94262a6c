//! Structural boundary detection over raw source lines
//!
//! Boundaries are located with line-pattern heuristics only. COBOL uses three
//! tiers (division > section > paragraph) and records the highest tier that
//! matches a line; every other language uses a per-language table of
//! declaration patterns where the first match wins.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Structural level of a boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryLevel {
    Division,
    Section,
    Paragraph,
    Class,
    Function,
}

impl BoundaryLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryLevel::Division => "division",
            BoundaryLevel::Section => "section",
            BoundaryLevel::Paragraph => "paragraph",
            BoundaryLevel::Class => "class",
            BoundaryLevel::Function => "function",
        }
    }
}

impl std::fmt::Display for BoundaryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line that starts a structurally significant unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
    /// 0-based line index
    pub line: usize,
    pub level: BoundaryLevel,
    pub label: String,
}

/// Which family of patterns produced a map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryPolicy {
    Cobol,
    Generic,
}

/// Boundaries of one file keyed by line index
#[derive(Debug, Clone)]
pub struct BoundaryMap {
    policy: BoundaryPolicy,
    entries: BTreeMap<usize, Boundary>,
}

impl BoundaryMap {
    pub fn new(policy: BoundaryPolicy) -> Self {
        Self {
            policy,
            entries: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> BoundaryPolicy {
        self.policy
    }

    pub fn get(&self, line: usize) -> Option<&Boundary> {
        self.entries.get(&line)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Boundary> {
        self.entries.values()
    }

    /// Whether a boundary may close a chunk before the emergency threshold
    ///
    /// COBOL closes chunks at divisions and sections only. Declarations are
    /// the highest level other languages have, so every one of them qualifies.
    pub fn is_major(&self, boundary: &Boundary) -> bool {
        match self.policy {
            BoundaryPolicy::Cobol => matches!(
                boundary.level,
                BoundaryLevel::Division | BoundaryLevel::Section
            ),
            BoundaryPolicy::Generic => true,
        }
    }

    /// Label of the unit that contains `line`
    ///
    /// Prefers the nearest major boundary at or before the line, then the
    /// nearest boundary of any level.
    pub fn label_at(&self, line: usize) -> Option<&str> {
        let mut nearest = None;
        for boundary in self.entries.range(..=line).rev().map(|(_, b)| b) {
            if self.is_major(boundary) {
                return Some(boundary.label.as_str());
            }
            if nearest.is_none() {
                nearest = Some(boundary.label.as_str());
            }
        }
        nearest
    }

    fn insert(&mut self, boundary: Boundary) {
        self.entries.entry(boundary.line).or_insert(boundary);
    }
}

/// How a matched line becomes a label
#[derive(Debug, Clone, Copy)]
enum LabelRule {
    /// A fixed tag
    Fixed(&'static str),
    /// The first capture group with '-' replaced by '_' and a suffix appended
    Keyword(&'static str),
    /// The first capture group followed by a suffix
    Name(&'static str),
}

struct Rule {
    regex: Regex,
    level: BoundaryLevel,
    label: LabelRule,
}

impl Rule {
    fn label_for(&self, line: &str) -> Option<String> {
        let caps = self.regex.captures(line)?;
        let captured = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let label = match self.label {
            LabelRule::Fixed(tag) => tag.to_string(),
            LabelRule::Keyword(suffix) => format!("{}{}", captured.replace('-', "_"), suffix),
            LabelRule::Name(suffix) => format!("{}{}", captured, suffix),
        };
        Some(label)
    }
}

fn compile(specs: &[(&str, BoundaryLevel, LabelRule)]) -> Vec<Rule> {
    specs
        .iter()
        .filter_map(|(pattern, level, label)| {
            match RegexBuilder::new(pattern).case_insensitive(true).build() {
                Ok(regex) => Some(Rule {
                    regex,
                    level: *level,
                    label: *label,
                }),
                Err(e) => {
                    tracing::error!("Invalid boundary pattern {:?}: {}", pattern, e);
                    None
                }
            }
        })
        .collect()
}

/// Anchors a COBOL pattern after the optional 6-digit sequence area
macro_rules! seq {
    ($pattern:literal) => {
        concat!(r"^(?:\d{6}\s+)?", $pattern)
    };
}

static COBOL_DIVISIONS: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    compile(&[
        (
            seq!(r"(?:IDENTIFICATION|ID)\s+DIVISION\b"),
            BoundaryLevel::Division,
            LabelRule::Fixed("IDENTIFICATION_DIVISION"),
        ),
        (
            seq!(r"(ENVIRONMENT|DATA|PROCEDURE)\s+DIVISION\b"),
            BoundaryLevel::Division,
            LabelRule::Keyword("_DIVISION"),
        ),
    ])
});

/// Identification headers; accepted wherever they start
static COBOL_HEADERS: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    compile(&[
        (
            seq!(r"PROGRAM-ID\b"),
            BoundaryLevel::Section,
            LabelRule::Fixed("PROGRAM_ID"),
        ),
        (
            seq!(r"(AUTHOR|INSTALLATION|DATE-WRITTEN|DATE-COMPILED|SECURITY)\s*\."),
            BoundaryLevel::Section,
            LabelRule::Keyword(""),
        ),
    ])
});

/// Section headers; only accepted in area A
static COBOL_SECTIONS: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    compile(&[
        (
            seq!(r"(WORKING-STORAGE|LOCAL-STORAGE|LINKAGE|FILE|CONFIGURATION|INPUT-OUTPUT|REPORT|SCREEN|COMMUNICATION)\s+SECTION\b"),
            BoundaryLevel::Section,
            LabelRule::Keyword("_SECTION"),
        ),
        (
            seq!(r"([A-Z0-9][\w-]*-SECTION)\s*\."),
            BoundaryLevel::Section,
            LabelRule::Name(""),
        ),
        (
            seq!(r"([A-Z0-9][\w-]*)\s+SECTION(?:\s+\d+)?\s*\."),
            BoundaryLevel::Section,
            LabelRule::Name("_SECTION"),
        ),
    ])
});

static COBOL_PARAGRAPHS: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    compile(&[(
        seq!(r"([A-Z0-9][A-Z0-9-]*)\s*\."),
        BoundaryLevel::Paragraph,
        LabelRule::Name(""),
    )])
});

/// First column of area B, 0-based; sections and paragraphs start before it
const AREA_B_COLUMN: usize = 11;

static COBOL_COMMENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(?:\d{6})?\s*[*/]").ok());

/// Single-word statements that look like paragraph labels
const COBOL_STATEMENTS: &[&str] = &["EXIT", "GOBACK", "CONTINUE", "STOP", "SKIP1", "SKIP2", "SKIP3", "EJECT"];

/// Keywords that the C-family function patterns would otherwise accept as names
const CONTROL_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "switch", "return", "catch", "sizeof", "do", "new", "delete",
];

const PYTHON: &[(&str, BoundaryLevel, LabelRule)] = &[
    (r"^(?:async\s+)?def\s+(\w+)\s*\(", BoundaryLevel::Function, LabelRule::Name("")),
    (r"^class\s+(\w+)\s*[\(:]", BoundaryLevel::Class, LabelRule::Name("")),
];

const JAVASCRIPT: &[(&str, BoundaryLevel, LabelRule)] = &[
    (
        r"^(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(\w+)\s*\(",
        BoundaryLevel::Function,
        LabelRule::Name(""),
    ),
    (
        r"^(?:export\s+)?(?:default\s+)?class\s+(\w+)",
        BoundaryLevel::Class,
        LabelRule::Name(""),
    ),
    (
        r"^(?:export\s+)?(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*=>|\w+\s*=>)",
        BoundaryLevel::Function,
        LabelRule::Name(""),
    ),
    (r"^(\w+)\s*:\s*(?:async\s+)?function\s*\(", BoundaryLevel::Function, LabelRule::Name("")),
];

const TYPESCRIPT: &[(&str, BoundaryLevel, LabelRule)] = &[
    (
        r"^(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(\w+)\s*[\(<]",
        BoundaryLevel::Function,
        LabelRule::Name(""),
    ),
    (
        r"^(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(\w+)",
        BoundaryLevel::Class,
        LabelRule::Name(""),
    ),
    (r"^(?:export\s+)?interface\s+(\w+)", BoundaryLevel::Class, LabelRule::Name("")),
    (r"^(?:export\s+)?type\s+(\w+)\s*(?:<[^>]*>\s*)?=", BoundaryLevel::Class, LabelRule::Name("")),
    (
        r"^(?:export\s+)?(?:const|let|var)\s+(\w+)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|\([^)]*\)[^=]*=>|\w+\s*=>)",
        BoundaryLevel::Function,
        LabelRule::Name(""),
    ),
];

const JAVA: &[(&str, BoundaryLevel, LabelRule)] = &[
    (
        r"^(?:(?:public|private|protected|static|final|abstract|sealed)\s+)*(?:class|interface|enum|record)\s+(\w+)",
        BoundaryLevel::Class,
        LabelRule::Name(""),
    ),
    (
        r"^(?:(?:public|private|protected|static|final|synchronized|abstract|native|override|async|virtual)\s+)+[\w<>\[\],.?\s]*?\s*(\w+)\s*\(",
        BoundaryLevel::Function,
        LabelRule::Name(""),
    ),
];

const CPP: &[(&str, BoundaryLevel, LabelRule)] = &[
    (r"^(?:template\s*<[^>]*>\s*)?(?:class|struct)\s+(\w+)[^;]*$", BoundaryLevel::Class, LabelRule::Name("")),
    (
        r"^[\w:<>,\*&\s]+?[\s\*&]+(?:\w+::)*(~?\w+)\s*\([^;]*$",
        BoundaryLevel::Function,
        LabelRule::Name(""),
    ),
];

const C: &[(&str, BoundaryLevel, LabelRule)] = &[
    (r"^(?:typedef\s+)?struct\s+(\w+)[^;]*$", BoundaryLevel::Class, LabelRule::Name("")),
    (r"^typedef\s+struct\s*\{", BoundaryLevel::Class, LabelRule::Fixed("typedef_struct")),
    (
        r"^[\w\*\s]+?[\s\*]+(\w+)\s*\([^;]*$",
        BoundaryLevel::Function,
        LabelRule::Name(""),
    ),
];

const GO: &[(&str, BoundaryLevel, LabelRule)] = &[
    (
        r"^func\s+(?:\([^)]*\)\s*)?(\w+)\s*[\(\[]",
        BoundaryLevel::Function,
        LabelRule::Name(""),
    ),
    (r"^type\s+(\w+)\s+(?:struct|interface)\b", BoundaryLevel::Class, LabelRule::Name("")),
];

const RUST: &[(&str, BoundaryLevel, LabelRule)] = &[
    (
        r"^(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+\S+\s+)?fn\s+(\w+)",
        BoundaryLevel::Function,
        LabelRule::Name(""),
    ),
    (
        r"^(?:pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?(?:struct|enum|trait|mod|union)\s+(\w+)",
        BoundaryLevel::Class,
        LabelRule::Name(""),
    ),
    (r"^(?:unsafe\s+)?impl\b(?:\s*<[^>]*>)?\s+(?:\w+::)*(\w+)", BoundaryLevel::Class, LabelRule::Name("")),
];

static GENERIC_TABLES: LazyLock<BTreeMap<&'static str, Vec<Rule>>> = LazyLock::new(|| {
    let mut tables = BTreeMap::new();
    tables.insert("python", compile(PYTHON));
    tables.insert("javascript", compile(JAVASCRIPT));
    tables.insert("typescript", compile(TYPESCRIPT));
    tables.insert("java", compile(JAVA));
    tables.insert("csharp", compile(JAVA));
    tables.insert("kotlin", compile(JAVA));
    tables.insert("cpp", compile(CPP));
    tables.insert("c", compile(C));
    tables.insert("go", compile(GO));
    tables.insert("rust", compile(RUST));
    tables
});

/// Whether `language` has a boundary pattern table
pub fn supports_language(language: &str) -> bool {
    let language = language.to_lowercase();
    language == "cobol" || GENERIC_TABLES.contains_key(language.as_str())
}

/// Detect structural boundaries of one file
///
/// Returns an empty map for languages without patterns or files where
/// nothing matched; callers then fall back to line-window splitting.
pub fn detect_boundaries(lines: &[&str], language: &str) -> BoundaryMap {
    let language = language.to_lowercase();
    let map = if language == "cobol" {
        detect_cobol(lines)
    } else {
        detect_generic(lines, &language)
    };

    tracing::debug!(
        "Detected {} {} boundaries in {} lines",
        map.len(),
        language,
        lines.len()
    );
    map
}

fn detect_cobol(lines: &[&str]) -> BoundaryMap {
    let mut map = BoundaryMap::new(BoundaryPolicy::Cobol);
    // Tiers are tried highest first; the flag restricts a tier to area A
    let tiers: [(&[Rule], bool); 4] = [
        (COBOL_DIVISIONS.as_slice(), false),
        (COBOL_HEADERS.as_slice(), false),
        (COBOL_SECTIONS.as_slice(), true),
        (COBOL_PARAGRAPHS.as_slice(), true),
    ];
    let mut sentence_closed = true;

    for (index, raw) in lines.iter().enumerate() {
        let line = raw.trim().to_uppercase();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = COBOL_COMMENT.as_ref()
            && comment.is_match(&line)
        {
            continue;
        }

        let opens_sentence = sentence_closed;
        sentence_closed = line.ends_with('.');
        let in_area_a = code_column(raw) < AREA_B_COLUMN;

        let found = tiers
            .iter()
            .filter(|(_, area_a_only)| in_area_a || !area_a_only)
            .find_map(|(rules, _)| {
                rules.iter().find_map(|rule| {
                    rule.label_for(&line).map(|label| (rule.level, label))
                })
            });
        let Some((level, label)) = found else {
            continue;
        };

        // A paragraph name follows a full stop; anything else is a continued statement
        if level == BoundaryLevel::Paragraph && (!opens_sentence || is_cobol_statement(&label)) {
            continue;
        }
        map.insert(Boundary {
            line: index,
            level,
            label,
        });
    }

    map
}

/// Column where the code of a line starts, with a sequence number counted as blanks
fn code_column(raw: &str) -> usize {
    let sequence = raw
        .get(..6)
        .filter(|prefix| prefix.bytes().all(|b| b.is_ascii_digit()))
        .map_or(0, str::len);
    sequence
        + raw[sequence..]
            .chars()
            .take_while(|c| c.is_whitespace())
            .count()
}

fn is_cobol_statement(label: &str) -> bool {
    COBOL_STATEMENTS.contains(&label) || label.starts_with("END-")
}

fn detect_generic(lines: &[&str], language: &str) -> BoundaryMap {
    let mut map = BoundaryMap::new(BoundaryPolicy::Generic);
    let Some(rules) = GENERIC_TABLES.get(language) else {
        return map;
    };

    for (index, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let found = rules.iter().find_map(|rule| {
            rule.label_for(line)
                .filter(|label| !CONTROL_KEYWORDS.contains(&label.to_lowercase().as_str()))
                .map(|label| (rule.level, label))
        });

        if let Some((level, label)) = found {
            map.insert(Boundary {
                line: index,
                level,
                label,
            });
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(source: &str, language: &str) -> BoundaryMap {
        let lines: Vec<&str> = source.lines().collect();
        detect_boundaries(&lines, language)
    }

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(COBOL_DIVISIONS.len(), 2);
        assert_eq!(COBOL_HEADERS.len(), 2);
        assert_eq!(COBOL_SECTIONS.len(), 3);
        assert_eq!(COBOL_PARAGRAPHS.len(), 1);
        assert!(COBOL_COMMENT.is_some());
        assert_eq!(GENERIC_TABLES["python"].len(), PYTHON.len());
        assert_eq!(GENERIC_TABLES["javascript"].len(), JAVASCRIPT.len());
        assert_eq!(GENERIC_TABLES["typescript"].len(), TYPESCRIPT.len());
        assert_eq!(GENERIC_TABLES["java"].len(), JAVA.len());
        assert_eq!(GENERIC_TABLES["cpp"].len(), CPP.len());
        assert_eq!(GENERIC_TABLES["c"].len(), C.len());
        assert_eq!(GENERIC_TABLES["go"].len(), GO.len());
        assert_eq!(GENERIC_TABLES["rust"].len(), RUST.len());
    }

    #[test]
    fn test_cobol_tiers() {
        let source = "\
       IDENTIFICATION DIVISION.
       PROGRAM-ID. PAYROLL.
       ENVIRONMENT DIVISION.
       CONFIGURATION SECTION.
       DATA DIVISION.
       WORKING-STORAGE SECTION.
       01  WS-TOTAL PIC 9(5).
       PROCEDURE DIVISION.
       0100-MAIN-PROCESS.
           PERFORM 0200-READ.
           STOP RUN.
       0200-READ.
           EXIT.";
        let map = detect(source, "COBOL");

        let levels: Vec<(usize, BoundaryLevel, &str)> = map
            .iter()
            .map(|b| (b.line, b.level, b.label.as_str()))
            .collect();
        assert_eq!(
            levels,
            vec![
                (0, BoundaryLevel::Division, "IDENTIFICATION_DIVISION"),
                (1, BoundaryLevel::Section, "PROGRAM_ID"),
                (2, BoundaryLevel::Division, "ENVIRONMENT_DIVISION"),
                (3, BoundaryLevel::Section, "CONFIGURATION_SECTION"),
                (4, BoundaryLevel::Division, "DATA_DIVISION"),
                (5, BoundaryLevel::Section, "WORKING_STORAGE_SECTION"),
                (7, BoundaryLevel::Division, "PROCEDURE_DIVISION"),
                (8, BoundaryLevel::Paragraph, "0100-MAIN-PROCESS"),
                (11, BoundaryLevel::Paragraph, "0200-READ"),
            ]
        );
    }

    #[test]
    fn test_cobol_division_beats_section_on_same_line() {
        let map = detect("DATA DIVISION. WORKING-STORAGE SECTION.", "cobol");
        assert_eq!(map.len(), 1);
        let boundary = map.get(0).unwrap();
        assert_eq!(boundary.level, BoundaryLevel::Division);
        assert_eq!(boundary.label, "DATA_DIVISION");
    }

    #[test]
    fn test_cobol_section_beats_paragraph() {
        let map = detect("       MAIN-SECTION.", "cobol");
        let boundary = map.get(0).unwrap();
        assert_eq!(boundary.level, BoundaryLevel::Section);
        assert_eq!(boundary.label, "MAIN-SECTION");
    }

    #[test]
    fn test_cobol_named_procedure_section() {
        let map = detect("       A100-PROCESS-ORDERS SECTION.", "cobol");
        let boundary = map.get(0).unwrap();
        assert_eq!(boundary.level, BoundaryLevel::Section);
        assert_eq!(boundary.label, "A100-PROCESS-ORDERS_SECTION");
    }

    #[test]
    fn test_cobol_lowercase_and_sequence_area() {
        let map = detect("000100 procedure division using ls-parm.", "cobol");
        assert_eq!(map.get(0).unwrap().label, "PROCEDURE_DIVISION");

        let map = detect("000200 1000-init.", "cobol");
        let boundary = map.get(0).unwrap();
        assert_eq!(boundary.level, BoundaryLevel::Paragraph);
        assert_eq!(boundary.label, "1000-INIT");
    }

    #[test]
    fn test_cobol_statements_and_comments_ignored() {
        let source = "\
           EXIT.
           GOBACK.
           END-IF.
      * WORKING-STORAGE SECTION. in a comment
           MOVE 1 TO WS-A.
       01  WS-A PIC 9.";
        assert!(detect(source, "cobol").is_empty());
    }

    #[test]
    fn test_cobol_continuation_lines_are_not_boundaries() {
        let source = "\
       PROCEDURE DIVISION.
       0100-MAIN.
           MOVE WS-A TO WS-B WS-C
                WS-D.
           COMPUTE WS-E = WS-F +
       WS-G.
           DISPLAY 'LINKAGE SECTION'.
           DISPLAY 'TOTAL' UPON CONSOLE
               FILE SECTION.
       0200-NEXT.
           EXIT.";
        let map = detect(source, "cobol");
        let found: Vec<(usize, &str)> = map.iter().map(|b| (b.line, b.label.as_str())).collect();
        assert_eq!(
            found,
            vec![(0, "PROCEDURE_DIVISION"), (1, "0100-MAIN"), (9, "0200-NEXT")]
        );
    }

    #[test]
    fn test_cobol_code_column() {
        assert_eq!(code_column("       A100-INIT."), 7);
        assert_eq!(code_column("000100 A100-INIT."), 7);
        assert_eq!(code_column("001200     MOVE A TO B."), 11);
        assert_eq!(code_column("A100-INIT."), 0);
        assert_eq!(code_column("héllo"), 0);
    }

    #[test]
    fn test_python_boundaries() {
        let source = "\
import os

class Service(Base):
    def run(self):
        pass

async def main():
    if ready():
        pass";
        let map = detect(source, "python");
        let found: Vec<(usize, BoundaryLevel, &str)> = map
            .iter()
            .map(|b| (b.line, b.level, b.label.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                (2, BoundaryLevel::Class, "Service"),
                (3, BoundaryLevel::Function, "run"),
                (6, BoundaryLevel::Function, "main"),
            ]
        );
    }

    #[test]
    fn test_javascript_boundaries() {
        let source = "\
export default function App() {
const handler = async (req) => {
class Store {
  save: function (x) {";
        let map = detect(source, "javascript");
        let labels: Vec<&str> = map.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["App", "handler", "Store", "save"]);
    }

    #[test]
    fn test_typescript_interfaces() {
        let map = detect("export interface User {\ntype Id = string;", "typescript");
        let labels: Vec<&str> = map.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["User", "Id"]);
    }

    #[test]
    fn test_java_boundaries() {
        let source = "\
public class OrderService {
    private final Repo repo;
    public List<Order> findAll(String owner) {
        return repo.all();";
        let map = detect(source, "java");
        let found: Vec<(usize, &str)> = map.iter().map(|b| (b.line, b.label.as_str())).collect();
        assert_eq!(found, vec![(0, "OrderService"), (2, "findAll")]);
    }

    #[test]
    fn test_c_family_skips_control_flow() {
        let source = "\
int main(int argc, char **argv) {
    else if (x) {
    return compute(x);
struct node {";
        let map = detect(source, "c");
        let labels: Vec<&str> = map.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["main", "node"]);
    }

    #[test]
    fn test_go_and_rust() {
        let go = detect("func (s *Server) Start() error {\ntype Config struct {", "go");
        let labels: Vec<&str> = go.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Start", "Config"]);

        let rust = detect("pub async fn serve() {\nimpl<T> Store<T> {\npub(crate) struct Entry;", "rust");
        let labels: Vec<&str> = rust.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["serve", "Store", "Entry"]);
    }

    #[test]
    fn test_unknown_language_is_empty() {
        let map = detect("def looks_like_python():\n    pass", "markdown");
        assert!(map.is_empty());
        assert!(!supports_language("markdown"));
        assert!(supports_language("COBOL"));
        assert!(supports_language("python"));
    }

    #[test]
    fn test_label_at_prefers_major() {
        let source = "\
PROCEDURE DIVISION.
A000-MAIN SECTION.
A010-START.
    DISPLAY 'X'.
A020-NEXT.
    DISPLAY 'Y'.";
        let map = detect(source, "cobol");
        assert_eq!(map.label_at(0), Some("PROCEDURE_DIVISION"));
        assert_eq!(map.label_at(3), Some("A000-MAIN_SECTION"));
        assert_eq!(map.label_at(5), Some("A000-MAIN_SECTION"));
    }

    #[test]
    fn test_label_at_falls_back_to_minor() {
        let map = detect("A010-START.\n    DISPLAY 'X'.", "cobol");
        assert_eq!(map.label_at(1), Some("A010-START"));
        assert_eq!(detect("    DISPLAY 'X'.", "cobol").label_at(0), None);
    }

    #[test]
    fn test_generic_boundaries_are_major() {
        let map = detect("def a():\n    pass", "python");
        let boundary = map.get(0).unwrap();
        assert!(map.is_major(boundary));
        assert_eq!(map.policy(), BoundaryPolicy::Generic);
    }
}
