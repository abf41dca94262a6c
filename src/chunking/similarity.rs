//! TF-IDF similarity grouping of chunks
//!
//! Chunks whose term vectors point the same way are analyzed together in one
//! backend call. Grouping is greedy and single-pass, so the result depends only
//! on the chunk order.

use crate::config::SimilarityConfig;
use crate::error::ChunkingError;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

static TOKEN_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").ok());

static STOP_WORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ENGLISH_STOP_WORDS.iter().copied().collect());

/// Common English words excluded from the vocabulary
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
    "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
    "around", "as", "at", "back", "be", "became", "because", "become", "becomes", "becoming",
    "been", "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
    "beyond", "both", "but", "by", "can", "cannot", "could", "did", "do", "does", "done", "down",
    "due", "during", "each", "eg", "either", "else", "elsewhere", "enough", "etc", "even", "ever",
    "every", "everyone", "everything", "everywhere", "except", "few", "for", "former",
    "formerly", "from", "further", "had", "has", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hers", "herself", "him", "himself", "his", "how",
    "however", "ie", "if", "in", "indeed", "into", "is", "it", "its", "itself", "just", "last",
    "latter", "least", "less", "made", "many", "may", "me", "meanwhile", "might", "mine", "more",
    "moreover", "most", "mostly", "much", "must", "my", "myself", "namely", "neither", "never",
    "nevertheless", "next", "no", "nobody", "none", "nor", "not", "nothing", "now", "nowhere",
    "of", "off", "often", "on", "once", "one", "only", "onto", "or", "other", "others",
    "otherwise", "our", "ours", "ourselves", "out", "over", "own", "per", "perhaps", "please",
    "rather", "re", "same", "seem", "seemed", "seeming", "seems", "several", "she", "should",
    "since", "so", "some", "somehow", "someone", "something", "sometime", "sometimes",
    "somewhere", "still", "such", "than", "that", "the", "their", "them", "themselves", "then",
    "thence", "there", "thereafter", "thereby", "therefore", "therein", "thereupon", "these",
    "they", "this", "those", "though", "through", "throughout", "thru", "thus", "to",
    "together", "too", "toward", "towards", "under", "until", "up", "upon", "us", "very", "via",
    "was", "we", "well", "were", "what", "whatever", "when", "whence", "whenever", "where",
    "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever", "whether", "which",
    "while", "whither", "who", "whoever", "whole", "whom", "whose", "why", "will", "with",
    "within", "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

fn tokenize(text: &str) -> Vec<String> {
    let Some(pattern) = TOKEN_PATTERN.as_ref() else {
        return Vec::new();
    };
    let lowered = text.to_lowercase();
    pattern
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Term-frequency / inverse-document-frequency vectorizer
///
/// Raw term counts weighted by a smoothed IDF `ln((1 + n) / (1 + df)) + 1`,
/// then L2-normalized so a dot product is a cosine similarity.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    max_features: usize,
}

impl TfidfVectorizer {
    pub fn new(max_features: usize) -> Self {
        Self { max_features }
    }

    /// Learn a vocabulary from `documents` and return one vector per document
    pub fn fit_transform(&self, documents: &[&str]) -> Result<Vec<Vec<f32>>, ChunkingError> {
        if documents.is_empty() {
            return Err(ChunkingError::Vectorization("no documents".to_string()));
        }

        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d)).collect();

        let mut corpus_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &tokenized {
            for token in tokens {
                *corpus_counts.entry(token.as_str()).or_insert(0) += 1;
            }
        }

        if corpus_counts.is_empty() {
            return Err(ChunkingError::Vectorization(
                "empty vocabulary; documents contain only stop words".to_string(),
            ));
        }

        // Most frequent terms first; BTreeMap order breaks ties alphabetically
        let mut by_frequency: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
        by_frequency.sort_by(|a, b| b.1.cmp(&a.1));
        by_frequency.truncate(self.max_features.max(1));

        let mut terms: Vec<&str> = by_frequency.into_iter().map(|(term, _)| term).collect();
        terms.sort_unstable();
        let vocabulary: BTreeMap<&str, usize> =
            terms.iter().enumerate().map(|(i, term)| (*term, i)).collect();

        let mut counts = vec![vec![0f32; vocabulary.len()]; documents.len()];
        let mut document_frequency = vec![0usize; vocabulary.len()];
        for (row, tokens) in counts.iter_mut().zip(&tokenized) {
            for token in tokens {
                if let Some(&index) = vocabulary.get(token.as_str()) {
                    if row[index] == 0.0 {
                        document_frequency[index] += 1;
                    }
                    row[index] += 1.0;
                }
            }
        }

        let n = documents.len() as f32;
        let idf: Vec<f32> = document_frequency
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f32)).ln() + 1.0)
            .collect();

        for row in &mut counts {
            for (value, weight) in row.iter_mut().zip(&idf) {
                *value *= weight;
            }
            let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > f32::EPSILON {
                row.iter_mut().for_each(|v| *v /= norm);
            }
        }

        Ok(counts)
    }
}

/// Compute cosine similarity between two vectors
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or when
/// either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Greedy single-pass clustering of chunk texts
#[derive(Debug, Clone)]
pub struct SimilarityGrouper {
    config: SimilarityConfig,
}

impl SimilarityGrouper {
    pub fn new(config: SimilarityConfig) -> Self {
        Self { config }
    }

    /// Group document indices; every index appears in exactly one group
    ///
    /// Small inputs, disabled grouping, and vectorization failures all yield
    /// one group per document.
    pub fn group(&self, documents: &[&str]) -> Vec<Vec<usize>> {
        let singletons = || -> Vec<Vec<usize>> { (0..documents.len()).map(|i| vec![i]).collect() };

        if !self.config.enabled || documents.len() <= self.config.min_chunks {
            return singletons();
        }

        let vectors = match TfidfVectorizer::new(self.config.max_features).fit_transform(documents)
        {
            Ok(vectors) => vectors,
            Err(e) => {
                tracing::warn!(
                    "Error in chunk grouping: {}, falling back to individual chunks",
                    e
                );
                return singletons();
            }
        };

        let threshold = self.config.threshold as f32;
        let mut assigned = vec![false; documents.len()];
        let mut groups = Vec::new();

        for i in 0..documents.len() {
            if assigned[i] {
                continue;
            }
            assigned[i] = true;
            let mut group = vec![i];

            for j in (i + 1)..documents.len() {
                if !assigned[j] && cosine_similarity(&vectors[i], &vectors[j]) > threshold {
                    assigned[j] = true;
                    group.push(j);
                }
            }

            groups.push(group);
        }

        tracing::info!(
            "Grouped {} chunks into {} groups",
            documents.len(),
            groups.len()
        );
        groups
    }
}
