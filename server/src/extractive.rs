//! Extractive summarization with LexRank.
//!
//! Sentences are nodes; two sentences are linked when the idf-modified cosine
//! similarity of their term vectors exceeds [`THRESHOLD`]. Sentence salience
//! is the stationary distribution of the degree-normalized graph, found by
//! power iteration. The best sentences are returned in document order.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::sentences::split_sentences;
use crate::BulletList;

static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}']+").unwrap());

const THRESHOLD: f64 = 0.1;
const EPSILON: f64 = 0.1;
const MAX_ITERATIONS: usize = 1000;

pub const DEFAULT_SENTENCE_COUNT: usize = 5;

pub struct ExtractiveSummarizer {
    max_bullets: usize,
}

impl ExtractiveSummarizer {
    pub fn new(max_bullets: usize) -> Self {
        Self { max_bullets }
    }

    /// Pick the `sentence_count` most central sentences (capped at the bullet
    /// limit). Short documents return every sentence they have.
    pub fn summarize(&self, text: &str, sentence_count: usize) -> BulletList {
        let sentences = split_sentences(text);
        let count = sentence_count.min(self.max_bullets);
        if sentences.is_empty() || count == 0 {
            return BulletList::default();
        }

        let scores = rank_sentences(&sentences);
        let mut order: Vec<usize> = (0..sentences.len()).collect();
        // Stable sort, so equal scores keep document order.
        order.sort_by(|a, b| {
            scores[*b]
                .partial_cmp(&scores[*a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut chosen: Vec<usize> = order.into_iter().take(count).collect();
        chosen.sort_unstable();

        BulletList::from_sentences(
            chosen.into_iter().map(|i| sentences[i].clone()),
            self.max_bullets,
        )
    }
}

fn words(sentence: &str) -> Vec<String> {
    WORD_PATTERN
        .find_iter(sentence)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Term frequency normalized by the sentence's most frequent term.
fn term_frequencies(words: &[String]) -> HashMap<&str, f64> {
    let mut counts: HashMap<&str, f64> = HashMap::new();
    for word in words {
        *counts.entry(word.as_str()).or_insert(0.0) += 1.0;
    }
    let max = counts.values().cloned().fold(0.0, f64::max);
    if max > 0.0 {
        for value in counts.values_mut() {
            *value /= max;
        }
    }
    counts
}

fn inverse_document_frequencies(sentence_words: &[Vec<String>]) -> HashMap<&str, f64> {
    let total = sentence_words.len() as f64;
    let mut document_counts: HashMap<&str, f64> = HashMap::new();
    for words in sentence_words {
        let unique: HashSet<&str> = words.iter().map(String::as_str).collect();
        for word in unique {
            *document_counts.entry(word).or_insert(0.0) += 1.0;
        }
    }
    document_counts
        .into_iter()
        .map(|(word, n)| (word, (total / (1.0 + n)).ln()))
        .collect()
}

fn idf_modified_cosine(
    tf1: &HashMap<&str, f64>,
    tf2: &HashMap<&str, f64>,
    idf: &HashMap<&str, f64>,
) -> f64 {
    let idf_of = |term: &str| idf.get(term).copied().unwrap_or(0.0);

    let numerator: f64 = tf1
        .iter()
        .filter_map(|(term, a)| tf2.get(term).map(|b| a * b * idf_of(term).powi(2)))
        .sum();
    let norm = |tf: &HashMap<&str, f64>| {
        tf.iter()
            .map(|(term, v)| (v * idf_of(term)).powi(2))
            .sum::<f64>()
            .sqrt()
    };
    let (d1, d2) = (norm(tf1), norm(tf2));

    if d1 > 0.0 && d2 > 0.0 {
        numerator / (d1 * d2)
    } else {
        0.0
    }
}

/// LexRank salience for each sentence, in input order.
fn rank_sentences(sentences: &[String]) -> Vec<f64> {
    let sentence_words: Vec<Vec<String>> = sentences.iter().map(|s| words(s)).collect();
    let tfs: Vec<HashMap<&str, f64>> = sentence_words.iter().map(|w| term_frequencies(w)).collect();
    let idf = inverse_document_frequencies(&sentence_words);
    let n = sentences.len();

    let mut matrix = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        let mut degree = 0.0;
        for j in 0..n {
            if idf_modified_cosine(&tfs[i], &tfs[j], &idf) > THRESHOLD {
                matrix[i][j] = 1.0;
                degree += 1.0;
            }
        }
        if degree == 0.0 {
            degree = 1.0;
        }
        for value in matrix[i].iter_mut() {
            *value /= degree;
        }
    }

    power_method(&matrix)
}

fn power_method(matrix: &[Vec<f64>]) -> Vec<f64> {
    let n = matrix.len();
    let mut p = vec![1.0 / n as f64; n];

    for _ in 0..MAX_ITERATIONS {
        let mut next = vec![0.0f64; n];
        for (i, row) in matrix.iter().enumerate() {
            for (j, weight) in row.iter().enumerate() {
                next[j] += weight * p[i];
            }
        }
        let delta = next
            .iter()
            .zip(&p)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();
        p = next;
        if delta < EPSILON {
            break;
        }
    }

    p
}
