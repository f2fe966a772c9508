//! ROUGE overlap scoring.
//!
//! ROUGE-1 and ROUGE-2 are clipped n-gram overlap F1, ROUGE-L is the
//! longest-common-subsequence F1. Tokens are lowercased runs of letters and
//! digits, so bullet markers and punctuation never count.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::SummaryResult;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub rouge1: f64,
    pub rouge2: f64,
    #[serde(rename = "rougeL")]
    pub rouge_l: f64,
}

impl ScoreReport {
    /// `_R1-x_R2-y_RL-z`, for embedding in persisted file names.
    pub fn filename_suffix(&self) -> String {
        format!("_R1-{}_R2-{}_RL-{}", self.rouge1, self.rouge2, self.rouge_l)
    }
}

/// Why a score could not be produced. Never fails a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScoringUnavailable {
    #[error("candidate has no scoreable tokens")]
    EmptyCandidate,
    #[error("target has no scoreable tokens")]
    EmptyTarget,
    #[error("reference scoring requested but no reference was supplied")]
    MissingReference,
}

/// What the summaries are scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringTarget {
    /// Each summary against the source text.
    #[default]
    Source,
    /// Each summary against a caller-supplied human reference.
    Reference,
    /// The abstractive summary against the extractive one.
    CrossSummary,
}

impl std::str::FromStr for ScoringTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "source" => Ok(ScoringTarget::Source),
            "reference" => Ok(ScoringTarget::Reference),
            "cross_summary" | "cross" => Ok(ScoringTarget::CrossSummary),
            other => Err(format!("unknown scoring target: {}", other)),
        }
    }
}

/// Scores as they appear in a response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scores {
    PerSummary {
        abstractive: ScoreReport,
        extractive: ScoreReport,
    },
    Cross(ScoreReport),
}

impl Scores {
    /// The report that names a persisted file: abstractive, or the cross score.
    pub fn headline(&self) -> &ScoreReport {
        match self {
            Scores::PerSummary { abstractive, .. } => abstractive,
            Scores::Cross(report) => report,
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    TOKEN_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for gram in tokens.windows(n) {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

fn f1(overlap: usize, candidate_total: usize, target_total: usize) -> f64 {
    if overlap == 0 || candidate_total == 0 || target_total == 0 {
        return 0.0;
    }
    let precision = overlap as f64 / candidate_total as f64;
    let recall = overlap as f64 / target_total as f64;
    2.0 * precision * recall / (precision + recall)
}

fn rouge_n(candidate: &[String], target: &[String], n: usize) -> f64 {
    let candidate_counts = ngram_counts(candidate, n);
    let target_counts = ngram_counts(target, n);
    let candidate_total: usize = candidate_counts.values().sum();
    let target_total: usize = target_counts.values().sum();

    if candidate_total == 0 && target_total == 0 {
        // Both too short for this n: only an exact match counts.
        return if candidate == target { 1.0 } else { 0.0 };
    }

    let overlap: usize = candidate_counts
        .iter()
        .map(|(gram, count)| (*count).min(*target_counts.get(gram).unwrap_or(&0)))
        .sum();

    f1(overlap, candidate_total, target_total)
}

fn lcs_len(a: &[String], b: &[String]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// ROUGE-1/2/L F1 of `candidate` against `target`, rounded to 3 decimals.
pub fn score(candidate: &str, target: &str) -> Result<ScoreReport, ScoringUnavailable> {
    let candidate = tokenize(candidate);
    let target = tokenize(target);
    if candidate.is_empty() {
        return Err(ScoringUnavailable::EmptyCandidate);
    }
    if target.is_empty() {
        return Err(ScoringUnavailable::EmptyTarget);
    }

    let lcs = lcs_len(&candidate, &target);

    Ok(ScoreReport {
        rouge1: round3(rouge_n(&candidate, &target, 1)),
        rouge2: round3(rouge_n(&candidate, &target, 2)),
        rouge_l: round3(f1(lcs, candidate.len(), target.len())),
    })
}

/// Score a summary pair against the selected target.
pub fn score_summaries(
    summary: &SummaryResult,
    target: ScoringTarget,
    source: &str,
    reference: Option<&str>,
) -> Result<Scores, ScoringUnavailable> {
    let abstractive = summary.abstractive.render();
    let extractive = summary.extractive.render();

    let against = match target {
        ScoringTarget::CrossSummary => {
            return score(&abstractive, &extractive).map(Scores::Cross);
        }
        ScoringTarget::Source => source,
        ScoringTarget::Reference => reference
            .filter(|r| !r.trim().is_empty())
            .ok_or(ScoringUnavailable::MissingReference)?,
    };

    Ok(Scores::PerSummary {
        abstractive: score(&abstractive, against)?,
        extractive: score(&extractive, against)?,
    })
}
