//! Flat-file persistence of finished summaries under the output directory.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use tracing::debug;

use crate::document_processing::{ensure_dir_exists, safe_component};
use crate::scoring::{ScoreReport, Scores};
use crate::{BulletList, Error};

pub struct SummaryWriter {
    output_dir: PathBuf,
    score_in_filename: bool,
}

impl SummaryWriter {
    pub fn new(output_dir: impl Into<PathBuf>, score_in_filename: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            score_in_filename,
        }
    }

    /// Write `<prefix>[_R1-x_R2-y_RL-z]_summary.txt`, replacing any earlier
    /// file of the same name.
    pub fn persist(
        &self,
        name_prefix: &str,
        abstractive: &BulletList,
        extractive: &BulletList,
        scores: Option<&Scores>,
    ) -> crate::Result<PathBuf> {
        let mut stem = safe_component(name_prefix)
            .ok_or_else(|| Error::bad_request(format!("Invalid summary name: {:?}", name_prefix)))?;
        if self.score_in_filename {
            if let Some(scores) = scores {
                stem.push_str(&scores.headline().filename_suffix());
            }
        }

        ensure_dir_exists(&self.output_dir)?;
        let path = self.output_dir.join(format!("{}_summary.txt", stem));
        fs::write(&path, render(abstractive, extractive, scores))
            .with_context(|| format!("Failed to write summary to {:?}", path))?;

        debug!(path = %path.display(), "summary persisted");
        Ok(path)
    }
}

fn render(abstractive: &BulletList, extractive: &BulletList, scores: Option<&Scores>) -> String {
    let mut out = String::new();
    out.push_str("Abstractive Summary:\n");
    out.push_str(&abstractive.render());
    out.push_str("\n\n");
    out.push_str("Extractive Summary:\n");
    out.push_str(&extractive.render());
    out.push_str("\n\n");

    match scores {
        Some(Scores::PerSummary { abstractive, extractive }) => {
            out.push_str("ROUGE Scores:\n");
            out.push_str("Abstractive:\n");
            score_lines(&mut out, abstractive);
            out.push('\n');
            out.push_str("Extractive:\n");
            score_lines(&mut out, extractive);
        }
        Some(Scores::Cross(report)) => {
            out.push_str("ROUGE Scores:\n");
            out.push_str("Abstractive vs. Extractive:\n");
            score_lines(&mut out, report);
        }
        None => {}
    }
    out
}

fn score_lines(out: &mut String, report: &ScoreReport) {
    let _ = writeln!(out, "- ROUGE-1: {}", report.rouge1);
    let _ = writeln!(out, "- ROUGE-2: {}", report.rouge2);
    let _ = writeln!(out, "- ROUGE-L: {}", report.rouge_l);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bullets(items: &[&str]) -> BulletList {
        BulletList(items.iter().map(|s| s.to_string()).collect())
    }

    fn report(v: f64) -> ScoreReport {
        ScoreReport { rouge1: v, rouge2: v, rouge_l: v }
    }

    #[test]
    fn writes_the_expected_layout() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let writer = SummaryWriter::new(dir.path().join("output"), false);
        let scores = Scores::PerSummary { abstractive: report(0.5), extractive: report(1.0) };

        let path = writer.persist("animals", &bullets(&["A."]), &bullets(&["B.", "C."]), Some(&scores))?;

        assert_eq!(path, dir.path().join("output").join("animals_summary.txt"));
        let body = fs::read_to_string(&path)?;
        assert_eq!(
            body,
            "Abstractive Summary:\n- A.\n\nExtractive Summary:\n- B.\n- C.\n\n\
             ROUGE Scores:\nAbstractive:\n- ROUGE-1: 0.5\n- ROUGE-2: 0.5\n- ROUGE-L: 0.5\n\n\
             Extractive:\n- ROUGE-1: 1\n- ROUGE-2: 1\n- ROUGE-L: 1\n"
        );
        Ok(())
    }

    #[test]
    fn scores_block_is_omitted_when_unavailable() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let writer = SummaryWriter::new(dir.path(), false);
        let path = writer.persist("text_input", &bullets(&["A."]), &bullets(&["B."]), None)?;
        let body = fs::read_to_string(path)?;
        assert!(!body.contains("ROUGE Scores:"));
        assert!(body.ends_with("Extractive Summary:\n- B.\n\n"));
        Ok(())
    }

    #[test]
    fn second_write_replaces_the_first() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let writer = SummaryWriter::new(dir.path(), false);
        writer.persist("same", &bullets(&["First run with a longer body."]), &bullets(&[]), None)?;
        let path = writer.persist("same", &bullets(&["Second."]), &bullets(&[]), None)?;

        let body = fs::read_to_string(path)?;
        assert!(body.contains("Second."));
        assert!(!body.contains("First run"));
        Ok(())
    }

    #[test]
    fn prefix_is_sanitized_and_contained() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let writer = SummaryWriter::new(dir.path().join("out"), false);

        let path = writer.persist("../../etc/my report", &bullets(&[]), &bullets(&[]), None)?;

        assert_eq!(path.parent(), Some(dir.path().join("out").as_path()));
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(".._.._etc_my_report_summary.txt"));
        Ok(())
    }

    #[test]
    fn dot_only_prefix_is_rejected() {
        let dir = TempDir::new().unwrap();
        let writer = SummaryWriter::new(dir.path(), false);
        assert!(matches!(
            writer.persist("..", &bullets(&[]), &bullets(&[]), None),
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(
            writer.persist("", &bullets(&[]), &bullets(&[]), None),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn scores_can_be_embedded_in_the_name() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let writer = SummaryWriter::new(dir.path(), true);
        let scores = Scores::Cross(ScoreReport { rouge1: 0.4, rouge2: 0.2, rouge_l: 0.3 });

        let path = writer.persist("merge_summary", &bullets(&["A."]), &bullets(&["B."]), Some(&scores))?;

        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("merge_summary_R1-0.4_R2-0.2_RL-0.3_summary.txt")
        );
        Ok(())
    }
}
