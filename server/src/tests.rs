// server/src/tests.rs
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use crate::{
    config::{BatchFailure, ModelProvider, ServiceConfig},
    document_processing::Artifact,
    model_adapters::StubAdapter,
    orchestrator::{Pipeline, SummaryInput, SummaryRequest},
    scoring::Scores,
    Error, ScoringTarget,
};

const ANIMALS: &str = "The cat sat. The dog ran. The bird flew. The fish swam.";

fn test_config(root: &Path) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.model.provider = ModelProvider::Stub;
    config.storage.input_dir = root.join("input");
    config.storage.output_dir = root.join("output");
    config
}

fn stub_pipeline(config: &ServiceConfig) -> Result<Pipeline> {
    Ok(Pipeline::with_model(Arc::new(StubAdapter), config)?)
}

fn text_request(text: &str) -> SummaryRequest {
    SummaryRequest {
        input: SummaryInput::Text(text.to_string()),
        reference: None,
        scoring_target: None,
    }
}

fn txt(name: &str, body: &str) -> Artifact {
    Artifact::new(name, Some("text/plain".into()), body.as_bytes().to_vec())
}

fn long_text(sentences: usize) -> String {
    (0..sentences)
        .map(|i| format!("Report line {} covers budget item {} in detail.", i, i % 4))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn uploaded_txt_is_summarized_scored_and_persisted() -> Result<()> {
    let dir = TempDir::new()?;
    let config = test_config(dir.path());
    let pipeline = stub_pipeline(&config)?;

    let response = pipeline.summarize(SummaryRequest {
        input: SummaryInput::Upload(txt("animals.txt", ANIMALS)),
        reference: None,
        scoring_target: None,
    })?;

    assert!(!response.abstractive.is_empty());
    assert!(response.extractive.len() >= 3);
    assert!(matches!(response.scores, Some(Scores::PerSummary { .. })));

    let persisted = dir.path().join("output").join("animals_summary.txt");
    let body = fs::read_to_string(persisted)?;
    assert!(body.starts_with("Abstractive Summary:\n- "));
    assert!(body.contains("ROUGE Scores:"));

    // Transient uploads leave nothing behind in the input directory.
    let leftovers = fs::read_dir(dir.path().join("input"))?.count();
    assert_eq!(leftovers, 0);
    Ok(())
}

#[test]
fn raw_text_uses_text_input_prefix() -> Result<()> {
    let dir = TempDir::new()?;
    let pipeline = stub_pipeline(&test_config(dir.path()))?;

    pipeline.summarize(text_request(ANIMALS))?;

    assert!(dir.path().join("output").join("text_input_summary.txt").exists());
    Ok(())
}

#[test]
fn summaries_never_exceed_the_bullet_cap() -> Result<()> {
    let dir = TempDir::new()?;
    let pipeline = stub_pipeline(&test_config(dir.path()))?;

    let response = pipeline.summarize(text_request(&long_text(30)))?;

    assert!(response.abstractive.len() <= 5);
    assert_eq!(response.extractive.len(), 5);
    for line in response.abstractive.render().lines() {
        assert!(line.starts_with("- "));
    }
    Ok(())
}

#[test]
fn batch_of_two_returns_two_results() -> Result<()> {
    let dir = TempDir::new()?;
    let pipeline = stub_pipeline(&test_config(dir.path()))?;

    let results = pipeline.summarize_batch(vec!["A. B. C.".into(), "D. E. F.".into()], None)?;

    assert_eq!(results.len(), 2);
    for result in &results {
        assert!(!result.abstractive.is_empty());
        assert!(!result.extractive.is_empty());
        assert!(result.error.is_none());
    }
    assert!(dir.path().join("output").join("batch_0_summary.txt").exists());
    assert!(dir.path().join("output").join("batch_1_summary.txt").exists());
    Ok(())
}

#[test]
fn merged_files_produce_one_summary() -> Result<()> {
    let dir = TempDir::new()?;
    let pipeline = stub_pipeline(&test_config(dir.path()))?;

    let results = pipeline.summarize_files(
        vec![txt("one.txt", "Alpha runs. Beta walks."), txt("two.txt", "Gamma swims. Delta flies.")],
        Some(true),
        None,
        None,
    )?;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name.as_deref(), Some("Merged Files"));
    assert_eq!(results[0].extractive.len(), 4);
    assert!(dir.path().join("output").join("merge_summary_summary.txt").exists());
    Ok(())
}

#[test]
fn unsupported_file_aborts_the_batch_by_default() -> Result<()> {
    let dir = TempDir::new()?;
    let pipeline = stub_pipeline(&test_config(dir.path()))?;

    let err = pipeline
        .summarize_files(
            vec![
                txt("ok.txt", ANIMALS),
                Artifact::new("report.docx", Some("application/msword".into()), vec![1, 2, 3]),
            ],
            Some(false),
            None,
            None,
        )
        .unwrap_err();

    assert!(matches!(err, Error::UnsupportedMediaType(ref name) if name == "report.docx"));
    assert!(!dir.path().join("output").join("ok_summary.txt").exists());
    let persisted = fs::read_dir(dir.path().join("output")).map(|rd| rd.count()).unwrap_or(0);
    assert_eq!(persisted, 0);
    Ok(())
}

#[test]
fn skip_policy_reports_the_failed_item() -> Result<()> {
    let dir = TempDir::new()?;
    let mut config = test_config(dir.path());
    config.pipeline.batch_failure = BatchFailure::Skip;
    let pipeline = stub_pipeline(&config)?;

    let results = pipeline.summarize_files(
        vec![
            Artifact::new("report.docx", Some("application/msword".into()), vec![1, 2, 3]),
            txt("ok.txt", ANIMALS),
        ],
        None,
        None,
        None,
    )?;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].error.as_deref(), Some("Unsupported file type: report.docx"));
    assert!(results[1].error.is_none());
    assert!(dir.path().join("output").join("ok_summary.txt").exists());
    Ok(())
}

#[test]
fn stored_inputs_are_summarized_by_name() -> Result<()> {
    let dir = TempDir::new()?;
    let pipeline = stub_pipeline(&test_config(dir.path()))?;
    pipeline.store().save(&txt("kept notes.txt", ANIMALS))?;

    let response = pipeline.summarize(SummaryRequest {
        input: SummaryInput::Stored("kept notes.txt".into()),
        reference: None,
        scoring_target: None,
    })?;

    assert!(!response.extractive.is_empty());
    assert!(dir.path().join("output").join("kept_notes_summary.txt").exists());
    assert!(dir.path().join("input").join("kept_notes.txt").exists());

    let missing = pipeline
        .summarize(SummaryRequest {
            input: SummaryInput::Stored("absent.pdf".into()),
            reference: None,
            scoring_target: None,
        })
        .unwrap_err();
    assert!(matches!(missing, Error::NotFound(_)));
    Ok(())
}

#[test]
fn scoring_target_selects_what_summaries_are_compared_to() -> Result<()> {
    let dir = TempDir::new()?;
    let pipeline = stub_pipeline(&test_config(dir.path()))?;

    let cross = pipeline.summarize(SummaryRequest {
        scoring_target: Some(ScoringTarget::CrossSummary),
        ..text_request(ANIMALS)
    })?;
    assert!(matches!(cross.scores, Some(Scores::Cross(_))));

    let referenced = pipeline.summarize(SummaryRequest {
        reference: Some(ANIMALS.to_string()),
        scoring_target: Some(ScoringTarget::Reference),
        ..text_request(ANIMALS)
    })?;
    match referenced.scores {
        Some(Scores::PerSummary { extractive, .. }) => assert_eq!(extractive.rouge1, 1.0),
        other => panic!("unexpected scores: {:?}", other),
    }

    let unreferenced = pipeline.summarize(SummaryRequest {
        scoring_target: Some(ScoringTarget::Reference),
        ..text_request(ANIMALS)
    })?;
    assert!(unreferenced.scores.is_none());
    Ok(())
}

#[test]
fn configured_target_is_the_default() -> Result<()> {
    let dir = TempDir::new()?;
    let mut config = test_config(dir.path());
    config.pipeline.scoring_target = ScoringTarget::CrossSummary;
    let pipeline = stub_pipeline(&config)?;

    let response = pipeline.summarize(text_request(ANIMALS))?;

    assert!(matches!(response.scores, Some(Scores::Cross(_))));
    Ok(())
}

#[test]
fn score_in_filename_names_the_output() -> Result<()> {
    let dir = TempDir::new()?;
    let mut config = test_config(dir.path());
    config.pipeline.score_in_filename = true;
    let pipeline = stub_pipeline(&config)?;

    pipeline.summarize(text_request("A. B. C."))?;

    let names: Vec<String> = fs::read_dir(dir.path().join("output"))?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["text_input_R1-1_R2-1_RL-1_summary.txt".to_string()]);
    Ok(())
}

#[test]
fn long_cjk_text_without_terminators_is_summarized() -> Result<()> {
    let dir = TempDir::new()?;
    let pipeline = stub_pipeline(&test_config(dir.path()))?;
    let text = "这是一个很长的中文文档没有英文句号".repeat(200);

    let response = pipeline.summarize(text_request(&text))?;

    assert_eq!(response.abstractive.len(), 1);
    assert!(text.starts_with(response.abstractive.sentences()[0].as_str()));
    assert!(dir.path().join("output").join("text_input_summary.txt").exists());
    Ok(())
}

#[test]
fn extraction_returns_every_upload_in_order() -> Result<()> {
    let dir = TempDir::new()?;
    let pipeline = stub_pipeline(&test_config(dir.path()))?;

    let files = pipeline.extract(
        None,
        vec![txt("one.txt", "Alpha runs."), txt("two.txt", "Beta walks.")],
    )?;

    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["one.txt", "two.txt"]);
    assert_eq!(files[1].text, "Beta walks.");
    Ok(())
}

#[test]
fn extraction_needs_exactly_one_kind_of_input() -> Result<()> {
    let dir = TempDir::new()?;
    let pipeline = stub_pipeline(&test_config(dir.path()))?;

    let both = pipeline
        .extract(Some("Words.".into()), vec![txt("one.txt", "Alpha runs.")])
        .unwrap_err();
    assert!(matches!(both, Error::BadRequest(ref msg) if msg.contains("not both")));

    let neither = pipeline.extract(Some("  ".into()), Vec::new()).unwrap_err();
    assert!(matches!(neither, Error::BadRequest(ref msg) if msg == "No file or text provided"));

    let echoed = pipeline.extract(Some("Words.".into()), Vec::new())?;
    assert_eq!(echoed[0].name, "text_input");
    Ok(())
}
