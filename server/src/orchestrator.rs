// server/src/orchestrator.rs
//!
//! The one summarization pipeline behind every endpoint:
//! validate -> extract -> summarize (abstractive + extractive) -> score ->
//! persist. Endpoints differ only in how they fill a [`SummaryRequest`] or a
//! batch of items.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::abstractive::AbstractiveSummarizer;
use crate::config::{BatchFailure, PipelineConfig, ServiceConfig};
use crate::document_processing::{self, file_stem, Artifact, InputStore, SourceDocument};
use crate::extractive::ExtractiveSummarizer;
use crate::model_adapters::SummaryModel;
use crate::persistence::SummaryWriter;
use crate::scoring::{score_summaries, Scores, ScoringTarget};
use crate::{BulletList, Error, SummaryResult};

pub const TEXT_INPUT_PREFIX: &str = "text_input";
pub const MERGE_PREFIX: &str = "merge_summary";
pub const MERGED_NAME: &str = "Merged Files";

/// Where a request is in the pipeline. Logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Extracted,
    Summarized,
    Scored,
    Persisted,
    Responded,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Extracted => "extracted",
            Stage::Summarized => "summarized",
            Stage::Scored => "scored",
            Stage::Persisted => "persisted",
            Stage::Responded => "responded",
        }
    }
}

/// Per-request log context.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
        }
    }

    pub fn enter(&self, stage: Stage) {
        debug!(request_id = %self.request_id, stage = stage.as_str(), "pipeline transition");
    }

    pub fn fail(&self, stage: Stage, err: &Error) {
        warn!(
            request_id = %self.request_id,
            stage = stage.as_str(),
            kind = err.kind(),
            error = %err,
            "pipeline failed"
        );
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The single source of text for one summary.
#[derive(Debug, Clone)]
pub enum SummaryInput {
    Text(String),
    Upload(Artifact),
    /// A file retained in the input store, by name.
    Stored(String),
}

impl SummaryInput {
    /// Exactly one source must be given. Blank text counts as absent.
    pub fn from_parts(
        text: Option<String>,
        upload: Option<Artifact>,
        file_name: Option<String>,
    ) -> crate::Result<Self> {
        let text = text.filter(|t| !t.trim().is_empty());
        let file_name = file_name.filter(|f| !f.trim().is_empty());

        match (text, upload, file_name) {
            (Some(text), None, None) => Ok(SummaryInput::Text(text)),
            (None, Some(upload), None) => Ok(SummaryInput::Upload(upload)),
            (None, None, Some(name)) => Ok(SummaryInput::Stored(name)),
            (None, None, None) => Err(Error::bad_request("Either text or file_name is required")),
            _ => Err(Error::bad_request(
                "Provide exactly one of text, an uploaded file, or file_name",
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub input: SummaryInput,
    pub reference: Option<String>,
    /// Falls back to the configured target.
    pub scoring_target: Option<ScoringTarget>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub abstractive: BulletList,
    pub extractive: BulletList,
    pub scores: Option<Scores>,
}

/// One slot of a multi-item response.
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub abstractive: BulletList,
    pub extractive: BulletList,
    pub scores: Option<Scores>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemOutcome {
    fn success(name: Option<String>, response: SummaryResponse) -> Self {
        Self {
            name,
            abstractive: response.abstractive,
            extractive: response.extractive,
            scores: response.scores,
            error: None,
        }
    }

    fn failure(name: Option<String>, err: &Error) -> Self {
        Self {
            name,
            abstractive: BulletList::default(),
            extractive: BulletList::default(),
            scores: None,
            error: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedFile {
    pub name: String,
    pub text: String,
}

pub struct Pipeline {
    abstractive: AbstractiveSummarizer,
    extractive: ExtractiveSummarizer,
    writer: SummaryWriter,
    store: InputStore,
    settings: PipelineConfig,
}

impl Pipeline {
    /// Load the configured model. Fails with `ModelUnavailable` when it
    /// cannot be reached.
    pub fn new(config: &ServiceConfig) -> crate::Result<Self> {
        let abstractive = AbstractiveSummarizer::load(&config.model, config.pipeline.max_bullets)?;
        Ok(Self::assemble(abstractive, config))
    }

    pub fn with_model(model: Arc<dyn SummaryModel>, config: &ServiceConfig) -> crate::Result<Self> {
        let abstractive =
            AbstractiveSummarizer::with_model(model, &config.model, config.pipeline.max_bullets)?;
        Ok(Self::assemble(abstractive, config))
    }

    fn assemble(abstractive: AbstractiveSummarizer, config: &ServiceConfig) -> Self {
        Self {
            abstractive,
            extractive: ExtractiveSummarizer::new(config.pipeline.max_bullets),
            writer: SummaryWriter::new(&config.storage.output_dir, config.pipeline.score_in_filename),
            store: InputStore::new(&config.storage.input_dir),
            settings: config.pipeline.clone(),
        }
    }

    pub fn store(&self) -> &InputStore {
        &self.store
    }

    /// Extraction only: raw text is echoed back under `text_input`, uploads
    /// are extracted in order and the first failure fails the request.
    pub fn extract(&self, text: Option<String>, uploads: Vec<Artifact>) -> crate::Result<Vec<ExtractedFile>> {
        let ctx = RequestContext::new();
        ctx.enter(Stage::Received);

        let text = text.filter(|t| !t.trim().is_empty());
        let result = match (text, uploads.is_empty()) {
            (Some(text), true) => Ok(vec![ExtractedFile {
                name: TEXT_INPUT_PREFIX.to_string(),
                text,
            }]),
            (None, false) => {
                ctx.enter(Stage::Validated);
                uploads
                    .iter()
                    .map(|artifact| {
                        document_processing::extract(artifact, &self.store).map(|doc| ExtractedFile {
                            name: doc.name,
                            text: doc.extracted_text,
                        })
                    })
                    .collect()
            }
            (Some(_), false) => Err(Error::bad_request("Provide either text or files, not both")),
            (None, true) => Err(Error::bad_request("No file or text provided")),
        };

        match &result {
            Ok(_) => ctx.enter(Stage::Responded),
            Err(err) => ctx.fail(Stage::Validated, err),
        }
        result
    }

    /// One summary from text, an upload, or a stored file.
    pub fn summarize(&self, request: SummaryRequest) -> crate::Result<SummaryResponse> {
        let ctx = RequestContext::new();
        ctx.enter(Stage::Received);
        ctx.enter(Stage::Validated);

        let target = request.scoring_target.unwrap_or(self.settings.scoring_target);
        let (text, prefix) = match request.input {
            SummaryInput::Text(text) => (text, TEXT_INPUT_PREFIX.to_string()),
            SummaryInput::Upload(artifact) => {
                let doc = self.extract_logged(&ctx, |store| document_processing::extract(&artifact, store))?;
                let prefix = file_stem(&doc.name).to_string();
                (doc.extracted_text, prefix)
            }
            SummaryInput::Stored(name) => {
                let doc = self.extract_logged(&ctx, |store| document_processing::extract_stored(&name, store))?;
                let prefix = file_stem(&doc.name).to_string();
                (doc.extracted_text, prefix)
            }
        };

        let response = self.run(&ctx, &text, &prefix, target, request.reference.as_deref())?;
        ctx.enter(Stage::Responded);
        Ok(response)
    }

    /// Summarize several uploads, either one by one or merged into one text.
    pub fn summarize_files(
        &self,
        uploads: Vec<Artifact>,
        merge: Option<bool>,
        scoring_target: Option<ScoringTarget>,
        reference: Option<String>,
    ) -> crate::Result<Vec<ItemOutcome>> {
        let ctx = RequestContext::new();
        ctx.enter(Stage::Received);
        if uploads.is_empty() {
            let err = Error::bad_request("No files uploaded");
            ctx.fail(Stage::Received, &err);
            return Err(err);
        }
        ctx.enter(Stage::Validated);

        let target = scoring_target.unwrap_or(self.settings.scoring_target);
        let reference = reference.as_deref();

        if merge.unwrap_or(self.settings.merge_files) {
            // A merged summary has a single output, so any failed file fails it.
            let mut texts = Vec::with_capacity(uploads.len());
            for artifact in &uploads {
                let doc = self.extract_logged(&ctx, |store| document_processing::extract(artifact, store))?;
                texts.push(doc.extracted_text);
            }
            let merged = texts.join("\n");
            let response = self.run(&ctx, &merged, MERGE_PREFIX, target, reference)?;
            ctx.enter(Stage::Responded);
            return Ok(vec![ItemOutcome::success(Some(MERGED_NAME.to_string()), response)]);
        }

        // Everything is extracted before anything is persisted, so an
        // aborted batch leaves no summaries behind.
        let mut extracted = Vec::with_capacity(uploads.len());
        for artifact in &uploads {
            let doc = self.extract_logged(&ctx, |store| document_processing::extract(artifact, store));
            let doc = match (doc, self.settings.batch_failure) {
                (Err(err), BatchFailure::Abort) => return Err(err),
                (doc, _) => doc,
            };
            extracted.push((artifact.name.clone(), doc));
        }

        let items = extracted.into_iter().map(|(name, doc)| {
            let outcome =
                doc.and_then(|doc| self.run(&ctx, &doc.extracted_text, file_stem(&doc.name), target, reference));
            (Some(name), outcome)
        });
        let results = self.collect_items(&ctx, items)?;
        ctx.enter(Stage::Responded);
        Ok(results)
    }

    /// Summarize each raw text independently, persisted as `batch_<i>`.
    pub fn summarize_batch(
        &self,
        texts: Vec<String>,
        scoring_target: Option<ScoringTarget>,
    ) -> crate::Result<Vec<ItemOutcome>> {
        let ctx = RequestContext::new();
        ctx.enter(Stage::Received);
        if texts.is_empty() {
            let err = Error::bad_request("texts must contain at least one entry");
            ctx.fail(Stage::Received, &err);
            return Err(err);
        }
        ctx.enter(Stage::Validated);

        let target = scoring_target.unwrap_or(self.settings.scoring_target);
        let items = texts.iter().enumerate().map(|(i, text)| {
            let outcome = if text.trim().is_empty() {
                Err(Error::bad_request(format!("Text {} is empty", i)))
            } else {
                self.run(&ctx, text, &format!("batch_{}", i), target, None)
            };
            (None, outcome)
        });
        let results = self.collect_items(&ctx, items)?;
        ctx.enter(Stage::Responded);
        Ok(results)
    }

    fn collect_items<I>(&self, ctx: &RequestContext, items: I) -> crate::Result<Vec<ItemOutcome>>
    where
        I: Iterator<Item = (Option<String>, crate::Result<SummaryResponse>)>,
    {
        let mut results = Vec::new();
        for (name, outcome) in items {
            match outcome {
                Ok(response) => results.push(ItemOutcome::success(name, response)),
                Err(err) => match self.settings.batch_failure {
                    BatchFailure::Abort => return Err(err),
                    BatchFailure::Skip => {
                        info!(
                            request_id = %ctx.request_id,
                            item = name.as_deref().unwrap_or("-"),
                            kind = err.kind(),
                            "skipping failed batch item"
                        );
                        results.push(ItemOutcome::failure(name, &err));
                    }
                },
            }
        }
        Ok(results)
    }

    fn extract_logged<F>(&self, ctx: &RequestContext, extract: F) -> crate::Result<SourceDocument>
    where
        F: FnOnce(&InputStore) -> crate::Result<SourceDocument>,
    {
        match extract(&self.store) {
            Ok(doc) => {
                debug!(request_id = %ctx.request_id, name = %doc.name, "text extracted");
                ctx.enter(Stage::Extracted);
                Ok(doc)
            }
            Err(err) => {
                ctx.fail(Stage::Validated, &err);
                Err(err)
            }
        }
    }

    /// Summarize, score and persist one text.
    fn run(
        &self,
        ctx: &RequestContext,
        text: &str,
        name_prefix: &str,
        target: ScoringTarget,
        reference: Option<&str>,
    ) -> crate::Result<SummaryResponse> {
        let (max_length, min_length) = self.abstractive.default_lengths();
        let abstractive = self
            .abstractive
            .summarize(text, max_length, min_length)
            .map_err(|err| {
                ctx.fail(Stage::Extracted, &err);
                err
            })?;
        let extractive = self.extractive.summarize(text, self.settings.extractive_sentences);
        let summary = SummaryResult { abstractive, extractive };
        ctx.enter(Stage::Summarized);

        let scores = match score_summaries(&summary, target, text, reference) {
            Ok(scores) => Some(scores),
            Err(reason) => {
                debug!(request_id = %ctx.request_id, %reason, "scores unavailable");
                None
            }
        };
        ctx.enter(Stage::Scored);

        let path = self
            .writer
            .persist(name_prefix, &summary.abstractive, &summary.extractive, scores.as_ref())
            .map_err(|err| {
                ctx.fail(Stage::Scored, &err);
                err
            })?;
        info!(
            request_id = %ctx.request_id,
            name = name_prefix,
            bullets = summary.abstractive.len(),
            path = %path.display(),
            "summary persisted"
        );
        ctx.enter(Stage::Persisted);

        Ok(SummaryResponse {
            abstractive: summary.abstractive,
            extractive: summary.extractive,
            scores,
        })
    }
}
