// server/src/api.rs
use crate::{
    config::ServerConfig,
    document_processing::{Artifact, StoredInput},
    orchestrator::{ExtractedFile, ItemOutcome, Pipeline, SummaryInput, SummaryRequest, SummaryResponse},
    Error, ScoringTarget,
};
use axum::{
    body::Bytes,
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::BadRequest(_) | Error::UnsupportedMediaType(_) | Error::DecodeError(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Generation(_) => StatusCode::BAD_GATEWAY,
            Error::ModelUnavailable(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!(kind = self.kind(), error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self }))).into_response()
    }
}

pub fn router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/files", get(list_files).post(store_files))
        .route("/files/extract", post(extract_file))
        .route("/files/summarize", post(summarize_files))
        .route("/summaries", post(summarize))
        .route("/summarize_batch", post(summarize_batch))
        .route("/summarize_with_reference", post(summarize_with_reference))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors_layer(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Run pipeline work off the async runtime.
async fn blocking<T, F>(state: &AppState, work: F) -> crate::Result<T>
where
    F: FnOnce(&Pipeline) -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pipeline = state.pipeline.clone();
    tokio::task::spawn_blocking(move || work(&pipeline))
        .await
        .map_err(|e| Error::Internal(format!("pipeline task failed: {}", e)))?
}

fn parse_json<T: DeserializeOwned + Default>(body: &Bytes) -> crate::Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| Error::bad_request(format!("Invalid JSON body: {}", e)))
}

fn parse_flag(field: &str, value: &str) -> crate::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        other => Err(Error::bad_request(format!("Invalid value for {}: {}", field, other))),
    }
}

fn parse_target(value: &str) -> crate::Result<Option<ScoringTarget>> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(Error::BadRequest)
}

// ============================================================================
// Multipart helpers
// ============================================================================

fn multipart_error(err: axum::extract::multipart::MultipartError) -> Error {
    Error::bad_request(format!("Invalid multipart body: {}", err.body_text()))
}

async fn next_field(multipart: &mut Multipart) -> crate::Result<Option<Field<'_>>> {
    multipart.next_field().await.map_err(multipart_error)
}

async fn field_text(field: Field<'_>) -> crate::Result<String> {
    field.text().await.map_err(multipart_error)
}

/// A file part becomes an [`Artifact`]. Parts without a file name are skipped.
async fn field_artifact(field: Field<'_>) -> crate::Result<Option<Artifact>> {
    let Some(name) = field.file_name().map(str::to_string) else {
        return Ok(None);
    };
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await.map_err(multipart_error)?;
    Ok(Some(Artifact::new(name, content_type, bytes.to_vec())))
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "docsum backend is running",
    })
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub files: Vec<ExtractedFile>,
}

async fn extract_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, Error> {
    let mut text = None;
    let mut uploads = Vec::new();

    while let Some(field) = next_field(&mut multipart).await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("text") => text = Some(field_text(field).await?),
            Some("file") | Some("files") => {
                if let Some(artifact) = field_artifact(field).await? {
                    uploads.push(artifact);
                }
            }
            _ => {}
        }
    }

    let files = blocking(&state, move |pipeline| pipeline.extract(text, uploads)).await?;
    Ok(Json(ExtractResponse { files }))
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub results: Vec<ItemOutcome>,
}

async fn summarize_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ResultsResponse>, Error> {
    let mut uploads = Vec::new();
    let mut merge = None;
    let mut scoring_target = None;
    let mut reference = None;

    while let Some(field) = next_field(&mut multipart).await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("files") | Some("file") => {
                if let Some(artifact) = field_artifact(field).await? {
                    uploads.push(artifact);
                }
            }
            Some("merge") => merge = Some(parse_flag("merge", &field_text(field).await?)?),
            Some("scoring_target") => scoring_target = parse_target(&field_text(field).await?)?,
            Some("reference") => {
                reference = Some(field_text(field).await?).filter(|r| !r.trim().is_empty())
            }
            _ => {}
        }
    }

    let results = blocking(&state, move |pipeline| {
        pipeline.summarize_files(uploads, merge, scoring_target, reference)
    })
    .await?;
    Ok(Json(ResultsResponse { results }))
}

#[derive(Debug, Default, Deserialize)]
pub struct SummariesBody {
    pub text: Option<String>,
    pub reference: Option<String>,
    pub scoring_target: Option<ScoringTarget>,
}

#[derive(Debug, Deserialize)]
pub struct SummariesQuery {
    pub file_name: Option<String>,
}

async fn summarize(
    State(state): State<AppState>,
    Query(query): Query<SummariesQuery>,
    body: Bytes,
) -> Result<Json<SummaryResponse>, Error> {
    let body: SummariesBody = parse_json(&body)?;
    let request = SummaryRequest {
        input: SummaryInput::from_parts(body.text, None, query.file_name)?,
        reference: body.reference,
        scoring_target: body.scoring_target,
    };

    let response = blocking(&state, move |pipeline| pipeline.summarize(request)).await?;
    Ok(Json(response))
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchBody {
    #[serde(default)]
    pub texts: Vec<String>,
    pub scoring_target: Option<ScoringTarget>,
}

async fn summarize_batch(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ResultsResponse>, Error> {
    let body: BatchBody = parse_json(&body)?;
    let results = blocking(&state, move |pipeline| {
        pipeline.summarize_batch(body.texts, body.scoring_target)
    })
    .await?;
    Ok(Json(ResultsResponse { results }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReferenceBody {
    pub text: Option<String>,
    pub reference: Option<String>,
}

async fn summarize_with_reference(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SummaryResponse>, Error> {
    let body: ReferenceBody = parse_json(&body)?;
    let reference = body.reference.filter(|r| !r.trim().is_empty());
    let scoring_target = Some(if reference.is_some() {
        ScoringTarget::Reference
    } else {
        ScoringTarget::Source
    });
    let request = SummaryRequest {
        input: SummaryInput::from_parts(body.text, None, None)?,
        reference,
        scoring_target,
    };

    let response = blocking(&state, move |pipeline| pipeline.summarize(request)).await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct StoredFilesResponse {
    pub files: Vec<StoredInput>,
}

async fn store_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<StoredFilesResponse>, Error> {
    let mut uploads = Vec::new();
    while let Some(field) = next_field(&mut multipart).await? {
        let name = field.name().map(str::to_string);
        if matches!(name.as_deref(), Some("files") | Some("file")) {
            if let Some(artifact) = field_artifact(field).await? {
                uploads.push(artifact);
            }
        }
    }
    if uploads.is_empty() {
        return Err(Error::bad_request("No files uploaded"));
    }

    let files = blocking(&state, move |pipeline| {
        uploads
            .iter()
            .map(|artifact| pipeline.store().save(artifact))
            .collect::<crate::Result<Vec<_>>>()
    })
    .await?;
    Ok(Json(StoredFilesResponse { files }))
}

async fn list_files(State(state): State<AppState>) -> Result<Json<StoredFilesResponse>, Error> {
    let files = blocking(&state, |pipeline| pipeline.store().list()).await?;
    Ok(Json(StoredFilesResponse { files }))
}
