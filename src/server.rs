// HTTP surface for the resolution engine
//
// POST /api/download  {platform, url} -> ResolutionResult
// GET  /api/health    -> yt-dlp version detected at startup

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use crate::resolver::{
    ErrorKind, Platform, ResolutionError, ResolutionRequest, ResolutionResult, Resolver,
};

const ENUM_MESSAGE: &str =
    "Invalid enum value. Expected 'youtube' | 'tiktok' | 'instagram' | 'facebook'";
const URL_MESSAGE: &str = "Please enter a valid URL";

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    /// `yt-dlp --version`, read once at startup
    pub ytdlp_version: Option<Arc<str>>,
}

/// Error body: `{message}` or `{message, field}` for validation failures
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    field: Option<String>,
}

#[derive(Serialize)]
struct ApiErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
}

impl ApiError {
    /// 400 pointing at the first invalid input field (dotted path)
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            field: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ResolutionError> for ApiError {
    fn from(err: ResolutionError) -> Self {
        match err.kind {
            ErrorKind::InvalidInput => Self::validation("url", err.message),
            ErrorKind::UpstreamFailure | ErrorKind::InternalError => Self::internal(err.message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            message: &self.message,
            field: self.field.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn required_string<'a>(body: &'a Value, field: &str) -> ApiResult<&'a str> {
    match body.get(field) {
        None | Some(Value::Null) => Err(ApiError::validation(field, "Required")),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(ApiError::validation(
            field,
            format!("Expected string, received {}", type_name(other)),
        )),
    }
}

/// Schema validation for `processDownload`, fields checked in order
pub fn validate_request(body: &Value) -> ApiResult<ResolutionRequest> {
    if !body.is_object() {
        return Err(ApiError::validation(
            "",
            format!("Expected object, received {}", type_name(body)),
        ));
    }

    let platform = required_string(body, "platform")?;
    let platform: Platform = platform.parse().map_err(|_| {
        ApiError::validation("platform", format!("{}, received '{}'", ENUM_MESSAGE, platform))
    })?;

    let url = required_string(body, "url")?;
    if url::Url::parse(url).is_err() {
        return Err(ApiError::validation("url", URL_MESSAGE));
    }

    Ok(ResolutionRequest::new(platform, url))
}

pub async fn process_download(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<ResolutionResult>> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::validation("", format!("Invalid JSON body: {}", e)))?;
    let request = validate_request(&value)?;

    match state.resolver.resolve(&request).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            error!(platform = %request.platform, kind = ?e.kind, error = %e, "resolution failed");
            Err(e.into())
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "ytDlp": state.ytdlp_version.as_deref(),
    }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/download", post(process_download))
        .route("/api/health", get(health))
        .with_state(state)
}

/// Bind and serve until Ctrl+C
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!(error = %err, "failed to install Ctrl+C handler");
    }
}
