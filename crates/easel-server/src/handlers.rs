use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use easel_core::ids::SessionId;
use easel_core::slides::PipelineResult;
use easel_pipeline::{GenerationRequest, PipelineError};

use crate::server::AppState;
use crate::sse::SubscriberStream;

/// Feature flags declared by the status probe.
pub const FEATURES: &[&str] = &["sequential-generation", "progress-tracking", "thumbnail-rendering"];

/// Open a progress subscription. The session id is caller-chosen; a later
/// subscription with the same id silently replaces this one.
pub async fn progress(Path(session_id): Path<String>, State(state): State<AppState>) -> impl IntoResponse {
    let session_id = SessionId::from_raw(session_id);
    tracing::info!(session_id = %session_id, "Progress subscriber connected");

    let handle = state.registry.register(&session_id);
    let stream = SubscriberStream::new(handle, Arc::clone(&state.registry));

    let sse = Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(state.keep_alive_secs))
            .text("keep-alive"),
    );

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        sse,
    )
}

/// Synchronous generation submission. Returns the assembled lesson whether
/// or not any observer ever connected.
pub async fn generate(State(state): State<AppState>, Json(request): Json<GenerationRequest>) -> Response {
    match state.coordinator.generate(&request).await {
        Ok(result) => Json(assemble_response(&request.lesson, &result)).into_response(),
        Err(PipelineError::Validation(message)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": message })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Generation request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "slide generation failed" })),
            )
                .into_response()
        }
    }
}

/// Read-only availability probe.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "easel",
        "features": FEATURES,
        "activeSessions": state.registry.active_sessions(),
    }))
}

/// Merge thumbnails into the slide sequence and graft the result onto the
/// caller's lesson object.
pub fn assemble_response(lesson: &Value, result: &PipelineResult) -> Value {
    let slides: Vec<Value> = result
        .slides
        .iter()
        .map(|slide| {
            let mut obj = match serde_json::to_value(slide) {
                Ok(Value::Object(map)) => map,
                _ => serde_json::Map::new(),
            };
            if let Some(thumbnail) = result.thumbnails.get(&slide.slide_number) {
                if let Ok(value) = serde_json::to_value(thumbnail) {
                    let _ = obj.insert("thumbnail".into(), value);
                }
            }
            Value::Object(obj)
        })
        .collect();

    let mut lesson = match lesson {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    let _ = lesson.insert("slides".into(), Value::Array(slides));

    json!({
        "success": true,
        "lesson": Value::Object(lesson),
        "generationStats": result.stats,
    })
}
