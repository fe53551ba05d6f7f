//! Thought capture and retrieval handlers.
//!
//! `POST /thoughts` is the capture path: raw text goes through the enrichment
//! backend first, and nothing is stored if enrichment fails.

use axum::extract::{Path, State};
use axum::Json;
use axum_extra::extract::Query;
use serde::Deserialize;
use tracing::info;

use recollect_core::{
    CreateThoughtRequest, Thought, ThoughtRepository, UpdateThoughtRequest,
};

use crate::query_types::ListQuery;
use crate::{ApiError, AppState};

fn default_source() -> String {
    "api".to_string()
}

/// Capture request: raw text plus where it came from.
#[derive(Debug, Deserialize)]
pub struct CaptureThoughtBody {
    pub text: String,
    #[serde(default = "default_source")]
    pub source: String,
}

pub async fn create_thought(
    State(state): State<AppState>,
    Json(body): Json<CaptureThoughtBody>,
) -> Result<Json<Thought>, ApiError> {
    if body.text.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "thought text must not be empty".to_string(),
        ));
    }

    info!(source = %body.source, "Capturing thought");
    let analysis = state.analysis.analyze(&body.text).await?;

    let id = state
        .db
        .thoughts
        .insert(CreateThoughtRequest {
            transcription: body.text,
            analysis,
        })
        .await?;
    let thought = state.db.thoughts.fetch(id).await?;
    Ok(Json(thought))
}

pub async fn list_thoughts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Thought>>, ApiError> {
    let thoughts = state.db.thoughts.list(query.page()?).await?;
    Ok(Json(thoughts))
}

pub async fn get_thought(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Thought>, ApiError> {
    let thought = state.db.thoughts.fetch(id).await?;
    Ok(Json(thought))
}

pub async fn update_thought(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateThoughtRequest>,
) -> Result<Json<Thought>, ApiError> {
    let thought = state.db.thoughts.update(id, body).await?;
    Ok(Json(thought))
}

pub async fn delete_thought(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<axum::http::StatusCode, ApiError> {
    if !state.db.thoughts.delete(id).await? {
        return Err(ApiError::NotFound(format!("thought {id} not found")));
    }
    Ok(axum::http::StatusCode::NO_CONTENT)
}
