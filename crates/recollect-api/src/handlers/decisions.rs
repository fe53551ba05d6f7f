//! Technical decision handlers.

use axum::extract::{Path, State};
use axum::Json;
use axum_extra::extract::Query;
use tracing::info;

use recollect_core::{
    CreateDecisionRequest, DecisionRepository, TechnicalDecision, UpdateDecisionRequest,
};

use crate::query_types::ListQuery;
use crate::{ApiError, AppState};

pub async fn create_decision(
    State(state): State<AppState>,
    Json(body): Json<CreateDecisionRequest>,
) -> Result<Json<TechnicalDecision>, ApiError> {
    body.validate()?;
    info!(title = %body.title, "Recording technical decision");
    let id = state.db.decisions.insert(body).await?;
    let decision = state.db.decisions.fetch(id).await?;
    Ok(Json(decision))
}

pub async fn list_decisions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TechnicalDecision>>, ApiError> {
    let decisions = state
        .db
        .decisions
        .list(query.page()?, query.filter())
        .await?;
    Ok(Json(decisions))
}

pub async fn get_decision(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TechnicalDecision>, ApiError> {
    let decision = state.db.decisions.fetch(id).await?;
    Ok(Json(decision))
}

pub async fn update_decision(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateDecisionRequest>,
) -> Result<Json<TechnicalDecision>, ApiError> {
    let decision = state.db.decisions.update(id, body).await?;
    Ok(Json(decision))
}

pub async fn delete_decision(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<axum::http::StatusCode, ApiError> {
    if !state.db.decisions.delete(id).await? {
        return Err(ApiError::NotFound(format!(
            "technical decision {id} not found"
        )));
    }
    Ok(axum::http::StatusCode::NO_CONTENT)
}
