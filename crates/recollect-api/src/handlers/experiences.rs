//! Experience handlers.

use axum::extract::{Path, State};
use axum::Json;
use axum_extra::extract::Query;
use tracing::info;

use recollect_core::{
    CreateExperienceRequest, Experience, ExperienceRepository, UpdateExperienceRequest,
};

use crate::query_types::ListQuery;
use crate::{ApiError, AppState};

pub async fn create_experience(
    State(state): State<AppState>,
    Json(body): Json<CreateExperienceRequest>,
) -> Result<Json<Experience>, ApiError> {
    body.validate()?;
    info!(title = %body.title, "Recording experience");
    let id = state.db.experiences.insert(body).await?;
    let experience = state.db.experiences.fetch(id).await?;
    Ok(Json(experience))
}

pub async fn list_experiences(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Experience>>, ApiError> {
    let experiences = state
        .db
        .experiences
        .list(query.page()?, query.filter())
        .await?;
    Ok(Json(experiences))
}

pub async fn get_experience(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Experience>, ApiError> {
    let experience = state.db.experiences.fetch(id).await?;
    Ok(Json(experience))
}

pub async fn update_experience(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateExperienceRequest>,
) -> Result<Json<Experience>, ApiError> {
    let experience = state.db.experiences.update(id, body).await?;
    Ok(Json(experience))
}

pub async fn delete_experience(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<axum::http::StatusCode, ApiError> {
    if !state.db.experiences.delete(id).await? {
        return Err(ApiError::NotFound(format!("experience {id} not found")));
    }
    Ok(axum::http::StatusCode::NO_CONTENT)
}
