//! Procedure and step handlers.

use axum::extract::{Path, State};
use axum::Json;
use axum_extra::extract::Query;
use tracing::info;

use recollect_core::{
    AddStepsRequest, CreateProcedureRequest, Procedure, ProcedureRepository, ProcedureSummary,
    Step, UpdateProcedureRequest, UpdateStepRequest,
};

use crate::query_types::ListQuery;
use crate::{ApiError, AppState};

pub async fn create_procedure(
    State(state): State<AppState>,
    Json(body): Json<CreateProcedureRequest>,
) -> Result<Json<Procedure>, ApiError> {
    body.validate()?;
    info!(title = %body.title, "Creating procedure");
    let id = state.db.procedures.insert(body).await?;
    let procedure = state.db.procedures.fetch(id).await?;
    Ok(Json(procedure))
}

pub async fn list_procedures(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ProcedureSummary>>, ApiError> {
    let procedures = state.db.procedures.list(query.page()?).await?;
    Ok(Json(procedures))
}

pub async fn get_procedure(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Procedure>, ApiError> {
    let procedure = state.db.procedures.fetch(id).await?;
    Ok(Json(procedure))
}

pub async fn update_procedure(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateProcedureRequest>,
) -> Result<Json<Procedure>, ApiError> {
    let procedure = state.db.procedures.update(id, body).await?;
    Ok(Json(procedure))
}

pub async fn delete_procedure(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<axum::http::StatusCode, ApiError> {
    if !state.db.procedures.delete(id).await? {
        return Err(ApiError::NotFound(format!("procedure {id} not found")));
    }
    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// Bulk-append steps; the response carries only the newly inserted steps.
pub async fn add_steps(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<AddStepsRequest>,
) -> Result<Json<Vec<Step>>, ApiError> {
    body.validate()?;
    info!(procedure_id = id, count = body.steps.len(), "Adding steps");
    let steps = state.db.procedures.add_steps(id, body).await?;
    Ok(Json(steps))
}

pub async fn update_step(
    State(state): State<AppState>,
    Path((id, step_id)): Path<(i32, i32)>,
    Json(body): Json<UpdateStepRequest>,
) -> Result<Json<Step>, ApiError> {
    body.validate()?;
    let step = state.db.procedures.update_step(id, step_id, body).await?;
    Ok(Json(step))
}
