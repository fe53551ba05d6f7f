//! Repository traits for the four record kinds.
//!
//! Implementations live in `recollect-db`. Every mutating method runs as one
//! durable transaction; `fetch` signals `Error::NotFound` for absent ids and
//! `delete` reports absence through its boolean instead.

use async_trait::async_trait;

use crate::models::{
    AddStepsRequest, CreateDecisionRequest, CreateExperienceRequest, CreateProcedureRequest,
    CreateThoughtRequest, Experience, ListFilter, Page, Procedure, ProcedureSummary, Step,
    TechnicalDecision, Thought, UpdateDecisionRequest, UpdateExperienceRequest,
    UpdateProcedureRequest, UpdateStepRequest, UpdateThoughtRequest,
};
use crate::Result;

/// Storage operations for thoughts.
#[async_trait]
pub trait ThoughtRepository: Send + Sync {
    /// Insert a new thought, returning its assigned id.
    async fn insert(&self, req: CreateThoughtRequest) -> Result<i32>;

    /// Fetch a thought by id.
    async fn fetch(&self, id: i32) -> Result<Thought>;

    /// List thoughts, newest first.
    async fn list(&self, page: Page) -> Result<Vec<Thought>>;

    /// Apply a partial update and return the updated thought.
    async fn update(&self, id: i32, req: UpdateThoughtRequest) -> Result<Thought>;

    /// Delete a thought. Returns false when the id is absent.
    async fn delete(&self, id: i32) -> Result<bool>;
}

/// Storage operations for procedures and their steps.
#[async_trait]
pub trait ProcedureRepository: Send + Sync {
    async fn insert(&self, req: CreateProcedureRequest) -> Result<i32>;

    /// Fetch a procedure with its steps ordered ascending by `order`.
    async fn fetch(&self, id: i32) -> Result<Procedure>;

    /// List procedures with per-row step counts, newest first.
    async fn list(&self, page: Page) -> Result<Vec<ProcedureSummary>>;

    async fn update(&self, id: i32, req: UpdateProcedureRequest) -> Result<Procedure>;

    /// Delete a procedure and, atomically, every step it owns.
    async fn delete(&self, id: i32) -> Result<bool>;

    /// Append a batch of steps. Auto-ordered entries continue from the
    /// current maximum order; an order collision fails the whole batch.
    async fn add_steps(&self, procedure_id: i32, req: AddStepsRequest) -> Result<Vec<Step>>;

    /// Update one step. The step must belong to the given procedure.
    async fn update_step(
        &self,
        procedure_id: i32,
        step_id: i32,
        req: UpdateStepRequest,
    ) -> Result<Step>;
}

/// Storage operations for technical decisions.
#[async_trait]
pub trait DecisionRepository: Send + Sync {
    async fn insert(&self, req: CreateDecisionRequest) -> Result<i32>;

    async fn fetch(&self, id: i32) -> Result<TechnicalDecision>;

    /// List decisions, newest first, optionally filtered by tag containment.
    async fn list(&self, page: Page, filter: ListFilter) -> Result<Vec<TechnicalDecision>>;

    async fn update(&self, id: i32, req: UpdateDecisionRequest) -> Result<TechnicalDecision>;

    async fn delete(&self, id: i32) -> Result<bool>;
}

/// Storage operations for experiences.
#[async_trait]
pub trait ExperienceRepository: Send + Sync {
    async fn insert(&self, req: CreateExperienceRequest) -> Result<i32>;

    async fn fetch(&self, id: i32) -> Result<Experience>;

    /// List experiences, newest first, filtered by tag containment and
    /// exact importance match.
    async fn list(&self, page: Page, filter: ListFilter) -> Result<Vec<Experience>>;

    async fn update(&self, id: i32, req: UpdateExperienceRequest) -> Result<Experience>;

    async fn delete(&self, id: i32) -> Result<bool>;
}
