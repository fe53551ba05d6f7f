//! Procedure and step repository implementation.
//!
//! Steps are owned exclusively by their procedure: the schema declares
//! `ON DELETE CASCADE` plus `UNIQUE(procedure_id, "order")`, so cascade
//! deletion and order uniqueness are enforced by the storage layer itself
//! rather than re-checked in application code.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::{debug, info};

use recollect_core::{
    AddStepsRequest, CreateProcedureRequest, Error, Page, Procedure, ProcedureRepository,
    ProcedureSummary, Result, Step, UpdateProcedureRequest, UpdateStepRequest,
};

use crate::update::{bind_value, UpdateBuilder};

/// PostgreSQL implementation of ProcedureRepository.
pub struct PgProcedureRepository {
    pool: Pool<Postgres>,
}

impl PgProcedureRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_in_tx(&self, tx: &mut Transaction<'_, Postgres>, id: i32) -> Result<Procedure> {
        let row = sqlx::query(
            "SELECT id, title, description, trigger_phrases, created_at
             FROM procedures WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("procedure {id} not found")))?;

        let steps = sqlx::query(
            "SELECT id, procedure_id, content, \"order\", created_at
             FROM procedure_steps
             WHERE procedure_id = $1
             ORDER BY \"order\" ASC",
        )
        .bind(id)
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?;

        let steps = steps
            .iter()
            .map(map_step_row)
            .collect::<Result<Vec<Step>>>()?;
        map_procedure_row(&row, steps)
    }
}

fn map_procedure_row(row: &PgRow, steps: Vec<Step>) -> Result<Procedure> {
    Ok(Procedure {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        trigger_phrases: row
            .try_get::<Option<Vec<String>>, _>("trigger_phrases")?
            .unwrap_or_default(),
        created_at: row.try_get("created_at")?,
        steps,
    })
}

fn map_step_row(row: &PgRow) -> Result<Step> {
    Ok(Step {
        id: row.try_get("id")?,
        procedure_id: row.try_get("procedure_id")?,
        content: row.try_get("content")?,
        order: row.try_get("order")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Translate a unique-constraint violation on (procedure_id, "order") into
/// a Conflict; everything else stays a database error.
fn map_order_conflict(e: sqlx::Error, procedure_id: i32) -> Error {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return Error::Conflict(format!(
                "duplicate step order in procedure {procedure_id}"
            ));
        }
    }
    Error::Database(e)
}

/// Compute the order value for each incoming step.
///
/// Auto-ordered entries (no explicit positive order) continue from
/// `max_order` in input sequence, regardless of interleaved explicit
/// entries. Collisions are not resolved here; the unique constraint
/// rejects them when the batch is inserted.
fn assign_orders(steps: &[recollect_core::NewStep], max_order: i32) -> Vec<i32> {
    let mut next_auto = max_order;
    steps
        .iter()
        .map(|step| match step.explicit_order() {
            Some(order) => order,
            None => {
                next_auto += 1;
                next_auto
            }
        })
        .collect()
}

#[async_trait]
impl ProcedureRepository for PgProcedureRepository {
    async fn insert(&self, req: CreateProcedureRequest) -> Result<i32> {
        req.validate()?;

        let id: i32 = sqlx::query_scalar(
            "INSERT INTO procedures (title, description, trigger_phrases)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.trigger_phrases)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        info!(procedure_id = id, "Procedure created");
        Ok(id)
    }

    async fn fetch(&self, id: i32) -> Result<Procedure> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let procedure = self.fetch_in_tx(&mut tx, id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(procedure)
    }

    async fn list(&self, page: Page) -> Result<Vec<ProcedureSummary>> {
        debug!(limit = page.limit, offset = page.offset, "Listing procedures");
        let rows = sqlx::query(
            "SELECT p.id, p.title, p.description, p.trigger_phrases, p.created_at,
                    COUNT(s.id) AS step_count
             FROM procedures p
             LEFT JOIN procedure_steps s ON p.id = s.procedure_id
             GROUP BY p.id
             ORDER BY p.created_at DESC
             LIMIT $1 OFFSET $2",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter()
            .map(|row| {
                Ok(ProcedureSummary {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                    description: row.try_get("description")?,
                    trigger_phrases: row
                        .try_get::<Option<Vec<String>>, _>("trigger_phrases")?
                        .unwrap_or_default(),
                    created_at: row.try_get("created_at")?,
                    step_count: row.try_get("step_count")?,
                })
            })
            .collect()
    }

    async fn update(&self, id: i32, req: UpdateProcedureRequest) -> Result<Procedure> {
        let mut builder = UpdateBuilder::new("procedures");
        builder
            .set_text("title", req.title)
            .set_text("description", req.description)
            .set_text_array("trigger_phrases", req.trigger_phrases);
        let (sql, values) = builder.into_parts(id)?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM procedures WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;
        if !exists {
            return Err(Error::NotFound(format!("procedure {id} not found")));
        }

        let mut q = sqlx::query(&sql);
        for value in values {
            q = bind_value(q, value);
        }
        q.execute(&mut *tx).await.map_err(Error::Database)?;

        let procedure = self.fetch_in_tx(&mut tx, id).await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(procedure_id = id, "Procedure updated");
        Ok(procedure)
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        // Steps go with the procedure via ON DELETE CASCADE, in the same
        // statement-level transaction.
        let result = sqlx::query("DELETE FROM procedures WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(procedure_id = id, "Procedure and its steps deleted");
        }
        Ok(deleted)
    }

    async fn add_steps(&self, procedure_id: i32, req: AddStepsRequest) -> Result<Vec<Step>> {
        req.validate()?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM procedures WHERE id = $1)")
                .bind(procedure_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;
        if !exists {
            return Err(Error::NotFound(format!(
                "procedure {procedure_id} not found"
            )));
        }

        let max_order: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(\"order\"), 0) FROM procedure_steps WHERE procedure_id = $1",
        )
        .bind(procedure_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let orders = assign_orders(&req.steps, max_order);

        let mut inserted = Vec::with_capacity(req.steps.len());
        for (step, order) in req.steps.iter().zip(orders) {
            let row = sqlx::query(
                "INSERT INTO procedure_steps (procedure_id, content, \"order\")
                 VALUES ($1, $2, $3)
                 RETURNING id, procedure_id, content, \"order\", created_at",
            )
            .bind(procedure_id)
            .bind(&step.content)
            .bind(order)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_order_conflict(e, procedure_id))?;
            inserted.push(map_step_row(&row)?);
        }

        tx.commit().await.map_err(Error::Database)?;

        info!(
            procedure_id,
            step_count = inserted.len(),
            "Steps added to procedure"
        );
        Ok(inserted)
    }

    async fn update_step(
        &self,
        procedure_id: i32,
        step_id: i32,
        req: UpdateStepRequest,
    ) -> Result<Step> {
        req.validate()?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let current: Option<i32> = sqlx::query_scalar(
            "SELECT \"order\" FROM procedure_steps WHERE id = $1 AND procedure_id = $2",
        )
        .bind(step_id)
        .bind(procedure_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;
        let current_order = current.ok_or_else(|| {
            Error::NotFound(format!(
                "step {step_id} not found in procedure {procedure_id}"
            ))
        })?;

        // Order omitted on update means the current position is retained.
        let order = req.order.unwrap_or(current_order);

        let row = sqlx::query(
            "UPDATE procedure_steps SET content = $1, \"order\" = $2
             WHERE id = $3
             RETURNING id, procedure_id, content, \"order\", created_at",
        )
        .bind(&req.content)
        .bind(order)
        .bind(step_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_order_conflict(e, procedure_id))?;

        let step = map_step_row(&row)?;
        tx.commit().await.map_err(Error::Database)?;

        info!(procedure_id, step_id, "Step updated");
        Ok(step)
    }
}
