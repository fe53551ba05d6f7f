//! Thought repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};

use recollect_core::{
    CreateThoughtRequest, Error, Page, Result, Thought, ThoughtRepository, UpdateThoughtRequest,
};

use crate::update::{bind_value, UpdateBuilder};

const THOUGHT_COLUMNS: &str =
    "id, transcription, processed, categories, tags, type, priority, summary, created_at";

/// PostgreSQL implementation of ThoughtRepository.
pub struct PgThoughtRepository {
    pool: Pool<Postgres>,
}

impl PgThoughtRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Map a database row to a Thought.
///
/// Enum-valued columns are stored as lowercase text; rows written before
/// enum validation existed may hold arbitrary strings, which map to `None`.
fn map_thought_row(row: &PgRow) -> Result<Thought> {
    let kind: Option<String> = row.try_get("type")?;
    let priority: Option<String> = row.try_get("priority")?;
    Ok(Thought {
        id: row.try_get("id")?,
        transcription: row.try_get("transcription")?,
        processed: row
            .try_get::<Option<String>, _>("processed")?
            .unwrap_or_default(),
        categories: row
            .try_get::<Option<Vec<String>>, _>("categories")?
            .unwrap_or_default(),
        tags: row
            .try_get::<Option<Vec<String>>, _>("tags")?
            .unwrap_or_default(),
        kind: kind.as_deref().and_then(|v| v.parse().ok()),
        priority: priority.as_deref().and_then(|v| v.parse().ok()),
        summary: row
            .try_get::<Option<String>, _>("summary")?
            .unwrap_or_default(),
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ThoughtRepository for PgThoughtRepository {
    async fn insert(&self, req: CreateThoughtRequest) -> Result<i32> {
        req.validate()?;

        let id: i32 = sqlx::query_scalar(
            "INSERT INTO thoughts (transcription, processed, categories, tags, type, priority, summary)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(&req.transcription)
        .bind(&req.analysis.processed)
        .bind(&req.analysis.categories)
        .bind(&req.analysis.tags)
        .bind(req.analysis.kind.as_str())
        .bind(req.analysis.priority.map(|p| p.as_str()))
        .bind(&req.analysis.summary)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        info!(thought_id = id, "Thought saved");
        Ok(id)
    }

    async fn fetch(&self, id: i32) -> Result<Thought> {
        let row = sqlx::query(&format!(
            "SELECT {THOUGHT_COLUMNS} FROM thoughts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("thought {id} not found")))?;

        map_thought_row(&row)
    }

    async fn list(&self, page: Page) -> Result<Vec<Thought>> {
        debug!(limit = page.limit, offset = page.offset, "Listing thoughts");
        let rows = sqlx::query(&format!(
            "SELECT {THOUGHT_COLUMNS} FROM thoughts
             ORDER BY created_at DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(map_thought_row).collect()
    }

    async fn update(&self, id: i32, req: UpdateThoughtRequest) -> Result<Thought> {
        let mut builder = UpdateBuilder::new("thoughts");
        builder
            .set_text("transcription", req.transcription)
            .set_text("processed", req.processed)
            .set_text_array("categories", req.categories)
            .set_text_array("tags", req.tags)
            .set_text("type", req.kind.map(|k| k.as_str().to_string()))
            .set_text("priority", req.priority.map(|p| p.as_str().to_string()))
            .set_text("summary", req.summary);
        let (sql, values) = builder.into_parts(id)?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM thoughts WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;
        if !exists {
            return Err(Error::NotFound(format!("thought {id} not found")));
        }

        let mut q = sqlx::query(&sql);
        for value in values {
            q = bind_value(q, value);
        }
        q.execute(&mut *tx).await.map_err(Error::Database)?;

        let row = sqlx::query(&format!(
            "SELECT {THOUGHT_COLUMNS} FROM thoughts WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        info!(thought_id = id, "Thought updated");
        map_thought_row(&row)
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM thoughts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(thought_id = id, "Thought deleted");
        }
        Ok(deleted)
    }
}
