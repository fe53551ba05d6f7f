//! Experience repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};

use recollect_core::{
    CreateExperienceRequest, Error, Experience, ExperienceRepository, ListFilter, Page, Result,
    UpdateExperienceRequest,
};

use crate::update::{bind_value, UpdateBuilder};

const EXPERIENCE_COLUMNS: &str = "id, title, situation, actions, outcome, learnings, context, \
     tags, related_resources, importance, created_at, updated_at";

/// PostgreSQL implementation of ExperienceRepository.
pub struct PgExperienceRepository {
    pool: Pool<Postgres>,
}

impl PgExperienceRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_experience_row(row: &PgRow) -> Result<Experience> {
    let importance: Option<String> = row.try_get("importance")?;
    Ok(Experience {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        situation: row.try_get("situation")?,
        actions: row
            .try_get::<Option<Vec<String>>, _>("actions")?
            .unwrap_or_default(),
        outcome: row.try_get("outcome")?,
        learnings: row
            .try_get::<Option<Vec<String>>, _>("learnings")?
            .unwrap_or_default(),
        context: row.try_get("context")?,
        tags: row
            .try_get::<Option<Vec<String>>, _>("tags")?
            .unwrap_or_default(),
        related_resources: row
            .try_get::<Option<Vec<String>>, _>("related_resources")?
            .unwrap_or_default(),
        importance: importance.as_deref().and_then(|v| v.parse().ok()),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Build the list query. Conditions are ANDed: tag superset containment
/// plus exact importance match.
fn build_list_query(with_tags: bool, with_importance: bool) -> String {
    let mut sql = format!("SELECT {EXPERIENCE_COLUMNS} FROM experiences");
    let mut conditions = Vec::new();
    let mut param = 0;
    if with_tags {
        param += 1;
        conditions.push(format!("tags @> ${param}"));
    }
    if with_importance {
        param += 1;
        conditions.push(format!("importance = ${param}"));
    }
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(&format!(
        " ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
        param + 1,
        param + 2
    ));
    sql
}

#[async_trait]
impl ExperienceRepository for PgExperienceRepository {
    async fn insert(&self, req: CreateExperienceRequest) -> Result<i32> {
        req.validate()?;

        let id: i32 = sqlx::query_scalar(
            "INSERT INTO experiences
                 (title, situation, actions, outcome, learnings, context,
                  tags, related_resources, importance, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING id",
        )
        .bind(&req.title)
        .bind(&req.situation)
        .bind(&req.actions)
        .bind(&req.outcome)
        .bind(&req.learnings)
        .bind(&req.context)
        .bind(&req.tags)
        .bind(&req.related_resources)
        .bind(req.importance.map(|i| i.as_str()))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        info!(experience_id = id, "Experience created");
        Ok(id)
    }

    async fn fetch(&self, id: i32) -> Result<Experience> {
        let row = sqlx::query(&format!(
            "SELECT {EXPERIENCE_COLUMNS} FROM experiences WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("experience {id} not found")))?;

        map_experience_row(&row)
    }

    async fn list(&self, page: Page, filter: ListFilter) -> Result<Vec<Experience>> {
        debug!(
            limit = page.limit,
            offset = page.offset,
            tag_count = filter.tags.len(),
            importance = filter.importance.map(|i| i.as_str()),
            "Listing experiences"
        );
        let sql = build_list_query(!filter.tags.is_empty(), filter.importance.is_some());
        let mut q = sqlx::query(&sql);
        if !filter.tags.is_empty() {
            q = q.bind(&filter.tags);
        }
        if let Some(importance) = filter.importance {
            q = q.bind(importance.as_str());
        }
        let rows = q
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.iter().map(map_experience_row).collect()
    }

    async fn update(&self, id: i32, req: UpdateExperienceRequest) -> Result<Experience> {
        let mut builder = UpdateBuilder::new("experiences");
        builder
            .set_text("title", req.title)
            .set_text("situation", req.situation)
            .set_text_array("actions", req.actions)
            .set_text("outcome", req.outcome)
            .set_text_array("learnings", req.learnings)
            .set_text("context", req.context)
            .set_text_array("tags", req.tags)
            .set_text_array("related_resources", req.related_resources)
            .set_text("importance", req.importance.map(|i| i.as_str().to_string()));
        if !builder.is_empty() {
            builder.touch("updated_at", Utc::now());
        }
        let (sql, values) = builder.into_parts(id)?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM experiences WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;
        if !exists {
            return Err(Error::NotFound(format!("experience {id} not found")));
        }

        let mut q = sqlx::query(&sql);
        for value in values {
            q = bind_value(q, value);
        }
        q.execute(&mut *tx).await.map_err(Error::Database)?;

        let row = sqlx::query(&format!(
            "SELECT {EXPERIENCE_COLUMNS} FROM experiences WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        info!(experience_id = id, "Experience updated");
        map_experience_row(&row)
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM experiences WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(experience_id = id, "Experience deleted");
        }
        Ok(deleted)
    }
}
