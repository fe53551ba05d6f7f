//! Technical decision repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};

use recollect_core::{
    AlternativeOption, CreateDecisionRequest, DecisionRepository, Error, ListFilter, Page, Result,
    TechnicalDecision, UpdateDecisionRequest,
};

use crate::update::{bind_value, UpdateBuilder};

const DECISION_COLUMNS: &str = "id, title, context, decision, reasoning, alternatives, \
     consequences, tags, related_resources, created_at, updated_at";

/// PostgreSQL implementation of DecisionRepository.
pub struct PgDecisionRepository {
    pool: Pool<Postgres>,
}

impl PgDecisionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_decision_row(row: &PgRow) -> Result<TechnicalDecision> {
    // Alternatives are persisted as one JSONB blob and deserialized whole.
    let alternatives: Vec<AlternativeOption> = match row
        .try_get::<Option<serde_json::Value>, _>("alternatives")?
    {
        Some(value) => serde_json::from_value(value)?,
        None => Vec::new(),
    };

    Ok(TechnicalDecision {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        context: row.try_get("context")?,
        decision: row.try_get("decision")?,
        reasoning: row.try_get("reasoning")?,
        alternatives,
        consequences: row
            .try_get::<Option<Vec<String>>, _>("consequences")?
            .unwrap_or_default(),
        tags: row
            .try_get::<Option<Vec<String>>, _>("tags")?
            .unwrap_or_default(),
        related_resources: row
            .try_get::<Option<Vec<String>>, _>("related_resources")?
            .unwrap_or_default(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Build the list query; tag filtering is superset containment (`@>`).
fn build_list_query(with_tags: bool) -> String {
    let mut sql = format!("SELECT {DECISION_COLUMNS} FROM technical_decisions");
    let mut param = 0;
    if with_tags {
        param += 1;
        sql.push_str(&format!(" WHERE tags @> ${param}"));
    }
    sql.push_str(&format!(
        " ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
        param + 1,
        param + 2
    ));
    sql
}

#[async_trait]
impl DecisionRepository for PgDecisionRepository {
    async fn insert(&self, req: CreateDecisionRequest) -> Result<i32> {
        req.validate()?;

        let alternatives = serde_json::to_value(&req.alternatives)?;
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO technical_decisions
                 (title, context, decision, reasoning, alternatives, consequences,
                  tags, related_resources, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id",
        )
        .bind(&req.title)
        .bind(&req.context)
        .bind(&req.decision)
        .bind(&req.reasoning)
        .bind(alternatives)
        .bind(&req.consequences)
        .bind(&req.tags)
        .bind(&req.related_resources)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        info!(decision_id = id, "Technical decision created");
        Ok(id)
    }

    async fn fetch(&self, id: i32) -> Result<TechnicalDecision> {
        let row = sqlx::query(&format!(
            "SELECT {DECISION_COLUMNS} FROM technical_decisions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("technical decision {id} not found")))?;

        map_decision_row(&row)
    }

    async fn list(&self, page: Page, filter: ListFilter) -> Result<Vec<TechnicalDecision>> {
        debug!(
            limit = page.limit,
            offset = page.offset,
            tag_count = filter.tags.len(),
            "Listing technical decisions"
        );
        let sql = build_list_query(!filter.tags.is_empty());
        let mut q = sqlx::query(&sql);
        if !filter.tags.is_empty() {
            q = q.bind(&filter.tags);
        }
        let rows = q
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.iter().map(map_decision_row).collect()
    }

    async fn update(&self, id: i32, req: UpdateDecisionRequest) -> Result<TechnicalDecision> {
        let alternatives = match req.alternatives {
            Some(alts) => Some(serde_json::to_value(&alts)?),
            None => None,
        };

        let mut builder = UpdateBuilder::new("technical_decisions");
        builder
            .set_text("title", req.title)
            .set_text("context", req.context)
            .set_text("decision", req.decision)
            .set_text("reasoning", req.reasoning)
            .set_json("alternatives", alternatives)
            .set_text_array("consequences", req.consequences)
            .set_text_array("tags", req.tags)
            .set_text_array("related_resources", req.related_resources);
        if !builder.is_empty() {
            builder.touch("updated_at", Utc::now());
        }
        let (sql, values) = builder.into_parts(id)?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM technical_decisions WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;
        if !exists {
            return Err(Error::NotFound(format!(
                "technical decision {id} not found"
            )));
        }

        let mut q = sqlx::query(&sql);
        for value in values {
            q = bind_value(q, value);
        }
        q.execute(&mut *tx).await.map_err(Error::Database)?;

        let row = sqlx::query(&format!(
            "SELECT {DECISION_COLUMNS} FROM technical_decisions WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        info!(decision_id = id, "Technical decision updated");
        map_decision_row(&row)
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM technical_decisions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(decision_id = id, "Technical decision deleted");
        }
        Ok(deleted)
    }
}
