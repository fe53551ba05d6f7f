//! # recollect-db
//!
//! PostgreSQL database layer for recollect.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for the four record kinds
//! - Partial-update clause assembly shared by every repository
//!
//! ## Example
//!
//! ```rust,ignore
//! use recollect_db::Database;
//! use recollect_core::{CreateProcedureRequest, ProcedureRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/recollect").await?;
//!
//!     let id = db.procedures.insert(CreateProcedureRequest {
//!         title: "Deploy service".to_string(),
//!         description: None,
//!         trigger_phrases: vec![],
//!     }).await?;
//!
//!     println!("Created procedure: {}", id);
//!     Ok(())
//! }
//! ```

pub mod decisions;
pub mod experiences;
pub mod pool;
pub mod procedures;
pub mod thoughts;
pub mod update;

// Re-export core types
pub use recollect_core::*;

pub use decisions::PgDecisionRepository;
pub use experiences::PgExperienceRepository;
pub use pool::{create_pool, create_pool_lazy, create_pool_with_config, PoolConfig};
pub use procedures::PgProcedureRepository;
pub use thoughts::PgThoughtRepository;
pub use update::{SqlValue, UpdateBuilder};

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::PgPool,
    /// Thought repository.
    pub thoughts: PgThoughtRepository,
    /// Procedure and step repository.
    pub procedures: PgProcedureRepository,
    /// Technical decision repository.
    pub decisions: PgDecisionRepository,
    /// Experience repository.
    pub experiences: PgExperienceRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            thoughts: PgThoughtRepository::new(pool.clone()),
            procedures: PgProcedureRepository::new(pool.clone()),
            decisions: PgDecisionRepository::new(pool.clone()),
            experiences: PgExperienceRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}
