use tracing::info;

#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    executor: sqlx::PgPool,
}

impl DatabaseProcessor {
    pub fn new(executor: sqlx::PgPool) -> Self {
        Self { executor }
    }

    pub fn db(&self) -> &sqlx::PgPool {
        info!(monotonic_counter.sql = 1);
        &self.executor
    }
}

/// True when the database rejected the statement on a unique index, which the
/// stores rely on for email / slug / one-review-per-account constraints.
pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}
