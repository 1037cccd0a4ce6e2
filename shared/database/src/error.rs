use thiserror::Error;
use uuid::Uuid;

/// Failures raised by the repository layer.
///
/// Errors are logged where they occur and handed back unchanged; nothing here retries.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unique constraint {constraint} violated on {table}")]
    UniqueViolation { table: String, constraint: String },

    #[error("Foreign key constraint {constraint} violated on {table}")]
    ForeignKeyViolation { table: String, constraint: String },

    #[error("{table} row {id} not found")]
    NotFound { table: String, id: Uuid },

    #[error("Unknown field '{field}' for {table}")]
    UnknownField { table: String, field: String },

    #[error("A transaction is already active on this unit of work")]
    TransactionAlreadyActive,

    #[error("No active transaction on this unit of work")]
    NoActiveTransaction,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RepositoryError {
    pub fn not_found(table: &str, id: Uuid) -> Self {
        Self::NotFound { table: table.to_string(), id }
    }

    pub fn unknown_field(table: &str, field: &str) -> Self {
        Self::UnknownField {
            table: table.to_string(),
            field: field.to_string(),
        }
    }

    /// Translates driver errors into constraint variants using the Postgres SQLSTATE.
    pub fn from_sqlx(table: &str, error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &error {
            let constraint = db_error.constraint().unwrap_or_default().to_string();
            match db_error.code().as_deref() {
                Some("23505") => {
                    return Self::UniqueViolation {
                        table: table.to_string(),
                        constraint,
                    }
                }
                Some("23503") => {
                    return Self::ForeignKeyViolation {
                        table: table.to_string(),
                        constraint,
                    }
                }
                _ => {}
            }
        }
        Self::Database(error)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. } | Self::ForeignKeyViolation { .. })
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
