pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    #[error("Conflicting identity: {0}")]
    IdentityConflict(String),

    #[error("Invalid order by field: {0}")]
    InvalidOrderByField(String),
}

/// Store level uniqueness constraints are the source of truth, application
/// pre-checks only give friendlier messages. This maps the constraint
/// violation surfacing from a racing insert.
pub(crate) fn on_unique_violation(err: sqlx::Error, what: &str) -> Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::AlreadyExists(what.to_string())
        }
        _ => Error::DatabaseError(err),
    }
}
