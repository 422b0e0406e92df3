//! Error taxonomy for the clinic backend.
//!
//! Every fallible core operation returns [`ClinicResult`]. The variants map
//! one-to-one onto the wire-level error kinds the API surfaces report, so
//! handlers never need to inspect store errors themselves. Uniqueness
//! conflicts from the store are translated into the domain conflicts
//! ([`ClinicError::DuplicateQueueEntry`], [`ClinicError::DuplicateName`]) at
//! the call sites that know which constraint they raced on.

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("duplicate queue number for this location and date")]
    DuplicateQueueEntry,
    #[error("name already exists")]
    DuplicateName,
    #[error("database connection pool exhausted or timed out")]
    ResourceExhausted,
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;

impl From<sqlx::Error> for ClinicError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => ClinicError::ResourceExhausted,
            other => ClinicError::Database(other),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db)
            if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
    )
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db)
            if matches!(db.kind(), sqlx::error::ErrorKind::ForeignKeyViolation)
    )
}

impl ClinicError {
    /// Machine-stable kind string reported in wire error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ClinicError::Validation(_) => "validation",
            ClinicError::NotFound(_) => "not_found",
            ClinicError::DuplicateQueueEntry => "duplicate_queue_entry",
            ClinicError::DuplicateName => "duplicate_name",
            ClinicError::ResourceExhausted => "resource_exhausted",
            ClinicError::Database(_) => "internal",
        }
    }

    /// Map a store error from a queue-token write, where a unique violation
    /// means another visit already holds the token.
    pub(crate) fn queue_conflict(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            ClinicError::DuplicateQueueEntry
        } else {
            err.into()
        }
    }

    /// Map a store error from a named-row insert, where a unique violation
    /// means the name is taken.
    pub(crate) fn name_conflict(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            ClinicError::DuplicateName
        } else {
            err.into()
        }
    }

    /// Map a store error from a clinical-record write keyed by visit, where
    /// a foreign-key violation means the visit does not exist.
    pub(crate) fn record_write(err: sqlx::Error) -> Self {
        if is_foreign_key_violation(&err) {
            ClinicError::NotFound("visit")
        } else {
            err.into()
        }
    }
}
