use thiserror::Error;

/// Errors raised anywhere in the validate-then-upsert pipeline.
///
/// Every driver and orchestration operation returns this error type so that
/// the CLI boundary can map failures onto the exit codes documented for the
/// program (configuration/schema errors, QA failure, operator cancellation,
/// database failure).
#[derive(Debug, Error)]
pub enum PgUpsertError {
    /// Invalid identifier, unknown upsert method, impossible option
    /// combination, or malformed configuration file. Raised before any SQL
    /// runs.
    #[error("configuration error: {0}")]
    Config(String),

    /// Staging table missing, staging table missing a required column, or
    /// base table has no primary key where one is required.
    #[error("schema error: {0}")]
    Schema(String),

    /// Driver/server-level failure (connection drop, syntax error the
    /// catalog discovery itself produced, etc.).
    #[error("database error: {0}")]
    Database(String),

    /// QA found non-empty error fields after `qa_all()`. Recoverable only by
    /// the caller fixing staging data; surfaced via the summary and a
    /// non-zero exit code rather than propagated past the CLI boundary.
    #[error("QA failed for one or more tables")]
    QaFailed,

    /// The operator cancelled via the confirmation prompter.
    #[error("operation cancelled by operator")]
    OperatorCancelled,

    /// An internal invariant was violated. Should not occur in production;
    /// indicates a bug in this crate rather than bad input.
    #[error("internal invariant violated: {0}")]
    Invariant(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PgUpsertError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Maps this error onto the process exit code documented for the CLI:
    /// 1 = configuration/schema error, 2 = QA failed, 3 = operator
    /// cancelled, 4 = database error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Schema(_) => 1,
            Self::QaFailed => 2,
            Self::OperatorCancelled => 3,
            Self::Database(_) | Self::Io(_) => 4,
            Self::Invariant(_) => 4,
        }
    }
}

pub type Result<T> = std::result::Result<T, PgUpsertError>;
