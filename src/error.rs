use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrestoTxnError {
    #[error(transparent)]
    HttpError(#[from] reqwest::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    /// Misuse of the cursor API, e.g. fetching before any statement ran.
    #[error("Programming error: {0}")]
    ProgrammingError(String),

    /// The coordinator answered with a non-success HTTP status.
    #[error("Operational error: {0}")]
    OperationalError(String),

    /// The coordinator reported a failed query in the response body.
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),

    #[error("Other database error: {0}")]
    Other(String),
}
