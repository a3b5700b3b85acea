use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("persistence error: {0}")]
    Persistence(#[from] anyhow::Error),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("worker error: {0}")]
    Worker(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("fatal error: {0}")]
    Fatal(String),
}
