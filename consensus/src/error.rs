use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("parent block not found")]
    ParentBlockNotFound,
    #[error("solution distance {0} does not exceed difficulty {1}")]
    BadPow(String, String),
}
