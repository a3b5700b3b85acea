use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlockPoolError {
    #[error("block pool has no checkpoint set")]
    NoCheckpoint,
}
