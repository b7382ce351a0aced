use thiserror::Error;

use crate::providers::tmdb::ProviderError;
use crate::transfer::TransferError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("catalog provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
