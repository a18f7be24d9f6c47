use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainQueryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ChainQueryError>;
