use lottie_data::DataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("failed to encode compiled scene: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T, E = CompileError> = std::result::Result<T, E>;
