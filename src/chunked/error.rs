use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChunkedError>;

#[derive(Debug, Error)]
pub enum ChunkedError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("needed {needed} bytes at offset {offset}, only {remaining} remain")]
    Truncated {
        needed: usize,
        remaining: usize,
        offset: usize,
    },
    #[error("malformed chunked data: {0}")]
    Malformed(String),
    #[error("{codec} codec error: {message}")]
    Codec {
        codec: &'static str,
        message: String,
    },
    #[error("{0} trailing bytes after the declared rows")]
    TrailingBytes(usize),
    #[error("chunk_rows must be positive")]
    InvalidChunkRows,
}

impl ChunkedError {
    pub fn codec(codec: &'static str, message: impl Into<String>) -> Self {
        Self::Codec {
            codec,
            message: message.into(),
        }
    }
}
