#[derive(Debug, thiserror::Error)]
pub enum CollageError {
    #[error("Unsupported media element at index {index}: expected a URL string or a url object")]
    UnsupportedMediaElement { index: usize },
    #[error("Media loading requires a running tokio runtime")]
    NoRuntime,
}

pub type CollageResult<T> = Result<T, CollageError>;
