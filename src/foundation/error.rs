pub type HeatmapResult<T> = Result<T, HeatmapError>;

#[derive(thiserror::Error, Debug)]
pub enum HeatmapError {
    #[error("invalid dimension: {width}x{height} (width and height must be > 0)")]
    InvalidDimension { width: u32, height: u32 },

    #[error("unsupported backend: \"{0}\"")]
    UnsupportedBackend(String),

    #[error("invalid gradient: {0}")]
    InvalidGradient(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HeatmapError {
    pub fn invalid_dimension(width: u32, height: u32) -> Self {
        Self::InvalidDimension { width, height }
    }

    pub fn unsupported_backend(id: impl Into<String>) -> Self {
        Self::UnsupportedBackend(id.into())
    }

    pub fn gradient(msg: impl Into<String>) -> Self {
        Self::InvalidGradient(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for HeatmapError {
    fn from(err: serde_json::Error) -> Self {
        Self::serde(err.to_string())
    }
}
