use thiserror::Error;

/// Pipeline errors, one variant per failure class of a run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{service} error: {detail}")]
    ExternalService { service: &'static str, detail: String },

    #[error(
        "not enough footage: {available:.2}s available, {required:.2}s required (short by {:.2}s)",
        .required - .available
    )]
    InfeasibleDuration { available: f64, required: f64 },

    #[error("media processing error: {0}")]
    MediaProcessing(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub(crate) fn external(service: &'static str, detail: impl Into<String>) -> Self {
        Self::ExternalService {
            service,
            detail: detail.into(),
        }
    }

    pub(crate) fn media(detail: impl Into<String>) -> Self {
        Self::MediaProcessing(detail.into())
    }

    /// Process exit code reported by the binary for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 1,
            Self::ExternalService { .. } | Self::Http(_) => 2,
            Self::InfeasibleDuration { .. } => 3,
            Self::MediaProcessing(_) => 4,
            Self::Io(_) | Self::Json(_) => 4,
        }
    }
}
