use thiserror::Error;

pub type TourResult<T> = Result<T, TourError>;

#[derive(Debug, Error)]
pub enum TourError {
    #[error("invalid tooltip size: width={width}, height={height}")]
    InvalidTooltipSize { width: f64, height: f64 },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid step at index {index}: {reason}")]
    InvalidStep { index: usize, reason: String },

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}
