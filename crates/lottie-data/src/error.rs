use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("animation document must be a JSON object")]
    NotAnObject,
    #[error("animation document has no `layers` array")]
    MissingLayers,
    #[error("invalid timing: fr={frame_rate}, ip={in_frame}, op={out_frame}")]
    InvalidTiming {
        frame_rate: f64,
        in_frame: f64,
        out_frame: f64,
    },
    #[error("failed to decode animation document: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = DataError> = std::result::Result<T, E>;
