use thiserror::Error;

#[derive(Error, Debug)]
pub enum SketchpadError {
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Invalid draw event: {0}")]
    InvalidEvent(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No free room identifier after {0} attempts")]
    IdSpaceExhausted(usize),

    #[error("Raster error: {0}")]
    Raster(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Base64 error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SketchpadError {
    /// Stable code carried in protocol error replies
    pub fn code(&self) -> &'static str {
        match self {
            Self::RoomNotFound(_) => "room_not_found",
            Self::InvalidEvent(_) => "invalid_event",
            Self::InvalidSnapshot(_)
            | Self::ImageError(_)
            | Self::Base64Error(_) => "invalid_snapshot",
            Self::InvalidMessage(_) | Self::JsonError(_) => "invalid_message",
            Self::Config(_) => "config_error",
            Self::IdSpaceExhausted(_) => "id_space_exhausted",
            Self::Raster(_) => "raster_error",
            Self::IoError(_) => "io_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, SketchpadError>;
