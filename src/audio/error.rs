use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PlaybackError {
    #[error("failed to load {track}: {reason}")]
    Load { track: String, reason: String },

    #[error("audio output device error: {0}")]
    Device(String),

    #[error("decoding error: {0}")]
    Decode(String),

    #[error("network error: {0}")]
    Network(String),
}
