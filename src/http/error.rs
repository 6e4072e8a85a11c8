use serde::Deserialize;
use thiserror::Error;

/// Wire shape of a failed API response. `message` arrives either as a single
/// string or, for validation failures, as a list of per-field messages.
/// `field` is the server-side tag naming the offending field; matching on it
/// replaces the substring sniffing the legacy clients did.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub message: Option<MessageField>,
    #[serde(default)]
    pub field: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MessageField {
    One(String),
    Many(Vec<String>),
}

impl MessageField {
    pub fn joined(&self) -> String {
        match self {
            MessageField::One(message) => message.clone(),
            MessageField::Many(messages) => messages.join(", "),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// Malformed request body. Carries the field the server tagged, when it
    /// tagged one.
    #[error("validation failed: {message}")]
    Validation {
        field: Option<String>,
        message: String,
        status: u16,
    },

    /// Bad credentials, duplicate email, or an expired/invalid token.
    #[error("{message}")]
    Auth { message: String, status: u16 },

    /// Any other non-success response.
    #[error("request failed ({status}): {message}")]
    Api { message: String, status: u16 },

    /// Network unreachable, or the body could not be decoded.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Validation { status, .. }
            | ApiError::Auth { status, .. }
            | ApiError::Api { status, .. } => Some(*status),
            ApiError::Transport(_) => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::Validation { message, .. }
            | ApiError::Auth { message, .. }
            | ApiError::Api { message, .. } => message.clone(),
            ApiError::Transport(message) => message.clone(),
        }
    }

    /// The session-expiry policy keys off this.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn from_response(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorEnvelope>(body) {
            Ok(envelope) => {
                let many = matches!(envelope.message, Some(MessageField::Many(_)));
                let message = envelope
                    .message
                    .map(|m| m.joined())
                    .unwrap_or_else(|| "request failed".to_string());
                Self::classify(
                    envelope.status_code.unwrap_or(status),
                    message,
                    envelope.field,
                    many,
                )
            }
            Err(_) => Self::classify(status, "request failed".to_string(), None, false),
        }
    }

    fn classify(status: u16, message: String, field: Option<String>, many: bool) -> Self {
        match status {
            401 | 403 => ApiError::Auth { message, status },
            400 if field.is_some() || many => ApiError::Validation {
                field,
                message,
                status,
            },
            _ => ApiError::Api { message, status },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}
