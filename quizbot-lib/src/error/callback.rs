//! Callback payload errors

/// Errors produced when decoding inline-keyboard callback data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackDataError {
    /// The payload does not belong to any known button.
    #[error("unknown callback data: {0}")]
    Unknown(String),

    /// A known prefix with an unparsable team id.
    #[error("malformed team id in callback data: {0}")]
    MalformedTeamId(String),
}
