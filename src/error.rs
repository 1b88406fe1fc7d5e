use thiserror::Error;

/// ConfigError
///
/// Raised by `AppConfig::load` when the environment cannot produce a usable configuration.
/// In production every Supabase secret is mandatory, so a missing variable stops startup.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// SessionError
///
/// Failure modes of a session provider. The session gate treats all of them as
/// transient: they are logged and the user stays on the current route.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("auth provider request failed: {0}")]
    Transport(String),

    #[error("auth provider returned status {0}")]
    Status(u16),

    #[error("could not decode auth provider response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SessionError::Decode(err.to_string())
        } else {
            SessionError::Transport(err.to_string())
        }
    }
}

/// SvgDecodeError
///
/// Decoding failures for SVG data URLs. These never escape the validation gate as
/// errors; `validate_data_url` folds them into a single-error result.
#[derive(Debug, Error, PartialEq)]
pub enum SvgDecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(String),

    #[error("malformed percent-encoding at byte {0}")]
    Percent(usize),

    #[error("decoded payload is not valid UTF-8")]
    Utf8,

    #[error("data URL has no payload")]
    MissingPayload,
}
