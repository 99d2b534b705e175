use derive_more::{Display, From};
use reqwest::StatusCode;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
pub enum Error {
    #[display("{_0}")]
    Custom(String),

    #[display("{_0}")]
    #[from]
    Api(ApiError),

    #[display("I/O error: {_0}")]
    #[from]
    Io(std::io::Error),

    #[display("JSON error: {_0}")]
    #[from]
    Json(serde_json::Error),

    #[display("Config parse error: {_0}")]
    #[from]
    TomlDe(toml::de::Error),

    #[display("Config write error: {_0}")]
    #[from]
    TomlSer(toml::ser::Error),

    #[display("HTTP error: {_0}")]
    #[from]
    Http(reqwest::Error),
}

impl Error {
    pub fn custom(val: impl std::fmt::Display) -> Self {
        Self::Custom(val.to_string())
    }
}

impl std::error::Error for Error {}

/// Classified failure of an upstream call (YouTube or a generative API).
///
/// Callers decide per call site whether a kind degrades to an empty result
/// or is surfaced to the user.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum ApiError {
    #[display("network error: {_0}")]
    Network(String),

    #[display("request timed out")]
    Timeout,

    #[display("quota exceeded: {_0}")]
    QuotaExceeded(String),

    #[display("unauthorized: {_0}")]
    Unauthorized(String),

    #[display("not found")]
    NotFound,

    #[display("unexpected response: {_0}")]
    Parse(String),

    #[display("upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    #[display("{_0}")]
    Provider(String),
}

impl ApiError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout => "timeout",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound => "not_found",
            Self::Parse(_) => "parse",
            Self::Status { .. } => "status",
            Self::Provider(_) => "provider",
        }
    }

    /// Map a non-success status plus the Google-style error envelope
    /// (`{"error": {"message", "errors": [{"reason"}]}}`) to a kind.
    pub fn from_status(status: StatusCode, reason: Option<&str>, message: String) -> Self {
        match (status, reason) {
            (
                StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS,
                Some("quotaExceeded" | "dailyLimitExceeded" | "rateLimitExceeded"),
            )
            | (StatusCode::TOO_MANY_REQUESTS, _) => Self::QuotaExceeded(message),
            (StatusCode::BAD_REQUEST, Some("keyInvalid")) => Self::Unauthorized(message),
            (StatusCode::BAD_REQUEST, _) if message.to_ascii_lowercase().contains("api key") => {
                Self::Unauthorized(message)
            }
            (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => Self::Unauthorized(message),
            (StatusCode::NOT_FOUND, _) => Self::NotFound,
            (status, _) => Self::Status {
                status: status.as_u16(),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use reqwest::StatusCode;

    #[test]
    fn quota_reason_maps_to_quota_exceeded() {
        let err = ApiError::from_status(
            StatusCode::FORBIDDEN,
            Some("quotaExceeded"),
            "The request cannot be completed because you have exceeded your quota.".into(),
        );
        assert!(matches!(err, ApiError::QuotaExceeded(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn plain_forbidden_is_unauthorized() {
        let err = ApiError::from_status(StatusCode::FORBIDDEN, Some("forbidden"), "nope".into());
        assert_eq!(err.kind(), "unauthorized");
    }

    #[test]
    fn invalid_key_is_unauthorized() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            Some("badRequest"),
            "API key not valid. Please pass a valid API key.".into(),
        );
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn server_errors_are_retryable() {
        let err = ApiError::from_status(StatusCode::SERVICE_UNAVAILABLE, None, "busy".into());
        assert!(err.is_retryable());
        assert!(ApiError::Timeout.is_retryable());
        assert!(!ApiError::NotFound.is_retryable());
    }
}
