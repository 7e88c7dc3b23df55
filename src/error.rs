use thiserror::Error;

/// Main error type for Pos web service operations.
///
/// The variants form a tagged taxonomy: callers match on the kind to tell
/// malformed local input apart from authentication failures, upstream
/// service errors and connection-level failures, without inspecting
/// message strings.
#[derive(Debug, Error)]
pub enum PosError {
    /// Malformed caller input (missing action, wrong date type, ...)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Option mapping contained keys outside the recognized grammar
    #[error("unsupported parameters: {0}")]
    UnsupportedParameter(String),

    /// Successful status but the response body was empty
    #[error("HTTP response is empty")]
    EmptyResponse,

    /// Successful status but the body was not decodable JSON
    #[error("HTTP JSON response is not parsable: {0}")]
    UnparsableResponse(String),

    /// 401 from the service; these return no parseable content
    #[error("{msg}")]
    Authentication {
        msg: String,
        status: u16,
    },

    /// Any other non-2xx status, with whatever the failing body carried
    #[error("{}", .pos_error_msg.as_deref().unwrap_or(.msg.as_str()))]
    WebService {
        /// Generic description for the status code
        msg: String,
        /// HTTP status returned by the service
        status: u16,
        /// Upstream error code extracted from the failing body
        pos_error_code: Option<i64>,
        /// Upstream error message extracted from the failing body
        pos_error_msg: Option<String>,
    },

    /// Connection-level failure (timeout, DNS, TLS); never normalized
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// JSON serialization error while building a request
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl PosError {
    /// Check if this error is an authentication failure (401)
    pub fn is_authentication(&self) -> bool {
        matches!(self, PosError::Authentication { .. })
    }

    /// Check if this error is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(self, PosError::WebService { status: 404, .. })
    }

    /// Get the HTTP status code if this error came from a completed exchange
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PosError::Authentication { status, .. } => Some(*status),
            PosError::WebService { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for Pos web service operations
pub type Result<T> = std::result::Result<T, PosError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webservice_display_prefers_upstream_message() {
        let error = PosError::WebService {
            msg: "Not Found".to_string(),
            status: 404,
            pos_error_code: Some(7),
            pos_error_msg: Some("No such product".to_string()),
        };

        assert_eq!(error.to_string(), "No such product");
        assert!(error.is_not_found());
        assert_eq!(error.status_code(), Some(404));
    }

    #[test]
    fn test_webservice_display_falls_back_to_generic_message() {
        let error = PosError::WebService {
            msg: "Internal Server Error".to_string(),
            status: 500,
            pos_error_code: None,
            pos_error_msg: None,
        };

        assert_eq!(error.to_string(), "Internal Server Error");
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_authentication_error() {
        let error = PosError::Authentication {
            msg: "Unauthorized".to_string(),
            status: 401,
        };

        assert!(error.is_authentication());
        assert_eq!(error.status_code(), Some(401));
    }

    #[test]
    fn test_validation_errors_carry_no_status() {
        let error = PosError::UnsupportedParameter("foo, bar".to_string());
        assert_eq!(error.status_code(), None);
        assert_eq!(error.to_string(), "unsupported parameters: foo, bar");
    }
}
