use serde::{Deserialize, Serialize};

/// Error body returned by the marketplace REST API on non-2xx responses.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// The main error message
    #[serde(alias = "msg")]
    pub message: String,
    /// Optional additional details about the error
    #[serde(default, alias = "error")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Creates a new error response with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    /// Best-effort extraction of a readable message from a raw response body.
    ///
    /// Falls back to the trimmed body text when it is not a JSON error object.
    #[must_use]
    pub fn describe(body: &str) -> String {
        serde_json::from_str::<Self>(body).map_or_else(
            |_| body.trim().to_string(),
            |parsed| parsed.to_string(),
        )
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{}: {}", self.message, details),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ErrorResponse {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_display() {
        assert_eq!(ErrorResponse::new("Simple error").to_string(), "Simple error");
        let detailed = ErrorResponse {
            message: "Main error".into(),
            details: Some("Additional info".into()),
        };
        assert_eq!(detailed.to_string(), "Main error: Additional info");
    }

    #[test]
    fn test_describe_json_body() {
        let body = r#"{"message":"Unauthorized","error":"token expired"}"#;
        assert_eq!(ErrorResponse::describe(body), "Unauthorized: token expired");
    }

    #[test]
    fn test_describe_plain_body() {
        assert_eq!(ErrorResponse::describe("  Bad Gateway \n"), "Bad Gateway");
    }
}
