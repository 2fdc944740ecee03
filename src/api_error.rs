use reqwest::StatusCode;
use thiserror::Error;

/// Failure of one prediction-API call. `endpoint` is the logical operation
/// name (e.g. `"predict_match"`), not the URL.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{endpoint} request failed (HTTP {status})")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },
    #[error("{endpoint} request failed")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned an unreadable body")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid API base url {url:?}")]
    InvalidBaseUrl { url: String },
    #[error("http client unavailable: {0}")]
    Client(String),
}

impl ApiError {
    pub fn endpoint(&self) -> Option<&'static str> {
        match self {
            ApiError::Status { endpoint, .. }
            | ApiError::Transport { endpoint, .. }
            | ApiError::Decode { endpoint, .. } => Some(*endpoint),
            ApiError::InvalidBaseUrl { .. } | ApiError::Client(_) => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_names_the_endpoint() {
        let err = ApiError::Status {
            endpoint: "predict_match",
            status: StatusCode::BAD_GATEWAY,
        };
        let text = err.to_string();
        assert!(text.starts_with("predict_match request failed"));
        assert!(text.contains("502"));
        assert_eq!(err.endpoint(), Some("predict_match"));
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
    }

    #[test]
    fn base_url_error_has_no_endpoint() {
        let err = ApiError::InvalidBaseUrl {
            url: "not a url".to_string(),
        };
        assert_eq!(err.endpoint(), None);
        assert_eq!(err.status(), None);
    }
}
