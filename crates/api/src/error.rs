use thiserror::Error;

use crate::response::Response;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid base URL {0}: expected a hierarchical http(s) URL")]
    InvalidBaseUrl(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Missing execution context")]
    MissingContext,

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("Invalid status code: {}", .response.code)]
    InvalidStatus { response: Box<Response> },

    #[error("Unable to decode response body: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        response: Box<Response>,
    },

    #[error("Nil payload")]
    NilPayload,

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Error, please provide a valid {0} value")]
    EmptyParameter(&'static str),
}

impl ApiError {
    /// The envelope of the exchange that produced this error, if a response
    /// was received at all.
    pub fn response(&self) -> Option<&Response> {
        match self {
            ApiError::InvalidStatus { response } | ApiError::Decode { response, .. } => {
                Some(&**response)
            }
            _ => None,
        }
    }

    /// Status code of the failed exchange, if any.
    pub fn status(&self) -> Option<u16> {
        self.response().map(|response| response.code)
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ApiError::InvalidStatus { response } => match response.code {
                401 => Some("Verify the configured username and API token"),
                403 => Some("Check that the account has permission for this resource"),
                404 => Some("Check if the resource ID is correct"),
                400 => Some("Review the request parameters"),
                429 => Some("Consider reducing request frequency"),
                _ => None,
            },
            ApiError::DeadlineExceeded => {
                Some("Check your network connection or allow a longer deadline")
            }
            ApiError::MissingContext => Some("Pass a Context, e.g. Context::background()"),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
