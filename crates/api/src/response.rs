use std::borrow::Cow;
use std::collections::HashMap;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

/// Envelope describing one completed HTTP exchange.
///
/// The body is buffered once when the response arrives, so it stays
/// available after a failed decode or a non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Numeric status code.
    pub code: u16,
    /// Final URL of the exchange, after redirects.
    pub endpoint: Url,
    /// Method actually sent.
    pub method: Method,
    /// Raw response body.
    pub bytes: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.bytes)
    }

    /// Parses the `errorMessages`/`errors` body the remote API attaches to
    /// most 4xx responses. Returns `None` when the body has another shape.
    pub fn error_collection(&self) -> Option<ErrorCollection> {
        self.json::<ErrorCollection>()
            .ok()
            .filter(|collection| !collection.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCollection {
    #[serde(rename = "errorMessages", default)]
    pub error_messages: Vec<String>,
    #[serde(default)]
    pub errors: HashMap<String, String>,
}

impl ErrorCollection {
    pub fn is_empty(&self) -> bool {
        self.error_messages.is_empty() && self.errors.is_empty()
    }

    /// All messages flattened, field errors rendered as `field: message`
    /// in key order.
    pub fn messages(&self) -> Vec<String> {
        let mut fields: Vec<_> = self.errors.iter().collect();
        fields.sort();

        self.error_messages
            .iter()
            .cloned()
            .chain(
                fields
                    .into_iter()
                    .map(|(field, message)| format!("{field}: {message}")),
            )
            .collect()
    }
}
