use serde::Serialize;

use crate::error::{ApiError, Result};

/// Serializes a request payload to JSON bytes.
///
/// `None`, or a value that serializes to `null`, is rejected as a nil
/// payload. Only borrowed values are accepted, so an owned struct cannot be
/// handed over by value:
///
/// ```compile_fail
/// #[derive(serde::Serialize)]
/// struct Screen { name: String }
///
/// let screen = Screen { name: "A".into() };
/// jira_rest_api::encode_payload(Some(screen)).unwrap();
/// ```
pub fn encode_payload<T>(payload: Option<&T>) -> Result<Vec<u8>>
where
    T: Serialize + ?Sized,
{
    let payload = payload.ok_or(ApiError::NilPayload)?;
    let bytes = serde_json::to_vec(payload)?;

    if bytes == b"null" {
        return Err(ApiError::NilPayload);
    }

    Ok(bytes)
}
