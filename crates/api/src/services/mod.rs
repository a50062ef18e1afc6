//! Thin resource clients layered over the transport core.
//!
//! Each method picks a relative endpoint, encodes its payload and hands the
//! exchange to [`ApiClient`]. Endpoints carry no leading `/` so they extend
//! the base path of the client.

pub mod attachment;
pub mod group;
pub mod screen;

pub use attachment::{Attachment, AttachmentService};
pub use group::{Group, GroupPayload, GroupService, GroupUsers};
pub use screen::{Screen, ScreenPayload, ScreenService};

use std::collections::BTreeMap;

use url::form_urlencoded;

use crate::error::{ApiError, Result};
use crate::ApiClient;

impl ApiClient {
    pub fn groups(&self) -> GroupService<'_> {
        GroupService { client: self }
    }

    pub fn screens(&self) -> ScreenService<'_> {
        ScreenService { client: self }
    }

    pub fn attachments(&self) -> AttachmentService<'_> {
        AttachmentService { client: self }
    }
}

/// Appends `params` to `path` as a form-encoded query string, ordered by key.
pub fn with_query<'a, I>(path: &str, params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let sorted: BTreeMap<&str, &str> = params.into_iter().collect();
    if sorted.is_empty() {
        return path.to_string();
    }

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(sorted)
        .finish();
    format!("{path}?{query}")
}

/// Rejects blank identifiers. The value is passed through untouched.
pub(crate) fn require<'a>(name: &'static str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(ApiError::EmptyParameter(name));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_is_key_sorted() {
        let endpoint = with_query(
            "rest/api/2/group/user",
            [("groupname", "power users"), ("accountId", "abc-123")],
        );
        assert_eq!(
            endpoint,
            "rest/api/2/group/user?accountId=abc-123&groupname=power+users"
        );
    }

    #[test]
    fn test_query_escapes_reserved_characters() {
        let endpoint = with_query("rest/api/2/group", [("groupname", "a&b=c/d")]);
        assert_eq!(endpoint, "rest/api/2/group?groupname=a%26b%3Dc%2Fd");
    }

    #[test]
    fn test_empty_query() {
        let endpoint = with_query("rest/api/2/screens", std::iter::empty());
        assert_eq!(endpoint, "rest/api/2/screens");
    }

    #[test]
    fn test_require() {
        assert_eq!(require("groupName", " jira-users ").unwrap(), " jira-users ");
        assert!(matches!(
            require("groupName", "  "),
            Err(ApiError::EmptyParameter("groupName"))
        ));
    }
}
