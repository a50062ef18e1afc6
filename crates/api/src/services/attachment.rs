use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::require;
use crate::context::Context;
use crate::error::Result;
use crate::response::Response;
use crate::ApiClient;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
}

pub struct AttachmentService<'a> {
    pub(crate) client: &'a ApiClient,
}

impl AttachmentService<'_> {
    /// Uploads one file to an issue as `multipart/form-data`.
    pub async fn add(
        &self,
        ctx: &Context,
        issue_key_or_id: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<(Response, Vec<Attachment>)> {
        let issue = require("issueKeyOrID", issue_key_or_id)?;
        let file_name = require("fileName", file_name)?;

        let form = Form::new().part("file", Part::bytes(content).file_name(file_name.to_string()));
        let content_type = format!("multipart/form-data; boundary={}", form.boundary());
        let endpoint = format!("rest/api/2/issue/{issue}/attachments");

        let request = self.client.build_request(
            Some(ctx),
            Method::POST,
            &endpoint,
            Some(&content_type),
            Some(form.into()),
        )?;
        self.client.execute_into(request).await
    }

    pub async fn get(&self, ctx: &Context, attachment_id: &str) -> Result<(Response, Attachment)> {
        let attachment_id = require("attachmentID", attachment_id)?;
        let endpoint = format!("rest/api/2/attachment/{attachment_id}");

        let request = self
            .client
            .build_request(Some(ctx), Method::GET, &endpoint, None, None)?;
        self.client.execute_into(request).await
    }

    pub async fn delete(&self, ctx: &Context, attachment_id: &str) -> Result<Response> {
        let attachment_id = require("attachmentID", attachment_id)?;
        let endpoint = format!("rest/api/2/attachment/{attachment_id}");

        let request = self
            .client
            .build_request(Some(ctx), Method::DELETE, &endpoint, None, None)?;
        self.client.execute(request).await
    }
}
