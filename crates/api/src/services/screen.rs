use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::require;
use crate::context::Context;
use crate::error::Result;
use crate::payload::encode_payload;
use crate::response::Response;
use crate::ApiClient;

const SCREENS: &str = "rest/api/2/screens";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub struct ScreenService<'a> {
    pub(crate) client: &'a ApiClient,
}

impl ScreenService<'_> {
    pub async fn create(
        &self,
        ctx: &Context,
        payload: &ScreenPayload,
    ) -> Result<(Response, Screen)> {
        require("name", payload.name.as_deref().unwrap_or_default())?;
        let body = encode_payload(Some(payload))?;

        let request =
            self.client
                .build_request(Some(ctx), Method::POST, SCREENS, None, Some(body.into()))?;
        self.client.execute_into(request).await
    }

    pub async fn update(
        &self,
        ctx: &Context,
        screen_id: i64,
        payload: &ScreenPayload,
    ) -> Result<(Response, Screen)> {
        let body = encode_payload(Some(payload))?;
        let endpoint = format!("{SCREENS}/{screen_id}");

        let request = self.client.build_request(
            Some(ctx),
            Method::PUT,
            &endpoint,
            None,
            Some(body.into()),
        )?;
        self.client.execute_into(request).await
    }

    pub async fn delete(&self, ctx: &Context, screen_id: i64) -> Result<Response> {
        let endpoint = format!("{SCREENS}/{screen_id}");

        let request = self
            .client
            .build_request(Some(ctx), Method::DELETE, &endpoint, None, None)?;
        self.client.execute(request).await
    }
}
