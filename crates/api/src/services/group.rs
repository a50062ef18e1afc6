use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{require, with_query};
use crate::context::Context;
use crate::error::Result;
use crate::payload::encode_payload;
use crate::response::Response;
use crate::ApiClient;

const GROUP: &str = "rest/api/2/group";
const GROUP_USER: &str = "rest/api/2/group/user";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<GroupUsers>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupUsers {
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub items: Vec<GroupMember>,
    #[serde(rename = "max-results", default)]
    pub max_results: u32,
    #[serde(rename = "start-index", default)]
    pub start_index: u32,
    #[serde(rename = "end-index", default)]
    pub end_index: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub account_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPayload {
    pub name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountPayload<'a> {
    account_id: &'a str,
}

pub struct GroupService<'a> {
    pub(crate) client: &'a ApiClient,
}

impl GroupService<'_> {
    pub async fn get(&self, ctx: &Context, group_name: &str) -> Result<(Response, Group)> {
        let group_name = require("groupName", group_name)?;
        let endpoint = with_query(GROUP, [("groupname", group_name)]);

        let request = self
            .client
            .build_request(Some(ctx), Method::GET, &endpoint, None, None)?;
        self.client.execute_into(request).await
    }

    pub async fn create(&self, ctx: &Context, payload: &GroupPayload) -> Result<(Response, Group)> {
        require("name", &payload.name)?;
        let body = encode_payload(Some(payload))?;

        let request =
            self.client
                .build_request(Some(ctx), Method::POST, GROUP, None, Some(body.into()))?;
        self.client.execute_into(request).await
    }

    pub async fn delete(&self, ctx: &Context, group_name: &str) -> Result<Response> {
        let group_name = require("groupName", group_name)?;
        let endpoint = with_query(GROUP, [("groupname", group_name)]);

        let request = self
            .client
            .build_request(Some(ctx), Method::DELETE, &endpoint, None, None)?;
        self.client.execute(request).await
    }

    pub async fn add_user(
        &self,
        ctx: &Context,
        group_name: &str,
        account_id: &str,
    ) -> Result<(Response, Group)> {
        let group_name = require("groupName", group_name)?;
        let account_id = require("accountID", account_id)?;

        let endpoint = with_query(GROUP_USER, [("groupname", group_name)]);
        let body = encode_payload(Some(&AccountPayload { account_id }))?;

        let request = self.client.build_request(
            Some(ctx),
            Method::POST,
            &endpoint,
            None,
            Some(body.into()),
        )?;
        self.client.execute_into(request).await
    }

    pub async fn remove_user(
        &self,
        ctx: &Context,
        group_name: &str,
        account_id: &str,
    ) -> Result<Response> {
        let group_name = require("groupName", group_name)?;
        let account_id = require("accountID", account_id)?;

        let endpoint = with_query(
            GROUP_USER,
            [("groupname", group_name), ("accountId", account_id)],
        );

        let request = self
            .client
            .build_request(Some(ctx), Method::DELETE, &endpoint, None, None)?;
        self.client.execute(request).await
    }
}
