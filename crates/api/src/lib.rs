pub mod context;
pub mod error;
pub mod payload;
mod redirect;
pub mod response;
pub mod services;

pub use context::{CancelHandle, Context};
pub use error::{ApiError, Result};
pub use payload::encode_payload;
pub use response::{ErrorCollection, Response};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::multipart::Form;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

const APPLICATION_JSON: &str = "application/json";
const XSRF_HEADER: &str = "x-atlassian-token";
const XSRF_NO_CHECK: &str = "no-check";

#[derive(Clone, Debug)]
pub struct BasicAuth {
    pub username: String,
    pub secret: String,
}

/// Body attached to an outbound request.
pub enum RequestBody {
    Bytes(Vec<u8>),
    /// Sent as `multipart/form-data`; the form's boundary content type is
    /// kept unless the caller overrides it.
    Multipart(Form),
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(bytes)
    }
}

impl From<Form> for RequestBody {
    fn from(form: Form) -> Self {
        RequestBody::Multipart(form)
    }
}

/// A fully built request, bound to the context it was created with.
#[derive(Debug)]
pub struct Request {
    inner: reqwest::Request,
    ctx: Context,
}

impl Request {
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn url(&self) -> &Url {
        self.inner.url()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Body bytes, when the body is buffered rather than streamed.
    pub fn body(&self) -> Option<&[u8]> {
        self.inner.body().and_then(|body| body.as_bytes())
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }
}

/// Client for the Jira REST API.
///
/// Identity is configured through the `with_*` builders before the client is
/// shared. Once built the client is immutable, so clones can be used from
/// many tasks at once without locking.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    auth: Option<BasicAuth>,
    user_agent: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let mut url = Url::parse(base_url.as_ref()).map_err(ApiError::InvalidUrl)?;
        if url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(url.to_string()));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(format!("jira-rest/{}", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(ApiError::RequestFailed)?;

        Ok(Self {
            client,
            base_url: url,
            auth: None,
            user_agent: None,
        })
    }

    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        self.auth = Some(BasicAuth {
            username: username.into(),
            secret: secret.into(),
        });
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Replaces the underlying HTTP client, e.g. to share a connection pool.
    /// Redirects are followed by [`execute`](Self::execute), so the supplied
    /// client should be built with `redirect::Policy::none()`.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn auth(&self) -> Option<&BasicAuth> {
        self.auth.as_ref()
    }

    /// Resolves `endpoint` against the base URL. Paths without a leading `/`
    /// extend the base path, absolute paths replace it.
    pub fn resolve(&self, endpoint: &str) -> Result<Url> {
        self.base_url.join(endpoint).map_err(ApiError::InvalidUrl)
    }

    pub fn build_request(
        &self,
        ctx: Option<&Context>,
        method: Method,
        endpoint: &str,
        content_type: Option<&str>,
        body: Option<RequestBody>,
    ) -> Result<Request> {
        let ctx = ctx.ok_or(ApiError::MissingContext)?;
        let url = self.resolve(endpoint)?;

        let content_type = content_type
            .filter(|value| !value.is_empty())
            .map(HeaderValue::from_str)
            .transpose()?;
        let user_agent = self
            .user_agent
            .as_deref()
            .map(HeaderValue::from_str)
            .transpose()?;

        let mut builder = self.client.request(method, url);
        if let Some(BasicAuth { username, secret }) = &self.auth {
            builder = builder.basic_auth(username, Some(secret));
        }

        let mut json_default = false;
        builder = match body {
            Some(RequestBody::Bytes(bytes)) => {
                json_default = true;
                builder.body(bytes)
            }
            Some(RequestBody::Multipart(form)) => builder.multipart(form),
            None => builder,
        };

        let mut inner = builder.build().map_err(ApiError::RequestFailed)?;
        let headers = inner.headers_mut();
        headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        match content_type {
            Some(value) => {
                headers.insert(CONTENT_TYPE, value);
            }
            None if json_default => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
            }
            None => {}
        }
        headers.insert(XSRF_HEADER, HeaderValue::from_static(XSRF_NO_CHECK));
        if let Some(value) = user_agent {
            headers.insert(USER_AGENT, value);
        }

        Ok(Request {
            inner,
            ctx: ctx.clone(),
        })
    }

    /// Performs the exchange and buffers the body. Up to ten redirects are
    /// followed; the envelope describes the last request sent. Any status
    /// outside `200..300` is returned as [`ApiError::InvalidStatus`] carrying
    /// the envelope.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let Request { inner, ctx } = request;

        debug!(method = %inner.method(), url = %inner.url(), "Sending request");

        let response = ctx.run(self.exchange(inner)).await?;

        debug!(
            method = %response.method,
            url = %response.endpoint,
            status = response.code,
            bytes = response.bytes.len(),
            "Received response"
        );

        if !response.is_success() {
            return Err(ApiError::InvalidStatus {
                response: Box::new(response),
            });
        }

        Ok(response)
    }

    async fn exchange(&self, mut request: reqwest::Request) -> Result<Response> {
        let mut hops = 0;

        loop {
            let snapshot = redirect::Snapshot::of(&request);
            let method = request.method().clone();

            let response = self
                .client
                .execute(request)
                .await
                .map_err(ApiError::RequestFailed)?;
            let status = response.status();

            if status.is_redirection() && hops < redirect::MAX_REDIRECTS {
                let location = redirect::location(&response);
                if let Some(next) = redirect::next_request(snapshot, status, location) {
                    debug!(
                        status = status.as_u16(),
                        from = %response.url(),
                        to = %next.url(),
                        method = %next.method(),
                        "Following redirect"
                    );
                    hops += 1;
                    request = next;
                    continue;
                }
            }

            let code = status.as_u16();
            let endpoint = response.url().clone();
            let bytes = response.bytes().await.map_err(ApiError::RequestFailed)?;

            return Ok(Response {
                code,
                endpoint,
                method,
                bytes: bytes.to_vec(),
            });
        }
    }

    /// Like [`execute`](Self::execute), then decodes the buffered body into
    /// `T`. An empty body is a decode error.
    pub async fn execute_into<T: DeserializeOwned>(&self, request: Request) -> Result<(Response, T)> {
        let response = self.execute(request).await?;

        match response.json::<T>() {
            Ok(value) => Ok((response, value)),
            Err(source) => Err(ApiError::Decode {
                source,
                response: Box::new(response),
            }),
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        endpoint: &str,
    ) -> Result<(Response, T)> {
        let request = self.build_request(Some(ctx), Method::GET, endpoint, None, None)?;
        self.execute_into(request).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        endpoint: &str,
        body: &B,
    ) -> Result<(Response, T)> {
        self.send_json(ctx, Method::POST, endpoint, Some(body))
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        endpoint: &str,
        body: &B,
    ) -> Result<(Response, T)> {
        self.send_json(ctx, Method::PUT, endpoint, Some(body)).await
    }

    pub async fn delete(&self, ctx: &Context, endpoint: &str) -> Result<Response> {
        let request = self.build_request(Some(ctx), Method::DELETE, endpoint, None, None)?;
        self.execute(request).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<(Response, T)> {
        let payload = encode_payload(body)?;
        let request = self.build_request(Some(ctx), method, endpoint, None, Some(payload.into()))?;
        self.execute_into(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base).unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        assert_eq!(
            client("https://org.atlassian.net").base_url().as_str(),
            "https://org.atlassian.net/"
        );
        assert_eq!(
            client("https://org.atlassian.net/jira").base_url().as_str(),
            "https://org.atlassian.net/jira/"
        );
        assert_eq!(
            client("https://org.atlassian.net/jira/").base_url().as_str(),
            "https://org.atlassian.net/jira/"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(matches!(
            ApiClient::new("mailto:admin@example.com"),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_resolve_relative_and_absolute_paths() {
        let api = client("https://org.atlassian.net/jira");

        let cases = [
            (
                "rest/api/2/group?groupname=power-users",
                "https://org.atlassian.net/jira/rest/api/2/group?groupname=power-users",
            ),
            (
                "rest/api/2/screens/10000/tabs",
                "https://org.atlassian.net/jira/rest/api/2/screens/10000/tabs",
            ),
            (
                "/rest/api/2/screens",
                "https://org.atlassian.net/rest/api/2/screens",
            ),
            ("", "https://org.atlassian.net/jira/"),
        ];

        for (endpoint, expected) in cases {
            assert_eq!(api.resolve(endpoint).unwrap().as_str(), expected, "{endpoint}");
        }
    }

    #[test]
    fn test_malformed_endpoint() {
        let api = client("https://org.atlassian.net/");
        let result = api.build_request(
            Some(&Context::background()),
            Method::GET,
            "http://[::1",
            None,
            None,
        );
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_missing_context() {
        let api = client("https://org.atlassian.net/");
        let result = api.build_request(None, Method::GET, "rest/api/2/myself", None, None);
        assert!(matches!(result, Err(ApiError::MissingContext)));
    }

    #[test]
    fn test_default_headers() {
        let api = client("https://org.atlassian.net/");
        let request = api
            .build_request(
                Some(&Context::background()),
                Method::GET,
                "rest/api/2/myself",
                None,
                None,
            )
            .unwrap();

        let headers = request.headers();
        assert_eq!(headers[ACCEPT], "application/json");
        assert_eq!(headers[XSRF_HEADER], "no-check");
        assert!(headers.get(CONTENT_TYPE).is_none());
        assert!(headers.get(reqwest::header::AUTHORIZATION).is_none());
        assert!(request.body().is_none());
    }

    #[test]
    fn test_json_content_type_default() {
        let api = client("https://org.atlassian.net/");
        let payload = encode_payload(Some(&json!({"name": "A"}))).unwrap();
        let request = api
            .build_request(
                Some(&Context::background()),
                Method::POST,
                "rest/api/2/screens",
                None,
                Some(payload.into()),
            )
            .unwrap();

        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(request.body(), Some(br#"{"name":"A"}"#.as_slice()));
    }

    #[test]
    fn test_content_type_override() {
        let api = client("https://org.atlassian.net/");
        let request = api
            .build_request(
                Some(&Context::background()),
                Method::PUT,
                "rest/api/2/issue/KEY-1/properties/notes",
                Some("text/plain"),
                Some(b"hello".to_vec().into()),
            )
            .unwrap();

        assert_eq!(request.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(request.headers().get_all(CONTENT_TYPE).iter().count(), 1);
    }

    #[test]
    fn test_multipart_keeps_boundary() {
        let api = client("https://org.atlassian.net/");
        let form = Form::new().text("comment", "logs");
        let boundary = form.boundary().to_string();

        let request = api
            .build_request(
                Some(&Context::background()),
                Method::POST,
                "rest/api/2/issue/KEY-1/attachments",
                None,
                Some(form.into()),
            )
            .unwrap();

        let content_type = request.headers()[CONTENT_TYPE].to_str().unwrap();
        assert_eq!(
            content_type,
            format!("multipart/form-data; boundary={boundary}")
        );
        assert_eq!(request.headers().get_all(CONTENT_TYPE).iter().count(), 1);
    }

    #[test]
    fn test_user_agent_override() {
        let api = client("https://org.atlassian.net/").with_user_agent("custom-agent/2.0");
        let request = api
            .build_request(
                Some(&Context::background()),
                Method::GET,
                "rest/api/2/myself",
                None,
                None,
            )
            .unwrap();

        assert_eq!(request.headers()[USER_AGENT], "custom-agent/2.0");
    }

    #[test]
    fn test_invalid_user_agent() {
        let api = client("https://org.atlassian.net/").with_user_agent("bad\nagent");
        let result = api.build_request(
            Some(&Context::background()),
            Method::GET,
            "rest/api/2/myself",
            None,
            None,
        );
        assert!(matches!(result, Err(ApiError::InvalidHeader(_))));
    }
}
