//! Async client for the reload conductor HTTP API.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};

/// Status code and decoded JSON body of one API call.
#[derive(Debug, Clone)]
pub struct ApiReply {
    pub status: u16,
    pub body: Value,
}

impl ApiReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `error` field of a failed call, e.g. `"locked"`.
    pub fn error_kind(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

pub struct ConductorClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ConductorClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<ApiReply, reqwest::Error> {
        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(ApiReply { status, body })
    }

    /// Submit a route batch (`{"id", "routes", "mode"}`).
    pub async fn add_routes<B: Serialize>(&self, batch: &B) -> Result<ApiReply, reqwest::Error> {
        Self::send(self.request(Method::POST, "/v1/routes").json(batch)).await
    }

    pub async fn remove_routes<B: Serialize>(&self, batch: &B) -> Result<ApiReply, reqwest::Error> {
        Self::send(self.request(Method::POST, "/v1/routes/remove").json(batch)).await
    }

    pub async fn regenerate(&self) -> Result<ApiReply, reqwest::Error> {
        Self::send(self.request(Method::POST, "/v1/config/regenerate")).await
    }

    pub async fn lock_for_reload(&self) -> Result<ApiReply, reqwest::Error> {
        Self::send(self.request(Method::POST, "/v1/reload/lock")).await
    }

    pub async fn reload(&self) -> Result<ApiReply, reqwest::Error> {
        Self::send(self.request(Method::POST, "/v1/reload")).await
    }

    /// Release the lock; `success` is used for change sets no reload covered.
    pub async fn release(&self, success: bool) -> Result<ApiReply, reqwest::Error> {
        let outcome = if success { "success" } else { "failure" };
        Self::send(
            self.request(Method::POST, "/v1/reload/release")
                .json(&json!({ "outcome": outcome })),
        )
        .await
    }

    pub async fn change_set_status(&self, id: &str) -> Result<ApiReply, reqwest::Error> {
        Self::send(self.request(Method::GET, &format!("/v1/changesets/{}", id))).await
    }

    pub async fn status(&self) -> Result<ApiReply, reqwest::Error> {
        Self::send(self.request(Method::GET, "/v1/status")).await
    }

    pub async fn set_live(&self) -> Result<ApiReply, reqwest::Error> {
        Self::send(self.request(Method::POST, "/v1/live")).await
    }

    pub async fn set_not_live(&self) -> Result<ApiReply, reqwest::Error> {
        Self::send(self.request(Method::DELETE, "/v1/live")).await
    }

    pub async fn start_proxy(&self) -> Result<ApiReply, reqwest::Error> {
        Self::send(self.request(Method::POST, "/v1/proxy/start")).await
    }

    pub async fn kill_proxy(&self) -> Result<ApiReply, reqwest::Error> {
        Self::send(self.request(Method::POST, "/v1/proxy/kill")).await
    }

    /// `HEAD /health`; true when the node is in rotation.
    pub async fn is_live(&self) -> Result<bool, reqwest::Error> {
        let resp = self
            .client
            .head(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status() == StatusCode::OK)
    }
}
