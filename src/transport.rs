//! Single-request execution against the Centreon server.
//!
//! One [`Transport`] is shared by every endpoint created from the same
//! [`Api`](crate::Api). It issues exactly one HTTP request per call and
//! classifies the outcome into the crate's error taxonomy; pagination and
//! record materialization live a layer up, in [`crate::query`].

use std::sync::RwLock;
use std::time::Duration;

use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::{Error, Result};

pub(crate) struct Transport {
    http: reqwest::Client,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
    token: RwLock<Option<String>>,
}

impl Transport {
    pub(crate) fn new(
        http: reqwest::Client,
        default_headers: HeaderMap,
        timeout: Option<Duration>,
        token: Option<String>,
    ) -> Transport {
        Transport {
            http,
            default_headers,
            timeout,
            token: RwLock::new(token),
        }
    }

    pub(crate) fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn set_token(&self, token: String) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token);
    }

    /// Issues one request and returns the parsed JSON body.
    ///
    /// A 409 on a creating call maps to [`Error::Allocation`], any other
    /// non-success status to [`Error::Request`], and a success status
    /// with a non-JSON body to [`Error::Content`]. An entirely empty
    /// success body parses as `Value::Null`.
    pub(crate) async fn execute(
        &self,
        method: Method,
        url: Url,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let creating = method == Method::POST;
        let response = self.send(method, url, params, body).await?;
        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(classify_failure(status, final_url, response, creating).await);
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            tracing::info!(status = status.as_u16(), url = %final_url, "received empty response");
            return Ok(Value::Null);
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(parsed) => {
                tracing::info!(status = status.as_u16(), url = %final_url, "received HTTP response");
                Ok(parsed)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    url = %final_url,
                    "server returned a non-JSON success body"
                );
                Err(Error::Content {
                    url: final_url,
                    detail: "the server returned invalid (non-JSON) data".to_string(),
                })
            }
        }
    }

    /// Issues one delete request; any success status means the batch was
    /// accepted. Centreon answers deletes with 204 and no body.
    pub(crate) async fn execute_delete(&self, url: Url, body: &Value) -> Result<bool> {
        let response = self.send(Method::DELETE, url, &[], Some(body)).await?;
        let status = response.status();
        let final_url = response.url().to_string();

        if status.is_success() {
            tracing::info!(status = status.as_u16(), url = %final_url, "delete accepted");
            return Ok(true);
        }
        Err(classify_failure(status, final_url, response, false).await)
    }

    async fn send(
        &self,
        method: Method,
        mut url: Url,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        for (key, value) in params {
            url.query_pairs_mut().append_pair(key, value);
        }

        tracing::debug!(method = %method, url = %url, "executing HTTP request");

        let mut request = self.http.request(method, url);

        // Body-bearing calls announce their payload; reads announce what
        // they accept.
        request = match body {
            Some(_) => request.header(CONTENT_TYPE, "application/json"),
            None => request.header(ACCEPT, "application/json"),
        };

        for (name, value) in &self.default_headers {
            request = request.header(name, value);
        }

        if let Some(token) = self.token.read().unwrap_or_else(|e| e.into_inner()).as_deref() {
            request = request.header("X-AUTH-TOKEN", token);
        }

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }
}

async fn classify_failure(
    status: StatusCode,
    url: String,
    response: reqwest::Response,
    creating: bool,
) -> Error {
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<Value>(&text).ok();

    if creating && status == StatusCode::CONFLICT {
        tracing::warn!(url = %url, "allocation conflict");
        return Error::Allocation { url, body };
    }

    if status.is_client_error() {
        tracing::error!(status = status.as_u16(), response = %text, "client error (4xx)");
    } else {
        tracing::warn!(status = status.as_u16(), response = %text, "server error");
    }

    Error::Request { url, status, body }
}
