//! Entry point: connection configuration and namespace containers.
//!
//! An [`Api`] holds everything every endpoint shares — the normalized
//! base URL, the authentication token, and the pooled HTTP client — and
//! hands out [`App`] namespaces whose endpoints do the actual work.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::{json, Value};
use url::Url;

use crate::endpoint::Endpoint;
use crate::record::{Record, RecordKind};
use crate::transport::Transport;
use crate::{Error, Result};

struct ApiInner {
    base_url: Url,
    transport: Transport,
}

/// The point of entry to the Centreon API.
///
/// Cheap to clone: clones share the connection pool, the token, and the
/// configuration. The shared state is read-only apart from the token,
/// which [`create_token`](Api::create_token) stores for every endpoint
/// created from this handle.
///
/// # Examples
///
/// ```no_run
/// use centreon_api::Api;
///
/// # async fn example() -> centreon_api::Result<()> {
/// let api = Api::builder()
///     .url("https://centreon.example.com/centreon")?
///     .token("d6f4e314a5b5fefd164995169f28ae32d987704f")
///     .build()?;
///
/// let hosts = api.monitoring().endpoint("hosts").all().collect().await?;
/// println!("{} hosts", hosts.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Api {
    inner: Arc<ApiInner>,
}

impl Api {
    /// Creates a new [`ApiBuilder`] for configuring a client.
    pub fn builder() -> ApiBuilder {
        ApiBuilder::new()
    }

    /// The normalized base URL (`{url}/api/latest`).
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The token requests currently authenticate with.
    pub fn token(&self) -> Option<String> {
        self.inner.transport.token()
    }

    pub(crate) fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    pub(crate) fn resource_url(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.base_url.clone();
        let mut path = url.path().trim_end_matches('/').to_string();
        for segment in segments {
            path.push('/');
            path.push_str(segment);
        }
        url.set_path(&path);
        url
    }

    /// Returns the namespace container for `name`.
    ///
    /// The v2 API groups resources under namespaces such as `monitoring`,
    /// `configuration`, `administration`, and `platform`; anything the
    /// server exposes can be addressed here by name.
    pub fn app(&self, name: impl Into<String>) -> App {
        App {
            api: self.clone(),
            name: name.into(),
        }
    }

    /// The `monitoring` namespace (hosts, services, acknowledgements,
    /// downtimes, timeperiods, ...).
    pub fn monitoring(&self) -> App {
        self.app("monitoring")
    }

    /// The `configuration` namespace (hosts, services and their groups,
    /// categories, templates, ...).
    pub fn configuration(&self) -> App {
        self.app("configuration")
    }

    /// The `administration` namespace.
    pub fn administration(&self) -> App {
        self.app("administration")
    }

    /// The `platform` namespace.
    pub fn platform(&self) -> App {
        self.app("platform")
    }

    /// Exchanges a username and password for an API token.
    ///
    /// The returned token is stored on this handle (and all its clones),
    /// so subsequent calls authenticate without further ceremony. The
    /// full login response is returned as a [`Record`].
    pub async fn create_token(&self, login: &str, password: &str) -> Result<Record> {
        let url = self.resource_url(&["login"]);
        let payload = json!({
            "security": {
                "credentials": { "login": login, "password": password }
            }
        });
        let response = self
            .inner
            .transport
            .execute(Method::POST, url.clone(), &[], Some(&payload))
            .await?;

        let token = response
            .get("security")
            .and_then(|security| security.get("token"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Content {
                url: url.to_string(),
                detail: "login response did not include security.token".to_string(),
            })?
            .to_string();
        self.inner.transport.set_token(token);
        tracing::info!("stored API token from login");

        match response {
            Value::Object(map) => Ok(Record::from_object(RecordKind::Generic, map, None)),
            _ => Err(Error::Content {
                url: url.to_string(),
                detail: "login response was not a JSON object".to_string(),
            }),
        }
    }

    /// Fetches the platform status document.
    pub async fn status(&self) -> Result<Value> {
        let url = self.resource_url(&["status"]);
        self.inner.transport.execute(Method::GET, url, &[], None).await
    }
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("base_url", &self.inner.base_url.as_str())
            .finish()
    }
}

/// One namespace of the remote API.
///
/// Pairs the shared [`Api`] context with a namespace name and builds
/// [`Endpoint`]s under it.
#[derive(Debug, Clone)]
pub struct App {
    api: Api,
    name: String,
}

impl App {
    /// The namespace name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builds the endpoint for `name` under this namespace.
    ///
    /// The record specialization is resolved once, here, from the closed
    /// registry; unregistered resources materialize generic records.
    pub fn endpoint(&self, name: &str) -> Endpoint {
        Endpoint::new(self.api.clone(), &self.name, name)
    }
}

/// Builder for configuring and creating an [`Api`].
///
/// # Examples
///
/// ```no_run
/// use centreon_api::Api;
/// use std::time::Duration;
///
/// # fn example() -> centreon_api::Result<()> {
/// let api = Api::builder()
///     .url("https://centreon.example.com/centreon")?
///     .token("d6f4e314a5b5fefd164995169f28ae32d987704f")
///     .timeout(Duration::from_secs(30))
///     .verify_tls(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ApiBuilder {
    base_url: Option<Url>,
    token: Option<String>,
    timeout: Option<Duration>,
    verify_tls: bool,
    default_headers: HeaderMap,
}

impl ApiBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> ApiBuilder {
        ApiBuilder {
            base_url: None,
            token: None,
            timeout: None,
            verify_tls: false,
            default_headers: HeaderMap::new(),
        }
    }

    /// Sets the server URL.
    ///
    /// Pass the address of the Centreon installation (e.g.
    /// `https://centreon.example.com/centreon`); the `/api/latest` suffix
    /// is appended here.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn url(mut self, url: impl AsRef<str>) -> Result<ApiBuilder> {
        let trimmed = url.as_ref().trim_end_matches('/');
        self.base_url = Some(Url::parse(&format!("{}/api/latest", trimmed))?);
        Ok(self)
    }

    /// Sets the API token requests authenticate with.
    ///
    /// Optional at build time: [`Api::create_token`] can exchange
    /// credentials for a token later.
    pub fn token(mut self, token: impl Into<String>) -> ApiBuilder {
        self.token = Some(token.into());
        self
    }

    /// Sets the per-request timeout. No timeout is applied by default.
    pub fn timeout(mut self, timeout: Duration) -> ApiBuilder {
        self.timeout = Some(timeout);
        self
    }

    /// Controls TLS certificate verification.
    ///
    /// **Defaults to `false`**: Centreon installations commonly run on
    /// self-signed certificates, so this client trusts any certificate
    /// unless told otherwise. This is an explicit, insecure default —
    /// scoped to the clients built from this builder, never a
    /// process-wide setting. Pass `true` to verify the server identity.
    pub fn verify_tls(mut self, verify: bool) -> ApiBuilder {
        self.verify_tls = verify;
        self
    }

    /// Adds a header included in every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<ApiBuilder> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Usage(format!("invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Usage(format!("invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Builds the configured [`Api`].
    ///
    /// # Errors
    ///
    /// Returns an error if no URL was provided or the underlying HTTP
    /// client cannot be constructed.
    pub fn build(self) -> Result<Api> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Usage("a server URL is required".to_string()))?;

        if !self.verify_tls {
            tracing::debug!("TLS certificate verification is disabled");
        }
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!self.verify_tls)
            .build()?;

        Ok(Api {
            inner: Arc::new(ApiInner {
                base_url,
                transport: Transport::new(http, self.default_headers, self.timeout, self.token),
            }),
        })
    }
}

impl Default for ApiBuilder {
    fn default() -> ApiBuilder {
        ApiBuilder::new()
    }
}
