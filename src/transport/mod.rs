//! Control-plane transports.
//!
//! A [`ClientHandle`] wraps one of two [`ControlPlaneClient`] implementations:
//!
//! - [`DirectClient`]: talks to an explicit address.
//! - [`ProxiedClient`]: tunnels through the cluster management API's service proxy.
//!
//! Which one is built is decided once, by [`TransportSelector`]. Callers only
//! see the capability trait.

pub mod cluster;
pub mod direct;
pub mod proxied;
pub mod selector;

pub use cluster::ClusterContext;
pub use direct::DirectClient;
pub use proxied::ProxiedClient;
pub use selector::{raw_client, TransportSelector};

use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Method, Proxy};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Which variant a [`ClientHandle`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Direct,
    Proxied,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Direct => f.write_str("direct"),
            TransportKind::Proxied => f.write_str("proxied"),
        }
    }
}

/// Control-plane API the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiFacade {
    /// Core control-plane API.
    #[default]
    Public,
    /// Metrics (viz) extension API.
    Viz,
}

impl ApiFacade {
    /// Kubernetes service fronting the API.
    pub fn service_name(&self) -> &'static str {
        match self {
            ApiFacade::Public => "linkerd-controller-api",
            ApiFacade::Viz => "metrics-api",
        }
    }

    pub fn service_port(&self) -> u16 {
        8085
    }

    /// Path prefix under which the API's methods live.
    pub fn api_prefix(&self) -> &'static str {
        "api/v1/"
    }
}

/// Capability contract shared by both client variants.
#[async_trait]
pub trait ControlPlaneClient: Send + Sync + fmt::Debug {
    fn kind(&self) -> TransportKind;

    /// Base URL every request path is joined onto.
    fn endpoint(&self) -> &Url;

    /// Issue a JSON request against `<endpoint>/<path>`.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value>;
}

/// Validated control-plane client, owned by the caller.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    inner: Arc<dyn ControlPlaneClient>,
}

impl ClientHandle {
    pub fn new(client: impl ControlPlaneClient + 'static) -> Self {
        Self {
            inner: Arc::new(client),
        }
    }

    pub fn kind(&self) -> TransportKind {
        self.inner.kind()
    }

    pub fn endpoint(&self) -> &Url {
        self.inner.endpoint()
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value> {
        self.inner.request(method, path, body).await
    }

    /// Shorthand for the control plane's RPC-style `POST <method>` calls.
    pub async fn call(&self, rpc: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        self.inner.request(Method::POST, rpc, Some(body)).await
    }

    /// Release the client. Pending requests on clones are unaffected.
    pub fn close(self) {
        drop(self.inner);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Transport error: {0}")]
    Other(String),
}

/// Timeout shared by transports and probes (env-overridable).
pub(crate) fn http_timeout() -> Duration {
    let secs = env::var("CP_GATE_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(30);
    Duration::from_secs(secs.max(1))
}

pub(crate) fn build_http_client(accept_invalid_certs: bool) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(http_timeout())
        .pool_idle_timeout(Some(Duration::from_secs(90)));

    if accept_invalid_certs {
        builder = builder.danger_accept_invalid_certs(true);
    }

    if let Ok(proxy_url) = env::var("CP_GATE_PROXY_URL") {
        if let Ok(proxy) = Proxy::all(&proxy_url) {
            builder = builder.proxy(proxy);
        }
    }

    builder
        .build()
        .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))
}

/// Shared request path for both variants.
pub(crate) async fn execute_json(
    client: &reqwest::Client,
    base: &Url,
    bearer: Option<&str>,
    method: Method,
    path: &str,
    body: Option<&serde_json::Value>,
) -> Result<serde_json::Value> {
    let url = base
        .join(path.trim_start_matches('/'))
        .map_err(TransportError::from)?;

    let mut request = client.request(method, url);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }
    if let Some(body) = body {
        request = request.json(body);
    }

    let response = request.send().await.map_err(TransportError::from)?;
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(Error::Remote {
            status: status.as_u16(),
            message: message.trim().to_string(),
        });
    }

    let bytes = response.bytes().await.map_err(TransportError::from)?;
    if bytes.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}
