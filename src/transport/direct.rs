use super::{build_http_client, execute_json, ApiFacade, ControlPlaneClient, TransportKind};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use reqwest::Method;
use url::Url;

/// Client bound to an explicit control-plane address. No cluster lookup.
#[derive(Debug)]
pub struct DirectClient {
    client: reqwest::Client,
    address: String,
    endpoint: Url,
}

impl DirectClient {
    /// `address` is `host:port`, or a full URL when a scheme is given.
    pub fn new(facade: ApiFacade, address: &str) -> Result<Self> {
        let address = address.trim();
        let base = if address.contains("://") {
            address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", address)
        };

        let endpoint = Url::parse(&format!("{}/{}", base, facade.api_prefix())).map_err(|e| {
            Error::connection_with_context(
                format!("invalid control plane address: {}", e),
                ErrorContext::new()
                    .with_field_path("api_addr")
                    .with_details(address)
                    .with_source("direct_transport"),
            )
        })?;

        Ok(Self {
            client: build_http_client(false)?,
            address: address.to_string(),
            endpoint,
        })
    }

    /// Address exactly as supplied by the caller.
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl ControlPlaneClient for DirectClient {
    fn kind(&self) -> TransportKind {
        TransportKind::Direct
    }

    fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value> {
        execute_json(&self.client, &self.endpoint, None, method, path, body).await
    }
}
