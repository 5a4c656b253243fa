use super::{
    build_http_client, execute_json, ApiFacade, ClusterContext, ControlPlaneClient, TransportKind,
};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use reqwest::Method;
use url::Url;

/// Client that reaches the control plane through the cluster API's service proxy:
/// `<server>/api/v1/namespaces/<ns>/services/<svc>:<port>/proxy/<api prefix>`.
#[derive(Debug)]
pub struct ProxiedClient {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

impl ProxiedClient {
    pub fn new(facade: ApiFacade, namespace: &str, cluster: &ClusterContext) -> Result<Self> {
        let root = cluster.server_base()?;

        if namespace.trim().is_empty() {
            return Err(Error::connection_with_context(
                "control plane namespace is empty",
                ErrorContext::new()
                    .with_field_path("namespace")
                    .with_source("proxied_transport"),
            ));
        }

        let proxy_path = format!(
            "api/v1/namespaces/{}/services/{}:{}/proxy/{}",
            namespace.trim(),
            facade.service_name(),
            facade.service_port(),
            facade.api_prefix()
        );
        let endpoint = root.join(&proxy_path).map_err(|e| {
            Error::connection_with_context(
                format!("cannot build proxy URL: {}", e),
                ErrorContext::new()
                    .with_details(proxy_path.clone())
                    .with_source("proxied_transport"),
            )
        })?;

        Ok(Self {
            client: build_http_client(cluster.accepts_invalid_certs())?,
            endpoint,
            token: cluster.token().map(str::to_string),
        })
    }
}

#[async_trait]
impl ControlPlaneClient for ProxiedClient {
    fn kind(&self) -> TransportKind {
        TransportKind::Proxied
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
        execute_json(
            &self.client,
            &self.endpoint,
            self.token.as_deref(),
            method,
            path,
            body,
        )
        .await
    }
}
