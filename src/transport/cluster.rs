//! Cluster connection context.

use crate::{Error, ErrorContext, Result};
use std::env;
use std::path::Path;
use url::Url;

const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Credentials and address of the cluster management API.
///
/// The gate only passes this through; the proxied transport and check
/// providers are the ones that use it.
#[derive(Clone, Default)]
pub struct ClusterContext {
    server: Option<Url>,
    // Raw value and parse error of a rejected server URL.
    invalid_server: Option<(String, String)>,
    token: Option<String>,
    accept_invalid_certs: bool,
}

impl ClusterContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster API server. An unparsable URL leaves the server unset; the parse
    /// error is kept and returned by [`ClusterContext::server_base`].
    pub fn with_server(mut self, server: &str) -> Self {
        match Url::parse(server) {
            Ok(url) => {
                self.server = Some(url);
                self.invalid_server = None;
            }
            Err(e) => {
                self.server = None;
                self.invalid_server = Some((server.to_string(), e.to_string()));
            }
        }
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Skip TLS verification of the cluster API (local development clusters).
    pub fn accept_invalid_certs(mut self, enable: bool) -> Self {
        self.accept_invalid_certs = enable;
        self
    }

    /// Resolve the cluster from the environment:
    /// - `CP_GATE_KUBE_SERVER` / `CP_GATE_KUBE_TOKEN`
    /// - otherwise the in-cluster service host and service-account token
    pub fn from_env() -> Self {
        let mut ctx = Self::new();

        if let Ok(server) = env::var("CP_GATE_KUBE_SERVER") {
            ctx = ctx.with_server(server.trim());
        } else if let (Ok(host), Ok(port)) = (
            env::var("KUBERNETES_SERVICE_HOST"),
            env::var("KUBERNETES_SERVICE_PORT"),
        ) {
            ctx = ctx.with_server(&format!("https://{}:{}", host, port));
        }

        if let Ok(token) = env::var("CP_GATE_KUBE_TOKEN") {
            ctx = ctx.with_token(token.trim());
        } else if let Ok(token) = std::fs::read_to_string(Path::new(SERVICE_ACCOUNT_TOKEN)) {
            ctx = ctx.with_token(token.trim());
        }

        ctx
    }

    pub fn server(&self) -> Option<&Url> {
        self.server.as_ref()
    }

    /// Server URL with a trailing slash, so relative joins keep any path prefix
    /// (`https://rancher.local/k8s/clusters/c-1/` + `version`).
    pub fn server_base(&self) -> Result<Url> {
        let Some(server) = &self.server else {
            return Err(match &self.invalid_server {
                Some((raw, reason)) => Error::connection_with_context(
                    format!("cluster API server URL is invalid: {}", reason),
                    ErrorContext::new()
                        .with_field_path("cluster.server")
                        .with_details(raw.clone())
                        .with_source("cluster_context"),
                ),
                None => Error::connection_with_context(
                    "cluster API server is not configured",
                    ErrorContext::new()
                        .with_field_path("cluster.server")
                        .with_source("cluster_context"),
                ),
            });
        };

        let mut base = server.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base)
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn accepts_invalid_certs(&self) -> bool {
        self.accept_invalid_certs
    }
}

// Keep the bearer token out of logs.
impl std::fmt::Debug for ClusterContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterContext")
            .field("server", &self.server.as_ref().map(Url::as_str))
            .field("invalid_server", &self.invalid_server)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}
