//! HTTP probe provider.
//!
//! Maps each category to a list of HTTP probes. Classification:
//! - 2xx: success
//! - 502/503/504, connect errors, timeouts: retryable when the probe allows it
//! - anything else: hard failure
//!
//! Probes marked warning-only report every failure as a warning. A category
//! marked unreachable fails hard without probing.

use super::{CheckCategory, CheckOutcome, CheckProvider};
use crate::transport::{build_http_client, ClusterContext};
use crate::Result;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::debug;
use url::Url;

/// One HTTP check. GET by default.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    description: String,
    method: Method,
    url: Url,
    bearer: Option<String>,
    retry_when_unavailable: bool,
    warning_only: bool,
}

impl HttpProbe {
    pub fn new(description: impl Into<String>, url: Url) -> Self {
        Self {
            description: description.into(),
            method: Method::GET,
            url,
            bearer: None,
            retry_when_unavailable: false,
            warning_only: false,
        }
    }

    /// Use another method. POST probes send an empty JSON object.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Treat unavailability as transient.
    pub fn retry_when_unavailable(mut self) -> Self {
        self.retry_when_unavailable = true;
        self
    }

    pub fn warning_only(mut self) -> Self {
        self.warning_only = true;
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

enum ProbeFailure {
    Unavailable(anyhow::Error),
    Rejected(anyhow::Error),
}

/// [`CheckProvider`] running plain HTTP probes.
pub struct HttpProbeProvider {
    client: reqwest::Client,
    probes: BTreeMap<CheckCategory, Vec<HttpProbe>>,
    unreachable: BTreeMap<CheckCategory, (String, String)>,
}

impl HttpProbeProvider {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(build_http_client(false)?))
    }

    /// Provider whose HTTP client follows the cluster's TLS settings.
    pub fn for_cluster(cluster: &ClusterContext) -> Result<Self> {
        Ok(Self::with_client(build_http_client(
            cluster.accepts_invalid_certs(),
        )?))
    }

    /// Use a preconfigured client (TLS settings, custom timeouts).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            probes: BTreeMap::new(),
            unreachable: BTreeMap::new(),
        }
    }

    pub fn probe(mut self, category: CheckCategory, probe: HttpProbe) -> Self {
        self.probes.entry(category).or_default().push(probe);
        self
    }

    /// Fail `category` with a hard outcome instead of running its probes, for
    /// when the endpoint they need cannot be resolved.
    pub fn unreachable(
        mut self,
        category: CheckCategory,
        description: impl Into<String>,
        reason: impl Display,
    ) -> Self {
        self.unreachable
            .insert(category, (description.into(), reason.to_string()));
        self
    }

    pub fn probes(&self, category: CheckCategory) -> &[HttpProbe] {
        self.probes.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    async fn run_probe(&self, probe: &HttpProbe) -> std::result::Result<(), ProbeFailure> {
        let mut request = self
            .client
            .request(probe.method.clone(), probe.url.clone());
        if probe.method == Method::POST {
            request = request.json(&serde_json::json!({}));
        }
        if let Some(token) = &probe.bearer {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) if err.is_connect() || err.is_timeout() => {
                return Err(ProbeFailure::Unavailable(err.into()))
            }
            Err(err) => return Err(ProbeFailure::Rejected(err.into())),
        };

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let err = anyhow::anyhow!("{} returned HTTP {}", probe.url, status.as_u16());
        match status {
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                Err(ProbeFailure::Unavailable(err))
            }
            _ => Err(ProbeFailure::Rejected(err)),
        }
    }
}

#[async_trait]
impl CheckProvider for HttpProbeProvider {
    async fn run_category(&self, category: CheckCategory, attempt: u32) -> Vec<CheckOutcome> {
        if let Some((description, reason)) = self.unreachable.get(&category) {
            debug!(%category, attempt, %reason, "category unreachable");
            return vec![CheckOutcome::hard(
                category,
                description.clone(),
                anyhow::anyhow!("{}", reason),
            )];
        }

        let mut outcomes = Vec::new();
        for probe in self.probes(category) {
            debug!(%category, attempt, url = %probe.url, "probing");
            let outcome = match self.run_probe(probe).await {
                Ok(()) => CheckOutcome::success(category, probe.description.clone()),
                Err(failure) => {
                    let (err, transient) = match failure {
                        ProbeFailure::Unavailable(err) => (err, true),
                        ProbeFailure::Rejected(err) => (err, false),
                    };
                    if probe.warning_only {
                        CheckOutcome::warning(category, probe.description.clone(), err)
                    } else if transient && probe.retry_when_unavailable {
                        CheckOutcome::retryable(category, probe.description.clone(), err)
                    } else {
                        CheckOutcome::hard(category, probe.description.clone(), err)
                    }
                }
            };
            // Later probes assume earlier ones passed.
            let stop = outcome.is_retryable() || outcome.is_hard_failure();
            outcomes.push(outcome);
            if stop {
                break;
            }
        }
        outcomes
    }
}
