use crate::check::{CheckCategory, CheckProvider};
use crate::gate::{ReadinessGate, RetryPolicy};
use crate::report::DEFAULT_CHECK_COMMAND;
use crate::transport::{ApiFacade, ClusterContext, TransportSelector};
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_NAMESPACE: &str = "linkerd";

/// Settings read from the environment. Explicit builder settings win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct EnvSettings {
    pub namespace: Option<String>,
    pub api_addr: Option<String>,
    pub wait: Option<Duration>,
    pub retry_interval: Option<Duration>,
    pub check_command: Option<String>,
}

impl EnvSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let number = |key: &str| text(key).and_then(|v| v.parse::<u64>().ok());

        Self {
            namespace: text("CP_GATE_NAMESPACE"),
            api_addr: text("CP_GATE_API_ADDR"),
            wait: number("CP_GATE_WAIT_SECS").map(Duration::from_secs),
            retry_interval: number("CP_GATE_RETRY_INTERVAL_MS").map(Duration::from_millis),
            check_command: text("CP_GATE_CHECK_COMMAND"),
        }
    }
}

/// Builder for [`ReadinessGate`].
///
/// Environment variables (read once in [`build`](Self::build) unless
/// [`without_env`](Self::without_env) is set):
/// - `CP_GATE_NAMESPACE` (default `linkerd`)
/// - `CP_GATE_API_ADDR` (direct transport address)
/// - `CP_GATE_WAIT_SECS` (retry window; unset means no retries)
/// - `CP_GATE_RETRY_INTERVAL_MS` (default 1000)
/// - `CP_GATE_CHECK_COMMAND` (default `linkerd check`)
/// - cluster settings, see [`ClusterContext::from_env`]
pub struct ReadinessGateBuilder {
    provider: Option<Arc<dyn CheckProvider>>,
    cluster: Option<ClusterContext>,
    facade: ApiFacade,
    namespace: Option<String>,
    api_addr: Option<String>,
    api_checks: bool,
    no_retry: bool,
    deadline: Option<Instant>,
    wait: Option<Duration>,
    retry_interval: Option<Duration>,
    check_command: Option<String>,
    cancel: Option<CancellationToken>,
    read_env: bool,
}

impl ReadinessGateBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            cluster: None,
            facade: ApiFacade::default(),
            namespace: None,
            api_addr: None,
            api_checks: false,
            no_retry: false,
            deadline: None,
            wait: None,
            retry_interval: None,
            check_command: None,
            cancel: None,
            read_env: true,
        }
    }

    /// Set the collaborator that performs the checks (required).
    pub fn provider(mut self, provider: Arc<dyn CheckProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn cluster(mut self, cluster: ClusterContext) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub fn facade(mut self, facade: ApiFacade) -> Self {
        self.facade = facade;
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Explicit control-plane address. Empty means "go through the cluster".
    pub fn api_addr(mut self, addr: impl Into<String>) -> Self {
        self.api_addr = Some(addr.into());
        self
    }

    /// Also require the control-plane API itself to answer.
    pub fn api_checks(mut self, enable: bool) -> Self {
        self.api_checks = enable;
        self
    }

    /// Retry until `deadline`.
    pub fn retry_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Retry for `window` starting when the gate is built.
    pub fn wait(mut self, window: Duration) -> Self {
        self.wait = Some(window);
        self
    }

    /// Clear any deadline, including one from the environment.
    pub fn no_retry(mut self) -> Self {
        self.no_retry = true;
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = Some(interval);
        self
    }

    /// Command suggested in the remediation line.
    pub fn check_command(mut self, command: impl Into<String>) -> Self {
        self.check_command = Some(command.into());
        self
    }

    /// Abort retry waits when `token` is cancelled.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Ignore `CP_GATE_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    pub fn build(self) -> Result<ReadinessGate> {
        let env = if self.read_env {
            EnvSettings::from_env()
        } else {
            EnvSettings::default()
        };
        self.build_with(env)
    }

    pub(crate) fn build_with(self, env: EnvSettings) -> Result<ReadinessGate> {
        let provider = self.provider.ok_or_else(|| {
            Error::configuration_with_context(
                "no check provider configured",
                ErrorContext::new()
                    .with_field_path("provider")
                    .with_source("gate_builder"),
            )
        })?;

        let namespace = self
            .namespace
            .or(env.namespace)
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        if namespace.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "control plane namespace is empty",
                ErrorContext::new()
                    .with_field_path("namespace")
                    .with_source("gate_builder"),
            ));
        }

        let interval = self
            .retry_interval
            .or(env.retry_interval)
            .unwrap_or(RetryPolicy::DEFAULT_INTERVAL);
        let retry = if self.no_retry {
            RetryPolicy::no_retry()
        } else if let Some(deadline) = self.deadline {
            RetryPolicy::until(deadline)
        } else {
            self.wait
                .or(env.wait)
                .map(RetryPolicy::wait_for)
                .unwrap_or_default()
        };
        let retry = retry.with_interval(interval);

        let cluster = match self.cluster {
            Some(cluster) => cluster,
            None if self.read_env => ClusterContext::from_env(),
            None => ClusterContext::new(),
        };

        Ok(ReadinessGate {
            provider,
            cluster,
            selector: TransportSelector::new(self.facade, namespace),
            api_addr: self.api_addr.or(env.api_addr),
            categories: CheckCategory::plan(self.api_checks),
            retry,
            check_command: self
                .check_command
                .or(env.check_command)
                .unwrap_or_else(|| DEFAULT_CHECK_COMMAND.to_string()),
            cancel: self.cancel,
        })
    }
}

impl Default for ReadinessGateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
