use crate::check::{CheckCategory, CheckProvider};
use crate::gate::RetryPolicy;
use crate::report::{ExitPolicy, OutcomeObserver, EXIT_FAILURE};
use crate::transport::{ClientHandle, ClusterContext, TransportSelector};
use crate::Error;
use std::io::Write;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of an acquisition.
#[derive(Debug)]
pub enum GateOutcome {
    Ready(ClientHandle),
    Failed(FatalReason),
}

impl GateOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, GateOutcome::Ready(_))
    }

    pub fn into_result(self) -> std::result::Result<ClientHandle, FatalReason> {
        match self {
            GateOutcome::Ready(client) => Ok(client),
            GateOutcome::Failed(reason) => Err(reason),
        }
    }
}

/// Why an acquisition stopped.
#[derive(Debug, Error)]
pub enum FatalReason {
    #[error("{category} check failed: {message}")]
    CheckFailed {
        category: CheckCategory,
        message: String,
    },

    #[error("{category} not ready after {attempts} attempt(s): {message}")]
    RetriesExhausted {
        category: CheckCategory,
        message: String,
        attempts: u32,
    },

    #[error("cannot construct control plane client: {0}")]
    Transport(#[source] Error),

    #[error("wait for {category} was cancelled")]
    Cancelled { category: CheckCategory },
}

impl FatalReason {
    pub fn category(&self) -> CheckCategory {
        match self {
            FatalReason::CheckFailed { category, .. }
            | FatalReason::RetriesExhausted { category, .. }
            | FatalReason::Cancelled { category } => *category,
            FatalReason::Transport(_) => CheckCategory::ControlPlaneApi,
        }
    }

    /// Text printed after the category headline.
    pub fn message(&self) -> String {
        match self {
            FatalReason::CheckFailed { message, .. }
            | FatalReason::RetriesExhausted { message, .. } => message.clone(),
            FatalReason::Transport(err) => err.to_string(),
            FatalReason::Cancelled { .. } => "wait for control plane was cancelled".to_string(),
        }
    }

    /// Whether the observer already saw the outcome behind this reason.
    pub fn was_reported(&self) -> bool {
        matches!(
            self,
            FatalReason::CheckFailed { .. } | FatalReason::RetriesExhausted { .. }
        )
    }
}

/// Ordered readiness check pipeline that yields a validated client.
///
/// Built with [`crate::gate::ReadinessGateBuilder`]. Each instance owns its
/// category list and policy; instances share nothing.
pub struct ReadinessGate {
    pub(crate) provider: Arc<dyn CheckProvider>,
    pub(crate) cluster: ClusterContext,
    pub(crate) selector: TransportSelector,
    pub(crate) api_addr: Option<String>,
    pub(crate) categories: Vec<CheckCategory>,
    pub(crate) retry: RetryPolicy,
    pub(crate) check_command: String,
    pub(crate) cancel: Option<CancellationToken>,
}

impl ReadinessGate {
    pub fn categories(&self) -> &[CheckCategory] {
        &self.categories
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn check_command(&self) -> &str {
        &self.check_command
    }

    /// Run every category in order, then build the client.
    ///
    /// Categories never run before all earlier ones have passed. A retryable
    /// outcome re-runs its whole category after the retry interval while the
    /// deadline allows; past the deadline it is reported as a hard failure.
    pub async fn acquire<O>(&self, observer: &mut O) -> GateOutcome
    where
        O: OutcomeObserver + ?Sized,
    {
        for &category in &self.categories {
            if let Err(reason) = self.run_category(category, observer).await {
                warn!(%category, error = %reason, "readiness gate failed");
                return GateOutcome::Failed(reason);
            }
        }

        match self.selector.select(self.api_addr.as_deref(), &self.cluster) {
            Ok(client) => {
                info!(
                    transport = %client.kind(),
                    endpoint = %client.endpoint(),
                    "control plane client ready"
                );
                GateOutcome::Ready(client)
            }
            Err(err) => GateOutcome::Failed(FatalReason::Transport(err)),
        }
    }

    /// Acquire, printing diagnostics through `policy`.
    ///
    /// Fatal reasons the observer never saw (transport construction,
    /// cancellation) are reported here, so every failure ends with exactly one
    /// headline and one remediation line.
    pub async fn acquire_reported<W: Write>(
        &self,
        policy: &mut ExitPolicy<W>,
    ) -> std::result::Result<ClientHandle, FatalReason> {
        let result = self.acquire(policy).await.into_result();
        if let Err(reason) = &result {
            if !reason.was_reported() {
                policy.report_fatal(reason);
            }
        }
        result
    }

    /// Interactive entry point: diagnostics go to stderr and any fatal
    /// outcome terminates the process with [`EXIT_FAILURE`].
    pub async fn acquire_or_exit(&self) -> ClientHandle {
        let mut policy = ExitPolicy::stderr(self.check_command.clone());
        match self.acquire_reported(&mut policy).await {
            Ok(client) => client,
            Err(_) => std::process::exit(EXIT_FAILURE),
        }
    }

    async fn run_category<O>(
        &self,
        category: CheckCategory,
        observer: &mut O,
    ) -> std::result::Result<(), FatalReason>
    where
        O: OutcomeObserver + ?Sized,
    {
        let mut attempt = 0u32;
        'attempts: loop {
            debug!(%category, attempt, "running readiness checks");
            let outcomes = self.provider.run_category(category, attempt).await;

            for mut outcome in outcomes {
                debug_assert_eq!(outcome.category(), category);
                debug!(
                    %category,
                    check = outcome.description(),
                    success = outcome.is_success(),
                    "check outcome"
                );

                if outcome.is_retryable() {
                    if self.retry.allows_retry_at(Instant::now()) {
                        if observer.observe(&outcome) {
                            return Err(FatalReason::CheckFailed {
                                category,
                                message: outcome.message(),
                            });
                        }
                        warn!(%category, attempt, error = %outcome.message(), "retrying category");
                        self.pause(category).await?;
                        attempt += 1;
                        continue 'attempts;
                    }
                    outcome.exhaust_retries();
                    observer.observe(&outcome);
                    return Err(FatalReason::RetriesExhausted {
                        category,
                        message: outcome.message(),
                        attempts: attempt + 1,
                    });
                }

                let terminate = observer.observe(&outcome);
                if terminate || outcome.is_hard_failure() {
                    return Err(FatalReason::CheckFailed {
                        category,
                        message: outcome.message(),
                    });
                }
            }

            return Ok(());
        }
    }

    async fn pause(&self, category: CheckCategory) -> std::result::Result<(), FatalReason> {
        let sleep = tokio::time::sleep(self.retry.interval());
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(FatalReason::Cancelled { category }),
                    _ = sleep => Ok(()),
                }
            }
            None => {
                sleep.await;
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for ReadinessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessGate")
            .field("categories", &self.categories)
            .field("retry", &self.retry)
            .field("selector", &self.selector)
            .field("api_addr", &self.api_addr)
            .field("cluster", &self.cluster)
            .finish_non_exhaustive()
    }
}
