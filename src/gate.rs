//! Readiness gate: ordered health checks in front of client acquisition.
//!
//! Categories run strictly in order; a category whose outcome is retryable
//! is re-run from the start until the retry deadline, and anything fatal
//! stops the pipeline. Only when every category has passed is a client built
//! through the transport selector.

pub mod builder;
mod policy;
pub mod readiness;

pub use builder::{ReadinessGateBuilder, DEFAULT_NAMESPACE};
pub use policy::RetryPolicy;
pub use readiness::{FatalReason, GateOutcome, ReadinessGate};

use crate::report::EXIT_FAILURE;
use crate::transport::ClientHandle;

/// Validate the baseline categories once, with no retries, or exit.
pub async fn check_client_or_exit(builder: ReadinessGateBuilder) -> ClientHandle {
    check_client_or_retry_or_exit(builder.no_retry(), false).await
}

/// Validate the control plane, waiting out transient failures until the
/// builder's deadline, or exit. `api_checks` adds the control-plane API category.
pub async fn check_client_or_retry_or_exit(
    builder: ReadinessGateBuilder,
    api_checks: bool,
) -> ClientHandle {
    match builder.api_checks(api_checks).build() {
        Ok(gate) => gate.acquire_or_exit().await,
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(EXIT_FAILURE);
        }
    }
}
