//! # cp-gate
//!
//! Readiness-gated control-plane client acquisition for command-line tools.
//!
//! ## Overview
//!
//! A CLI cannot assume its control plane is reachable, installed or ready.
//! Before handing out a client this crate runs an ordered chain of check
//! categories, waits out transient unreadiness until a deadline, and turns
//! failures into user-facing diagnostics and a deterministic exit code.
//!
//! ## Key Features
//!
//! - **Ordered checks**: cluster API, then control-plane installation, then
//!   (optionally) the control-plane API; later categories never run before
//!   earlier ones pass
//! - **Deadline retries**: retryable failures re-run their whole category
//!   at a fixed interval until the deadline
//! - **Transport selection**: explicit address means a direct client, no
//!   address means a client tunneled through the cluster's service proxy
//! - **Result-returning core**: [`ReadinessGate::acquire`] returns a
//!   [`GateOutcome`]; the print-and-exit behavior lives in
//!   [`ReadinessGate::acquire_or_exit`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cp_gate::check::probe::{HttpProbe, HttpProbeProvider};
//! use cp_gate::{CheckCategory, ReadinessGateBuilder};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> cp_gate::Result<()> {
//!     let provider = HttpProbeProvider::new()?.probe(
//!         CheckCategory::KubernetesApi,
//!         HttpProbe::new("can query the cluster API", "https://127.0.0.1:6443/version".parse().unwrap()),
//!     );
//!
//!     let gate = ReadinessGateBuilder::new()
//!         .provider(Arc::new(provider))
//!         .wait(Duration::from_secs(30))
//!         .build()?;
//!
//!     let client = gate.acquire_or_exit().await;
//!     let version = client.call("Version", &serde_json::json!({})).await?;
//!     println!("{}", version);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`check`] | Categories, outcomes and the check provider seam |
//! | [`gate`] | Readiness gate, retry policy and builder |
//! | [`transport`] | Direct and proxied clients and the transport selector |
//! | [`report`] | Diagnostic reporting and exit policy |

pub mod check;
pub mod gate;
pub mod report;
pub mod transport;

pub use check::{CheckCategory, CheckOutcome, CheckProvider, FailureKind};
pub use gate::{
    check_client_or_exit, check_client_or_retry_or_exit, FatalReason, GateOutcome, ReadinessGate,
    ReadinessGateBuilder, RetryPolicy,
};
pub use report::{ExitPolicy, HeadlineTable, OutcomeObserver, EXIT_FAILURE};
pub use transport::{
    raw_client, ApiFacade, ClientHandle, ClusterContext, ControlPlaneClient, TransportKind,
    TransportSelector,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
