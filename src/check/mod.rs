//! Check categories, outcomes and the provider seam.
//!
//! The gate does not know what an individual check does. It asks a
//! [`CheckProvider`] to run every check belonging to one [`CheckCategory`] and
//! reacts to the [`CheckOutcome`]s it gets back.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CheckCategory`] | Ordered class of checks (infrastructure before platform before API) |
//! | [`CheckOutcome`] | Result of one check, tagged with its category |
//! | [`FailureKind`] | Classification of a failed outcome |
//! | [`CheckProvider`] | Trait implemented by whatever actually performs the checks |
//! | [`probe::HttpProbeProvider`] | Generic HTTP-probe provider |

pub mod probe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Class of precondition checks.
///
/// The derived ordering is the dependency order: a category only runs after
/// every lower one has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckCategory {
    /// The cluster management API answers.
    KubernetesApi = 0,
    /// The control plane is installed in the cluster.
    ControlPlaneExistence = 1,
    /// The control plane's own API answers.
    ControlPlaneApi = 2,
}

impl CheckCategory {
    pub const COUNT: usize = 3;

    /// Every category, in execution order.
    pub const ALL: [CheckCategory; Self::COUNT] = [
        CheckCategory::KubernetesApi,
        CheckCategory::ControlPlaneExistence,
        CheckCategory::ControlPlaneApi,
    ];

    /// Categories that always run, in order.
    pub const BASELINE: [CheckCategory; 2] = [
        CheckCategory::KubernetesApi,
        CheckCategory::ControlPlaneExistence,
    ];

    /// Effective category list for an acquisition.
    pub fn plan(api_checks: bool) -> Vec<CheckCategory> {
        let mut categories = Self::BASELINE.to_vec();
        if api_checks {
            categories.push(CheckCategory::ControlPlaneApi);
        }
        categories
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckCategory::KubernetesApi => "kubernetes-api",
            CheckCategory::ControlPlaneExistence => "control-plane-existence",
            CheckCategory::ControlPlaneApi => "control-plane-api",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a failed outcome must be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Expected to resolve on its own; re-run the category until the deadline.
    Retryable,
    /// Will not resolve on its own; fatal immediately.
    Hard,
    /// Surfaced to the user, never fatal, never retried.
    Warning,
}

/// Result of running one check.
///
/// Fields are private so that `retryable` and `warning` can never both be set.
#[derive(Debug)]
pub struct CheckOutcome {
    category: CheckCategory,
    description: String,
    hint_anchor: Option<String>,
    error: Option<anyhow::Error>,
    warning: bool,
    retryable: bool,
}

impl CheckOutcome {
    fn new(category: CheckCategory, description: impl Into<String>) -> Self {
        Self {
            category,
            description: description.into(),
            hint_anchor: None,
            error: None,
            warning: false,
            retryable: false,
        }
    }

    pub fn success(category: CheckCategory, description: impl Into<String>) -> Self {
        Self::new(category, description)
    }

    pub fn hard(
        category: CheckCategory,
        description: impl Into<String>,
        error: impl Into<anyhow::Error>,
    ) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(category, description)
        }
    }

    pub fn retryable(
        category: CheckCategory,
        description: impl Into<String>,
        error: impl Into<anyhow::Error>,
    ) -> Self {
        Self {
            error: Some(error.into()),
            retryable: true,
            ..Self::new(category, description)
        }
    }

    pub fn warning(
        category: CheckCategory,
        description: impl Into<String>,
        error: impl Into<anyhow::Error>,
    ) -> Self {
        Self {
            error: Some(error.into()),
            warning: true,
            ..Self::new(category, description)
        }
    }

    /// Attach a documentation anchor pointing at remediation steps.
    pub fn with_hint_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.hint_anchor = Some(anchor.into());
        self
    }

    pub fn category(&self) -> CheckCategory {
        self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn hint_anchor(&self) -> Option<&str> {
        self.hint_anchor.as_deref()
    }

    pub fn error(&self) -> Option<&anyhow::Error> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_warning(&self) -> bool {
        self.warning
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error.as_ref()?;
        Some(if self.retryable {
            FailureKind::Retryable
        } else if self.warning {
            FailureKind::Warning
        } else {
            FailureKind::Hard
        })
    }

    pub fn is_hard_failure(&self) -> bool {
        self.failure_kind() == Some(FailureKind::Hard)
    }

    /// Error text, or the description when the outcome carries no error.
    pub fn message(&self) -> String {
        match &self.error {
            Some(err) => err.to_string(),
            None => self.description.clone(),
        }
    }

    /// No retries remain: a retryable failure becomes a hard one.
    pub(crate) fn exhaust_retries(&mut self) {
        self.retryable = false;
    }
}

/// Performs the checks of a category.
///
/// `attempt` is 0 on the first run of a category and grows by one every time
/// the gate re-runs it after a retryable failure. Implementations may do
/// network I/O and keep state across categories (e.g., a cluster client built
/// by an earlier category).
#[async_trait]
pub trait CheckProvider: Send + Sync {
    async fn run_category(&self, category: CheckCategory, attempt: u32) -> Vec<CheckOutcome>;
}
