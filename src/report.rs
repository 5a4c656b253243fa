//! Reporting and exit policy.
//!
//! The gate hands every outcome to an [`OutcomeObserver`]. [`ExitPolicy`] is
//! the interactive observer: it writes user-facing diagnostics and says whether
//! the process should terminate.

use crate::check::{CheckCategory, CheckOutcome, FailureKind};
use crate::gate::FatalReason;
use crate::{Error, ErrorContext, Result};
use std::io::{self, Write};

/// Exit code used on every fatal path.
pub const EXIT_FAILURE: i32 = 1;

pub const WAITING_NOTICE: &str = "Waiting for control plane to become available";

pub const DEFAULT_CHECK_COMMAND: &str = "linkerd check";

/// Receives every outcome produced by the gate.
///
/// Returns `true` when the process should terminate.
pub trait OutcomeObserver {
    fn observe(&mut self, outcome: &CheckOutcome) -> bool;
}

impl<F> OutcomeObserver for F
where
    F: FnMut(&CheckOutcome) -> bool,
{
    fn observe(&mut self, outcome: &CheckOutcome) -> bool {
        self(outcome)
    }
}

/// Category -> headline mapping, complete over [`CheckCategory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlineTable {
    headlines: [String; CheckCategory::COUNT],
}

impl HeadlineTable {
    /// Build from explicit entries. Every category must be mapped exactly once.
    pub fn from_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (CheckCategory, S)>,
        S: Into<String>,
    {
        let mut slots: [Option<String>; CheckCategory::COUNT] = Default::default();
        for (category, headline) in entries {
            let slot = &mut slots[category.index()];
            if slot.is_some() {
                return Err(Error::configuration_with_context(
                    format!("duplicate headline for category {}", category),
                    ErrorContext::new().with_source("headline_table"),
                ));
            }
            *slot = Some(headline.into());
        }

        let missing: Vec<&str> = CheckCategory::ALL
            .iter()
            .filter(|c| slots[c.index()].is_none())
            .map(|c| c.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(Error::configuration_with_context(
                "headline table is incomplete",
                ErrorContext::new()
                    .with_details(format!("unmapped categories: {}", missing.join(", ")))
                    .with_source("headline_table"),
            ));
        }

        Ok(Self {
            headlines: slots.map(Option::unwrap_or_default),
        })
    }

    pub fn headline(&self, category: CheckCategory) -> &str {
        &self.headlines[category.index()]
    }
}

impl Default for HeadlineTable {
    fn default() -> Self {
        Self {
            headlines: CheckCategory::ALL.map(|category| {
                let headline = match category {
                    CheckCategory::KubernetesApi => "Cannot connect to Kubernetes",
                    CheckCategory::ControlPlaneExistence => "Cannot find Linkerd",
                    CheckCategory::ControlPlaneApi => "Cannot connect to Linkerd",
                };
                headline.to_string()
            }),
        }
    }
}

/// Interactive reporting policy writing one line per message to `out`.
///
/// - retryable: waiting notice, keep going
/// - hard failure: `<headline>: <error>` plus the remediation line, terminate
/// - warning: `Warning: <description>: <error>`, keep going
pub struct ExitPolicy<W: Write = io::Stderr> {
    out: W,
    headlines: HeadlineTable,
    check_command: String,
}

impl ExitPolicy<io::Stderr> {
    pub fn stderr(check_command: impl Into<String>) -> Self {
        Self::new(io::stderr(), HeadlineTable::default(), check_command)
    }
}

impl<W: Write> ExitPolicy<W> {
    pub fn new(out: W, headlines: HeadlineTable, check_command: impl Into<String>) -> Self {
        Self {
            out,
            headlines,
            check_command: check_command.into(),
        }
    }

    pub fn report(&mut self, outcome: &CheckOutcome) -> bool {
        match outcome.failure_kind() {
            None => false,
            Some(FailureKind::Retryable) => {
                let _ = writeln!(self.out, "{}", WAITING_NOTICE);
                false
            }
            Some(FailureKind::Warning) => {
                let _ = writeln!(
                    self.out,
                    "Warning: {}: {}",
                    outcome.description(),
                    outcome.message()
                );
                false
            }
            Some(FailureKind::Hard) => {
                self.write_fatal(outcome.category(), &outcome.message());
                true
            }
        }
    }

    /// Emit the diagnostic for a fatal reason the observer never saw.
    pub fn report_fatal(&mut self, reason: &FatalReason) {
        self.write_fatal(reason.category(), &reason.message());
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_fatal(&mut self, category: CheckCategory, message: &str) {
        let headline = self.headlines.headline(category);
        debug_assert!(!headline.is_empty(), "no headline for category {}", category);
        let _ = writeln!(self.out, "{}: {}", headline, message);
        let _ = writeln!(self.out, "Validate the install with: {}", self.check_command);
        let _ = self.out.flush();
    }
}

impl<W: Write> OutcomeObserver for ExitPolicy<W> {
    fn observe(&mut self, outcome: &CheckOutcome) -> bool {
        self.report(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn policy() -> ExitPolicy<Vec<u8>> {
        ExitPolicy::new(Vec::new(), HeadlineTable::default(), DEFAULT_CHECK_COMMAND)
    }

    fn lines(policy: ExitPolicy<Vec<u8>>) -> Vec<String> {
        String::from_utf8(policy.into_inner())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn success_is_silent() {
        let mut p = policy();
        let ok = CheckOutcome::success(CheckCategory::KubernetesApi, "can query the cluster");
        assert!(!p.report(&ok));
        assert!(lines(p).is_empty());
    }

    #[test]
    fn retryable_prints_waiting_notice() {
        let mut p = policy();
        let outcome = CheckOutcome::retryable(
            CheckCategory::ControlPlaneExistence,
            "control plane pods are ready",
            anyhow!("pods not ready"),
        );
        assert!(!p.report(&outcome));
        assert_eq!(lines(p), vec![WAITING_NOTICE.to_string()]);
    }

    #[test]
    fn hard_failure_prints_headline_and_remediation() {
        let cases = [
            (CheckCategory::KubernetesApi, "Cannot connect to Kubernetes"),
            (CheckCategory::ControlPlaneExistence, "Cannot find Linkerd"),
            (CheckCategory::ControlPlaneApi, "Cannot connect to Linkerd"),
        ];
        for (category, headline) in cases {
            let mut p = policy();
            let outcome = CheckOutcome::hard(category, "check", anyhow!("boom"));
            assert!(p.report(&outcome));
            assert_eq!(
                lines(p),
                vec![
                    format!("{}: boom", headline),
                    "Validate the install with: linkerd check".to_string(),
                ]
            );
        }
    }

    #[test]
    fn warning_is_softened_and_not_fatal() {
        let mut p = policy();
        let outcome = CheckOutcome::warning(
            CheckCategory::ControlPlaneApi,
            "control plane is up-to-date",
            anyhow!("is running version 2.9 but the latest is 2.10"),
        );
        assert!(!p.report(&outcome));
        assert_eq!(
            lines(p),
            vec![
                "Warning: control plane is up-to-date: is running version 2.9 but the latest is 2.10"
                    .to_string()
            ]
        );
    }

    #[test]
    fn custom_check_command() {
        let mut p = ExitPolicy::new(Vec::new(), HeadlineTable::default(), "mesh doctor");
        p.report(&CheckOutcome::hard(
            CheckCategory::KubernetesApi,
            "check",
            anyhow!("x"),
        ));
        assert_eq!(lines(p)[1], "Validate the install with: mesh doctor");
    }

    #[test]
    fn headline_table_must_be_complete() {
        let err = HeadlineTable::from_entries([
            (CheckCategory::KubernetesApi, "a"),
            (CheckCategory::ControlPlaneApi, "c"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("control-plane-existence"));
    }

    #[test]
    fn headline_table_rejects_duplicates() {
        let err = HeadlineTable::from_entries([
            (CheckCategory::KubernetesApi, "a"),
            (CheckCategory::KubernetesApi, "b"),
            (CheckCategory::ControlPlaneExistence, "c"),
            (CheckCategory::ControlPlaneApi, "d"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn custom_headlines_are_used() {
        let table = HeadlineTable::from_entries([
            (CheckCategory::KubernetesApi, "No cluster"),
            (CheckCategory::ControlPlaneExistence, "No mesh"),
            (CheckCategory::ControlPlaneApi, "No mesh API"),
        ])
        .unwrap();
        assert_eq!(table.headline(CheckCategory::ControlPlaneExistence), "No mesh");
    }

    #[test]
    fn closures_are_observers() {
        let mut seen = Vec::new();
        let mut observer = |o: &CheckOutcome| {
            seen.push(o.category());
            false
        };
        observer.observe(&CheckOutcome::success(CheckCategory::ControlPlaneApi, "ok"));
        assert_eq!(seen, vec![CheckCategory::ControlPlaneApi]);
    }
}
