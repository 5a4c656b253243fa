//! HTTP probe provider classification and its use behind the gate

use super::mock_server::{MockServerFixture, TOKEN};
use cp_gate::check::probe::{HttpProbe, HttpProbeProvider};
use cp_gate::report::DEFAULT_CHECK_COMMAND;
use cp_gate::{
    CheckCategory, CheckProvider, ExitPolicy, FailureKind, HeadlineTable, ReadinessGateBuilder,
    TransportKind,
};
use std::sync::Arc;
use std::time::Duration;

fn provider() -> HttpProbeProvider {
    HttpProbeProvider::new().unwrap()
}

#[tokio::test]
async fn success_and_hard_failure() {
    let fixture = MockServerFixture::new().await;
    let _ok = fixture.mock_status("GET", "/version", 200).await;
    let _missing = fixture
        .mock_status("GET", "/api/v1/namespaces/linkerd", 404)
        .await;

    let provider = provider()
        .probe(
            CheckCategory::KubernetesApi,
            HttpProbe::new("can query the Kubernetes API", fixture.url("/version")),
        )
        .probe(
            CheckCategory::ControlPlaneExistence,
            HttpProbe::new(
                "control plane namespace exists",
                fixture.url("/api/v1/namespaces/linkerd"),
            )
            .retry_when_unavailable(),
        );

    let k8s = provider.run_category(CheckCategory::KubernetesApi, 0).await;
    assert_eq!(k8s.len(), 1);
    assert!(k8s[0].is_success());

    let existence = provider
        .run_category(CheckCategory::ControlPlaneExistence, 0)
        .await;
    assert_eq!(existence[0].failure_kind(), Some(FailureKind::Hard));
    assert!(existence[0].message().contains("HTTP 404"));
}

#[tokio::test]
async fn unavailable_is_retryable_only_when_allowed() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_status("GET", "/healthz", 503).await;

    let lenient = provider().probe(
        CheckCategory::ControlPlaneExistence,
        HttpProbe::new("pods are ready", fixture.url("/healthz")).retry_when_unavailable(),
    );
    let strict = provider().probe(
        CheckCategory::ControlPlaneExistence,
        HttpProbe::new("pods are ready", fixture.url("/healthz")),
    );

    let retry = lenient
        .run_category(CheckCategory::ControlPlaneExistence, 0)
        .await;
    assert_eq!(retry[0].failure_kind(), Some(FailureKind::Retryable));

    let hard = strict
        .run_category(CheckCategory::ControlPlaneExistence, 0)
        .await;
    assert_eq!(hard[0].failure_kind(), Some(FailureKind::Hard));
}

#[tokio::test]
async fn warning_only_probe_never_blocks() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_status("GET", "/latest", 500).await;
    let _ok = fixture.mock_status("GET", "/version", 200).await;

    let provider = provider()
        .probe(
            CheckCategory::KubernetesApi,
            HttpProbe::new("is up to date", fixture.url("/latest")).warning_only(),
        )
        .probe(
            CheckCategory::KubernetesApi,
            HttpProbe::new("can query the Kubernetes API", fixture.url("/version")),
        );

    let outcomes = provider.run_category(CheckCategory::KubernetesApi, 0).await;
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_warning());
    assert!(outcomes[1].is_success());
}

#[tokio::test]
async fn first_blocking_failure_stops_the_category() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_status("GET", "/forbidden", 403).await;
    let never = fixture.mock_status("GET", "/version", 200).await;

    let provider = provider()
        .probe(
            CheckCategory::KubernetesApi,
            HttpProbe::new("has permissions", fixture.url("/forbidden")),
        )
        .probe(
            CheckCategory::KubernetesApi,
            HttpProbe::new("can query the Kubernetes API", fixture.url("/version")),
        );

    let outcomes = provider.run_category(CheckCategory::KubernetesApi, 0).await;
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_hard_failure());
    assert!(!never.matched_async().await);
}

#[tokio::test]
async fn connection_refused_is_unavailable() {
    // Nothing listens on port 9 (discard) on loopback in test environments.
    let provider = provider().probe(
        CheckCategory::KubernetesApi,
        HttpProbe::new(
            "can reach the cluster",
            "http://127.0.0.1:9/version".parse().unwrap(),
        )
        .retry_when_unavailable(),
    );

    let outcomes = provider.run_category(CheckCategory::KubernetesApi, 0).await;
    assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::Retryable));
}

#[tokio::test]
async fn gate_with_probes_yields_proxied_client() {
    let fixture = MockServerFixture::new().await;
    let version = fixture.mock_authenticated("GET", "/version", "{}").await;
    let namespace = fixture
        .mock_authenticated("GET", "/api/v1/namespaces/linkerd", "{}")
        .await;

    let provider = provider()
        .probe(
            CheckCategory::KubernetesApi,
            HttpProbe::new("can query the Kubernetes API", fixture.url("/version"))
                .with_bearer(TOKEN),
        )
        .probe(
            CheckCategory::ControlPlaneExistence,
            HttpProbe::new(
                "control plane namespace exists",
                fixture.url("/api/v1/namespaces/linkerd"),
            )
            .with_bearer(TOKEN),
        );

    let gate = ReadinessGateBuilder::new()
        .provider(Arc::new(provider))
        .cluster(fixture.cluster())
        .wait(Duration::from_secs(2))
        .retry_interval(Duration::from_millis(10))
        .without_env()
        .build()
        .unwrap();
    let mut policy = ExitPolicy::new(Vec::new(), HeadlineTable::default(), DEFAULT_CHECK_COMMAND);

    let client = gate.acquire_reported(&mut policy).await.unwrap();

    assert_eq!(client.kind(), TransportKind::Proxied);
    assert!(client.endpoint().as_str().starts_with(&fixture.base_url));
    assert!(policy.into_inner().is_empty());
    version.assert_async().await;
    namespace.assert_async().await;
}

#[tokio::test]
async fn unreachable_category_fails_without_probing() {
    let fixture = MockServerFixture::new().await;
    let never = fixture.mock_status("GET", "/version", 200).await;

    let provider = provider()
        .probe(
            CheckCategory::KubernetesApi,
            HttpProbe::new("can query the Kubernetes API", fixture.url("/version")),
        )
        .unreachable(
            CheckCategory::KubernetesApi,
            "can query the Kubernetes API",
            "cluster API server is not configured",
        );

    let outcomes = provider.run_category(CheckCategory::KubernetesApi, 0).await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::Hard));
    assert_eq!(outcomes[0].message(), "cluster API server is not configured");
    assert!(!never.matched_async().await);

    let other = provider
        .run_category(CheckCategory::ControlPlaneExistence, 0)
        .await;
    assert!(other.is_empty());
}
