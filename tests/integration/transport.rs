//! Direct and proxied clients against a mock control plane

use super::mock_server::MockServerFixture;
use cp_gate::{raw_client, ApiFacade, ClusterContext, Error, TransportKind};
use serde_json::json;

const PROXY_PREFIX: &str =
    "/api/v1/namespaces/linkerd/services/linkerd-controller-api:8085/proxy/api/v1";

#[tokio::test]
async fn direct_client_posts_to_explicit_address() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_json("POST", "/api/v1/Version", 200, r#"{"releaseVersion":"stable-2.14.1"}"#)
        .await;

    // A broken cluster context must not matter when an address is given.
    let client = raw_client(
        ApiFacade::Public,
        "linkerd",
        &ClusterContext::new(),
        Some(&fixture.host_port()),
    )
    .unwrap();
    assert_eq!(client.kind(), TransportKind::Direct);

    let version = client.call("Version", &json!({})).await.unwrap();
    assert_eq!(version["releaseVersion"], "stable-2.14.1");
    mock.assert_async().await;
}

#[tokio::test]
async fn proxied_client_tunnels_through_cluster_api() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_authenticated(
            "POST",
            &format!("{}/Version", PROXY_PREFIX),
            r#"{"releaseVersion":"edge-24.1.1"}"#,
        )
        .await;

    let client = raw_client(ApiFacade::Public, "linkerd", &fixture.cluster(), None).unwrap();
    assert_eq!(client.kind(), TransportKind::Proxied);

    let version = client.call("Version", &json!({})).await.unwrap();
    assert_eq!(version["releaseVersion"], "edge-24.1.1");
    mock.assert_async().await;
}

#[tokio::test]
async fn non_success_status_is_a_remote_error() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json(
            "POST",
            "/api/v1/ListPods",
            503,
            r#"{"error":"control plane unavailable"}"#,
        )
        .await;

    let client = raw_client(
        ApiFacade::Public,
        "linkerd",
        &ClusterContext::new(),
        Some(&fixture.host_port()),
    )
    .unwrap();

    let err = client.call("ListPods", &json!({})).await.unwrap_err();
    match err {
        Error::Remote { status, message } => {
            assert_eq!(status, 503);
            assert!(message.contains("control plane unavailable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn empty_body_is_null() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_status("POST", "/api/v1/SelfCheck", 200).await;

    let client = raw_client(
        ApiFacade::Viz,
        "linkerd-viz",
        &ClusterContext::new(),
        Some(&fixture.host_port()),
    )
    .unwrap();

    let value = client.call("SelfCheck", &json!({})).await.unwrap();
    assert!(value.is_null());
    client.close();
}
