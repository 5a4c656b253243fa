//! cp-gate — wait for the control plane and report how it is reached
//!
//! Usage:
//!   cp-gate [OPTIONS]
//!
//! Exits 1 after printing a diagnostic when the control plane is not usable.

use cp_gate::check::probe::{HttpProbe, HttpProbeProvider};
use cp_gate::report::DEFAULT_CHECK_COMMAND;
use cp_gate::{
    raw_client, ApiFacade, CheckCategory, ClusterContext, ExitPolicy, FatalReason,
    ReadinessGateBuilder, TransportKind, EXIT_FAILURE,
};
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;

struct Args {
    api_addr: Option<String>,
    namespace: Option<String>,
    wait: Option<Duration>,
    api_checks: bool,
    facade: ApiFacade,
    check_command: Option<String>,
    insecure: bool,
}

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();

    let args = match parse_args(std::env::args().skip(1).collect()) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("Error: {msg}");
            eprintln!();
            print_usage();
            std::process::exit(EXIT_FAILURE);
        }
    };

    let cluster = ClusterContext::from_env().accept_invalid_certs(args.insecure);
    let namespace = args
        .namespace
        .clone()
        .or_else(|| std::env::var("CP_GATE_NAMESPACE").ok())
        .unwrap_or_else(|| cp_gate::gate::DEFAULT_NAMESPACE.to_string());

    let provider = match HttpProbeProvider::for_cluster(&cluster) {
        Ok(provider) => register_probes(provider, &args, &cluster, &namespace),
        Err(err) => {
            let check_command = args
                .check_command
                .clone()
                .or_else(|| std::env::var("CP_GATE_CHECK_COMMAND").ok())
                .unwrap_or_else(|| DEFAULT_CHECK_COMMAND.to_string());
            ExitPolicy::stderr(check_command).report_fatal(&FatalReason::Transport(err));
            std::process::exit(EXIT_FAILURE);
        }
    };

    let mut builder = ReadinessGateBuilder::new()
        .provider(Arc::new(provider))
        .cluster(cluster)
        .facade(args.facade)
        .namespace(namespace);
    if let Some(addr) = &args.api_addr {
        builder = builder.api_addr(addr.clone());
    }
    if let Some(command) = &args.check_command {
        builder = builder.check_command(command.clone());
    }

    let client = match args.wait {
        Some(window) => {
            cp_gate::check_client_or_retry_or_exit(builder.wait(window), args.api_checks).await
        }
        None if args.api_checks => {
            cp_gate::check_client_or_retry_or_exit(builder.no_retry(), true).await
        }
        None => cp_gate::check_client_or_exit(builder).await,
    };

    let how = match client.kind() {
        TransportKind::Direct => "directly",
        TransportKind::Proxied => "through the cluster API proxy",
    };
    println!("Control plane is ready, reached {how} at {}", client.endpoint());
}

fn print_usage() {
    println!(
        r#"cp-gate — control plane readiness gate

USAGE:
    cp-gate [OPTIONS]

OPTIONS:
    --api-addr <host:port>      Talk to the control plane API directly
    -n, --namespace <ns>        Control plane namespace (default: linkerd)
    --wait <secs>               Wait up to <secs> for the control plane to become ready
    --api-checks                Also require the control plane API to answer
    --viz                       Target the metrics (viz) API instead of the public API
    --check-command <cmd>       Command suggested when validation fails
    --insecure                  Skip TLS verification of the cluster API
    -h, --help                  Show this help message

ENVIRONMENT:
    CP_GATE_KUBE_SERVER         Cluster API server URL
    CP_GATE_KUBE_TOKEN          Cluster API bearer token
    CP_GATE_*                   See the library documentation"#
    );
}

fn parse_args(raw: Vec<String>) -> Result<Args, String> {
    let mut args = Args {
        api_addr: None,
        namespace: None,
        wait: None,
        api_checks: false,
        facade: ApiFacade::Public,
        check_command: None,
        insecure: false,
    };

    let mut iter = raw.into_iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--api-addr" => args.api_addr = Some(value("--api-addr")?),
            "-n" | "--namespace" => args.namespace = Some(value("--namespace")?),
            "--wait" => {
                let raw = value("--wait")?;
                let secs = raw
                    .parse::<u64>()
                    .map_err(|_| format!("invalid --wait value: {raw}"))?;
                args.wait = Some(Duration::from_secs(secs));
            }
            "--api-checks" => args.api_checks = true,
            "--viz" => args.facade = ApiFacade::Viz,
            "--check-command" => args.check_command = Some(value("--check-command")?),
            "--insecure" => args.insecure = true,
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown option: {other}")),
        }
    }
    Ok(args)
}

const K8S_CHECK: &str = "can query the Kubernetes API";
const API_CHECK: &str = "can query the control plane API";

/// Wire the HTTP checks for each category. Endpoints that cannot be resolved
/// become failures of the category that needs them, so they are reported
/// through the gate like any other failed check.
fn register_probes(
    mut provider: HttpProbeProvider,
    args: &Args,
    cluster: &ClusterContext,
    namespace: &str,
) -> HttpProbeProvider {
    let with_token = |probe: HttpProbe| match cluster.token() {
        Some(token) => probe.with_bearer(token),
        None => probe,
    };

    match cluster.server_base() {
        Ok(base) => {
            provider = match base.join("version") {
                Ok(url) => provider.probe(
                    CheckCategory::KubernetesApi,
                    with_token(HttpProbe::new(K8S_CHECK, url)),
                ),
                Err(e) => provider.unreachable(CheckCategory::KubernetesApi, K8S_CHECK, e),
            };
            let existence = "control plane namespace exists";
            provider = match base.join(&format!("api/v1/namespaces/{namespace}")) {
                Ok(url) => provider.probe(
                    CheckCategory::ControlPlaneExistence,
                    with_token(HttpProbe::new(existence, url).retry_when_unavailable()),
                ),
                Err(e) => provider.unreachable(CheckCategory::ControlPlaneExistence, existence, e),
            };
        }
        Err(err) => {
            provider = provider.unreachable(CheckCategory::KubernetesApi, K8S_CHECK, err);
        }
    }

    if args.api_checks {
        // Probe the same endpoint the gate will hand out.
        let endpoint = raw_client(args.facade, namespace, cluster, args.api_addr.as_deref())
            .and_then(|client| {
                let url = client.endpoint().join("Version").map_err(|e| {
                    cp_gate::Error::Transport(cp_gate::transport::TransportError::InvalidUrl(e))
                });
                let kind = client.kind();
                client.close();
                Ok((url?, kind))
            });
        provider = match endpoint {
            Ok((url, kind)) => {
                let probe = HttpProbe::new(API_CHECK, url)
                    .with_method(Method::POST)
                    .retry_when_unavailable();
                let probe = match kind {
                    TransportKind::Proxied => with_token(probe),
                    TransportKind::Direct => probe,
                };
                provider.probe(CheckCategory::ControlPlaneApi, probe)
            }
            Err(err) => provider.unreachable(CheckCategory::ControlPlaneApi, API_CHECK, err),
        };
    }

    provider
}
