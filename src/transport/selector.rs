//! Transport selection.

use super::{ApiFacade, ClientHandle, ClusterContext, DirectClient, ProxiedClient};
use crate::Result;
use tracing::info;

/// Picks the client variant for an acquisition.
///
/// A non-empty address always yields a [`DirectClient`] and the cluster is
/// never consulted. Otherwise a [`ProxiedClient`] is built from the cluster
/// context. Construction errors are returned as-is; there is no fallback from
/// one variant to the other and no retry.
#[derive(Debug, Clone)]
pub struct TransportSelector {
    facade: ApiFacade,
    namespace: String,
}

impl TransportSelector {
    pub fn new(facade: ApiFacade, namespace: impl Into<String>) -> Self {
        Self {
            facade,
            namespace: namespace.into(),
        }
    }

    pub fn facade(&self) -> ApiFacade {
        self.facade
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn select(&self, api_addr: Option<&str>, cluster: &ClusterContext) -> Result<ClientHandle> {
        match api_addr.map(str::trim).filter(|addr| !addr.is_empty()) {
            Some(addr) => {
                let client = DirectClient::new(self.facade, addr)?;
                info!(address = addr, "using direct control plane transport");
                Ok(ClientHandle::new(client))
            }
            None => {
                let client = ProxiedClient::new(self.facade, &self.namespace, cluster)?;
                info!(namespace = %self.namespace, "using proxied control plane transport");
                Ok(ClientHandle::new(client))
            }
        }
    }
}

/// Build a client without running any readiness checks.
pub fn raw_client(
    facade: ApiFacade,
    namespace: &str,
    cluster: &ClusterContext,
    api_addr: Option<&str>,
) -> Result<ClientHandle> {
    TransportSelector::new(facade, namespace).select(api_addr, cluster)
}
