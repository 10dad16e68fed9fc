//! Cluster gateway: the single seam between the sweep loop and the
//! Kubernetes API.
//!
//! The [`ClusterGateway`] trait is what the scanner, remediation executor
//! and recovery verifier depend on; [`KubeGateway`] implements it over a
//! `kube::Client`. Tests mock the trait instead of standing up a cluster.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::api::{Api, DeleteParams, ListParams};
use kube::Client;
use thiserror::Error;
use tracing::debug;

use crate::health::{self, PodObservation};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Kubernetes API call failed: {0}")]
    Kube(#[from] kube::Error),
}

/// Operations the sweep loop needs from the cluster.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterGateway: Send + Sync {
    /// List the names of all namespaces in the cluster.
    async fn list_namespaces(&self) -> Result<Vec<String>, GatewayError>;

    /// List every pod in a namespace as a classification snapshot.
    ///
    /// Pagination is drained fully before returning; callers never see a
    /// partial page.
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodObservation>, GatewayError>;

    /// Delete a pod with the given grace period (0 = immediate).
    async fn delete_pod(
        &self,
        namespace: &str,
        name: &str,
        grace_seconds: u32,
    ) -> Result<(), GatewayError>;
}

/// `ClusterGateway` backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    page_size: u32,
}

impl KubeGateway {
    /// Create a gateway from an existing client.
    #[must_use]
    pub const fn new(client: Client, page_size: u32) -> Self {
        Self { client, page_size }
    }

    /// Connect using in-cluster service account credentials, falling back
    /// to the local kubeconfig for out-of-cluster debugging.
    pub async fn connect(page_size: u32) -> Result<Self, GatewayError> {
        let client = Client::try_default().await?;
        Ok(Self::new(client, page_size))
    }
}

#[async_trait]
impl ClusterGateway for KubeGateway {
    async fn list_namespaces(&self) -> Result<Vec<String>, GatewayError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces.list(&ListParams::default()).await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodObservation>, GatewayError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);

        let mut observations = Vec::new();
        let mut continue_token: Option<String> = None;

        loop {
            let mut lp = ListParams::default().limit(self.page_size);
            if let Some(token) = &continue_token {
                lp = lp.continue_token(token);
            }

            let page = pods.list(&lp).await?;
            observations.extend(page.items.iter().filter_map(health::observe));

            continue_token = page.metadata.continue_.filter(|t| !t.is_empty());
            if continue_token.is_none() {
                break;
            }
            debug!(namespace = %namespace, "Fetching next pod page");
        }

        Ok(observations)
    }

    async fn delete_pod(
        &self,
        namespace: &str,
        name: &str,
        grace_seconds: u32,
    ) -> Result<(), GatewayError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);

        let dp = DeleteParams {
            grace_period_seconds: Some(grace_seconds),
            ..Default::default()
        };

        pods.delete(name, &dp).await?;
        Ok(())
    }
}
