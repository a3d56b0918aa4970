use crate::{ExporterError, Result};
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};
use std::path::Path;
use tracing::{debug, info};

/// Namespace file mounted into every pod with a service account.
pub const SERVICE_ACCOUNT_NAMESPACE_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

pub struct K8sClient {
    client: Client,
}

impl K8sClient {
    pub async fn try_default() -> Result<Self> {
        debug!("Initializing Kubernetes client");

        let client = Client::try_default().await.map_err(|e| {
            ExporterError::KubernetesError(format!("Failed to create K8s client: {}", e))
        })?;

        info!("Successfully connected to Kubernetes cluster");

        Ok(Self::new(client))
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Reads the namespace this process runs in from a service-account style file.
pub fn read_namespace(path: &Path) -> Result<String> {
    let contents =
        std::fs::read_to_string(path).map_err(|source| ExporterError::NamespaceUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

    let namespace = contents.trim();
    if namespace.is_empty() {
        return Err(ExporterError::NamespaceEmpty {
            path: path.to_path_buf(),
        });
    }

    Ok(namespace.to_string())
}
