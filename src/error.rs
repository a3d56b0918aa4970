use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Kubernetes error: {0}")]
    KubernetesError(String),

    #[error("Failed to read namespace from {path}: {source}")]
    NamespaceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Namespace file {path} is empty")]
    NamespaceEmpty { path: PathBuf },

    #[error("Pod watch could not be established in namespace {namespace}: {reason}")]
    WatchFailed { namespace: String, reason: String },

    #[error("Metrics error: {0}")]
    MetricsError(#[from] prometheus::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP server error: {0}")]
    ServerError(String),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
