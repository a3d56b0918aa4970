pub mod commands;

use crate::k8s::client::{read_namespace, SERVICE_ACCOUNT_NAMESPACE_PATH};
use crate::k8s::filter::{
    LabelFilter, DEFAULT_CLASS_LABEL, DEFAULT_CLASS_VALUE, DEFAULT_OWNER_LABEL,
};
use crate::{ExporterError, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "helx-app-exporter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Exports a gauge for every HeLx application pod in the current namespace", long_about = None)]
pub struct Cli {
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(
        long,
        env = "HELX_LISTEN_ADDRESS",
        default_value = "0.0.0.0:9110",
        help = "Address serving /metrics, /readyz and /healthz"
    )]
    pub listen_address: SocketAddr,

    #[arg(
        short,
        long,
        env = "HELX_NAMESPACE",
        help = "Namespace to watch (defaults to the service account namespace)"
    )]
    pub namespace: Option<String>,

    #[arg(
        long,
        env = "HELX_NAMESPACE_FILE",
        default_value = SERVICE_ACCOUNT_NAMESPACE_PATH,
        help = "File holding the namespace to watch"
    )]
    pub namespace_file: PathBuf,

    #[arg(
        long,
        env = "HELX_CLASS_LABEL",
        default_value = DEFAULT_CLASS_LABEL,
        help = "Label marking HeLx application pods"
    )]
    pub class_label: String,

    #[arg(
        long,
        env = "HELX_CLASS_VALUE",
        default_value = DEFAULT_CLASS_VALUE,
        help = "Required value of the class label"
    )]
    pub class_value: String,

    #[arg(
        long,
        env = "HELX_OWNER_LABEL",
        default_value = DEFAULT_OWNER_LABEL,
        help = "Label holding the owning user"
    )]
    pub owner_label: String,
}

impl Cli {
    pub fn label_filter(&self) -> LabelFilter {
        LabelFilter::new(
            self.class_label.clone(),
            self.class_value.clone(),
            self.owner_label.clone(),
        )
    }

    /// The explicit `--namespace` wins over the namespace file.
    pub fn resolve_namespace(&self) -> Result<String> {
        match self.namespace.as_deref().map(str::trim) {
            Some("") => Err(ExporterError::ConfigError(
                "namespace must not be empty".to_string(),
            )),
            Some(namespace) => Ok(namespace.to_string()),
            None => read_namespace(&self.namespace_file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["helx-app-exporter"]).unwrap();
        assert!(!cli.verbose);
        assert_eq!(cli.listen_address, "0.0.0.0:9110".parse().unwrap());
        assert_eq!(
            cli.namespace_file,
            PathBuf::from(SERVICE_ACCOUNT_NAMESPACE_PATH)
        );
        assert_eq!(cli.label_filter(), LabelFilter::default());
    }

    #[test]
    fn test_namespace_override() {
        let cli =
            Cli::try_parse_from(["helx-app-exporter", "--namespace", " helx-dev "]).unwrap();
        assert_eq!(cli.resolve_namespace().unwrap(), "helx-dev");

        let cli = Cli::try_parse_from(["helx-app-exporter", "--namespace", ""]).unwrap();
        assert!(matches!(
            cli.resolve_namespace(),
            Err(ExporterError::ConfigError(_))
        ));
    }

    #[test]
    fn test_namespace_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("namespace");
        std::fs::write(&path, "helx-prod").unwrap();

        let cli = Cli::try_parse_from([
            "helx-app-exporter",
            "--namespace-file",
            path.to_str().unwrap(),
        ])
        .unwrap();
        assert_eq!(cli.resolve_namespace().unwrap(), "helx-prod");
    }

    #[test]
    fn test_custom_labels() {
        let cli = Cli::try_parse_from([
            "helx-app-exporter",
            "--class-label",
            "app",
            "--class-value",
            "jupyter",
            "--owner-label",
            "owner",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.label_filter(), LabelFilter::new("app", "jupyter", "owner"));
    }
}
