pub mod cli;
pub mod error;
pub mod http;
pub mod k8s;
pub mod metrics;

pub use error::{ExporterError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
