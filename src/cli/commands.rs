use crate::cli::Cli;
use crate::http;
use crate::k8s::{EventSource, K8sClient, PodWatcher};
use crate::metrics::AppTracker;
use crate::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Starts the pod watch and serves HTTP until `cancel` fires or serving fails.
///
/// Every step before the listener is bound is fatal on error.
pub async fn run(cli: Cli, cancel: CancellationToken) -> Result<()> {
    let namespace = cli.resolve_namespace()?;
    info!("Watching pods in namespace {}", namespace);

    let tracker = AppTracker::new(cli.label_filter())?;

    let client = K8sClient::try_default().await?;
    let watcher = PodWatcher::establish(&client, &namespace).await?;
    let subscription = watcher.subscribe(Arc::new(tracker.clone()), cancel.child_token());

    let state = Arc::new(http::State::new(tracker));
    let served = http::serve(cli.listen_address, state, cancel.clone()).await;

    subscription.cancel();
    if let Err(e) = subscription.join().await {
        warn!("{}", e);
    }

    served
}
