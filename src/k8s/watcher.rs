//! Kubernetes pod watcher for a single namespace
//!
//! Wraps the kube-runtime watcher in a reconnect loop and translates its
//! events into [`PodEvent`]s for a subscribed handler.

use crate::k8s::client::K8sClient;
use crate::k8s::events::{EventSource, PodEvent, PodEventHandler, Subscription};
use crate::k8s::types::PodInfo;
use crate::{ExporterError, Result};
use futures::{StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::api::ListParams;
use kube::runtime::watcher::{self, Event};
use kube::Api;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

pub struct PodWatcher {
    api: Api<Pod>,
    namespace: String,
}

impl PodWatcher {
    pub fn new(api: Api<Pod>, namespace: impl Into<String>) -> Self {
        Self {
            api,
            namespace: namespace.into(),
        }
    }

    /// Verifies the namespace's pods can be listed before any watch is started.
    /// Errors here are terminal and never retried.
    pub async fn establish(client: &K8sClient, namespace: &str) -> Result<Self> {
        let api = client.pods(namespace);

        api.list(&ListParams::default().limit(1))
            .await
            .map_err(|e| ExporterError::WatchFailed {
                namespace: namespace.to_string(),
                reason: e.to_string(),
            })?;

        info!("Pod watch access confirmed for namespace {}", namespace);

        Ok(Self::new(api, namespace))
    }

    /// Runs until cancelled, reconnecting with exponential backoff.
    async fn run(self, handler: Arc<dyn PodEventHandler>, cancel: CancellationToken) {
        info!("Starting pod watcher in namespace {}", self.namespace);

        let mut backoff = INITIAL_BACKOFF;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.watch_pods(handler.as_ref()) => result,
            };

            let delay = match result {
                Ok(()) => {
                    warn!("Pod watch stream ended, reconnecting...");
                    backoff = INITIAL_BACKOFF;
                    backoff
                }
                Err(e) => {
                    error!("Pod watch failed: {}, reconnecting in {:?}", e, backoff);
                    let delay = backoff;
                    backoff = next_backoff(backoff);
                    delay
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Pod watcher in namespace {} stopped", self.namespace);
    }

    async fn watch_pods(&self, handler: &dyn PodEventHandler) -> Result<()> {
        let config = watcher::Config::default();
        let mut stream = watcher::watcher(self.api.clone(), config).boxed();
        let mut listed = HashSet::new();

        while let Some(event) = stream
            .try_next()
            .await
            .map_err(|e| ExporterError::KubernetesError(format!("Watch stream error: {}", e)))?
        {
            if let Some(pod_event) = translate(event, &mut listed) {
                if let PodEvent::Resynced(names) = &pod_event {
                    info!(
                        "Pod watcher initial sync complete. {} pods in namespace {}",
                        names.len(),
                        self.namespace
                    );
                }
                handler.handle(pod_event).await;
            }
        }

        Ok(())
    }
}

impl EventSource for PodWatcher {
    fn subscribe(
        self,
        handler: Arc<dyn PodEventHandler>,
        cancel: CancellationToken,
    ) -> Subscription {
        let token = cancel.clone();
        let task = tokio::spawn(self.run(handler, token));
        Subscription::new(cancel, task)
    }
}

/// Maps a raw watcher event onto a [`PodEvent`].
///
/// `listed` accumulates names between `Init` and `InitDone` so the completed
/// list can be reported as a single resync. Modifications arrive as `Added`,
/// which consumers treat idempotently.
fn translate(event: Event<Pod>, listed: &mut HashSet<String>) -> Option<PodEvent> {
    match event {
        Event::Init => {
            debug!("Pod watcher (re)listing");
            listed.clear();
            None
        }
        Event::InitApply(pod) => {
            let info = PodInfo::from_k8s_pod(&pod);
            listed.insert(info.name.clone());
            Some(PodEvent::Added(info))
        }
        Event::InitDone => Some(PodEvent::Resynced(std::mem::take(listed))),
        Event::Apply(pod) => Some(PodEvent::Added(PodInfo::from_k8s_pod(&pod))),
        Event::Delete(pod) => Some(PodEvent::Deleted(PodInfo::from_k8s_pod(&pod))),
    }
}

fn next_backoff(current: Duration) -> Duration {
    std::cmp::min(current * 2, MAX_BACKOFF)
}
