//! Subscription contract between a pod event source and its consumers.
//!
//! A source delivers every observed pod transition as a single tagged
//! [`PodEvent`] to a [`PodEventHandler`]. Handlers must tolerate concurrent
//! calls for different pods and repeated `Added` events for the same pod,
//! since a reconnecting source replays its full list.

use crate::k8s::types::PodInfo;
use crate::{ExporterError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodEvent {
    /// Pod observed as present, either from the initial list or a live watch.
    Added(PodInfo),
    /// Pod observed as removed.
    Deleted(PodInfo),
    /// A full (re)list finished; carries every pod name present at that point.
    Resynced(HashSet<String>),
}

#[async_trait]
pub trait PodEventHandler: Send + Sync {
    async fn handle(&self, event: PodEvent);
}

pub trait EventSource {
    /// Starts delivering events to `handler` until `cancel` fires.
    fn subscribe(
        self,
        handler: Arc<dyn PodEventHandler>,
        cancel: CancellationToken,
    ) -> Subscription;
}

/// Handle to a running subscription.
pub struct Subscription {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn new(cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { cancel, task }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Waits for the delivery task to exit.
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| ExporterError::KubernetesError(format!("Pod watch task failed: {}", e)))
    }
}
