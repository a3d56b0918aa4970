//! Tracked HeLx application pods and their `helx_app_info` series
//!
//! The pod table and the gauge are one unit: every mutation updates both
//! while holding the write lock, and exposition encodes the registry while
//! holding the read lock. A scrape therefore never sees a series without its
//! pod entry or the other way round.

use crate::k8s::events::{PodEvent, PodEventHandler};
use crate::k8s::filter::LabelFilter;
use crate::k8s::types::PodInfo;
use crate::metrics::exporter;
use crate::Result;
use async_trait::async_trait;
use prometheus::{IntGaugeVec, Opts, Registry};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const METRIC_NAME: &str = "helx_app_info";
pub const METRIC_HELP: &str = "Information about Helx pods";
pub const POD_LABEL: &str = "podname";
pub const OWNER_LABEL: &str = "username";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPod {
    pub pod_name: String,
    pub username: String,
}

/// Result of feeding an added pod through the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The pod is not a HeLx application.
    Ignored,
    /// First time this pod is tracked.
    Tracked,
    /// Already tracked with the same owner.
    Unchanged,
    /// Already tracked under a different owner; that series was replaced.
    Relabeled { previous: String },
}

/// Point-in-time view of the tracker.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Tracked pods, sorted by pod name.
    pub pods: Vec<TrackedPod>,
    /// Text exposition of the registry at the same instant.
    pub exposition: String,
}

#[derive(Clone)]
pub struct AppTracker {
    pods: Arc<RwLock<HashMap<String, TrackedPod>>>,
    gauge: IntGaugeVec,
    registry: Registry,
    filter: LabelFilter,
}

impl AppTracker {
    pub fn new(filter: LabelFilter) -> Result<Self> {
        let registry = Registry::new();
        let gauge = IntGaugeVec::new(
            Opts::new(METRIC_NAME, METRIC_HELP),
            &[POD_LABEL, OWNER_LABEL],
        )?;
        registry.register(Box::new(gauge.clone()))?;

        Ok(Self {
            pods: Arc::new(RwLock::new(HashMap::new())),
            gauge,
            registry,
            filter,
        })
    }

    pub async fn on_add(&self, pod: &PodInfo) -> AddOutcome {
        debug!("Pod add event: {}", pod.name);

        let Some(username) = self.filter.classify(pod) else {
            return AddOutcome::Ignored;
        };

        let outcome = {
            let mut pods = self.pods.write().await;
            let previous = pods.insert(
                pod.name.clone(),
                TrackedPod {
                    pod_name: pod.name.clone(),
                    username: username.clone(),
                },
            );

            let outcome = match previous {
                Some(prev) if prev.username != username => {
                    self.remove_series(&prev);
                    AddOutcome::Relabeled {
                        previous: prev.username,
                    }
                }
                Some(_) => AddOutcome::Unchanged,
                None => AddOutcome::Tracked,
            };

            self.gauge
                .with_label_values(&[pod.name.as_str(), username.as_str()])
                .set(1);
            outcome
        };

        match &outcome {
            AddOutcome::Tracked => {
                info!("Added Helx app: {} with username: {}", pod.name, username)
            }
            AddOutcome::Relabeled { previous } => info!(
                "Helx app {} changed username from {} to {}",
                pod.name, previous, username
            ),
            AddOutcome::Unchanged | AddOutcome::Ignored => {}
        }

        outcome
    }

    /// Forgets a pod, using the stored owner to locate its series.
    pub async fn on_delete(&self, pod: &PodInfo) -> Option<TrackedPod> {
        debug!("Pod delete event: {}", pod.name);

        let removed = {
            let mut pods = self.pods.write().await;
            let removed = pods.remove(&pod.name);
            if let Some(tracked) = &removed {
                self.remove_series(tracked);
            }
            removed
        };

        match &removed {
            Some(tracked) => info!(
                "Removed Helx app: {} with username: {}",
                tracked.pod_name, tracked.username
            ),
            None => debug!("Pod {} was not tracked", pod.name),
        }

        removed
    }

    /// Drops every tracked pod whose name is absent from `present`.
    pub async fn on_resync(&self, present: &HashSet<String>) -> Vec<TrackedPod> {
        let stale = {
            let mut pods = self.pods.write().await;
            let stale_names: Vec<String> = pods
                .keys()
                .filter(|name| !present.contains(*name))
                .cloned()
                .collect();

            let mut stale = Vec::with_capacity(stale_names.len());
            for name in stale_names {
                if let Some(tracked) = pods.remove(&name) {
                    self.remove_series(&tracked);
                    stale.push(tracked);
                }
            }
            stale
        };

        for tracked in &stale {
            info!(
                "Removed vanished Helx app: {} with username: {}",
                tracked.pod_name, tracked.username
            );
        }

        stale
    }

    pub async fn tracked(&self) -> Vec<TrackedPod> {
        let pods = self.pods.read().await;
        sorted(&pods)
    }

    pub async fn len(&self) -> usize {
        self.pods.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pods.read().await.is_empty()
    }

    /// Encodes the registry in the Prometheus text format.
    pub async fn render(&self) -> Result<String> {
        let _pods = self.pods.read().await;
        exporter::encode(&self.registry)
    }

    pub async fn snapshot(&self) -> Result<MetricsSnapshot> {
        let pods = self.pods.read().await;

        Ok(MetricsSnapshot {
            pods: sorted(&pods),
            exposition: exporter::encode(&self.registry)?,
        })
    }

    // Caller holds the write lock.
    fn remove_series(&self, tracked: &TrackedPod) {
        if let Err(e) = self
            .gauge
            .remove_label_values(&[tracked.pod_name.as_str(), tracked.username.as_str()])
        {
            warn!(
                "No {} series for {}/{}: {}",
                METRIC_NAME, tracked.pod_name, tracked.username, e
            );
        }
    }
}

#[async_trait]
impl PodEventHandler for AppTracker {
    async fn handle(&self, event: PodEvent) {
        match event {
            PodEvent::Added(pod) => {
                self.on_add(&pod).await;
            }
            PodEvent::Deleted(pod) => {
                self.on_delete(&pod).await;
            }
            PodEvent::Resynced(present) => {
                self.on_resync(&present).await;
            }
        }
    }
}

fn sorted(pods: &HashMap<String, TrackedPod>) -> Vec<TrackedPod> {
    let mut tracked: Vec<TrackedPod> = pods.values().cloned().collect();
    tracked.sort_by(|a, b| a.pod_name.cmp(&b.pod_name));
    tracked
}
