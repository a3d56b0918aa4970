//! Workload-class membership for pods.

use crate::k8s::types::PodInfo;

pub const DEFAULT_CLASS_LABEL: &str = "executor";
pub const DEFAULT_CLASS_VALUE: &str = "tycho";
pub const DEFAULT_OWNER_LABEL: &str = "username";

/// Decides which pods are HeLx applications and who owns them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFilter {
    class_label: String,
    class_value: String,
    owner_label: String,
}

impl LabelFilter {
    pub fn new(
        class_label: impl Into<String>,
        class_value: impl Into<String>,
        owner_label: impl Into<String>,
    ) -> Self {
        Self {
            class_label: class_label.into(),
            class_value: class_value.into(),
            owner_label: owner_label.into(),
        }
    }

    /// Returns the owner identity when the pod carries the class marker with
    /// the expected value and a non-empty owner label.
    pub fn classify(&self, pod: &PodInfo) -> Option<String> {
        if pod.label(&self.class_label) != Some(self.class_value.as_str()) {
            return None;
        }

        pod.label(&self.owner_label)
            .filter(|owner| !owner.is_empty())
            .map(str::to_string)
    }
}

impl Default for LabelFilter {
    fn default() -> Self {
        Self::new(DEFAULT_CLASS_LABEL, DEFAULT_CLASS_VALUE, DEFAULT_OWNER_LABEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn pod(labels: &[(&str, &str)]) -> PodInfo {
        PodInfo {
            name: "worker-1".to_string(),
            namespace: "helx".to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_classify_matching_pod() {
        let filter = LabelFilter::default();
        let owner = filter.classify(&pod(&[("executor", "tycho"), ("username", "alice")]));
        assert_eq!(owner.as_deref(), Some("alice"));
    }

    #[test]
    fn test_classify_rejects_other_executor() {
        let filter = LabelFilter::default();
        assert!(filter
            .classify(&pod(&[("executor", "other"), ("username", "bob")]))
            .is_none());
    }

    #[test]
    fn test_classify_rejects_missing_labels() {
        let filter = LabelFilter::default();
        assert!(filter.classify(&pod(&[])).is_none());
        assert!(filter.classify(&pod(&[("username", "alice")])).is_none());
        assert!(filter.classify(&pod(&[("executor", "tycho")])).is_none());
    }

    #[test]
    fn test_classify_rejects_empty_owner() {
        let filter = LabelFilter::default();
        assert!(filter
            .classify(&pod(&[("executor", "tycho"), ("username", "")]))
            .is_none());
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        let filter = LabelFilter::default();
        assert!(filter
            .classify(&pod(&[("executor", "Tycho"), ("username", "alice")]))
            .is_none());
    }

    #[test]
    fn test_classify_custom_labels() {
        let filter = LabelFilter::new("app.kubernetes.io/managed-by", "helx", "owner");
        let owner = filter.classify(&pod(&[
            ("app.kubernetes.io/managed-by", "helx"),
            ("owner", "carol"),
            ("executor", "tycho"),
        ]));
        assert_eq!(owner.as_deref(), Some("carol"));
        assert!(filter
            .classify(&pod(&[("executor", "tycho"), ("username", "alice")]))
            .is_none());
    }
}
