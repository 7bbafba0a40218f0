//! Per-kind readiness predicates and state descriptions
//!
//! Both are pure functions of the object's last observed status; call
//! `refresh` first to see what the server sees.

use super::{Object, Resource};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Namespace, Node, PersistentVolumeClaim, Pod};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;

/// Readiness and a human-readable summary of an object's status
pub(crate) trait ResourceState {
    /// Kinds without a readiness concept are ready once they exist
    fn is_ready(&self) -> bool {
        true
    }

    fn state_description(&self) -> String {
        "exists".to_string()
    }
}

fn condition_true<'a>(mut conditions: impl Iterator<Item = (&'a str, &'a str)>, wanted: &str) -> bool {
    conditions.any(|(type_, status)| type_ == wanted && status == "True")
}

impl ResourceState for Deployment {
    fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.replicas.is_some() && s.replicas == s.ready_replicas)
    }

    fn state_description(&self) -> String {
        let spec_replicas = self.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
        let status = self.status.as_ref();
        let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);
        let available = status.and_then(|s| s.available_replicas).unwrap_or(0);
        let unavailable = status.and_then(|s| s.unavailable_replicas).unwrap_or(0);

        if unavailable > 0 {
            format!("{ready}/{spec_replicas} ready, {unavailable} unavailable")
        } else {
            format!("{ready}/{spec_replicas} ready, {available}/{spec_replicas} available")
        }
    }
}

impl ResourceState for StatefulSet {
    fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.ready_replicas == Some(s.replicas))
    }

    fn state_description(&self) -> String {
        let spec_replicas = self.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
        let status = self.status.as_ref();
        let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);
        let current = status.and_then(|s| s.current_replicas).unwrap_or(0);

        format!("{ready}/{spec_replicas} ready, {current}/{spec_replicas} current")
    }
}

impl ResourceState for ReplicaSet {
    fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.ready_replicas == Some(s.replicas))
    }

    fn state_description(&self) -> String {
        let spec_replicas = self.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
        let ready = self
            .status
            .as_ref()
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0);
        format!("{ready}/{spec_replicas} ready")
    }
}

impl ResourceState for DaemonSet {
    fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.desired_number_scheduled == s.number_ready)
    }

    fn state_description(&self) -> String {
        let status = self.status.as_ref();
        let desired = status.map(|s| s.desired_number_scheduled).unwrap_or(0);
        let ready = status.map(|s| s.number_ready).unwrap_or(0);
        let available = status.and_then(|s| s.number_available).unwrap_or(0);

        format!("{ready}/{desired} ready, {available}/{desired} available")
    }
}

impl ResourceState for Job {
    fn is_ready(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.start_time.is_some())
    }

    fn state_description(&self) -> String {
        let Some(status) = self.status.as_ref() else {
            return "not started".to_string();
        };
        if status.start_time.is_none() {
            return "not started".to_string();
        }
        format!(
            "active={}, succeeded={}, failed={}",
            status.active.unwrap_or(0),
            status.succeeded.unwrap_or(0),
            status.failed.unwrap_or(0)
        )
    }
}

impl ResourceState for Pod {
    fn is_ready(&self) -> bool {
        let Some(status) = self.status.as_ref() else {
            return false;
        };
        let running = status.phase.as_deref() == Some("Running");
        let conditions = status
            .conditions
            .iter()
            .flatten()
            .map(|c| (c.type_.as_str(), c.status.as_str()));
        running && condition_true(conditions, "Ready")
    }

    fn state_description(&self) -> String {
        let phase = self
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .unwrap_or("Unknown");

        let containers = self
            .status
            .as_ref()
            .and_then(|s| s.container_statuses.as_ref());

        match containers {
            Some(statuses) => {
                let total = statuses.len();
                let ready = statuses.iter().filter(|c| c.ready).count();

                let waiting_reasons: Vec<&str> = statuses
                    .iter()
                    .filter_map(|c| {
                        c.state
                            .as_ref()
                            .and_then(|s| s.waiting.as_ref())
                            .and_then(|w| w.reason.as_deref())
                    })
                    .collect();

                if waiting_reasons.is_empty() {
                    format!("phase={phase}, containers {ready}/{total} ready")
                } else {
                    format!(
                        "phase={phase}, containers {ready}/{total} ready, waiting: {}",
                        waiting_reasons.join(", ")
                    )
                }
            }
            None => format!("phase={phase}, no container status"),
        }
    }
}

impl ResourceState for Namespace {
    fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            == Some("Active")
    }

    fn state_description(&self) -> String {
        let phase = self.status.as_ref().and_then(|s| s.phase.as_deref());
        format!("phase={}", phase.unwrap_or("Unknown"))
    }
}

impl ResourceState for PersistentVolumeClaim {
    fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            == Some("Bound")
    }

    fn state_description(&self) -> String {
        let phase = self.status.as_ref().and_then(|s| s.phase.as_deref());
        format!("phase={}", phase.unwrap_or("Unknown"))
    }
}

impl ResourceState for Node {
    fn is_ready(&self) -> bool {
        let conditions = self
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .into_iter()
            .flatten()
            .map(|c| (c.type_.as_str(), c.status.as_str()));
        condition_true(conditions, "Ready")
    }

    fn state_description(&self) -> String {
        if self.is_ready() {
            "Ready".to_string()
        } else {
            "NotReady".to_string()
        }
    }
}

impl ResourceState for CustomResourceDefinition {
    fn is_ready(&self) -> bool {
        let conditions = self
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .into_iter()
            .flatten()
            .map(|c| (c.type_.as_str(), c.status.as_str()));
        condition_true(conditions, "Established")
    }

    fn state_description(&self) -> String {
        if self.is_ready() {
            "Established".to_string()
        } else {
            "not established".to_string()
        }
    }
}

/// Kinds that are ready as soon as they exist
struct Exists;

impl ResourceState for Exists {}

impl Object {
    fn state(&self) -> &dyn ResourceState {
        match self {
            Object::Deployment(o) => o,
            Object::StatefulSet(o) => o,
            Object::ReplicaSet(o) => o,
            Object::DaemonSet(o) => o,
            Object::Job(o) => o,
            Object::Pod(o) => o,
            Object::Namespace(o) => o,
            Object::PersistentVolumeClaim(o) => o,
            Object::Node(o) => o,
            Object::CustomResourceDefinition(o) => o,
            _ => &Exists,
        }
    }
}

impl Resource {
    /// Kind-specific readiness over the last observed status
    ///
    /// | Kind | Ready when |
    /// |------|------------|
    /// | Deployment, StatefulSet, ReplicaSet | `status.replicas == status.readyReplicas` |
    /// | DaemonSet | `desiredNumberScheduled == numberReady` |
    /// | Job | `status.startTime` is set |
    /// | Pod | phase `Running` and `Ready=True` |
    /// | Namespace | phase `Active` |
    /// | PersistentVolumeClaim | phase `Bound` |
    /// | Node | `Ready=True` |
    /// | CustomResourceDefinition | `Established=True` |
    /// | everything else | always |
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.object.state().is_ready()
    }

    /// Summary of the last observed status, e.g. `1/3 ready, 2 unavailable`
    pub fn state_description(&self) -> String {
        self.object.state().state_description()
    }
}
