//! Kind-specific accessors
//!
//! Each accessor is a projection over the last observed object and returns
//! `None` when called on a different kind. `replica_count` and
//! `wait_for_load_balancer_ingress` refresh from the cluster first; `scale`
//! is the one write.

use super::{Object, Resource, ResourceKind};
use crate::client::ClusterApi;
use crate::config::parse_bool;
use crate::error::{Error, Result};
use crate::wait::{poll_until, PendingResource};
use std::time::Duration;
use tracing::{info, warn};

/// Annotation marking the cluster's default StorageClass
pub const DEFAULT_STORAGE_CLASS_ANNOTATION: &str = "storageclass.kubernetes.io/is-default-class";

/// Capability flags of a CSIDriver
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsiDriverInfo {
    pub attach_required: Option<bool>,
    pub fs_group_policy: Option<String>,
    pub pod_info_on_mount: Option<bool>,
    pub requires_republish: Option<bool>,
    pub storage_capacity: Option<bool>,
    pub volume_lifecycle_modes: Vec<String>,
}

/// Pod counts reported by a Job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCounts {
    pub active: i32,
    pub succeeded: i32,
    pub failed: i32,
}

impl Resource {
    /// Ingress load-balancer addresses (IP, or hostname when no IP is set)
    pub fn load_balancer_addresses(&self) -> Option<Vec<String>> {
        let Object::Ingress(ingress) = &self.object else {
            return None;
        };
        let addresses = ingress
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.ip.clone().or_else(|| entry.hostname.clone()))
            .collect();
        Some(addresses)
    }

    /// Whether an Ingress has been assigned a load-balancer address
    pub fn has_load_balancer_ingress(&self) -> Option<bool> {
        self.load_balancer_addresses().map(|a| !a.is_empty())
    }

    /// Poll until an Ingress gets a load-balancer address
    ///
    /// `timeout` of `None` waits forever.
    pub async fn wait_for_load_balancer_ingress(
        &mut self,
        api: &dyn ClusterApi,
        timeout: Option<Duration>,
        interval: Duration,
    ) -> Result<()> {
        let reference = self.reference();
        let mut state = (api, self);
        poll_until(&reference, timeout, interval, &mut state, |(api, resource)| {
            Box::pin(async move {
                resource.refresh(*api).await?;
                if resource.has_load_balancer_ingress() == Some(true) {
                    Ok(vec![])
                } else {
                    Ok(vec![PendingResource::new(
                        resource.reference(),
                        "no load balancer ingress",
                    )])
                }
            })
        })
        .await
    }

    /// CSIDriver capability flags
    pub fn csi_driver_info(&self) -> Option<CsiDriverInfo> {
        let Object::CSIDriver(driver) = &self.object else {
            return None;
        };
        let spec = &driver.spec;
        Some(CsiDriverInfo {
            attach_required: spec.attach_required,
            fs_group_policy: spec.fs_group_policy.clone(),
            pod_info_on_mount: spec.pod_info_on_mount,
            requires_republish: spec.requires_republish,
            storage_capacity: spec.storage_capacity,
            volume_lifecycle_modes: spec.volume_lifecycle_modes.clone().unwrap_or_default(),
        })
    }

    /// Whether a StorageClass is annotated as the cluster default
    pub fn is_default_storage_class(&self) -> Option<bool> {
        let Object::StorageClass(class) = &self.object else {
            return None;
        };
        let flag = class
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(DEFAULT_STORAGE_CLASS_ANNOTATION));

        let Some(flag) = flag else {
            return Some(false);
        };
        match parse_bool(flag) {
            Some(value) => Some(value),
            None => {
                warn!(
                    resource = %self.reference(),
                    value = %flag,
                    "Unrecognized {DEFAULT_STORAGE_CLASS_ANNOTATION} value, treating as false"
                );
                Some(false)
            }
        }
    }

    /// PersistentVolume phase (`Available`, `Bound`, `Released`, ...)
    pub fn persistent_volume_phase(&self) -> Option<&str> {
        let Object::PersistentVolume(pv) = &self.object else {
            return None;
        };
        pv.status.as_ref().and_then(|s| s.phase.as_deref())
    }

    /// StorageClass name of a PersistentVolume or PersistentVolumeClaim
    pub fn storage_class_name(&self) -> Option<&str> {
        match &self.object {
            Object::PersistentVolume(pv) => pv
                .spec
                .as_ref()
                .and_then(|s| s.storage_class_name.as_deref()),
            Object::PersistentVolumeClaim(pvc) => pvc
                .spec
                .as_ref()
                .and_then(|s| s.storage_class_name.as_deref()),
            _ => None,
        }
    }

    /// Active/succeeded/failed pod counts of a Job
    pub fn job_counts(&self) -> Option<JobCounts> {
        let Object::Job(job) = &self.object else {
            return None;
        };
        let status = job.status.as_ref();
        Some(JobCounts {
            active: status.and_then(|s| s.active).unwrap_or(0),
            succeeded: status.and_then(|s| s.succeeded).unwrap_or(0),
            failed: status.and_then(|s| s.failed).unwrap_or(0),
        })
    }

    /// Whether a Job has a completion time
    pub fn is_completed(&self) -> Option<bool> {
        let Object::Job(job) = &self.object else {
            return None;
        };
        Some(
            job.status
                .as_ref()
                .is_some_and(|s| s.completion_time.is_some()),
        )
    }

    /// Desired pod count of a workload, as last observed
    ///
    /// `spec.replicas` for replicated kinds, `spec.parallelism` for Jobs and
    /// the scheduled count for DaemonSets.
    pub fn replicas(&self) -> Option<i32> {
        match &self.object {
            Object::Deployment(d) => d.spec.as_ref().and_then(|s| s.replicas),
            Object::StatefulSet(s) => s.spec.as_ref().and_then(|s| s.replicas),
            Object::ReplicaSet(r) => r.spec.as_ref().and_then(|s| s.replicas),
            Object::Job(j) => j.spec.as_ref().and_then(|s| s.parallelism),
            Object::DaemonSet(d) => d.status.as_ref().map(|s| s.desired_number_scheduled),
            _ => None,
        }
    }

    /// Refresh, then read [`replicas`](Self::replicas)
    pub async fn replica_count(&mut self, api: &dyn ClusterApi) -> Result<Option<i32>> {
        self.refresh(api).await?;
        Ok(self.replicas())
    }

    /// Set the desired replica count of a Deployment, StatefulSet or ReplicaSet
    ///
    /// Sends a merge patch on `spec.replicas`; the server's copy replaces the
    /// local one. Pods come and go asynchronously, so follow up with a wait.
    pub async fn scale(&mut self, api: &dyn ClusterApi, replicas: i32) -> Result<()> {
        let kind = self.kind();
        if !matches!(
            kind,
            ResourceKind::Deployment | ResourceKind::StatefulSet | ResourceKind::ReplicaSet
        ) {
            return Err(Error::Argument(format!("cannot scale a {kind}")));
        }
        if replicas < 0 {
            return Err(Error::Argument(format!(
                "cannot scale {} to {replicas} replicas",
                self.reference()
            )));
        }
        self.require_name("scale")?;

        info!(resource = %self.reference(), replicas, "Scaling workload");
        let ns = self.namespace_for(None);
        let patch = serde_json::json!({ "spec": { "replicas": replicas } });
        let scaled = api
            .patch(&kind.api_resource(), ns.as_deref(), self.name(), &patch)
            .await?;
        self.replace_from_dynamic(scaled)
    }
}
