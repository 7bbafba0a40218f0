//! Which pods belong to a workload
//!
//! Pods are fetched with the workload's selector (or its tracking label),
//! then filtered by walking `ownerReferences` up through intermediate
//! controllers until the workload's UID is reached. Labels are only a
//! pre-filter: two Deployments sharing `app=web` each get only their own
//! pods.
//!
//! The owner graph comes from metadata-only listings of the intermediate
//! kinds and may be incomplete or cyclic. Walks never revisit a UID, and a
//! UID missing from the graph simply ends that branch.

use crate::client::ClusterApi;
use crate::error::{Error, Result};
use crate::objects::{Object, Resource, ResourceKind};
use crate::selector::{label_selector_string, selector_string};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::core::TypeMeta;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Controller kinds that sit between a workload and its pods
pub const INTERMEDIATE_CONTROLLERS: &[ResourceKind] = &[ResourceKind::ReplicaSet, ResourceKind::Job];

/// How pod ownership is decided
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OwnershipPolicy {
    /// Follow owner references through intermediate controllers
    #[default]
    Transitive,
    /// Only an immediate owner reference matching the workload's kind and
    /// UID counts; pods under a Deployment's ReplicaSet are not found this way
    Direct,
}

/// UID → owner UIDs, built from metadata listings
#[derive(Debug, Clone, Default)]
pub struct OwnerMap {
    owners: HashMap<String, Vec<String>>,
}

impl OwnerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the owners of one object; objects without a UID are skipped
    pub fn insert_meta(&mut self, meta: &ObjectMeta) {
        let Some(uid) = meta.uid.clone() else {
            return;
        };
        let owners = meta
            .owner_references
            .iter()
            .flatten()
            .map(|r| r.uid.clone())
            .collect();
        self.owners.insert(uid, owners);
    }

    /// Record an edge `owned → owner`
    pub fn add_owner(&mut self, owned: impl Into<String>, owner: impl Into<String>) {
        self.owners
            .entry(owned.into())
            .or_default()
            .push(owner.into());
    }

    pub fn owners_of(&self, uid: &str) -> &[String] {
        self.owners.get(uid).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Whether a walk from any of `start` reaches `target`
    ///
    /// Iterative depth-first search with one visited set for the whole
    /// query, so cycles and shared ancestors are expanded at most once.
    pub fn reaches<'a, I>(&self, start: I, target: &str) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = start.into_iter().collect();

        while let Some(uid) = stack.pop() {
            if !visited.insert(uid) {
                continue;
            }
            if uid == target {
                return true;
            }
            stack.extend(self.owners_of(uid).iter().map(String::as_str));
        }
        false
    }
}

/// The selector a workload's pods are fetched with
///
/// The label override wins; otherwise the workload's own selector. An empty
/// string means the whole namespace is listed.
pub fn pod_selector(workload: &Resource) -> String {
    if let Some((key, value)) = workload.label_override() {
        return selector_string([(key, value)]);
    }
    workload_selector(workload.object())
        .map(label_selector_string)
        .unwrap_or_default()
}

fn workload_selector(object: &Object) -> Option<&LabelSelector> {
    match object {
        Object::Deployment(d) => d.spec.as_ref().map(|s| &s.selector),
        Object::StatefulSet(s) => s.spec.as_ref().map(|s| &s.selector),
        Object::DaemonSet(d) => d.spec.as_ref().map(|s| &s.selector),
        Object::ReplicaSet(r) => r.spec.as_ref().map(|s| &s.selector),
        Object::Job(j) => j.spec.as_ref().and_then(|s| s.selector.as_ref()),
        _ => None,
    }
}

/// Build the owner map for a namespace from the intermediate controllers
///
/// A failed listing is logged and skipped; the map is then partial.
pub async fn fetch_owner_map(api: &dyn ClusterApi, namespace: &str) -> OwnerMap {
    let mut map = OwnerMap::new();
    for kind in INTERMEDIATE_CONTROLLERS {
        match api.list_metadata(&kind.api_resource(), Some(namespace)).await {
            Ok(items) => {
                for meta in &items {
                    map.insert_meta(meta);
                }
            }
            Err(e) => {
                warn!(
                    namespace = %namespace,
                    kind = %kind,
                    error = %e,
                    "Failed to list owners, ownership data will be partial"
                );
            }
        }
    }
    map
}

/// Pods owned by `workload`, following intermediate controllers
pub async fn get_pods(api: &dyn ClusterApi, workload: &Resource) -> Result<Vec<Resource>> {
    get_pods_with_policy(api, workload, OwnershipPolicy::Transitive).await
}

/// Pods owned by `workload` under the given policy, in server order
pub async fn get_pods_with_policy(
    api: &dyn ClusterApi,
    workload: &Resource,
    policy: OwnershipPolicy,
) -> Result<Vec<Resource>> {
    let kind = workload.kind();
    if !kind.is_workload() {
        return Err(Error::Argument(format!(
            "{} is not a workload kind",
            workload.reference()
        )));
    }
    let namespace = workload.namespace().ok_or_else(|| {
        Error::Argument(format!("{} has no namespace", workload.reference()))
    })?;
    let workload_uid = workload.uid().ok_or_else(|| {
        Error::Argument(format!(
            "{} has no uid; create or refresh it first",
            workload.reference()
        ))
    })?;

    let selector = pod_selector(workload);
    info!(
        resource = %workload.reference(),
        namespace = %namespace,
        selector = %selector,
        "Getting pods"
    );

    let pod_ar = ResourceKind::Pod.api_resource();
    let pods = api.list(&pod_ar, Some(namespace), &selector).await?;

    let owner_map = match policy {
        OwnershipPolicy::Transitive => Some(fetch_owner_map(api, namespace).await),
        OwnershipPolicy::Direct => None,
    };

    let mut owned = Vec::new();
    for mut pod in pods {
        let mut refs = pod.metadata.owner_references.iter().flatten();
        let is_owned = match &owner_map {
            Some(map) => map.reaches(refs.map(|r| r.uid.as_str()), workload_uid),
            None => refs.any(|r| r.uid == workload_uid && r.kind == kind.as_str()),
        };
        if !is_owned {
            continue;
        }
        if pod.types.is_none() {
            pod.types = Some(TypeMeta {
                api_version: pod_ar.api_version.clone(),
                kind: pod_ar.kind.clone(),
            });
        }
        owned.push(Resource::from_dynamic(pod)?);
    }

    debug!(
        resource = %workload.reference(),
        pods = ?owned.iter().map(Resource::name).collect::<Vec<_>>(),
        "Owned pods"
    );
    Ok(owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
    use k8s_openapi::api::core::v1::ConfigMap;
    use std::collections::BTreeMap;

    #[test]
    fn test_reaches_direct_owner() {
        let map = OwnerMap::new();
        assert!(map.reaches(["deploy"], "deploy"));
        assert!(!map.reaches(["other"], "deploy"));
        assert!(!map.reaches(std::iter::empty(), "deploy"));
    }

    #[test]
    fn test_reaches_through_intermediate() {
        let mut map = OwnerMap::new();
        map.add_owner("rs-1", "deploy");
        assert!(map.reaches(["rs-1"], "deploy"));
    }

    #[test]
    fn test_cycle_terminates_without_match() {
        let mut map = OwnerMap::new();
        map.add_owner("a", "b");
        map.add_owner("b", "a");
        assert!(!map.reaches(["a"], "deploy"));
    }

    #[test]
    fn test_self_owner_terminates() {
        let mut map = OwnerMap::new();
        map.add_owner("a", "a");
        assert!(!map.reaches(["a"], "deploy"));
    }

    #[test]
    fn test_dangling_reference_is_not_owning() {
        let mut map = OwnerMap::new();
        map.add_owner("rs-1", "gone");
        assert!(!map.reaches(["rs-1"], "deploy"));
    }

    #[test]
    fn test_deep_chain() {
        let mut map = OwnerMap::new();
        for i in 0..10_000 {
            map.add_owner(format!("n{i}"), format!("n{}", i + 1));
        }
        assert!(map.reaches(["n0"], "n10000"));
    }

    #[test]
    fn test_pod_selector_prefers_label_override() {
        let mut match_labels = BTreeMap::new();
        match_labels.insert("app".to_string(), "web".to_string());
        let mut workload = Resource::new(Deployment {
            spec: Some(DeploymentSpec {
                selector: LabelSelector {
                    match_labels: Some(match_labels),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(pod_selector(&workload), "app=web");

        workload.set_label_override("kubetest/deployment", "abc");
        assert_eq!(pod_selector(&workload), "kubetest/deployment=abc");
    }

    #[test]
    fn test_pod_selector_empty_without_selector() {
        assert_eq!(pod_selector(&Resource::new(Deployment::default())), "");
    }

    #[tokio::test]
    async fn test_get_pods_rejects_non_workloads() {
        let cluster = crate::testing::FakeCluster::new();
        let err = get_pods(&cluster, &Resource::new(ConfigMap::default()))
            .await
            .expect_err("not a workload");
        assert!(matches!(err, Error::Argument(_)));
    }

    #[tokio::test]
    async fn test_get_pods_requires_uid() {
        let cluster = crate::testing::FakeCluster::new();
        let mut deployment = Deployment::default();
        deployment.metadata.namespace = Some("ns".to_string());
        let err = get_pods(&cluster, &Resource::new(deployment))
            .await
            .expect_err("no uid yet");
        assert!(matches!(err, Error::Argument(msg) if msg.contains("uid")));
        assert!(cluster.calls().is_empty());
    }
}
