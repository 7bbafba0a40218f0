//! Typed wrappers over the Kubernetes kinds kubetest manages
//!
//! Every supported kind is a variant of [`Object`], holding the typed
//! `k8s-openapi` struct. [`ResourceKind`] is the matching tag and doubles as
//! the static registry: [`ResourceKind::from_kind`] is the only way a kind
//! string becomes a wrapper, and anything it doesn't know is rejected.
//!
//! [`Resource`] adds the uniform lifecycle (`create`, `delete`, `refresh`,
//! `is_ready`) on top, talking to the cluster through
//! [`ClusterApi`](crate::client::ClusterApi).

mod accessors;
mod readiness;

pub use accessors::{CsiDriverInfo, JobCounts};

use crate::client::ClusterApi;
use crate::error::{Error, Result};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{
    ConfigMap, Endpoints, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod, Secret,
    Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, RoleBinding};
use k8s_openapi::api::storage::v1::{CSIDriver, StorageClass};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::api::{ApiResource, DeleteParams, DynamicObject};
use kube::core::TypeMeta;
use std::fmt;
use tracing::{debug, info, warn};

/// Label key prefix used to tag workloads for pod discovery
pub const TRACKING_LABEL_PREFIX: &str = "kubetest";

macro_rules! resource_kinds {
    ($( $variant:ident($ty:ty) { namespaced: $ns:literal, workload: $wl:literal } ),+ $(,)?) => {
        /// Discriminant for every kind kubetest can wrap
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ResourceKind {
            $($variant),+
        }

        impl ResourceKind {
            /// Every registered kind
            pub const ALL: &'static [ResourceKind] = &[$(ResourceKind::$variant),+];

            /// The `kind` string as the API server spells it
            pub fn as_str(self) -> &'static str {
                match self {
                    $(ResourceKind::$variant => stringify!($variant)),+
                }
            }

            /// Group, version and plural used to address this kind
            pub fn api_resource(self) -> ApiResource {
                match self {
                    $(ResourceKind::$variant => ApiResource::erase::<$ty>(&())),+
                }
            }

            #[must_use]
            pub fn is_namespaced(self) -> bool {
                match self {
                    $(ResourceKind::$variant => $ns),+
                }
            }

            /// Kinds that manage pods through a template and selector
            #[must_use]
            pub fn is_workload(self) -> bool {
                match self {
                    $(ResourceKind::$variant => $wl),+
                }
            }
        }

        /// A typed object of one of the registered kinds
        #[derive(Debug, Clone)]
        pub enum Object {
            $($variant($ty)),+
        }

        impl Object {
            pub fn kind(&self) -> ResourceKind {
                match self {
                    $(Object::$variant(_) => ResourceKind::$variant),+
                }
            }

            pub fn meta(&self) -> &ObjectMeta {
                match self {
                    $(Object::$variant(o) => &o.metadata),+
                }
            }

            pub fn meta_mut(&mut self) -> &mut ObjectMeta {
                match self {
                    $(Object::$variant(o) => &mut o.metadata),+
                }
            }

            fn from_value(kind: ResourceKind, value: serde_json::Value) -> Result<Self> {
                let parsed = match kind {
                    $(ResourceKind::$variant => serde_json::from_value::<$ty>(value).map(Object::$variant)),+
                };
                parsed.map_err(|e| Error::Conversion {
                    kind: kind.as_str().to_string(),
                    reason: e.to_string(),
                })
            }

            fn to_value(&self) -> Result<serde_json::Value> {
                let value = match self {
                    $(Object::$variant(o) => serde_json::to_value(o)),+
                };
                value.map_err(|e| Error::Conversion {
                    kind: self.kind().as_str().to_string(),
                    reason: e.to_string(),
                })
            }
        }

        $(
            impl From<$ty> for Object {
                fn from(obj: $ty) -> Self {
                    Object::$variant(obj)
                }
            }
        )+
    };
}

resource_kinds! {
    ClusterRole(ClusterRole) { namespaced: false, workload: false },
    ClusterRoleBinding(ClusterRoleBinding) { namespaced: false, workload: false },
    ConfigMap(ConfigMap) { namespaced: true, workload: false },
    CSIDriver(CSIDriver) { namespaced: false, workload: false },
    CustomResourceDefinition(CustomResourceDefinition) { namespaced: false, workload: false },
    DaemonSet(DaemonSet) { namespaced: true, workload: true },
    Deployment(Deployment) { namespaced: true, workload: true },
    Endpoints(Endpoints) { namespaced: true, workload: false },
    Ingress(Ingress) { namespaced: true, workload: false },
    Job(Job) { namespaced: true, workload: true },
    Namespace(Namespace) { namespaced: false, workload: false },
    Node(Node) { namespaced: false, workload: false },
    PersistentVolume(PersistentVolume) { namespaced: false, workload: false },
    PersistentVolumeClaim(PersistentVolumeClaim) { namespaced: true, workload: false },
    Pod(Pod) { namespaced: true, workload: false },
    ReplicaSet(ReplicaSet) { namespaced: true, workload: true },
    RoleBinding(RoleBinding) { namespaced: true, workload: false },
    Secret(Secret) { namespaced: true, workload: false },
    Service(Service) { namespaced: true, workload: false },
    ServiceAccount(ServiceAccount) { namespaced: true, workload: false },
    StatefulSet(StatefulSet) { namespaced: true, workload: true },
    StorageClass(StorageClass) { namespaced: false, workload: false },
}

impl ResourceKind {
    /// Look up a kind by its `kind` string (case-sensitive, as served)
    pub fn from_kind(kind: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == kind)
    }

    /// `apiVersion` of the registered version, e.g. `apps/v1`
    pub fn api_version(self) -> String {
        self.api_resource().api_version
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`Resource::delete`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// The server accepted the delete request
    Requested,
    /// The object was already gone (404)
    AlreadyAbsent,
}

/// One live-or-pending cluster object with a uniform lifecycle
#[derive(Debug, Clone)]
pub struct Resource {
    object: Object,
    label_override: Option<(String, String)>,
}

impl From<Object> for Resource {
    fn from(obj: Object) -> Self {
        Resource::new(obj)
    }
}

impl Resource {
    pub fn new(obj: impl Into<Object>) -> Self {
        Self {
            object: obj.into(),
            label_override: None,
        }
    }

    /// Wrap an untyped object through the static kind registry
    ///
    /// Fails with [`Error::UnresolvedKind`] when the kind is not registered,
    /// or is registered under a different `apiVersion`.
    pub fn from_dynamic(mut obj: DynamicObject) -> Result<Self> {
        let (kind_str, api_version) = obj
            .types
            .as_ref()
            .map(|t| (t.kind.clone(), t.api_version.clone()))
            .unwrap_or_default();

        let unresolved = || Error::UnresolvedKind {
            kind: kind_str.clone(),
            api_version: api_version.clone(),
        };
        let kind = ResourceKind::from_kind(&kind_str).ok_or_else(unresolved)?;
        if kind.api_version() != api_version {
            return Err(unresolved());
        }

        obj.types = Some(TypeMeta {
            api_version: api_version.clone(),
            kind: kind_str.clone(),
        });
        let value = serde_json::to_value(&obj).map_err(|e| Error::Conversion {
            kind: kind_str.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(Object::from_value(kind, value)?))
    }

    /// The object as an untyped `DynamicObject`
    pub fn to_dynamic(&self) -> Result<DynamicObject> {
        let value = self.object.to_value()?;
        serde_json::from_value(value).map_err(|e| Error::Conversion {
            kind: self.kind().as_str().to_string(),
            reason: e.to_string(),
        })
    }

    fn replace_from_dynamic(&mut self, obj: DynamicObject) -> Result<()> {
        let kind = self.kind();
        let value = serde_json::to_value(&obj).map_err(|e| Error::Conversion {
            kind: kind.as_str().to_string(),
            reason: e.to_string(),
        })?;
        self.object = Object::from_value(kind, value)?;
        Ok(())
    }

    pub fn kind(&self) -> ResourceKind {
        self.object.kind()
    }

    pub fn object(&self) -> &Object {
        &self.object
    }

    pub fn object_mut(&mut self) -> &mut Object {
        &mut self.object
    }

    pub fn into_object(self) -> Object {
        self.object
    }

    pub fn metadata(&self) -> &ObjectMeta {
        self.object.meta()
    }

    /// `metadata.name`, or empty when unset
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }

    /// Server-assigned UID; set once the object was created or refreshed
    pub fn uid(&self) -> Option<&str> {
        self.metadata().uid.as_deref()
    }

    /// Short reference for logs and errors, e.g. `deployment/web`
    pub fn reference(&self) -> String {
        format!("{}/{}", self.kind().as_str().to_lowercase(), self.name())
    }

    /// Explicit pod-discovery label, if one is set
    pub fn label_override(&self) -> Option<(&str, &str)> {
        self.label_override
            .as_ref()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Discover pods by this exact label instead of the workload's selector
    pub fn set_label_override(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.label_override = Some((key.into(), value.into()));
    }

    fn namespace_for(&self, namespace: Option<&str>) -> Option<String> {
        if !self.kind().is_namespaced() {
            return None;
        }
        namespace.or(self.namespace()).map(str::to_string)
    }

    fn require_name(&self, operation: &str) -> Result<()> {
        if self.name().is_empty() {
            return Err(Error::Argument(format!(
                "cannot {operation} {} without metadata.name",
                self.kind()
            )));
        }
        Ok(())
    }

    /// Submit the object to the cluster
    ///
    /// An explicit `namespace` wins over the one stored on the object. The
    /// server's response replaces the local copy. Conflicts are returned as
    /// errors, never swallowed.
    pub async fn create(&mut self, api: &dyn ClusterApi, namespace: Option<&str>) -> Result<()> {
        let kind = self.kind();
        let ns = self.namespace_for(namespace);
        if kind.is_namespaced() && ns.is_none() {
            return Err(Error::Argument(format!(
                "{} {} is namespaced but no namespace was given",
                kind,
                self.name()
            )));
        }
        if let Some(ns) = &ns {
            self.object.meta_mut().namespace = Some(ns.clone());
        }

        info!(resource = %self.reference(), namespace = ?ns, "Creating resource");
        let obj = self.to_dynamic()?;
        let created = api
            .create(&kind.api_resource(), ns.as_deref(), &obj)
            .await?;
        self.replace_from_dynamic(created)
    }

    /// Request deletion; a 404 counts as success
    pub async fn delete(
        &self,
        api: &dyn ClusterApi,
        options: Option<&DeleteParams>,
    ) -> Result<Deletion> {
        self.require_name("delete")?;
        let default_params = DeleteParams::default();
        let params = options.unwrap_or(&default_params);

        info!(resource = %self.reference(), namespace = ?self.namespace(), "Deleting resource");
        let ns = self.namespace_for(None);
        match api
            .delete(&self.kind().api_resource(), ns.as_deref(), self.name(), params)
            .await
        {
            Ok(()) => Ok(Deletion::Requested),
            Err(e) if e.is_not_found() => {
                debug!(resource = %self.reference(), "Already absent");
                Ok(Deletion::AlreadyAbsent)
            }
            Err(e) => Err(e),
        }
    }

    /// Replace the local copy with the server's
    pub async fn refresh(&mut self, api: &dyn ClusterApi) -> Result<()> {
        self.require_name("refresh")?;
        let ns = self.namespace_for(None);
        let fresh = api
            .get(&self.kind().api_resource(), ns.as_deref(), self.name())
            .await?;
        self.replace_from_dynamic(fresh)
    }

    /// Refresh, then evaluate readiness
    pub async fn check_ready(&mut self, api: &dyn ClusterApi) -> Result<bool> {
        self.refresh(api).await?;
        Ok(self.is_ready())
    }

    /// Tag a workload with a unique `kubetest/<kind>` label
    ///
    /// The label goes on the object, its selector and its pod template, and
    /// becomes the pod-discovery label override. An existing label value is
    /// reused. Without one, a fresh UUID is generated when
    /// `create_if_missing` is set; otherwise nothing changes. Returns
    /// whether the workload is now tracked.
    pub fn add_tracking_label(&mut self, create_if_missing: bool) -> bool {
        let kind = self.kind();
        if !kind.is_workload() {
            return false;
        }

        let key = format!("{TRACKING_LABEL_PREFIX}/{}", kind.as_str().to_lowercase());
        let existing = self
            .metadata()
            .labels
            .as_ref()
            .and_then(|labels| labels.get(&key))
            .filter(|v| !v.is_empty())
            .cloned();
        let value = match existing {
            Some(v) => v,
            None if create_if_missing => uuid::Uuid::new_v4().to_string(),
            None => return false,
        };

        insert_label(self.object.meta_mut(), &key, &value);

        let tagged = match &mut self.object {
            Object::Deployment(d) => d.spec.as_mut().map(|spec| {
                insert_selector_label(&mut spec.selector, &key, &value);
                insert_label(template_meta(&mut spec.template.metadata), &key, &value);
            }),
            Object::StatefulSet(s) => s.spec.as_mut().map(|spec| {
                insert_selector_label(&mut spec.selector, &key, &value);
                insert_label(template_meta(&mut spec.template.metadata), &key, &value);
            }),
            Object::DaemonSet(d) => d.spec.as_mut().map(|spec| {
                insert_selector_label(&mut spec.selector, &key, &value);
                insert_label(template_meta(&mut spec.template.metadata), &key, &value);
            }),
            Object::ReplicaSet(r) => r.spec.as_mut().map(|spec| {
                insert_selector_label(&mut spec.selector, &key, &value);
                let template = spec.template.get_or_insert_with(Default::default);
                insert_label(template_meta(&mut template.metadata), &key, &value);
            }),
            Object::Job(j) => j.spec.as_mut().map(|spec| {
                spec.manual_selector = Some(true);
                insert_selector_label(spec.selector.get_or_insert_with(Default::default), &key, &value);
                insert_label(template_meta(&mut spec.template.metadata), &key, &value);
            }),
            _ => None,
        };
        if tagged.is_none() {
            warn!(resource = %self.reference(), "Workload has no spec, label set on metadata only");
        }

        self.label_override = Some((key, value));
        true
    }
}

fn template_meta(meta: &mut Option<ObjectMeta>) -> &mut ObjectMeta {
    meta.get_or_insert_with(Default::default)
}

fn insert_label(meta: &mut ObjectMeta, key: &str, value: &str) {
    meta.labels
        .get_or_insert_with(Default::default)
        .entry(key.to_string())
        .or_insert_with(|| value.to_string());
}

fn insert_selector_label(selector: &mut LabelSelector, key: &str, value: &str) {
    selector
        .match_labels
        .get_or_insert_with(Default::default)
        .entry(key.to_string())
        .or_insert_with(|| value.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCluster;
    use k8s_openapi::api::apps::v1::DeploymentSpec;
    use k8s_openapi::api::batch::v1::JobSpec;
    use k8s_openapi::api::core::v1::PodTemplateSpec;
    use serde_json::json;

    fn deployment(name: &str, namespace: Option<&str>) -> Resource {
        Resource::new(Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: namespace.map(str::to_string),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                selector: LabelSelector {
                    match_labels: Some([("app".to_string(), name.to_string())].into()),
                    ..Default::default()
                },
                template: PodTemplateSpec::default(),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn dynamic(value: serde_json::Value) -> DynamicObject {
        serde_json::from_value(value).expect("valid dynamic object")
    }

    #[test]
    fn test_registry_round_trips_kind_names() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_kind(kind.as_str()), Some(*kind));
            assert_eq!(kind.api_resource().kind, kind.as_str());
        }
        assert_eq!(ResourceKind::ALL.len(), 22);
        assert_eq!(ResourceKind::from_kind("deployment"), None);
        assert_eq!(ResourceKind::from_kind("Event"), None);
    }

    #[test]
    fn test_workload_and_scope_flags() {
        let workloads: Vec<_> = ResourceKind::ALL
            .iter()
            .filter(|k| k.is_workload())
            .map(|k| k.as_str())
            .collect();
        assert_eq!(
            workloads,
            ["DaemonSet", "Deployment", "Job", "ReplicaSet", "StatefulSet"]
        );
        assert!(!ResourceKind::Namespace.is_namespaced());
        assert!(!ResourceKind::StorageClass.is_namespaced());
        assert!(ResourceKind::ConfigMap.is_namespaced());
        assert_eq!(ResourceKind::Deployment.api_version(), "apps/v1");
        assert_eq!(ResourceKind::CustomResourceDefinition.api_version(), "apiextensions.k8s.io/v1");
    }

    #[test]
    fn test_from_dynamic_resolves_registered_kind() {
        let obj = dynamic(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "settings", "namespace": "ns-1"},
            "data": {"key": "value"}
        }));
        let resource = Resource::from_dynamic(obj).expect("ConfigMap is registered");
        assert_eq!(resource.kind(), ResourceKind::ConfigMap);
        assert_eq!(resource.name(), "settings");
        assert_eq!(resource.namespace(), Some("ns-1"));
        assert_eq!(resource.reference(), "configmap/settings");
        match resource.object() {
            Object::ConfigMap(cm) => {
                assert_eq!(cm.data.as_ref().and_then(|d| d.get("key")).map(String::as_str), Some("value"));
            }
            other => panic!("unexpected object {other:?}"),
        }
    }

    #[test]
    fn test_from_dynamic_unknown_kind_is_unresolved() {
        let obj = dynamic(json!({
            "apiVersion": "example.com/v1",
            "kind": "Widget",
            "metadata": {"name": "w"}
        }));
        match Resource::from_dynamic(obj) {
            Err(Error::UnresolvedKind { kind, api_version }) => {
                assert_eq!(kind, "Widget");
                assert_eq!(api_version, "example.com/v1");
            }
            other => panic!("expected UnresolvedKind, got {other:?}"),
        }
    }

    #[test]
    fn test_from_dynamic_wrong_version_is_unresolved() {
        let obj = dynamic(json!({
            "apiVersion": "extensions/v1beta1",
            "kind": "Deployment",
            "metadata": {"name": "old"}
        }));
        assert!(matches!(
            Resource::from_dynamic(obj),
            Err(Error::UnresolvedKind { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_requires_namespace_for_namespaced_kinds() {
        let cluster = FakeCluster::new();
        let mut resource = deployment("web", None);
        let result = resource.create(&cluster, None).await;
        assert!(matches!(result, Err(Error::Argument(_))));
        assert!(cluster.calls().is_empty(), "no request should be sent");
    }

    #[tokio::test]
    async fn test_create_explicit_namespace_wins() {
        let cluster = FakeCluster::new();
        let mut resource = deployment("web", Some("stored"));
        resource
            .create(&cluster, Some("explicit"))
            .await
            .expect("Should create");

        assert_eq!(resource.namespace(), Some("explicit"));
        assert!(resource.uid().is_some(), "server copy replaces local state");
        assert!(cluster
            .get_object(ResourceKind::Deployment, Some("explicit"), "web")
            .is_some());
    }

    #[tokio::test]
    async fn test_create_conflict_is_not_swallowed() {
        let cluster = FakeCluster::new();
        deployment("web", Some("ns"))
            .create(&cluster, None)
            .await
            .expect("first create");
        let err = deployment("web", Some("ns"))
            .create(&cluster, None)
            .await
            .expect_err("second create conflicts");
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_delete_twice_is_idempotent() {
        let cluster = FakeCluster::new();
        let mut resource = deployment("web", Some("ns"));
        resource.create(&cluster, None).await.expect("Should create");

        assert_eq!(
            resource.delete(&cluster, None).await.expect("first delete"),
            Deletion::Requested
        );
        assert_eq!(
            resource.delete(&cluster, None).await.expect("second delete"),
            Deletion::AlreadyAbsent
        );
    }

    #[tokio::test]
    async fn test_refresh_missing_object_is_not_found() {
        let cluster = FakeCluster::new();
        let mut resource = deployment("ghost", Some("ns"));
        let err = resource.refresh(&cluster).await.expect_err("not created");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_cluster_scoped_create_ignores_namespace() {
        let cluster = FakeCluster::new();
        let mut ns = Resource::new(Namespace {
            metadata: ObjectMeta {
                name: Some("kubetest-abc".to_string()),
                ..Default::default()
            },
            ..Default::default()
        });
        ns.create(&cluster, Some("ignored")).await.expect("Should create");
        assert_eq!(ns.namespace(), None);
        assert!(cluster
            .get_object(ResourceKind::Namespace, None, "kubetest-abc")
            .is_some());
    }

    #[test]
    fn test_add_tracking_label_deployment() {
        let mut resource = deployment("web", Some("ns"));
        assert!(resource.add_tracking_label(true));

        let (key, value) = resource.label_override().expect("override set");
        assert_eq!(key, "kubetest/deployment");
        let (key, value) = (key.to_string(), value.to_string());

        let Object::Deployment(d) = resource.object() else {
            panic!("expected deployment");
        };
        let spec = d.spec.as_ref().expect("spec");
        assert_eq!(d.metadata.labels.as_ref().and_then(|l| l.get(&key)), Some(&value));
        assert_eq!(spec.selector.match_labels.as_ref().and_then(|l| l.get(&key)), Some(&value));
        assert_eq!(
            spec.template
                .metadata
                .as_ref()
                .and_then(|m| m.labels.as_ref())
                .and_then(|l| l.get(&key)),
            Some(&value)
        );
        // Original selector labels survive
        assert_eq!(
            spec.selector.match_labels.as_ref().and_then(|l| l.get("app")).map(String::as_str),
            Some("web")
        );
    }

    #[test]
    fn test_add_tracking_label_reuses_existing_value() {
        let mut resource = deployment("web", Some("ns"));
        resource
            .object_mut()
            .meta_mut()
            .labels
            .get_or_insert_with(Default::default)
            .insert("kubetest/deployment".to_string(), "fixed".to_string());

        assert!(resource.add_tracking_label(false));
        assert_eq!(resource.label_override(), Some(("kubetest/deployment", "fixed")));
    }

    #[test]
    fn test_add_tracking_label_without_create_is_noop() {
        let mut resource = deployment("web", Some("ns"));
        assert!(!resource.add_tracking_label(false));
        assert_eq!(resource.label_override(), None);
    }

    #[test]
    fn test_add_tracking_label_job_sets_manual_selector() {
        let mut resource = Resource::new(Job {
            metadata: ObjectMeta {
                name: Some("migrate".to_string()),
                ..Default::default()
            },
            spec: Some(JobSpec::default()),
            ..Default::default()
        });
        assert!(resource.add_tracking_label(true));

        let Object::Job(job) = resource.object() else {
            panic!("expected job");
        };
        let spec = job.spec.as_ref().expect("spec");
        assert_eq!(spec.manual_selector, Some(true));
        assert!(spec
            .selector
            .as_ref()
            .and_then(|s| s.match_labels.as_ref())
            .is_some_and(|l| l.contains_key("kubetest/job")));
    }

    #[test]
    fn test_add_tracking_label_ignores_non_workloads() {
        let mut resource = Resource::new(ConfigMap::default());
        assert!(!resource.add_tracking_label(true));
    }
}
