//! Builders for per-test declarations
//!
//! Each function takes the declaration's arguments plus the active
//! [`TestContext`] (or namespace) and builds what should be registered. No
//! attribute parsing happens here.

use crate::config::ClusterConfig;
use crate::context::TestContext;
use crate::error::{Error, Result};
use crate::manager::Manager;
use crate::manifest::{self, RenderContext, Renderer, TemplateRenderer};
use crate::objects::Resource;
use k8s_openapi::api::rbac::v1::{ClusterRoleBinding, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Groups bound when no subject is given
pub const DEFAULT_SUBJECT_GROUPS: [&str; 3] = [
    "system:authenticated",
    "system:unauthenticated",
    "system:serviceaccounts",
];

/// Wrap loaded objects through the kind registry and tag workloads
///
/// Any unregistered kind fails the whole batch before anything is
/// registered.
pub fn wrap_objects(objects: Vec<DynamicObject>) -> Result<Vec<Resource>> {
    objects
        .into_iter()
        .map(|obj| {
            let mut resource = Resource::from_dynamic(obj)?;
            resource.add_tracking_label(true);
            Ok(resource)
        })
        .collect()
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| Error::Manifest {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Manifests to load into a test context
///
/// Covers both single files and directories. A relative path is resolved
/// against `base_dir` (usually the test file's directory), or the working
/// directory without one.
pub struct ApplyManifests<'a> {
    path: PathBuf,
    files: Option<Vec<String>>,
    renderer: Option<&'a dyn Renderer>,
    base_dir: Option<PathBuf>,
    extra: BTreeMap<String, String>,
}

impl std::fmt::Debug for ApplyManifests<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplyManifests")
            .field("path", &self.path)
            .field("files", &self.files)
            .field("base_dir", &self.base_dir)
            .field("extra", &self.extra)
            .finish_non_exhaustive()
    }
}

impl<'a> ApplyManifests<'a> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            files: None,
            renderer: None,
            base_dir: None,
            extra: BTreeMap::new(),
        }
    }

    /// Only load these files from the directory, in this order
    #[must_use]
    pub fn files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    /// Render with `renderer` instead of [`TemplateRenderer`]
    #[must_use]
    pub fn renderer(mut self, renderer: &'a dyn Renderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[must_use]
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Extra template value
    #[must_use]
    pub fn context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    fn resolved_path(&self) -> Result<PathBuf> {
        match &self.base_dir {
            Some(base) if self.path.is_relative() => absolute(&base.join(&self.path)),
            _ => absolute(&self.path),
        }
    }

    fn render_context(&self, ctx: &TestContext) -> RenderContext {
        RenderContext {
            extra: self.extra.clone(),
            ..RenderContext::new(ctx.namespace(), ctx.node_id(), ctx.name())
        }
    }

    /// Load a single manifest file
    pub async fn load_file(&self, ctx: &TestContext) -> Result<Vec<Resource>> {
        let path = self.resolved_path()?;
        let renderer = self.renderer.unwrap_or(&TemplateRenderer);
        let objects = manifest::load_file(&path, renderer, &self.render_context(ctx)).await?;
        wrap_objects(objects)
    }

    /// Load a directory, or the selected files in it
    pub async fn load_dir(&self, ctx: &TestContext) -> Result<Vec<Resource>> {
        let dir = self.resolved_path()?;
        let renderer = self.renderer.unwrap_or(&TemplateRenderer);
        let render_ctx = self.render_context(ctx).dir_path(&dir);

        let objects = match &self.files {
            None => manifest::load_path(&dir, renderer, &render_ctx).await?,
            Some(files) => {
                let mut objects = Vec::new();
                for file in files {
                    objects.extend(manifest::load_file(dir.join(file), renderer, &render_ctx).await?);
                }
                objects
            }
        };
        wrap_objects(objects)
    }
}

/// Load one manifest file and register its objects with `ctx`
///
/// Returns how many objects were registered.
pub async fn apply_manifest(
    ctx: &TestContext,
    path: impl Into<PathBuf>,
    renderer: Option<&dyn Renderer>,
) -> Result<usize> {
    let mut source = ApplyManifests::new(path);
    if let Some(renderer) = renderer {
        source = source.renderer(renderer);
    }
    let resources = source.load_file(ctx).await?;
    let count = resources.len();
    ctx.register_objects(resources).await?;
    info!(namespace = %ctx.namespace(), test = %ctx.name(), objects = count, "Registered manifest");
    Ok(count)
}

/// Load a manifest directory and register its objects with `ctx`
///
/// With `files`, only those files are loaded, in the given order; otherwise
/// every `.yaml`/`.yml` file in name order.
pub async fn apply_manifests(
    ctx: &TestContext,
    dir: impl Into<PathBuf>,
    files: Option<&[&str]>,
    renderer: Option<&dyn Renderer>,
) -> Result<usize> {
    let mut source = ApplyManifests::new(dir);
    if let Some(files) = files {
        source = source.files(files.iter().copied());
    }
    if let Some(renderer) = renderer {
        source = source.renderer(renderer);
    }
    let resources = source.load_dir(ctx).await?;
    let count = resources.len();
    ctx.register_objects(resources).await?;
    info!(namespace = %ctx.namespace(), test = %ctx.name(), objects = count, "Registered manifests");
    Ok(count)
}

/// A single subject, when both kind and name are given
///
/// Neither given is `Ok(None)`; exactly one is an [`Error::Argument`].
pub fn custom_rbac_subject(
    namespace: &str,
    kind: Option<&str>,
    name: Option<&str>,
) -> Result<Option<Subject>> {
    match (kind, name) {
        (Some(kind), Some(name)) => Ok(Some(Subject {
            api_group: Some(RBAC_API_GROUP.to_string()),
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: Some(namespace.to_string()),
        })),
        (None, None) => Ok(None),
        _ => Err(Error::Argument(
            "subject_kind and subject_name must be given together".to_string(),
        )),
    }
}

/// All authenticated users, all unauthenticated users and all service accounts
pub fn default_rbac_subjects(namespace: &str) -> Vec<Subject> {
    DEFAULT_SUBJECT_GROUPS
        .iter()
        .map(|group| Subject {
            api_group: Some(RBAC_API_GROUP.to_string()),
            kind: "Group".to_string(),
            name: (*group).to_string(),
            namespace: Some(namespace.to_string()),
        })
        .collect()
}

fn subjects(namespace: &str, kind: Option<&str>, name: Option<&str>) -> Result<Vec<Subject>> {
    Ok(match custom_rbac_subject(namespace, kind, name)? {
        Some(subject) => vec![subject],
        None => default_rbac_subjects(namespace),
    })
}

fn binding_name(test_name: &str) -> String {
    format!("kubetest:{test_name}")
}

/// RoleBinding `kubetest:<test_name>` in `namespace` for a Role or ClusterRole
pub fn rolebinding(
    test_name: &str,
    namespace: &str,
    role_kind: &str,
    role_name: &str,
    subject_kind: Option<&str>,
    subject_name: Option<&str>,
) -> Result<Resource> {
    let subjects = subjects(namespace, subject_kind, subject_name)?;
    Ok(Resource::new(RoleBinding {
        metadata: ObjectMeta {
            name: Some(binding_name(test_name)),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: RBAC_API_GROUP.to_string(),
            kind: role_kind.to_string(),
            name: role_name.to_string(),
        },
        subjects: Some(subjects),
    }))
}

/// ClusterRoleBinding `kubetest:<test_name>` to a ClusterRole
///
/// `namespace` only scopes the subjects.
pub fn clusterrolebinding(
    test_name: &str,
    namespace: &str,
    role_name: &str,
    subject_kind: Option<&str>,
    subject_name: Option<&str>,
) -> Result<Resource> {
    let subjects = subjects(namespace, subject_kind, subject_name)?;
    Ok(Resource::new(ClusterRoleBinding {
        metadata: ObjectMeta {
            name: Some(binding_name(test_name)),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: RBAC_API_GROUP.to_string(),
            kind: "ClusterRole".to_string(),
            name: role_name.to_string(),
        },
        subjects: Some(subjects),
    }))
}

/// Namespace handling for a test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceMarker {
    /// Create the namespace during setup
    pub create: bool,
    /// Explicit name; `None` allocates one
    pub name: Option<String>,
}

impl Default for NamespaceMarker {
    fn default() -> Self {
        Self {
            create: true,
            name: None,
        }
    }
}

impl NamespaceMarker {
    /// Use an existing namespace, created by someone else
    pub fn existing(name: impl Into<String>) -> Self {
        Self {
            create: false,
            name: Some(name.into()),
        }
    }

    /// Register a context for the test with `manager`
    pub fn apply_to(
        &self,
        manager: &Manager,
        node_id: &str,
        test_name: &str,
        cluster: Option<ClusterConfig>,
    ) -> Arc<TestContext> {
        manager.new_test(node_id, test_name, self.create, self.name.as_deref(), cluster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Object, ResourceKind};

    #[test]
    fn test_custom_subject_requires_both() {
        assert!(custom_rbac_subject("ns", None, None).expect("ok").is_none());
        assert!(matches!(
            custom_rbac_subject("ns", Some("User"), None),
            Err(Error::Argument(_))
        ));
        assert!(matches!(
            custom_rbac_subject("ns", None, Some("alice")),
            Err(Error::Argument(_))
        ));

        let subject = custom_rbac_subject("ns", Some("User"), Some("alice"))
            .expect("ok")
            .expect("subject");
        assert_eq!(subject.kind, "User");
        assert_eq!(subject.namespace.as_deref(), Some("ns"));
        assert_eq!(subject.api_group.as_deref(), Some(RBAC_API_GROUP));
    }

    #[test]
    fn test_default_subjects() {
        let subjects = default_rbac_subjects("ns");
        let names: Vec<_> = subjects.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, DEFAULT_SUBJECT_GROUPS);
        assert!(subjects.iter().all(|s| s.kind == "Group"));
    }

    #[test]
    fn test_rolebinding_defaults_subjects() {
        let binding = rolebinding("test_reads", "ns", "Role", "reader", None, None).expect("binding");
        assert_eq!(binding.kind(), ResourceKind::RoleBinding);
        assert_eq!(binding.name(), "kubetest:test_reads");
        assert_eq!(binding.namespace(), Some("ns"));

        let Object::RoleBinding(rb) = binding.object() else {
            panic!("expected RoleBinding");
        };
        assert_eq!(rb.role_ref.kind, "Role");
        assert_eq!(rb.role_ref.api_group, RBAC_API_GROUP);
        assert_eq!(rb.subjects.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn test_rolebinding_rejects_half_subject() {
        let err = rolebinding("t", "ns", "ClusterRole", "view", Some("User"), None)
            .expect_err("half subject");
        assert!(matches!(err, Error::Argument(_)));
    }

    #[test]
    fn test_clusterrolebinding_is_cluster_scoped() {
        let binding = clusterrolebinding("t", "ns", "admin", Some("ServiceAccount"), Some("default"))
            .expect("binding");
        assert_eq!(binding.namespace(), None);

        let Object::ClusterRoleBinding(crb) = binding.object() else {
            panic!("expected ClusterRoleBinding");
        };
        assert_eq!(crb.role_ref.kind, "ClusterRole");
        assert_eq!(crb.role_ref.name, "admin");
        let subjects = crb.subjects.as_ref().expect("subjects");
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].name, "default");
    }

    #[test]
    fn test_wrap_objects_rejects_unknown_kind() {
        let obj: DynamicObject = serde_json::from_value(serde_json::json!({
            "apiVersion": "example.com/v1",
            "kind": "Widget",
            "metadata": {"name": "w"}
        }))
        .expect("dynamic object");
        let err = wrap_objects(vec![obj]).expect_err("unregistered");
        assert!(matches!(err, Error::UnresolvedKind { kind, .. } if kind == "Widget"));
    }

    #[test]
    fn test_namespace_marker_default_creates() {
        let marker = NamespaceMarker::default();
        assert!(marker.create);
        assert!(marker.name.is_none());

        let manager = Manager::new();
        let ctx = NamespaceMarker::existing("shared").apply_to(
            &manager,
            "node",
            "t",
            Some(ClusterConfig::default()),
        );
        assert_eq!(ctx.namespace(), "shared");
        assert!(!ctx.namespace_create());
    }
}
