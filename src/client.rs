//! The cluster seam
//!
//! Everything kubetest does against a cluster goes through [`ClusterApi`]:
//! six verbs over untyped objects addressed by an [`ApiResource`]. The
//! real implementation wraps a `kube::Client`; tests use
//! [`FakeCluster`](crate::testing::FakeCluster).

use crate::config::ClusterConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{
    Api, ApiResource, DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams,
};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, info};

/// Minimal API surface kubetest needs from a cluster
///
/// `namespace` is `None` for cluster-scoped kinds (and for listing across
/// all namespaces). Errors from the server come back as
/// [`Error::Api`](crate::Error::Api) with the HTTP status preserved.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Create an object and return the server's copy
    async fn create(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        obj: &DynamicObject,
    ) -> Result<DynamicObject>;

    /// Read an object by name
    async fn get(&self, ar: &ApiResource, namespace: Option<&str>, name: &str)
        -> Result<DynamicObject>;

    /// Request deletion of an object by name
    async fn delete(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        name: &str,
        params: &DeleteParams,
    ) -> Result<()>;

    /// Apply a JSON merge patch and return the patched object
    async fn patch(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<DynamicObject>;

    /// List objects matching a label selector (empty selector matches all)
    async fn list(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        selector: &str,
    ) -> Result<Vec<DynamicObject>>;

    /// List only the metadata of every object of a kind
    async fn list_metadata(&self, ar: &ApiResource, namespace: Option<&str>)
        -> Result<Vec<ObjectMeta>>;
}

/// [`ClusterApi`] backed by a real `kube::Client`
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the given cluster configuration
    pub async fn connect(config: &ClusterConfig) -> Result<Self> {
        Ok(Self::new(connect(config).await?))
    }

    /// The underlying client, for calls kubetest doesn't wrap
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn api(&self, ar: &ApiResource, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, ar),
            None => Api::all_with(self.client.clone(), ar),
        }
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn create(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        obj: &DynamicObject,
    ) -> Result<DynamicObject> {
        let created = self
            .api(ar, namespace)
            .create(&PostParams::default(), obj)
            .await?;
        Ok(created)
    }

    async fn get(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject> {
        Ok(self.api(ar, namespace).get(name).await?)
    }

    async fn delete(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        name: &str,
        params: &DeleteParams,
    ) -> Result<()> {
        // The response is either the object (finalizers pending) or a Status;
        // both mean the request was accepted.
        self.api(ar, namespace).delete(name, params).await?;
        Ok(())
    }

    async fn patch(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<DynamicObject> {
        debug!(kind = %ar.kind, namespace = ?namespace, name, "Patching object");
        let patched = self
            .api(ar, namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        Ok(patched)
    }

    async fn list(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        selector: &str,
    ) -> Result<Vec<DynamicObject>> {
        let mut params = ListParams::default();
        if !selector.is_empty() {
            params = params.labels(selector);
        }
        debug!(kind = %ar.kind, namespace = ?namespace, selector, "Listing objects");
        let list = self.api(ar, namespace).list(&params).await?;
        Ok(list.items)
    }

    async fn list_metadata(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
    ) -> Result<Vec<ObjectMeta>> {
        let list = self
            .api(ar, namespace)
            .list_metadata(&ListParams::default())
            .await?;
        Ok(list.items.into_iter().map(|item| item.metadata).collect())
    }
}

/// Build a `kube::Client` from a [`ClusterConfig`]
///
/// The ambient configuration goes through `Client::try_default`; an explicit
/// kubeconfig path or context is loaded with `Kubeconfig` so the context can
/// be selected.
pub async fn connect(config: &ClusterConfig) -> Result<Client> {
    if config.is_ambient() {
        let client = Client::try_default().await?;
        info!(cluster = %config.name, "Connected using ambient kubeconfig");
        return Ok(client);
    }

    let kubeconfig = match &config.kubeconfig {
        Some(path) => Kubeconfig::read_from(path).map_err(|e| {
            Error::Client(format!("failed to read kubeconfig {}: {e}", path.display()))
        })?,
        None => Kubeconfig::read()
            .map_err(|e| Error::Client(format!("failed to read kubeconfig: {e}")))?,
    };

    let options = KubeConfigOptions {
        context: config.context.clone(),
        ..Default::default()
    };
    let kube_config = Config::from_custom_kubeconfig(kubeconfig, &options)
        .await
        .map_err(|e| Error::Client(format!("invalid kubeconfig: {e}")))?;
    let client = Client::try_from(kube_config)?;

    info!(
        cluster = %config.name,
        context = ?config.context,
        kubeconfig = ?config.kubeconfig,
        "Connected to cluster"
    );
    Ok(client)
}
