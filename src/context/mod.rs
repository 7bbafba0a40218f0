//! Per-test state
//!
//! A [`TestContext`] owns one test case's namespace and the resources the
//! test registered. It moves through
//! `Uninitialized → NamespaceReady → ResourcesRegistered → TornDown`:
//!
//! - [`setup`](TestContext::setup) creates the namespace (when asked to) and
//!   any resources registered before it ran
//! - [`register_objects`](TestContext::register_objects) tracks resources
//!   for waiting and teardown; [`apply`](TestContext::apply) creates and
//!   tracks in one step
//! - [`teardown`](TestContext::teardown) deletes everything in reverse
//!   registration order, then the namespace if this context created it
//!
//! The cluster connection is made lazily on first use, so contexts can be
//! built (and inspected) without a reachable cluster.
//!
//! # Example
//!
//! ```ignore
//! use kubetest::{ClusterConfig, TestContext};
//!
//! let ctx = TestContext::new("tests::smoke", "smoke", true, None, ClusterConfig::from_env());
//! ctx.setup().await?;
//! ctx.apply(deployment.into()).await?;
//! ctx.wait_until_ready(Some(Duration::from_secs(120)), Duration::from_secs(1)).await?;
//! let report = ctx.teardown().await?;
//! assert!(report.is_clean());
//! ```

#![allow(clippy::missing_errors_doc)]

mod lifecycle;
mod waiting;
mod workload;

pub use lifecycle::TeardownReport;

use crate::client::{ClusterApi, KubeClusterApi};
use crate::config::{ClusterConfig, WaitConfig};
use crate::error::Result;
use crate::namespace::NamespaceAllocator;
use crate::objects::{Resource, ResourceKind};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Where a [`TestContext`] is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Uninitialized,
    NamespaceReady,
    ResourcesRegistered,
    TornDown,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContextState::Uninitialized => "uninitialized",
            ContextState::NamespaceReady => "namespace-ready",
            ContextState::ResourcesRegistered => "resources-registered",
            ContextState::TornDown => "torn-down",
        };
        f.write_str(s)
    }
}

struct Inner {
    state: ContextState,
    resources: Vec<Resource>,
    /// The namespace object, when this context created it
    owned_namespace: Option<Resource>,
}

/// One test case's namespace, cluster binding and registered resources
pub struct TestContext {
    node_id: String,
    name: String,
    namespace: String,
    namespace_create: bool,
    namespace_explicit: bool,
    cluster: ClusterConfig,
    wait: WaitConfig,
    client: OnceCell<Arc<dyn ClusterApi>>,
    inner: Mutex<Inner>,
}

impl fmt::Debug for TestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestContext")
            .field("node_id", &self.node_id)
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("namespace_create", &self.namespace_create)
            .field("cluster", &self.cluster.name)
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}

impl TestContext {
    /// Build a context; `namespace` of `None` (or empty) allocates a fresh one
    pub fn new(
        node_id: impl Into<String>,
        name: impl Into<String>,
        namespace_create: bool,
        namespace: Option<&str>,
        cluster: ClusterConfig,
    ) -> Self {
        Self::with_allocator(
            node_id,
            name,
            namespace_create,
            namespace,
            cluster,
            &NamespaceAllocator::default(),
        )
    }

    /// Like [`new`](Self::new), naming the namespace with `allocator`
    pub fn with_allocator(
        node_id: impl Into<String>,
        name: impl Into<String>,
        namespace_create: bool,
        namespace: Option<&str>,
        cluster: ClusterConfig,
        allocator: &NamespaceAllocator,
    ) -> Self {
        let name = name.into();
        let explicit = namespace.filter(|ns| !ns.is_empty());
        let namespace = match explicit {
            Some(ns) => ns.to_string(),
            None => allocator.allocate(&name),
        };

        Self {
            node_id: node_id.into(),
            name,
            namespace,
            namespace_create,
            namespace_explicit: explicit.is_some(),
            cluster,
            wait: WaitConfig::default(),
            client: OnceCell::new(),
            inner: Mutex::new(Inner {
                state: ContextState::Uninitialized,
                resources: Vec::new(),
                owned_namespace: None,
            }),
        }
    }

    /// Context for a test function: fresh namespace, cluster and wait
    /// defaults from the environment
    pub fn for_test(node_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(node_id, name, true, None, ClusterConfig::from_env())
            .with_wait_config(WaitConfig::from_env())
    }

    /// Timeout and poll interval for [`wait_created`](Self::wait_created)
    /// and [`wait_ready`](Self::wait_ready)
    #[must_use]
    pub fn with_wait_config(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// Bind to an existing connection instead of connecting lazily
    #[must_use]
    pub fn with_client(mut self, api: Arc<dyn ClusterApi>) -> Self {
        self.client = OnceCell::new_with(Some(api));
        self
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The namespace; fixed for the life of the context
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn namespace_create(&self) -> bool {
        self.namespace_create
    }

    pub fn cluster(&self) -> &ClusterConfig {
        &self.cluster
    }

    pub fn wait_config(&self) -> &WaitConfig {
        &self.wait
    }

    pub async fn state(&self) -> ContextState {
        self.inner.lock().await.state
    }

    /// Snapshot of the registered resources, in registration order
    pub async fn resources(&self) -> Vec<Resource> {
        self.inner.lock().await.resources.clone()
    }

    /// A registered resource by kind and name
    pub async fn resource(&self, kind: ResourceKind, name: &str) -> Option<Resource> {
        self.inner
            .lock()
            .await
            .resources
            .iter()
            .find(|r| r.kind() == kind && r.name() == name)
            .cloned()
    }

    /// The cluster connection, connecting on first use
    pub async fn client(&self) -> Result<&dyn ClusterApi> {
        let api = self
            .client
            .get_or_try_init(|| async {
                let api = KubeClusterApi::connect(&self.cluster).await?;
                Ok::<_, crate::Error>(Arc::new(api) as Arc<dyn ClusterApi>)
            })
            .await?;
        Ok(api.as_ref())
    }
}
