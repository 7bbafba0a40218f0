//! Registry of test contexts for one test session
//!
//! Construct one [`Manager`] per session and pass it around; there is no
//! global instance. Contexts are keyed by the host framework's node id.

use crate::client::ClusterApi;
use crate::config::{ClusterConfig, WaitConfig};
use crate::context::TestContext;
use crate::namespace::NamespaceAllocator;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Node id → [`TestContext`]
#[derive(Default)]
pub struct Manager {
    nodes: RwLock<HashMap<String, Arc<TestContext>>>,
    client: Option<Arc<dyn ClusterApi>>,
    allocator: NamespaceAllocator,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("nodes", &self.node_ids())
            .field("shared_client", &self.client.is_some())
            .finish_non_exhaustive()
    }
}

impl Manager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every context this manager creates to `api`
    pub fn with_client(api: Arc<dyn ClusterApi>) -> Self {
        Self {
            client: Some(api),
            ..Self::default()
        }
    }

    /// Name namespaces with `allocator` instead of the random/clock default
    #[must_use]
    pub fn with_allocator(mut self, allocator: NamespaceAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    /// Create a context and store it under `node_id`
    ///
    /// `namespace_name` of `None` allocates a fresh namespace from `name`.
    /// `cluster` of `None` uses the ambient kubeconfig. Wait defaults come
    /// from `KUBETEST_WAIT_TIMEOUT`. An existing entry for `node_id` is
    /// replaced.
    pub fn new_test(
        &self,
        node_id: &str,
        name: &str,
        namespace_create: bool,
        namespace_name: Option<&str>,
        cluster: Option<ClusterConfig>,
    ) -> Arc<TestContext> {
        let cluster = cluster.unwrap_or_else(ClusterConfig::from_env);
        let mut ctx = TestContext::with_allocator(
            node_id,
            name,
            namespace_create,
            namespace_name,
            cluster,
            &self.allocator,
        )
        .with_wait_config(WaitConfig::from_env());
        if let Some(api) = &self.client {
            ctx = ctx.with_client(Arc::clone(api));
        }
        let ctx = Arc::new(ctx);

        let previous = self
            .nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(node_id.to_string(), Arc::clone(&ctx));
        if let Some(previous) = previous {
            warn!(
                node_id = %node_id,
                replaced_namespace = %previous.namespace(),
                "Node id registered twice, replacing context"
            );
        }
        debug!(node_id = %node_id, namespace = %ctx.namespace(), "Registered test context");
        ctx
    }

    /// The context stored under `node_id`, if any
    pub fn get_test(&self, node_id: &str) -> Option<Arc<TestContext>> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(node_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered node ids, sorted
    pub fn node_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}
