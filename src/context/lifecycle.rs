use super::{ContextState, TestContext};
use crate::error::{Error, Result};
use crate::objects::Resource;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::{debug, info, warn};

/// Outcome of [`TestContext::teardown`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Deletions issued (resources plus the namespace, if owned)
    pub attempted: usize,
    /// Deletions that failed
    pub failed: usize,
    /// `resource: error` for each failure
    pub errors: Vec<String>,
}

impl TeardownReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    async fn delete(&mut self, api: &dyn crate::client::ClusterApi, resource: &Resource) {
        self.attempted += 1;
        if let Err(e) = resource.delete(api, None).await {
            warn!(
                resource = %resource.reference(),
                namespace = ?resource.namespace(),
                error = %e,
                "Teardown failed to delete resource, continuing"
            );
            self.failed += 1;
            self.errors.push(format!("{}: {e}", resource.reference()));
        }
    }
}

impl TestContext {
    fn invalid(operation: &'static str, state: ContextState) -> Error {
        Error::InvalidState {
            operation,
            state: state.to_string(),
        }
    }

    /// Create the namespace (if requested) and eagerly registered resources
    ///
    /// Only valid once, from `Uninitialized`. When the namespace was named
    /// explicitly and already exists, it is reused and left alone at
    /// teardown.
    pub async fn setup(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state != ContextState::Uninitialized {
            return Err(Self::invalid("setup", inner.state));
        }
        let api = self.client().await?;

        if self.namespace_create {
            let mut ns = Resource::new(Namespace {
                metadata: ObjectMeta {
                    name: Some(self.namespace.clone()),
                    ..Default::default()
                },
                ..Default::default()
            });
            match ns.create(api, None).await {
                Ok(()) => {
                    info!(namespace = %self.namespace, test = %self.name, "Created namespace");
                    inner.owned_namespace = Some(ns);
                }
                Err(e) if e.is_conflict() && self.namespace_explicit => {
                    info!(namespace = %self.namespace, test = %self.name, "Namespace exists, reusing");
                }
                Err(e) => return Err(e),
            }
        }
        inner.state = ContextState::NamespaceReady;

        if !inner.resources.is_empty() {
            for resource in &mut inner.resources {
                resource.create(api, Some(&self.namespace)).await?;
            }
            inner.state = ContextState::ResourcesRegistered;
        }

        info!(
            namespace = %self.namespace,
            test = %self.name,
            resources = inner.resources.len(),
            "Test context ready"
        );
        Ok(())
    }

    /// Track resources for waiting and teardown
    ///
    /// Nothing is sent to the cluster, except that resources registered
    /// before [`setup`](Self::setup) are created by it. Namespaced resources
    /// without a namespace get the context's.
    pub async fn register_objects<I>(&self, resources: I) -> Result<()>
    where
        I: IntoIterator<Item = Resource>,
    {
        let mut inner = self.inner.lock().await;
        if inner.state == ContextState::TornDown {
            return Err(Self::invalid("register objects", inner.state));
        }

        let before = inner.resources.len();
        for mut resource in resources {
            if resource.kind().is_namespaced() && resource.namespace().is_none() {
                resource.object_mut().meta_mut().namespace = Some(self.namespace.clone());
            }
            debug!(resource = %resource.reference(), namespace = %self.namespace, "Registered");
            inner.resources.push(resource);
        }

        if inner.state == ContextState::NamespaceReady && inner.resources.len() > before {
            inner.state = ContextState::ResourcesRegistered;
        }
        Ok(())
    }

    /// Create a resource in the context namespace, then register it
    pub async fn apply(&self, resource: Resource) -> Result<()> {
        self.apply_all([resource]).await
    }

    /// Create resources in order, registering each once created
    ///
    /// Stops at the first failure; resources created before it stay
    /// registered so teardown still removes them.
    pub async fn apply_all<I>(&self, resources: I) -> Result<()>
    where
        I: IntoIterator<Item = Resource>,
    {
        let mut inner = self.inner.lock().await;
        match inner.state {
            ContextState::NamespaceReady | ContextState::ResourcesRegistered => {}
            state => return Err(Self::invalid("apply", state)),
        }
        let api = self.client().await?;

        for mut resource in resources {
            resource.create(api, Some(&self.namespace)).await?;
            inner.resources.push(resource);
            inner.state = ContextState::ResourcesRegistered;
        }
        Ok(())
    }

    /// Delete registered resources (newest first), then the owned namespace
    ///
    /// Best-effort: failures are logged and counted, never returned. A second
    /// call does nothing. A context that was never set up created nothing,
    /// so tearing it down sends no requests.
    pub async fn teardown(&self) -> Result<TeardownReport> {
        let mut inner = self.inner.lock().await;
        let mut report = TeardownReport::default();

        match inner.state {
            ContextState::TornDown => {
                debug!(namespace = %self.namespace, "Already torn down");
                return Ok(report);
            }
            ContextState::Uninitialized => {
                inner.state = ContextState::TornDown;
                return Ok(report);
            }
            ContextState::NamespaceReady | ContextState::ResourcesRegistered => {}
        }

        let api = self.client().await?;
        for resource in inner.resources.iter().rev() {
            report.delete(api, resource).await;
        }
        if let Some(ns) = inner.owned_namespace.take() {
            report.delete(api, &ns).await;
        }
        inner.state = ContextState::TornDown;

        info!(
            namespace = %self.namespace,
            test = %self.name,
            attempted = report.attempted,
            failed = report.failed,
            "Test context torn down"
        );
        Ok(report)
    }
}
