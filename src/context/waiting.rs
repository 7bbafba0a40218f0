use super::{ContextState, TestContext};
use crate::client::ClusterApi;
use crate::error::{Error, Result};
use crate::objects::Resource;
use crate::wait::{poll_until, PendingResource};
use std::time::Duration;

/// What a registered resource has to reach
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Created,
    Ready,
}

/// Refresh one resource; `Some(state)` while it hasn't reached `target`
async fn pending_state(
    api: &dyn ClusterApi,
    resource: &mut Resource,
    target: Target,
) -> Result<Option<String>> {
    match resource.refresh(api).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => return Ok(Some("not found".to_string())),
        Err(e) => return Err(e),
    }
    if target == Target::Ready && !resource.is_ready() {
        return Ok(Some(resource.state_description()));
    }
    Ok(None)
}

impl TestContext {
    /// Wait until every registered resource exists on the cluster
    ///
    /// A 404 keeps a resource pending; any other error ends the wait. With
    /// `timeout` of `None` this waits forever; otherwise it fails with
    /// [`Error::Timeout`] listing what is still missing.
    pub async fn wait_until_created(
        &self,
        timeout: Option<Duration>,
        interval: Duration,
    ) -> Result<()> {
        self.wait_for(Target::Created, timeout, interval).await
    }

    /// Wait until every registered resource exists and is ready
    pub async fn wait_until_ready(&self, timeout: Option<Duration>, interval: Duration) -> Result<()> {
        self.wait_for(Target::Ready, timeout, interval).await
    }

    /// [`wait_until_created`](Self::wait_until_created) with this context's
    /// [`WaitConfig`](crate::WaitConfig)
    pub async fn wait_created(&self) -> Result<()> {
        self.wait_for(Target::Created, self.wait.timeout, self.wait.interval)
            .await
    }

    /// [`wait_until_ready`](Self::wait_until_ready) with this context's
    /// [`WaitConfig`](crate::WaitConfig)
    pub async fn wait_ready(&self) -> Result<()> {
        self.wait_for(Target::Ready, self.wait.timeout, self.wait.interval)
            .await
    }

    async fn wait_for(
        &self,
        target: Target,
        timeout: Option<Duration>,
        interval: Duration,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state == ContextState::TornDown {
            return Err(Error::InvalidState {
                operation: "wait",
                state: inner.state.to_string(),
            });
        }
        let api = self.client().await?;

        let what = match target {
            Target::Created => format!("{} resources to be created in {}", inner.resources.len(), self.namespace),
            Target::Ready => format!("{} resources to be ready in {}", inner.resources.len(), self.namespace),
        };
        let mut state = (api, &mut inner.resources);

        poll_until(&what, timeout, interval, &mut state, move |(api, resources)| {
            Box::pin(async move {
                let mut pending = Vec::new();
                for resource in resources.iter_mut() {
                    if let Some(state) = pending_state(*api, resource, target).await? {
                        pending.push(PendingResource::new(resource.reference(), state));
                    }
                }
                Ok(pending)
            })
        })
        .await
    }
}
