use super::TestContext;
use crate::error::Result;
use crate::objects::Resource;
use crate::ownership;

impl TestContext {
    /// Pods owned by `workload`, resolved through intermediate controllers
    ///
    /// ```ignore
    /// let deployment = ctx.resource(ResourceKind::Deployment, "web").await.unwrap();
    /// let pods = ctx.get_pods(&deployment).await?;
    /// assert_eq!(pods.len(), 3);
    /// ```
    pub async fn get_pods(&self, workload: &Resource) -> Result<Vec<Resource>> {
        let api = self.client().await?;
        ownership::get_pods(api, workload).await
    }
}
