//! kubetest - Kubernetes integration testing
//!
//! Each test case gets a [`TestContext`]: an ephemeral namespace, the
//! resources the test declared, and a lifecycle that waits on them and tears
//! them down afterwards. Contexts for a session are kept in a [`Manager`].
//!
//! Resources are [`Resource`] values over a static registry of kinds
//! ([`ResourceKind`]). Anything loaded from a manifest that isn't in the
//! registry is rejected with [`Error::UnresolvedKind`].
//!
//! [`ownership`] answers "which pods belong to this workload" by walking
//! owner references through ReplicaSets and Jobs, so workloads that share
//! labels don't see each other's pods.
//!
//! # Example
//!
//! ```no_run
//! use kubetest::{markers, Manager};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> kubetest::Result<()> {
//!     let manager = Manager::new();
//!     let ctx = manager.new_test("tests::web", "web", true, None, None);
//!
//!     markers::apply_manifest(&ctx, "manifests/web.yaml", None).await?;
//!     ctx.setup().await?;
//!     ctx.wait_until_ready(Some(Duration::from_secs(120)), Duration::from_secs(1)).await?;
//!
//!     let report = ctx.teardown().await?;
//!     assert!(report.is_clean());
//!     Ok(())
//! }
//! ```
//!
//! # With the test macro
//!
//! ```ignore
//! use kubetest::TestContext;
//!
//! #[kubetest::test]
//! async fn test_web(ctx: TestContext) -> kubetest::Result<()> {
//!     kubetest::markers::apply_manifest(&ctx, "manifests/web.yaml", None).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod manager;
pub mod manifest;
pub mod markers;
pub mod namespace;
pub mod objects;
pub mod ownership;
pub mod selector;
pub mod telemetry;
pub mod testing;
pub mod wait;

// Re-export commonly used types
pub use client::{ClusterApi, KubeClusterApi};
pub use config::{ClusterConfig, WaitConfig};
pub use context::{ContextState, TeardownReport, TestContext};
pub use error::{ApiError, Error, Result};
pub use manager::Manager;
pub use namespace::new_namespace;
pub use objects::{Deletion, Object, Resource, ResourceKind};
pub use ownership::{get_pods, OwnershipPolicy};
pub use selector::build_selector;
pub use wait::{PendingResource, WaitError};

pub use kubetest_macros::test;

#[doc(hidden)]
pub mod __private {
    pub use futures;
}
