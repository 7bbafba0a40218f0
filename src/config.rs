//! Configuration types for kubetest
//!
//! Build them programmatically, or pick them up from the environment.
//! There are no config files.
//!
//! # Example
//!
//! ```
//! use kubetest::config::{ClusterConfig, WaitConfig};
//! use std::time::Duration;
//!
//! let cluster = ClusterConfig::new("staging")
//!     .kubeconfig("/home/me/.kube/staging")
//!     .context("staging-admin");
//!
//! let wait = WaitConfig::default().timeout(Duration::from_secs(120));
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// Env var naming the kubeconfig file
pub const ENV_KUBECONFIG: &str = "KUBECONFIG";
/// Env var naming the kubeconfig context to use
pub const ENV_CONTEXT: &str = "KUBETEST_CONTEXT";
/// Env var with the default wait timeout, in seconds
pub const ENV_WAIT_TIMEOUT: &str = "KUBETEST_WAIT_TIMEOUT";
/// When set, test namespaces are never torn down
pub const ENV_KEEP_ALL: &str = "KUBETEST_KEEP_ALL";

/// How to reach a cluster
///
/// With neither `kubeconfig` nor `context` set, the ambient configuration
/// is used (in-cluster service account, then `~/.kube/config`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Display name, used in logs
    pub name: String,

    /// Explicit kubeconfig path
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context
    pub context: Option<String>,
}

impl ClusterConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set kubeconfig path
    pub fn kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Set kubeconfig context
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Whether this is the ambient default configuration
    #[must_use]
    pub fn is_ambient(&self) -> bool {
        self.kubeconfig.is_none() && self.context.is_none()
    }

    /// Read `KUBECONFIG` and `KUBETEST_CONTEXT`
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        // KUBECONFIG may be a path list; only the first entry is used.
        let kubeconfig = non_empty(ENV_KUBECONFIG).and_then(|paths| {
            std::env::split_paths(&paths)
                .find(|p| !p.as_os_str().is_empty())
        });

        Self {
            name: "default".to_string(),
            kubeconfig,
            context: non_empty(ENV_CONTEXT),
        }
    }
}

/// Defaults for wait operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    /// `None` waits forever
    pub timeout: Option<Duration>,

    /// Delay between polls
    pub interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            interval: Duration::from_secs(1),
        }
    }
}

impl WaitConfig {
    /// Set timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set poll interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Read `KUBETEST_WAIT_TIMEOUT`; unparseable values are ignored
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let timeout = var(ENV_WAIT_TIMEOUT)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        Self {
            timeout,
            ..Default::default()
        }
    }
}

/// Whether `KUBETEST_KEEP_ALL` asks to keep every namespace
pub fn keep_all() -> bool {
    std::env::var(ENV_KEEP_ALL)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(false)
}

/// y/yes/t/true/on/1 or n/no/f/false/off/0, any case; `None` for anything else
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_cluster_config_builder() {
        let config = ClusterConfig::new("prod")
            .kubeconfig("/etc/kube/prod")
            .context("prod-context");

        assert_eq!(config.name, "prod");
        assert_eq!(config.kubeconfig, Some(PathBuf::from("/etc/kube/prod")));
        assert_eq!(config.context, Some("prod-context".to_string()));
        assert!(!config.is_ambient());
        assert!(ClusterConfig::new("x").is_ambient());
    }

    #[test]
    fn test_cluster_config_from_vars() {
        let config = ClusterConfig::from_vars(vars(&[
            (ENV_KUBECONFIG, "/tmp/kubeconfig"),
            (ENV_CONTEXT, "kind-test"),
        ]));
        assert_eq!(config.kubeconfig, Some(PathBuf::from("/tmp/kubeconfig")));
        assert_eq!(config.context.as_deref(), Some("kind-test"));
    }

    #[test]
    fn test_cluster_config_from_empty_vars_is_ambient() {
        let config = ClusterConfig::from_vars(vars(&[(ENV_KUBECONFIG, ""), (ENV_CONTEXT, "  ")]));
        assert!(config.is_ambient());
    }

    #[test]
    fn test_wait_config_defaults() {
        let wait = WaitConfig::default();
        assert_eq!(wait.timeout, None);
        assert_eq!(wait.interval, Duration::from_secs(1));

        let wait = wait.timeout(Duration::from_secs(30)).interval(Duration::from_millis(250));
        assert_eq!(wait.timeout, Some(Duration::from_secs(30)));
        assert_eq!(wait.interval, Duration::from_millis(250));
    }

    #[test]
    fn test_wait_config_from_vars() {
        let wait = WaitConfig::from_vars(vars(&[(ENV_WAIT_TIMEOUT, "90")]));
        assert_eq!(wait.timeout, Some(Duration::from_secs(90)));

        let wait = WaitConfig::from_vars(vars(&[(ENV_WAIT_TIMEOUT, "soon")]));
        assert_eq!(wait.timeout, None);
    }

    #[test]
    fn test_parse_bool() {
        for v in ["1", "true", "TRUE", "yes", "on", " y ", "t"] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["0", "false", "No", "off", "n", "f"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        for v in ["", "maybe", "2"] {
            assert_eq!(parse_bool(v), None, "{v}");
        }
    }
}
