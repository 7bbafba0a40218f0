//! Test namespace naming
//!
//! Namespaces look like `kubetest-<8 hex>-<unix seconds>[-<slug>]`, where the
//! slug is derived from the test name. The result is always a valid DNS label
//! (at most 63 characters, lowercase alphanumerics and `-`, no `-` at either
//! end). The random id and the clock are injectable so names can be
//! reproduced in tests.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use uuid::Uuid;

/// Maximum length of a DNS-1123 label
pub const DNS_LABEL_MAX: usize = 63;

const PREFIX: &str = "kubetest";

static INVALID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]+").expect("static regex is valid"));
static REPEATED_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-{2,}").expect("static regex is valid"));

type IdSource = Arc<dyn Fn() -> Uuid + Send + Sync>;
type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Generates namespace names from a random id source and a clock
#[derive(Clone)]
pub struct NamespaceAllocator {
    ids: IdSource,
    clock: Clock,
}

impl Default for NamespaceAllocator {
    fn default() -> Self {
        Self {
            ids: Arc::new(Uuid::new_v4),
            clock: Arc::new(|| chrono::Utc::now().timestamp()),
        }
    }
}

impl std::fmt::Debug for NamespaceAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceAllocator").finish_non_exhaustive()
    }
}

impl NamespaceAllocator {
    /// Use custom id and clock sources
    ///
    /// ```
    /// use kubetest::namespace::NamespaceAllocator;
    /// use uuid::Uuid;
    ///
    /// let ids = || Uuid::parse_str("a80ebe94-49f0-46f5-afe1-94503a3d265b").unwrap();
    /// let alloc = NamespaceAllocator::with_sources(ids, || 1536849367);
    /// assert_eq!(alloc.allocate("TestName"), "kubetest-a80ebe94-1536849367-testname");
    /// ```
    pub fn with_sources<I, C>(ids: I, clock: C) -> Self
    where
        I: Fn() -> Uuid + Send + Sync + 'static,
        C: Fn() -> i64 + Send + Sync + 'static,
    {
        Self {
            ids: Arc::new(ids),
            clock: Arc::new(clock),
        }
    }

    /// Allocate a namespace name for the given test
    pub fn allocate(&self, test_name: &str) -> String {
        let id = (self.ids)().simple().to_string();
        let base = format!("{PREFIX}-{}-{}", &id[..8], (self.clock)());

        // Room left for "-<slug>"; the prefix is never truncated.
        let budget = DNS_LABEL_MAX.saturating_sub(base.len() + 1);
        let slug = slugify(test_name, budget);

        if slug.is_empty() {
            base
        } else {
            format!("{base}-{slug}")
        }
    }
}

/// Lowercase `name`, squeeze everything outside `[a-z0-9-]` into single
/// dashes, and trim to at most `max_len` characters without edge dashes
pub(crate) fn slugify(name: &str, max_len: usize) -> String {
    let lowered = name.to_lowercase();
    let replaced = INVALID_CHARS.replace_all(&lowered, "-");
    let collapsed = REPEATED_DASH.replace_all(&replaced, "-");
    let trimmed = collapsed.trim_matches('-');

    // Only ASCII is left at this point, so byte slicing is safe.
    let truncated = &trimmed[..trimmed.len().min(max_len)];
    truncated.trim_matches('-').to_string()
}

/// Generate a namespace name for a test using the default id and clock sources
pub fn new_namespace(test_name: &str) -> String {
    NamespaceAllocator::default().allocate(test_name)
}

/// Whether `name` is a valid DNS-1123 label
#[must_use]
pub fn is_dns_label(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= DNS_LABEL_MAX
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !name.starts_with('-')
        && !name.ends_with('-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed() -> NamespaceAllocator {
        NamespaceAllocator::with_sources(
            || Uuid::parse_str("a80ebe94-49f0-46f5-afe1-94503a3d265b").expect("valid uuid"),
            || 1_536_849_367,
        )
    }

    #[test]
    fn test_new_namespace_slugs() {
        let cases = [
            ("", "kubetest-a80ebe94-1536849367"),
            ("TestName", "kubetest-a80ebe94-1536849367-testname"),
            ("TESTNAME", "kubetest-a80ebe94-1536849367-testname"),
            ("Test-Name", "kubetest-a80ebe94-1536849367-test-name"),
            ("Test1_FOO-BAR_2", "kubetest-a80ebe94-1536849367-test1-foo-bar-2"),
            ("123456", "kubetest-a80ebe94-1536849367-123456"),
            ("___", "kubetest-a80ebe94-1536849367"),
            ("test[a]-foo", "kubetest-a80ebe94-1536849367-test-a-foo"),
            ("my-test", "kubetest-a80ebe94-1536849367-my-test"),
        ];

        let alloc = fixed();
        for (name, expected) in cases {
            assert_eq!(alloc.allocate(name), expected, "test name {name:?}");
        }
    }

    #[test]
    fn test_long_names_truncate_slug_only() {
        let ns = fixed().allocate(&"test-".repeat(14));
        assert_eq!(ns, "kubetest-a80ebe94-1536849367-test-test-test-test-test-test-test");
        assert_eq!(ns.len(), DNS_LABEL_MAX);

        let ns = fixed().allocate(&"x".repeat(200));
        assert!(ns.starts_with("kubetest-a80ebe94-1536849367-"));
        assert_eq!(ns.len(), DNS_LABEL_MAX);
    }

    #[test]
    fn test_truncation_never_leaves_trailing_dash() {
        // 33 chars then a dash lands exactly on the truncation boundary
        let name = format!("{}-{}", "a".repeat(33), "b".repeat(20));
        let ns = fixed().allocate(&name);
        assert!(is_dns_label(&ns), "{ns}");
        assert!(!ns.ends_with('-'));
    }

    #[test]
    fn test_always_dns_label() {
        let names = [
            "",
            "UPPER",
            "with spaces and $ymbols!",
            "ünïcødé-テスト",
            "---leading-and-trailing---",
            "tests/test_mod.py::TestClass::test_case[param-1]",
            &"Long_Name-".repeat(30),
        ];
        let alloc = NamespaceAllocator::default();
        for name in names {
            let ns = alloc.allocate(name);
            assert!(is_dns_label(&ns), "{name:?} produced invalid namespace {ns:?}");
        }
    }

    #[test]
    fn test_deterministic_with_same_sources() {
        assert_eq!(fixed().allocate("my-test"), fixed().allocate("my-test"));
    }

    #[test]
    fn test_different_timestamps_differ() {
        let id = || Uuid::parse_str("a80ebe94-49f0-46f5-afe1-94503a3d265b").expect("valid uuid");
        let first = NamespaceAllocator::with_sources(id, || 100).allocate("same");
        let second = NamespaceAllocator::with_sources(id, || 101).allocate("same");
        assert_ne!(first, second);
    }

    #[test]
    fn test_is_dns_label() {
        assert!(is_dns_label("kubetest-abc-123"));
        assert!(!is_dns_label(""));
        assert!(!is_dns_label("-abc"));
        assert!(!is_dns_label("abc-"));
        assert!(!is_dns_label("ABC"));
        assert!(!is_dns_label(&"a".repeat(64)));
    }
}
