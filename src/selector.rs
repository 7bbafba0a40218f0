//! Label selector strings
//!
//! Converts label constraints into the query-string form the API server
//! accepts in `labelSelector`:
//!
//! - `{"app": "web"}` → `app=web`
//! - `In` / `NotIn` → `tier in (a,b)` / `tier notin (a,b)`
//! - `Exists` / `DoesNotExist` → `tier` / `!tier`
//!
//! An empty selector is the empty string, which the API server treats as
//! "match everything".

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use std::fmt::Display;
use tracing::warn;

/// Render equality labels as `k1=v1,k2=v2`, in iteration order
///
/// Values only need to implement `Display`, so numbers render as written
/// (`2.024` → `"2.024"`).
pub fn selector_string<I, K, V>(labels: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Display,
    V: Display,
{
    labels
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render a single match expression, or `None` for an unsupported operator
fn expression_term(expr: &LabelSelectorRequirement) -> Option<String> {
    let key = &expr.key;
    let values = expr.values.as_deref().unwrap_or_default().join(",");

    match expr.operator.as_str() {
        "In" => Some(format!("{key} in ({values})")),
        "NotIn" => Some(format!("{key} notin ({values})")),
        "Exists" => Some(key.clone()),
        "DoesNotExist" => Some(format!("!{key}")),
        other => {
            warn!(key = %key, operator = %other, "Unsupported match expression operator, dropping term");
            None
        }
    }
}

/// Build a selector from equality labels followed by match expressions
///
/// Terms with an unknown operator are dropped with a warning; one bad
/// expression never fails the whole selector.
pub fn build_selector<I, K, V>(labels: I, match_expressions: &[LabelSelectorRequirement]) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Display,
    V: Display,
{
    let mut parts: Vec<String> = labels.into_iter().map(|(k, v)| format!("{k}={v}")).collect();
    parts.extend(match_expressions.iter().filter_map(expression_term));
    parts.join(",")
}

/// Render a Kubernetes `LabelSelector` (matchLabels + matchExpressions)
pub fn label_selector_string(selector: &LabelSelector) -> String {
    let labels = selector.match_labels.iter().flatten();
    let expressions = selector.match_expressions.as_deref().unwrap_or_default();
    build_selector(labels, expressions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn expr(key: &str, operator: &str, values: &[&str]) -> LabelSelectorRequirement {
        LabelSelectorRequirement {
            key: key.to_string(),
            operator: operator.to_string(),
            values: if values.is_empty() {
                None
            } else {
                Some(values.iter().map(|v| (*v).to_string()).collect())
            },
        }
    }

    #[test]
    fn test_selector_string_empty() {
        let labels: Vec<(&str, &str)> = vec![];
        assert_eq!(selector_string(labels), "");
        assert_eq!(build_selector(Vec::<(&str, &str)>::new(), &[]), "");
    }

    #[test]
    fn test_selector_string_preserves_insertion_order() {
        assert_eq!(selector_string([("foo", "bar")]), "foo=bar");
        assert_eq!(
            selector_string([("foo", "bar"), ("abc", "xyz")]),
            "foo=bar,abc=xyz"
        );
        assert_eq!(
            selector_string([("foo", "bar"), ("abc", "xyz"), ("app", "synse")]),
            "foo=bar,abc=xyz,app=synse"
        );
    }

    #[test]
    fn test_selector_string_numeric_values() {
        assert_eq!(selector_string([("foo", 2)]), "foo=2");
        assert_eq!(selector_string([("foo", 2.024)]), "foo=2.024");
    }

    #[test]
    fn test_in_expression() {
        let exprs = [expr("tier", "In", &["frontend", "backend"])];
        assert_eq!(
            build_selector(Vec::<(&str, &str)>::new(), &exprs),
            "tier in (frontend,backend)"
        );
    }

    #[test]
    fn test_all_operators_after_labels() {
        let exprs = [
            expr("env", "NotIn", &["prod"]),
            expr("canary", "Exists", &[]),
            expr("legacy", "DoesNotExist", &[]),
        ];
        assert_eq!(
            build_selector([("app", "web")], &exprs),
            "app=web,env notin (prod),canary,!legacy"
        );
    }

    #[test]
    fn test_unknown_operator_is_dropped() {
        let exprs = [expr("tier", "Matches", &["front*"]), expr("app", "Exists", &[])];
        assert_eq!(build_selector(Vec::<(&str, &str)>::new(), &exprs), "app");
    }

    #[test]
    fn test_label_selector_string() {
        let mut match_labels = BTreeMap::new();
        match_labels.insert("app".to_string(), "web".to_string());
        let selector = LabelSelector {
            match_labels: Some(match_labels),
            match_expressions: Some(vec![expr("tier", "In", &["frontend"])]),
        };
        assert_eq!(label_selector_string(&selector), "app=web,tier in (frontend)");
        assert_eq!(label_selector_string(&LabelSelector::default()), "");
    }
}
