//! Manifest loading and template rendering
//!
//! Manifests are read as text, passed through a [`Renderer`] with a
//! [`RenderContext`], then split into YAML documents. Empty documents are
//! skipped. Every remaining document must carry `kind` and `apiVersion`.
//!
//! ```ignore
//! let ctx = RenderContext::new("kubetest-ab12cd34-1700000000-smoke", "tests::smoke", "smoke");
//! let objs = load_file("manifests/web.yaml", &TemplateRenderer, &ctx).await?;
//! ```

use crate::error::{Error, Result};
use kube::api::DynamicObject;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("static regex is valid")
});

/// Values available to templates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    pub namespace: String,
    pub test_node_id: String,
    pub test_name: String,
    /// Set for directory loads
    pub dir_path: Option<PathBuf>,
    /// Additional user keys; the built-in keys win on collision
    pub extra: BTreeMap<String, String>,
}

impl RenderContext {
    pub fn new(
        namespace: impl Into<String>,
        test_node_id: impl Into<String>,
        test_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            test_node_id: test_node_id.into(),
            test_name: test_name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn dir_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir_path = Some(dir.into());
        self
    }

    /// Add a user key
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "namespace" => Some(self.namespace.clone()),
            "test_node_id" => Some(self.test_node_id.clone()),
            "test_name" => Some(self.test_name.clone()),
            "dir_path" => self.dir_path.as_ref().map(|p| p.display().to_string()),
            other => self.extra.get(other).cloned(),
        }
    }
}

/// Turns a manifest template into YAML text
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, ctx: &RenderContext) -> Result<String>;
}

impl<F> Renderer for F
where
    F: Fn(&str, &RenderContext) -> Result<String> + Send + Sync,
{
    fn render(&self, template: &str, ctx: &RenderContext) -> Result<String> {
        self(template, ctx)
    }
}

/// Replaces `{{ key }}` with context values; unknown keys are left as written
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl Renderer for TemplateRenderer {
    fn render(&self, template: &str, ctx: &RenderContext) -> Result<String> {
        let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
            ctx.get(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        });
        Ok(rendered.into_owned())
    }
}

/// No substitution
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRenderer;

impl Renderer for PassthroughRenderer {
    fn render(&self, template: &str, _ctx: &RenderContext) -> Result<String> {
        Ok(template.to_string())
    }
}

fn manifest_error(path: &Path, reason: impl ToString) -> Error {
    Error::Manifest {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Parse rendered YAML text into objects
///
/// `source` is only used in error messages.
pub fn parse_documents(source: &Path, text: &str) -> Result<Vec<DynamicObject>> {
    let mut objects = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = serde_json::Value::deserialize(document)
            .map_err(|e| manifest_error(source, format!("document {index}: {e}")))?;
        if value.is_null() {
            continue;
        }

        for field in ["kind", "apiVersion"] {
            if value.get(field).and_then(|v| v.as_str()).is_none() {
                return Err(manifest_error(
                    source,
                    format!("document {index} has no {field}"),
                ));
            }
        }

        let obj: DynamicObject = serde_json::from_value(value)
            .map_err(|e| manifest_error(source, format!("document {index}: {e}")))?;
        objects.push(obj);
    }
    Ok(objects)
}

/// Load every object in one manifest file
pub async fn load_file(
    path: impl AsRef<Path>,
    renderer: &dyn Renderer,
    ctx: &RenderContext,
) -> Result<Vec<DynamicObject>> {
    let path = path.as_ref();
    let template = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| manifest_error(path, e))?;
    let rendered = renderer.render(&template, ctx)?;
    let objects = parse_documents(path, &rendered)?;
    debug!(path = %path.display(), objects = objects.len(), "Loaded manifest");
    Ok(objects)
}

/// `.yaml`/`.yml` files directly under `dir`, sorted by name
pub async fn manifest_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| manifest_error(dir, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| manifest_error(dir, e))? {
        let path = entry.path();
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml" | "yml")
        );
        if is_yaml && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every manifest in a directory, files in name order
pub async fn load_path(
    dir: impl AsRef<Path>,
    renderer: &dyn Renderer,
    ctx: &RenderContext,
) -> Result<Vec<DynamicObject>> {
    let mut objects = Vec::new();
    for file in manifest_files(dir).await? {
        objects.extend(load_file(&file, renderer, ctx).await?);
    }
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn ctx() -> RenderContext {
        RenderContext::new("kubetest-ns", "tests::node", "node")
    }

    #[test]
    fn test_template_substitutes_known_keys() {
        let out = TemplateRenderer
            .render("ns: {{ namespace }} test: {{test_name}}", &ctx())
            .expect("render");
        assert_eq!(out, "ns: kubetest-ns test: node");
    }

    #[test]
    fn test_template_leaves_unknown_keys() {
        let out = TemplateRenderer
            .render("image: {{ image }}", &ctx())
            .expect("render");
        assert_eq!(out, "image: {{ image }}");

        let out = TemplateRenderer
            .render("image: {{ image }}", &ctx().with("image", "nginx:1.27"))
            .expect("render");
        assert_eq!(out, "image: nginx:1.27");
    }

    #[test]
    fn test_builtin_keys_win_over_extra() {
        let ctx = ctx().with("namespace", "other");
        assert_eq!(ctx.get("namespace").as_deref(), Some("kubetest-ns"));
    }

    #[test]
    fn test_passthrough_renderer() {
        let out = PassthroughRenderer
            .render("{{ namespace }}", &ctx())
            .expect("render");
        assert_eq!(out, "{{ namespace }}");
    }

    #[test]
    fn test_closure_renderer() {
        let upper = |t: &str, _: &RenderContext| -> Result<String> { Ok(t.to_uppercase()) };
        assert_eq!(upper.render("abc", &ctx()).expect("render"), "ABC");
    }

    #[test]
    fn test_parse_multi_document_skips_empty() {
        let text = "---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n---\n---\napiVersion: v1\nkind: Secret\nmetadata:\n  name: b\n";
        let objs = parse_documents(Path::new("inline"), text).expect("parse");
        assert_eq!(objs.len(), 2);
        assert_eq!(objs[0].types.as_ref().map(|t| t.kind.as_str()), Some("ConfigMap"));
        assert_eq!(objs[1].metadata.name.as_deref(), Some("b"));
    }

    #[test]
    fn test_parse_requires_kind() {
        let err = parse_documents(Path::new("bad.yaml"), "apiVersion: v1\nmetadata:\n  name: a\n")
            .expect_err("missing kind");
        assert!(matches!(&err, Error::Manifest { path, reason } if path == "bad.yaml" && reason.contains("kind")));
    }

    #[tokio::test]
    async fn test_load_path_sorted_yaml_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("b.yml"),
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: second\n",
        )
        .expect("write");
        fs::write(
            dir.path().join("a.yaml"),
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: first\n  namespace: {{ namespace }}\n",
        )
        .expect("write");
        fs::write(dir.path().join("notes.txt"), "not a manifest").expect("write");

        let objs = load_path(dir.path(), &TemplateRenderer, &ctx())
            .await
            .expect("load");
        let names: Vec<_> = objs
            .iter()
            .filter_map(|o| o.metadata.name.as_deref())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(objs[0].metadata.namespace.as_deref(), Some("kubetest-ns"));
    }

    #[tokio::test]
    async fn test_load_file_missing_is_manifest_error() {
        let err = load_file("/nonexistent/kubetest.yaml", &TemplateRenderer, &ctx())
            .await
            .expect_err("missing file");
        assert!(matches!(err, Error::Manifest { .. }));
    }
}
