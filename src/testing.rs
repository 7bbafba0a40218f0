//! In-memory cluster for tests
//!
//! [`FakeCluster`] implements [`ClusterApi`] without a server: objects live
//! in a list, UIDs are handed out on create, label selectors are evaluated
//! locally and every call is recorded. Listings for a kind can be made to
//! fail to exercise partial-data paths.
//!
//! ```
//! use kubetest::testing::FakeCluster;
//! use kubetest::objects::ResourceKind;
//!
//! let cluster = FakeCluster::new();
//! cluster.fail_list(ResourceKind::Job);
//! assert!(cluster.calls().is_empty());
//! ```

use crate::client::ClusterApi;
use crate::error::{ApiError, Error, Result};
use crate::objects::ResourceKind;
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{ApiResource, DeleteParams, DynamicObject};
use kube::core::TypeMeta;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One request received by a [`FakeCluster`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create {
        kind: String,
        namespace: Option<String>,
        name: String,
    },
    Get {
        kind: String,
        namespace: Option<String>,
        name: String,
    },
    Delete {
        kind: String,
        namespace: Option<String>,
        name: String,
    },
    Patch {
        kind: String,
        namespace: Option<String>,
        name: String,
    },
    List {
        kind: String,
        namespace: Option<String>,
        selector: String,
    },
    ListMetadata {
        kind: String,
        namespace: Option<String>,
    },
}

impl Call {
    /// Kind the call was addressed to
    pub fn kind(&self) -> &str {
        match self {
            Call::Create { kind, .. }
            | Call::Get { kind, .. }
            | Call::Delete { kind, .. }
            | Call::Patch { kind, .. }
            | Call::List { kind, .. }
            | Call::ListMetadata { kind, .. } => kind,
        }
    }
}

#[derive(Default)]
struct State {
    objects: Vec<DynamicObject>,
    calls: Vec<Call>,
    failing_lists: HashSet<String>,
    failing_deletes: HashSet<String>,
    next_uid: u64,
}

impl State {
    fn position(&self, kind: &str, namespace: Option<&str>, name: &str) -> Option<usize> {
        self.objects.iter().position(|obj| {
            kind_of(obj) == kind
                && obj.metadata.namespace.as_deref() == namespace
                && obj.metadata.name.as_deref() == Some(name)
        })
    }

    fn store(&mut self, mut obj: DynamicObject) -> DynamicObject {
        if obj.metadata.uid.is_none() {
            self.next_uid += 1;
            obj.metadata.uid = Some(format!("fake-uid-{:04}", self.next_uid));
        }
        obj.metadata.resource_version = Some("1".to_string());
        self.objects.push(obj.clone());
        obj
    }
}

fn kind_of(obj: &DynamicObject) -> &str {
    obj.types.as_ref().map(|t| t.kind.as_str()).unwrap_or_default()
}

/// In-memory [`ClusterApi`]
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

impl std::fmt::Debug for FakeCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("FakeCluster")
            .field("objects", &state.objects.len())
            .field("calls", &state.calls.len())
            .finish()
    }
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an object directly, bypassing conflict checks and call recording
    ///
    /// A UID is assigned when the object has none. Returns the stored copy.
    pub fn insert(&self, obj: DynamicObject) -> DynamicObject {
        self.lock().store(obj)
    }

    /// Seed an object from JSON
    pub fn insert_value(&self, value: serde_json::Value) -> Result<DynamicObject> {
        let obj: DynamicObject = serde_json::from_value(value).map_err(|e| Error::Conversion {
            kind: "DynamicObject".to_string(),
            reason: e.to_string(),
        })?;
        Ok(self.insert(obj))
    }

    /// Stored copy of an object
    pub fn get_object(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<DynamicObject> {
        let state = self.lock();
        state
            .position(kind.as_str(), namespace, name)
            .map(|i| state.objects[i].clone())
    }

    /// Mutate a stored object in place (e.g. to simulate a controller
    /// updating status). Returns whether the object existed.
    pub fn update<F>(&self, kind: ResourceKind, namespace: Option<&str>, name: &str, f: F) -> bool
    where
        F: FnOnce(&mut DynamicObject),
    {
        let mut state = self.lock();
        match state.position(kind.as_str(), namespace, name) {
            Some(i) => {
                f(&mut state.objects[i]);
                true
            }
            None => false,
        }
    }

    /// Remove an object without recording a call
    pub fn remove(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> bool {
        let mut state = self.lock();
        match state.position(kind.as_str(), namespace, name) {
            Some(i) => {
                state.objects.remove(i);
                true
            }
            None => false,
        }
    }

    /// Make every listing of `kind` fail with 403
    pub fn fail_list(&self, kind: ResourceKind) {
        self.lock().failing_lists.insert(kind.as_str().to_string());
    }

    /// Make every delete of `kind` fail with 500
    pub fn fail_delete(&self, kind: ResourceKind) {
        self.lock().failing_deletes.insert(kind.as_str().to_string());
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls addressed to one kind
    pub fn calls_for(&self, kind: ResourceKind) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.kind() == kind.as_str())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn create(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        obj: &DynamicObject,
    ) -> Result<DynamicObject> {
        let name = obj.metadata.name.clone().unwrap_or_default();
        self.record(Call::Create {
            kind: ar.kind.clone(),
            namespace: namespace.map(str::to_string),
            name: name.clone(),
        });

        if name.is_empty() {
            return Err(ApiError::new(422, "Invalid", "metadata.name: Required value").into());
        }

        let mut state = self.lock();
        if state.position(&ar.kind, namespace, &name).is_some() {
            let resource = format!("{} \"{}\"", ar.plural, name);
            return Err(ApiError::already_exists(&resource).into());
        }

        let mut obj = obj.clone();
        obj.types = Some(TypeMeta {
            api_version: ar.api_version.clone(),
            kind: ar.kind.clone(),
        });
        obj.metadata.namespace = namespace.map(str::to_string);
        if ar.kind == "Namespace" && obj.data.get("status").is_none() {
            obj.data["status"] = serde_json::json!({"phase": "Active"});
        }
        Ok(state.store(obj))
    }

    async fn get(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject> {
        self.record(Call::Get {
            kind: ar.kind.clone(),
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        });

        let state = self.lock();
        state
            .position(&ar.kind, namespace, name)
            .map(|i| state.objects[i].clone())
            .ok_or_else(|| ApiError::not_found(&format!("{} \"{}\"", ar.plural, name)).into())
    }

    async fn delete(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        name: &str,
        _params: &DeleteParams,
    ) -> Result<()> {
        self.record(Call::Delete {
            kind: ar.kind.clone(),
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        });

        let mut state = self.lock();
        if state.failing_deletes.contains(&ar.kind) {
            return Err(ApiError::new(500, "InternalError", "injected delete failure").into());
        }
        let Some(i) = state.position(&ar.kind, namespace, name) else {
            return Err(ApiError::not_found(&format!("{} \"{}\"", ar.plural, name)).into());
        };
        state.objects.remove(i);

        // Deleting a namespace takes its contents with it.
        if ar.kind == "Namespace" {
            state
                .objects
                .retain(|obj| obj.metadata.namespace.as_deref() != Some(name));
        }
        Ok(())
    }

    async fn patch(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<DynamicObject> {
        self.record(Call::Patch {
            kind: ar.kind.clone(),
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        });

        let conversion = |e: serde_json::Error| Error::Conversion {
            kind: ar.kind.clone(),
            reason: e.to_string(),
        };
        let mut state = self.lock();
        let Some(i) = state.position(&ar.kind, namespace, name) else {
            return Err(ApiError::not_found(&format!("{} \"{}\"", ar.plural, name)).into());
        };

        let mut value = serde_json::to_value(&state.objects[i]).map_err(conversion)?;
        merge_patch(&mut value, patch);
        let mut patched: DynamicObject = serde_json::from_value(value).map_err(conversion)?;
        let version = patched
            .metadata
            .resource_version
            .as_deref()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        patched.metadata.resource_version = Some((version + 1).to_string());
        state.objects[i] = patched.clone();
        Ok(patched)
    }

    async fn list(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        selector: &str,
    ) -> Result<Vec<DynamicObject>> {
        self.record(Call::List {
            kind: ar.kind.clone(),
            namespace: namespace.map(str::to_string),
            selector: selector.to_string(),
        });

        let requirements = parse_selector(selector)?;
        let state = self.lock();
        if state.failing_lists.contains(&ar.kind) {
            return Err(forbidden(ar));
        }
        Ok(state
            .objects
            .iter()
            .filter(|obj| kind_of(obj) == ar.kind)
            .filter(|obj| namespace.is_none() || obj.metadata.namespace.as_deref() == namespace)
            .filter(|obj| requirements.iter().all(|r| r.matches(&obj.metadata)))
            .cloned()
            .collect())
    }

    async fn list_metadata(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
    ) -> Result<Vec<ObjectMeta>> {
        self.record(Call::ListMetadata {
            kind: ar.kind.clone(),
            namespace: namespace.map(str::to_string),
        });

        let state = self.lock();
        if state.failing_lists.contains(&ar.kind) {
            return Err(forbidden(ar));
        }
        Ok(state
            .objects
            .iter()
            .filter(|obj| kind_of(obj) == ar.kind)
            .filter(|obj| namespace.is_none() || obj.metadata.namespace.as_deref() == namespace)
            .map(|obj| obj.metadata.clone())
            .collect())
    }
}

/// JSON merge patch: objects merge key by key, `null` removes a key and
/// anything else replaces the target
fn merge_patch(target: &mut serde_json::Value, patch: &serde_json::Value) {
    let serde_json::Value::Object(fields) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = serde_json::Value::Object(serde_json::Map::new());
    }
    if let serde_json::Value::Object(target) = target {
        for (key, value) in fields {
            if value.is_null() {
                target.remove(key);
            } else {
                merge_patch(target.entry(key.clone()).or_insert(serde_json::Value::Null), value);
            }
        }
    }
}

fn forbidden(ar: &ApiResource) -> Error {
    ApiError::new(
        403,
        "Forbidden",
        format!("{} is forbidden: injected list failure", ar.plural),
    )
    .into()
}

/// One parsed term of a label selector
#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Equals(String, String),
    NotEquals(String, String),
    In(String, Vec<String>),
    NotIn(String, Vec<String>),
    Exists(String),
    DoesNotExist(String),
}

impl Requirement {
    fn matches(&self, meta: &ObjectMeta) -> bool {
        let empty = BTreeMap::new();
        let labels = meta.labels.as_ref().unwrap_or(&empty);
        match self {
            Requirement::Equals(k, v) => labels.get(k) == Some(v),
            Requirement::NotEquals(k, v) => labels.get(k) != Some(v),
            Requirement::In(k, vs) => labels.get(k).is_some_and(|v| vs.contains(v)),
            Requirement::NotIn(k, vs) => labels.get(k).map_or(true, |v| !vs.contains(v)),
            Requirement::Exists(k) => labels.contains_key(k),
            Requirement::DoesNotExist(k) => !labels.contains_key(k),
        }
    }
}

/// Split on commas that are not inside parentheses
fn split_terms(selector: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in selector.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                terms.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    terms.push(&selector[start..]);
    terms
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

fn parse_values(raw: &str) -> Option<Vec<String>> {
    let inner = raw.trim().strip_prefix('(')?.strip_suffix(')')?;
    Some(
        inner
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect(),
    )
}

fn parse_term(term: &str) -> Option<Requirement> {
    if let Some((key, values)) = term.split_once(" notin ") {
        return Some(Requirement::NotIn(key.trim().to_string(), parse_values(values)?));
    }
    if let Some((key, values)) = term.split_once(" in ") {
        return Some(Requirement::In(key.trim().to_string(), parse_values(values)?));
    }
    if let Some((key, value)) = term.split_once("!=") {
        return Some(Requirement::NotEquals(
            key.trim().to_string(),
            value.trim().to_string(),
        ));
    }
    if let Some((key, value)) = term.split_once("==").or_else(|| term.split_once('=')) {
        return Some(Requirement::Equals(
            key.trim().to_string(),
            value.trim().to_string(),
        ));
    }
    if let Some(key) = term.strip_prefix('!') {
        return Some(Requirement::DoesNotExist(key.trim().to_string()));
    }
    if term.contains(char::is_whitespace) {
        return None;
    }
    Some(Requirement::Exists(term.to_string()))
}

fn parse_selector(selector: &str) -> Result<Vec<Requirement>> {
    split_terms(selector)
        .into_iter()
        .map(|term| {
            parse_term(term).ok_or_else(|| {
                ApiError::new(
                    400,
                    "BadRequest",
                    format!("unable to parse requirement: {term:?}"),
                )
                .into()
            })
        })
        .collect()
}
