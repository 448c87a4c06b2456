// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-memory `ReviewAppKubeClient`, used for dry runs and tests.
//!
//! It behaves like a tiny API server: objects get a `uid` and a
//! `resourceVersion` on create, replace bumps the version, and writes to a
//! missing object fail with `NotFound`.

use crate::infrastructure::constants::{KIND_PULL_REQUEST, KIND_REVIEW_APP};
use crate::infrastructure::kubernetes::client::{ResourceRef, ReviewAppKubeClient};
use crate::infrastructure::kubernetes::crd::{PullRequest, ReviewApp};
use crate::shared::error::KubeError;
use kube::ResourceExt;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Built-in kinds that are not namespaced; everything else is treated as namespaced.
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "Namespace",
    "Node",
    "PersistentVolume",
    "StorageClass",
    "PriorityClass",
    "ClusterRole",
    "ClusterRoleBinding",
    "CustomResourceDefinition",
];

#[derive(Default)]
struct MemoryState {
    review_apps: Vec<ReviewApp>,
    pull_requests: BTreeMap<(String, String), PullRequest>,
    resources: BTreeMap<String, Value>,
    failing: HashSet<String>,
    operations: Vec<String>,
    next_uid: u64,
}

impl MemoryState {
    fn next_uid(&mut self) -> String {
        self.next_uid += 1;
        format!("00000000-0000-0000-0000-{:012}", self.next_uid)
    }

    fn check(&self, name: &str) -> Result<(), KubeError> {
        if self.failing.contains(name) {
            return Err(KubeError::KubeError(format!(
                "injected failure for '{}'",
                name
            )));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryKubeClient {
    state: Mutex<MemoryState>,
}

impl InMemoryKubeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_review_apps(review_apps: Vec<ReviewApp>) -> Self {
        let client = Self::new();
        for app in review_apps {
            client.add_review_app(app);
        }
        client
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a ReviewApp, assigning a uid if it has none.
    pub fn add_review_app(&self, mut app: ReviewApp) {
        let mut state = self.lock();
        if app.metadata.uid.is_none() {
            app.metadata.uid = Some(state.next_uid());
        }
        if app.metadata.namespace.is_none() {
            app.metadata.namespace = Some("default".to_string());
        }
        state.review_apps.push(app);
    }

    /// Seed a live resource as if it had been applied earlier.
    pub fn insert_resource(&self, document: Value) -> Result<ResourceRef, KubeError> {
        let target = ResourceRef::from_document(&document)?;
        self.lock().resources.insert(target.to_string(), document);
        Ok(target)
    }

    /// Make every call touching an object with this name fail.
    pub fn fail_on(&self, name: impl Into<String>) {
        self.lock().failing.insert(name.into());
    }

    pub fn pull_requests(&self) -> Vec<PullRequest> {
        self.lock().pull_requests.values().cloned().collect()
    }

    pub fn resource(&self, target: &ResourceRef) -> Option<Value> {
        self.lock().resources.get(&target.to_string()).cloned()
    }

    pub fn resources(&self) -> Vec<Value> {
        self.lock().resources.values().cloned().collect()
    }

    /// Journal of mutating calls, e.g. `create PullRequest default/echo-pr10`.
    pub fn operations(&self) -> Vec<String> {
        self.lock().operations.clone()
    }
}

fn pull_request_key(pull_request: &PullRequest) -> (String, String) {
    (
        pull_request.namespace().unwrap_or_default(),
        pull_request.name_any(),
    )
}

fn bump_resource_version(current: Option<&str>) -> String {
    let version = current.and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);
    (version + 1).to_string()
}

#[async_trait::async_trait]
impl ReviewAppKubeClient for InMemoryKubeClient {
    async fn list_review_apps(&self) -> Result<Vec<ReviewApp>, KubeError> {
        Ok(self.lock().review_apps.clone())
    }

    async fn get_review_app(&self, namespace: &str, name: &str) -> Result<ReviewApp, KubeError> {
        let state = self.lock();
        state.check(name)?;
        state
            .review_apps
            .iter()
            .find(|app| app.name_any() == name && app.namespace().as_deref() == Some(namespace))
            .cloned()
            .ok_or_else(|| KubeError::not_found(KIND_REVIEW_APP, name, namespace))
    }

    async fn list_pull_requests(&self) -> Result<Vec<PullRequest>, KubeError> {
        Ok(self.pull_requests())
    }

    async fn get_pull_request(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<PullRequest>, KubeError> {
        let state = self.lock();
        state.check(name)?;
        Ok(state
            .pull_requests
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_pull_request(&self, pull_request: &PullRequest) -> Result<(), KubeError> {
        let mut state = self.lock();
        let key = pull_request_key(pull_request);
        state.check(&key.1)?;
        if state.pull_requests.contains_key(&key) {
            return Err(KubeError::KubeError(format!(
                "{} '{}' already exists",
                KIND_PULL_REQUEST, key.1
            )));
        }

        let mut stored = pull_request.clone();
        stored.metadata.uid = Some(state.next_uid());
        stored.metadata.resource_version = Some("1".to_string());
        state
            .operations
            .push(format!("create {} {}/{}", KIND_PULL_REQUEST, key.0, key.1));
        state.pull_requests.insert(key, stored);
        Ok(())
    }

    async fn replace_pull_request(&self, pull_request: &PullRequest) -> Result<(), KubeError> {
        let mut state = self.lock();
        let key = pull_request_key(pull_request);
        state.check(&key.1)?;
        let Some(current) = state.pull_requests.get(&key) else {
            return Err(KubeError::not_found(KIND_PULL_REQUEST, &key.1, &key.0));
        };

        let mut stored = pull_request.clone();
        stored.metadata.uid = current.metadata.uid.clone();
        stored.metadata.resource_version = Some(bump_resource_version(
            current.metadata.resource_version.as_deref(),
        ));
        state
            .operations
            .push(format!("replace {} {}/{}", KIND_PULL_REQUEST, key.0, key.1));
        state.pull_requests.insert(key, stored);
        Ok(())
    }

    async fn delete_pull_request(&self, namespace: &str, name: &str) -> Result<bool, KubeError> {
        let mut state = self.lock();
        state.check(name)?;
        state
            .operations
            .push(format!("delete {} {}/{}", KIND_PULL_REQUEST, namespace, name));
        Ok(state
            .pull_requests
            .remove(&(namespace.to_string(), name.to_string()))
            .is_some())
    }

    async fn is_namespaced(&self, target: &ResourceRef) -> Result<bool, KubeError> {
        Ok(!CLUSTER_SCOPED_KINDS.contains(&target.kind.as_str()))
    }

    async fn get_resource(&self, target: &ResourceRef) -> Result<Option<Value>, KubeError> {
        let state = self.lock();
        state.check(&target.name)?;
        Ok(state.resources.get(&target.to_string()).cloned())
    }

    async fn create_resource(
        &self,
        target: &ResourceRef,
        document: &Value,
    ) -> Result<(), KubeError> {
        let mut state = self.lock();
        state.check(&target.name)?;
        let key = target.to_string();
        if state.resources.contains_key(&key) {
            return Err(KubeError::KubeError(format!("{} already exists", key)));
        }

        let mut stored = document.clone();
        let uid = state.next_uid();
        if let Some(metadata) = stored.get_mut("metadata").and_then(Value::as_object_mut) {
            metadata.insert("uid".to_string(), Value::String(uid));
            metadata.insert("resourceVersion".to_string(), Value::String("1".to_string()));
        }
        state.operations.push(format!("create {}", key));
        state.resources.insert(key, stored);
        Ok(())
    }

    async fn replace_resource(
        &self,
        target: &ResourceRef,
        document: &Value,
    ) -> Result<(), KubeError> {
        let mut state = self.lock();
        state.check(&target.name)?;
        let key = target.to_string();
        let Some(current) = state.resources.get(&key) else {
            return Err(KubeError::not_found(
                &target.kind,
                &target.name,
                target.namespace.clone().unwrap_or_default(),
            ));
        };

        let version = bump_resource_version(
            current
                .pointer("/metadata/resourceVersion")
                .and_then(Value::as_str),
        );
        let mut stored = document.clone();
        if let Some(metadata) = stored.get_mut("metadata").and_then(Value::as_object_mut) {
            metadata.insert("resourceVersion".to_string(), Value::String(version));
        }
        state.operations.push(format!("replace {}", key));
        state.resources.insert(key, stored);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::kubernetes::crd::PullRequestSpec;
    use serde_json::json;

    fn pull_request(name: &str) -> PullRequest {
        let mut pr = PullRequest::new(name, PullRequestSpec::default());
        pr.metadata.namespace = Some("default".to_string());
        pr
    }

    #[tokio::test]
    async fn test_pull_request_create_replace_delete() {
        let client = InMemoryKubeClient::new();
        let pr = pull_request("echo-pr1");

        client.create_pull_request(&pr).await.unwrap();
        assert!(client.create_pull_request(&pr).await.is_err());

        let stored = client
            .get_pull_request("default", "echo-pr1")
            .await
            .unwrap()
            .unwrap();
        assert!(stored.metadata.uid.is_some());
        assert_eq!(stored.metadata.resource_version.as_deref(), Some("1"));

        client.replace_pull_request(&stored).await.unwrap();
        let stored = client.pull_requests().remove(0);
        assert_eq!(stored.metadata.resource_version.as_deref(), Some("2"));

        assert!(client.delete_pull_request("default", "echo-pr1").await.unwrap());
        assert!(!client.delete_pull_request("default", "echo-pr1").await.unwrap());
        assert_eq!(client.operations().len(), 4);
    }

    #[tokio::test]
    async fn test_replace_missing_is_not_found() {
        let client = InMemoryKubeClient::new();
        let err = client
            .replace_pull_request(&pull_request("echo-pr2"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let client = InMemoryKubeClient::new();
        client.fail_on("broken");
        let err = client
            .get_pull_request("default", "broken")
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::KubeError(_)));
    }

    #[tokio::test]
    async fn test_resources() {
        let client = InMemoryKubeClient::new();
        let target = client
            .insert_resource(json!({
                "apiVersion": "v1",
                "kind": "Service",
                "metadata": {"name": "svc", "namespace": "default", "resourceVersion": "7"}
            }))
            .unwrap();

        let live = client.get_resource(&target).await.unwrap().unwrap();
        client.replace_resource(&target, &live).await.unwrap();
        assert_eq!(
            client.resource(&target).unwrap()["metadata"]["resourceVersion"],
            "8"
        );
    }

    #[tokio::test]
    async fn test_is_namespaced() {
        let client = InMemoryKubeClient::new();
        let service = ResourceRef::from_document(
            &json!({"apiVersion": "v1", "kind": "Service", "metadata": {"name": "svc"}}),
        )
        .unwrap();
        let namespace = ResourceRef::from_document(
            &json!({"apiVersion": "v1", "kind": "Namespace", "metadata": {"name": "pr-1"}}),
        )
        .unwrap();

        assert!(client.is_namespaced(&service).await.unwrap());
        assert!(!client.is_namespaced(&namespace).await.unwrap());
    }
}
