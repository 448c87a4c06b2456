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

use crate::domain::config::ControllerConfig;
use crate::infrastructure::constants::{KIND_PULL_REQUEST, KIND_REVIEW_APP};
use crate::infrastructure::kubernetes::crd::{PullRequest, ReviewApp};
use crate::shared::error::KubeError;
use kube::api::{DeleteParams, DynamicObject, ListParams, PostParams};
use kube::core::GroupVersionKind;
use kube::discovery::{ApiCapabilities, ApiResource, Scope};
use kube::{Api, Client, ResourceExt};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Address of an arbitrary resource rendered from a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub api_version: String,
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceRef {
    /// Read `apiVersion`, `kind`, `metadata.name` and `metadata.namespace` from a document.
    pub fn from_document(document: &Value) -> Result<Self, KubeError> {
        let field = |pointer: &str| document.pointer(pointer).and_then(Value::as_str);

        let api_version = field("/apiVersion")
            .ok_or_else(|| KubeError::InvalidResource("apiVersion is required".to_string()))?;
        let kind = field("/kind")
            .ok_or_else(|| KubeError::InvalidResource("kind is required".to_string()))?;
        let name = field("/metadata/name").ok_or_else(|| {
            KubeError::InvalidResource(format!("{} metadata.name is required", kind))
        })?;

        Ok(Self {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            namespace: field("/metadata/namespace").map(str::to_string),
            name: name.to_string(),
        })
    }

    pub fn gvk(&self) -> GroupVersionKind {
        match self.api_version.split_once('/') {
            Some((group, version)) => GroupVersionKind::gvk(group, version, &self.kind),
            None => GroupVersionKind::gvk("", &self.api_version, &self.kind),
        }
    }

    fn namespace_or_default(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{} {}/{}", self.api_version, self.kind, ns, self.name),
            None => write!(f, "{}/{} {}", self.api_version, self.kind, self.name),
        }
    }
}

#[async_trait::async_trait]
pub trait ReviewAppKubeClient: Send + Sync {
    async fn list_review_apps(&self) -> Result<Vec<ReviewApp>, KubeError>;

    async fn get_review_app(&self, namespace: &str, name: &str) -> Result<ReviewApp, KubeError>;

    async fn list_pull_requests(&self) -> Result<Vec<PullRequest>, KubeError>;

    async fn get_pull_request(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<PullRequest>, KubeError>;

    async fn create_pull_request(&self, pull_request: &PullRequest) -> Result<(), KubeError>;

    async fn replace_pull_request(&self, pull_request: &PullRequest) -> Result<(), KubeError>;

    /// Returns `false` when the record was already gone.
    async fn delete_pull_request(&self, namespace: &str, name: &str) -> Result<bool, KubeError>;

    /// Whether the kind addressed by `target` lives inside a namespace.
    async fn is_namespaced(&self, target: &ResourceRef) -> Result<bool, KubeError>;

    async fn get_resource(&self, target: &ResourceRef) -> Result<Option<Value>, KubeError>;

    async fn create_resource(&self, target: &ResourceRef, document: &Value)
        -> Result<(), KubeError>;

    async fn replace_resource(
        &self,
        target: &ResourceRef,
        document: &Value,
    ) -> Result<(), KubeError>;
}

pub struct ReviewAppKubeClientImpl {
    client: Client,
    namespace: Option<String>,
    timeout: Duration,
    field_manager: String,
}

impl ReviewAppKubeClientImpl {
    pub async fn new(config: &ControllerConfig) -> Result<Self, KubeError> {
        let client = if config.kubeconfig.is_none() && config.context.is_none() {
            Client::try_default().await.map_err(|e| {
                KubeError::KubeError(format!("Failed to create Kubernetes client: {}", e))
            })?
        } else {
            Self::client_from_kubeconfig(config.kubeconfig.clone(), config.context.clone())
                .await?
        };

        Ok(Self::from_client(client, config))
    }

    pub fn from_client(client: Client, config: &ControllerConfig) -> Self {
        Self {
            client,
            namespace: config.namespace.clone(),
            timeout: config.operation_timeout(),
            field_manager: config.field_manager.clone(),
        }
    }

    pub fn get_client(&self) -> Client {
        self.client.clone()
    }

    async fn client_from_kubeconfig(
        kubeconfig_path: Option<String>,
        context: Option<String>,
    ) -> Result<Client, KubeError> {
        use kube::config::{KubeConfigOptions, Kubeconfig};

        let kubeconfig = if let Some(path) = kubeconfig_path {
            Kubeconfig::read_from(path)
                .map_err(|e| KubeError::KubeError(format!("Failed to load kubeconfig: {}", e)))?
        } else {
            Kubeconfig::read()
                .map_err(|e| KubeError::KubeError(format!("Failed to load kubeconfig: {}", e)))?
        };

        let config_options = KubeConfigOptions {
            context,
            cluster: None,
            user: None,
        };

        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &config_options)
            .await
            .map_err(|e| {
                KubeError::KubeError(format!("Failed to create Kubernetes config: {}", e))
            })?;

        Client::try_from(config).map_err(|e| {
            KubeError::KubeError(format!("Failed to create Kubernetes client: {}", e))
        })
    }

    /// Run a cluster call under the configured deadline.
    async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T, KubeError>
    where
        F: Future<Output = Result<T, KubeError>> + Send,
    {
        with_timeout(self.timeout, operation, call).await
    }

    fn review_apps(&self) -> Api<ReviewApp> {
        match &self.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    fn pull_requests(&self) -> Api<PullRequest> {
        match &self.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        }
    }

    async fn discover(
        &self,
        target: &ResourceRef,
    ) -> Result<(ApiResource, ApiCapabilities), KubeError> {
        kube::discovery::pinned_kind(&self.client, &target.gvk())
            .await
            .map_err(|e| KubeError::KubeError(format!("Failed to discover {}: {}", target.kind, e)))
    }

    async fn dynamic_api(&self, target: &ResourceRef) -> Result<Api<DynamicObject>, KubeError> {
        let (resource, capabilities) = self.discover(target).await?;

        Ok(match capabilities.scope {
            Scope::Namespaced => Api::namespaced_with(
                self.client.clone(),
                target.namespace_or_default(),
                &resource,
            ),
            Scope::Cluster => Api::all_with(self.client.clone(), &resource),
        })
    }
}

/// Await `call`, failing with [`KubeError::Timeout`] once `timeout` has elapsed.
pub(crate) async fn with_timeout<T, F>(
    timeout: Duration,
    operation: &str,
    call: F,
) -> Result<T, KubeError>
where
    F: Future<Output = Result<T, KubeError>>,
{
    tokio::time::timeout(timeout, call).await.map_err(|_| {
        KubeError::Timeout(format!(
            "{} did not complete within {}ms",
            operation,
            timeout.as_millis()
        ))
    })?
}

#[async_trait::async_trait]
impl ReviewAppKubeClient for ReviewAppKubeClientImpl {
    async fn list_review_apps(&self) -> Result<Vec<ReviewApp>, KubeError> {
        let api = self.review_apps();
        self.bounded("list ReviewApps", async move {
            api.list(&ListParams::default())
                .await
                .map(|list| list.items)
                .map_err(KubeError::from)
        })
        .await
    }

    async fn get_review_app(&self, namespace: &str, name: &str) -> Result<ReviewApp, KubeError> {
        let api: Api<ReviewApp> = Api::namespaced(self.client.clone(), namespace);
        self.bounded("get ReviewApp", async move {
            api.get(name)
                .await
                .map_err(|e| KubeError::from_api(e, KIND_REVIEW_APP, name, namespace))
        })
        .await
    }

    async fn list_pull_requests(&self) -> Result<Vec<PullRequest>, KubeError> {
        let api = self.pull_requests();
        self.bounded("list PullRequests", async move {
            api.list(&ListParams::default())
                .await
                .map(|list| list.items)
                .map_err(KubeError::from)
        })
        .await
    }

    async fn get_pull_request(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<PullRequest>, KubeError> {
        let api: Api<PullRequest> = Api::namespaced(self.client.clone(), namespace);
        self.bounded("get PullRequest", async move {
            api.get_opt(name).await.map_err(KubeError::from)
        })
        .await
    }

    async fn create_pull_request(&self, pull_request: &PullRequest) -> Result<(), KubeError> {
        let namespace = pull_request.namespace().unwrap_or_default();
        let api: Api<PullRequest> = Api::namespaced(self.client.clone(), &namespace);
        let pp = self.post_params();

        self.bounded("create PullRequest", async move {
            api.create(&pp, pull_request).await?;
            Ok(())
        })
        .await
    }

    async fn replace_pull_request(&self, pull_request: &PullRequest) -> Result<(), KubeError> {
        let namespace = pull_request.namespace().unwrap_or_default();
        let name = pull_request.name_any();
        let api: Api<PullRequest> = Api::namespaced(self.client.clone(), &namespace);
        let pp = self.post_params();

        self.bounded("replace PullRequest", async move {
            api.replace(&name, &pp, pull_request)
                .await
                .map_err(|e| KubeError::from_api(e, KIND_PULL_REQUEST, &name, &namespace))?;
            Ok(())
        })
        .await
    }

    async fn delete_pull_request(&self, namespace: &str, name: &str) -> Result<bool, KubeError> {
        let api: Api<PullRequest> = Api::namespaced(self.client.clone(), namespace);
        let dp = DeleteParams::default();

        self.bounded("delete PullRequest", async move {
            match api.delete(name, &dp).await {
                Ok(_) => Ok(true),
                Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(false),
                Err(e) => Err(KubeError::KubeError(e.to_string())),
            }
        })
        .await
    }

    async fn is_namespaced(&self, target: &ResourceRef) -> Result<bool, KubeError> {
        self.bounded("discover resource", async move {
            let (_, capabilities) = self.discover(target).await?;
            Ok(matches!(capabilities.scope, Scope::Namespaced))
        })
        .await
    }

    async fn get_resource(&self, target: &ResourceRef) -> Result<Option<Value>, KubeError> {
        self.bounded("get resource", async move {
            let api = self.dynamic_api(target).await?;
            match api.get_opt(&target.name).await? {
                Some(object) => Ok(Some(serde_json::to_value(object)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn create_resource(
        &self,
        target: &ResourceRef,
        document: &Value,
    ) -> Result<(), KubeError> {
        let pp = self.post_params();
        self.bounded("create resource", async move {
            let api = self.dynamic_api(target).await?;
            let object: DynamicObject = serde_json::from_value(document.clone())?;
            api.create(&pp, &object).await?;
            Ok(())
        })
        .await
    }

    async fn replace_resource(
        &self,
        target: &ResourceRef,
        document: &Value,
    ) -> Result<(), KubeError> {
        let pp = self.post_params();
        self.bounded("replace resource", async move {
            let api = self.dynamic_api(target).await?;
            let object: DynamicObject = serde_json::from_value(document.clone())?;
            api.replace(&target.name, &pp, &object).await.map_err(|e| {
                KubeError::from_api(
                    e,
                    &target.kind,
                    &target.name,
                    target.namespace_or_default(),
                )
            })?;
            Ok(())
        })
        .await
    }
}
