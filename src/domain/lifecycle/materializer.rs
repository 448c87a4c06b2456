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

//! Turns a PullRequest record into live cluster resources.

use super::ownership::ensure_owner_reference_in_document;
use crate::domain::render::{env_overrides_from, merge, RenderContext, TemplateRenderer};
use crate::infrastructure::constants::{
    VAR_HEAD_COMMIT_REF, VAR_NAMESPACE, VAR_PR_NAME, VAR_PR_NUMBER, VAR_REVIEW_APP_NAME,
};
use crate::infrastructure::kubernetes::client::{ResourceRef, ReviewAppKubeClient};
use crate::infrastructure::kubernetes::crd::PullRequest;
use crate::shared::error::KubeError;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Replaced,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceOutcome {
    /// `None` when the rendered document could not be addressed
    pub target: Option<ResourceRef>,
    pub outcome: ApplyOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    pub pull_request: String,
    pub namespace: String,
    pub resources: Vec<ResourceOutcome>,
    /// Set when the PullRequest could not be rendered at all
    pub error: Option<String>,
}

impl MaterializeReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
            && self
                .resources
                .iter()
                .all(|r| !matches!(r.outcome, ApplyOutcome::Failed(_)))
    }
}

/// Context a PullRequest's templates are rendered against.
pub fn render_context(pull_request: &PullRequest) -> RenderContext {
    RenderContext::new()
        .with(VAR_PR_NUMBER, pull_request.spec.pr_number.as_str())
        .with(VAR_HEAD_COMMIT_REF, pull_request.spec.head_commit_ref.as_str())
        .with(VAR_PR_NAME, pull_request.name_any())
        .with(VAR_REVIEW_APP_NAME, pull_request.spec.parent_review_app.as_str())
        .with(VAR_NAMESPACE, pull_request.namespace().unwrap_or_default())
}

/// Default the namespace and stamp the owner reference on a rendered document.
///
/// Owner references only hold within one namespace, so a cluster-scoped kind or a
/// document placed outside `namespace` is rejected instead of being owned.
pub fn prepare(
    mut document: Value,
    namespace: &str,
    namespaced: bool,
    owner: &OwnerReference,
) -> Result<(ResourceRef, Value), KubeError> {
    let Some(root) = document.as_object_mut() else {
        return Err(KubeError::InvalidResource(
            "rendered resource is not an object".to_string(),
        ));
    };
    if !namespaced {
        let kind = root.get("kind").and_then(Value::as_str).unwrap_or_default();
        return Err(KubeError::InvalidResource(format!(
            "{} is cluster-scoped and cannot be owned by a PullRequest",
            kind
        )));
    }
    let metadata = root
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(metadata) = metadata.as_object_mut() {
        let missing = metadata
            .get("namespace")
            .and_then(Value::as_str)
            .map_or(true, str::is_empty);
        if missing {
            metadata.insert("namespace".to_string(), Value::String(namespace.to_string()));
        }
    }

    let target = ResourceRef::from_document(&document)?;
    if target.namespace.as_deref() != Some(namespace) {
        return Err(KubeError::InvalidResource(format!(
            "{} is outside the PullRequest namespace '{}'",
            target, namespace
        )));
    }
    ensure_owner_reference_in_document(&mut document, owner)?;
    Ok((target, document))
}

pub struct Materializer {
    client: Arc<dyn ReviewAppKubeClient>,
    renderer: TemplateRenderer,
}

impl Materializer {
    pub fn new(client: Arc<dyn ReviewAppKubeClient>) -> Self {
        Self::with_renderer(client, TemplateRenderer::default())
    }

    pub fn with_renderer(
        client: Arc<dyn ReviewAppKubeClient>,
        renderer: TemplateRenderer,
    ) -> Self {
        Self { client, renderer }
    }

    /// Render the parent ReviewApp's templates for `pull_request` and apply them.
    ///
    /// Errors are returned only when nothing could be rendered (missing parent,
    /// unsupported env var, no uid). Failures for individual resources are
    /// logged and recorded in the report.
    pub async fn materialize(
        &self,
        pull_request: &PullRequest,
    ) -> Result<MaterializeReport, KubeError> {
        let name = pull_request.name_any();
        let namespace = pull_request.namespace().unwrap_or_default();

        let review_app = self
            .client
            .get_review_app(&namespace, &pull_request.spec.parent_review_app)
            .await?;
        let owner = pull_request.controller_owner_ref(&()).ok_or_else(|| {
            KubeError::InvalidResource(format!("PullRequest '{}' has no uid", name))
        })?;
        let overrides = env_overrides_from(&pull_request.spec.env_vars)?;
        let context = render_context(pull_request);

        let rendered = self
            .renderer
            .render_all(&review_app.spec.resources, &context, &overrides);
        info!(
            pull_request = %name,
            %namespace,
            review_app = %review_app.name_any(),
            resources = rendered.len(),
            "materializing PullRequest"
        );

        let mut report = MaterializeReport {
            pull_request: name.clone(),
            namespace: namespace.clone(),
            ..Default::default()
        };
        for document in rendered {
            let target = match ResourceRef::from_document(&document) {
                Ok(target) => target,
                Err(e) => {
                    error!(pull_request = %name, error = %e, "Skipping rendered resource");
                    report.resources.push(ResourceOutcome {
                        target: None,
                        outcome: ApplyOutcome::Failed(e.to_string()),
                    });
                    continue;
                }
            };

            let outcome = match self.place(document, &target, &namespace, &owner).await {
                Ok((target, outcome)) => ResourceOutcome {
                    target: Some(target),
                    outcome,
                },
                Err(e) => {
                    error!(
                        pull_request = %name,
                        resource = %target,
                        error = %e,
                        "Failed to apply resource"
                    );
                    ResourceOutcome {
                        target: Some(target),
                        outcome: ApplyOutcome::Failed(e.to_string()),
                    }
                }
            };
            report.resources.push(outcome);
        }

        Ok(report)
    }

    async fn place(
        &self,
        document: Value,
        target: &ResourceRef,
        namespace: &str,
        owner: &OwnerReference,
    ) -> Result<(ResourceRef, ApplyOutcome), KubeError> {
        let namespaced = self.client.is_namespaced(target).await?;
        let (target, document) = prepare(document, namespace, namespaced, owner)?;
        let outcome = self.apply(&target, &document).await?;
        Ok((target, outcome))
    }

    async fn apply(
        &self,
        target: &ResourceRef,
        document: &Value,
    ) -> Result<ApplyOutcome, KubeError> {
        match self.client.get_resource(target).await? {
            None => {
                self.client.create_resource(target, document).await?;
                Ok(ApplyOutcome::Created)
            }
            Some(existing) => {
                let merged = merge(document, Some(&existing));
                self.client.replace_resource(target, &merged).await?;
                Ok(ApplyOutcome::Replaced)
            }
        }
    }

    /// Materialize every PullRequest, one after another.
    pub async fn resync(&self) -> Result<Vec<MaterializeReport>, KubeError> {
        let pull_requests = self.client.list_pull_requests().await?;
        let mut reports = Vec::with_capacity(pull_requests.len());

        for pull_request in &pull_requests {
            match self.materialize(pull_request).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!(
                        pull_request = %pull_request.name_any(),
                        error = %e,
                        "Failed to materialize PullRequest"
                    );
                    reports.push(MaterializeReport {
                        pull_request: pull_request.name_any(),
                        namespace: pull_request.namespace().unwrap_or_default(),
                        resources: Vec::new(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        Ok(reports)
    }
}
