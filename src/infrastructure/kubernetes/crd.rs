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

//! ReviewApp and PullRequest custom resources.
//!
//! A `ReviewApp` is the operator-authored template: a repository URL and a list of
//! raw Kubernetes documents with `{{ NAME }}` placeholders. A `PullRequest` is the
//! per-pull-request record created from webhook events and owned by its `ReviewApp`.

use crate::infrastructure::constants::PULL_REQUEST_NAME_INFIX;
use kube::CustomResource;
use schemars::schema::{ArrayValidation, InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Specification for a ReviewApp
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "reviewapp.io",
    version = "v1",
    kind = "ReviewApp",
    plural = "reviewapps",
    shortname = "ra",
    namespaced,
    derive = "PartialEq",
    printcolumn = r#"{"name":"Repository","type":"string","jsonPath":".spec.repositoryURL"}"#
)]
pub struct ReviewAppSpec {
    /// Repository URL matched verbatim against incoming pull request events,
    /// e.g. `https://github.com/example/echo`
    #[serde(rename = "repositoryURL")]
    pub repository_url: String,

    /// Raw resource documents rendered once per pull request
    #[serde(default)]
    #[schemars(schema_with = "raw_resource_list_schema")]
    pub resources: Vec<Value>,
}

/// Specification for a PullRequest record
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "reviewapp.io",
    version = "v1",
    kind = "PullRequest",
    plural = "pullrequests",
    shortname = "pr",
    namespaced,
    derive = "PartialEq",
    printcolumn = r#"{"name":"ReviewApp","type":"string","jsonPath":".spec.parentReviewApp"}"#,
    printcolumn = r#"{"name":"PR","type":"string","jsonPath":".spec.prNumber"}"#,
    printcolumn = r#"{"name":"Head","type":"string","jsonPath":".spec.headCommitRef"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestSpec {
    /// Name of the owning ReviewApp (same namespace)
    pub parent_review_app: String,

    /// Pull request number in decimal form
    pub pr_number: String,

    /// SHA of the latest commit on the pull request head
    pub head_commit_ref: String,

    /// Environment variables added to / overriding the template's containers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_vars: Vec<PullRequestEnvVar>,
}

/// Environment variable entry stored on a PullRequest
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestEnvVar {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Accepted by the schema so it can be rejected explicitly at render time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_object_schema")]
    pub value_from: Option<Value>,
}

/// Deterministic PullRequest name for a ReviewApp and pull request number
pub fn pull_request_name(review_app: &str, pr_number: &str) -> String {
    format!("{}{}{}", review_app, PULL_REQUEST_NAME_INFIX, pr_number)
}

impl ReviewApp {
    pub fn matches_repository(&self, repository_url: &str) -> bool {
        self.spec.repository_url == repository_url
    }
}

fn raw_object() -> SchemaObject {
    let mut object = SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        ..Default::default()
    };
    object.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        Value::Bool(true),
    );
    object
}

fn raw_object_schema(_gen: &mut schemars::gen::SchemaGenerator) -> Schema {
    Schema::Object(raw_object())
}

fn raw_resource_list_schema(_gen: &mut schemars::gen::SchemaGenerator) -> Schema {
    Schema::Object(SchemaObject {
        instance_type: Some(InstanceType::Array.into()),
        array: Some(Box::new(ArrayValidation {
            items: Some(Schema::Object(raw_object()).into()),
            ..Default::default()
        })),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::constants::{
        API_GROUP, API_VERSION, KIND_PULL_REQUEST, KIND_REVIEW_APP,
    };
    use kube::{CustomResourceExt, Resource};
    use serde_json::json;

    #[test]
    fn test_crd_identity() {
        let api_version = format!("{}/{}", API_GROUP, API_VERSION);
        assert_eq!(ReviewApp::api_version(&()), api_version);
        assert_eq!(PullRequest::api_version(&()), api_version);
        assert_eq!(ReviewApp::kind(&()), KIND_REVIEW_APP);
        assert_eq!(PullRequest::kind(&()), KIND_PULL_REQUEST);
        assert_eq!(PullRequest::crd_name(), "pullrequests.reviewapp.io");
    }

    #[test]
    fn test_resources_schema_preserves_unknown_fields() {
        let crd = serde_json::to_value(ReviewApp::crd()).unwrap();
        let resources = &crd["spec"]["versions"][0]["schema"]["openAPIV3Schema"]["properties"]
            ["spec"]["properties"]["resources"];
        assert_eq!(resources["type"], "array");
        assert_eq!(resources["items"]["x-kubernetes-preserve-unknown-fields"], true);
    }

    #[test]
    fn test_pull_request_name() {
        assert_eq!(pull_request_name("echo", "10"), "echo-pr10");
    }

    #[test]
    fn test_review_app_spec_field_names() {
        let spec: ReviewAppSpec = serde_json::from_value(json!({
            "repositoryURL": "https://github.com/example/echo",
            "resources": [{"kind": "Service", "metadata": {"name": "echo-{{PR_NUMBER}}"}}]
        }))
        .unwrap();
        assert_eq!(spec.repository_url, "https://github.com/example/echo");
        assert_eq!(spec.resources.len(), 1);

        let app = ReviewApp::new("echo", spec);
        assert!(app.matches_repository("https://github.com/example/echo"));
        assert!(!app.matches_repository("https://github.com/example/echo/"));
    }

    #[test]
    fn test_pull_request_spec_serialization() {
        let spec = PullRequestSpec {
            parent_review_app: "echo".to_string(),
            pr_number: "10".to_string(),
            head_commit_ref: "abc123".to_string(),
            env_vars: Vec::new(),
        };
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            value,
            json!({"parentReviewApp": "echo", "prNumber": "10", "headCommitRef": "abc123"})
        );
    }
}
