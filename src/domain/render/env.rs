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

//! Environment variable injection for workload resources
//!
//! Containers are located through a registry keyed by resource `kind`, so that
//! supporting another workload type is a `register` call. Documents of any other
//! kind pass through untouched.

use crate::infrastructure::constants::{
    JOB_TEMPLATE_CONTAINERS_PATH, KIND_CRON_JOB, KIND_DEPLOYMENT, KIND_JOB,
    POD_TEMPLATE_CONTAINERS_PATH,
};
use crate::infrastructure::kubernetes::crd::PullRequestEnvVar;
use crate::shared::error::KubeError;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

/// A literal `NAME=value` override applied to every container of a workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOverride {
    pub name: String,
    pub value: String,
}

impl EnvOverride {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Container `env` entry; an empty value is written as a bare name.
    fn to_entry(&self) -> Value {
        let mut entry = Map::new();
        entry.insert("name".to_string(), Value::String(self.name.clone()));
        if !self.value.is_empty() {
            entry.insert("value".to_string(), Value::String(self.value.clone()));
        }
        Value::Object(entry)
    }
}

impl TryFrom<&PullRequestEnvVar> for EnvOverride {
    type Error = KubeError;

    fn try_from(env_var: &PullRequestEnvVar) -> Result<Self, Self::Error> {
        if env_var.value_from.is_some() {
            return Err(KubeError::unsupported_env_var(
                &env_var.name,
                "valueFrom references are not supported, use a literal value",
            ));
        }
        Ok(Self::new(
            env_var.name.clone(),
            env_var.value.clone().unwrap_or_default(),
        ))
    }
}

impl FromStr for EnvOverride {
    type Err = KubeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok(Self::new(name.trim(), value))
            }
            _ => Err(KubeError::ValidationError(format!(
                "Invalid env override '{}'. Expected 'NAME=value'",
                s
            ))),
        }
    }
}

/// Convert PullRequest env entries, rejecting the first unsupported one.
pub fn env_overrides_from(env_vars: &[PullRequestEnvVar]) -> Result<Vec<EnvOverride>, KubeError> {
    env_vars.iter().map(EnvOverride::try_from).collect()
}

/// Locates the container list inside a document of a given kind.
pub type ContainerExtractor = fn(&mut Value) -> Option<&mut Vec<Value>>;

fn pod_template_containers(document: &mut Value) -> Option<&mut Vec<Value>> {
    document
        .pointer_mut(POD_TEMPLATE_CONTAINERS_PATH)?
        .as_array_mut()
}

fn job_template_containers(document: &mut Value) -> Option<&mut Vec<Value>> {
    document
        .pointer_mut(JOB_TEMPLATE_CONTAINERS_PATH)?
        .as_array_mut()
}

#[derive(Clone)]
pub struct ContainerRegistry {
    extractors: HashMap<String, ContainerExtractor>,
}

impl Default for ContainerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(KIND_DEPLOYMENT, pod_template_containers)
            .register(KIND_JOB, pod_template_containers)
            .register(KIND_CRON_JOB, job_template_containers);
        registry
    }
}

impl ContainerRegistry {
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        kind: impl Into<String>,
        extractor: ContainerExtractor,
    ) -> &mut Self {
        self.extractors.insert(kind.into(), extractor);
        self
    }

    pub fn supports(&self, kind: &str) -> bool {
        self.extractors.contains_key(kind)
    }

    /// Container list of `document`, or `None` for unregistered kinds and
    /// documents missing the expected path.
    pub fn containers_mut<'a>(&self, document: &'a mut Value) -> Option<&'a mut Vec<Value>> {
        let extractor = *self.extractors.get(document.get("kind")?.as_str()?)?;
        extractor(document)
    }
}

fn default_registry() -> &'static ContainerRegistry {
    static REGISTRY: OnceLock<ContainerRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ContainerRegistry::default)
}

#[derive(Clone, Default)]
pub struct EnvVarInjector {
    registry: ContainerRegistry,
}

impl EnvVarInjector {
    pub fn new(registry: ContainerRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ContainerRegistry {
        &self.registry
    }

    pub fn inject(&self, document: &Value, overrides: &[EnvOverride]) -> Value {
        let mut injected = document.clone();
        self.inject_in_place(&mut injected, overrides);
        injected
    }

    pub fn inject_in_place(&self, document: &mut Value, overrides: &[EnvOverride]) {
        inject_with(&self.registry, document, overrides);
    }
}

fn inject_with(registry: &ContainerRegistry, document: &mut Value, overrides: &[EnvOverride]) {
    if overrides.is_empty() {
        return;
    }
    let Some(containers) = registry.containers_mut(document) else {
        return;
    };

    for container in containers.iter_mut() {
        let Some(container) = container.as_object_mut() else {
            continue;
        };

        let mut env = match container.get("env") {
            Some(Value::Array(existing)) => existing.clone(),
            _ => Vec::new(),
        };
        merge_env(&mut env, overrides);

        if !env.is_empty() {
            container.insert("env".to_string(), Value::Array(env));
        }
    }
}

/// Override matching entries in place, append the rest in override order.
fn merge_env(env: &mut Vec<Value>, overrides: &[EnvOverride]) {
    for env_override in overrides {
        let existing = env.iter_mut().find(|entry| {
            entry.get("name").and_then(Value::as_str) == Some(env_override.name.as_str())
        });

        match existing {
            Some(entry) => *entry = env_override.to_entry(),
            None => env.push(env_override.to_entry()),
        }
    }
}

/// Return a copy of `document` with `overrides` merged into each container's `env`,
/// using the built-in Deployment/Job/CronJob registry.
pub fn inject_env_vars(document: &Value, overrides: &[EnvOverride]) -> Value {
    let mut injected = document.clone();
    inject_with(default_registry(), &mut injected, overrides);
    injected
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deployment(containers: Value) -> Value {
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "echo"},
            "spec": {"template": {"spec": {"containers": containers}}}
        })
    }

    #[test]
    fn test_override_in_place_and_append() {
        let doc = deployment(json!([{
            "name": "app",
            "env": [
                {"name": "KEEP", "value": "1"},
                {"name": "OVERRIDE", "value": "old"},
                {"name": "TAIL", "value": "2"}
            ]
        }]));
        let overrides = vec![
            EnvOverride::new("NEW", "new"),
            EnvOverride::new("OVERRIDE", "replaced"),
        ];

        let result = inject_env_vars(&doc, &overrides);
        assert_eq!(
            result["spec"]["template"]["spec"]["containers"][0]["env"],
            json!([
                {"name": "KEEP", "value": "1"},
                {"name": "OVERRIDE", "value": "replaced"},
                {"name": "TAIL", "value": "2"},
                {"name": "NEW", "value": "new"}
            ])
        );
        // input untouched
        assert_eq!(
            doc["spec"]["template"]["spec"]["containers"][0]["env"][1]["value"],
            "old"
        );
    }

    #[test]
    fn test_every_container_gets_overrides() {
        let doc = deployment(json!([{"name": "app"}, {"name": "sidecar", "env": []}]));
        let result = inject_env_vars(&doc, &[EnvOverride::new("A", "1")]);
        let containers = &result["spec"]["template"]["spec"]["containers"];
        assert_eq!(containers[0]["env"], json!([{"name": "A", "value": "1"}]));
        assert_eq!(containers[1]["env"], json!([{"name": "A", "value": "1"}]));
    }

    #[test]
    fn test_no_overrides_keeps_shape() {
        let doc = deployment(json!([{"name": "app"}]));
        let result = inject_env_vars(&doc, &[]);
        assert_eq!(result, doc);
        assert!(result["spec"]["template"]["spec"]["containers"][0]
            .get("env")
            .is_none());
    }

    #[test]
    fn test_empty_value_written_as_bare_name() {
        let doc = deployment(json!([{"name": "app"}]));
        let result = inject_env_vars(&doc, &[EnvOverride::new("FLAG", "")]);
        assert_eq!(
            result["spec"]["template"]["spec"]["containers"][0]["env"],
            json!([{"name": "FLAG"}])
        );
    }

    #[test]
    fn test_job_and_cronjob_paths() {
        let job = json!({
            "kind": "Job",
            "spec": {"template": {"spec": {"containers": [{"name": "migrate"}]}}}
        });
        let cron = json!({
            "kind": "CronJob",
            "spec": {"jobTemplate": {"spec": {"template": {"spec": {"containers": [{"name": "tick"}]}}}}}
        });
        let overrides = [EnvOverride::new("PR", "7")];

        let job = inject_env_vars(&job, &overrides);
        assert_eq!(
            job["spec"]["template"]["spec"]["containers"][0]["env"][0]["value"],
            "7"
        );

        let cron = inject_env_vars(&cron, &overrides);
        assert_eq!(
            cron["spec"]["jobTemplate"]["spec"]["template"]["spec"]["containers"][0]["env"][0]
                ["value"],
            "7"
        );
    }

    #[test]
    fn test_unsupported_kind_and_missing_path_unchanged() {
        let overrides = [EnvOverride::new("A", "1")];

        let service = json!({"kind": "Service", "spec": {"template": {"spec": {"containers": [{}]}}}});
        assert_eq!(inject_env_vars(&service, &overrides), service);

        let no_kind = json!({"spec": {"template": {"spec": {"containers": [{}]}}}});
        assert_eq!(inject_env_vars(&no_kind, &overrides), no_kind);

        let broken = json!({"kind": "Deployment", "spec": {"template": {}}});
        assert_eq!(inject_env_vars(&broken, &overrides), broken);
    }

    #[test]
    fn test_registering_a_new_kind() {
        fn stateful_set(document: &mut Value) -> Option<&mut Vec<Value>> {
            document
                .pointer_mut("/spec/template/spec/containers")?
                .as_array_mut()
        }

        let mut registry = ContainerRegistry::default();
        assert!(!registry.supports("StatefulSet"));
        registry.register("StatefulSet", stateful_set);
        assert!(registry.supports("StatefulSet"));

        let injector = EnvVarInjector::new(registry);
        let doc = json!({
            "kind": "StatefulSet",
            "spec": {"template": {"spec": {"containers": [{"name": "db"}]}}}
        });
        let result = injector.inject(&doc, &[EnvOverride::new("A", "1")]);
        assert_eq!(
            result["spec"]["template"]["spec"]["containers"][0]["env"],
            json!([{"name": "A", "value": "1"}])
        );
    }

    #[test]
    fn test_value_from_is_rejected() {
        let literal = PullRequestEnvVar {
            name: "MODE".to_string(),
            value: Some("preview".to_string()),
            value_from: None,
        };
        let reference = PullRequestEnvVar {
            name: "TOKEN".to_string(),
            value: None,
            value_from: Some(json!({"secretKeyRef": {"name": "s", "key": "k"}})),
        };

        assert_eq!(
            EnvOverride::try_from(&literal).unwrap(),
            EnvOverride::new("MODE", "preview")
        );
        let err = env_overrides_from(&[literal, reference]).unwrap_err();
        assert!(matches!(err, KubeError::UnsupportedEnvVar { ref name, .. } if name == "TOKEN"));
    }

    #[test]
    fn test_parse_env_override() {
        assert_eq!(
            "GREETING=hello=world".parse::<EnvOverride>().unwrap(),
            EnvOverride::new("GREETING", "hello=world")
        );
        assert_eq!(
            "EMPTY=".parse::<EnvOverride>().unwrap(),
            EnvOverride::new("EMPTY", "")
        );
        assert!("=value".parse::<EnvOverride>().is_err());
        assert!("novalue".parse::<EnvOverride>().is_err());
    }
}
