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

use crate::infrastructure::constants::{DEFAULT_FIELD_MANAGER, DEFAULT_OPERATION_TIMEOUT_SECS};
use crate::shared::error::KubeError;
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::time::Duration;

/// Controller configuration, loaded from `reviewapp-kube.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    /// Namespace to watch; all namespaces when unset
    pub namespace: Option<String>,
    pub kubeconfig: Option<String>,
    pub context: Option<String>,
    /// Deadline applied to every individual cluster call
    pub operation_timeout_secs: u64,
    pub field_manager: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            kubeconfig: None,
            context: None,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from TOML file
    pub fn from<T: AsRef<str>>(path: T) -> Result<Self, KubeError> {
        let content = read_to_string(path.as_ref()).map_err(|e| {
            KubeError::config_error(format!(
                "Failed to read config file {}: {}",
                path.as_ref(),
                e
            ))
        })?;

        let conf: Self = toml::from_str(&content)?;
        Ok(conf)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), KubeError> {
        if let Some(ref ns) = self.namespace {
            if !is_valid_k8s_name(ns) {
                return Err(KubeError::config_error(format!("Invalid namespace: {}", ns)));
            }
        }

        if self.operation_timeout_secs == 0 {
            return Err(KubeError::config_error("operation_timeout_secs must be > 0"));
        }

        if self.field_manager.trim().is_empty() {
            return Err(KubeError::config_error("field_manager must not be empty"));
        }

        Ok(())
    }
}

pub(crate) fn is_valid_k8s_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 63 {
        return false;
    }

    if !name.chars().next().unwrap_or(' ').is_ascii_alphanumeric() {
        return false;
    }
    if !name.chars().last().unwrap_or(' ').is_ascii_alphanumeric() {
        return false;
    }

    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let conf = ControllerConfig::default();
        assert_eq!(conf.namespace, None);
        assert_eq!(conf.operation_timeout(), Duration::from_secs(30));
        assert_eq!(conf.field_manager, "reviewapp-kube");
        assert!(conf.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "namespace = \"review\"\noperation_timeout_secs = 5\ncontext = \"kind-dev\""
        )
        .unwrap();

        let conf = ControllerConfig::from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(conf.namespace.as_deref(), Some("review"));
        assert_eq!(conf.operation_timeout_secs, 5);
        assert_eq!(conf.context.as_deref(), Some("kind-dev"));
        assert_eq!(conf.field_manager, "reviewapp-kube");
    }

    #[test]
    fn test_missing_file() {
        let err = ControllerConfig::from("/nonexistent/reviewapp-kube.toml").unwrap_err();
        assert!(matches!(err, KubeError::ConfigError(_)));
    }

    #[test]
    fn test_validate() {
        let mut conf = ControllerConfig {
            operation_timeout_secs: 0,
            ..Default::default()
        };
        assert!(conf.validate().is_err());

        conf.operation_timeout_secs = 10;
        conf.namespace = Some("Review_Apps".to_string());
        assert!(conf.validate().is_err());

        conf.namespace = Some("review-apps".to_string());
        conf.field_manager = " ".to_string();
        assert!(conf.validate().is_err());
    }

    #[test]
    fn test_is_valid_k8s_name() {
        assert!(is_valid_k8s_name("default"));
        assert!(is_valid_k8s_name("review-1"));
        assert!(!is_valid_k8s_name("-review"));
        assert!(!is_valid_k8s_name("review-"));
        assert!(!is_valid_k8s_name(""));
    }
}
