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
use std::collections::HashMap;
use tracing::warn;

/// Apply `-D key=value` overrides on top of file-based configuration.
pub fn apply_to_controller_config(
    configs: &HashMap<String, String>,
    controller_config: &mut ControllerConfig,
) {
    if let Some(namespace) = configs.get("controller.namespace") {
        controller_config.namespace = if namespace.is_empty() {
            None
        } else {
            Some(namespace.clone())
        };
    }

    if let Some(path) = configs.get("controller.kubeconfig") {
        controller_config.kubeconfig = Some(path.clone());
    }

    if let Some(context) = configs.get("controller.context") {
        controller_config.context = Some(context.clone());
    }

    if let Some(timeout_str) = configs.get("controller.operation-timeout") {
        match timeout_str.parse::<u64>() {
            Ok(timeout) => controller_config.operation_timeout_secs = timeout,
            Err(_) => warn!(value = %timeout_str, "ignoring invalid controller.operation-timeout"),
        }
    }

    if let Some(field_manager) = configs.get("controller.field-manager") {
        controller_config.field_manager = field_manager.clone();
    }
}

/// Parse dynamic configuration properties from -D key=value format
pub fn parse_dynamic_configs(configs: &[String]) -> Result<HashMap<String, String>, String> {
    let mut map = HashMap::new();

    for config in configs {
        let parts: Vec<&str> = config.splitn(2, '=').collect();
        if parts.len() != 2 {
            return Err(format!(
                "Invalid config format: '{}'. Expected 'key=value'",
                config
            ));
        }

        let key = parts[0].trim();
        let value = parts[1].trim();

        if key.is_empty() {
            return Err(format!("Empty key in config: '{}'", config));
        }

        map.insert(key.to_string(), value.to_string());
    }

    Ok(map)
}
