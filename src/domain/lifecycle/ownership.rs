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

use crate::shared::error::KubeError;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use serde_json::{Map, Value};

/// Add `owner` to typed metadata unless a reference with the same uid exists.
pub fn ensure_owner_reference(metadata: &mut ObjectMeta, owner: &OwnerReference) {
    let references = metadata.owner_references.get_or_insert_with(Vec::new);
    if !references.iter().any(|r| r.uid == owner.uid) {
        references.push(owner.clone());
    }
}

/// Same as [`ensure_owner_reference`] for a raw document's `metadata`.
pub fn ensure_owner_reference_in_document(
    document: &mut Value,
    owner: &OwnerReference,
) -> Result<(), KubeError> {
    let Some(root) = document.as_object_mut() else {
        return Err(KubeError::InvalidResource(
            "resource document is not an object".to_string(),
        ));
    };
    let metadata = root
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(metadata) = metadata.as_object_mut() else {
        return Err(KubeError::InvalidResource(
            "metadata is not an object".to_string(),
        ));
    };

    let references = metadata
        .entry("ownerReferences")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !references.is_array() {
        *references = Value::Array(Vec::new());
    }
    let Some(references) = references.as_array_mut() else {
        return Ok(());
    };

    let present = references
        .iter()
        .any(|r| r.get("uid").and_then(Value::as_str) == Some(owner.uid.as_str()));
    if !present {
        references.push(serde_json::to_value(owner)?);
    }
    Ok(())
}
