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

//! Merging a freshly rendered resource onto the live cluster object
//!
//! Only the keys authored under `metadata` and `spec` are taken from the rendered
//! document, one level deep. Everything else on the live object, such as `uid`,
//! `resourceVersion`, `spec.clusterIP` or `status`, survives the update.

use serde_json::{Map, Value};

const MERGED_SECTIONS: [&str; 2] = ["metadata", "spec"];

pub fn merge(rendered: &Value, existing: Option<&Value>) -> Value {
    let mut merged = match existing {
        Some(Value::Object(live)) => live.clone(),
        _ => Map::new(),
    };

    for section in MERGED_SECTIONS {
        merge_section(&mut merged, rendered, section);
    }

    Value::Object(merged)
}

fn merge_section(merged: &mut Map<String, Value>, rendered: &Value, section: &str) {
    let slot = merged
        .entry(section.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }

    if let (Some(target), Some(Value::Object(source))) =
        (slot.as_object_mut(), rendered.get(section))
    {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
}
