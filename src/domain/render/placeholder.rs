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

//! `{{ NAME }}` substitution over generic resource documents.

use super::context::RenderContext;
use regex::{NoExpand, Regex};
use serde_json::Value;
use tracing::debug;

/// Compiled token patterns for one render context.
pub struct PlaceholderResolver<'a> {
    tokens: Vec<(Regex, &'a str)>,
}

impl<'a> PlaceholderResolver<'a> {
    pub fn new(context: &'a RenderContext) -> Self {
        let tokens = context
            .iter()
            .filter_map(|(key, value)| {
                let pattern = format!(r"\{{\{{\s*{}\s*\}}\}}", regex::escape(key));
                match Regex::new(&pattern) {
                    Ok(re) => Some((re, value)),
                    Err(e) => {
                        debug!(key, error = %e, "skipping unusable placeholder key");
                        None
                    }
                }
            })
            .collect();

        Self { tokens }
    }

    /// Replace every known token in `s`. Keys are applied in context order.
    pub fn resolve_str(&self, s: &str) -> String {
        let mut resolved = s.to_string();
        for (re, value) in &self.tokens {
            if re.is_match(&resolved) {
                resolved = re.replace_all(&resolved, NoExpand(value)).into_owned();
            }
        }
        resolved
    }

    /// Rewrite all string leaves of `document`. Object keys are left alone.
    pub fn resolve_in_place(&self, document: &mut Value) {
        match document {
            Value::String(s) => {
                if s.contains("{{") {
                    *s = self.resolve_str(s);
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.resolve_in_place(item);
                }
            }
            Value::Object(map) => {
                for (_, item) in map.iter_mut() {
                    self.resolve_in_place(item);
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }
}

/// Return a copy of `document` with placeholders from `context` substituted.
///
/// Tokens whose key is not in the context are left verbatim.
pub fn resolve(document: &Value, context: &RenderContext) -> Value {
    let mut resolved = document.clone();
    PlaceholderResolver::new(context).resolve_in_place(&mut resolved);
    resolved
}
