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

use super::context::RenderContext;
use super::env::{EnvOverride, EnvVarInjector};
use super::placeholder::PlaceholderResolver;
use serde_json::Value;

/// Renders ReviewApp resource templates for one pull request.
///
/// Env overrides are injected before placeholders are resolved, so an override
/// value such as `build {{PR_NUMBER}}` is itself resolved against the context.
#[derive(Clone, Default)]
pub struct TemplateRenderer {
    injector: EnvVarInjector,
}

impl TemplateRenderer {
    pub fn new(injector: EnvVarInjector) -> Self {
        Self { injector }
    }

    pub fn render(
        &self,
        template: &Value,
        context: &RenderContext,
        overrides: &[EnvOverride],
    ) -> Value {
        let resolver = PlaceholderResolver::new(context);
        self.render_with(&resolver, template, overrides)
    }

    /// Render a list of templates, compiling the context's token patterns once.
    pub fn render_all(
        &self,
        templates: &[Value],
        context: &RenderContext,
        overrides: &[EnvOverride],
    ) -> Vec<Value> {
        let resolver = PlaceholderResolver::new(context);
        templates
            .iter()
            .map(|template| self.render_with(&resolver, template, overrides))
            .collect()
    }

    fn render_with(
        &self,
        resolver: &PlaceholderResolver<'_>,
        template: &Value,
        overrides: &[EnvOverride],
    ) -> Value {
        let mut rendered = template.clone();
        self.injector.inject_in_place(&mut rendered, overrides);
        resolver.resolve_in_place(&mut rendered);
        rendered
    }
}

pub fn render(template: &Value, context: &RenderContext, overrides: &[EnvOverride]) -> Value {
    TemplateRenderer::default().render(template, context, overrides)
}
