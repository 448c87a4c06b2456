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

//! Rendering and merge engine for ReviewApp resource templates

pub mod context;
pub mod env;
pub mod merger;
pub mod placeholder;
pub mod template;

pub use self::context::RenderContext;
pub use self::env::{
    env_overrides_from, inject_env_vars, ContainerExtractor, ContainerRegistry, EnvOverride,
    EnvVarInjector,
};
pub use self::merger::merge;
pub use self::placeholder::{resolve, PlaceholderResolver};
pub use self::template::{render, TemplateRenderer};
