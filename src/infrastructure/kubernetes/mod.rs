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

pub mod client;
pub mod crd;
pub mod memory;

pub use self::client::{ResourceRef, ReviewAppKubeClient, ReviewAppKubeClientImpl};
pub use self::memory::InMemoryKubeClient;
pub use self::crd::{
    pull_request_name, PullRequest, PullRequestEnvVar, PullRequestSpec, ReviewApp, ReviewAppSpec,
};
