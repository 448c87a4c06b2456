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

//! PullRequest lifecycle and materialization

pub mod controller;
pub mod materializer;
pub mod ownership;

pub use self::controller::{
    desired_pull_request, AppOutcome, DispatchReport, LifecycleController, Outcome,
};
pub use self::materializer::{
    prepare, render_context, ApplyOutcome, MaterializeReport, Materializer, ResourceOutcome,
};
pub use self::ownership::{ensure_owner_reference, ensure_owner_reference_in_document};
