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

/// Custom resource group and version
pub const API_GROUP: &str = "reviewapp.io";
pub const API_VERSION: &str = "v1";

/// Kinds
pub const KIND_REVIEW_APP: &str = "ReviewApp";
pub const KIND_PULL_REQUEST: &str = "PullRequest";

/// Pull request record naming: `<review-app>-pr<number>`
pub const PULL_REQUEST_NAME_INFIX: &str = "-pr";

/// Render context keys
pub const VAR_PR_NUMBER: &str = "PR_NUMBER";
pub const VAR_HEAD_COMMIT_REF: &str = "HEAD_COMMIT_REF";
pub const VAR_PR_NAME: &str = "PR_NAME";
pub const VAR_REVIEW_APP_NAME: &str = "REVIEW_APP_NAME";
pub const VAR_NAMESPACE: &str = "NAMESPACE";

/// Workload kinds that receive environment variable overrides
pub const KIND_DEPLOYMENT: &str = "Deployment";
pub const KIND_JOB: &str = "Job";
pub const KIND_CRON_JOB: &str = "CronJob";

/// Container list locations (JSON pointers)
pub const POD_TEMPLATE_CONTAINERS_PATH: &str = "/spec/template/spec/containers";
pub const JOB_TEMPLATE_CONTAINERS_PATH: &str = "/spec/jobTemplate/spec/template/spec/containers";

/// Pull request actions
pub const ACTION_OPENED: &str = "opened";
pub const ACTION_REOPENED: &str = "reopened";
pub const ACTION_SYNCHRONIZE: &str = "synchronize";
pub const ACTION_CLOSED: &str = "closed";

/// Controller defaults
pub const DEFAULT_FIELD_MANAGER: &str = "reviewapp-kube";
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;
