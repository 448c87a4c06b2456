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

use crate::infrastructure::constants::{
    ACTION_CLOSED, ACTION_OPENED, ACTION_REOPENED, ACTION_SYNCHRONIZE,
};
use serde::{Deserialize, Serialize};

/// Pull request event, already parsed and verified by the webhook transport
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestEvent {
    pub action: String,
    pub repository: Repository,
    pub number: i64,
    pub pull_request: PullRequestHead,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Repository {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestHead {
    pub head_commit_sha: String,
}

impl PullRequestEvent {
    pub fn new(
        action: impl Into<String>,
        repository_url: impl Into<String>,
        number: i64,
        head_commit_sha: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            repository: Repository {
                url: repository_url.into(),
            },
            number,
            pull_request: PullRequestHead {
                head_commit_sha: head_commit_sha.into(),
            },
        }
    }

    pub fn pr_number(&self) -> String {
        self.number.to_string()
    }
}

/// Pull request actions that drive the review environment lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestAction {
    Opened,
    Reopened,
    Synchronize,
    Closed,
}

impl PullRequestAction {
    /// `None` for actions that do not affect review environments (labeled, edited, ...)
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            ACTION_OPENED => Some(Self::Opened),
            ACTION_REOPENED => Some(Self::Reopened),
            ACTION_SYNCHRONIZE => Some(Self::Synchronize),
            ACTION_CLOSED => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opened => ACTION_OPENED,
            Self::Reopened => ACTION_REOPENED,
            Self::Synchronize => ACTION_SYNCHRONIZE,
            Self::Closed => ACTION_CLOSED,
        }
    }
}

impl std::fmt::Display for PullRequestAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
