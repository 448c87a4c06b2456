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

use super::payload::{PullRequestAction, PullRequestEvent};
use crate::infrastructure::kubernetes::crd::ReviewApp;
use tracing::debug;

/// What the lifecycle controller should do for each matched ReviewApp
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Upsert {
        pr_number: String,
        head_commit_sha: String,
    },
    Remove {
        pr_number: String,
    },
}

impl Intent {
    pub fn pr_number(&self) -> &str {
        match self {
            Intent::Upsert { pr_number, .. } | Intent::Remove { pr_number } => pr_number,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutedEvent<'a> {
    pub action: PullRequestAction,
    pub applications: Vec<&'a ReviewApp>,
    pub intent: Intent,
}

/// Match an event against the known ReviewApps and classify it.
///
/// Returns `None` for irrelevant actions and for repositories no ReviewApp
/// declares. Repository URLs are compared verbatim.
pub fn route<'a>(
    event: &PullRequestEvent,
    applications: &'a [ReviewApp],
) -> Option<RoutedEvent<'a>> {
    let Some(action) = PullRequestAction::parse(&event.action) else {
        debug!(action = %event.action, "ignoring pull request action");
        return None;
    };

    let matched: Vec<&ReviewApp> = applications
        .iter()
        .filter(|app| app.matches_repository(&event.repository.url))
        .collect();
    if matched.is_empty() {
        debug!(repository = %event.repository.url, "no ReviewApp for repository");
        return None;
    }

    let pr_number = event.pr_number();
    let intent = match action {
        PullRequestAction::Opened
        | PullRequestAction::Reopened
        | PullRequestAction::Synchronize => Intent::Upsert {
            pr_number,
            head_commit_sha: event.pull_request.head_commit_sha.clone(),
        },
        PullRequestAction::Closed => Intent::Remove { pr_number },
    };

    Some(RoutedEvent {
        action,
        applications: matched,
        intent,
    })
}
