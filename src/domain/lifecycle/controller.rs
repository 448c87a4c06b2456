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

//! PullRequest lifecycle driven by pull request events
//!
//! Every matched ReviewApp is handled on its own and in order. A failure for one
//! ReviewApp is logged and recorded in the report, and the remaining ones are
//! still processed. Nothing is retried: the next event for the same pull
//! request (or an explicit resync) converges the state.

use super::ownership::ensure_owner_reference;
use crate::domain::event::{route, Intent, PullRequestAction, PullRequestEvent};
use crate::infrastructure::kubernetes::client::ReviewAppKubeClient;
use crate::infrastructure::kubernetes::crd::{
    pull_request_name, PullRequest, PullRequestSpec, ReviewApp,
};
use crate::shared::error::KubeError;
use kube::{Resource, ResourceExt};
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Deleted,
    AlreadyAbsent,
    Failed(String),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Created => write!(f, "created"),
            Outcome::Updated => write!(f, "updated"),
            Outcome::Deleted => write!(f, "deleted"),
            Outcome::AlreadyAbsent => write!(f, "already absent"),
            Outcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppOutcome {
    pub review_app: String,
    pub namespace: String,
    pub pull_request: String,
    pub outcome: Outcome,
}

/// Result of handling one event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// `None` when the event was ignored
    pub action: Option<PullRequestAction>,
    pub outcomes: Vec<AppOutcome>,
}

impl DispatchReport {
    pub fn is_ignored(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &AppOutcome> {
        self.outcomes.iter().filter(|o| o.outcome.is_failure())
    }
}

/// Build the PullRequest record a ReviewApp should own for a pull request.
pub fn desired_pull_request(
    review_app: &ReviewApp,
    pr_number: &str,
    head_commit_ref: &str,
) -> Result<PullRequest, KubeError> {
    let app_name = review_app.name_any();
    let owner = review_app.controller_owner_ref(&()).ok_or_else(|| {
        KubeError::InvalidResource(format!("ReviewApp '{}' has no uid", app_name))
    })?;

    let mut pull_request = PullRequest::new(
        &pull_request_name(&app_name, pr_number),
        PullRequestSpec {
            parent_review_app: app_name,
            pr_number: pr_number.to_string(),
            head_commit_ref: head_commit_ref.to_string(),
            env_vars: Vec::new(),
        },
    );
    pull_request.metadata.namespace = review_app.namespace();
    pull_request.metadata.owner_references = Some(vec![owner]);
    Ok(pull_request)
}

pub struct LifecycleController {
    client: Arc<dyn ReviewAppKubeClient>,
}

impl LifecycleController {
    pub fn new(client: Arc<dyn ReviewAppKubeClient>) -> Self {
        Self { client }
    }

    /// Handle one pull request event.
    ///
    /// Only a failure to list ReviewApps is returned as an error; per-app
    /// failures are reported in the [`DispatchReport`].
    pub async fn dispatch(&self, event: &PullRequestEvent) -> Result<DispatchReport, KubeError> {
        if PullRequestAction::parse(&event.action).is_none() {
            debug!(action = %event.action, pr = event.number, "ignoring pull request event");
            return Ok(DispatchReport::default());
        }

        let review_apps = self.client.list_review_apps().await?;
        let Some(routed) = route(event, &review_apps) else {
            return Ok(DispatchReport::default());
        };

        info!(
            action = %routed.action,
            repository = %event.repository.url,
            pr = event.number,
            review_apps = routed.applications.len(),
            "dispatching pull request event"
        );

        let mut report = DispatchReport {
            action: Some(routed.action),
            outcomes: Vec::with_capacity(routed.applications.len()),
        };

        for review_app in routed.applications {
            let app_name = review_app.name_any();
            let namespace = review_app.namespace().unwrap_or_default();
            let pull_request = pull_request_name(&app_name, routed.intent.pr_number());

            let result = match &routed.intent {
                Intent::Upsert {
                    pr_number,
                    head_commit_sha,
                } => self.upsert(review_app, pr_number, head_commit_sha).await,
                Intent::Remove { pr_number } => self.remove(review_app, pr_number).await,
            };

            let outcome = match result {
                Ok(outcome) => {
                    info!(
                        review_app = %app_name,
                        %namespace,
                        %pull_request,
                        %outcome,
                        "PullRequest reconciled"
                    );
                    outcome
                }
                Err(e) => {
                    error!(
                        review_app = %app_name,
                        %namespace,
                        %pull_request,
                        error = %e,
                        "Failed to reconcile PullRequest"
                    );
                    Outcome::Failed(e.to_string())
                }
            };

            report.outcomes.push(AppOutcome {
                review_app: app_name,
                namespace,
                pull_request,
                outcome,
            });
        }

        Ok(report)
    }

    /// Create the PullRequest record, or refresh its spec if it already exists.
    pub async fn upsert(
        &self,
        review_app: &ReviewApp,
        pr_number: &str,
        head_commit_ref: &str,
    ) -> Result<Outcome, KubeError> {
        let desired = desired_pull_request(review_app, pr_number, head_commit_ref)?;
        let namespace = desired.namespace().unwrap_or_default();
        let name = desired.name_any();

        match self.client.get_pull_request(&namespace, &name).await? {
            None => {
                self.client.create_pull_request(&desired).await?;
                Ok(Outcome::Created)
            }
            Some(mut existing) => {
                existing.spec = desired.spec;
                if let Some(owner) = desired
                    .metadata
                    .owner_references
                    .as_ref()
                    .and_then(|refs| refs.first())
                {
                    ensure_owner_reference(&mut existing.metadata, owner);
                }
                self.client.replace_pull_request(&existing).await?;
                Ok(Outcome::Updated)
            }
        }
    }

    /// Delete the PullRequest record; a record that is already gone is fine.
    pub async fn remove(
        &self,
        review_app: &ReviewApp,
        pr_number: &str,
    ) -> Result<Outcome, KubeError> {
        let namespace = review_app.namespace().unwrap_or_default();
        let name = pull_request_name(&review_app.name_any(), pr_number);

        if self.client.delete_pull_request(&namespace, &name).await? {
            Ok(Outcome::Deleted)
        } else {
            Ok(Outcome::AlreadyAbsent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::kubernetes::crd::ReviewAppSpec;
    use crate::infrastructure::kubernetes::memory::InMemoryKubeClient;

    const REPO: &str = "https://github.com/example/echo";

    fn review_app(name: &str, repository_url: &str) -> ReviewApp {
        let mut app = ReviewApp::new(
            name,
            ReviewAppSpec {
                repository_url: repository_url.to_string(),
                resources: Vec::new(),
            },
        );
        app.metadata.namespace = Some("review".to_string());
        app.metadata.uid = Some(format!("uid-{}", name));
        app
    }

    fn controller(apps: Vec<ReviewApp>) -> (Arc<InMemoryKubeClient>, LifecycleController) {
        let client = Arc::new(InMemoryKubeClient::with_review_apps(apps));
        let controller = LifecycleController::new(client.clone());
        (client, controller)
    }

    #[test]
    fn test_desired_pull_request() {
        let app = review_app("echo", REPO);
        let pr = desired_pull_request(&app, "10", "abc").unwrap();

        assert_eq!(pr.name_any(), "echo-pr10");
        assert_eq!(pr.namespace().as_deref(), Some("review"));
        assert_eq!(pr.spec.parent_review_app, "echo");
        assert_eq!(pr.spec.head_commit_ref, "abc");
        let owners = pr.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].uid, "uid-echo");
        assert_eq!(owners[0].kind, "ReviewApp");
        assert_eq!(owners[0].controller, Some(true));
    }

    #[test]
    fn test_desired_pull_request_requires_uid() {
        let mut app = review_app("echo", REPO);
        app.metadata.uid = None;
        assert!(desired_pull_request(&app, "10", "abc").is_err());
    }

    #[tokio::test]
    async fn test_opened_then_synchronize() {
        let (client, controller) = controller(vec![review_app("echo", REPO)]);

        let report = controller
            .dispatch(&PullRequestEvent::new("opened", REPO, 10, "aaa"))
            .await
            .unwrap();
        assert_eq!(report.outcomes[0].outcome, Outcome::Created);

        let report = controller
            .dispatch(&PullRequestEvent::new("synchronize", REPO, 10, "bbb"))
            .await
            .unwrap();
        assert_eq!(report.outcomes[0].outcome, Outcome::Updated);

        let records = client.pull_requests();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].spec.head_commit_ref, "bbb");
        assert_eq!(
            records[0].metadata.owner_references.as_ref().map(Vec::len),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_closed_deletes_and_is_idempotent() {
        let (client, controller) = controller(vec![review_app("echo", REPO)]);
        controller
            .dispatch(&PullRequestEvent::new("opened", REPO, 3, "aaa"))
            .await
            .unwrap();

        let closed = PullRequestEvent::new("closed", REPO, 3, "");
        let report = controller.dispatch(&closed).await.unwrap();
        assert_eq!(report.outcomes[0].outcome, Outcome::Deleted);
        assert!(client.pull_requests().is_empty());

        let report = controller.dispatch(&closed).await.unwrap();
        assert_eq!(report.outcomes[0].outcome, Outcome::AlreadyAbsent);
        assert_eq!(report.failures().count(), 0);
    }

    #[tokio::test]
    async fn test_ignored_action_touches_nothing() {
        let (client, controller) = controller(vec![review_app("echo", REPO)]);
        let report = controller
            .dispatch(&PullRequestEvent::new("labeled", REPO, 3, "aaa"))
            .await
            .unwrap();
        assert!(report.is_ignored());
        assert_eq!(report.action, None);
        assert!(client.operations().is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_other_apps() {
        let (client, controller) = controller(vec![
            review_app("broken", REPO),
            review_app("echo", REPO),
        ]);
        client.fail_on("broken-pr5");

        let report = controller
            .dispatch(&PullRequestEvent::new("opened", REPO, 5, "aaa"))
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcomes[0].outcome.is_failure());
        assert_eq!(report.outcomes[1].outcome, Outcome::Created);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(client.pull_requests()[0].name_any(), "echo-pr5");
    }
}
