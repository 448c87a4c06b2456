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

#[cfg(test)]
mod tests {
    use kube::ResourceExt;
    use reviewapp_kube::domain::lifecycle::{ApplyOutcome, Outcome};
    use reviewapp_kube::infrastructure::kubernetes::ReviewAppSpec;
    use reviewapp_kube::*;
    use serde_json::json;
    use std::sync::Arc;

    const REPO: &str = "https://github.com/example/echo";

    fn review_app(name: &str, repository_url: &str) -> ReviewApp {
        let mut app = ReviewApp::new(
            name,
            ReviewAppSpec {
                repository_url: repository_url.to_string(),
                resources: vec![
                    json!({
                        "apiVersion": "apps/v1",
                        "kind": "Deployment",
                        "metadata": {"name": "{{PR_NAME}}"},
                        "spec": {
                            "template": {
                                "spec": {
                                    "containers": [{
                                        "name": "app",
                                        "image": "example/echo:{{ HEAD_COMMIT_REF }}"
                                    }]
                                }
                            }
                        }
                    }),
                    json!({
                        "apiVersion": "v1",
                        "kind": "Service",
                        "metadata": {"name": "{{PR_NAME}}"},
                        "spec": {"selector": {"pr": "{{PR_NUMBER}}"}}
                    }),
                ],
            },
        );
        app.metadata.namespace = Some("review".to_string());
        app
    }

    #[tokio::test]
    async fn test_closed_without_matching_app_deletes_nothing() {
        let client = Arc::new(InMemoryKubeClient::with_review_apps(vec![review_app(
            "echo", REPO,
        )]));
        let controller = LifecycleController::new(client.clone());

        let event = PullRequestEvent::new("closed", "https://github.com/example/other", 4, "");
        let report = controller.dispatch(&event).await.unwrap();

        assert!(report.is_ignored());
        assert!(!client.operations().iter().any(|op| op.starts_with("delete")));
    }

    #[tokio::test]
    async fn test_repeated_opened_is_idempotent() {
        let client = Arc::new(InMemoryKubeClient::with_review_apps(vec![review_app(
            "echo", REPO,
        )]));
        let controller = LifecycleController::new(client.clone());
        let event = PullRequestEvent::new("opened", REPO, 10, "abc");

        controller.dispatch(&event).await.unwrap();
        let first = client.pull_requests();
        let report = controller.dispatch(&event).await.unwrap();
        let second = client.pull_requests();

        assert_eq!(report.outcomes[0].outcome, Outcome::Updated);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].spec, second[0].spec);
        assert_eq!(first[0].metadata.uid, second[0].metadata.uid);
        assert_eq!(first[0].metadata.owner_references, second[0].metadata.owner_references);
    }

    #[tokio::test]
    async fn test_pull_request_lifecycle_end_to_end() {
        let client = Arc::new(InMemoryKubeClient::with_review_apps(vec![
            review_app("echo", REPO),
            review_app("unrelated", "https://github.com/example/unrelated"),
        ]));
        let controller = LifecycleController::new(client.clone());
        let materializer = Materializer::new(client.clone());

        // opened: one record for the matching app only
        let report = controller
            .dispatch(&PullRequestEvent::new("opened", REPO, 12, "1111111"))
            .await
            .unwrap();
        assert_eq!(report.outcomes.len(), 1);
        let pull_request = client.pull_requests().remove(0);
        assert_eq!(pull_request.name_any(), "echo-pr12");

        let applied = materializer.materialize(&pull_request).await.unwrap();
        assert!(applied.is_success());
        assert_eq!(applied.resources.len(), 2);
        let deployment = client
            .resources()
            .into_iter()
            .find(|r| r["kind"] == "Deployment")
            .unwrap();
        assert_eq!(deployment["metadata"]["name"], "echo-pr12");
        assert_eq!(
            deployment["spec"]["template"]["spec"]["containers"][0]["image"],
            "example/echo:1111111"
        );

        // synchronize: the record moves to the new head and a resync replaces live objects
        controller
            .dispatch(&PullRequestEvent::new("synchronize", REPO, 12, "2222222"))
            .await
            .unwrap();
        let reports = materializer.resync().await.unwrap();
        assert!(reports[0]
            .resources
            .iter()
            .all(|r| r.outcome == ApplyOutcome::Replaced));
        let deployment = client
            .resources()
            .into_iter()
            .find(|r| r["kind"] == "Deployment")
            .unwrap();
        assert_eq!(
            deployment["spec"]["template"]["spec"]["containers"][0]["image"],
            "example/echo:2222222"
        );

        // closed: the record is removed
        let report = controller
            .dispatch(&PullRequestEvent::new("closed", REPO, 12, "2222222"))
            .await
            .unwrap();
        assert_eq!(report.outcomes[0].outcome, Outcome::Deleted);
        assert!(client.pull_requests().is_empty());
    }

    #[tokio::test]
    async fn test_event_payload_from_json() {
        let event: PullRequestEvent = serde_json::from_value(json!({
            "action": "reopened",
            "repository": {"url": REPO},
            "number": 8,
            "pullRequest": {"headCommitSha": "deadbeef"}
        }))
        .unwrap();
        let client = Arc::new(InMemoryKubeClient::with_review_apps(vec![review_app(
            "echo", REPO,
        )]));

        let report = LifecycleController::new(client.clone())
            .dispatch(&event)
            .await
            .unwrap();

        assert_eq!(report.action, Some(PullRequestAction::Reopened));
        assert_eq!(client.pull_requests()[0].spec.head_commit_ref, "deadbeef");
    }
}
