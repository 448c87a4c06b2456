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

use crate::domain::config::{apply_to_controller_config, parse_dynamic_configs, ControllerConfig};
use crate::domain::event::PullRequestEvent;
use crate::domain::lifecycle::{
    render_context, DispatchReport, LifecycleController, MaterializeReport, Materializer, Outcome,
};
use crate::domain::render::{EnvOverride, TemplateRenderer};
use crate::infrastructure::kubernetes::{
    pull_request_name, InMemoryKubeClient, PullRequest, PullRequestSpec, ReviewApp,
    ReviewAppKubeClient, ReviewAppKubeClientImpl,
};
use crate::shared::error::KubeError;
use chrono::Utc;
use clap::{Args, Parser};
use kube::{CustomResourceExt, ResourceExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, warn};

const CONF_FILE_ENV: &str = "REVIEWAPP_CONF_FILE";

/// Cluster connection options shared by every command that talks to the API server
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Path to controller configuration file (reviewapp-kube.toml)
    /// If not provided, REVIEWAPP_CONF_FILE is used when set, otherwise defaults
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<String>,

    /// Kubernetes namespace; all namespaces when omitted
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,

    /// Path to kubeconfig file
    /// If not specified, uses default kubeconfig resolution (KUBECONFIG env or ~/.kube/config)
    #[arg(long)]
    pub kubeconfig: Option<String>,

    /// Kubernetes context to use
    #[arg(long)]
    pub context: Option<String>,

    /// Deadline for each cluster call, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Dynamic configuration properties to override any settings (-D key=value)
    ///
    /// Keys: controller.namespace, controller.kubeconfig, controller.context,
    /// controller.operation-timeout, controller.field-manager
    ///
    /// Example: -Dcontroller.operation-timeout=10
    #[arg(short = 'D', value_name = "KEY=VALUE")]
    pub properties: Vec<String>,
}

impl ConnectionArgs {
    /// Resolve configuration. Priority: command line > -D properties > config file > defaults
    pub fn resolve(&self) -> anyhow::Result<ControllerConfig> {
        let mut config = if let Some(ref path) = self.config_file {
            ControllerConfig::from(path)?
        } else if let Ok(env_path) = std::env::var(CONF_FILE_ENV) {
            ControllerConfig::from(&env_path)?
        } else {
            ControllerConfig::default()
        };

        if !self.properties.is_empty() {
            let dynamic_configs = parse_dynamic_configs(&self.properties)
                .map_err(|e| anyhow::anyhow!("Failed to parse dynamic configs: {}", e))?;
            apply_to_controller_config(&dynamic_configs, &mut config);
        }

        if let Some(ref namespace) = self.namespace {
            config.namespace = Some(namespace.clone());
        }
        if let Some(ref kubeconfig) = self.kubeconfig {
            config.kubeconfig = Some(kubeconfig.clone());
        }
        if let Some(ref context) = self.context {
            config.context = Some(context.clone());
        }
        if let Some(timeout) = self.timeout {
            config.operation_timeout_secs = timeout;
        }

        config.validate()?;
        Ok(config)
    }

    async fn connect(&self) -> anyhow::Result<(ControllerConfig, Arc<dyn ReviewAppKubeClient>)> {
        let config = self.resolve()?;
        let client = ReviewAppKubeClientImpl::new(&config)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;
        Ok((config, Arc::new(client)))
    }
}

#[derive(Parser, Debug)]
pub struct DispatchCommand {
    /// Pull request event payload (JSON)
    #[arg(long, value_name = "PATH")]
    pub event: String,

    /// Render and apply the resources of every created or updated PullRequest
    #[arg(long)]
    pub materialize: bool,

    /// Run against in-memory state seeded from --review-app files instead of a cluster
    #[arg(long, requires = "review_app")]
    pub dry_run: bool,

    /// ReviewApp manifest (YAML, may contain several documents); used with --dry-run
    #[arg(long, value_name = "PATH")]
    pub review_app: Vec<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Parser, Debug)]
pub struct RenderCommand {
    /// ReviewApp manifest (YAML)
    #[arg(long, value_name = "PATH")]
    pub review_app: String,

    /// Pull request number
    #[arg(long)]
    pub pr_number: String,

    /// Head commit SHA of the pull request
    #[arg(long, default_value = "")]
    pub head_commit_ref: String,

    /// Env override for every workload container (-e NAME=VALUE)
    #[arg(short = 'e', long = "env", value_name = "NAME=VALUE")]
    pub env: Vec<EnvOverride>,
}

#[derive(Parser, Debug)]
pub struct MaterializeCommand {
    /// PullRequest name, e.g. echo-pr10
    #[arg(long)]
    pub name: String,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Parser, Debug)]
pub struct ResyncCommand {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Print the ReviewApp and PullRequest CustomResourceDefinitions
#[derive(Parser, Debug)]
pub struct CrdCommand {}

#[derive(Parser, Debug)]
pub struct ListCommand {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Read every ReviewApp document from a YAML file.
pub fn load_review_apps(path: &str) -> Result<Vec<ReviewApp>, KubeError> {
    let content = std::fs::read_to_string(path)?;

    let mut apps = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&content) {
        apps.push(ReviewApp::deserialize(document)?);
    }
    Ok(apps)
}

fn load_event(path: &str) -> Result<PullRequestEvent, KubeError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

impl DispatchCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        use crate::cli::display::TableRenderer;

        let event = load_event(&self.event)
            .map_err(|e| anyhow::anyhow!("Failed to load event {}: {}", self.event, e))?;

        let client: Arc<dyn ReviewAppKubeClient> = if self.dry_run {
            let mut apps = Vec::new();
            for path in &self.review_app {
                apps.extend(
                    load_review_apps(path)
                        .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", path, e))?,
                );
            }
            println!("ℹ️  Dry run against {} ReviewApp(s), no cluster is touched", apps.len());
            Arc::new(InMemoryKubeClient::with_review_apps(apps))
        } else {
            self.connection.connect().await?.1
        };

        let controller = LifecycleController::new(client.clone());
        let report = controller
            .dispatch(&event)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to dispatch event: {}", e))?;

        let renderer = TableRenderer::new();
        println!("{}", renderer.render_dispatch_report(&report));

        if self.materialize {
            for materialized in materialize_dispatched(client.clone(), &report).await {
                println!("{}", renderer.render_materialize_report(&materialized));
            }
        }

        if let Some(summary) = failure_summary(&report) {
            println!("⚠️  {}", summary);
        }
        Ok(())
    }
}

/// One line naming the apps a dispatch failed for, `None` when all succeeded.
pub fn failure_summary(report: &DispatchReport) -> Option<String> {
    let failed: Vec<String> = report
        .failures()
        .map(|entry| format!("{}/{}", entry.namespace, entry.review_app))
        .collect();
    if failed.is_empty() {
        return None;
    }
    Some(format!(
        "{} of {} ReviewApp(s) failed: {}",
        failed.len(),
        report.outcomes.len(),
        failed.join(", ")
    ))
}

/// Materialize every PullRequest a dispatch created or updated.
///
/// A PullRequest that cannot be read or materialized is logged and reported;
/// the remaining ones still run.
pub async fn materialize_dispatched(
    client: Arc<dyn ReviewAppKubeClient>,
    report: &DispatchReport,
) -> Vec<MaterializeReport> {
    let materializer = Materializer::new(client.clone());
    let mut reports = Vec::new();

    for entry in &report.outcomes {
        if !matches!(entry.outcome, Outcome::Created | Outcome::Updated) {
            continue;
        }
        let result = match client
            .get_pull_request(&entry.namespace, &entry.pull_request)
            .await
        {
            Ok(Some(pull_request)) => materializer.materialize(&pull_request).await,
            Ok(None) => {
                warn!(
                    pull_request = %entry.pull_request,
                    namespace = %entry.namespace,
                    "PullRequest disappeared before it could be materialized"
                );
                continue;
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(materialized) => reports.push(materialized),
            Err(e) => {
                error!(
                    pull_request = %entry.pull_request,
                    namespace = %entry.namespace,
                    error = %e,
                    "Failed to materialize PullRequest"
                );
                reports.push(MaterializeReport {
                    pull_request: entry.pull_request.clone(),
                    namespace: entry.namespace.clone(),
                    resources: Vec::new(),
                    error: Some(e.to_string()),
                });
            }
        }
    }

    reports
}

impl RenderCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let apps = load_review_apps(&self.review_app)
            .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", self.review_app, e))?;
        let app = apps
            .first()
            .ok_or_else(|| anyhow::anyhow!("No ReviewApp found in {}", self.review_app))?;

        let mut pull_request = PullRequest::new(
            &pull_request_name(&app.name_any(), &self.pr_number),
            PullRequestSpec {
                parent_review_app: app.name_any(),
                pr_number: self.pr_number.clone(),
                head_commit_ref: self.head_commit_ref.clone(),
                env_vars: Vec::new(),
            },
        );
        pull_request.metadata.namespace =
            Some(app.namespace().unwrap_or_else(|| "default".to_string()));

        let context = render_context(&pull_request);
        let rendered =
            TemplateRenderer::default().render_all(&app.spec.resources, &context, &self.env);

        let mut documents = Vec::with_capacity(rendered.len());
        for document in &rendered {
            documents.push(serde_yaml::to_string(document)?);
        }
        print!("{}", documents.join("---\n"));
        Ok(())
    }
}

impl MaterializeCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        use crate::cli::display::TableRenderer;

        let (config, client) = self.connection.connect().await?;
        let namespace = config.namespace.unwrap_or_else(|| "default".to_string());

        let pull_request = client
            .get_pull_request(&namespace, &self.name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("PullRequest {}/{} not found", namespace, self.name))?;

        let report = Materializer::new(client)
            .materialize(&pull_request)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to materialize {}: {}", self.name, e))?;

        println!("{}", TableRenderer::new().render_materialize_report(&report));
        if !report.is_success() {
            anyhow::bail!("Some resources of {} could not be applied", self.name);
        }
        Ok(())
    }
}

impl ResyncCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        use crate::cli::display::TableRenderer;

        let (_, client) = self.connection.connect().await?;
        let reports = Materializer::new(client)
            .resync()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to resync: {}", e))?;

        if reports.is_empty() {
            println!("No PullRequests to resync");
            return Ok(());
        }

        let renderer = TableRenderer::new();
        for report in &reports {
            println!("{}", renderer.render_materialize_report(report));
        }

        let failed = reports.iter().filter(|r| !r.is_success()).count();
        if failed > 0 {
            println!("⚠️  {} of {} PullRequest(s) failed to resync", failed, reports.len());
        }
        Ok(())
    }
}

impl CrdCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let review_app = serde_yaml::to_string(&ReviewApp::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize ReviewApp CRD: {}", e))?;
        let pull_request = serde_yaml::to_string(&PullRequest::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize PullRequest CRD: {}", e))?;
        print!("{}---\n{}", review_app, pull_request);
        Ok(())
    }
}

impl ListCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        use crate::cli::display::{PullRequestInfo, ReviewAppInfo, TableRenderer};

        let (_, client) = self.connection.connect().await?;
        let review_apps = client
            .list_review_apps()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list ReviewApps: {}", e))?;
        let pull_requests = client
            .list_pull_requests()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list PullRequests: {}", e))?;

        let app_infos: Vec<ReviewAppInfo> = review_apps
            .iter()
            .map(|app| ReviewAppInfo {
                name: app.name_any(),
                namespace: app.namespace().unwrap_or_default(),
                repository_url: app.spec.repository_url.clone(),
                resources: app.spec.resources.len(),
                pull_requests: pull_requests
                    .iter()
                    .filter(|pr| {
                        pr.spec.parent_review_app == app.name_any()
                            && pr.namespace() == app.namespace()
                    })
                    .count(),
                created: app.creation_timestamp().map(|t| t.0),
            })
            .collect();

        let pr_infos: Vec<PullRequestInfo> = pull_requests
            .iter()
            .map(|pr| PullRequestInfo {
                name: pr.name_any(),
                namespace: pr.namespace().unwrap_or_default(),
                review_app: pr.spec.parent_review_app.clone(),
                pr_number: pr.spec.pr_number.clone(),
                head_commit_ref: pr.spec.head_commit_ref.clone(),
                created: pr.creation_timestamp().map(|t| t.0),
            })
            .collect();

        let now = Utc::now();
        let renderer = TableRenderer::new();
        println!("{}", renderer.render_review_apps(&app_infos, now));
        if !pr_infos.is_empty() {
            println!("{}", renderer.render_pull_requests(&pr_infos, now));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lifecycle::AppOutcome;
    use crate::infrastructure::kubernetes::ReviewAppSpec;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn connection(properties: Vec<String>) -> ConnectionArgs {
        ConnectionArgs {
            config_file: None,
            namespace: None,
            kubeconfig: None,
            context: None,
            timeout: None,
            properties,
        }
    }

    #[test]
    fn test_resolve_priority() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "namespace = \"from-file\"\noperation_timeout_secs = 5").unwrap();

        let mut args = connection(vec!["controller.operation-timeout=7".to_string()]);
        args.config_file = Some(file.path().to_string_lossy().to_string());
        let config = args.resolve().unwrap();
        assert_eq!(config.namespace.as_deref(), Some("from-file"));
        assert_eq!(config.operation_timeout_secs, 7);

        args.namespace = Some("from-flag".to_string());
        args.timeout = Some(9);
        let config = args.resolve().unwrap();
        assert_eq!(config.namespace.as_deref(), Some("from-flag"));
        assert_eq!(config.operation_timeout_secs, 9);
    }

    #[test]
    fn test_resolve_rejects_invalid() {
        let args = connection(vec!["not-a-pair".to_string()]);
        assert!(args.resolve().is_err());

        let mut args = connection(Vec::new());
        args.timeout = Some(0);
        assert!(args.resolve().is_err());
    }

    #[test]
    fn test_load_review_apps_multi_document() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "apiVersion: reviewapp.io/v1
kind: ReviewApp
metadata:
  name: echo
spec:
  repositoryURL: https://github.com/example/echo
---
apiVersion: reviewapp.io/v1
kind: ReviewApp
metadata:
  name: web
spec:
  repositoryURL: https://github.com/example/web
  resources:
    - apiVersion: v1
      kind: ConfigMap
      metadata:
        name: web-{{{{PR_NUMBER}}}}
"
        )
        .unwrap();

        let apps = load_review_apps(&file.path().to_string_lossy()).unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[1].name_any(), "web");
        assert_eq!(apps[1].spec.resources[0]["metadata"]["name"], "web-{{PR_NUMBER}}");
    }

    fn app_outcome(review_app: &str, pull_request: &str, outcome: Outcome) -> AppOutcome {
        AppOutcome {
            review_app: review_app.to_string(),
            namespace: "review".to_string(),
            pull_request: pull_request.to_string(),
            outcome,
        }
    }

    fn pull_request(name: &str, parent: &str) -> PullRequest {
        let mut pr = PullRequest::new(
            name,
            PullRequestSpec {
                parent_review_app: parent.to_string(),
                pr_number: "3".to_string(),
                head_commit_ref: "abc123".to_string(),
                env_vars: Vec::new(),
            },
        );
        pr.metadata.namespace = Some("review".to_string());
        pr
    }

    #[test]
    fn test_failure_summary() {
        let mut report = DispatchReport {
            outcomes: vec![app_outcome("echo", "echo-pr3", Outcome::Created)],
            ..Default::default()
        };
        assert_eq!(failure_summary(&report), None);

        report.outcomes.push(app_outcome(
            "web",
            "web-pr3",
            Outcome::Failed("connection refused".to_string()),
        ));
        assert_eq!(
            failure_summary(&report).as_deref(),
            Some("1 of 2 ReviewApp(s) failed: review/web")
        );
    }

    #[tokio::test]
    async fn test_materialize_dispatched_continues_past_failures() {
        let mut app = ReviewApp::new(
            "echo",
            ReviewAppSpec {
                repository_url: "https://github.com/example/echo".to_string(),
                resources: vec![json!({
                    "apiVersion": "v1",
                    "kind": "ConfigMap",
                    "metadata": {"name": "echo-{{PR_NUMBER}}"}
                })],
            },
        );
        app.metadata.namespace = Some("review".to_string());
        let client = Arc::new(InMemoryKubeClient::with_review_apps(vec![app]));
        client.create_pull_request(&pull_request("orphan-pr3", "gone")).await.unwrap();
        client.create_pull_request(&pull_request("echo-pr3", "echo")).await.unwrap();

        let report = DispatchReport {
            outcomes: vec![
                app_outcome("gone", "orphan-pr3", Outcome::Updated),
                app_outcome("echo", "missing-pr3", Outcome::Created),
                app_outcome("echo", "echo-pr3", Outcome::Created),
                app_outcome("old", "old-pr3", Outcome::Deleted),
            ],
            ..Default::default()
        };

        let reports = materialize_dispatched(client.clone(), &report).await;
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].pull_request, "orphan-pr3");
        assert!(reports[0].error.is_some());
        assert_eq!(reports[1].pull_request, "echo-pr3");
        assert!(reports[1].is_success());
        assert_eq!(client.resources().len(), 1);
    }
}
