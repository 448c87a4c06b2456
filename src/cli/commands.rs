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

use super::k8s::{
    CrdCommand, DispatchCommand, ListCommand, MaterializeCommand, RenderCommand, ResyncCommand,
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "reviewapp-kube",
    version,
    about = "Per-pull-request review environments on Kubernetes",
    long_about = "Turns pull request events into PullRequest records and renders each ReviewApp's resource templates into a review environment"
)]
pub struct CliArgs {
    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Handle one pull request event (creates, updates or deletes PullRequest records)
    Dispatch(DispatchCommand),

    /// Render a ReviewApp's templates for a pull request without touching a cluster
    Render(RenderCommand),

    /// Render and apply the resources of one PullRequest
    Materialize(MaterializeCommand),

    /// Materialize every PullRequest again
    Resync(ResyncCommand),

    /// List ReviewApps and their PullRequests
    List(ListCommand),

    /// Print the CustomResourceDefinitions as YAML
    Crd(CrdCommand),
}
