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

use clap::Parser;
use reviewapp_kube::cli::{commands::Commands, CliArgs};
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Initialize tracing
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    match args.command {
        Commands::Dispatch(cmd) => cmd.execute().await,
        Commands::Render(cmd) => cmd.execute().await,
        Commands::Materialize(cmd) => cmd.execute().await,
        Commands::Resync(cmd) => cmd.execute().await,
        Commands::List(cmd) => cmd.execute().await,
        Commands::Crd(cmd) => cmd.execute().await,
    }
}
