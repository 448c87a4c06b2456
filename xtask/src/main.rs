//! Build automation for reviewapp-kube
//!
//! Usage: cargo xtask <command>
//!
//! Available commands:
//! - build: Build the project
//! - test: Run tests
//! - crds: Regenerate deploy/crds.yaml from the Rust types
//! - dist: Create distribution packages
//! - ci: Run CI checks

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use xshell::{cmd, Shell};

const BINARY: &str = "reviewapp-kube";
const CRD_MANIFEST: &str = "deploy/crds.yaml";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation for reviewapp-kube")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project
    Build {
        /// Build in release mode
        #[arg(long)]
        release: bool,
    },
    /// Run tests
    Test {
        /// Run only the tests/ integration suites
        #[arg(long)]
        integration: bool,
    },
    /// Regenerate the CRD manifest
    Crds {
        /// Fail if the checked-in manifest is out of date instead of rewriting it
        #[arg(long)]
        check: bool,
    },
    /// Create distribution packages
    Dist {
        /// Target triple (e.g., x86_64-unknown-linux-gnu)
        #[arg(long)]
        target: Option<String>,
    },
    /// Run CI checks (format, clippy, test)
    Ci,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    sh.change_dir(project_root()?);

    match cli.command {
        Commands::Build { release } => build(&sh, release),
        Commands::Test { integration } => test(&sh, integration),
        Commands::Crds { check } => crds(&sh, check),
        Commands::Dist { target } => dist(&sh, target),
        Commands::Ci => ci(&sh),
    }
}

fn build(sh: &Shell, release: bool) -> Result<()> {
    println!("🔨 Building {}...", BINARY);

    if release {
        cmd!(sh, "cargo build --release").run()?;
    } else {
        cmd!(sh, "cargo build").run()?;
    }

    println!("✅ Build completed");
    Ok(())
}

fn test(sh: &Shell, integration: bool) -> Result<()> {
    println!("🧪 Running tests...");

    if integration {
        cmd!(sh, "cargo test --test render_test --test lifecycle_test").run()?;
    } else {
        cmd!(sh, "cargo test --all").run()?;
    }

    println!("✅ All tests passed");
    Ok(())
}

fn crds(sh: &Shell, check: bool) -> Result<()> {
    let generated = cmd!(sh, "cargo run --quiet --bin {BINARY} -- crd")
        .read()
        .context("Failed to generate CRDs")?;
    let manifest = project_root()?.join(CRD_MANIFEST);

    if check {
        let current = sh.read_file(&manifest).unwrap_or_default();
        if current.trim_end() != generated.trim_end() {
            anyhow::bail!("{} is out of date, run `cargo xtask crds`", CRD_MANIFEST);
        }
        println!("✅ {} is up to date", CRD_MANIFEST);
    } else {
        if let Some(dir) = manifest.parent() {
            sh.create_dir(dir)?;
        }
        sh.write_file(&manifest, format!("{}\n", generated))?;
        println!("✅ Wrote {}", CRD_MANIFEST);
    }
    Ok(())
}

fn dist(sh: &Shell, target: Option<String>) -> Result<()> {
    println!("📦 Creating distribution package...");

    let binary_src = if let Some(ref target_triple) = target {
        cmd!(sh, "cargo build --release --target {target_triple}").run()?;
        project_root()?.join(format!("target/{}/release/{}", target_triple, BINARY))
    } else {
        cmd!(sh, "cargo build --release").run()?;
        project_root()?.join(format!("target/release/{}", BINARY))
    };

    crds(sh, false)?;
    let dist_dir = project_root()?.join("dist");
    sh.create_dir(&dist_dir)?;
    sh.copy_file(&binary_src, dist_dir.join(BINARY))?;
    sh.copy_file(project_root()?.join(CRD_MANIFEST), dist_dir.join("crds.yaml"))?;

    let version = env!("CARGO_PKG_VERSION");
    let archive_name = format!("{}-{}.tar.gz", BINARY, version);

    cmd!(sh, "tar -czf {archive_name} -C dist {BINARY} crds.yaml")
        .run()
        .context("Failed to create tarball")?;

    println!("✅ Distribution package created: {}", archive_name);
    Ok(())
}

fn ci(sh: &Shell) -> Result<()> {
    println!("🔍 Running CI checks...");

    println!("\n📝 Checking formatting...");
    cmd!(sh, "cargo fmt --all -- --check").run()?;

    println!("\n🔧 Running clippy...");
    cmd!(sh, "cargo clippy --all-targets --all-features -- -D warnings").run()?;

    println!("\n🧪 Running tests...");
    test(sh, false)?;

    println!("\n✅ All CI checks passed!");
    Ok(())
}

fn project_root() -> Result<PathBuf> {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .context("xtask must live one level below the workspace root")
}
