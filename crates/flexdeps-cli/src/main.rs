use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flexdeps_archive::SwcCatalogInspector;
use flexdeps_build::{workspace_of, BuildContext, InvalidationReport, Resolution, StaleReason};
use flexdeps_config::{init_tracing, load_for_workspace, FlexdepsConfig};
use flexdeps_core::fs::canonicalize_if_possible;
use flexdeps_core::ClassReference;
use flexdeps_index::{InclusionIndex, JsonIndexStore};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "flexdeps",
    version,
    about = "Workspace dependency resolution and rebuild decisions for Flex projects"
)]
struct Cli {
    /// Do not warn when a project has more than one source folder
    #[arg(long, global = true)]
    quiet: bool,
    /// Configuration file (defaults to `flexdeps.toml` in the workspace root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build (or load) the class index of a workspace
    Index(IndexArgs),
    /// Print the artifacts a project depends on
    Resolve(ProjectArgs),
    /// Decide whether a project needs rebuilding (exit code 1 when it does)
    MustBuild(ProjectArgs),
    /// Delete the artifacts of a project and its dependencies
    Invalidate(InvalidateArgs),
    /// List the class references found below a directory
    Imports(ImportsArgs),
}

#[derive(Args)]
struct IndexArgs {
    /// Workspace root
    path: PathBuf,
    /// Ignore a cached index and rescan the workspace
    #[arg(long)]
    rebuild: bool,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ProjectArgs {
    /// Project directory
    path: PathBuf,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct InvalidateArgs {
    /// Project directory
    path: PathBuf,
    /// Leave the workspace index cache in place
    #[arg(long)]
    keep_index: bool,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ImportsArgs {
    /// Directory to scan
    path: PathBuf,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let env = Env {
        config: cli.config,
        quiet: cli.quiet,
    };

    match cli.command {
        Command::Index(args) => {
            let workspace = absolute(&args.path)?;
            let config = env.load_config(&workspace)?;
            let store = JsonIndexStore::for_layout(&config.layout);
            let ctx = env.context(&config, &store);

            let index = ctx.index(&workspace, !args.rebuild)?;
            let cache = store.path(&workspace);
            print_output(
                &IndexOutput {
                    workspace,
                    cache,
                    index,
                },
                args.json,
            )?;
            Ok(0)
        }
        Command::Resolve(args) => {
            let project = absolute(&args.path)?;
            let workspace = workspace_of(&project)?;
            let config = env.load_config(&workspace)?;
            let store = JsonIndexStore::for_layout(&config.layout);
            let ctx = env.context(&config, &store);

            let resolution = match ctx.open_project(&project) {
                Some(info) => {
                    let index = ctx.index(&workspace, true)?;
                    let imports = ctx.project_imports(&info.source_root);
                    flexdeps_build::resolve_detailed(
                        &index,
                        &imports,
                        flexdeps_index::ClassField::Qualified,
                    )
                }
                None => Resolution::default(),
            };
            print_output(
                &ResolveOutput {
                    project,
                    resolution,
                },
                args.json,
            )?;
            Ok(0)
        }
        Command::MustBuild(args) => {
            let project = absolute(&args.path)?;
            let workspace = workspace_of(&project)?;
            let config = env.load_config(&workspace)?;
            let store = JsonIndexStore::for_layout(&config.layout);
            let ctx = env.context(&config, &store);

            let reason = ctx.staleness(&project)?;
            let exit = if reason.is_some() { 1 } else { 0 };
            print_output(
                &MustBuildOutput {
                    project,
                    must_build: reason.is_some(),
                    reason,
                },
                args.json,
            )?;
            Ok(exit)
        }
        Command::Invalidate(args) => {
            let project = absolute(&args.path)?;
            let workspace = workspace_of(&project)?;
            let config = env.load_config(&workspace)?;
            let store = JsonIndexStore::for_layout(&config.layout);
            let ctx = env.context(&config, &store);

            let report = ctx.invalidate(&project, args.keep_index)?;
            print_output(&report, args.json)?;
            Ok(0)
        }
        Command::Imports(args) => {
            let root = absolute(&args.path)?;
            let config = env.load_config(&root)?;

            let imports = flexdeps_scan::list_class_imports(&root, &config.layout);
            print_output(&ImportsOutput { root, imports }, args.json)?;
            Ok(0)
        }
    }
}

struct Env {
    config: Option<PathBuf>,
    quiet: bool,
}

impl Env {
    fn load_config(&self, workspace_root: &Path) -> Result<FlexdepsConfig> {
        let (config, path) = match &self.config {
            Some(path) => {
                let config = FlexdepsConfig::load_from_path(path)
                    .with_context(|| format!("failed to load config {}", path.display()))?;
                (config, Some(path.clone()))
            }
            None => load_for_workspace(workspace_root).with_context(|| {
                format!("failed to load config for {}", workspace_root.display())
            })?,
        };

        init_tracing(&config.logging);
        if let Some(path) = path {
            tracing::debug!(target = "flexdeps.cli", path = %path.display(), "loaded config");
        }
        Ok(config)
    }

    fn context<'a>(
        &self,
        config: &'a FlexdepsConfig,
        store: &'a JsonIndexStore,
    ) -> BuildContext<'a> {
        BuildContext::new(&config.layout, &SwcCatalogInspector, store).quiet(self.quiet)
    }
}

/// Absolute form of a command line path; existing paths are canonicalized.
fn absolute(path: &Path) -> Result<PathBuf> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("failed to determine the current directory")?
            .join(path)
    };
    Ok(canonicalize_if_possible(&path))
}

#[derive(Serialize)]
struct IndexOutput {
    workspace: PathBuf,
    cache: PathBuf,
    index: InclusionIndex,
}

#[derive(Serialize)]
struct ResolveOutput {
    project: PathBuf,
    #[serde(flatten)]
    resolution: Resolution,
}

#[derive(Serialize)]
struct MustBuildOutput {
    project: PathBuf,
    must_build: bool,
    reason: Option<StaleReason>,
}

#[derive(Serialize)]
struct ImportsOutput {
    root: PathBuf,
    imports: Vec<ClassReference>,
}

fn print_output<T: Serialize + 'static>(value: &T, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(value)?;
        println!("{out}");
        return Ok(());
    }

    // Human output for key types. Everything else falls back to pretty JSON.
    let any = value as &dyn std::any::Any;
    if let Some(out) = any.downcast_ref::<IndexOutput>() {
        println!("indexed: {}", out.workspace.display());
        println!("  cache: {}", out.cache.display());
        println!("  records: {}", out.index.len());
        for record in out.index.iter() {
            println!(
                "  {} ({} qualified, {} unqualified)",
                record.artifact_path.display(),
                record.qualified_classes.len(),
                record.unqualified_classes.len()
            );
        }
    } else if let Some(out) = any.downcast_ref::<ResolveOutput>() {
        for artifact in &out.resolution.artifacts {
            println!("{}", artifact.display());
        }
        for collision in &out.resolution.collisions {
            println!(
                "collision: {} provided by {} artifacts",
                collision.class,
                collision.candidates.len()
            );
        }
    } else if let Some(out) = any.downcast_ref::<MustBuildOutput>() {
        match &out.reason {
            None => println!("up to date: {}", out.project.display()),
            Some(reason) => println!(
                "must build: {} ({})",
                out.project.display(),
                describe_reason(reason)
            ),
        }
    } else if let Some(report) = any.downcast_ref::<InvalidationReport>() {
        for artifact in &report.removed_artifacts {
            println!("removed: {}", artifact.display());
        }
        println!(
            "index cache: {}",
            if report.index_removed { "removed" } else { "kept" }
        );
    } else if let Some(out) = any.downcast_ref::<ImportsOutput>() {
        for import in &out.imports {
            println!("{import}");
        }
    } else {
        let out = serde_json::to_string_pretty(value)?;
        println!("{out}");
    }
    Ok(())
}

fn describe_reason(reason: &StaleReason) -> String {
    match reason {
        StaleReason::MissingArtifactFolder { folder } => {
            format!("no artifact folder {}", folder.display())
        }
        StaleReason::StaleDependency { project } => {
            format!("dependency {} must build", project.display())
        }
        StaleReason::MissingArtifact { artifact } => {
            format!("missing {}", artifact.display())
        }
        StaleReason::NewerSource { source, artifact } => format!(
            "{} is newer than {}",
            source.display(),
            artifact.display()
        ),
    }
}
