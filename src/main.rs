use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rig_composer::expand::{BlueprintCatalog, DefaultAttrSet};
use rig_composer::host::{MemoryScene, SceneOp};
use rig_composer::spec::{ComponentSpec, build_template_set, load_defaults, load_template};
use rig_composer::{BuildConfig, BuildReport, Diagnostic, Diagnostics, Result, RigBuilder};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rig-composer")]
#[command(about = "Expand rig templates and plan component builds", long_about = None)]
struct Cli {
    /// Debug-level logging unless RUST_LOG is set.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args)]
struct Inputs {
    #[arg(long)]
    template: PathBuf,

    /// Directory of `<blueprintId>.json` documents.
    #[arg(long)]
    blueprints: Option<PathBuf>,

    /// Default-attribute document.
    #[arg(long)]
    defaults: Option<PathBuf>,

    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep `LR`/`RL` components as single instances.
    #[arg(long)]
    no_mirror: bool,

    /// Report cycle members as unbuilt instead of failing.
    #[arg(long)]
    allow_cycles: bool,

    /// Write JSON here instead of stdout.
    #[arg(short = 'o', long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full build against an in-memory scene and report it.
    Plan(Inputs),
    /// Write the expanded, mirrored and merged component set.
    Expand(Inputs),
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    #[serde(flatten)]
    report: &'a BuildReport,
    scene: &'a [SceneOp],
}

#[derive(Serialize)]
struct ExpandOutput {
    components: Vec<ComponentSpec>,
    diagnostics: Vec<Diagnostic>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Commands::Plan(inputs) => {
            let mut builder = rig_builder(&inputs)?;
            let doc = load_template(&inputs.template)?;
            let mut scene = MemoryScene::new();
            let report = builder.build_document(&doc, &mut scene)?;
            tracing::info!(
                components = report.components.len(),
                links = report.links.len(),
                diagnostics = report.diagnostics.len(),
                "plan complete"
            );
            let output = PlanOutput {
                report: &report,
                scene: scene.ops(),
            };
            write_json(&output, inputs.out.as_ref())?;
        }
        Commands::Expand(inputs) => {
            let mut builder = rig_builder(&inputs)?;
            let doc = load_template(&inputs.template)?;
            let mut diagnostics = Diagnostics::new();
            let templates = build_template_set(&doc, &mut diagnostics);
            let components = builder.prepare(templates, &mut diagnostics)?;
            let output = ExpandOutput {
                components,
                diagnostics: diagnostics.into_vec(),
            };
            write_json(&output, inputs.out.as_ref())?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn rig_builder(inputs: &Inputs) -> Result<RigBuilder> {
    let mut config = match &inputs.config {
        Some(path) => BuildConfig::load(path)?,
        None => BuildConfig::default(),
    };
    if inputs.no_mirror {
        config.mirror_sides = false;
    }
    if inputs.allow_cycles {
        config.reject_cycles = false;
    }

    let defaults = match &inputs.defaults {
        Some(path) => load_defaults(path)?,
        None => DefaultAttrSet::default(),
    };
    let catalog = match &inputs.blueprints {
        Some(dir) => BlueprintCatalog::from_dir(dir)?,
        None => BlueprintCatalog::empty(),
    };

    Ok(RigBuilder::new(config)
        .with_defaults(defaults)
        .with_catalog(catalog))
}

fn write_json<T: Serialize>(value: &T, out: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
