use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crucible_blueprint::BlueprintDocument;
use crucible_core::BuildSummary;
use crucible_progress::ProgressBus;
use crucible_provider::{HandlerRegistryBuilder, SimulatedHandler};
use crucible_runner::{CancellationToken, RunOptions};
use crucible_store::{FileMovieStore, MovieStore};
use crucible_types::{InputValues, PlanScope, ProgressEvent, RuntimeConfig, RuntimeConfigOverrides};

/// Thin demonstration CLI over [`crucible_core::run_build`]. Not the
/// hardened product surface — a real deployment binds its own command
/// layer to the facade crate and wires a live provider handler instead
/// of [`SimulatedHandler`].
#[derive(Parser, Debug)]
#[command(name = "crucible", version)]
#[command(about = "Content-addressed build engine for multi-stage media generation pipelines")]
struct Cli {
    /// Optional TOML file of defaults; CLI flags always win over it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root directory under which movie state (events, blobs, manifests) is stored.
    /// Overrides the config file's `storage_root`.
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,

    /// Movie identifier; state lives under storage_root/movie_id.
    #[arg(long, default_value = "default", global = true)]
    movie_id: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a plan against the current manifest and print its layers
    /// without executing anything.
    Plan(PlanArgs),
    /// Generate a plan and execute it end to end, saving a new manifest.
    Run(PlanArgs),
    /// Print the current manifest's revision and artefact statuses.
    Status,
}

#[derive(clap::Args, Debug)]
struct PlanArgs {
    /// Path to a JSON blueprint document.
    #[arg(long)]
    blueprint: PathBuf,

    /// Path to a JSON object of raw input values (bare input names to values).
    #[arg(long)]
    inputs: Option<PathBuf>,

    /// Number of jobs to run concurrently within a layer. Ignored by `plan`.
    /// Overrides the config file's `concurrency`.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Stop after this layer (0-based); later layers are skipped.
    /// Overrides the config file's `up_to_layer`.
    #[arg(long)]
    up_to_layer: Option<usize>,

    /// Force every job at or beyond this full-graph layer to rerun regardless
    /// of dirtiness. Overrides the config file's `re_run_from`.
    #[arg(long)]
    re_run_from: Option<usize>,

    /// Regenerate only these artefacts and their downstream dependents
    /// (repeatable). Overrides the config file's `target_artifact_ids`.
    #[arg(long = "target")]
    targets: Vec<String>,

    /// Treat these already-succeeded artefacts as immovable even if upstream
    /// inputs changed (repeatable). Overrides the config file's `pinned_artifact_ids`.
    #[arg(long = "pin")]
    pins: Vec<String>,

    /// Handler mode: "simulated" (fabricated output) or "live".
    #[arg(long, default_value = "simulated")]
    mode: String,

    /// Environment label distinguishing handler cache entries (e.g. "prod",
    /// "dev"). Overrides the config file's `environment`.
    #[arg(long)]
    environment: Option<String>,
}

impl PlanArgs {
    fn overrides(&self, storage_root: Option<PathBuf>) -> RuntimeConfigOverrides {
        RuntimeConfigOverrides {
            storage_root: storage_root.map(|p| p.display().to_string()),
            concurrency: self.concurrency,
            up_to_layer: self.up_to_layer,
            re_run_from: self.re_run_from,
            target_artifact_ids: if self.targets.is_empty() { None } else { Some(self.targets.clone()) },
            pinned_artifact_ids: if self.pins.is_empty() { None } else { Some(self.pins.clone()) },
            environment: self.environment.clone(),
        }
    }

    fn scope(&self, cfg: &RuntimeConfig) -> PlanScope {
        PlanScope {
            re_run_from: cfg.re_run_from,
            up_to_layer: cfg.up_to_layer,
            target_artifact_ids: cfg.target_artifact_ids.clone(),
            pinned_artifact_ids: cfg.pinned_artifact_ids.clone(),
        }
    }

    fn run_options(&self, cfg: &RuntimeConfig) -> RunOptions {
        RunOptions {
            concurrency: cfg.concurrency,
            up_to_layer: cfg.up_to_layer,
            mode: self.mode.clone(),
            environment: cfg.environment.clone(),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match &cli.cmd {
        Commands::Plan(args) => cmd_plan(&cli, args),
        Commands::Run(args) => cmd_run(&cli, args),
        Commands::Status => cmd_status(&cli),
    }
}

fn load_config(cli: &Cli, overrides: RuntimeConfigOverrides) -> Result<RuntimeConfig> {
    RuntimeConfig::load(cli.config.as_deref(), overrides).context("loading runtime configuration")
}

fn open_store(cfg: &RuntimeConfig, movie_id: &str) -> Arc<dyn MovieStore> {
    Arc::new(FileMovieStore::new(&cfg.storage_root, movie_id))
}

fn load_blueprint(path: &PathBuf) -> Result<BlueprintDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading blueprint at {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing blueprint at {}", path.display()))
}

fn load_inputs(path: Option<&PathBuf>) -> Result<InputValues> {
    let Some(path) = path else {
        return Ok(InputValues::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading inputs at {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing inputs at {}", path.display()))
}

fn cmd_plan(cli: &Cli, args: &PlanArgs) -> Result<()> {
    let cfg = load_config(cli, args.overrides(cli.storage_root.clone()))?;
    let store = open_store(&cfg, &cli.movie_id);

    let blueprint = load_blueprint(&args.blueprint)?;
    let inputs = load_inputs(args.inputs.as_ref())?;

    let generated =
        crucible_core::generate_plan(&blueprint, &inputs, store.as_ref(), &args.scope(&cfg))
            .context("generating plan")?;

    println!("revision: {}", generated.plan.revision);
    println!("blueprint_layer_count: {}", generated.plan.blueprint_layer_count);
    println!("job_count: {}", generated.plan.job_count());
    println!();
    for (idx, layer) in generated.plan.layers.iter().enumerate() {
        println!("layer {idx}: {} job(s)", layer.len());
        for job in layer {
            println!(
                "  {} [{}/{}] produces {:?}",
                job.job_id, job.provider, job.provider_model, job.produces
            );
        }
    }
    Ok(())
}

fn cmd_run(cli: &Cli, args: &PlanArgs) -> Result<()> {
    let cfg = load_config(cli, args.overrides(cli.storage_root.clone()))?;
    let store = open_store(&cfg, &cli.movie_id);

    let blueprint = load_blueprint(&args.blueprint)?;
    let inputs = load_inputs(args.inputs.as_ref())?;

    let mut builder = HandlerRegistryBuilder::new();
    for (provider, model) in provider_models(&blueprint) {
        builder = builder.register(
            crucible_types::HandlerCacheKey::new(&args.mode, provider, model, &cfg.environment),
            Arc::new(SimulatedHandler),
        );
    }
    let handlers = builder.warm_start(&[]).context("warming up handler cache")?;

    let progress = ProgressBus::new();
    let subscriber = progress.subscribe();
    let printer = thread::spawn(move || {
        while let Some(event) = subscriber.recv() {
            print_progress(&event);
        }
    });

    let cancel = CancellationToken::new();
    let summary = crucible_core::run_build(
        &blueprint,
        &inputs,
        Arc::clone(&store),
        Arc::new(handlers),
        &progress,
        &cancel,
        &args.scope(&cfg),
        &args.run_options(&cfg),
    )
    .context("running build")?;

    drop(progress);
    let _ = printer.join();

    print_summary(&summary);
    Ok(())
}

/// Every `(provider, model)` pair named by the blueprint's producers,
/// recursing into nested sub-blueprint children. A real deployment
/// registers handlers by hand; this CLI derives them from the blueprint
/// so the simulated handler can be wired up for whatever the blueprint
/// declares without the caller enumerating them.
fn provider_models(doc: &BlueprintDocument) -> BTreeSet<(String, String)> {
    let mut out = BTreeSet::new();
    for producer in &doc.producers {
        for variant in &producer.models {
            out.insert((variant.provider.clone(), variant.model.clone()));
        }
    }
    for child in doc.children.values() {
        out.extend(provider_models(child));
    }
    out
}

fn cmd_status(cli: &Cli) -> Result<()> {
    let cfg = load_config(cli, RuntimeConfigOverrides {
        storage_root: cli.storage_root.as_ref().map(|p| p.display().to_string()),
        ..Default::default()
    })?;
    let store = open_store(&cfg, &cli.movie_id);

    let manifest = store
        .load_current_manifest()
        .context("no build has run yet for this movie")?;
    println!("revision: {}", manifest.revision);
    println!("inputs: {}", manifest.inputs.len());
    println!("artefacts: {}", manifest.artefacts.len());
    for (id, entry) in &manifest.artefacts {
        println!("  {id}: {:?}", entry.status);
    }
    Ok(())
}

fn print_progress(event: &ProgressEvent) {
    match event {
        ProgressEvent::LayerStart { layer, job_count, .. } => {
            eprintln!("[layer {layer}] starting ({job_count} job(s))");
        }
        ProgressEvent::LayerEmpty { layer, .. } => {
            eprintln!("[layer {layer}] empty, skipping");
        }
        ProgressEvent::LayerSkipped { layer, reason, .. } => {
            eprintln!("[layer {layer}] skipped: {reason}");
        }
        ProgressEvent::LayerComplete { layer, succeeded, failed, .. } => {
            eprintln!("[layer {layer}] complete: {succeeded} succeeded, {failed} failed");
        }
        ProgressEvent::JobStarted { job_id, layer, .. } => {
            eprintln!("[layer {layer}] {job_id} started");
        }
        ProgressEvent::JobStatus { job_id, status, .. } => {
            eprintln!("  {job_id}: {status:?}");
        }
        ProgressEvent::JobError { job_id, message, recoverable, .. } => {
            eprintln!("  {job_id}: error ({message}), recoverable={recoverable}");
        }
        ProgressEvent::JobBlocked { job_id, upstream_artifact_id, .. } => {
            eprintln!("  {job_id}: skipped, upstream artifact {upstream_artifact_id} failed this run");
        }
        ProgressEvent::ExecutionComplete { total_jobs, succeeded, failed, skipped, .. } => {
            eprintln!("run complete: {succeeded}/{total_jobs} succeeded, {failed} failed, {skipped} skipped");
        }
        ProgressEvent::Cancelled { at_layer, .. } => {
            eprintln!("run cancelled at layer {at_layer}");
        }
    }
}

fn print_summary(summary: &BuildSummary) {
    println!("revision: {}", summary.revision);
    println!("status: {:?}", summary.status);
    println!(
        "jobs: {}/{} succeeded, {} failed, {} skipped",
        summary.succeeded, summary.total_jobs, summary.failed, summary.skipped
    );
    println!("manifest_hash: {}", summary.manifest_hash);
}
