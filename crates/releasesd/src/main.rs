//! releasesd - release controller daemon
//!
//! Seeds an in-memory resource store from a JSON manifest file and runs the
//! release controller against it, either until interrupted or, with `--once`,
//! until no further changes are made.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use release_core::{init_tracing, ControllerConfig, Release, ReleaseController, TelemetryConfig};
use release_store::fakes::MemoryResourceStore;
use release_store::{DynamicObject, ObjectMeta, Resource, ResourceStore};
use serde_json::{Map, Value};
use tracing::{info, warn, Instrument, Level};

#[derive(Parser, Debug)]
#[command(name = "releasesd")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Release controller daemon", long_about = None)]
struct Args {
    /// JSON file holding an array of manifests to load at startup
    #[arg(long, env = "RELEASESD_FIXTURES")]
    fixtures: Option<PathBuf>,

    /// Maximum number of Releases reconciled concurrently
    #[arg(long, env = "RELEASESD_WORKERS", default_value_t = 4)]
    workers: usize,

    /// Seconds between full resyncs of every Release
    #[arg(long, env = "RELEASESD_RESYNC_SECS", default_value_t = 30)]
    resync_secs: u64,

    /// Reconcile until nothing changes, print the Releases and exit
    #[arg(long)]
    once: bool,

    /// Round limit for --once
    #[arg(long, default_value_t = 100)]
    max_rounds: usize,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn controller_config(&self) -> ControllerConfig {
        ControllerConfig::default()
            .with_workers(self.workers)
            .with_resync_period(Duration::from_secs(self.resync_secs.max(1)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let telemetry = TelemetryConfig::new("releasesd")
        .with_level(level)
        .with_json(args.json);
    init_tracing(&telemetry);

    run(args).instrument(telemetry.root_span()).await
}

async fn run(args: Args) -> Result<()> {
    let store = Arc::new(MemoryResourceStore::new());
    if let Some(path) = &args.fixtures {
        let loaded = seed_store(store.as_ref(), path).await?;
        info!(objects = loaded, path = %path.display(), "loaded manifests");
    }

    let controller = ReleaseController::new(store.clone(), args.controller_config());

    if args.once {
        let rounds = controller.run_until_quiescent(args.max_rounds).await?;
        info!(rounds, "reconciled until quiescent");
        let releases = dump_kind(&store, Release::KIND)?;
        println!("{}", serde_json::to_string_pretty(&releases)?);
        return Ok(());
    }

    controller.run(shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupt received, shutting down"),
        Err(err) => {
            warn!(error = %err, "cannot listen for interrupts");
            std::future::pending::<()>().await;
        }
    }
}

/// Load every manifest in `path` into `store`. Returns the number loaded.
async fn seed_store(store: &dyn ResourceStore, path: &Path) -> Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifests from {}", path.display()))?;
    let manifests: Vec<Value> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of manifests", path.display()))?;

    let mut loaded = 0;
    for (index, manifest) in manifests.into_iter().enumerate() {
        let object = manifest_to_object(manifest)
            .with_context(|| format!("manifest #{index} in {}", path.display()))?;
        let key = object.key();
        let kind = object.kind.clone();
        store
            .create_object(object)
            .await
            .with_context(|| format!("failed to load {kind} {key}"))?;
        loaded += 1;
    }
    Ok(loaded)
}

/// Split a `{kind, metadata, ...}` manifest into its stored form.
fn manifest_to_object(manifest: Value) -> Result<DynamicObject> {
    let mut body = match manifest {
        Value::Object(body) => body,
        other => bail!("expected an object, found {other}"),
    };
    let kind = match body.remove("kind") {
        Some(Value::String(kind)) if !kind.is_empty() => kind,
        _ => bail!("manifest has no kind"),
    };
    body.remove("apiVersion");
    let metadata = body
        .remove("metadata")
        .ok_or_else(|| anyhow!("{kind} manifest has no metadata"))?;
    let metadata: ObjectMeta = serde_json::from_value(metadata)
        .with_context(|| format!("invalid metadata on {kind} manifest"))?;
    Ok(DynamicObject::new(kind, metadata, body))
}

fn object_to_manifest(object: DynamicObject) -> Result<Value> {
    let mut manifest = Map::new();
    manifest.insert("kind".to_string(), Value::String(object.kind));
    manifest.insert("metadata".to_string(), serde_json::to_value(&object.metadata)?);
    manifest.extend(object.data);
    Ok(Value::Object(manifest))
}

fn dump_kind(store: &MemoryResourceStore, kind: &str) -> Result<Vec<Value>> {
    store
        .objects(kind)
        .into_iter()
        .map(object_to_manifest)
        .collect()
}
