//! midigen-daemon: MIDI pattern generation service.
//!
//! This binary can run in three modes:
//! - Serve mode (default): HTTP server for `GET /generate-midi`
//! - One-shot mode: generate a single pattern to a `.mid` file
//! - Install mode: write the built-in model checkpoints and exit

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use log::{info, warn};

use midigen_daemon::cache::ModelCache;
use midigen_daemon::cli::Cli;
use midigen_daemon::config::DaemonConfig;
use midigen_daemon::generation::{generate_offloaded, GenerationRequest};
use midigen_daemon::http::{run_server, AppState};
use midigen_daemon::midi::encode;
use midigen_daemon::models::{check_models, ensure_models, FileModelSource};
use midigen_daemon::types::{registered_model_ids, resolve, Genre, DEFAULT_GENRE, DEFAULT_INSTRUMENT};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    let config = cli.apply(DaemonConfig::from_env());

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter.as_str()),
    )
    .init();

    if let Some(reason) = config.validate() {
        bail!("invalid configuration: {}", reason);
    }

    let model_dir = config.effective_model_path();
    if cli.install_models {
        let written = ensure_models(&model_dir)?;
        info!(
            "Installed {} checkpoint(s) into {}",
            written.len(),
            model_dir.display()
        );
        return Ok(());
    }

    prepare_models(&config, &model_dir)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let cache = Arc::new(ModelCache::new(Arc::new(FileModelSource::new(&model_dir))));

    if cli.is_one_shot() {
        runtime.block_on(run_one_shot(&cli, cache))
    } else {
        runtime.block_on(run_serve(&config, cache))
    }
}

/// Installs missing checkpoints or reports which are absent.
fn prepare_models(config: &DaemonConfig, model_dir: &Path) -> anyhow::Result<()> {
    info!("Model directory: {}", model_dir.display());
    if config.install_missing_models {
        ensure_models(model_dir)?;
    } else if let Err(e) = check_models(model_dir, &registered_model_ids()) {
        // Requests for these models will fail until the checkpoints appear.
        warn!("{}", e);
    }
    Ok(())
}

/// Runs the HTTP server until ctrl-c.
async fn run_serve(config: &DaemonConfig, cache: Arc<ModelCache>) -> anyhow::Result<()> {
    if config.preload_models {
        let ids = registered_model_ids();
        info!("Preloading {} model(s)...", ids.len());
        for (model_id, result) in cache.preload(&ids).await {
            if let Err(e) = result {
                warn!("Preload of '{}' failed: {}", model_id, e);
            }
        }
    }

    run_server(config, AppState::new(cache))
        .await
        .with_context(|| format!("HTTP server on {} failed", config.bind_address()))
}

/// Generates one pattern and writes it to disk.
async fn run_one_shot(cli: &Cli, cache: Arc<ModelCache>) -> anyhow::Result<()> {
    let profile = match cli.instrument.as_deref() {
        Some(name) => resolve(name)?,
        None => DEFAULT_INSTRUMENT.profile(),
    };
    let genre = match cli.genre.as_deref() {
        Some(name) => name.parse::<Genre>()?,
        None => DEFAULT_GENRE,
    };
    let model_id = genre.model_for(profile)?;

    let mut request = GenerationRequest::new().with_genre(genre);
    if let Some(seed) = cli.seed {
        request = request.with_seed(seed);
    }
    if let Some(bpm) = cli.bpm {
        request = request.with_tempo(bpm);
    }
    if let Some(reason) = request.validate() {
        bail!("{}", reason);
    }

    let start_time = Instant::now();
    let model = cache.get_or_load(model_id).await?;
    let pattern = generate_offloaded(model, profile, request).await?;
    let midi = encode(&pattern.sequence, profile)?;

    let output_path = cli.output_path(&pattern.filename());
    std::fs::write(&output_path, midi.as_bytes())
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    info!(
        "Wrote {} ({} notes, seed {}, {} BPM, pattern {}) in {:.2}s",
        output_path.display(),
        pattern.sequence.len(),
        pattern.seed,
        pattern.tempo_bpm,
        pattern.pattern_id,
        start_time.elapsed().as_secs_f32()
    );
    Ok(())
}
