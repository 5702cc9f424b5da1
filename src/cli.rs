//! Command-line interface.
//!
//! Without `--instrument` the daemon serves HTTP. With `--instrument` it
//! generates one pattern, writes it to disk and exits, which is handy for
//! checking models without a client.

use std::path::PathBuf;

use clap::Parser;

use crate::config::DaemonConfig;

/// midigen-daemon: MIDI pattern generation service
#[derive(Parser, Debug)]
#[command(name = "midigen-daemon")]
#[command(about = "Generates short MIDI patterns per instrument role over HTTP")]
#[command(version)]
pub struct Cli {
    /// Interface to bind the HTTP server to
    #[arg(long)]
    pub host: Option<String>,

    /// TCP port for the HTTP server
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to directory containing model checkpoints
    #[arg(short, long)]
    pub model_dir: Option<PathBuf>,

    /// Install missing built-in checkpoints and exit
    #[arg(long)]
    pub install_models: bool,

    /// Do not install missing built-in checkpoints at startup
    #[arg(long, conflicts_with = "install_models")]
    pub no_install: bool,

    /// Load every model at startup
    #[arg(long)]
    pub preload: bool,

    /// Generate one pattern for this instrument and exit
    #[arg(short, long)]
    pub instrument: Option<String>,

    /// Genre selecting the model (one-shot mode: pop, hiphop, dance, cinematic)
    #[arg(short, long, requires = "instrument")]
    pub genre: Option<String>,

    /// Random seed for reproducible generation (one-shot mode)
    #[arg(short, long, requires = "instrument")]
    pub seed: Option<u64>,

    /// Tempo override in BPM (one-shot mode, 40-240)
    #[arg(short, long, requires = "instrument")]
    pub bpm: Option<f64>,

    /// Output MIDI file path (one-shot mode)
    #[arg(short, long, requires = "instrument")]
    pub output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Returns true if running in one-shot generation mode.
    pub fn is_one_shot(&self) -> bool {
        self.instrument.is_some() && !self.install_models
    }

    /// Applies command-line overrides on top of `config`.
    pub fn apply(&self, mut config: DaemonConfig) -> DaemonConfig {
        if let Some(ref host) = self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(ref dir) = self.model_dir {
            config.model_path = Some(dir.clone());
        }
        if self.no_install {
            config.install_missing_models = false;
        }
        if self.preload {
            config.preload_models = true;
        }
        if self.verbose {
            config.log_filter = "debug".to_string();
        }
        config
    }

    /// Returns the effective output path for one-shot mode.
    ///
    /// Defaults to `default_name` in the current directory.
    pub fn output_path(&self, default_name: &str) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_name))
    }
}
