use anyhow::{Context, Result};
use clap::Parser;
use motivational_shorts::config::Config;
use motivational_shorts::{PipelineError, generator, init};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "motivational-shorts")]
#[command(about = "Generate a narrated vertical short over stock footage", long_about = None)]
struct Args {
    /// JSON settings file (API keys may also come from the environment)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stock footage search query
    #[arg(short, long)]
    query: Option<String>,

    /// Number of footage clips to request
    #[arg(long)]
    count: Option<u32>,

    /// Folder that receives the timestamped run directories
    #[arg(short, long)]
    output_root: Option<PathBuf>,

    /// Seconds of footage before the narration starts
    #[arg(long)]
    lead_in: Option<f64>,
}

impl Args {
    fn apply(self, cfg: &mut Config) {
        if let Some(query) = self.query {
            cfg.footage_query = query;
        }
        if let Some(count) = self.count {
            cfg.footage_count = count;
        }
        if let Some(root) = self.output_root {
            cfg.output_root = root;
        }
        if let Some(lead_in) = self.lead_in {
            cfg.lead_in_secs = lead_in;
        }
    }
}

/// Loads the settings file, applies the command-line overrides and validates.
async fn load_config(mut args: Args) -> Result<Config> {
    let config_path = args.config.take();
    let mut cfg = Config::load(config_path.as_deref())
        .await
        .with_context(|| match &config_path {
            Some(path) => format!("loading settings from {}", path.display()),
            None => "loading default settings".to_string(),
        })?;
    args.apply(&mut cfg);
    cfg.validate().context("invalid settings")?;
    Ok(cfg)
}

fn exit_code_of(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<PipelineError>()
        .map_or(1, PipelineError::exit_code)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    dotenvy::dotenv().ok();

    let cfg = match load_config(Args::parse()).await {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::error!("{:#}", err);
            std::process::exit(exit_code_of(&err));
        }
    };

    if !init::check_ffmpeg().await {
        tracing::warn!("FFmpeg not found in PATH. Please install FFmpeg.");
    }

    let code = generator::run(&cfg).await;
    std::process::exit(code);
}
