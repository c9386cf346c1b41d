mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use cli::Cli;
use trackscope::config::{self, AnalysisConfig};
use trackscope::{analyze, Band, TrackFile};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Explicit --config path, or auto-detect trackscope.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("trackscope.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("trackscope").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("trackscope").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });

    let mut analysis_config = match config_path {
        Some(ref path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}, using defaults", path.display());
                AnalysisConfig::default()
            }
        },
        None => AnalysisConfig::default(),
    };
    if let Some(estimator) = cli.estimator {
        analysis_config.tempo.estimator = estimator.into();
    }

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }
    log::info!("trackscope - audio track analyzer");
    log::info!("Input: {}", cli.input.display());

    let file = TrackFile::open(&cli.input)?;
    let analysis = analyze(&file, &analysis_config)
        .with_context(|| format!("Failed to analyze {}", cli.input.display()))?;

    log::info!("Title: {}", analysis.title);
    log::info!("Artist: {}", analysis.artist);
    log::info!("Length: {:.2}s", analysis.length);
    log::info!("BPM: {:.2}", analysis.bpm);
    match analysis.key {
        Some(key) => log::info!("Key: {} / {} / {}", key.open_key(), key.camelot(), key.name()),
        None => log::info!("Key: unknown"),
    }
    for band in Band::ALL {
        log::info!("{:>9}: {} peaks", band.name(), analysis.peaks(band).len());
    }
    log::info!("Track hash: {}", analysis.track_hash);

    if let Some(ref out) = cli.json {
        let json = serde_json::to_string_pretty(&analysis).context("Failed to serialize analysis")?;
        std::fs::write(out, json)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        log::info!("Wrote {}", out.display());
    }

    Ok(())
}
