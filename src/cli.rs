use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use trackscope::TempoEstimator;

#[derive(Parser, Debug)]
#[command(name = "trackscope", about = "Audio track analyzer: tags, band peaks and tempo")]
pub struct Cli {
    /// Input audio file (MP3, FLAC, OGG, M4A, WAV)
    pub input: PathBuf,

    /// Config file (defaults to trackscope.toml or the global config)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the full analysis as JSON to this file
    #[arg(short, long)]
    pub json: Option<PathBuf>,

    /// Statistic used for inferred tempo
    #[arg(long, value_enum)]
    pub estimator: Option<EstimatorArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum EstimatorArg {
    Mean,
    Median,
    Mode,
}

impl From<EstimatorArg> for TempoEstimator {
    fn from(arg: EstimatorArg) -> Self {
        match arg {
            EstimatorArg::Mean => TempoEstimator::Mean,
            EstimatorArg::Median => TempoEstimator::Median,
            EstimatorArg::Mode => TempoEstimator::Mode,
        }
    }
}
