//! # trackscope
//!
//! Offline analysis of a single audio file for light-show and visualizer
//! sequencing.
//!
//! One call to [`analyze`] produces an immutable [`TrackAnalysis`]:
//!
//! - title, artist, declared BPM and musical key from embedded tags
//! - a decayed-RMS volume envelope of the mono signal
//! - transient peaks in four frequency bands (sub-bass, bass, beat, treble)
//! - a tempo inferred from beat-band peaks when no tag declares one
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use trackscope::{analyze_path, AnalysisConfig};
//!
//! let analysis = analyze_path(Path::new("track.mp3"), &AnalysisConfig::default())?;
//! println!("{} - {} @ {:.1} BPM", analysis.artist, analysis.title, analysis.bpm);
//! println!("{} beat peaks", analysis.beat.len());
//! # Ok::<(), trackscope::AnalysisError>(())
//! ```

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod tags;

pub use analysis::{analyze, analyze_path, TrackAnalysis, TrackFile};
pub use audio::features::{Band, Peak};
pub use config::{AnalysisConfig, TempoEstimator};
pub use error::AnalysisError;
pub use tags::MusicalKey;
