use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::audio::decode::{decode_mono, MonoSignal};
use crate::audio::envelope::VolumeEnvelope;
use crate::audio::features::{Band, Peak};
use crate::audio::peaks::detect_peaks;
use crate::audio::tempo::infer_tempo;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::tags::{self, MusicalKey, UNKNOWN_ARTIST, UNKNOWN_TITLE};

/// Hash reserved for the "no track loaded" analysis; real files hash to >= 1.
pub const EMPTY_TRACK_HASH: u64 = 0;

/// Raw file bytes plus the file facts the track hash is derived from.
///
/// The bytes are shared; every consumer opens its own reader over them.
#[derive(Clone, Debug)]
pub struct TrackFile {
    pub bytes: Arc<[u8]>,
    pub size: u64,
    /// Last modification time in milliseconds since the Unix epoch.
    pub modified_ms: u64,
    /// Container hint, e.g. `"mp3"`.
    pub extension: Option<String>,
}

impl TrackFile {
    pub fn open(path: &Path) -> Result<Self, AnalysisError> {
        let io_err = |source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        };
        let bytes = std::fs::read(path).map_err(io_err)?;
        let metadata = std::fs::metadata(path).map_err(io_err)?;
        let modified_ms = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_millis() as u64);

        Ok(Self::from_bytes(
            bytes,
            modified_ms,
            path.extension().and_then(|e| e.to_str()).map(str::to_string),
        ))
    }

    pub fn from_bytes(bytes: Vec<u8>, modified_ms: u64, extension: Option<String>) -> Self {
        Self {
            size: bytes.len() as u64,
            bytes: bytes.into(),
            modified_ms,
            extension,
        }
    }

    /// `modified_ms + size + 1`: stable per file and never zero.
    pub fn track_hash(&self) -> u64 {
        self.modified_ms.saturating_add(self.size).saturating_add(1)
    }
}

/// The complete analysis of one track.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAnalysis {
    pub title: String,
    pub artist: String,
    pub bpm: f64,
    pub key: Option<MusicalKey>,
    /// Seconds.
    pub length: f64,
    pub sub_bass: Vec<Peak>,
    pub bass: Vec<Peak>,
    pub beat: Vec<Peak>,
    pub treble: Vec<Peak>,
    pub track_hash: u64,
}

impl TrackAnalysis {
    /// Placeholder used before any track has been analyzed.
    pub fn empty() -> Self {
        Self {
            title: UNKNOWN_TITLE.to_string(),
            artist: UNKNOWN_ARTIST.to_string(),
            bpm: AnalysisConfig::default().tempo.default_bpm,
            key: None,
            length: 0.0,
            sub_bass: Vec::new(),
            bass: Vec::new(),
            beat: Vec::new(),
            treble: Vec::new(),
            track_hash: EMPTY_TRACK_HASH,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.track_hash == EMPTY_TRACK_HASH
    }

    pub fn peaks(&self, band: Band) -> &[Peak] {
        match band {
            Band::SubBass => &self.sub_bass,
            Band::Bass => &self.bass,
            Band::Beat => &self.beat,
            Band::Treble => &self.treble,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BpmSource {
    Tag,
    Inferred,
    Default,
}

/// Tag BPM wins, then inference, then the fixed default.
pub fn resolve_bpm(tagged: Option<f64>, inferred: Option<f64>, default_bpm: f64) -> (f64, BpmSource) {
    match (tagged, inferred) {
        (Some(bpm), _) => (bpm, BpmSource::Tag),
        (None, Some(bpm)) => (bpm, BpmSource::Inferred),
        (None, None) => (default_bpm, BpmSource::Default),
    }
}

pub fn analyze_path(path: &Path, config: &AnalysisConfig) -> Result<TrackAnalysis, AnalysisError> {
    let file = TrackFile::open(path)?;
    analyze(&file, config)
}

/// Run the full pipeline on one file. Any hard failure aborts the whole
/// analysis; there are no partial results.
pub fn analyze(file: &TrackFile, config: &AnalysisConfig) -> Result<TrackAnalysis, AnalysisError> {
    let extension = file.extension.as_deref();

    log::info!("Reading tags...");
    let raw_tags = tags::read_tags(Arc::clone(&file.bytes), extension)?;
    let track_tags = tags::extract(&raw_tags);

    log::info!("Decoding audio...");
    let signal = decode_mono(Arc::clone(&file.bytes), extension)?;

    log::info!("Building volume envelope...");
    let envelope = VolumeEnvelope::build(&signal.samples, signal.sample_rate, &config.envelope);
    let length = envelope.len() as f64 / signal.sample_rate as f64;

    log::info!("Detecting peaks in {} bands...", Band::ALL.len());
    let detect = |band: Band| detect_band(band, &signal, &envelope, config);
    let ((sub_bass, bass), (beat, treble)) = rayon::join(
        || rayon::join(|| detect(Band::SubBass), || detect(Band::Bass)),
        || rayon::join(|| detect(Band::Beat), || detect(Band::Treble)),
    );

    let inferred = infer_tempo(&beat, length, &config.tempo);
    let (bpm, source) = resolve_bpm(track_tags.bpm, inferred, config.tempo.default_bpm);
    log::info!("BPM: {:.2} ({:?})", bpm, source);

    match track_tags.key {
        Some(key) => log::info!("Key: {} ({})", key.open_key(), key.name()),
        None => log::info!("Key: unknown"),
    }

    Ok(TrackAnalysis {
        title: track_tags.title_or_default(),
        artist: track_tags.artist_or_default(),
        bpm,
        key: track_tags.key,
        length,
        sub_bass,
        bass,
        beat,
        treble,
        track_hash: file.track_hash(),
    })
}

fn detect_band(
    band: Band,
    signal: &MonoSignal,
    envelope: &VolumeEnvelope,
    config: &AnalysisConfig,
) -> Vec<Peak> {
    let peaks = detect_peaks(
        signal,
        envelope,
        config.bands.params(band),
        config.peaks.cooldown_seconds,
    );
    log::info!("Band {}: {} peaks", band.name(), peaks.len());
    peaks
}
