use serde::Serialize;

/// Frequency bands analyzed independently for transients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Band {
    SubBass,
    Bass,
    Beat,
    Treble,
}

impl Band {
    pub const ALL: [Band; 4] = [Band::SubBass, Band::Bass, Band::Beat, Band::Treble];

    pub fn name(self) -> &'static str {
        match self {
            Band::SubBass => "sub-bass",
            Band::Bass => "bass",
            Band::Beat => "beat",
            Band::Treble => "treble",
        }
    }
}

/// A transient event detected within one band.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Peak {
    /// Seconds at which the start thresholds were first crossed.
    pub time: f64,
    /// Seconds at which the sustain condition stopped holding.
    pub end: f64,
    /// Maximum absolute amplitude during the event (0.0-1.0).
    pub intensity: f32,
    /// Maximum amplitude relative to the volume envelope.
    pub intensity_normalized: f32,
}

impl Peak {
    pub fn duration(&self) -> f64 {
        self.end - self.time
    }
}
