use std::io::Cursor;
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::{Hint, ProbeResult};

use crate::error::AnalysisError;

/// Every analysis stage runs at this rate, whatever the source file uses.
pub const ANALYSIS_SAMPLE_RATE: u32 = 44_100;

/// Mono PCM at [`ANALYSIS_SAMPLE_RATE`].
#[derive(Clone, Debug, PartialEq)]
pub struct MonoSignal {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl MonoSignal {
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Open a fresh, independent reader over the shared file bytes and probe it.
pub(crate) fn probe(bytes: Arc<[u8]>, extension: Option<&str>) -> Result<ProbeResult, SymphoniaError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )
}

/// Decode the first audio track, downmix to mono and resample to the
/// analysis rate.
pub fn decode_mono(bytes: Arc<[u8]>, extension: Option<&str>) -> Result<MonoSignal, AnalysisError> {
    let probed = probe(bytes, extension)?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::Decode("no audio tracks found".into()))?;

    let track_id = track.id;
    let source_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AnalysisError::Decode("unknown sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())?;

    let mut mono: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("Skipping corrupt packet: {}", msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        downmix_into(sample_buf.samples(), channels, &mut mono);
    }

    log::info!(
        "Decoded audio: {} mono frames, {}Hz, {:.1}s",
        mono.len(),
        source_rate,
        mono.len() as f32 / source_rate as f32
    );

    let samples = if source_rate == ANALYSIS_SAMPLE_RATE {
        mono
    } else {
        resample(&mono, source_rate, ANALYSIS_SAMPLE_RATE)?
    };

    Ok(MonoSignal {
        samples,
        sample_rate: ANALYSIS_SAMPLE_RATE,
    })
}

fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels == 1 {
        out.extend_from_slice(interleaved);
    } else {
        out.extend(
            interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }
}

/// Resample mono f32 audio with a windowed-sinc interpolator.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AnalysisError> {
    use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, samples.len(), 1)
        .map_err(|e| AnalysisError::Decode(format!("failed to create resampler: {}", e)))?;

    let expected = (samples.len() as f64 * ratio).ceil() as usize;
    let delay = resampler.output_delay();

    let input = vec![samples.to_vec()];
    let output = resampler
        .process(&input, None)
        .map_err(|e| AnalysisError::Decode(format!("resampling failed: {}", e)))?;
    let mut resampled = output.into_iter().next().unwrap_or_default();

    // Flush the filter tail so the last `delay` frames come out too.
    while resampled.len() < delay + expected {
        let tail = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| AnalysisError::Decode(format!("resampling failed: {}", e)))?;
        match tail.into_iter().next() {
            Some(chunk) if !chunk.is_empty() => resampled.extend(chunk),
            _ => break,
        }
    }

    resampled.drain(..delay.min(resampled.len()));
    resampled.truncate(expected);

    log::debug!("Resampled {}Hz -> {}Hz (delay {} frames)", from_rate, to_rate, delay);
    Ok(resampled)
}

/// Encode interleaved samples as a 16-bit PCM WAV file held in memory.
#[cfg(test)]
pub(crate) fn wav_bytes(interleaved: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let data_len = (interleaved.len() * 2) as u32;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * channels as u32 * 2).to_le_bytes());
    out.extend_from_slice(&(channels * 2).to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in interleaved {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_channels() {
        let mut out = Vec::new();
        downmix_into(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn decodes_stereo_wav_to_mono() {
        let frames = 4410;
        let interleaved: Vec<f32> = (0..frames).flat_map(|_| [0.5f32, 0.0]).collect();
        let bytes: Arc<[u8]> = wav_bytes(&interleaved, ANALYSIS_SAMPLE_RATE, 2).into();

        let signal = decode_mono(bytes, Some("wav")).unwrap();
        assert_eq!(signal.sample_rate, ANALYSIS_SAMPLE_RATE);
        assert_eq!(signal.samples.len(), frames);
        assert!(signal.samples.iter().all(|s| (s - 0.25).abs() < 1e-3));
        assert!((signal.duration() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn resamples_to_analysis_rate() {
        let samples: Vec<f32> = (0..22_050)
            .map(|i| (i as f32 * 0.01).sin() * 0.5)
            .collect();
        let bytes: Arc<[u8]> = wav_bytes(&samples, 22_050, 1).into();

        let signal = decode_mono(bytes, Some("wav")).unwrap();
        assert_eq!(signal.sample_rate, ANALYSIS_SAMPLE_RATE);
        assert_eq!(signal.samples.len(), 44_100);
    }

    #[test]
    fn resampling_keeps_onsets_in_place() {
        // Half a second of silence, then a tone; the onset must stay at 0.5s.
        let samples: Vec<f32> = (0..22_050)
            .map(|i| if i < 11_025 { 0.0 } else { 0.5 * (i as f32 * 0.05).sin().signum() })
            .collect();
        let bytes: Arc<[u8]> = wav_bytes(&samples, 22_050, 1).into();

        let signal = decode_mono(bytes, Some("wav")).unwrap();
        assert_eq!(signal.samples.len(), 44_100);
        let onset = signal
            .samples
            .iter()
            .position(|s| s.abs() > 0.25)
            .unwrap();
        assert!((onset as i64 - 22_050).abs() <= 16, "onset at frame {}", onset);
    }

    #[test]
    fn garbage_fails_to_decode() {
        let bytes: Arc<[u8]> = vec![0x42u8; 512].into();
        assert!(decode_mono(bytes, None).is_err());
    }
}
