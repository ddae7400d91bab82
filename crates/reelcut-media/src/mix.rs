//! Sample-level audio mixing.
//!
//! Plain additive mixing: no loudness normalization and no limiter, so sums
//! beyond full scale are left for the encoder to clip.

use crate::decode::PcmBuffer;

/// Cut `pcm` down to at most `seconds`. Never pads.
pub fn truncate_to(pcm: &mut PcmBuffer, seconds: f64) {
    let limit = pcm.samples_for(seconds);
    if pcm.samples.len() > limit {
        pcm.samples.truncate(limit);
    }
}

/// Extend `pcm` with silence up to `seconds`. Never shortens.
pub fn pad_to(pcm: &mut PcmBuffer, seconds: f64) {
    let target = pcm.samples_for(seconds);
    if pcm.samples.len() < target {
        pcm.samples.resize(target, 0.0);
    }
}

/// A copy of `pcm` with every sample multiplied by `gain`.
pub fn scaled(pcm: &PcmBuffer, gain: f32) -> PcmBuffer {
    PcmBuffer::new(
        pcm.samples.iter().map(|s| s * gain).collect(),
        pcm.sample_rate,
        pcm.channels,
    )
}

/// Sum two tracks sample by sample.
///
/// The result is as long as the longer input; the shorter one contributes
/// silence past its end. Both inputs must share rate and layout.
pub fn mix(a: &PcmBuffer, b: &PcmBuffer) -> PcmBuffer {
    debug_assert_eq!(a.sample_rate, b.sample_rate);
    debug_assert_eq!(a.channels, b.channels);

    let len = a.samples.len().max(b.samples.len());
    let samples = (0..len)
        .map(|i| a.samples.get(i).copied().unwrap_or(0.0) + b.samples.get(i).copied().unwrap_or(0.0))
        .collect();
    PcmBuffer::new(samples, a.sample_rate, a.channels)
}
