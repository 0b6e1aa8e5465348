//! Tempo and pitch transformation via signalsmith-stretch
//!
//! The stretcher changes tempo by the ratio between the input and output
//! block sizes it is fed, and pitch through a transpose factor. The player
//! expresses pitch internally in cents; the two axes are fully independent.

use signalsmith_stretch::Stretch;

use crate::types::StereoBuffer;

const CHANNELS: u32 = 2;

/// Pitch bounds in cents (±12 semitones)
pub const MIN_PITCH_CENTS: i32 = -1200;
pub const MAX_PITCH_CENTS: i32 = 1200;

/// Stereo time stretcher with independent pitch shift
pub struct TimeStretcher {
    stretcher: Stretch,
    pitch_cents: i32,
}

impl TimeStretcher {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            stretcher: Stretch::preset_default(CHANNELS, sample_rate),
            pitch_cents: 0,
        }
    }

    /// Set the pitch shift in cents, clamped to ±1200
    pub fn set_pitch_cents(&mut self, cents: i32) {
        self.pitch_cents = cents.clamp(MIN_PITCH_CENTS, MAX_PITCH_CENTS);
        // No tonality limit: full-band transposition
        self.stretcher
            .set_transpose_factor_semitones(self.pitch_cents as f32 / 100.0, None);
    }

    pub fn pitch_cents(&self) -> i32 {
        self.pitch_cents
    }

    /// Clear internal windows (after a seek or track swap)
    pub fn reset(&mut self) {
        self.stretcher.reset();
    }

    /// Samples of delay introduced by the analysis/synthesis windows
    pub fn total_latency(&self) -> usize {
        self.stretcher.input_latency() + self.stretcher.output_latency()
    }

    /// Stretch `input` into `output`
    ///
    /// The tempo ratio is `input.len() / output.len()`: feeding more input
    /// frames than output frames speeds playback up. Both buffers are
    /// reinterpreted as interleaved f32 without copying.
    pub fn process(&mut self, input: &StereoBuffer, output: &mut StereoBuffer) {
        if input.is_empty() {
            output.fill_silence();
            return;
        }
        let in_len = input.len();
        let out_len = output.len();
        let out_interleaved = output.as_interleaved_mut();
        out_interleaved[..out_len * 2].fill(0.0);
        self.stretcher.process(
            &input.as_interleaved()[..in_len * 2],
            &mut out_interleaved[..out_len * 2],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stretcher_creation() {
        let stretcher = TimeStretcher::new(48_000);
        assert_eq!(stretcher.pitch_cents(), 0);
        assert!(stretcher.total_latency() > 0);
    }

    #[test]
    fn test_pitch_clamps_to_one_octave() {
        let mut stretcher = TimeStretcher::new(48_000);
        stretcher.set_pitch_cents(2500);
        assert_eq!(stretcher.pitch_cents(), 1200);
        stretcher.set_pitch_cents(-9999);
        assert_eq!(stretcher.pitch_cents(), -1200);
    }

    #[test]
    fn test_process_unity() {
        let mut stretcher = TimeStretcher::new(48_000);
        let input = StereoBuffer::silence(512);
        let mut output = StereoBuffer::silence(512);
        stretcher.process(&input, &mut output);
        assert_eq!(output.len(), 512);
    }

    #[test]
    fn test_empty_input_outputs_silence() {
        let mut stretcher = TimeStretcher::new(48_000);
        let input = StereoBuffer::default();
        let mut output = StereoBuffer::silence(64);
        output.as_mut_slice()[0] = crate::types::StereoSample::new(0.7, 0.7);
        stretcher.process(&input, &mut output);
        assert_eq!(output[0], crate::types::StereoSample::silence());
    }
}
