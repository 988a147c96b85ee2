//! Pitch math for wavetable playback.
//!
//! Converts MIDI note numbers plus per-channel pitch bend into the
//! per-sample phase steps the voice accumulators run on.

/// Concert pitch in Hz (MIDI note 69).
pub const A440: f32 = 440.0;

/// Melodic phase scale. The format was authored against a 44.1 kHz
/// reference engine; patch ratios bake that assumption in.
const TUNE_COEFF: f32 = 44100.0 / A440;

/// Twelve-tone equal temperament: frequency in Hz for `note`, shifted
/// by `bend` semitones.
pub fn twelve_tet(note: u8, bend: f32) -> f32 {
    libm::powf(2.0, (note as f32 - 69.0 + bend) / 12.0) * A440
}

/// Per-sample phase step for a melodic voice.
///
/// `dt` is the output sample period in seconds (1 / sample rate).
pub fn melodic_phase_step(note: u8, bend: f32, dt: f32) -> f32 {
    twelve_tet(note, bend) * dt * TUNE_COEFF
}

/// Per-sample phase step for a drum voice. Drums play at a fixed rate
/// independent of their note number; the note only selects the kit
/// entry.
pub fn drum_phase_step(dt: f32) -> f32 {
    A440 * dt * 32.0 * core::f32::consts::PI
}
