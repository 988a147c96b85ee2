//! A single live note instance within a channel.

/// Per-voice playback state.
///
/// `phase` climbs by `phase_add_by` every output sample until the voice
/// runs off its waveform, at which point it is flagged inactive and
/// reaped at the start of the next frame.
#[derive(Clone, Copy, Debug)]
pub struct VoiceSingle {
    /// Note that started the voice; drum voices use it as the kit key
    pub note: u8,
    /// Velocity scaled into [0, 1]
    pub velocity: f32,
    /// Waveform phase, in phase units
    pub phase: f32,
    /// Phase advance per output sample
    pub phase_add_by: f32,
    /// True while the key is held; released voices stop looping
    pub key: bool,
    /// False schedules the voice for removal
    pub active: bool,
}

impl VoiceSingle {
    /// A voice at phase zero with the key held.
    pub fn new(note: u8, velocity: f32, phase_add_by: f32) -> Self {
        Self {
            note,
            velocity,
            phase: 0.0,
            phase_add_by,
            key: true,
            active: true,
        }
    }
}
