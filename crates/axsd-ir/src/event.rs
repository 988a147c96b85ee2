//! Playback event variants carried by the song schedule.

/// A single scheduled command.
///
/// Patch and drum sample payloads are consumed by the decoder; their
/// records remain in the schedule as empty markers at tick 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// Start a note on a channel
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Release the first held note on a channel
    NoteOff { channel: u8 },
    /// Set a channel's pitch-wheel position (raw wheel units)
    PitchWheel { channel: u8, bend: i32 },
    /// Bind a program (patch id) to a channel
    ProgramChange { channel: u8, program: u8 },
    /// Format version carried by the stream
    Version(u16),
    /// Tempo: ticks per second
    Rate(u32),
    /// Melodic patch payload marker
    PatchData,
    /// Drum patch payload marker
    DrumData,
    /// Final tick marker
    EndOfTrack,
}
