//! Per-channel polyphonic voice groups.
//!
//! Each of the 16 playback channels is either a melodic group (voices
//! share a pitch-wheel value and read one bound patch) or the drum kit
//! (each voice indexes the drum table by its note). The per-frame loop
//! matches once per channel; there is no dispatch indirection on the
//! hot path.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use axsd_ir::{Drum, Patch};

use crate::voice::VoiceSingle;

/// Number of playback channels.
pub const CHANNEL_COUNT: usize = 16;

/// The channel slot that is always a drum kit.
pub const DRUM_CHANNEL: usize = 9;

/// One playback channel.
#[derive(Clone, Debug)]
pub enum Channel {
    /// Melodic voices reading the channel's bound patch
    Melodic(VoiceGroup),
    /// Drum voices reading the song's drum table
    Drums(DrumGroup),
}

impl Channel {
    /// Fresh channel for `slot`, with voice storage pre-reserved so the
    /// render path never allocates.
    pub fn for_slot(slot: usize, capacity: usize) -> Self {
        if slot == DRUM_CHANNEL {
            Channel::Drums(DrumGroup::with_capacity(capacity))
        } else {
            Channel::Melodic(VoiceGroup::with_capacity(capacity))
        }
    }

    /// The channel's live voices.
    pub fn voices(&self) -> &[VoiceSingle] {
        match self {
            Channel::Melodic(group) => &group.voices,
            Channel::Drums(group) => &group.voices,
        }
    }

    /// Mutable access to the channel's voice list.
    pub fn voices_mut(&mut self) -> &mut Vec<VoiceSingle> {
        match self {
            Channel::Melodic(group) => &mut group.voices,
            Channel::Drums(group) => &mut group.voices,
        }
    }

    /// Drop voices flagged inactive during the previous frame.
    pub fn reap(&mut self) {
        self.voices_mut().retain(|v| v.active);
    }
}

/// Melodic channel state: voices plus the channel-wide bend.
#[derive(Clone, Debug, Default)]
pub struct VoiceGroup {
    /// Live voices, oldest first
    pub voices: Vec<VoiceSingle>,
    /// Pitch-wheel position in semitones (raw wheel value / 4096)
    pub bend: f32,
}

impl VoiceGroup {
    /// Empty group with room for `capacity` voices.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            voices: Vec::with_capacity(capacity),
            bend: 0.0,
        }
    }

    /// Mix one sample per voice into `l`/`r`, reading from `patch`.
    ///
    /// Held voices fold their read position back into the patch loop;
    /// released voices run off the waveform end and are flagged inactive
    /// there. Phase itself keeps climbing either way.
    pub fn accumulate_into(&mut self, patch: &Patch, l: &mut f32, r: &mut f32) {
        for v in &mut self.voices {
            let mut sample = 0.0;
            let mut here = libm::floorf(patch.ratio * v.phase) as u32;

            if patch.has_loop() && here > patch.loop_end && v.key {
                here = (here - patch.loop_start) % (patch.loop_end - patch.loop_start)
                    + patch.loop_start;
            }
            if here as usize >= patch.waveform.len() {
                v.active = false;
            } else {
                sample = (patch.waveform[here as usize] as f32 - 128.0) / 128.0;
            }
            v.phase += v.phase_add_by;

            *l += sample * v.velocity * patch.gain_l;
            *r += sample * v.velocity * patch.gain_r;
        }
    }
}

/// Drum-kit channel state.
#[derive(Clone, Debug, Default)]
pub struct DrumGroup {
    /// Live voices, oldest first
    pub voices: Vec<VoiceSingle>,
}

impl DrumGroup {
    /// Empty group with room for `capacity` voices.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            voices: Vec::with_capacity(capacity),
        }
    }

    /// Mix one sample per voice into `l`/`r`.
    ///
    /// A voice whose note has no entry in `drums` contributes silence
    /// and is flagged inactive. Drums never loop: the read position runs
    /// straight off the waveform end.
    pub fn accumulate_into(&mut self, drums: &BTreeMap<u8, Drum>, l: &mut f32, r: &mut f32) {
        for v in &mut self.voices {
            let mut sample = 0.0;
            let mut gain_l = 0.0;
            let mut gain_r = 0.0;

            if let Some(drum) = drums.get(&v.note) {
                let here = (drum.ratio * v.phase) as u32;
                if here as usize >= drum.waveform.len() {
                    v.active = false;
                } else {
                    sample = (drum.waveform[here as usize] as f32 - 128.0) / 128.0;
                }
                gain_l = drum.gain_l;
                gain_r = drum.gain_r;
                v.phase += v.phase_add_by;
            } else {
                v.active = false;
            }

            *l += sample * v.velocity * gain_l;
            *r += sample * v.velocity * gain_r;
        }
    }
}
