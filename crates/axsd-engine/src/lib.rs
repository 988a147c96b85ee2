//! Playback engine for the AxolotlSD sound driver.
//!
//! Dispatches the song schedule against a sample-accurate tick cursor,
//! renders 16 channels of wavetable playback with pitch bend and
//! per-sample looping, and feeds the result through a circular-buffer
//! echo into caller-supplied PCM buffers.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod channel;
mod echo;
mod player;
mod sfx;
mod tuning;
mod voice;

pub use channel::{Channel, DrumGroup, VoiceGroup, CHANNEL_COUNT, DRUM_CHANNEL};
pub use echo::{Echo, ECHO_BUFFER_LEN};
pub use player::{PlayError, Player};
pub use sfx::Sfx;
pub use tuning::{drum_phase_step, melodic_phase_step, twelve_tet, A440};
pub use voice::VoiceSingle;
