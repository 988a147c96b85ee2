//! AxolotlSD: a compact wavetable-synthesis sound driver.
//!
//! Loads the AXSD binary song format (a timeline of MIDI-like events
//! packaged with the sample-based patches they reference) and renders
//! real-time PCM into caller-supplied buffers, optionally through a
//! stereo feedback echo.
//!
//! ```no_run
//! use axolotlsd::{decode, Player};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("song.axsd")?;
//! let song = decode(&bytes)?;
//!
//! let mut player = Player::new(32, 48000, true);
//! player.play(song, None)?;
//!
//! // typically called from the host audio callback
//! let mut buffer = [0.0f32; 512];
//! player.tick(&mut buffer);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub use axsd_engine::{
    drum_phase_step, melodic_phase_step, twelve_tet, Channel, DrumGroup, Echo, PlayError, Player,
    Sfx, VoiceGroup, VoiceSingle, A440, CHANNEL_COUNT, DRUM_CHANNEL, ECHO_BUFFER_LEN,
};
pub use axsd_formats::{decode, decode_from_c_array, FormatError};
pub use axsd_ir::{Drum, Environment, Event, Patch, Song, CURRENT_VERSION, NO_LOOP};
