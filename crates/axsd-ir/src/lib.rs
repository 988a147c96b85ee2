//! Core data model for the AxolotlSD sound driver.
//!
//! The AXSD decoder emits these types and the playback engine consumes
//! them: a [`Song`] holding a tick-keyed event schedule plus the patch
//! and drum waveforms it references, and the echo [`Environment`].
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod environment;
mod event;
mod patch;
mod song;

pub use environment::Environment;
pub use event::Event;
pub use patch::{Drum, Patch, NO_LOOP};
pub use song::{Song, CURRENT_VERSION};
