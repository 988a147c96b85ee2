//! The stateful song renderer.

use alloc::vec::Vec;

use axsd_ir::{Environment, Event, Song, CURRENT_VERSION};

use crate::channel::{Channel, CHANNEL_COUNT};
use crate::echo::Echo;
use crate::sfx::Sfx;
use crate::tuning::{drum_phase_step, melodic_phase_step};
use crate::voice::VoiceSingle;

/// Error returned by [`Player::play`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayError {
    /// The song's format version does not match [`CURRENT_VERSION`]
    VersionMismatch { found: u16 },
}

impl core::fmt::Display for PlayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PlayError::VersionMismatch { found } => {
                write!(f, "song version {} does not match engine version {}", found, CURRENT_VERSION)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PlayError {}

/// The wavetable playback engine.
///
/// Owns the current song, 16 channels of voice state, the echo delay
/// lines, and a playback cursor expressed in seconds. [`Player::tick`]
/// fills caller buffers with clamped PCM at the configured sample rate;
/// it is meant to run on the host's audio callback and neither blocks
/// nor allocates in the steady state.
pub struct Player {
    /// Output sample period in seconds (1 / sample rate)
    frequency: f32,
    /// Total polyphony budget across all channels
    max_voices: u32,
    /// Live voice count, recomputed in the mix phase of every frame
    on_voices: u32,
    seconds_elapsed: f32,
    seconds_end: f32,
    /// Tick derived from `seconds_elapsed` this frame
    cursor: u32,
    /// Most recently dispatched tick; `None` forces a dispatch
    last_cursor: Option<u32>,
    channels: [Channel; CHANNEL_COUNT],
    /// Program bound to each channel by ProgramChange
    patch_ids: [Option<u8>; CHANNEL_COUNT],
    echo: Echo,
    sfx: Vec<Sfx>,
    current: Option<Song>,
    playback: bool,
    in_stereo: bool,
}

impl Player {
    /// Create a player rendering at `sample_rate` Hz with the given
    /// total polyphony budget.
    pub fn new(max_voices: u32, sample_rate: u32, in_stereo: bool) -> Self {
        Self {
            frequency: 1.0 / sample_rate as f32,
            max_voices,
            on_voices: 0,
            seconds_elapsed: 0.0,
            seconds_end: 0.0,
            cursor: 0,
            last_cursor: None,
            channels: core::array::from_fn(|slot| Channel::for_slot(slot, max_voices as usize)),
            patch_ids: [None; CHANNEL_COUNT],
            echo: Echo::new(),
            sfx: Vec::new(),
            current: None,
            playback: false,
            in_stereo,
        }
    }

    /// Take ownership of a song and start playback from the top.
    ///
    /// Resets every channel (slot 9 becomes a fresh drum kit), the patch
    /// bindings, and the playback cursor, then enables rendering.
    /// Rejects songs whose version does not match [`CURRENT_VERSION`];
    /// the player's previous state is left untouched on rejection.
    pub fn play(&mut self, song: Song, echo: Option<Environment>) -> Result<(), PlayError> {
        if song.version != CURRENT_VERSION {
            return Err(PlayError::VersionMismatch { found: song.version });
        }

        for (slot, channel) in self.channels.iter_mut().enumerate() {
            *channel = Channel::for_slot(slot, self.max_voices as usize);
        }
        self.patch_ids = [None; CHANNEL_COUNT];

        self.seconds_elapsed = 0.0;
        self.seconds_end = song.seconds_end();
        self.on_voices = 0;
        self.cursor = 0;
        self.last_cursor = None;
        self.echo.set_params(echo);
        self.echo.reset_cursor();
        self.current = Some(song);
        self.playback = true;
        Ok(())
    }

    /// Halt playback. Voice and echo state are kept: `tick` keeps
    /// producing the echo tail, and a later song restarts cleanly.
    pub fn pause(&mut self) {
        self.playback = false;
    }

    /// Swap the echo configuration without interrupting playback.
    pub fn put_environment(&mut self, env: Option<Environment>) {
        self.echo.set_params(env);
    }

    /// Queue a one-shot sound effect; it starts mixing on the next
    /// frame and plays regardless of song playback.
    pub fn queue_sfx(&mut self, sfx: Sfx) {
        self.sfx.push(sfx);
    }

    /// True while a song is being rendered.
    pub fn is_playing(&self) -> bool {
        self.playback
    }

    /// Live voice count as of the most recent frame.
    pub fn on_voices(&self) -> u32 {
        self.on_voices
    }

    /// Tick most recently derived from the playback clock.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// The song currently owned by the player.
    pub fn current(&self) -> Option<&Song> {
        self.current.as_ref()
    }

    /// Fill `out` with rendered samples at the configured rate.
    ///
    /// Stereo players write interleaved L, R pairs and expect an even
    /// buffer length; mono players write `(l + r) / 2` per slot. Every
    /// written sample is clamped to [-1, 1]. An empty buffer is a no-op.
    pub fn tick(&mut self, out: &mut [f32]) {
        if self.in_stereo {
            debug_assert!(out.len() % 2 == 0, "stereo output interleaves L,R pairs");
            for frame in out.chunks_exact_mut(2) {
                let (l, r) = self.render_frame();
                frame[0] = l.clamp(-1.0, 1.0);
                frame[1] = r.clamp(-1.0, 1.0);
            }
        } else {
            for slot in out.iter_mut() {
                let (l, r) = self.render_frame();
                *slot = ((l + r) / 2.0).clamp(-1.0, 1.0);
            }
        }
    }

    /// Produce one frame: dispatch + mix, advance the clock, then the
    /// sfx and echo stages (which run even while paused).
    fn render_frame(&mut self) -> (f32, f32) {
        let mut l = 0.0;
        let mut r = 0.0;

        // seconds_end of 0 means an unset tempo or an empty song; the
        // wrap below would otherwise take a remainder against zero.
        if self.playback && self.seconds_end > 0.0 {
            self.handle_one(&mut l, &mut r);
            self.seconds_elapsed += self.frequency;
            if self.seconds_elapsed > self.seconds_end {
                self.seconds_elapsed = libm::fmodf(self.seconds_elapsed, self.seconds_end);
                self.last_cursor = None;
            }
        }

        self.handle_sfx(&mut l, &mut r);
        self.echo.process(&mut l, &mut r);
        (l, r)
    }

    /// Dispatch events at the current tick, then mix all channels.
    fn handle_one(&mut self, l: &mut f32, r: &mut f32) {
        let Some(song) = self.current.as_ref() else { return };

        self.cursor = (song.ticks_per_second as f32 * self.seconds_elapsed) as u32;
        if self.last_cursor.map_or(true, |last| self.cursor > last) {
            // Only events at exactly this tick fire. When the clock
            // jumps more than one tick per sample, intermediate ticks
            // are skipped; hosts depend on this cadence.
            let cursor = self.cursor;
            let mut index = song.events.partition_point(|&(t, _)| t < cursor);
            loop {
                let Some(&(tick, event)) =
                    self.current.as_ref().and_then(|s| s.events.get(index))
                else {
                    break;
                };
                if tick != cursor {
                    break;
                }
                self.dispatch(event);
                index += 1;
            }
            self.last_cursor = Some(cursor);
        }

        // Mix phase: reap dead voices, accumulate, recount polyphony.
        self.on_voices = 0;
        let Some(song) = self.current.as_ref() else { return };
        for (slot, channel) in self.channels.iter_mut().enumerate() {
            channel.reap();
            match channel {
                Channel::Drums(group) => {
                    group.accumulate_into(&song.drums, l, r);
                    self.on_voices += group.voices.len() as u32;
                }
                Channel::Melodic(group) => {
                    let patch = self.patch_ids[slot].and_then(|id| song.patches.get(&id));
                    if let Some(patch) = patch {
                        group.accumulate_into(patch, l, r);
                        self.on_voices += group.voices.len() as u32;
                    }
                }
            }
        }
    }

    /// Apply one scheduled event to the channel state.
    ///
    /// Events addressing channels outside 0..16 are dropped, matching
    /// the engine's silence-on-bad-reference policy.
    fn dispatch(&mut self, event: Event) {
        match event {
            Event::NoteOn { channel, note, velocity } => {
                if self.on_voices >= self.max_voices {
                    return;
                }
                let Some(channel) = self.channels.get_mut(channel as usize) else { return };
                let velocity = velocity as f32 / 127.0;
                match channel {
                    Channel::Drums(group) => {
                        let step = drum_phase_step(self.frequency);
                        group.voices.push(VoiceSingle::new(note, velocity, step));
                    }
                    Channel::Melodic(group) => {
                        let step = melodic_phase_step(note, group.bend, self.frequency);
                        group.voices.push(VoiceSingle::new(note, velocity, step));
                    }
                }
            }
            Event::NoteOff { channel } => {
                let Some(channel) = self.channels.get_mut(channel as usize) else { return };
                // No note byte in the record: the oldest held voice is
                // the one released.
                if let Some(first_held) = channel.voices_mut().iter_mut().find(|v| v.key) {
                    first_held.key = false;
                }
            }
            Event::PitchWheel { channel, bend } => {
                let Some(channel) = self.channels.get_mut(channel as usize) else { return };
                if let Channel::Melodic(group) = channel {
                    group.bend = bend as f32 / 4096.0;
                    for v in &mut group.voices {
                        v.phase_add_by = melodic_phase_step(v.note, group.bend, self.frequency);
                    }
                }
            }
            Event::ProgramChange { channel, program } => {
                if let Some(id) = self.patch_ids.get_mut(channel as usize) {
                    *id = Some(program);
                }
            }
            // Meta and payload-marker events are decoder concerns.
            Event::Version(_)
            | Event::Rate(_)
            | Event::PatchData
            | Event::DrumData
            | Event::EndOfTrack => {}
        }
    }

    /// Mix queued one-shot effects and clamp the master bus.
    fn handle_sfx(&mut self, l: &mut f32, r: &mut f32) {
        for sfx in &mut self.sfx {
            sfx.render_into(l, r);
        }
        self.sfx.retain(|s| !s.is_finished());
        *l = l.clamp(-1.0, 1.0);
        *r = r.clamp(-1.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use axsd_ir::{Drum, Patch, NO_LOOP};

    const RATE: u32 = 48000;

    fn square_patch() -> Patch {
        let mut waveform = vec![255u8; 128];
        waveform.extend_from_slice(&[0u8; 128]);
        Patch {
            waveform,
            ratio: 1.0,
            gain_l: 1.0,
            gain_r: 1.0,
            loop_start: 0,
            loop_end: 256,
        }
    }

    fn empty_song() -> Song {
        let mut song = Song::default();
        song.version = CURRENT_VERSION;
        song.ticks_per_second = RATE;
        song.ticks_end = RATE;
        song.events.push((0, Event::Rate(RATE)));
        song.events.push((RATE, Event::EndOfTrack));
        song.sort_events();
        song
    }

    fn one_note_song() -> Song {
        let mut song = empty_song();
        song.patches.insert(0, square_patch());
        song.events.push((0, Event::ProgramChange { channel: 0, program: 0 }));
        song.events.push((0, Event::NoteOn { channel: 0, note: 69, velocity: 127 }));
        song.sort_events();
        song
    }

    fn render(player: &mut Player, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; frames * 2];
        player.tick(&mut out);
        out
    }

    #[test]
    fn rejects_wrong_version() {
        let mut song = empty_song();
        song.version = 2;
        let mut player = Player::new(8, RATE, true);
        assert_eq!(
            player.play(song, None),
            Err(PlayError::VersionMismatch { found: 2 })
        );
        assert!(!player.is_playing());
    }

    #[test]
    fn rejects_missing_version_record() {
        let mut song = empty_song();
        song.version = 0;
        let mut player = Player::new(8, RATE, true);
        assert!(player.play(song, None).is_err());
    }

    #[test]
    fn silent_song_renders_zeros() {
        let mut player = Player::new(8, RATE, true);
        player.play(empty_song(), None).unwrap();
        let out = render(&mut player, 128);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn empty_buffer_is_a_no_op() {
        let mut player = Player::new(8, RATE, true);
        player.play(one_note_song(), None).unwrap();
        player.tick(&mut []);
        assert_eq!(player.on_voices(), 0);
    }

    #[test]
    fn single_note_produces_bounded_signal() {
        let mut player = Player::new(8, RATE, true);
        player.play(one_note_song(), None).unwrap();
        let out = render(&mut player, 1024);

        assert!(out.iter().any(|&s| s != 0.0));
        assert!(out.iter().all(|&s| (-1.0..=1.0).contains(&s)));
    }

    #[test]
    fn single_note_counts_one_voice() {
        let mut player = Player::new(8, RATE, true);
        player.play(one_note_song(), None).unwrap();
        render(&mut player, 4);
        assert_eq!(player.on_voices(), 1);
    }

    #[test]
    fn zero_voice_budget_ignores_note_on() {
        let mut player = Player::new(0, RATE, true);
        player.play(one_note_song(), None).unwrap();
        let out = render(&mut player, 256);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(player.on_voices(), 0);
    }

    #[test]
    fn program_change_to_missing_patch_is_silent() {
        let mut song = empty_song();
        song.events.push((0, Event::ProgramChange { channel: 0, program: 9 }));
        song.events.push((0, Event::NoteOn { channel: 0, note: 69, velocity: 127 }));
        song.sort_events();

        let mut player = Player::new(8, RATE, true);
        player.play(song, None).unwrap();
        let out = render(&mut player, 64);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn note_off_releases_oldest_held_voice() {
        let mut song = one_note_song();
        song.events.push((0, Event::NoteOn { channel: 0, note: 72, velocity: 127 }));
        song.events.push((2, Event::NoteOff { channel: 0 }));
        song.sort_events();

        let mut player = Player::new(8, RATE, true);
        player.play(song, None).unwrap();
        render(&mut player, 8);

        let voices = player.channels[0].voices();
        assert_eq!(voices.len(), 2);
        assert!(!voices[0].key, "oldest voice must be released first");
        assert!(voices[1].key);
    }

    #[test]
    fn note_off_on_empty_channel_is_a_no_op() {
        let mut song = empty_song();
        song.events.push((0, Event::NoteOff { channel: 5 }));
        song.sort_events();

        let mut player = Player::new(8, RATE, true);
        player.play(song, None).unwrap();
        let out = render(&mut player, 16);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn pitch_wheel_recomputes_voice_steps() {
        // Wheel at +4096 = one semitone up, applied before the note.
        let mut song = one_note_song();
        song.events.push((0, Event::PitchWheel { channel: 0, bend: 4096 }));
        song.sort_events();

        let mut player = Player::new(8, RATE, true);
        player.play(song, None).unwrap();
        render(&mut player, 1);

        let expected = melodic_phase_step(69, 1.0, 1.0 / RATE as f32);
        let voices = player.channels[0].voices();
        assert_eq!(voices.len(), 1);
        assert!((voices[0].phase_add_by - expected).abs() < 1e-6);
    }

    #[test]
    fn pitch_wheel_rebends_sounding_voices() {
        let mut song = one_note_song();
        song.events.push((2, Event::PitchWheel { channel: 0, bend: -8192 }));
        song.sort_events();

        let mut player = Player::new(8, RATE, true);
        player.play(song, None).unwrap();
        render(&mut player, 8);

        let expected = melodic_phase_step(69, -2.0, 1.0 / RATE as f32);
        let voices = player.channels[0].voices();
        assert!((voices[0].phase_add_by - expected).abs() < 1e-6);
    }

    #[test]
    fn drum_without_mapping_dies_within_a_frame() {
        let mut song = empty_song();
        song.events.push((0, Event::NoteOn { channel: 9, note: 42, velocity: 127 }));
        song.sort_events();

        let mut player = Player::new(8, RATE, true);
        player.play(song, None).unwrap();

        render(&mut player, 1);
        // marked inactive while mixing the first frame
        assert!(!player.channels[9].voices()[0].active);

        render(&mut player, 1);
        assert_eq!(player.on_voices(), 0);
        assert!(player.channels[9].voices().is_empty());
    }

    #[test]
    fn mapped_drum_renders_its_waveform() {
        let mut song = empty_song();
        song.drums.insert(
            42,
            Drum { waveform: vec![255; 4096], ..Drum::default() },
        );
        song.events.push((0, Event::NoteOn { channel: 9, note: 42, velocity: 127 }));
        song.sort_events();

        let mut player = Player::new(8, RATE, true);
        player.play(song, None).unwrap();
        let out = render(&mut player, 16);
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn mono_output_averages_channels() {
        let mut stereo = Player::new(8, RATE, true);
        stereo.play(one_note_song(), None).unwrap();
        let mut mono = Player::new(8, RATE, false);
        mono.play(one_note_song(), None).unwrap();

        let st = render(&mut stereo, 64);
        let mut mo = vec![0.0f32; 64];
        mono.tick(&mut mo);

        for (frame, &m) in st.chunks_exact(2).zip(&mo) {
            let expected = ((frame[0] + frame[1]) / 2.0).clamp(-1.0, 1.0);
            assert!((m - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn pause_stops_song_but_keeps_state() {
        let mut player = Player::new(8, RATE, true);
        player.play(one_note_song(), None).unwrap();
        render(&mut player, 32);

        player.pause();
        player.pause(); // idempotent
        assert!(!player.is_playing());

        let out = render(&mut player, 32);
        assert!(out.iter().all(|&s| s == 0.0));
        assert!(player.current().is_some());
    }

    #[test]
    fn replay_resets_transport() {
        let mut player = Player::new(8, RATE, true);
        player.play(one_note_song(), None).unwrap();
        render(&mut player, 512);

        player.play(one_note_song(), None).unwrap();
        assert_eq!(player.cursor(), 0);
        assert_eq!(player.on_voices(), 0);
        assert!(player.channels.iter().all(|c| c.voices().is_empty()));

        let out = render(&mut player, 64);
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn song_wraps_at_ticks_end() {
        let mut song = one_note_song();
        song.ticks_end = 16; // a very short song
        let mut player = Player::new(8, RATE, true);
        player.play(song, None).unwrap();

        // Render well past the end; voices persist across the wrap and
        // the clock stays in range.
        let out = render(&mut player, 256);
        assert!(out.iter().any(|&s| s != 0.0));
        assert!(player.seconds_elapsed <= player.seconds_end + 1.0 / RATE as f32);
    }

    #[test]
    fn zero_tempo_renders_silence() {
        let mut song = one_note_song();
        song.ticks_per_second = 0;
        let mut player = Player::new(8, RATE, true);
        player.play(song, None).unwrap();
        let out = render(&mut player, 64);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn out_of_range_channel_events_are_dropped() {
        let mut song = empty_song();
        song.events.push((0, Event::NoteOn { channel: 200, note: 69, velocity: 127 }));
        song.events.push((0, Event::NoteOff { channel: 16 }));
        song.events.push((0, Event::PitchWheel { channel: 99, bend: 4096 }));
        song.events.push((0, Event::ProgramChange { channel: 42, program: 0 }));
        song.sort_events();

        let mut player = Player::new(8, RATE, true);
        player.play(song, None).unwrap();
        let out = render(&mut player, 16);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(player.on_voices(), 0);
    }

    #[test]
    fn voice_budget_survives_reuse_after_note_death() {
        // A released non-looping voice frees its slot for later notes.
        let mut song = empty_song();
        let mut patch = square_patch();
        patch.loop_start = NO_LOOP;
        patch.waveform.truncate(8);
        song.patches.insert(0, patch);
        song.events.push((0, Event::ProgramChange { channel: 0, program: 0 }));
        song.events.push((0, Event::NoteOn { channel: 0, note: 60, velocity: 127 }));
        song.events.push((RATE / 2, Event::NoteOn { channel: 0, note: 64, velocity: 127 }));
        song.sort_events();

        let mut player = Player::new(1, RATE, true);
        player.play(song, None).unwrap();
        render(&mut player, RATE as usize / 2 + 4);
        assert_eq!(player.on_voices(), 1);
    }

    #[test]
    fn sfx_plays_while_paused() {
        let mut player = Player::new(8, RATE, true);
        player.queue_sfx(Sfx::new(&[255; 512], 0.0, 1.0, 1.0));

        let out = render(&mut player, 16);
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn sfx_is_reaped_when_drained() {
        let mut player = Player::new(8, RATE, true);
        player.queue_sfx(Sfx::new(&[200; 8], 0.0, 1.0, 1.0));
        render(&mut player, 32);
        assert!(player.sfx.is_empty());
    }

    #[test]
    fn put_environment_takes_effect_mid_song() {
        let env = Environment {
            feedback_l: 0.9,
            feedback_r: 0.9,
            wet_l: 1.0,
            wet_r: 1.0,
            cursor_increment: 1,
            cursor_max: 64,
            fir_filter: None,
        };

        // Without an environment the pause goes silent immediately.
        let mut player = Player::new(8, RATE, true);
        player.play(one_note_song(), None).unwrap();
        render(&mut player, 64);
        player.pause();
        assert!(render(&mut player, 32).iter().all(|&s| s == 0.0));

        // Swapped in mid-song, the delay line charges and rings out.
        player.play(one_note_song(), None).unwrap();
        player.put_environment(Some(env));
        render(&mut player, 64);
        player.pause();
        assert!(render(&mut player, 32).iter().any(|&s| s != 0.0));
    }

    #[test]
    fn echo_rings_out_after_pause() {
        let env = Environment {
            feedback_l: 0.9,
            feedback_r: 0.9,
            wet_l: 1.0,
            wet_r: 1.0,
            cursor_increment: 1,
            cursor_max: 64,
            fir_filter: None,
        };
        let mut player = Player::new(8, RATE, true);
        player.play(one_note_song(), Some(env)).unwrap();
        render(&mut player, 256);

        player.pause();
        let tail = render(&mut player, 64);
        assert!(tail.iter().any(|&s| s != 0.0), "echo tail must survive pause");
    }
}
