//! AXSD format decoder.
//!
//! Framing: four bytes of big-endian `AXSD` magic, then a stream of
//! tagged records. Every integer and float after the magic is
//! little-endian; floats and the signed pitch-wheel value travel as u32
//! bit patterns and are reinterpreted, never value-converted.

use alloc::vec::Vec;
use axsd_ir::{Drum, Event, Patch, Song};

use crate::FormatError;

/// Big-endian magic: "AXSD" (0x41585344).
const MAGIC: [u8; 4] = *b"AXSD";

// Record tags. 0x01-0x04 carry a tick and schedule at it; 0x80/0x81
// carry instrument payloads and schedule a marker at tick 0; the meta
// tags carry song-wide values.
const TAG_NOTE_ON: u8 = 0x01;
const TAG_NOTE_OFF: u8 = 0x02;
const TAG_PITCHWHEEL: u8 = 0x03;
const TAG_PROGRAM_CHANGE: u8 = 0x04;
const TAG_PATCH_DATA: u8 = 0x80;
const TAG_DRUM_DATA: u8 = 0x81;
const TAG_VERSION: u8 = 0xFC;
const TAG_RATE: u8 = 0xFD;
const TAG_END_OF_TRACK: u8 = 0xFE;

/// Little-endian cursor over the record stream.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn done(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], FormatError> {
        let end = self.pos.checked_add(len).ok_or(FormatError::Truncated)?;
        let bytes = self.data.get(self.pos..end).ok_or(FormatError::Truncated)?;
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.take(1)?[0])
    }

    fn u16_le(&mut self) -> Result<u16, FormatError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32_le(&mut self) -> Result<u32, FormatError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Signed 32-bit transported as a little-endian bit pattern.
    fn i32_le(&mut self) -> Result<i32, FormatError> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// IEEE-754 binary32 transported as a little-endian u32 bit pattern.
    fn f32_le(&mut self) -> Result<f32, FormatError> {
        Ok(f32::from_bits(self.u32_le()?))
    }
}

/// Decode an AXSD byte buffer into a [`Song`].
///
/// On success every field of the returned song is populated: `version`
/// and `ticks_per_second` from the meta records, `ticks_end` from
/// EndOfTrack, the schedule sorted by tick (file order within a tick),
/// and the patch/drum banks keyed by their program and note numbers.
pub fn decode(data: &[u8]) -> Result<Song, FormatError> {
    let mut r = Reader::new(data);
    let magic = r.take(4).map_err(|_| FormatError::BadMagic)?;
    if magic != MAGIC {
        return Err(FormatError::BadMagic);
    }

    let mut song = Song::default();

    while !r.done() {
        match r.u8()? {
            TAG_NOTE_ON => {
                let tick = r.u32_le()?;
                let channel = r.u8()?;
                let note = r.u8()?;
                let velocity = r.u8()?;
                song.events.push((tick, Event::NoteOn { channel, note, velocity }));
            }
            TAG_NOTE_OFF => {
                let tick = r.u32_le()?;
                let channel = r.u8()?;
                song.events.push((tick, Event::NoteOff { channel }));
            }
            TAG_PITCHWHEEL => {
                let tick = r.u32_le()?;
                let channel = r.u8()?;
                let bend = r.i32_le()?;
                song.events.push((tick, Event::PitchWheel { channel, bend }));
            }
            TAG_PROGRAM_CHANGE => {
                let tick = r.u32_le()?;
                let channel = r.u8()?;
                let program = r.u8()?;
                song.events.push((tick, Event::ProgramChange { channel, program }));
            }
            TAG_PATCH_DATA => {
                let program = r.u8()?;
                let width = r.u32_le()?;
                let loop_start = r.u32_le()?;
                let loop_end = r.u32_le()?;
                let ratio = r.f32_le()?;
                let gain_l = r.f32_le()?;
                let gain_r = r.f32_le()?;
                let waveform = r.take(width as usize)?.to_vec();
                song.patches.insert(
                    program,
                    Patch { waveform, ratio, gain_l, gain_r, loop_start, loop_end },
                );
                song.events.push((0, Event::PatchData));
            }
            TAG_DRUM_DATA => {
                let drum = r.u8()?;
                let width = r.u32_le()?;
                let ratio = r.f32_le()?;
                let gain_l = r.f32_le()?;
                let gain_r = r.f32_le()?;
                let waveform = r.take(width as usize)?.to_vec();
                song.drums.insert(drum, Drum { waveform, ratio, gain_l, gain_r });
                song.events.push((0, Event::DrumData));
            }
            TAG_VERSION => {
                let version = r.u16_le()?;
                song.version = version;
                song.events.push((0, Event::Version(version)));
            }
            TAG_RATE => {
                let rate = r.u32_le()?;
                song.ticks_per_second = rate;
                song.events.push((0, Event::Rate(rate)));
            }
            TAG_END_OF_TRACK => {
                let tick = r.u32_le()?;
                song.ticks_end = tick;
                song.events.push((tick, Event::EndOfTrack));
            }
            tag => return Err(FormatError::UnknownTag(tag)),
        }
    }

    song.sort_events();
    Ok(song)
}

/// Decode a song from a raw C byte array.
///
/// Copies `len` bytes into an owned buffer and runs [`decode`] on it.
///
/// # Safety
///
/// `data` must point to at least `len` bytes readable for the duration
/// of the call.
pub unsafe fn decode_from_c_array(data: *const u8, len: usize) -> Result<Song, FormatError> {
    let owned: Vec<u8> = core::slice::from_raw_parts(data, len).to_vec();
    decode(&owned)
}
