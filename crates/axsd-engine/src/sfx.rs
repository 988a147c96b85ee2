//! One-shot sound effects mixed alongside song playback.

use alloc::collections::VecDeque;

/// A queued sound effect: unsigned 8-bit PCM bytes consumed front-first.
///
/// Each output frame emits the byte at the front of the queue, then the
/// decimator pops extra bytes to keep pace: `pitch` is the number of
/// additional source bytes consumed per frame, so 0.0 plays one byte
/// per output sample and larger values play proportionally faster.
#[derive(Clone, Debug)]
pub struct Sfx {
    data: VecDeque<u8>,
    accumulator: f32,
    pitch: f32,
    pan_l: f32,
    pan_r: f32,
}

impl Sfx {
    /// Wrap raw PCM bytes as an effect.
    pub fn new(data: &[u8], pitch: f32, pan_l: f32, pan_r: f32) -> Self {
        Self {
            data: data.iter().copied().collect(),
            accumulator: 0.0,
            pitch,
            pan_l,
            pan_r,
        }
    }

    /// All bytes consumed; the player reaps finished effects.
    pub fn is_finished(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    /// Mix the next source byte into `l`/`r` and advance the decimator.
    pub fn render_into(&mut self, l: &mut f32, r: &mut f32) {
        self.accumulator -= self.pitch;

        let Some(byte) = self.data.pop_front() else { return };
        let sample = (byte as i16 - 127) as f32 / 128.0;
        *l += sample * self.pan_l;
        *r += sample * self.pan_r;

        while self.accumulator < 1.0 {
            if self.data.pop_front().is_none() {
                break;
            }
            self.accumulator += 1.0;
        }
    }
}
