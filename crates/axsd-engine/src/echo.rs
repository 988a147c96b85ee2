//! Stereo feedback echo over fixed-length delay lines.

use alloc::vec;
use alloc::vec::Vec;

use axsd_ir::Environment;

/// Delay-line length in samples. Fixed at `u16::MAX` so every possible
/// `cursor_max` stays within the line.
pub const ECHO_BUFFER_LEN: usize = 65535;

/// Linear blend: `x` at `a = 0`, `y` at `a = 1`.
fn mix(x: f32, y: f32, a: f32) -> f32 {
    x * (1.0 - a) + y * a
}

/// Echo state: two ring buffers plus the active configuration.
///
/// With no configuration, [`Echo::process`] is a pass-through.
#[derive(Clone, Debug)]
pub struct Echo {
    buffer_l: Vec<f32>,
    buffer_r: Vec<f32>,
    cursor: u16,
    params: Option<Environment>,
}

impl Echo {
    /// Silent delay lines, no configuration.
    pub fn new() -> Self {
        Self {
            buffer_l: vec![0.0; ECHO_BUFFER_LEN],
            buffer_r: vec![0.0; ECHO_BUFFER_LEN],
            cursor: 0,
            params: None,
        }
    }

    /// Replace the configuration. Line contents are kept, so a swap
    /// mid-song lets the previous tail ring out through the new
    /// parameters.
    pub fn set_params(&mut self, params: Option<Environment>) {
        self.params = params;
    }

    /// The active configuration, if any.
    pub fn params(&self) -> Option<&Environment> {
        self.params.as_ref()
    }

    /// Rewind the cursor for the start of a new song.
    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }

    /// Feed one frame through the delay lines in place.
    ///
    /// The frame is summed into the line at the cursor, the optional FIR
    /// taps are convolved backwards over the ring and folded in at 1/64
    /// scale, feedback is applied and the cell clamped, and the output
    /// becomes the dry/wet blend. The cursor then advances by
    /// `cursor_increment` modulo `cursor_max`. A missing configuration
    /// or a zero-length ring leaves the frame untouched.
    pub fn process(&mut self, l: &mut f32, r: &mut f32) {
        let Some(env) = self.params else { return };
        if env.cursor_max == 0 {
            return;
        }

        let at = self.cursor as usize;
        self.buffer_l[at] += *l;
        self.buffer_r[at] += *r;

        if let Some(taps) = env.fir_filter {
            let max = env.cursor_max as usize;
            let mut fir_l = 0.0;
            let mut fir_r = 0.0;
            for (i, tap) in taps.iter().enumerate() {
                let behind = (at + max - i) % max;
                fir_l += self.buffer_l[behind] * tap;
                fir_r += self.buffer_r[behind] * tap;
            }
            self.buffer_l[at] += fir_l / 64.0;
            self.buffer_r[at] += fir_r / 64.0;
        }

        // feedback, bounded so the line can never run away
        self.buffer_l[at] = (self.buffer_l[at] * env.feedback_l).clamp(-1.0, 1.0);
        self.buffer_r[at] = (self.buffer_r[at] * env.feedback_r).clamp(-1.0, 1.0);

        *l = mix(*l, self.buffer_l[at], env.wet_l);
        *r = mix(*r, self.buffer_r[at], env.wet_r);

        self.cursor =
            ((self.cursor as u32 + env.cursor_increment as u32) % env.cursor_max as u32) as u16;
    }
}

impl Default for Echo {
    fn default() -> Self {
        Self::new()
    }
}
