//! Audio device output for the AxolotlSD sound driver.
//!
//! The driver renders into plain f32 buffers and knows nothing about
//! devices; this crate owns that seam. [`CpalOutput`] opens the default
//! output device and drains a lock-free frame queue that the thread
//! running `Player::tick` keeps topped up.

mod device;

pub use device::CpalOutput;

/// One rendered frame: clamped left/right samples, as `Player::tick`
/// emits them.
pub type StereoFrame = [f32; 2];

/// Failures raised while opening or driving an output device.
#[derive(Debug)]
pub enum OutputError {
    /// The host has no usable output device
    NoOutputDevice,
    /// The device rejected the requested configuration
    BadConfig(String),
    /// The output stream failed to build, start, or stop
    Stream(String),
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputError::NoOutputDevice => write!(f, "no output device on this host"),
            OutputError::BadConfig(msg) => write!(f, "output device rejected configuration: {}", msg),
            OutputError::Stream(msg) => write!(f, "output stream failure: {}", msg),
        }
    }
}

impl std::error::Error for OutputError {}

/// An audio sink the render loop feeds one frame at a time.
pub trait AudioOutput {
    /// Rate the device consumes frames at, in Hz. Hand this to
    /// `Player::new` so the driver renders at device speed.
    fn sample_rate(&self) -> u32;

    /// Queue one frame, parking the caller until there is room.
    fn push_frame(&mut self, frame: StereoFrame);

    /// Begin pulling queued frames to the device.
    fn start(&mut self) -> Result<(), OutputError>;

    /// Stop the device. Queued frames are kept and resume on the next
    /// `start`.
    fn stop(&mut self) -> Result<(), OutputError>;
}
