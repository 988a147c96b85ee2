//! Default-device output through cpal.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapProd, HeapRb};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::{AudioOutput, OutputError, StereoFrame};

/// Output to the host's default device.
///
/// Frames cross to the device callback through an SPSC queue sized by
/// the latency the caller asks for. The stream is opened paused and
/// gated with [`AudioOutput::start`]/[`AudioOutput::stop`]; stopping
/// parks the device rather than substituting silence, so nothing
/// queued is lost.
pub struct CpalOutput {
    stream: Stream,
    sample_rate: u32,
    queue: HeapProd<StereoFrame>,
    underruns: Arc<AtomicUsize>,
}

impl CpalOutput {
    /// Open the default output device with roughly `latency_ms` of
    /// queued audio between the renderer and the device.
    ///
    /// The device keeps its native sample rate; only the channel layout
    /// is pinned to stereo, since that is the shape the driver emits.
    pub fn open(latency_ms: u32) -> Result<Self, OutputError> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or(OutputError::NoOutputDevice)?;
        let native = device
            .default_output_config()
            .map_err(|e| OutputError::BadConfig(e.to_string()))?;
        let sample_rate = native.sample_rate().0;

        let config = StreamConfig {
            channels: 2,
            sample_rate: native.sample_rate(),
            buffer_size: BufferSize::Default,
        };

        // Queue capacity in frames; a floor keeps tiny latencies usable.
        let capacity = ((sample_rate as usize * latency_ms as usize) / 1000).max(64);
        let (queue, mut frames) = HeapRb::<StereoFrame>::new(capacity).split();

        let underruns = Arc::new(AtomicUsize::new(0));
        let starved = underruns.clone();

        let stream = device
            .build_output_stream(
                &config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut filled = 0;
                    for slot in out.chunks_exact_mut(2) {
                        match frames.try_pop() {
                            Some([l, r]) => {
                                slot[0] = l;
                                slot[1] = r;
                                filled += 2;
                            }
                            None => break,
                        }
                    }
                    // renderer fell behind: pad the rest of the period
                    if filled < out.len() {
                        out[filled..].fill(0.0);
                        starved.fetch_add(1, Ordering::Relaxed);
                    }
                },
                |err| eprintln!("output stream fault: {}", err),
                None,
            )
            .map_err(|e| OutputError::Stream(e.to_string()))?;

        // cpal streams may come up live; hold the device until start()
        stream
            .pause()
            .map_err(|e| OutputError::Stream(e.to_string()))?;

        Ok(Self {
            stream,
            sample_rate,
            queue,
            underruns,
        })
    }

    /// Number of device callbacks that drained the queue dry since the
    /// device was opened. A climbing count means the render loop is too
    /// slow for the configured latency.
    pub fn underrun_count(&self) -> usize {
        self.underruns.load(Ordering::Relaxed)
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn push_frame(&mut self, frame: StereoFrame) {
        while self.queue.try_push(frame).is_err() {
            std::thread::yield_now();
        }
    }

    fn start(&mut self) -> Result<(), OutputError> {
        self.stream
            .play()
            .map_err(|e| OutputError::Stream(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), OutputError> {
        self.stream
            .pause()
            .map_err(|e| OutputError::Stream(e.to_string()))
    }
}
