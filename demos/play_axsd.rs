//! Plays an AXSD song through the default audio device, or renders one
//! pass of it to WAV.
//!
//! Usage:
//!   cargo run --example play_axsd -- path/to/song.axsd
//!   cargo run --example play_axsd -- path/to/song.axsd --echo
//!   cargo run --example play_axsd -- path/to/song.axsd --wav output.wav

use axolotlsd::{decode, Environment, Player, Song};
use axsd_audio::{AudioOutput, CpalOutput};
use std::io::Write;
use std::{env, fs};

/// A gentle hall: ~85ms delay at 48k, moderate feedback, 30% wet.
fn demo_echo() -> Environment {
    Environment {
        feedback_l: 0.55,
        feedback_r: 0.55,
        wet_l: 0.3,
        wet_r: 0.3,
        cursor_increment: 1,
        cursor_max: 4096,
        fir_filter: None,
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let path = args.get(1).unwrap_or_else(|| {
        eprintln!("Usage: play_axsd <song.axsd> [--echo] [--wav output.wav]");
        std::process::exit(1);
    });

    let with_echo = args.iter().any(|a| a == "--echo");
    let wav_path = args
        .iter()
        .position(|a| a == "--wav")
        .and_then(|i| args.get(i + 1))
        .cloned();

    let data = fs::read(path).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {}", path, e);
        std::process::exit(1);
    });

    let song = decode(&data).unwrap_or_else(|e| {
        eprintln!("Failed to decode AXSD: {}", e);
        std::process::exit(1);
    });

    println!("Version:  {}", song.version);
    println!("Rate:     {} ticks/s", song.ticks_per_second);
    println!("Length:   {} ticks ({:.1}s)", song.ticks_end, song.seconds_end());
    println!("Events:   {}", song.events.len());
    println!("Patches:  {}", song.patches.len());
    println!("Drums:    {}", song.drums.len());
    println!();

    let echo = with_echo.then(demo_echo);
    match wav_path {
        Some(wav) => render_to_wav(song, echo, &wav),
        None => play_audio(song, echo),
    }
}

fn play_audio(song: Song, echo: Option<Environment>) {
    let mut output = CpalOutput::open(100).unwrap_or_else(|e| {
        eprintln!("Failed to open audio output: {}", e);
        std::process::exit(1);
    });

    let sample_rate = output.sample_rate();
    println!("Sample rate: {} Hz", sample_rate);

    let seconds = song.seconds_end();
    let mut player = Player::new(32, sample_rate, true);
    player.play(song, echo).unwrap_or_else(|e| {
        eprintln!("Failed to start song: {}", e);
        std::process::exit(1);
    });

    output.start().unwrap_or_else(|e| {
        eprintln!("Failed to start audio output: {}", e);
        std::process::exit(1);
    });

    println!("Playing...");
    println!();

    // The driver loops the song forever; play one pass plus a short
    // tail for the echo to ring out.
    let total_frames = (seconds * sample_rate as f32) as u64 + sample_rate as u64;
    let print_interval = sample_rate as u64 / 100;

    let mut frame = [0.0f32; 2];
    for count in 0..total_frames {
        player.tick(&mut frame);
        output.push_frame(frame);

        if count % print_interval == 0 {
            print!("\rTick: {:>8}", player.cursor());
            let _ = std::io::stdout().flush();
        }
    }

    let _ = output.stop();
    println!("\rDone.          ");
    if output.underrun_count() > 0 {
        println!("({} device callbacks ran dry)", output.underrun_count());
    }
}

fn render_to_wav(song: Song, echo: Option<Environment>, path: &str) {
    let sample_rate: u32 = 48000;
    let seconds = song.seconds_end();

    let mut player = Player::new(32, sample_rate, true);
    player.play(song, echo).unwrap_or_else(|e| {
        eprintln!("Failed to start song: {}", e);
        std::process::exit(1);
    });

    println!("Rendering to {} at {} Hz...", path, sample_rate);

    let total_frames = (seconds * sample_rate as f32) as usize;
    let mut samples = vec![0.0f32; total_frames * 2];
    player.tick(&mut samples);

    println!("Rendered {} frames ({:.1}s)", total_frames, seconds);

    let file = fs::File::create(path).unwrap_or_else(|e| {
        eprintln!("Failed to create {}: {}", path, e);
        std::process::exit(1);
    });
    let mut writer = std::io::BufWriter::new(file);

    write_wav(&mut writer, &samples, sample_rate).unwrap_or_else(|e| {
        eprintln!("Failed to write WAV: {}", e);
        std::process::exit(1);
    });

    println!("Done.");
}

/// Write interleaved f32 samples as a 16-bit stereo PCM WAV.
///
/// The 44-byte header is assembled in memory first; every size field
/// is known up front because the whole song was rendered already.
fn write_wav(w: &mut impl Write, samples: &[f32], sample_rate: u32) -> std::io::Result<()> {
    const CHANNELS: u32 = 2;
    const SAMPLE_BYTES: u32 = 2;
    let payload = samples.len() as u32 * SAMPLE_BYTES;

    let mut header = Vec::with_capacity(44);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&(36 + payload).to_le_bytes());
    header.extend_from_slice(b"WAVEfmt ");
    header.extend_from_slice(&16u32.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes()); // integer PCM
    header.extend_from_slice(&(CHANNELS as u16).to_le_bytes());
    header.extend_from_slice(&sample_rate.to_le_bytes());
    header.extend_from_slice(&(sample_rate * CHANNELS * SAMPLE_BYTES).to_le_bytes());
    header.extend_from_slice(&((CHANNELS * SAMPLE_BYTES) as u16).to_le_bytes());
    header.extend_from_slice(&(8 * SAMPLE_BYTES as u16).to_le_bytes());
    header.extend_from_slice(b"data");
    header.extend_from_slice(&payload.to_le_bytes());
    w.write_all(&header)?;

    for &sample in samples {
        let quantized = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        w.write_all(&quantized.to_le_bytes())?;
    }

    Ok(())
}
