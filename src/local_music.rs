//! Local-file music driver — rodio playback on a dedicated audio thread.
//!
//! Resolves a clip source id to an audio file in a media folder, decodes it
//! with rodio, and tracks progress with a wall-clock clip timer. The audio
//! objects live on their own thread (no Send/Sync needed); the driver
//! handle communicates over an `mpsc` channel and reads shared atomics, so
//! it is naturally `Send + Sync` and safe to call from the session thread
//! and the stop control at once.

use crate::driver::MusicDriver;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant};

/// Supported audio extensions for clip files.
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "aac", "m4a"];

enum MusicCmd {
    Load {
        path: PathBuf,
        start: Duration,
        end: Option<Duration>,
    },
    SetVolume(f32),
    Stop,
    Shutdown,
}

/// Clip progress clock, updated by the audio thread on load/stop.
struct ClipClock {
    started: Option<Instant>,
    start_offset: Duration,
    duration: Duration,
    end: Option<Duration>,
}

struct SharedState {
    /// Current volume on the 0-100 scale, stored as f32 bits.
    volume: AtomicU32,
    playing: AtomicBool,
    ended: AtomicBool,
    clock: Mutex<ClipClock>,
}

impl SharedState {
    fn new() -> Self {
        SharedState {
            volume: AtomicU32::new(100.0f32.to_bits()),
            playing: AtomicBool::new(false),
            ended: AtomicBool::new(false),
            clock: Mutex::new(ClipClock {
                started: None,
                start_offset: Duration::ZERO,
                duration: Duration::ZERO,
                end: None,
            }),
        }
    }

    fn mark_ended(&self) {
        self.playing.store(false, Ordering::SeqCst);
        self.ended.store(true, Ordering::SeqCst);
    }

    /// Clear the ended/playing flags and the clip clock for a new load.
    fn reset_for_load(&self) {
        self.ended.store(false, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
        let mut clock = self.clock.lock().unwrap();
        clock.started = None;
        clock.start_offset = Duration::ZERO;
        clock.duration = Duration::ZERO;
        clock.end = None;
    }
}

/// `MusicDriver` backed by rodio playback of files in a media folder.
pub struct LocalMusicDriver {
    tx: mpsc::Sender<MusicCmd>,
    shared: Arc<SharedState>,
    media_folder: PathBuf,
}

impl LocalMusicDriver {
    /// Create the driver and spawn its audio thread. Audio output is
    /// opened lazily on the first successful load, so construction never
    /// fails on machines without a sound device.
    pub fn new(media_folder: PathBuf) -> Self {
        let shared = Arc::new(SharedState::new());
        let (tx, rx) = mpsc::channel::<MusicCmd>();

        let thread_shared = shared.clone();
        std::thread::Builder::new()
            .name("music-driver".into())
            .spawn(move || {
                audio_thread_loop(rx, thread_shared);
            })
            .expect("failed to spawn music-driver thread");

        LocalMusicDriver {
            tx,
            shared,
            media_folder,
        }
    }
}

impl MusicDriver for LocalMusicDriver {
    fn load_and_play(&self, source_id: &str, start: Duration, end: Option<Duration>) {
        // Resolve and reset on the caller's thread: a poll that runs right
        // after this call must not observe a previous clip's ended state.
        let Some(path) = resolve_source(&self.media_folder, source_id) else {
            eprintln!("No clip found for source '{}'", source_id);
            self.shared.reset_for_load();
            self.shared.mark_ended();
            return;
        };
        self.shared.reset_for_load();
        let _ = self.tx.send(MusicCmd::Load { path, start, end });
    }

    fn set_volume(&self, volume: f32) {
        let clamped = volume.clamp(0.0, 100.0);
        self.shared.volume.store(clamped.to_bits(), Ordering::SeqCst);
        let _ = self.tx.send(MusicCmd::SetVolume(clamped));
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.shared.volume.load(Ordering::SeqCst))
    }

    fn current_time(&self) -> Duration {
        let clock = self.shared.clock.lock().unwrap();
        match clock.started {
            Some(at) => clock.start_offset + at.elapsed(),
            None => Duration::ZERO,
        }
    }

    fn duration(&self) -> Duration {
        self.shared.clock.lock().unwrap().duration
    }

    fn is_ended(&self) -> bool {
        self.shared.ended.load(Ordering::SeqCst)
    }

    fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        let _ = self.tx.send(MusicCmd::Stop);
    }
}

impl Drop for LocalMusicDriver {
    fn drop(&mut self) {
        let _ = self.tx.send(MusicCmd::Shutdown);
    }
}

/// Audio thread: owns the rodio output and sink, executes commands,
/// detects clip end on a 50ms poll.
fn audio_thread_loop(rx: mpsc::Receiver<MusicCmd>, shared: Arc<SharedState>) {
    let mut output: Option<(OutputStream, OutputStreamHandle)> = None;
    let mut sink: Option<Sink> = None;

    loop {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(MusicCmd::Load { path, start, end }) => {
                // Lazy-init audio output on first use
                if output.is_none() {
                    match OutputStream::try_default() {
                        Ok(pair) => output = Some(pair),
                        Err(e) => {
                            eprintln!("Failed to open audio output: {}", e);
                            shared.mark_ended();
                            continue;
                        }
                    }
                }
                let Some((_, handle)) = &output else {
                    continue;
                };

                if let Some(old) = sink.take() {
                    old.stop();
                }
                match start_clip(handle, &path, start) {
                    Ok(new_sink) => {
                        new_sink.set_volume(
                            f32::from_bits(shared.volume.load(Ordering::SeqCst)) / 100.0,
                        );
                        let duration = probe_duration(&path);
                        {
                            let mut clock = shared.clock.lock().unwrap();
                            clock.started = Some(Instant::now());
                            clock.start_offset = start;
                            clock.duration = duration;
                            clock.end = end;
                        }
                        shared.ended.store(false, Ordering::SeqCst);
                        shared.playing.store(true, Ordering::SeqCst);
                        sink = Some(new_sink);
                    }
                    Err(e) => {
                        eprintln!("Cannot play '{}': {}", path.display(), e);
                        shared.mark_ended();
                    }
                }
            }

            Ok(MusicCmd::SetVolume(volume)) => {
                if let Some(s) = &sink {
                    s.set_volume(volume / 100.0);
                }
            }

            Ok(MusicCmd::Stop) => {
                if let Some(s) = &sink {
                    s.stop();
                }
                shared.mark_ended();
            }

            Ok(MusicCmd::Shutdown) => {
                if let Some(s) = &sink {
                    s.stop();
                }
                break;
            }

            Err(mpsc::RecvTimeoutError::Timeout) => {
                if shared.playing.load(Ordering::SeqCst) {
                    if let Some(s) = &sink {
                        let past_end = {
                            let clock = shared.clock.lock().unwrap();
                            match (clock.started, clock.end) {
                                (Some(at), Some(end)) => clock.start_offset + at.elapsed() >= end,
                                _ => false,
                            }
                        };
                        if s.empty() || past_end {
                            s.stop();
                            shared.mark_ended();
                        }
                    }
                }
            }

            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Decode a clip file onto a fresh sink, seeking to the start offset.
fn start_clip(
    handle: &OutputStreamHandle,
    path: &Path,
    start: Duration,
) -> Result<Sink, String> {
    let sink = Sink::try_new(handle).map_err(|e| format!("Failed to create sink: {}", e))?;
    let file = File::open(path).map_err(|e| format!("Cannot open '{}': {}", path.display(), e))?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| format!("Cannot decode '{}': {}", path.display(), e))?;
    sink.append(source);
    if !start.is_zero() {
        // Some formats cannot seek; play from the top rather than fail.
        let _ = sink.try_seek(start);
    }
    sink.play();
    Ok(sink)
}

/// Total clip duration from file metadata. Zero when unreadable.
fn probe_duration(path: &Path) -> Duration {
    use lofty::file::AudioFile;
    match lofty::read_from_path(path) {
        Ok(tagged) => tagged.properties().duration(),
        Err(_) => Duration::ZERO,
    }
}

/// Find the clip file for a source id: a file in the media folder whose
/// stem matches the id (case-insensitive) with a supported extension.
pub fn resolve_source(media_folder: &Path, source_id: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(media_folder).ok()?;
    let id_lower = source_id.to_lowercase();

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem() else { continue };
        if stem.to_string_lossy().to_lowercase() != id_lower {
            continue;
        }
        let Some(ext) = path.extension() else { continue };
        if AUDIO_EXTENSIONS.contains(&ext.to_string_lossy().to_lowercase().as_str()) {
            return Some(path);
        }
    }
    None
}
