use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use wavecast::local_music::LocalMusicDriver;
use wavecast::scheduler::{PlaybackEvent, PlaybackScheduler};
use wavecast::segment::{AnnouncementConfig, SegmentKind, TrackConfig, VolumeDipConfig};
use wavecast::speech::CommandSpeechDriver;
use wavecast::station::StationDirectory;

#[derive(Parser)]
#[command(name = "wavecast", about = "Geolocated broadcast engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show directory status
    Status,
    /// Station management
    Station {
        #[command(subcommand)]
        action: StationCmd,
    },
    /// Broadcast segment management
    Segment {
        #[command(subcommand)]
        action: SegmentCmd,
    },
    /// Play a station's broadcast
    Play {
        /// Station name
        station: String,
        /// Folder containing clip files (stem = source id)
        #[arg(short, long, default_value = "media")]
        media_folder: PathBuf,
        /// Text-to-speech program for announcements
        #[arg(long)]
        tts: Option<String>,
    },
}

#[derive(Subcommand)]
enum StationCmd {
    /// Publish a new station at the given coordinates
    Create {
        name: String,
        /// Latitude in degrees
        lat: f64,
        /// Longitude in degrees
        lng: f64,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        genre: Option<String>,
    },
    /// List all stations
    List,
    /// Remove a station
    Remove { name: String },
    /// Turn broadcast looping on or off
    Loop {
        name: String,
        /// "on" or "off"
        state: String,
    },
}

#[derive(Subcommand)]
enum SegmentCmd {
    /// Add a music track to a station's broadcast
    AddTrack {
        /// Station name
        station: String,
        /// Clip source id or URL
        source: String,
        /// Display title
        #[arg(short, long)]
        title: Option<String>,
        /// Start offset in seconds
        #[arg(long, default_value = "0")]
        start: f32,
        /// End offset in seconds (0 = play to the natural end)
        #[arg(long, default_value = "0")]
        end: f32,
        /// Fade-in duration in seconds
        #[arg(long, default_value = "0")]
        fade_in: f32,
        /// Fade-out duration in seconds
        #[arg(long, default_value = "2")]
        fade_out: f32,
    },
    /// Add a spoken announcement
    AddAnnouncement {
        /// Station name
        station: String,
        /// Text to speak
        text: String,
        /// Voice selector passed to the speech engine
        #[arg(short, long)]
        voice: Option<String>,
        /// Lower the music while speaking
        #[arg(long)]
        duck: bool,
        /// Volume the music is held at while ducked (0-100)
        #[arg(long, default_value = "20")]
        duck_volume: f32,
    },
    /// Add a volume dip
    AddDip {
        /// Station name
        station: String,
        /// Target volume (0-100)
        volume: f32,
        /// Hold duration in seconds
        duration: f32,
    },
    /// Show a station's broadcast sequence
    List {
        /// Station name
        station: String,
    },
    /// Move a segment from one position to another (1-based)
    Move {
        /// Station name
        station: String,
        from: usize,
        to: usize,
    },
    /// Remove a segment by ID
    Remove {
        /// Station name
        station: String,
        /// Segment ID (see 'segment list')
        id: u32,
    },
}

fn main() {
    let cli = Cli::parse();
    let state_path = StationDirectory::default_path();
    let mut directory = StationDirectory::load(&state_path);

    match cli.command {
        Commands::Status => {
            println!("waveCast engine v{}", env!("CARGO_PKG_VERSION"));
            let segment_total: usize = directory
                .stations
                .iter()
                .map(|s| s.broadcast.segment_count())
                .sum();
            println!(
                "Stations: {} | Segments: {} | State: {}",
                directory.stations.len(),
                segment_total,
                state_path.display()
            );
        }

        Commands::Station { action } => match action {
            StationCmd::Create {
                name,
                lat,
                lng,
                description,
                genre,
            } => {
                if directory.find_station(&name).is_some() {
                    eprintln!("Error: station '{}' already exists", name);
                    std::process::exit(1);
                }
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                    eprintln!("Error: coordinates out of range (lat -90..90, lng -180..180)");
                    std::process::exit(1);
                }
                let id = directory.create_station(name.clone(), lat, lng);
                if let Some(station) = directory.find_station_mut(&name) {
                    if let Some(d) = description {
                        station.description = d;
                    }
                    if let Some(g) = genre {
                        station.genre = g;
                    }
                }
                save_or_die(&directory, &state_path);
                println!("Published station '{}' (id: {}) at {}, {}", name, id, lat, lng);
            }
            StationCmd::List => {
                if directory.stations.is_empty() {
                    println!("No stations. Use 'station create <name> <lat> <lng>' to publish one.");
                    return;
                }
                for station in &directory.stations {
                    let looping = if station.broadcast.loop_enabled {
                        "loop"
                    } else {
                        "once"
                    };
                    let genre = if station.genre.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", station.genre)
                    };
                    println!(
                        "[{}] {}{} — {} segment(s), {} ({}, {})",
                        station.id,
                        station.name,
                        genre,
                        station.broadcast.segment_count(),
                        looping,
                        station.lat,
                        station.lng
                    );
                }
            }
            StationCmd::Remove { name } => match directory.remove_station(&name) {
                Ok(station) => {
                    save_or_die(&directory, &state_path);
                    println!("Removed station '{}'", station.name);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            },
            StationCmd::Loop { name, state } => {
                let enabled = match state.to_lowercase().as_str() {
                    "on" | "true" | "yes" => true,
                    "off" | "false" | "no" => false,
                    other => {
                        eprintln!("Error: loop state must be 'on' or 'off', got '{}'", other);
                        std::process::exit(1);
                    }
                };
                let station = match directory.find_station_mut(&name) {
                    Some(s) => s,
                    None => {
                        eprintln!("Error: station '{}' not found", name);
                        std::process::exit(1);
                    }
                };
                station.broadcast.loop_enabled = enabled;
                save_or_die(&directory, &state_path);
                println!(
                    "Looping {} for '{}'",
                    if enabled { "enabled" } else { "disabled" },
                    name
                );
            }
        },

        Commands::Segment { action } => match action {
            SegmentCmd::AddTrack {
                station,
                source,
                title,
                start,
                end,
                fade_in,
                fade_out,
            } => {
                if start < 0.0 || end < 0.0 || fade_in < 0.0 || fade_out < 0.0 {
                    eprintln!("Error: offsets and fades must be >= 0");
                    std::process::exit(1);
                }
                let st = find_station_or_die(&mut directory, &station);
                let id = st.broadcast.add_segment(SegmentKind::Track(TrackConfig {
                    source,
                    title: title.unwrap_or_default(),
                    start_offset: start,
                    end_offset: end,
                    fade_in,
                    fade_out,
                }));
                save_or_die(&directory, &state_path);
                println!("Added track segment #{} to '{}'", id, station);
            }
            SegmentCmd::AddAnnouncement {
                station,
                text,
                voice,
                duck,
                duck_volume,
            } => {
                if !(0.0..=100.0).contains(&duck_volume) {
                    eprintln!("Error: duck volume must be 0-100");
                    std::process::exit(1);
                }
                let st = find_station_or_die(&mut directory, &station);
                let id = st
                    .broadcast
                    .add_segment(SegmentKind::Announcement(AnnouncementConfig {
                        text,
                        voice,
                        duck_music: duck,
                        duck_volume,
                    }));
                save_or_die(&directory, &state_path);
                println!("Added announcement segment #{} to '{}'", id, station);
            }
            SegmentCmd::AddDip {
                station,
                volume,
                duration,
            } => {
                if !(0.0..=100.0).contains(&volume) {
                    eprintln!("Error: dip volume must be 0-100");
                    std::process::exit(1);
                }
                if duration <= 0.0 {
                    eprintln!("Error: dip duration must be > 0");
                    std::process::exit(1);
                }
                let st = find_station_or_die(&mut directory, &station);
                let id = st
                    .broadcast
                    .add_segment(SegmentKind::VolumeDip(VolumeDipConfig { volume, duration }));
                save_or_die(&directory, &state_path);
                println!("Added volume dip segment #{} to '{}'", id, station);
            }
            SegmentCmd::List { station } => {
                let st = match directory.find_station(&station) {
                    Some(s) => s,
                    None => {
                        eprintln!("Error: station '{}' not found", station);
                        std::process::exit(1);
                    }
                };
                if st.broadcast.is_empty() {
                    println!("Broadcast for '{}' is empty.", st.name);
                    return;
                }
                let looping = if st.broadcast.loop_enabled { "loop" } else { "once" };
                println!(
                    "Broadcast for '{}' ({} segments, {})",
                    st.name,
                    st.broadcast.segment_count(),
                    looping
                );
                for (i, segment) in st.broadcast.segments_in_order().iter().enumerate() {
                    println!(
                        "{:<3} #{:<4} {:<12} {}",
                        i + 1,
                        segment.id,
                        segment.kind.name(),
                        segment.summary()
                    );
                }
            }
            SegmentCmd::Move { station, from, to } => {
                if from == 0 || to == 0 {
                    eprintln!("Error: positions are 1-based");
                    std::process::exit(1);
                }
                let st = find_station_or_die(&mut directory, &station);
                match st.broadcast.move_segment(from - 1, to - 1) {
                    Ok(()) => {
                        save_or_die(&directory, &state_path);
                        println!("Moved segment {} → {} in '{}'", from, to, station);
                    }
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                }
            }
            SegmentCmd::Remove { station, id } => {
                let st = find_station_or_die(&mut directory, &station);
                match st.broadcast.remove_segment(id) {
                    Ok(segment) => {
                        save_or_die(&directory, &state_path);
                        println!("Removed segment #{}: {}", id, segment.summary());
                    }
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                }
            }
        },

        Commands::Play {
            station,
            media_folder,
            tts,
        } => {
            let (segments, loop_enabled) = match directory.snapshot(&station) {
                Some(snapshot) => snapshot,
                None => {
                    eprintln!("Error: station '{}' not found", station);
                    std::process::exit(1);
                }
            };

            let music = Arc::new(LocalMusicDriver::new(media_folder));
            let speech: Arc<CommandSpeechDriver> = Arc::new(match tts {
                Some(program) => CommandSpeechDriver::with_program(&program),
                None => CommandSpeechDriver::new(),
            });

            // Terminal events unblock the main thread; per-segment events
            // are printed as they happen.
            let (done_tx, done_rx) = mpsc::channel::<PlaybackEvent>();
            let scheduler = PlaybackScheduler::new(music, speech, move |event| {
                match &event {
                    PlaybackEvent::SegmentStarted { index, kind, .. } => {
                        println!("  [{}] {}", index + 1, kind);
                    }
                    PlaybackEvent::BroadcastEnded => println!("Broadcast ended."),
                    PlaybackEvent::Stopped => println!("Stopped."),
                }
                if !matches!(event, PlaybackEvent::SegmentStarted { .. }) {
                    let _ = done_tx.send(event);
                }
            });

            let looping = if loop_enabled { " (looping)" } else { "" };
            println!(
                "Playing broadcast for '{}'{} — {} segment(s)...",
                station,
                looping,
                segments.len()
            );
            if let Err(e) = scheduler.start(segments, loop_enabled) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }

            // Block until the session ends or is stopped.
            let _ = done_rx.recv();
        }
    }
}

fn find_station_or_die<'a>(
    directory: &'a mut StationDirectory,
    name: &str,
) -> &'a mut wavecast::station::Station {
    match directory.find_station_mut(name) {
        Some(s) => s,
        None => {
            eprintln!("Error: station '{}' not found", name);
            std::process::exit(1);
        }
    }
}

fn save_or_die(directory: &StationDirectory, path: &std::path::Path) {
    if let Err(e) = directory.save(path) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
