use crate::broadcast::Broadcast;
use crate::segment::Segment;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const STATE_FILE: &str = "wavecast_stations.json";

/// A published station: a point on the map with an owned broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genre: String,
    pub lat: f64,
    pub lng: f64,
    pub created_at: DateTime<Local>,
    #[serde(default)]
    pub broadcast: Broadcast,
}

/// The set of published stations, persisted as a JSON state file.
/// Acts as the segment-list provider: playback takes a snapshot of a
/// station's ordered segments plus its loop flag.
#[derive(Debug, Serialize, Deserialize)]
pub struct StationDirectory {
    pub stations: Vec<Station>,
    next_id: u32,
}

impl StationDirectory {
    pub fn new() -> Self {
        StationDirectory {
            stations: Vec::new(),
            next_id: 1,
        }
    }

    /// Default state file location: the user data dir, falling back to cwd.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("wavecast").join(STATE_FILE))
            .unwrap_or_else(|| PathBuf::from(STATE_FILE))
    }

    /// Load the directory from JSON, or create a new one if not found.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(data) => match serde_json::from_str(&data) {
                    Ok(directory) => return directory,
                    Err(e) => eprintln!("Warning: corrupt station file, starting fresh: {}", e),
                },
                Err(e) => eprintln!("Warning: could not read station file: {}", e),
            }
        }
        StationDirectory::new()
    }

    /// Persist the directory to JSON.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Cannot create '{}': {}", parent.display(), e))?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| format!("Serialize error: {}", e))?;
        fs::write(path, json).map_err(|e| format!("Write error: {}", e))?;
        Ok(())
    }

    /// Publish a new station at the given coordinates. Returns its ID.
    pub fn create_station(&mut self, name: String, lat: f64, lng: f64) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.stations.push(Station {
            id,
            name,
            description: String::new(),
            genre: String::new(),
            lat,
            lng,
            created_at: Local::now(),
            broadcast: Broadcast::new(),
        });
        id
    }

    /// Find a station by name (case-insensitive).
    pub fn find_station(&self, name: &str) -> Option<&Station> {
        self.stations
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Find a station by name (case-insensitive), mutable.
    pub fn find_station_mut(&mut self, name: &str) -> Option<&mut Station> {
        self.stations
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Remove a station by name. Returns the removed station or an error.
    pub fn remove_station(&mut self, name: &str) -> Result<Station, String> {
        let pos = self
            .stations
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| format!("Station '{}' not found", name))?;
        Ok(self.stations.remove(pos))
    }

    /// Snapshot a station's broadcast for playback: the ordered segment
    /// list and the loop flag. The scheduler owns the copy for the session.
    pub fn snapshot(&self, name: &str) -> Option<(Vec<Segment>, bool)> {
        self.find_station(name)
            .map(|s| (s.broadcast.segments_in_order(), s.broadcast.loop_enabled))
    }
}

impl Default for StationDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{SegmentKind, VolumeDipConfig};

    fn dip() -> SegmentKind {
        SegmentKind::VolumeDip(VolumeDipConfig {
            volume: 30.0,
            duration: 1.0,
        })
    }

    #[test]
    fn create_station_assigns_unique_ids() {
        let mut dir = StationDirectory::new();
        let id1 = dir.create_station("North FM".to_string(), 40.7, -74.0);
        let id2 = dir.create_station("South FM".to_string(), 34.0, -118.2);
        assert_ne!(id1, id2);
        assert_eq!(dir.stations.len(), 2);
    }

    #[test]
    fn find_station_case_insensitive() {
        let mut dir = StationDirectory::new();
        dir.create_station("Night Owl".to_string(), 0.0, 0.0);
        assert!(dir.find_station("night owl").is_some());
        assert!(dir.find_station("NIGHT OWL").is_some());
        assert!(dir.find_station("nope").is_none());
    }

    #[test]
    fn remove_station_not_found_errors() {
        let mut dir = StationDirectory::new();
        assert!(dir.remove_station("ghost").is_err());
    }

    #[test]
    fn snapshot_returns_ordered_segments_and_loop_flag() {
        let mut dir = StationDirectory::new();
        dir.create_station("Main".to_string(), 1.0, 2.0);
        let station = dir.find_station_mut("Main").unwrap();
        station.broadcast.add_segment(dip());
        station.broadcast.add_segment(dip());
        station.broadcast.loop_enabled = false;

        let (segments, looping) = dir.snapshot("Main").unwrap();
        assert_eq!(segments.len(), 2);
        assert!(segments[0].position < segments[1].position);
        assert!(!looping);
    }

    #[test]
    fn snapshot_unknown_station_is_none() {
        let dir = StationDirectory::new();
        assert!(dir.snapshot("nowhere").is_none());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir_handle = tempfile::tempdir().unwrap();
        let path = dir_handle.path().join("stations.json");

        let mut dir = StationDirectory::new();
        dir.create_station("Harbor Radio".to_string(), 51.5, -0.1);
        let station = dir.find_station_mut("Harbor Radio").unwrap();
        station.genre = "jazz".to_string();
        station.broadcast.add_segment(dip());
        dir.save(&path).unwrap();

        let loaded = StationDirectory::load(&path);
        let station = loaded.find_station("Harbor Radio").unwrap();
        assert_eq!(station.genre, "jazz");
        assert_eq!(station.lat, 51.5);
        assert_eq!(station.broadcast.segment_count(), 1);
    }

    #[test]
    fn load_missing_file_starts_fresh() {
        let loaded = StationDirectory::load(Path::new("/nonexistent/wavecast.json"));
        assert!(loaded.stations.is_empty());
    }

    #[test]
    fn load_corrupt_file_starts_fresh() {
        let dir_handle = tempfile::tempdir().unwrap();
        let path = dir_handle.path().join("stations.json");
        fs::write(&path, "not json at all").unwrap();
        let loaded = StationDirectory::load(&path);
        assert!(loaded.stations.is_empty());
    }
}
