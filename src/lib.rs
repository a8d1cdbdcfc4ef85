//! waveCast — Core library for the geolocated broadcast engine.
//!
//! Stations, broadcast sequencing, and playback scheduling live here.
//! The CLI consumes this crate.

pub mod broadcast;
pub mod driver;
pub mod fade;
pub mod local_music;
pub mod scheduler;
pub mod segment;
pub mod segment_player;
pub mod session;
pub mod speech;
pub mod station;
