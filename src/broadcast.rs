use crate::segment::{Segment, SegmentKind};
use serde::{Deserialize, Serialize};

/// The ordered, optionally looping sequence of segments belonging to a
/// station. Positions are strictly increasing and unique; every mutation
/// renumbers them 0..n so ties cannot occur.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Broadcast {
    pub segments: Vec<Segment>,
    /// Restart from the first segment when playback reaches the end.
    #[serde(default = "default_true")]
    pub loop_enabled: bool,
    next_id: u32,
}

fn default_true() -> bool {
    true
}

impl Broadcast {
    pub fn new() -> Self {
        Broadcast {
            segments: Vec::new(),
            loop_enabled: true,
            next_id: 1,
        }
    }

    /// Append a segment. Returns the assigned ID.
    pub fn add_segment(&mut self, kind: SegmentKind) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        let position = self.segments.len() as u32;
        self.segments.push(Segment { id, position, kind });
        id
    }

    /// Remove a segment by ID. Returns the removed segment or an error.
    pub fn remove_segment(&mut self, id: u32) -> Result<Segment, String> {
        let pos = self
            .segments
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| format!("Segment {} not found", id))?;
        let removed = self.segments.remove(pos);
        self.renumber();
        Ok(removed)
    }

    /// Move a segment from one list index to another (0-based).
    pub fn move_segment(&mut self, from: usize, to: usize) -> Result<(), String> {
        if from >= self.segments.len() || to >= self.segments.len() {
            return Err(format!(
                "Index out of range (broadcast has {} segments)",
                self.segments.len()
            ));
        }
        let segment = self.segments.remove(from);
        self.segments.insert(to, segment);
        self.renumber();
        Ok(())
    }

    /// Find a segment by ID.
    pub fn find_segment(&self, id: u32) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// Segments in play order (ascending position).
    pub fn segments_in_order(&self) -> Vec<Segment> {
        let mut ordered = self.segments.clone();
        ordered.sort_by_key(|s| s.position);
        ordered
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Re-derive positions 0..n from current list order.
    fn renumber(&mut self) {
        for (i, segment) in self.segments.iter_mut().enumerate() {
            segment.position = i as u32;
        }
    }
}

impl Default for Broadcast {
    fn default() -> Self {
        Self::new()
    }
}
