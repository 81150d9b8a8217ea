use std::time::{Duration, Instant};

use crate::drawing::{replay, CanvasState, DrawEvent};
use crate::error::Result;
use crate::id::RoomId;

pub struct Room {
    id: RoomId,
    canvas: CanvasState,
    client_count: usize,
    last_active: Instant,
    evicted: bool,
}

impl Room {
    pub fn new(id: RoomId, canvas: CanvasState) -> Self {
        Self {
            id,
            canvas,
            client_count: 0,
            last_active: Instant::now(),
            evicted: false,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Get canvas dimensions
    pub fn canvas_size(&self) -> (u32, u32) {
        self.canvas.size()
    }

    pub fn canvas(&self) -> &CanvasState {
        &self.canvas
    }

    pub fn client_count(&self) -> usize {
        self.client_count
    }

    pub fn add_client(&mut self) -> usize {
        self.client_count += 1;
        self.touch();
        self.client_count
    }

    /// Decrement the subscriber count; a count of zero stays at zero
    pub fn remove_client(&mut self) -> usize {
        self.client_count = self.client_count.saturating_sub(1);
        self.touch();
        self.client_count
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<bool> {
        let resized = self.canvas.resize(width, height)?;
        if resized {
            self.log_resize();
        }
        Ok(resized)
    }

    /// Bake a draw event into the room raster
    pub fn replay_event(&mut self, event: &DrawEvent) -> Result<()> {
        self.touch();
        if replay::apply(&mut self.canvas, event)? {
            self.log_resize();
        }
        Ok(())
    }

    /// Current raster as a PNG data URL
    pub fn snapshot(&self) -> Result<String> {
        self.canvas.to_data_url()
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }

    /// Set once the registry has dropped this room. Holders of a stale
    /// handle must treat it as missing.
    pub fn is_evicted(&self) -> bool {
        self.evicted
    }

    pub(crate) fn mark_evicted(&mut self) {
        self.evicted = true;
    }

    fn log_resize(&self) {
        let (width, height) = self.canvas.size();
        tracing::info!(
            "Resized room {} canvas to w:{} h:{}{}",
            self.id,
            width,
            height,
            if self.canvas.growth_exhausted() {
                " (maximum reached)"
            } else {
                ""
            }
        );
    }
}
