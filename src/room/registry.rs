use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::drawing::{snapshot, CanvasLimits, CanvasState};
use crate::error::{Result, SketchpadError};
use crate::id::{RoomId, RoomIdGenerator};
use crate::room::Room;

/// Default number of fresh identifiers tried before giving up on a create
pub const MAX_ID_ATTEMPTS: usize = 16;

/// A room handle; the lock serializes all mutations of one room
pub type SharedRoom = Arc<Mutex<Room>>;

/// Process-wide mapping from room identifier to room
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, SharedRoom>>,
    ids: Mutex<RoomIdGenerator>,
    limits: CanvasLimits,
    max_id_attempts: usize,
}

impl RoomRegistry {
    pub fn new(ids: RoomIdGenerator, limits: CanvasLimits) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            ids: Mutex::new(ids),
            limits,
            max_id_attempts: MAX_ID_ATTEMPTS,
        }
    }

    pub fn with_max_id_attempts(mut self, attempts: usize) -> Self {
        self.max_id_attempts = attempts.max(1);
        self
    }

    pub async fn lookup(&self, id: &str) -> Option<SharedRoom> {
        self.rooms.read().await.get(id).cloned()
    }

    pub async fn exists(&self, id: &str) -> bool {
        self.rooms.read().await.contains_key(id)
    }

    /// Allocate a room under a fresh identifier.
    ///
    /// `initial_snapshot` is a data URL drawn onto the new canvas at the
    /// origin; an empty string yields a blank canvas.
    pub async fn create(
        &self,
        width: u32,
        height: u32,
        initial_snapshot: &str,
    ) -> Result<SharedRoom> {
        // Decode before taking the registry lock
        let canvas = if initial_snapshot.is_empty() {
            CanvasState::new(width, height, self.limits)?
        } else {
            let encoded = snapshot::decode_data_url(initial_snapshot)?;
            CanvasState::with_snapshot(width, height, self.limits, &encoded)?
        };

        let mut rooms = self.rooms.write().await;
        let id = {
            let mut ids = self.ids.lock().await;
            let mut attempts = 0;
            loop {
                let candidate = ids.next_id();
                attempts += 1;

                if !rooms.contains_key(&candidate) {
                    break candidate;
                }

                tracing::warn!(
                    "Generated room id {} collides with a live room (attempt {})",
                    candidate,
                    attempts
                );

                if attempts >= self.max_id_attempts {
                    return Err(SketchpadError::IdSpaceExhausted(attempts));
                }
            }
        };

        let (w, h) = canvas.size();
        tracing::info!(
            "Creating room: {} width:{} height:{} data:{}",
            id,
            w,
            h,
            initial_snapshot.len()
        );

        let room = Arc::new(Mutex::new(Room::new(id.clone(), canvas)));
        rooms.insert(id, Arc::clone(&room));

        Ok(room)
    }

    /// Render a room's raster as a data URL; `None` when the room is unknown
    pub async fn snapshot(&self, id: &str) -> Result<Option<String>> {
        let Some(room) = self.lookup(id).await else {
            return Ok(None);
        };

        let room = room.lock().await;
        if room.is_evicted() {
            return Ok(None);
        }
        room.snapshot().map(Some)
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Drop rooms with no subscribers that have been idle for at least `ttl`.
    /// Rooms busy with another operation are kept. Dropped rooms are marked
    /// evicted so handles looked up before the sweep stop accepting work.
    pub async fn prune_idle(&self, ttl: Duration) -> usize {
        let mut rooms = self.rooms.write().await;
        let before = rooms.len();

        rooms.retain(|id, room| match room.try_lock() {
            Ok(mut room) => {
                let evict = room.client_count() == 0 && room.idle_for() >= ttl;
                if evict {
                    tracing::info!("Evicting idle room {} (idle {:?})", id, room.idle_for());
                    room.mark_evicted();
                }
                !evict
            }
            Err(_) => true,
        });

        before - rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::{DrawEvent, Rgba, Tool};
    use crate::id::Alphabet;
    use std::collections::HashSet;

    fn registry() -> RoomRegistry {
        let ids = RoomIdGenerator::seeded(6, Alphabet::default(), 5).unwrap();
        RoomRegistry::new(ids, CanvasLimits::default())
    }

    /// Registry over an eight-identifier space ("baaa" through "bbbb")
    fn tiny_registry() -> RoomRegistry {
        let ids = RoomIdGenerator::seeded(4, Alphabet::new("ab").unwrap(), 1).unwrap();
        RoomRegistry::new(ids, CanvasLimits::default())
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let registry = registry();
        let room = registry.create(800, 600, "").await.unwrap();
        let id = room.lock().await.id().clone();

        assert_eq!(id.as_str().len(), 6);
        assert!(registry.exists(id.as_str()).await);
        assert!(registry.lookup(id.as_str()).await.is_some());
        assert_eq!(registry.room_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_room() {
        let registry = registry();
        assert!(!registry.exists("nope").await);
        assert!(registry.lookup("nope").await.is_none());
        assert!(registry.snapshot("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_clips_dimensions() {
        let registry = registry();
        let room = registry.create(9000, 9000, "").await.unwrap();
        assert_eq!(room.lock().await.canvas_size(), (2000, 1100));
    }

    #[tokio::test]
    async fn test_create_from_snapshot() {
        let registry = registry();

        let mut source: CanvasState = CanvasState::new(40, 40, CanvasLimits::default()).unwrap();
        crate::drawing::replay::apply(
            &mut source,
            &DrawEvent::point(Tool::Brush, 20.0, 20.0, 6.0).with_color("#ff0000"),
        )
        .unwrap();
        let url = source.to_data_url().unwrap();

        let room = registry.create(100, 80, &url).await.unwrap();
        let room = room.lock().await;
        assert_eq!(room.canvas_size(), (100, 80));
        assert_eq!(
            room.canvas().surface().pixel(20, 20),
            Some(Rgba::new(255, 0, 0, 255))
        );
        assert_eq!(room.canvas().surface().pixel(70, 70).unwrap().a, 0);
    }

    #[tokio::test]
    async fn test_snapshot_matches_blank_input() {
        let registry = registry();
        let blank: CanvasState = CanvasState::new(80, 60, CanvasLimits::default()).unwrap();
        let blank_url = blank.to_data_url().unwrap();

        let room = registry.create(80, 60, &blank_url).await.unwrap();
        let id = room.lock().await.id().clone();

        let pixels = registry.snapshot(id.as_str()).await.unwrap().unwrap();
        assert_eq!(pixels, blank_url);
    }

    #[tokio::test]
    async fn test_invalid_snapshot_creates_nothing() {
        let registry = registry();
        let err = registry
            .create(10, 10, "data:image/png;base64,AAAA")
            .await
            .err()
            .unwrap();
        assert_eq!(err.code(), "invalid_snapshot");
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_snapshot_larger_than_limits_rejected() {
        let limits = CanvasLimits {
            max_width: 100,
            max_height: 100,
            growth_margin: 20,
        };
        let ids = RoomIdGenerator::seeded(6, Alphabet::default(), 5).unwrap();
        let registry = RoomRegistry::new(ids, limits);

        let oversized: CanvasState = CanvasState::new(150, 150, CanvasLimits::default()).unwrap();
        let url = oversized.to_data_url().unwrap();

        let err = registry.create(10, 10, &url).await.err().unwrap();
        assert_eq!(err.code(), "invalid_snapshot");
        assert_eq!(registry.room_count().await, 0);

        // Within the limits but larger than the requested canvas: cropped
        let fits: CanvasState = CanvasState::new(100, 100, CanvasLimits::default()).unwrap();
        let room = registry
            .create(10, 10, &fits.to_data_url().unwrap())
            .await
            .unwrap();
        assert_eq!(room.lock().await.canvas_size(), (10, 10));
    }

    #[tokio::test]
    async fn test_ids_unique_until_space_exhausted() {
        let registry = tiny_registry().with_max_id_attempts(3);

        let mut ids = HashSet::new();
        for _ in 0..8 {
            let room = registry.create(10, 10, "").await.unwrap();
            ids.insert(room.lock().await.id().clone());
        }
        assert_eq!(ids.len(), 8);

        let err = registry.create(10, 10, "").await.err().unwrap();
        assert!(matches!(err, SketchpadError::IdSpaceExhausted(3)));
        assert_eq!(registry.room_count().await, 8);
    }

    #[tokio::test]
    async fn test_collision_is_retried() {
        let registry = tiny_registry().with_max_id_attempts(8);

        let mut rooms = Vec::new();
        for _ in 0..8 {
            rooms.push(registry.create(10, 10, "").await.unwrap());
        }

        // Keep every room but the fourth alive, then evict the fourth
        for (i, room) in rooms.iter().enumerate() {
            if i != 3 {
                room.lock().await.add_client();
            }
        }
        let freed = rooms[3].lock().await.id().clone();
        assert_eq!(registry.prune_idle(Duration::ZERO).await, 1);

        // The next period replays the first three ids, which collide,
        // before reaching the freed one
        let room = registry.create(10, 10, "").await.unwrap();
        assert_eq!(room.lock().await.id(), &freed);
    }

    #[tokio::test]
    async fn test_prune_keeps_rooms_with_clients() {
        let registry = registry();
        let busy = registry.create(10, 10, "").await.unwrap();
        busy.lock().await.add_client();
        registry.create(10, 10, "").await.unwrap();

        assert_eq!(registry.prune_idle(Duration::from_secs(3600)).await, 0);
        assert_eq!(registry.prune_idle(Duration::ZERO).await, 1);
        assert_eq!(registry.room_count().await, 1);

        busy.lock().await.remove_client();
        assert_eq!(registry.prune_idle(Duration::ZERO).await, 1);
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_prune_marks_stale_handles() {
        let registry = registry();
        let room = registry.create(10, 10, "").await.unwrap();
        let id = room.lock().await.id().clone();
        assert!(!room.lock().await.is_evicted());

        assert_eq!(registry.prune_idle(Duration::ZERO).await, 1);
        assert!(room.lock().await.is_evicted());
        assert!(registry.snapshot(id.as_str()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_creates() {
        let registry = Arc::new(registry());

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    let room = registry.create(50, 50, "").await.unwrap();
                    let guard = room.lock().await;
                    guard.id().clone()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }
        assert_eq!(ids.len(), 32);
        assert_eq!(registry.room_count().await, 32);
    }
}
