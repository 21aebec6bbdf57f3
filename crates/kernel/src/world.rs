use glam::DVec3;
use movequeue_common::{
    AccessError, BlockPos, BlockState, EntityId, Location, Offset, WorldAccess, WorldId,
};
use std::collections::BTreeMap;

/// An event record produced by every mutation to the world.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    /// Entity was spawned at the given location.
    Spawned {
        id: EntityId,
        location: Location,
        player: bool,
    },
    /// Entity was despawned. Carries its last location.
    Despawned { id: EntityId, location: Location },
    /// Entity was moved directly to a new location.
    Teleported {
        id: EntityId,
        old: Location,
        new: Location,
    },
    /// A relative offset was added to a player's pending displacement.
    DisplacementQueued { player: EntityId, offset: Offset },
    /// Pending displacement was folded into the player's movement.
    DisplacementApplied {
        player: EntityId,
        old: Location,
        new: Location,
    },
    /// Block content changed.
    BlockChanged {
        pos: BlockPos,
        old: BlockState,
        new: BlockState,
    },
    /// Host advanced one tick.
    Stepped { tick: u64 },
}

/// Per-entity data stored in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityData {
    pub location: Location,
    /// Whether a remote client drives this entity.
    pub player: bool,
}

/// The authoritative state of one world.
///
/// Uses BTreeMap for deterministic iteration order, so two worlds fed the
/// same operations hash identically.
#[derive(Debug, Clone)]
pub struct World {
    id: WorldId,
    entities: BTreeMap<EntityId, EntityData>,
    blocks: BTreeMap<BlockPos, BlockState>,
    /// Offsets waiting for each player's next movement update.
    pending: BTreeMap<EntityId, Offset>,
    tick: u64,
    /// Append-only event log of all mutations.
    event_log: Vec<WorldEvent>,
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldId::new())
    }
}

impl World {
    /// Create an empty world at tick 0.
    pub fn new(id: WorldId) -> Self {
        Self {
            id,
            entities: BTreeMap::new(),
            blocks: BTreeMap::new(),
            pending: BTreeMap::new(),
            tick: 0,
            event_log: Vec::new(),
        }
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    /// Current host tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of entities in the world.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    pub fn entities(&self) -> &BTreeMap<EntityId, EntityData> {
        &self.entities
    }

    /// A location in this world.
    pub fn location(&self, position: DVec3, yaw: f32, pitch: f32) -> Location {
        Location::new(self.id, position, yaw, pitch)
    }

    /// Spawn a free-moving entity at `position`. Returns its id.
    pub fn spawn(&mut self, position: DVec3) -> EntityId {
        let id = EntityId::new();
        self.spawn_with_id(id, self.location(position, 0.0, 0.0), false);
        id
    }

    /// Spawn a player-controlled entity at `position`. Returns its id.
    pub fn spawn_player(&mut self, position: DVec3) -> EntityId {
        let id = EntityId::new();
        self.spawn_with_id(id, self.location(position, 0.0, 0.0), true);
        id
    }

    pub fn spawn_with_id(&mut self, id: EntityId, location: Location, player: bool) {
        self.entities.insert(id, EntityData { location, player });
        self.event_log.push(WorldEvent::Spawned {
            id,
            location,
            player,
        });
    }

    /// Remove an entity and any displacement still pending for it.
    pub fn despawn(&mut self, id: EntityId) -> Option<EntityData> {
        let data = self.entities.remove(&id);
        if let Some(ref d) = data {
            self.pending.remove(&id);
            self.event_log.push(WorldEvent::Despawned {
                id,
                location: d.location,
            });
        }
        data
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityData> {
        self.entities.get(&id)
    }

    /// Block content at `pos`; unset blocks read as air.
    pub fn block_at(&self, pos: BlockPos) -> BlockState {
        self.blocks.get(&pos).copied().unwrap_or(BlockState::AIR)
    }

    /// Displacement accumulated for a player and not yet folded in.
    pub fn pending_displacement(&self, player: EntityId) -> Option<Offset> {
        self.pending.get(&player).copied()
    }

    /// Fold every pending player displacement into the player's location.
    ///
    /// This is the host's movement update. Returns the number of players moved.
    pub fn flush_player_displacements(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let mut moved = 0;
        for (player, offset) in pending {
            let Some(data) = self.entities.get_mut(&player) else {
                continue;
            };
            let old = data.location;
            data.location = old.offset_by(offset);
            self.event_log.push(WorldEvent::DisplacementApplied {
                player,
                old,
                new: data.location,
            });
            moved += 1;
        }
        if moved > 0 {
            tracing::trace!(moved, "player displacements applied");
        }
        moved
    }

    /// Advance the host by one tick.
    pub fn step(&mut self) {
        self.tick += 1;
        self.event_log.push(WorldEvent::Stepped { tick: self.tick });
    }

    /// Deterministic FNV-1a hash of the world state, in BTreeMap order.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&mut h, &self.tick.to_le_bytes());
        for (id, data) in &self.entities {
            mix(&mut h, id.0.as_bytes());
            mix(&mut h, &data.location.position.x.to_le_bytes());
            mix(&mut h, &data.location.position.y.to_le_bytes());
            mix(&mut h, &data.location.position.z.to_le_bytes());
            mix(&mut h, &data.location.yaw.to_le_bytes());
            mix(&mut h, &data.location.pitch.to_le_bytes());
            mix(&mut h, &[data.player as u8]);
        }
        for (pos, block) in &self.blocks {
            mix(&mut h, &pos.x.to_le_bytes());
            mix(&mut h, &pos.y.to_le_bytes());
            mix(&mut h, &pos.z.to_le_bytes());
            mix(&mut h, &block.0.to_le_bytes());
        }
        h
    }

    fn check_world(&self, world: WorldId) -> Result<(), AccessError> {
        if world == self.id {
            Ok(())
        } else {
            Err(AccessError::UnknownWorld(world))
        }
    }
}

impl WorldAccess for World {
    fn location_of(&self, entity: EntityId) -> Result<Location, AccessError> {
        self.entities
            .get(&entity)
            .map(|d| d.location)
            .ok_or(AccessError::EntityGone(entity))
    }

    fn teleport(&mut self, entity: EntityId, to: Location) -> Result<(), AccessError> {
        self.check_world(to.world)?;
        let data = self
            .entities
            .get_mut(&entity)
            .ok_or(AccessError::EntityGone(entity))?;
        let old = data.location;
        data.location = to;
        self.event_log.push(WorldEvent::Teleported {
            id: entity,
            old,
            new: to,
        });
        Ok(())
    }

    fn accumulate_player_displacement(
        &mut self,
        player: EntityId,
        offset: Offset,
    ) -> Result<(), AccessError> {
        let data = self
            .entities
            .get(&player)
            .ok_or(AccessError::EntityGone(player))?;
        if !data.player {
            return Err(AccessError::NotAPlayer(player));
        }
        let pending = self.pending.entry(player).or_insert(Offset::ZERO);
        *pending = *pending + offset;
        self.event_log
            .push(WorldEvent::DisplacementQueued { player, offset });
        Ok(())
    }

    fn set_block(&mut self, pos: BlockPos, block: BlockState) -> Result<(), AccessError> {
        self.check_world(pos.world)?;
        let previous = if block == BlockState::AIR {
            self.blocks.remove(&pos)
        } else {
            self.blocks.insert(pos, block)
        };
        let old = previous.unwrap_or(BlockState::AIR);
        self.event_log.push(WorldEvent::BlockChanged {
            pos,
            old,
            new: block,
        });
        Ok(())
    }
}
