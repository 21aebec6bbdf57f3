use glam::DVec3;
use std::hash::{Hash, Hasher};
use std::ops::Add;
use uuid::Uuid;

/// Unique identifier for an entity in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of one world (dimension) hosted by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorldId(pub Uuid);

impl WorldId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorldId {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer block coordinate inside a specific world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPos {
    pub world: WorldId,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(world: WorldId, x: i32, y: i32, z: i32) -> Self {
        Self { world, x, y, z }
    }
}

/// Opaque block content as understood by the host (material + data packed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockState(pub u32);

impl BlockState {
    pub const AIR: Self = Self(0);
}

/// Absolute placement of an entity: world, position, and look direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub world: WorldId,
    pub position: DVec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl Location {
    pub fn new(world: WorldId, position: DVec3, yaw: f32, pitch: f32) -> Self {
        Self {
            world,
            position,
            yaw,
            pitch,
        }
    }

    /// The location reached by applying `offset` on top of this one.
    ///
    /// Yaw and pitch are summed as-is; the host normalises angles.
    pub fn offset_by(&self, offset: Offset) -> Self {
        Self {
            world: self.world,
            position: self.position + offset.translation,
            yaw: self.yaw + offset.yaw,
            pitch: self.pitch + offset.pitch,
        }
    }
}

/// A relative transformation: translation plus rotation delta.
///
/// Offsets are applied against the target's state at apply time, never
/// stored as absolute coordinates. Equality and hashing use the raw bit
/// pattern of every component.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offset {
    pub translation: DVec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl Offset {
    pub const ZERO: Self = Self {
        translation: DVec3::ZERO,
        yaw: 0.0,
        pitch: 0.0,
    };

    pub fn new(dx: f64, dy: f64, dz: f64, yaw: f32, pitch: f32) -> Self {
        Self {
            translation: DVec3::new(dx, dy, dz),
            yaw,
            pitch,
        }
    }

    /// Pure translation with no rotation.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self::new(dx, dy, dz, 0.0, 0.0)
    }

    pub fn is_zero(&self) -> bool {
        self.translation == DVec3::ZERO && self.yaw == 0.0 && self.pitch == 0.0
    }

    fn bits(&self) -> ([u64; 3], [u32; 2]) {
        (
            [
                self.translation.x.to_bits(),
                self.translation.y.to_bits(),
                self.translation.z.to_bits(),
            ],
            [self.pitch.to_bits(), self.yaw.to_bits()],
        )
    }
}

impl PartialEq for Offset {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for Offset {}

impl Hash for Offset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

impl Add for Offset {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            translation: self.translation + rhs.translation,
            yaw: self.yaw + rhs.yaw,
            pitch: self.pitch + rhs.pitch,
        }
    }
}
