use crate::types::{BlockPos, BlockState, EntityId, Location, Offset, WorldId};

/// Errors a host world reports when asked to perform a mutation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AccessError {
    /// The entity was removed between enqueue and apply.
    #[error("entity {0:?} is no longer in the world")]
    EntityGone(EntityId),
    #[error("entity {0:?} is not player-controlled")]
    NotAPlayer(EntityId),
    #[error("world {0:?} is not loaded")]
    UnknownWorld(WorldId),
}

/// The narrow mutation surface a host world exposes to the pipeline.
///
/// Implementations are not required to be thread-safe. Every method is
/// called from the single thread that owns the world.
pub trait WorldAccess {
    /// Current location of a live entity.
    fn location_of(&self, entity: EntityId) -> Result<Location, AccessError>;

    /// Move an entity to an absolute location.
    fn teleport(&mut self, entity: EntityId, to: Location) -> Result<(), AccessError>;

    /// Add a relative offset to the displacement the host folds into the
    /// player's next movement update.
    fn accumulate_player_displacement(
        &mut self,
        player: EntityId,
        offset: Offset,
    ) -> Result<(), AccessError>;

    /// Replace the content of one block.
    fn set_block(&mut self, pos: BlockPos, block: BlockState) -> Result<(), AccessError>;
}

impl<W: WorldAccess + ?Sized> WorldAccess for &mut W {
    fn location_of(&self, entity: EntityId) -> Result<Location, AccessError> {
        (**self).location_of(entity)
    }

    fn teleport(&mut self, entity: EntityId, to: Location) -> Result<(), AccessError> {
        (**self).teleport(entity, to)
    }

    fn accumulate_player_displacement(
        &mut self,
        player: EntityId,
        offset: Offset,
    ) -> Result<(), AccessError> {
        (**self).accumulate_player_displacement(player, offset)
    }

    fn set_block(&mut self, pos: BlockPos, block: BlockState) -> Result<(), AccessError> {
        (**self).set_block(pos, block)
    }
}
