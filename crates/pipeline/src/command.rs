use movequeue_common::{AccessError, BlockPos, BlockState, EntityId, Offset, WorldAccess};

/// The world object a command mutates. Merge policies group by this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    Entity(EntityId),
    Block(BlockPos),
}

/// One deferred mutation of one world object.
///
/// Commands are immutable values. Two commands are equal when they target
/// the same object with a bit-identical payload, which makes equality the
/// dedup key inside a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateCommand {
    /// Relocate a free-moving entity relative to where it is at apply time.
    MoveEntity { entity: EntityId, offset: Offset },
    /// Add to a player's pending displacement. Players are never teleported.
    MovePlayer { player: EntityId, offset: Offset },
    /// Replace the content of a block.
    SetBlock { pos: BlockPos, block: BlockState },
}

impl UpdateCommand {
    /// Relocation command for an entity, picking the player variant when a
    /// client drives the entity.
    pub fn relocate(entity: EntityId, player_controlled: bool, offset: Offset) -> Self {
        if player_controlled {
            Self::MovePlayer {
                player: entity,
                offset,
            }
        } else {
            Self::MoveEntity { entity, offset }
        }
    }

    pub fn set_block(pos: BlockPos, block: BlockState) -> Self {
        Self::SetBlock { pos, block }
    }

    pub fn target(&self) -> Target {
        match *self {
            Self::MoveEntity { entity, .. } => Target::Entity(entity),
            Self::MovePlayer { player, .. } => Target::Entity(player),
            Self::SetBlock { pos, .. } => Target::Block(pos),
        }
    }

    /// The relative offset carried by relocation commands.
    pub fn offset(&self) -> Option<Offset> {
        match *self {
            Self::MoveEntity { offset, .. } | Self::MovePlayer { offset, .. } => Some(offset),
            Self::SetBlock { .. } => None,
        }
    }

    /// Perform this command's single mutation against `world`.
    ///
    /// Must only be called on the thread that owns `world`. Zero offsets
    /// are applied like any other.
    pub fn apply<W: WorldAccess + ?Sized>(&self, world: &mut W) -> Result<(), AccessError> {
        match *self {
            Self::MoveEntity { entity, offset } => {
                let here = world.location_of(entity)?;
                world.teleport(entity, here.offset_by(offset))
            }
            Self::MovePlayer { player, offset } => {
                world.accumulate_player_displacement(player, offset)
            }
            Self::SetBlock { pos, block } => world.set_block(pos, block),
        }
    }

    /// Fold `later` into `self` for the same target, summing offsets.
    ///
    /// Relocations always sum, and the later variant decides how the sum is
    /// applied. Block content is absolute, so a later block change replaces
    /// an earlier one.
    pub(crate) fn compose(&self, later: &Self) -> Self {
        let (Some(earlier_offset), Some(later_offset)) = (self.offset(), later.offset()) else {
            return *later;
        };
        let offset = earlier_offset + later_offset;
        match *later {
            Self::MoveEntity { entity, .. } => Self::MoveEntity { entity, offset },
            Self::MovePlayer { player, .. } => Self::MovePlayer { player, offset },
            Self::SetBlock { .. } => *later,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use movequeue_kernel::{World, WorldEvent};
    use std::collections::HashSet;

    #[test]
    fn equal_commands_collapse_in_a_set() {
        let id = EntityId::new();
        let a = UpdateCommand::relocate(id, false, Offset::new(1.0, 2.0, 3.0, 4.0, 5.0));
        let b = UpdateCommand::relocate(id, false, Offset::new(1.0, 2.0, 3.0, 4.0, 5.0));
        assert_eq!(a, b);
        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn any_changed_field_breaks_equality() {
        let id = EntityId::new();
        let base = UpdateCommand::relocate(id, false, Offset::new(1.0, 2.0, 3.0, 4.0, 5.0));
        let variants = [
            UpdateCommand::relocate(EntityId::new(), false, Offset::new(1.0, 2.0, 3.0, 4.0, 5.0)),
            UpdateCommand::relocate(id, false, Offset::new(1.5, 2.0, 3.0, 4.0, 5.0)),
            UpdateCommand::relocate(id, false, Offset::new(1.0, 2.5, 3.0, 4.0, 5.0)),
            UpdateCommand::relocate(id, false, Offset::new(1.0, 2.0, 3.5, 4.0, 5.0)),
            UpdateCommand::relocate(id, false, Offset::new(1.0, 2.0, 3.0, 4.5, 5.0)),
            UpdateCommand::relocate(id, false, Offset::new(1.0, 2.0, 3.0, 4.0, 5.5)),
        ];
        for other in variants {
            assert_ne!(base, other);
        }
    }

    #[test]
    fn relocate_picks_variant_from_capability() {
        let id = EntityId::new();
        assert!(matches!(
            UpdateCommand::relocate(id, true, Offset::ZERO),
            UpdateCommand::MovePlayer { .. }
        ));
        assert!(matches!(
            UpdateCommand::relocate(id, false, Offset::ZERO),
            UpdateCommand::MoveEntity { .. }
        ));
        assert_eq!(
            UpdateCommand::relocate(id, true, Offset::ZERO).target(),
            Target::Entity(id)
        );
    }

    #[test]
    fn move_entity_is_relative_to_apply_time_location() {
        let mut world = World::default();
        let id = world.spawn(DVec3::new(0.0, 64.0, 0.0));
        let cmd = UpdateCommand::relocate(id, false, Offset::new(1.0, 0.0, -1.0, 90.0, 0.0));

        // Moved for unrelated reasons after the command was built.
        let elsewhere = world.location(DVec3::new(10.0, 70.0, 10.0), 0.0, 0.0);
        world.teleport(id, elsewhere).unwrap();

        cmd.apply(&mut world).unwrap();
        let loc = world.get(id).unwrap().location;
        assert_eq!(loc.position, DVec3::new(11.0, 70.0, 9.0));
        assert_eq!(loc.yaw, 90.0);
    }

    #[test]
    fn zero_offset_still_teleports() {
        let mut world = World::default();
        let id = world.spawn(DVec3::ONE);
        world.drain_events();
        UpdateCommand::relocate(id, false, Offset::ZERO)
            .apply(&mut world)
            .unwrap();
        assert!(matches!(world.events(), [WorldEvent::Teleported { .. }]));
    }

    #[test]
    fn player_variant_never_teleports() {
        let mut world = World::default();
        let player = world.spawn_player(DVec3::ZERO);
        world.drain_events();
        let offset = Offset::new(0.25, 0.0, -0.5, 3.0, -1.0);
        UpdateCommand::relocate(player, true, offset)
            .apply(&mut world)
            .unwrap();

        assert_eq!(
            world.events(),
            &[WorldEvent::DisplacementQueued { player, offset }]
        );
        assert_eq!(world.pending_displacement(player), Some(offset));
        assert_eq!(world.get(player).unwrap().location.position, DVec3::ZERO);
    }

    #[test]
    fn stale_target_reports_error() {
        let mut world = World::default();
        let id = world.spawn(DVec3::ZERO);
        world.despawn(id);
        let result = UpdateCommand::relocate(id, false, Offset::ZERO).apply(&mut world);
        assert_eq!(result, Err(AccessError::EntityGone(id)));
    }

    #[test]
    fn set_block_applies() {
        let mut world = World::default();
        let pos = BlockPos::new(world.id(), 3, 60, -2);
        UpdateCommand::set_block(pos, BlockState(42))
            .apply(&mut world)
            .unwrap();
        assert_eq!(world.block_at(pos), BlockState(42));
        assert_eq!(UpdateCommand::set_block(pos, BlockState(42)).offset(), None);
    }

    #[test]
    fn compose_sums_offsets_and_replaces_blocks() {
        let id = EntityId::new();
        let a = UpdateCommand::relocate(id, false, Offset::translation(1.0, 0.0, 0.0));
        let b = UpdateCommand::relocate(id, false, Offset::translation(0.0, 1.0, 0.0));
        assert_eq!(
            a.compose(&b),
            UpdateCommand::relocate(id, false, Offset::translation(1.0, 1.0, 0.0))
        );

        let pos = BlockPos::new(movequeue_common::WorldId::new(), 0, 0, 0);
        let first = UpdateCommand::set_block(pos, BlockState(1));
        let second = UpdateCommand::set_block(pos, BlockState(2));
        assert_eq!(first.compose(&second), second);
    }
}
