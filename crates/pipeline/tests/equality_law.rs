use movequeue_common::{EntityId, Offset};
use movequeue_pipeline::UpdateCommand;
use proptest::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

fn hash_of(cmd: &UpdateCommand) -> u64 {
    let mut h = DefaultHasher::new();
    cmd.hash(&mut h);
    h.finish()
}

fn command(id: u128, player: bool, f: [f64; 3], r: [f32; 2]) -> UpdateCommand {
    UpdateCommand::relocate(
        EntityId(Uuid::from_u128(id)),
        player,
        Offset::new(f[0], f[1], f[2], r[0], r[1]),
    )
}

proptest! {
    #[test]
    fn identical_fields_are_equal_with_equal_hashes(
        id in any::<u128>(),
        player in any::<bool>(),
        f in any::<[f64; 3]>(),
        r in any::<[f32; 2]>(),
    ) {
        let a = command(id, player, f, r);
        let b = command(id, player, f, r);
        prop_assert_eq!(a, b);
        prop_assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn changing_one_field_breaks_equality(
        id in any::<u128>(),
        f in prop::array::uniform3(-1.0e6f64..1.0e6),
        r in prop::array::uniform2(-360.0f32..360.0),
        field in 0usize..6,
    ) {
        let a = command(id, false, f, r);
        let (mut f2, mut r2, mut id2) = (f, r, id);
        match field {
            0 => id2 = id.wrapping_add(1),
            1 | 2 | 3 => f2[field - 1] += 1.0,
            _ => r2[field - 4] += 1.0,
        }
        let b = command(id2, false, f2, r2);
        prop_assert_ne!(a, b);
    }
}
