use euclid::point3;
use pretty_assertions::assert_eq;
use rand::{Rng as _, SeedableRng as _};
use rstest::rstest;

use crate::block::{BlockRecord, BlockType};
use crate::math::{Aab, Axis, FreeCoordinate, FreePoint};
use crate::physics::{Collided, CollisionSpace as _, WorldBounds, resolve_move};
use crate::store::BlockStore;

const BOUNDS: WorldBounds = WorldBounds {
    size: 16.0,
    height: 16.0,
};

fn player_box() -> Aab {
    Aab::standing(0.3, 1.8)
}

fn collided(x: bool, y: bool, z: bool) -> Collided {
    Collided { x, y, z }
}

fn fill(store: &mut BlockStore, lower: [i32; 3], upper: [i32; 3], block_type: BlockType) {
    for x in lower[0]..upper[0] {
        for y in lower[1]..upper[1] {
            for z in lower[2]..upper[2] {
                store.put([x, y, z], block_type, None).unwrap();
            }
        }
    }
}

#[rstest]
#[case::x_low(point3(-5.0, 0.0, 8.0), point3(0.3, 0.0, 8.0), collided(true, false, false))]
#[case::x_high(point3(99.0, 0.0, 8.0), point3(15.7, 0.0, 8.0), collided(true, false, false))]
#[case::z_low(point3(8.0, 0.0, -0.1), point3(8.0, 0.0, 0.3), collided(false, false, true))]
#[case::y_low(point3(8.0, -1.0, 8.0), point3(8.0, 0.0, 8.0), collided(false, true, false))]
#[case::y_high(point3(8.0, 20.0, 8.0), point3(8.0, 14.2, 8.0), collided(false, true, false))]
#[case::inside(point3(1.0, 3.0, 15.0), point3(1.0, 3.0, 15.0), collided(false, false, false))]
fn clamps_to_world(
    #[case] target: FreePoint,
    #[case] expected: FreePoint,
    #[case] expected_collided: Collided,
) {
    let store = BlockStore::new();
    let (resolved, flags) = resolve_move(
        &store,
        BOUNDS,
        player_box(),
        point3(8.0, 0.0, 8.0),
        target,
    );
    for axis in Axis::ALL {
        assert!(
            (resolved[axis] - expected[axis]).abs() < 1e-12,
            "{resolved:?} != {expected:?}"
        );
    }
    assert_eq!(flags, expected_collided);
}

#[test]
fn non_finite_target_is_no_movement() {
    let store = BlockStore::new();
    let from = point3(8.0, 2.0, 8.0);
    let (resolved, flags) = resolve_move(
        &store,
        BOUNDS,
        player_box(),
        from,
        point3(f64::NAN, 3.0, f64::INFINITY),
    );
    assert_eq!(resolved, point3(8.0, 3.0, 8.0));
    assert_eq!(flags, collided(true, false, true));
}

#[test]
fn slide_along_wall() {
    let mut store = BlockStore::new();
    // A wall occupying x = 3, tall enough to block the whole body.
    fill(&mut store, [3, 0, 0], [4, 3, 16], BlockType::Stone);

    let (resolved, flags) = resolve_move(
        &store,
        BOUNDS,
        player_box(),
        point3(2.0, 0.0, 5.0),
        point3(4.0, 0.0, 6.0),
    );

    assert_eq!(flags, collided(true, false, false));
    assert!(resolved.x + 0.3 <= 3.0, "{resolved:?}");
    assert!(resolved.x > 2.7 - 1e-6, "{resolved:?}");
    assert_eq!(resolved.z, 6.0);
}

#[test]
fn leave_embedding_block_into_liquid() {
    let mut store = BlockStore::new();
    store.put([0, 0, 0], BlockType::Stone, None).unwrap();
    store.put([1, 0, 0], BlockType::Water, None).unwrap();

    let (resolved, flags) = resolve_move(
        &store,
        BOUNDS,
        Aab::standing(0.4, 0.8),
        point3(0.5, 0.0, 0.5),
        point3(1.5, 0.0, 0.5),
    );

    assert_eq!(flags, Collided::default());
    assert_eq!(resolved, point3(1.5, 0.0, 0.5));
}

#[test]
fn no_tunneling_through_thin_wall() {
    let mut store = BlockStore::new();
    fill(&mut store, [10, 0, 0], [11, 2, 16], BlockType::Glass);

    let (resolved, flags) = resolve_move(
        &store,
        BOUNDS,
        player_box(),
        point3(1.0, 0.0, 8.0),
        point3(15.0, 0.0, 8.0),
    );
    assert!(flags.x);
    assert!(resolved.x + 0.3 <= 10.0);
    assert!(resolved.x > 9.6);
}

#[test]
fn land_on_floor() {
    let mut store = BlockStore::new();
    fill(&mut store, [0, 0, 0], [16, 1, 16], BlockType::Bedrock);

    let (resolved, flags) = resolve_move(
        &store,
        BOUNDS,
        player_box(),
        point3(8.0, 5.0, 8.0),
        point3(8.0, -3.0, 8.0),
    );
    assert_eq!(flags, collided(false, true, false));
    assert!(resolved.y >= 1.0);
    assert!(resolved.y < 1.0 + 1e-6);

    // Walking along the floor afterwards is unobstructed.
    let (walked, flags) = resolve_move(
        &store,
        BOUNDS,
        player_box(),
        resolved,
        point3(10.0, resolved.y, 8.0),
    );
    assert_eq!(flags, Collided::default());
    assert_eq!(walked.x, 10.0);
}

#[test]
fn blocked_in_negative_direction() {
    let mut store = BlockStore::new();
    fill(&mut store, [0, 0, 4], [16, 2, 5], BlockType::Wood);

    let (resolved, flags) = resolve_move(
        &store,
        BOUNDS,
        player_box(),
        point3(8.0, 0.0, 8.0),
        point3(8.0, 0.0, 1.0),
    );
    assert_eq!(flags, collided(false, false, true));
    assert!(resolved.z - 0.3 >= 5.0);
    assert!(resolved.z < 5.3 + 1e-6);
}

#[test]
fn non_colliding_record_does_not_obstruct() {
    let mut store = BlockStore::new();
    store
        .insert(BlockRecord::new([5, 0, 8], BlockType::Player).with_collision(false))
        .unwrap();
    let (resolved, flags) = resolve_move(
        &store,
        BOUNDS,
        player_box(),
        point3(2.0, 0.0, 8.5),
        point3(8.0, 0.0, 8.5),
    );
    assert_eq!(flags, Collided::default());
    assert_eq!(resolved.x, 8.0);
}

/// Returns whether any colliding cube overlaps `aab` with nonzero volume.
fn overlaps_solid(store: &BlockStore, aab: Aab) -> bool {
    aab.round_up_to_grid()
        .interior_iter()
        .any(|cube| store.collides(cube))
}

/// Random walks through random terrain never end inside a solid or outside the world.
#[test]
fn random_walk_never_penetrates() {
    let mut rng = rand_xoshiro::Xoshiro256Plus::seed_from_u64(0xb10c);
    let mut store = BlockStore::new();
    for x in 0..16 {
        for y in 0..16 {
            for z in 0..16 {
                if rng.random_bool(0.1) {
                    store.put([x, y, z], BlockType::Stone, None).unwrap();
                }
            }
        }
    }
    let collision_box = player_box();

    let coordinate = |rng: &mut rand_xoshiro::Xoshiro256Plus| -> FreeCoordinate {
        if rng.random_bool(0.01) {
            f64::NAN
        } else {
            rng.random_range(-4.0..20.0)
        }
    };

    let mut position = loop {
        let candidate = point3(
            rng.random_range(0.3..15.7),
            rng.random_range(0.0..14.2),
            rng.random_range(0.3..15.7),
        );
        if !overlaps_solid(&store, collision_box.translate(candidate.to_vector())) {
            break candidate;
        }
    };

    for _ in 0..1000 {
        let target = point3(
            coordinate(&mut rng),
            coordinate(&mut rng),
            coordinate(&mut rng),
        );
        let (resolved, _) = resolve_move(&store, BOUNDS, collision_box, position, target);
        let aab = collision_box.translate(resolved.to_vector());
        assert!(
            !overlaps_solid(&store, aab),
            "moved from {position:?} towards {target:?} into a solid at {resolved:?}"
        );
        for axis in Axis::ALL {
            // Clamping may leave rounding error in the last bit.
            assert!(aab.lower_bounds_p()[axis] >= -1e-9, "{aab:?}");
            assert!(aab.upper_bounds_p()[axis] <= BOUNDS.upper(axis) + 1e-9, "{aab:?}");
        }
        position = resolved;
    }

    // Sanity check that the terrain was not trivially empty.
    assert!(store.len() > 100);
}
