use pretty_assertions::assert_eq;
use rand::{Rng as _, SeedableRng as _};
use rstest::rstest;

use super::*;

fn id(s: &str) -> BlockId {
    BlockId::new(s).unwrap()
}

#[test]
fn put_then_get() {
    let mut store = BlockStore::new();
    assert_eq!(store.put([1, 2, 3], BlockType::Camera, Some(id("c"))), Ok(None));
    let record = store.get([1, 2, 3]).unwrap();
    assert_eq!(record.block_type(), BlockType::Camera);
    assert_eq!(record.block_id(), Some(&id("c")));
    assert_eq!(store.get([0, 0, 0]), None);
    store.consistency_check();
}

#[test]
fn lookup_then_get_agrees() {
    let mut store = BlockStore::new();
    store.put([5, 0, 5], BlockType::Camera, Some(id("camera_1"))).unwrap();
    let position = store.lookup_by_id(&id("camera_1")).unwrap();
    assert_eq!(position, Cube::new(5, 0, 5));
    assert_eq!(
        store.get(position).unwrap().block_id(),
        Some(&id("camera_1"))
    );
    assert_eq!(store.get_by_id(&id("camera_1")), store.get(position));
    assert_eq!(store.get_by_id(&id("camera_2")), None);
}

#[test]
fn duplicate_id_fails_and_leaves_store_unchanged() {
    let mut store = BlockStore::new();
    store.put([0, 0, 0], BlockType::Camera, Some(id("a"))).unwrap();
    store.put([1, 0, 0], BlockType::Stone, None).unwrap();
    let before = store.records().cloned().collect::<Vec<_>>();

    assert_eq!(
        store.put([1, 0, 0], BlockType::Camera, Some(id("a"))),
        Err(PutError::DuplicateBlockId {
            block_id: id("a"),
            existing: Cube::new(0, 0, 0),
        })
    );

    assert_eq!(store.records().cloned().collect::<Vec<_>>(), before);
    assert_eq!(store.lookup_by_id(&id("a")), Some(Cube::new(0, 0, 0)));
    store.consistency_check();
}

#[test]
fn reput_same_id_at_same_position() {
    let mut store = BlockStore::new();
    store.put([0, 0, 0], BlockType::Camera, Some(id("a"))).unwrap();
    let previous = store
        .put([0, 0, 0], BlockType::Player, Some(id("a")))
        .unwrap()
        .unwrap();
    assert_eq!(previous.block_type(), BlockType::Camera);
    assert_eq!(store.lookup_by_id(&id("a")), Some(Cube::new(0, 0, 0)));
    store.consistency_check();
}

#[test]
fn overwrite_drops_old_id() {
    let mut store = BlockStore::new();
    store.put([0, 0, 0], BlockType::Camera, Some(id("a"))).unwrap();
    store.put([0, 0, 0], BlockType::Stone, None).unwrap();
    assert_eq!(store.lookup_by_id(&id("a")), None);
    store.consistency_check();

    // The id is free for reuse.
    store.put([9, 9, 9], BlockType::Camera, Some(id("a"))).unwrap();
    store.consistency_check();
}

#[test]
fn remove_releases_id() {
    let mut store = BlockStore::new();
    store.put([2, 0, 2], BlockType::Camera, Some(id("camera_3"))).unwrap();
    let removed = store.remove([2, 0, 2]).unwrap();
    assert_eq!(removed.block_id(), Some(&id("camera_3")));
    assert_eq!(store.lookup_by_id(&id("camera_3")), None);
    assert_eq!(store.remove([2, 0, 2]), None);

    store.put([7, 1, 7], BlockType::Camera, Some(id("camera_3"))).unwrap();
    assert_eq!(store.lookup_by_id(&id("camera_3")), Some(Cube::new(7, 1, 7)));
    store.consistency_check();
}

#[test]
fn relocate_moves_record_and_id() {
    let mut store = BlockStore::new();
    store.put([0, 0, 0], BlockType::Player, Some(id("p"))).unwrap();
    store.put([3, 0, 0], BlockType::Stone, None).unwrap();

    let displaced = store
        .relocate(Cube::new(0, 0, 0), Cube::new(3, 0, 0))
        .unwrap();
    assert_eq!(displaced.map(|r| r.block_type()), Some(BlockType::Stone));
    assert_eq!(store.get([0, 0, 0]), None);
    let moved = store.get([3, 0, 0]).unwrap();
    assert_eq!(moved.position(), Cube::new(3, 0, 0));
    assert_eq!(moved.block_id(), Some(&id("p")));
    assert_eq!(store.lookup_by_id(&id("p")), Some(Cube::new(3, 0, 0)));
    store.consistency_check();
}

#[test]
fn relocate_over_identified_record() {
    let mut store = BlockStore::new();
    store.put([0, 0, 0], BlockType::Camera, Some(id("a"))).unwrap();
    store.put([1, 0, 0], BlockType::Camera, Some(id("b"))).unwrap();
    store.relocate(Cube::new(0, 0, 0), Cube::new(1, 0, 0)).unwrap();
    assert_eq!(store.lookup_by_id(&id("a")), Some(Cube::new(1, 0, 0)));
    assert_eq!(store.lookup_by_id(&id("b")), None);
    assert_eq!(store.len(), 1);
    store.consistency_check();
}

#[test]
fn relocate_errors_and_noop() {
    let mut store = BlockStore::new();
    assert_eq!(
        store.relocate(Cube::new(0, 0, 0), Cube::new(1, 0, 0)),
        Err(RelocateError::NoSource(Cube::new(0, 0, 0)))
    );
    store.put([0, 0, 0], BlockType::Sand, None).unwrap();
    assert_eq!(store.relocate(Cube::ORIGIN, Cube::ORIGIN), Ok(None));
    assert_eq!(store.len(), 1);
}

#[rstest]
#[case::air(BlockType::Air, false)]
#[case::water(BlockType::Water, false)]
#[case::stone(BlockType::Stone, true)]
#[case::glass(BlockType::Glass, true)]
#[case::camera(BlockType::Camera, true)]
fn put_derives_collision(#[case] block_type: BlockType, #[case] expected: bool) {
    let mut store = BlockStore::new();
    store.put([0, 0, 0], block_type, None).unwrap();
    assert_eq!(store.get([0, 0, 0]).unwrap().collision_enabled(), expected);
    assert_eq!(store.derive_collision(block_type), expected);
}

#[test]
fn put_uses_rules_but_insert_keeps_record_setting() {
    let mut rules = CollisionRules::default();
    rules.set(BlockType::Player, false);
    let mut store = BlockStore::with_rules(rules);

    store.put([0, 0, 0], BlockType::Player, None).unwrap();
    assert!(!store.get([0, 0, 0]).unwrap().collision_enabled());

    store
        .insert(BlockRecord::new([1, 0, 0], BlockType::Player).with_collision(true))
        .unwrap();
    assert!(store.get([1, 0, 0]).unwrap().collision_enabled());
}

#[test]
fn query_region_inclusive_and_ordered() {
    let mut store = BlockStore::new();
    for x in -3..=3 {
        for z in -3..=3 {
            store.put([x, 0, z], BlockType::Stone, None).unwrap();
        }
    }
    let found: Vec<Cube> = store
        .query_region(FreePoint::new(0.0, 0.0, 0.0), 2.0)
        .map(BlockRecord::position)
        .collect();

    // Everything within distance 2 of the origin on the plane y = 0, including the
    // points at exactly distance 2.
    let mut expected = Vec::new();
    for x in -2..=2 {
        for z in -2..=2 {
            if x * x + z * z <= 4 {
                expected.push(Cube::new(x, 0, z));
            }
        }
    }
    assert_eq!(found, expected);
}

#[rstest]
#[case::negative(-1.0)]
#[case::nan(f64::NAN)]
fn query_region_invalid_radius_is_empty(#[case] radius: f64) {
    let mut store = BlockStore::new();
    store.put([0, 0, 0], BlockType::Stone, None).unwrap();
    assert_eq!(store.query_region(FreePoint::origin(), radius).count(), 0);
}

#[test]
fn query_region_infinite_radius_is_everything() {
    let mut store = BlockStore::new();
    store.put([i32::MIN, 0, 0], BlockType::Stone, None).unwrap();
    store.put([i32::MAX, 0, 0], BlockType::Stone, None).unwrap();
    assert_eq!(
        store.query_region(FreePoint::origin(), f64::INFINITY).count(),
        2
    );
}

/// Random sequences of mutations never break the id index.
#[test]
fn random_mutations_stay_consistent() {
    let mut rng = rand_xoshiro::Xoshiro256Plus::seed_from_u64(0x5eed);
    let mut store = BlockStore::new();
    let ids = ["a", "b", "c", "d"].map(id);
    let cube = |rng: &mut rand_xoshiro::Xoshiro256Plus| {
        Cube::new(rng.random_range(0..4), 0, rng.random_range(0..4))
    };

    for _ in 0..2000 {
        match rng.random_range(0..4) {
            0 => {
                let block_id = rng.random_bool(0.5).then(|| ids[rng.random_range(0..4)].clone());
                let position = cube(&mut rng);
                let _ = store.put(position, BlockType::Camera, block_id);
            }
            1 => {
                store.remove(cube(&mut rng));
            }
            2 => {
                let from = cube(&mut rng);
                let to = cube(&mut rng);
                let _ = store.relocate(from, to);
            }
            _ => {
                let position = cube(&mut rng);
                let _ = store.put(position, BlockType::Water, None);
            }
        }
        store.consistency_check();
    }
}
