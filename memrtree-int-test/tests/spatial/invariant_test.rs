//! Structural invariants under random workloads.

use memrtree::{Mbr, MemoryRTree, RTreeConfig, Relocation, SpatialEntry, SpatialSearchTree};
use memrtree_int_test::test_util::{
    brute_force, cleanup, create_random_context, create_test_context, random_features, run_test,
    sorted_names, Feature,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

#[test]
fn test_invariants_hold_after_every_insert() {
    run_test(
        || create_test_context(2, 4),
        |ctx| {
            for (i, feature) in random_features(300, 1).into_iter().enumerate() {
                ctx.insert(feature)?;
                ctx.tree().check_invariants()?;
                assert_eq!(ctx.tree().total_objects(), i + 1);
            }
            let stats = ctx.tree().stats();
            assert_eq!(stats.total_objects, 300);
            assert_eq!(stats.node_count as usize, ctx.tree().node_count());
            assert!(stats.tree_height >= 4);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_invariants_hold_after_random_removals() {
    run_test(
        || create_random_context(500, 6, 2),
        |ctx| {
            let mut order: Vec<Arc<Feature>> = ctx.features().to_vec();
            order.shuffle(&mut StdRng::seed_from_u64(3));

            for (i, feature) in order.iter().enumerate() {
                assert!(ctx.remove(feature)?, "{} should be removable", feature.name);
                ctx.tree().check_invariants()?;
                assert_eq!(ctx.tree().total_objects(), 500 - i - 1);
            }
            assert_eq!(ctx.tree().total_objects(), 0);
            assert!(ctx
                .tree()
                .find_intersecting(&Mbr::rect(-2_000, -2_000, 4_000, 4_000), 0)?
                .is_empty());

            // emptied leaves are still in place and get reused
            for feature in order.iter().take(50) {
                ctx.insert(feature.clone())?;
                ctx.tree().check_invariants()?;
            }
            assert_eq!(ctx.tree().total_objects(), 50);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_interleaved_inserts_and_removals() {
    run_test(
        || create_test_context(2, 5),
        |ctx| {
            let features = random_features(400, 4);
            for chunk in features.chunks(40) {
                for feature in chunk {
                    ctx.insert(feature.clone())?;
                }
                // drop every third feature of the chunk again
                for feature in chunk.iter().step_by(3) {
                    assert!(ctx.remove(feature)?);
                }
                ctx.tree().check_invariants()?;
                assert_eq!(ctx.tree().total_objects(), ctx.features().len());
            }
            assert_eq!(ctx.tree().total_objects(), 400 - 140);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_invariants_hold_after_random_moves() {
    run_test(
        || create_random_context(300, 5, 6),
        |ctx| {
            let mut rng = StdRng::seed_from_u64(7);
            let mut reinserted = 0;
            for round in 0..200 {
                let index = rng.gen_range(0..ctx.features().len());
                let feature = ctx.features()[index].clone();
                let mbr = feature.mbr();

                if round % 2 == 0 {
                    // a shrunken box never leaves its leaf
                    let (Some(x), Some(y)) = (mbr.min(0), mbr.min(1)) else {
                        unreachable!("features are two-dimensional");
                    };
                    let width = mbr.extension(0).unwrap_or(0) / 2;
                    let height = mbr.extension(1).unwrap_or(0) / 2;
                    let moved = feature.relocated(Mbr::rect(x, y, width, height));
                    assert_eq!(ctx.relocate(&feature, moved)?, Relocation::InPlace);
                } else {
                    let x = rng.gen_range(-1_000..1_000);
                    let y = rng.gen_range(-1_000..1_000);
                    let moved = feature.relocated(Mbr::rect(x, y, 10, 10));
                    let relocation = ctx.relocate(&feature, moved)?;
                    assert_ne!(relocation, Relocation::NotFound);
                    if relocation == Relocation::Reinserted {
                        reinserted += 1;
                    }
                }
                ctx.tree().check_invariants()?;
                assert_eq!(ctx.tree().total_objects(), 300);
            }
            assert!(reinserted > 0);

            let window = Mbr::rect(-300, -300, 600, 600);
            let found = ctx.tree().find_intersecting(&window, 0)?;
            let expected = brute_force(ctx.features(), |f| window.intersects(f.mbr(), 0));
            assert_eq!(sorted_names(&found), sorted_names(&expected));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_duplicate_boxes_are_distinct_objects() {
    run_test(
        || create_test_context(2, 3),
        |ctx| {
            let copies: Vec<Arc<Feature>> =
                (0..10).map(|i| Feature::rect(&format!("dup{}", i), 7, 7, 2, 2)).collect();
            for copy in &copies {
                ctx.insert(copy.clone())?;
            }
            ctx.tree().check_invariants()?;

            assert!(ctx.remove(&copies[4])?);
            let left = ctx.tree().find_intersecting(&Mbr::rect(7, 7, 2, 2), 0)?;
            assert_eq!(left.len(), 9);
            assert!(!left.iter().any(|f| Arc::ptr_eq(f, &copies[4])));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_three_dimensional_tree() {
    let config = RTreeConfig::builder()
        .dimensions(3)
        .node_capacity(4)
        .build()
        .unwrap();
    let mut tree: MemoryRTree<Feature> = MemoryRTree::with_config(config);
    for i in 0..50 {
        let feature = Feature::new(&format!("c{}", i), Mbr::cuboid(i, i * 2, i * 3, 1, 1, 1));
        tree.insert(Arc::new(feature)).unwrap();
    }
    tree.check_invariants().unwrap();
    assert_eq!(tree.total_objects(), 50);
    assert_eq!(tree.dimensions(), 3);

    let found = tree
        .find_intersecting(&Mbr::cuboid(10, 20, 30, 1, 1, 1), 0)
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "c10");
}
