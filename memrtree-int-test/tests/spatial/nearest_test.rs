//! Nearest-neighbour search against a linear scan.

use memrtree::{
    Mbr, Measurable, MemoryRTree, NearestNeighborQuery, SpatialEntry, SpatialError,
    SpatialSearchTree,
};
use memrtree_int_test::test_util::{
    cleanup, create_random_context, create_test_context, run_test, Feature,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn closest_distance<F>(features: &[Arc<Feature>], point: &[i32], keep: F) -> Option<f64>
where
    F: Fn(&Arc<Feature>) -> bool,
{
    features
        .iter()
        .filter(|f| keep(f))
        .map(|f| f.distance_to(point))
        .min_by(|a, b| a.total_cmp(b))
}

#[test]
fn test_nearest_matches_brute_force() {
    run_test(
        || create_random_context(1_500, 8, 50),
        |ctx| {
            let mut rng = StdRng::seed_from_u64(51);
            let mut query = NearestNeighborQuery::new();
            for _ in 0..200 {
                let point = [rng.gen_range(-1_500..1_500), rng.gen_range(-1_500..1_500)];
                query.init_with_point(ctx.tree(), &point)?;
                let found = query.nearest_object(ctx.tree())?.unwrap();

                let expected = closest_distance(ctx.features(), &point, |_| true).unwrap();
                assert_eq!(found.distance_to(&point), expected, "point {:?}", point);
                assert_eq!(query.best_distance(), Some(expected));
            }
            assert_eq!(query.counters().query_count, 200);
            assert_eq!(query.counters().result_count, 200);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_nearest_with_exclusion_matches_brute_force() {
    run_test(
        || create_random_context(800, 6, 52),
        |ctx| {
            let mut rng = StdRng::seed_from_u64(53);
            for _ in 0..100 {
                let excluded = ctx.features()[rng.gen_range(0..800)].clone();
                let point = excluded.mbr().center_coords();
                let found = ctx.tree().nearest(&point, Some(excluded.clone()))?.unwrap();

                assert!(!Arc::ptr_eq(&found, &excluded));
                let expected =
                    closest_distance(ctx.features(), &point, |f| !Arc::ptr_eq(f, &excluded))
                        .unwrap();
                assert_eq!(found.distance_to(&point), expected);
            }
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_nearest_of_same_kind() {
    run_test(
        || create_random_context(600, 6, 54),
        |ctx| {
            let reference = Arc::new(Feature::new("reference", Mbr::rect(0, 0, 1, 1)).with_kind("odd"));
            let mut query = NearestNeighborQuery::new();
            query.restrict_to_type_of(reference);

            let mut rng = StdRng::seed_from_u64(55);
            for _ in 0..50 {
                let point = [rng.gen_range(-1_000..1_000), rng.gen_range(-1_000..1_000)];
                query.init_with_point(ctx.tree(), &point)?;
                let found = query.nearest_object(ctx.tree())?.unwrap();
                assert_eq!(found.kind, "odd");

                let expected =
                    closest_distance(ctx.features(), &point, |f| f.kind == "odd").unwrap();
                assert_eq!(found.distance_to(&point), expected);
            }

            query.clear_type_restriction();
            query.init_with_point(ctx.tree(), &[0, 0])?;
            let any = query.nearest_object(ctx.tree())?.unwrap();
            let expected = closest_distance(ctx.features(), &[0, 0], |_| true).unwrap();
            assert_eq!(any.distance_to(&[0, 0]), expected);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_far_away_point_still_finds_something() {
    run_test(
        || create_test_context(2, 4),
        |ctx| {
            ctx.insert(Feature::rect("only", 0, 0, 1, 1))?;
            let found = ctx.tree().nearest(&[1_000_000, -1_000_000], None)?;
            assert_eq!(found.map(|f| f.name.clone()), Some("only".to_string()));

            // nothing is left once the only feature is excluded
            let only = ctx.features()[0].clone();
            assert!(ctx.tree().nearest(&[5, 5], Some(only))?.is_none());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_nearest_requires_initialisation_and_matching_dimensions() {
    let mut tree: MemoryRTree<Feature> = MemoryRTree::new(2, 4).unwrap();
    tree.insert(Feature::rect("a", 0, 0, 1, 1)).unwrap();

    let mut query: NearestNeighborQuery<Feature> = NearestNeighborQuery::new();
    assert!(matches!(
        query.nearest_object(&tree),
        Err(SpatialError::InvalidOperation(_))
    ));
    assert!(matches!(
        query.init_with_point(&tree, &[1]),
        Err(SpatialError::DimensionMismatch { expected: 2, found: 1 })
    ));
    assert_eq!(tree.total_objects(), 1);
}
