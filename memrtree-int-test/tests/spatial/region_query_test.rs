//! Region cursor behaviour: window queries against a linear scan,
//! resumption, the modifying operations and the predicate family.

use memrtree::{
    AllPredicate, ExactMatchPredicate, LayerAllPredicate, LayerScaleWindowPredicate,
    LayerWindowPredicate, Mbr, MemoryRTree, Operation, RegionQuery, SelectPredicate,
    SpatialEntry, SpatialError, SpatialSearchTree, WindowPredicate, WithinPredicate,
};
use memrtree_int_test::test_util::{
    brute_force, cleanup, create_random_context, create_test_context, run_test, sorted_names,
    Feature,
};
use memrtree::{Layered, Visualized};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn drain(query: &mut RegionQuery<Feature>, tree: &mut MemoryRTree<Feature>) -> Vec<Arc<Feature>> {
    let mut found = Vec::new();
    while let Some(feature) = query.next_object(tree).unwrap() {
        found.push(feature);
    }
    found
}

#[test]
fn test_window_query_matches_brute_force() {
    run_test(
        || create_random_context(2_000, 8, 10),
        |ctx| {
            let mut rng = StdRng::seed_from_u64(11);
            for _ in 0..100 {
                let window = Mbr::rect(
                    rng.gen_range(-1_100..1_100),
                    rng.gen_range(-1_100..1_100),
                    rng.gen_range(0..300),
                    rng.gen_range(0..300),
                );
                let tolerance = rng.gen_range(0..20);

                let found = ctx.tree().find_intersecting(&window, tolerance)?;
                let expected =
                    brute_force(ctx.features(), |f| window.intersects(f.mbr(), tolerance));
                assert_eq!(sorted_names(&found), sorted_names(&expected), "window {}", window);
            }
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_within_query_matches_brute_force() {
    run_test(
        || create_random_context(1_000, 6, 12),
        |ctx| {
            let mut rng = StdRng::seed_from_u64(13);
            let mut query = RegionQuery::new(WithinPredicate);
            for _ in 0..50 {
                let window = Mbr::rect(
                    rng.gen_range(-1_100..1_100),
                    rng.gen_range(-1_100..1_100),
                    rng.gen_range(0..500),
                    rng.gen_range(0..500),
                );
                query.init_with_rect(ctx.tree(), window.clone(), Operation::Query);
                query.reset(ctx.tree());
                let found = drain(&mut query, ctx.tree_mut());
                let expected = brute_force(ctx.features(), |f| window.contains(f.mbr(), 0));
                assert_eq!(sorted_names(&found), sorted_names(&expected), "window {}", window);
            }
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_touching_boxes_do_not_intersect() {
    run_test(
        || create_test_context(2, 4),
        |ctx| {
            ctx.insert(Feature::rect("left", 0, 0, 10, 10))?;
            let touching = Mbr::rect(10, 0, 5, 5);
            assert!(ctx.tree().find_intersecting(&touching, 0)?.is_empty());
            assert_eq!(ctx.tree().find_intersecting(&touching, 1)?.len(), 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_query_resumes_where_it_stopped() {
    run_test(
        || create_random_context(300, 4, 20),
        |ctx| {
            let window = Mbr::rect(-500, -500, 1_000, 1_000);
            let expected = brute_force(ctx.features(), |f| window.intersects(f.mbr(), 0));
            assert!(expected.len() > 10);

            let mut query = RegionQuery::new(WindowPredicate::new(0));
            query.init_with_rect(ctx.tree(), window.clone(), Operation::Query);

            let mut found = Vec::new();
            for _ in 0..5 {
                found.push(query.next_object(ctx.tree_mut())?.unwrap());
            }
            // same configuration again keeps the position
            query.init_with_rect(ctx.tree(), window.clone(), Operation::Query);
            while let Some(feature) = query.find_next(ctx.tree())? {
                found.push(feature);
            }

            assert_eq!(sorted_names(&found), sorted_names(&expected));
            assert!(query.is_exhausted());
            assert_eq!(query.next_object(ctx.tree_mut())?.map(|f| f.name.clone()), None);

            let counters = query.counters();
            assert_eq!(counters.query_count, 1);
            assert_eq!(counters.result_count as usize, expected.len());

            // a reset walks everything again
            query.reset(ctx.tree());
            let again = drain(&mut query, ctx.tree_mut());
            assert_eq!(again.len(), expected.len());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_iterator_adapter() {
    run_test(
        || create_random_context(200, 5, 21),
        |ctx| {
            let window = Mbr::rect(0, 0, 800, 800);
            let mut query = RegionQuery::new(WindowPredicate::new(0));
            query.init_with_rect(ctx.tree(), window.clone(), Operation::Query);

            let found: Vec<Arc<Feature>> = query
                .iter(ctx.tree_mut())
                .collect::<Result<Vec<_>, _>>()?;

            let expected = brute_force(ctx.features(), |f| window.intersects(f.mbr(), 0));
            assert_eq!(sorted_names(&found), sorted_names(&expected));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_cursor_rejects_other_tree_and_grown_root() {
    let mut first: MemoryRTree<Feature> = MemoryRTree::new(2, 2).unwrap();
    let mut second: MemoryRTree<Feature> = MemoryRTree::new(2, 2).unwrap();
    first.insert(Feature::rect("a", 0, 0, 1, 1)).unwrap();
    second.insert(Feature::rect("b", 0, 0, 1, 1)).unwrap();

    let mut query = RegionQuery::new(AllPredicate);
    query.init(&first, Operation::Query);
    assert!(matches!(
        query.next_object(&mut second),
        Err(SpatialError::InvalidOperation(_))
    ));

    // the root splits on the third insert
    first.insert(Feature::rect("c", 5, 5, 1, 1)).unwrap();
    first.insert(Feature::rect("d", 9, 9, 1, 1)).unwrap();
    assert_eq!(first.height(), 2);
    assert!(matches!(
        query.next_object(&mut first),
        Err(SpatialError::InvalidOperation(_))
    ));

    query.init(&first, Operation::Query);
    assert_eq!(drain(&mut query, &mut first).len(), 3);
}

#[test]
fn test_remove_all_in_window() {
    run_test(
        || create_random_context(1_000, 6, 30),
        |ctx| {
            let window = Mbr::rect(-300, -300, 600, 600);
            let inside = brute_force(ctx.features(), |f| window.intersects(f.mbr(), 0));
            assert!(!inside.is_empty());

            let mut query = RegionQuery::new(WindowPredicate::new(0));
            query.init_with_rect(ctx.tree(), window.clone(), Operation::RemoveAll);
            assert!(query.next_object(ctx.tree_mut())?.is_none());

            ctx.tree().check_invariants()?;
            assert_eq!(ctx.tree().total_objects(), 1_000 - inside.len());
            assert!(ctx.tree().find_intersecting(&window, 0)?.is_empty());
            assert_eq!(query.counters().result_count, 0);
            Ok(())
        },
        |ctx| cleanup_after_bulk_removal(ctx),
    )
}

#[test]
fn test_remove_exact_takes_one_at_a_time() {
    run_test(
        || create_test_context(2, 3),
        |ctx| {
            let twin = Feature::rect("twin", 4, 4, 2, 2);
            ctx.insert(Feature::rect("x", 0, 0, 2, 2))?;
            ctx.insert(twin.clone())?;
            ctx.insert(Feature::rect("y", 8, 8, 2, 2))?;
            ctx.insert(Feature::rect("other", 4, 4, 2, 2))?;

            let mut query = RegionQuery::new(ExactMatchPredicate);
            query.init_with_object(ctx.tree(), twin.clone(), Operation::RemoveExact);
            let removed = query.next_object(ctx.tree_mut())?;
            assert!(removed.is_some_and(|f| Arc::ptr_eq(&f, &twin)));
            // only the identical object matches, the equal box stays
            assert!(query.next_object(ctx.tree_mut())?.is_none());

            ctx.tree().check_invariants()?;
            let left = ctx.tree().find_intersecting(&Mbr::rect(4, 4, 2, 2), 0)?;
            assert_eq!(sorted_names(&left), vec!["other"]);
            Ok(())
        },
        |ctx| cleanup_after_bulk_removal(ctx),
    )
}

#[test]
fn test_update_operations_visit_matches() {
    run_test(
        || create_random_context(400, 5, 31),
        |ctx| {
            let window = Mbr::rect(-400, -400, 800, 800);
            let expected = brute_force(ctx.features(), |f| window.intersects(f.mbr(), 0));
            let target = expected[0].clone();

            let mut query = RegionQuery::new(WindowPredicate::new(0));
            query.init_with_object(ctx.tree(), target.clone(), Operation::UpdateExact);
            let updated = query.next_object(ctx.tree_mut())?;
            assert!(updated.is_some_and(|f| Arc::ptr_eq(&f, &target)));

            query.init_with_rect(ctx.tree(), window.clone(), Operation::UpdateAll);
            assert!(query.next_object(ctx.tree_mut())?.is_none());
            assert!(query.is_exhausted());
            assert_eq!(ctx.tree().total_objects(), 400);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_layer_predicates() {
    run_test(
        || create_random_context(600, 6, 40),
        |ctx| {
            let window = Mbr::rect(-600, -600, 1_200, 1_200);

            let mut query = RegionQuery::new(LayerWindowPredicate::window(1, 0));
            query.init_with_rect(ctx.tree(), window.clone(), Operation::Query);
            let found = drain(&mut query, ctx.tree_mut());
            let expected = brute_force(ctx.features(), |f| {
                f.layer() == 1 && window.intersects(f.mbr(), 0)
            });
            assert_eq!(sorted_names(&found), sorted_names(&expected));

            let mut query = RegionQuery::new(LayerAllPredicate::all(2));
            query.init(ctx.tree(), Operation::Query);
            let found = drain(&mut query, ctx.tree_mut());
            let expected = brute_force(ctx.features(), |f| f.layer() == 2);
            assert_eq!(sorted_names(&found), sorted_names(&expected));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_scale_and_select_predicates() {
    run_test(
        || create_test_context(2, 4),
        |ctx| {
            let road = Feature::new("road", Mbr::rect(0, 0, 100, 4))
                .with_layer(1)
                .with_scale_range(0, 1_000);
            let house = Feature::new("house", Mbr::rect(10, 10, 5, 5))
                .with_layer(1)
                .with_scale_range(0, 50);
            let river = Feature::new("river", Mbr::rect(0, 20, 100, 6))
                .with_layer(2)
                .with_scale_range(0, 5_000);
            for feature in [road, house, river] {
                ctx.insert(Arc::new(feature))?;
            }

            let window = Mbr::rect(0, 0, 100, 100);
            let mut query = RegionQuery::new(LayerScaleWindowPredicate::layer_window(1, 200, 0));
            query.init_with_rect(ctx.tree(), window.clone(), Operation::Query);
            assert_eq!(sorted_names(&drain(&mut query, ctx.tree_mut())), vec!["road"]);

            let mut query = RegionQuery::new(LayerScaleWindowPredicate::layer_window(1, 20, 0));
            query.init_with_rect(ctx.tree(), window, Operation::Query);
            assert_eq!(
                sorted_names(&drain(&mut query, ctx.tree_mut())),
                vec!["house", "road"]
            );

            // point pick inside the house, then just beside the river
            let mut pick = RegionQuery::new(SelectPredicate::new(0, 0));
            pick.init_with_point(ctx.tree(), &[12, 12], Operation::Query)?;
            assert_eq!(sorted_names(&drain(&mut pick, ctx.tree_mut())), vec!["house"]);

            let mut pick = RegionQuery::new(SelectPredicate::new(3, 3));
            pick.init_with_point(ctx.tree(), &[50, 28], Operation::Query)?;
            assert_eq!(sorted_names(&drain(&mut pick, ctx.tree_mut())), vec!["river"]);
            assert!(ctx.features().iter().all(|f| f.is_visible(0)));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

/// Features removed straight through a cursor are still in the context's
/// list, so only the tree is checked and cleared.
fn cleanup_after_bulk_removal(
    ctx: &mut memrtree_int_test::test_util::TestContext,
) -> memrtree::SpatialResult<()> {
    ctx.tree().check_invariants()?;
    ctx.tree_mut().clear();
    Ok(())
}
