//! Integration tests for the shared index through the `SpatialIndex` trait.

use rand::Rng;
use sam_int_test::test_util::{
    cleanup, create_default_test_context, create_test_context, grid_box, oracle_intersecting,
    random_box, run_test, sorted,
};
use sam_rtree::{BoundingBox, SpatialError, SpatialIndex, SyncRTree};

#[test]
fn test_add_and_find() {
    run_test(
        || create_test_context(),
        |ctx| {
            let index = ctx.index();
            index.add(&BoundingBox::new(0.0, 0.0, 1.0, 1.0), 1)?;
            index.add(&BoundingBox::new(2.0, 2.0, 3.0, 3.0), 2)?;
            index.add(&BoundingBox::new(10.0, 10.0, 11.0, 11.0), 3)?;

            let hits = index.find_intersecting_keys(&BoundingBox::new(0.0, 0.0, 3.0, 3.0))?;
            assert_eq!(sorted(hits), vec![1, 2]);
            assert_eq!(index.entry_count(), 3);
            assert_eq!(index.bounds(), BoundingBox::new(0.0, 0.0, 11.0, 11.0));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_random_workload_through_trait_object() {
    run_test(
        || create_default_test_context(),
        |ctx| {
            let index: Box<dyn SpatialIndex<u64>> = Box::new(ctx.index());
            let mut rng = ctx.rng();
            let mut entries = Vec::new();

            for id in 0..1000u64 {
                let mbr = random_box(&mut rng, 250.0, 6.0);
                index.add(&mbr, id)?;
                entries.push((mbr, id));
            }

            for _ in 0..100 {
                let query = random_box(&mut rng, 250.0, 40.0);
                let hits = index.find_intersecting_keys(&query)?;
                assert_eq!(sorted(hits), oracle_intersecting(&entries, &query));
            }

            let (mbr, id) = entries[rng.random_range(0..entries.len())];
            assert!(index.remove(&mbr, &id)?);
            assert!(!index.remove(&mbr, &id)?);
            assert_eq!(index.entry_count(), 999);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_find_within_distance() {
    run_test(
        || create_test_context(),
        |ctx| {
            let index = ctx.index();
            for i in 0..25 {
                index.add(&grid_box(i, 5, 10.0), i as u64)?;
            }

            // cell 12 sits at (20, 20); its four side neighbours are 9.5 away
            let near = index.find_within_distance(20.5, 20.5, 9.5)?;
            let ids: Vec<u64> = near.iter().map(|(id, _)| *id).collect();
            assert_eq!(ids[0], 12);
            assert_eq!(sorted(ids), vec![7, 11, 12, 13, 17]);

            let nearest = index.find_nearest(0.0, 0.0, 1, None)?;
            assert_eq!(nearest, vec![(0, 0.0)]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_rejects_malformed_input() {
    run_test(
        || create_test_context(),
        |ctx| {
            let index = ctx.index();
            let inverted = BoundingBox::new(5.0, 5.0, 0.0, 0.0);
            assert!(matches!(
                index.add(&inverted, 1),
                Err(SpatialError::InvalidOperation(_))
            ));
            assert!(index.is_empty());
            assert!(index.find_nearest(f64::NAN, 1.0, 3, None).is_err());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_clear_resets_shared_handles() {
    run_test(
        || create_test_context(),
        |ctx| {
            let index = ctx.index();
            let other: SyncRTree<u64> = index.clone();
            for i in 0..40 {
                index.add(&grid_box(i, 8, 2.0), i as u64)?;
            }
            assert!(other.size() > 1);

            other.clear()?;
            assert!(index.is_empty());
            assert_eq!(index.size(), 1);
            assert_eq!(index.height(), 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
