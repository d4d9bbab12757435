//! Randomized checks of the structural and query invariants.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sam_int_test::test_util::{
    all_values, oracle_intersecting, random_box, random_boxes, small_config, small_tree, sorted,
    whole_plane, DEFAULT_SEED,
};
use sam_rtree::{BoundingBox, RTree, RTreeConfig};

fn assert_valid(tree: &RTree<u64>) {
    let report = tree.check_integrity();
    assert!(report.is_valid, "integrity errors: {:?}", report.errors);
}

/// Loose upper bound on the height of a tree of `entries` values whose
/// non-root nodes hold at least `min_fill` branches.
fn height_bound(entries: usize, min_fill: usize) -> u32 {
    let mut levels = 0;
    let mut capacity = 1usize;
    while capacity < entries.max(1) {
        capacity = capacity.saturating_mul(min_fill);
        levels += 1;
    }
    levels + 1
}

#[test]
fn test_search_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED);
    let mut tree = small_tree();
    let mut entries = Vec::new();

    for (id, mbr) in random_boxes(&mut rng, 1500, 1000.0, 20.0).into_iter().enumerate() {
        tree.insert(mbr, id as u64);
        entries.push((mbr, id as u64));
    }

    for _ in 0..200 {
        let query = random_box(&mut rng, 1000.0, 150.0);
        let mut report = Vec::new();
        let found = tree.search(&query, &mut report);
        assert_eq!(found, report.len());
        assert_eq!(sorted(report), oracle_intersecting(&entries, &query));
    }
}

#[test]
fn test_mixed_operations_keep_tree_valid() {
    for seed in 0..8u64 {
        let mut rng = StdRng::seed_from_u64(DEFAULT_SEED ^ seed);
        let mut tree = small_tree();
        let mut live: Vec<(BoundingBox, u64)> = Vec::new();

        for id in 0..800u64 {
            if live.is_empty() || rng.random_bool(0.6) {
                let mbr = random_box(&mut rng, 200.0, 10.0);
                tree.insert(mbr, id);
                live.push((mbr, id));
            } else {
                let (mbr, value) = live.swap_remove(rng.random_range(0..live.len()));
                assert!(tree.remove(&mbr, &value), "seed {} lost value {}", seed, value);
            }

            // exact covers, level structure and fill bounds after every mutation
            assert_valid(&tree);
            assert_eq!(tree.entry_count(), live.len());
        }

        let expected: Vec<u64> = sorted(live.iter().map(|(_, v)| *v).collect());
        assert_eq!(all_values(&tree), expected);
    }
}

#[test]
fn test_insert_then_remove_restores_contents() {
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED + 1);
    let mut tree = small_tree();
    for (id, mbr) in random_boxes(&mut rng, 300, 500.0, 10.0).into_iter().enumerate() {
        tree.insert(mbr, id as u64);
    }
    let before = all_values(&tree);

    for extra in 0..100u64 {
        let mbr = random_box(&mut rng, 500.0, 10.0);
        let value = 10_000 + extra;
        tree.insert(mbr, value);
        assert!(tree.remove(&mbr, &value));
        assert_eq!(tree.entry_count(), before.len());
    }

    assert_eq!(all_values(&tree), before);
    assert_valid(&tree);
}

#[test]
fn test_clear_twice_matches_clear_once() {
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED + 2);
    let mut tree = small_tree();
    for (id, mbr) in random_boxes(&mut rng, 200, 100.0, 5.0).into_iter().enumerate() {
        tree.insert(mbr, id as u64);
    }

    tree.clear();
    let once = (tree.size(), tree.height(), tree.entry_count(), all_values(&tree));
    tree.clear();
    let twice = (tree.size(), tree.height(), tree.entry_count(), all_values(&tree));

    assert_eq!(once, (1, 1, 0, Vec::new()));
    assert_eq!(once, twice);

    // still usable after clearing
    tree.insert(BoundingBox::new(0.0, 0.0, 1.0, 1.0), 1);
    assert_eq!(all_values(&tree), vec![1]);
}

#[test]
fn test_height_stays_logarithmic() {
    for config in [small_config(), RTreeConfig::default()] {
        let mut rng = StdRng::seed_from_u64(DEFAULT_SEED + 3);
        let mut tree: RTree<u64> = RTree::with_config(config).unwrap();
        let min_fill = config.min_nodes();
        let boxes = random_boxes(&mut rng, 2000, 1000.0, 5.0);

        for (id, mbr) in boxes.iter().enumerate() {
            tree.insert(*mbr, id as u64);
            let count = id + 1;
            assert!(
                tree.height() <= height_bound(count, min_fill),
                "height {} too large for {} entries",
                tree.height(),
                count
            );
        }

        for (id, mbr) in boxes.iter().enumerate() {
            assert!(tree.remove(mbr, &(id as u64)));
            let count = boxes.len() - id - 1;
            assert!(
                tree.height() <= height_bound(count, min_fill),
                "height {} too large for {} entries",
                tree.height(),
                count
            );
        }

        assert!(tree.is_empty());
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.size(), 1);
    }
}

#[test]
fn test_default_capacity_tree_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED + 4);
    let mut tree: RTree<u64> = RTree::new();
    let mut entries = Vec::new();
    for (id, mbr) in random_boxes(&mut rng, 1000, 300.0, 8.0).into_iter().enumerate() {
        tree.insert(mbr, id as u64);
        entries.push((mbr, id as u64));
    }
    assert_valid(&tree);

    let query = BoundingBox::new(100.0, 100.0, 200.0, 200.0);
    assert_eq!(sorted(tree.find_intersecting(&query)), oracle_intersecting(&entries, &query));

    let contained: Vec<u64> = sorted(
        entries
            .iter()
            .filter(|(mbr, _)| query.contains(mbr))
            .map(|(_, v)| *v)
            .collect(),
    );
    assert_eq!(sorted(tree.find_contained(&query)), contained);
}

#[test]
fn test_minimum_fill_of_one() {
    let config = RTreeConfig::new(4).with_min_nodes(1);
    let mut tree: RTree<u64> = RTree::with_config(config).unwrap();
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED + 5);
    let boxes = random_boxes(&mut rng, 300, 100.0, 3.0);

    for (id, mbr) in boxes.iter().enumerate() {
        tree.insert(*mbr, id as u64);
    }
    assert_valid(&tree);

    for (id, mbr) in boxes.iter().enumerate() {
        assert!(tree.remove(mbr, &(id as u64)));
        assert_valid(&tree);
    }
    assert!(tree.is_empty());
    assert_eq!(tree.height(), 1);
}

#[test]
fn test_bulk_load_and_rebuild_preserve_queries() {
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED + 6);
    let entries: Vec<(BoundingBox, u64)> = random_boxes(&mut rng, 1200, 500.0, 6.0)
        .into_iter()
        .enumerate()
        .map(|(id, mbr)| (mbr, id as u64))
        .collect();

    let mut tree = RTree::bulk_load(RTreeConfig::new(8), entries.clone()).unwrap();
    assert_valid(&tree);
    assert_eq!(tree.entry_count(), entries.len());

    for _ in 0..50 {
        let query = random_box(&mut rng, 500.0, 80.0);
        assert_eq!(sorted(tree.find_intersecting(&query)), oracle_intersecting(&entries, &query));
    }

    let stats = tree.rebuild();
    assert_eq!(stats.entries_reindexed, entries.len());
    assert_valid(&tree);
    assert_eq!(sorted(tree.find_intersecting(&whole_plane())).len(), entries.len());
}
