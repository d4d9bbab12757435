use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sam_int_test::test_util::{cleanup, create_test_context, random_box, run_test, DEFAULT_SEED};
use sam_rtree::{BoundingBox, SpatialIndex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

const THREADS: u64 = 8;
const PER_THREAD: u64 = 500;

#[test]
fn test_concurrent_inserts() {
    run_test(
        || create_test_context(),
        |ctx| {
            let handles: Vec<_> = (0..THREADS)
                .map(|t| {
                    let index = ctx.index();
                    thread::spawn(move || {
                        let mut rng = StdRng::seed_from_u64(DEFAULT_SEED + t);
                        for i in 0..PER_THREAD {
                            let mbr = random_box(&mut rng, 1000.0, 10.0);
                            index.add(&mbr, t * PER_THREAD + i).unwrap();
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            let index = ctx.index();
            assert_eq!(index.entry_count(), (THREADS * PER_THREAD) as usize);
            let mut all = index
                .find_intersecting_keys(&BoundingBox::new(-1.0, -1.0, 2000.0, 2000.0))?;
            all.sort_unstable();
            assert_eq!(all, (0..THREADS * PER_THREAD).collect::<Vec<u64>>());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_readers_during_writes_and_removes() {
    run_test(
        || create_test_context(),
        |ctx| {
            let index = ctx.index();
            let mut rng = ctx.rng();
            let mut seeded = Vec::new();
            for id in 0..1000u64 {
                let mbr = random_box(&mut rng, 500.0, 5.0);
                index.add(&mbr, id)?;
                seeded.push((mbr, id));
            }

            let queries = Arc::new(AtomicUsize::new(0));
            let readers: Vec<_> = (0..4)
                .map(|r| {
                    let index = ctx.index();
                    let queries = Arc::clone(&queries);
                    thread::spawn(move || {
                        let mut rng = StdRng::seed_from_u64(DEFAULT_SEED ^ r);
                        for _ in 0..200 {
                            let x = rng.random_range(0.0..500.0);
                            let y = rng.random_range(0.0..500.0);
                            let query = BoundingBox::new(x, y, x + 50.0, y + 50.0);
                            let hits = index.find_intersecting_keys(&query).unwrap();
                            assert!(hits.len() <= 2000);
                            let _ = index.find_nearest(x, y, 5, None).unwrap();
                            queries.fetch_add(1, Ordering::Relaxed);
                        }
                    })
                })
                .collect();

            let writer = {
                let index = ctx.index();
                thread::spawn(move || {
                    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED + 99);
                    for id in 1000..2000u64 {
                        index.add(&random_box(&mut rng, 500.0, 5.0), id).unwrap();
                    }
                })
            };

            let remover = {
                let index = ctx.index();
                thread::spawn(move || {
                    for (mbr, id) in seeded.iter().step_by(2) {
                        assert!(index.remove(mbr, id).unwrap());
                    }
                })
            };

            for handle in readers {
                handle.join().unwrap();
            }
            writer.join().unwrap();
            remover.join().unwrap();

            assert_eq!(queries.load(Ordering::Relaxed), 800);
            assert_eq!(ctx.index().entry_count(), 1500);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
